//! Request and Response models for the cache service API
//!
//! This module defines the DTOs (Data Transfer Objects) used for
//! serializing/deserializing HTTP request and response bodies.

pub mod requests;
pub mod responses;

// Re-export commonly used types
pub use requests::{EntriesQuery, EntryScope, PrefixQuery, SetRequest};
pub use responses::{
    ClearResponse, DeleteResponse, EntriesResponse, ErrorResponse, GetResponse, HealthResponse,
    SetResponse,
};
