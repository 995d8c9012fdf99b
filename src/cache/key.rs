//! Key Namespacing Module
//!
//! Builds the single raw storage key for an `(origin, prefix, key)` triple and
//! decodes it back during enumeration.
//!
//! Layout: `origin[/prefix]@key`. Inside origin and prefix the reserved
//! characters are percent-escaped (`%` → `%25`, `/` → `%2F`, `@` → `%40`), so
//! the first `@` always ends the namespace and the first `/` before it always
//! ends the origin. The key is stored verbatim.

use crate::error::{CacheError, Result};

const PREFIX_SEPARATOR: char = '/';
const KEY_SEPARATOR: char = '@';

// == Parsed Key ==
/// The components recovered from a raw storage key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedKey {
    pub origin: String,
    pub prefix: Option<String>,
    pub key: String,
}

// == Real Key ==
/// Combines origin, prefix and key into the raw storage key.
///
/// An empty prefix is treated the same as no prefix.
pub fn real_key(origin: &str, key: &str, prefix: Option<&str>) -> String {
    let mut out = escape(origin);
    if let Some(prefix) = prefix.filter(|p| !p.is_empty()) {
        out.push(PREFIX_SEPARATOR);
        out.push_str(&escape(prefix));
    }
    out.push(KEY_SEPARATOR);
    out.push_str(key);
    out
}

// == Parse Real Key ==
/// Inverse of [`real_key`].
///
/// Fails with [`CacheError::MalformedKey`] for raw keys the cache did not
/// write: no `@` or a bad escape sequence. The origin may be empty, as it is
/// for pages served without a host.
pub fn parse_real_key(raw: &str) -> Result<ParsedKey> {
    let (namespace, key) = raw
        .split_once(KEY_SEPARATOR)
        .ok_or_else(|| CacheError::MalformedKey(raw.to_string()))?;

    let (origin, prefix) = match namespace.split_once(PREFIX_SEPARATOR) {
        Some((origin, prefix)) => (origin, Some(prefix)),
        None => (namespace, None),
    };

    let malformed = || CacheError::MalformedKey(raw.to_string());
    let origin = unescape(origin).ok_or_else(malformed)?;
    let prefix = match prefix {
        Some(p) => Some(unescape(p).ok_or_else(malformed)?).filter(|p| !p.is_empty()),
        None => None,
    };

    Ok(ParsedKey {
        origin,
        prefix,
        key: key.to_string(),
    })
}

fn escape(segment: &str) -> String {
    let mut out = String::with_capacity(segment.len());
    for c in segment.chars() {
        match c {
            '%' => out.push_str("%25"),
            '/' => out.push_str("%2F"),
            '@' => out.push_str("%40"),
            other => out.push(other),
        }
    }
    out
}

fn unescape(segment: &str) -> Option<String> {
    let mut out = String::with_capacity(segment.len());
    let mut rest = segment;
    while let Some(pos) = rest.find('%') {
        out.push_str(&rest[..pos]);
        let code = rest.get(pos + 1..pos + 3)?;
        out.push(match code {
            "25" => '%',
            "2F" => '/',
            "40" => '@',
            _ => return None,
        });
        rest = &rest[pos + 3..];
    }
    out.push_str(rest);
    Some(out)
}
