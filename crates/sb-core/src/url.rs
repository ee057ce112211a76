//! URL parsing and canonicalization
//!
//! Canonicalization turns any URL into the one string form the remote lists
//! were built from. It either fully succeeds or fails as a whole; callers
//! never see a half-normalized URL.

use std::fmt;

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS, NON_ALPHANUMERIC};

/// Characters escaped in paths and queries: ASCII <= 32, >= 127, and `%`.
/// Non-ASCII is always escaped as UTF-8 bytes.
const PATH_ESCAPE: &AsciiSet = &CONTROLS.add(b' ').add(b'%');

/// Characters escaped in hosts: everything outside `[0-9a-z.-]`.
/// Uppercase never reaches the encoder because hosts are lowercased first.
const HOST_ESCAPE: &AsciiSet = &NON_ALPHANUMERIC.remove(b'.').remove(b'-');

/// Schemes a blacklist URL may carry.
const KNOWN_SCHEMES: [&str; 3] = ["http", "https", "ftp"];

/// Error type for canonicalization. Every variant means "no canonical form".
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CanonicalizeError {
    #[error("Malformed URL: {0}")]
    Malformed(String),
    #[error("Unsupported scheme: {0}")]
    UnsupportedScheme(String),
    #[error("Invalid percent escape")]
    InvalidEscape,
    #[error("Invalid port: {0}")]
    InvalidPort(String),
    #[error("Empty host")]
    EmptyHost,
}

// =============================================================================
// Parsing
// =============================================================================

/// A URL split into the components canonicalization works on.
/// Slices borrow the input; nothing is decoded yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlParts<'a> {
    pub protocol: String,
    pub userinfo: Option<&'a str>,
    pub host: &'a str,
    pub port: Option<u16>,
    pub path: &'a str,
    pub query: Option<&'a str>,
}

/// Split a URL into its components. The fragment is discarded.
pub fn parse_url(url: &str) -> Result<UrlParts<'_>, CanonicalizeError> {
    let url = url.trim();
    let colon = url
        .find(':')
        .ok_or_else(|| CanonicalizeError::Malformed("missing scheme".to_string()))?;

    let scheme = &url[..colon];
    if scheme.is_empty()
        || !scheme.as_bytes()[0].is_ascii_alphabetic()
        || !scheme
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'+' || b == b'-' || b == b'.')
    {
        return Err(CanonicalizeError::Malformed(format!("bad scheme '{}'", scheme)));
    }

    let protocol = scheme.to_ascii_lowercase();
    if !KNOWN_SCHEMES.contains(&protocol.as_str()) {
        return Err(CanonicalizeError::UnsupportedScheme(protocol));
    }

    let rest = url[colon + 1..]
        .strip_prefix("//")
        .ok_or_else(|| CanonicalizeError::Malformed("missing authority".to_string()))?;

    // Drop the fragment before anything else
    let rest = match rest.find('#') {
        Some(pos) => &rest[..pos],
        None => rest,
    };

    let authority_end = rest.find(|c: char| c == '/' || c == '?').unwrap_or(rest.len());
    let authority = &rest[..authority_end];
    let tail = &rest[authority_end..];

    let (path, query) = match tail.find('?') {
        Some(pos) => (&tail[..pos], Some(&tail[pos + 1..])),
        None => (tail, None),
    };

    let (userinfo, host_port) = match authority.rfind('@') {
        Some(pos) => (Some(&authority[..pos]), &authority[pos + 1..]),
        None => (None, authority),
    };

    let (host, port) = split_port(host_port)?;
    if host.is_empty() {
        return Err(CanonicalizeError::EmptyHost);
    }

    Ok(UrlParts {
        protocol,
        userinfo,
        host,
        port,
        path,
        query,
    })
}

/// Separate an optional `:port` suffix. Bracketed IPv6 hosts keep their colons.
fn split_port(host_port: &str) -> Result<(&str, Option<u16>), CanonicalizeError> {
    let search_from = match host_port.rfind(']') {
        Some(pos) => pos,
        None => 0,
    };

    let colon = match host_port[search_from..].rfind(':') {
        Some(pos) => search_from + pos,
        None => return Ok((host_port, None)),
    };

    let host = &host_port[..colon];
    let port_str = &host_port[colon + 1..];
    if port_str.is_empty() {
        return Ok((host, None));
    }

    if !port_str.bytes().all(|b| b.is_ascii_digit()) {
        return Err(CanonicalizeError::InvalidPort(port_str.to_string()));
    }
    let port = port_str
        .parse::<u16>()
        .map_err(|_| CanonicalizeError::InvalidPort(port_str.to_string()))?;

    Ok((host, Some(port)))
}

// =============================================================================
// Escaping
// =============================================================================

/// Check that every `%` is followed by exactly two hex digits.
fn has_valid_escapes(s: &str) -> bool {
    let bytes = s.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            if i + 2 >= bytes.len() {
                return false;
            }
            if !bytes[i + 1].is_ascii_hexdigit() || !bytes[i + 2].is_ascii_hexdigit() {
                return false;
            }
            i += 3;
        } else {
            i += 1;
        }
    }
    true
}

/// Percent-decode repeatedly until no `%` remains.
/// Every pass must see only well-formed escapes. Decoded bytes that are not
/// valid UTF-8 become U+FFFD rather than failing.
pub fn unescape(s: &str) -> Result<String, CanonicalizeError> {
    let mut current = s.to_string();
    while current.contains('%') {
        if !has_valid_escapes(&current) {
            return Err(CanonicalizeError::InvalidEscape);
        }
        current = percent_decode_str(&current).decode_utf8_lossy().into_owned();
    }
    Ok(current)
}

/// Escape once: ASCII <= 32, >= 127 and `%` become `%XX` (space is `%20`).
pub fn escape(s: &str) -> String {
    utf8_percent_encode(s, PATH_ESCAPE).to_string()
}

// =============================================================================
// Canonical URL
// =============================================================================

/// A fully canonicalized URL.
///
/// The rendered string is authoritative. Host, path and query are the
/// components a parser reads back from it, which is what lookup-form
/// generation works on.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CanonicalUrl {
    rendered: String,
    host: String,
    path: String,
    query: Option<String>,
}

impl CanonicalUrl {
    /// The canonical string.
    pub fn as_str(&self) -> &str {
        &self.rendered
    }

    /// Canonical host, without the trailing slash added for empty paths.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Canonical path; `/` when the input had none.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Canonical query without the leading `?`.
    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    pub fn into_string(self) -> String {
        self.rendered
    }
}

impl fmt::Display for CanonicalUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.rendered)
    }
}

impl AsRef<str> for CanonicalUrl {
    fn as_ref(&self) -> &str {
        &self.rendered
    }
}

/// Canonicalize a URL.
pub fn canonicalize(raw: &str) -> Result<CanonicalUrl, CanonicalizeError> {
    let parts = parse_url(raw)?;

    let host = canonical_host(parts.host)?;
    let path = canonical_path(parts.path)?;
    let query = match parts.query {
        Some(q) => Some(escape(&unescape(q)?)),
        None => None,
    };

    let mut rendered = String::with_capacity(raw.len() + 8);
    rendered.push_str(&parts.protocol);
    rendered.push(':');
    if let Some(port) = parts.port {
        rendered.push_str(&port.to_string());
    }
    rendered.push_str("//");
    if let Some(user) = parts.userinfo {
        rendered.push_str(user);
        rendered.push('@');
    }
    rendered.push_str(&host);
    if parts.path.is_empty() {
        rendered.push('/');
    }
    rendered.push_str(&path);
    if let Some(q) = &query {
        rendered.push('?');
        rendered.push_str(q);
    }

    let (host, path, query) = split_rendered(&rendered);
    Ok(CanonicalUrl {
        rendered,
        host,
        path,
        query,
    })
}

/// Read host, path and query back out of a rendered canonical string.
///
/// Escaping leaves decoded `#` and `?` in place, so the string is split the
/// way any URL parser would split it: a `#` starts a fragment (dropped) and
/// the first `?` starts the query.
fn split_rendered(rendered: &str) -> (String, String, Option<String>) {
    let rest = match rendered.find("//") {
        Some(pos) => &rendered[pos + 2..],
        None => rendered,
    };
    let rest = match rest.find('#') {
        Some(pos) => &rest[..pos],
        None => rest,
    };

    let authority_end = rest.find(|c: char| c == '/' || c == '?').unwrap_or(rest.len());
    let authority = &rest[..authority_end];
    let host = match authority.rfind('@') {
        Some(pos) => &authority[pos + 1..],
        None => authority,
    };

    let tail = &rest[authority_end..];
    let (path, query) = match tail.find('?') {
        Some(pos) => (&tail[..pos], Some(&tail[pos + 1..])),
        None => (tail, None),
    };
    let path = if path.is_empty() { "/" } else { path };

    (host.to_string(), path.to_string(), query.map(str::to_string))
}

/// Unescape, lowercase, escape once, then tidy dots.
fn canonical_host(raw: &str) -> Result<String, CanonicalizeError> {
    let lowered = unescape(raw)?.to_lowercase();
    let escaped = utf8_percent_encode(&lowered, HOST_ESCAPE).to_string();

    let trimmed = escaped.trim_matches('.');
    let mut host = String::with_capacity(trimmed.len());
    let mut prev_dot = false;
    for c in trimmed.chars() {
        if c == '.' {
            if prev_dot {
                continue;
            }
            prev_dot = true;
        } else {
            prev_dot = false;
        }
        host.push(c);
    }

    if host.is_empty() {
        return Err(CanonicalizeError::EmptyHost);
    }
    Ok(host)
}

/// Unescape, collapse slashes, drop `/./`, resolve `/../`, escape once.
fn canonical_path(raw: &str) -> Result<String, CanonicalizeError> {
    let mut path = unescape(raw)?;

    while let Some(p) = path.find("//") {
        path.replace_range(p..p + 1, "");
    }

    while let Some(p) = path.find("/./") {
        path.replace_range(p..p + 2, "");
    }

    while let Some(p) = path.find("/../") {
        // Without a preceding segment the `/..` is simply dropped
        let prev = path[..p].rfind('/').unwrap_or(0);
        path.replace_range(prev..p + 3, "");
    }

    Ok(escape(&path))
}
