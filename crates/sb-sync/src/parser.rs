use log::warn;

use sb_core::{hash::is_fingerprint, EntryChange};

/// Major protocol version requested from, and echoed by, the remote feed.
pub const MAJOR_VERSION: u32 = 1;

/// Error type for diff parsing. Both variants abort the run.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DiffError {
    #[error("Remote requested a full list flush, which is not supported: {0}")]
    FullFlushRequested(String),
    #[error("Invalid diff header: {0}")]
    InvalidHeader(String),
}

/// Parsed `[<name> <major>.<version> update]` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffHeader {
    pub list_name: String,
    pub major: u32,
    pub version: i64,
}

/// A parsed, non-empty diff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffUpdate {
    pub header: DiffHeader,
    /// Changes in feed order
    pub changes: Vec<EntryChange>,
    /// Lines that were neither a valid addition nor a valid removal
    pub skipped: usize,
}

/// Parse a diff body. `Ok(None)` means the body was empty, i.e. the local
/// copy is already current.
pub fn parse_diff(text: &str) -> Result<Option<DiffUpdate>, DiffError> {
    let mut lines = text.lines().map(str::trim).filter(|l| !l.is_empty());

    let header = match lines.next() {
        Some(line) => parse_header(line)?,
        None => return Ok(None),
    };

    let mut changes = Vec::new();
    let mut skipped = 0usize;
    for line in lines {
        match parse_change_line(line) {
            Some(change) => changes.push(change),
            None => {
                warn!("Skipping diff line '{}'", line);
                skipped += 1;
            }
        }
    }

    Ok(Some(DiffUpdate {
        header,
        changes,
        skipped,
    }))
}

/// Parse the header line, e.g. `[goog-black-hash 1.372 update]`.
pub fn parse_header(line: &str) -> Result<DiffHeader, DiffError> {
    let line = line.trim();
    if !line.contains("update") {
        return Err(DiffError::FullFlushRequested(line.to_string()));
    }

    let inner = line.trim_start_matches('[').trim_end_matches(']');
    let mut tokens = inner.split_whitespace();

    let list_name = tokens
        .next()
        .ok_or_else(|| DiffError::InvalidHeader(line.to_string()))?;
    let version_token = tokens
        .next()
        .ok_or_else(|| DiffError::InvalidHeader(line.to_string()))?
        .trim_end_matches(']');

    let (major, minor) = version_token
        .split_once('.')
        .ok_or_else(|| DiffError::InvalidHeader(line.to_string()))?;
    let major = major
        .parse::<u32>()
        .map_err(|_| DiffError::InvalidHeader(line.to_string()))?;
    let version = minor
        .parse::<i64>()
        .map_err(|_| DiffError::InvalidHeader(line.to_string()))?;

    Ok(DiffHeader {
        list_name: list_name.to_string(),
        major,
        version,
    })
}

fn parse_change_line(line: &str) -> Option<EntryChange> {
    let mut chars = line.chars();
    let op = chars.next()?;
    let hash = chars.as_str().trim().to_ascii_lowercase();
    if !is_fingerprint(&hash) {
        return None;
    }

    match op {
        '+' => Some(EntryChange::Add(hash)),
        '-' => Some(EntryChange::Remove(hash)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const H1: &str = "00386acdf6010e6472b3e34b2f8f0872";
    const H2: &str = "d41d8cd98f00b204e9800998ecf8427e";

    #[test]
    fn parses_header_version() {
        let header = parse_header("[goog-black-hash 1.372 update]").unwrap();
        assert_eq!(
            header,
            DiffHeader {
                list_name: "goog-black-hash".to_string(),
                major: 1,
                version: 372,
            }
        );
    }

    #[test]
    fn header_without_update_is_full_flush() {
        assert!(matches!(
            parse_header("[goog-black-hash 1.372]"),
            Err(DiffError::FullFlushRequested(_))
        ));
    }

    #[test]
    fn malformed_headers_are_rejected() {
        for line in ["[update]", "[goog-black-hash 1 update]", "[goog-black-hash 1.x update]"] {
            assert!(
                matches!(parse_header(line), Err(DiffError::InvalidHeader(_))),
                "accepted {:?}",
                line
            );
        }
    }

    #[test]
    fn empty_body_is_up_to_date() {
        assert_eq!(parse_diff(""), Ok(None));
        assert_eq!(parse_diff("\n  \n"), Ok(None));
    }

    #[test]
    fn parses_changes_in_order() {
        let body = format!("\n[goog-malware-hash 1.15 update]\n+{H1}\n\n  -{H2}  \n+{H1}\n");
        let diff = parse_diff(&body).unwrap().unwrap();

        assert_eq!(diff.header.version, 15);
        assert_eq!(
            diff.changes,
            vec![
                EntryChange::Add(H1.to_string()),
                EntryChange::Remove(H2.to_string()),
                EntryChange::Add(H1.to_string()),
            ]
        );
        assert_eq!(diff.skipped, 0);
    }

    #[test]
    fn skips_unknown_lines() {
        let body = format!("[goog-black-hash 1.2 update]\n*{H1}\n+nothex\n+{}\n", H1.to_uppercase());
        let diff = parse_diff(&body).unwrap().unwrap();
        assert_eq!(diff.changes, vec![EntryChange::Add(H1.to_string())]);
        assert_eq!(diff.skipped, 2);
    }

    #[test]
    fn full_flush_header_fails_whole_diff() {
        let body = format!("[goog-black-hash 1.372]\n+{H1}\n");
        assert!(matches!(parse_diff(&body), Err(DiffError::FullFlushRequested(_))));
    }
}
