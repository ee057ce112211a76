//! URL checks against the local mirror.

use std::fs;
use std::path::Path;

use sb_core::ListType;
use sb_store::{BlacklistStore, QueryEngine, StoreConfig, StoreError};

pub fn cmd_check(config: &StoreConfig, urls: &[String], lists: &[ListType]) -> Result<(), String> {
    let engine = QueryEngine::new(crate::open_store(config)?);

    for url in urls {
        println!("URL: {}", url);
        for &list in lists {
            let active = engine
                .is_active(url, list)
                .map_err(|e| format!("Lookup failed for '{}': {}", url, e))?;
            println!("  {:<9} {}", list.name(), if active { "LISTED" } else { "clean" });
        }
    }

    Ok(())
}

pub fn cmd_batch(config: &StoreConfig, input: &Path) -> Result<(), String> {
    let text = fs::read_to_string(input)
        .map_err(|e| format!("Failed to read {}: {}", input.display(), e))?;
    let engine = QueryEngine::new(crate::open_store(config)?);

    let hits = batch_hits(&engine, &text).map_err(|e| format!("Lookup failed: {}", e))?;
    for hit in hits {
        println!("{}", hit);
    }
    Ok(())
}

/// `url,list` for every (URL, list) pair that is active. Blank lines are
/// ignored; URLs keep input order.
fn batch_hits<S: BlacklistStore>(engine: &QueryEngine<S>, text: &str) -> Result<Vec<String>, StoreError> {
    let mut hits = Vec::new();
    for url in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        for list in engine.active_lists(url)? {
            hits.push(format!("{},{}", url, list));
        }
    }
    Ok(hits)
}

#[cfg(test)]
mod tests {
    use sb_core::{fingerprint, EntryChange};
    use sb_store::SqliteStore;

    use super::*;

    fn engine() -> QueryEngine<SqliteStore> {
        let mut store = SqliteStore::open_in_memory().unwrap();
        store
            .apply_changes(
                ListType::Phishing,
                1,
                &[EntryChange::Add(fingerprint("phish.example/"))],
                1,
            )
            .unwrap();
        store
            .apply_changes(
                ListType::Malware,
                1,
                &[
                    EntryChange::Add(fingerprint("bad.example/dl/")),
                    EntryChange::Add(fingerprint("phish.example/")),
                ],
                1,
            )
            .unwrap();
        QueryEngine::new(store)
    }

    #[test]
    fn batch_reports_each_active_list() {
        let input = "http://phish.example/login\n\n  http://bad.example/dl/x.exe  \nhttp://fine.example/\n";
        assert_eq!(
            batch_hits(&engine(), input).unwrap(),
            vec![
                "http://phish.example/login,phishing",
                "http://phish.example/login,malware",
                "http://bad.example/dl/x.exe,malware",
            ]
        );
    }

    #[test]
    fn batch_skips_unparseable_urls() {
        assert!(batch_hits(&engine(), "not a url\nhttp://phish.example/%zz\n")
            .unwrap()
            .is_empty());
    }

    #[test]
    fn batch_missing_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let config = StoreConfig::new(dir.path().join("mirror.sqlite3"));
        let err = cmd_batch(&config, &dir.path().join("missing.txt")).unwrap_err();
        assert!(err.starts_with("Failed to read"));
    }
}
