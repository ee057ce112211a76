//! Operator commands that do not touch the remote feed.

use sb_core::{canonicalize, fingerprint, CandidateForms, ListType};
use sb_store::{BlacklistStore, ListStatus, SqliteStore, StoreConfig};

pub fn cmd_init(config: &StoreConfig) -> Result<(), String> {
    crate::open_store(config)?;
    println!("Initialized {}", config.path.display());
    Ok(())
}

pub fn cmd_canonicalize(url: &str) -> Result<(), String> {
    let canonical = canonicalize(url).map_err(|e| format!("Cannot canonicalize '{}': {}", url, e))?;
    println!("{}", canonical);
    Ok(())
}

pub fn cmd_forms(url: &str) -> Result<(), String> {
    let canonical = canonicalize(url).map_err(|e| format!("Cannot canonicalize '{}': {}", url, e))?;
    let forms = CandidateForms::new(&canonical);

    println!("Canonical: {}", canonical);
    println!("Forms:     {}", forms.total());
    for form in forms {
        println!("  {}  {}", fingerprint(&form), form);
    }
    Ok(())
}

pub fn cmd_status(config: &StoreConfig, json: bool) -> Result<(), String> {
    let store = crate::open_store(config)?;
    let statuses = collect_status(&store)?;

    if json {
        let out = serde_json::to_string_pretty(&statuses)
            .map_err(|e| format!("Failed to encode status: {}", e))?;
        println!("{}", out);
        return Ok(());
    }

    println!("Store: {}", config.path.display());
    println!("{:<9} {:>8} {:>10} {:>10} {:>6}", "list", "version", "active", "archived", "syncs");
    for s in &statuses {
        println!(
            "{:<9} {:>8} {:>10} {:>10} {:>6}",
            s.list.name(),
            s.local_version,
            s.active,
            s.archived,
            s.log_rows
        );
    }
    Ok(())
}

fn collect_status(store: &SqliteStore) -> Result<Vec<ListStatus>, String> {
    ListType::ALL
        .into_iter()
        .map(|list| {
            store
                .status(list)
                .map_err(|e| format!("Failed to read status of {}: {}", list, e))
        })
        .collect()
}
