use std::time::Duration;

use sb_core::ListType;
use sb_store::StoreConfig;
use sb_sync::{FeedConfig, HttpFeed, SyncOutcome, Updater};

pub struct SyncOptions {
    pub store: StoreConfig,
    /// One list, or every list when `None`
    pub list: Option<ListType>,
    pub api_key: String,
    pub feed_url: String,
    pub timeout: Duration,
    pub json: bool,
}

pub fn run_sync(opts: SyncOptions) -> Result<(), String> {
    if opts.api_key.trim().is_empty() {
        return Err("An API key is required (--api-key or SBMIRROR_API_KEY)".to_string());
    }

    let store = crate::open_store(&opts.store)?;
    let feed = HttpFeed::new(FeedConfig {
        base_url: opts.feed_url,
        api_key: opts.api_key,
        timeout: opts.timeout,
    })
    .map_err(|e| format!("Failed to set up feed: {}", e))?;
    let mut updater = Updater::new(store, feed);

    let results = match opts.list {
        Some(list) => updater.sync_lists(&[list]),
        None => updater.sync_all(),
    };

    let mut failed = Vec::new();
    for (list, result) in results {
        match result {
            Ok(outcome) => println!("{}", render_outcome(&outcome, opts.json)?),
            Err(_) => failed.push(list.name()),
        }
    }

    if failed.is_empty() {
        Ok(())
    } else {
        Err(format!("Sync failed for: {}", failed.join(", ")))
    }
}

fn render_outcome(outcome: &SyncOutcome, json: bool) -> Result<String, String> {
    if json {
        return serde_json::to_string(outcome).map_err(|e| format!("Failed to encode report: {}", e));
    }

    Ok(match outcome {
        SyncOutcome::UpToDate { list, version } => {
            format!("{:<9} up to date at version {}", list.name(), version)
        }
        SyncOutcome::Applied(report) => format!(
            "{:<9} {} -> {}: +{} -{} ({} archived, {} skipped)",
            report.list.name(),
            report.previous_version,
            report.version,
            report.additions,
            report.removals,
            report.archived,
            report.skipped_lines
        ),
    })
}

#[cfg(test)]
mod tests {
    use sb_sync::SyncReport;

    use super::*;

    fn applied() -> SyncOutcome {
        SyncOutcome::Applied(SyncReport {
            list: ListType::Malware,
            previous_version: 10,
            version: 12,
            additions: 3,
            removals: 1,
            archived: 1,
            skipped_lines: 0,
            processed_ts: 1_000,
        })
    }

    #[test]
    fn text_report() {
        assert_eq!(
            render_outcome(&applied(), false).unwrap(),
            "malware   10 -> 12: +3 -1 (1 archived, 0 skipped)"
        );
        let up_to_date = SyncOutcome::UpToDate {
            list: ListType::Phishing,
            version: -1,
        };
        assert_eq!(
            render_outcome(&up_to_date, false).unwrap(),
            "phishing  up to date at version -1"
        );
    }

    #[test]
    fn json_report_is_tagged() {
        let value: serde_json::Value =
            serde_json::from_str(&render_outcome(&applied(), true).unwrap()).unwrap();
        assert_eq!(value["outcome"], "applied");
        assert_eq!(value["list"], "malware");
        assert_eq!(value["version"], 12);
    }

    #[test]
    fn missing_api_key_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let result = run_sync(SyncOptions {
            store: StoreConfig::new(dir.path().join("mirror.sqlite3")),
            list: None,
            api_key: "  ".to_string(),
            feed_url: "http://feed.test/update".to_string(),
            timeout: Duration::from_secs(1),
            json: false,
        });
        assert!(result.unwrap_err().contains("API key"));
        assert!(!dir.path().join("mirror.sqlite3").exists());
    }

    #[test]
    fn unreachable_feed_fails_every_list() {
        let dir = tempfile::tempdir().unwrap();
        let port = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();

        let err = run_sync(SyncOptions {
            store: StoreConfig::new(dir.path().join("mirror.sqlite3")),
            list: None,
            api_key: "KEY".to_string(),
            feed_url: format!("http://127.0.0.1:{}/update", port),
            timeout: Duration::from_secs(2),
            json: false,
        })
        .unwrap_err();
        assert_eq!(err, "Sync failed for: phishing, malware");
    }
}
