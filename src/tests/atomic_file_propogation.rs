#[cfg(test)]
mod tests {
    use std::fs;
    use std::os::unix::fs::PermissionsExt;

    use chrono::{TimeDelta, Utc};
    use serde_json::Value;

    use crate::credentials::{CredentialEntry, CredentialSet};
    use crate::parser::payload::decode_expiry;
    use crate::sinks::manager::{SinkKind, SinkManager};
    use crate::sinks::sink_file::FileSink;
    use crate::tests::common::token_expiring_at;

    fn credentials() -> CredentialSet {
        let exp = Utc::now() + TimeDelta::hours(1);
        ["a.azurecr.io", "b.azurecr.io"]
            .into_iter()
            .map(|server| CredentialEntry::build(server, token_expiring_at(exp), decode_expiry))
            .collect()
    }

    #[tokio::test]
    async fn atomic_write_and_permissions() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join(".docker").join("config.json");

        let sink = FileSink::new(&path);
        sink.write(br#"{"auths":{}}"#).await.expect("write");

        let got = fs::read_to_string(&path).expect("read file");
        assert_eq!(got, r#"{"auths":{}}"#, "file content mismatch");

        let mode = fs::metadata(&path).expect("meta").permissions().mode() & 0o777;
        assert_eq!(mode, 0o600, "permissions mismatch (expected 0600)");

        // no temp file left next to the destination
        let leftovers: Vec<_> = fs::read_dir(path.parent().unwrap())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[tokio::test]
    async fn rewrite_replaces_previous_document() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.json");
        fs::write(&path, "stale").unwrap();

        let sinks = SinkManager::new(vec![SinkKind::File(FileSink::new(&path))]);
        let report = sinks.publish(&credentials()).await;
        assert_eq!(report.succeeded.len(), 1);

        let doc: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        let auths = doc["auths"].as_object().unwrap();
        assert_eq!(auths.keys().collect::<Vec<_>>(), vec!["a.azurecr.io", "b.azurecr.io"]);
    }

    #[tokio::test]
    async fn failing_sink_does_not_block_the_others() {
        let dir = tempfile::tempdir().expect("tempdir");
        // a regular file where a directory is expected
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "x").unwrap();
        let broken = blocker.join("config.json");
        let good = dir.path().join("config.json");

        let sinks = SinkManager::new(vec![
            SinkKind::File(FileSink::new(&broken)),
            SinkKind::File(FileSink::new(&good)),
        ]);
        let report = sinks.publish(&credentials()).await;

        assert_eq!(report.failed, vec![format!("file:{}", broken.display())]);
        assert_eq!(report.succeeded, vec![format!("file:{}", good.display())]);
        assert!(good.exists());
    }

    #[tokio::test]
    async fn no_sinks_is_not_an_error() {
        let report = SinkManager::new(Vec::new()).publish(&credentials()).await;
        assert!(report.succeeded.is_empty());
        assert!(report.failed.is_empty());
    }
}
