//! Integration tests for the backup archive

mod common;

use chrono::{Duration, Utc};
use common::{sample_flows, Fixture};
use flowkeeper_backup::{BackupError, HealthThresholds, IndexConfig, DEFAULT_REASON};
use serde_json::json;
use std::sync::Arc;

#[tokio::test]
async fn test_create_records_metadata() {
    let fx = Fixture::new(10, true);

    let entry = fx
        .manager
        .create(Some("daily"), Some("Before deploy"))
        .await
        .unwrap();

    assert_eq!(entry.name, "daily");
    assert_eq!(entry.reason, "Before deploy");
    assert_eq!(entry.flows_count, 2);
    assert_eq!(entry.nodes_count, 4);
    assert_eq!(entry.filename, "daily.json");
    assert_eq!(entry.checksum.len(), 64);
    assert!(entry.size > 0);
    assert!(fx.snapshot_path("daily").exists());
}

#[tokio::test]
async fn test_create_defaults_name_and_reason() {
    let fx = Fixture::new(10, true);

    let entry = fx.manager.create(None, None).await.unwrap();
    assert!(entry.name.starts_with("backup_"), "got {}", entry.name);
    assert_eq!(entry.reason, DEFAULT_REASON);

    let blank = fx.manager.create(Some("blank"), Some("   ")).await.unwrap();
    assert_eq!(blank.reason, DEFAULT_REASON);
}

#[tokio::test]
async fn test_round_trip_payload() {
    let fx = Fixture::new(10, true);
    let at_creation = fx.flows.current();

    let entry = fx.manager.create(Some("rt"), Some("round trip")).await.unwrap();
    fx.flows.set(sample_flows("Changed later"));

    let record = fx.manager.fetch(&entry.name).await.unwrap();
    assert_eq!(record.flows.to_value(), at_creation);
    assert_eq!(record.metadata.checksum, entry.checksum);
    assert_eq!(record.metadata.reason, "round trip");
}

#[tokio::test]
async fn test_duplicate_name_rejected() {
    let fx = Fixture::new(10, true);
    let first = fx.manager.create(Some("daily"), None).await.unwrap();
    let original = fx.manager.fetch("daily").await.unwrap();

    fx.flows.set(sample_flows("Different"));
    let err = fx.manager.create(Some("daily"), None).await.unwrap_err();
    assert!(matches!(err, BackupError::DuplicateName { .. }));

    let after = fx.manager.fetch("daily").await.unwrap();
    assert_eq!(after, original);
    assert_eq!(after.metadata.checksum, first.checksum);
    assert_eq!(fx.manager.list(false).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_reserved_name_rejected_any_case() {
    let fx = Fixture::new(10, true);
    for name in ["Latest", "latest", "LATEST", "Current", "temp", "Backup"] {
        let err = fx.manager.create(Some(name), None).await.unwrap_err();
        assert!(matches!(err, BackupError::InvalidName { .. }), "{}", name);
    }
    assert!(fx.manager.list(false).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_invalid_name_pattern_rejected() {
    let fx = Fixture::new(10, true);
    let err = fx.manager.create(Some("../escape"), None).await.unwrap_err();
    assert_eq!(err.code(), "InvalidName");
    let err = fx.manager.fetch("../escape").await.unwrap_err();
    assert_eq!(err.code(), "InvalidName");
}

#[tokio::test]
async fn test_capacity_evicts_oldest() {
    let fx = Fixture::new(3, true);
    for name in ["b1", "b2", "b3", "b4", "b5"] {
        fx.manager.create(Some(name), None).await.unwrap();
    }

    let names: Vec<_> = fx
        .manager
        .list(false)
        .await
        .unwrap()
        .into_iter()
        .map(|v| v.name)
        .collect();
    assert_eq!(names, vec!["b5", "b4", "b3"]);
    assert!(!fx.snapshot_path("b1").exists());
    assert!(!fx.snapshot_path("b2").exists());
    assert!(fx.snapshot_path("b3").exists());

    let index = fx.manager.index().load().await.unwrap();
    assert_eq!(index.len(), 3);
}

#[tokio::test]
async fn test_capacity_ignored_without_auto_cleanup() {
    let fx = Fixture::new(2, false);
    for name in ["b1", "b2", "b3"] {
        fx.manager.create(Some(name), None).await.unwrap();
    }
    assert_eq!(fx.manager.list(false).await.unwrap().len(), 3);
    assert!(fx.snapshot_path("b1").exists());
}

#[tokio::test]
async fn test_list_order_and_detail() {
    let fx = Fixture::new(10, true);
    for name in ["first", "second", "third"] {
        fx.manager.create(Some(name), None).await.unwrap();
    }

    let compact = fx.manager.list(false).await.unwrap();
    assert!(compact[0].is_latest);
    assert!(compact[1..].iter().all(|v| !v.is_latest));
    assert!(compact.windows(2).all(|w| w[0].timestamp >= w[1].timestamp));
    assert!(compact
        .iter()
        .all(|v| v.size.is_none() && v.flows_count.is_none() && v.nodes_count.is_none()));

    let detailed = fx.manager.list(true).await.unwrap();
    assert_eq!(detailed[0].name, "third");
    assert!(detailed[0].is_latest);
    assert!(detailed.windows(2).all(|w| w[0].timestamp >= w[1].timestamp));
    assert!(detailed
        .iter()
        .all(|v| v.size.is_some() && v.flows_count == Some(2) && v.nodes_count == Some(4)));
}

#[tokio::test]
async fn test_tampered_payload_is_corrupted_but_listable() {
    let fx = Fixture::new(10, true);
    fx.manager.create(Some("daily"), None).await.unwrap();

    let path = fx.snapshot_path("daily");
    let mut raw = fx.read_json(&path);
    raw["flows"][3]["repeat"] = json!("5");
    fx.write_json(&path, &raw);

    let err = fx.manager.fetch("daily").await.unwrap_err();
    assert!(matches!(err, BackupError::Corrupted { .. }), "got {:?}", err);

    let listed = fx.manager.list(true).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].name, "daily");
}

#[tokio::test]
async fn test_undecodable_snapshot_is_corrupted() {
    let fx = Fixture::new(10, true);
    fx.manager.create(Some("daily"), None).await.unwrap();
    std::fs::write(fx.snapshot_path("daily"), "{\"metadata\": truncated").unwrap();

    let err = fx.manager.fetch("daily").await.unwrap_err();
    assert_eq!(err.code(), "Corrupted");
}

#[tokio::test]
async fn test_rewritten_checksum_still_caught_by_index() {
    let fx = Fixture::new(10, true);
    fx.manager.create(Some("daily"), None).await.unwrap();

    let path = fx.snapshot_path("daily");
    let mut raw = fx.read_json(&path);
    raw["flows"] = json!([]);
    raw["metadata"]["checksum"] =
        json!("4f53cda18c2baa0c0354bb5f9a3ecbe5ed12ab4d8e11ba873c2f11161202b945");
    fx.write_json(&path, &raw);

    let err = fx.manager.fetch("daily").await.unwrap_err();
    assert!(err.to_string().contains("does not match the index"));
}

#[tokio::test]
async fn test_fetch_missing_is_not_found() {
    let fx = Fixture::new(10, true);
    let err = fx.manager.fetch("nothing-here").await.unwrap_err();
    assert!(matches!(err, BackupError::NotFound { .. }));
}

#[tokio::test]
async fn test_source_failure_leaves_no_entry() {
    let fx = Fixture::new(10, true);
    fx.flows.set_offline(true);

    let err = fx.manager.create(Some("daily"), None).await.unwrap_err();
    assert_eq!(err.code(), "IOFailure");
    assert!(fx.manager.list(false).await.unwrap().is_empty());
    assert!(!fx.snapshot_path("daily").exists());
}

#[tokio::test]
async fn test_invalid_payload_rejected() {
    let fx = Fixture::new(10, true);
    fx.flows.set(json!({"flows": []}));

    let err = fx.manager.create(Some("daily"), None).await.unwrap_err();
    assert!(matches!(err, BackupError::InvalidPayload(_)));
    assert!(fx.manager.list(false).await.unwrap().is_empty());
    assert!(!fx.snapshot_path("daily").exists());
}

#[tokio::test]
async fn test_delete_backup() {
    let fx = Fixture::new(10, true);
    fx.manager.create(Some("keep"), None).await.unwrap();
    fx.manager.create(Some("drop"), None).await.unwrap();

    let removed = fx.manager.delete("drop").await.unwrap();
    assert_eq!(removed.name, "drop");
    assert!(!fx.snapshot_path("drop").exists());

    let names: Vec<_> = fx
        .manager
        .list(false)
        .await
        .unwrap()
        .into_iter()
        .map(|v| v.name)
        .collect();
    assert_eq!(names, vec!["keep"]);

    let err = fx.manager.delete("drop").await.unwrap_err();
    assert!(matches!(err, BackupError::NotFound { .. }));
}

#[tokio::test]
async fn test_restore_with_safety_backup() {
    let fx = Fixture::new(10, true);
    let original = fx.flows.current();
    fx.manager.create(Some("v1"), None).await.unwrap();

    let edited = sample_flows("Edited");
    fx.flows.set(edited.clone());

    let outcome = fx
        .manager
        .restore("v1", fx.flows.as_ref(), true)
        .await
        .unwrap();
    assert_eq!(fx.flows.current(), original);
    assert_eq!(outcome.restored.name, "v1");
    assert_eq!(outcome.elements, 7);

    let safety = outcome.safety_backup.expect("safety backup taken");
    assert!(safety.name.starts_with("pre_restore_"));
    assert!(safety.reason.contains("v1"));
    let saved = fx.manager.fetch(&safety.name).await.unwrap();
    assert_eq!(saved.flows.to_value(), edited);
}

#[tokio::test]
async fn test_restore_without_safety_backup() {
    let fx = Fixture::new(10, true);
    fx.manager.create(Some("v1"), None).await.unwrap();
    fx.flows.set(json!([]));

    let outcome = fx
        .manager
        .restore("v1", fx.flows.as_ref(), false)
        .await
        .unwrap();
    assert!(outcome.safety_backup.is_none());
    assert_eq!(fx.manager.list(false).await.unwrap().len(), 1);
    assert_eq!(fx.flows.current(), sample_flows("Flow 1"));
}

#[tokio::test]
async fn test_restore_refuses_corrupted_snapshot() {
    let fx = Fixture::new(10, true);
    fx.manager.create(Some("v1"), None).await.unwrap();
    let path = fx.snapshot_path("v1");
    let mut raw = fx.read_json(&path);
    raw["flows"][0]["label"] = json!("tampered");
    fx.write_json(&path, &raw);

    fx.flows.set(json!([{"id": "live", "type": "tab"}]));
    let err = fx
        .manager
        .restore("v1", fx.flows.as_ref(), true)
        .await
        .unwrap_err();
    assert_eq!(err.code(), "Corrupted");
    assert_eq!(fx.flows.current(), json!([{"id": "live", "type": "tab"}]));
    assert_eq!(fx.manager.list(false).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_stored_config_survives_reopen() {
    let fx = Fixture::new(2, true);
    fx.manager.create(Some("b1"), None).await.unwrap();

    let reopened = fx.reopen(10, true);
    for name in ["b2", "b3"] {
        reopened.create(Some(name), None).await.unwrap();
    }
    // Stored capacity of 2 still applies
    assert_eq!(reopened.list(false).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_migrate_config_prunes() {
    let fx = Fixture::new(10, true);
    for name in ["b1", "b2", "b3", "b4", "b5"] {
        fx.manager.create(Some(name), None).await.unwrap();
    }

    let outcome = fx
        .manager
        .migrate_config(IndexConfig {
            max_backups: 2,
            auto_cleanup: true,
        })
        .await
        .unwrap();
    assert_eq!(outcome.previous.max_backups, 10);
    assert_eq!(outcome.current.max_backups, 2);
    assert_eq!(outcome.evicted, vec!["b3", "b2", "b1"]);

    let names: Vec<_> = fx
        .manager
        .list(false)
        .await
        .unwrap()
        .into_iter()
        .map(|v| v.name)
        .collect();
    assert_eq!(names, vec!["b5", "b4"]);
    assert!(!fx.snapshot_path("b1").exists());

    let err = fx
        .manager
        .migrate_config(IndexConfig {
            max_backups: 0,
            auto_cleanup: true,
        })
        .await
        .unwrap_err();
    assert_eq!(err.code(), "InvalidConfig");
}

#[tokio::test]
async fn test_concurrent_creates_keep_every_entry() {
    let fx = Fixture::new(20, true);
    let manager = Arc::new(fx.reopen(20, true));

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let manager = manager.clone();
            tokio::spawn(async move { manager.create(Some(&format!("c{}", i)), None).await })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let index = fx.manager.index().load().await.unwrap();
    assert_eq!(index.len(), 8);
}

#[tokio::test]
async fn test_health_empty_archive() {
    let fx = Fixture::new(10, true);

    let report = fx.manager.health().await;
    assert!(!report.healthy);
    assert_eq!(report.backup_count, 0);
    assert!(report
        .recommendations
        .iter()
        .any(|r| r.contains("first backup")));
}

#[tokio::test]
async fn test_health_after_first_backup() {
    let fx = Fixture::new(10, true);
    fx.manager.create(Some("daily"), None).await.unwrap();

    let report = fx.manager.health().await;
    assert!(report.healthy, "{:?}", report.issues);
    assert!(report.issues.is_empty(), "{:?}", report.issues);
    assert_eq!(report.backup_count, 1);
    assert_eq!(report.latest_backup.as_deref(), Some("daily"));
    assert_eq!(report.latest_age_minutes, Some(0));
    assert!(report.total_size_bytes > 0);
}

#[tokio::test]
async fn test_health_detects_corruption_and_missing_files() {
    let fx = Fixture::new(10, true);
    for name in ["ok", "tampered", "gone"] {
        fx.manager.create(Some(name), None).await.unwrap();
    }

    let path = fx.snapshot_path("tampered");
    let mut raw = fx.read_json(&path);
    raw["flows"][0]["label"] = json!("edited by hand");
    fx.write_json(&path, &raw);
    std::fs::remove_file(fx.snapshot_path("gone")).unwrap();

    let report = fx.manager.health().await;
    assert!(!report.healthy);
    assert_eq!(report.corrupted_count, 1);
    assert_eq!(report.missing_count, 1);
    assert!(report.issues.iter().any(|i| i.contains("corrupted")));
    assert!(report.issues.iter().any(|i| i.contains("missing")));
}

#[tokio::test]
async fn test_health_advisories_do_not_flip_healthy() {
    let fx = Fixture::new(3, true);
    for name in ["b1", "b2", "b3"] {
        fx.manager.create(Some(name), None).await.unwrap();
    }

    let index_path = fx.paths.metadata_file.clone();
    let mut raw = fx.read_json(&index_path);
    let two_days_ago = Utc::now() - Duration::days(2);
    for backup in raw["backups"].as_array_mut().unwrap() {
        backup["timestamp"] = json!(two_days_ago);
    }
    fx.write_json(&index_path, &raw);

    let report = fx.manager.health().await;
    assert!(report.healthy, "{:?}", report.issues);
    assert!(report.issues.iter().any(|i| i.contains("hours old")));
    assert!(report.issues.iter().any(|i| i.contains("approaching the limit")));
}

#[tokio::test]
async fn test_health_adopts_orphaned_snapshot() {
    let fx = Fixture::new(10, true);
    fx.manager.create(Some("kept"), None).await.unwrap();
    fx.manager.create(Some("orphan"), None).await.unwrap();

    // Simulate a crash between the snapshot write and the index write
    let index_path = fx.paths.metadata_file.clone();
    let mut raw = fx.read_json(&index_path);
    raw["backups"]
        .as_array_mut()
        .unwrap()
        .retain(|b| b["name"] != "orphan");
    fx.write_json(&index_path, &raw);
    std::fs::write(fx.paths.backup_dir.join("junk.json"), "not a snapshot").unwrap();

    let report = fx.manager.health().await;
    assert!(report.healthy, "{:?}", report.issues);
    assert_eq!(report.adopted_orphans, vec!["orphan"]);
    assert_eq!(report.backup_count, 2);
    assert!(report.issues.iter().any(|i| i.contains("'junk'")));
    assert!(fx.paths.backup_dir.join("junk.json").exists());

    let record = fx.manager.fetch("orphan").await.unwrap();
    assert_eq!(record.metadata.name, "orphan");
}

#[tokio::test]
async fn test_health_reports_config_drift() {
    let fx = Fixture::new(5, true);
    fx.manager.create(Some("daily"), None).await.unwrap();

    let reopened = fx.reopen(8, false);
    let report = reopened.health().await;
    assert!(report.healthy);
    assert_eq!(report.max_backups, 5);
    assert!(report.issues.iter().any(|i| i.contains("differ from configuration")));
}

#[tokio::test]
async fn test_lazy_initialization_layout() {
    let fx = Fixture::new(4, false);
    assert!(!fx.paths.backup_dir.exists());

    fx.manager.list(false).await.unwrap();
    let raw = fx.read_json(&fx.paths.metadata_file);
    assert_eq!(raw["version"], "1.0.0");
    assert_eq!(raw["config"]["maxBackups"], 4);
    assert_eq!(raw["config"]["autoCleanup"], false);
    assert_eq!(raw["backups"], json!([]));
}

#[tokio::test]
async fn test_float_fields_verify_after_fetch() {
    let fx = Fixture::new(500, true);

    let mut values = vec![1.1362275116276523e-8, 1.079907802215119e-66, 0.1 + 0.2, -2.5e300];
    let mut state: u64 = 0x9E37_79B9_7F4A_7C15;
    while values.len() < 150 {
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        let value = f64::from_bits(state);
        if value.is_finite() {
            values.push(value);
        }
    }

    for (i, x) in values.iter().enumerate() {
        let flows = json!([
            {"id": "t1", "type": "tab", "label": "Geo"},
            {"id": "n", "type": "inject", "z": "t1", "x": x, "y": 0.1 + 0.2}
        ]);
        fx.flows.set(flows.clone());
        let name = format!("f{}", i);
        fx.manager.create(Some(&name), None).await.unwrap();

        let record = fx
            .manager
            .fetch(&name)
            .await
            .unwrap_or_else(|e| panic!("{} with x = {:e}: {}", name, x, e));
        assert_eq!(record.flows.to_value(), flows);
    }

    let report = fx.manager.health().await;
    assert_eq!(report.corrupted_count, 0, "{:?}", report.issues);
}

#[tokio::test]
async fn test_eviction_survives_undeletable_file() {
    let fx = Fixture::new(1, true);
    fx.manager.create(Some("old"), None).await.unwrap();

    // A non-empty directory in place of the snapshot file cannot be removed
    let blocked = fx.snapshot_path("old");
    std::fs::remove_file(&blocked).unwrap();
    std::fs::create_dir(&blocked).unwrap();
    std::fs::write(blocked.join("keep"), "x").unwrap();

    let entry = fx.manager.create(Some("new"), None).await.unwrap();
    assert_eq!(entry.name, "new");

    let index = fx.manager.index().load().await.unwrap();
    let names: Vec<_> = index.backups.iter().map(|b| b.name.as_str()).collect();
    assert_eq!(names, vec!["new"]);
    assert!(blocked.is_dir());
    assert!(fx.snapshot_path("new").exists());
}

#[tokio::test]
async fn test_health_size_advisory() {
    let fx = Fixture::new(10, true);
    fx.flows.set(json!([
        {"id": "t1", "type": "tab", "label": "Big"},
        {"id": "n1", "type": "function", "z": "t1", "func": "x".repeat(4096)}
    ]));
    fx.manager.create(Some("big"), None).await.unwrap();

    let report = fx.manager.health().await;
    assert!(!report.issues.iter().any(|i| i.contains("of disk space")));

    let strict = fx.reopen(10, true).with_health_thresholds(HealthThresholds {
        size_warning_bytes: 1024,
        ..HealthThresholds::default()
    });
    let report = strict.health().await;
    assert!(report.healthy, "{:?}", report.issues);
    assert!(report.total_size_bytes > 4096);
    assert!(report.issues.iter().any(|i| i.contains("of disk space")));
    assert!(report
        .recommendations
        .iter()
        .any(|r| r.contains("delete large backups")));
}

#[tokio::test]
async fn test_health_adoption_never_evicts() {
    let fx = Fixture::new(3, true);
    for name in ["a", "b", "c"] {
        fx.manager.create(Some(name), None).await.unwrap();
    }

    let index_path = fx.paths.metadata_file.clone();
    let mut raw = fx.read_json(&index_path);
    raw["config"]["maxBackups"] = json!(2);
    raw["backups"]
        .as_array_mut()
        .unwrap()
        .retain(|b| b["name"] != "c");
    fx.write_json(&index_path, &raw);

    let report = fx.manager.health().await;
    assert!(report.healthy, "{:?}", report.issues);
    assert_eq!(report.adopted_orphans, vec!["c"]);
    assert_eq!(report.backup_count, 3);
    assert!(report.issues.iter().any(|i| i.contains("exceeds the limit")));
    for name in ["a", "b", "c"] {
        assert!(fx.snapshot_path(name).exists(), "{} was deleted", name);
    }
    assert_eq!(fx.manager.index().load().await.unwrap().len(), 3);
}
