use patpack::core::PatternType;
use patpack::error::PatpackError;
use patpack::storage::{MemoryStore, PatternRepository};

const SNAPSHOT: &str = r#"[
  {
    "id": "pol-secrets",
    "type": "policy",
    "title": "No secrets in logs",
    "summary": "Redact tokens before logging."
  },
  {
    "id": "p-retry",
    "type": "pattern",
    "scope": { "languages": ["Rust"], "paths": ["src/net/**"] },
    "trust": { "alpha": 8.0, "beta": 2.0 },
    "title": "Retry with backoff",
    "snippets": [
      {
        "lang": "rust",
        "code": "retry(|| call())",
        "source": { "path": "src/net/retry.rs", "start_line": 10, "end_line": 10 }
      }
    ],
    "notes": "See [POLICY:pol-secrets]"
  }
]"#;

#[test]
fn json_snapshot_loads_and_normalizes() {
    let store = MemoryStore::from_json_str(SNAPSHOT).unwrap();
    assert_eq!(store.len(), 2);

    let metas = store.all_meta().unwrap();
    let retry = metas.iter().find(|m| m.id == "p-retry").unwrap();
    assert_eq!(retry.kind, PatternType::Pattern);
    assert_eq!(retry.scope.languages, vec!["rust"]);

    let body = store.load("p-retry").unwrap().unwrap();
    assert_eq!(body.snippets.len(), 1);
    assert!(store.load("missing").unwrap().is_none());
}

#[test]
fn snapshot_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("patterns.json");
    std::fs::write(&path, SNAPSHOT).unwrap();
    assert_eq!(MemoryStore::from_json_file(&path).unwrap().len(), 2);
}

#[test]
fn invalid_records_are_rejected() {
    let duplicate = r#"[{"id":"a","type":"pattern"},{"id":"a","type":"test"}]"#;
    assert!(matches!(
        MemoryStore::from_json_str(duplicate),
        Err(PatpackError::InvalidPattern(_))
    ));

    let bad_trust = r#"[{"id":"a","type":"pattern","trust":{"score":1.5}}]"#;
    assert!(matches!(
        MemoryStore::from_json_str(bad_trust),
        Err(PatpackError::InvalidPattern(_))
    ));

    let bad_range = r#"[{"id":"a","type":"pattern","snippets":[{"lang":"rust","code":"x","source":{"path":"a.rs","start_line":9,"end_line":3}}]}]"#;
    assert!(MemoryStore::from_json_str(bad_range).is_err());
}
