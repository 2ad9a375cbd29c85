//! Canonical pack layout, pinned.

use patpack::core::{PatternType, Snippet, SourceRef};
use patpack::pack::{PackBuilder, PackSerializer};
use patpack::config::PackConfig;
use patpack::test_utils::{PatternBuilder, ranked};

use crate::common::store;

#[test]
fn canonical_pack_layout() {
    let records = vec![
        PatternBuilder::new("pol-secrets", PatternType::Policy)
            .summary("Never log secrets")
            .build(),
        PatternBuilder::new("p-paginate", PatternType::Pattern)
            .title("Cursor pagination")
            .summary("Use opaque cursors")
            .key_insight("Cursors survive inserts")
            .snippet(Snippet {
                lang: "rust".into(),
                code: "let cursor = decode(req)?;\nlet page = repo.after(cursor, 20)?;\nOk(Json(page))".into(),
                source: Some(SourceRef {
                    path: "src/api/list.rs".into(),
                    start_line: 1,
                    end_line: 3,
                    focus_line: None,
                }),
            })
            .build(),
    ];
    let mut pack = PackBuilder::new(store(records), PackConfig::default())
        .build("add pagination", &[ranked("p-paginate", 91.5), ranked("pol-secrets", 40.0)])
        .unwrap();

    assert_eq!(PackSerializer::measure(&pack).unwrap(), pack.meta.bytes);
    pack.meta.bytes = 0;
    let canonical = PackSerializer::canonical_value(&pack).unwrap();

    insta::assert_json_snapshot!(canonical, @r#"
    {
      "anti_patterns": [],
      "candidates": [
        {
          "id": "p-paginate",
          "key_insight": "Cursors survive inserts",
          "score": 91.5,
          "snippet": {
            "code": "let cursor = decode(req)?;\nlet page = repo.after(cursor, 20)?;\nOk(Json(page))",
            "id": "cd953736",
            "lang": "rust",
            "source": "src/api/list.rs:1-3"
          },
          "summary": "Use opaque cursors",
          "title": "Cursor pagination",
          "trust": 0.5,
          "type": "pattern"
        }
      ],
      "meta": {
        "budget_bytes": 8192,
        "bytes": 0,
        "considered": 2,
        "included": 2,
        "total_ranked": 2
      },
      "policies": [
        {
          "id": "pol-secrets",
          "summary": "Never log secrets"
        }
      ],
      "task": "add pagination",
      "tests": []
    }
    "#);
}
