use serde_json::json;
use std::path::{Path, PathBuf};

/// Write a manifest with two streams for `acme` and one for `globex`.
pub fn write_sample_manifest(dir: &Path) -> PathBuf {
    let path = dir.join("chunks.json");
    let document = json!({
        "chunks": [
            {"tenant": "acme", "labels": {"app": "checkout", "env": "prod"},
             "fingerprint": 43981, "from": 1704067200000i64, "through": 1704070800000i64, "checksum": 4660},
            {"tenant": "acme", "labels": {"app": "search", "env": "prod"},
             "fingerprint": 7, "from": 1704067200000i64, "through": 1704070800000i64, "checksum": 1},
            {"tenant": "acme", "labels": {"app": "checkout", "env": "prod"},
             "fingerprint": 43981, "from": 1704070800000i64, "through": 1704074400000i64, "checksum": 4661},
            {"tenant": "globex", "labels": {"app": "checkout", "env": "dev"},
             "fingerprint": 9, "from": 1704067200000i64, "through": 1704070800000i64, "checksum": 2}
        ]
    });
    std::fs::write(&path, serde_json::to_vec_pretty(&document).unwrap()).unwrap();
    path
}
