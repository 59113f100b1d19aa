use std::path::PathBuf;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::info;

use crate::ingest::http::sha256_hex;
use crate::ingest::{SnapshotSource, SourceKind};
use crate::model::Snapshot;

#[derive(Debug, Clone)]
pub struct FileSource {
    pub path: PathBuf,
}

#[async_trait]
impl SnapshotSource for FileSource {
    fn kind(&self) -> SourceKind {
        SourceKind::File
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    async fn produce_snapshot(&self) -> Result<Snapshot> {
        let data = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("failed reading snapshot: {}", self.path.display()))?;
        let mut snapshot = parse_snapshot(&data)
            .with_context(|| format!("failed parsing snapshot: {}", self.path.display()))?;
        if snapshot.source_hash.is_none() {
            snapshot.source_hash = Some(sha256_hex(&data));
        }
        info!(
            candidates = snapshot.candidates.len(),
            path = %self.path.display(),
            "loaded snapshot file"
        );
        Ok(snapshot)
    }
}

pub fn parse_snapshot(data: &str) -> Result<Snapshot> {
    Ok(serde_json::from_str(data)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CandidateId, PartyId};

    #[test]
    fn missing_collections_default_to_empty() {
        let snapshot = parse_snapshot(
            r#"{
                "parties": [{"id": 3, "name": "Gamma"}],
                "candidates": [
                    {"id": 1001001, "full_name": "A", "party_id": 3, "constituency_id": 1001, "score": 12}
                ],
                "reported_party_list_seats": {"3": 2}
            }"#,
        )
        .unwrap();
        assert!(snapshot.regions.is_empty());
        assert_eq!(snapshot.parties[0].color, "");
        assert_eq!(snapshot.candidates[0].id, CandidateId(1_001_001));
        assert_eq!(snapshot.reported_party_list_seats.get(&PartyId(3)), Some(&2));
    }

    #[test]
    fn reads_snapshot_from_disk() {
        let path = std::env::temp_dir().join(format!(
            "election-insight-file-source-{}.json",
            std::process::id()
        ));
        std::fs::write(&path, r#"{"candidates": []}"#).unwrap();
        let source = FileSource { path: path.clone() };
        let snapshot = tokio_test::block_on(source.produce_snapshot()).unwrap();
        std::fs::remove_file(&path).ok();

        assert!(snapshot.candidates.is_empty());
        assert_eq!(snapshot.source_hash.map(|h| h.len()), Some(64));
    }
}
