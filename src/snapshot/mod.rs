pub mod migrations;
pub mod store;

use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;

use crate::ingest::{SnapshotSource, SourceKind};
use crate::model::Snapshot;
use crate::snapshot::store::SnapshotStore;

#[derive(Debug, Clone)]
pub struct SqliteSource {
    pub db_path: PathBuf,
    pub year: u16,
}

#[async_trait]
impl SnapshotSource for SqliteSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Sqlite
    }

    fn describe(&self) -> String {
        format!("{} (year {})", self.db_path.display(), self.year)
    }

    async fn produce_snapshot(&self) -> Result<Snapshot> {
        let db_path = self.db_path.clone();
        let year = self.year;
        tokio::task::spawn_blocking(move || -> Result<Snapshot> {
            let store = SnapshotStore::open(&db_path)?;
            match store.load_snapshot(year)? {
                Some(snapshot) => Ok(snapshot),
                None => Err(anyhow!(
                    "election year {year} is not in the database (stored: {:?})",
                    store.years()?
                )),
            }
        })
        .await
        .context("database task panicked")?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CandidateId;

    #[test]
    fn produces_stored_year_and_rejects_missing_one() {
        let db_path = std::env::temp_dir().join(format!(
            "election-insight-sqlite-source-{}.db",
            std::process::id()
        ));
        std::fs::remove_file(&db_path).ok();
        drop(SnapshotStore::open(&db_path).unwrap());
        rusqlite::Connection::open(&db_path)
            .unwrap()
            .execute_batch(
                r#"
INSERT INTO elections(id, year, label, imported_at) VALUES (1, 2566, '2566', '2023-05-14T00:00:00Z');
INSERT INTO parties(id, name) VALUES (1, 'Alpha');
INSERT INTO constituencies(id, province_id, area_number, name) VALUES (1001, 10, 1, 'Bangkok 1');
INSERT INTO candidate_participations(election_id, constituency_id, ballot_number, party_id, full_name, score)
VALUES (1, 1001, 3, 1, 'Somchai', 42);
"#,
            )
            .unwrap();

        let found = tokio_test::block_on(
            SqliteSource {
                db_path: db_path.clone(),
                year: 2566,
            }
            .produce_snapshot(),
        )
        .unwrap();
        let missing = tokio_test::block_on(
            SqliteSource {
                db_path: db_path.clone(),
                year: 2562,
            }
            .produce_snapshot(),
        );
        std::fs::remove_file(&db_path).ok();

        assert_eq!(found.candidates[0].id, CandidateId(1_001_003));
        assert_eq!(found.candidates[0].score, 42);
        let message = missing.unwrap_err().to_string();
        assert!(message.contains("2562"));
        assert!(message.contains("[2566]"));
    }
}
