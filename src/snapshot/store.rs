use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

use crate::model::{
    AreaTurnout, Candidate, CandidateId, Constituency, ConstituencyId, Party, PartyId, Province,
    ProvinceId, Region, RegionId, Snapshot,
};
use crate::snapshot::migrations::BASE_MIGRATION;

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct StoredElection {
    pub year: u16,
    pub label: String,
    pub description: String,
    pub candidates: u64,
    pub imported_at: Option<DateTime<Utc>>,
}

pub struct SnapshotStore {
    conn: Connection,
}

impl SnapshotStore {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)
            .with_context(|| format!("failed opening database: {}", path.display()))?;
        let store = Self { conn };
        store.migrate()?;
        Ok(store)
    }

    pub fn open_in_memory() -> Result<Self> {
        let store = Self {
            conn: Connection::open_in_memory()?,
        };
        store.migrate()?;
        Ok(store)
    }

    pub fn migrate(&self) -> Result<()> {
        self.conn.execute_batch(BASE_MIGRATION)?;
        Ok(())
    }

    pub fn years(&self) -> Result<Vec<u16>> {
        let mut stmt = self
            .conn
            .prepare("SELECT year FROM elections ORDER BY year")?;
        let years = stmt
            .query_map([], |row| row.get::<_, u16>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(years)
    }

    pub fn elections(&self) -> Result<Vec<StoredElection>> {
        let mut stmt = self.conn.prepare(
            r#"
SELECT e.year, e.label, e.description, e.imported_at,
       (SELECT COUNT(*) FROM candidate_participations cp WHERE cp.election_id = e.id)
FROM elections e
ORDER BY e.year
"#,
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok(StoredElection {
                    year: row.get(0)?,
                    label: row.get(1)?,
                    description: row.get(2)?,
                    imported_at: parse_timestamp(&row.get::<_, String>(3)?),
                    candidates: row.get(4)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn load_snapshot(&self, year: u16) -> Result<Option<Snapshot>> {
        let election: Option<(i64, Option<String>)> = self
            .conn
            .query_row(
                "SELECT id, source_hash FROM elections WHERE year = ?1",
                params![i64::from(year)],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        let Some((election_id, source_hash)) = election else {
            return Ok(None);
        };

        let regions = self.query_all("SELECT id, name FROM regions ORDER BY id", [], |row| {
            Ok(Region {
                id: RegionId(row.get::<_, u32>(0)?),
                name: row.get(1)?,
            })
        })?;
        let provinces = self.query_all(
            "SELECT id, name, region_id FROM provinces ORDER BY id",
            [],
            |row| {
                Ok(Province {
                    id: ProvinceId(row.get::<_, u32>(0)?),
                    name: row.get(1)?,
                    region_id: RegionId(row.get::<_, u32>(2)?),
                })
            },
        )?;
        let parties = self.query_all("SELECT id, name, color FROM parties ORDER BY id", [], |row| {
            Ok(Party {
                id: PartyId(row.get::<_, u32>(0)?),
                name: row.get(1)?,
                color: row.get(2)?,
            })
        })?;
        let constituencies = self.query_all(
            r#"
SELECT id, name, province_id, area_number
FROM constituencies
WHERE id IN (
    SELECT constituency_id FROM candidate_participations WHERE election_id = ?1
    UNION
    SELECT constituency_id FROM constituency_stats WHERE election_id = ?1
)
ORDER BY id
"#,
            params![election_id],
            |row| {
                Ok(Constituency {
                    id: ConstituencyId(row.get::<_, u32>(0)?),
                    name: row.get(1)?,
                    province_id: ProvinceId(row.get::<_, u32>(2)?),
                    area_number: row.get::<_, u32>(3)?,
                })
            },
        )?;
        let candidates = self.query_all(
            r#"
SELECT constituency_id, ballot_number, party_id, full_name, score
FROM candidate_participations
WHERE election_id = ?1
ORDER BY constituency_id, ballot_number
"#,
            params![election_id],
            |row| {
                let constituency_id = ConstituencyId(row.get(0)?);
                let ballot_no: u32 = row.get(1)?;
                let id = CandidateId::from_constituency_ballot(constituency_id, ballot_no)
                    .ok_or(rusqlite::Error::IntegralValueOutOfRange(1, i64::from(ballot_no)))?;
                Ok(Candidate {
                    id,
                    full_name: row.get(3)?,
                    party_id: PartyId(row.get::<_, u32>(2)?),
                    constituency_id,
                    score: row.get::<_, u64>(4)?,
                })
            },
        )?;
        let turnout = self.query_all(
            r#"
SELECT constituency_id, eligible_voters, ballots_cast
FROM constituency_stats
WHERE election_id = ?1
ORDER BY constituency_id
"#,
            params![election_id],
            |row| {
                Ok(AreaTurnout {
                    constituency_id: ConstituencyId(row.get::<_, u32>(0)?),
                    eligible_voters: row.get::<_, u64>(1)?,
                    ballots_cast: row.get::<_, Option<u64>>(2)?,
                })
            },
        )?;
        let reported_party_list_seats = self
            .query_all(
                "SELECT party_id, seats FROM party_list_results WHERE election_id = ?1",
                params![election_id],
                |row| {
                    Ok((
                        PartyId(row.get::<_, u32>(0)?),
                        row.get::<_, u32>(1)?,
                    ))
                },
            )?
            .into_iter()
            .collect::<BTreeMap<_, _>>();

        debug!(year, candidates = candidates.len(), "loaded stored election");
        Ok(Some(Snapshot {
            regions,
            provinces,
            parties,
            constituencies,
            candidates,
            turnout,
            reported_party_list_seats,
            source_hash,
        }))
    }

    fn query_all<T, P, F>(&self, sql: &str, params: P, map: F) -> Result<Vec<T>>
    where
        P: rusqlite::Params,
        F: FnMut(&rusqlite::Row<'_>) -> rusqlite::Result<T>,
    {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt
            .query_map(params, map)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}
