use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::ingest::http::{
    array_records, sha256_hex, string_from_paths, u32_from_paths, u64_from_paths,
};
use crate::ingest::{SnapshotSource, SourceKind};
use crate::model::{
    AreaTurnout, Candidate, CandidateId, Constituency, ConstituencyId, Party, PartyId, Province,
    ProvinceId, Region, RegionId, Snapshot,
};

const HEADER_MARKER: &str = "จังหวัด";
const MIN_COLUMNS: usize = 6;
const UNKNOWN_PARTY: PartyId = PartyId(0);

const FIXED_REGIONS: [(u32, &str); 4] = [
    (1, "ภาคเหนือ"),
    (2, "ภาคตะวันออกเฉียงเหนือ"),
    (3, "ภาคกลาง"),
    (4, "ภาคใต้"),
];

#[derive(Debug, Clone)]
pub struct CsvSource {
    pub provinces_path: PathBuf,
    pub zones_path: PathBuf,
    pub parties_path: PathBuf,
    pub results_path: PathBuf,
}

#[async_trait]
impl SnapshotSource for CsvSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Csv
    }

    fn describe(&self) -> String {
        self.results_path.display().to_string()
    }

    async fn produce_snapshot(&self) -> Result<Snapshot> {
        let provinces = read_json(&self.provinces_path).await?;
        let zones = read_json(&self.zones_path).await?;
        let parties = read_json(&self.parties_path).await?;
        let results = tokio::fs::read_to_string(&self.results_path)
            .await
            .with_context(|| format!("failed reading results: {}", self.results_path.display()))?;

        let mut snapshot = parse_results(&provinces, &zones, &parties, &results)?;
        snapshot.source_hash = Some(sha256_hex(&results));
        info!(
            candidates = snapshot.candidates.len(),
            path = %self.results_path.display(),
            "loaded results sheet"
        );
        Ok(snapshot)
    }
}

async fn read_json(path: &Path) -> Result<Value> {
    let data = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed reading reference file: {}", path.display()))?;
    serde_json::from_str(&data)
        .with_context(|| format!("failed parsing reference JSON: {}", path.display()))
}

#[derive(Debug, Clone, PartialEq)]
struct ResultRow {
    province: String,
    zone: String,
    ballot_no: String,
    name: String,
    party: String,
    score: String,
}

// Blank province and zone cells repeat the previous row.
fn parse_rows(text: &str) -> Result<Vec<ResultRow>> {
    let Some(header_at) = text
        .lines()
        .position(|line| line.trim_start_matches('\u{feff}').starts_with(HEADER_MARKER))
    else {
        return Err(anyhow!("results sheet has no `{HEADER_MARKER}` header row"));
    };
    let body = text.lines().skip(header_at + 1).collect::<Vec<_>>().join("\n");

    let mut reader = ::csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(::csv::Trim::All)
        .from_reader(body.as_bytes());

    let mut rows = Vec::new();
    let mut province = String::new();
    let mut zone = String::new();
    for record in reader.records() {
        let record = record.context("malformed results row")?;
        if record.len() < MIN_COLUMNS {
            continue;
        }
        if !record[0].is_empty() {
            province = record[0].to_string();
        }
        if !record[1].is_empty() {
            zone = record[1].to_string();
        }
        rows.push(ResultRow {
            province: province.clone(),
            zone: zone.clone(),
            ballot_no: record[2].to_string(),
            name: record[3].to_string(),
            party: record[4].to_string(),
            score: record[5].replace(['"', '\'', ','], ""),
        });
    }
    Ok(rows)
}

pub fn parse_results(
    provinces: &Value,
    zones: &Value,
    parties: &Value,
    results: &str,
) -> Result<Snapshot> {
    let regions = FIXED_REGIONS
        .iter()
        .map(|(id, name)| Region {
            id: RegionId(*id),
            name: name.to_string(),
        })
        .collect();

    let provinces = array_records(provinces)
        .into_iter()
        .filter_map(|p| {
            Some(Province {
                id: ProvinceId(u32_from_paths(p, &["id"])?),
                name: string_from_paths(p, &["name"])?,
                region_id: RegionId(u32_from_paths(p, &["regionId", "region_id"]).unwrap_or(0)),
            })
        })
        .collect::<Vec<Province>>();
    let province_by_name: BTreeMap<&str, ProvinceId> = provinces
        .iter()
        .map(|p| (p.name.trim(), p.id))
        .collect();

    let mut constituencies = Vec::new();
    let mut turnout = Vec::new();
    for zone in array_records(zones) {
        let (Some(province), Some(area_number)) = (
            u32_from_paths(zone, &["provinceId", "province_id"]),
            u32_from_paths(zone, &["no", "zone"]),
        ) else {
            continue;
        };
        let Some(id) = ConstituencyId::from_province_zone(ProvinceId(province), area_number)
        else {
            warn!(province, zone = area_number, "skipping zone with out-of-range number");
            continue;
        };
        constituencies.push(Constituency {
            id,
            name: format!("เขต {area_number}"),
            province_id: ProvinceId(province),
            area_number,
        });
        if let Some(eligible_voters) = u64_from_paths(zone, &["eligible"]).filter(|e| *e > 0) {
            turnout.push(AreaTurnout {
                constituency_id: id,
                eligible_voters,
                ballots_cast: None,
            });
        }
    }

    let parties = array_records(parties)
        .into_iter()
        .filter_map(|p| {
            Some(Party {
                id: PartyId(u32_from_paths(p, &["id"])?),
                name: string_from_paths(p, &["name"])?,
                color: string_from_paths(p, &["color"]).unwrap_or_default(),
            })
        })
        .collect::<Vec<Party>>();
    let party_by_name: BTreeMap<&str, PartyId> =
        parties.iter().map(|p| (p.name.trim(), p.id)).collect();

    let mut candidates = Vec::new();
    let mut seen = BTreeSet::new();
    let mut unmapped_provinces = BTreeSet::new();
    for row in parse_rows(results)? {
        let Some(province_id) = province_by_name.get(row.province.as_str()).copied() else {
            unmapped_provinces.insert(row.province.clone());
            continue;
        };
        let (Ok(zone_no), Ok(ballot_no)) = (row.zone.parse::<u32>(), row.ballot_no.parse::<u32>())
        else {
            debug!(
                province = %row.province,
                zone = %row.zone,
                "skipping row without numeric zone or ballot number"
            );
            continue;
        };
        let Some((constituency_id, id)) = ConstituencyId::from_province_zone(province_id, zone_no)
            .and_then(|area| Some((area, CandidateId::from_constituency_ballot(area, ballot_no)?)))
        else {
            warn!(
                province = %row.province,
                zone = zone_no,
                ballot = ballot_no,
                "skipping row with out-of-range zone or ballot number"
            );
            continue;
        };
        if !seen.insert(id) {
            continue;
        }
        let party_id = party_by_name
            .get(row.party.as_str())
            .copied()
            .unwrap_or(UNKNOWN_PARTY);
        candidates.push(Candidate {
            id,
            full_name: row.name,
            party_id,
            constituency_id,
            score: row.score.parse::<u64>().unwrap_or(0),
        });
    }
    if !unmapped_provinces.is_empty() {
        warn!(
            provinces = ?unmapped_provinces,
            "results rows skipped for unmapped provinces"
        );
    }

    Ok(Snapshot {
        regions,
        provinces,
        parties,
        constituencies,
        candidates,
        turnout,
        reported_party_list_seats: BTreeMap::new(),
        source_hash: None,
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    const SHEET: &str = "ผลคะแนนการเลือกตั้ง 2562\n\
จังหวัด,เขต,หมายเลข,ชื่อ,พรรค,คะแนน\n\
กรุงเทพมหานคร,1,1,สมชาย,Alpha,\"23,246\"\n\
,,2,มาลี,Beta,\"19,001\"\n\
,,2,ซ้ำ,Beta,5\n\
,2,1,อนันต์,Unknown,700\n\
ไม่มีจังหวัด,1,1,ข้าม,Alpha,10\n\
short,row\n";

    fn references() -> (Value, Value, Value) {
        (
            json!([{"id": 10, "name": "กรุงเทพมหานคร", "regionId": 3}]),
            json!([
                {"provinceId": 10, "no": 1, "eligible": 100000},
                {"provinceId": 10, "no": 2}
            ]),
            json!([
                {"id": 1, "name": "Alpha", "color": "#f00"},
                {"id": 2, "name": "Beta", "color": "#00f"}
            ]),
        )
    }

    #[test]
    fn carries_province_and_zone_forward() {
        let rows = parse_rows(SHEET).unwrap();
        assert_eq!(rows.len(), 5);
        assert_eq!(rows[1].province, "กรุงเทพมหานคร");
        assert_eq!(rows[1].zone, "1");
        assert_eq!(rows[1].score, "19001");
        assert_eq!(rows[3].zone, "2");
    }

    #[test]
    fn builds_snapshot_from_sheet() {
        let (provinces, zones, parties) = references();
        let snapshot = parse_results(&provinces, &zones, &parties, SHEET).unwrap();

        assert_eq!(snapshot.regions.len(), 4);
        assert_eq!(snapshot.constituencies.len(), 2);
        assert_eq!(snapshot.turnout.len(), 1);
        assert_eq!(snapshot.turnout[0].eligible_voters, 100_000);

        // duplicate ballot number and unmapped province are dropped
        assert_eq!(snapshot.candidates.len(), 3);
        let first = &snapshot.candidates[0];
        assert_eq!(first.id, CandidateId(1_001_001));
        assert_eq!(first.score, 23_246);
        assert_eq!(first.party_id, PartyId(1));
        assert_eq!(snapshot.candidates[1].score, 19_001);
        assert_eq!(snapshot.candidates[2].party_id, UNKNOWN_PARTY);
        assert_eq!(snapshot.candidates[2].constituency_id, ConstituencyId(1002));
    }

    #[test]
    fn out_of_range_zone_and_ballot_numbers_skip_the_row() {
        let (provinces, zones, parties) = references();
        let sheet = "จังหวัด,เขต,หมายเลข,ชื่อ,พรรค,คะแนน\n\
กรุงเทพมหานคร,4294967295,1,X,Alpha,10\n\
กรุงเทพมหานคร,1,1000,Y,Alpha,10\n\
กรุงเทพมหานคร,1,3,Z,Alpha,10\n";
        let snapshot = parse_results(&provinces, &zones, &parties, sheet).unwrap();
        assert_eq!(snapshot.candidates.len(), 1);
        assert_eq!(snapshot.candidates[0].id, CandidateId(1_001_003));
    }

    #[test]
    fn missing_header_is_an_error() {
        let (provinces, zones, parties) = references();
        assert!(parse_results(&provinces, &zones, &parties, "a,b,c\n").is_err());
    }
}
