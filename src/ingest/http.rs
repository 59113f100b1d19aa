use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use reqwest::Client;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::ingest::{SnapshotSource, SourceKind};
use crate::model::{
    AreaTurnout, Candidate, CandidateId, Constituency, ConstituencyId, Party, PartyId, Province,
    ProvinceId, Region, RegionId, Snapshot,
};

const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 6;

static HTTP_CLIENT: Lazy<Client> = Lazy::new(|| {
    Client::builder()
        .user_agent("election-insight/0.1")
        .timeout(Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS))
        .connect_timeout(Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS))
        .build()
        .expect("failed to build HTTP client")
});

#[derive(Debug, Clone)]
pub struct HttpSource {
    pub master_url: String,
    pub result_url: String,
}

impl HttpSource {
    pub fn new(master_url: impl Into<String>, result_url: impl Into<String>) -> Self {
        Self {
            master_url: master_url.into(),
            result_url: result_url.into(),
        }
    }
}

#[async_trait]
impl SnapshotSource for HttpSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Http
    }

    fn describe(&self) -> String {
        format!("{} + {}", self.master_url, self.result_url)
    }

    async fn produce_snapshot(&self) -> Result<Snapshot> {
        let (master_body, result_body) =
            tokio::try_join!(fetch_text(&self.master_url), fetch_text(&self.result_url))?;
        let master: Value = serde_json::from_str(&master_body)
            .with_context(|| format!("invalid JSON response: {}", self.master_url))?;
        let result: Value = serde_json::from_str(&result_body)
            .with_context(|| format!("invalid JSON response: {}", self.result_url))?;

        let mut snapshot = parse_master_result(&master, &result)?;
        snapshot.source_hash = Some(sha256_hex(&format!("{master_body}{result_body}")));
        info!(
            candidates = snapshot.candidates.len(),
            constituencies = snapshot.constituencies.len(),
            "loaded remote election data"
        );
        Ok(snapshot)
    }
}

pub async fn fetch_text(url: &str) -> Result<String> {
    let response = HTTP_CLIENT
        .get(url)
        .send()
        .await
        .with_context(|| format!("failed GET request: {url}"))?;
    let status = response.status();
    let body = response
        .text()
        .await
        .with_context(|| format!("failed reading response body: {url}"))?;
    if !status.is_success() {
        let preview: String = body.chars().take(180).collect();
        return Err(anyhow!("GET {url} returned {status}: {preview}"));
    }
    Ok(body)
}

pub fn sha256_hex(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

// Source ids are kept as-is; ids that do not fit are skipped.
pub fn parse_master_result(master: &Value, result: &Value) -> Result<Snapshot> {
    let master = master
        .as_object()
        .ok_or_else(|| anyhow!("master data is not a JSON object"))?;

    let regions = object_records(master, "regions")
        .into_iter()
        .filter_map(|r| {
            Some(Region {
                id: RegionId(u32_from_paths(r, &["id"])?),
                name: string_from_paths(r, &["name"]).unwrap_or_default(),
            })
        })
        .collect::<Vec<_>>();

    let mut province_ids = BTreeSet::new();
    let mut provinces = Vec::new();
    for record in object_records(master, "provinces") {
        let Some(id) = u32_from_paths(record, &["id"]).map(ProvinceId) else {
            continue;
        };
        province_ids.insert(id);
        provinces.push(Province {
            id,
            name: string_from_paths(record, &["name"]).unwrap_or_default(),
            region_id: RegionId(u32_from_paths(record, &["regionId", "region_id"]).unwrap_or(0)),
        });
    }

    let mut area_ids = BTreeSet::new();
    let mut constituencies = Vec::new();
    let mut skipped_areas = 0usize;
    for record in object_records(master, "electionAreas") {
        let (Some(id), Some(area_number)) = (
            u32_from_paths(record, &["id"]).map(ConstituencyId),
            u32_from_paths(record, &["areaNo", "no"]),
        ) else {
            skipped_areas += 1;
            continue;
        };
        let Some(province_id) = u32_from_paths(record, &["provinceId"])
            .map(ProvinceId)
            .filter(|p| province_ids.contains(p))
        else {
            skipped_areas += 1;
            continue;
        };
        area_ids.insert(id);
        constituencies.push(Constituency {
            id,
            name: string_from_paths(record, &["name"])
                .unwrap_or_else(|| format!("เขต {area_number}")),
            province_id,
            area_number,
        });
    }
    if skipped_areas > 0 {
        warn!(skipped_areas, "election areas without a usable id or province");
    }

    let parties = object_records(master, "parties")
        .into_iter()
        .filter_map(|p| {
            Some(Party {
                id: PartyId(u32_from_paths(p, &["id"])?),
                name: string_from_paths(p, &["name"]).unwrap_or_default(),
                color: string_from_paths(p, &["color"]).unwrap_or_default(),
            })
        })
        .collect::<Vec<_>>();

    let scores = candidate_scores(result);
    let mut seen = BTreeSet::new();
    let mut candidates = Vec::new();
    let mut skipped_candidates = 0usize;
    for record in object_records(master, "candidates") {
        let (Some(source_id), Some(constituency_id)) = (
            u64_from_paths(record, &["id"]),
            u32_from_paths(record, &["electionAreaId"]).map(ConstituencyId),
        ) else {
            skipped_candidates += 1;
            continue;
        };
        let id = CandidateId(source_id);
        if !seen.insert(id) {
            debug!(%id, "duplicate candidate id in master data");
            continue;
        }
        candidates.push(Candidate {
            id,
            full_name: string_from_paths(record, &["fullName", "name"]).unwrap_or_default(),
            party_id: PartyId(u32_from_paths(record, &["partyId"]).unwrap_or(0)),
            constituency_id,
            score: scores.get(&source_id).copied().unwrap_or(0),
        });
    }
    if skipped_candidates > 0 {
        warn!(skipped_candidates, "candidates without a usable id or election area");
    }

    let mut reported_party_list_seats = BTreeMap::new();
    if let Some(party_scores) = result.get("partyScores").and_then(Value::as_object) {
        for (key, value) in party_scores {
            let (Ok(party), Some(stats)) = (key.trim().parse::<u32>(), value.as_object()) else {
                continue;
            };
            if let Some(seats) = u32_from_paths(stats, &["partyListSeats"]) {
                reported_party_list_seats.insert(PartyId(party), seats);
            }
        }
    }

    let mut turnout = Vec::new();
    if let Some(area_scores) = result.get("electionScores").and_then(Value::as_object) {
        for (key, value) in area_scores {
            let Ok(constituency_id) = key.trim().parse::<ConstituencyId>() else {
                continue;
            };
            // key 0 is the national total
            let (true, Some(stats)) = (area_ids.contains(&constituency_id), value.as_object())
            else {
                continue;
            };
            let ballots = u64_from_paths(stats, &["totalVotes"]).unwrap_or(0);
            let percent = f64_from_paths(stats, &["percentVoter"]).unwrap_or(0.0);
            let eligible_voters = if percent > 0.0 {
                (ballots as f64 / (percent / 100.0)).round() as u64
            } else {
                0
            };
            turnout.push(AreaTurnout {
                constituency_id,
                eligible_voters,
                ballots_cast: Some(ballots),
            });
        }
    }

    Ok(Snapshot {
        regions,
        provinces,
        parties,
        constituencies,
        candidates,
        turnout,
        reported_party_list_seats,
        source_hash: None,
    })
}

fn candidate_scores(result: &Value) -> BTreeMap<u64, u64> {
    let mut scores = BTreeMap::new();
    let Some(areas) = result.get("areaBallotScores").and_then(Value::as_array) else {
        return scores;
    };
    for area in areas {
        let Some(candidates) = area.get("candidates").and_then(Value::as_array) else {
            continue;
        };
        for entry in candidates.iter().filter_map(Value::as_object) {
            if let Some(id) = u64_from_paths(entry, &["id"]) {
                scores.insert(id, u64_from_paths(entry, &["totalVotes"]).unwrap_or(0));
            }
        }
    }
    scores
}

pub(crate) fn object_records<'a>(
    object: &'a Map<String, Value>,
    key: &str,
) -> Vec<&'a Map<String, Value>> {
    match object_get_case_insensitive(object, key) {
        Some(Value::Array(items)) => items.iter().filter_map(Value::as_object).collect(),
        Some(Value::Object(keyed)) => keyed.values().filter_map(Value::as_object).collect(),
        _ => Vec::new(),
    }
}

pub(crate) fn array_records(value: &Value) -> Vec<&Map<String, Value>> {
    match value {
        Value::Array(items) => items.iter().filter_map(Value::as_object).collect(),
        Value::Object(keyed) => keyed.values().filter_map(Value::as_object).collect(),
        _ => Vec::new(),
    }
}

pub(crate) fn string_from_paths(object: &Map<String, Value>, paths: &[&str]) -> Option<String> {
    for path in paths {
        match object_get_case_insensitive(object, path) {
            Some(Value::String(s)) if !s.trim().is_empty() => return Some(s.trim().to_string()),
            Some(Value::Number(n)) => return Some(n.to_string()),
            _ => {}
        }
    }
    None
}

pub(crate) fn f64_from_paths(object: &Map<String, Value>, paths: &[&str]) -> Option<f64> {
    paths
        .iter()
        .filter_map(|path| object_get_case_insensitive(object, path))
        .find_map(to_f64)
}

pub(crate) fn u64_from_paths(object: &Map<String, Value>, paths: &[&str]) -> Option<u64> {
    f64_from_paths(object, paths)
        .filter(|v| v.is_finite() && *v >= 0.0)
        .map(|v| v.round() as u64)
}

pub(crate) fn u32_from_paths(object: &Map<String, Value>, paths: &[&str]) -> Option<u32> {
    u64_from_paths(object, paths).and_then(|v| u32::try_from(v).ok())
}

fn object_get_case_insensitive<'a>(object: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    object.get(key).or_else(|| {
        object
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v)
    })
}

pub(crate) fn to_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let sanitized = s.trim().replace([',', '"', '\''], "");
            sanitized.parse::<f64>().ok()
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn master() -> Value {
        json!({
            "regions": {
                "1": {"id": 1, "code": "N", "name": "ภาคเหนือ"},
                "3": {"id": 3, "code": "C", "name": "ภาคกลาง"}
            },
            "provinces": [
                {"id": 1, "code": 10, "name": "กรุงเทพมหานคร", "regionId": 3},
                {"id": 2, "code": 50, "name": "เชียงใหม่", "regionId": "1"}
            ],
            "electionAreas": [
                {"id": 101, "name": "กรุงเทพมหานคร เขต 1", "areaNo": 1, "provinceId": 1},
                {"id": 201, "areaNo": 1, "provinceId": 2},
                {"id": 999, "areaNo": 1, "provinceId": 77}
            ],
            "parties": {
                "7": {"id": "7", "name": "Alpha", "color": "#f00"},
                "8": {"id": 8, "name": "Beta"}
            },
            "candidates": [
                {"id": 5001, "fullName": "Somchai", "partyId": 7, "electionAreaId": 101, "no": 2},
                {"id": 5002, "fullName": "Malee", "partyId": "8", "electionAreaId": 101, "no": 1},
                {"id": 5003, "fullName": "Anan", "partyId": 7, "electionAreaId": 201, "no": 1},
                {"id": 5004, "fullName": "Stray", "partyId": 7, "electionAreaId": 404}
            ]
        })
    }

    fn result() -> Value {
        json!({
            "areaBallotScores": [
                {"candidates": [{"id": 5001, "totalVotes": 41000}, {"id": 5002, "totalVotes": "12,500"}]},
                {"candidates": [{"id": 5003, "totalVotes": 38000}]}
            ],
            "partyScores": {
                "7": {"areaSeats": 2, "partyListSeats": 13},
                "8": {"areaSeats": 0, "partyListSeats": 0}
            },
            "electionScores": {
                "0": {"totalVotes": 100000, "percentVoter": 75.0},
                "101": {"totalVotes": 60000, "percentVoter": 80.0}
            }
        })
    }

    #[test]
    fn normalizes_ids_and_scores() {
        let snapshot = parse_master_result(&master(), &result()).unwrap();

        assert_eq!(snapshot.regions.len(), 2);
        assert_eq!(snapshot.provinces[1].id, ProvinceId(2));
        assert_eq!(snapshot.provinces[1].region_id, RegionId(1));
        // the area pointing at an unknown province is dropped
        assert_eq!(snapshot.constituencies.len(), 2);
        assert_eq!(snapshot.constituencies[0].id, ConstituencyId(101));
        assert_eq!(snapshot.constituencies[0].province_id, ProvinceId(1));
        assert_eq!(snapshot.constituencies[1].name, "เขต 1");

        let somchai = &snapshot.candidates[0];
        assert_eq!(somchai.id, CandidateId(5001));
        assert_eq!(somchai.constituency_id, ConstituencyId(101));
        assert_eq!(somchai.score, 41_000);
        assert_eq!(snapshot.candidates[1].party_id, PartyId(8));
        assert_eq!(snapshot.candidates[1].score, 12_500);

        // an unknown area stays a dangling reference
        let stray = &snapshot.candidates[3];
        assert_eq!(stray.id, CandidateId(5004));
        assert_eq!(stray.constituency_id, ConstituencyId(404));
        assert_eq!(stray.score, 0);
    }

    #[test]
    fn source_ids_decide_equal_score_winners() {
        let mut result = result();
        result["areaBallotScores"][0]["candidates"][1]["totalVotes"] = json!(41000);
        let snapshot = parse_master_result(&master(), &result).unwrap();
        let winner = crate::analysis::candidates::analyze_candidates(&snapshot)
            .into_iter()
            .find(|c| c.constituency_id() == ConstituencyId(101) && c.is_winner)
            .unwrap();
        // ballot numbers would pick 5002; the lower source id wins instead
        assert_eq!(winner.id(), CandidateId(5001));
    }

    #[test]
    fn oversized_source_ids_are_skipped() {
        let mut master = master();
        master["electionAreas"][0]["id"] = json!(u64::from(u32::MAX) + 1);
        let snapshot = parse_master_result(&master, &result()).unwrap();
        assert_eq!(snapshot.constituencies.len(), 1);
        assert_eq!(snapshot.turnout.len(), 0);
    }

    #[test]
    fn reads_reported_seats_and_turnout() {
        let snapshot = parse_master_result(&master(), &result()).unwrap();
        assert_eq!(snapshot.reported_party_list_seats.get(&PartyId(7)), Some(&13));
        assert_eq!(snapshot.turnout.len(), 1);
        assert_eq!(snapshot.turnout[0].constituency_id, ConstituencyId(101));
        assert_eq!(snapshot.turnout[0].eligible_voters, 75_000);
        assert_eq!(snapshot.turnout[0].ballots_cast, Some(60_000));
    }

    #[test]
    fn rejects_non_object_master() {
        assert!(parse_master_result(&json!([]), &json!({})).is_err());
    }

    #[test]
    fn numeric_strings_strip_separators() {
        assert_eq!(to_f64(&json!("\"1,234\"")), Some(1234.0));
        assert_eq!(to_f64(&json!(true)), None);
    }
}
