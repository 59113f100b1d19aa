use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::analysis::{CandidateAnalysis, SeatAnalysis, SeatCategory};
use crate::model::{PartyId, ProvinceId, RegionId};

const COMPETITIVE_MARGIN_PERCENT: f64 = 10.0;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum StatusFilter {
    #[default]
    All,
    Winner,
    Loser,
    Competitive,
}

impl StatusFilter {
    pub fn matches(self, candidate: &CandidateAnalysis) -> bool {
        match self {
            Self::All => true,
            Self::Winner => candidate.is_winner,
            Self::Loser => !candidate.is_winner,
            Self::Competitive => candidate.margin_percent < COMPETITIVE_MARGIN_PERCENT,
        }
    }
}

impl Display for StatusFilter {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let slug = match self {
            Self::All => "all",
            Self::Winner => "winner",
            Self::Loser => "loser",
            Self::Competitive => "competitive",
        };
        write!(f, "{slug}")
    }
}

#[derive(Debug, Error)]
#[error("unknown candidate status: {0}")]
pub struct StatusParseError(pub String);

impl FromStr for StatusFilter {
    type Err = StatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(Self::All),
            "winner" | "winners" => Ok(Self::Winner),
            "loser" | "losers" => Ok(Self::Loser),
            "competitive" => Ok(Self::Competitive),
            _ => Err(StatusParseError(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScoreRange {
    #[serde(default)]
    pub min: u64,
    #[serde(default = "unbounded")]
    pub max: u64,
}

fn unbounded() -> u64 {
    u64::MAX
}

impl Default for ScoreRange {
    fn default() -> Self {
        Self {
            min: 0,
            max: unbounded(),
        }
    }
}

impl ScoreRange {
    pub fn contains(&self, score: u64) -> bool {
        (self.min..=self.max).contains(&score)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CandidateFilter {
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub parties: BTreeSet<PartyId>,
    #[serde(default)]
    pub provinces: BTreeSet<ProvinceId>,
    #[serde(default)]
    pub regions: BTreeSet<RegionId>,
    #[serde(default)]
    pub score_range: ScoreRange,
    #[serde(default)]
    pub status: StatusFilter,
}

impl CandidateFilter {
    pub fn with_query(query: impl Into<String>) -> Self {
        Self {
            query: Some(query.into()),
            ..Self::default()
        }
    }

    pub fn matches(&self, candidate: &CandidateAnalysis) -> bool {
        if !self.parties.is_empty() && !self.parties.contains(&candidate.party_id()) {
            return false;
        }
        if !self.provinces.is_empty()
            && !candidate
                .province_id
                .is_some_and(|id| self.provinces.contains(&id))
        {
            return false;
        }
        if !self.regions.is_empty()
            && !candidate
                .region_id
                .is_some_and(|id| self.regions.contains(&id))
        {
            return false;
        }
        if !self.score_range.contains(candidate.score()) {
            return false;
        }
        if !self.status.matches(candidate) {
            return false;
        }
        match self.query.as_deref().map(str::trim) {
            Some(query) if !query.is_empty() => matches_text(candidate, &query.to_lowercase()),
            _ => true,
        }
    }

    pub fn apply<'a>(&self, candidates: &'a [CandidateAnalysis]) -> Vec<&'a CandidateAnalysis> {
        candidates.iter().filter(|c| self.matches(c)).collect()
    }
}

fn matches_text(candidate: &CandidateAnalysis, needle: &str) -> bool {
    let haystacks = [
        Some(candidate.candidate.full_name.as_str()),
        candidate.party_name.as_deref(),
        candidate.area_name.as_deref(),
        candidate.province_name.as_deref(),
    ];
    haystacks
        .into_iter()
        .flatten()
        .any(|text| text.to_lowercase().contains(needle))
}

pub fn search_candidates<'a>(
    candidates: &'a [CandidateAnalysis],
    query: &str,
) -> Vec<&'a CandidateAnalysis> {
    CandidateFilter::with_query(query).apply(candidates)
}

/// War-room listing: closest seats first, ties by constituency id.
pub fn target_seats<'a>(
    seats: &'a [SeatAnalysis],
    category: Option<SeatCategory>,
    winning_party: Option<PartyId>,
) -> Vec<&'a SeatAnalysis> {
    let mut targets = seats
        .iter()
        .filter(|s| category.map_or(true, |c| s.category == c))
        .filter(|s| winning_party.map_or(true, |p| s.winner.party_id() == p))
        .collect::<Vec<_>>();
    targets.sort_by(|a, b| {
        a.margin_percent
            .total_cmp(&b.margin_percent)
            .then_with(|| a.constituency_id.cmp(&b.constituency_id))
    });
    targets
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::candidates::analyze_candidates;
    use crate::analysis::seats::classify_seats;
    use crate::model::{
        Candidate, CandidateId, Constituency, ConstituencyId, Party, Province, Region, Snapshot,
    };

    fn analyzed() -> Vec<CandidateAnalysis> {
        let snapshot = Snapshot {
            regions: vec![Region {
                id: RegionId(3),
                name: "Central".to_string(),
            }],
            provinces: vec![Province {
                id: ProvinceId(10),
                name: "Bangkok".to_string(),
                region_id: RegionId(3),
            }],
            parties: vec![
                Party {
                    id: PartyId(1),
                    name: "Move Forward".to_string(),
                    color: String::new(),
                },
                Party {
                    id: PartyId(2),
                    name: "Pheu Thai".to_string(),
                    color: String::new(),
                },
            ],
            constituencies: vec![
                Constituency {
                    id: ConstituencyId(1001),
                    name: "Bangkok 1".to_string(),
                    province_id: ProvinceId(10),
                    area_number: 1,
                },
                Constituency {
                    id: ConstituencyId(1002),
                    name: "Bangkok 2".to_string(),
                    province_id: ProvinceId(10),
                    area_number: 2,
                },
            ],
            candidates: [
                (1, 1001, 1, 60_000, "Somchai"),
                (2, 1001, 2, 40_000, "Malee"),
                (3, 1002, 2, 51_000, "Anan"),
                (4, 1002, 1, 49_000, "Pim"),
                (5, 7777, 9, 10, "Nobody"),
            ]
            .into_iter()
            .map(|(id, area, party, score, name)| Candidate {
                id: CandidateId(id),
                full_name: name.to_string(),
                party_id: PartyId(party),
                constituency_id: ConstituencyId(area),
                score,
            })
            .collect(),
            ..Snapshot::default()
        };
        analyze_candidates(&snapshot)
    }

    fn ids(found: &[&CandidateAnalysis]) -> Vec<u64> {
        found.iter().map(|c| c.id().get()).collect()
    }

    #[test]
    fn search_is_case_insensitive_over_names() {
        let candidates = analyzed();
        assert_eq!(ids(&search_candidates(&candidates, "SOMCHAI")), vec![1]);
        assert_eq!(ids(&search_candidates(&candidates, "pheu")), vec![2, 3]);
        assert_eq!(ids(&search_candidates(&candidates, "bangkok 2")), vec![3, 4]);
        assert_eq!(search_candidates(&candidates, "").len(), 5);
    }

    #[test]
    fn filters_combine() {
        let candidates = analyzed();
        let filter = CandidateFilter {
            parties: BTreeSet::from([PartyId(1)]),
            status: StatusFilter::Loser,
            ..CandidateFilter::default()
        };
        assert_eq!(ids(&filter.apply(&candidates)), vec![4]);

        let filter = CandidateFilter {
            regions: BTreeSet::from([RegionId(3)]),
            score_range: ScoreRange {
                min: 49_000,
                max: 51_000,
            },
            ..CandidateFilter::default()
        };
        assert_eq!(ids(&filter.apply(&candidates)), vec![3, 4]);
    }

    #[test]
    fn competitive_status_uses_margin_percent() {
        let candidates = analyzed();
        let filter = CandidateFilter {
            status: StatusFilter::Competitive,
            ..CandidateFilter::default()
        };
        // 1002 is a 2% race; the unopposed candidate has a zero margin
        assert_eq!(ids(&filter.apply(&candidates)), vec![3, 4, 5]);
    }

    #[test]
    fn filter_deserializes_with_defaults() {
        let filter: CandidateFilter =
            serde_json::from_str(r#"{"status":"winner","score_range":{"min":100}}"#).unwrap();
        assert_eq!(filter.status, StatusFilter::Winner);
        assert_eq!(filter.score_range.max, u64::MAX);
        assert!(filter.parties.is_empty());
    }

    #[test]
    fn targets_sort_by_margin_then_id() {
        let candidates = analyzed();
        let seats = classify_seats(&candidates);
        let targets = target_seats(&seats, None, None);
        let order: Vec<u32> = targets.iter().map(|s| s.constituency_id.get()).collect();
        assert_eq!(order, vec![1002, 1001, 7777]);

        let held = target_seats(&seats, Some(SeatCategory::TossUp), Some(PartyId(2)));
        assert_eq!(held.len(), 1);
        assert_eq!(held[0].constituency_id, ConstituencyId(1002));
    }
}
