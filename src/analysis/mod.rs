pub mod aggregate;
pub mod candidates;
pub mod filter;
pub mod party;
pub mod report;
pub mod seats;

use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{
    Candidate, CandidateId, ConstituencyId, PartyId, ProvinceId, RegionId,
};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CandidateAnalysis {
    #[serde(flatten)]
    pub candidate: Candidate,
    pub party_name: Option<String>,
    pub party_color: Option<String>,
    pub area_name: Option<String>,
    pub province_id: Option<ProvinceId>,
    pub province_name: Option<String>,
    pub region_id: Option<RegionId>,
    pub region_name: Option<String>,
    pub rank: u32,
    pub is_winner: bool,
    pub total_votes: u64,
    pub margin_votes: u64,
    pub margin_percent: f64,
    pub vote_share: f64,
    pub potential_score: u8,
    pub competitive_index: u8,
}

impl CandidateAnalysis {
    pub fn id(&self) -> CandidateId {
        self.candidate.id
    }

    pub fn score(&self) -> u64 {
        self.candidate.score
    }

    pub fn party_id(&self) -> PartyId {
        self.candidate.party_id
    }

    pub fn constituency_id(&self) -> ConstituencyId {
        self.candidate.constituency_id
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CandidateProfile {
    pub candidate: CandidateAnalysis,
    pub competitors: Vec<CandidateAnalysis>,
}

/// `TossUp` is the bucket older dashboards labelled `lost`; the winner still
/// holds the seat, the race was simply too close to call. `lost` is accepted
/// when parsing or deserializing.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
#[serde(rename_all = "snake_case")]
pub enum SeatCategory {
    Safe,
    Marginal,
    Competitive,
    #[serde(alias = "lost")]
    TossUp,
}

impl SeatCategory {
    pub const ALL: [SeatCategory; 4] = [
        SeatCategory::Safe,
        SeatCategory::Marginal,
        SeatCategory::Competitive,
        SeatCategory::TossUp,
    ];

    /// Strict lower bounds: exactly 20% is marginal, exactly 5% is a toss-up.
    pub fn classify(margin_percent: f64) -> Self {
        if margin_percent > 20.0 {
            Self::Safe
        } else if margin_percent > 10.0 {
            Self::Marginal
        } else if margin_percent > 5.0 {
            Self::Competitive
        } else {
            Self::TossUp
        }
    }

    pub fn as_slug(&self) -> &'static str {
        match self {
            Self::Safe => "safe",
            Self::Marginal => "marginal",
            Self::Competitive => "competitive",
            Self::TossUp => "toss_up",
        }
    }
}

impl Display for SeatCategory {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let display = match self {
            Self::Safe => "Safe",
            Self::Marginal => "Marginal",
            Self::Competitive => "Competitive",
            Self::TossUp => "Toss-up",
        };
        write!(f, "{display}")
    }
}

#[derive(Debug, Error)]
#[error("unknown seat category: {0}")]
pub struct CategoryParseError(pub String);

impl FromStr for SeatCategory {
    type Err = CategoryParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "safe" => Ok(Self::Safe),
            "marginal" => Ok(Self::Marginal),
            "competitive" => Ok(Self::Competitive),
            "toss_up" | "tossup" | "lost" => Ok(Self::TossUp),
            _ => Err(CategoryParseError(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SeatAnalysis {
    pub constituency_id: ConstituencyId,
    pub area_name: Option<String>,
    pub province_id: Option<ProvinceId>,
    pub province_name: Option<String>,
    pub region_id: Option<RegionId>,
    pub region_name: Option<String>,
    pub winner: CandidateAnalysis,
    pub runner_up: Option<CandidateAnalysis>,
    pub candidate_count: usize,
    pub margin: u64,
    pub margin_percent: f64,
    pub total_votes: u64,
    pub category: SeatCategory,
    pub competitive_index: u8,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SeatBuckets {
    pub safe: Vec<SeatAnalysis>,
    pub marginal: Vec<SeatAnalysis>,
    pub competitive: Vec<SeatAnalysis>,
    pub toss_up: Vec<SeatAnalysis>,
    pub all: Vec<SeatAnalysis>,
}

impl SeatBuckets {
    pub fn from_seats(all: Vec<SeatAnalysis>) -> Self {
        let pick = |category: SeatCategory| {
            all.iter()
                .filter(|s| s.category == category)
                .cloned()
                .collect::<Vec<_>>()
        };
        Self {
            safe: pick(SeatCategory::Safe),
            marginal: pick(SeatCategory::Marginal),
            competitive: pick(SeatCategory::Competitive),
            toss_up: pick(SeatCategory::TossUp),
            all,
        }
    }

    pub fn bucket(&self, category: SeatCategory) -> &[SeatAnalysis] {
        match category {
            SeatCategory::Safe => &self.safe,
            SeatCategory::Marginal => &self.marginal,
            SeatCategory::Competitive => &self.competitive,
            SeatCategory::TossUp => &self.toss_up,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CompetitiveRule {
    CompetitiveOrMarginal,
    CompetitiveOrTossUp,
}

impl CompetitiveRule {
    pub fn counts(self, category: SeatCategory) -> bool {
        match self {
            Self::CompetitiveOrMarginal => matches!(
                category,
                SeatCategory::Competitive | SeatCategory::Marginal
            ),
            Self::CompetitiveOrTossUp => {
                matches!(category, SeatCategory::Competitive | SeatCategory::TossUp)
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProvinceAnalysis {
    pub id: ProvinceId,
    pub name: String,
    pub region_id: RegionId,
    pub region_name: Option<String>,
    pub total_votes: u64,
    pub total_seats: usize,
    pub party_breakdown: BTreeMap<PartyId, u32>,
    pub dominant_party_id: Option<PartyId>,
    pub competitive_seats: usize,
    pub competitive_percent: f64,
    pub turnout_percent: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PartyStanding {
    pub party_id: PartyId,
    pub party_name: Option<String>,
    pub party_color: Option<String>,
    pub seats: u32,
    pub votes: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RegionAnalysis {
    pub id: RegionId,
    pub name: String,
    pub province_count: usize,
    pub total_votes: u64,
    pub total_seats: usize,
    pub party_breakdown: BTreeMap<PartyId, u32>,
    pub dominant_party_id: Option<PartyId>,
    pub dominant_party_name: Option<String>,
    pub dominant_party_seats: u32,
    pub competitive_seats: usize,
    pub competitive_percent: f64,
    pub top_parties: Vec<PartyStanding>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PartyStats {
    pub party_id: PartyId,
    pub party_name: String,
    pub party_color: String,
    pub total_votes: u64,
    pub constituency_seats_won: u32,
    pub party_list_seats_won: u32,
    pub total_seats: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProvinceFootprint {
    pub province_id: ProvinceId,
    pub province_name: Option<String>,
    pub votes: u64,
    pub seats: u32,
    pub candidates: u32,
    pub win_rate: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RegionFootprint {
    pub region_id: RegionId,
    pub region_name: String,
    pub votes: u64,
    pub seats: u32,
    pub candidates: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PartyPerformance {
    pub party_id: PartyId,
    pub party_name: String,
    pub party_color: String,
    pub total_votes: u64,
    pub candidates_fielded: usize,
    pub winners: usize,
    pub losers: usize,
    pub win_rate: f64,
    pub average_votes: f64,
    pub average_winning_margin: f64,
    pub seats_won: usize,
    pub safe_seats: usize,
    pub marginal_seats: usize,
    pub contested_seats: usize,
    pub top_provinces: Vec<ProvinceFootprint>,
    pub best_province: Option<ProvinceFootprint>,
    pub regional_strength: Vec<RegionFootprint>,
}

/// `part / whole * 100`, or 0 when `whole` is 0.
pub fn percent_of(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    part as f64 * 100.0 / whole as f64
}

pub fn competitive_index(margin_percent: f64) -> u8 {
    if margin_percent < 3.0 {
        100
    } else if margin_percent < 5.0 {
        80
    } else if margin_percent < 10.0 {
        60
    } else if margin_percent < 15.0 {
        40
    } else if margin_percent < 20.0 {
        20
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_on_strict_boundaries() {
        assert_eq!(SeatCategory::classify(20.0), SeatCategory::Marginal);
        assert_eq!(SeatCategory::classify(20.01), SeatCategory::Safe);
        assert_eq!(SeatCategory::classify(10.0), SeatCategory::Competitive);
        assert_eq!(SeatCategory::classify(5.0), SeatCategory::TossUp);
        assert_eq!(SeatCategory::classify(5.5), SeatCategory::Competitive);
        assert_eq!(SeatCategory::classify(0.0), SeatCategory::TossUp);
    }

    #[test]
    fn competitive_index_steps() {
        assert_eq!(competitive_index(0.0), 100);
        assert_eq!(competitive_index(3.0), 80);
        assert_eq!(competitive_index(9.99), 60);
        assert_eq!(competitive_index(10.0), 40);
        assert_eq!(competitive_index(19.9), 20);
        assert_eq!(competitive_index(20.0), 0);
    }

    #[test]
    fn percent_of_zero_whole_is_zero() {
        assert_eq!(percent_of(10, 0), 0.0);
        assert_eq!(percent_of(40_000, 200_000), 20.0);
    }

    #[test]
    fn category_parses_legacy_label() {
        assert_eq!("lost".parse::<SeatCategory>().unwrap(), SeatCategory::TossUp);
        assert_eq!(
            "Toss-Up".parse::<SeatCategory>().unwrap(),
            SeatCategory::TossUp
        );
        let legacy: SeatCategory = serde_json::from_str("\"lost\"").unwrap();
        assert_eq!(legacy, SeatCategory::TossUp);
        assert_eq!(serde_json::to_string(&legacy).unwrap(), "\"toss_up\"");
    }

    #[test]
    fn competitive_rules_differ_only_on_marginal_and_toss_up() {
        let province = CompetitiveRule::CompetitiveOrMarginal;
        let region = CompetitiveRule::CompetitiveOrTossUp;
        assert!(province.counts(SeatCategory::Marginal));
        assert!(!region.counts(SeatCategory::Marginal));
        assert!(region.counts(SeatCategory::TossUp));
        assert!(!province.counts(SeatCategory::TossUp));
        for rule in [province, region] {
            assert!(rule.counts(SeatCategory::Competitive));
            assert!(!rule.counts(SeatCategory::Safe));
        }
    }
}
