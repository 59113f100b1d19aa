pub mod ids;
pub mod snapshot;

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use ids::{CandidateId, ConstituencyId, IdParseError, PartyId, ProvinceId, RegionId};
pub use snapshot::{Location, Snapshot, SnapshotIndex};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Region {
    pub id: RegionId,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Province {
    pub id: ProvinceId,
    pub name: String,
    pub region_id: RegionId,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Party {
    pub id: PartyId,
    pub name: String,
    #[serde(default)]
    pub color: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Constituency {
    pub id: ConstituencyId,
    pub name: String,
    pub province_id: ProvinceId,
    pub area_number: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Candidate {
    pub id: CandidateId,
    pub full_name: String,
    pub party_id: PartyId,
    pub constituency_id: ConstituencyId,
    pub score: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AreaTurnout {
    pub constituency_id: ConstituencyId,
    #[serde(default)]
    pub eligible_voters: u64,
    #[serde(default)]
    pub ballots_cast: Option<u64>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case", tag = "mode")]
pub enum SeatAllocation {
    #[default]
    Reported,
    ConstituencyOnly,
    /// Simplified mixed-member apportionment:
    /// `round(party_votes / (total_votes / house_size)) - constituency_seats`, floored at zero.
    /// This is an approximation used for dashboards, not an implementation of electoral law.
    ApproximateMixedMember {
        #[serde(default = "default_house_size")]
        house_size: u32,
    },
}

fn default_house_size() -> u32 {
    500
}

#[derive(Debug, Error)]
#[error("unknown seat allocation mode: {0}")]
pub struct SeatAllocationParseError(pub String);

impl FromStr for SeatAllocation {
    type Err = SeatAllocationParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "reported" => Ok(Self::Reported),
            "constituency_only" | "constituency" => Ok(Self::ConstituencyOnly),
            "approximate_mixed_member" | "mixed_member" | "mma" => {
                Ok(Self::ApproximateMixedMember {
                    house_size: default_house_size(),
                })
            }
            _ => Err(SeatAllocationParseError(s.to_string())),
        }
    }
}

impl Display for SeatAllocation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Reported => write!(f, "reported"),
            Self::ConstituencyOnly => write!(f, "constituency_only"),
            Self::ApproximateMixedMember { house_size } => {
                write!(f, "approximate_mixed_member({house_size})")
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElectionYear {
    pub year: u16,
    pub label: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub seat_allocation: SeatAllocation,
    pub snapshot: Snapshot,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MultiYearData {
    pub years: Vec<ElectionYear>,
    pub current_year: Option<u16>,
}

impl MultiYearData {
    pub fn year(&self, year: u16) -> Option<&ElectionYear> {
        self.years.iter().find(|y| y.year == year)
    }

    pub fn current(&self) -> Option<&ElectionYear> {
        self.current_year
            .and_then(|year| self.year(year))
            .or_else(|| self.years.iter().max_by_key(|y| y.year))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_seat_allocation_aliases() {
        assert_eq!(
            "constituency-only".parse::<SeatAllocation>().unwrap(),
            SeatAllocation::ConstituencyOnly
        );
        assert_eq!(
            "mma".parse::<SeatAllocation>().unwrap(),
            SeatAllocation::ApproximateMixedMember { house_size: 500 }
        );
        assert!("dhondt".parse::<SeatAllocation>().is_err());
    }

    #[test]
    fn current_year_falls_back_to_latest() {
        let data = MultiYearData {
            years: vec![
                ElectionYear {
                    year: 2562,
                    label: "2562".to_string(),
                    description: String::new(),
                    seat_allocation: SeatAllocation::Reported,
                    snapshot: Snapshot::default(),
                },
                ElectionYear {
                    year: 2566,
                    label: "2566".to_string(),
                    description: String::new(),
                    seat_allocation: SeatAllocation::Reported,
                    snapshot: Snapshot::default(),
                },
            ],
            current_year: Some(2570),
        };
        assert_eq!(data.current().map(|y| y.year), Some(2566));
    }
}
