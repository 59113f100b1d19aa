use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid {kind} id: {raw:?}")]
pub struct IdParseError {
    pub kind: &'static str,
    pub raw: String,
}

macro_rules! integer_id {
    ($name:ident($inner:ty), $kind:literal) => {
        #[derive(
            Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub $inner);

        impl $name {
            pub const fn get(self) -> $inner {
                self.0
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<$inner> for $name {
            fn from(value: $inner) -> Self {
                Self(value)
            }
        }

        impl FromStr for $name {
            type Err = IdParseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim().parse::<$inner>().map(Self).map_err(|_| IdParseError {
                    kind: $kind,
                    raw: s.to_string(),
                })
            }
        }
    };
}

integer_id!(RegionId(u32), "region");
integer_id!(ProvinceId(u32), "province");
integer_id!(PartyId(u32), "party");
integer_id!(ConstituencyId(u32), "constituency");
integer_id!(CandidateId(u64), "candidate");

const MAX_ZONE_NO: u32 = 99;
const MAX_BALLOT_NO: u32 = 999;

impl ConstituencyId {
    /// `province * 100 + zone`. `None` when the zone number leaves 1..=99 or
    /// the product overflows, since either would collide with another id.
    pub fn from_province_zone(province: ProvinceId, zone_no: u32) -> Option<Self> {
        if zone_no == 0 || zone_no > MAX_ZONE_NO {
            return None;
        }
        province.0.checked_mul(100)?.checked_add(zone_no).map(Self)
    }
}

impl CandidateId {
    /// `constituency * 1000 + ballot`, with the ballot number limited to 1..=999.
    pub fn from_constituency_ballot(constituency: ConstituencyId, ballot_no: u32) -> Option<Self> {
        if ballot_no == 0 || ballot_no > MAX_BALLOT_NO {
            return None;
        }
        u64::from(constituency.0)
            .checked_mul(1_000)?
            .checked_add(u64::from(ballot_no))
            .map(Self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_trimmed_numeric_ids() {
        let id: PartyId = " 68 ".parse().expect("party id");
        assert_eq!(id, PartyId(68));
        let err = "abc".parse::<ProvinceId>().unwrap_err();
        assert_eq!(err.kind, "province");
    }

    #[test]
    fn composite_ids_match_source_layout() {
        let area = ConstituencyId::from_province_zone(ProvinceId(10), 3).unwrap();
        assert_eq!(area, ConstituencyId(1003));
        let candidate = CandidateId::from_constituency_ballot(area, 7).unwrap();
        assert_eq!(candidate, CandidateId(1_003_007));
    }

    #[test]
    fn composite_ids_reject_out_of_range_parts() {
        assert_eq!(
            ConstituencyId::from_province_zone(ProvinceId(10), u32::MAX),
            None
        );
        assert_eq!(ConstituencyId::from_province_zone(ProvinceId(10), 100), None);
        assert_eq!(ConstituencyId::from_province_zone(ProvinceId(10), 0), None);
        assert_eq!(
            ConstituencyId::from_province_zone(ProvinceId(u32::MAX / 50), 1),
            None
        );
        assert_eq!(
            CandidateId::from_constituency_ballot(ConstituencyId(1003), 1_000),
            None
        );
        assert_eq!(
            CandidateId::from_constituency_ballot(ConstituencyId(u32::MAX), 999),
            Some(CandidateId(u64::from(u32::MAX) * 1_000 + 999))
        );
    }
}
