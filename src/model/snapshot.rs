use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::model::{
    AreaTurnout, Candidate, Constituency, ConstituencyId, Party, PartyId, Province, ProvinceId,
    Region, RegionId,
};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Snapshot {
    #[serde(default)]
    pub regions: Vec<Region>,
    #[serde(default)]
    pub provinces: Vec<Province>,
    #[serde(default)]
    pub parties: Vec<Party>,
    #[serde(default)]
    pub constituencies: Vec<Constituency>,
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    #[serde(default)]
    pub turnout: Vec<AreaTurnout>,
    #[serde(default)]
    pub reported_party_list_seats: BTreeMap<PartyId, u32>,
    #[serde(default)]
    pub source_hash: Option<String>,
}

impl Snapshot {
    pub fn index(&self) -> SnapshotIndex<'_> {
        SnapshotIndex::new(self)
    }

    pub fn fingerprint(&self) -> String {
        if let Some(hash) = &self.source_hash {
            return hash.clone();
        }
        let canonical = serde_json::to_string(self).unwrap_or_default();
        let mut hasher = Sha256::new();
        hasher.update(canonical.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    pub fn total_candidate_votes(&self) -> u64 {
        self.candidates.iter().map(|c| c.score).sum()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Location<'a> {
    pub constituency: Option<&'a Constituency>,
    pub province: Option<&'a Province>,
    pub region: Option<&'a Region>,
}

// Duplicate ids resolve to the first record.
#[derive(Debug, Clone)]
pub struct SnapshotIndex<'a> {
    regions: BTreeMap<RegionId, &'a Region>,
    provinces: BTreeMap<ProvinceId, &'a Province>,
    parties: BTreeMap<PartyId, &'a Party>,
    constituencies: BTreeMap<ConstituencyId, &'a Constituency>,
}

impl<'a> SnapshotIndex<'a> {
    pub fn new(snapshot: &'a Snapshot) -> Self {
        let mut regions = BTreeMap::new();
        for region in &snapshot.regions {
            regions.entry(region.id).or_insert(region);
        }
        let mut provinces = BTreeMap::new();
        for province in &snapshot.provinces {
            provinces.entry(province.id).or_insert(province);
        }
        let mut parties = BTreeMap::new();
        for party in &snapshot.parties {
            parties.entry(party.id).or_insert(party);
        }
        let mut constituencies = BTreeMap::new();
        for constituency in &snapshot.constituencies {
            constituencies.entry(constituency.id).or_insert(constituency);
        }
        Self {
            regions,
            provinces,
            parties,
            constituencies,
        }
    }

    pub fn region(&self, id: RegionId) -> Option<&'a Region> {
        self.regions.get(&id).copied()
    }

    pub fn province(&self, id: ProvinceId) -> Option<&'a Province> {
        self.provinces.get(&id).copied()
    }

    pub fn party(&self, id: PartyId) -> Option<&'a Party> {
        self.parties.get(&id).copied()
    }

    pub fn constituency(&self, id: ConstituencyId) -> Option<&'a Constituency> {
        self.constituencies.get(&id).copied()
    }

    pub fn locate(&self, id: ConstituencyId) -> Location<'a> {
        let constituency = self.constituency(id);
        let province = constituency.and_then(|c| self.province(c.province_id));
        let region = province.and_then(|p| self.region(p.region_id));
        Location {
            constituency,
            province,
            region,
        }
    }
}
