use std::collections::BTreeMap;

use crate::analysis::seats::analyze_seats_by_category;
use crate::analysis::{
    percent_of, CompetitiveRule, PartyStanding, ProvinceAnalysis, RegionAnalysis, SeatAnalysis,
    SeatCategory,
};
use crate::model::{
    AreaTurnout, ConstituencyId, PartyId, ProvinceId, RegionId, Snapshot, SnapshotIndex,
};

const TOP_PARTY_COUNT: usize = 3;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SeatTally {
    pub total_votes: u64,
    pub total_seats: usize,
    pub party_seats: BTreeMap<PartyId, u32>,
    pub party_votes: BTreeMap<PartyId, u64>,
    pub categories: BTreeMap<SeatCategory, usize>,
}

impl SeatTally {
    pub fn add(&mut self, seat: &SeatAnalysis) {
        let party_id = seat.winner.party_id();
        self.total_votes += seat.total_votes;
        self.total_seats += 1;
        *self.party_seats.entry(party_id).or_insert(0) += 1;
        *self.party_votes.entry(party_id).or_insert(0) += seat.winner.score();
        *self.categories.entry(seat.category).or_insert(0) += 1;
    }

    pub fn merge(&mut self, other: &SeatTally) {
        self.total_votes += other.total_votes;
        self.total_seats += other.total_seats;
        for (party, seats) in &other.party_seats {
            *self.party_seats.entry(*party).or_insert(0) += seats;
        }
        for (party, votes) in &other.party_votes {
            *self.party_votes.entry(*party).or_insert(0) += votes;
        }
        for (category, count) in &other.categories {
            *self.categories.entry(*category).or_insert(0) += count;
        }
    }

    pub fn competitive_seats(&self, rule: CompetitiveRule) -> usize {
        self.categories
            .iter()
            .filter(|(category, _)| rule.counts(**category))
            .map(|(_, count)| *count)
            .sum()
    }

    pub fn standings(&self, index: &SnapshotIndex<'_>) -> Vec<PartyStanding> {
        let mut standings = self
            .party_seats
            .iter()
            .map(|(party_id, seats)| {
                let party = index.party(*party_id);
                PartyStanding {
                    party_id: *party_id,
                    party_name: party.map(|p| p.name.clone()),
                    party_color: party.map(|p| p.color.clone()),
                    seats: *seats,
                    votes: self.party_votes.get(party_id).copied().unwrap_or(0),
                }
            })
            .collect::<Vec<_>>();
        standings.sort_by(|a, b| b.seats.cmp(&a.seats).then_with(|| a.party_id.cmp(&b.party_id)));
        standings
    }
}

/// Party with the most seats; equal counts go to the lowest party id.
pub fn dominant_party(party_seats: &BTreeMap<PartyId, u32>) -> Option<(PartyId, u32)> {
    party_seats
        .iter()
        .fold(None, |best: Option<(PartyId, u32)>, (party, seats)| match best {
            Some((_, best_seats)) if best_seats >= *seats => best,
            _ => Some((*party, *seats)),
        })
}

pub fn analyze_provinces(snapshot: &Snapshot, rule: CompetitiveRule) -> Vec<ProvinceAnalysis> {
    let seats = analyze_seats_by_category(snapshot).all;
    analyze_provinces_from_seats(snapshot, &seats, rule)
}

pub fn analyze_provinces_from_seats(
    snapshot: &Snapshot,
    seats: &[SeatAnalysis],
    rule: CompetitiveRule,
) -> Vec<ProvinceAnalysis> {
    let index = snapshot.index();
    let tallies = tally_by_province(seats);
    let turnout = turnout_by_province(snapshot, seats);

    let mut provinces = snapshot.provinces.iter().collect::<Vec<_>>();
    provinces.sort_by_key(|p| p.id);
    provinces.dedup_by_key(|p| p.id);

    provinces
        .into_iter()
        .map(|province| {
            let tally = tallies.get(&province.id).cloned().unwrap_or_default();
            let competitive_seats = tally.competitive_seats(rule);
            ProvinceAnalysis {
                id: province.id,
                name: province.name.clone(),
                region_id: province.region_id,
                region_name: index.region(province.region_id).map(|r| r.name.clone()),
                total_votes: tally.total_votes,
                total_seats: tally.total_seats,
                dominant_party_id: dominant_party(&tally.party_seats).map(|(id, _)| id),
                party_breakdown: tally.party_seats,
                competitive_seats,
                competitive_percent: percent_of(competitive_seats as u64, tally.total_seats as u64),
                turnout_percent: turnout.get(&province.id).and_then(|(ballots, eligible)| {
                    (*eligible > 0).then(|| percent_of(*ballots, *eligible))
                }),
            }
        })
        .collect()
}

pub fn analyze_regions(snapshot: &Snapshot, rule: CompetitiveRule) -> Vec<RegionAnalysis> {
    let seats = analyze_seats_by_category(snapshot).all;
    analyze_regions_from_seats(snapshot, &seats, rule)
}

pub fn analyze_regions_from_seats(
    snapshot: &Snapshot,
    seats: &[SeatAnalysis],
    rule: CompetitiveRule,
) -> Vec<RegionAnalysis> {
    let index = snapshot.index();
    let province_tallies = tally_by_province(seats);

    let mut province_regions: BTreeMap<ProvinceId, RegionId> = BTreeMap::new();
    for province in &snapshot.provinces {
        province_regions.entry(province.id).or_insert(province.region_id);
    }

    let mut region_tallies: BTreeMap<RegionId, SeatTally> = BTreeMap::new();
    let mut province_counts: BTreeMap<RegionId, usize> = BTreeMap::new();
    for (province_id, region_id) in &province_regions {
        *province_counts.entry(*region_id).or_insert(0) += 1;
        if let Some(tally) = province_tallies.get(province_id) {
            region_tallies.entry(*region_id).or_default().merge(tally);
        }
    }

    let mut regions = snapshot.regions.iter().collect::<Vec<_>>();
    regions.sort_by_key(|r| r.id);
    regions.dedup_by_key(|r| r.id);

    regions
        .into_iter()
        .map(|region| {
            let tally = region_tallies.get(&region.id).cloned().unwrap_or_default();
            let standings = tally.standings(&index);
            let dominant = standings.first();
            let competitive_seats = tally.competitive_seats(rule);
            RegionAnalysis {
                id: region.id,
                name: region.name.clone(),
                province_count: province_counts.get(&region.id).copied().unwrap_or(0),
                total_votes: tally.total_votes,
                total_seats: tally.total_seats,
                dominant_party_id: dominant.map(|s| s.party_id),
                dominant_party_name: dominant.and_then(|s| s.party_name.clone()),
                dominant_party_seats: dominant.map(|s| s.seats).unwrap_or(0),
                competitive_seats,
                competitive_percent: percent_of(competitive_seats as u64, tally.total_seats as u64),
                top_parties: standings.iter().take(TOP_PARTY_COUNT).cloned().collect(),
                party_breakdown: tally.party_seats,
            }
        })
        .collect()
}

// Seats whose province could not be resolved are left out.
fn tally_by_province(seats: &[SeatAnalysis]) -> BTreeMap<ProvinceId, SeatTally> {
    let mut tallies: BTreeMap<ProvinceId, SeatTally> = BTreeMap::new();
    for seat in seats {
        let Some(province_id) = seat.province_id else {
            continue;
        };
        tallies.entry(province_id).or_default().add(seat);
    }
    tallies
}

pub fn turnout_percent(snapshot: &Snapshot, seats: &[SeatAnalysis]) -> Option<f64> {
    let seat_votes = seat_votes(seats);
    let (ballots, eligible) = snapshot
        .turnout
        .iter()
        .fold((0u64, 0u64), |(ballots, eligible), area| {
            (
                ballots + area_ballots(area, &seat_votes),
                eligible + area.eligible_voters,
            )
        });
    (eligible > 0).then(|| percent_of(ballots, eligible))
}

fn seat_votes(seats: &[SeatAnalysis]) -> BTreeMap<ConstituencyId, u64> {
    seats
        .iter()
        .map(|s| (s.constituency_id, s.total_votes))
        .collect()
}

fn area_ballots(area: &AreaTurnout, seat_votes: &BTreeMap<ConstituencyId, u64>) -> u64 {
    area.ballots_cast
        .filter(|b| *b > 0)
        .unwrap_or_else(|| seat_votes.get(&area.constituency_id).copied().unwrap_or(0))
}

fn turnout_by_province(
    snapshot: &Snapshot,
    seats: &[SeatAnalysis],
) -> BTreeMap<ProvinceId, (u64, u64)> {
    let index = snapshot.index();
    let seat_votes = seat_votes(seats);

    let mut out: BTreeMap<ProvinceId, (u64, u64)> = BTreeMap::new();
    for area in &snapshot.turnout {
        let Some(province) = index.locate(area.constituency_id).province else {
            continue;
        };
        let entry = out.entry(province.id).or_insert((0, 0));
        entry.0 += area_ballots(area, &seat_votes);
        entry.1 += area.eligible_voters;
    }
    out
}
