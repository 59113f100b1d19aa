use std::collections::BTreeMap;

use tracing::debug;

use crate::analysis::{
    percent_of, CandidateAnalysis, PartyPerformance, PartyStats, ProvinceFootprint,
    RegionFootprint, SeatAnalysis, SeatCategory,
};
use crate::model::{PartyId, ProvinceId, SeatAllocation, Snapshot};

const TOP_PROVINCE_COUNT: usize = 10;
const BEST_PROVINCE_MIN_CANDIDATES: u32 = 2;

/// Seat and vote totals for every known party, ordered by `(total seats desc, party id asc)`.
/// Constituency seats count winners with a non-zero score only. Parties with
/// neither votes nor seats are left out.
pub fn compute_party_stats(
    snapshot: &Snapshot,
    seats: &[SeatAnalysis],
    allocation: SeatAllocation,
) -> Vec<PartyStats> {
    let mut votes: BTreeMap<PartyId, u64> = BTreeMap::new();
    for candidate in &snapshot.candidates {
        *votes.entry(candidate.party_id).or_insert(0) += candidate.score;
    }
    let mut constituency_seats: BTreeMap<PartyId, u32> = BTreeMap::new();
    for seat in seats.iter().filter(|s| s.winner.score() > 0) {
        *constituency_seats.entry(seat.winner.party_id()).or_insert(0) += 1;
    }

    let index = snapshot.index();
    let mut known = snapshot
        .parties
        .iter()
        .map(|p| p.id)
        .collect::<Vec<_>>();
    known.sort();
    known.dedup();

    let known_votes: u64 = known
        .iter()
        .map(|id| votes.get(id).copied().unwrap_or(0))
        .sum();

    let mut stats = Vec::with_capacity(known.len());
    for party_id in known {
        let Some(party) = index.party(party_id) else {
            continue;
        };
        let total_votes = votes.get(&party_id).copied().unwrap_or(0);
        let constituency_seats_won = constituency_seats.get(&party_id).copied().unwrap_or(0);
        let party_list_seats_won = match allocation {
            SeatAllocation::Reported => snapshot
                .reported_party_list_seats
                .get(&party_id)
                .copied()
                .unwrap_or(0),
            SeatAllocation::ConstituencyOnly => 0,
            SeatAllocation::ApproximateMixedMember { house_size } => approximate_party_list_seats(
                total_votes,
                known_votes,
                house_size,
                constituency_seats_won,
            ),
        };
        let total_seats = constituency_seats_won + party_list_seats_won;
        if total_votes == 0 && total_seats == 0 {
            continue;
        }
        stats.push(PartyStats {
            party_id,
            party_name: party.name.clone(),
            party_color: party.color.clone(),
            total_votes,
            constituency_seats_won,
            party_list_seats_won,
            total_seats,
        });
    }

    stats.sort_by(|a, b| {
        b.total_seats
            .cmp(&a.total_seats)
            .then_with(|| a.party_id.cmp(&b.party_id))
    });
    debug!(parties = stats.len(), %allocation, "computed party stats");
    stats
}

pub fn approximate_party_list_seats(
    party_votes: u64,
    total_votes: u64,
    house_size: u32,
    constituency_seats: u32,
) -> u32 {
    if total_votes == 0 {
        return 0;
    }
    let entitled = (party_votes as f64 * f64::from(house_size) / total_votes as f64).round() as u32;
    entitled.saturating_sub(constituency_seats)
}

#[derive(Default)]
struct Footprint {
    votes: u64,
    seats: u32,
    candidates: u32,
}

impl Footprint {
    fn add(&mut self, candidate: &CandidateAnalysis) {
        self.votes += candidate.score();
        self.candidates += 1;
        if candidate.is_winner {
            self.seats += 1;
        }
    }
}

pub fn party_performance(
    snapshot: &Snapshot,
    candidates: &[CandidateAnalysis],
    seats: &[SeatAnalysis],
    party_id: PartyId,
) -> Option<PartyPerformance> {
    let index = snapshot.index();
    let party = index.party(party_id)?;

    let fielded = candidates
        .iter()
        .filter(|c| c.party_id() == party_id)
        .collect::<Vec<_>>();
    let winners = fielded.iter().filter(|c| c.is_winner).collect::<Vec<_>>();
    let total_votes = fielded.iter().map(|c| c.score()).sum::<u64>();

    let held = seats
        .iter()
        .filter(|s| s.winner.party_id() == party_id)
        .collect::<Vec<_>>();
    let held_in = |categories: &[SeatCategory]| {
        held.iter()
            .filter(|s| categories.contains(&s.category))
            .count()
    };

    let mut by_province: BTreeMap<ProvinceId, Footprint> = BTreeMap::new();
    for candidate in &fielded {
        if let Some(province_id) = candidate.province_id {
            by_province.entry(province_id).or_default().add(candidate);
        }
    }
    let footprints = by_province
        .iter()
        .map(|(province_id, fp)| ProvinceFootprint {
            province_id: *province_id,
            province_name: index.province(*province_id).map(|p| p.name.clone()),
            votes: fp.votes,
            seats: fp.seats,
            candidates: fp.candidates,
            win_rate: percent_of(u64::from(fp.seats), u64::from(fp.candidates)),
        })
        .collect::<Vec<_>>();

    let mut top_provinces = footprints.clone();
    top_provinces.sort_by(|a, b| {
        b.votes
            .cmp(&a.votes)
            .then_with(|| a.province_id.cmp(&b.province_id))
    });
    top_provinces.truncate(TOP_PROVINCE_COUNT);

    // footprints are in province id order; only a strictly higher rate replaces the best
    let best_province = footprints
        .iter()
        .filter(|fp| fp.candidates >= BEST_PROVINCE_MIN_CANDIDATES)
        .fold(None::<&ProvinceFootprint>, |best, fp| match best {
            Some(b) if b.win_rate >= fp.win_rate => Some(b),
            _ => Some(fp),
        })
        .cloned();

    let mut regions = snapshot.regions.iter().collect::<Vec<_>>();
    regions.sort_by_key(|r| r.id);
    regions.dedup_by_key(|r| r.id);
    let regional_strength = regions
        .into_iter()
        .map(|region| {
            let mut fp = Footprint::default();
            for candidate in fielded.iter().filter(|c| c.region_id == Some(region.id)) {
                fp.add(candidate);
            }
            RegionFootprint {
                region_id: region.id,
                region_name: region.name.clone(),
                votes: fp.votes,
                seats: fp.seats,
                candidates: fp.candidates,
            }
        })
        .collect();

    let average_winning_margin = if winners.is_empty() {
        0.0
    } else {
        winners.iter().map(|c| c.margin_percent).sum::<f64>() / winners.len() as f64
    };

    Some(PartyPerformance {
        party_id,
        party_name: party.name.clone(),
        party_color: party.color.clone(),
        total_votes,
        candidates_fielded: fielded.len(),
        winners: winners.len(),
        losers: fielded.len() - winners.len(),
        win_rate: percent_of(winners.len() as u64, fielded.len() as u64),
        average_votes: if fielded.is_empty() {
            0.0
        } else {
            total_votes as f64 / fielded.len() as f64
        },
        average_winning_margin,
        seats_won: held.len(),
        safe_seats: held_in(&[SeatCategory::Safe]),
        marginal_seats: held_in(&[SeatCategory::Marginal]),
        contested_seats: held_in(&[SeatCategory::Competitive, SeatCategory::TossUp]),
        top_provinces,
        best_province,
        regional_strength,
    })
}
