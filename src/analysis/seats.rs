use std::collections::BTreeMap;

use crate::analysis::candidates::{analyze_candidates, seat_margin};
use crate::analysis::{
    competitive_index, percent_of, CandidateAnalysis, SeatAnalysis, SeatBuckets, SeatCategory,
};
use crate::model::{ConstituencyId, Snapshot};

pub fn analyze_seats_by_category(snapshot: &Snapshot) -> SeatBuckets {
    let candidates = analyze_candidates(snapshot);
    SeatBuckets::from_seats(classify_seats(&candidates))
}

pub fn classify_seats(candidates: &[CandidateAnalysis]) -> Vec<SeatAnalysis> {
    let mut groups: BTreeMap<ConstituencyId, Vec<&CandidateAnalysis>> = BTreeMap::new();
    for candidate in candidates {
        groups
            .entry(candidate.constituency_id())
            .or_default()
            .push(candidate);
    }

    let mut seats = Vec::with_capacity(groups.len());
    for (constituency_id, mut standings) in groups {
        standings.sort_by(|a, b| a.rank.cmp(&b.rank).then_with(|| a.id().cmp(&b.id())));
        let Some(winner) = standings.first().copied() else {
            continue;
        };
        let runner_up = standings.get(1).copied();
        let total_votes = standings.iter().map(|c| c.score()).sum::<u64>();
        let margin = seat_margin(winner.score(), runner_up.map(|r| r.score()));
        let margin_percent = percent_of(margin, total_votes);

        seats.push(SeatAnalysis {
            constituency_id,
            area_name: winner.area_name.clone(),
            province_id: winner.province_id,
            province_name: winner.province_name.clone(),
            region_id: winner.region_id,
            region_name: winner.region_name.clone(),
            winner: winner.clone(),
            runner_up: runner_up.cloned(),
            candidate_count: standings.len(),
            margin,
            margin_percent,
            total_votes,
            category: SeatCategory::classify(margin_percent),
            competitive_index: competitive_index(margin_percent),
        });
    }
    seats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Candidate, CandidateId, PartyId};

    fn snapshot(rows: &[(u64, u32, u64)]) -> Snapshot {
        Snapshot {
            candidates: rows
                .iter()
                .map(|(id, area, score)| Candidate {
                    id: CandidateId(*id),
                    full_name: format!("C{id}"),
                    party_id: PartyId(*id as u32),
                    constituency_id: ConstituencyId(*area),
                    score: *score,
                })
                .collect(),
            ..Snapshot::default()
        }
    }

    #[test]
    fn buckets_partition_all_seats() {
        let snap = snapshot(&[
            (1, 1, 700),
            (2, 1, 300), // 40% safe
            (3, 2, 560),
            (4, 2, 440), // 12% marginal
            (5, 3, 540),
            (6, 3, 460), // 8% competitive
            (7, 4, 510),
            (8, 4, 490), // 2% toss-up
            (9, 5, 0),   // zero votes, toss-up
        ]);
        let buckets = analyze_seats_by_category(&snap);
        assert_eq!(buckets.all.len(), 5);
        assert_eq!(buckets.safe.len(), 1);
        assert_eq!(buckets.marginal.len(), 1);
        assert_eq!(buckets.competitive.len(), 1);
        assert_eq!(buckets.toss_up.len(), 2);

        let mut seen: Vec<ConstituencyId> = SeatCategory::ALL
            .iter()
            .flat_map(|c| buckets.bucket(*c).iter().map(|s| s.constituency_id))
            .collect();
        seen.sort();
        let all: Vec<ConstituencyId> = buckets.all.iter().map(|s| s.constituency_id).collect();
        assert_eq!(seen, all);
    }

    #[test]
    fn uncontested_seat_margin_is_winner_score() {
        let snap = snapshot(&[(1, 1, 800)]);
        let seats = analyze_seats_by_category(&snap).all;
        assert_eq!(seats[0].margin, 800);
        assert_eq!(seats[0].margin_percent, 100.0);
        assert!(seats[0].runner_up.is_none());
        assert_eq!(seats[0].category, SeatCategory::Safe);
    }

    #[test]
    fn zero_vote_seat_has_zero_margin_percent() {
        let snap = snapshot(&[(1, 1, 0), (2, 1, 0)]);
        let seat = &analyze_seats_by_category(&snap).all[0];
        assert_eq!(seat.margin_percent, 0.0);
        assert_eq!(seat.category, SeatCategory::TossUp);
        assert_eq!(seat.competitive_index, 100);
        assert_eq!(seat.winner.id(), CandidateId(1));
    }
}
