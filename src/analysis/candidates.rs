use std::cmp::Ordering;
use std::collections::BTreeMap;

use tracing::debug;

use crate::analysis::{competitive_index, percent_of, CandidateAnalysis};
use crate::model::{Candidate, ConstituencyId, Snapshot};

const BASE_POTENTIAL: u8 = 50;
const HIGH_VOTE_THRESHOLD: u64 = 100_000;
const MID_VOTE_THRESHOLD: u64 = 50_000;

/// Total order for candidates inside one constituency: score desc, then id asc.
pub fn standing_order(a: &Candidate, b: &Candidate) -> Ordering {
    b.score.cmp(&a.score).then_with(|| a.id.cmp(&b.id))
}

pub fn rank_by_constituency(candidates: &[Candidate]) -> BTreeMap<ConstituencyId, Vec<&Candidate>> {
    let mut groups: BTreeMap<ConstituencyId, Vec<&Candidate>> = BTreeMap::new();
    for candidate in candidates {
        groups
            .entry(candidate.constituency_id)
            .or_default()
            .push(candidate);
    }
    for group in groups.values_mut() {
        group.sort_by(|a, b| standing_order(a, b));
    }
    groups
}

/// Seat-level margin: winner over runner-up, or the winner's whole score when unopposed.
pub fn seat_margin(winner_score: u64, runner_up_score: Option<u64>) -> u64 {
    match runner_up_score {
        Some(runner_up) => winner_score.saturating_sub(runner_up),
        None => winner_score,
    }
}

pub fn analyze_candidates(snapshot: &Snapshot) -> Vec<CandidateAnalysis> {
    let index = snapshot.index();
    let mut analyzed = Vec::with_capacity(snapshot.candidates.len());

    for (constituency_id, standings) in rank_by_constituency(&snapshot.candidates) {
        let location = index.locate(constituency_id);
        if location.constituency.is_none() {
            debug!(%constituency_id, "candidates reference an unknown constituency");
        }

        let total_votes = standings.iter().map(|c| c.score).sum::<u64>();
        let top_score = standings.first().map(|c| c.score).unwrap_or(0);
        let runner_up_score = standings.get(1).map(|c| c.score);
        let seat_margin_percent = percent_of(seat_margin(top_score, runner_up_score), total_votes);
        let seat_competitive_index = competitive_index(seat_margin_percent);

        for (position, candidate) in standings.into_iter().enumerate() {
            let is_winner = position == 0;
            let margin_votes = if is_winner {
                runner_up_score
                    .map(|runner_up| candidate.score.saturating_sub(runner_up))
                    .unwrap_or(0)
            } else {
                top_score.saturating_sub(candidate.score)
            };
            let margin_percent = percent_of(margin_votes, total_votes);
            let party = index.party(candidate.party_id);

            analyzed.push(CandidateAnalysis {
                candidate: candidate.clone(),
                party_name: party.map(|p| p.name.clone()),
                party_color: party.map(|p| p.color.clone()),
                area_name: location.constituency.map(|c| c.name.clone()),
                province_id: location.province.map(|p| p.id),
                province_name: location.province.map(|p| p.name.clone()),
                region_id: location.region.map(|r| r.id),
                region_name: location.region.map(|r| r.name.clone()),
                rank: position as u32 + 1,
                is_winner,
                total_votes,
                margin_votes,
                margin_percent,
                vote_share: percent_of(candidate.score, total_votes),
                potential_score: potential_score(candidate.score, is_winner, margin_percent),
                competitive_index: seat_competitive_index,
            });
        }
    }

    analyzed
}

pub fn potential_score(score: u64, is_winner: bool, margin_percent: f64) -> u8 {
    let mut potential = BASE_POTENTIAL;
    if is_winner {
        potential += 30;
    } else if margin_percent < 5.0 {
        potential += 20;
    } else if margin_percent < 10.0 {
        potential += 10;
    }

    if score > HIGH_VOTE_THRESHOLD {
        potential += 10;
    } else if score > MID_VOTE_THRESHOLD {
        potential += 5;
    }

    potential.min(100)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CandidateId, Constituency, Party, PartyId, ProvinceId};

    fn candidate(id: u64, area: u32, party: u32, score: u64) -> Candidate {
        Candidate {
            id: CandidateId(id),
            full_name: format!("Candidate {id}"),
            party_id: PartyId(party),
            constituency_id: ConstituencyId(area),
            score,
        }
    }

    fn snapshot(candidates: Vec<Candidate>) -> Snapshot {
        Snapshot {
            parties: vec![Party {
                id: PartyId(1),
                name: "Alpha".to_string(),
                color: "#123".to_string(),
            }],
            constituencies: vec![Constituency {
                id: ConstituencyId(1),
                name: "Area 1".to_string(),
                province_id: ProvinceId(77),
                area_number: 1,
            }],
            candidates,
            ..Snapshot::default()
        }
    }

    #[test]
    fn ranks_and_margins_follow_score_order() {
        let snap = snapshot(vec![
            candidate(3, 1, 2, 30),
            candidate(1, 1, 1, 50),
            candidate(2, 1, 3, 20),
        ]);
        let analyzed = analyze_candidates(&snap);
        let ranks: Vec<(u64, u32, u64)> = analyzed
            .iter()
            .map(|c| (c.id().0, c.rank, c.margin_votes))
            .collect();
        assert_eq!(ranks, vec![(1, 1, 20), (3, 2, 20), (2, 3, 30)]);
        assert!(analyzed[0].is_winner);
        assert_eq!(analyzed[0].total_votes, 100);
        assert_eq!(analyzed[0].vote_share, 50.0);
        assert_eq!(analyzed[0].margin_percent, 20.0);
        // seat margin 20% -> index 0 for every candidate in the constituency
        assert!(analyzed.iter().all(|c| c.competitive_index == 0));
    }

    #[test]
    fn equal_scores_rank_lower_id_first() {
        let snap = snapshot(vec![candidate(9, 1, 1, 50_000), candidate(4, 1, 2, 50_000)]);
        let analyzed = analyze_candidates(&snap);
        assert_eq!(analyzed[0].id(), CandidateId(4));
        assert!(analyzed[0].is_winner);
        assert_eq!(analyzed[0].margin_votes, 0);
        assert_eq!(analyzed[1].rank, 2);
        assert_eq!(analyzed[0].competitive_index, 100);
    }

    #[test]
    fn unopposed_candidate_has_zero_candidate_margin() {
        let snap = snapshot(vec![candidate(1, 1, 1, 500)]);
        let analyzed = analyze_candidates(&snap);
        assert_eq!(analyzed[0].margin_votes, 0);
        assert_eq!(analyzed[0].vote_share, 100.0);
        // the seat margin is the whole score, so the race is not competitive
        assert_eq!(analyzed[0].competitive_index, 0);
    }

    #[test]
    fn dangling_references_resolve_to_none() {
        let snap = snapshot(vec![candidate(1, 42, 99, 10)]);
        let analyzed = analyze_candidates(&snap);
        assert_eq!(analyzed.len(), 1);
        assert!(analyzed[0].area_name.is_none());
        assert!(analyzed[0].province_name.is_none());
        assert!(analyzed[0].party_name.is_none());
        assert_eq!(analyzed[0].rank, 1);
    }

    #[test]
    fn zero_vote_constituency_is_safe() {
        let snap = snapshot(vec![candidate(1, 1, 1, 0), candidate(2, 1, 2, 0)]);
        for c in analyze_candidates(&snap) {
            assert_eq!(c.margin_percent, 0.0);
            assert_eq!(c.vote_share, 0.0);
        }
    }

    #[test]
    fn potential_score_components() {
        assert_eq!(potential_score(120_000, true, 20.0), 90);
        assert_eq!(potential_score(80_000, false, 4.0), 75);
        assert_eq!(potential_score(50_000, false, 7.0), 60);
        assert_eq!(potential_score(100_000, false, 30.0), 55);
        assert_eq!(potential_score(10, false, 30.0), 50);
    }
}
