use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::analysis::aggregate::turnout_percent;
use crate::analysis::candidates::analyze_candidates;
use crate::analysis::party::compute_party_stats;
use crate::analysis::seats::classify_seats;
use crate::model::{ElectionYear, MultiYearData, PartyId};
use crate::trend::{
    PartyShift, PartyTrend, TrendError, TrendInsights, TrendReport, YearAnalysis, YearPoint,
    YearSummary,
};

pub fn analyze_year(election: &ElectionYear) -> YearAnalysis {
    let snapshot = &election.snapshot;
    let candidates = analyze_candidates(snapshot);
    let seats = classify_seats(&candidates);
    let party_stats = compute_party_stats(snapshot, &seats, election.seat_allocation);

    let total_seats = snapshot
        .constituencies
        .iter()
        .map(|c| c.id)
        .collect::<BTreeSet<_>>()
        .len();
    let party_seats = party_stats
        .iter()
        .map(|s| (s.party_id, s.total_seats))
        .collect();

    YearAnalysis {
        summary: YearSummary {
            year: election.year,
            label: election.label.clone(),
            total_votes: snapshot.total_candidate_votes(),
            turnout_percent: turnout_percent(snapshot, &seats),
            total_seats,
            party_seats,
        },
        party_stats,
    }
}

pub fn analyze_trends(data: &MultiYearData) -> Result<TrendReport, TrendError> {
    let analyzed = data.years.iter().map(analyze_year).collect::<Vec<_>>();
    compute_trends(&analyzed)
}

/// Biggest gainer and loser are picked after sorting by `(|seat change| desc, party id asc)`.
pub fn compute_trends(years: &[YearAnalysis]) -> Result<TrendReport, TrendError> {
    let mut ordered = years.iter().collect::<Vec<_>>();
    ordered.sort_by_key(|y| y.summary.year);
    for pair in ordered.windows(2) {
        if pair[0].summary.year == pair[1].summary.year {
            return Err(TrendError::DuplicateYear(pair[0].summary.year));
        }
    }
    if ordered.len() < 2 {
        return Err(TrendError::InsufficientData {
            years: ordered.len(),
        });
    }

    // Later years overwrite names so each party carries its most recent label.
    let mut identities: BTreeMap<PartyId, (String, String)> = BTreeMap::new();
    for year in &ordered {
        for stats in &year.party_stats {
            identities.insert(
                stats.party_id,
                (stats.party_name.clone(), stats.party_color.clone()),
            );
        }
    }

    let mut parties = identities
        .into_iter()
        .map(|(party_id, (party_name, party_color))| {
            let mut yearly_data: Vec<YearPoint> = Vec::with_capacity(ordered.len());
            for year in &ordered {
                let (seats, votes) = year
                    .party_stats
                    .iter()
                    .find(|s| s.party_id == party_id)
                    .map(|s| (s.total_seats, s.total_votes))
                    .unwrap_or((0, 0));
                let previous = yearly_data.last().map(|p| (p.seats, p.votes));
                yearly_data.push(YearPoint {
                    year: year.summary.year,
                    seats,
                    votes,
                    seat_change: previous.map(|(s, _)| i64::from(seats) - i64::from(s)),
                    vote_change: previous.map(|(_, v)| votes as i64 - v as i64),
                });
            }
            PartyTrend {
                party_id,
                party_name,
                party_color,
                yearly_data,
            }
        })
        .collect::<Vec<_>>();

    parties.sort_by(|a, b| {
        let seats = |t: &PartyTrend| t.latest().map(|p| p.seats).unwrap_or(0);
        seats(b)
            .cmp(&seats(a))
            .then_with(|| a.party_id.cmp(&b.party_id))
    });

    let insights = insights(&ordered, &parties);
    debug!(
        years = ordered.len(),
        parties = parties.len(),
        "computed election trends"
    );

    Ok(TrendReport {
        years: ordered.iter().map(|y| y.summary.clone()).collect(),
        parties,
        insights,
    })
}

fn insights(ordered: &[&YearAnalysis], parties: &[PartyTrend]) -> TrendInsights {
    let previous = &ordered[ordered.len() - 2].summary;
    let latest = &ordered[ordered.len() - 1].summary;

    let mut shifts = parties
        .iter()
        .filter_map(|trend| {
            let change = trend.latest()?.seat_change?;
            Some(PartyShift {
                party_id: trend.party_id,
                party_name: trend.party_name.clone(),
                seat_change: change,
            })
        })
        .collect::<Vec<_>>();
    shifts.sort_by(|a, b| {
        b.seat_change
            .abs()
            .cmp(&a.seat_change.abs())
            .then_with(|| a.party_id.cmp(&b.party_id))
    });

    TrendInsights {
        from_year: previous.year,
        to_year: latest.year,
        turnout_change: latest
            .turnout_percent
            .zip(previous.turnout_percent)
            .map(|(now, before)| now - before),
        vote_change: latest.total_votes as i64 - previous.total_votes as i64,
        biggest_gainer: shifts.iter().find(|s| s.seat_change > 0).cloned(),
        biggest_loser: shifts.iter().find(|s| s.seat_change < 0).cloned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::PartyStats;

    fn stats(party: u32, seats: u32, votes: u64) -> PartyStats {
        PartyStats {
            party_id: PartyId(party),
            party_name: format!("Party {party}"),
            party_color: String::new(),
            total_votes: votes,
            constituency_seats_won: seats,
            party_list_seats_won: 0,
            total_seats: seats,
        }
    }

    fn year(year: u16, turnout: Option<f64>, party_stats: Vec<PartyStats>) -> YearAnalysis {
        YearAnalysis {
            summary: YearSummary {
                year,
                label: year.to_string(),
                total_votes: party_stats.iter().map(|s| s.total_votes).sum(),
                turnout_percent: turnout,
                total_seats: 10,
                party_seats: party_stats
                    .iter()
                    .map(|s| (s.party_id, s.total_seats))
                    .collect(),
            },
            party_stats,
        }
    }

    #[test]
    fn fewer_than_two_years_is_insufficient() {
        assert_eq!(
            compute_trends(&[]),
            Err(TrendError::InsufficientData { years: 0 })
        );
        let one = [year(2566, None, vec![stats(1, 3, 100)])];
        assert_eq!(
            compute_trends(&one),
            Err(TrendError::InsufficientData { years: 1 })
        );
    }

    #[test]
    fn duplicate_years_are_rejected() {
        let years = [year(2566, None, vec![]), year(2566, None, vec![])];
        assert_eq!(compute_trends(&years), Err(TrendError::DuplicateYear(2566)));
    }

    #[test]
    fn new_party_is_zero_filled_in_earlier_years() {
        let years = [
            year(2566, Some(75.0), vec![stats(1, 4, 400), stats(3, 2, 300)]),
            year(2562, Some(70.5), vec![stats(1, 6, 500)]),
        ];
        let report = compute_trends(&years).unwrap();
        assert_eq!(
            report.years.iter().map(|y| y.year).collect::<Vec<_>>(),
            vec![2562, 2566]
        );

        let newcomer = report
            .parties
            .iter()
            .find(|p| p.party_id == PartyId(3))
            .unwrap();
        assert_eq!(newcomer.yearly_data.len(), 2);
        assert_eq!(newcomer.yearly_data[0].seats, 0);
        assert_eq!(newcomer.yearly_data[0].votes, 0);
        assert_eq!(newcomer.yearly_data[0].seat_change, None);
        assert_eq!(newcomer.yearly_data[1].seat_change, Some(2));
        assert_eq!(newcomer.yearly_data[1].vote_change, Some(300));

        assert_eq!(report.insights.turnout_change, Some(4.5));
        assert_eq!(report.insights.vote_change, 200);
    }

    #[test]
    fn gainer_and_loser_break_ties_on_party_id() {
        let years = [
            year(2562, None, vec![stats(1, 5, 10), stats(2, 5, 10), stats(4, 1, 1)]),
            year(
                2566,
                None,
                vec![stats(1, 2, 10), stats(2, 8, 10), stats(3, 3, 1), stats(4, 1, 1)],
            ),
        ];
        let report = compute_trends(&years).unwrap();
        let gainer = report.insights.biggest_gainer.unwrap();
        let loser = report.insights.biggest_loser.unwrap();
        // parties 1, 2 and 3 all moved by three seats
        assert_eq!(gainer.party_id, PartyId(2));
        assert_eq!(gainer.seat_change, 3);
        assert_eq!(loser.party_id, PartyId(1));
        assert_eq!(loser.seat_change, -3);
        assert!(report.insights.turnout_change.is_none());

        // ranked by latest seats
        assert_eq!(report.parties[0].party_id, PartyId(2));
    }

    #[test]
    fn no_movement_has_no_gainer() {
        let years = [
            year(2562, None, vec![stats(1, 5, 10)]),
            year(2566, None, vec![stats(1, 5, 12)]),
        ];
        let report = compute_trends(&years).unwrap();
        assert!(report.insights.biggest_gainer.is_none());
        assert!(report.insights.biggest_loser.is_none());
    }
}
