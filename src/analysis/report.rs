use crate::analysis::aggregate::{
    analyze_provinces_from_seats, analyze_regions_from_seats, turnout_percent,
};
use crate::analysis::candidates::analyze_candidates;
use crate::analysis::filter::{target_seats, CandidateFilter};
use crate::analysis::party::{compute_party_stats, party_performance};
use crate::analysis::seats::classify_seats;
use crate::analysis::{
    CandidateAnalysis, CandidateProfile, CompetitiveRule, PartyPerformance, PartyStats, ProvinceAnalysis,
    RegionAnalysis, SeatAnalysis, SeatBuckets, SeatCategory,
};
use crate::model::{CandidateId, ElectionYear, PartyId};

#[derive(Debug, Clone)]
pub struct ElectionReport<'a> {
    pub election: &'a ElectionYear,
    pub candidates: Vec<CandidateAnalysis>,
    pub seats: SeatBuckets,
}

impl<'a> ElectionReport<'a> {
    pub fn build(election: &'a ElectionYear) -> Self {
        let candidates = analyze_candidates(&election.snapshot);
        let seats = SeatBuckets::from_seats(classify_seats(&candidates));
        Self {
            election,
            candidates,
            seats,
        }
    }

    pub fn provinces(&self, rule: CompetitiveRule) -> Vec<ProvinceAnalysis> {
        analyze_provinces_from_seats(&self.election.snapshot, &self.seats.all, rule)
    }

    pub fn regions(&self, rule: CompetitiveRule) -> Vec<RegionAnalysis> {
        analyze_regions_from_seats(&self.election.snapshot, &self.seats.all, rule)
    }

    pub fn party_stats(&self) -> Vec<PartyStats> {
        compute_party_stats(
            &self.election.snapshot,
            &self.seats.all,
            self.election.seat_allocation,
        )
    }

    pub fn party(&self, party_id: PartyId) -> Option<PartyPerformance> {
        party_performance(
            &self.election.snapshot,
            &self.candidates,
            &self.seats.all,
            party_id,
        )
    }

    pub fn candidate(&self, id: CandidateId) -> Option<CandidateProfile> {
        let candidate = self.candidates.iter().find(|c| c.id() == id)?.clone();
        let mut competitors = self
            .candidates
            .iter()
            .filter(|c| c.constituency_id() == candidate.constituency_id() && c.id() != id)
            .cloned()
            .collect::<Vec<_>>();
        competitors.sort_by_key(|c| (c.rank, c.id()));
        Some(CandidateProfile {
            candidate,
            competitors,
        })
    }

    pub fn search(&self, filter: &CandidateFilter) -> Vec<&CandidateAnalysis> {
        filter.apply(&self.candidates)
    }

    pub fn targets(
        &self,
        category: Option<SeatCategory>,
        winning_party: Option<PartyId>,
    ) -> Vec<&SeatAnalysis> {
        target_seats(&self.seats.all, category, winning_party)
    }

    pub fn turnout_percent(&self) -> Option<f64> {
        turnout_percent(&self.election.snapshot, &self.seats.all)
    }
}
