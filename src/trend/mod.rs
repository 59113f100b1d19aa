pub mod engine;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::analysis::PartyStats;
use crate::model::PartyId;

pub use engine::{analyze_trends, analyze_year, compute_trends};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TrendError {
    #[error("trend analysis needs at least two election years, got {years}")]
    InsufficientData { years: usize },
    #[error("election year {0} appears more than once")]
    DuplicateYear(u16),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct YearSummary {
    pub year: u16,
    pub label: String,
    pub total_votes: u64,
    pub turnout_percent: Option<f64>,
    pub total_seats: usize,
    pub party_seats: BTreeMap<PartyId, u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct YearAnalysis {
    pub summary: YearSummary,
    pub party_stats: Vec<PartyStats>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct YearPoint {
    pub year: u16,
    pub seats: u32,
    pub votes: u64,
    pub seat_change: Option<i64>,
    pub vote_change: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PartyTrend {
    pub party_id: PartyId,
    pub party_name: String,
    pub party_color: String,
    pub yearly_data: Vec<YearPoint>,
}

impl PartyTrend {
    pub fn latest(&self) -> Option<&YearPoint> {
        self.yearly_data.last()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PartyShift {
    pub party_id: PartyId,
    pub party_name: String,
    pub seat_change: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrendInsights {
    pub from_year: u16,
    pub to_year: u16,
    pub turnout_change: Option<f64>,
    pub vote_change: i64,
    pub biggest_gainer: Option<PartyShift>,
    pub biggest_loser: Option<PartyShift>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrendReport {
    pub years: Vec<YearSummary>,
    pub parties: Vec<PartyTrend>,
    pub insights: TrendInsights,
}
