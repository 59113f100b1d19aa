use anyhow::Result;

use crate::analysis::{CandidateAnalysis, PartyStats, ProvinceAnalysis, RegionAnalysis, SeatAnalysis};
use crate::trend::TrendReport;

fn finish(writer: csv::Writer<Vec<u8>>) -> Result<String> {
    let data = writer.into_inner()?;
    Ok(String::from_utf8_lossy(&data).to_string())
}

fn opt<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

pub fn candidates_to_csv(candidates: &[&CandidateAnalysis]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(vec![]);
    writer.write_record([
        "candidate_id",
        "full_name",
        "party_id",
        "party_name",
        "constituency_id",
        "province_name",
        "region_name",
        "rank",
        "is_winner",
        "score",
        "total_votes",
        "vote_share",
        "margin_votes",
        "margin_percent",
        "potential_score",
        "competitive_index",
    ])?;
    for c in candidates {
        writer.write_record([
            c.id().to_string(),
            c.candidate.full_name.clone(),
            c.party_id().to_string(),
            opt(c.party_name.as_deref()),
            c.constituency_id().to_string(),
            opt(c.province_name.as_deref()),
            opt(c.region_name.as_deref()),
            c.rank.to_string(),
            c.is_winner.to_string(),
            c.score().to_string(),
            c.total_votes.to_string(),
            format!("{:.4}", c.vote_share),
            c.margin_votes.to_string(),
            format!("{:.4}", c.margin_percent),
            c.potential_score.to_string(),
            c.competitive_index.to_string(),
        ])?;
    }
    finish(writer)
}

pub fn seats_to_csv(seats: &[&SeatAnalysis]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(vec![]);
    writer.write_record([
        "constituency_id",
        "area_name",
        "province_name",
        "winner_id",
        "winner_name",
        "winner_party_id",
        "runner_up_id",
        "runner_up_party_id",
        "candidate_count",
        "margin",
        "margin_percent",
        "total_votes",
        "category",
        "competitive_index",
    ])?;
    for s in seats {
        writer.write_record([
            s.constituency_id.to_string(),
            opt(s.area_name.as_deref()),
            opt(s.province_name.as_deref()),
            s.winner.id().to_string(),
            s.winner.candidate.full_name.clone(),
            s.winner.party_id().to_string(),
            opt(s.runner_up.as_ref().map(|r| r.id())),
            opt(s.runner_up.as_ref().map(|r| r.party_id())),
            s.candidate_count.to_string(),
            s.margin.to_string(),
            format!("{:.4}", s.margin_percent),
            s.total_votes.to_string(),
            s.category.as_slug().to_string(),
            s.competitive_index.to_string(),
        ])?;
    }
    finish(writer)
}

pub fn provinces_to_csv(provinces: &[ProvinceAnalysis]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(vec![]);
    writer.write_record([
        "province_id",
        "name",
        "region_id",
        "total_seats",
        "total_votes",
        "dominant_party_id",
        "competitive_seats",
        "competitive_percent",
        "turnout_percent",
    ])?;
    for p in provinces {
        writer.write_record([
            p.id.to_string(),
            p.name.clone(),
            p.region_id.to_string(),
            p.total_seats.to_string(),
            p.total_votes.to_string(),
            opt(p.dominant_party_id),
            p.competitive_seats.to_string(),
            format!("{:.4}", p.competitive_percent),
            opt(p.turnout_percent.map(|t| format!("{t:.4}"))),
        ])?;
    }
    finish(writer)
}

pub fn regions_to_csv(regions: &[RegionAnalysis]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(vec![]);
    writer.write_record([
        "region_id",
        "name",
        "province_count",
        "total_seats",
        "total_votes",
        "dominant_party_id",
        "dominant_party_seats",
        "competitive_seats",
        "competitive_percent",
    ])?;
    for r in regions {
        writer.write_record([
            r.id.to_string(),
            r.name.clone(),
            r.province_count.to_string(),
            r.total_seats.to_string(),
            r.total_votes.to_string(),
            opt(r.dominant_party_id),
            r.dominant_party_seats.to_string(),
            r.competitive_seats.to_string(),
            format!("{:.4}", r.competitive_percent),
        ])?;
    }
    finish(writer)
}

pub fn party_stats_to_csv(stats: &[PartyStats]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(vec![]);
    writer.write_record([
        "party_id",
        "party_name",
        "total_votes",
        "constituency_seats",
        "party_list_seats",
        "total_seats",
    ])?;
    for s in stats {
        writer.write_record([
            s.party_id.to_string(),
            s.party_name.clone(),
            s.total_votes.to_string(),
            s.constituency_seats_won.to_string(),
            s.party_list_seats_won.to_string(),
            s.total_seats.to_string(),
        ])?;
    }
    finish(writer)
}

pub fn trend_to_csv(report: &TrendReport) -> Result<String> {
    let mut writer = csv::Writer::from_writer(vec![]);
    writer.write_record([
        "party_id",
        "party_name",
        "year",
        "seats",
        "votes",
        "seat_change",
        "vote_change",
    ])?;
    for trend in &report.parties {
        for point in &trend.yearly_data {
            writer.write_record([
                trend.party_id.to_string(),
                trend.party_name.clone(),
                point.year.to_string(),
                point.seats.to_string(),
                point.votes.to_string(),
                opt(point.seat_change),
                opt(point.vote_change),
            ])?;
        }
    }
    finish(writer)
}
