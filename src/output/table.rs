use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, Color, ContentArrangement, Row, Table};

use crate::analysis::{
    CandidateAnalysis, CandidateProfile, PartyPerformance, PartyStats, ProvinceAnalysis,
    RegionAnalysis, SeatAnalysis, SeatBuckets, SeatCategory,
};
use crate::model::Snapshot;
use crate::output::format::{group_thousands, optional_percent, or_dash, percent, signed};
use crate::snapshot::store::StoredElection;
use crate::trend::TrendReport;

fn new_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

fn category_cell(category: SeatCategory) -> Cell {
    let color = match category {
        SeatCategory::Safe => Color::Green,
        SeatCategory::Marginal => Color::Cyan,
        SeatCategory::Competitive => Color::Yellow,
        SeatCategory::TossUp => Color::Red,
    };
    Cell::new(category.to_string()).fg(color)
}

pub fn render_candidates_table(candidates: &[&CandidateAnalysis], decimals: usize) -> String {
    let mut table = new_table();
    table.set_header(vec![
        "Candidate",
        "Party",
        "Constituency",
        "Province",
        "Rank",
        "Votes",
        "Share",
        "Margin",
        "Potential",
    ]);

    for c in candidates {
        let rank_cell = if c.is_winner {
            Cell::new(c.rank).fg(Color::Green)
        } else {
            Cell::new(c.rank)
        };
        let margin = if c.is_winner {
            format!("+{}", group_thousands(c.margin_votes))
        } else {
            format!("-{}", group_thousands(c.margin_votes))
        };
        table.add_row(Row::from(vec![
            Cell::new(&c.candidate.full_name),
            Cell::new(or_dash(c.party_name.as_deref())),
            Cell::new(or_dash(c.area_name.as_deref())),
            Cell::new(or_dash(c.province_name.as_deref())),
            rank_cell,
            Cell::new(group_thousands(c.score())),
            Cell::new(percent(c.vote_share, decimals)),
            Cell::new(format!("{margin} ({})", percent(c.margin_percent, decimals))),
            Cell::new(c.potential_score),
        ]));
    }
    table.to_string()
}

pub fn render_candidate_profile_table(profile: &CandidateProfile, decimals: usize) -> String {
    let c = &profile.candidate;
    let mut summary = new_table();
    summary.set_header(vec!["Metric", "Value"]);
    let rows = [
        ("Candidate", c.candidate.full_name.clone()),
        ("Party", or_dash(c.party_name.as_deref())),
        ("Constituency", or_dash(c.area_name.as_deref())),
        ("Province", or_dash(c.province_name.as_deref())),
        ("Region", or_dash(c.region_name.as_deref())),
        ("Rank", format!("{} of {}", c.rank, profile.competitors.len() + 1)),
        ("Votes", group_thousands(c.score())),
        ("Share", percent(c.vote_share, decimals)),
        ("Margin", percent(c.margin_percent, decimals)),
        ("Potential", c.potential_score.to_string()),
        ("Competitive index", c.competitive_index.to_string()),
    ];
    for (label, value) in rows {
        summary.add_row(vec![label.to_string(), value]);
    }
    if profile.competitors.is_empty() {
        return summary.to_string();
    }
    let rivals = profile.competitors.iter().collect::<Vec<_>>();
    format!("{summary}\n{}", render_candidates_table(&rivals, decimals))
}

pub fn render_seats_table(seats: &[&SeatAnalysis], decimals: usize) -> String {
    let mut table = new_table();
    table.set_header(vec![
        "Constituency",
        "Province",
        "Winner",
        "Party",
        "Runner-up",
        "Margin",
        "Category",
        "Index",
    ]);

    for s in seats {
        let runner_up = s
            .runner_up
            .as_ref()
            .map(|r| {
                format!(
                    "{} ({})",
                    r.candidate.full_name,
                    or_dash(r.party_name.as_deref())
                )
            })
            .unwrap_or_else(|| "-".to_string());
        table.add_row(Row::from(vec![
            Cell::new(or_dash(s.area_name.as_deref())),
            Cell::new(or_dash(s.province_name.as_deref())),
            Cell::new(&s.winner.candidate.full_name),
            Cell::new(or_dash(s.winner.party_name.as_deref())),
            Cell::new(runner_up),
            Cell::new(format!(
                "{} ({})",
                group_thousands(s.margin),
                percent(s.margin_percent, decimals)
            )),
            category_cell(s.category),
            Cell::new(s.competitive_index),
        ]));
    }
    table.to_string()
}

pub fn render_seat_summary_table(buckets: &SeatBuckets, decimals: usize) -> String {
    let mut table = new_table();
    table.set_header(vec!["Category", "Seats", "Share"]);
    let total = buckets.all.len() as u64;
    for category in SeatCategory::ALL {
        let count = buckets.bucket(category).len() as u64;
        table.add_row(Row::from(vec![
            category_cell(category),
            Cell::new(count),
            Cell::new(percent(crate::analysis::percent_of(count, total), decimals)),
        ]));
    }
    table.add_row(vec!["Total".to_string(), total.to_string(), String::new()]);
    table.to_string()
}

pub fn render_provinces_table(
    provinces: &[ProvinceAnalysis],
    snapshot: &Snapshot,
    decimals: usize,
) -> String {
    let index = snapshot.index();
    let mut table = new_table();
    table.set_header(vec![
        "Province",
        "Region",
        "Seats",
        "Votes",
        "Dominant Party",
        "Competitive",
        "Turnout",
    ]);
    for p in provinces {
        let dominant = p
            .dominant_party_id
            .and_then(|id| index.party(id))
            .map(|party| party.name.clone())
            .unwrap_or_else(|| "-".to_string());
        table.add_row(vec![
            p.name.clone(),
            or_dash(p.region_name.as_deref()),
            p.total_seats.to_string(),
            group_thousands(p.total_votes),
            dominant,
            format!(
                "{} ({})",
                p.competitive_seats,
                percent(p.competitive_percent, decimals)
            ),
            optional_percent(p.turnout_percent, decimals),
        ]);
    }
    table.to_string()
}

pub fn render_regions_table(regions: &[RegionAnalysis], decimals: usize) -> String {
    let mut table = new_table();
    table.set_header(vec![
        "Region",
        "Provinces",
        "Seats",
        "Votes",
        "Dominant Party",
        "Competitive",
        "Top Parties",
    ]);
    for r in regions {
        let top = r
            .top_parties
            .iter()
            .map(|p| format!("{} {}", or_dash(p.party_name.as_deref()), p.seats))
            .collect::<Vec<_>>()
            .join(", ");
        let dominant = match &r.dominant_party_name {
            Some(name) => format!("{name} ({})", r.dominant_party_seats),
            None => "-".to_string(),
        };
        table.add_row(vec![
            r.name.clone(),
            r.province_count.to_string(),
            r.total_seats.to_string(),
            group_thousands(r.total_votes),
            dominant,
            format!(
                "{} ({})",
                r.competitive_seats,
                percent(r.competitive_percent, decimals)
            ),
            top,
        ]);
    }
    table.to_string()
}

pub fn render_party_stats_table(stats: &[PartyStats]) -> String {
    let mut table = new_table();
    table.set_header(vec![
        "Rank",
        "Party",
        "Votes",
        "Constituency",
        "Party List",
        "Total Seats",
    ]);
    for (idx, s) in stats.iter().enumerate() {
        table.add_row(vec![
            (idx + 1).to_string(),
            s.party_name.clone(),
            group_thousands(s.total_votes),
            s.constituency_seats_won.to_string(),
            s.party_list_seats_won.to_string(),
            s.total_seats.to_string(),
        ]);
    }
    table.to_string()
}

pub fn render_party_performance_table(perf: &PartyPerformance, decimals: usize) -> String {
    let mut summary = new_table();
    summary.set_header(vec!["Metric", "Value"]);
    let rows = [
        ("Party", perf.party_name.clone()),
        ("Votes", group_thousands(perf.total_votes)),
        ("Candidates", perf.candidates_fielded.to_string()),
        ("Winners", perf.winners.to_string()),
        ("Losers", perf.losers.to_string()),
        ("Win rate", percent(perf.win_rate, decimals)),
        ("Average votes", format!("{:.0}", perf.average_votes)),
        (
            "Average winning margin",
            percent(perf.average_winning_margin, decimals),
        ),
        ("Safe seats", perf.safe_seats.to_string()),
        ("Marginal seats", perf.marginal_seats.to_string()),
        ("Contested seats", perf.contested_seats.to_string()),
        (
            "Best province",
            perf.best_province
                .as_ref()
                .map(|p| {
                    format!(
                        "{} ({})",
                        or_dash(p.province_name.as_deref()),
                        percent(p.win_rate, decimals)
                    )
                })
                .unwrap_or_else(|| "-".to_string()),
        ),
    ];
    for (label, value) in rows {
        summary.add_row(vec![label.to_string(), value]);
    }

    let mut provinces = new_table();
    provinces.set_header(vec!["Province", "Votes", "Seats", "Candidates", "Win Rate"]);
    for p in &perf.top_provinces {
        provinces.add_row(vec![
            or_dash(p.province_name.as_deref()),
            group_thousands(p.votes),
            p.seats.to_string(),
            p.candidates.to_string(),
            percent(p.win_rate, decimals),
        ]);
    }

    let mut regions = new_table();
    regions.set_header(vec!["Region", "Votes", "Seats", "Candidates"]);
    for r in &perf.regional_strength {
        regions.add_row(vec![
            r.region_name.clone(),
            group_thousands(r.votes),
            r.seats.to_string(),
            r.candidates.to_string(),
        ]);
    }

    format!("{summary}\n{provinces}\n{regions}")
}

pub fn render_trend_table(report: &TrendReport, decimals: usize) -> String {
    let mut years = new_table();
    years.set_header(vec!["Year", "Votes", "Turnout", "Seats"]);
    for y in &report.years {
        years.add_row(vec![
            y.label.clone(),
            group_thousands(y.total_votes),
            optional_percent(y.turnout_percent, decimals),
            y.total_seats.to_string(),
        ]);
    }

    let mut parties = new_table();
    let mut header = vec!["Party".to_string()];
    header.extend(report.years.iter().map(|y| y.label.clone()));
    header.push("Change".to_string());
    parties.set_header(header);
    for trend in &report.parties {
        let mut row = vec![trend.party_name.clone()];
        row.extend(trend.yearly_data.iter().map(|p| p.seats.to_string()));
        row.push(
            trend
                .latest()
                .and_then(|p| p.seat_change)
                .map(signed)
                .unwrap_or_else(|| "-".to_string()),
        );
        parties.add_row(row);
    }

    let insights = &report.insights;
    let mut lines = vec![format!(
        "{} -> {}: votes {}",
        insights.from_year,
        insights.to_year,
        signed(insights.vote_change)
    )];
    if let Some(change) = insights.turnout_change {
        lines.push(format!("turnout {change:+.decimals$} pts"));
    }
    if let Some(gainer) = &insights.biggest_gainer {
        lines.push(format!(
            "biggest gainer: {} ({})",
            gainer.party_name,
            signed(gainer.seat_change)
        ));
    }
    if let Some(loser) = &insights.biggest_loser {
        lines.push(format!(
            "biggest loser: {} ({})",
            loser.party_name,
            signed(loser.seat_change)
        ));
    }

    format!("{years}\n{parties}\n{}", lines.join("\n"))
}

pub fn render_elections_table(elections: &[StoredElection]) -> String {
    let mut table = new_table();
    table.set_header(vec!["Year", "Label", "Candidates", "Imported", "Description"]);
    for e in elections {
        table.add_row(vec![
            e.year.to_string(),
            e.label.clone(),
            group_thousands(e.candidates),
            e.imported_at
                .map(|t| t.format("%Y-%m-%d %H:%M UTC").to_string())
                .unwrap_or_else(|| "-".to_string()),
            e.description.clone(),
        ]);
    }
    table.to_string()
}
