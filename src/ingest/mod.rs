pub mod csv;
pub mod file;
pub mod http;

use std::fmt::{Display, Formatter};
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::config::{expand_tilde, Config, YearConfig};
use crate::ingest::csv::CsvSource;
use crate::ingest::file::FileSource;
use crate::ingest::http::HttpSource;
use crate::model::{ElectionYear, MultiYearData, Snapshot};
use crate::snapshot::SqliteSource;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    #[default]
    Http,
    Csv,
    File,
    Sqlite,
}

impl SourceKind {
    pub fn as_slug(&self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Csv => "csv",
            Self::File => "file",
            Self::Sqlite => "sqlite",
        }
    }
}

impl Display for SourceKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_slug())
    }
}

#[derive(Debug, Error)]
#[error("unknown source kind: {0}")]
pub struct SourceKindParseError(pub String);

impl FromStr for SourceKind {
    type Err = SourceKindParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "http" | "https" | "remote" => Ok(Self::Http),
            "csv" => Ok(Self::Csv),
            "file" | "json" => Ok(Self::File),
            "sqlite" | "db" => Ok(Self::Sqlite),
            _ => Err(SourceKindParseError(s.to_string())),
        }
    }
}

#[async_trait]
pub trait SnapshotSource: Send + Sync {
    fn kind(&self) -> SourceKind;
    fn describe(&self) -> String;
    async fn produce_snapshot(&self) -> Result<Snapshot>;
}

pub fn source_for(year: &YearConfig, db_path: &Path) -> Result<Arc<dyn SnapshotSource>> {
    let required = |value: &Option<String>, field: &str| {
        value
            .as_deref()
            .filter(|v| !v.trim().is_empty())
            .map(str::to_string)
            .ok_or_else(|| {
                anyhow!(
                    "year {} uses source `{}` but has no `{field}`",
                    year.year,
                    year.source
                )
            })
    };

    let source: Arc<dyn SnapshotSource> = match year.source {
        SourceKind::Http => Arc::new(HttpSource::new(
            required(&year.master_url, "master_url")?,
            required(&year.result_url, "result_url")?,
        )),
        SourceKind::Csv => Arc::new(CsvSource {
            provinces_path: expand_tilde(&required(&year.provinces_path, "provinces_path")?),
            zones_path: expand_tilde(&required(&year.zones_path, "zones_path")?),
            parties_path: expand_tilde(&required(&year.parties_path, "parties_path")?),
            results_path: expand_tilde(&required(&year.results_path, "results_path")?),
        }),
        SourceKind::File => Arc::new(FileSource {
            path: expand_tilde(&required(&year.path, "path")?),
        }),
        SourceKind::Sqlite => Arc::new(SqliteSource {
            db_path: db_path.to_path_buf(),
            year: year.year,
        }),
    };
    Ok(source)
}

pub async fn load_year(year: &YearConfig, db_path: &Path) -> Result<ElectionYear> {
    let source = source_for(year, db_path)?;
    let snapshot = source
        .produce_snapshot()
        .await
        .with_context(|| format!("failed loading {} from {}", year.year, source.describe()))?;
    info!(
        year = year.year,
        source = %source.kind(),
        candidates = snapshot.candidates.len(),
        "election year loaded"
    );
    Ok(ElectionYear {
        year: year.year,
        label: year.display_label(),
        description: year.description.clone(),
        seat_allocation: year.seat_allocation()?,
        snapshot,
    })
}

pub async fn load_years(config: &Config, only: Option<u16>) -> Result<MultiYearData> {
    let db_path = config.resolved_db_path();
    let mut years = Vec::new();
    for year in config
        .years
        .iter()
        .filter(|y| only.map_or(true, |wanted| y.year == wanted))
    {
        years.push(load_year(year, &db_path).await?);
    }
    if let Some(wanted) = only {
        if years.is_empty() {
            return Err(anyhow!("election year {wanted} is not configured"));
        }
    }
    years.sort_by_key(|y| y.year);
    Ok(MultiYearData {
        current_year: only.or(config.current_year),
        years,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_source_kind_aliases() {
        assert_eq!("JSON".parse::<SourceKind>().unwrap(), SourceKind::File);
        assert_eq!(" sqlite ".parse::<SourceKind>().unwrap(), SourceKind::Sqlite);
        assert!("ftp".parse::<SourceKind>().is_err());
    }

    #[test]
    fn missing_source_fields_are_reported() {
        let year = YearConfig {
            year: 2566,
            source: SourceKind::Http,
            master_url: Some("https://example.invalid/master.json".to_string()),
            ..YearConfig::default()
        };
        let err = source_for(&year, Path::new("/tmp/unused.db"))
            .err()
            .expect("result_url is missing");
        assert!(err.to_string().contains("result_url"));

        let sqlite = YearConfig {
            year: 2562,
            source: SourceKind::Sqlite,
            ..YearConfig::default()
        };
        let source = source_for(&sqlite, Path::new("/tmp/unused.db")).unwrap();
        assert_eq!(source.kind(), SourceKind::Sqlite);
    }
}
