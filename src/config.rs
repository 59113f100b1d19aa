use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::analysis::CompetitiveRule;
use crate::ingest::SourceKind;
use crate::model::SeatAllocation;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub current_year: Option<u16>,
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default = "default_years")]
    pub years: Vec<YearConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    #[serde(default = "default_province_rule")]
    pub province_competitive_rule: CompetitiveRule,
    #[serde(default = "default_region_rule")]
    pub region_competitive_rule: CompetitiveRule,
    #[serde(default = "default_percent_decimals")]
    pub percent_decimals: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_db_path")]
    pub db_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct YearConfig {
    pub year: u16,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub source: SourceKind,
    #[serde(default)]
    pub master_url: Option<String>,
    #[serde(default)]
    pub result_url: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub provinces_path: Option<String>,
    #[serde(default)]
    pub zones_path: Option<String>,
    #[serde(default)]
    pub parties_path: Option<String>,
    #[serde(default)]
    pub results_path: Option<String>,
    #[serde(default)]
    pub seat_allocation: Option<String>,
    #[serde(default)]
    pub house_size: Option<u32>,
}

impl YearConfig {
    pub fn display_label(&self) -> String {
        self.label.clone().unwrap_or_else(|| self.year.to_string())
    }

    pub fn seat_allocation(&self) -> Result<SeatAllocation> {
        let parsed = match self.seat_allocation.as_deref() {
            Some(raw) => raw
                .parse::<SeatAllocation>()
                .with_context(|| format!("invalid seat_allocation for year {}", self.year))?,
            None => SeatAllocation::default(),
        };
        Ok(match (parsed, self.house_size) {
            (SeatAllocation::ApproximateMixedMember { .. }, Some(house_size)) => {
                SeatAllocation::ApproximateMixedMember { house_size }
            }
            (other, _) => other,
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub current_year: Option<u16>,
    pub db_path: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
}

impl Config {
    pub fn default_path() -> PathBuf {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        home.join(".config/election-insight/config.toml")
    }

    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path
            .map(|p| p.to_path_buf())
            .unwrap_or_else(Self::default_path);
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = fs::read_to_string(&path)
            .with_context(|| format!("failed reading config: {}", path.display()))?;
        let parsed: Self = toml::from_str(&data)
            .with_context(|| format!("failed parsing TOML config: {}", path.display()))?;
        Ok(parsed)
    }

    pub fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(year) = overrides.current_year {
            self.current_year = Some(year);
        }
        if let Some(db_path) = overrides.db_path {
            self.storage.db_path = db_path;
        }
        if let Some(host) = overrides.host {
            self.server.host = host;
        }
        if let Some(port) = overrides.port {
            self.server.port = port;
        }
    }

    pub fn write_template(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("failed creating config directory: {}", parent.display())
            })?;
        }
        fs::write(path, Self::default_template())
            .with_context(|| format!("failed writing config template: {}", path.display()))
    }

    pub fn resolved_db_path(&self) -> PathBuf {
        expand_tilde(&self.storage.db_path)
    }

    pub fn year(&self, year: u16) -> Option<&YearConfig> {
        self.years.iter().find(|y| y.year == year)
    }

    pub fn selected_year(&self) -> Option<u16> {
        self.current_year
            .or_else(|| self.years.iter().map(|y| y.year).max())
    }

    pub fn default_template() -> String {
        let template = r#"# current_year = 2566

[analysis]
province_competitive_rule = "competitive_or_marginal"
region_competitive_rule = "competitive_or_toss_up"
percent_decimals = 1

[storage]
db_path = "~/.local/share/election-insight/elections.db"

[server]
host = "127.0.0.1"
port = 3002

[[years]]
year = 2566
label = "2566"
description = "General election 2566 (2023)"
source = "http"
master_url = "https://storage.googleapis.com/voicetv-election-data-prod/result/master-data.json"
result_url = "https://storage.googleapis.com/voicetv-election-data-prod/result/result.json"
seat_allocation = "reported"

[[years]]
year = 2562
label = "2562"
description = "General election 2562 (2019)"
source = "csv"
provinces_path = "~/.local/share/election-insight/2562/_provinces.json"
zones_path = "~/.local/share/election-insight/2562/_zones.json"
parties_path = "~/.local/share/election-insight/2562/_parties.json"
results_path = "~/.local/share/election-insight/2562/results.csv"
seat_allocation = "approximate_mixed_member"
house_size = 500
"#;
        template.to_string()
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            current_year: None,
            analysis: AnalysisConfig::default(),
            storage: StorageConfig::default(),
            server: ServerConfig::default(),
            years: default_years(),
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            province_competitive_rule: default_province_rule(),
            region_competitive_rule: default_region_rule(),
            percent_decimals: default_percent_decimals(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_province_rule() -> CompetitiveRule {
    CompetitiveRule::CompetitiveOrMarginal
}

fn default_region_rule() -> CompetitiveRule {
    CompetitiveRule::CompetitiveOrTossUp
}

fn default_percent_decimals() -> usize {
    1
}

fn default_db_path() -> String {
    "~/.local/share/election-insight/elections.db".to_string()
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3002
}

fn default_years() -> Vec<YearConfig> {
    vec![YearConfig {
        year: 2566,
        label: Some("2566".to_string()),
        description: "General election 2566 (2023)".to_string(),
        source: SourceKind::Http,
        master_url: Some(
            "https://storage.googleapis.com/voicetv-election-data-prod/result/master-data.json"
                .to_string(),
        ),
        result_url: Some(
            "https://storage.googleapis.com/voicetv-election-data-prod/result/result.json"
                .to_string(),
        ),
        seat_allocation: Some("reported".to_string()),
        ..YearConfig::default()
    }]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_parses_with_both_years() {
        let config: Config = toml::from_str(&Config::default_template()).unwrap();
        assert_eq!(config.years.len(), 2);
        assert_eq!(config.server.port, 3002);
        assert_eq!(config.selected_year(), Some(2566));

        let older = config.year(2562).unwrap();
        assert_eq!(older.source, SourceKind::Csv);
        assert_eq!(
            older.seat_allocation().unwrap(),
            SeatAllocation::ApproximateMixedMember { house_size: 500 }
        );
    }

    #[test]
    fn empty_file_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(
            config.analysis.province_competitive_rule,
            CompetitiveRule::CompetitiveOrMarginal
        );
        assert_eq!(
            config.analysis.region_competitive_rule,
            CompetitiveRule::CompetitiveOrTossUp
        );
        assert_eq!(config.years.len(), 1);
        assert_eq!(config.years[0].seat_allocation().unwrap(), SeatAllocation::Reported);
    }

    #[test]
    fn overrides_replace_selected_fields() {
        let mut config = Config::default();
        config.apply_overrides(ConfigOverrides {
            current_year: Some(2562),
            port: Some(8080),
            ..ConfigOverrides::default()
        });
        assert_eq!(config.selected_year(), Some(2562));
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "127.0.0.1");
    }

    #[test]
    fn house_size_only_applies_to_mixed_member() {
        let year = YearConfig {
            year: 2562,
            seat_allocation: Some("constituency_only".to_string()),
            house_size: Some(350),
            ..YearConfig::default()
        };
        assert_eq!(year.seat_allocation().unwrap(), SeatAllocation::ConstituencyOnly);
        let bad = YearConfig {
            seat_allocation: Some("dhondt".to_string()),
            ..year
        };
        assert!(bad.seat_allocation().is_err());
    }
}
