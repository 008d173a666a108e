use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

const DEFAULT_CONFIG_FILE: &str = "harvest.toml";
const ENV_PREFIX: &str = "HARVEST";

/// A distributor seed: the company-filtered listing that discovery starts from.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Seed {
    pub name: String,
    pub url: String,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProducerLayout {
    /// One row per title, producers serialized as a bracketed list.
    #[default]
    List,
    /// One row per (title, producer) pair.
    Rows,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub seeds: Vec<Seed>,
    pub site_root: String,
    /// Year that closes open-ended (`2019-`) distribution windows.
    pub as_of_year: Option<i32>,
    pub output_dir: PathBuf,
    pub page_delay_ms: u64,
    pub title_delay_ms: u64,
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub base_backoff_ms: u64,
    pub breaker_threshold: u32,
    pub producer_layout: ProducerLayout,
    pub user_agent: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            seeds: vec![
                Seed {
                    name: "Netflix".into(),
                    url: "https://www.imdb.com/search/title/?companies=co0144901".into(),
                },
                Seed {
                    name: "Disney+".into(),
                    url: "https://www.imdb.com/search/title/?companies=co0721120".into(),
                },
            ],
            site_root: "https://www.imdb.com".into(),
            as_of_year: None,
            output_dir: PathBuf::from("data/imdb"),
            page_delay_ms: 2000,
            title_delay_ms: 2000,
            timeout_secs: 30,
            max_retries: 3,
            base_backoff_ms: 2000,
            breaker_threshold: 5,
            producer_layout: ProducerLayout::List,
            user_agent: concat!("distributor_harvest/", env!("CARGO_PKG_VERSION")).into(),
        }
    }
}

impl Settings {
    /// Layer defaults, an optional TOML file and `HARVEST_*` environment variables.
    ///
    /// An explicit `path` must exist; the default `harvest.toml` is optional.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(p) => config::File::from(p.to_path_buf()).required(true),
            None => config::File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        config::Config::builder()
            .add_source(file)
            .add_source(config::Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()
            .context("Failed to read configuration")?
            .try_deserialize::<Settings>()
            .context("Invalid configuration")
    }

    pub fn find_seed(&self, name: &str) -> Option<&Seed> {
        self.seeds.iter().find(|s| s.name.eq_ignore_ascii_case(name))
    }

    /// Seeds selected on the command line, or all of them.
    pub fn selected_seeds(&self, name: Option<&str>) -> Result<Vec<Seed>> {
        match name {
            Some(n) => self
                .find_seed(n)
                .cloned()
                .map(|s| vec![s])
                .ok_or_else(|| anyhow::anyhow!("Unknown seed '{}'. Run 'seeds' to list them.", n)),
            None => Ok(self.seeds.clone()),
        }
    }

    pub fn require_as_of_year(&self) -> Result<i32> {
        self.as_of_year.ok_or_else(|| {
            anyhow::anyhow!(
                "as_of_year is not configured: pass --as-of, set HARVEST_AS_OF_YEAR or add it to {}",
                DEFAULT_CONFIG_FILE
            )
        })
    }
}
