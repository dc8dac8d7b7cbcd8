use crate::{
    calculation::{Astronomical, Convention, HighLatitudeRule},
    geocode::GeocodeXyz,
    indicator::Output,
    scheduler::Scheduler,
};
use anyhow::{bail, Context};
use log::info;
use serde::Deserialize;
use std::{
    env,
    fs::File,
    io::{BufReader, ErrorKind},
    path::{Path, PathBuf},
    time::Duration,
};

/// App configuration. Every field has a default, so the file is optional.
#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Base URL of the geocode.xyz API
    pub geocode_url: String,
    /// Where the user's city is saved
    pub settings_file: PathBuf,
    /// Write the status here instead of stdout
    pub status_file: Option<PathBuf>,
    pub convention: Convention,
    pub hanafi_asr: bool,
    /// How Fajr and Isha are placed when twilight lasts all night
    pub high_latitude_rule: HighLatitudeRule,
    pub countdown_interval_ms: u64,
    pub refresh_interval_ms: u64,
}

impl Config {
    const PATH: &'static str = "./config.json";
    const PATH_VARIABLE: &'static str = "MUEZZIN_CONFIG";

    /// Load config from `$MUEZZIN_CONFIG`, or `./config.json` if that isn't
    /// set. A missing file gets defaults.
    pub fn load() -> anyhow::Result<Self> {
        let path = env::var_os(Self::PATH_VARIABLE)
            .map(PathBuf::from)
            .unwrap_or_else(|| Self::PATH.into());
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let file = match File::open(path) {
            Ok(file) => file,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!("No config at `{}`, using defaults", path.display());
                return Ok(Self::default());
            }
            Err(err) => {
                return Err(err).with_context(|| {
                    format!("Error opening config file {}", path.display())
                })
            }
        };
        info!("Loading config from `{}`", path.display());
        let config: Self = serde_json::from_reader(BufReader::new(file))
            .with_context(|| {
                format!("Error parsing config file {}", path.display())
            })?;
        if config.countdown_interval_ms == 0 || config.refresh_interval_ms == 0
        {
            bail!("Timer intervals in {} must be non-zero", path.display());
        }
        Ok(config)
    }

    pub fn output(&self) -> Output {
        match &self.status_file {
            Some(path) => Output::File(path.clone()),
            None => Output::Stdout,
        }
    }

    pub fn calculator(&self) -> Astronomical {
        Astronomical::new(self.convention, self.hanafi_asr)
            .with_high_latitude_rule(self.high_latitude_rule)
    }

    pub fn scheduler(&self) -> Scheduler {
        Scheduler::new(
            Duration::from_millis(self.countdown_interval_ms),
            Duration::from_millis(self.refresh_interval_ms),
        )
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            geocode_url: GeocodeXyz::DEFAULT_URL.to_owned(),
            settings_file: "./settings.json".into(),
            status_file: None,
            convention: Convention::default(),
            hanafi_asr: false,
            high_latitude_rule: HighLatitudeRule::default(),
            countdown_interval_ms: Scheduler::COUNTDOWN_INTERVAL.as_millis()
                as u64,
            refresh_interval_ms: Scheduler::REFRESH_INTERVAL.as_millis() as u64,
        }
    }
}
