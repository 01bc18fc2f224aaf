use anyhow::{Context, Result};
use config::{Config, ConfigError, Environment, File as ConfigFile};
use serde::Deserialize;
use std::env;
use std::time::Duration;

use crate::embedding::DEFAULT_MAX_INPUT_CHARS;
use crate::normalizer::MatchMode;
use crate::retry::RetryPolicy;
use crate::store::DEFAULT_TOP_K;

pub type Number = f32;

pub const EPSILON: f32 = 1e-6;

#[derive(Deserialize)]
pub struct PartsearchConfig {
    pub path: Option<String>,
    pub dimensions: Option<usize>,
    pub top_k: Option<usize>,
    pub batch_size: Option<usize>,
    pub max_input_chars: Option<usize>,
    pub load_attempts: Option<u32>,
    pub load_backoff_ms: Option<u64>,
    pub labor_rate: Option<f64>,
    pub match_mode: Option<String>,
}

impl PartsearchConfig {
    pub fn try_from(config: &Config) -> Result<Self, ConfigError> {
        Ok(PartsearchConfig {
            path: config.get("path").ok(),
            dimensions: config.get("dimensions").ok(),
            top_k: config.get("top_k").ok(),
            batch_size: config.get("batch_size").ok(),
            max_input_chars: config.get("max_input_chars").ok(),
            load_attempts: config.get("load_attempts").ok(),
            load_backoff_ms: config.get("load_backoff_ms").ok(),
            labor_rate: config.get("labor_rate").ok(),
            match_mode: config.get("match_mode").ok(),
        })
    }
}

pub struct State {
    pub path: String,
    pub dimensions: usize,
    pub top_k: usize,
    pub batch_size: usize,
    pub max_input_chars: usize,
    pub load_attempts: u32,
    pub load_backoff: Duration,
    pub labor_rate: f64,
    pub match_mode: MatchMode,
}

impl State {
    pub fn new() -> Result<Self> {
        let mut config = Config::default();
        #[allow(deprecated)]
        {
            config.merge(ConfigFile::with_name("partsearch_config").required(false))?;
            config.merge(Environment::with_prefix("PARTSEARCH"))?;
        }

        let partsearch_config = PartsearchConfig::try_from(&config)?;

        let path = partsearch_config
            .path
            .or_else(|| env::var("PARTSEARCH_PATH").ok())
            .context("PARTSEARCH_PATH not set in config or environment")?;

        let dimensions = partsearch_config
            .dimensions
            .or_else(|| env_parse("PARTSEARCH_DIMENSIONS"))
            .unwrap_or(512);

        let top_k = partsearch_config
            .top_k
            .or_else(|| env_parse("PARTSEARCH_TOP_K"))
            .unwrap_or(DEFAULT_TOP_K);

        let batch_size = partsearch_config
            .batch_size
            .or_else(|| env_parse("PARTSEARCH_BATCH_SIZE"))
            .unwrap_or(50);

        let max_input_chars = partsearch_config
            .max_input_chars
            .or_else(|| env_parse("PARTSEARCH_MAX_INPUT_CHARS"))
            .unwrap_or(DEFAULT_MAX_INPUT_CHARS);

        let load_attempts = partsearch_config
            .load_attempts
            .or_else(|| env_parse("PARTSEARCH_LOAD_ATTEMPTS"))
            .unwrap_or(3);

        let load_backoff_ms = partsearch_config
            .load_backoff_ms
            .or_else(|| env_parse("PARTSEARCH_LOAD_BACKOFF_MS"))
            .unwrap_or(1000);

        let labor_rate = partsearch_config
            .labor_rate
            .or_else(|| env_parse("PARTSEARCH_LABOR_RATE"))
            .unwrap_or(95.0);

        let match_mode = partsearch_config
            .match_mode
            .or_else(|| env::var("PARTSEARCH_MATCH_MODE").ok())
            .unwrap_or_else(|| "substring".to_string());
        let match_mode: MatchMode = match_mode.parse()?;

        if dimensions == 0 {
            anyhow::bail!("PARTSEARCH_DIMENSIONS must be greater than zero.");
        }
        if batch_size == 0 {
            anyhow::bail!("PARTSEARCH_BATCH_SIZE must be greater than zero.");
        }
        if max_input_chars == 0 {
            anyhow::bail!("PARTSEARCH_MAX_INPUT_CHARS must be greater than zero.");
        }
        if !labor_rate.is_finite() || labor_rate < 0.0 {
            anyhow::bail!("PARTSEARCH_LABOR_RATE must be a non-negative number.");
        }

        Ok(Self {
            path,
            dimensions,
            top_k,
            batch_size,
            max_input_chars,
            load_attempts,
            load_backoff: Duration::from_millis(load_backoff_ms),
            labor_rate,
            match_mode,
        })
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.load_attempts, self.load_backoff)
    }

    pub fn print_config(&self) {
        println!("path={}", self.path);
        println!("dimensions={}", self.dimensions);
        println!("top_k={}", self.top_k);
        println!("batch_size={}", self.batch_size);
        println!("max_input_chars={}", self.max_input_chars);
        println!("load_attempts={}", self.load_attempts);
        println!("load_backoff_ms={}", self.load_backoff.as_millis());
        println!("labor_rate={:.2}", self.labor_rate);
        println!("match_mode={}", self.match_mode);
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|s| s.parse().ok())
}
