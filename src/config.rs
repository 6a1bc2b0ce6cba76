//! Layered configuration: an optional `talentflow.toml` file with
//! environment variables on top (file → environment).
//!
//! # Configuration File Format
//!
//! ```toml
//! database_path = "talentflow.db"
//!
//! [apollo]
//! api_key = "..."
//! timeout_secs = 30
//!
//! [lemlist]
//! api_key = "..."
//! timeout_secs = 30
//!
//! [extractor]
//! url = "https://extractor.internal/v1/extract"
//! timeout_secs = 60
//!
//! [[sequence_steps]]
//! subject = "Introduction"
//! body = "<p>...</p>"
//! delay_days = 1
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::lemlist::SequenceStep;
use crate::pipeline::Timeouts;

const DEFAULT_APOLLO_BASE_URL: &str = "https://api.apollo.io/api/v1";
const DEFAULT_LEMLIST_BASE_URL: &str = "https://api.lemlist.com/api";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct VendorSettings {
    pub api_key: String,
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for VendorSettings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: String::new(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExtractorSettings {
    pub url: String,
    pub timeout_secs: u64,
}

impl Default for ExtractorSettings {
    fn default() -> Self {
        Self {
            url: String::new(),
            timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub database_path: PathBuf,
    pub apollo: VendorSettings,
    pub lemlist: VendorSettings,
    pub extractor: ExtractorSettings,
    pub sequence_steps: Vec<SequenceStep>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("talentflow.db"),
            apollo: VendorSettings {
                base_url: DEFAULT_APOLLO_BASE_URL.to_string(),
                ..Default::default()
            },
            lemlist: VendorSettings {
                base_url: DEFAULT_LEMLIST_BASE_URL.to_string(),
                ..Default::default()
            },
            extractor: ExtractorSettings::default(),
            sequence_steps: Vec::new(),
        }
    }
}

impl Settings {
    /// Load settings from an optional TOML file, then apply environment
    /// overrides. A missing file is fine; defaults apply.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path.unwrap_or_else(|| Path::new("talentflow.toml"));
        let mut settings = if path.exists() {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            toml::from_str(&raw)
                .with_context(|| format!("Failed to parse config file {}", path.display()))?
        } else {
            Self::default()
        };
        settings.fill_vendor_defaults();
        settings.apply_env();
        Ok(settings)
    }

    // A partial vendor section in the file (say, just the api_key) must not
    // erase the well-known base URL.
    fn fill_vendor_defaults(&mut self) {
        if self.apollo.base_url.is_empty() {
            self.apollo.base_url = DEFAULT_APOLLO_BASE_URL.to_string();
        }
        if self.lemlist.base_url.is_empty() {
            self.lemlist.base_url = DEFAULT_LEMLIST_BASE_URL.to_string();
        }
    }

    fn apply_env(&mut self) {
        if let Ok(db) = std::env::var("TALENTFLOW_DB") {
            self.database_path = PathBuf::from(db);
        }
        if let Ok(key) = std::env::var("APOLLO_API_KEY") {
            self.apollo.api_key = key;
        }
        if let Ok(key) = std::env::var("LEMLIST_API_KEY") {
            self.lemlist.api_key = key;
        }
        if let Ok(url) = std::env::var("EXTRACTOR_URL") {
            self.extractor.url = url;
        }
    }

    pub fn timeouts(&self) -> Timeouts {
        Timeouts {
            extractor: Duration::from_secs(self.extractor.timeout_secs),
            apollo: Duration::from_secs(self.apollo.timeout_secs),
            lemlist: Duration::from_secs(self.lemlist.timeout_secs),
        }
    }
}
