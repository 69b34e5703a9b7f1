use std::path::{Path, PathBuf};
use std::time::Duration;

use config::Config;
use serde::Deserialize;

use crate::error::PipelineError;

pub const DEFAULT_CONFIG_FILE: &str = "vision_prechunk.toml";
const ENV_PREFIX: &str = "VPC";

/// How a classifier label that mentions both routed categories is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum MatchMode {
    /// Every category whose trigger appears in the label is extracted.
    #[default]
    Independent,
    /// Only the first matching category (cover page before table of contents).
    FirstMatch,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub input_dir: PathBuf,
    pub caption_dir: PathBuf,
    pub toc_dir: PathBuf,
    pub model: String,
    pub api_url: String,
    pub max_tokens: u32,
    pub image_extension: String,
    pub concurrency: usize,
    pub strict: bool,
    pub match_mode: MatchMode,
    pub request_timeout_secs: Option<u64>,
}

impl Default for Settings {
    fn default() -> Self {
        let base = PathBuf::from("vision_prechunking");
        Settings {
            input_dir: base.join("images"),
            caption_dir: base.join("captions"),
            toc_dir: base.join("toc"),
            model: "gemma-3-27b-it".to_string(),
            api_url: "http://localhost:1234/v1/chat/completions".to_string(),
            max_tokens: 1536,
            image_extension: "jpg".to_string(),
            concurrency: 4,
            strict: false,
            match_mode: MatchMode::Independent,
            request_timeout_secs: None,
        }
    }
}

impl Settings {
    /// Layer defaults, the TOML file and `VPC_*` environment variables.
    ///
    /// An explicit `path` must exist; the default file is optional.
    pub fn load(path: Option<&Path>) -> Result<Settings, PipelineError> {
        let file = match path {
            Some(p) => config::File::from(p).required(true),
            None => config::File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        let settings: Settings = Config::builder()
            .add_source(file)
            .add_source(config::Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?
            .try_deserialize()?;

        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.concurrency == 0 {
            return Err(PipelineError::Config("concurrency must be at least 1".into()));
        }
        if self.max_tokens == 0 {
            return Err(PipelineError::Config("max_tokens must be positive".into()));
        }
        if self.model.trim().is_empty() {
            return Err(PipelineError::Config("model must not be empty".into()));
        }
        if self.api_url.trim().is_empty() {
            return Err(PipelineError::Config("api_url must not be empty".into()));
        }
        if self.image_extension.trim_start_matches('.').trim().is_empty() {
            return Err(PipelineError::Config("image_extension must not be empty".into()));
        }
        Ok(())
    }

    /// Lowercased file-name suffix including the dot, e.g. `.jpg`.
    pub fn extension_suffix(&self) -> String {
        format!(
            ".{}",
            self.image_extension.trim().trim_start_matches('.').to_lowercase()
        )
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}
