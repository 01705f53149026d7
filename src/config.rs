use crate::types::Result;
use serde::Deserialize;
use std::path::PathBuf;

/// Process configuration, read once at startup from the environment.
///
/// `SUBS` and `SUB_URL_TEMPLATE` are required; missing either is a fatal
/// startup error. List-valued variables are comma-separated and may contain
/// blank segments, which are dropped by the consumers.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub subs: Vec<String>,
    pub sub_url_template: String,
    #[serde(default)]
    pub ignore_label_keywords: Vec<String>,
    #[serde(default)]
    pub ignore_proxy_names: Vec<String>,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_template_path")]
    pub template_path: PathBuf,
}

fn default_port() -> u16 {
    8000
}

fn default_template_path() -> PathBuf {
    PathBuf::from("config.template.yml")
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(envy::from_env::<Config>()?)
    }
}
