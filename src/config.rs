use serde_derive::Deserialize;

use crate::utils::Result;


const MODULE: &str = "CONFIG";

fn default_workers() -> usize { 50 }
fn default_log_type() -> String { "console".to_string() }
fn default_log_level() -> String { "info".to_string() }


#[derive(Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,

    #[serde(default = "default_workers")]
    pub workers: usize,
}

#[derive(Deserialize)]
pub struct LogConfig {
    #[serde(default = "default_log_type")]
    pub kind: String,

    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub file: String,
}

#[derive(Deserialize)]
pub struct StaticConfig {
    pub url_prefix: String,
    pub directory: String,
}

#[derive(Deserialize)]
pub struct Config {
    pub server: ServerConfig,

    #[serde(default)]
    pub log: Option<LogConfig>,

    #[serde(rename = "static", default)]
    pub static_mounts: Vec<StaticConfig>,
}

impl Config {
    pub fn load(path: &str) -> Result<Config> {
        let raw = config::Config::builder()
            .add_source(config::File::with_name(path))
            .build()
            .map_err(|e| {
                error!("[{}] Could not read config from {}: {}", MODULE, path, e);
                "config read error"
            })?;

        raw.try_deserialize().map_err(|e| {
            error!("[{}] Invalid config in {}: {}", MODULE, path, e);
            "config parse error"
        })
    }
}
