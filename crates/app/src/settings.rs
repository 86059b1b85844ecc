//! Handles settings for the application.
//!
//! Values are layered: built-in defaults, then the optional TOML file given by
//! `--config-path` (default `config/balance_service.toml`), then environment
//! variables prefixed with `BALANCE_SERVICE` (e.g.
//! `BALANCE_SERVICE_SERVER__PORT=9000`).
use clap::Parser;
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

const DEFAULT_CONFIG_PATH: &str = "config/balance_service";

#[derive(Debug, Parser)]
#[command(name = "balance_service", version)]
struct Args {
    /// Path to the configuration file (TOML, extension optional).
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config_path: String,
}

#[derive(Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Database {
    Memory,
    Sqlite(String),
}

#[derive(Debug, Deserialize)]
pub struct App {
    pub level: String,
}

#[derive(Debug, Deserialize)]
pub struct Server {
    pub bind: String,
    pub port: u16,
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub app: App,
    pub server: Server,
    pub database: Database,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let args = Args::parse();
        Self::from_sources(&args.config_path, Environment::with_prefix("BALANCE_SERVICE"))
    }

    fn from_sources(config_path: &str, env: Environment) -> Result<Self, ConfigError> {
        Config::builder()
            .set_default("app.level", "info")?
            .set_default("server.bind", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("database.sqlite", "balance_service.db")?
            .add_source(File::with_name(config_path).required(false))
            .add_source(env.prefix_separator("_").separator("__"))
            .build()?
            .try_deserialize()
    }
}
