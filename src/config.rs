use anyhow::Result;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
    pub run_migrations: bool,
    pub cors_origin: Option<String>,
    pub static_dir: Option<String>,
}

impl Config {
    /// Layers built-in defaults, an optional `mirrorband.toml` and
    /// `MIRRORBAND_*` environment variables, in that order.
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .set_default("database_url", "sqlite://mirrorband.sqlite")?
            .set_default("host", "0.0.0.0")?
            .set_default("port", 4000)?
            .set_default("max_connections", 5)?
            .set_default("acquire_timeout_secs", 5)?
            .set_default("run_migrations", false)?
            .set_default("cors_origin", "http://localhost:3000")?
            .add_source(config::File::with_name("mirrorband").required(false))
            .add_source(config::Environment::with_prefix("MIRRORBAND"))
            .build()?;

        Ok(config.try_deserialize()?)
    }

    pub fn for_database(database_url: impl Into<String>) -> Self {
        Config {
            database_url: database_url.into(),
            host: "127.0.0.1".to_string(),
            port: 0,
            max_connections: 5,
            acquire_timeout_secs: 5,
            run_migrations: true,
            cors_origin: None,
            static_dir: None,
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
