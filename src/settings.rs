use std::path::Path;
use std::time::Duration;

use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Server {
    pub addr :       String,
    /// Issuer and audience of identity tokens.
    pub name :       String,
    pub static_dir : String,
}

#[derive(Debug, Deserialize)]
pub struct Database {
    pub path : String,
}

#[derive(Debug, Deserialize)]
pub struct Auth {
    pub token_secret : String,
    pub token_days :   u64,
}

const DAY_SECS : u64 = 60 * 60 * 24;

impl Auth {
    pub fn token_lifetime(&self) -> crate::Result<Duration> {
        self.token_days
            .checked_mul(DAY_SECS)
            .map(Duration::from_secs)
            .ok_or(crate::Error::TokenDurationTooBig)
    }
}

#[derive(Debug, Deserialize)]
pub struct Pages {
    pub page_size : u32,
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub server :   Server,
    pub database : Database,
    pub auth :     Auth,
    pub pages :    Pages,
}

impl Settings {
    /// Defaults, then `note-board.toml` if present, then
    /// `NOTE_BOARD_<SECTION>__<KEY>` variables.
    pub fn new() -> Result<Self, ConfigError> {
        Self::from_file(Path::new("note-board.toml"))
    }

    pub fn from_file(path : &Path) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .set_default("server.addr", "127.0.0.1:8080")?
            .set_default("server.name", "note-board")?
            .set_default("server.static_dir", "static")?
            .set_default("database.path", "notes.sqlite3")?
            .set_default("auth.token_secret", "dev-secret")?
            .set_default("auth.token_days", 30_i64)?
            .set_default("pages.page_size", crate::pages::DEFAULT_PAGE_SIZE as i64)?
            .add_source(
                File::from(path)
                    .format(FileFormat::Toml)
                    .required(false),
            )
            .add_source(
                Environment::with_prefix("NOTE_BOARD")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}
