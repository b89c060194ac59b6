use std::{env, path::PathBuf};

use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use unidirs::{Directories, UnifiedDirs};

/// Environment variable to place all data in a custom location instead of the platform default.
pub const DATA_DIR_ENV: &str = "APPSOURCES_DATA_DIR";

pub struct Dirs {
    data_dir: Utf8PathBuf,
}

impl Dirs {
    pub fn new() -> Result<Self> {
        let data_dir = match env::var_os(DATA_DIR_ENV) {
            Some(dir) => Utf8PathBuf::try_from(PathBuf::from(dir))
                .with_context(|| format!("{DATA_DIR_ENV} is not valid UTF-8"))?,
            None => UnifiedDirs::simple("rocks", "dnaka91", env!("CARGO_PKG_NAME"))
                .default()
                .context("failed finding project dirs")?
                .data_dir()
                .to_owned(),
        };

        Ok(Self { data_dir })
    }

    #[inline]
    pub fn data_dir(&self) -> &Utf8Path {
        &self.data_dir
    }
}
