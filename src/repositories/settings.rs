use std::{mem, net::SocketAddr};

use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use tokio::{fs, sync::RwLock};

use super::file;
use crate::models::Settings;

pub struct SettingsRepository {
    file: Utf8PathBuf,
    state: RwLock<Settings>,
}

impl SettingsRepository {
    /// Load the settings, writing the defaults on first start.
    pub async fn init(dir: &Utf8Path) -> Result<Self> {
        let file = dir.join("settings.json");

        let settings = if fs::try_exists(&file).await.unwrap_or_default() {
            file::load(&file).await.context("failed loading settings")?
        } else {
            let settings = Settings::default();
            file::save(&file, &settings)
                .await
                .context("failed saving default settings")?;
            settings
        };

        Ok(Self {
            file,
            state: RwLock::new(settings),
        })
    }

    pub async fn get_socket_addr(&self) -> SocketAddr {
        let settings = self.state.read().await;
        SocketAddr::new(settings.address, settings.port)
    }

    pub async fn get_log_level(&self) -> String {
        self.state.read().await.log_level.clone()
    }

    pub async fn set_log_level(&self, level: String) -> Result<()> {
        let mut settings = self.state.write().await;
        let old_level = mem::replace(&mut settings.log_level, level);

        match file::save(&self.file, &*settings).await {
            Ok(()) => Ok(()),
            Err(e) => {
                settings.log_level = old_level;
                Err(e).context("failed saving settings")
            }
        }
    }
}
