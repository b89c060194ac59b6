use std::io::ErrorKind;

use anyhow::Result;
use camino::{Utf8Path, Utf8PathBuf};
use serde::{Serialize, de::DeserializeOwned};
use tokio::fs;

/// Read a JSON file, falling back to the default value if it doesn't exist yet.
pub(super) async fn load<T>(path: &Utf8Path) -> Result<T>
where
    T: DeserializeOwned + Default,
{
    match fs::read(path).await {
        Ok(buf) => serde_json::from_slice(&buf).map_err(Into::into),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(T::default()),
        Err(e) => Err(e.into()),
    }
}

/// Write a JSON file by writing to a temporary file first and then replacing the target, so a
/// crash never leaves a half-written file behind.
pub(super) async fn save<T>(path: &Utf8Path, value: &T) -> Result<()>
where
    T: Serialize + ?Sized,
{
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }

    let temp_file = temp_path(path);
    let buf = serde_json::to_vec_pretty(value)?;

    fs::write(&temp_file, &buf).await?;
    fs::rename(temp_file, path).await?;

    Ok(())
}

fn temp_path(path: &Utf8Path) -> Utf8PathBuf {
    match path.file_name() {
        Some(name) => path.with_file_name(format!("~{name}")),
        None => path.with_extension("tmp"),
    }
}
