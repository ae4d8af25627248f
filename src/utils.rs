use crate::config::IngestConfig;
use crate::error::IngestError;
use log::info;
use std::error::Error;
use std::io;
use std::path::{Path, PathBuf};

const DATA_DIR_NAME: &str = "jma_forecast";
const DATABASE_FILE_NAME: &str = "weather.db";

pub fn get_data_dir() -> Result<PathBuf, IngestError> {
    dirs::data_dir()
        .ok_or(IngestError::DataDirResolution)
        .map(|p| p.join(DATA_DIR_NAME))
}

pub async fn ensure_data_dir_exists(path: &Path) -> io::Result<()> {
    match tokio::fs::metadata(path).await {
        Ok(metadata) if metadata.is_dir() => Ok(()),
        Ok(_) => Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("Data path exists but is not a directory: {}", path.display()),
        )),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            info!("Creating data directory: {}", path.display());
            tokio::fs::create_dir_all(path).await
        }
        Err(e) => Err(e),
    }
}

/// The configured database path, or `weather.db` in the platform data directory.
pub async fn resolve_database_path(config: &IngestConfig) -> Result<PathBuf, IngestError> {
    if let Some(path) = &config.database_path {
        return Ok(path.clone());
    }
    let dir = get_data_dir()?;
    ensure_data_dir_exists(&dir)
        .await
        .map_err(|e| IngestError::DataDirCreation(dir.clone(), e))?;
    Ok(dir.join(DATABASE_FILE_NAME))
}

/// `err` followed by each of its sources, joined with `: `.
pub fn error_chain(err: &dyn Error) -> String {
    let mut text = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        text.push_str(": ");
        text.push_str(&cause.to_string());
        source = cause.source();
    }
    text
}
