use rusqlite::ErrorCode;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to create database directory '{0}'")]
    DirCreation(PathBuf, #[source] std::io::Error),

    #[error("Failed to open forecast database '{0}'")]
    Open(PathBuf, #[source] rusqlite::Error),

    #[error("Failed to rebuild forecast schema")]
    SchemaRebuild(#[source] rusqlite::Error),

    #[error("Failed to persist {table} records")]
    Persist {
        table: &'static str,
        #[source]
        source: rusqlite::Error,
    },

    #[error("Failed to query forecast for region {region}")]
    Query {
        region: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error("Forecast database connection lock was poisoned")]
    ConnectionPoisoned,
}

impl StoreError {
    /// Whether the error means the connection itself is unusable, as opposed
    /// to a single statement failing.
    pub fn is_connection_lost(&self) -> bool {
        let source = match self {
            StoreError::ConnectionPoisoned => return true,
            StoreError::Persist { source, .. } | StoreError::Query { source, .. } => source,
            StoreError::SchemaRebuild(source) | StoreError::Open(_, source) => source,
            StoreError::DirCreation(..) => return false,
        };
        matches!(
            source.sqlite_error_code(),
            Some(
                ErrorCode::CannotOpen
                    | ErrorCode::NotADatabase
                    | ErrorCode::DatabaseCorrupt
                    | ErrorCode::SystemIoFailure
                    | ErrorCode::ReadOnly
                    | ErrorCode::DiskFull
            )
        )
    }
}
