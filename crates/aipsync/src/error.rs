//! Error types for aipsync.
//!
//! This module defines all error types used throughout the aipsync crate,
//! providing detailed context for debugging and user-friendly error messages.

use std::path::PathBuf;
use thiserror::Error;

use crate::record::Category;

/// The main error type for aipsync operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Storage Errors ===
    /// Failed to open or create the database.
    #[error("failed to open database at {path}: {source}")]
    DatabaseOpen {
        /// Path to the database file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: rusqlite::Error,
    },

    /// A database query failed.
    #[error("database query failed: {0}")]
    DatabaseQuery(#[from] rusqlite::Error),

    /// Failed to run database migrations.
    #[error("database migration failed: {message}")]
    DatabaseMigration {
        /// Description of what went wrong.
        message: String,
    },

    // === Remote Errors ===
    /// Fetching from the publication API failed.
    #[error("request to {endpoint} failed: {message}")]
    Network {
        /// The endpoint that was requested.
        endpoint: String,
        /// Description of what went wrong.
        message: String,
    },

    /// The publication API answered with a shape we do not understand.
    #[error("invalid response format for {category}: {message}")]
    Format {
        /// What was being decoded (a category code or `version`).
        category: String,
        /// Description of what went wrong.
        message: String,
    },

    // === Sync Errors ===
    /// Downloading or storing one category failed.
    #[error("failed to download {}: {source}", .category.label())]
    CategorySync {
        /// The category that failed.
        category: Category,
        /// The underlying error.
        #[source]
        source: Box<Error>,
    },

    /// The version descriptor could not be fetched during a sync.
    #[error("unable to fetch version information: {source}")]
    VersionFetch {
        /// The underlying error.
        #[source]
        source: Box<Error>,
    },

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === I/O Errors ===
    /// File system operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to create a required directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Path that couldn't be created.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === Serialization Errors ===
    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // === Generic Errors ===
    /// An internal error occurred (bug).
    #[error("internal error: {0}")]
    Internal(String),
}

/// A specialized Result type for aipsync operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a new network error.
    #[must_use]
    pub fn network(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Network {
            endpoint: endpoint.into(),
            message: message.into(),
        }
    }

    /// Create a new response format error.
    #[must_use]
    pub fn format(category: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Format {
            category: category.into(),
            message: message.into(),
        }
    }

    /// Create a new internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Wrap an error as the failure of one category download.
    #[must_use]
    pub fn category_sync(category: Category, source: Self) -> Self {
        Self::CategorySync {
            category,
            source: Box::new(source),
        }
    }

    /// Check if this error (or the error it wraps) came from the network.
    #[must_use]
    pub fn is_network_error(&self) -> bool {
        match self {
            Self::Network { .. } => true,
            Self::CategorySync { source, .. } | Self::VersionFetch { source } => {
                source.is_network_error()
            }
            _ => false,
        }
    }

    /// Check if this error (or the error it wraps) is a response format problem.
    #[must_use]
    pub fn is_format_error(&self) -> bool {
        match self {
            Self::Format { .. } => true,
            Self::CategorySync { source, .. } | Self::VersionFetch { source } => {
                source.is_format_error()
            }
            _ => false,
        }
    }

    /// Check if this error (or the error it wraps) came from local storage.
    #[must_use]
    pub fn is_storage_error(&self) -> bool {
        match self {
            Self::DatabaseOpen { .. }
            | Self::DatabaseQuery(_)
            | Self::DatabaseMigration { .. }
            | Self::DirectoryCreate { .. } => true,
            Self::CategorySync { source, .. } | Self::VersionFetch { source } => {
                source.is_storage_error()
            }
            _ => false,
        }
    }

    /// The category whose download failed, if this is a sync failure.
    #[must_use]
    pub fn failed_category(&self) -> Option<Category> {
        match self {
            Self::CategorySync { category, .. } => Some(*category),
            _ => None,
        }
    }
}
