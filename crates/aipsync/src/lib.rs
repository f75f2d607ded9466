//! `aipsync` - Local mirror of an aeronautical information publication
//!
//! This library keeps a local copy of the six publication categories (AD, ENR,
//! AMDT, SUP, NOTAM and AIC) in sync with a remote API, and answers offline
//! queries over it, most notably the per-airport chart groups of the AD data.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod airport;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod error;
pub mod integrity;
pub mod logging;
pub mod record;
pub mod remote;
pub mod storage;
pub mod sync;

pub use airport::{AirportIndex, AirportSummary, CategorizedCharts, ChartKind};
pub use catalog::Catalog;
pub use config::Config;
pub use error::{Error, Result};
pub use integrity::{check_integrity, IntegrityReport};
pub use logging::init_logging;
pub use record::{Category, CategoryRecord, Nullable, VersionDescriptor};
pub use remote::{HttpRemote, RemoteSource};
pub use storage::{Storage, StorageStats, VersionStore};
pub use sync::{StartupStatus, SyncProgress, SyncStep, Synchronizer, UpdateCheck};
