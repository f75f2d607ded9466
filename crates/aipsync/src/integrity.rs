//! Post-sync health check of the local store.
//!
//! Integrity is advisory: read failures are reported as unhealthy rather
//! than propagated, and nothing here writes to the store.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::warn;

use crate::error::Result;
use crate::record::{
    AdRecord, AicRecord, AmdtRecord, Category, CategoryRecord, EnrRecord, NotamRecord, SupRecord,
};
use crate::storage::Storage;

/// Health of one category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "state", content = "detail")]
pub enum CategoryHealth {
    /// Readable and holding this many records.
    Populated(usize),
    /// Readable but empty.
    Empty,
    /// The read failed.
    Unreadable(String),
}

impl CategoryHealth {
    /// Whether the category counts as healthy.
    #[must_use]
    pub const fn is_healthy(&self) -> bool {
        matches!(self, Self::Populated(_))
    }
}

/// Health of every category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IntegrityReport {
    /// Per-category result.
    pub categories: BTreeMap<Category, CategoryHealth>,
}

impl IntegrityReport {
    /// True only if every category was read and is non-empty.
    #[must_use]
    pub fn is_healthy(&self) -> bool {
        self.categories.len() == Category::ALL.len()
            && self.categories.values().all(CategoryHealth::is_healthy)
    }

    /// Categories that are empty or unreadable.
    #[must_use]
    pub fn unhealthy(&self) -> Vec<Category> {
        self.categories
            .iter()
            .filter(|(_, health)| !health.is_healthy())
            .map(|(category, _)| *category)
            .collect()
    }
}

/// Read every category and report its health.
#[must_use]
pub fn inspect(storage: &Storage) -> IntegrityReport {
    let categories = Category::ALL
        .into_iter()
        .map(|category| (category, category_health(storage, category)))
        .collect();
    IntegrityReport { categories }
}

/// True only if every category can be read and holds at least one record.
#[must_use]
pub fn check_integrity(storage: &Storage) -> bool {
    let report = inspect(storage);
    let unhealthy = report.unhealthy();
    if !unhealthy.is_empty() {
        warn!("Local data incomplete: {:?}", unhealthy);
    }
    report.is_healthy()
}

fn category_health(storage: &Storage, category: Category) -> CategoryHealth {
    let read = match category {
        Category::Ad => read_len::<AdRecord>(storage),
        Category::Enr => read_len::<EnrRecord>(storage),
        Category::Amdt => read_len::<AmdtRecord>(storage),
        Category::Sup => read_len::<SupRecord>(storage),
        Category::Notam => read_len::<NotamRecord>(storage),
        Category::Aic => read_len::<AicRecord>(storage),
    };

    match read {
        Ok(0) => CategoryHealth::Empty,
        Ok(n) => CategoryHealth::Populated(n),
        Err(e) => CategoryHealth::Unreadable(e.to_string()),
    }
}

fn read_len<R: CategoryRecord>(storage: &Storage) -> Result<usize> {
    storage.store::<R>().read_all().map(|records| records.len())
}
