//! Persistence of the version marker.
//!
//! The marker is the last [`VersionDescriptor`] whose full sync committed.
//! It is kept behind a trait so the synchronizer can be handed any slot;
//! the database implements it with a metadata row and tests use
//! [`MemoryVersionStore`].

use std::sync::Mutex;

use tracing::warn;

use crate::error::{Error, Result};
use crate::record::VersionDescriptor;

use super::Storage;

/// Metadata key of the version marker.
pub(crate) const VERSION_MARKER_KEY: &str = "aip_version";

/// A single slot holding the committed version marker.
pub trait VersionStore {
    /// Read the marker, `None` if nothing was ever committed.
    ///
    /// # Errors
    ///
    /// Returns an error if the slot cannot be read.
    fn load(&self) -> Result<Option<VersionDescriptor>>;

    /// Overwrite the marker.
    ///
    /// # Errors
    ///
    /// Returns an error if the slot cannot be written.
    fn save(&self, version: &VersionDescriptor) -> Result<()>;

    /// Remove the marker.
    ///
    /// # Errors
    ///
    /// Returns an error if the slot cannot be written.
    fn clear(&self) -> Result<()>;
}

impl<T: VersionStore + ?Sized> VersionStore for &T {
    fn load(&self) -> Result<Option<VersionDescriptor>> {
        (**self).load()
    }

    fn save(&self, version: &VersionDescriptor) -> Result<()> {
        (**self).save(version)
    }

    fn clear(&self) -> Result<()> {
        (**self).clear()
    }
}

impl VersionStore for Storage {
    fn load(&self) -> Result<Option<VersionDescriptor>> {
        let Some(raw) = self.get_metadata(VERSION_MARKER_KEY)? else {
            return Ok(None);
        };

        match serde_json::from_str(&raw) {
            Ok(version) => Ok(Some(version)),
            Err(e) => {
                // An unreadable marker only costs a resync.
                warn!("Ignoring unreadable version marker: {}", e);
                Ok(None)
            }
        }
    }

    fn save(&self, version: &VersionDescriptor) -> Result<()> {
        let raw = serde_json::to_string(version)?;
        self.set_metadata(VERSION_MARKER_KEY, &raw)
    }

    fn clear(&self) -> Result<()> {
        self.delete_metadata(VERSION_MARKER_KEY)
    }
}

/// In-memory version slot.
#[derive(Debug, Default)]
pub struct MemoryVersionStore {
    slot: Mutex<Option<VersionDescriptor>>,
}

impl MemoryVersionStore {
    /// Create a slot already holding `version`.
    #[must_use]
    pub const fn with_version(version: VersionDescriptor) -> Self {
        Self {
            slot: Mutex::new(Some(version)),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Option<VersionDescriptor>>> {
        self.slot
            .lock()
            .map_err(|_| Error::internal("version slot lock poisoned"))
    }
}

impl VersionStore for MemoryVersionStore {
    fn load(&self) -> Result<Option<VersionDescriptor>> {
        Ok(self.lock()?.clone())
    }

    fn save(&self, version: &VersionDescriptor) -> Result<()> {
        *self.lock()? = Some(version.clone());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *self.lock()? = None;
        Ok(())
    }
}
