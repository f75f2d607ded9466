//! Synchronization of the local store with the publication.
//!
//! A sync is a fixed, linear sequence of steps:
//!
//! ```text
//! Init -> ClearAll -> FetchVersion -> Download(AD) -> Download(ENR)
//!      -> Download(AMDT) -> Download(SUP) -> Download(NOTAM)
//!      -> Download(AIC) -> CommitVersion
//! ```
//!
//! Steps run one after another and the first failure ends the run. The
//! version marker is written by the last step only, so it never names a
//! cycle whose categories were not all stored.

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::error::{Error, Result};
use crate::integrity;
use crate::record::{
    AdRecord, AicRecord, AmdtRecord, Category, CategoryRecord, EnrRecord, NotamRecord, SupRecord,
    VersionDescriptor,
};
use crate::remote::{normalize, RemoteSource};
use crate::storage::{Storage, VersionStore};

/// Step count reported with every progress update.
pub const TOTAL_STEPS: usize = 7;

/// One step of a sync run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStep {
    /// Make sure every table exists.
    Init,
    /// Empty every category.
    ClearAll,
    /// Fetch the descriptor of the published cycle.
    FetchVersion,
    /// Fetch and store one category.
    Download(Category),
    /// Write the version marker.
    CommitVersion,
}

impl SyncStep {
    /// Every step in execution order.
    #[must_use]
    pub fn sequence() -> Vec<Self> {
        let mut steps = vec![Self::Init, Self::ClearAll, Self::FetchVersion];
        steps.extend(Category::ALL.into_iter().map(Self::Download));
        steps.push(Self::CommitVersion);
        steps
    }

    /// Position reported for this step.
    ///
    /// Preparation steps report 0, each download advances by one and the
    /// commit is reported as `7/7`.
    #[must_use]
    pub fn index(self) -> usize {
        match self {
            Self::Init | Self::ClearAll | Self::FetchVersion => 0,
            Self::Download(category) => {
                1 + Category::ALL
                    .iter()
                    .position(|c| *c == category)
                    .unwrap_or_default()
            }
            Self::CommitVersion => TOTAL_STEPS,
        }
    }

    /// Human-readable description.
    #[must_use]
    pub fn label(self) -> String {
        match self {
            Self::Init => "Initializing database".to_string(),
            Self::ClearAll => "Clearing old data".to_string(),
            Self::FetchVersion => "Fetching version information".to_string(),
            Self::Download(category) => format!("Downloading {}", category.label()),
            Self::CommitVersion => "Saving version information".to_string(),
        }
    }
}

/// Progress update handed to the caller before each step runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncProgress {
    /// The step about to run.
    pub step: SyncStep,
    /// Human-readable description of the step.
    pub label: String,
    /// Position of the step.
    pub index: usize,
    /// Step count.
    pub total: usize,
}

impl SyncProgress {
    fn of(step: SyncStep) -> Self {
        Self {
            step,
            label: step.label(),
            index: step.index(),
            total: TOTAL_STEPS,
        }
    }
}

/// Outcome of comparing the local marker with the published version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpdateCheck {
    /// True if no marker exists or its version id differs from the remote one.
    pub need_update: bool,
    /// The committed marker.
    pub local: Option<VersionDescriptor>,
    /// The published version.
    pub remote: VersionDescriptor,
}

impl UpdateCheck {
    /// Compare a local marker with the published version.
    #[must_use]
    pub fn compare(local: Option<VersionDescriptor>, remote: VersionDescriptor) -> Self {
        let need_update = local
            .as_ref()
            .map_or(true, |local| local.version_id != remote.version_id);
        Self {
            need_update,
            local,
            remote,
        }
    }
}

/// What the application should do at startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StartupStatus {
    /// True if the local copy is missing, stale, incomplete or could not be checked.
    pub need_download: bool,
    /// The committed marker, if it could be read.
    pub local: Option<VersionDescriptor>,
    /// The published version, if it could be fetched.
    pub remote: Option<VersionDescriptor>,
}

/// Drives version checks and full syncs against one store.
///
/// `run` and `force_redownload` take `&mut self`, so one synchronizer can
/// never have two syncs in flight. Readers of the same [`Storage`] must not
/// run while a sync is writing.
#[derive(Debug)]
pub struct Synchronizer<'a, R, V> {
    storage: &'a Storage,
    remote: R,
    versions: V,
}

impl<'a, R, V> Synchronizer<'a, R, V>
where
    R: RemoteSource,
    V: VersionStore,
{
    /// Create a synchronizer.
    ///
    /// `versions` holds the marker; pass `&storage` to keep it in the same
    /// database as the records.
    #[must_use]
    pub const fn new(storage: &'a Storage, remote: R, versions: V) -> Self {
        Self {
            storage,
            remote,
            versions,
        }
    }

    /// The store being synchronized.
    #[must_use]
    pub const fn storage(&self) -> &'a Storage {
        self.storage
    }

    /// The version slot.
    #[must_use]
    pub const fn versions(&self) -> &V {
        &self.versions
    }

    /// The committed marker.
    ///
    /// # Errors
    ///
    /// Returns an error if the version slot cannot be read.
    pub fn local_version(&self) -> Result<Option<VersionDescriptor>> {
        self.versions.load()
    }

    /// Compare the committed marker with the published version.
    ///
    /// Has no side effects.
    ///
    /// # Errors
    ///
    /// Returns the remote's error unchanged if the version cannot be
    /// fetched, or a storage error if the marker cannot be read.
    pub async fn check_need_update(&self) -> Result<UpdateCheck> {
        let remote = self.remote.fetch_version().await?;
        let local = self.versions.load()?;
        let check = UpdateCheck::compare(local, remote);
        debug!(
            "Version check: local={:?} remote={} need_update={}",
            check.local.as_ref().map(|v| v.version_id),
            check.remote.version_id,
            check.need_update
        );
        Ok(check)
    }

    /// Replace every category with the published data and commit its version.
    ///
    /// `on_progress` is called before each step. Returns the committed
    /// version.
    ///
    /// # Errors
    ///
    /// Returns the first step failure. A failed category is reported as
    /// [`Error::CategorySync`] naming it. The version marker is not touched
    /// on failure.
    pub async fn run<F>(&mut self, mut on_progress: F) -> Result<VersionDescriptor>
    where
        F: FnMut(&SyncProgress),
    {
        info!("Starting full sync");
        match self.run_steps(&mut on_progress).await {
            Ok(version) => {
                info!(
                    "Sync complete: {} cycle {} (version {})",
                    version.name, version.cycle, version.version_id
                );
                Ok(version)
            }
            Err(e) => {
                error!("Sync aborted: {}", e);
                Err(e)
            }
        }
    }

    /// Discard the version marker, then run a full sync.
    ///
    /// # Errors
    ///
    /// Same as [`Synchronizer::run`], plus a storage error if the marker
    /// cannot be cleared.
    pub async fn force_redownload<F>(&mut self, on_progress: F) -> Result<VersionDescriptor>
    where
        F: FnMut(&SyncProgress),
    {
        info!("Discarding version marker for forced redownload");
        self.versions.clear()?;
        self.run(on_progress).await
    }

    /// True only if every category is readable and non-empty.
    #[must_use]
    pub fn check_integrity(&self) -> bool {
        integrity::check_integrity(self.storage)
    }

    /// Decide whether the application needs to download at startup.
    ///
    /// Any failure while checking is treated as "download needed".
    pub async fn startup_check(&self) -> StartupStatus {
        let check = match self.check_need_update().await {
            Ok(check) => check,
            Err(e) => {
                warn!("Startup check failed, assuming download is needed: {}", e);
                return StartupStatus {
                    need_download: true,
                    local: None,
                    remote: None,
                };
            }
        };

        let need_download = check.need_update || !self.check_integrity();
        StartupStatus {
            need_download,
            local: check.local,
            remote: Some(check.remote),
        }
    }

    async fn run_steps(
        &mut self,
        on_progress: &mut dyn FnMut(&SyncProgress),
    ) -> Result<VersionDescriptor> {
        on_progress(&SyncProgress::of(SyncStep::Init));
        self.storage.initialize()?;

        on_progress(&SyncProgress::of(SyncStep::ClearAll));
        self.storage.clear_all()?;

        on_progress(&SyncProgress::of(SyncStep::FetchVersion));
        let version = self
            .remote
            .fetch_version()
            .await
            .map_err(|source| Error::VersionFetch {
                source: Box::new(source),
            })?;

        for category in Category::ALL {
            on_progress(&SyncProgress::of(SyncStep::Download(category)));
            let stored = self
                .download(category)
                .await
                .map_err(|e| Error::category_sync(category, e))?;
            debug!("Downloaded {} {} records", stored, category);
        }

        on_progress(&SyncProgress::of(SyncStep::CommitVersion));
        self.versions.save(&version)?;
        self.storage.mark_synced(Utc::now())?;

        Ok(version)
    }

    async fn download(&self, category: Category) -> Result<usize> {
        match category {
            Category::Ad => self.download_into::<AdRecord>().await,
            Category::Enr => self.download_into::<EnrRecord>().await,
            Category::Amdt => self.download_into::<AmdtRecord>().await,
            Category::Sup => self.download_into::<SupRecord>().await,
            Category::Notam => self.download_into::<NotamRecord>().await,
            Category::Aic => self.download_into::<AicRecord>().await,
        }
    }

    async fn download_into<T: CategoryRecord>(&self) -> Result<usize> {
        let payload = self.remote.fetch_category(T::CATEGORY).await?;
        let records = normalize::<T>(payload)?;
        self.storage.store::<T>().write(&records)?;
        Ok(records.len())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;
    use serde_json::{json, Value};

    use super::*;
    use crate::logging::init_test_logging;
    use crate::storage::MemoryVersionStore;

    /// Remote answering from fixed payloads, with optional failures.
    #[derive(Debug, Default)]
    struct ScriptedRemote {
        version: Option<VersionDescriptor>,
        payloads: HashMap<Category, Value>,
        failing: Option<Category>,
        requests: Mutex<Vec<String>>,
        version_calls: AtomicUsize,
    }

    impl ScriptedRemote {
        fn publishing(version_id: i64) -> Self {
            let mut payloads = HashMap::new();
            payloads.insert(
                Category::Ad,
                json!([
                    {"name": "AD 2.ZBAA", "airporticao": "ZBAA", "name_cn": "北京/首都"},
                    {"name": "ZBAA-2F:APDC"},
                    {"name": "AD 2.ZSSS", "airporticao": "ZSSS", "name_cn": "上海/虹桥"},
                ]),
            );
            payloads.insert(
                Category::Enr,
                json!({"data": [{"name": "ENR 6.2", "pdfPath": "e.pdf"}]}),
            );
            payloads.insert(Category::Amdt, json!([{"name": "AMDT 2510"}]));
            payloads.insert(Category::Sup, json!([{"Subject": "SUP 1", "Document": "s.pdf"}]));
            payloads.insert(Category::Notam, json!([{"SeriesName": "A", "Document": "a.pdf"}]));
            payloads.insert(
                Category::Aic,
                json!({"data": [{"Subject": "AIC 1", "Document": "c.pdf"}]}),
            );

            Self {
                version: Some(VersionDescriptor::new(
                    "AIP",
                    format!("25{version_id:02}"),
                    version_id,
                )),
                payloads,
                ..Self::default()
            }
        }

        fn failing_on(mut self, category: Category) -> Self {
            self.failing = Some(category);
            self
        }

        fn with_payload(mut self, category: Category, payload: Value) -> Self {
            self.payloads.insert(category, payload);
            self
        }

        fn offline() -> Self {
            Self::default()
        }

        fn requested(&self) -> Vec<String> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl RemoteSource for ScriptedRemote {
        async fn fetch_version(&self) -> Result<VersionDescriptor> {
            self.version_calls.fetch_add(1, Ordering::SeqCst);
            self.requests.lock().unwrap().push("version".to_string());
            self.version
                .clone()
                .ok_or_else(|| Error::network("version", "connection refused"))
        }

        async fn fetch_category(&self, category: Category) -> Result<Value> {
            self.requests
                .lock()
                .unwrap()
                .push(category.as_str().to_string());
            if self.failing == Some(category) {
                return Err(Error::network(category.as_str(), "connection reset"));
            }
            self.payloads
                .get(&category)
                .cloned()
                .ok_or_else(|| Error::network(category.as_str(), "not found"))
        }
    }

    fn storage() -> Storage {
        init_test_logging();
        Storage::open_in_memory().unwrap()
    }

    #[test]
    fn test_step_sequence_is_monotonic() {
        let indices: Vec<_> = SyncStep::sequence().into_iter().map(SyncStep::index).collect();
        assert_eq!(indices, [0, 0, 0, 1, 2, 3, 4, 5, 6, 7]);
        assert!(indices.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_update_check_compare() {
        let v3 = VersionDescriptor::new("AIP", "2503", 3);
        let v4 = VersionDescriptor::new("AIP", "2504", 4);

        assert!(!UpdateCheck::compare(Some(v3.clone()), v3.clone()).need_update);
        assert!(UpdateCheck::compare(Some(v3.clone()), v4.clone()).need_update);
        assert!(UpdateCheck::compare(None, v3).need_update);

        // Only the id matters.
        let renamed = VersionDescriptor::new("Other", "xx", 4);
        assert!(!UpdateCheck::compare(Some(renamed), v4).need_update);
    }

    #[tokio::test]
    async fn test_check_need_update_same_version() {
        let storage = storage();
        let versions = MemoryVersionStore::with_version(VersionDescriptor::new("AIP", "2503", 3));
        let sync = Synchronizer::new(&storage, ScriptedRemote::publishing(3), versions);

        let check = sync.check_need_update().await.unwrap();
        assert!(!check.need_update);
        assert_eq!(check.remote.version_id, 3);
    }

    #[tokio::test]
    async fn test_check_need_update_without_local() {
        let storage = storage();
        let sync = Synchronizer::new(
            &storage,
            ScriptedRemote::publishing(3),
            MemoryVersionStore::default(),
        );

        let check = sync.check_need_update().await.unwrap();
        assert!(check.need_update);
        assert!(check.local.is_none());
    }

    #[tokio::test]
    async fn test_check_need_update_propagates_network_error() {
        let storage = storage();
        let sync = Synchronizer::new(
            &storage,
            ScriptedRemote::offline(),
            MemoryVersionStore::default(),
        );

        let err = sync.check_need_update().await.unwrap_err();
        assert!(matches!(err, Error::Network { .. }));
    }

    #[tokio::test]
    async fn test_run_stores_every_category_and_commits() {
        let storage = storage();
        let mut sync = Synchronizer::new(
            &storage,
            ScriptedRemote::publishing(5),
            MemoryVersionStore::default(),
        );

        let version = sync.run(|_| {}).await.unwrap();

        assert_eq!(version.version_id, 5);
        assert_eq!(sync.local_version().unwrap(), Some(version));
        assert_eq!(storage.count(Category::Ad).unwrap(), 3);
        assert_eq!(storage.count(Category::Enr).unwrap(), 1);
        assert_eq!(storage.count(Category::Aic).unwrap(), 1);
        assert!(sync.check_integrity());
        assert!(storage.last_synced_at().unwrap().is_some());
        assert!(!sync.check_need_update().await.unwrap().need_update);
    }

    #[tokio::test]
    async fn test_run_reports_progress_in_order() {
        let storage = storage();
        let mut sync = Synchronizer::new(
            &storage,
            ScriptedRemote::publishing(1),
            MemoryVersionStore::default(),
        );
        let mut seen = Vec::new();

        sync.run(|progress| seen.push(progress.clone())).await.unwrap();

        let steps: Vec<_> = seen.iter().map(|p| p.step).collect();
        assert_eq!(steps, SyncStep::sequence());
        assert!(seen.iter().all(|p| p.total == TOTAL_STEPS));
        assert!(seen.windows(2).all(|w| w[0].index <= w[1].index));
        assert_eq!(seen.last().map(|p| p.index), Some(TOTAL_STEPS));
        assert!(seen[3].label.contains("AD"));
    }

    #[tokio::test]
    async fn test_downloads_run_in_fixed_order() {
        let storage = storage();
        let mut sync = Synchronizer::new(
            &storage,
            ScriptedRemote::publishing(1),
            MemoryVersionStore::default(),
        );

        sync.run(|_| {}).await.unwrap();

        assert_eq!(
            sync.remote.requested(),
            ["version", "ad", "enr", "amdt", "sup", "notam", "aic"]
        );
    }

    #[tokio::test]
    async fn test_failure_stops_run_and_keeps_marker() {
        let storage = storage();
        let previous = VersionDescriptor::new("AIP", "2503", 3);
        let versions = MemoryVersionStore::with_version(previous.clone());
        let remote = ScriptedRemote::publishing(4).failing_on(Category::Sup);
        let mut sync = Synchronizer::new(&storage, remote, versions);

        let err = sync.run(|_| {}).await.unwrap_err();

        assert_eq!(err.failed_category(), Some(Category::Sup));
        assert!(err.is_network_error());
        assert!(err.to_string().contains("SUP"));
        // Categories before the failure were stored, nothing after ran.
        assert_eq!(storage.count(Category::Amdt).unwrap(), 1);
        assert_eq!(storage.count(Category::Notam).unwrap(), 0);
        assert_eq!(
            sync.remote.requested(),
            ["version", "ad", "enr", "amdt", "sup"]
        );
        // The marker still names the old cycle.
        assert_eq!(sync.local_version().unwrap(), Some(previous));
        assert!(storage.last_synced_at().unwrap().is_none());
        let check = sync.check_need_update().await.unwrap();
        assert!(check.need_update);
        assert_eq!(check.local.map(|v| v.version_id), Some(3));
    }

    /// Version slot that refuses every write.
    #[derive(Debug)]
    struct ReadOnlyVersionStore;

    impl VersionStore for ReadOnlyVersionStore {
        fn load(&self) -> Result<Option<VersionDescriptor>> {
            Ok(None)
        }

        fn save(&self, _version: &VersionDescriptor) -> Result<()> {
            Err(Error::internal("version slot is read-only"))
        }

        fn clear(&self) -> Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_failed_commit_leaves_sync_time_unset() {
        let storage = storage();
        let mut sync =
            Synchronizer::new(&storage, ScriptedRemote::publishing(6), ReadOnlyVersionStore);

        let err = sync.run(|_| {}).await.unwrap_err();

        assert!(matches!(err, Error::Internal(_)));
        assert!(storage.last_synced_at().unwrap().is_none());
        assert!(sync.local_version().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_format_error_names_category() {
        let storage = storage();
        let remote = ScriptedRemote::publishing(2).with_payload(Category::Enr, json!("oops"));
        let mut sync = Synchronizer::new(&storage, remote, MemoryVersionStore::default());

        let err = sync.run(|_| {}).await.unwrap_err();
        assert_eq!(err.failed_category(), Some(Category::Enr));
        assert!(err.is_format_error());
        assert!(sync.local_version().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_storage_error_aborts_run() {
        let storage = storage();
        storage
            .connection()
            .execute_batch(
                "CREATE TRIGGER no_amdt BEFORE INSERT ON amdt_records
                 BEGIN SELECT RAISE(ABORT, 'disk full'); END;",
            )
            .unwrap();
        let mut sync = Synchronizer::new(
            &storage,
            ScriptedRemote::publishing(2),
            MemoryVersionStore::default(),
        );

        let err = sync.run(|_| {}).await.unwrap_err();
        assert_eq!(err.failed_category(), Some(Category::Amdt));
        assert!(err.is_storage_error());
        assert!(sync.local_version().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_version_fetch_failure_aborts_before_downloads() {
        let storage = storage();
        let mut sync = Synchronizer::new(
            &storage,
            ScriptedRemote::offline(),
            MemoryVersionStore::default(),
        );

        let err = sync.run(|_| {}).await.unwrap_err();
        assert!(matches!(err, Error::VersionFetch { .. }));
        assert!(err.is_network_error());
        assert_eq!(sync.remote.requested(), ["version"]);
    }

    #[tokio::test]
    async fn test_run_is_idempotent() {
        let storage = storage();
        let mut sync = Synchronizer::new(
            &storage,
            ScriptedRemote::publishing(1),
            MemoryVersionStore::default(),
        );

        sync.run(|_| {}).await.unwrap();
        let first = storage.store::<AdRecord>().read_all().unwrap();
        sync.run(|_| {}).await.unwrap();

        assert_eq!(storage.store::<AdRecord>().read_all().unwrap(), first);
    }

    #[tokio::test]
    async fn test_force_redownload_clears_marker_first() {
        let storage = storage();
        let versions = MemoryVersionStore::with_version(VersionDescriptor::new("AIP", "2503", 3));
        let remote = ScriptedRemote::publishing(3).failing_on(Category::Ad);
        let mut sync = Synchronizer::new(&storage, remote, versions);

        assert!(sync.force_redownload(|_| {}).await.is_err());
        // Even with an unchanged remote version the next check asks for a resync.
        assert!(sync.local_version().unwrap().is_none());
        assert!(sync.check_need_update().await.unwrap().need_update);
    }

    #[tokio::test]
    async fn test_force_redownload_succeeds() {
        let storage = storage();
        let versions = MemoryVersionStore::with_version(VersionDescriptor::new("AIP", "2503", 3));
        let mut sync = Synchronizer::new(&storage, ScriptedRemote::publishing(3), versions);

        let version = sync.force_redownload(|_| {}).await.unwrap();
        assert_eq!(sync.local_version().unwrap(), Some(version));
    }

    #[tokio::test]
    async fn test_marker_in_same_database() {
        let storage = storage();
        let mut sync = Synchronizer::new(&storage, ScriptedRemote::publishing(6), &storage);

        sync.run(|_| {}).await.unwrap();
        assert_eq!(storage.stats().unwrap().version.map(|v| v.version_id), Some(6));
    }

    #[tokio::test]
    async fn test_startup_check() {
        let storage = storage();

        // Nothing local yet.
        let status = Synchronizer::new(&storage, ScriptedRemote::publishing(1), &storage)
            .startup_check()
            .await;
        assert!(status.need_download);

        let mut sync = Synchronizer::new(&storage, ScriptedRemote::publishing(1), &storage);
        sync.run(|_| {}).await.unwrap();
        let status = sync.startup_check().await;
        assert!(!status.need_download);
        assert_eq!(status.remote.map(|v| v.version_id), Some(1));

        // Same version but an emptied category.
        storage.store::<NotamRecord>().clear().unwrap();
        assert!(sync.startup_check().await.need_download);
    }

    #[tokio::test]
    async fn test_startup_check_offline() {
        let storage = storage();
        let sync = Synchronizer::new(
            &storage,
            ScriptedRemote::offline(),
            MemoryVersionStore::default(),
        );

        let status = sync.startup_check().await;
        assert_eq!(
            status,
            StartupStatus {
                need_download: true,
                local: None,
                remote: None,
            }
        );
    }

    #[tokio::test]
    async fn test_http_end_to_end() {
        let mut routes = HashMap::new();
        routes.insert(
            "/aip/version".to_string(),
            (200, r#"{"name":"AIP","cycle":"2510","version_id":10}"#.to_string()),
        );
        let remote = ScriptedRemote::publishing(10);
        for category in Category::ALL {
            routes.insert(
                format!("/aip/{}", category.as_str()),
                (200, remote.payloads[&category].to_string()),
            );
        }
        let base_url = crate::remote::tests::serve(routes).await;
        let http = crate::remote::HttpRemote::new(crate::config::RemoteConfig {
            base_url,
            ..crate::config::RemoteConfig::default()
        })
        .unwrap();

        let storage = storage();
        let mut sync = Synchronizer::new(&storage, http, &storage);
        let version = sync.run(|_| {}).await.unwrap();

        assert_eq!(version.cycle, "2510");
        assert!(sync.check_integrity());
    }
}
