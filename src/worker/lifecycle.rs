use std::sync::Arc;

use anyhow::{Context, Result};
use futures::future::join_all;
use tracing::{debug, info, warn};

use crate::cache::{CacheStorage, StoredResponse};

use super::fetcher::{FetchedResponse, Fetcher};
use super::WorkerError;
use super::{CACHE_VERSION, FALLBACK_DOCUMENT, PRECACHE_URLS};

/// Lifecycle state of a worker instance. Transitions only ever move forward;
/// a failed install falls back to `Uninstalled` and the previously committed
/// generation keeps serving.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Uninstalled,
    Installing,
    Installed,
    Activating,
    Active,
}

impl WorkerState {
    fn name(self) -> &'static str {
        match self {
            WorkerState::Uninstalled => "uninstalled",
            WorkerState::Installing => "installing",
            WorkerState::Installed => "installed",
            WorkerState::Activating => "activating",
            WorkerState::Active => "active",
        }
    }
}

impl std::fmt::Display for WorkerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Static configuration for one worker generation.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Current cache generation tag. Changing it is the only supported way
    /// to force a full invalidation on the next install cycle.
    pub version_tag: String,
    /// Assets that must be present immediately after install.
    pub precache: Vec<String>,
    /// Served when a non-precached GET fails at the network entirely.
    pub fallback_document: String,
    /// Take over from any previous generation without waiting.
    pub skip_waiting: bool,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            version_tag: CACHE_VERSION.to_string(),
            precache: PRECACHE_URLS.iter().map(|u| u.to_string()).collect(),
            fallback_document: FALLBACK_DOCUMENT.to_string(),
            skip_waiting: true,
        }
    }
}

/// The offline cache manager: owns the install/activate lifecycle of a cache
/// generation and answers intercepted GETs cache-first, revalidating hits in
/// the background.
pub struct Worker<F: Fetcher> {
    fetcher: Arc<F>,
    storage: CacheStorage,
    config: WorkerConfig,
    state: WorkerState,
}

impl<F: Fetcher + 'static> Worker<F> {
    pub fn new(fetcher: F, storage: CacheStorage, config: WorkerConfig) -> Self {
        Self {
            fetcher: Arc::new(fetcher),
            storage,
            config,
            state: WorkerState::Uninstalled,
        }
    }

    pub fn state(&self) -> WorkerState {
        self.state
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    fn require_state(&self, expected: WorkerState) -> Result<()> {
        if self.state != expected {
            return Err(WorkerError::InvalidState {
                expected: expected.name(),
                actual: self.state.name(),
            }
            .into());
        }
        Ok(())
    }

    /// Fetch every precache manifest entry into a fresh staging store and
    /// commit it under the current version tag. All-or-nothing: any entry
    /// that rejects, resolves non-2xx, or fails to store discards the whole
    /// staging store and leaves the previous generation untouched.
    pub async fn install(&mut self) -> Result<()> {
        self.require_state(WorkerState::Uninstalled)?;
        self.state = WorkerState::Installing;
        let tag = &self.config.version_tag;
        info!(tag = %tag, entries = self.config.precache.len(), "Installing cache generation");

        let fetches = self.config.precache.iter().map(|url| {
            let fetcher = Arc::clone(&self.fetcher);
            async move { (url.as_str(), fetcher.fetch(url).await) }
        });
        let results = join_all(fetches).await;

        let mut fetched: Vec<(&str, FetchedResponse)> = Vec::with_capacity(results.len());
        for (url, result) in results {
            match result {
                Ok(response) if response.is_success() => fetched.push((url, response)),
                Ok(response) => {
                    self.state = WorkerState::Uninstalled;
                    return Err(WorkerError::Precache {
                        url: url.to_string(),
                        reason: format!("status {}", response.status),
                    }
                    .into());
                }
                Err(e) => {
                    self.state = WorkerState::Uninstalled;
                    return Err(WorkerError::Precache {
                        url: url.to_string(),
                        reason: e.reason,
                    }
                    .into());
                }
            }
        }

        let staging = self.storage.open_staging(tag)?;
        for (url, response) in fetched {
            let entry = StoredResponse::new(url, response.status, response.headers, response.body);
            if let Err(e) = staging.put(&entry) {
                self.storage.discard_staging(tag);
                self.state = WorkerState::Uninstalled;
                return Err(WorkerError::Precache {
                    url: url.to_string(),
                    reason: e.to_string(),
                }
                .into());
            }
        }

        self.storage
            .commit_staging(tag)
            .context("Failed to commit installed cache generation")?;
        self.state = WorkerState::Installed;

        if self.config.skip_waiting {
            debug!(tag = %tag, "Install requested immediate activation");
        }
        Ok(())
    }

    /// Delete every cache generation whose tag differs from the current one
    /// and take over request interception.
    pub fn activate(&mut self) -> Result<()> {
        self.require_state(WorkerState::Installed)?;
        self.state = WorkerState::Activating;

        for tag in self.storage.tags()? {
            if tag != self.config.version_tag {
                info!(tag = %tag, "Deleting stale cache generation");
                self.storage.delete(&tag)?;
            }
        }
        self.storage.sweep_staging()?;

        self.state = WorkerState::Active;
        info!(tag = %self.config.version_tag, "Worker active, controlling requests");
        Ok(())
    }

    /// Reattach to an already-committed current generation, skipping the
    /// install cycle. Fails if no store exists for the current tag.
    pub fn resume(&mut self) -> Result<()> {
        self.require_state(WorkerState::Uninstalled)?;
        if !self.storage.contains(&self.config.version_tag) {
            anyhow::bail!(
                "no installed cache generation for tag {}; run install first",
                self.config.version_tag
            );
        }
        self.state = WorkerState::Active;
        Ok(())
    }

    /// Answer one intercepted GET.
    ///
    /// Cache hit: return the cached response immediately and refresh the
    /// entry in a detached background task. Cache miss: go to the network,
    /// store a copy of a successful response, and return it; a non-2xx
    /// response is returned uncached. A network call that rejects outright
    /// falls back to the cached fallback document; with no fallback cached
    /// the failure propagates.
    pub async fn handle(&self, url: &str) -> Result<StoredResponse> {
        self.require_state(WorkerState::Active)?;
        let store = self.storage.open(&self.config.version_tag)?;

        if let Some(cached) = store.lookup(url) {
            debug!(url, "Cache hit, revalidating in background");
            tokio::spawn(Self::revalidate(
                Arc::clone(&self.fetcher),
                self.storage.clone(),
                self.config.version_tag.clone(),
                url.to_string(),
            ));
            return Ok(cached);
        }

        match self.fetcher.fetch(url).await {
            Ok(response) => {
                let entry =
                    StoredResponse::new(url, response.status, response.headers, response.body);
                if entry.is_success() {
                    // Stored copy is independent of the one returned
                    if let Err(e) = store.put(&entry) {
                        debug!(url, error = %e, "Failed to store fetched response");
                    }
                }
                Ok(entry)
            }
            Err(e) => {
                warn!(url, error = %e, "Network failed, trying cached fallback");
                match store.lookup(&self.config.fallback_document) {
                    Some(fallback) => Ok(fallback),
                    None => Err(WorkerError::Offline {
                        url: url.to_string(),
                    }
                    .into()),
                }
            }
        }
    }

    /// Background refresh after a cache hit. Every failure is swallowed
    /// here; nothing propagates to the caller that saw the cached response.
    async fn revalidate(fetcher: Arc<F>, storage: CacheStorage, tag: String, url: String) {
        let fresh = match fetcher.fetch(&url).await {
            Ok(fresh) => fresh,
            Err(e) => {
                debug!(url = %url, error = %e, "Revalidation fetch failed");
                return;
            }
        };
        if !fresh.is_success() {
            debug!(url = %url, status = fresh.status, "Revalidation got non-success, keeping cached entry");
            return;
        }

        let entry = StoredResponse::new(&url, fresh.status, fresh.headers, fresh.body);
        match storage.open(&tag) {
            Ok(store) => {
                if let Err(e) = store.put(&entry) {
                    debug!(url = %url, error = %e, "Failed to store revalidated entry");
                }
            }
            Err(e) => debug!(url = %url, error = %e, "Failed to open store for revalidation"),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::worker::fetcher::FetchError;
    use std::collections::{HashMap, HashSet};
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// In-memory network: a URL either has a scripted (status, body), is
    /// marked as rejecting outright, or is unknown (also rejects).
    #[derive(Default)]
    struct FakeFetcher {
        responses: Mutex<HashMap<String, (u16, Vec<u8>)>>,
        failing: Mutex<HashSet<String>>,
        calls: Mutex<Vec<String>>,
    }

    impl FakeFetcher {
        fn respond(&self, url: &str, status: u16, body: &str) {
            self.responses
                .lock()
                .unwrap()
                .insert(url.to_string(), (status, body.as_bytes().to_vec()));
            self.failing.lock().unwrap().remove(url);
        }

        fn fail(&self, url: &str) {
            self.failing.lock().unwrap().insert(url.to_string());
        }

        fn calls_for(&self, url: &str) -> usize {
            self.calls.lock().unwrap().iter().filter(|c| *c == url).count()
        }
    }

    impl Fetcher for FakeFetcher {
        async fn fetch(&self, url: &str) -> Result<FetchedResponse, FetchError> {
            self.calls.lock().unwrap().push(url.to_string());
            if self.failing.lock().unwrap().contains(url) {
                return Err(FetchError {
                    url: url.to_string(),
                    reason: "connection refused".to_string(),
                });
            }
            match self.responses.lock().unwrap().get(url) {
                Some((status, body)) => Ok(FetchedResponse {
                    status: *status,
                    headers: vec![("content-type".to_string(), "text/html".to_string())],
                    body: body.clone(),
                }),
                None => Err(FetchError {
                    url: url.to_string(),
                    reason: "no route to host".to_string(),
                }),
            }
        }
    }

    fn test_config(tag: &str, precache: &[&str]) -> WorkerConfig {
        WorkerConfig {
            version_tag: tag.to_string(),
            precache: precache.iter().map(|u| u.to_string()).collect(),
            fallback_document: "./index.html".to_string(),
            skip_waiting: true,
        }
    }

    /// Worker with every precache entry scripted to succeed, installed and
    /// activated.
    async fn active_worker(
        dir: &TempDir,
        tag: &str,
        precache: &[&str],
    ) -> Worker<FakeFetcher> {
        let fetcher = FakeFetcher::default();
        for url in precache {
            fetcher.respond(url, 200, &format!("body of {}", url));
        }
        let storage = CacheStorage::new(dir.path().to_path_buf()).unwrap();
        let mut worker = Worker::new(fetcher, storage, test_config(tag, precache));
        worker.install().await.unwrap();
        worker.activate().unwrap();
        worker
    }

    #[tokio::test]
    async fn test_install_precaches_every_manifest_entry() {
        let dir = TempDir::new().unwrap();
        let manifest = ["./index.html", "./css/global.css"];
        let worker = active_worker(&dir, "jv-portfolio-v1", &manifest).await;

        let store = worker.storage.open("jv-portfolio-v1").unwrap();
        for url in manifest {
            let entry = store.lookup(url).expect("precached entry missing");
            assert_eq!(entry.body, format!("body of {}", url).as_bytes());
        }
        assert_eq!(store.len(), 2);
        assert_eq!(worker.state(), WorkerState::Active);
    }

    #[tokio::test]
    async fn test_failed_install_keeps_previous_generation() {
        let dir = TempDir::new().unwrap();
        let storage = CacheStorage::new(dir.path().to_path_buf()).unwrap();

        // A previously active generation
        let old = storage.open("jv-portfolio-v0").unwrap();
        old.put(&StoredResponse::new("./index.html", 200, vec![], b"v0".to_vec()))
            .unwrap();

        let fetcher = FakeFetcher::default();
        fetcher.respond("./index.html", 200, "v1");
        fetcher.fail("./css/global.css");

        let mut worker = Worker::new(
            fetcher,
            storage.clone(),
            test_config("jv-portfolio-v1", &["./index.html", "./css/global.css"]),
        );
        let err = worker.install().await.unwrap_err();
        let worker_err = err.downcast_ref::<WorkerError>().expect("WorkerError");
        assert!(matches!(worker_err, WorkerError::Precache { url, .. } if url == "./css/global.css"));

        assert_eq!(worker.state(), WorkerState::Uninstalled);
        assert_eq!(storage.tags().unwrap(), vec!["jv-portfolio-v0".to_string()]);
        let old = storage.open("jv-portfolio-v0").unwrap();
        assert_eq!(old.lookup("./index.html").unwrap().body, b"v0");
    }

    #[tokio::test]
    async fn test_install_fails_on_non_success_status() {
        let dir = TempDir::new().unwrap();
        let storage = CacheStorage::new(dir.path().to_path_buf()).unwrap();

        let fetcher = FakeFetcher::default();
        fetcher.respond("./index.html", 404, "not found");

        let mut worker = Worker::new(fetcher, storage.clone(), test_config("v1", &["./index.html"]));
        assert!(worker.install().await.is_err());
        assert!(!storage.contains("v1"));
    }

    #[tokio::test]
    async fn test_activate_deletes_every_other_tag() {
        let dir = TempDir::new().unwrap();
        let storage = CacheStorage::new(dir.path().to_path_buf()).unwrap();
        storage.open("jv-portfolio-v0").unwrap();

        let fetcher = FakeFetcher::default();
        fetcher.respond("./index.html", 200, "home");
        let mut worker = Worker::new(
            fetcher,
            storage.clone(),
            test_config("jv-portfolio-v1", &["./index.html"]),
        );
        worker.install().await.unwrap();
        worker.activate().unwrap();

        assert_eq!(storage.tags().unwrap(), vec!["jv-portfolio-v1".to_string()]);
    }

    #[tokio::test]
    async fn test_hit_returns_cached_even_when_network_fails() {
        let dir = TempDir::new().unwrap();
        let worker = active_worker(&dir, "v1", &["./index.html"]).await;

        worker.fetcher.fail("./index.html");

        let response = worker.handle("./index.html").await.unwrap();
        assert_eq!(response.body, b"body of ./index.html");
    }

    #[tokio::test]
    async fn test_repeated_hits_are_idempotent() {
        let dir = TempDir::new().unwrap();
        let worker = active_worker(&dir, "v1", &["./index.html"]).await;

        let first = worker.handle("./index.html").await.unwrap();
        let second = worker.handle("./index.html").await.unwrap();
        assert_eq!(first.body, second.body);
    }

    #[tokio::test]
    async fn test_miss_stores_copy_and_returns_response() {
        let dir = TempDir::new().unwrap();
        let worker = active_worker(&dir, "v1", &["./index.html"]).await;
        worker.fetcher.respond("./projetos.html", 200, "projects page");

        let response = worker.handle("./projetos.html").await.unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(response.body, b"projects page");

        // An equivalent copy is now cached, independent of the returned one
        let store = worker.storage.open("v1").unwrap();
        assert_eq!(store.lookup("./projetos.html").unwrap().body, b"projects page");
    }

    #[tokio::test]
    async fn test_miss_with_non_success_is_returned_uncached() {
        let dir = TempDir::new().unwrap();
        let worker = active_worker(&dir, "v1", &["./index.html"]).await;
        worker.fetcher.respond("./nope.html", 404, "gone");

        let response = worker.handle("./nope.html").await.unwrap();
        assert_eq!(response.status, 404);

        let store = worker.storage.open("v1").unwrap();
        assert!(store.lookup("./nope.html").is_none());
    }

    #[tokio::test]
    async fn test_total_failure_falls_back_to_cached_root() {
        let dir = TempDir::new().unwrap();
        let worker = active_worker(&dir, "v1", &["./index.html"]).await;
        worker.fetcher.fail("./missing.html");

        let response = worker.handle("./missing.html").await.unwrap();
        assert_eq!(response.url, "./index.html");
        assert_eq!(response.body, b"body of ./index.html");
    }

    #[tokio::test]
    async fn test_total_failure_without_fallback_propagates() {
        let dir = TempDir::new().unwrap();
        // Fallback document deliberately not in the manifest
        let worker = active_worker(&dir, "v1", &["./css/global.css"]).await;
        worker.fetcher.fail("./missing.html");

        let err = worker.handle("./missing.html").await.unwrap_err();
        let worker_err = err.downcast_ref::<WorkerError>().expect("WorkerError");
        assert!(matches!(worker_err, WorkerError::Offline { url } if url == "./missing.html"));
    }

    #[tokio::test]
    async fn test_revalidation_overwrites_with_fresh_success() {
        let dir = TempDir::new().unwrap();
        let worker = active_worker(&dir, "v1", &["./index.html"]).await;
        worker.fetcher.respond("./index.html", 200, "fresh home");

        // Drive the background path directly instead of racing the spawn
        Worker::revalidate(
            Arc::clone(&worker.fetcher),
            worker.storage.clone(),
            "v1".to_string(),
            "./index.html".to_string(),
        )
        .await;

        let store = worker.storage.open("v1").unwrap();
        assert_eq!(store.lookup("./index.html").unwrap().body, b"fresh home");
    }

    #[tokio::test]
    async fn test_revalidation_keeps_entry_on_non_success() {
        let dir = TempDir::new().unwrap();
        let worker = active_worker(&dir, "v1", &["./index.html"]).await;
        worker.fetcher.respond("./index.html", 500, "oops");

        Worker::revalidate(
            Arc::clone(&worker.fetcher),
            worker.storage.clone(),
            "v1".to_string(),
            "./index.html".to_string(),
        )
        .await;

        let store = worker.storage.open("v1").unwrap();
        assert_eq!(store.lookup("./index.html").unwrap().body, b"body of ./index.html");
    }

    #[tokio::test]
    async fn test_handle_requires_active_state() {
        let dir = TempDir::new().unwrap();
        let storage = CacheStorage::new(dir.path().to_path_buf()).unwrap();
        let worker = Worker::new(FakeFetcher::default(), storage, test_config("v1", &[]));

        let err = worker.handle("./index.html").await.unwrap_err();
        assert!(err.downcast_ref::<WorkerError>().is_some());
    }

    #[tokio::test]
    async fn test_resume_requires_committed_generation() {
        let dir = TempDir::new().unwrap();
        let storage = CacheStorage::new(dir.path().to_path_buf()).unwrap();

        let mut worker = Worker::new(
            FakeFetcher::default(),
            storage.clone(),
            test_config("v1", &[]),
        );
        assert!(worker.resume().is_err());

        storage.open("v1").unwrap();
        let mut worker = Worker::new(FakeFetcher::default(), storage, test_config("v1", &[]));
        worker.resume().unwrap();
        assert_eq!(worker.state(), WorkerState::Active);
    }

    #[tokio::test]
    async fn test_hit_triggers_exactly_one_background_fetch() {
        let dir = TempDir::new().unwrap();
        let worker = active_worker(&dir, "v1", &["./index.html"]).await;
        assert_eq!(worker.fetcher.calls_for("./index.html"), 1); // install

        let _ = worker.handle("./index.html").await.unwrap();

        // Let the detached revalidation run
        for _ in 0..50 {
            tokio::task::yield_now().await;
        }
        assert_eq!(worker.fetcher.calls_for("./index.html"), 2);
    }
}
