//! The offline cache manager.
//!
//! A process-wide worker fronting the site's static assets: it precaches a
//! fixed manifest during install, deletes stale cache generations during
//! activate, and answers intercepted GETs cache-first while revalidating
//! hits in the background (stale-while-revalidate).
//!
//! Interception is decided at the boundary with [`should_intercept`]; the
//! worker itself never sees non-GET requests or requests for the bypassed
//! hosts.

pub mod error;
pub mod fetcher;
pub mod lifecycle;

pub use error::WorkerError;
pub use fetcher::{FetchError, FetchedResponse, Fetcher, HttpFetcher};
pub use lifecycle::{Worker, WorkerConfig, WorkerState};

/// Current cache generation tag. Bumping it invalidates every stored asset
/// on the next install cycle.
pub const CACHE_VERSION: &str = "jv-portfolio-v1";

/// Static assets precached during install, fixed at build time.
pub const PRECACHE_URLS: [&str; 10] = [
    "./",
    "./index.html",
    "./sobre.html",
    "./projetos.html",
    "./contato.html",
    "./css/global.css",
    "./css/index.css",
    "./css/pages.css",
    "./js/app.js",
    "./js/features.js",
];

/// Hosts whose requests pass straight through to the network. Substring
/// match, mirroring how the callers address them.
pub const BYPASS_HOSTS: [&str; 4] = [
    "api.github.com",
    "formspree.io",
    "fonts.googleapis",
    "fonts.gstatic",
];

/// Served from cache when a non-precached GET fails at the network entirely.
pub const FALLBACK_DOCUMENT: &str = "./index.html";

/// Boundary check: only same-method GETs outside the bypass list are routed
/// through the worker. Everything else goes to the network untouched.
pub fn should_intercept(method: &str, url: &str) -> bool {
    if !method.eq_ignore_ascii_case("GET") {
        return false;
    }
    !BYPASS_HOSTS.iter().any(|host| url.contains(host))
}

// ============================================================================
// Tests
// ============================================================================
