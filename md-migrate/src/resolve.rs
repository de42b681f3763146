//! Cross-reference resolution used by the legacy renderer.

use std::thread;
use std::time::Duration;

use thiserror::Error;
use tracing::warn;

use crate::source_map::KeyValueMap;

/// Errors a resolver can report for a single lookup.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// Retrying may succeed.
    #[error("transient resolver failure: {0}")]
    Transient(String),
    #[error("resolver unavailable: {0}")]
    Unavailable(String),
}

/// Looks up the URL a cross-reference uid points at.
pub trait XrefResolver: Send + Sync {
    /// `Ok(None)` means the uid is unknown.
    fn resolve(&self, uid: &str) -> Result<Option<String>, ResolveError>;
}

/// Resolver backed by an in-memory uid to URL table.
#[derive(Debug, Clone, Default)]
pub struct MapResolver {
    map: KeyValueMap,
}

impl MapResolver {
    pub fn new(map: KeyValueMap) -> Self {
        Self { map }
    }
}

impl XrefResolver for MapResolver {
    fn resolve(&self, uid: &str) -> Result<Option<String>, ResolveError> {
        Ok(self.map.get(uid).cloned())
    }
}

/// Retries transient failures a fixed number of times with a fixed pause in between.
///
/// Running out of attempts yields "unresolved" instead of an error.
#[derive(Debug, Clone)]
pub struct RetryingResolver<R> {
    inner: R,
    attempts: u32,
    backoff: Duration,
}

impl<R: XrefResolver> RetryingResolver<R> {
    pub fn new(inner: R, attempts: u32, backoff: Duration) -> Self {
        Self {
            inner,
            attempts: attempts.max(1),
            backoff,
        }
    }
}

impl<R: XrefResolver> XrefResolver for RetryingResolver<R> {
    fn resolve(&self, uid: &str) -> Result<Option<String>, ResolveError> {
        for attempt in 1..=self.attempts {
            match self.inner.resolve(uid) {
                Ok(found) => return Ok(found),
                Err(err) => {
                    warn!(uid, attempt, attempts = self.attempts, error = %err, "xref lookup failed");
                    if attempt < self.attempts && !self.backoff.is_zero() {
                        thread::sleep(self.backoff);
                    }
                }
            }
        }
        warn!(uid, "xref left unresolved after retries");
        Ok(None)
    }
}
