//! Document retrieval: resolvers, prefix routing and fetch memoisation.

use crate::error::FetchError;
use jschema_json::JsonValue;
use once_cell::sync::OnceCell;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::Duration;
use url::Url;

/// Retrieval function supplied by the embedding application.
pub type Resolver = Arc<dyn Fn(&Url) -> Result<JsonValue, FetchError> + Send + Sync>;

pub(crate) type FetchResult = Result<Arc<JsonValue>, FetchError>;

/// Configured resolvers.
#[derive(Default)]
pub(crate) struct Sources {
    default: Option<Resolver>,
    /// `(prefix, resolver)`, prefixes are absolute and end in `/`.
    prefixed: Vec<(String, Resolver)>,
    timeout: Option<Duration>,
}

impl Sources {
    pub(crate) fn new(timeout: Option<Duration>) -> Self {
        Self {
            timeout,
            ..Self::default()
        }
    }

    pub(crate) fn set_default(&mut self, resolver: Resolver) {
        self.default = Some(resolver);
    }

    /// Adding an existing prefix replaces its resolver.
    pub(crate) fn add_prefix(&mut self, prefix: String, resolver: Resolver) {
        match self.prefixed.iter_mut().find(|(p, _)| *p == prefix) {
            Some(entry) => entry.1 = resolver,
            None => self.prefixed.push((prefix, resolver)),
        }
    }

    pub(crate) fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = Some(timeout);
    }

    /// The resolver responsible for `uri`: the longest matching prefix,
    /// else the default.
    pub(crate) fn route(&self, uri: &Url) -> Option<(Resolver, Option<Duration>)> {
        let text = uri.as_str();
        self.prefixed
            .iter()
            .filter(|(prefix, _)| text.starts_with(prefix.as_str()))
            .max_by_key(|(prefix, _)| prefix.len())
            .map(|(_, resolver)| resolver)
            .or(self.default.as_ref())
            .map(|resolver| (Arc::clone(resolver), self.timeout))
    }
}

/// Call `resolver`, turning panics and timeouts into [`FetchError`]s.
pub(crate) fn call_resolver(
    resolver: Resolver,
    uri: &Url,
    timeout: Option<Duration>,
) -> Result<JsonValue, FetchError> {
    let Some(timeout) = timeout else {
        return panic::catch_unwind(AssertUnwindSafe(|| resolver(uri)))
            .unwrap_or_else(|_| Err(FetchError::failed(uri.as_str(), "resolver panicked")));
    };

    let (sender, receiver) = mpsc::channel();
    let target = uri.clone();
    thread::Builder::new()
        .name("jschema-resolver".to_string())
        .spawn(move || {
            // The receiver is gone after a timeout; nothing to report then.
            let _ = sender.send(resolver(&target));
        })
        .map_err(|e| {
            FetchError::failed(uri.as_str(), format!("could not start resolver thread: {}", e))
        })?;
    match receiver.recv_timeout(timeout) {
        Ok(result) => result,
        Err(RecvTimeoutError::Timeout) => Err(FetchError::Timeout {
            uri: uri.to_string(),
            timeout,
        }),
        Err(RecvTimeoutError::Disconnected) => {
            Err(FetchError::failed(uri.as_str(), "resolver panicked"))
        }
    }
}

/// Per-URI fetch placeholders. The first caller for a URI claims a cell and
/// fills it; concurrent callers block on the same cell.
#[derive(Default)]
pub(crate) struct FetchCache {
    cells: Mutex<HashMap<Url, Arc<OnceCell<FetchResult>>>>,
}

impl FetchCache {
    pub(crate) fn get_or_fetch(&self, uri: &Url, fetch: impl FnOnce() -> FetchResult) -> FetchResult {
        let cell = {
            let mut cells = self.cells.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(cells.entry(uri.clone()).or_default())
        };
        cell.get_or_init(fetch).clone()
    }

    /// The outcome for `uri` if a fetch has completed, without fetching.
    pub(crate) fn fetched(&self, uri: &Url) -> Option<FetchResult> {
        let cells = self.cells.lock().unwrap_or_else(PoisonError::into_inner);
        cells.get(uri).and_then(|cell| cell.get().cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn constant(value: serde_json::Value) -> Resolver {
        Arc::new(move |_: &Url| Ok(JsonValue::from_serde(&value)))
    }

    #[test]
    fn test_longest_prefix_wins() {
        let mut sources = Sources::default();
        sources.set_default(constant(serde_json::json!("default")));
        sources.add_prefix("https://example.com/".into(), constant(serde_json::json!("short")));
        sources.add_prefix(
            "https://example.com/schemas/".into(),
            constant(serde_json::json!("long")),
        );

        let fetch = |uri: &str| {
            let url = Url::parse(uri).unwrap();
            let (resolver, _) = sources.route(&url).unwrap();
            resolver(&url).unwrap().as_str().unwrap().to_string()
        };
        assert_eq!(fetch("https://example.com/schemas/a.json"), "long");
        assert_eq!(fetch("https://example.com/other.json"), "short");
        assert_eq!(fetch("https://elsewhere.org/x.json"), "default");
    }

    #[test]
    fn test_no_route_without_default() {
        let sources = Sources::default();
        assert!(sources.route(&Url::parse("https://example.com/").unwrap()).is_none());
    }

    #[test]
    fn test_timeout() {
        let slow: Resolver = Arc::new(|_: &Url| {
            thread::sleep(Duration::from_millis(500));
            Ok(JsonValue::from_serde(&serde_json::json!(true)))
        });
        let uri = Url::parse("https://example.com/slow.json").unwrap();
        let err = call_resolver(slow, &uri, Some(Duration::from_millis(20))).unwrap_err();
        assert!(matches!(err, FetchError::Timeout { .. }));
    }

    #[test]
    fn test_panicking_resolver_is_an_error() {
        let broken: Resolver = Arc::new(|_: &Url| panic!("boom"));
        let uri = Url::parse("https://example.com/broken.json").unwrap();
        let err = call_resolver(broken, &uri, None).unwrap_err();
        assert_eq!(err, FetchError::failed(uri.as_str(), "resolver panicked"));
    }

    #[test]
    fn test_fetch_cache_memoises_failures() {
        let cache = FetchCache::default();
        let calls = AtomicUsize::new(0);
        let uri = Url::parse("https://example.com/missing.json").unwrap();
        for _ in 0..3 {
            let result = cache.get_or_fetch(&uri, || {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(FetchError::NotFound {
                    uri: uri.to_string(),
                })
            });
            assert!(result.is_err());
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
