//! Upstream source access
//!
//! Everything above this module talks to the remote API through
//! [`SourceClient`], which performs exactly one request per call and hands
//! back the raw body. [`fetch`] layers the typed JSON decode on top so the
//! transport can be swapped (or faked in tests) without touching decoding.

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use crate::errors::{SourceError, SourceResult};

pub mod http;

pub use http::HttpSourceClient;

/// Raw transport to the upstream API
#[async_trait]
pub trait SourceClient: Send + Sync {
    /// Issue one GET and return the body of a 2xx response
    async fn fetch_bytes(&self, url: &str) -> SourceResult<Vec<u8>>;
}

/// Fetch `url` and decode its JSON body into `T`
///
/// Unknown fields are ignored; missing fields follow the `serde` defaults of
/// the destination type.
pub async fn fetch<T, C>(client: &C, url: &str) -> SourceResult<T>
where
    T: DeserializeOwned,
    C: SourceClient + ?Sized,
{
    let body = client.fetch_bytes(url).await?;
    serde_json::from_slice(&body).map_err(|e| SourceError::decode(url, e.to_string()))
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    /// In-memory source keyed by URL
    #[derive(Default)]
    pub struct FakeSourceClient {
        bodies: HashMap<String, String>,
        delays: HashMap<String, Duration>,
        failures: Mutex<HashMap<String, usize>>,
        pub requests: AtomicUsize,
    }

    impl FakeSourceClient {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_body(mut self, url: &str, body: impl Into<String>) -> Self {
            self.bodies.insert(url.to_string(), body.into());
            self
        }

        pub fn with_delay(mut self, url: &str, delay: Duration) -> Self {
            self.delays.insert(url.to_string(), delay);
            self
        }

        /// Fail the first `times` requests to `url` with a 503
        pub fn failing(self, url: &str, times: usize) -> Self {
            self.failures
                .lock()
                .unwrap()
                .insert(url.to_string(), times);
            self
        }

        pub fn request_count(&self) -> usize {
            self.requests.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl SourceClient for FakeSourceClient {
        async fn fetch_bytes(&self, url: &str) -> SourceResult<Vec<u8>> {
            self.requests.fetch_add(1, Ordering::SeqCst);

            if let Some(delay) = self.delays.get(url) {
                tokio::time::sleep(*delay).await;
            }

            {
                let mut failures = self.failures.lock().unwrap();
                if let Some(remaining) = failures.get_mut(url) {
                    if *remaining > 0 {
                        *remaining -= 1;
                        return Err(SourceError::http(url, 503));
                    }
                }
            }

            self.bodies
                .get(url)
                .map(|body| body.clone().into_bytes())
                .ok_or_else(|| SourceError::http(url, 404))
        }
    }
}
