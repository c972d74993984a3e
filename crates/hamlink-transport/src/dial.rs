//! The dialer registry.
//!
//! Transports register a [`Dialer`] per URL scheme during startup; sessions
//! then reach any of them through [`dial_url`]. The process-wide registry is
//! a mutex-guarded map behind a lazy initializer; tests that want isolation
//! can instantiate their own [`DialerRegistry`] instead.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, LazyLock, Mutex};

use tracing::debug;

use crate::error::TransportError;
use crate::traits::Transport;
use crate::url::TransportUrl;

/// Dials a [`TransportUrl`] of one particular scheme.
pub trait Dialer: Send + Sync {
    fn dial_url<'a>(
        &'a self,
        url: &'a TransportUrl,
    ) -> Pin<Box<dyn Future<Output = Result<Box<dyn Transport>, TransportError>> + Send + 'a>>;
}

/// A scheme → dialer map with interior locking.
#[derive(Default)]
pub struct DialerRegistry {
    dialers: Mutex<HashMap<String, Arc<dyn Dialer>>>,
}

impl DialerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `dialer` for `scheme`, replacing any previous registration.
    pub fn register(&self, scheme: &str, dialer: Arc<dyn Dialer>) {
        debug!(scheme, "registering dialer");
        self.lock().insert(scheme.to_ascii_lowercase(), dialer);
    }

    /// Remove the dialer for `scheme`, if any.
    pub fn unregister(&self, scheme: &str) {
        self.lock().remove(&scheme.to_ascii_lowercase());
    }

    /// Dial `url` through the dialer registered for its scheme.
    pub async fn dial(&self, url: &TransportUrl) -> Result<Box<dyn Transport>, TransportError> {
        let dialer = self
            .lock()
            .get(&url.scheme)
            .cloned()
            .ok_or_else(|| TransportError::MissingDialer(url.scheme.clone()))?;
        dialer.dial_url(url).await
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Arc<dyn Dialer>>> {
        // A panic while holding the lock leaves the map intact; keep going.
        self.dialers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

static REGISTRY: LazyLock<DialerRegistry> = LazyLock::new(DialerRegistry::new);

/// Register a dialer in the process-wide registry.
pub fn register_dialer(scheme: &str, dialer: Arc<dyn Dialer>) {
    REGISTRY.register(scheme, dialer);
}

/// Remove a scheme from the process-wide registry.
pub fn unregister_dialer(scheme: &str) {
    REGISTRY.unregister(scheme);
}

/// Dial through the process-wide registry.
pub async fn dial_url(url: &TransportUrl) -> Result<Box<dyn Transport>, TransportError> {
    REGISTRY.dial(url).await
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A dialer that hands back one half of an in-memory pipe.
    struct PipeDialer;

    impl Dialer for PipeDialer {
        fn dial_url<'a>(
            &'a self,
            _url: &'a TransportUrl,
        ) -> Pin<Box<dyn Future<Output = Result<Box<dyn Transport>, TransportError>> + Send + 'a>>
        {
            Box::pin(async {
                let (a, _b) = tokio::io::duplex(64);
                Ok(Box::new(a) as Box<dyn Transport>)
            })
        }
    }

    #[tokio::test]
    async fn register_dial_unregister() {
        let registry = DialerRegistry::new();
        let url = TransportUrl::parse("mock:///LA1B").unwrap();

        assert!(matches!(
            registry.dial(&url).await,
            Err(TransportError::MissingDialer(_))
        ));

        registry.register("mock", Arc::new(PipeDialer));
        assert!(registry.dial(&url).await.is_ok());

        registry.unregister("mock");
        assert!(matches!(
            registry.dial(&url).await,
            Err(TransportError::MissingDialer(_))
        ));
    }

    #[tokio::test]
    async fn scheme_lookup_is_case_insensitive_on_register() {
        let registry = DialerRegistry::new();
        registry.register("MOCK", Arc::new(PipeDialer));
        let url = TransportUrl::parse("mock:///LA1B").unwrap();
        assert!(registry.dial(&url).await.is_ok());
    }

    #[tokio::test]
    async fn global_registry_roundtrip() {
        // Use a scheme no other test touches; the registry is process-wide.
        register_dialer("mock-global", Arc::new(PipeDialer));
        let url = TransportUrl::parse("mock-global:///LA1B").unwrap();
        assert!(dial_url(&url).await.is_ok());
        unregister_dialer("mock-global");
        assert!(matches!(
            dial_url(&url).await,
            Err(TransportError::MissingDialer(_))
        ));
    }
}
