//! The backend registry: a keyed map from backend instance name to backend,
//! plus a kind → constructor factory map.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{instrument, warn};

use crate::backend::Backend;
use crate::error::BackendError;

type BackendFactory = Arc<dyn Fn(&[u8]) -> Result<Arc<dyn Backend>, BackendError> + Send + Sync>;

/// Keyed registry of backend instances, reader-writer guarded: lookups are
/// frequent, mutations rare.
pub struct Registry {
    backends: RwLock<HashMap<String, Arc<dyn Backend>>>,
    /// Registration order, separate from the map's own (unordered) iteration
    /// — `StartAll`/`StopAll` must walk this, not `names()` (which is sorted).
    order: RwLock<Vec<String>>,
    factories: RwLock<HashMap<String, BackendFactory>>,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            backends: RwLock::new(HashMap::new()),
            order: RwLock::new(Vec::new()),
            factories: RwLock::new(HashMap::new()),
        }
    }

    /// Register a backend instance. Fails on an empty name or a duplicate
    /// name; the registry never silently overwrites an existing entry.
    #[instrument(skip(self, backend), fields(backend.name = %name))]
    pub async fn register(
        &self,
        name: impl Into<String>,
        backend: Arc<dyn Backend>,
    ) -> Result<(), BackendError> {
        let name = name.into();
        if name.is_empty() {
            return Err(BackendError::InvalidRegistration(
                "backend name must not be empty".to_string(),
            ));
        }

        let mut backends = self.backends.write().await;
        if backends.contains_key(&name) {
            return Err(BackendError::AlreadyRegistered(name));
        }
        backends.insert(name.clone(), backend);
        self.order.write().await.push(name);
        Ok(())
    }

    /// Unregister a backend, running its stop routine first. Returns the
    /// removed instance, or `None` if no such backend was registered.
    #[instrument(skip(self))]
    pub async fn unregister(&self, name: &str) -> Result<Option<Arc<dyn Backend>>, BackendError> {
        let mut backends = self.backends.write().await;
        let Some(backend) = backends.get(name).cloned() else {
            return Ok(None);
        };
        backend.stop().await?;
        backends.remove(name);
        self.order.write().await.retain(|n| n != name);
        Ok(Some(backend))
    }

    pub async fn get(&self, name: &str) -> Option<Arc<dyn Backend>> {
        self.backends.read().await.get(name).cloned()
    }

    /// Snapshot of all backends; order unspecified.
    pub async fn list(&self) -> Vec<Arc<dyn Backend>> {
        self.backends.read().await.values().cloned().collect()
    }

    /// Subset where `enabled()` returned true at snapshot time.
    pub async fn list_enabled(&self) -> Vec<Arc<dyn Backend>> {
        self.backends
            .read()
            .await
            .values()
            .filter(|b| b.enabled())
            .cloned()
            .collect()
    }

    /// Subset whose `kind()` matches.
    pub async fn list_by_kind(&self, kind: &str) -> Vec<Arc<dyn Backend>> {
        self.backends
            .read()
            .await
            .values()
            .filter(|b| b.kind() == kind)
            .cloned()
            .collect()
    }

    /// Sorted snapshot of registered names — the one enumeration method with
    /// a deterministic order.
    pub async fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.backends.read().await.keys().cloned().collect();
        names.sort();
        names
    }

    /// Register a kind → constructor factory. Factories with an empty kind
    /// are silently dropped (idempotent helper) — there is no analogue of a
    /// "nil constructor" in Rust's type system since `ctor` is always a
    /// valid callable.
    pub async fn register_factory<F>(&self, kind: impl Into<String>, ctor: F)
    where
        F: Fn(&[u8]) -> Result<Arc<dyn Backend>, BackendError> + Send + Sync + 'static,
    {
        let kind = kind.into();
        if kind.is_empty() {
            warn!("ignoring factory registration with empty kind");
            return;
        }
        self.factories.write().await.insert(kind, Arc::new(ctor));
    }

    pub async fn build_from_factory(
        &self,
        kind: &str,
        config: &[u8],
    ) -> Result<Arc<dyn Backend>, BackendError> {
        let factory = self
            .factories
            .read()
            .await
            .get(kind)
            .cloned()
            .ok_or_else(|| BackendError::NotFound(kind.to_string()))?;
        factory(config)
    }

    /// Start every registered backend in registration order. Aborts on the
    /// first failure; backends already started are left running (no
    /// rollback).
    #[instrument(skip(self, ctx))]
    pub async fn start_all(&self, ctx: &CancellationToken) -> Result<(), BackendError> {
        let order = self.order.read().await.clone();
        let backends = self.backends.read().await;
        for name in order {
            if ctx.is_cancelled() {
                return Err(BackendError::Cancelled);
            }
            if let Some(backend) = backends.get(&name) {
                backend.start(ctx).await?;
            }
        }
        Ok(())
    }

    /// Stop every registered backend in registration order, continuing past
    /// failures and propagating the first one encountered.
    #[instrument(skip(self))]
    pub async fn stop_all(&self) -> Result<(), BackendError> {
        let order = self.order.read().await.clone();
        let backends = self.backends.read().await;
        let mut first_err = None;
        for name in order {
            if let Some(backend) = backends.get(&name) {
                if let Err(e) = backend.stop().await
                    && first_err.is_none()
                {
                    first_err = Some(e);
                }
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{BackendMetadata, LifecycleState};
    use async_trait::async_trait;
    use serde_json::{Value, json};
    use toolrt_types::Tool;

    struct StubBackend {
        name: String,
        enabled: bool,
    }

    #[async_trait]
    impl Backend for StubBackend {
        fn kind(&self) -> &str {
            "stub"
        }
        fn name(&self) -> &str {
            &self.name
        }
        fn enabled(&self) -> bool {
            self.enabled
        }
        fn lifecycle(&self) -> LifecycleState {
            LifecycleState::New
        }
        async fn list_tools(&self, _ctx: &CancellationToken) -> Result<Vec<Tool>, BackendError> {
            Ok(vec![])
        }
        async fn execute(
            &self,
            _ctx: &CancellationToken,
            _name: &str,
            _args: Value,
        ) -> Result<Value, BackendError> {
            Ok(json!(null))
        }
        fn metadata(&self) -> BackendMetadata {
            BackendMetadata::new(&self.name, "stub")
        }
    }

    fn stub(name: &str, enabled: bool) -> Arc<dyn Backend> {
        Arc::new(StubBackend {
            name: name.to_string(),
            enabled,
        })
    }

    #[tokio::test]
    async fn register_get_round_trip() {
        let registry = Registry::new();
        registry.register("a", stub("a", true)).await.unwrap();
        let got = registry.get("a").await.unwrap();
        assert_eq!(got.name(), "a");
    }

    #[tokio::test]
    async fn duplicate_registration_fails() {
        let registry = Registry::new();
        registry.register("a", stub("a", true)).await.unwrap();
        let err = registry.register("a", stub("a", true)).await.unwrap_err();
        assert!(err.is_kind(toolrt_types::ErrorKind::BackendExists));
    }

    #[tokio::test]
    async fn empty_name_rejected() {
        let registry = Registry::new();
        let err = registry.register("", stub("", true)).await.unwrap_err();
        assert!(err.is_kind(toolrt_types::ErrorKind::Configuration));
    }

    #[tokio::test]
    async fn names_are_sorted() {
        let registry = Registry::new();
        for name in ["zeta", "alpha", "mike"] {
            registry.register(name, stub(name, true)).await.unwrap();
        }
        assert_eq!(registry.names().await, vec!["alpha", "mike", "zeta"]);
    }

    #[tokio::test]
    async fn list_enabled_filters() {
        let registry = Registry::new();
        registry.register("on", stub("on", true)).await.unwrap();
        registry.register("off", stub("off", false)).await.unwrap();
        let enabled = registry.list_enabled().await;
        assert_eq!(enabled.len(), 1);
        assert_eq!(enabled[0].name(), "on");
    }

    #[tokio::test]
    async fn unregister_removes_entry() {
        let registry = Registry::new();
        registry.register("a", stub("a", true)).await.unwrap();
        let removed = registry.unregister("a").await.unwrap();
        assert!(removed.is_some());
        assert!(registry.get("a").await.is_none());
    }

    #[tokio::test]
    async fn start_all_and_stop_all_use_registration_order_not_sorted_order() {
        use std::sync::Mutex as StdMutex;

        struct OrderTrackingBackend {
            name: String,
            log: Arc<StdMutex<Vec<String>>>,
        }

        #[async_trait]
        impl Backend for OrderTrackingBackend {
            fn kind(&self) -> &str {
                "stub"
            }
            fn name(&self) -> &str {
                &self.name
            }
            fn enabled(&self) -> bool {
                true
            }
            fn lifecycle(&self) -> LifecycleState {
                LifecycleState::New
            }
            async fn list_tools(
                &self,
                _ctx: &CancellationToken,
            ) -> Result<Vec<Tool>, BackendError> {
                Ok(vec![])
            }
            async fn execute(
                &self,
                _ctx: &CancellationToken,
                _name: &str,
                _args: Value,
            ) -> Result<Value, BackendError> {
                Ok(json!(null))
            }
            async fn start(&self, _ctx: &CancellationToken) -> Result<(), BackendError> {
                self.log.lock().unwrap().push(self.name.clone());
                Ok(())
            }
            async fn stop(&self) -> Result<(), BackendError> {
                self.log.lock().unwrap().push(self.name.clone());
                Ok(())
            }
            fn metadata(&self) -> BackendMetadata {
                BackendMetadata::new(&self.name, "stub")
            }
        }

        let registry = Registry::new();
        let log = Arc::new(StdMutex::new(Vec::new()));
        for name in ["zeta", "alpha", "mike"] {
            registry
                .register(
                    name,
                    Arc::new(OrderTrackingBackend {
                        name: name.to_string(),
                        log: log.clone(),
                    }),
                )
                .await
                .unwrap();
        }
        // `names()` is sorted ("alpha", "mike", "zeta"), but lifecycle
        // iteration must follow registration order ("zeta", "alpha", "mike").
        assert_eq!(registry.names().await, vec!["alpha", "mike", "zeta"]);

        let ctx = CancellationToken::new();
        registry.start_all(&ctx).await.unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["zeta", "alpha", "mike"]);

        log.lock().unwrap().clear();
        registry.stop_all().await.unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["zeta", "alpha", "mike"]);
    }

    #[tokio::test]
    async fn unregister_removes_name_from_registration_order() {
        let registry = Registry::new();
        registry.register("a", stub("a", true)).await.unwrap();
        registry.register("b", stub("b", true)).await.unwrap();
        registry.unregister("a").await.unwrap();
        registry.register("c", stub("c", true)).await.unwrap();

        let ctx = CancellationToken::new();
        // Would panic/err if order still referenced the removed "a".
        registry.start_all(&ctx).await.unwrap();
        assert_eq!(registry.names().await, vec!["b", "c"]);
    }

    #[tokio::test]
    async fn factory_with_empty_kind_is_dropped() {
        let registry = Registry::new();
        registry
            .register_factory("", |_| Ok(stub("ignored", true)))
            .await;
        let err = registry.build_from_factory("", &[]).await.unwrap_err();
        assert!(err.is_kind(toolrt_types::ErrorKind::BackendNotFound));
    }
}
