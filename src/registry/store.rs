//! Endpoint registry implementation
//!
//! Maps `(host, port)` to its [`Endpoint`]. The registry lock only guards
//! map lookups, inserts and removals; it is never held across client I/O.
//! When both locks are needed the order is registry, then endpoint.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use super::endpoint::Endpoint;
use super::key::EndpointKey;
use crate::error::Result;

/// Registry of live endpoints
#[derive(Debug, Default)]
pub struct EndpointRegistry {
    endpoints: RwLock<HashMap<EndpointKey, Arc<Endpoint>>>,
}

impl EndpointRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the endpoint for `key`, binding a new one if none exists
    ///
    /// A bind failure is returned and nothing is registered.
    pub async fn get_or_create(&self, key: &EndpointKey) -> Result<Arc<Endpoint>> {
        if let Some(endpoint) = self.get(key).await {
            return Ok(endpoint);
        }

        // Name resolution may block on DNS; do it before taking the write lock
        let addr = key.resolve().await?;

        let mut endpoints = self.endpoints.write().await;
        if let Some(endpoint) = endpoints.get(key) {
            return Ok(Arc::clone(endpoint));
        }

        let endpoint = Arc::new(Endpoint::bind(key.clone(), addr)?);
        endpoints.insert(key.clone(), Arc::clone(&endpoint));

        tracing::info!(
            endpoint = %key,
            addr = %endpoint.local_addr(),
            "Endpoint listening"
        );

        Ok(endpoint)
    }

    /// Get an existing endpoint
    pub async fn get(&self, key: &EndpointKey) -> Option<Arc<Endpoint>> {
        self.endpoints.read().await.get(key).cloned()
    }

    /// Remove an endpoint; `None` if it was not registered
    pub async fn remove(&self, key: &EndpointKey) -> Option<Arc<Endpoint>> {
        self.endpoints.write().await.remove(key)
    }

    /// Remove every endpoint
    pub async fn drain(&self) -> Vec<Arc<Endpoint>> {
        self.endpoints
            .write()
            .await
            .drain()
            .map(|(_, endpoint)| endpoint)
            .collect()
    }

    /// Keys of all registered endpoints
    pub async fn keys(&self) -> Vec<EndpointKey> {
        self.endpoints.read().await.keys().cloned().collect()
    }

    /// Number of registered endpoints
    pub async fn len(&self) -> usize {
        self.endpoints.read().await.len()
    }

    /// Whether no endpoint is registered
    pub async fn is_empty(&self) -> bool {
        self.endpoints.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RelayError;

    #[tokio::test]
    async fn test_get_or_create_reuses_endpoint() {
        let registry = EndpointRegistry::new();
        let key = EndpointKey::new("127.0.0.1", 0);

        let first = registry.get_or_create(&key).await.unwrap();
        let second = registry.get_or_create(&key).await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(registry.len().await, 1);
        assert_eq!(first.key(), &key);
        assert_ne!(first.local_addr().port(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_get_or_create_single_endpoint() {
        let registry = Arc::new(EndpointRegistry::new());
        let key = EndpointKey::new("127.0.0.1", 0);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                let key = key.clone();
                tokio::spawn(async move { registry.get_or_create(&key).await.unwrap() })
            })
            .collect();

        let mut endpoints = Vec::new();
        for handle in handles {
            endpoints.push(handle.await.unwrap());
        }

        assert_eq!(registry.len().await, 1);
        assert!(endpoints.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    }

    #[tokio::test]
    async fn test_bind_failure_not_registered() {
        let registry = EndpointRegistry::new();
        let first = registry
            .get_or_create(&EndpointKey::new("127.0.0.1", 0))
            .await
            .unwrap();

        // Same port, different key: the listener is still active
        let clash = EndpointKey::new("localhost", first.local_addr().port());
        let result = registry.get_or_create(&clash).await;

        if let Ok(endpoint) = &result {
            // localhost may resolve to ::1 on dual-stack hosts, where the port is free
            assert!(endpoint.local_addr().is_ipv6());
        } else {
            assert!(matches!(result, Err(RelayError::Bind { .. })));
            assert!(registry.get(&clash).await.is_none());
            assert_eq!(registry.len().await, 1);
        }
    }

    #[tokio::test]
    async fn test_remove_is_idempotent() {
        let registry = EndpointRegistry::new();
        let key = EndpointKey::new("127.0.0.1", 0);
        registry.get_or_create(&key).await.unwrap();

        assert!(registry.remove(&key).await.is_some());
        assert!(registry.remove(&key).await.is_none());
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn test_drain() {
        let registry = EndpointRegistry::new();
        registry
            .get_or_create(&EndpointKey::new("127.0.0.1", 0))
            .await
            .unwrap();
        registry
            .get_or_create(&EndpointKey::new("", 0))
            .await
            .unwrap();

        assert_eq!(registry.keys().await.len(), 2);
        assert_eq!(registry.drain().await.len(), 2);
        assert!(registry.is_empty().await);
    }
}
