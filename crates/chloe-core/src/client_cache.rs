// SPDX-FileCopyrightText: 2026 Chloe Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Credential-keyed cache of shared API client handles.
//!
//! Providers that talk to the same backend with the same credential share one
//! client (and its connection pool). The cache is an ordinary value injected
//! where it is needed, so tests can hand every component a fresh one.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

/// Maps a credential to a lazily built, shared client handle.
pub struct ClientCache<C> {
    clients: Mutex<HashMap<String, Arc<C>>>,
}

impl<C> ClientCache<C> {
    pub fn new() -> Self {
        Self {
            clients: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the client for `credential`, building it with `build` on first use.
    ///
    /// The lookup and insertion happen under one lock, so concurrent callers
    /// with the same credential always receive the same instance.
    pub fn get_or_create<E>(
        &self,
        credential: &str,
        build: impl FnOnce() -> Result<C, E>,
    ) -> Result<Arc<C>, E> {
        let mut clients = self.clients.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(client) = clients.get(credential) {
            return Ok(Arc::clone(client));
        }
        let client = Arc::new(build()?);
        clients.insert(credential.to_string(), Arc::clone(&client));
        Ok(client)
    }

    /// Number of distinct credentials with a cached client.
    pub fn len(&self) -> usize {
        self.clients.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<C> Default for ClientCache<C> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;

    #[test]
    fn same_credential_shares_instance() {
        let cache: ClientCache<String> = ClientCache::new();
        let a = cache
            .get_or_create("key-a", || Ok::<_, Infallible>("client".to_string()))
            .unwrap();
        let b = cache
            .get_or_create("key-a", || -> Result<String, Infallible> {
                panic!("builder must not run twice")
            })
            .unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn distinct_credentials_get_distinct_clients() {
        let cache: ClientCache<u32> = ClientCache::new();
        let a = cache.get_or_create("a", || Ok::<_, Infallible>(1)).unwrap();
        let b = cache.get_or_create("b", || Ok::<_, Infallible>(2)).unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn failed_build_caches_nothing() {
        let cache: ClientCache<u32> = ClientCache::new();
        let err = cache.get_or_create("a", || Err("boom")).unwrap_err();
        assert_eq!(err, "boom");
        assert!(cache.is_empty());
    }
}
