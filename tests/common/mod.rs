//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use negotiate_echo::auth::package::{
    AcceptStatus, ContextHandle, ContextRequirements, CredentialHandle, CredentialUse,
    PackageError, SecurityPackage,
};
use negotiate_echo::{ServiceConfig, ServiceHost, StaticPackage};

/// Base64 of `ticket`, accepted for `alice@EXAMPLE.COM`.
pub const ALICE_TOKEN: &str = "dGlja2V0";
pub const ALICE: &str = "alice@EXAMPLE.COM";

/// A [`StaticPackage`] that counts accept calls.
pub struct CountingPackage {
    inner: StaticPackage,
    accepts: AtomicUsize,
}

impl CountingPackage {
    pub fn new(inner: StaticPackage) -> Arc<Self> {
        Arc::new(Self {
            inner,
            accepts: AtomicUsize::new(0),
        })
    }

    pub fn accepts(&self) -> usize {
        self.accepts.load(Ordering::SeqCst)
    }

    pub fn live_contexts(&self) -> usize {
        self.inner.live_contexts()
    }
}

impl SecurityPackage for CountingPackage {
    fn acquire_credentials_handle(
        &self,
        package: &str,
        usage: CredentialUse,
    ) -> Result<CredentialHandle, PackageError> {
        self.inner.acquire_credentials_handle(package, usage)
    }

    fn accept_security_context(
        &self,
        credentials: &CredentialHandle,
        prior: Option<&ContextHandle>,
        input: &[u8],
        requirements: ContextRequirements,
    ) -> AcceptStatus {
        self.accepts.fetch_add(1, Ordering::SeqCst);
        self.inner
            .accept_security_context(credentials, prior, input, requirements)
    }

    fn query_context_names(&self, context: &ContextHandle) -> Option<String> {
        self.inner.query_context_names(context)
    }

    fn delete_security_context(&self, context: ContextHandle) {
        self.inner.delete_security_context(context)
    }

    fn free_credentials_handle(&self, credentials: CredentialHandle) {
        self.inner.free_credentials_handle(credentials)
    }
}

/// Package accepting [`ALICE_TOKEN`].
pub fn alice_package() -> Arc<CountingPackage> {
    CountingPackage::new(StaticPackage::new().with_principal(b"ticket".to_vec(), ALICE))
}

/// Config listening on an ephemeral loopback port.
pub fn test_config() -> ServiceConfig {
    let mut config = ServiceConfig::default();
    config.listener.bind_address = "127.0.0.1:0".into();
    config.dispatch.pause_poll_ms = 10;
    config
}

/// Start a service with `config` and `package`.
pub async fn start_service(config: &ServiceConfig, package: Arc<CountingPackage>) -> ServiceHost {
    ServiceHost::start(config, package)
        .await
        .expect("service should start")
}

/// A client that never pools or proxies.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
