//! Startup and shutdown orchestration.
//!
//! # Responsibilities
//! - Bind the listening socket and acquire the inbound credential
//! - Wire the HTTP front end to the dispatch loop through the request queue
//! - Hand out a control handle for pause/resume/stop
//! - Tear everything down in order on stop
//!
//! # Design Decisions
//! - Fail fast: bind and credential failures are fatal and reported as
//!   [`StartupError`]; anything already acquired is released by drop
//! - Listener binds before credentials are acquired, the front end starts
//!   last (traffic only when the loop can answer it)
//! - Stop joins the dispatch loop before the front end so requests still
//!   queued are answered (503) rather than left hanging

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::task::JoinHandle;

use crate::auth::package::PackageError;
use crate::auth::token::TokenError;
use crate::auth::{Authenticator, SecurityPackage, StaticPackage};
use crate::config::{validate_config, ConfigError, ServiceConfig, ValidationError};
use crate::dispatch::{DispatchLoop, LoopExit};
use crate::http::HttpServer;
use crate::lifecycle::control::ServiceControl;
use crate::net::listener::{self, ListenerError};
use crate::net::queue::request_queue;
use crate::observability::metrics;

/// Fatal errors while bringing the service up.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("listener error: {0}")]
    Listener(#[from] ListenerError),

    #[error("credential acquisition failed: {0}")]
    Credentials(#[from] PackageError),

    #[error("invalid package token: {0}")]
    Package(#[from] TokenError),

    #[error("metrics exporter failed: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),

    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// A running service: front end, dispatch loop, and their shared control.
pub struct ServiceHost {
    control: ServiceControl,
    local_addr: SocketAddr,
    server: JoinHandle<io::Result<()>>,
    dispatch: JoinHandle<LoopExit>,
}

impl ServiceHost {
    /// Validate `config`, start the metrics exporter if enabled, and start
    /// the service with the static package the config describes.
    pub async fn launch(config: &ServiceConfig) -> Result<Self, StartupError> {
        validate_config(config).map_err(ConfigError::Validation)?;

        if config.observability.metrics_enabled {
            let addr = config.observability.metrics_address.parse().map_err(|_| {
                ConfigError::Validation(vec![ValidationError::InvalidAddress {
                    field: "observability.metrics_address",
                    value: config.observability.metrics_address.clone(),
                }])
            })?;
            metrics::init_metrics(addr)?;
        }

        let package = StaticPackage::from_config(&config.negotiate)?;
        Self::start(config, Arc::new(package)).await
    }

    /// Bring the service up on the current runtime.
    pub async fn start(
        config: &ServiceConfig,
        package: Arc<dyn SecurityPackage>,
    ) -> Result<Self, StartupError> {
        let listener = listener::bind(&config.listener).await?;
        let local_addr = listener.local_addr()?;

        let authenticator = Authenticator::new(
            package,
            &config.negotiate.package,
            config.negotiate.empty_token,
        )?;

        let control = ServiceControl::new();
        let (sender, queue) = request_queue(config.listener.queue_depth);

        let dispatch = DispatchLoop::new(
            queue,
            authenticator,
            control.clone(),
            Duration::from_millis(config.dispatch.pause_poll_ms),
        );
        let dispatch = tokio::spawn(dispatch.run());

        let server = HttpServer::new(&config.listener, sender);
        let server = tokio::spawn(server.run(listener, control.subscribe()));

        tracing::info!(
            address = %local_addr,
            service = %config.service.name,
            "Service started"
        );

        Ok(Self {
            control,
            local_addr,
            server,
            dispatch,
        })
    }

    /// Address the front end is actually listening on.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// A cloneable handle for pause/resume/stop.
    pub fn handle(&self) -> ServiceControl {
        self.control.clone()
    }

    /// Resolve once stop has been requested through any handle.
    pub async fn stopped(&self) {
        self.control.stopped().await
    }

    /// Stop the service and wait for both tasks to finish.
    pub async fn stop(self) {
        self.control.stop();

        match self.dispatch.await {
            Ok(exit) => tracing::debug!(exit = ?exit, "Dispatch task joined"),
            Err(e) => tracing::error!(error = %e, "Dispatch task failed"),
        }

        match self.server.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::error!(error = %e, "HTTP front end failed"),
            Err(e) => tracing::error!(error = %e, "HTTP front end task failed"),
        }

        tracing::info!("Service stopped");
    }
}
