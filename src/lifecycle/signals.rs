//! OS signal handling.
//!
//! # Responsibilities
//! - Register signal handlers (SIGTERM, SIGINT, SIGUSR1, SIGUSR2)
//! - Translate signals into pause/resume/stop on a [`ServiceControl`]
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - SIGUSR1/SIGUSR2 are the service manager's pause and continue; they never
//!   stop the process
//! - Returns once stop has been requested, whether by signal or otherwise

use std::io;

use crate::lifecycle::control::ServiceControl;

/// Drive `control` from process signals until stop is requested.
#[cfg(unix)]
pub async fn handle_signals(control: ServiceControl) -> io::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = signal(SignalKind::terminate())?;
    let mut interrupt = signal(SignalKind::interrupt())?;
    let mut pause = signal(SignalKind::user_defined1())?;
    let mut resume = signal(SignalKind::user_defined2())?;

    loop {
        tokio::select! {
            _ = control.stopped() => return Ok(()),
            _ = terminate.recv() => {
                tracing::info!(signal = "SIGTERM", "Stop signal received");
                control.stop();
            }
            _ = interrupt.recv() => {
                tracing::info!(signal = "SIGINT", "Stop signal received");
                control.stop();
            }
            _ = pause.recv() => {
                tracing::debug!(signal = "SIGUSR1", "Pause signal received");
                control.pause();
            }
            _ = resume.recv() => {
                tracing::debug!(signal = "SIGUSR2", "Resume signal received");
                control.resume();
            }
        }
    }
}

/// Drive `control` from Ctrl+C until stop is requested.
#[cfg(not(unix))]
pub async fn handle_signals(control: ServiceControl) -> io::Result<()> {
    tokio::select! {
        _ = control.stopped() => {}
        result = tokio::signal::ctrl_c() => {
            result?;
            tracing::info!("Ctrl+C received");
            control.stop();
        }
    }
    Ok(())
}
