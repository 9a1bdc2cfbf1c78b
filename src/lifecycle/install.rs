//! Service-manager registration.
//!
//! Writes and removes a systemd unit that runs the binary in service mode.
//! Starting, pausing (`systemctl kill -s SIGUSR1`) and stopping the unit are
//! left to `systemctl`.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::ServiceIdentityConfig;

#[derive(Debug, Error)]
pub enum InstallError {
    #[error("service unit already exists at {}", .0.display())]
    AlreadyInstalled(PathBuf),

    #[error("no service unit at {}", .0.display())]
    NotInstalled(PathBuf),

    #[error("failed to access {}: {source}", path.display())]
    Io { path: PathBuf, source: io::Error },
}

/// Location of the unit file for `identity`.
pub fn unit_path(identity: &ServiceIdentityConfig) -> PathBuf {
    Path::new(&identity.unit_dir).join(format!("{}.service", identity.name))
}

/// Render the unit file text.
pub fn render_unit(
    identity: &ServiceIdentityConfig,
    executable: &Path,
    config_path: Option<&Path>,
) -> String {
    let mut exec_start = quote_arg(&executable.display().to_string());
    if let Some(config_path) = config_path {
        exec_start.push_str(" --config ");
        exec_start.push_str(&quote_arg(&config_path.display().to_string()));
    }

    format!(
        "[Unit]\n\
         Description={description}\n\
         After=network-online.target\n\
         Wants=network-online.target\n\
         \n\
         [Service]\n\
         Type=simple\n\
         ExecStart={exec_start}\n\
         KillSignal=SIGTERM\n\
         Restart=on-failure\n\
         \n\
         [Install]\n\
         WantedBy=multi-user.target\n",
        description = identity.display_name,
    )
}

/// Write the unit file. Refuses to overwrite an existing one.
pub fn install(
    identity: &ServiceIdentityConfig,
    executable: &Path,
    config_path: Option<&Path>,
) -> Result<PathBuf, InstallError> {
    let path = unit_path(identity);
    if path.exists() {
        return Err(InstallError::AlreadyInstalled(path));
    }

    let unit = render_unit(identity, executable, config_path);
    fs::write(&path, unit).map_err(|source| InstallError::Io {
        path: path.clone(),
        source,
    })?;

    tracing::info!(unit = %path.display(), service = %identity.name, "Service unit installed");
    Ok(path)
}

/// Remove the unit file.
pub fn uninstall(identity: &ServiceIdentityConfig) -> Result<PathBuf, InstallError> {
    let path = unit_path(identity);
    match fs::remove_file(&path) {
        Ok(()) => {
            tracing::info!(unit = %path.display(), service = %identity.name, "Service unit removed");
            Ok(path)
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Err(InstallError::NotInstalled(path)),
        Err(source) => Err(InstallError::Io { path, source }),
    }
}

fn quote_arg(arg: &str) -> String {
    if arg.chars().any(|c| c.is_whitespace() || c == '"') {
        format!("\"{}\"", arg.replace('\\', "\\\\").replace('"', "\\\""))
    } else {
        arg.to_string()
    }
}
