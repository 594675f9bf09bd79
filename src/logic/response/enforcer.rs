//! Enforcement Points
//!
//! The router's firewall address list is the only containment primitive:
//! "add this address to the block list for T". Submitting twice creates two
//! list entries, so idempotency is the executor's job, not ours.

use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::process::Command;

use super::types::EnforcementError;
use crate::logic::config::EnforcementConfig;

const BLOCK_COMMENT: &str = "Added by Wazuh";

#[async_trait]
pub trait EnforcementPoint: Send + Sync {
    fn name(&self) -> &str;

    /// Add `ip` to the block list for `duration` (RouterOS syntax, e.g. "90d")
    async fn block(&self, ip: IpAddr, duration: &str) -> Result<(), EnforcementError>;
}

/// RouterOS durations: digits with unit suffixes ("90d", "1d12h") or "hh:mm:ss"
pub fn validate_duration(duration: &str) -> Result<(), EnforcementError> {
    let valid = !duration.is_empty()
        && duration.starts_with(|c: char| c.is_ascii_digit())
        && duration
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, 's' | 'm' | 'h' | 'd' | 'w' | ':'));
    if valid {
        Ok(())
    } else {
        Err(EnforcementError::InvalidTimeout(duration.to_string()))
    }
}

// ============================================================================
// SSH (MikroTik)
// ============================================================================

pub struct SshEnforcer {
    host: String,
    user: String,
    key: PathBuf,
    list_name: String,
    timeout: Duration,
}

impl SshEnforcer {
    pub fn new(config: &EnforcementConfig) -> Self {
        Self {
            host: config.router_host.clone(),
            user: config.router_user.clone(),
            key: config.ssh_key.clone(),
            list_name: config.list_name.clone(),
            timeout: config.timeout,
        }
    }

    pub fn router_command(&self, ip: IpAddr, duration: &str) -> String {
        format!(
            "/ip firewall address-list add list=\"{}\" address={} timeout={} comment=\"{}\"",
            self.list_name, ip, duration, BLOCK_COMMENT
        )
    }

    pub fn ssh_args(&self, ip: IpAddr, duration: &str) -> Vec<String> {
        vec![
            "-i".to_string(),
            self.key.to_string_lossy().into_owned(),
            "-o".to_string(),
            "StrictHostKeyChecking=no".to_string(),
            "-o".to_string(),
            "BatchMode=yes".to_string(),
            format!("{}@{}", self.user, self.host),
            self.router_command(ip, duration),
        ]
    }
}

#[async_trait]
impl EnforcementPoint for SshEnforcer {
    fn name(&self) -> &str {
        "ssh"
    }

    async fn block(&self, ip: IpAddr, duration: &str) -> Result<(), EnforcementError> {
        validate_duration(duration)?;

        let mut command = Command::new("ssh");
        command.args(self.ssh_args(ip, duration)).kill_on_drop(true);

        log::debug!("Running block command for {} on {}", ip, self.host);
        let output = tokio::time::timeout(self.timeout, command.output())
            .await
            .map_err(|_| EnforcementError::Timeout(self.timeout))??;

        if output.status.success() {
            log::info!("Router {} accepted block for {}", self.host, ip);
            Ok(())
        } else {
            Err(EnforcementError::CommandFailed {
                status: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            })
        }
    }
}

// ============================================================================
// DRY RUN
// ============================================================================

/// Logs and remembers block requests without contacting the router
#[derive(Default)]
pub struct DryRunEnforcer {
    requests: Mutex<Vec<(IpAddr, String)>>,
}

impl DryRunEnforcer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn requests(&self) -> Vec<(IpAddr, String)> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl EnforcementPoint for DryRunEnforcer {
    fn name(&self) -> &str {
        "dry-run"
    }

    async fn block(&self, ip: IpAddr, duration: &str) -> Result<(), EnforcementError> {
        validate_duration(duration)?;
        log::info!("[dry-run] would block {} for {}", ip, duration);
        self.requests.lock().push((ip, duration.to_string()));
        Ok(())
    }
}
