//! Provider subprocess protocol.
//!
//! Calendar stores and schedule sources live in external executables
//! (e.g. `schedsync-provider-google`, `schedsync-source-mtuci`) that speak
//! JSON over stdin/stdout: one request line in, one response line out.
//! Providers own their credentials and tokens.

use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;
use tokio::io::AsyncWriteExt;
use tokio::process::Command as TokioCommand;
use tokio::time::timeout;

use crate::error::{SyncError, SyncResult};
use crate::remote::protocol::{Command, ErrorKind, ProviderCommand, Request, Response};

pub const PROVIDER_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone, Debug)]
pub struct Provider {
    /// Short name (`google`) or a path to the executable.
    name: String,
    prefix: &'static str,
    timeout: Duration,
}

impl Provider {
    /// A calendar provider, `schedsync-provider-<name>`.
    pub fn calendar(name: &str) -> Self {
        Provider {
            name: name.to_string(),
            prefix: "schedsync-provider-",
            timeout: PROVIDER_TIMEOUT,
        }
    }

    /// A schedule source, `schedsync-source-<name>`.
    pub fn schedule(name: &str) -> Self {
        Provider {
            name: name.to_string(),
            prefix: "schedsync-source-",
            timeout: PROVIDER_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn binary_path(&self) -> SyncResult<PathBuf> {
        // Explicit paths skip the PATH lookup
        if self.name.contains(std::path::MAIN_SEPARATOR) {
            return Ok(PathBuf::from(&self.name));
        }

        let binary_name = format!("{}{}", self.prefix, self.name);
        which::which(&binary_name).map_err(|_| SyncError::ProviderNotInstalled(binary_name))
    }

    /// Call a typed provider command and return the result.
    ///
    /// The response type is inferred from the command's associated type,
    /// ensuring compile-time type safety.
    pub async fn call<C: ProviderCommand>(&self, cmd: C) -> SyncResult<C::Response> {
        timeout(self.timeout, self.call_raw(C::command(), cmd))
            .await
            .map_err(|_| SyncError::ProviderTimeout(self.timeout.as_secs()))?
    }

    /// Low-level call that sends a command with params and deserializes the response.
    async fn call_raw<P: Serialize, R: serde::de::DeserializeOwned>(
        &self,
        command: Command,
        params: P,
    ) -> SyncResult<R> {
        let params =
            serde_json::to_value(params).map_err(|e| SyncError::Serialization(e.to_string()))?;
        let request = Request { command, params };
        let request_json =
            serde_json::to_string(&request).map_err(|e| SyncError::Serialization(e.to_string()))?;

        let binary_path = self.binary_path()?;

        let mut child = TokioCommand::new(&binary_path)
            .stdin(std::process::Stdio::piped())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                SyncError::permanent(format!("Failed to spawn {}: {}", binary_path.display(), e))
            })?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| SyncError::permanent("Provider stdin unavailable"))?;
        stdin.write_all(format!("{request_json}\n").as_bytes()).await?;
        drop(stdin);

        let output = child.wait_with_output().await?;

        if !output.status.success() {
            return Err(SyncError::permanent(format!(
                "Provider exited with status: {}",
                output.status.code().unwrap_or(-1)
            )));
        }

        let response_str = String::from_utf8_lossy(&output.stdout);
        if response_str.trim().is_empty() {
            return Err(SyncError::permanent("Provider returned no response"));
        }

        let response: Response<R> = serde_json::from_str(response_str.trim())
            .map_err(|e| SyncError::permanent(format!("Failed to parse response: {}", e)))?;

        match response {
            Response::Success { data } => Ok(data),
            Response::Error {
                error,
                kind,
                retry_after_secs,
            } => Err(classify(error, kind, retry_after_secs)),
        }
    }
}

fn classify(error: String, kind: ErrorKind, retry_after_secs: Option<u64>) -> SyncError {
    match kind {
        ErrorKind::Transient | ErrorKind::RateLimited => SyncError::TransientProvider {
            message: error,
            retry_after: retry_after_secs.map(Duration::from_secs),
        },
        ErrorKind::Permanent => SyncError::PermanentProvider(error),
    }
}
