//! IPC Client for communicating with the Eye Break daemon.
//!
//! This module provides:
//! - Unix Domain Socket client
//! - Request/response handling
//! - Connection retry logic
//! - Timeout handling

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use serde_json::{Map, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::UnixStream;
use tokio::time::timeout;

use crate::types::{IpcRequest, IpcResponse};

// ============================================================================
// Constants
// ============================================================================

/// Default socket path, relative to the home directory
const DEFAULT_SOCKET_PATH: &str = ".eyebreak/eyebreak.sock";

/// Connection timeout in seconds
const CONNECTION_TIMEOUT_SECS: u64 = 5;

/// Read/write timeout in seconds
const IO_TIMEOUT_SECS: u64 = 5;

/// Maximum response size in bytes (64KB)
const MAX_RESPONSE_SIZE: u64 = 65536;

/// Maximum retry attempts
const MAX_RETRIES: u32 = 3;

/// Retry delay in milliseconds (base delay, multiplied by attempt number)
const RETRY_DELAY_MS: u64 = 500;

// ============================================================================
// IpcClient
// ============================================================================

/// IPC client for daemon communication.
#[derive(Debug, Clone)]
pub struct IpcClient {
    /// Socket path
    socket_path: PathBuf,
    /// Connection timeout
    timeout: Duration,
    /// Attempts per request
    max_retries: u32,
}

impl IpcClient {
    /// Creates a new IPC client with default socket path.
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory cannot be determined.
    pub fn new() -> Result<Self> {
        Ok(Self::with_socket_path(Self::default_socket_path()?))
    }

    /// Creates a new IPC client with a custom socket path.
    pub fn with_socket_path(socket_path: PathBuf) -> Self {
        Self {
            socket_path,
            timeout: Duration::from_secs(CONNECTION_TIMEOUT_SECS),
            max_retries: MAX_RETRIES,
        }
    }

    /// Sets how many attempts each request makes.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries.max(1);
        self
    }

    /// Returns the default socket path (`~/.eyebreak/eyebreak.sock`).
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory cannot be determined.
    pub fn default_socket_path() -> Result<PathBuf> {
        let home = dirs::home_dir().context("ホームディレクトリが見つかりません")?;
        Ok(home.join(DEFAULT_SOCKET_PATH))
    }

    /// Returns the socket path.
    pub fn socket_path(&self) -> &PathBuf {
        &self.socket_path
    }

    /// Sends a start command to the daemon.
    pub async fn start(&self) -> Result<IpcResponse> {
        self.send_request_with_retry(&IpcRequest::Start).await
    }

    /// Sends a pause command to the daemon.
    pub async fn pause(&self) -> Result<IpcResponse> {
        self.send_request_with_retry(&IpcRequest::Pause).await
    }

    /// Stops the beeps of the current break.
    pub async fn silence(&self) -> Result<IpcResponse> {
        self.send_request_with_retry(&IpcRequest::Silence).await
    }

    /// Sends a status query to the daemon.
    pub async fn status(&self) -> Result<IpcResponse> {
        self.send_request_with_retry(&IpcRequest::Status).await
    }

    /// Loads the daemon's current settings.
    pub async fn settings(&self) -> Result<IpcResponse> {
        self.send_request_with_retry(&IpcRequest::Settings).await
    }

    /// Sends a settings patch to the daemon.
    pub async fn save_settings(&self, patch: Map<String, Value>) -> Result<IpcResponse> {
        self.send_request_with_retry(&IpcRequest::SaveSettings { settings: patch })
            .await
    }

    /// Asks the daemon to shut down.
    pub async fn quit(&self) -> Result<IpcResponse> {
        self.send_request_with_retry(&IpcRequest::Quit).await
    }

    /// Sends a request to the daemon with retry logic.
    async fn send_request_with_retry(&self, request: &IpcRequest) -> Result<IpcResponse> {
        let mut attempt = 1;
        loop {
            match self.send_request(request).await {
                Ok(response) => return Ok(response),
                Err(e) if attempt < self.max_retries => {
                    tracing::warn!(
                        "リクエスト失敗 (試行 {}/{}): {}",
                        attempt,
                        self.max_retries,
                        e
                    );
                    let delay = Duration::from_millis(RETRY_DELAY_MS * u64::from(attempt));
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Sends a single request to the daemon.
    async fn send_request(&self, request: &IpcRequest) -> Result<IpcResponse> {
        let mut stream = timeout(self.timeout, UnixStream::connect(&self.socket_path))
            .await
            .context("接続がタイムアウトしました")?
            .context("デーモンに接続できません。'eyebreak daemon' を起動してください")?;

        let request_json =
            serde_json::to_vec(request).context("リクエストのシリアライズに失敗しました")?;

        timeout(
            Duration::from_secs(IO_TIMEOUT_SECS),
            stream.write_all(&request_json),
        )
        .await
        .context("書き込みがタイムアウトしました")?
        .context("リクエストの送信に失敗しました")?;

        // Shutdown write side to signal end of request
        stream
            .shutdown()
            .await
            .context("シャットダウンに失敗しました")?;

        let mut buffer = Vec::new();
        timeout(
            Duration::from_secs(IO_TIMEOUT_SECS),
            (&mut stream)
                .take(MAX_RESPONSE_SIZE)
                .read_to_end(&mut buffer),
        )
        .await
        .context("読み込みがタイムアウトしました")?
        .context("レスポンスの受信に失敗しました")?;

        if buffer.is_empty() {
            anyhow::bail!("デーモンからの応答がありませんでした");
        }

        let response: IpcResponse =
            serde_json::from_slice(&buffer).context("レスポンスのパースに失敗しました")?;

        if response.is_error() {
            anyhow::bail!("{}", response.message);
        }

        Ok(response)
    }
}

// ============================================================================
// Tests
// ============================================================================
