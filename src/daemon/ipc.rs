//! IPC Server for Eye Break.
//!
//! This module provides Unix Domain Socket IPC functionality:
//! - Server that listens on a Unix socket
//! - Request/response framing (one JSON request, one JSON response)
//! - Forwarding of requests to the service loop that owns the scheduler

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{mpsc, oneshot};
use tokio::time::{timeout, Duration};
use tracing::{debug, warn};

use crate::types::{IpcRequest, IpcResponse};

// ============================================================================
// Constants
// ============================================================================

/// Default socket path
pub const DEFAULT_SOCKET_PATH: &str = "~/.eyebreak/eyebreak.sock";

/// Maximum request size in bytes (16KB, room for a full settings patch)
const MAX_REQUEST_SIZE: usize = 16 * 1024;

/// Read timeout in seconds
const READ_TIMEOUT_SECS: u64 = 5;

// ============================================================================
// IpcError
// ============================================================================

/// IPC-specific error types.
#[derive(Debug, thiserror::Error)]
pub enum IpcError {
    /// Read error
    #[error("Failed to read request: {0}")]
    ReadError(String),

    /// Timeout error
    #[error("Operation timed out")]
    Timeout,

    /// Request too large
    #[error("Request too large (max {MAX_REQUEST_SIZE} bytes)")]
    RequestTooLarge,

    /// The service loop is gone
    #[error("Daemon is shutting down")]
    ServiceUnavailable,
}

// ============================================================================
// IpcServer
// ============================================================================

/// Unix Domain Socket IPC server.
pub struct IpcServer {
    /// Unix socket listener
    listener: UnixListener,
    /// Socket path (for cleanup)
    socket_path: PathBuf,
}

impl IpcServer {
    /// Creates a new IPC server bound to the specified socket path.
    ///
    /// If the socket file already exists, it will be removed before binding.
    ///
    /// # Errors
    ///
    /// Returns an error if the socket cannot be bound.
    pub fn new(socket_path: &Path) -> Result<Self> {
        if socket_path.exists() {
            std::fs::remove_file(socket_path)
                .with_context(|| format!("Failed to remove existing socket: {:?}", socket_path))?;
        }

        if let Some(parent) = socket_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create socket directory: {:?}", parent))?;
        }

        let listener = UnixListener::bind(socket_path)
            .with_context(|| format!("Failed to bind Unix socket: {:?}", socket_path))?;

        Ok(Self {
            listener,
            socket_path: socket_path.to_path_buf(),
        })
    }

    /// Accepts an incoming client connection.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be accepted.
    pub async fn accept(&self) -> Result<UnixStream> {
        let (stream, _addr) = self
            .listener
            .accept()
            .await
            .context("Failed to accept connection")?;
        Ok(stream)
    }

    /// Receives and deserializes an IPC request from the stream.
    ///
    /// Reads until the client shuts down its write half, with a timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if reading or deserialization fails.
    pub async fn receive_request(stream: &mut UnixStream) -> Result<IpcRequest> {
        let mut buffer = Vec::new();
        let mut limited = stream.take(MAX_REQUEST_SIZE as u64 + 1);

        let read_result = timeout(
            Duration::from_secs(READ_TIMEOUT_SECS),
            limited.read_to_end(&mut buffer),
        )
        .await;

        match read_result {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => return Err(IpcError::ReadError(e.to_string()).into()),
            Err(_) => return Err(IpcError::Timeout.into()),
        }

        if buffer.is_empty() {
            anyhow::bail!("Connection closed by client");
        }
        if buffer.len() > MAX_REQUEST_SIZE {
            return Err(IpcError::RequestTooLarge.into());
        }

        let request: IpcRequest = serde_json::from_slice(&buffer)
            .with_context(|| "Failed to deserialize IPC request")?;

        Ok(request)
    }

    /// Serializes and sends an IPC response to the stream.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub async fn send_response(stream: &mut UnixStream, response: &IpcResponse) -> Result<()> {
        let json = serde_json::to_vec(response).context("Failed to serialize IPC response")?;

        stream
            .write_all(&json)
            .await
            .context("Failed to write response")?;
        stream.flush().await.context("Failed to flush response")?;
        stream
            .shutdown()
            .await
            .context("Failed to close response stream")?;

        Ok(())
    }

    /// Returns the socket path.
    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// Accepts connections forever, answering each one through `handler`.
    pub async fn serve(self, handler: RequestHandler) {
        loop {
            let mut stream = match self.accept().await {
                Ok(stream) => stream,
                Err(e) => {
                    warn!("接続の受け付けに失敗しました: {:#}", e);
                    continue;
                }
            };

            let handler = handler.clone();
            tokio::spawn(async move {
                let response = match Self::receive_request(&mut stream).await {
                    Ok(request) => handler.handle(request).await,
                    Err(e) => {
                        debug!("不正なリクエスト: {:#}", e);
                        IpcResponse::error(format!("不正なリクエストです: {}", e))
                    }
                };
                if let Err(e) = Self::send_response(&mut stream, &response).await {
                    debug!("応答の送信に失敗しました: {:#}", e);
                }
            });
        }
    }
}

impl Drop for IpcServer {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.socket_path);
    }
}

// ============================================================================
// RequestHandler
// ============================================================================

/// A request waiting to be answered by the service loop.
#[derive(Debug)]
pub struct ControlCommand {
    pub request: IpcRequest,
    pub reply: oneshot::Sender<IpcResponse>,
}

/// Handles IPC requests by forwarding them to the service loop.
#[derive(Debug, Clone)]
pub struct RequestHandler {
    commands: mpsc::Sender<ControlCommand>,
}

impl RequestHandler {
    /// Creates a request handler sending on `commands`.
    pub fn new(commands: mpsc::Sender<ControlCommand>) -> Self {
        Self { commands }
    }

    /// Handles an IPC request and returns the service loop's response.
    pub async fn handle(&self, request: IpcRequest) -> IpcResponse {
        match self.dispatch(request).await {
            Ok(response) => response,
            Err(e) => IpcResponse::error(e.to_string()),
        }
    }

    async fn dispatch(&self, request: IpcRequest) -> Result<IpcResponse, IpcError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(ControlCommand { request, reply })
            .await
            .map_err(|_| IpcError::ServiceUnavailable)?;
        response.await.map_err(|_| IpcError::ServiceUnavailable)
    }
}

// ============================================================================
// Tests
// ============================================================================
