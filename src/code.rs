//! # One-Time Code Rendezvous
//!
//! The authorization broker asks the requester for a one-time code through a
//! [`CodeProvider`]. The channel implementation hands a [`CodeRequest`] to the
//! transport and waits on a oneshot for the reply. Dropping the waiting future
//! drops the oneshot receiver, so a cancelled or timed-out wait never leaves
//! the transport holding a request anyone still listens to.

use std::fmt;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

/// What the transport shows the requester.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodePrompt {
    pub username: String,
    pub hint: Option<String>,
}

impl fmt::Display for CodePrompt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Enter the one-time code for {}", self.username)?;
        if let Some(hint) = &self.hint {
            write!(f, " ({})", hint)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CodeError {
    #[error("code channel closed")]
    Closed,
    #[error("code request declined: {0}")]
    Declined(String),
}

/// Capability to obtain a one-time code from the requester.
#[async_trait]
pub trait CodeProvider: Send + Sync {
    async fn request_code(&self, prompt: CodePrompt) -> Result<String, CodeError>;
}

/// A pending code request delivered to the transport.
#[derive(Debug)]
pub struct CodeRequest {
    prompt: CodePrompt,
    reply: oneshot::Sender<Result<String, CodeError>>,
}

impl CodeRequest {
    pub fn prompt(&self) -> &CodePrompt {
        &self.prompt
    }

    /// Whether the requesting side stopped waiting.
    pub fn is_abandoned(&self) -> bool {
        self.reply.is_closed()
    }

    /// Deliver the requester's reply. Returns `false` if nobody waits anymore.
    pub fn respond(self, code: impl Into<String>) -> bool {
        self.reply.send(Ok(code.into())).is_ok()
    }

    pub fn decline(self, reason: impl Into<String>) -> bool {
        self.reply
            .send(Err(CodeError::Declined(reason.into())))
            .is_ok()
    }
}

/// [`CodeProvider`] that forwards requests over an mpsc channel.
#[derive(Debug, Clone)]
pub struct ChannelCodeProvider {
    requests: mpsc::Sender<CodeRequest>,
}

/// Create a code provider and the receiver the transport reads requests from.
pub fn code_channel(buffer: usize) -> (ChannelCodeProvider, mpsc::Receiver<CodeRequest>) {
    let (requests, receiver) = mpsc::channel(buffer.max(1));
    (ChannelCodeProvider { requests }, receiver)
}

#[async_trait]
impl CodeProvider for ChannelCodeProvider {
    async fn request_code(&self, prompt: CodePrompt) -> Result<String, CodeError> {
        let (reply, response) = oneshot::channel();
        debug!(username = %prompt.username, "Requesting one-time code");

        self.requests
            .send(CodeRequest { prompt, reply })
            .await
            .map_err(|_| CodeError::Closed)?;

        let code = response.await.map_err(|_| CodeError::Closed)??;
        Ok(code.trim().to_string())
    }
}
