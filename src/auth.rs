//! # Authorization Broker
//!
//! Turns a requester identity into an authorized provider session. The login
//! handshake may demand a one-time code, which is requested from the user
//! exactly once through a [`CodeProvider`] and bounded by both the code
//! timeout and the run's cancellation token. Every provider call of the
//! handshake yields to cancellation.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use crate::code::{CodePrompt, CodeProvider};
use crate::credentials::{CredentialStore, RequesterId, TenantKey};
use crate::error::SyncError;
use crate::provider::{Challenge, LoginStep, Provider, Session};

/// Default time the requester has to reply with a code.
pub const DEFAULT_CODE_TIMEOUT: Duration = Duration::from_secs(300);

/// A session together with the tenant it is bound to.
pub struct Authorized {
    pub tenant: TenantKey,
    pub session: Box<dyn Session>,
}

impl std::fmt::Debug for Authorized {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Authorized")
            .field("tenant", &self.tenant)
            .finish_non_exhaustive()
    }
}

pub struct AuthorizationBroker {
    credentials: Arc<CredentialStore>,
    provider: Arc<dyn Provider>,
    code_timeout: Duration,
}

impl AuthorizationBroker {
    pub fn new(
        credentials: Arc<CredentialStore>,
        provider: Arc<dyn Provider>,
        code_timeout: Duration,
    ) -> Self {
        Self {
            credentials,
            provider,
            code_timeout,
        }
    }

    /// Run the login handshake for `requester`.
    #[instrument(skip(self, codes, cancel), fields(provider = self.provider.name()))]
    pub async fn authorize(
        &self,
        requester: RequesterId,
        codes: &dyn CodeProvider,
        cancel: &CancellationToken,
    ) -> Result<Authorized, SyncError> {
        let credential = self
            .credentials
            .get(requester)
            .ok_or(SyncError::UnknownUser(requester))?;
        let tenant = credential.tenant();

        let step = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return Err(SyncError::AuthorizationAborted("cancelled before login".to_string()));
            }
            step = self.provider.login(&credential.username, &credential.password) => {
                step.map_err(|e| SyncError::AuthorizationFailed(e.to_string()))?
            }
        };

        let challenge = match step {
            LoginStep::Authorized(session) => {
                info!(tenant = %tenant, "Authorized without one-time code");
                return Ok(Authorized { tenant, session });
            }
            LoginStep::CodeRequired(challenge) => challenge,
        };

        let code = match self.await_code(&challenge, codes, cancel).await {
            Ok(code) => code,
            Err(reason) => {
                warn!(tenant = %tenant, reason = %reason, "Aborting login handshake");
                self.provider.abort(&challenge).await;
                return Err(SyncError::AuthorizationAborted(reason));
            }
        };

        let session = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                warn!(tenant = %tenant, "Cancelled while confirming one-time code");
                self.provider.abort(&challenge).await;
                return Err(SyncError::AuthorizationAborted(
                    "cancelled while confirming the one-time code".to_string(),
                ));
            }
            confirmed = self.provider.confirm(&challenge, &code) => {
                confirmed.map_err(|e| SyncError::AuthorizationFailed(e.to_string()))?
            }
        };

        info!(tenant = %tenant, "Authorized with one-time code");
        Ok(Authorized { tenant, session })
    }

    async fn await_code(
        &self,
        challenge: &Challenge,
        codes: &dyn CodeProvider,
        cancel: &CancellationToken,
    ) -> Result<String, String> {
        let prompt = CodePrompt {
            username: challenge.username.clone(),
            hint: challenge.hint.clone(),
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err("cancelled while waiting for the one-time code".to_string()),
            reply = tokio::time::timeout(self.code_timeout, codes.request_code(prompt)) => match reply {
                Err(_) => Err(format!(
                    "no one-time code within {}s",
                    self.code_timeout.as_secs()
                )),
                Ok(Err(e)) => Err(e.to_string()),
                Ok(Ok(code)) => {
                    let code = code.trim();
                    if code.is_empty() {
                        Err("empty one-time code".to_string())
                    } else {
                        Ok(code.to_string())
                    }
                }
            },
        }
    }
}
