//! CredentialRotation: tries each configured API key until one answers.
//!
//! A request tries the key at the current rotation index first.  Each
//! failure advances the index (wrapping), and the request gives up after
//! every key has been tried once.  The final failed attempt does not advance,
//! so an exhausted request leaves the index on the last key it tried.  The
//! index lives in this object, so the key that last succeeded is the first
//! one tried by the next request.
//!
//! # Architecture
//!
//! The HTTP call itself sits behind the [`InferenceProvider`] trait; the
//! Gemini adapter lives in `infrastructure::inference`.  Tests inject a
//! scripted provider and count attempts.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use glint_core::domain::lifecycle::{CREDENTIALS_EXHAUSTED_MESSAGE, EMPTY_RESPONSE_MESSAGE};
use glint_core::InferenceOutcome;
use thiserror::Error;

use crate::application::run_request::EncodedImage;

/// Error type for a single inference attempt.
#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("model endpoint returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed model response: {0}")]
    MalformedResponse(String),
}

/// One API key.  `Debug` never prints the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Credential(****{})", self.0.len())
    }
}

/// A multimodal model that answers questions about a screenshot.
#[async_trait]
pub trait InferenceProvider: Send + Sync {
    /// Sends one request with `credential`.  `prior` holds earlier answers,
    /// oldest first, for the reference block.
    async fn infer(
        &self,
        credential: &Credential,
        image: &EncodedImage,
        prior: &[String],
    ) -> Result<String, InferenceError>;
}

pub struct CredentialRotation {
    provider: Arc<dyn InferenceProvider>,
    credentials: Vec<Credential>,
    current: AtomicUsize,
}

impl CredentialRotation {
    pub fn new(provider: Arc<dyn InferenceProvider>, credentials: Vec<Credential>) -> Self {
        Self {
            provider,
            credentials,
            current: AtomicUsize::new(0),
        }
    }

    pub fn credential_count(&self) -> usize {
        self.credentials.len()
    }

    /// Index of the key the next request will try first.
    pub fn current_index(&self) -> usize {
        self.current.load(Ordering::Acquire)
    }

    /// Runs one inference, rotating through keys on failure.
    ///
    /// Never returns an error: exhaustion and empty answers become
    /// [`InferenceOutcome::Failed`] with the user-visible message.
    pub async fn infer(&self, image: &EncodedImage, prior: &[String]) -> InferenceOutcome {
        let count = self.credentials.len();
        if count == 0 {
            tracing::error!("no API keys configured");
            return InferenceOutcome::Failed(CREDENTIALS_EXHAUSTED_MESSAGE.to_string());
        }

        for attempt in 1..=count {
            let index = self.current.load(Ordering::Acquire) % count;
            match self
                .provider
                .infer(&self.credentials[index], image, prior)
                .await
            {
                Ok(text) => {
                    let answer = text.trim();
                    if answer.is_empty() {
                        tracing::warn!(key_index = index, "model returned an empty answer");
                        return InferenceOutcome::Failed(EMPTY_RESPONSE_MESSAGE.to_string());
                    }
                    tracing::debug!(key_index = index, attempt, "inference succeeded");
                    return InferenceOutcome::Answer(answer.to_string());
                }
                Err(e) if attempt < count => {
                    tracing::warn!(key_index = index, attempt, error = %e, "API key failed, rotating");
                    self.current.store((index + 1) % count, Ordering::Release);
                }
                Err(e) => {
                    tracing::warn!(key_index = index, attempt, error = %e, "API key failed");
                }
            }
        }

        tracing::error!(attempts = count, "all API keys failed");
        InferenceOutcome::Failed(CREDENTIALS_EXHAUSTED_MESSAGE.to_string())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
