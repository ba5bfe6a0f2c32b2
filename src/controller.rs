//! Wizard navigation controller.
//!
//! Owns the single live `WizardState`, issues exactly one request per
//! navigation action, and rebuilds the state from every server response. The
//! server decides resulting positions for relative navigation; the client
//! never does step math except for `step_back`'s target computation.

use std::sync::Arc;

use serde_json::Value;

use crate::codec;
use crate::error::{FormatError, TransportError, WizardError, WizardResult};
use crate::state::{CurrentPosition, WizardPayload, WizardState};
use crate::transport::{FormPayload, TransportResult, WizardTransport};

/// Collaborator that performs the page redirect once the wizard commits.
pub trait WizardNavigator: Send + Sync {
    fn redirect(&self, next_url: &str);
}

impl<N: WizardNavigator + ?Sized> WizardNavigator for Arc<N> {
    fn redirect(&self, next_url: &str) {
        (**self).redirect(next_url)
    }
}

/// Client-side wizard session.
///
/// Operations take `&mut self`, so one controller cannot have two requests
/// in flight — the serialization the flow model asks for comes from the
/// borrow checker, not from an internal queue.
pub struct WizardController<T, N> {
    transport: T,
    navigator: N,
    state: Option<WizardState>,
    error: bool,
}

impl<T: WizardTransport, N: WizardNavigator> WizardController<T, N> {
    pub fn new(transport: T, navigator: N) -> Self {
        Self {
            transport,
            navigator,
            state: None,
            error: false,
        }
    }

    /// Last applied state; `None` before the first successful load.
    pub fn state(&self) -> Option<&WizardState> {
        self.state.as_ref()
    }

    /// Transient failure flag. Set when a request fails, cleared when the
    /// next successful response is applied.
    pub fn error(&self) -> bool {
        self.error
    }

    /// Fetch the current wizard data. Initial load and generic re-sync.
    pub async fn refresh(&mut self) -> WizardResult<()> {
        let reply = self.transport.get_json("data").await;
        self.apply(reply).await
    }

    /// Relative navigation; the server decides the resulting position.
    pub async fn go_previous(&mut self) -> WizardResult<()> {
        let reply = self.transport.post_json("prev", None).await;
        self.apply(reply).await
    }

    /// Relative navigation; the server decides the resulting position.
    pub async fn go_next(&mut self) -> WizardResult<()> {
        let reply = self.transport.post_json("next", None).await;
        self.apply(reply).await
    }

    /// Absolute navigation to an explicitly encoded target.
    pub async fn go_to(&mut self, step: &str, sub_step: Option<&str>) -> WizardResult<()> {
        let path = format!("goto/{}", codec::encode_identifier(step, sub_step));
        let reply = self.transport.post_json(&path, None).await;
        self.apply(reply).await
    }

    /// Submit the active step's form payload.
    ///
    /// Unlike every other operation, a failure reply is not opaque: the
    /// server returns wizard state plus validation errors in the failure
    /// body, which replaces the owned state before the error is returned.
    pub async fn submit_step(&mut self, payload: &FormPayload) -> WizardResult<()> {
        let Some(state) = &self.state else {
            return Err(WizardError::NoState);
        };
        let path = state.current.full_step.clone();

        let reply = self.transport.post_json(&path, Some(payload)).await;
        match reply {
            Ok(body) => {
                self.error = false;
                self.handle_new_data(body).await
            }
            Err(TransportError::Status {
                status,
                body: Some(body),
                ..
            }) => {
                self.error = true;
                tracing::debug!(status, "step submission rejected, applying feedback");
                self.handle_new_data(body).await?;
                Err(WizardError::Validation { status })
            }
            Err(err) => {
                self.error = true;
                tracing::warn!(error = %err, "step submission failed without feedback");
                Err(err.into())
            }
        }
    }

    /// Navigate to the previous step's last sub-step, computed from the
    /// current structure. A no-op returning `Ok(false)` when the current
    /// step is already the first one (or nothing is loaded yet).
    pub async fn step_back(&mut self) -> WizardResult<bool> {
        let Some(state) = &self.state else {
            return Ok(false);
        };
        let Some(index) = state.current_step_index() else {
            return Ok(false);
        };
        if index == 0 {
            return Ok(false);
        }
        let Some(previous) = state.structure.step_by_index(index - 1) else {
            return Ok(false);
        };
        let previous = previous.to_string();
        let sub_step = state.structure.last_sub_step(&previous).map(str::to_string);

        self.go_to(&previous, sub_step.as_deref()).await?;
        Ok(true)
    }

    /// Reposition between already-fetched sub-steps without a round trip.
    /// `step` defaults to the current step. Returns `false` when the target
    /// does not resolve against the loaded structure.
    pub fn edit_step_locally(&mut self, sub_step: &str, step: Option<&str>) -> bool {
        let Some(state) = self.state.as_mut() else {
            return false;
        };
        let step = step.unwrap_or(state.current.step.as_str()).to_string();
        if state.structure.sub_step_index(&step, sub_step).is_none() {
            return false;
        }
        state.current = CurrentPosition::new(&step, Some(sub_step));
        true
    }

    async fn apply(&mut self, reply: TransportResult) -> WizardResult<()> {
        match reply {
            Ok(body) => {
                self.error = false;
                self.handle_new_data(body).await
            }
            Err(err) => {
                self.error = true;
                tracing::warn!(error = %err, "wizard request failed, keeping previous state");
                Err(err.into())
            }
        }
    }

    /// Normalize a raw response and either store it or, for a finished and
    /// valid flow, run the completion transition instead of exposing it.
    async fn handle_new_data(&mut self, body: Value) -> WizardResult<()> {
        let payload: WizardPayload =
            serde_json::from_value(body).map_err(|e| FormatError::Payload {
                message: e.to_string(),
            })?;
        let candidate = codec::normalize(&payload)?;

        if candidate.done && candidate.valid {
            return self.handle_done().await;
        }

        tracing::debug!(current = %candidate.current.full_step, "applying wizard state");
        self.state = Some(candidate);
        Ok(())
    }

    /// Completion transition: commit, then hand the redirect target to the
    /// navigation collaborator. No retry on failure.
    async fn handle_done(&mut self) -> WizardResult<()> {
        let reply = self.transport.post_json("commit", None).await;
        match reply {
            Ok(body) => {
                let next_url = body.get("next_url").and_then(Value::as_str).ok_or_else(|| {
                    FormatError::MissingField {
                        field: "next_url".to_string(),
                    }
                })?;
                tracing::debug!(next_url = %next_url, "wizard committed");
                self.navigator.redirect(next_url);
                Ok(())
            }
            Err(err) => {
                self.error = true;
                tracing::error!(error = %err, "wizard commit failed");
                Err(err.into())
            }
        }
    }
}
