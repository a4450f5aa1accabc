//! Per-invocation call context handed to every handler.
//!
//! [`CallContext`] mirrors the surface of a gRPC server-side call context so
//! handler code reads the same as it would behind a real gRPC server. The
//! parts of that surface that only make sense on a live connection are
//! rejected with [`GatewayError::Unsupported`].

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, SystemTime};

use bon::Builder;
use tonic::Code;
use tracing::debug;
use uuid::Uuid;

use crate::envelope::{InboundEnvelope, MultiValueMap, OutboundEnvelope};
use crate::error::GatewayError;
use crate::status::to_transport_status;

/// What the host tells us about the invocation besides the event itself.
#[derive(Debug, Clone, Builder)]
pub struct InvocationContext {
    /// Host request id, used to tag log output.
    #[builder(default = Uuid::new_v4().to_string(), into)]
    pub request_id: String,

    /// Point in time at which the host will kill the invocation.
    pub deadline: Option<SystemTime>,
}

impl Default for InvocationContext {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl InvocationContext {
    /// Build from the host's deadline expressed as milliseconds since the Unix epoch.
    pub fn from_deadline_ms(request_id: impl Into<String>, deadline_ms: u64) -> Self {
        Self::builder()
            .request_id(request_id)
            .deadline(SystemTime::UNIX_EPOCH + Duration::from_millis(deadline_ms))
            .build()
    }
}

type CompletionCallback = Box<dyn FnMut() + Send>;

struct CallState {
    code: Code,
    details: Option<String>,
    trailing_metadata: MultiValueMap,
    completion_callbacks: Vec<CompletionCallback>,
}

struct CallInner {
    request_id: String,
    client_metadata: MultiValueMap,
    deadline: Option<SystemTime>,
    state: Mutex<CallState>,
}

/// Handle to the state of one invocation.
///
/// Clones share the same state: the handler receives one handle while the
/// invoker keeps another to finalize the response.
#[derive(Clone)]
pub struct CallContext {
    inner: Arc<CallInner>,
}

impl fmt::Debug for CallContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state();
        f.debug_struct("CallContext")
            .field("request_id", &self.inner.request_id)
            .field("client_metadata", &self.inner.client_metadata)
            .field("deadline", &self.inner.deadline)
            .field("code", &state.code)
            .field("details", &state.details)
            .field("trailing_metadata", &state.trailing_metadata)
            .field("completion_callbacks", &state.completion_callbacks.len())
            .finish()
    }
}

impl CallContext {
    /// Capture the client metadata of `envelope` and start with an `Ok` outcome.
    ///
    /// Multi-valued headers are taken first; single-valued headers are merged
    /// in, adding the value when the key is new or the value is not already
    /// listed. Keys are kept as the host sent them, so `X-Id` and `x-id` are
    /// distinct entries.
    pub fn new(envelope: &InboundEnvelope, invocation: &InvocationContext) -> Self {
        let mut client_metadata = MultiValueMap::new();

        for (key, values) in envelope.multi_value_headers.iter().flatten() {
            client_metadata
                .entry(key.clone())
                .or_default()
                .extend(values.iter().cloned());
        }

        for (key, value) in envelope.headers.iter().flatten() {
            let values = client_metadata.entry(key.clone()).or_default();
            if !values.contains(value) {
                values.push(value.clone());
            }
        }

        Self {
            inner: Arc::new(CallInner {
                request_id: invocation.request_id.clone(),
                client_metadata,
                deadline: invocation.deadline,
                state: Mutex::new(CallState {
                    code: Code::Ok,
                    details: None,
                    trailing_metadata: MultiValueMap::new(),
                    completion_callbacks: Vec::new(),
                }),
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, CallState> {
        self.inner.state.lock().expect("call state lock poisoned")
    }

    pub fn request_id(&self) -> &str {
        &self.inner.request_id
    }

    /// Metadata sent by the client, keyed by header name exactly as received.
    pub fn invocation_metadata(&self) -> &MultiValueMap {
        &self.inner.client_metadata
    }

    pub fn set_code(&self, code: Code) {
        self.state().code = code;
    }

    pub fn set_details(&self, details: impl Into<String>) {
        self.state().details = Some(details.into());
    }

    /// Set the code and the details together.
    ///
    /// Unlike a live gRPC server this does not interrupt the handler; it only
    /// records the outcome written at finalize.
    pub fn abort(&self, code: Code, details: impl Into<String>) {
        let mut state = self.state();
        state.code = code;
        state.details = Some(details.into());
    }

    pub fn code(&self) -> Code {
        self.state().code
    }

    pub fn details(&self) -> Option<String> {
        self.state().details.clone()
    }

    /// Metadata sent back to the client as response headers.
    pub fn set_trailing_metadata(&self, metadata: MultiValueMap) {
        self.state().trailing_metadata = metadata;
    }

    pub fn trailing_metadata(&self) -> MultiValueMap {
        self.state().trailing_metadata.clone()
    }

    /// Time left before the host deadline, recomputed on every call.
    ///
    /// `None` when the host gave no deadline, zero once it has passed.
    pub fn remaining_time(&self) -> Option<Duration> {
        self.inner.deadline.map(|deadline| {
            deadline
                .duration_since(SystemTime::now())
                .unwrap_or(Duration::ZERO)
        })
    }

    /// Register a callback run at finalize, before the response is written.
    pub fn add_completion_callback<F>(&self, callback: F)
    where
        F: FnMut() + Send + 'static,
    {
        self.state().completion_callbacks.push(Box::new(callback));
    }

    /// Always `true`: a single invocation cannot observe the client going away.
    pub fn is_active(&self) -> bool {
        true
    }

    pub fn peer(&self) -> Result<String, GatewayError> {
        Err(GatewayError::Unsupported("peer identity"))
    }

    pub fn cancel(&self) -> Result<(), GatewayError> {
        Err(GatewayError::Unsupported("call cancellation"))
    }

    pub fn set_compression(&self, _algorithm: &str) -> Result<(), GatewayError> {
        Err(GatewayError::Unsupported("compression control"))
    }

    pub fn send_initial_metadata(&self, _metadata: MultiValueMap) -> Result<(), GatewayError> {
        Err(GatewayError::Unsupported("sending initial metadata"))
    }

    pub fn auth_context(&self) -> Result<MultiValueMap, GatewayError> {
        Err(GatewayError::Unsupported("auth context"))
    }

    /// Write the pending outcome into `outbound`.
    ///
    /// Not idempotent: every call runs all completion callbacks again and
    /// rewrites the envelope. The invoker calls it exactly once.
    pub fn finalize(&self, outbound: &mut OutboundEnvelope) -> Result<(), GatewayError> {
        // Callbacks run unlocked so they may read the context.
        let mut callbacks = std::mem::take(&mut self.state().completion_callbacks);
        for callback in callbacks.iter_mut() {
            callback();
        }
        {
            let mut state = self.state();
            callbacks.append(&mut state.completion_callbacks);
            state.completion_callbacks = callbacks;
        }

        let state = self.state();

        outbound.status_code = to_transport_status(state.code)?.as_u16();

        if let Some(details) = &state.details {
            outbound.set_text_body(details.clone());
        }

        if !state.trailing_metadata.is_empty() {
            let headers = outbound.multi_value_headers.get_or_insert_with(MultiValueMap::new);
            for (key, values) in &state.trailing_metadata {
                headers
                    .entry(key.clone())
                    .or_default()
                    .extend(values.iter().cloned());
            }
        }

        debug!(
            request_id = %self.inner.request_id,
            code = ?state.code,
            status_code = outbound.status_code,
            "Call finalized"
        );

        Ok(())
    }
}
