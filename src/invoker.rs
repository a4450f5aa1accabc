//! Execution of one resolved method against one invocation event.

use std::borrow::Cow;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use base64::Engine;
use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig, STANDARD_NO_PAD};
use base64::engine::DecodePaddingMode;
use futures::FutureExt;
use http::StatusCode;
use tonic::Code;
use tracing::{debug, error};

use crate::context::{CallContext, InvocationContext};
use crate::envelope::{InboundEnvelope, OutboundEnvelope};
use crate::error::GatewayError;
use crate::method::{DispatchMode, ErasedMethod, Failure, MethodDescriptor};
use crate::router::FailureStatus;

/// Standard alphabet, padding optional: hosts and clients routinely strip `=`.
const BODY_DECODER: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Runs one method of a registered service.
///
/// A server-streaming method answers with its first message only and the
/// response carries `102 Processing` instead of `200 OK`, telling the caller
/// the stream was cut short. A single invocation has exactly one response
/// body, so the rest of the stream is never produced.
#[derive(Clone)]
pub struct MethodInvoker {
    service: String,
    descriptor: MethodDescriptor,
    method: Option<Arc<dyn ErasedMethod>>,
    failure_status: FailureStatus,
}

impl fmt::Debug for MethodInvoker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodInvoker")
            .field("service", &self.service)
            .field("descriptor", &self.descriptor)
            .field("bound", &self.method.is_some())
            .field("failure_status", &self.failure_status)
            .finish()
    }
}

impl MethodInvoker {
    pub(crate) fn new(
        service: impl Into<String>,
        descriptor: MethodDescriptor,
        method: Option<Arc<dyn ErasedMethod>>,
        failure_status: FailureStatus,
    ) -> Self {
        Self {
            service: service.into(),
            descriptor,
            method,
            failure_status,
        }
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    pub fn descriptor(&self) -> &MethodDescriptor {
        &self.descriptor
    }

    pub fn dispatch_mode(&self) -> DispatchMode {
        self.descriptor.dispatch_mode()
    }

    /// Decode the request, run the handler and build the response.
    ///
    /// Decode and handler failures become a plain-text response body. Only
    /// client-streaming methods and unmappable status codes are returned as
    /// errors.
    pub async fn invoke(
        &self,
        envelope: &InboundEnvelope,
        invocation: &InvocationContext,
    ) -> Result<OutboundEnvelope, GatewayError> {
        let ctx = CallContext::new(envelope, invocation);
        let mode = self.dispatch_mode();

        let method = match &self.method {
            Some(method) if mode.is_executable() => Arc::clone(method),
            _ => {
                return Err(GatewayError::UnsupportedMethodType {
                    method: self.descriptor.name.clone(),
                    mode,
                });
            }
        };

        debug!(
            request_id = %ctx.request_id(),
            service = %self.service,
            method = %self.descriptor.name,
            mode = %mode,
            "Invoking method"
        );

        let mut outbound = OutboundEnvelope::default();

        match execute(method.as_ref(), envelope, ctx.clone()).await {
            Ok(Some(message)) => outbound.set_encoded_body(STANDARD_NO_PAD.encode(message)),
            Ok(None) => outbound.set_text_body(String::new()),
            Err(failure) => {
                error!(
                    request_id = %ctx.request_id(),
                    service = %self.service,
                    method = %self.descriptor.name,
                    error = %failure,
                    details = ?failure,
                    "Method invocation failed"
                );
                outbound.set_text_body(failure.to_string());
                self.apply_failure_status(&ctx, &failure);
            }
        }

        ctx.finalize(&mut outbound)?;

        if mode == DispatchMode::UnaryStream && ctx.code() == Code::Ok {
            outbound.status_code = StatusCode::PROCESSING.as_u16();
        }

        Ok(outbound)
    }

    fn apply_failure_status(&self, ctx: &CallContext, failure: &Failure) {
        if ctx.code() != Code::Ok {
            return;
        }

        match self.failure_status {
            FailureStatus::Preserve => {}
            FailureStatus::Internal => ctx.set_code(Code::Internal),
            FailureStatus::FromError => ctx.set_code(failure.code()),
        }
    }
}

async fn execute(
    method: &dyn ErasedMethod,
    envelope: &InboundEnvelope,
    ctx: CallContext,
) -> Result<Option<Vec<u8>>, Failure> {
    let body = decode_body(envelope)?;

    // A panic becomes a captured failure so finalize and callbacks still run.
    AssertUnwindSafe(async move { method.call(&body, ctx).await })
        .catch_unwind()
        .await
        .unwrap_or_else(|payload| Err(Failure::from_panic(payload)))
}

fn decode_body(envelope: &InboundEnvelope) -> Result<Cow<'_, [u8]>, Failure> {
    let raw = envelope
        .body
        .as_ref()
        .map(|body| body.as_bytes())
        .unwrap_or_default();

    if envelope.is_base64_encoded {
        Ok(Cow::Owned(BODY_DECODER.decode(raw)?))
    } else {
        Ok(Cow::Borrowed(raw))
    }
}
