use thiserror::Error;
use tonic::{Code, Status};

use crate::method::DispatchMode;

/// Errors that terminate a single invocation.
///
/// Failures raised while decoding a request or running a handler are not
/// represented here: those are absorbed into a normal response body by the
/// [`MethodInvoker`](crate::MethodInvoker).
#[derive(Debug, Error)]
pub enum GatewayError {
    /// A service with this full name is already registered on the router.
    #[error("service already registered: '{0}'")]
    ServiceAlreadyRegistered(String),

    /// A service definition declares the same method name twice.
    #[error("method '{method}' declared twice on service '{service}'")]
    DuplicateMethod { service: String, method: String },

    /// No service is registered under the requested name.
    #[error("service not found: '{0}'")]
    ServiceNotFound(String),

    /// The service has no method with the requested name.
    #[error("method not found: '{method}' on service '{service}'")]
    MethodNotFound { service: String, method: String },

    /// The request path does not split into a service and a method.
    #[error("malformed request path: '{0}'")]
    MalformedPath(String),

    /// The method streams client messages, which a single invocation cannot carry.
    #[error("method type not supported: '{method}' is {mode}")]
    UnsupportedMethodType { method: String, mode: DispatchMode },

    /// An RPC code with no transport status mapping.
    #[error("unknown status code: {0:?}")]
    UnmappedStatus(Code),

    /// A call-context capability that has no meaning for a single-shot invocation.
    #[error("{0} is not supported in this environment")]
    Unsupported(&'static str),

    /// The invocation event or response could not be (de)serialized.
    #[error("invalid invocation event")]
    Json(#[from] serde_json::Error),
}

impl From<GatewayError> for Status {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::ServiceNotFound(_) | GatewayError::MethodNotFound { .. } => {
                Status::not_found(err.to_string())
            }
            GatewayError::MalformedPath(_) | GatewayError::Json(_) => {
                Status::invalid_argument(err.to_string())
            }
            GatewayError::UnsupportedMethodType { .. } | GatewayError::Unsupported(_) => {
                Status::unimplemented(err.to_string())
            }
            _ => Status::internal(err.to_string()),
        }
    }
}
