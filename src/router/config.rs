use bon::Builder;

/// What the invoker does with the pending status code when a request fails
/// to decode or the handler returns an error.
///
/// The code is only touched while it is still `Ok`; a code the handler set
/// explicitly always wins.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailureStatus {
    /// Leave the code alone. A failing handler that never set a code answers
    /// with `200 OK` and the error text as body.
    #[default]
    Preserve,
    /// Report `Internal`.
    Internal,
    /// Use the code of the returned `Status`, `InvalidArgument` for requests
    /// that could not be decoded.
    FromError,
}

/// Configuration for the [`Router`](super::Router).
#[derive(Debug, Clone, Default, Builder)]
pub struct RouterConfig {
    /// Path prefixes stripped from every request path (e.g. "api" or
    /// "/v1/grpc/"), in addition to those given at registration.
    #[builder(default)]
    pub path_prefixes: Vec<String>,

    /// Status policy for captured failures. Defaults to [`FailureStatus::Preserve`].
    #[builder(default)]
    pub failure_status: FailureStatus,
}
