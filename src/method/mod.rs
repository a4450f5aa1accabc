//! Static description of RPC methods and how they are dispatched.

mod handler;

use std::fmt;

pub(crate) use handler::{ErasedMethod, Failure, ServerStreamingMethod, UnaryMethod};

/// The four shapes a method can take.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DispatchMode {
    UnaryUnary,
    UnaryStream,
    StreamUnary,
    StreamStream,
}

impl DispatchMode {
    /// Whether a single request/response invocation can run this mode.
    pub fn is_executable(self) -> bool {
        matches!(self, DispatchMode::UnaryUnary | DispatchMode::UnaryStream)
    }
}

impl fmt::Display for DispatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DispatchMode::UnaryUnary => "unary-unary",
            DispatchMode::UnaryStream => "unary-stream",
            DispatchMode::StreamUnary => "stream-unary",
            DispatchMode::StreamStream => "stream-stream",
        };
        f.write_str(name)
    }
}

/// Description of one method of a service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodDescriptor {
    pub name: String,
    pub client_streaming: bool,
    pub server_streaming: bool,
    /// Rust type name of the request message.
    pub input_type: &'static str,
}

impl MethodDescriptor {
    pub fn new<Req>(name: impl Into<String>, client_streaming: bool, server_streaming: bool) -> Self {
        Self {
            name: name.into(),
            client_streaming,
            server_streaming,
            input_type: std::any::type_name::<Req>(),
        }
    }

    pub fn dispatch_mode(&self) -> DispatchMode {
        match (self.client_streaming, self.server_streaming) {
            (true, true) => DispatchMode::StreamStream,
            (true, false) => DispatchMode::StreamUnary,
            (false, true) => DispatchMode::UnaryStream,
            (false, false) => DispatchMode::UnaryUnary,
        }
    }
}
