//! # lambda_grpc
//!
//! Serve gRPC methods from a serverless function that receives HTTP
//! proxy events.
//!
//! Each invocation carries one request message in the event body (raw or
//! base64-encoded). The path selects the method, the body is decoded into the
//! method's request type, the bound handler runs with a [`CallContext`], and
//! the result is written back as a base64-encoded proxy response.
//!
//! ```ignore
//! use lambda_grpc::{GrpcHandler, InvocationContext, Router, RouterConfig, ServiceDefinition};
//!
//! let mut router = Router::new(RouterConfig::default());
//! router.register_with_prefixes(
//!     ServiceDefinition::new("pkg.Greeter").unary("SayHello", |req: HelloRequest, ctx| async move {
//!         ctx.set_trailing_metadata([("x-greeted".into(), vec![req.name.clone()])].into());
//!         Ok(Some(HelloReply { message: format!("Hello {}", req.name) }))
//!     }),
//!     ["api"],
//! )?;
//!
//! let handler = GrpcHandler::new(Arc::new(router));
//! let response = handler.handle(&event, &InvocationContext::default()).await?;
//! ```
//!
//! ## Path Format
//!
//! `[/{prefix}]/{package}.{Service}/{Method}`, e.g. `/api/pkg.Greeter/SayHello`.
//!
//! ## Limitations
//!
//! One invocation carries one request and one response:
//! - client-streaming and bidirectional methods are rejected;
//! - server-streaming methods answer with their first message only and a
//!   `102 Processing` status;
//! - [`CallContext::is_active`] is always `true`.

mod context;
mod envelope;
mod error;
mod handler;
mod invoker;
mod method;
mod router;
mod service;
mod status;

#[cfg(test)]
mod test_util;

pub use context::{CallContext, InvocationContext};
pub use envelope::{Body, InboundEnvelope, MultiValueMap, OutboundEnvelope};
pub use error::GatewayError;
pub use handler::GrpcHandler;
pub use invoker::MethodInvoker;
pub use method::{DispatchMode, MethodDescriptor};
pub use router::{FailureStatus, RequestPath, Router, RouterConfig};
pub use service::{GrpcService, ServiceDefinition, ServiceRegistry};
pub use status::to_transport_status;
