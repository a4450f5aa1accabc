use std::future::Future;
use std::sync::Arc;

use futures::Stream;
use prost::Message;
use tonic::Status;

use crate::context::CallContext;
use crate::method::{ErasedMethod, MethodDescriptor, ServerStreamingMethod, UnaryMethod};

/// Implemented by service types that know how to describe and bind themselves.
pub trait GrpcService: Send + Sync + 'static {
    fn definition(self: Arc<Self>) -> ServiceDefinition;
}

pub(crate) struct MethodEntry {
    pub(crate) descriptor: MethodDescriptor,
    pub(crate) method: Option<Arc<dyn ErasedMethod>>,
}

/// A service name together with its methods and the handlers bound to them.
///
/// # Example
/// ```ignore
/// let definition = ServiceDefinition::new("pkg.Greeter")
///     .unary("SayHello", |req: HelloRequest, _ctx| async move {
///         Ok(Some(HelloReply { message: format!("Hello {}", req.name) }))
///     });
/// ```
pub struct ServiceDefinition {
    full_name: String,
    methods: Vec<MethodEntry>,
}

impl ServiceDefinition {
    /// Start a definition for the fully qualified service name (`package.Service`).
    pub fn new(full_name: impl Into<String>) -> Self {
        Self {
            full_name: full_name.into(),
            methods: Vec::new(),
        }
    }

    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    /// Bind a unary method. Returning `Ok(None)` answers with an empty body.
    pub fn unary<Req, Resp, F, Fut>(mut self, name: impl Into<String>, handler: F) -> Self
    where
        Req: Message + Default + Send + 'static,
        Resp: Message + Send + 'static,
        F: Fn(Req, CallContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Option<Resp>, Status>> + Send + 'static,
    {
        self.methods.push(MethodEntry {
            descriptor: MethodDescriptor::new::<Req>(name, false, false),
            method: Some(Arc::new(UnaryMethod::<Req, Resp>::new(handler))),
        });
        self
    }

    /// Bind a server-streaming method.
    ///
    /// The stream is pulled lazily and only its first message is answered;
    /// see [`MethodInvoker`](crate::MethodInvoker).
    pub fn server_streaming<Req, Resp, F, Fut, S>(mut self, name: impl Into<String>, handler: F) -> Self
    where
        Req: Message + Default + Send + 'static,
        Resp: Message + Send + 'static,
        F: Fn(Req, CallContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<S, Status>> + Send + 'static,
        S: Stream<Item = Result<Resp, Status>> + Send + 'static,
    {
        self.methods.push(MethodEntry {
            descriptor: MethodDescriptor::new::<Req>(name, false, true),
            method: Some(Arc::new(ServerStreamingMethod::<Req, Resp>::new(handler))),
        });
        self
    }

    /// Declare a client-streaming method. It resolves, but invoking it fails.
    pub fn client_streaming<Req>(self, name: impl Into<String>) -> Self {
        self.declare(MethodDescriptor::new::<Req>(name, true, false))
    }

    /// Declare a bidirectional-streaming method. It resolves, but invoking it fails.
    pub fn bidi_streaming<Req>(self, name: impl Into<String>) -> Self {
        self.declare(MethodDescriptor::new::<Req>(name, true, true))
    }

    fn declare(mut self, descriptor: MethodDescriptor) -> Self {
        self.methods.push(MethodEntry {
            descriptor,
            method: None,
        });
        self
    }

    pub(crate) fn into_parts(self) -> (String, Vec<MethodEntry>) {
        (self.full_name, self.methods)
    }
}
