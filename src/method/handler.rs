use std::any::Any;
use std::future::Future;
use std::marker::PhantomData;

use futures::future::BoxFuture;
use futures::stream::BoxStream;
use futures::{FutureExt, Stream, StreamExt};
use prost::Message;
use thiserror::Error;
use tonic::{Code, Status};

use crate::context::CallContext;

/// A request-processing failure, turned into a response body by the invoker.
#[derive(Debug, Error)]
pub(crate) enum Failure {
    #[error("{0}")]
    Body(#[from] base64::DecodeError),

    #[error("{0}")]
    Decode(#[from] prost::DecodeError),

    #[error("{}", .0.message())]
    Handler(Status),

    /// The handler panicked. Holds the panic message when it was a string.
    #[error("handler panicked")]
    Panic(Option<String>),
}

impl Failure {
    /// The RPC code that best describes this failure.
    pub(crate) fn code(&self) -> Code {
        match self {
            Failure::Body(_) | Failure::Decode(_) => Code::InvalidArgument,
            Failure::Handler(status) => status.code(),
            Failure::Panic(_) => Code::Internal,
        }
    }

    pub(crate) fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = match payload.downcast::<String>() {
            Ok(message) => Some(*message),
            Err(payload) => payload.downcast_ref::<&str>().map(|s| s.to_string()),
        };
        Failure::Panic(message)
    }
}

/// Encoded response message, or `None` when the handler produced nothing.
pub(crate) type MethodOutput = Result<Option<Vec<u8>>, Failure>;

/// Type-erased method so that methods with different message types can
/// live in the same registry.
pub(crate) trait ErasedMethod: Send + Sync {
    fn call(&self, request: &[u8], ctx: CallContext) -> BoxFuture<'static, MethodOutput>;
}

type BoxedUnary<Req, Resp> =
    Box<dyn Fn(Req, CallContext) -> BoxFuture<'static, Result<Option<Resp>, Status>> + Send + Sync>;

type BoxedServerStreaming<Req, Resp> = Box<
    dyn Fn(Req, CallContext) -> BoxFuture<'static, Result<BoxStream<'static, Result<Resp, Status>>, Status>>
        + Send
        + Sync,
>;

/// A unary handler bound to its message types.
pub(crate) struct UnaryMethod<Req, Resp> {
    handler: BoxedUnary<Req, Resp>,
    _phantom: PhantomData<fn(Req) -> Resp>,
}

impl<Req, Resp> UnaryMethod<Req, Resp>
where
    Req: Message + Default + Send + 'static,
    Resp: Message + Send + 'static,
{
    pub(crate) fn new<F, Fut>(handler: F) -> Self
    where
        F: Fn(Req, CallContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Option<Resp>, Status>> + Send + 'static,
    {
        Self {
            handler: Box::new(move |request: Req, ctx: CallContext| handler(request, ctx).boxed()),
            _phantom: PhantomData,
        }
    }
}

impl<Req, Resp> ErasedMethod for UnaryMethod<Req, Resp>
where
    Req: Message + Default + Send + 'static,
    Resp: Message + Send + 'static,
{
    fn call(&self, request: &[u8], ctx: CallContext) -> BoxFuture<'static, MethodOutput> {
        let request = match Req::decode(request) {
            Ok(request) => request,
            Err(e) => return futures::future::ready(Err(Failure::Decode(e))).boxed(),
        };

        let response = (self.handler)(request, ctx);

        async move {
            let message = response.await.map_err(Failure::Handler)?;
            Ok(message.map(|message| message.encode_to_vec()))
        }
        .boxed()
    }
}

/// A server-streaming handler bound to its message types.
///
/// Only the first message of the produced stream is ever pulled; the stream
/// is dropped right after, so later messages are never produced.
pub(crate) struct ServerStreamingMethod<Req, Resp> {
    handler: BoxedServerStreaming<Req, Resp>,
    _phantom: PhantomData<fn(Req) -> Resp>,
}

impl<Req, Resp> ServerStreamingMethod<Req, Resp>
where
    Req: Message + Default + Send + 'static,
    Resp: Message + Send + 'static,
{
    pub(crate) fn new<F, Fut, S>(handler: F) -> Self
    where
        F: Fn(Req, CallContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<S, Status>> + Send + 'static,
        S: Stream<Item = Result<Resp, Status>> + Send + 'static,
    {
        Self {
            handler: Box::new(move |request: Req, ctx: CallContext| {
                handler(request, ctx)
                    .map(|result| result.map(|stream| stream.boxed()))
                    .boxed()
            }),
            _phantom: PhantomData,
        }
    }
}

impl<Req, Resp> ErasedMethod for ServerStreamingMethod<Req, Resp>
where
    Req: Message + Default + Send + 'static,
    Resp: Message + Send + 'static,
{
    fn call(&self, request: &[u8], ctx: CallContext) -> BoxFuture<'static, MethodOutput> {
        let request = match Req::decode(request) {
            Ok(request) => request,
            Err(e) => return futures::future::ready(Err(Failure::Decode(e))).boxed(),
        };

        let stream = (self.handler)(request, ctx);

        async move {
            let mut stream = stream.await.map_err(Failure::Handler)?;
            match stream.next().await {
                Some(Ok(message)) => Ok(Some(message.encode_to_vec())),
                Some(Err(status)) => Err(Failure::Handler(status)),
                None => Ok(None),
            }
        }
        .boxed()
    }
}
