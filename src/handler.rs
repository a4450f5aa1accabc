//! Entry point called once per host invocation.

use std::sync::Arc;

use tracing::{Instrument, info, info_span, warn};

use crate::context::InvocationContext;
use crate::envelope::{InboundEnvelope, OutboundEnvelope};
use crate::error::GatewayError;
use crate::router::Router;

/// Resolves each invocation event through a shared [`Router`] and runs the
/// addressed method.
///
/// # Example
/// ```ignore
/// let mut router = Router::new(RouterConfig::default());
/// router.register(greeter_definition)?;
///
/// let handler = GrpcHandler::new(Arc::new(router));
/// let response = handler.handle(&event, &InvocationContext::default()).await?;
/// ```
#[derive(Debug, Clone)]
pub struct GrpcHandler {
    router: Arc<Router>,
}

impl GrpcHandler {
    pub fn new(router: Arc<Router>) -> Self {
        Self { router }
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Handle one invocation.
    ///
    /// Routing errors and client-streaming methods are returned as errors for
    /// the host to report; everything else produces a response.
    pub async fn handle(
        &self,
        envelope: &InboundEnvelope,
        invocation: &InvocationContext,
    ) -> Result<OutboundEnvelope, GatewayError> {
        let span = info_span!(
            "invocation",
            request_id = %invocation.request_id,
            path = %envelope.path
        );

        async {
            let invoker = self.router.resolve(envelope).inspect_err(|e| {
                warn!(error = %e, "Failed to resolve method");
            })?;

            let outbound = invoker.invoke(envelope, invocation).await?;

            info!(
                status_code = outbound.status_code,
                encoded = outbound.is_base64_encoded,
                "Invocation complete"
            );
            Ok::<_, GatewayError>(outbound)
        }
        .instrument(span)
        .await
    }

    /// Handle an invocation given as proxy-event JSON, returning response JSON.
    pub async fn handle_json(
        &self,
        event: &str,
        invocation: &InvocationContext,
    ) -> Result<String, GatewayError> {
        let envelope: InboundEnvelope = serde_json::from_str(event)?;
        let outbound = self.handle(&envelope, invocation).await?;
        Ok(serde_json::to_string(&outbound)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::CallContext;
    use crate::router::{FailureStatus, RouterConfig};
    use crate::service::ServiceDefinition;
    use crate::test_util::{HelloReply, HelloRequest};
    use base64::Engine;
    use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD};
    use prost::Message;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tonic::Status;

    fn greeter(produced: Arc<AtomicUsize>) -> ServiceDefinition {
        ServiceDefinition::new("pkg.Greeter")
            .unary("SayHello", |req: HelloRequest, ctx: CallContext| async move {
                if req.name == "boom" {
                    return Err(Status::internal("boom"));
                }
                ctx.set_trailing_metadata(
                    [("x-greeted".to_string(), vec![req.name.clone()])].into(),
                );
                Ok(Some(HelloReply {
                    message: format!("Hello {}", req.name),
                }))
            })
            .server_streaming("SayHelloStream", move |req: HelloRequest, _ctx| {
                let produced = Arc::clone(&produced);
                async move {
                    Ok(async_stream::stream! {
                        for i in 1..=3 {
                            produced.fetch_add(1, Ordering::SeqCst);
                            yield Ok::<_, Status>(HelloReply {
                                message: format!("{} {i}", req.name),
                            });
                        }
                    })
                }
            })
            .client_streaming::<HelloRequest>("Collect")
    }

    fn handler() -> (GrpcHandler, Arc<AtomicUsize>) {
        let produced = Arc::new(AtomicUsize::new(0));
        let mut router = Router::new(RouterConfig::default());
        router
            .register_with_prefixes(greeter(Arc::clone(&produced)), ["api"])
            .unwrap();
        (GrpcHandler::new(Arc::new(router)), produced)
    }

    fn event(path: &str, name: &str) -> InboundEnvelope {
        let body = STANDARD.encode(HelloRequest { name: name.into() }.encode_to_vec());
        InboundEnvelope::new(path)
            .with_encoded_body(body)
            .with_header("content-type", "application/grpc")
    }

    fn decode_reply(outbound: &OutboundEnvelope) -> HelloReply {
        // Responses are written without padding.
        let bytes = STANDARD_NO_PAD.decode(&outbound.body).unwrap();
        HelloReply::decode(bytes.as_slice()).unwrap()
    }

    #[tokio::test]
    async fn test_unary_invocation() {
        let (handler, _) = handler();

        let outbound = handler
            .handle(&event("/pkg.Greeter/SayHello", "Ada"), &InvocationContext::default())
            .await
            .unwrap();

        assert_eq!(outbound.status_code, 200);
        assert!(outbound.is_base64_encoded);
        assert_eq!(decode_reply(&outbound).message, "Hello Ada");
        assert_eq!(
            outbound.multi_value_headers.unwrap()["x-greeted"],
            vec!["Ada"]
        );
    }

    #[test]
    fn test_handler_shares_router() {
        let (handler, _) = handler();
        let clone = handler.clone();

        assert!(std::ptr::eq(handler.router(), clone.router()));
        assert_eq!(handler.router().path_prefixes(), &["api"]);
        assert!(handler.router().service("pkg.Greeter").is_some());
    }

    #[tokio::test]
    async fn test_unary_invocation_with_prefix() {
        let (handler, _) = handler();

        let outbound = handler
            .handle(&event("/api/pkg.Greeter/SayHello", "Ada"), &InvocationContext::default())
            .await
            .unwrap();

        assert_eq!(decode_reply(&outbound).message, "Hello Ada");
    }

    #[tokio::test]
    async fn test_handler_failure_becomes_body() {
        let (handler, _) = handler();

        let outbound = handler
            .handle(&event("/pkg.Greeter/SayHello", "boom"), &InvocationContext::default())
            .await
            .unwrap();

        assert_eq!(outbound.body, "boom");
        assert!(!outbound.is_base64_encoded);
        assert_eq!(outbound.status_code, 200);
    }

    #[tokio::test]
    async fn test_unknown_service_is_an_error() {
        let (handler, _) = handler();

        let result = handler
            .handle(&event("ghost.Service/Method", "Ada"), &InvocationContext::default())
            .await;

        assert!(matches!(result, Err(GatewayError::ServiceNotFound(_))));
    }

    #[tokio::test]
    async fn test_server_streaming_answers_first_message() {
        let (handler, produced) = handler();

        let outbound = handler
            .handle(&event("/pkg.Greeter/SayHelloStream", "tick"), &InvocationContext::default())
            .await
            .unwrap();

        assert_eq!(outbound.status_code, 102);
        assert_eq!(decode_reply(&outbound).message, "tick 1");
        assert_eq!(produced.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_client_streaming_is_an_error() {
        let (handler, _) = handler();

        let result = handler
            .handle(&event("/pkg.Greeter/Collect", "Ada"), &InvocationContext::default())
            .await;

        assert!(matches!(
            result,
            Err(GatewayError::UnsupportedMethodType { .. })
        ));
    }

    #[tokio::test]
    async fn test_handle_json() {
        let (handler, _) = handler();
        let body = STANDARD.encode(HelloRequest { name: "Ada".into() }.encode_to_vec());
        let event = serde_json::json!({
            "path": "/pkg.Greeter/SayHello",
            "headers": { "content-type": "application/grpc" },
            "multiValueHeaders": null,
            "body": body,
            "isBase64Encoded": true
        });

        let response = handler
            .handle_json(&event.to_string(), &InvocationContext::default())
            .await
            .unwrap();
        let outbound: OutboundEnvelope = serde_json::from_str(&response).unwrap();

        assert_eq!(outbound.status_code, 200);
        assert_eq!(decode_reply(&outbound).message, "Hello Ada");
    }

    #[tokio::test]
    async fn test_handle_json_rejects_invalid_event() {
        let (handler, _) = handler();

        let result = handler
            .handle_json("{\"body\": 1}", &InvocationContext::default())
            .await;
        assert!(matches!(result, Err(GatewayError::Json(_))));
    }

    #[tokio::test]
    async fn test_internal_failure_policy() {
        let config = RouterConfig::builder()
            .failure_status(FailureStatus::Internal)
            .build();
        let mut router = Router::new(config);
        router
            .register(greeter(Arc::new(AtomicUsize::new(0))))
            .unwrap();
        let handler = GrpcHandler::new(Arc::new(router));

        let outbound = handler
            .handle(&event("/pkg.Greeter/SayHello", "boom"), &InvocationContext::default())
            .await
            .unwrap();

        assert_eq!(outbound.status_code, 500);
        assert_eq!(outbound.body, "boom");
    }
}
