//! Run one proxy event through a demo `demo.Greeter` service.
//!
//! Reads the event JSON from the file given as first argument, or from stdin,
//! and prints the response JSON on stdout. Logs go to stderr.
//!
//! ```text
//! echo '{"path":"/demo.Greeter/SayHello","body":"CgNBZGE","isBase64Encoded":true}' | gateway
//! ```

use std::io::Read;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use anyhow::{Context, Result};
use lambda_grpc::{
    CallContext, GrpcHandler, GrpcService, InvocationContext, Router, RouterConfig,
    ServiceDefinition,
};
use tonic::{Code, Status};
use tracing::{error, info};

#[derive(Clone, PartialEq, prost::Message)]
pub struct HelloRequest {
    #[prost(string, tag = "1")]
    pub name: String,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct HelloReply {
    #[prost(string, tag = "1")]
    pub message: String,
}

struct Greeter {
    greeting: String,
}

impl Greeter {
    async fn say_hello(
        &self,
        req: HelloRequest,
        ctx: CallContext,
    ) -> Result<Option<HelloReply>, Status> {
        if req.name.is_empty() {
            ctx.abort(Code::InvalidArgument, "name must not be empty");
            return Ok(None);
        }

        let request_id = ctx.request_id().to_string();
        ctx.add_completion_callback(move || info!(request_id = %request_id, "SayHello done"));

        Ok(Some(HelloReply {
            message: format!("{} {}", self.greeting, req.name),
        }))
    }
}

impl GrpcService for Greeter {
    fn definition(self: Arc<Self>) -> ServiceDefinition {
        let unary = Arc::clone(&self);
        let streaming = Arc::clone(&self);

        ServiceDefinition::new("demo.Greeter")
            .unary("SayHello", move |req: HelloRequest, ctx| {
                let greeter = Arc::clone(&unary);
                async move { greeter.say_hello(req, ctx).await }
            })
            .server_streaming("SayHelloStream", move |req: HelloRequest, _ctx| {
                let greeter = Arc::clone(&streaming);
                async move {
                    let replies = ["", " again", " once more"].map(|suffix| {
                        Ok::<_, Status>(HelloReply {
                            message: format!("{} {}{suffix}", greeter.greeting, req.name),
                        })
                    });
                    Ok(tokio_stream::iter(replies))
                }
            })
            .client_streaming::<HelloRequest>("Collect")
    }
}

fn read_event() -> Result<String> {
    let mut event = String::new();
    match std::env::args().nth(1) {
        Some(path) => {
            event = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read event file '{path}'"))?;
        }
        None => {
            std::io::stdin()
                .read_to_string(&mut event)
                .context("failed to read event from stdin")?;
        }
    }
    Ok(event)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let config = RouterConfig::builder()
        .path_prefixes(vec!["api".to_string()])
        .build();
    let mut router = Router::new(config);
    router.register_service(Arc::new(Greeter {
        greeting: "Hello".to_string(),
    }))?;

    let handler = GrpcHandler::new(Arc::new(router));

    let event = read_event()?;
    let invocation = InvocationContext::builder()
        .deadline(SystemTime::now() + Duration::from_secs(30))
        .build();

    match handler.handle_json(&event, &invocation).await {
        Ok(response) => {
            println!("{response}");
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "Invocation failed");
            Err(e.into())
        }
    }
}
