//! Routing of request paths to registered service methods.
//!
//! A request path has the form `[/{prefix}]/{package}.{Service}/{Method}`.
//! The router is filled once during start-up and only read afterwards, so it
//! can be shared behind an `Arc` by concurrent invocations.

mod config;
mod path;

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info};

use crate::envelope::InboundEnvelope;
use crate::error::GatewayError;
use crate::invoker::MethodInvoker;
use crate::service::{GrpcService, ServiceDefinition, ServiceRegistry};

pub use config::{FailureStatus, RouterConfig};
pub use path::RequestPath;

/// Maps `package.Service` names to their registries.
#[derive(Debug, Default)]
pub struct Router {
    services: HashMap<String, ServiceRegistry>,
    // normalized, longest first
    path_prefixes: Vec<String>,
    config: RouterConfig,
}

impl Router {
    /// Create an empty router.
    pub fn new(config: RouterConfig) -> Self {
        let mut router = Self {
            services: HashMap::new(),
            path_prefixes: Vec::new(),
            config,
        };
        let prefixes = router.config.path_prefixes.clone();
        router.add_prefixes(prefixes);
        router
    }

    /// Register a service.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::ServiceAlreadyRegistered`] if a service with the
    /// same full name is already registered, or
    /// [`GatewayError::DuplicateMethod`] if the definition repeats a method.
    pub fn register(
        &mut self,
        definition: ServiceDefinition,
    ) -> Result<&ServiceRegistry, GatewayError> {
        self.register_with_prefixes(definition, std::iter::empty::<&str>())
    }

    /// Register a service and the path prefixes to strip from later lookups.
    ///
    /// Prefixes are trimmed of leading and trailing `/` and apply to every
    /// lookup on this router, not only to this service.
    ///
    /// # Example
    /// ```ignore
    /// router.register_with_prefixes(greeter_definition, ["api"])?;
    /// // "/api/pkg.Greeter/SayHello" now resolves like "/pkg.Greeter/SayHello"
    /// ```
    pub fn register_with_prefixes<I, P>(
        &mut self,
        definition: ServiceDefinition,
        prefixes: I,
    ) -> Result<&ServiceRegistry, GatewayError>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<str>,
    {
        let full_name = definition.full_name().to_string();
        if self.services.contains_key(&full_name) {
            return Err(GatewayError::ServiceAlreadyRegistered(full_name));
        }

        let registry = ServiceRegistry::new(definition, self.config.failure_status)?;
        self.add_prefixes(prefixes);

        info!(
            service = %full_name,
            methods = registry.len(),
            "Registered gRPC service"
        );

        Ok(&*self.services.entry(full_name).or_insert(registry))
    }

    /// Register a service type that describes itself.
    pub fn register_service<S: GrpcService>(
        &mut self,
        service: Arc<S>,
    ) -> Result<&ServiceRegistry, GatewayError> {
        self.register(service.definition())
    }

    fn add_prefixes<I, P>(&mut self, prefixes: I)
    where
        I: IntoIterator<Item = P>,
        P: AsRef<str>,
    {
        for prefix in prefixes {
            let prefix = path::normalize_prefix(prefix.as_ref());
            if prefix.is_empty() || self.path_prefixes.iter().any(|known| known == prefix) {
                continue;
            }
            debug!(prefix = %prefix, "Added path prefix");
            self.path_prefixes.push(prefix.to_string());
        }

        self.path_prefixes
            .sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
    }

    /// Resolve the method addressed by the envelope's path.
    pub fn resolve(&self, envelope: &InboundEnvelope) -> Result<&MethodInvoker, GatewayError> {
        self.resolve_path(&envelope.path)
    }

    /// Resolve the method addressed by `path`.
    ///
    /// # Errors
    ///
    /// [`GatewayError::MalformedPath`] unless the path (minus a known prefix)
    /// is exactly `service/method`, then [`GatewayError::ServiceNotFound`] or
    /// [`GatewayError::MethodNotFound`].
    pub fn resolve_path(&self, path: &str) -> Result<&MethodInvoker, GatewayError> {
        let request_path = RequestPath::parse(path, &self.path_prefixes)?;

        let registry = self
            .services
            .get(request_path.service)
            .ok_or_else(|| GatewayError::ServiceNotFound(request_path.service.to_string()))?;

        registry.resolve(request_path.method)
    }

    pub fn service(&self, full_name: &str) -> Option<&ServiceRegistry> {
        self.services.get(full_name)
    }

    pub fn path_prefixes(&self) -> &[String] {
        &self.path_prefixes
    }
}
