//! Service definitions and the per-service method registry.

mod definition;
mod registry;

pub use definition::{GrpcService, ServiceDefinition};
pub use registry::ServiceRegistry;
