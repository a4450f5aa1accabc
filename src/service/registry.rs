use std::collections::HashMap;
use std::collections::hash_map::Entry;

use tracing::debug;

use crate::error::GatewayError;
use crate::invoker::MethodInvoker;
use crate::router::FailureStatus;
use crate::service::ServiceDefinition;

/// The invokers of one service, keyed by method name. Read-only once built.
#[derive(Debug, Clone)]
pub struct ServiceRegistry {
    full_name: String,
    methods: HashMap<String, MethodInvoker>,
}

impl ServiceRegistry {
    /// Build one [`MethodInvoker`] per method of `definition`.
    pub fn new(
        definition: ServiceDefinition,
        failure_status: FailureStatus,
    ) -> Result<Self, GatewayError> {
        let (full_name, entries) = definition.into_parts();
        let mut methods = HashMap::with_capacity(entries.len());

        for entry in entries {
            let name = entry.descriptor.name.clone();
            match methods.entry(name) {
                Entry::Occupied(slot) => {
                    return Err(GatewayError::DuplicateMethod {
                        service: full_name,
                        method: slot.key().clone(),
                    });
                }
                Entry::Vacant(slot) => {
                    debug!(
                        service = %full_name,
                        method = %entry.descriptor.name,
                        mode = %entry.descriptor.dispatch_mode(),
                        "Bound method"
                    );
                    slot.insert(MethodInvoker::new(
                        full_name.clone(),
                        entry.descriptor,
                        entry.method,
                        failure_status,
                    ));
                }
            }
        }

        Ok(Self { full_name, methods })
    }

    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    /// Look up the invoker for `method`.
    pub fn resolve(&self, method: &str) -> Result<&MethodInvoker, GatewayError> {
        self.methods
            .get(method)
            .ok_or_else(|| GatewayError::MethodNotFound {
                service: self.full_name.clone(),
                method: method.to_string(),
            })
    }

    pub fn method_names(&self) -> impl Iterator<Item = &str> {
        self.methods.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }
}
