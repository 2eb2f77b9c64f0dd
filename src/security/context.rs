//! Per-request security context.

use std::sync::Arc;

use crate::security::AuthMechanism;

/// An authenticated identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    name: String,
    roles: Vec<String>,
}

impl Principal {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            roles: Vec::new(),
        }
    }

    pub fn with_roles(mut self, roles: Vec<String>) -> Self {
        self.roles = roles;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn roles(&self) -> &[String] {
        &self.roles
    }
}

/// Holder of the authentication outcome for one request.
///
/// Holds exactly one principal or none.
#[derive(Debug, Default)]
pub struct SecurityContext {
    principal: Option<Principal>,
    authenticated_by: Option<String>,
    mechanisms: Vec<Arc<dyn AuthMechanism>>,
    failed_attempts: Vec<String>,
}

impl SecurityContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn authenticated_principal(&self) -> Option<&Principal> {
        self.principal.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.principal.is_some()
    }

    /// Name of the mechanism that produced the principal.
    pub fn authenticated_by(&self) -> Option<&str> {
        self.authenticated_by.as_deref()
    }

    /// Record a successful authentication, replacing any previous principal.
    pub fn set_authenticated(&mut self, principal: Principal, mechanism: impl Into<String>) {
        self.principal = Some(principal);
        self.authenticated_by = Some(mechanism.into());
    }

    /// Append mechanisms in the given order.
    pub fn attach_mechanisms(&mut self, mechanisms: &[Arc<dyn AuthMechanism>]) {
        self.mechanisms.extend(mechanisms.iter().cloned());
    }

    pub fn mechanisms(&self) -> &[Arc<dyn AuthMechanism>] {
        &self.mechanisms
    }

    pub fn record_failure(&mut self, mechanism: impl Into<String>) {
        self.failed_attempts.push(mechanism.into());
    }

    /// Mechanisms that were attempted and rejected the credentials.
    pub fn failed_attempts(&self) -> &[String] {
        &self.failed_attempts
    }
}
