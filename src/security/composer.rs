//! Attaches the configured mechanisms to each request's security context.

use std::sync::Arc;

use crate::error::GatewayResult;
use crate::pipeline::{Exchange, Outcome, PipelineHandler};
use crate::security::AuthMechanism;

/// Pipeline stage that hands the ordered mechanism list to the security
/// context. A no-op for exchanges without a context.
#[derive(Debug, Clone)]
pub struct MechanismComposer {
    mechanisms: Arc<[Arc<dyn AuthMechanism>]>,
}

impl MechanismComposer {
    pub fn new(mechanisms: Vec<Arc<dyn AuthMechanism>>) -> Self {
        Self {
            mechanisms: mechanisms.into(),
        }
    }

    pub fn mechanisms(&self) -> &[Arc<dyn AuthMechanism>] {
        &self.mechanisms
    }
}

impl PipelineHandler for MechanismComposer {
    fn name(&self) -> &'static str {
        "mechanism-composer"
    }

    fn process(&self, exchange: &mut Exchange) -> GatewayResult<Outcome> {
        if let Some(ctx) = exchange.security_context_mut() {
            ctx.attach_mechanisms(&self.mechanisms);
        }
        Ok(Outcome::Continue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::security::{AuthOutcome, SecurityContext};
    use axum::http::{HeaderMap, Method};

    #[derive(Debug)]
    struct Named(&'static str);

    impl AuthMechanism for Named {
        fn name(&self) -> &str {
            self.0
        }

        fn authenticate(&self, _exchange: &Exchange) -> AuthOutcome {
            AuthOutcome::NotAttempted
        }
    }

    fn composer() -> MechanismComposer {
        MechanismComposer::new(vec![
            Arc::new(Named("first")),
            Arc::new(Named("second")),
            Arc::new(Named("third")),
        ])
    }

    #[test]
    fn test_attaches_in_order() {
        let composer = composer();
        let mut ex = Exchange::new(Method::GET, "/".parse().unwrap(), HeaderMap::new())
            .with_security_context(SecurityContext::new());

        assert_eq!(composer.process(&mut ex).unwrap(), Outcome::Continue);

        let names: Vec<&str> = ex
            .security_context()
            .unwrap()
            .mechanisms()
            .iter()
            .map(|m| m.name())
            .collect();
        assert_eq!(names, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_no_context_is_noop() {
        let composer = composer();
        let mut ex = Exchange::new(Method::GET, "/".parse().unwrap(), HeaderMap::new());

        assert_eq!(composer.process(&mut ex).unwrap(), Outcome::Continue);
        assert!(ex.security_context().is_none());
        assert!(!ex.is_complete());
    }

    #[test]
    fn test_list_not_mutated_by_requests() {
        let composer = composer();
        for _ in 0..3 {
            let mut ex = Exchange::new(Method::GET, "/".parse().unwrap(), HeaderMap::new())
                .with_security_context(SecurityContext::new());
            composer.process(&mut ex).unwrap();
            assert_eq!(ex.security_context().unwrap().mechanisms().len(), 3);
        }
        assert_eq!(composer.mechanisms().len(), 3);
    }
}
