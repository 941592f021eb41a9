use crate::error::DispatchError;

/// What `dispatch` does when a listener fails
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DispatchPolicy {
    /// Keep invoking the remaining listeners and report every failure at the end
    #[default]
    Continue,
    /// Stop at the first failure; later listeners are not invoked
    Abort,
}

/// Collects listener failures for one dispatch pass according to a [`DispatchPolicy`]
pub(crate) struct Failures {
    policy: DispatchPolicy,
    errors: Vec<DispatchError>,
}

impl Failures {
    pub fn new(policy: DispatchPolicy) -> Self { Self { policy, errors: Vec::new() } }

    /// Records a failure; under [`DispatchPolicy::Abort`] hands it straight back so the pass can stop.
    pub fn record(&mut self, err: DispatchError) -> Result<(), DispatchError> {
        tracing::warn!("listener failed during dispatch: {}", err);
        match self.policy {
            DispatchPolicy::Abort => Err(err),
            DispatchPolicy::Continue => {
                self.errors.push(err);
                Ok(())
            }
        }
    }

    pub fn finish(mut self) -> Result<(), DispatchError> {
        match self.errors.len() {
            0 => Ok(()),
            1 => Err(self.errors.remove(0)),
            _ => Err(DispatchError::Aggregate(self.errors)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::ArgumentMismatch, params};

    fn failure() -> DispatchError {
        DispatchError::Argument { callback: "cb".into(), arity: 0, source: ArgumentMismatch { expected: params![u8], supplied: 0, position: None } }
    }

    #[test]
    fn test_continue_aggregates() {
        let mut failures = Failures::new(DispatchPolicy::Continue);
        assert!(failures.record(failure()).is_ok());
        assert!(failures.record(failure()).is_ok());
        assert!(matches!(failures.finish(), Err(DispatchError::Aggregate(errors)) if errors.len() == 2));
    }

    #[test]
    fn test_single_failure_is_not_wrapped() {
        let mut failures = Failures::new(DispatchPolicy::Continue);
        failures.record(failure()).unwrap();
        assert!(matches!(failures.finish(), Err(DispatchError::Argument { .. })));
        assert!(Failures::new(DispatchPolicy::Continue).finish().is_ok());
    }

    #[test]
    fn test_abort_returns_first() {
        let mut failures = Failures::new(DispatchPolicy::Abort);
        assert!(failures.record(failure()).is_err());
    }
}
