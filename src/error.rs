//! Error taxonomy
//!
//! Only `DegenerateSeed` is fatal; the growth loop recovers from the rest.

use glam::DVec3;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimError {
    /// Descent from the seed settled in a basin that never reaches the zero set
    #[error("seed descended to a non-surface minimum at {point} (f² = {residual:e})")]
    DegenerateSeed { point: DVec3, residual: f64 },

    /// Newton-Raphson hit its iteration cap
    #[error("projection did not converge after {iterations} iterations at {point} (f = {residual:e})")]
    NonConvergence {
        point: DVec3,
        iterations: u32,
        residual: f64,
    },

    /// A direction was requested from a zero-length vector
    #[error("cannot normalize a zero-length vector")]
    DegenerateVector,

    #[error("invalid settings: {0}")]
    InvalidSettings(String),
}

impl SimError {
    /// Whether the run can continue after this error
    pub fn is_recoverable(&self) -> bool {
        matches!(self, SimError::NonConvergence { .. } | SimError::DegenerateVector)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverable_classification() {
        let seed = SimError::DegenerateSeed {
            point: DVec3::ZERO,
            residual: 0.25,
        };
        assert!(!seed.is_recoverable());
        assert!(SimError::DegenerateVector.is_recoverable());
        assert!(
            SimError::NonConvergence {
                point: DVec3::X,
                iterations: 10,
                residual: 1.0,
            }
            .is_recoverable()
        );
        assert!(!SimError::InvalidSettings("x".into()).is_recoverable());
    }

    #[test]
    fn test_messages_name_the_point() {
        let err = SimError::DegenerateSeed {
            point: DVec3::new(1.0, 2.0, 3.0),
            residual: 0.5,
        };
        let msg = err.to_string();
        assert!(msg.contains("non-surface minimum"));
        assert!(msg.contains("1, 2, 3"));
    }
}
