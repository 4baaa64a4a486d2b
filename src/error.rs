//! Typed rejection reasons for plan building.
//!
//! Plan builders return these instead of panicking or threading errors
//! through control flow. Callers pattern-match and map every variant to a
//! client-visible rejection; none of them abort the process.

use thiserror::Error;

/// Why a plan could not be built from an intent.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PlanError {
    /// Target is not on a whitelist. The request names something the
    /// policy tables do not know.
    #[error("not authorized: {0}")]
    Authorization(String),

    /// Target is whitelisted but the operation is not enabled in this
    /// configuration (e.g. service start/stop without explicit opt-in).
    #[error("not permitted: {0}")]
    Permission(String),

    /// Input is malformed or outside structural limits.
    #[error("invalid request: {0}")]
    Validation(String),
}

impl PlanError {
    /// Stable machine-readable kind label for audit records and responses.
    pub fn kind(&self) -> &'static str {
        match self {
            PlanError::Authorization(_) => "authorization",
            PlanError::Permission(_) => "permission",
            PlanError::Validation(_) => "validation",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_cause() {
        let err = PlanError::Authorization("app 'slack' not in whitelist".into());
        assert_eq!(err.to_string(), "not authorized: app 'slack' not in whitelist");
    }

    #[test]
    fn kind_labels_are_stable() {
        assert_eq!(PlanError::Authorization(String::new()).kind(), "authorization");
        assert_eq!(PlanError::Permission(String::new()).kind(), "permission");
        assert_eq!(PlanError::Validation(String::new()).kind(), "validation");
    }
}
