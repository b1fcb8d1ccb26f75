//! Consistency audits run between refinement passes.
//!
//! Audits are compiled into debug builds, and into release builds with the
//! `check-invariants` feature. A failed audit is a bug in the engine, not in
//! the input, so it panics instead of returning an error.

use crate::mesh_error::MeshRefineError;

/// `true` when audits run in this build.
pub const AUDITS_ENABLED: bool = cfg!(any(debug_assertions, feature = "check-invariants"));

/// A structure that can audit its own bookkeeping.
pub trait DebugInvariants {
    /// Panics on a failed audit when [`AUDITS_ENABLED`]; otherwise a no-op.
    fn debug_assert_invariants(&self);
    /// Runs the full audit and reports the first violation.
    fn validate_invariants(&self) -> Result<(), MeshRefineError>;
}

/// Runs `$audit` (a `Result`) when audits are enabled and panics with the
/// audited structure's name `$subject` on `Err`.
#[macro_export]
macro_rules! debug_invariants {
    ($audit:expr, $subject:expr) => {
        if $crate::debug_invariants::AUDITS_ENABLED {
            if let Err(violation) = $audit {
                panic!("{} failed its audit: {}", $subject, violation);
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Ledger {
        balance: i64,
    }

    impl DebugInvariants for Ledger {
        fn debug_assert_invariants(&self) {
            crate::debug_invariants!(self.validate_invariants(), "Ledger");
        }

        fn validate_invariants(&self) -> Result<(), MeshRefineError> {
            if self.balance < 0 {
                return Err(MeshRefineError::Io(format!("balance {}", self.balance)));
            }
            Ok(())
        }
    }

    #[test]
    fn passing_audit_is_silent() {
        Ledger { balance: 3 }.debug_assert_invariants();
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "Ledger failed its audit")]
    fn failing_audit_panics_in_debug_builds() {
        Ledger { balance: -1 }.debug_assert_invariants();
    }
}
