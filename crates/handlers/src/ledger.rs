//! Balance ledger algorithm.
//!
//! One algorithm shared by both balance families (fungible and
//! semi-fungible); the families differ only in key shape, which the
//! calling handler owns. All arithmetic is exact U256 add/subtract.

use custodia_core::models::U256;

/// Outcome of applying an outflow against the currently recorded balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutflowOutcome {
    /// No balance record exists for the key - an outflow with no prior
    /// recorded inflow. Inconsistent state: log and skip the decrement.
    Missing,
    /// The decrement would take the balance below zero. Inconsistent
    /// state: log and skip, leaving the recorded balance unchanged.
    Underflow {
        /// The balance on record at the time of the attempt.
        balance: U256,
    },
    /// The decrement lands exactly on zero: delete the record.
    Pruned,
    /// The decrement leaves a positive remainder: persist it.
    Reduced(U256),
}

/// Apply an inflow: accumulate onto the recorded balance, or start a
/// fresh one.
pub fn accumulate(current: Option<U256>, amount: U256) -> U256 {
    current.unwrap_or_default() + amount
}

/// Apply an outflow against the recorded balance.
///
/// A balance can never go negative: a decrement past zero reports
/// [`OutflowOutcome::Underflow`] instead of mutating anything.
pub fn apply_outflow(current: Option<U256>, amount: U256) -> OutflowOutcome {
    match current {
        None => OutflowOutcome::Missing,
        Some(balance) => match balance.checked_sub(amount) {
            None => OutflowOutcome::Underflow { balance },
            Some(rest) if rest.is_zero() => OutflowOutcome::Pruned,
            Some(rest) => OutflowOutcome::Reduced(rest),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn u(n: u64) -> U256 {
        U256::from(n)
    }

    #[test]
    fn accumulate_starts_fresh() {
        assert_eq!(accumulate(None, u(7)), u(7));
    }

    #[test]
    fn accumulate_adds_to_existing() {
        assert_eq!(accumulate(Some(u(10)), u(5)), u(15));
    }

    #[test]
    fn accumulate_is_exact_at_scale() {
        // Pas d'arrondi: arithmétique entière exacte sur 256 bits
        let huge = U256::from(u128::MAX);
        assert_eq!(accumulate(Some(huge), huge), huge * 2u64);
    }

    #[test]
    fn outflow_missing_record() {
        assert_eq!(apply_outflow(None, u(1)), OutflowOutcome::Missing);
    }

    // Test critique: un débit au-delà du solde ne mute jamais l'état
    #[test]
    fn outflow_underflow_reports_recorded_balance() {
        assert_eq!(
            apply_outflow(Some(u(3)), u(5)),
            OutflowOutcome::Underflow { balance: u(3) }
        );
    }

    #[test]
    fn outflow_to_exactly_zero_prunes() {
        assert_eq!(apply_outflow(Some(u(5)), u(5)), OutflowOutcome::Pruned);
    }

    #[test]
    fn outflow_partial_reduces() {
        assert_eq!(apply_outflow(Some(u(5)), u(2)), OutflowOutcome::Reduced(u(3)));
    }
}
