//! Run-scoped spend tracking against a USD ceiling.
//!
//! `BudgetGuard` provides atomic cost accounting with a configurable
//! ceiling. Costs are stored as integer micro-USD so concurrent
//! `fetch_add` stays exact; it detects the 80% warning crossing (emitted
//! exactly once even under concurrent access) and exhaustion. Admission
//! is checked before dispatch only: a running step is never interrupted
//! for budget reasons, so the final spend may exceed the ceiling by the
//! cost of in-flight steps.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

// ---------------------------------------------------------------------------
// BudgetStatus
// ---------------------------------------------------------------------------

/// Status returned after recording a completed step's cost.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BudgetStatus {
    /// Under the warning threshold (< 80%).
    Ok,
    /// Just crossed the 80% threshold. Returned exactly once per run.
    Warning,
    /// At or over the ceiling.
    Exhausted,
}

// ---------------------------------------------------------------------------
// BudgetGuard
// ---------------------------------------------------------------------------

/// Atomic spend tracker shared across all steps of one run.
///
/// All fields use `Arc` so cloning produces a shared view of the same
/// budget. A guard without a ceiling admits everything.
#[derive(Debug, Clone)]
pub struct BudgetGuard {
    ceiling_micros: Option<u64>,
    spent_micros: Arc<AtomicU64>,
    warning_emitted: Arc<AtomicBool>,
}

impl BudgetGuard {
    /// Create a guard with the given ceiling in USD, or no ceiling.
    pub fn new(ceiling_usd: Option<f64>) -> Self {
        Self {
            ceiling_micros: ceiling_usd.map(to_micros),
            spent_micros: Arc::new(AtomicU64::new(0)),
            warning_emitted: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Whether a new step may dispatch: spend so far is strictly under
    /// the ceiling (or there is no ceiling).
    pub fn admit(&self) -> bool {
        match self.ceiling_micros {
            None => true,
            Some(ceiling) => self.spent_micros.load(Ordering::SeqCst) < ceiling,
        }
    }

    /// Atomically record a completed step's cost and return the
    /// resulting status.
    ///
    /// - `Exhausted` once the total meets or exceeds the ceiling.
    /// - `Warning` exactly once when crossing the 80% threshold.
    /// - `Ok` otherwise (always, when no ceiling is set).
    pub fn record(&self, cost_usd: f64) -> BudgetStatus {
        let cost = to_micros(cost_usd);
        let prev = self.spent_micros.fetch_add(cost, Ordering::SeqCst);
        let new_total = prev.saturating_add(cost);

        let Some(ceiling) = self.ceiling_micros else {
            return BudgetStatus::Ok;
        };

        if new_total >= ceiling {
            return BudgetStatus::Exhausted;
        }

        let threshold = ceiling / 5 * 4;
        if prev < threshold
            && new_total >= threshold
            && self
                .warning_emitted
                .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
                .is_ok()
        {
            return BudgetStatus::Warning;
        }

        BudgetStatus::Ok
    }

    /// Total recorded spend in USD.
    pub fn spent_usd(&self) -> f64 {
        self.spent_micros.load(Ordering::SeqCst) as f64 / 1_000_000.0
    }

    /// Remaining headroom in USD (saturating), if a ceiling is set.
    pub fn remaining_usd(&self) -> Option<f64> {
        self.ceiling_micros.map(|ceiling| {
            ceiling.saturating_sub(self.spent_micros.load(Ordering::SeqCst)) as f64 / 1_000_000.0
        })
    }

    /// The ceiling in USD, if one is set.
    pub fn ceiling_usd(&self) -> Option<f64> {
        self.ceiling_micros.map(|c| c as f64 / 1_000_000.0)
    }
}

fn to_micros(usd: f64) -> u64 {
    (usd.max(0.0) * 1_000_000.0).round() as u64
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admits_while_strictly_under_ceiling() {
        let budget = BudgetGuard::new(Some(5.0));
        assert!(budget.admit());
        budget.record(3.0);
        // 3.00 < 5.00, still admitted
        assert!(budget.admit());
        budget.record(1.999_999);
        assert!(budget.admit());
        budget.record(0.000_001);
        // exactly 5.00, denied
        assert!(!budget.admit());
    }

    #[test]
    fn record_reports_exhaustion() {
        let budget = BudgetGuard::new(Some(5.0));
        assert_eq!(budget.record(3.0), BudgetStatus::Ok);
        assert_eq!(budget.record(3.0), BudgetStatus::Exhausted);
        assert!(!budget.admit());
    }

    #[test]
    fn warning_fires_exactly_once_at_80_percent() {
        let budget = BudgetGuard::new(Some(10.0));
        assert_eq!(budget.record(7.5), BudgetStatus::Ok);
        assert_eq!(budget.record(0.5), BudgetStatus::Warning);
        assert_eq!(budget.record(0.5), BudgetStatus::Ok);
    }

    #[test]
    fn no_ceiling_always_admits() {
        let budget = BudgetGuard::new(None);
        assert_eq!(budget.record(1_000_000.0), BudgetStatus::Ok);
        assert!(budget.admit());
        assert!(budget.remaining_usd().is_none());
    }

    #[test]
    fn spend_accounting() {
        let budget = BudgetGuard::new(Some(2.0));
        budget.record(0.25);
        budget.record(0.50);
        assert!((budget.spent_usd() - 0.75).abs() < 1e-9);
        assert!((budget.remaining_usd().unwrap() - 1.25).abs() < 1e-9);
    }

    #[test]
    fn negative_cost_ignored() {
        let budget = BudgetGuard::new(Some(1.0));
        assert_eq!(budget.record(-3.0), BudgetStatus::Ok);
        assert_eq!(budget.spent_usd(), 0.0);
    }

    #[tokio::test]
    async fn concurrent_records_warn_at_most_once() {
        let budget = BudgetGuard::new(Some(100.0));

        let mut handles = Vec::new();
        for _ in 0..100 {
            let b = budget.clone();
            handles.push(tokio::spawn(async move { b.record(1.0) }));
        }

        let mut warnings = 0;
        for handle in handles {
            if handle.await.unwrap() == BudgetStatus::Warning {
                warnings += 1;
            }
        }
        assert!(warnings <= 1, "warning fired {warnings} times");
        assert!((budget.spent_usd() - 100.0).abs() < 1e-9);
    }
}
