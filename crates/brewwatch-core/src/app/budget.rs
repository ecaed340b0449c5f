//! Failure budget: give up after N consecutive failed polls.
//!
//! A status query can fail for reasons nobody can explain locally (the retry
//! shim already absorbed the plain connection resets). Each watched task keeps
//! one budget; a successful query refills it.

/// What the caller should do after recording a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BudgetState {
    /// Keep polling.
    Continue { consecutive: u32 },

    /// Threshold reached, give up on the task.
    Exhausted { consecutive: u32 },
}

#[derive(Debug, Clone)]
pub struct FailureBudget {
    threshold: u32,
    consecutive: u32,
}

impl FailureBudget {
    /// A threshold of 0 behaves like 1: the first failure exhausts the budget.
    pub fn new(threshold: u32) -> Self {
        Self {
            threshold: threshold.max(1),
            consecutive: 0,
        }
    }

    pub fn record_success(&mut self) {
        self.consecutive = 0;
    }

    pub fn record_failure(&mut self) -> BudgetState {
        self.consecutive += 1;
        if self.consecutive >= self.threshold {
            BudgetState::Exhausted {
                consecutive: self.consecutive,
            }
        } else {
            BudgetState::Continue {
                consecutive: self.consecutive,
            }
        }
    }

    pub fn consecutive(&self) -> u32 {
        self.consecutive
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exhausted_on_tenth_consecutive_failure() {
        let mut budget = FailureBudget::new(10);
        for n in 1..10 {
            assert_eq!(
                budget.record_failure(),
                BudgetState::Continue { consecutive: n }
            );
        }
        assert_eq!(
            budget.record_failure(),
            BudgetState::Exhausted { consecutive: 10 }
        );
    }

    #[test]
    fn success_resets_the_count() {
        let mut budget = FailureBudget::new(3);
        budget.record_failure();
        budget.record_failure();
        budget.record_success();
        assert_eq!(budget.consecutive(), 0);
        assert_eq!(
            budget.record_failure(),
            BudgetState::Continue { consecutive: 1 }
        );
    }

    #[test]
    fn zero_threshold_gives_up_immediately() {
        let mut budget = FailureBudget::new(0);
        assert!(matches!(
            budget.record_failure(),
            BudgetState::Exhausted { .. }
        ));
    }
}
