//! Final outcome of a run.

use super::config::FailurePolicy;
use crate::dispatch::{RunSummary, TileFailure};

/// Overall result of a run, before the failure policy is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// Every tile was written.
    Success,
    /// Every tile was attempted but some failed.
    PartialFailure,
    /// Some tiles were never attempted (cancelled, or every worker was lost).
    Incomplete,
}

/// A finished run and the policy it is judged by.
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    summary: RunSummary,
    policy: FailurePolicy,
}

impl RunReport {
    pub fn new(summary: RunSummary, policy: FailurePolicy) -> Self {
        Self { summary, policy }
    }

    pub fn summary(&self) -> &RunSummary {
        &self.summary
    }

    pub fn policy(&self) -> FailurePolicy {
        self.policy
    }

    pub fn failures(&self) -> &[TileFailure] {
        &self.summary.failures
    }

    pub fn status(&self) -> RunStatus {
        if !self.summary.is_exhaustive() {
            RunStatus::Incomplete
        } else if self.summary.failed() > 0 {
            RunStatus::PartialFailure
        } else {
            RunStatus::Success
        }
    }

    /// Whether the run succeeded under its failure policy.
    ///
    /// Incomplete runs never succeed.
    pub fn is_successful(&self) -> bool {
        match self.status() {
            RunStatus::Success => true,
            RunStatus::PartialFailure => self.policy.allows_failures(),
            RunStatus::Incomplete => false,
        }
    }
}
