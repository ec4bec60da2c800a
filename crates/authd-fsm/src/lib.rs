//! The per-session authentication state machine.
//!
//! ```text
//!               ┌─────── retry ───────┐
//!               v                     │
//!   [MODE_SELECT] ─sel→ [AWAIT_INPUT] ─eval→ {granted, denied, retry, cancelled}
//!                                          │
//!                                 granted  │  current_auth_step < needed_auth_steps
//!                                          ▼
//!                                     [NEXT_STEP] ─→ back to MODE_SELECT
//!                                          │
//!                                 granted  │  current_auth_step == needed_auth_steps
//!                                          ▼
//!                                      [TERMINAL]
//! ```
//!
//! `advance` is the only entry point: it takes the [`EvalOutcome`] a
//! [`BrokerBackend`] produced and applies the step-transition rules,
//! mutating the session record in place the same way `OmsOrder::apply`
//! mutates order state in place for a single event.

use authd_schemas::AuthData;
use authd_session::{CancelHandle, SessionRecord};

/// Consecutive same-mode failures allowed before a retry is reshaped into a
/// denial. Five retries are granted; the sixth failure against the same
/// mode is the one that gets denied.
pub const MAX_ATTEMPTS: u32 = 5;

// ---------------------------------------------------------------------------
// BrokerBackend
// ---------------------------------------------------------------------------

/// The pluggable eval-policy seam: given a submitted (or wait-only)
/// credential for the session's currently-selected mode, decide the
/// outcome. The reference broker is one implementation of this trait; a
/// production broker backend would be another — the same seam
/// `BrokerAdapter` provides for broker order routing.
#[async_trait::async_trait]
pub trait BrokerBackend: Send + Sync {
    async fn evaluate(
        &self,
        session: &SessionRecord,
        mode_id: &str,
        secret: Option<String>,
        auth_data: &AuthData,
        cancel: CancelHandle,
    ) -> EvalOutcome;
}

/// The result of one evaluation attempt, before step-transition rules are
/// applied. This is *not* the final `access` token: a `Granted` at a
/// non-terminal step becomes `next`, and a `Retry` that exhausts the
/// attempt cap becomes `denied`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EvalOutcome {
    Granted,
    Denied,
    /// Credential was wrong but the mode permits another try.
    Retry,
    /// The wait was interrupted by `CancelIsAuthenticated` or `EndSession`.
    Cancelled,
}

// ---------------------------------------------------------------------------
// StepResult
// ---------------------------------------------------------------------------

/// The final shape `IsAuthenticated` reports to its caller, after step
/// transition rules have been applied to `session` in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepResult {
    /// `current_auth_step == needed_auth_steps`; this is the last step.
    Terminal,
    /// Advanced to the next step; `steps_missing` is purely informational.
    Next { steps_missing: u32 },
    Denied,
    Retry,
    Cancelled,
}

/// Apply `outcome` to `session`, mutating it in place, and return the
/// caller-facing step result.
pub fn advance(session: &mut SessionRecord, outcome: EvalOutcome) -> StepResult {
    match outcome {
        EvalOutcome::Cancelled => StepResult::Cancelled,

        EvalOutcome::Retry => {
            let mode = session.current_auth_mode.clone().unwrap_or_default();
            let count = session.attempts_per_mode.entry(mode).or_insert(0);
            *count += 1;
            if *count > MAX_ATTEMPTS {
                StepResult::Denied
            } else {
                StepResult::Retry
            }
        }

        EvalOutcome::Denied => StepResult::Denied,

        EvalOutcome::Granted => {
            if session.current_auth_step < session.needed_auth_steps {
                // Report the remaining count for the step being left, then advance.
                let steps_missing = session.needed_auth_steps - session.current_auth_step;
                session.current_auth_step += 1;
                StepResult::Next { steps_missing }
            } else {
                StepResult::Terminal
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use authd_schemas::{PasswordResetPolicy, SessionMode};

    fn session(needed_auth_steps: u32) -> SessionRecord {
        let mut s = SessionRecord::new(
            "s1".to_string(),
            "user1".to_string(),
            "en_US".to_string(),
            SessionMode::Login,
            needed_auth_steps,
            PasswordResetPolicy::None,
        );
        s.select_mode("password".to_string());
        s
    }

    #[test]
    fn granted_on_last_step_is_terminal() {
        let mut s = session(1);
        assert_eq!(advance(&mut s, EvalOutcome::Granted), StepResult::Terminal);
        assert_eq!(s.current_auth_step, 1);
    }

    #[test]
    fn granted_before_last_step_advances_and_reports_next() {
        let mut s = session(2);
        let result = advance(&mut s, EvalOutcome::Granted);
        assert_eq!(result, StepResult::Next { steps_missing: 1 });
        assert_eq!(s.current_auth_step, 2);
    }

    #[test]
    fn five_retries_stay_retry_sixth_is_denied() {
        let mut s = session(1);
        for _ in 0..5 {
            assert_eq!(advance(&mut s, EvalOutcome::Retry), StepResult::Retry);
        }
        assert_eq!(advance(&mut s, EvalOutcome::Retry), StepResult::Denied);
        assert_eq!(s.attempts_per_mode.get("password"), Some(&6));
    }

    #[test]
    fn cancelled_outcome_passes_through() {
        let mut s = session(1);
        assert_eq!(advance(&mut s, EvalOutcome::Cancelled), StepResult::Cancelled);
        // Cancellation does not perturb step or attempt state.
        assert_eq!(s.current_auth_step, 1);
        assert!(s.attempts_per_mode.is_empty());
    }

    #[test]
    fn step_never_decreases_across_a_run() {
        let mut s = session(3);
        let mut steps_seen = vec![s.current_auth_step];
        for _ in 0..2 {
            advance(&mut s, EvalOutcome::Granted);
            steps_seen.push(s.current_auth_step);
        }
        assert!(steps_seen.windows(2).all(|w| w[1] >= w[0]));
        assert_eq!(steps_seen, vec![1, 2, 3]);
    }
}
