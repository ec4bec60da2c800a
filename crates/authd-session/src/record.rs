//! The per-session state record.

use std::collections::BTreeMap;

use authd_schemas::{ModeDescriptor, PasswordResetPolicy, SessionMode};

/// Per-session state held by the session registry.
///
/// Records are small and `Clone`: callers receive a snapshot from
/// `SessionRegistry::lookup`, mutate it, and write it back with
/// `SessionRegistry::update`. This keeps the registry's lock off the
/// critical path of any RPC-scoped work, including waits.
#[derive(Debug, Clone)]
pub struct SessionRecord {
    pub id: String,
    pub username: String,
    pub lang: String,
    pub session_mode: SessionMode,

    /// Size of the MFA ladder; ≥ 1.
    pub needed_auth_steps: u32,
    /// 1-indexed; only ever advances by exactly 1.
    pub current_auth_step: u32,

    pub password_reset_policy: PasswordResetPolicy,

    /// Populated on each `GetAuthenticationModes` call.
    pub mode_catalog: BTreeMap<String, ModeDescriptor>,
    /// Identifier last accepted by `SelectAuthenticationMode` in this step.
    pub current_auth_mode: Option<String>,
    /// Mode selected in step 1; becomes the user's preference on success.
    pub first_selected_mode: Option<String>,
    /// Reset whenever `current_auth_mode` changes.
    pub attempts_per_mode: BTreeMap<String, u32>,

    /// Monotonic counters the reference broker uses to rotate rendered
    /// content (QR payloads, TOTP expectations).
    pub qr_code_counter: u32,
    pub totp_counter: u32,

    /// If set, `GetAuthenticationModes` intersects the synthesized catalog
    /// against this list.
    pub accepted_auth_mode_ids: Option<Vec<String>>,
}

impl SessionRecord {
    pub fn new(
        id: String,
        username: String,
        lang: String,
        session_mode: SessionMode,
        needed_auth_steps: u32,
        password_reset_policy: PasswordResetPolicy,
    ) -> Self {
        Self {
            id,
            username,
            lang,
            session_mode,
            needed_auth_steps: needed_auth_steps.max(1),
            current_auth_step: 1,
            password_reset_policy,
            mode_catalog: BTreeMap::new(),
            current_auth_mode: None,
            first_selected_mode: None,
            attempts_per_mode: BTreeMap::new(),
            qr_code_counter: 0,
            totp_counter: 0,
            accepted_auth_mode_ids: None,
        }
    }

    /// Any step after the first restricts the catalog to MFA-eligible modes.
    pub fn is_mfa_step(&self) -> bool {
        self.current_auth_step > 1
    }

    /// The reset step is the final step, when a reset policy applies. A
    /// reset mode may only actually be offered/selected from step 2
    /// onward; that extra gate is enforced by callers, not this predicate.
    pub fn is_reset_step(&self) -> bool {
        self.current_auth_step == self.needed_auth_steps
            && self.password_reset_policy != PasswordResetPolicy::None
    }

    /// Count of failed attempts against whichever mode is currently
    /// selected; 0 if none has been recorded yet.
    pub fn attempts_for_current_mode(&self) -> u32 {
        self.current_auth_mode
            .as_deref()
            .and_then(|id| self.attempts_per_mode.get(id))
            .copied()
            .unwrap_or(0)
    }

    /// Select a new mode for the current step, resetting its attempt count.
    pub fn select_mode(&mut self, mode_id: String) {
        self.attempts_per_mode.insert(mode_id.clone(), 0);
        if self.current_auth_step == 1 && self.first_selected_mode.is_none() {
            self.first_selected_mode = Some(mode_id.clone());
        }
        self.current_auth_mode = Some(mode_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> SessionRecord {
        SessionRecord::new(
            "sess-1".to_string(),
            "user1".to_string(),
            "en_US".to_string(),
            SessionMode::Login,
            1,
            PasswordResetPolicy::None,
        )
    }

    #[test]
    fn new_session_starts_at_step_one() {
        let s = sample();
        assert_eq!(s.current_auth_step, 1);
        assert!(!s.is_mfa_step());
    }

    #[test]
    fn select_mode_remembers_first_choice_in_step_one() {
        let mut s = sample();
        s.select_mode("password".to_string());
        assert_eq!(s.first_selected_mode.as_deref(), Some("password"));
        assert_eq!(s.attempts_for_current_mode(), 0);
    }

    #[test]
    fn select_mode_resets_attempt_count() {
        let mut s = sample();
        s.select_mode("password".to_string());
        s.attempts_per_mode.insert("password".to_string(), 3);
        assert_eq!(s.attempts_for_current_mode(), 3);
        s.select_mode("pincode".to_string());
        assert_eq!(s.attempts_for_current_mode(), 0);
        // first choice is not overwritten by later selections within step 1
        assert_eq!(s.first_selected_mode.as_deref(), Some("password"));
    }
}
