//! The reference broker: a self-contained, deterministic backend used for
//! local development and the daemon's scenario tests. It owns its own
//! password store and is not meant to authenticate against any real
//! identity system.

mod modes;

use std::collections::BTreeMap;
use std::time::Duration;

use tokio::sync::RwLock;

use authd_config::BrokerConfig;
use authd_fsm::{BrokerBackend, EvalOutcome};
use authd_schemas::{
    AuthData, GroupInfo, LayoutDescriptor, LayoutType, ModeDescriptor, PasswordResetPolicy,
    SessionMode, UiLayoutInfo, UserInfo,
};
use authd_session::{CancelHandle, SessionRecord};

use crate::Broker;

/// Username that never exists, for exercising the not-found path.
pub const SENTINEL_NONEXISTENT_USER: &str = "user-unknown";

struct UserRecord {
    password: String,
}

/// `infer_step_plan` decides a new user's MFA ladder and reset policy from
/// its name. Canonical names (`user-mfa`, `user-needs-reset`,
/// `user-can-reset`, `user-mfa-with-reset`, the numbered variants) and any
/// name carrying the same substrings as an "-integration-" suffix (e.g.
/// `user-mfa-integration-42`) resolve the same way.
fn infer_step_plan(username: &str) -> (u32, PasswordResetPolicy) {
    let has_mfa = username.contains("mfa");
    let has_reset = username.contains("reset");
    if has_mfa && has_reset {
        (3, PasswordResetPolicy::Optional)
    } else if username.contains("needs-reset") {
        (2, PasswordResetPolicy::Mandatory)
    } else if username.contains("can-reset") {
        (2, PasswordResetPolicy::Optional)
    } else if has_mfa {
        (3, PasswordResetPolicy::None)
    } else {
        (1, PasswordResetPolicy::None)
    }
}

/// A username is "known" to `UserPreCheck` if it matches this broker's
/// reference naming scheme (`user1`, `user-*`) without an unmarked
/// `-integration-` suffix, or if it otherwise carries the literal token
/// `precheck` integration tests use to mark a deliberately-recognized name.
/// Anything else is treated as unrecognized rather than silently granted.
fn is_recognized_username(username: &str) -> bool {
    if username == "user1" || (username.starts_with("user-") && !username.contains("integration")) {
        return true;
    }
    username.contains("precheck")
}

pub struct ExampleBroker {
    users: RwLock<BTreeMap<String, UserRecord>>,
    config: BrokerConfig,
}

impl ExampleBroker {
    pub fn new(config: BrokerConfig) -> Self {
        Self {
            users: RwLock::new(BTreeMap::new()),
            config,
        }
    }

    /// Auto-create a reference account for `username` if it hasn't been
    /// seen before. Every reference account starts with the password
    /// `goodpass`.
    async fn ensure_user_materialized(&self, username: &str) {
        let mut users = self.users.write().await;
        users.entry(username.to_string()).or_insert_with(|| UserRecord {
            password: "goodpass".to_string(),
        });
    }

    async fn eval_against_password(&self, session: &SessionRecord, secret: Option<String>) -> EvalOutcome {
        let password = {
            let users = self.users.read().await;
            users.get(&session.username).map(|u| u.password.clone())
        };
        match password {
            Some(pw) => eval_literal(secret.as_deref(), &pw),
            None => EvalOutcome::Denied,
        }
    }

    async fn eval_wait(&self, auth_data: &AuthData, cancel: CancelHandle, duration: Duration, on_timeout: EvalOutcome) -> EvalOutcome {
        if !auth_data.wants_wait() {
            return EvalOutcome::Denied;
        }
        tokio::select! {
            _ = cancel.cancelled() => EvalOutcome::Cancelled,
            _ = tokio::time::sleep(duration) => on_timeout,
        }
    }

    /// `mandatoryreset`/`optionalreset`'s submit path: the first accepted
    /// secret is the fixed bootstrap password `authd2404`, and the account's
    /// password then becomes whatever was just submitted. Once the stored
    /// password is `authd2404`, only `goodpass` is accepted as the
    /// replacement -- resubmitting `authd2404` itself, or any other string,
    /// just retries.
    async fn eval_mandatory_reset(&self, session: &SessionRecord, secret: Option<String>) -> EvalOutcome {
        let secret = match secret.as_deref() {
            Some(s) if !s.is_empty() => s,
            _ => return EvalOutcome::Retry,
        };

        let mut users = self.users.write().await;
        let Some(user) = users.get_mut(&session.username) else {
            return EvalOutcome::Denied;
        };

        let accepted = if user.password == "authd2404" {
            secret == "goodpass"
        } else {
            secret == "authd2404"
        };

        if accepted {
            user.password = secret.to_string();
            EvalOutcome::Granted
        } else {
            EvalOutcome::Retry
        }
    }
}

fn eval_literal(secret: Option<&str>, expected: &str) -> EvalOutcome {
    if secret == Some(expected) {
        EvalOutcome::Granted
    } else {
        EvalOutcome::Retry
    }
}

#[async_trait::async_trait]
impl BrokerBackend for ExampleBroker {
    async fn evaluate(
        &self,
        session: &SessionRecord,
        mode_id: &str,
        secret: Option<String>,
        auth_data: &AuthData,
        cancel: CancelHandle,
    ) -> EvalOutcome {
        let wait = self.config.scale_wait(Duration::from_secs(4));
        let long_wait = self.config.scale_wait(Duration::from_secs(10));

        match mode_id {
            "password" => self.eval_against_password(session, secret).await,
            "pincode" => eval_literal(secret.as_deref(), "4242"),
            "totp" | "totp_with_button" => {
                let wanted = session
                    .mode_catalog
                    .get(mode_id)
                    .and_then(|m| m.wanted_code.clone())
                    .unwrap_or_default();
                eval_literal(secret.as_deref(), &wanted)
            }
            "phoneack1" | "fidodevice1" => self.eval_wait(auth_data, cancel, wait, EvalOutcome::Granted).await,
            "phoneack2" => self.eval_wait(auth_data, cancel, wait, EvalOutcome::Denied).await,
            "qrcodewithtypo" | "qrcodeandcodewithtypo" | "codewithtypo" => {
                self.eval_wait(auth_data, cancel, wait, EvalOutcome::Granted).await
            }
            "optionalreset" => {
                if auth_data.wants_skip() {
                    EvalOutcome::Granted
                } else {
                    self.eval_mandatory_reset(session, secret).await
                }
            }
            "mandatoryreset" => self.eval_mandatory_reset(session, secret).await,
            id if id.starts_with("entry_or_wait_for_") => {
                if let Some(s) = secret.as_deref().filter(|s| !s.is_empty()) {
                    eval_literal(Some(s), "aaaaa")
                } else if auth_data.wants_wait() {
                    self.eval_wait(auth_data, cancel, long_wait, EvalOutcome::Granted).await
                } else {
                    EvalOutcome::Denied
                }
            }
            _ => EvalOutcome::Denied,
        }
    }
}

#[async_trait::async_trait]
impl Broker for ExampleBroker {
    async fn user_exists(&self, username: &str) -> bool {
        if username == SENTINEL_NONEXISTENT_USER {
            return false;
        }
        self.ensure_user_materialized(username).await;
        true
    }

    async fn step_plan(&self, username: &str, mode: SessionMode) -> crate::StepPlan {
        let (mut needed, mut policy) = infer_step_plan(username);
        if mode == SessionMode::ChangePassword {
            needed += 1;
            policy = PasswordResetPolicy::Mandatory;
        }
        crate::StepPlan {
            needed_auth_steps: needed,
            password_reset_policy: policy,
        }
    }

    fn synthesize_candidate_modes(&self, session: &SessionRecord, layouts: &[LayoutDescriptor]) -> Vec<ModeDescriptor> {
        let mut out = Vec::new();
        for layout in layouts {
            match layout.r#type {
                LayoutType::Form => {
                    let items = layout.entry_items();
                    if items.contains(&"chars_password") {
                        out.push(modes::password());
                    }
                    if items.contains(&"digits") {
                        out.push(modes::pincode());
                    }
                    if items.contains(&"chars") && layout.wants_wait() {
                        out.push(modes::email_mode(&session.username));
                    }
                    if layout.wants_wait() {
                        out.push(modes::totp(layout.button.as_deref() == Some("optional")));
                        out.push(modes::phoneack1());
                        out.push(modes::phoneack2());
                        out.push(modes::fidodevice1());
                    }
                }
                LayoutType::Qrcode => {
                    if layout.can_render_qrcode() {
                        if layout.code.as_deref().is_some_and(|c| !c.is_empty()) {
                            out.push(modes::qrcodeandcodewithtypo());
                        } else {
                            out.push(modes::qrcodewithtypo());
                        }
                    } else {
                        out.push(modes::codewithtypo());
                    }
                }
                LayoutType::Newpassword => {
                    if layout.entry.as_deref().is_some_and(|e| !e.is_empty()) {
                        out.push(modes::mandatoryreset());
                        if layout.button.as_deref().is_some_and(|b| !b.is_empty()) {
                            out.push(modes::optionalreset());
                        }
                    }
                }
                LayoutType::Webview => {}
            }
        }
        out
    }

    async fn on_mode_selected(&self, session: &mut SessionRecord, mode_id: &str) -> UiLayoutInfo {
        let Some(descriptor) = session.mode_catalog.get_mut(mode_id) else {
            return UiLayoutInfo::new();
        };

        match mode_id {
            "totp" | "totp_with_button" => {
                let code = descriptor.wanted_code.get_or_insert_with(|| "123456".to_string());
                code.push('0');
                session.totp_counter += 1;
            }
            "qrcodewithtypo" | "qrcodeandcodewithtypo" => {
                session.qr_code_counter += 1;
                descriptor.ui.insert(
                    "content".to_string(),
                    format!("qr-payload-{}-{}", session.username, session.qr_code_counter),
                );
            }
            "codewithtypo" => {
                session.qr_code_counter += 1;
                descriptor
                    .ui
                    .insert("code".to_string(), format!("{:04}", 1000 + session.qr_code_counter % 9000));
            }
            _ => {}
        }

        descriptor.ui.clone()
    }

    async fn user_info(&self, username: &str) -> UserInfo {
        let mut groups = vec![GroupInfo {
            name: format!("group-{username}"),
            ugid: format!("ugid-{username}"),
        }];
        if username.starts_with("user-local-groups") {
            groups.push(GroupInfo {
                name: "localgroup".to_string(),
                ugid: String::new(),
            });
        }
        if username == "user-sudo" {
            groups.push(GroupInfo {
                name: "sudo".to_string(),
                ugid: "sudo".to_string(),
            });
            groups.push(GroupInfo {
                name: "admin".to_string(),
                ugid: "admin".to_string(),
            });
        }

        UserInfo {
            name: username.to_string(),
            uuid: format!("uuid-{username}"),
            gecos: format!("gecos for {username}"),
            dir: format!("{}/{}", self.config.home_base_dir, username),
            shell: "/bin/sh".to_string(),
            groups,
        }
    }

    async fn precheck(&self, username: &str) -> Option<UserInfo> {
        if username == SENTINEL_NONEXISTENT_USER {
            return None;
        }
        if !is_recognized_username(username) {
            return None;
        }
        self.ensure_user_materialized(username).await;
        Some(self.user_info(username).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use authd_schemas::SessionMode;

    fn broker() -> ExampleBroker {
        ExampleBroker::new(BrokerConfig::default())
    }

    #[tokio::test]
    async fn sentinel_user_does_not_exist() {
        let b = broker();
        assert!(!b.user_exists(SENTINEL_NONEXISTENT_USER).await);
    }

    #[tokio::test]
    async fn unknown_username_is_auto_materialized() {
        let b = broker();
        assert!(b.user_exists("user1").await);
    }

    #[tokio::test]
    async fn mfa_username_gets_a_three_step_plan() {
        let b = broker();
        let plan = b.step_plan("user-mfa", SessionMode::Login).await;
        assert_eq!(plan.needed_auth_steps, 3);
        assert_eq!(plan.password_reset_policy, PasswordResetPolicy::None);
    }

    #[tokio::test]
    async fn needs_reset_username_gets_mandatory_two_step_plan() {
        let b = broker();
        let plan = b.step_plan("user-needs-reset2", SessionMode::Login).await;
        assert_eq!(plan.needed_auth_steps, 2);
        assert_eq!(plan.password_reset_policy, PasswordResetPolicy::Mandatory);
    }

    #[tokio::test]
    async fn change_password_mode_forces_an_extra_mandatory_step() {
        let b = broker();
        let plan = b.step_plan("user1", SessionMode::ChangePassword).await;
        assert_eq!(plan.needed_auth_steps, 2);
        assert_eq!(plan.password_reset_policy, PasswordResetPolicy::Mandatory);
    }

    #[tokio::test]
    async fn password_mode_grants_on_the_stored_password() {
        let b = broker();
        b.user_exists("user1").await;
        let mut s = SessionRecord::new(
            "s1".to_string(),
            "user1".to_string(),
            "en_US".to_string(),
            SessionMode::Login,
            1,
            PasswordResetPolicy::None,
        );
        s.select_mode("password".to_string());
        let outcome = b
            .eval_against_password(&s, Some("goodpass".to_string()))
            .await;
        assert_eq!(outcome, EvalOutcome::Granted);
    }

    #[tokio::test]
    async fn mandatory_reset_accepts_bootstrap_then_rejects_repeating_it() {
        let b = broker();
        b.user_exists("user-needs-reset").await;
        let s = SessionRecord::new(
            "s1".to_string(),
            "user-needs-reset".to_string(),
            "en_US".to_string(),
            SessionMode::Login,
            2,
            PasswordResetPolicy::Mandatory,
        );
        let first = b.eval_mandatory_reset(&s, Some("authd2404".to_string())).await;
        assert_eq!(first, EvalOutcome::Granted);
        let second = b.eval_mandatory_reset(&s, Some("authd2404".to_string())).await;
        assert_eq!(second, EvalOutcome::Retry);
    }

    #[tokio::test]
    async fn mandatory_reset_rejects_arbitrary_secrets_once_password_is_the_bootstrap_value() {
        let b = broker();
        b.user_exists("user-needs-reset").await;
        let s = SessionRecord::new(
            "s1".to_string(),
            "user-needs-reset".to_string(),
            "en_US".to_string(),
            SessionMode::Login,
            2,
            PasswordResetPolicy::Mandatory,
        );
        let first = b.eval_mandatory_reset(&s, Some("authd2404".to_string())).await;
        assert_eq!(first, EvalOutcome::Granted);

        // Password is now "authd2404"; only "goodpass" is accepted, not any
        // arbitrary string.
        let bogus = b.eval_mandatory_reset(&s, Some("hunter2".to_string())).await;
        assert_eq!(bogus, EvalOutcome::Retry);

        let correct = b.eval_mandatory_reset(&s, Some("goodpass".to_string())).await;
        assert_eq!(correct, EvalOutcome::Granted);
    }

    #[tokio::test]
    async fn precheck_rejects_integration_names_without_the_token() {
        let b = broker();
        assert!(b.precheck("user-mfa-integration-7").await.is_none());
        assert!(b.precheck("user-mfa-integration-precheck-7").await.is_some());
    }

    #[tokio::test]
    async fn precheck_rejects_arbitrary_unrecognized_usernames() {
        let b = broker();
        assert!(b.precheck("totally-unrelated-name").await.is_none());
        assert!(b.precheck("precheck-marked-name").await.is_some());
    }

    #[tokio::test]
    async fn user_sudo_gets_extra_groups() {
        let b = broker();
        let info = b.user_info("user-sudo").await;
        assert!(info.groups.iter().any(|g| g.name == "sudo"));
        assert!(info.groups.iter().any(|g| g.name == "admin"));
    }
}
