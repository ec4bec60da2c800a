//! The broker façade: the seven operations a transport binding (the daemon,
//! or a test harness) drives directly, generic over a pluggable [`Broker`]
//! backend the same way `OrderRouter<B: BrokerAdapter>` stays generic over
//! paper/live trading adapters.

pub mod discovery;
pub mod example;
mod preference;

use authd_crypto::SecretBox;
use authd_fsm::{BrokerBackend, StepResult};
use authd_schemas::{
    AccessToken, LayoutDescriptor, ModeDescriptor, PasswordResetPolicy, SessionMode, UiLayoutInfo,
    UserInfo,
};
use authd_session::{CancelHandle, InFlightRegistry, SessionRecord, SessionRegistry};

pub use preference::PreferenceStore;

/// The MFA ladder length and reset policy a broker assigns a session at
/// creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepPlan {
    pub needed_auth_steps: u32,
    pub password_reset_policy: PasswordResetPolicy,
}

/// Everything a broker backend supplies beyond `BrokerBackend::evaluate`:
/// user lifecycle, mode synthesis, and the reporting operations
/// (`UserPreCheck`, the terminal user-info document).
#[async_trait::async_trait]
pub trait Broker: BrokerBackend {
    async fn user_exists(&self, username: &str) -> bool;

    async fn step_plan(&self, username: &str, mode: SessionMode) -> StepPlan;

    /// Turn the client's advertised layouts into candidate modes. The
    /// façade applies the shared filter/sort pipeline afterward.
    fn synthesize_candidate_modes(&self, session: &SessionRecord, layouts: &[LayoutDescriptor]) -> Vec<ModeDescriptor>;

    /// Side effects of accepting a mode selection (rotating a TOTP code or
    /// QR payload) plus the UI descriptor to hand back to the caller.
    async fn on_mode_selected(&self, session: &mut SessionRecord, mode_id: &str) -> UiLayoutInfo;

    async fn user_info(&self, username: &str) -> UserInfo;

    async fn precheck(&self, username: &str) -> Option<UserInfo>;
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum FacadeError {
    UserDoesNotExist(String),
    SessionNotFound(String),
    AlreadyInFlight(String),
    UnknownMode(String),
    MalformedAuthData(String),
    ResetPolicyViolation(String),
}

impl std::fmt::Display for FacadeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FacadeError::UserDoesNotExist(u) => write!(f, "user {u} does not exist"),
            FacadeError::SessionNotFound(s) => write!(f, "session not found: {s}"),
            FacadeError::AlreadyInFlight(s) => write!(f, "IsAuthenticated already running for session {s}"),
            FacadeError::UnknownMode(m) => write!(f, "unknown authentication mode: {m}"),
            FacadeError::MalformedAuthData(e) => write!(f, "malformed auth data: {e}"),
            FacadeError::ResetPolicyViolation(e) => write!(f, "reset policy violation: {e}"),
        }
    }
}

impl std::error::Error for FacadeError {}

impl From<authd_session::SessionNotFound> for FacadeError {
    fn from(e: authd_session::SessionNotFound) -> Self {
        FacadeError::SessionNotFound(e.session_id)
    }
}

impl From<authd_session::AlreadyInFlight> for FacadeError {
    fn from(e: authd_session::AlreadyInFlight) -> Self {
        FacadeError::AlreadyInFlight(e.session_id)
    }
}

impl From<discovery::DiscoveryError> for FacadeError {
    fn from(e: discovery::DiscoveryError) -> Self {
        FacadeError::ResetPolicyViolation(e.to_string())
    }
}

// ---------------------------------------------------------------------------
// Facade
// ---------------------------------------------------------------------------

pub struct NewSessionResponse {
    pub session_id: String,
    pub encryption_key: String,
}

pub struct BrokerFacade<B: Broker> {
    backend: B,
    secret_box: SecretBox,
    sessions: SessionRegistry,
    inflight: InFlightRegistry,
    preferences: PreferenceStore,
}

impl<B: Broker> BrokerFacade<B> {
    pub fn new(backend: B) -> Result<Self, authd_crypto::CryptoError> {
        Ok(Self {
            backend,
            secret_box: SecretBox::new()?,
            sessions: SessionRegistry::new(),
            inflight: InFlightRegistry::new(),
            preferences: PreferenceStore::new(),
        })
    }

    pub async fn new_session(
        &self,
        username: &str,
        lang: &str,
        mode: SessionMode,
    ) -> Result<NewSessionResponse, FacadeError> {
        if !self.backend.user_exists(username).await {
            return Err(FacadeError::UserDoesNotExist(username.to_string()));
        }

        let plan = self.backend.step_plan(username, mode).await;
        let id = uuid::Uuid::new_v4().to_string();
        let record = SessionRecord::new(
            id.clone(),
            username.to_string(),
            lang.to_string(),
            mode,
            plan.needed_auth_steps,
            plan.password_reset_policy,
        );
        self.sessions.insert(record).await;

        Ok(NewSessionResponse {
            session_id: id,
            encryption_key: self.secret_box.public_key_der_b64().to_string(),
        })
    }

    pub async fn get_authentication_modes(
        &self,
        session_id: &str,
        layouts: Vec<LayoutDescriptor>,
    ) -> Result<Vec<authd_schemas::ModeChoice>, FacadeError> {
        let mut session = self.sessions.lookup(session_id).await?;

        let candidates = self.backend.synthesize_candidate_modes(&session, &layouts);
        let preferred = self.preferences.get(&session.username).await;
        let filtered = discovery::filter_and_sort_modes(candidates, &session, preferred.as_deref())?;

        let choices = filtered
            .iter()
            .map(|m| authd_schemas::ModeChoice {
                id: m.id.clone(),
                label: m.selection_label.clone(),
            })
            .collect();

        session.mode_catalog = filtered.into_iter().map(|m| (m.id.clone(), m)).collect();
        self.sessions.update(session_id, session).await?;

        Ok(choices)
    }

    pub async fn select_authentication_mode(
        &self,
        session_id: &str,
        mode_id: &str,
    ) -> Result<UiLayoutInfo, FacadeError> {
        let mut session = self.sessions.lookup(session_id).await?;

        let is_reset_mode = mode_id == "mandatoryreset" || mode_id == "optionalreset";
        if is_reset_mode && !(session.is_reset_step() && session.current_auth_step >= 2) {
            return Err(FacadeError::ResetPolicyViolation(format!(
                "{mode_id} may only be selected at or after step 2 of the reset step"
            )));
        }

        if !session.mode_catalog.contains_key(mode_id) {
            return Err(FacadeError::UnknownMode(mode_id.to_string()));
        }

        session.select_mode(mode_id.to_string());
        let ui = self.backend.on_mode_selected(&mut session, mode_id).await;
        self.sessions.update(session_id, session).await?;

        Ok(ui)
    }

    pub async fn is_authenticated(
        &self,
        session_id: &str,
        auth_data_json: &str,
    ) -> Result<(AccessToken, String), FacadeError> {
        let auth_data = authd_schemas::AuthData::parse(auth_data_json)
            .map_err(|e| FacadeError::MalformedAuthData(e.to_string()))?;

        let session_snapshot = self.sessions.lookup(session_id).await?;
        let mode_id = session_snapshot
            .current_auth_mode
            .clone()
            .ok_or_else(|| FacadeError::UnknownMode("no mode selected".to_string()))?;

        let cancel = self.inflight.begin(session_id).await?;

        let secret = match auth_data.secret.as_deref() {
            Some("") | None => None,
            Some(b64) => match self.secret_box.decrypt_secret(b64) {
                Ok(plain) => Some(plain),
                Err(e) => {
                    self.inflight.end(session_id).await;
                    return Ok((AccessToken::Retry, diagnostic(&format!("secret decode failed: {e}"))));
                }
            },
        };

        let outcome = self
            .backend
            .evaluate(&session_snapshot, &mode_id, secret, &auth_data, cancel)
            .await;

        self.inflight.end(session_id).await;

        let Ok(mut session) = self.sessions.lookup(session_id).await else {
            // EndSession raced ahead of us and already dropped the record.
            return Ok((AccessToken::Cancelled, String::new()));
        };

        let step_result = authd_fsm::advance(&mut session, outcome);

        let (access, data) = match step_result {
            StepResult::Terminal => {
                if let Some(first) = session.first_selected_mode.clone() {
                    self.preferences.set(&session.username, first).await;
                }
                let info = self.backend.user_info(&session.username).await;
                (AccessToken::Granted, serde_json::to_string(&info).unwrap_or_default())
            }
            StepResult::Next { steps_missing } => (AccessToken::Next, diagnostic(&format!("{steps_missing} step(s) missing"))),
            StepResult::Denied => (AccessToken::Denied, String::new()),
            StepResult::Retry => (AccessToken::Retry, String::new()),
            StepResult::Cancelled => (AccessToken::Cancelled, String::new()),
        };

        self.sessions.update(session_id, session).await?;

        Ok((access, data))
    }

    pub async fn cancel_is_authenticated(&self, session_id: &str) {
        self.inflight.cancel(session_id).await;
    }

    pub async fn end_session(&self, session_id: &str) {
        self.inflight.cancel(session_id).await;
        self.sessions.delete(session_id).await;
    }

    pub async fn user_precheck(&self, username: &str) -> Option<UserInfo> {
        self.backend.precheck(username).await
    }
}

fn diagnostic(message: &str) -> String {
    serde_json::json!({ "message": message }).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::example::ExampleBroker;
    use authd_config::BrokerConfig;
    use authd_schemas::{LayoutType, SessionMode};

    fn facade() -> BrokerFacade<ExampleBroker> {
        BrokerFacade::new(ExampleBroker::new(BrokerConfig::default())).unwrap()
    }

    fn password_layout() -> LayoutDescriptor {
        LayoutDescriptor {
            r#type: LayoutType::Form,
            label: None,
            entry: Some("chars_password".to_string()),
            wait: None,
            button: None,
            code: None,
            content: None,
            renders_qrcode: None,
        }
    }

    #[tokio::test]
    async fn new_session_rejects_the_sentinel_user() {
        let f = facade();
        let err = f
            .new_session(example::SENTINEL_NONEXISTENT_USER, "en_US", SessionMode::Login)
            .await
            .unwrap_err();
        assert!(matches!(err, FacadeError::UserDoesNotExist(_)));
    }

    #[tokio::test]
    async fn single_step_password_login_grants() {
        let f = facade();
        let session = f.new_session("user1", "en_US", SessionMode::Login).await.unwrap();

        let modes = f
            .get_authentication_modes(&session.session_id, vec![password_layout()])
            .await
            .unwrap();
        assert_eq!(modes[0].id, "password");

        f.select_authentication_mode(&session.session_id, "password")
            .await
            .unwrap();

        let (access, _) = f
            .is_authenticated(&session.session_id, r#"{"secret":""}"#)
            .await
            .unwrap();
        // Empty secret does not match the stored password, so this retries
        // rather than granting -- exercised for real with the encrypted
        // wire format in the daemon's scenario tests.
        assert_eq!(access, AccessToken::Retry);
    }

    #[tokio::test]
    async fn cancel_is_authenticated_is_a_noop_with_nothing_in_flight() {
        let f = facade();
        let session = f.new_session("user1", "en_US", SessionMode::Login).await.unwrap();
        f.cancel_is_authenticated(&session.session_id).await;
    }

    #[tokio::test]
    async fn end_session_makes_the_session_unreachable() {
        let f = facade();
        let session = f.new_session("user1", "en_US", SessionMode::Login).await.unwrap();
        f.end_session(&session.session_id).await;
        let err = f
            .get_authentication_modes(&session.session_id, vec![password_layout()])
            .await
            .unwrap_err();
        assert!(matches!(err, FacadeError::SessionNotFound(_)));
    }

    #[tokio::test]
    async fn selecting_a_reset_mode_too_early_is_a_policy_violation() {
        let f = facade();
        let session = f
            .new_session("user-needs-reset", "en_US", SessionMode::Login)
            .await
            .unwrap();
        let err = f
            .select_authentication_mode(&session.session_id, "mandatoryreset")
            .await
            .unwrap_err();
        assert!(matches!(err, FacadeError::ResetPolicyViolation(_)));
    }

    #[tokio::test]
    async fn user_precheck_reports_reference_users() {
        let f = facade();
        let info = f.user_precheck("user1").await;
        assert!(info.is_some());
        assert_eq!(info.unwrap().name, "user1");
    }

    #[tokio::test]
    async fn user_precheck_rejects_the_sentinel_user() {
        let f = facade();
        assert!(f.user_precheck(example::SENTINEL_NONEXISTENT_USER).await.is_none());
    }
}
