//! Wire and data-model types shared across the authentication broker core.
//!
//! Pure data definitions only: no locking, no I/O, no state-machine logic.
//! See `authd-fsm` for the state machine and `authd-broker` for the façade
//! that ties everything together.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// SessionMode / PasswordResetPolicy
// ---------------------------------------------------------------------------

/// Whether a session is driving a normal login or a forced password change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SessionMode {
    Login,
    ChangePassword,
}

/// Password-reset policy attached to a user's step plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PasswordResetPolicy {
    None,
    Optional,
    Mandatory,
}

// ---------------------------------------------------------------------------
// AccessToken
// ---------------------------------------------------------------------------

/// The exact access-token strings `IsAuthenticated` may return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessToken {
    Granted,
    Denied,
    Cancelled,
    Retry,
    Next,
}

impl AccessToken {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessToken::Granted => "granted",
            AccessToken::Denied => "denied",
            AccessToken::Cancelled => "cancelled",
            AccessToken::Retry => "retry",
            AccessToken::Next => "next",
        }
    }
}

impl std::fmt::Display for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ---------------------------------------------------------------------------
// UI layout negotiation
// ---------------------------------------------------------------------------

/// Rendering descriptor a mode asks the client to draw, or a client's
/// advertised rendering capability. Keys come from a fixed vocabulary:
/// `type`, `label`, `entry`, `wait`, `button`, `content`, `code`. Modeled as
/// a `BTreeMap` (not `HashMap`) so serialized output and test fixtures are
/// byte-stable.
pub type UiLayoutInfo = BTreeMap<String, String>;

/// The `type` discriminant of a client-advertised UI layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutType {
    Form,
    Qrcode,
    Newpassword,
    Webview,
}

/// One entry of `supportedUILayouts` as advertised by the client to
/// `GetAuthenticationModes`. The broker must not assume any field the
/// client did not advertise.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutDescriptor {
    pub r#type: LayoutType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wait: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub button: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub renders_qrcode: Option<String>,
}

impl LayoutDescriptor {
    /// `entry` is comma-separated, each item optionally `optional:`-prefixed.
    /// Returns the bare item names with any `optional:` prefix stripped.
    pub fn entry_items(&self) -> Vec<&str> {
        self.entry
            .as_deref()
            .map(|raw| {
                raw.split(',')
                    .map(|item| item.trim().trim_start_matches("optional:"))
                    .filter(|item| !item.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn wants_wait(&self) -> bool {
        self.wait.as_deref() == Some("true")
    }

    pub fn can_render_qrcode(&self) -> bool {
        self.renders_qrcode.as_deref() == Some("true")
    }
}

// ---------------------------------------------------------------------------
// ModeDescriptor
// ---------------------------------------------------------------------------

/// A single authentication mode offered by a broker for the current step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModeDescriptor {
    /// Stable key, e.g. `password`, `pincode`, or a dynamically-named
    /// `entry_or_wait_for_<user>_gmail.com`.
    pub id: String,
    /// Human-readable choice text shown to the client.
    pub selection_label: String,
    /// Rendering request returned by `SelectAuthenticationMode`.
    pub ui: UiLayoutInfo,
    /// Whether this mode may be used as a second/third factor.
    pub is_mfa: bool,
    /// Auxiliary fields used only by the reference broker: phone number for
    /// phone-ack modes, email for the dynamically-named email mode, and the
    /// rotating TOTP code a client is expected to submit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wanted_code: Option<String>,
}

/// The `{id, label}` pair `GetAuthenticationModes` returns to the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModeChoice {
    pub id: String,
    pub label: String,
}

// ---------------------------------------------------------------------------
// AuthData
// ---------------------------------------------------------------------------

/// `authData` as submitted to `IsAuthenticated`. Absent/empty is legal.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wait: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip: Option<String>,
}

impl AuthData {
    /// Parse the JSON the client submits. An empty/blank string is legal and
    /// decodes to the default (no secret, no wait, no skip).
    pub fn parse(raw: &str) -> Result<Self, serde_json::Error> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(raw)
    }

    pub fn wants_wait(&self) -> bool {
        self.wait.as_deref() == Some("true")
    }

    pub fn wants_skip(&self) -> bool {
        self.skip.as_deref() == Some("true")
    }
}

// ---------------------------------------------------------------------------
// UserInfo
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupInfo {
    pub name: String,
    pub ugid: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserInfo {
    pub name: String,
    pub uuid: String,
    pub gecos: String,
    pub dir: String,
    pub shell: String,
    pub groups: Vec<GroupInfo>,
}
