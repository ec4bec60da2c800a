//! Generic mode-catalog post-processing: the part of `GetAuthenticationModes`
//! that applies regardless of which backend synthesized the raw candidates.
//!
//! A broker backend (the reference broker, or any other) is only
//! responsible for turning the client's advertised layouts into a list of
//! candidate [`ModeDescriptor`]s. Everything after that — MFA restriction,
//! reset-step replacement, accepted-id intersection, and the final sort —
//! is policy every broker shares, so it lives here rather than being
//! duplicated per backend. This mirrors how `OrderRouter` keeps routing
//! policy generic over a pluggable `BrokerAdapter`.

use authd_schemas::{ModeDescriptor, PasswordResetPolicy};
use authd_session::SessionRecord;

const RESET_MODE_IDS: [&str; 2] = ["mandatoryreset", "optionalreset"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscoveryError {
    /// The session is in its mandatory reset step but the backend produced
    /// no newpassword-derived candidate to offer.
    MustResetButNoModeProvided,
}

impl std::fmt::Display for DiscoveryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DiscoveryError::MustResetButNoModeProvided => {
                write!(f, "password reset is mandatory but no reset mode is available")
            }
        }
    }
}

impl std::error::Error for DiscoveryError {}

/// Apply the shared filter/sort pipeline to a backend's raw candidates.
///
/// Order matters: the reset step wholesale-replaces the catalog with
/// reset-derived modes (an MFA step that also happens to be the reset step
/// never sees its non-reset candidates), and only after that does the
/// accepted-id intersection and final sort apply.
pub fn filter_and_sort_modes(
    candidates: Vec<ModeDescriptor>,
    session: &SessionRecord,
    preferred_mode: Option<&str>,
) -> Result<Vec<ModeDescriptor>, DiscoveryError> {
    let mut working = if session.is_reset_step() && session.current_auth_step >= 2 {
        candidates
            .into_iter()
            .filter(|m| RESET_MODE_IDS.contains(&m.id.as_str()))
            .collect::<Vec<_>>()
    } else {
        let mut non_reset = candidates
            .into_iter()
            .filter(|m| !RESET_MODE_IDS.contains(&m.id.as_str()))
            .collect::<Vec<_>>();
        if session.is_mfa_step() {
            non_reset.retain(|m| m.is_mfa && Some(m.id.as_str()) != session.current_auth_mode.as_deref());
        }
        non_reset
    };

    if session.is_reset_step()
        && session.current_auth_step >= 2
        && working.is_empty()
        && session.password_reset_policy == PasswordResetPolicy::Mandatory
    {
        return Err(DiscoveryError::MustResetButNoModeProvided);
    }

    if let Some(accepted) = &session.accepted_auth_mode_ids {
        working.retain(|m| accepted.contains(&m.id));
    }

    working.sort_by(|a, b| rank(a, preferred_mode).cmp(&rank(b, preferred_mode)));

    Ok(working)
}

/// `password` always sorts first, the caller's last-successful mode (if any,
/// and not `password`) sorts second, everything else falls back to
/// lexicographic order by id.
fn rank<'a>(mode: &'a ModeDescriptor, preferred_mode: Option<&str>) -> (u8, &'a str) {
    if mode.id == "password" {
        (0, mode.id.as_str())
    } else if preferred_mode == Some(mode.id.as_str()) {
        (1, mode.id.as_str())
    } else {
        (2, mode.id.as_str())
    }
}
