//! Privileged control surface: status listing and manual unblock.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

use crate::guard::{AdmissionGuard, StatusReport};
use crate::security::access_control::{Credential, SharedPolicy};

/// Errors reported by the control surface. Never produced on the admission path.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ControlError {
    /// No credential was presented.
    #[error("Authentication required")]
    Unauthorized,

    /// A credential was presented but is not the administrative principal.
    #[error("Admin access required")]
    Forbidden,

    /// Malformed control input.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

/// Acknowledgement of an unblock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnblockAck {
    pub success: bool,
    pub ip: String,
    /// Whether a block was actually lifted.
    pub was_blocked: bool,
}

#[derive(Clone)]
pub struct ControlSurface {
    guard: Arc<AdmissionGuard>,
    policy: SharedPolicy,
}

impl ControlSurface {
    pub fn new(guard: Arc<AdmissionGuard>, policy: SharedPolicy) -> Self {
        Self { guard, policy }
    }

    /// Trusted-identity check.
    pub fn authorize(&self, credential: Credential<'_>) -> Result<(), ControlError> {
        match credential {
            Credential::Missing => Err(ControlError::Unauthorized),
            Credential::Bearer(token) if self.policy.is_privileged(token) => Ok(()),
            Credential::Bearer(_) | Credential::Unusable => {
                tracing::warn!("Control surface access denied: untrusted credential");
                Err(ControlError::Forbidden)
            }
        }
    }

    pub fn status(&self, credential: Credential<'_>) -> Result<StatusReport, ControlError> {
        self.authorize(credential)?;
        Ok(self.guard.status())
    }

    /// Lift the block on `client`. Succeeds for unknown or unblocked ids.
    pub fn unblock(
        &self,
        credential: Credential<'_>,
        client: Option<&str>,
    ) -> Result<UnblockAck, ControlError> {
        self.authorize(credential)?;

        let client = client
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .ok_or_else(|| ControlError::InvalidRequest("IP address required".to_string()))?;

        let was_blocked = self.guard.unblock(client);
        Ok(UnblockAck {
            success: true,
            ip: client.to_string(),
            was_blocked,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::guard::GuardLimits;
    use crate::security::StaticTokenPolicy;

    fn surface(limits: GuardLimits) -> (ControlSurface, Arc<AdmissionGuard>) {
        let guard = Arc::new(AdmissionGuard::new(limits));
        let policy: SharedPolicy = Arc::new(StaticTokenPolicy::new("admin-token"));
        (ControlSurface::new(guard.clone(), policy), guard)
    }

    #[test]
    fn test_missing_credential_is_unauthorized() {
        let (surface, _) = surface(GuardLimits::default());
        assert_eq!(surface.status(Credential::Missing), Err(ControlError::Unauthorized));
        assert_eq!(
            surface.unblock(Credential::Missing, Some("1.2.3.4")),
            Err(ControlError::Unauthorized)
        );
    }

    #[test]
    fn test_wrong_credential_is_forbidden() {
        let (surface, _) = surface(GuardLimits::default());
        assert_eq!(surface.status(Credential::Bearer("guest")), Err(ControlError::Forbidden));
        assert_eq!(surface.status(Credential::Unusable), Err(ControlError::Forbidden));
    }

    #[test]
    fn test_auth_checked_before_input() {
        let (surface, _) = surface(GuardLimits::default());
        assert_eq!(surface.unblock(Credential::Bearer("guest"), None), Err(ControlError::Forbidden));
    }

    #[test]
    fn test_unblock_requires_id() {
        let (surface, _) = surface(GuardLimits::default());
        assert!(matches!(
            surface.unblock(Credential::Bearer("admin-token"), Some("  ")),
            Err(ControlError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_unblock_lifts_block() {
        let limits = GuardLimits {
            client_max: 1,
            block_threshold: 2,
            ..GuardLimits::default()
        };
        let (surface, guard) = surface(limits);
        for _ in 0..3 {
            guard.check_client("9.9.9.9");
        }
        let report = surface.status(Credential::Bearer("admin-token")).unwrap();
        assert_eq!(report.blocked.len(), 1);

        let ack = surface.unblock(Credential::Bearer("admin-token"), Some("9.9.9.9")).unwrap();
        assert!(ack.success && ack.was_blocked);
        assert!(guard.check_client("9.9.9.9").is_allowed());

        let ack = surface.unblock(Credential::Bearer("admin-token"), Some("never-seen")).unwrap();
        assert!(ack.success && !ack.was_blocked);
    }
}
