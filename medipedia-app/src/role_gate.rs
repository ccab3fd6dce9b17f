//! Role-gated access to dashboards

use medipedia_core::{Role, Session};
use thiserror::Error;

pub const AUTH_ROUTE: &str = "/auth";
pub const ADMIN_DASHBOARD_ROUTE: &str = "/admin/dashboard";
pub const USER_DASHBOARD_ROUTE: &str = "/user/dashboard";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccessDenied {
    #[error("Please log in to continue")]
    NotLoggedIn,

    #[error("This page requires the {required} role")]
    WrongRole { required: Role, actual: Role },
}

impl AccessDenied {
    /// Where the denied visitor should be sent instead
    pub fn redirect(&self) -> &'static str {
        match self {
            AccessDenied::NotLoggedIn => AUTH_ROUTE,
            AccessDenied::WrongRole { actual, .. } => dashboard_for_role(*actual),
        }
    }
}

pub struct RoleGate;

impl RoleGate {
    /// Admit `session` only if it holds `required`
    pub fn require(session: Option<&Session>, required: Role) -> Result<&Session, AccessDenied> {
        let session = session.ok_or(AccessDenied::NotLoggedIn)?;
        if session.role == required {
            Ok(session)
        } else {
            Err(AccessDenied::WrongRole {
                required,
                actual: session.role,
            })
        }
    }

    /// Landing page after login
    pub fn dashboard_for(session: &Session) -> &'static str {
        dashboard_for_role(session.role)
    }
}

fn dashboard_for_role(role: Role) -> &'static str {
    match role {
        Role::Admin => ADMIN_DASHBOARD_ROUTE,
        Role::User => USER_DASHBOARD_ROUTE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(role: Role) -> Session {
        Session {
            id: "1".to_string(),
            email: "x@uol.edu.pk".to_string(),
            role,
        }
    }

    #[test]
    fn require_checks_presence_and_role() {
        let admin = session(Role::Admin);
        let user = session(Role::User);

        assert!(RoleGate::require(Some(&admin), Role::Admin).is_ok());

        let denied = RoleGate::require(Some(&user), Role::Admin).unwrap_err();
        assert_eq!(denied.redirect(), USER_DASHBOARD_ROUTE);

        let denied = RoleGate::require(None, Role::User).unwrap_err();
        assert_eq!(denied, AccessDenied::NotLoggedIn);
        assert_eq!(denied.redirect(), AUTH_ROUTE);
    }

    #[test]
    fn dashboards_follow_role() {
        assert_eq!(
            RoleGate::dashboard_for(&session(Role::Admin)),
            "/admin/dashboard"
        );
        assert_eq!(RoleGate::dashboard_for(&session(Role::User)), "/user/dashboard");
    }
}
