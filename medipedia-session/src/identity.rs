//! Role derivation
//!
//! Every role decision goes through [`derive_role`], so the mock and remote
//! validators cannot disagree about who is an administrator.

use medipedia_core::{Role, Session};

/// Map an email to its role: the reserved administrator address is `Admin`,
/// everything else is `User`. Comparison ignores ASCII case and surrounding
/// whitespace.
pub fn derive_role(email: &str, admin_email: &str) -> Role {
    if email.trim().eq_ignore_ascii_case(admin_email.trim()) {
        Role::Admin
    } else {
        Role::User
    }
}

/// Loose shape check used by the mock validator
pub fn is_plausible_email(email: &str) -> bool {
    email.contains('@')
}

/// Build the session for an accepted login
pub fn session_for(id: impl Into<String>, email: &str, admin_email: &str) -> Session {
    Session {
        id: id.into(),
        email: email.to_string(),
        role: derive_role(email, admin_email),
    }
}
