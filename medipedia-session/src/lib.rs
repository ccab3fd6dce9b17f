//! MediPedia Session - who is logged in, and how that survives a restart
//!
//! - [`SessionStore`]: the `Anonymous` / `Authenticated` state machine
//! - [`MockCredentialValidator`], [`RemoteCredentialValidator`]: credential authorities
//! - [`MemoryStore`], [`FileStore`]: key/value persistence surfaces
//! - [`derive_role`]: the single place a role is derived from an email

pub mod credentials;
pub mod identity;
pub mod storage;
pub mod store;

pub use credentials::{build_validator, MockCredentialValidator, RemoteCredentialValidator};
pub use identity::{derive_role, is_plausible_email, session_for};
pub use storage::{FileStore, MemoryStore};
pub use store::{SessionState, SessionStore, AUTH_FAILED_MESSAGE, SESSION_SAVE_FAILED_MESSAGE};
