//! Admin dashboard controller
//!
//! Admission goes through [`RoleGate`]; the dashboard owns the admin chat
//! and a document library so stats can be computed from what it has seen.

use chrono::{DateTime, Duration, Utc};
use medipedia_core::{
    AccountGateway, Credentials, DocumentRepository, FailureReason, QueryGateway, RequestOutcome,
    Role, Session,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use crate::chat::{ChatAudience, ChatController};
use crate::documents::DocumentLibrary;
use crate::role_gate::{AccessDenied, RoleGate};
use crate::view_state::{Flash, RequestState};

pub const USER_ADDED_MESSAGE: &str = "User added successfully!";
pub const MISSING_FIELDS_MESSAGE: &str = "Email and password are required";
/// Uploads newer than this count as recent
pub const RECENT_UPLOAD_DAYS: i64 = 7;

/// Account shown in the admin roster
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: String,
    pub email: String,
    pub role: Role,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardStats {
    pub total_documents: usize,
    pub total_users: usize,
    pub total_queries: usize,
    pub recent_uploads: usize,
}

pub struct AdminDashboard {
    session: Session,
    accounts: Arc<dyn AccountGateway>,
    users: Vec<UserRecord>,
    chat: ChatController,
    library: DocumentLibrary,
    state: RequestState,
    flash: Option<Flash>,
}

impl AdminDashboard {
    /// Open the dashboard for an admin session
    pub fn open(
        session: Option<&Session>,
        accounts: Arc<dyn AccountGateway>,
        documents: Arc<dyn DocumentRepository>,
        queries: Arc<dyn QueryGateway>,
    ) -> Result<Self, AccessDenied> {
        let session = RoleGate::require(session, Role::Admin)?.clone();

        // The roster starts with the signed-in administrator
        let users = vec![UserRecord {
            id: session.id.clone(),
            email: session.email.clone(),
            role: Role::Admin,
            created_at: None,
        }];

        info!(email = %session.email, "Admin dashboard opened");

        Ok(Self {
            session,
            accounts,
            users,
            chat: ChatController::new(queries, ChatAudience::Admin),
            library: DocumentLibrary::new(documents),
            state: RequestState::Idle,
            flash: None,
        })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn users(&self) -> &[UserRecord] {
        &self.users
    }

    pub fn chat(&mut self) -> &mut ChatController {
        &mut self.chat
    }

    pub fn library(&mut self) -> &mut DocumentLibrary {
        &mut self.library
    }

    pub fn state(&self) -> &RequestState {
        &self.state
    }

    pub fn flash(&self) -> Option<&Flash> {
        self.flash.as_ref()
    }

    /// Ask a question from the admin chat tab
    pub async fn ask(&mut self, text: &str) -> crate::chat::ChatTurn {
        self.chat.send(Some(&self.session), text).await
    }

    /// Register an account through `/signup` and add it to the roster.
    ///
    /// `role` is recorded locally only; the backend decides nothing about it.
    pub async fn add_user(
        &mut self,
        email: &str,
        password: &str,
        role: Role,
    ) -> RequestOutcome<UserRecord> {
        self.flash = None;
        let email = email.trim();
        if email.is_empty() || password.is_empty() {
            self.flash = Some(Flash::error(MISSING_FIELDS_MESSAGE));
            return RequestOutcome::failed(FailureReason::InvalidRequest, MISSING_FIELDS_MESSAGE);
        }

        self.state = RequestState::Loading;
        let outcome = self
            .accounts
            .signup(&Credentials::new(email, password))
            .await
            .map(|_| UserRecord {
                id: email.to_string(),
                email: email.to_string(),
                role,
                created_at: Some(Utc::now()),
            });
        self.state = RequestState::settle(&outcome);

        match &outcome {
            RequestOutcome::Ok(user) => {
                info!(email = %user.email, role = %user.role, "User added");
                self.users.push(user.clone());
                self.flash = Some(Flash::success(USER_ADDED_MESSAGE));
            }
            RequestOutcome::Failed(failure) => {
                self.flash = Some(Flash::from(failure));
            }
        }
        outcome
    }

    /// Refresh the library, then summarize
    pub async fn refresh_stats(&mut self) -> DashboardStats {
        self.library.refresh().await;
        self.stats()
    }

    /// Summary from the last refreshed library, the roster and the admin chat
    pub fn stats(&self) -> DashboardStats {
        let cutoff = Utc::now() - Duration::days(RECENT_UPLOAD_DAYS);
        let documents = self.library.documents();

        DashboardStats {
            total_documents: documents.len(),
            total_users: self.users.len(),
            total_queries: self.chat.history().len(),
            recent_uploads: documents
                .iter()
                .filter(|doc| doc.uploaded_at.is_some_and(|at| at >= cutoff))
                .count(),
        }
    }
}
