//! Core trait definitions
//!
//! Controllers and the session store only see these seams, so backends can be
//! swapped (HTTP, in-memory fakes in tests) without touching view logic.

use crate::error::MedipediaResult;
use crate::types::*;
use async_trait::async_trait;
use tracing::warn;

/// Typed CRUD over the remote document collection
#[async_trait]
pub trait DocumentRepository: Send + Sync {
    /// Fetch the collection, surfacing the typed failure
    async fn try_list(&self) -> RequestOutcome<Vec<Document>>;

    /// Fetch the collection for display.
    ///
    /// Any failure is logged and observed as an empty collection.
    async fn list(&self) -> RequestOutcome<Vec<Document>> {
        match self.try_list().await {
            RequestOutcome::Ok(documents) => RequestOutcome::Ok(documents),
            RequestOutcome::Failed(failure) => {
                warn!(
                    reason = %failure.reason,
                    "Error fetching documents, showing empty collection"
                );
                RequestOutcome::Ok(Vec::new())
            }
        }
    }

    /// Upload a file under a category. Not idempotent.
    async fn upload(&self, file: UploadFile, category: &str) -> RequestOutcome<ActionMessage>;

    /// Delete a document by name
    async fn delete(&self, document_name: &str) -> RequestOutcome<ActionMessage>;
}

/// Sends questions to the remote inference endpoint
#[async_trait]
pub trait QueryGateway: Send + Sync {
    async fn send(&self, user_id: &str, query: &str) -> RequestOutcome<QueryResponse>;
}

/// Account as acknowledged by the backend
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountRecord {
    /// Backend identifier, when the backend returns one
    pub id: Option<String>,
}

/// Account endpoints: registration and server-side credential checks
#[async_trait]
pub trait AccountGateway: Send + Sync {
    /// Register a new account (admin "add user")
    async fn signup(&self, credentials: &Credentials) -> RequestOutcome<ActionMessage>;

    /// Verify credentials against the backend
    async fn authenticate(
        &self,
        credentials: &Credentials,
        action: AuthAction,
    ) -> RequestOutcome<AccountRecord>;
}

/// Authority deciding whether a login attempt succeeds
#[async_trait]
pub trait CredentialValidator: Send + Sync {
    async fn validate(&self, credentials: &Credentials, action: AuthAction)
        -> RequestOutcome<Session>;
}

/// Key/value persistence surface supplied by the host environment
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> MedipediaResult<Option<String>>;

    fn set(&self, key: &str, value: &str) -> MedipediaResult<()>;

    /// Removing an absent key is not an error
    fn remove(&self, key: &str) -> MedipediaResult<()>;
}
