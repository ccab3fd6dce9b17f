//! Document collection client

use async_trait::async_trait;
use medipedia_core::{
    ActionMessage, Document, DocumentRepository, Failure, FailureReason, RequestOutcome,
    UploadFile,
};
use reqwest::Method;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, warn};

use crate::http::{FormPart, HttpClient};

pub const UPLOAD_SUCCESS_MESSAGE: &str = "Document uploaded successfully!";
pub const UPLOAD_FAILURE_MESSAGE: &str = "Failed to upload document. Please try again.";
pub const DELETE_SUCCESS_MESSAGE: &str = "Document deleted successfully!";
pub const DELETE_FAILURE_MESSAGE: &str = "Failed to delete document. Please try again.";
pub const LIST_FAILURE_MESSAGE: &str = "Failed to fetch documents";

/// `{message}` body returned by upload and delete
#[derive(Debug, Default, Deserialize)]
struct MessageBody {
    message: Option<String>,
}

/// [`DocumentRepository`] over the backend REST surface
pub struct HttpDocumentRepository {
    http: Arc<HttpClient>,
}

impl HttpDocumentRepository {
    pub fn new(http: Arc<HttpClient>) -> Self {
        Self { http }
    }

    pub fn http(&self) -> &HttpClient {
        &self.http
    }

    /// Path of a single document; the name is percent-encoded
    pub fn document_path(document_name: &str) -> String {
        format!("documents/{}", urlencoding::encode(document_name))
    }

    /// Send a mutating request and reduce the reply to an [`ActionMessage`].
    ///
    /// Any failure is replaced by `failure_message`; the transport error is logged only.
    async fn mutate(
        &self,
        request: crate::http::HttpRequest,
        success_message: &str,
        failure_message: &str,
    ) -> RequestOutcome<ActionMessage> {
        match self.http.execute(request).await {
            RequestOutcome::Ok(response) => {
                // A 2xx without a readable body still counts as success
                let body: MessageBody = response.json().unwrap_or_default();
                RequestOutcome::Ok(ActionMessage::new(
                    body.message
                        .filter(|m| !m.is_empty())
                        .unwrap_or_else(|| success_message.to_string()),
                ))
            }
            RequestOutcome::Failed(failure) => {
                RequestOutcome::Failed(failure.with_message(failure_message))
            }
        }
    }
}

#[async_trait]
impl DocumentRepository for HttpDocumentRepository {
    async fn try_list(&self) -> RequestOutcome<Vec<Document>> {
        let request = self
            .http
            .request(Method::GET, "documents")
            .header("accept", "application/json");

        let response = match self.http.execute(request).await {
            RequestOutcome::Ok(response) => response,
            RequestOutcome::Failed(failure) => {
                return RequestOutcome::Failed(failure.with_message(LIST_FAILURE_MESSAGE))
            }
        };

        match response.json::<Vec<Document>>() {
            Ok(documents) => {
                info!(count = documents.len(), "Fetched documents");
                RequestOutcome::Ok(documents)
            }
            Err(error) => {
                error.log();
                RequestOutcome::Failed(Failure::new(
                    FailureReason::ParseError,
                    LIST_FAILURE_MESSAGE,
                ))
            }
        }
    }

    async fn upload(&self, file: UploadFile, category: &str) -> RequestOutcome<ActionMessage> {
        info!(
            file = %file.name,
            size = file.bytes.len(),
            category = %category,
            "Uploading document"
        );

        let request = self.http.request(Method::POST, "upload").multipart(vec![
            FormPart::File {
                name: "file".to_string(),
                file_name: file.name,
                bytes: file.bytes,
            },
            FormPart::Text {
                name: "category".to_string(),
                value: category.to_string(),
            },
        ]);

        let outcome = self
            .mutate(request, UPLOAD_SUCCESS_MESSAGE, UPLOAD_FAILURE_MESSAGE)
            .await;
        if let Some(failure) = outcome.failure() {
            warn!(reason = %failure.reason, "Error uploading document");
        }
        outcome
    }

    async fn delete(&self, document_name: &str) -> RequestOutcome<ActionMessage> {
        info!(document = %document_name, "Deleting document");

        let request = self
            .http
            .request(Method::DELETE, &Self::document_path(document_name))
            .header("accept", "application/json");

        let outcome = self
            .mutate(request, DELETE_SUCCESS_MESSAGE, DELETE_FAILURE_MESSAGE)
            .await;
        if let Some(failure) = outcome.failure() {
            warn!(reason = %failure.reason, document = %document_name, "Error deleting document");
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_names_are_percent_encoded() {
        assert_eq!(
            HttpDocumentRepository::document_path("Cardiology Guidelines/2024?.pdf"),
            "documents/Cardiology%20Guidelines%2F2024%3F.pdf"
        );
    }
}
