//! Document library controller

use chrono::{DateTime, Utc};
use medipedia_core::{ActionMessage, Document, DocumentRepository, RequestOutcome, UploadFile};
use std::sync::Arc;
use tracing::{debug, info};

use crate::view_state::{Flash, RequestState};

/// Categories offered by the upload form and the filter
pub const CATEGORIES: [&str; 7] = [
    "general",
    "research",
    "clinical",
    "education",
    "cardiology",
    "neurology",
    "oncology",
];
/// Filter value that matches every category
pub const ALL_CATEGORIES: &str = "all";
pub const DEFAULT_CATEGORY: &str = medipedia_core::DEFAULT_DOCUMENT_CATEGORY;
pub const NO_FILE_MESSAGE: &str = "Please select a file to upload";

/// Human-readable size: `Bytes`, `KB`, `MB` or `GB`, at most two decimals
pub fn format_file_size(bytes: u64) -> String {
    if bytes == 0 {
        return "Unknown size".to_string();
    }
    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];

    let mut exponent = 0;
    while exponent < UNITS.len() - 1 && bytes >= 1024u64.pow(exponent as u32 + 1) {
        exponent += 1;
    }
    let scaled = bytes as f64 / 1024u64.pow(exponent as u32) as f64;
    let rounded = (scaled * 100.0).round() / 100.0;

    format!("{} {}", rounded, UNITS[exponent])
}

/// Upload date as `M/D/YYYY`, or `Recently uploaded` when unknown
pub fn format_uploaded_at(uploaded_at: Option<DateTime<Utc>>) -> String {
    match uploaded_at {
        Some(at) => at.format("%-m/%-d/%Y").to_string(),
        None => "Recently uploaded".to_string(),
    }
}

/// Upper-cased extension of `name`, or `UNKNOWN`
pub fn file_type(name: &str) -> String {
    match name.rsplit_once('.') {
        Some((_, extension)) if !extension.is_empty() => extension.to_uppercase(),
        _ => "UNKNOWN".to_string(),
    }
}

/// One-line description shown in the document details
pub fn describe(document: &Document) -> String {
    format!("Medical document in {} category", document.category)
}

/// `cardiology` -> `Cardiology`
pub fn category_label(category: &str) -> String {
    let mut chars = category.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Browse, filter, upload and delete documents
pub struct DocumentLibrary {
    repository: Arc<dyn DocumentRepository>,
    documents: Vec<Document>,
    search: String,
    category: String,
    state: RequestState,
    flash: Option<Flash>,
}

impl DocumentLibrary {
    pub fn new(repository: Arc<dyn DocumentRepository>) -> Self {
        Self {
            repository,
            documents: Vec::new(),
            search: String::new(),
            category: ALL_CATEGORIES.to_string(),
            state: RequestState::Idle,
            flash: None,
        }
    }

    /// Reload the collection; an unreachable backend shows an empty library
    pub async fn refresh(&mut self) -> &[Document] {
        self.state = RequestState::Loading;
        let outcome = self.repository.list().await;
        self.state = RequestState::settle(&outcome);
        self.documents = outcome.ok().unwrap_or_default();
        debug!(count = self.documents.len(), "Document library refreshed");
        &self.documents
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    pub fn set_search(&mut self, term: impl Into<String>) {
        self.search = term.into();
    }

    /// `all` or one exact category
    pub fn set_category(&mut self, category: impl Into<String>) {
        self.category = category.into();
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    /// Documents matching the search term (name or category, any case) and
    /// the category filter
    pub fn visible(&self) -> Vec<&Document> {
        let term = self.search.trim().to_lowercase();
        self.documents
            .iter()
            .filter(|doc| {
                term.is_empty()
                    || doc.name.to_lowercase().contains(&term)
                    || doc.category.to_lowercase().contains(&term)
            })
            .filter(|doc| self.category == ALL_CATEGORIES || doc.category == self.category)
            .collect()
    }

    /// Text for an empty result list
    pub fn empty_message(&self) -> &'static str {
        if !self.search.trim().is_empty() || self.category != ALL_CATEGORIES {
            "No documents match your filters"
        } else {
            "No documents uploaded yet"
        }
    }

    pub fn state(&self) -> &RequestState {
        &self.state
    }

    pub fn flash(&self) -> Option<&Flash> {
        self.flash.as_ref()
    }

    pub fn clear_flash(&mut self) {
        self.flash = None;
    }

    /// Upload a file; a blank category files it under `general`.
    ///
    /// A missing or empty file is rejected before any request. The library is
    /// refreshed after a successful upload.
    pub async fn upload(
        &mut self,
        file: Option<UploadFile>,
        category: &str,
    ) -> Option<RequestOutcome<ActionMessage>> {
        self.flash = None;
        let Some(file) = file.filter(|f| !f.is_empty()) else {
            self.flash = Some(Flash::error(NO_FILE_MESSAGE));
            return None;
        };
        let category = match category.trim() {
            "" => DEFAULT_CATEGORY,
            category => category,
        };

        info!(file = %file.name, category = %category, "Uploading from library");
        self.state = RequestState::Loading;
        let outcome = self.repository.upload(file, category).await;
        self.apply(&outcome).await;
        Some(outcome)
    }

    /// Delete by name; the library is refreshed after a successful delete
    pub async fn delete(&mut self, document_name: &str) -> RequestOutcome<ActionMessage> {
        self.flash = None;
        self.state = RequestState::Loading;
        let outcome = self.repository.delete(document_name).await;
        self.apply(&outcome).await;
        outcome
    }

    async fn apply(&mut self, outcome: &RequestOutcome<ActionMessage>) {
        match outcome {
            RequestOutcome::Ok(action) => {
                self.flash = Some(Flash::success(action.message.clone()));
                self.refresh().await;
                self.state = RequestState::Succeeded;
            }
            RequestOutcome::Failed(failure) => {
                self.flash = Some(Flash::from(failure));
                self.state = RequestState::settle(outcome);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn doc(name: &str, category: &str) -> Document {
        Document {
            name: name.to_string(),
            size: 1024,
            uploaded_at: None,
            category: category.to_string(),
        }
    }

    #[test]
    fn file_sizes_are_scaled() {
        assert_eq!(format_file_size(0), "Unknown size");
        assert_eq!(format_file_size(512), "512 Bytes");
        assert_eq!(format_file_size(1024), "1 KB");
        assert_eq!(format_file_size(1536), "1.5 KB");
        assert_eq!(format_file_size(2_621_440), "2.5 MB");
        assert_eq!(format_file_size(1_234_567), "1.18 MB");
        assert_eq!(format_file_size(5 * 1024 * 1024 * 1024 * 1024), "5120 GB");
    }

    #[test]
    fn upload_dates_and_types() {
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 10, 15, 0).unwrap();
        assert_eq!(format_uploaded_at(Some(at)), "3/1/2024");
        assert_eq!(format_uploaded_at(None), "Recently uploaded");

        assert_eq!(file_type("guidelines.v2.pdf"), "PDF");
        assert_eq!(file_type("README"), "UNKNOWN");
        assert_eq!(file_type("trailing."), "UNKNOWN");
    }

    #[test]
    fn labels_and_descriptions() {
        assert_eq!(category_label("oncology"), "Oncology");
        assert_eq!(category_label(""), "");
        assert_eq!(
            describe(&doc("a.pdf", "clinical")),
            "Medical document in clinical category"
        );
    }

    struct NoBackend;

    #[async_trait::async_trait]
    impl DocumentRepository for NoBackend {
        async fn try_list(&self) -> RequestOutcome<Vec<Document>> {
            RequestOutcome::Ok(Vec::new())
        }

        async fn upload(&self, _file: UploadFile, _category: &str) -> RequestOutcome<ActionMessage> {
            RequestOutcome::Ok(ActionMessage::new("unexpected"))
        }

        async fn delete(&self, _name: &str) -> RequestOutcome<ActionMessage> {
            RequestOutcome::Ok(ActionMessage::new("unexpected"))
        }
    }

    #[test]
    fn search_and_category_filters_combine() {
        let mut library = DocumentLibrary::new(Arc::new(NoBackend));
        library.documents = vec![
            doc("Heart-Failure.pdf", "cardiology"),
            doc("stroke.pdf", "neurology"),
            doc("ecg-basics.pdf", "cardiology"),
        ];

        library.set_search("CARDIO");
        assert_eq!(library.visible().len(), 2);

        library.set_search("heart");
        assert_eq!(library.visible()[0].name, "Heart-Failure.pdf");

        library.set_search("");
        library.set_category("neurology");
        assert_eq!(library.visible().len(), 1);
        assert_eq!(library.empty_message(), "No documents match your filters");

        library.set_category("oncology");
        assert!(library.visible().is_empty());
    }

    #[tokio::test]
    async fn missing_file_is_rejected_locally() {
        let mut library = DocumentLibrary::new(Arc::new(NoBackend));

        assert!(library.upload(None, "general").await.is_none());
        assert_eq!(library.flash(), Some(&Flash::error(NO_FILE_MESSAGE)));

        let empty = UploadFile::new("empty.pdf", Vec::new());
        assert!(library.upload(Some(empty), "general").await.is_none());
    }
}
