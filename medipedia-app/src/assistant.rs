//! Query assistant: templates, smart suggestions, autocomplete and history

use chrono::{DateTime, Utc};
use medipedia_core::{Document, DEFAULT_DOCUMENT_CATEGORY};
use serde::{Deserialize, Serialize};

pub const MAX_HISTORY: usize = 10;
pub const MAX_SUGGESTIONS: usize = 6;
pub const SUGGESTIONS_PER_CATEGORY: usize = 2;
pub const MAX_COMPLETIONS: usize = 5;
pub const SUGGESTION_CONFIDENCE: f64 = 0.8;

/// Canned question in the template catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QueryTemplate {
    pub id: &'static str,
    pub title: &'static str,
    pub query: &'static str,
    pub category: &'static str,
    pub description: &'static str,
}

pub static TEMPLATES: [QueryTemplate; 10] = [
    QueryTemplate {
        id: "cardio-1",
        title: "Heart Disease Basics",
        query: "What are the main types of heart disease and their symptoms?",
        category: "Cardiology",
        description: "Learn about cardiovascular conditions",
    },
    QueryTemplate {
        id: "cardio-2",
        title: "Hypertension Management",
        query: "How is high blood pressure diagnosed and treated?",
        category: "Cardiology",
        description: "Blood pressure management strategies",
    },
    QueryTemplate {
        id: "neuro-1",
        title: "Neurological Disorders",
        query: "What are common neurological disorders and their treatments?",
        category: "Neurology",
        description: "Brain and nervous system conditions",
    },
    QueryTemplate {
        id: "neuro-2",
        title: "Stroke Prevention",
        query: "What are the risk factors and prevention methods for stroke?",
        category: "Neurology",
        description: "Cerebrovascular health information",
    },
    QueryTemplate {
        id: "general-1",
        title: "Diagnostic Procedures",
        query: "What are common diagnostic tests and when are they used?",
        category: "General Medicine",
        description: "Medical testing and diagnostics",
    },
    QueryTemplate {
        id: "general-2",
        title: "Preventive Care",
        query: "What preventive care measures are recommended by age group?",
        category: "General Medicine",
        description: "Health maintenance guidelines",
    },
    QueryTemplate {
        id: "pharma-1",
        title: "Drug Interactions",
        query: "How do drug interactions occur and how can they be prevented?",
        category: "Pharmacology",
        description: "Medication safety information",
    },
    QueryTemplate {
        id: "pharma-2",
        title: "Antibiotic Resistance",
        query: "What is antibiotic resistance and how can it be addressed?",
        category: "Pharmacology",
        description: "Antimicrobial stewardship",
    },
    QueryTemplate {
        id: "research-1",
        title: "Medical AI Applications",
        query: "How is artificial intelligence being used in medical diagnosis?",
        category: "Medical AI",
        description: "AI in healthcare applications",
    },
    QueryTemplate {
        id: "research-2",
        title: "Clinical Research Methods",
        query: "What are the different types of clinical studies and their purposes?",
        category: "Research",
        description: "Evidence-based medicine principles",
    },
];

/// Question stems offered by autocomplete
pub const COMPLETION_PREFIXES: [&str; 10] = [
    "What is the treatment for",
    "How is diagnosed",
    "What are the symptoms of",
    "What causes",
    "How to prevent",
    "What are the side effects of",
    "How does work",
    "What is the difference between",
    "When should I see a doctor for",
    "What are the risk factors for",
];

/// Template suggested because of what the library contains
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SmartSuggestion {
    pub text: String,
    pub category: String,
    pub confidence: f64,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssistantHistoryEntry {
    pub query: String,
    pub timestamp: DateTime<Utc>,
}

/// Template categories in catalog order
pub fn categories() -> Vec<&'static str> {
    let mut categories: Vec<&'static str> = Vec::new();
    for template in &TEMPLATES {
        if !categories.contains(&template.category) {
            categories.push(template.category);
        }
    }
    categories
}

/// Templates in `category` (exact match), or the whole catalog for `None`
pub fn templates_in(category: Option<&str>) -> Vec<&'static QueryTemplate> {
    TEMPLATES
        .iter()
        .filter(|template| category.map_or(true, |c| template.category == c))
        .collect()
}

/// Suggest templates matching the categories present in `documents`.
///
/// A template matches a document category when either name contains the
/// other, ignoring case. Categories are visited in order of first
/// appearance.
pub fn smart_suggestions(documents: &[Document]) -> Vec<SmartSuggestion> {
    let mut seen: Vec<&str> = Vec::new();
    for document in documents {
        // A blank category would be contained in every template name
        let category = match document.category.trim() {
            "" => DEFAULT_DOCUMENT_CATEGORY,
            category => category,
        };
        if !seen.contains(&category) {
            seen.push(category);
        }
    }

    seen.into_iter()
        .flat_map(|category| {
            let wanted = category.to_lowercase();
            TEMPLATES
                .iter()
                .filter(move |template| {
                    let name = template.category.to_lowercase();
                    name.contains(&wanted) || wanted.contains(&name)
                })
                .take(SUGGESTIONS_PER_CATEGORY)
                .map(move |template| SmartSuggestion {
                    text: template.query.to_string(),
                    category: template.category.to_string(),
                    confidence: SUGGESTION_CONFIDENCE,
                    reason: format!("Based on {} documents in your knowledge base", category),
                })
        })
        .take(MAX_SUGGESTIONS)
        .collect()
}

/// `{prefix} {term}` for every stem containing `term`; nothing for terms of
/// two characters or fewer
pub fn autocomplete(term: &str) -> Vec<String> {
    if term.chars().count() <= 2 {
        return Vec::new();
    }
    let needle = term.to_lowercase();

    COMPLETION_PREFIXES
        .iter()
        .filter(|prefix| prefix.to_lowercase().contains(&needle))
        .map(|prefix| format!("{} {}", prefix, term))
        .take(MAX_COMPLETIONS)
        .collect()
}

/// Remembers the questions picked through the assistant
#[derive(Debug, Default)]
pub struct QueryAssistant {
    history: Vec<AssistantHistoryEntry>,
}

impl QueryAssistant {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a chosen query and hand it back for sending
    pub fn select(&mut self, query: &str) -> String {
        let query = query.trim().to_string();
        self.history.insert(
            0,
            AssistantHistoryEntry {
                query: query.clone(),
                timestamp: Utc::now(),
            },
        );
        self.history.truncate(MAX_HISTORY);
        query
    }

    /// Newest first
    pub fn history(&self) -> &[AssistantHistoryEntry] {
        &self.history
    }
}
