//! MediPedia App - view-state controllers
//!
//! Rendering-free controllers for the MediPedia pages. Each one owns its view
//! state and talks to the backend only through the `medipedia-core` traits:
//!
//! - [`ChatController`]: question/answer transcript with loading placeholder
//! - [`DocumentLibrary`]: browse, search, filter, upload and delete
//! - [`QueryAssistant`] and friends: templates, suggestions, autocomplete
//! - [`AdminDashboard`]: roster, stats and admin chat behind [`RoleGate`]

pub mod admin;
pub mod assistant;
pub mod chat;
pub mod documents;
pub mod role_gate;
pub mod view_state;

pub use admin::{AdminDashboard, DashboardStats, UserRecord};
pub use assistant::{
    autocomplete, categories, smart_suggestions, templates_in, QueryAssistant, QueryTemplate,
    SmartSuggestion,
};
pub use chat::{format_answer, related_queries, ChatAudience, ChatController, ChatTurn};
pub use documents::{
    category_label, describe, file_type, format_file_size, format_uploaded_at, DocumentLibrary,
    CATEGORIES,
};
pub use role_gate::{AccessDenied, RoleGate};
pub use view_state::{Flash, FlashKind, RequestState};
