use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Term {
    pub id: String,
    pub kind: String,
    pub title: String,
    pub content: String,
    pub version: String,
    pub is_required: bool,
    pub is_active: bool,
}

pub const TERM_KINDS: [&str; 4] = ["service", "privacy", "marketing", "location"];
