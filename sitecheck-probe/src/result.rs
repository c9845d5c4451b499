use serde::{Deserialize, Serialize};

/// Metadata captured from one successful page fetch.
///
/// The three text fields are absent when the page does not carry the tag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeResult {
    pub status_code: u16,
    pub h1: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
}
