//! Where an item came from, and the per-user domain helper.

use serde::{Deserialize, Serialize};

/// Presentation metadata for the system an item was fetched from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceInfo {
    pub name: String,
    pub logo: String,
    pub is_completable: bool,
    pub is_replyable: bool,
}

impl SourceInfo {
    fn known(name: &str, logo: &str, is_completable: bool, is_replyable: bool) -> Self {
        Self {
            name: name.to_string(),
            logo: logo.to_string(),
            is_completable,
            is_replyable,
        }
    }

    pub fn google_calendar() -> Self {
        Self::known("Google Calendar", "/images/gcal.svg", false, false)
    }

    pub fn gmail() -> Self {
        Self::known("Gmail", "/images/gmail.svg", true, true)
    }

    pub fn jira() -> Self {
        Self::known("Jira", "/images/jira.svg", true, false)
    }

    pub fn slack() -> Self {
        Self::known("Slack", "/images/slack.svg", true, true)
    }

    pub fn asana() -> Self {
        Self::known("Asana", "/images/asana.svg", true, false)
    }

    /// Look up a known source by display name.
    ///
    /// `"google"` is accepted as an alias for Gmail so the same table can be
    /// used for account-level source names.
    pub fn by_name(name: &str) -> Option<Self> {
        match name {
            "Google Calendar" => Some(Self::google_calendar()),
            "Gmail" | "google" => Some(Self::gmail()),
            "Jira" => Some(Self::jira()),
            "Slack" => Some(Self::slack()),
            "Asana" => Some(Self::asana()),
            _ => None,
        }
    }
}

impl Default for SourceInfo {
    fn default() -> Self {
        Self::known("Unknown", "", false, false)
    }
}

/// Domain part of an email address, lowercased.
///
/// Returns an empty string when the address has no `@`.
pub fn extract_email_domain(email: &str) -> String {
    match email.trim().rsplit_once('@') {
        Some((_, domain)) => domain.to_ascii_lowercase(),
        None => String::new(),
    }
}
