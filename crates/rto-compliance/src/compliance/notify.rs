use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Outbound notice hook (WhatsApp, SMS or e-mail adapters).
pub trait NoticePublisher: Send + Sync {
    fn publish(&self, notice: ComplianceNotice) -> Result<(), NoticeError>;
}

/// Template-addressed notice payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplianceNotice {
    pub template: NoticeTemplate,
    pub recipient: String,
    pub details: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeTemplate {
    DlReadyReminder,
    DocumentExpiry,
}

impl NoticeTemplate {
    pub const fn label(self) -> &'static str {
        match self {
            Self::DlReadyReminder => "dl_ready_reminder",
            Self::DocumentExpiry => "document_expiry",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum NoticeError {
    #[error("notice transport unavailable: {0}")]
    Transport(String),
}

/// Country-code prefixed recipient; the stored mobiles are national numbers.
pub fn international_mobile(mobile: &str) -> String {
    let digits: String = mobile.chars().filter(char::is_ascii_digit).collect();
    format!("91{digits}")
}
