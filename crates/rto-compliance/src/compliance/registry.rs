use chrono::{Days, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize};

use super::domain::{LlRegistryEntry, RegistryId};
use super::eligibility::{dl_eligibility_cutoff, is_dl_eligible};
use crate::store::{DateFilter, RegistryQuery, TextMatch};

/// Days covered by the "expires in the next month" shortcut.
pub const EXPIRES_IN_MONTH_DAYS: u64 = 30;

/// Listing filters as submitted by the registry screen.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RegistryFilter {
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default, alias = "show_unpaid")]
    pub show_unpaid_only: bool,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub expiry_from: Option<NaiveDate>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub expiry_to: Option<NaiveDate>,
    #[serde(default, alias = "cross_31_days")]
    pub crossed_31_days: bool,
    #[serde(default)]
    pub expires_in_month: bool,
    #[serde(default)]
    pub page: Option<usize>,
}

impl RegistryFilter {
    /// Resolves the relative shortcuts against `today`. Combined filters
    /// intersect.
    pub fn to_query(&self, today: NaiveDate) -> RegistryQuery {
        let mut end = DateFilter {
            on_or_after: self.expiry_from,
            on_or_before: self.expiry_to,
        };
        if self.expires_in_month {
            end = end.and(DateFilter {
                on_or_after: Some(today),
                on_or_before: Some(
                    today
                        .checked_add_days(Days::new(EXPIRES_IN_MONTH_DAYS))
                        .unwrap_or(NaiveDate::MAX),
                ),
            });
        }

        let start = if self.crossed_31_days {
            DateFilter::on_or_before(dl_eligibility_cutoff(today))
        } else {
            DateFilter::default()
        };

        RegistryQuery {
            text: self.search.as_deref().and_then(TextMatch::new),
            text_includes_given_by: true,
            unpaid_only: self.show_unpaid_only,
            start,
            end,
        }
    }
}

/// Date pickers submit an empty string when cleared.
pub(crate) fn blank_as_none<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => NaiveDate::parse_from_str(value, "%Y-%m-%d")
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

/// Registry entry with its derived payment and eligibility fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegistryRow {
    #[serde(flatten)]
    pub entry: LlRegistryEntry,
    pub balance: i64,
    pub has_due: bool,
    pub dl_ready: bool,
}

impl RegistryRow {
    pub fn new(entry: LlRegistryEntry, today: NaiveDate) -> Self {
        Self {
            balance: entry.balance(),
            has_due: entry.has_due(),
            dl_ready: is_dl_eligible(entry.start_date, today),
            entry,
        }
    }

    pub fn id(&self) -> RegistryId {
        self.entry.id
    }
}
