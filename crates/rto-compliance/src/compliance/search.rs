//! Staff-wide lookup across registry entries, citizens, licenses and
//! vehicles, flattened into display cards.

use std::collections::HashSet;

use serde::Serialize;
use tracing::{debug, warn};

use super::domain::CitizenId;
use super::scope::Scope;
use crate::store::{
    CitizenQuery, LicenseQuery, RecordStore, RegistryQuery, StoreError, TextMatch, VehicleQuery,
};

pub const MIN_QUERY_CHARS: usize = 2;

const UNKNOWN_HOLDER: &str = "Unknown";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResultCard {
    pub unique_key: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub title: String,
    pub description: String,
    pub url: String,
}

/// Runs every source in display order, each capped at `limit`. A failing
/// source query fails the search; a failing holder lookup only degrades
/// the card.
pub fn search_all<S: RecordStore>(
    store: &S,
    needle: &TextMatch,
    limit: usize,
) -> Result<Vec<ResultCard>, StoreError> {
    let mut cards = Vec::new();

    let registry = RegistryQuery {
        text: Some(needle.clone()),
        ..RegistryQuery::default()
    };
    for entry in store.registry_entries(&registry, Some(limit))? {
        let mut title = entry.name.clone();
        if let Some(application_no) = &entry.application_no {
            title.push_str(&format!(" (App: {application_no})"));
        }
        let mut description = format!("Mobile: {}", entry.mobile);
        if let Some(ll_no) = &entry.ll_no {
            description.push_str(&format!(" | LL: {ll_no}"));
        }
        cards.push(ResultCard {
            unique_key: format!("ll-reg-{}", entry.id),
            kind: "LL Registry",
            title,
            description,
            url: "/ll-registry".to_string(),
        });
    }

    let citizens = CitizenQuery::scoped(Scope::Unrestricted)
        .matching(needle.clone())
        .limit(limit);
    for citizen in store.citizens(&citizens)? {
        cards.push(ResultCard {
            unique_key: format!("citizen-{}", citizen.id),
            kind: "Citizen Profile",
            title: citizen.name,
            description: format!("Mobile: {}", citizen.mobile),
            url: format!("/citizens/{}", citizen.id),
        });
    }

    let licenses = LicenseQuery::scoped(Scope::Unrestricted)
        .matching(needle.clone())
        .limit(limit);
    for license in store.learner_licenses(&licenses)? {
        cards.push(ResultCard {
            unique_key: format!("ll-{}", license.id),
            kind: "Learner License (Old)",
            title: license_title(license.ll_no.as_deref(), license.application_no.as_deref()),
            description: format!("Holder: {}", holder_name(store, license.citizen_id)),
            url: format!("/citizens/{}", license.citizen_id),
        });
    }
    for license in store.driving_licenses(&licenses)? {
        cards.push(ResultCard {
            unique_key: format!("dl-{}", license.id),
            kind: "Driving License",
            title: license_title(license.dl_no.as_deref(), license.application_no.as_deref()),
            description: format!("Holder: {}", holder_name(store, license.citizen_id)),
            url: format!("/citizens/{}", license.citizen_id),
        });
    }

    let vehicles = VehicleQuery::scoped(Scope::Unrestricted)
        .matching(needle.clone())
        .limit(limit);
    for vehicle in store.vehicles(&vehicles)? {
        cards.push(ResultCard {
            unique_key: format!("vehicle-{}", vehicle.id),
            kind: "Vehicle",
            description: format!("Owner: {}", holder_name(store, vehicle.citizen_id)),
            title: vehicle.registration_no,
            url: format!("/citizens/{}", vehicle.citizen_id),
        });
    }

    let cards = dedupe_cards(cards);
    debug!(needle = needle.as_str(), hits = cards.len(), "global search completed");
    Ok(cards)
}

/// Keeps the first card for each `unique_key`, preserving order.
pub fn dedupe_cards(cards: Vec<ResultCard>) -> Vec<ResultCard> {
    let mut seen = HashSet::new();
    cards
        .into_iter()
        .filter(|card| seen.insert(card.unique_key.clone()))
        .collect()
}

fn license_title(number: Option<&str>, application_no: Option<&str>) -> String {
    let mut title = number.unwrap_or_default().to_string();
    if let Some(application_no) = application_no {
        title.push_str(" / ");
        title.push_str(application_no);
    }
    title
}

fn holder_name<S: RecordStore>(store: &S, citizen: CitizenId) -> String {
    match store.citizen(citizen, &Scope::Unrestricted) {
        Ok(Some(holder)) => holder.name,
        Ok(None) => {
            warn!(%citizen, "search hit references a missing citizen");
            UNKNOWN_HOLDER.to_string()
        }
        Err(error) => {
            warn!(%citizen, %error, "holder lookup failed during search");
            UNKNOWN_HOLDER.to_string()
        }
    }
}
