//! Driving-license eligibility over the two learner-license sources.
//!
//! The legacy table hangs off citizen profiles and is dated by `issue_date`;
//! the registry is a free-standing ledger dated by `start_date`. The two
//! share no key, so they are combined by summing counts and concatenating
//! rows, never by joining.

use chrono::{Days, NaiveDate};
use serde::Serialize;
use tracing::debug;

use super::domain::CitizenId;
use super::scope::Scope;
use crate::store::{CitizenQuery, DateFilter, LicenseQuery, RecordStore, RegistryQuery, StoreError};

/// Mandatory learner-license holding period before a driving-license test.
pub const DL_HOLDING_PERIOD_DAYS: u64 = 31;

/// Latest reference date that still qualifies for conversion on `today`.
pub fn dl_eligibility_cutoff(today: NaiveDate) -> NaiveDate {
    today
        .checked_sub_days(Days::new(DL_HOLDING_PERIOD_DAYS))
        .unwrap_or(NaiveDate::MIN)
}

pub fn is_dl_eligible(reference: Option<NaiveDate>, today: NaiveDate) -> bool {
    reference
        .map(|date| date <= dl_eligibility_cutoff(today))
        .unwrap_or(false)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LicenseSource {
    Legacy,
    Registry,
}

impl LicenseSource {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Legacy => "Learner License (Old)",
            Self::Registry => "LL Registry",
        }
    }
}

/// A learner past the holding period, from either source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EligibleLearner {
    pub source: LicenseSource,
    pub record_id: u64,
    pub holder: Option<String>,
    pub mobile: Option<String>,
    pub ll_no: Option<String>,
    pub application_no: Option<String>,
    pub reference_date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub citizen_id: Option<CitizenId>,
}

/// One place learner licenses are recorded.
pub trait LicenseEligibilitySource {
    fn source(&self) -> LicenseSource;

    fn count_eligible(&self, scope: &Scope, today: NaiveDate) -> Result<u64, StoreError>;

    fn eligible(&self, scope: &Scope, today: NaiveDate)
        -> Result<Vec<EligibleLearner>, StoreError>;
}

/// Learner licenses recorded against citizen profiles. Scoped through the
/// owning citizen.
pub struct LegacyLearnerLicenses<'a, S> {
    store: &'a S,
}

impl<'a, S: RecordStore> LegacyLearnerLicenses<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    fn query(scope: &Scope, today: NaiveDate) -> LicenseQuery {
        LicenseQuery::scoped(*scope).issued(DateFilter::on_or_before(dl_eligibility_cutoff(today)))
    }
}

impl<S: RecordStore> LicenseEligibilitySource for LegacyLearnerLicenses<'_, S> {
    fn source(&self) -> LicenseSource {
        LicenseSource::Legacy
    }

    fn count_eligible(&self, scope: &Scope, today: NaiveDate) -> Result<u64, StoreError> {
        self.store.count_learner_licenses(&Self::query(scope, today))
    }

    fn eligible(
        &self,
        scope: &Scope,
        today: NaiveDate,
    ) -> Result<Vec<EligibleLearner>, StoreError> {
        let licenses = self.store.learner_licenses(&Self::query(scope, today))?;
        let mut rows = Vec::with_capacity(licenses.len());

        for license in licenses {
            let Some(reference_date) = license.issue_date else {
                continue;
            };
            let holder = self
                .store
                .citizens(&CitizenQuery::scoped(Scope::Unrestricted).with_id(license.citizen_id))?
                .into_iter()
                .next();

            rows.push(EligibleLearner {
                source: LicenseSource::Legacy,
                record_id: license.id.0,
                holder: holder.as_ref().map(|citizen| citizen.name.clone()),
                mobile: holder.map(|citizen| citizen.mobile),
                ll_no: license.ll_no,
                application_no: license.application_no,
                reference_date,
                citizen_id: Some(license.citizen_id),
            });
        }

        Ok(rows)
    }
}

/// The registry ledger. It has no owner relationship, so the scope argument
/// is ignored and every entry counts.
pub struct LearnerRegistry<'a, S> {
    store: &'a S,
}

impl<'a, S: RecordStore> LearnerRegistry<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    fn query(today: NaiveDate) -> RegistryQuery {
        RegistryQuery {
            start: DateFilter::on_or_before(dl_eligibility_cutoff(today)),
            ..RegistryQuery::default()
        }
    }
}

impl<S: RecordStore> LicenseEligibilitySource for LearnerRegistry<'_, S> {
    fn source(&self) -> LicenseSource {
        LicenseSource::Registry
    }

    fn count_eligible(&self, _scope: &Scope, today: NaiveDate) -> Result<u64, StoreError> {
        self.store.count_registry_entries(&Self::query(today))
    }

    fn eligible(
        &self,
        _scope: &Scope,
        today: NaiveDate,
    ) -> Result<Vec<EligibleLearner>, StoreError> {
        let entries = self.store.registry_entries(&Self::query(today), None)?;
        Ok(entries
            .into_iter()
            .filter_map(|entry| {
                let reference_date = entry.start_date?;
                Some(EligibleLearner {
                    source: LicenseSource::Registry,
                    record_id: entry.id.0,
                    holder: Some(entry.name),
                    mobile: Some(entry.mobile),
                    ll_no: entry.ll_no,
                    application_no: entry.application_no,
                    reference_date,
                    citizen_id: None,
                })
            })
            .collect())
    }
}

/// Sums counts and concatenates rows across sources, in source order. No
/// deduplication: the populations are disjoint by construction.
pub struct DualSourceMerger<'a> {
    sources: Vec<&'a dyn LicenseEligibilitySource>,
}

impl<'a> DualSourceMerger<'a> {
    pub fn new(sources: Vec<&'a dyn LicenseEligibilitySource>) -> Self {
        Self { sources }
    }

    pub fn count_dl_eligible(&self, scope: &Scope, today: NaiveDate) -> Result<u64, StoreError> {
        let mut total = 0;
        for source in &self.sources {
            let count = source.count_eligible(scope, today)?;
            debug!(source = ?source.source(), count, "dl-eligible learners counted");
            total += count;
        }
        Ok(total)
    }

    pub fn list_dl_eligible(
        &self,
        scope: &Scope,
        today: NaiveDate,
    ) -> Result<Vec<EligibleLearner>, StoreError> {
        let mut rows = Vec::new();
        for source in &self.sources {
            rows.extend(source.eligible(scope, today)?);
        }
        Ok(rows)
    }
}

/// Both sources, legacy first.
pub fn count_dl_eligible<S: RecordStore>(
    store: &S,
    scope: &Scope,
    today: NaiveDate,
) -> Result<u64, StoreError> {
    let legacy = LegacyLearnerLicenses::new(store);
    let registry = LearnerRegistry::new(store);
    DualSourceMerger::new(vec![&legacy as &dyn LicenseEligibilitySource, &registry])
        .count_dl_eligible(scope, today)
}

pub fn list_dl_eligible<S: RecordStore>(
    store: &S,
    scope: &Scope,
    today: NaiveDate,
) -> Result<Vec<EligibleLearner>, StoreError> {
    let legacy = LegacyLearnerLicenses::new(store);
    let registry = LearnerRegistry::new(store);
    DualSourceMerger::new(vec![&legacy as &dyn LicenseEligibilitySource, &registry])
        .list_dl_eligible(scope, today)
}
