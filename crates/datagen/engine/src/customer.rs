//! Creation and versioning of customers.

use std::{collections::BTreeMap, sync::Arc};

use bank_datagen_domain::{
    AuditOperation, CustomerId, Timestamps,
    customer::{CustomerAuditRecord, CustomerAuditRecordDissolved, KycStatus},
};
use bank_datagen_store::AuditStore;
use chrono::{DateTime, TimeDelta, Utc};

use crate::{
    error::{DatagenEngineError, DatagenEngineErrorKind},
    fact_source::{RandomFactSource, RandomFactSourceExt},
};

/// Countries whose terms a new customer may have accepted.
pub const HOME_COUNTRY_CODES: [&str; 5] = ["DE", "FR", "ES", "IT", "AU"];

/// KYC states a new customer may start in.
pub const INITIAL_KYC_STATUSES: [KycStatus; 2] = [KycStatus::Pending, KycStatus::Verified];

/// Probability that an update touches any one mutable field.
pub const FIELD_UPDATE_PROBABILITY: f64 = 0.3;

const MIN_AGE: u32 = 18;
const MAX_AGE: u32 = 80;

// a fact source producing the same value this many times in a row is considered degenerate
const MAX_RESAMPLE_ATTEMPTS: usize = 32;

/// Start of 2024, the earliest instant a generated customer is created at by default.
pub fn default_epoch_floor() -> DateTime<Utc> {
    DateTime::UNIX_EPOCH + TimeDelta::seconds(1_704_067_200)
}

#[derive(Debug, Clone, Copy)]
enum MutableField {
    FirstName,
    LastName,
    DateOfBirth,
}

const MUTABLE_FIELDS: [MutableField; 3] =
    [MutableField::FirstName, MutableField::LastName, MutableField::DateOfBirth];

/// Creates customers and derives later versions of existing ones.
pub struct CustomerEntityGenerator<S> {
    facts: Arc<dyn RandomFactSource>,
    store: S,
    epoch_floor: DateTime<Utc>,
}

#[bon::bon]
impl<S> CustomerEntityGenerator<S> {
    /// Creates a generator. `epoch_floor` defaults to [`default_epoch_floor`].
    #[builder]
    pub fn new(
        facts: Arc<dyn RandomFactSource>,
        store: S,
        epoch_floor: Option<DateTime<Utc>>,
    ) -> Self {
        Self { facts, store, epoch_floor: epoch_floor.unwrap_or_else(default_epoch_floor) }
    }
}

impl<S> CustomerEntityGenerator<S>
where
    S: AuditStore,
{
    /// Creates the INSERT record of a brand new customer.
    pub fn create_new(&self) -> Result<CustomerAuditRecord, DatagenEngineError> {
        let created_at =
            self.facts.past_timestamp(self.epoch_floor).map_err(DatagenEngineErrorKind::from)?;

        let date_of_birth =
            self.facts.date_of_birth(MIN_AGE, MAX_AGE).map_err(DatagenEngineErrorKind::from)?;

        let kyc_status =
            self.facts.choose(&INITIAL_KYC_STATUSES).copied().unwrap_or(KycStatus::Pending);

        let home_country_code =
            self.facts.choose(&HOME_COUNTRY_CODES).copied().unwrap_or("DE").to_string();

        let record = CustomerAuditRecord::builder()
            .audit_id(self.facts.fresh_id().into())
            .customer_id(self.facts.fresh_id().into())
            .first_name(self.facts.first_name())
            .last_name(self.facts.last_name())
            .date_of_birth(date_of_birth)
            .kyc_status(kyc_status)
            .home_country_code(home_country_code)
            .timestamps(Timestamps::at(created_at))
            .operation(AuditOperation::Insert)
            .build();

        Ok(record)
    }

    /// Derives the next version of `previous`.
    ///
    /// Identity, creation time and home country are carried over. Each of the first name,
    /// the last name and the date of birth is resampled with probability
    /// [`FIELD_UPDATE_PROBABILITY`], and when none was picked one of them is forced. KYC
    /// status is picked with the same probability but only moves from PENDING to VERIFIED.
    /// A resampled field always differs from its previous value.
    pub fn create_updated(
        &self,
        previous: &CustomerAuditRecord,
    ) -> Result<CustomerAuditRecord, DatagenEngineError> {
        let mut selected = MUTABLE_FIELDS.map(|_| self.facts.chance(FIELD_UPDATE_PROBABILITY));
        let kyc_selected = self.facts.chance(FIELD_UPDATE_PROBABILITY);

        if !selected.contains(&true) {
            let forced = self.facts.pick_index(selected.len()).unwrap_or_default();
            selected[forced] = true;
        }

        let CustomerAuditRecordDissolved {
            customer_id,
            mut first_name,
            mut last_name,
            mut date_of_birth,
            kyc_status,
            home_country_code,
            timestamps,
            ..
        } = previous.clone().dissolve();

        for (field, _) in MUTABLE_FIELDS.iter().zip(selected).filter(|(_, picked)| *picked) {
            match field {
                MutableField::FirstName => {
                    first_name = resample(&first_name, || Ok(self.facts.first_name()))?;
                },
                MutableField::LastName => {
                    last_name = resample(&last_name, || Ok(self.facts.last_name()))?;
                },
                MutableField::DateOfBirth => {
                    date_of_birth = resample(&date_of_birth, || {
                        self.facts.date_of_birth(MIN_AGE, MAX_AGE).map_err(From::from)
                    })?;
                },
            }
        }

        let kyc_status = match kyc_status {
            KycStatus::Pending if kyc_selected => KycStatus::Verified,
            unchanged => unchanged,
        };

        let updated_at = self.facts.now().max(timestamps.updated_at());

        let timestamps = Timestamps::builder()
            .created_at(timestamps.created_at())
            .updated_at(updated_at)
            .build();

        let record = CustomerAuditRecord::builder()
            .audit_id(self.facts.fresh_id().into())
            .customer_id(customer_id)
            .first_name(first_name)
            .last_name(last_name)
            .date_of_birth(date_of_birth)
            .kyc_status(kyc_status)
            .home_country_code(home_country_code)
            .timestamps(timestamps)
            .operation(AuditOperation::Update)
            .build();

        Ok(record)
    }

    /// Returns every customer known to the store with its earliest `created_at`.
    pub async fn latest_known_customers(
        &self,
    ) -> Result<BTreeMap<CustomerId, DateTime<Utc>>, DatagenEngineError> {
        self.store
            .earliest_customer_timestamps()
            .await
            .map_err(DatagenEngineErrorKind::from)
            .map_err(From::from)
    }

    /// Creates `count` new customers and persists them as one batch.
    pub async fn load_initial_data(
        &self,
        count: usize,
    ) -> Result<Vec<CustomerAuditRecord>, DatagenEngineError> {
        let records = (0..count).map(|_| self.create_new()).collect::<Result<Vec<_>, _>>()?;

        if records.is_empty() {
            return Ok(records);
        }

        self.store.insert_customer_batch(&records).await.map_err(DatagenEngineErrorKind::from)?;

        tracing::info!(count = records.len(), "loaded new customers");

        Ok(records)
    }

    /// Updates up to `count` randomly chosen customers and persists the new versions as one
    /// batch.
    ///
    /// A sampled customer without any stored version is skipped.
    pub async fn update_random_customers(
        &self,
        count: usize,
    ) -> Result<Vec<CustomerAuditRecord>, DatagenEngineError> {
        let customer_ids =
            self.store.sample_customer_ids(count).await.map_err(DatagenEngineErrorKind::from)?;

        let mut updates = Vec::with_capacity(customer_ids.len());

        for customer_id in customer_ids {
            let Some(latest) = self
                .store
                .latest_customer_version(customer_id)
                .await
                .map_err(DatagenEngineErrorKind::from)?
            else {
                tracing::warn!(%customer_id, "skipping customer without a stored version");
                continue;
            };

            updates.push(self.create_updated(&latest)?);
        }

        if updates.is_empty() {
            return Ok(updates);
        }

        self.store.insert_customer_batch(&updates).await.map_err(DatagenEngineErrorKind::from)?;

        tracing::info!(count = updates.len(), "updated customers");

        Ok(updates)
    }
}

fn resample<T, F>(previous: &T, mut draw: F) -> Result<T, DatagenEngineError>
where
    T: PartialEq,
    F: FnMut() -> Result<T, DatagenEngineErrorKind>,
{
    for _ in 0..MAX_RESAMPLE_ATTEMPTS {
        let candidate = draw()?;
        if candidate != *previous {
            return Ok(candidate);
        }
    }

    Err(DatagenEngineErrorKind::other("fact source keeps repeating the previous value").into())
}

#[cfg(test)]
mod tests {
    use bank_datagen_store::MemoryStore;
    use chrono::TimeZone;
    use uuid::Uuid;

    use super::*;
    use crate::fact_source::FakerFactSource;

    fn generator(seed: u64) -> CustomerEntityGenerator<MemoryStore> {
        let facts = FakerFactSource::builder()
            .seed(seed)
            .fixed_now(Utc.with_ymd_and_hms(2025, 6, 30, 12, 0, 0).unwrap())
            .build();

        CustomerEntityGenerator::builder()
            .facts(Arc::new(facts))
            .store(MemoryStore::with_seed(seed))
            .build()
    }

    #[test]
    fn new_customer_is_an_insert_after_the_epoch_floor() {
        let generator = generator(1);

        let record = generator.create_new().unwrap();

        assert_eq!(record.operation(), AuditOperation::Insert);
        assert_eq!(record.created_at(), record.updated_at());
        assert!(record.created_at() >= default_epoch_floor());
        assert!(HOME_COUNTRY_CODES.contains(&record.home_country_code()));
        assert_ne!(record.kyc_status(), KycStatus::Failed);
        assert_ne!(Uuid::from(record.audit_id()), Uuid::from(record.customer_id()));
    }

    #[test]
    fn epoch_floor_in_the_future_is_rejected() {
        let facts = FakerFactSource::builder()
            .seed(3)
            .fixed_now(Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap())
            .build();

        let generator = CustomerEntityGenerator::builder()
            .facts(Arc::new(facts))
            .store(MemoryStore::with_seed(3))
            .build();

        let err = generator.create_new().unwrap_err();
        assert!(matches!(err.kind(), DatagenEngineErrorKind::InvalidRange(_)));
    }

    #[test]
    fn update_keeps_identity_and_moves_forward() {
        let generator = generator(2);
        let previous = generator.create_new().unwrap();

        let updated = generator.create_updated(&previous).unwrap();

        assert_eq!(updated.customer_id(), previous.customer_id());
        assert_eq!(updated.created_at(), previous.created_at());
        assert_eq!(updated.home_country_code(), previous.home_country_code());
        assert_ne!(updated.audit_id(), previous.audit_id());
        assert_eq!(updated.operation(), AuditOperation::Update);
        assert!(updated.updated_at() >= previous.updated_at());
        assert!(!updated.same_mutable_fields(&previous));
    }

    #[test]
    fn verified_and_failed_customers_keep_their_status() {
        let generator = generator(4);
        let seed = generator.create_new().unwrap();

        for status in [KycStatus::Verified, KycStatus::Failed] {
            let CustomerAuditRecordDissolved {
                audit_id,
                customer_id,
                first_name,
                last_name,
                date_of_birth,
                home_country_code,
                timestamps,
                operation,
                ..
            } = seed.clone().dissolve();

            let previous = CustomerAuditRecord::builder()
                .audit_id(audit_id)
                .customer_id(customer_id)
                .first_name(first_name)
                .last_name(last_name)
                .date_of_birth(date_of_birth)
                .kyc_status(status)
                .home_country_code(home_country_code)
                .timestamps(timestamps)
                .operation(operation)
                .build();

            for _ in 0..50 {
                assert_eq!(generator.create_updated(&previous).unwrap().kyc_status(), status);
            }
        }
    }

    #[test]
    fn degenerate_source_is_reported() {
        let err = resample(&1, || Ok(1)).unwrap_err();
        assert!(matches!(err.kind(), DatagenEngineErrorKind::Other(_)));
    }
}
