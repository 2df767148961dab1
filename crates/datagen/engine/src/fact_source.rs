//! Sources of plausible random facts for the generators.
//!
//! Every generator receives its [`RandomFactSource`] explicitly, usually as an
//! `Arc<dyn RandomFactSource>` shared by all generators of one run. Seeding the source
//! makes a whole run reproducible, ids included.

use core::ops::RangeInclusive;

use std::{
    borrow::Cow,
    sync::{Mutex, MutexGuard, PoisonError},
};

use chrono::{DateTime, Months, NaiveDate, SubsecRound, TimeDelta, Utc};
use fake::{
    Fake,
    faker::name::en::{FirstName, LastName},
};
use rand::{Rng, SeedableRng, rngs::StdRng, seq::index};
use uuid::Uuid;

/// A sampling interval that contains no value.
#[derive(Debug, thiserror::Error)]
#[error("invalid range: {0}")]
pub struct InvalidRange(Cow<'static, str>);

impl InvalidRange {
    /// Creates an error describing the empty interval.
    pub fn new<E>(reason: E) -> Self
    where
        Cow<'static, str>: From<E>,
    {
        Self(reason.into())
    }
}

/// Produces the random facts records are built from.
pub trait RandomFactSource: Send + Sync {
    /// The current instant, as seen by this source.
    fn now(&self) -> DateTime<Utc>;

    /// A fresh random (version 4) UUID.
    fn fresh_id(&self) -> Uuid;

    /// A plausible given name.
    fn first_name(&self) -> String;

    /// A plausible family name.
    fn last_name(&self) -> String;

    /// A date of birth such that the age at [`now`](Self::now) is within
    /// `min_age..=max_age` years.
    fn date_of_birth(&self, min_age: u32, max_age: u32) -> Result<NaiveDate, InvalidRange>;

    /// An instant uniformly drawn from `[after, now)`.
    ///
    /// Fails when `after` is not strictly before [`now`](Self::now).
    fn past_timestamp(&self, after: DateTime<Utc>) -> Result<DateTime<Utc>, InvalidRange>;

    /// `true` with probability `p`.
    fn chance(&self, p: f64) -> bool;

    /// A uniformly drawn integer from `range`.
    fn count(&self, range: RangeInclusive<usize>) -> Result<usize, InvalidRange>;

    /// A uniformly drawn monetary amount, in minor units, from `range`.
    fn amount_minor(&self, range: RangeInclusive<i64>) -> Result<i64, InvalidRange>;

    /// A uniformly drawn index below `len`, or `None` when `len` is zero.
    fn pick_index(&self, len: usize) -> Option<usize>;

    /// Up to `amount` distinct indices below `len`, drawn without replacement.
    fn sample_indices(&self, len: usize, amount: usize) -> Vec<usize>;
}

/// Element-level sampling built on [`RandomFactSource::pick_index`] and
/// [`RandomFactSource::sample_indices`].
pub trait RandomFactSourceExt: RandomFactSource {
    /// One element of `items`, or `None` when it is empty.
    fn choose<'a, T>(&self, items: &'a [T]) -> Option<&'a T> {
        self.pick_index(items.len()).and_then(|index| items.get(index))
    }

    /// Up to `amount` distinct elements of `items`, drawn without replacement.
    fn sample<T: Clone>(&self, items: &[T], amount: usize) -> Vec<T> {
        self.sample_indices(items.len(), amount)
            .into_iter()
            .filter_map(|index| items.get(index).cloned())
            .collect()
    }
}

impl<S: RandomFactSource + ?Sized> RandomFactSourceExt for S {}

/// A [`RandomFactSource`] backed by [`fake`] and a [`StdRng`].
///
/// Without a seed the generator is seeded from the operating system. Without a fixed clock
/// [`now`](RandomFactSource::now) reads the system clock, truncated to microseconds.
#[derive(Debug)]
pub struct FakerFactSource {
    rng: Mutex<StdRng>,
    fixed_now: Option<DateTime<Utc>>,
}

#[bon::bon]
impl FakerFactSource {
    /// Creates a fact source.
    #[builder]
    pub fn new(seed: Option<u64>, fixed_now: Option<DateTime<Utc>>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        Self { rng: Mutex::new(rng), fixed_now }
    }
}

impl FakerFactSource {
    fn rng(&self) -> MutexGuard<'_, StdRng> {
        // a poisoned generator is still a valid generator
        self.rng.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl RandomFactSource for FakerFactSource {
    fn now(&self) -> DateTime<Utc> {
        self.fixed_now.unwrap_or_else(|| Utc::now().trunc_subsecs(6))
    }

    fn fresh_id(&self) -> Uuid {
        let bytes: [u8; 16] = self.rng().random();
        uuid::Builder::from_random_bytes(bytes).into_uuid()
    }

    fn first_name(&self) -> String {
        FirstName().fake_with_rng(&mut *self.rng())
    }

    fn last_name(&self) -> String {
        LastName().fake_with_rng(&mut *self.rng())
    }

    fn date_of_birth(&self, min_age: u32, max_age: u32) -> Result<NaiveDate, InvalidRange> {
        if min_age > max_age {
            return Err(InvalidRange::new(format!(
                "minimum age {min_age} exceeds maximum age {max_age}"
            )));
        }

        let today = self.now().date_naive();

        let years_ago = |years: u32| {
            today
                .checked_sub_months(Months::new(years.saturating_mul(12)))
                .ok_or_else(|| InvalidRange::new(format!("{years} years before {today}")))
        };

        let latest = years_ago(min_age)?;
        let earliest = years_ago(max_age.saturating_add(1))? + TimeDelta::days(1);
        let span = (latest - earliest).num_days();

        let offset = self.rng().random_range(0..=span);

        Ok(earliest + TimeDelta::days(offset))
    }

    fn past_timestamp(&self, after: DateTime<Utc>) -> Result<DateTime<Utc>, InvalidRange> {
        let now = self.now();

        if after >= now {
            return Err(InvalidRange::new(format!("[{after}, {now}) is empty")));
        }

        let span = (now - after)
            .num_microseconds()
            .ok_or_else(|| InvalidRange::new(format!("[{after}, {now}) is too wide")))?;

        let offset = self.rng().random_range(0..span.max(1));

        Ok(after + TimeDelta::microseconds(offset))
    }

    fn chance(&self, p: f64) -> bool {
        let p = if p.is_nan() { 0.0 } else { p.clamp(0.0, 1.0) };
        self.rng().random_bool(p)
    }

    fn count(&self, range: RangeInclusive<usize>) -> Result<usize, InvalidRange> {
        if range.is_empty() {
            return Err(InvalidRange::new(format!("{range:?} is empty")));
        }

        Ok(self.rng().random_range(range))
    }

    fn amount_minor(&self, range: RangeInclusive<i64>) -> Result<i64, InvalidRange> {
        if range.is_empty() {
            return Err(InvalidRange::new(format!("{range:?} is empty")));
        }

        Ok(self.rng().random_range(range))
    }

    fn pick_index(&self, len: usize) -> Option<usize> {
        (len > 0).then(|| self.rng().random_range(0..len))
    }

    fn sample_indices(&self, len: usize, amount: usize) -> Vec<usize> {
        index::sample(&mut *self.rng(), len, amount.min(len)).into_vec()
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn source() -> FakerFactSource {
        FakerFactSource::builder()
            .seed(42)
            .fixed_now(Utc.with_ymd_and_hms(2025, 3, 15, 10, 0, 0).unwrap())
            .build()
    }

    #[test]
    fn past_timestamp_stays_in_half_open_interval() {
        let facts = source();
        let after = facts.now() - TimeDelta::seconds(2);

        for _ in 0..500 {
            let sampled = facts.past_timestamp(after).unwrap();
            assert!(sampled >= after && sampled < facts.now());
        }
    }

    #[test]
    fn past_timestamp_rejects_empty_interval() {
        let facts = source();

        assert!(facts.past_timestamp(facts.now()).is_err());
        assert!(facts.past_timestamp(facts.now() + TimeDelta::days(1)).is_err());
    }

    #[test]
    fn date_of_birth_respects_age_bounds() {
        let facts = source();
        let today = facts.now().date_naive();

        for _ in 0..500 {
            let born = facts.date_of_birth(18, 80).unwrap();
            let age = today.years_since(born).unwrap();
            assert!((18..=80).contains(&age), "age {age} out of bounds for {born}");
        }

        assert!(facts.date_of_birth(30, 20).is_err());
    }

    #[test]
    fn seeded_sources_agree() {
        let (a, b) = (source(), source());

        assert_eq!(a.fresh_id(), b.fresh_id());
        assert_eq!(a.first_name(), b.first_name());
        assert_eq!(a.date_of_birth(18, 80).unwrap(), b.date_of_birth(18, 80).unwrap());
    }

    #[test]
    fn fresh_ids_are_version_four() {
        assert_eq!(source().fresh_id().get_version_num(), 4);
    }

    #[test]
    fn sample_never_repeats_and_never_exceeds_population() {
        let facts = source();
        let items = [1, 2, 3];

        let mut sampled = facts.sample(&items, 5);
        sampled.sort_unstable();
        assert_eq!(sampled, vec![1, 2, 3]);

        assert!(facts.sample::<i32>(&[], 2).is_empty());
        assert!(facts.choose::<i32>(&[]).is_none());
    }

    #[test]
    fn empty_ranges_are_rejected() {
        let facts = source();

        #[allow(clippy::reversed_empty_ranges)]
        let empty = 3..=1;
        assert!(facts.count(empty).is_err());
        assert_eq!(facts.count(2..=2).unwrap(), 2);
    }
}
