//! Synthetic access-log generator
//!
//! Every call to [`LogGenerator::generate`] draws a fresh pool of distinct
//! country names and assigns countries from that pool only, so the country
//! distribution changes from batch to batch. A seeded generator reproduces
//! the same sequence of batches.

use chrono::{Duration, Local, NaiveDateTime, Timelike};
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};
use std::net::Ipv4Addr;
use tracing::debug;

use crate::logs::duration::{derive, DurationStrategy};
use crate::models::{Browser, Device, LogRecord, Method, SportsActivity, Status, ENDPOINTS};

/// Upper bound (exclusive) of the random offset from the start instant
pub const DEFAULT_SPAN_SECS: i64 = 100_000;

/// Number of distinct countries drawn per batch
pub const DEFAULT_COUNTRY_POOL_SIZE: usize = 100;

/// Country names the per-batch pool is sampled from
pub const COUNTRY_NAMES: &[&str] = &[
    "Afghanistan", "Albania", "Algeria", "Andorra", "Angola", "Argentina", "Armenia",
    "Australia", "Austria", "Azerbaijan", "Bahamas", "Bahrain", "Bangladesh", "Barbados",
    "Belarus", "Belgium", "Belize", "Benin", "Bhutan", "Bolivia", "Botswana", "Brazil",
    "Brunei", "Bulgaria", "Burkina Faso", "Burundi", "Cambodia", "Cameroon", "Canada",
    "Chad", "Chile", "China", "Colombia", "Comoros", "Costa Rica", "Croatia", "Cuba",
    "Cyprus", "Czechia", "Denmark", "Djibouti", "Dominica", "Ecuador", "Egypt",
    "El Salvador", "Eritrea", "Estonia", "Eswatini", "Ethiopia", "Fiji", "Finland",
    "France", "Gabon", "Gambia", "Georgia", "Germany", "Ghana", "Greece", "Grenada",
    "Guatemala", "Guinea", "Guyana", "Haiti", "Honduras", "Hungary", "Iceland", "India",
    "Indonesia", "Iran", "Iraq", "Ireland", "Israel", "Italy", "Jamaica", "Japan",
    "Jordan", "Kazakhstan", "Kenya", "Kiribati", "Kuwait", "Kyrgyzstan", "Laos",
    "Latvia", "Lebanon", "Lesotho", "Liberia", "Libya", "Lithuania", "Luxembourg",
    "Madagascar", "Malawi", "Malaysia", "Maldives", "Mali", "Malta", "Mauritania",
    "Mauritius", "Mexico", "Moldova", "Monaco", "Mongolia", "Montenegro", "Morocco",
    "Mozambique", "Namibia", "Nepal", "Netherlands", "New Zealand", "Nicaragua", "Niger",
    "Nigeria", "Norway", "Oman", "Pakistan", "Panama", "Paraguay", "Peru", "Philippines",
    "Poland", "Portugal", "Qatar", "Romania", "Rwanda", "Samoa", "Senegal", "Serbia",
    "Singapore", "Slovakia", "Slovenia", "Somalia", "South Africa", "Spain", "Sri Lanka",
    "Sudan", "Sweden", "Switzerland", "Tanzania", "Thailand", "Togo", "Tonga", "Tunisia",
    "Turkey", "Uganda", "Ukraine", "Uruguay", "Uzbekistan", "Vanuatu", "Venezuela",
    "Vietnam", "Yemen", "Zambia", "Zimbabwe",
];

/// Generator settings
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// Reference start instant; `None` means "now" at each batch
    pub start: Option<NaiveDateTime>,
    pub span_secs: i64,
    pub country_pool_size: usize,
    /// Seed for reproducible output; `None` seeds from the OS
    pub seed: Option<u64>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            start: None,
            span_secs: DEFAULT_SPAN_SECS,
            country_pool_size: DEFAULT_COUNTRY_POOL_SIZE,
            seed: None,
        }
    }
}

pub struct LogGenerator {
    config: GeneratorConfig,
    rng: StdRng,
}

impl LogGenerator {
    pub fn new(config: GeneratorConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self { config, rng }
    }

    /// Generate `n` records sorted by timestamp with chronological durations
    pub fn generate(&mut self, n: usize) -> Vec<LogRecord> {
        let start = self.config.start.unwrap_or_else(now_to_second);
        let span = self.config.span_secs.max(1);
        let countries = self.country_pool();

        let mut records: Vec<LogRecord> = (0..n)
            .map(|_| self.random_record(start, span, &countries))
            .collect();

        records.sort_by_key(|record| record.timestamp);
        derive(&mut records, DurationStrategy::Chronological);

        debug!(
            count = records.len(),
            pool = countries.len(),
            "Generated synthetic log batch"
        );
        records
    }

    fn country_pool(&mut self) -> Vec<&'static str> {
        let size = self.config.country_pool_size.clamp(1, COUNTRY_NAMES.len());
        COUNTRY_NAMES
            .choose_multiple(&mut self.rng, size)
            .copied()
            .collect()
    }

    fn random_record(
        &mut self,
        start: NaiveDateTime,
        span: i64,
        countries: &[&'static str],
    ) -> LogRecord {
        let offset = self.rng.random_range(0..span);
        let ip_address = Ipv4Addr::new(
            self.rng.random(),
            self.rng.random(),
            self.rng.random(),
            self.rng.random(),
        );

        LogRecord {
            timestamp: start + Duration::seconds(offset),
            ip_address,
            method: pick(&mut self.rng, &Method::ALL),
            endpoint: pick(&mut self.rng, &ENDPOINTS).to_string(),
            status: pick(&mut self.rng, &Status::ALL),
            country: pick(&mut self.rng, countries).to_string(),
            sports_activity: pick(&mut self.rng, &SportsActivity::ALL),
            device: pick(&mut self.rng, &Device::ALL),
            browser: pick(&mut self.rng, &Browser::ALL),
            duration: 0.0,
        }
    }
}

impl Default for LogGenerator {
    fn default() -> Self {
        Self::new(GeneratorConfig::default())
    }
}

/// Uniform draw from a non-empty catalog
fn pick<T: Copy>(rng: &mut StdRng, items: &[T]) -> T {
    items[rng.random_range(0..items.len())]
}

fn now_to_second() -> NaiveDateTime {
    let now = Local::now().naive_local();
    now.with_nanosecond(0).unwrap_or(now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::parse_timestamp;
    use std::collections::HashSet;

    fn seeded(seed: u64) -> LogGenerator {
        LogGenerator::new(GeneratorConfig {
            start: parse_timestamp("2024-07-26 00:00:00"),
            seed: Some(seed),
            ..Default::default()
        })
    }

    #[test]
    fn test_generate_exact_count_and_sorted() {
        let mut generator = seeded(7);
        for n in [0, 1, 2, 57, 300] {
            let batch = generator.generate(n);
            assert_eq!(batch.len(), n);
            assert!(batch.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
        }
    }

    #[test]
    fn test_generate_durations_follow_timestamps() {
        let batch = seeded(11).generate(200);
        assert_eq!(batch[0].duration, 0.0);
        for pair in batch.windows(2) {
            let expected = (pair[1].timestamp - pair[0].timestamp).num_seconds() as f64;
            assert_eq!(pair[1].duration, expected);
            assert!(pair[1].duration >= 0.0);
        }
    }

    #[test]
    fn test_generate_timestamps_within_span() {
        let start = parse_timestamp("2024-07-26 00:00:00").unwrap();
        let batch = seeded(3).generate(500);
        for record in &batch {
            let offset = (record.timestamp - start).num_seconds();
            assert!((0..DEFAULT_SPAN_SECS).contains(&offset));
        }
    }

    #[test]
    fn test_generate_values_come_from_catalogs() {
        let batch = seeded(5).generate(300);
        for record in &batch {
            assert!(ENDPOINTS.contains(&record.endpoint.as_str()));
            assert!(COUNTRY_NAMES.contains(&record.country.as_str()));
        }
    }

    #[test]
    fn test_country_pool_is_distinct_and_sized() {
        let mut generator = seeded(9);
        let pool = generator.country_pool();
        let unique: HashSet<_> = pool.iter().collect();
        assert_eq!(pool.len(), DEFAULT_COUNTRY_POOL_SIZE);
        assert_eq!(unique.len(), pool.len());
    }

    #[test]
    fn test_small_country_pool_limits_countries() {
        let mut generator = LogGenerator::new(GeneratorConfig {
            country_pool_size: 3,
            seed: Some(1),
            ..Default::default()
        });
        let batch = generator.generate(100);
        let countries: HashSet<_> = batch.iter().map(|r| r.country.as_str()).collect();
        assert!(countries.len() <= 3);
    }

    #[test]
    fn test_same_seed_same_batches() {
        assert_eq!(seeded(42).generate(50), seeded(42).generate(50));
    }
}
