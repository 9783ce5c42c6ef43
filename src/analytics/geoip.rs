//! Country resolution for log records using a MaxMind GeoLite2/GeoIP2 MMDB
//!
//! Lookups never fail from the caller's point of view: malformed addresses,
//! addresses missing from the database and decode errors all resolve to
//! [`UNKNOWN_COUNTRY`], so one bad record cannot abort an enrichment run.

use anyhow::{Context, Result};
use maxminddb::{geoip2, Reader};
use serde::Serialize;
use std::net::IpAddr;
use std::path::Path;
use tracing::{debug, info};

use crate::models::LogTable;

/// Fallback country for anything that cannot be resolved
pub const UNKNOWN_COUNTRY: &str = "Unknown";

/// Maps IP addresses to country names
pub trait CountryResolver {
    /// Country name for `ip`, or `None` when the source has no answer
    fn lookup(&self, ip: IpAddr) -> Option<String>;

    fn resolve_ip(&self, ip: IpAddr) -> String {
        self.lookup(ip)
            .unwrap_or_else(|| UNKNOWN_COUNTRY.to_string())
    }

    /// Resolve a textual address, falling back to [`UNKNOWN_COUNTRY`]
    fn resolve(&self, raw: &str) -> String {
        match raw.trim().parse::<IpAddr>() {
            Ok(ip) => self.resolve_ip(ip),
            Err(_) => {
                debug!(address = raw, "Malformed IP address, using fallback country");
                UNKNOWN_COUNTRY.to_string()
            }
        }
    }
}

/// Read-only handle on an MMDB file. The file is released on drop.
pub struct GeoIpService {
    reader: Reader<Vec<u8>>,
}

impl GeoIpService {
    /// Open a GeoLite2-City, GeoIP2-City or Country database
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let reader = Reader::open_readfile(path)
            .with_context(|| format!("Failed to open GeoIP database at {}", path.display()))?;
        info!(path = %path.display(), "Opened GeoIP database");
        Ok(Self { reader })
    }
}

impl CountryResolver for GeoIpService {
    fn lookup(&self, ip: IpAddr) -> Option<String> {
        let result = match self.reader.lookup(ip) {
            Ok(result) => result,
            Err(e) => {
                debug!(%ip, error = %e, "GeoIP lookup failed");
                return None;
            }
        };

        // City records carry the country block too; plain Country databases
        // only decode as geoip2::Country.
        if let Ok(Some(city)) = result.decode::<geoip2::City>() {
            if let Some(name) = city.country.names.english {
                return Some(name.to_string());
            }
        }

        match result.decode::<geoip2::Country>() {
            Ok(Some(country)) => country.country.names.english.map(|s| s.to_string()),
            _ => None,
        }
    }
}

/// Resolver used when no database is configured
#[derive(Debug, Clone, Copy, Default)]
pub struct NoGeoDatabase;

impl CountryResolver for NoGeoDatabase {
    fn lookup(&self, _ip: IpAddr) -> Option<String> {
        None
    }
}

/// Open the database at `path`, run `f`, and close the database again
pub fn with_geo_database<T, F>(path: impl AsRef<Path>, f: F) -> Result<T>
where
    F: FnOnce(&GeoIpService) -> T,
{
    let service = GeoIpService::open(path)?;
    let output = f(&service);
    drop(service);
    debug!("Closed GeoIP database");
    Ok(output)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EnrichmentStats {
    pub resolved: usize,
    pub unknown: usize,
}

/// Overwrite every record's country with the resolved one
pub fn enrich_countries<R>(table: &mut LogTable, resolver: &R) -> EnrichmentStats
where
    R: CountryResolver + ?Sized,
{
    let mut stats = EnrichmentStats::default();

    for record in table.records_mut() {
        let country = resolver.resolve_ip(IpAddr::V4(record.ip_address));
        if country == UNKNOWN_COUNTRY {
            stats.unknown += 1;
        } else {
            stats.resolved += 1;
        }
        record.country = country;
    }

    info!(
        resolved = stats.resolved,
        unknown = stats.unknown,
        "Enriched log table with GeoIP countries"
    );
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures::record;
    use std::collections::HashMap;

    struct StaticResolver(HashMap<IpAddr, String>);

    impl CountryResolver for StaticResolver {
        fn lookup(&self, ip: IpAddr) -> Option<String> {
            self.0.get(&ip).cloned()
        }
    }

    fn resolver() -> StaticResolver {
        let mut known = HashMap::new();
        known.insert("8.8.8.8".parse().unwrap(), "United States".to_string());
        StaticResolver(known)
    }

    #[test]
    fn test_geoip_service_open_invalid_path() {
        assert!(GeoIpService::open("/nonexistent/path.mmdb").is_err());
    }

    #[test]
    fn test_with_geo_database_invalid_path() {
        assert!(with_geo_database("/nonexistent/path.mmdb", |_| ()).is_err());
    }

    #[test]
    fn test_resolve_malformed_address() {
        assert_eq!(resolver().resolve("not.an.ip"), UNKNOWN_COUNTRY);
        assert_eq!(resolver().resolve(""), UNKNOWN_COUNTRY);
        assert_eq!(resolver().resolve("256.1.1.1"), UNKNOWN_COUNTRY);
    }

    #[test]
    fn test_resolve_known_and_unknown() {
        assert_eq!(resolver().resolve(" 8.8.8.8 "), "United States");
        assert_eq!(resolver().resolve("10.0.0.1"), UNKNOWN_COUNTRY);
        assert_eq!(NoGeoDatabase.resolve("8.8.8.8"), UNKNOWN_COUNTRY);
    }

    #[test]
    fn test_enrich_countries_counts() {
        let mut table = LogTable::new(vec![
            record("2024-01-01 00:00:00", [8, 8, 8, 8], 0.0),
            record("2024-01-01 00:00:01", [10, 0, 0, 1], 1.0),
            record("2024-01-01 00:00:02", [8, 8, 8, 8], 1.0),
        ]);

        let stats = enrich_countries(&mut table, &resolver());
        assert_eq!(stats, EnrichmentStats { resolved: 2, unknown: 1 });

        let countries: Vec<&str> = table.iter().map(|r| r.country.as_str()).collect();
        assert_eq!(countries, vec!["United States", UNKNOWN_COUNTRY, "United States"]);
    }
}
