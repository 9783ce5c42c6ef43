//! Read path: geo enrichment, aggregation, trend prediction and reporting

pub mod aggregator;
pub mod geoip;
pub mod predictor;
pub mod report;

pub use aggregator::{
    aggregate, endpoint_slice, group_counts, session_summary, AggregateResult, CategoryStats,
    DurationSummary, EndpointSlice, GroupCounts, Grouping, LogFilter,
};
pub use geoip::{
    enrich_countries, with_geo_database, CountryResolver, EnrichmentStats, GeoIpService,
    NoGeoDatabase, UNKNOWN_COUNTRY,
};
pub use predictor::{PredictError, TrendModel};
pub use report::{render_report, write_report};
