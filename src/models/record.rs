use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;
use strum_macros::{AsRefStr, Display, EnumString};

/// Timestamp format used in the persisted table
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Time-of-day only format found in some legacy files
const TIME_OF_DAY_FORMAT: &str = "%H:%M:%S";

/// Canonical column names, in file order
pub const HEADER: [&str; 10] = [
    "Timestamp",
    "IP Address",
    "Method",
    "Endpoint",
    "Status",
    "Country",
    "Sports Activity",
    "Device",
    "Browser",
    "Duration",
];

/// Endpoint catalog served by the synthetic site
pub const ENDPOINTS: [&str; 4] = [
    "/index.html",
    "/images/games.jpg",
    "/searchsports.php",
    "/football.html",
];

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
}

impl Method {
    pub const ALL: [Method; 2] = [Method::Get, Method::Post];
}

/// HTTP status codes that appear in the logs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub enum Status {
    Ok,
    NotModified,
    NotFound,
    InternalServerError,
}

impl Status {
    pub const ALL: [Status; 4] = [
        Status::Ok,
        Status::NotModified,
        Status::NotFound,
        Status::InternalServerError,
    ];

    pub fn code(self) -> u16 {
        match self {
            Status::Ok => 200,
            Status::NotModified => 304,
            Status::NotFound => 404,
            Status::InternalServerError => 500,
        }
    }
}

impl TryFrom<u16> for Status {
    type Error = String;

    fn try_from(code: u16) -> Result<Self, Self::Error> {
        match code {
            200 => Ok(Status::Ok),
            304 => Ok(Status::NotModified),
            404 => Ok(Status::NotFound),
            500 => Ok(Status::InternalServerError),
            other => Err(format!("unsupported status code {other}")),
        }
    }
}

impl From<Status> for u16 {
    fn from(status: Status) -> Self {
        status.code()
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
pub enum Device {
    Desktop,
    Mobile,
    Tablet,
}

impl Device {
    pub const ALL: [Device; 3] = [Device::Desktop, Device::Mobile, Device::Tablet];
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
pub enum Browser {
    Chrome,
    Firefox,
    Safari,
    Edge,
}

impl Browser {
    pub const ALL: [Browser; 4] = [
        Browser::Chrome,
        Browser::Firefox,
        Browser::Safari,
        Browser::Edge,
    ];
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
pub enum SportsActivity {
    Football,
    Basketball,
    Tennis,
    Swimming,
    Running,
    Cycling,
    Golf,
    Baseball,
    Cricket,
    Volleyball,
}

impl SportsActivity {
    pub const ALL: [SportsActivity; 10] = [
        SportsActivity::Football,
        SportsActivity::Basketball,
        SportsActivity::Tennis,
        SportsActivity::Swimming,
        SportsActivity::Running,
        SportsActivity::Cycling,
        SportsActivity::Golf,
        SportsActivity::Baseball,
        SportsActivity::Cricket,
        SportsActivity::Volleyball,
    ];
}

/// A single (synthetic) web request as persisted in the log table
///
/// Field names are serialized with the column names of the flat file so the
/// same struct drives both CSV and JSON output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    #[serde(rename = "Timestamp", with = "timestamp_format")]
    pub timestamp: NaiveDateTime,

    #[serde(rename = "IP Address")]
    pub ip_address: Ipv4Addr,

    #[serde(rename = "Method")]
    pub method: Method,

    #[serde(rename = "Endpoint")]
    pub endpoint: String,

    #[serde(rename = "Status")]
    pub status: Status,

    /// Assigned at generation time or resolved later from `ip_address`
    #[serde(rename = "Country")]
    pub country: String,

    #[serde(rename = "Sports Activity")]
    pub sports_activity: SportsActivity,

    #[serde(rename = "Device")]
    pub device: Device,

    #[serde(rename = "Browser")]
    pub browser: Browser,

    /// Seconds, never negative once derived
    #[serde(rename = "Duration")]
    pub duration: f64,
}

impl LogRecord {
    /// Hour of day of the timestamp, 0..=23
    pub fn hour(&self) -> u32 {
        use chrono::Timelike;
        self.timestamp.hour()
    }
}

/// Parse a timestamp column value.
///
/// Accepts the canonical `YYYY-MM-DD HH:MM:SS` form and the bare
/// `HH:MM:SS` form, which is anchored to 1900-01-01.
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    if let Ok(ts) = NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT) {
        return Some(ts);
    }

    let time = chrono::NaiveTime::parse_from_str(value, TIME_OF_DAY_FORMAT).ok()?;
    NaiveDate::from_ymd_opt(1900, 1, 1).map(|date| date.and_time(time))
}

pub fn format_timestamp(ts: &NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

mod timestamp_format {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(ts: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(&ts.format(super::TIMESTAMP_FORMAT))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        super::parse_timestamp(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp '{raw}'")))
    }
}
