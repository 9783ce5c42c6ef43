mod record;
mod table;

pub use record::{
    format_timestamp, parse_timestamp, Browser, Device, LogRecord, Method, SportsActivity, Status,
    ENDPOINTS, HEADER, TIMESTAMP_FORMAT,
};
pub use table::LogTable;
