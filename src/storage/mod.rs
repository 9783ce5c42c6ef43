pub mod cached;
pub mod csv_store;
pub mod error;

pub use cached::TableCache;
pub use csv_store::{read_table, write_csv, LoadedTable, LogStore, TableVersion};
pub use error::{StorageError, StorageResult};
