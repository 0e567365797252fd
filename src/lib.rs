pub mod error;
pub mod geo;
pub mod registry;
pub mod schema;
pub mod stats;
pub mod store;
pub mod table;

pub use error::{EngineError, Result};
pub use geo::Geography;
pub use registry::TableRegistry;
pub use stats::{GeoRawData, StatEntry, StatParams, StatResult, TotalSpec, ValueSet};
pub use store::{DataStore, RawRow};
pub use table::{FieldTableDef, SimpleTableDef, StatType, Table, TableKind, TableMetadata};
