pub mod config;
pub mod query;
pub mod types;
pub mod validation;

pub use config::{ApiConfig, Config, ServerConfig, StorageConfig};
pub use query::{IncidentQuery, ListParams, PageLimits, Pagination, Sort, SortField, SortOrder};
pub use types::{
    Incident, IncidentCounts, IncidentPatch, NewIncident, OpenCounts, Page, PageMeta, ServerStatus,
    Severity, Status,
};
pub use validation::{UnknownFields, ValidationError};
