pub mod app;
pub mod domain;
pub mod infra;
pub mod storage;
pub mod transport;

// Convenience re-exports (keeps call-sites clean)
pub use app::{ServiceError, TableService};
pub use domain::schema::{ColumnDef, LogicalSchema, RegisteredSchema};
pub use storage::{PgStore, StoreClient};
