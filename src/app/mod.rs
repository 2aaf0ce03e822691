pub mod table_service;

pub use table_service::{ServiceError, TableDescription, TableService};
