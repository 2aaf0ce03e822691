pub mod postgres;
pub mod store;
#[cfg(test)]
pub(crate) mod testing;

pub use postgres::PgStore;
pub use store::{CatalogColumn, Row, Statement, StoreClient, StoreError};
