pub mod operations;
pub mod schema;

#[cfg(test)]
mod tests;

pub use operations::{AddressTxRow, Database, DbError, IndexerStateRow};
pub use schema::{initialize_schema, run_migrations, SCHEMA_VERSION};
