//! Timing table persistence.

pub mod canonical;
pub mod migrate;

pub use canonical::{read_any, write_canonical, TimingShape, CANONICAL_HEADER};
pub use migrate::{migrate_dir, migrate_file, MigrationReport};
