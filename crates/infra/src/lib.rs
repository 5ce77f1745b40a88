//! Infrastructure layer: storage backends, relationship wiring and seed data.

pub mod relationships;
pub mod repository;
pub mod seed;

pub use relationships::RelationshipBuilder;
pub use repository::{InMemoryStore, PostgresStore, Repositories, RepositoryError, RepositoryResult};
pub use seed::{SeedContext, SeedError, SeedLoader, SeedReport, SeedRunner, SeedSummary};

#[cfg(test)]
mod integration_tests;
