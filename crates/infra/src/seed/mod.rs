//! Startup seed data.
//!
//! Loaders run once, in ascending [`SeedLoader::order`]. A failing loader is
//! logged and skipped; the runner always gets through the whole list, so the
//! store may end up partially seeded.

use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{error, info};

use partybook_core::DomainError;

use crate::relationships::RelationshipBuilder;
use crate::repository::{Repositories, RepositoryError};

pub mod house_of_representatives;
pub mod parliament_house;
pub mod political_party;

pub use house_of_representatives::{HouseOfRepresentatives, MemberRow};
pub use parliament_house::ParliamentHouse;
pub use political_party::{PoliticalParty, PoliticalPartyLoader};

/// Default location of the House of Representatives members file.
pub const DEFAULT_MEMBERS_FILE: &str = "data/house_of_representatives.csv";

#[derive(Debug, Error)]
pub enum SeedError {
    #[error("cannot read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error("line {line}: {reason}")]
    Row { line: usize, reason: String },

    #[error("missing reference: {0}")]
    MissingReference(String),
}

impl From<DomainError> for SeedError {
    fn from(err: DomainError) -> Self {
        SeedError::Repository(err.into())
    }
}

/// What a loader did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
    /// Records written (parties, addresses, roles, identifiers).
    pub created: usize,
    /// Input rows skipped after a logged failure.
    pub skipped: usize,
}

/// Everything a loader may touch.
#[derive(Debug, Clone)]
pub struct SeedContext {
    pub repositories: Repositories,
    pub relationships: RelationshipBuilder,
    pub members_file: PathBuf,
}

impl SeedContext {
    pub fn new(repositories: Repositories, members_file: impl Into<PathBuf>) -> Self {
        Self {
            relationships: RelationshipBuilder::new(repositories.clone()),
            repositories,
            members_file: members_file.into(),
        }
    }
}

#[async_trait]
pub trait SeedLoader: Send + Sync {
    fn name(&self) -> &str;

    /// Lower runs first.
    fn order(&self) -> i32;

    async fn run(&self, ctx: &SeedContext) -> Result<SeedReport, SeedError>;
}

/// Outcome of a full seed run.
#[derive(Debug, Default)]
pub struct SeedSummary {
    pub completed: Vec<(String, SeedReport)>,
    pub failed: Vec<(String, String)>,
}

impl SeedSummary {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Runs registered loaders in order.
#[derive(Default)]
pub struct SeedRunner {
    loaders: Vec<Box<dyn SeedLoader>>,
}

impl SeedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parliament House, the two political party profiles, then the House
    /// of Representatives members.
    pub fn with_defaults() -> Self {
        Self::new()
            .register(ParliamentHouse)
            .register(PoliticalPartyLoader::jacqui_lambie_network())
            .register(PoliticalPartyLoader::pauline_hansons_one_nation())
            .register(HouseOfRepresentatives)
    }

    pub fn register(mut self, loader: impl SeedLoader + 'static) -> Self {
        self.loaders.push(Box::new(loader));
        // Stable, so equal orders keep registration order.
        self.loaders.sort_by_key(|l| l.order());
        self
    }

    pub fn loader_names(&self) -> Vec<&str> {
        self.loaders.iter().map(|l| l.name()).collect()
    }

    pub async fn run(&self, ctx: &SeedContext) -> SeedSummary {
        let mut summary = SeedSummary::default();

        for loader in &self.loaders {
            info!(loader = loader.name(), order = loader.order(), "seeding");
            match loader.run(ctx).await {
                Ok(report) => {
                    info!(
                        loader = loader.name(),
                        created = report.created,
                        skipped = report.skipped,
                        "seeding complete"
                    );
                    summary.completed.push((loader.name().to_string(), report));
                }
                Err(e) => {
                    error!(loader = loader.name(), error = %e, "seeding failed");
                    summary.failed.push((loader.name().to_string(), e.to_string()));
                }
            }
        }

        summary
    }
}

impl core::fmt::Debug for SeedRunner {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SeedRunner")
            .field("loaders", &self.loader_names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;

    struct Recording {
        name: &'static str,
        order: i32,
        fail: bool,
        seen: Arc<Mutex<Vec<&'static str>>>,
    }

    #[async_trait]
    impl SeedLoader for Recording {
        fn name(&self) -> &str {
            self.name
        }

        fn order(&self) -> i32 {
            self.order
        }

        async fn run(&self, _ctx: &SeedContext) -> Result<SeedReport, SeedError> {
            self.seen.lock().unwrap().push(self.name);
            if self.fail {
                return Err(SeedError::MissingReference("The Senate".to_string()));
            }
            Ok(SeedReport { created: 1, skipped: 0 })
        }
    }

    #[tokio::test]
    async fn runs_in_order_and_continues_after_failure() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let loader = |name, order, fail| Recording { name, order, fail, seen: seen.clone() };
        let runner = SeedRunner::new()
            .register(loader("last", i32::MAX, false))
            .register(loader("broken", 2, true))
            .register(loader("first", 1, false));

        let ctx = SeedContext::new(Repositories::in_memory(), DEFAULT_MEMBERS_FILE);
        let summary = runner.run(&ctx).await;

        assert_eq!(*seen.lock().unwrap(), vec!["first", "broken", "last"]);
        assert_eq!(summary.completed.len(), 2);
        assert_eq!(summary.failed, vec![("broken".to_string(), "missing reference: The Senate".to_string())]);
        assert!(!summary.is_complete());
    }

    #[test]
    fn default_loaders_are_ordered() {
        assert_eq!(
            SeedRunner::with_defaults().loader_names(),
            vec![
                "Parliament House",
                "Jacqui Lambie Network",
                "Pauline Hanson's One Nation",
                "House of Representatives"
            ]
        );
    }
}
