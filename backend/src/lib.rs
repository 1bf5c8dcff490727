pub mod config;
pub mod error;
pub mod health;
pub mod identity;
pub mod metrics;
pub mod middleware;

pub mod activity {
    pub mod controller;
    pub mod events;
    pub mod reader;

    pub use events::{ActivityEventHandler, ActivityRecorded, StatsHandler};
    pub use reader::{ActivityReader, ArangoActivityReader};
}

pub mod profile {
    pub mod cache;
    pub mod reader;

    pub use cache::ProfileCache;
    pub use reader::{ArangoProfileReader, CachedProfileReader, ProfileReader};
}

pub mod leaderboard {
    pub mod aggregate;
    pub mod controller;
    pub mod delta;
    pub mod enrich;
    pub mod period;
    pub mod position;
    pub mod repository;
    pub mod usecase;

    pub use aggregate::{AggregatorRegistry, MetricStrategy, RankedValue};
    pub use repository::{SnapshotRepository, SnapshotStore};
    pub use usecase::{LeaderboardRequest, LeaderboardService};

    #[cfg(test)]
    mod usecase_tests;
}

pub mod openapi;
