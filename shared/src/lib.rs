pub mod models {
    pub mod activity;
    pub mod athlete;
    pub mod leaderboard;
}

pub mod dto {
    pub mod activity;
    pub mod leaderboard;
}

pub mod error;

// Re-export commonly used items
pub use error::{Result, SharedError};

// Re-export models
pub use models::{
    activity::{ActivityRecord, AthleteStats, GeoTag},
    athlete::DisplayInfo,
    leaderboard::{
        LeaderboardEntry, LeaderboardSnapshot, Metric, PeriodKind, Scope, SnapshotKey,
    },
};

// Re-export DTOs
pub use dto::{
    activity::ActivityRecordedDto,
    leaderboard::{
        LeaderboardEntryDto, LeaderboardQuery, LeaderboardResponseDto, UserStatusDto,
    },
};
