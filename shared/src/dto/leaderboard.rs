use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::leaderboard::{LeaderboardEntry, LeaderboardSnapshot, Metric, PeriodKind, Scope};

/// Query parameters accepted by the leaderboard read endpoints. `metric`
/// and `period_kind` travel in the path; everything else is optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LeaderboardQuery {
    /// ISO date or RFC 3339 timestamp; defaults to now.
    pub date: Option<String>,
    /// global | national | regional | city; defaults to global.
    pub scope: Option<String>,
    /// Required whenever scope is not global.
    pub geo_code: Option<String>,
    pub force_refresh: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardEntryDto {
    pub subject_id: String,
    pub display_name: String,
    pub avatar_url: Option<String>,
    pub rank: u32,
    pub value: f64,
    pub rank_change: i64,
}

impl From<&LeaderboardEntry> for LeaderboardEntryDto {
    fn from(entry: &LeaderboardEntry) -> Self {
        Self {
            subject_id: entry.subject_id.clone(),
            display_name: entry.display_name.clone(),
            avatar_url: entry.avatar_url.clone(),
            rank: entry.rank,
            value: entry.value,
            rank_change: entry.rank_change,
        }
    }
}

/// The requesting subject's standing within the returned snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserStatusDto {
    pub in_leaderboard: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rank: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub percentile: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub change: Option<i64>,
}

impl UserStatusDto {
    pub fn absent() -> Self {
        Self {
            in_leaderboard: false,
            rank: None,
            value: None,
            total: None,
            percentile: None,
            change: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaderboardResponseDto {
    pub metric: Metric,
    pub period_kind: PeriodKind,
    pub period_id: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub scope: Scope,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geo_qualifier: Option<String>,
    pub entries: Vec<LeaderboardEntryDto>,
    pub updated_at: DateTime<Utc>,
    pub user_status: UserStatusDto,
}

impl LeaderboardResponseDto {
    pub fn from_snapshot(snapshot: &LeaderboardSnapshot, user_status: UserStatusDto) -> Self {
        Self {
            metric: snapshot.metric,
            period_kind: snapshot.period_kind,
            period_id: snapshot.period_id.clone(),
            start_date: snapshot.start_date,
            end_date: snapshot.end_date,
            scope: snapshot.scope,
            geo_qualifier: snapshot.geo_qualifier.clone(),
            entries: snapshot.entries.iter().map(LeaderboardEntryDto::from).collect(),
            updated_at: snapshot.updated_at,
            user_status,
        }
    }
}
