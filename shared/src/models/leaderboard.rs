use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The scalar performance measure a leaderboard ranks by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Metric {
    Distance,
    ActivityCount,
    AverageSpeed,
    PeakSpeed,
    Duration,
    Elevation,
}

impl Metric {
    pub const ALL: [Metric; 6] = [
        Metric::Distance,
        Metric::ActivityCount,
        Metric::AverageSpeed,
        Metric::PeakSpeed,
        Metric::Duration,
        Metric::Elevation,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::Distance => "distance",
            Metric::ActivityCount => "activity-count",
            Metric::AverageSpeed => "average-speed",
            Metric::PeakSpeed => "peak-speed",
            Metric::Duration => "duration",
            Metric::Elevation => "elevation",
        }
    }
}

impl std::fmt::Display for Metric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Metric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "distance" => Ok(Metric::Distance),
            "activity-count" => Ok(Metric::ActivityCount),
            "average-speed" => Ok(Metric::AverageSpeed),
            "peak-speed" => Ok(Metric::PeakSpeed),
            "duration" => Ok(Metric::Duration),
            "elevation" => Ok(Metric::Elevation),
            _ => Err(format!("Unknown metric: {}", s)),
        }
    }
}

/// The kind of time window a snapshot covers.
///
/// `Custom` exists for snapshots materialized with explicit bounds (e.g.
/// challenge windows); it is never accepted from the public API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PeriodKind {
    Daily,
    Weekly,
    Monthly,
    Yearly,
    AllTime,
    Custom,
}

impl PeriodKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PeriodKind::Daily => "daily",
            PeriodKind::Weekly => "weekly",
            PeriodKind::Monthly => "monthly",
            PeriodKind::Yearly => "yearly",
            PeriodKind::AllTime => "all-time",
            PeriodKind::Custom => "custom",
        }
    }
}

impl std::fmt::Display for PeriodKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for PeriodKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "daily" => Ok(PeriodKind::Daily),
            "weekly" => Ok(PeriodKind::Weekly),
            "monthly" => Ok(PeriodKind::Monthly),
            "yearly" => Ok(PeriodKind::Yearly),
            "all-time" => Ok(PeriodKind::AllTime),
            _ => Err(format!("Unknown period kind: {}", s)),
        }
    }
}

/// Geographic breadth of a ranking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Scope {
    Global,
    National,
    Regional,
    City,
}

impl Scope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::Global => "global",
            Scope::National => "national",
            Scope::Regional => "regional",
            Scope::City => "city",
        }
    }

    /// Every scope except `Global` must be narrowed by a geo qualifier.
    pub fn requires_geo_qualifier(&self) -> bool {
        !matches!(self, Scope::Global)
    }
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Scope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "global" => Ok(Scope::Global),
            "national" => Ok(Scope::National),
            "regional" => Ok(Scope::Regional),
            "city" => Ok(Scope::City),
            _ => Err(format!("Unknown scope: {}", s)),
        }
    }
}

/// Composite key identifying one materialized snapshot. At most one valid
/// snapshot document exists per key at any time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SnapshotKey {
    pub metric: Metric,
    pub period_kind: PeriodKind,
    pub period_id: String,
    pub scope: Scope,
    pub geo_qualifier: Option<String>,
}

impl SnapshotKey {
    /// Stable string form of the key, used for cache lookups and for
    /// serializing regenerations per key.
    pub fn token(&self) -> String {
        format!(
            "leaderboard:{}:{}:{}:{}:{}",
            self.metric,
            self.period_kind,
            self.period_id,
            self.scope,
            self.geo_qualifier.as_deref().unwrap_or("-")
        )
    }
}

/// One ranked subject within a snapshot. Display fields are denormalized
/// copies taken at enrichment time; they go stale between regenerations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub subject_id: String,
    pub display_name: String,
    pub avatar_url: Option<String>,
    /// 1-based, strictly increasing with no gaps within one snapshot.
    pub rank: u32,
    pub value: f64,
    /// previous_rank - rank against the superseded snapshot for the same
    /// key; positive means the subject moved toward rank 1. Zero for new
    /// entrants.
    pub rank_change: i64,
}

/// A materialized, cached ranking result for one snapshot key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaderboardSnapshot {
    pub metric: Metric,
    pub period_kind: PeriodKind,
    pub period_id: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub scope: Scope,
    pub geo_qualifier: Option<String>,
    pub entries: Vec<LeaderboardEntry>,
    pub is_valid: bool,
    pub updated_at: DateTime<Utc>,
}

impl LeaderboardSnapshot {
    pub fn key(&self) -> SnapshotKey {
        SnapshotKey {
            metric: self.metric,
            period_kind: self.period_kind,
            period_id: self.period_id.clone(),
            scope: self.scope,
            geo_qualifier: self.geo_qualifier.clone(),
        }
    }

    /// Checks the rank contiguity invariant: entries[i].rank == i + 1.
    pub fn ranks_contiguous(&self) -> bool {
        self.entries
            .iter()
            .enumerate()
            .all(|(i, e)| e.rank as usize == i + 1)
    }
}
