use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Geo tag attached to a recorded track. Older tracks may carry no tag at
/// all; scoped aggregation must not fall back to global for those.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeoTag {
    pub country: Option<String>,
    pub region: Option<String>,
    pub city: Option<String>,
}

/// One recorded track (a GPS-logged activity) as seen by the aggregation
/// core. Raw track documents carry more fields; this is the read model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityRecord {
    pub subject_id: String,
    pub started_at: DateTime<Utc>,
    pub distance_m: f64,
    pub duration_s: f64,
    pub elevation_gain_m: f64,
    pub max_speed_kmh: f64,
    pub geo: Option<GeoTag>,
}

impl ActivityRecord {
    /// Average speed over the whole track in km/h, if the track has a
    /// nonzero duration.
    pub fn average_speed_kmh(&self) -> Option<f64> {
        if self.duration_s > 0.0 {
            Some(self.distance_m / self.duration_s * 3.6)
        } else {
            None
        }
    }
}

/// Denormalized per-athlete totals, updated by the activity-recorded event
/// handler rather than inside the track write path.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AthleteStats {
    pub subject_id: String,
    pub activity_count: i64,
    pub total_distance_m: f64,
    pub total_duration_s: f64,
    pub total_elevation_m: f64,
    pub last_activity_at: Option<DateTime<Utc>>,
}

impl AthleteStats {
    pub fn new(subject_id: String) -> Self {
        Self {
            subject_id,
            ..Default::default()
        }
    }

    /// Folds one recorded track into the running totals.
    pub fn apply(&mut self, record: &ActivityRecord) {
        self.activity_count += 1;
        self.total_distance_m += record.distance_m;
        self.total_duration_s += record.duration_s;
        self.total_elevation_m += record.elevation_gain_m;
        self.last_activity_at = match self.last_activity_at {
            Some(prev) if prev >= record.started_at => Some(prev),
            _ => Some(record.started_at),
        };
    }
}
