use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::activity::{ActivityRecord, GeoTag};

/// Payload of the activity-recorded domain event, posted by the track
/// ingestion service after a track document is stored.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ActivityRecordedDto {
    #[validate(length(min = 1))]
    pub subject_id: String,
    pub started_at: DateTime<Utc>,
    #[validate(range(min = 0.0))]
    pub distance_m: f64,
    #[validate(range(min = 0.0))]
    pub duration_s: f64,
    #[validate(range(min = 0.0))]
    pub elevation_gain_m: f64,
    #[validate(range(min = 0.0))]
    pub max_speed_kmh: f64,
    pub country: Option<String>,
    pub region: Option<String>,
    pub city: Option<String>,
}

impl ActivityRecordedDto {
    pub fn into_record(self) -> ActivityRecord {
        let geo = if self.country.is_some() || self.region.is_some() || self.city.is_some() {
            Some(GeoTag {
                country: self.country,
                region: self.region,
                city: self.city,
            })
        } else {
            None
        };
        ActivityRecord {
            subject_id: self.subject_id,
            started_at: self.started_at,
            distance_m: self.distance_m,
            duration_s: self.duration_s,
            elevation_gain_m: self.elevation_gain_m,
            max_speed_kmh: self.max_speed_kmh,
            geo,
        }
    }
}
