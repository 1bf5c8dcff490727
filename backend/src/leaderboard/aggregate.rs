use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use shared::{ActivityRecord, Metric, Result, Scope, SharedError};

use crate::activity::reader::ActivityReader;

/// One subject's reduced score, before enrichment.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedValue {
    pub subject_id: String,
    pub value: f64,
}

/// One aggregation algorithm, keyed by metric. Strategies reduce raw
/// tracks to a single scalar per subject; they hold no state and never
/// touch storage themselves.
pub trait MetricStrategy: Send + Sync {
    fn metric(&self) -> Metric;

    /// Groups `records` by subject and reduces each group to one value.
    /// Subjects the metric cannot score (zero denominator, below the
    /// sample floor) are omitted. Output order is unspecified.
    fn reduce(&self, records: &[ActivityRecord]) -> Vec<RankedValue>;
}

fn group_by_subject(records: &[ActivityRecord]) -> HashMap<&str, Vec<&ActivityRecord>> {
    let mut groups: HashMap<&str, Vec<&ActivityRecord>> = HashMap::new();
    for record in records {
        groups.entry(record.subject_id.as_str()).or_default().push(record);
    }
    groups
}

fn sum_metric(
    records: &[ActivityRecord],
    value_of: impl Fn(&ActivityRecord) -> f64,
) -> Vec<RankedValue> {
    group_by_subject(records)
        .into_iter()
        .map(|(subject, tracks)| RankedValue {
            subject_id: subject.to_string(),
            value: tracks.iter().map(|t| value_of(t)).sum(),
        })
        .collect()
}

pub struct DistanceStrategy;

impl MetricStrategy for DistanceStrategy {
    fn metric(&self) -> Metric {
        Metric::Distance
    }

    fn reduce(&self, records: &[ActivityRecord]) -> Vec<RankedValue> {
        sum_metric(records, |t| t.distance_m)
    }
}

pub struct ActivityCountStrategy;

impl MetricStrategy for ActivityCountStrategy {
    fn metric(&self) -> Metric {
        Metric::ActivityCount
    }

    fn reduce(&self, records: &[ActivityRecord]) -> Vec<RankedValue> {
        group_by_subject(records)
            .into_iter()
            .map(|(subject, tracks)| RankedValue {
                subject_id: subject.to_string(),
                value: tracks.len() as f64,
            })
            .collect()
    }
}

pub struct DurationStrategy;

impl MetricStrategy for DurationStrategy {
    fn metric(&self) -> Metric {
        Metric::Duration
    }

    fn reduce(&self, records: &[ActivityRecord]) -> Vec<RankedValue> {
        sum_metric(records, |t| t.duration_s)
    }
}

pub struct ElevationStrategy;

impl MetricStrategy for ElevationStrategy {
    fn metric(&self) -> Metric {
        Metric::Elevation
    }

    fn reduce(&self, records: &[ActivityRecord]) -> Vec<RankedValue> {
        sum_metric(records, |t| t.elevation_gain_m)
    }
}

pub struct PeakSpeedStrategy;

impl MetricStrategy for PeakSpeedStrategy {
    fn metric(&self) -> Metric {
        Metric::PeakSpeed
    }

    fn reduce(&self, records: &[ActivityRecord]) -> Vec<RankedValue> {
        group_by_subject(records)
            .into_iter()
            .map(|(subject, tracks)| RankedValue {
                subject_id: subject.to_string(),
                value: tracks.iter().map(|t| t.max_speed_kmh).fold(0.0, f64::max),
            })
            .collect()
    }
}

/// Average speed as ratio of sums (total distance over total duration),
/// in km/h. Subjects with zero total duration are excluded outright, and
/// a minimum-sample floor keeps one-off sprints from dominating the top.
pub struct AverageSpeedStrategy {
    pub min_samples: usize,
}

impl Default for AverageSpeedStrategy {
    fn default() -> Self {
        Self { min_samples: 3 }
    }
}

impl MetricStrategy for AverageSpeedStrategy {
    fn metric(&self) -> Metric {
        Metric::AverageSpeed
    }

    fn reduce(&self, records: &[ActivityRecord]) -> Vec<RankedValue> {
        group_by_subject(records)
            .into_iter()
            .filter_map(|(subject, tracks)| {
                let qualifying: Vec<&&ActivityRecord> =
                    tracks.iter().filter(|t| t.duration_s > 0.0).collect();
                if qualifying.len() < self.min_samples {
                    return None;
                }
                let total_distance: f64 = qualifying.iter().map(|t| t.distance_m).sum();
                let total_duration: f64 = qualifying.iter().map(|t| t.duration_s).sum();
                if total_duration <= 0.0 {
                    return None;
                }
                Some(RankedValue {
                    subject_id: subject.to_string(),
                    value: total_distance / total_duration * 3.6,
                })
            })
            .collect()
    }
}

/// Registry of pluggable aggregation strategies. Adding a metric means
/// registering a strategy here; the orchestrator never switches on the
/// metric itself.
pub struct AggregatorRegistry {
    strategies: HashMap<Metric, Arc<dyn MetricStrategy>>,
}

impl AggregatorRegistry {
    pub fn with_defaults() -> Self {
        let mut registry = Self {
            strategies: HashMap::new(),
        };
        registry.register(Arc::new(DistanceStrategy));
        registry.register(Arc::new(ActivityCountStrategy));
        registry.register(Arc::new(AverageSpeedStrategy::default()));
        registry.register(Arc::new(PeakSpeedStrategy));
        registry.register(Arc::new(DurationStrategy));
        registry.register(Arc::new(ElevationStrategy));
        registry
    }

    pub fn register(&mut self, strategy: Arc<dyn MetricStrategy>) {
        self.strategies.insert(strategy.metric(), strategy);
    }

    fn strategy(&self, metric: Metric) -> Result<&Arc<dyn MetricStrategy>> {
        self.strategies.get(&metric).ok_or_else(|| {
            SharedError::Internal(format!("no aggregation strategy registered for {}", metric))
        })
    }

    /// Runs the metric's strategy over the window and returns at most
    /// `limit` results, descending by value with ties broken by ascending
    /// subject id.
    pub async fn aggregate(
        &self,
        reader: &dyn ActivityReader,
        metric: Metric,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        scope: Scope,
        geo_qualifier: Option<&str>,
        limit: usize,
    ) -> Result<Vec<RankedValue>> {
        let strategy = self.strategy(metric)?;
        let records = reader.query_activities(scope, geo_qualifier, start, end).await?;
        let mut ranked = strategy.reduce(&records);
        sort_ranked(&mut ranked);
        ranked.truncate(limit);
        Ok(ranked)
    }
}

/// Deterministic ordering: descending value, ascending subject id on ties.
pub fn sort_ranked(ranked: &mut [RankedValue]) {
    ranked.sort_by(|a, b| {
        b.value
            .partial_cmp(&a.value)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.subject_id.cmp(&b.subject_id))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use shared::GeoTag;

    fn track(subject: &str, distance_m: f64, duration_s: f64) -> ActivityRecord {
        ActivityRecord {
            subject_id: subject.to_string(),
            started_at: Utc.with_ymd_and_hms(2024, 5, 14, 7, 0, 0).unwrap(),
            distance_m,
            duration_s,
            elevation_gain_m: 10.0,
            max_speed_kmh: 25.0,
            geo: None,
        }
    }

    fn tagged(subject: &str, country: &str) -> ActivityRecord {
        ActivityRecord {
            geo: Some(GeoTag {
                country: Some(country.to_string()),
                region: None,
                city: None,
            }),
            ..track(subject, 5_000.0, 1_200.0)
        }
    }

    struct FixedReader {
        records: Vec<ActivityRecord>,
    }

    #[async_trait]
    impl ActivityReader for FixedReader {
        async fn query_activities(
            &self,
            scope: Scope,
            geo_qualifier: Option<&str>,
            _start: DateTime<Utc>,
            _end: DateTime<Utc>,
        ) -> Result<Vec<ActivityRecord>> {
            Ok(self
                .records
                .iter()
                .filter(|r| match scope {
                    Scope::Global => true,
                    Scope::National => r
                        .geo
                        .as_ref()
                        .and_then(|g| g.country.as_deref())
                        .map(|c| Some(c) == geo_qualifier)
                        .unwrap_or(false),
                    Scope::Regional => r
                        .geo
                        .as_ref()
                        .and_then(|g| g.region.as_deref())
                        .map(|c| Some(c) == geo_qualifier)
                        .unwrap_or(false),
                    Scope::City => r
                        .geo
                        .as_ref()
                        .and_then(|g| g.city.as_deref())
                        .map(|c| Some(c) == geo_qualifier)
                        .unwrap_or(false),
                })
                .cloned()
                .collect())
        }
    }

    fn window() -> (DateTime<Utc>, DateTime<Utc>) {
        (
            Utc.with_ymd_and_hms(2024, 5, 13, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 5, 19, 23, 59, 59).unwrap(),
        )
    }

    #[test]
    fn distance_sums_per_subject() {
        let records = vec![
            track("athlete/a", 10_000.0, 3_600.0),
            track("athlete/a", 5_000.0, 1_800.0),
            track("athlete/b", 12_000.0, 4_000.0),
        ];
        let mut ranked = DistanceStrategy.reduce(&records);
        sort_ranked(&mut ranked);
        assert_eq!(ranked[0].subject_id, "athlete/a");
        assert_eq!(ranked[0].value, 15_000.0);
        assert_eq!(ranked[1].value, 12_000.0);
    }

    #[test]
    fn peak_speed_takes_the_maximum() {
        let mut fast = track("athlete/a", 5_000.0, 600.0);
        fast.max_speed_kmh = 52.0;
        let records = vec![track("athlete/a", 5_000.0, 1_200.0), fast];
        let ranked = PeakSpeedStrategy.reduce(&records);
        assert_eq!(ranked[0].value, 52.0);
    }

    #[test]
    fn average_speed_excludes_zero_duration_subjects() {
        // Nonzero distance but zero total duration: must not appear, not
        // even as infinity.
        let records = vec![
            track("athlete/z", 9_000.0, 0.0),
            track("athlete/z", 8_000.0, 0.0),
            track("athlete/z", 7_000.0, 0.0),
            track("athlete/a", 10_000.0, 3_600.0),
            track("athlete/a", 10_000.0, 3_600.0),
            track("athlete/a", 10_000.0, 3_600.0),
        ];
        let ranked = AverageSpeedStrategy::default().reduce(&records);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].subject_id, "athlete/a");
        assert!((ranked[0].value - 10.0).abs() < 1e-9);
    }

    #[test]
    fn average_speed_applies_minimum_sample_floor() {
        let records = vec![
            track("athlete/sprinter", 1_000.0, 60.0),
            track("athlete/steady", 10_000.0, 3_600.0),
            track("athlete/steady", 10_000.0, 3_600.0),
            track("athlete/steady", 10_000.0, 3_600.0),
        ];
        let ranked = AverageSpeedStrategy::default().reduce(&records);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].subject_id, "athlete/steady");
    }

    #[test]
    fn ties_break_by_ascending_subject_id() {
        let mut ranked = vec![
            RankedValue { subject_id: "athlete/b".to_string(), value: 10.0 },
            RankedValue { subject_id: "athlete/a".to_string(), value: 10.0 },
            RankedValue { subject_id: "athlete/c".to_string(), value: 12.0 },
        ];
        sort_ranked(&mut ranked);
        let order: Vec<&str> = ranked.iter().map(|r| r.subject_id.as_str()).collect();
        assert_eq!(order, vec!["athlete/c", "athlete/a", "athlete/b"]);
    }

    #[tokio::test]
    async fn registry_truncates_to_limit() {
        let reader = FixedReader {
            records: vec![
                track("athlete/a", 10_000.0, 3_600.0),
                track("athlete/b", 8_000.0, 3_600.0),
                track("athlete/c", 6_000.0, 3_600.0),
            ],
        };
        let registry = AggregatorRegistry::with_defaults();
        let (start, end) = window();
        let ranked = registry
            .aggregate(&reader, Metric::Distance, start, end, Scope::Global, None, 2)
            .await
            .unwrap();
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].subject_id, "athlete/a");
    }

    #[tokio::test]
    async fn scoped_aggregation_over_untagged_data_is_empty() {
        let reader = FixedReader {
            records: vec![
                track("athlete/a", 10_000.0, 3_600.0),
                track("athlete/b", 8_000.0, 3_600.0),
            ],
        };
        let registry = AggregatorRegistry::with_defaults();
        let (start, end) = window();
        let ranked = registry
            .aggregate(
                &reader,
                Metric::Distance,
                start,
                end,
                Scope::Regional,
                Some("bavaria"),
                100,
            )
            .await
            .unwrap();
        assert!(ranked.is_empty());
    }

    #[tokio::test]
    async fn national_scope_filters_by_country_tag() {
        let reader = FixedReader {
            records: vec![
                tagged("athlete/de", "DE"),
                tagged("athlete/fr", "FR"),
                track("athlete/untagged", 20_000.0, 3_600.0),
            ],
        };
        let registry = AggregatorRegistry::with_defaults();
        let (start, end) = window();
        let ranked = registry
            .aggregate(
                &reader,
                Metric::Distance,
                start,
                end,
                Scope::National,
                Some("DE"),
                100,
            )
            .await
            .unwrap();
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].subject_id, "athlete/de");
    }
}
