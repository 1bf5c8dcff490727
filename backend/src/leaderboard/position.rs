use shared::LeaderboardSnapshot;

/// A subject's standing within one materialized snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct SubjectPosition {
    pub rank: u32,
    pub value: f64,
    pub total: u32,
    pub percentile: u32,
    pub change: i64,
}

/// Pure read over an already-materialized snapshot; never triggers
/// regeneration. `percentile = round(rank / total * 100)`.
pub fn locate(snapshot: &LeaderboardSnapshot, subject_id: &str) -> Option<SubjectPosition> {
    let total = snapshot.entries.len() as u32;
    snapshot
        .entries
        .iter()
        .find(|e| e.subject_id == subject_id)
        .map(|e| SubjectPosition {
            rank: e.rank,
            value: e.value,
            total,
            percentile: (e.rank as f64 / total as f64 * 100.0).round() as u32,
            change: e.rank_change,
        })
}
