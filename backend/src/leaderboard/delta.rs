use std::collections::HashMap;

use shared::LeaderboardEntry;

/// Annotates freshly ranked entries with their movement relative to the
/// snapshot being superseded. `rank_change = previous_rank - new_rank`,
/// so positive means the subject moved toward rank 1. Subjects absent
/// from the previous snapshot get 0.
///
/// This is the only place rank history crosses snapshot boundaries; only
/// the immediately superseded snapshot is consulted, never older history.
pub fn annotate(new_entries: &mut [LeaderboardEntry], previous: Option<&[LeaderboardEntry]>) {
    let previous_ranks: HashMap<&str, u32> = previous
        .map(|entries| {
            entries
                .iter()
                .map(|e| (e.subject_id.as_str(), e.rank))
                .collect()
        })
        .unwrap_or_default();

    for entry in new_entries {
        entry.rank_change = previous_ranks
            .get(entry.subject_id.as_str())
            .map(|prev| *prev as i64 - entry.rank as i64)
            .unwrap_or(0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn entry(subject: &str, rank: u32) -> LeaderboardEntry {
        LeaderboardEntry {
            subject_id: subject.to_string(),
            display_name: subject.to_string(),
            avatar_url: None,
            rank,
            value: 100.0 / rank as f64,
            rank_change: 0,
        }
    }

    #[test]
    fn swapped_leaders_and_a_new_entrant() {
        let previous = vec![entry("A", 1), entry("B", 2), entry("C", 3)];
        let mut new_entries = vec![entry("B", 1), entry("A", 2), entry("D", 3)];

        annotate(&mut new_entries, Some(&previous));

        assert_eq!(new_entries[0].rank_change, 1); // B: 2 -> 1
        assert_eq!(new_entries[1].rank_change, -1); // A: 1 -> 2
        assert_eq!(new_entries[2].rank_change, 0); // D: new entrant
    }

    #[test]
    fn no_previous_snapshot_means_all_zero() {
        let mut new_entries = vec![entry("A", 1), entry("B", 2)];
        annotate(&mut new_entries, None);
        assert!(new_entries.iter().all(|e| e.rank_change == 0));
    }

    #[test]
    fn unchanged_position_reports_zero() {
        let previous = vec![entry("A", 1)];
        let mut new_entries = vec![entry("A", 1)];
        annotate(&mut new_entries, Some(&previous));
        assert_eq!(new_entries[0].rank_change, 0);
    }
}
