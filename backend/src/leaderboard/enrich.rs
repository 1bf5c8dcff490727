use std::sync::Arc;

use shared::{LeaderboardEntry, Result};

use crate::profile::reader::ProfileReader;

use super::aggregate::RankedValue;

/// Turns ranked values into presentable entries by resolving each
/// subject's display info. Subjects whose profile cannot be resolved
/// (deleted accounts) are dropped and the remaining ranks recompacted
/// to 1..N, so a published snapshot never has gaps.
pub struct EntryEnricher {
    profiles: Arc<dyn ProfileReader>,
}

impl EntryEnricher {
    pub fn new(profiles: Arc<dyn ProfileReader>) -> Self {
        Self { profiles }
    }

    pub async fn enrich(&self, ranked: Vec<RankedValue>) -> Result<Vec<LeaderboardEntry>> {
        let mut entries = Vec::with_capacity(ranked.len());
        for value in ranked {
            match self.profiles.get_display_info(&value.subject_id).await? {
                Some(info) => entries.push(LeaderboardEntry {
                    subject_id: value.subject_id,
                    display_name: info.display_name,
                    avatar_url: info.avatar_url,
                    rank: 0,
                    value: value.value,
                    rank_change: 0,
                }),
                None => {
                    log::debug!(
                        "Dropping unresolvable subject {} from leaderboard",
                        value.subject_id
                    );
                }
            }
        }
        for (idx, entry) in entries.iter_mut().enumerate() {
            entry.rank = idx as u32 + 1;
        }
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use shared::DisplayInfo;

    struct FakeProfiles;

    #[async_trait]
    impl ProfileReader for FakeProfiles {
        async fn get_display_info(&self, subject_id: &str) -> Result<Option<DisplayInfo>> {
            if subject_id.contains("deleted") {
                return Ok(None);
            }
            Ok(Some(DisplayInfo {
                display_name: format!("Name of {}", subject_id),
                avatar_url: Some(format!("https://cdn.trackline.io/{}.png", subject_id)),
            }))
        }
    }

    fn ranked(subject: &str, value: f64) -> RankedValue {
        RankedValue {
            subject_id: subject.to_string(),
            value,
        }
    }

    #[tokio::test]
    async fn resolves_display_info_and_assigns_ranks() {
        let enricher = EntryEnricher::new(Arc::new(FakeProfiles));
        let entries = enricher
            .enrich(vec![ranked("athlete/a1", 42.0), ranked("athlete/a2", 17.0)])
            .await
            .unwrap();

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].rank, 1);
        assert_eq!(entries[0].display_name, "Name of athlete/a1");
        assert_eq!(entries[1].rank, 2);
        assert_eq!(entries[1].value, 17.0);
    }

    #[tokio::test]
    async fn dropped_subjects_leave_no_rank_gaps() {
        let enricher = EntryEnricher::new(Arc::new(FakeProfiles));
        let entries = enricher
            .enrich(vec![
                ranked("athlete/a1", 42.0),
                ranked("athlete/deleted", 30.0),
                ranked("athlete/a3", 17.0),
            ])
            .await
            .unwrap();

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].subject_id, "athlete/a1");
        assert_eq!(entries[0].rank, 1);
        assert_eq!(entries[1].subject_id, "athlete/a3");
        assert_eq!(entries[1].rank, 2);
    }

    #[tokio::test]
    async fn empty_input_enriches_to_empty() {
        let enricher = EntryEnricher::new(Arc::new(FakeProfiles));
        let entries = enricher.enrich(vec![]).await.unwrap();
        assert!(entries.is_empty());
    }
}
