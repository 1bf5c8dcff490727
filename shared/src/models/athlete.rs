use serde::{Deserialize, Serialize};

/// Public display fields of an athlete profile, as copied into leaderboard
/// entries at enrichment time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayInfo {
    pub display_name: String,
    pub avatar_url: Option<String>,
}
