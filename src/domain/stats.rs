use {
    chrono::{DateTime, Utc},
    serde::Serialize,
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionStats {
    pub action: String,
    pub count: i64,
    pub unique_actors: i64,
    pub first_change: Option<DateTime<Utc>>,
    pub last_change: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActorStats {
    pub actor: String,
    pub change_count: i64,
    pub items_affected: i64,
    pub actions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryStats {
    pub total_changes: i64,
    pub first_record: Option<DateTime<Utc>>,
    pub last_record: Option<DateTime<Utc>>,
    pub action_stats: Vec<ActionStats>,
    pub actor_stats: Vec<ActorStats>,
}

/// Number of actors reported in [`HistoryStats::actor_stats`].
pub const TOP_ACTORS: i64 = 10;
