use {
    crate::domain::diff::DiffEntry,
    crate::domain::error::HistoryError,
    crate::domain::event::ChangeEvent,
    crate::domain::filter::{HistoryFilter, Scope},
    crate::domain::stats::HistoryStats,
    crate::infra::postgres::history_repo,
    serde::Serialize,
    sqlx::PgPool,
};

#[derive(Debug, Clone, Serialize)]
pub struct HistoryPage {
    #[serde(rename = "history")]
    pub events: Vec<ChangeEvent>,
    /// Matches across all pages, not just this one.
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

/// Filtered page of the history log plus the total match count. The two
/// reads are separate statements and may observe slightly different moments.
pub async fn fetch_history(
    pool: &PgPool,
    filter: &HistoryFilter,
    scope: Scope,
) -> Result<HistoryPage, HistoryError> {
    let query = filter.compile(scope)?;
    let events = history_repo::fetch_page(pool, &query).await?;
    let total = history_repo::count(pool, &query.predicates).await?;

    Ok(HistoryPage {
        events,
        total,
        limit: query.limit,
        offset: query.offset,
    })
}

pub async fn item_history(
    pool: &PgPool,
    item_id: i64,
    filter: HistoryFilter,
) -> Result<HistoryPage, HistoryError> {
    fetch_history(pool, &filter.for_item(item_id), Scope::Filter).await
}

pub async fn get_event(pool: &PgPool, event_id: i64) -> Result<ChangeEvent, HistoryError> {
    history_repo::get_event(pool, event_id)
        .await?
        .ok_or_else(|| HistoryError::NotFound(format!("history record {event_id} not found")))
}

/// Field-level changes of one event, ordered by field name.
pub async fn event_diff(pool: &PgPool, event_id: i64) -> Result<Vec<DiffEntry>, HistoryError> {
    let event = get_event(pool, event_id).await?;
    Ok(event.diff.entries())
}

pub async fn stats(pool: &PgPool) -> Result<HistoryStats, HistoryError> {
    history_repo::stats(pool).await
}
