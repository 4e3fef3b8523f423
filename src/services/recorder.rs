use {
    crate::domain::error::HistoryError,
    crate::domain::event::{Action, ChangeEvent, NewChangeEvent},
    crate::domain::snapshot::Snapshot,
    crate::infra::postgres::history_repo::insert_event,
    sqlx::{Postgres, Transaction},
};

/// Append one history row inside the caller's transaction. The item write
/// and this row commit or roll back together.
pub async fn record(
    tx: &mut Transaction<'_, Postgres>,
    action: Action,
    item_id: i64,
    before: Option<Snapshot>,
    after: Option<Snapshot>,
    actor: &str,
) -> Result<ChangeEvent, HistoryError> {
    let event = NewChangeEvent::new(action, item_id, before, after, actor)?;
    insert_event(tx, &event).await
}

/// Log that `original` was reverted. Snapshots are swapped: the new row goes
/// from the state the original produced back to the state it replaced.
pub async fn record_revert(
    tx: &mut Transaction<'_, Postgres>,
    item_id: i64,
    original: &ChangeEvent,
    actor: &str,
) -> Result<ChangeEvent, HistoryError> {
    let event = NewChangeEvent::new(
        Action::Revert,
        item_id,
        original.after.clone(),
        original.before.clone(),
        actor,
    )?
    .reverting(original.id);
    insert_event(tx, &event).await
}
