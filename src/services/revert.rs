use {
    crate::domain::diff,
    crate::domain::error::HistoryError,
    crate::domain::event::{Action, ChangeEvent},
    crate::domain::item::{Item, NewItem},
    crate::infra::postgres::item_repo,
    crate::services::{history::get_event, recorder},
    serde::Serialize,
    sqlx::{Connection, PgPool, Postgres, Transaction},
};

#[derive(Debug, Clone, Serialize)]
pub struct RevertOutcome {
    pub item: Item,
    pub reverted_action: Action,
    /// `None` when the REVERT row could not be written; the item change
    /// itself still stands.
    pub revert_event: Option<ChangeEvent>,
}

/// Restore the state `event_id` started from and log a REVERT event.
///
/// Reverting an UPDATE overwrites the live item with the fields captured
/// before that update. Reverting a DELETE inserts the captured item again
/// under a new id. The REVERT row is written in a savepoint: if it fails,
/// the failure is logged and the restored item is committed regardless.
pub async fn revert_event(
    pool: &PgPool,
    event_id: i64,
    actor: &str,
) -> Result<RevertOutcome, HistoryError> {
    let event = get_event(pool, event_id).await?;
    if !event.action.is_revertible() {
        return Err(HistoryError::Unsupported(format!(
            "{} events cannot be reverted, only UPDATE and DELETE",
            event.action
        )));
    }
    let patch = diff::reconstruct(&event)?;

    let mut tx = pool.begin().await?;

    let item = match event.action {
        Action::Update => {
            item_repo::lock_item(&mut tx, event.item_id)
                .await?
                .ok_or_else(|| deleted_since(&event))?;
            item_repo::update_item(&mut tx, event.item_id, &patch, Some(actor))
                .await?
                .ok_or_else(|| deleted_since(&event))?
        }
        Action::Delete => {
            let restored = NewItem::from_patch(patch)?;
            restored.validate()?;
            item_repo::insert_item(&mut tx, &restored, actor).await?
        }
        other => {
            return Err(HistoryError::Unsupported(format!(
                "{other} events cannot be reverted"
            )));
        }
    };

    let revert_event = log_revert(&mut tx, item.id, &event, actor).await;
    tx.commit().await?;

    tracing::info!(
        event_id,
        item_id = item.id,
        action = %event.action,
        actor,
        "change reverted"
    );

    Ok(RevertOutcome {
        item,
        reverted_action: event.action,
        revert_event,
    })
}

/// Best-effort REVERT row. Runs in a savepoint so a failure here leaves the
/// surrounding transaction usable.
async fn log_revert(
    tx: &mut Transaction<'_, Postgres>,
    item_id: i64,
    original: &ChangeEvent,
    actor: &str,
) -> Option<ChangeEvent> {
    let mut savepoint = match Connection::begin(&mut **tx).await {
        Ok(sp) => sp,
        Err(e) => {
            tracing::error!(event_id = original.id, item_id, error = %e, "failed to log revert");
            return None;
        }
    };

    match recorder::record_revert(&mut savepoint, item_id, original, actor).await {
        Ok(logged) => match savepoint.commit().await {
            Ok(()) => Some(logged),
            Err(e) => {
                tracing::error!(event_id = original.id, item_id, error = %e, "failed to log revert");
                None
            }
        },
        Err(e) => {
            tracing::error!(event_id = original.id, item_id, error = %e, "failed to log revert");
            if let Err(e) = savepoint.rollback().await {
                tracing::error!(event_id = original.id, error = %e, "savepoint rollback failed");
            }
            None
        }
    }
}

fn deleted_since(event: &ChangeEvent) -> HistoryError {
    HistoryError::NotFound(format!(
        "item {} no longer exists; revert its DELETE event instead",
        event.item_id
    ))
}
