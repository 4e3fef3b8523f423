use {
    crate::domain::error::HistoryError,
    crate::domain::event::Action,
    crate::domain::item::{Item, ItemPatch, NewItem},
    crate::infra::postgres::item_repo,
    crate::services::recorder,
    sqlx::PgPool,
};

pub async fn create_item(pool: &PgPool, item: &NewItem, actor: &str) -> Result<Item, HistoryError> {
    item.validate()?;

    let mut tx = pool.begin().await?;
    let created = item_repo::insert_item(&mut tx, item, actor).await?;
    recorder::record(
        &mut tx,
        Action::Create,
        created.id,
        None,
        Some(created.snapshot()),
        actor,
    )
    .await?;
    tx.commit().await?;

    tracing::info!(item_id = created.id, actor, "item created");
    Ok(created)
}

pub async fn get_item(pool: &PgPool, id: i64) -> Result<Item, HistoryError> {
    item_repo::get_item(pool, id)
        .await?
        .ok_or_else(|| item_not_found(id))
}

pub async fn list_items(pool: &PgPool) -> Result<Vec<Item>, HistoryError> {
    item_repo::list_items(pool).await
}

pub async fn update_item(
    pool: &PgPool,
    id: i64,
    patch: &ItemPatch,
    actor: &str,
) -> Result<Item, HistoryError> {
    patch.validate()?;

    let mut tx = pool.begin().await?;
    let before = item_repo::lock_item(&mut tx, id)
        .await?
        .ok_or_else(|| item_not_found(id))?;
    // The lock makes this unlikely, but a vanished row is still NotFound.
    let after = item_repo::update_item(&mut tx, id, patch, None)
        .await?
        .ok_or_else(|| item_not_found(id))?;

    let event = recorder::record(
        &mut tx,
        Action::Update,
        id,
        Some(before.snapshot()),
        Some(after.snapshot()),
        actor,
    )
    .await?;
    tx.commit().await?;

    tracing::info!(
        item_id = id,
        actor,
        changed_fields = event.diff.len(),
        "item updated"
    );
    Ok(after)
}

/// Remove the item; its history stays. Returns the state it had.
pub async fn delete_item(pool: &PgPool, id: i64, actor: &str) -> Result<Item, HistoryError> {
    let mut tx = pool.begin().await?;
    item_repo::lock_item(&mut tx, id)
        .await?
        .ok_or_else(|| item_not_found(id))?;
    let deleted = item_repo::delete_item(&mut tx, id)
        .await?
        .ok_or_else(|| item_not_found(id))?;

    recorder::record(
        &mut tx,
        Action::Delete,
        id,
        Some(deleted.snapshot()),
        None,
        actor,
    )
    .await?;
    tx.commit().await?;

    tracing::info!(item_id = id, actor, "item deleted");
    Ok(deleted)
}

pub(crate) fn item_not_found(id: i64) -> HistoryError {
    HistoryError::NotFound(format!("item {id} not found"))
}
