use {
    crate::domain::error::HistoryError,
    crate::domain::item::{Item, ItemPatch, NewItem, Price, Quantity},
    chrono::{DateTime, Utc},
    sqlx::{PgPool, Postgres, Transaction},
};

const ITEM_COLUMNS: &str =
    "id, name, description, quantity, price_cents, location, created_at, updated_at, created_by";

#[derive(sqlx::FromRow)]
struct ItemRow {
    id: i64,
    name: String,
    description: String,
    quantity: i32,
    price_cents: i64,
    location: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    created_by: String,
}

impl TryFrom<ItemRow> for Item {
    type Error = HistoryError;

    fn try_from(row: ItemRow) -> Result<Self, Self::Error> {
        Ok(Item {
            id: row.id,
            name: row.name,
            description: row.description,
            quantity: Quantity::new(row.quantity.into())?,
            price: Price::from_cents(row.price_cents)?,
            location: row.location,
            created_at: row.created_at,
            updated_at: row.updated_at,
            created_by: row.created_by,
        })
    }
}

pub async fn insert_item(
    tx: &mut Transaction<'_, Postgres>,
    item: &NewItem,
    actor: &str,
) -> Result<Item, HistoryError> {
    let row = sqlx::query_as::<_, ItemRow>(&format!(
        r#"
        INSERT INTO items (name, description, quantity, price_cents, location, created_by)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING {ITEM_COLUMNS}
        "#
    ))
    .bind(&item.name)
    .bind(&item.description)
    .bind(item.quantity.get())
    .bind(item.price.cents())
    .bind(&item.location)
    .bind(actor)
    .fetch_one(&mut **tx)
    .await?;

    row.try_into()
}

pub async fn get_item(pool: &PgPool, id: i64) -> Result<Option<Item>, HistoryError> {
    let row = sqlx::query_as::<_, ItemRow>(&format!(
        "SELECT {ITEM_COLUMNS} FROM items WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    row.map(Item::try_from).transpose()
}

/// Read the row and hold its lock until the transaction ends. Serializes
/// concurrent mutations of the same item.
pub async fn lock_item(
    tx: &mut Transaction<'_, Postgres>,
    id: i64,
) -> Result<Option<Item>, HistoryError> {
    let row = sqlx::query_as::<_, ItemRow>(&format!(
        "SELECT {ITEM_COLUMNS} FROM items WHERE id = $1 FOR UPDATE"
    ))
    .bind(id)
    .fetch_optional(&mut **tx)
    .await?;

    row.map(Item::try_from).transpose()
}

pub async fn list_items(pool: &PgPool) -> Result<Vec<Item>, HistoryError> {
    let rows = sqlx::query_as::<_, ItemRow>(&format!(
        "SELECT {ITEM_COLUMNS} FROM items ORDER BY id"
    ))
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(Item::try_from).collect()
}

/// Apply the fields present in `patch`. `modified_by`, when given, replaces
/// `created_by` (reverts re-attribute the row). Returns `None` if the row
/// no longer exists.
pub async fn update_item(
    tx: &mut Transaction<'_, Postgres>,
    id: i64,
    patch: &ItemPatch,
    modified_by: Option<&str>,
) -> Result<Option<Item>, HistoryError> {
    let row = sqlx::query_as::<_, ItemRow>(&format!(
        r#"
        UPDATE items
        SET name = COALESCE($2, name),
            description = COALESCE($3, description),
            quantity = COALESCE($4, quantity),
            price_cents = COALESCE($5, price_cents),
            location = COALESCE($6, location),
            created_by = COALESCE($7, created_by),
            updated_at = now()
        WHERE id = $1
        RETURNING {ITEM_COLUMNS}
        "#
    ))
    .bind(id)
    .bind(patch.name.as_deref())
    .bind(patch.description.as_deref())
    .bind(patch.quantity.map(|q| q.get()))
    .bind(patch.price.map(|p| p.cents()))
    .bind(patch.location.as_deref())
    .bind(modified_by)
    .fetch_optional(&mut **tx)
    .await?;

    row.map(Item::try_from).transpose()
}

/// Returns the deleted row, or `None` if it was already gone.
pub async fn delete_item(
    tx: &mut Transaction<'_, Postgres>,
    id: i64,
) -> Result<Option<Item>, HistoryError> {
    let row = sqlx::query_as::<_, ItemRow>(&format!(
        "DELETE FROM items WHERE id = $1 RETURNING {ITEM_COLUMNS}"
    ))
    .bind(id)
    .fetch_optional(&mut **tx)
    .await?;

    row.map(Item::try_from).transpose()
}
