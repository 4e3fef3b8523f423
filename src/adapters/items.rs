use {
    crate::{
        AppState,
        adapters::{api_errors::ApiError, caller::Caller, params::parse_id},
        domain::{
            item::{Item, ItemPatch, NewItem},
            permission::Capability,
        },
        services::inventory,
    },
    axum::{
        Json,
        extract::{Path, State},
        http::StatusCode,
    },
};

pub async fn list_items(
    State(state): State<AppState>,
    caller: Caller,
) -> Result<Json<Vec<Item>>, ApiError> {
    state.permissions.require(caller.role, Capability::Read)?;
    Ok(Json(inventory::list_items(&state.pool).await?))
}

pub async fn get_item(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<String>,
) -> Result<Json<Item>, ApiError> {
    state.permissions.require(caller.role, Capability::Read)?;
    let id = parse_id("item id", &id)?;
    Ok(Json(inventory::get_item(&state.pool, id).await?))
}

pub async fn create_item(
    State(state): State<AppState>,
    caller: Caller,
    Json(item): Json<NewItem>,
) -> Result<(StatusCode, Json<Item>), ApiError> {
    state.permissions.require(caller.role, Capability::Create)?;
    let created = inventory::create_item(&state.pool, &item, &caller.actor).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn update_item(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<String>,
    Json(patch): Json<ItemPatch>,
) -> Result<Json<Item>, ApiError> {
    state.permissions.require(caller.role, Capability::Update)?;
    let id = parse_id("item id", &id)?;
    Ok(Json(
        inventory::update_item(&state.pool, id, &patch, &caller.actor).await?,
    ))
}

pub async fn delete_item(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state.permissions.require(caller.role, Capability::Delete)?;
    let id = parse_id("item id", &id)?;
    let deleted = inventory::delete_item(&state.pool, id, &caller.actor).await?;
    Ok(Json(serde_json::json!({
        "message": "item deleted",
        "item": deleted,
    })))
}
