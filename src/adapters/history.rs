use {
    crate::{
        AppState,
        adapters::{
            api_errors::ApiError,
            caller::Caller,
            params::{HistoryParams, parse_id},
        },
        domain::{diff::DiffEntry, filter::Scope, permission::Capability, stats::HistoryStats},
        services::{
            export,
            history::{self, HistoryPage},
            revert,
        },
    },
    axum::{
        Json,
        extract::{Path, Query, State},
        http::header,
        response::IntoResponse,
    },
};

pub async fn list_history(
    State(state): State<AppState>,
    caller: Caller,
    Query(params): Query<HistoryParams>,
) -> Result<Json<HistoryPage>, ApiError> {
    state.permissions.require(caller.role, Capability::History)?;
    let filter = params.into_filter()?;
    Ok(Json(
        history::fetch_history(&state.pool, &filter, Scope::Filter).await?,
    ))
}

pub async fn search_history(
    State(state): State<AppState>,
    caller: Caller,
    Query(params): Query<HistoryParams>,
) -> Result<Json<HistoryPage>, ApiError> {
    state.permissions.require(caller.role, Capability::History)?;
    let filter = params.into_filter()?;
    Ok(Json(
        history::fetch_history(&state.pool, &filter, Scope::Search).await?,
    ))
}

pub async fn item_history(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<String>,
    Query(params): Query<HistoryParams>,
) -> Result<Json<HistoryPage>, ApiError> {
    state.permissions.require(caller.role, Capability::History)?;
    let id = parse_id("item id", &id)?;
    let filter = params.into_filter()?;
    Ok(Json(history::item_history(&state.pool, id, filter).await?))
}

pub async fn event_diff(
    State(state): State<AppState>,
    caller: Caller,
    Path(event_id): Path<String>,
) -> Result<Json<Vec<DiffEntry>>, ApiError> {
    state.permissions.require(caller.role, Capability::History)?;
    let event_id = parse_id("history id", &event_id)?;
    Ok(Json(history::event_diff(&state.pool, event_id).await?))
}

pub async fn history_stats(
    State(state): State<AppState>,
    caller: Caller,
) -> Result<Json<HistoryStats>, ApiError> {
    state.permissions.require(caller.role, Capability::History)?;
    Ok(Json(history::stats(&state.pool).await?))
}

pub async fn export_item_history(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<String>,
    Query(params): Query<HistoryParams>,
) -> Result<impl IntoResponse, ApiError> {
    state.permissions.require(caller.role, Capability::History)?;
    let id = parse_id("item id", &id)?;
    let filter = params.into_filter()?;
    let file = export::export_item_history(&state.pool, id, filter).await?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename={}", file.filename),
            ),
        ],
        file.content,
    ))
}

pub async fn revert_change(
    State(state): State<AppState>,
    caller: Caller,
    Path(event_id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state.permissions.require_revert(caller.role)?;
    let event_id = parse_id("history id", &event_id)?;
    let outcome = revert::revert_event(&state.pool, event_id, &caller.actor).await?;

    Ok(Json(serde_json::json!({
        "message": "change reverted",
        "item_id": outcome.item.id,
        "item_name": outcome.item.name,
        "action": outcome.reverted_action,
        "revert_event_id": outcome.revert_event.map(|e| e.id),
    })))
}
