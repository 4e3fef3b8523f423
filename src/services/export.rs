use {
    crate::domain::error::HistoryError,
    crate::domain::event::ChangeEvent,
    crate::domain::filter::{HistoryFilter, Scope},
    crate::domain::snapshot::Snapshot,
    crate::infra::postgres::history_repo,
    chrono::{DateTime, Utc},
    sqlx::PgPool,
};

pub const EXPORT_HEADER: [&str; 10] = [
    "ID",
    "Item ID",
    "Item Name",
    "Action",
    "Changed By",
    "Changed At",
    "Old Data",
    "New Data",
    "Changes",
    "Changed Fields Count",
];

#[derive(Debug, Clone)]
pub struct ExportFile {
    pub filename: String,
    pub content: Vec<u8>,
}

/// One item's history as CSV, oldest event first.
pub async fn export_item_history(
    pool: &PgPool,
    item_id: i64,
    filter: HistoryFilter,
) -> Result<ExportFile, HistoryError> {
    let query = filter.for_item(item_id).compile(Scope::Export)?;
    let mut events = history_repo::fetch_page(pool, &query).await?;
    events.reverse();

    let content = write_csv(&events)?;
    let filename = export_filename(item_id, Utc::now());
    tracing::info!(item_id, rows = events.len(), %filename, "history exported");

    Ok(ExportFile { filename, content })
}

pub fn export_filename(item_id: i64, at: DateTime<Utc>) -> String {
    format!("history_item_{item_id}_{}.csv", at.format("%Y%m%d_%H%M%S"))
}

pub fn write_csv(events: &[ChangeEvent]) -> Result<Vec<u8>, HistoryError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(EXPORT_HEADER)?;

    for event in events {
        let diff = serde_json::to_string(&event.diff)?;
        writer.write_record([
            event.id.to_string(),
            event.item_id.to_string(),
            event.item_name.clone().unwrap_or_default(),
            event.action.to_string(),
            event.actor.clone(),
            event.changed_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            snapshot_cell(event.before.as_ref())?,
            snapshot_cell(event.after.as_ref())?,
            diff,
            event.diff.len().to_string(),
        ])?;
    }

    writer
        .into_inner()
        .map_err(|e| HistoryError::Export(e.into_error().into()))
}

fn snapshot_cell(snapshot: Option<&Snapshot>) -> Result<String, HistoryError> {
    match snapshot {
        Some(s) => Ok(serde_json::to_string(s)?),
        None => Ok(String::new()),
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::domain::diff::DiffMap,
        crate::domain::event::Action,
        chrono::TimeZone,
        serde_json::json,
    };

    fn event(id: i64, action: Action, before: Option<serde_json::Value>, after: Option<serde_json::Value>, diff: serde_json::Value) -> ChangeEvent {
        ChangeEvent {
            id,
            item_id: 9,
            item_name: Some("Widget".into()),
            action,
            actor: "alice".into(),
            changed_at: Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 5).unwrap(),
            before: Snapshot::from_stored(before),
            after: Snapshot::from_stored(after),
            diff: DiffMap::from_stored(Some(diff)),
            reverted_from: None,
        }
    }

    #[test]
    fn csv_has_header_and_exact_field_counts() {
        let events = vec![
            event(1, Action::Create, None, Some(json!({"name": "Widget", "quantity": 5})), json!({})),
            event(
                2,
                Action::Update,
                Some(json!({"name": "Widget", "quantity": 5})),
                Some(json!({"name": "Widget", "quantity": 8})),
                json!({"quantity": {"old": 5, "new": 8}}),
            ),
            event(3, Action::Delete, Some(json!({"name": "Widget", "quantity": 8})), None, json!({})),
        ];

        let bytes = write_csv(&events).unwrap();
        let mut reader = csv::Reader::from_reader(bytes.as_slice());
        let headers = reader.headers().unwrap().clone();
        assert_eq!(headers.iter().collect::<Vec<_>>(), EXPORT_HEADER.to_vec());

        let rows: Vec<csv::StringRecord> = reader.records().map(Result::unwrap).collect();
        assert_eq!(rows.len(), 3);
        let counts: Vec<&str> = rows.iter().map(|r| &r[9]).collect();
        assert_eq!(counts, vec!["0", "1", "0"]);
        assert_eq!(&rows[0][3], "CREATE");
        assert_eq!(&rows[0][5], "2024-03-01 12:30:05");
        assert_eq!(&rows[0][6], "");
        assert_eq!(&rows[2][7], "");
        assert_eq!(&rows[1][8], r#"{"quantity":{"old":5,"new":8}}"#);
    }

    #[test]
    fn filename_carries_item_and_timestamp() {
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 5).unwrap();
        assert_eq!(export_filename(17, at), "history_item_17_20240301_123005.csv");
    }
}
