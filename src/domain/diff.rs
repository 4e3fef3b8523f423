//! Field-level comparison of snapshots and reconstruction of prior state.

use {
    super::error::HistoryError,
    super::event::ChangeEvent,
    super::item::{ItemPatch, Price, Quantity},
    super::snapshot::{
        FIELD_DESCRIPTION, FIELD_LOCATION, FIELD_NAME, FIELD_PRICE, FIELD_QUANTITY, Snapshot,
    },
    serde::{Deserialize, Serialize},
    serde_json::Value,
    std::collections::{BTreeMap, BTreeSet},
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Change {
    #[serde(default)]
    pub old: Value,
    #[serde(default)]
    pub new: Value,
}

/// One changed field, as returned to callers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiffEntry {
    pub field: String,
    pub old: Value,
    pub new: Value,
}

/// Changed fields keyed by name. Stored as `{"field": {"old": .., "new": ..}}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DiffMap(BTreeMap<String, Change>);

impl DiffMap {
    /// Read a stored diff. Entries that are not `{old, new}` objects are
    /// dropped rather than failing the whole row.
    pub fn from_stored(value: Option<Value>) -> Self {
        let Some(Value::Object(fields)) = value else {
            return Self::default();
        };

        let changes = fields
            .into_iter()
            .filter_map(|(field, entry)| match entry {
                Value::Object(_) => serde_json::from_value::<Change>(entry)
                    .ok()
                    .map(|change| (field, change)),
                _ => None,
            })
            .collect();

        Self(changes)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn get(&self, field: &str) -> Option<&Change> {
        self.0.get(field)
    }

    /// Entries ordered by field name.
    pub fn entries(&self) -> Vec<DiffEntry> {
        self.0
            .iter()
            .map(|(field, change)| DiffEntry {
                field: field.clone(),
                old: change.old.clone(),
                new: change.new.clone(),
            })
            .collect()
    }

    pub fn to_value(&self) -> Result<Value, HistoryError> {
        Ok(serde_json::to_value(self)?)
    }
}

/// Fields whose values differ between `before` and `after`. A field missing
/// on one side compares as null.
pub fn diff(before: &Snapshot, after: &Snapshot) -> DiffMap {
    let fields: BTreeSet<&String> = before.fields().chain(after.fields()).collect();

    let changes = fields
        .into_iter()
        .filter_map(|field| {
            let old = before.get(field).cloned().unwrap_or(Value::Null);
            let new = after.get(field).cloned().unwrap_or(Value::Null);
            (!values_equal(&old, &new)).then(|| (field.clone(), Change { old, new }))
        })
        .collect();

    DiffMap(changes)
}

/// Structural equality. Numbers compare by value regardless of formatting,
/// including numeric strings against numbers; strings compare exactly.
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        (Value::Number(n), Value::String(s)) | (Value::String(s), Value::Number(n)) => {
            match (s.trim().parse::<f64>(), n.as_f64()) {
                (Ok(parsed), Some(number)) => parsed == number,
                _ => false,
            }
        }
        (Value::Object(x), Value::Object(y)) => {
            let keys: BTreeSet<&String> = x.keys().chain(y.keys()).collect();
            keys.into_iter().all(|key| {
                values_equal(
                    x.get(key).unwrap_or(&Value::Null),
                    y.get(key).unwrap_or(&Value::Null),
                )
            })
        }
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(l, r)| values_equal(l, r))
        }
        _ => a == b,
    }
}

/// Attribute set needed to restore the state an event started from.
pub fn reconstruct(event: &ChangeEvent) -> Result<ItemPatch, HistoryError> {
    let before = event
        .before
        .as_ref()
        .filter(|snap| !snap.is_empty())
        .ok_or_else(|| no_prior_state(event.id))?;

    let patch = ItemPatch {
        name: text_field(event.id, before, FIELD_NAME),
        description: text_field(event.id, before, FIELD_DESCRIPTION),
        quantity: number_field(event.id, before, FIELD_QUANTITY).and_then(|n| {
            let whole = (n.fract() == 0.0).then_some(n as i64);
            whole
                .and_then(|n| Quantity::new(n).ok())
                .or_else(|| skip(event.id, FIELD_QUANTITY))
        }),
        price: number_field(event.id, before, FIELD_PRICE)
            .and_then(|n| Price::from_decimal(n).ok().or_else(|| skip(event.id, FIELD_PRICE))),
        location: text_field(event.id, before, FIELD_LOCATION),
    };

    if patch.is_empty() {
        return Err(no_prior_state(event.id));
    }
    Ok(patch)
}

fn no_prior_state(event_id: i64) -> HistoryError {
    HistoryError::Unsupported(format!("event {event_id} has no prior state available"))
}

fn skip<T>(event_id: i64, field: &str) -> Option<T> {
    tracing::warn!(event_id, field, "skipping malformed snapshot field");
    None
}

fn text_field(event_id: i64, snap: &Snapshot, field: &str) -> Option<String> {
    match snap.get(field)? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => skip(event_id, field),
    }
}

fn number_field(event_id: i64, snap: &Snapshot, field: &str) -> Option<f64> {
    match snap.get(field)? {
        Value::Null => None,
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().or_else(|| skip(event_id, field)),
        _ => skip(event_id, field),
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::domain::event::Action,
        chrono::Utc,
        serde_json::json,
    };

    fn snap(value: Value) -> Snapshot {
        Snapshot::from_stored(Some(value)).unwrap()
    }

    fn event(action: Action, before: Option<Value>) -> ChangeEvent {
        ChangeEvent {
            id: 42,
            item_id: 1,
            item_name: None,
            action,
            actor: "alice".into(),
            changed_at: Utc::now(),
            before: Snapshot::from_stored(before),
            after: None,
            diff: DiffMap::default(),
            reverted_from: None,
        }
    }

    #[test]
    fn diff_reports_only_changed_fields() {
        let before = snap(json!({"name": "Widget", "quantity": 5, "price": 9.99}));
        let after = snap(json!({"name": "Widget", "quantity": 8, "price": 9.99}));
        let d = diff(&before, &after);
        assert_eq!(d.len(), 1);
        let change = d.get("quantity").unwrap();
        assert_eq!(change.old, json!(5));
        assert_eq!(change.new, json!(8));
    }

    #[test]
    fn numeric_formatting_does_not_count_as_change() {
        assert!(values_equal(&json!("10.0"), &json!(10.0)));
        assert!(values_equal(&json!(10), &json!(10.0)));
        assert!(!values_equal(&json!("10.0"), &json!("10")));
        assert!(!values_equal(&json!("abc"), &json!(1)));
    }

    #[test]
    fn absent_is_null_but_not_empty_or_zero() {
        let base = snap(json!({"name": "Widget"}));
        assert!(diff(&base, &snap(json!({"name": "Widget", "location": null}))).is_empty());
        assert_eq!(diff(&base, &snap(json!({"name": "Widget", "location": ""}))).len(), 1);
        assert_eq!(diff(&base, &snap(json!({"name": "Widget", "quantity": 0}))).len(), 1);
    }

    #[test]
    fn nested_objects_compare_structurally() {
        let a = json!({"dims": {"w": 1, "h": "2.0"}});
        let b = json!({"dims": {"h": 2, "w": 1.0}});
        assert!(values_equal(&a, &b));
    }

    #[test]
    fn stored_diff_drops_malformed_entries() {
        let d = DiffMap::from_stored(Some(json!({
            "quantity": {"old": 5, "new": 8},
            "reverted_from": 12,
            "price": {"new": 1.5},
        })));
        assert_eq!(d.fields().collect::<Vec<_>>(), vec!["price", "quantity"]);
        assert_eq!(d.get("price").unwrap().old, Value::Null);
        assert!(DiffMap::from_stored(Some(json!("garbage"))).is_empty());
        assert!(DiffMap::from_stored(None).is_empty());
    }

    #[test]
    fn stored_diff_round_trips_through_value() {
        let d = diff(&snap(json!({"quantity": 5})), &snap(json!({"quantity": 8})));
        let value = d.to_value().unwrap();
        assert_eq!(value, json!({"quantity": {"old": 5, "new": 8}}));
        assert_eq!(DiffMap::from_stored(Some(value)), d);
    }

    #[test]
    fn reconstruct_reads_prior_attributes() {
        let e = event(
            Action::Update,
            Some(json!({"name": "Widget", "quantity": 5, "price": "9.99", "location": "A1"})),
        );
        let patch = reconstruct(&e).unwrap();
        assert_eq!(patch.name.as_deref(), Some("Widget"));
        assert_eq!(patch.quantity.unwrap().get(), 5);
        assert_eq!(patch.price.unwrap().cents(), 999);
        assert_eq!(patch.location.as_deref(), Some("A1"));
        assert!(patch.description.is_none());
    }

    #[test]
    fn reconstruct_skips_malformed_fields() {
        let e = event(
            Action::Update,
            Some(json!({"name": "Widget", "quantity": -4, "price": "cheap"})),
        );
        let patch = reconstruct(&e).unwrap();
        assert_eq!(patch.name.as_deref(), Some("Widget"));
        assert!(patch.quantity.is_none());
        assert!(patch.price.is_none());
    }

    #[test]
    fn reconstruct_without_prior_state_fails() {
        for before in [None, Some(json!({})), Some(json!({"unrelated": true}))] {
            let e = event(Action::Delete, before);
            assert!(matches!(reconstruct(&e), Err(HistoryError::Unsupported(_))));
        }
    }
}
