use {
    crate::domain::{error::HistoryError, event::Action, filter::HistoryFilter},
    chrono::{DateTime, NaiveDate, Utc},
    serde::Deserialize,
};

/// Raw query string of the history endpoints. Everything arrives as text so
/// malformed values are reported with the offending parameter named.
/// List parameters are comma-separated.
#[derive(Debug, Default, Deserialize)]
pub struct HistoryParams {
    #[serde(alias = "item_id")]
    pub entity_id: Option<String>,
    #[serde(alias = "changed_by")]
    pub actor: Option<String>,
    pub action: Option<String>,
    #[serde(alias = "from_date")]
    pub from_time: Option<String>,
    #[serde(alias = "to_date")]
    pub to_time: Option<String>,
    #[serde(alias = "q")]
    pub query: Option<String>,
    #[serde(alias = "item_name")]
    pub entity_name: Option<String>,
    pub actions: Option<String>,
    #[serde(alias = "users")]
    pub actors: Option<String>,
    pub limit: Option<String>,
    pub offset: Option<String>,
}

impl HistoryParams {
    pub fn into_filter(self) -> Result<HistoryFilter, HistoryError> {
        Ok(HistoryFilter {
            entity_id: present(self.entity_id.as_deref())
                .map(|v| parse_int("entity_id", v))
                .transpose()?,
            actor: present(self.actor.as_deref()).map(str::to_string),
            action: present(self.action.as_deref())
                .map(Action::try_from)
                .transpose()?,
            from_time: present(self.from_time.as_deref())
                .map(|v| parse_time("from_time", v, false))
                .transpose()?,
            to_time: present(self.to_time.as_deref())
                .map(|v| parse_time("to_time", v, true))
                .transpose()?,
            query: present(self.query.as_deref()).map(str::to_string),
            entity_name: present(self.entity_name.as_deref()).map(str::to_string),
            actions: split_list(self.actions.as_deref())
                .map(Action::try_from)
                .collect::<Result<_, _>>()?,
            actors: split_list(self.actors.as_deref()).map(str::to_string).collect(),
            limit: present(self.limit.as_deref())
                .map(|v| parse_int("limit", v))
                .transpose()?,
            offset: present(self.offset.as_deref())
                .map(|v| parse_int("offset", v))
                .transpose()?,
        })
    }
}

/// Numeric path or query identifier.
pub fn parse_id(name: &str, raw: &str) -> Result<i64, HistoryError> {
    parse_int(name, raw)
}

fn present(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn split_list(value: Option<&str>) -> impl Iterator<Item = &str> {
    value
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

fn parse_int(name: &str, raw: &str) -> Result<i64, HistoryError> {
    raw.trim()
        .parse::<i64>()
        .map_err(|_| HistoryError::Validation(format!("{name} must be an integer, got {raw:?}")))
}

/// RFC 3339 timestamp, or a bare `YYYY-MM-DD` date covering the whole day.
fn parse_time(name: &str, raw: &str, end_of_day: bool) -> Result<DateTime<Utc>, HistoryError> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| {
        HistoryError::Validation(format!(
            "{name} must be an RFC 3339 timestamp or YYYY-MM-DD date, got {raw:?}"
        ))
    })?;
    let time = if end_of_day {
        date.and_hms_micro_opt(23, 59, 59, 999_999)
    } else {
        date.and_hms_opt(0, 0, 0)
    };
    time.map(|t| t.and_utc())
        .ok_or_else(|| HistoryError::Validation(format!("{name} is out of range: {raw:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Flat string map, the shape axum's `Query` hands to serde.
    fn params(pairs: &str) -> HistoryParams {
        let map: serde_json::Map<String, serde_json::Value> = pairs
            .split('&')
            .filter_map(|p| p.split_once('='))
            .map(|(k, v)| (k.to_string(), serde_json::Value::from(v)))
            .collect();
        serde_json::from_value(serde_json::Value::Object(map)).unwrap()
    }

    #[test]
    fn aliases_from_the_web_client_are_accepted() {
        let filter = params("item_id=4&changed_by=alice&q=wid&users=bob,carol&actions=update,DELETE")
            .into_filter()
            .unwrap();
        assert_eq!(filter.entity_id, Some(4));
        assert_eq!(filter.actor.as_deref(), Some("alice"));
        assert_eq!(filter.query.as_deref(), Some("wid"));
        assert_eq!(filter.actors, vec!["bob", "carol"]);
        assert_eq!(filter.actions, vec![Action::Update, Action::Delete]);
    }

    #[test]
    fn non_numeric_values_name_the_parameter() {
        let err = params("entity_id=abc").into_filter().unwrap_err();
        assert!(matches!(&err, HistoryError::Validation(msg) if msg.contains("entity_id")));
        let err = params("limit=ten").into_filter().unwrap_err();
        assert!(matches!(&err, HistoryError::Validation(msg) if msg.contains("limit")));
    }

    #[test]
    fn unknown_action_rejected() {
        assert!(params("action=PATCH").into_filter().is_err());
        assert!(params("actions=UPDATE,NOPE").into_filter().is_err());
    }

    #[test]
    fn dates_cover_whole_days() {
        let filter = params("from_date=2024-03-01&to_date=2024-03-01").into_filter().unwrap();
        let from = filter.from_time.unwrap();
        let to = filter.to_time.unwrap();
        assert_eq!(from.to_rfc3339(), "2024-03-01T00:00:00+00:00");
        assert!(to > from);
        assert_eq!(to.date_naive(), from.date_naive());

        let filter = params("from_time=2024-03-01T10:00:00Z").into_filter().unwrap();
        assert_eq!(filter.from_time.unwrap().to_rfc3339(), "2024-03-01T10:00:00+00:00");
        assert!(params("to_time=yesterday").into_filter().is_err());
    }

    #[test]
    fn end_of_day_reaches_the_last_microsecond() {
        let to = params("to_date=2024-03-01").into_filter().unwrap().to_time.unwrap();
        assert_eq!(to.to_rfc3339(), "2024-03-01T23:59:59.999999+00:00");
    }

    #[test]
    fn blank_values_are_absent() {
        let filter = params("actor=&limit=&actions=").into_filter().unwrap();
        assert_eq!(filter, HistoryFilter::default());
    }

    #[test]
    fn parse_id_rejects_garbage() {
        assert_eq!(parse_id("item id", "12").unwrap(), 12);
        assert!(parse_id("item id", "12a").is_err());
    }
}
