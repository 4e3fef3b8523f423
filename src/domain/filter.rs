//! Translation of a history filter into a structured predicate list.
//!
//! The compiled [`HistoryQuery`] is rendered to SQL by the repository. The
//! page fetch and the total count are both rendered from the same
//! `predicates`, so they can never disagree on what matches.

use {
    super::error::HistoryError,
    super::event::Action,
    chrono::{DateTime, Utc},
};

/// Which endpoint the filter arrives through; decides pagination bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Filter,
    Search,
    Export,
}

impl Scope {
    pub fn default_limit(&self) -> i64 {
        match self {
            Self::Filter | Self::Search => 50,
            Self::Export => 1000,
        }
    }

    pub fn max_limit(&self) -> i64 {
        match self {
            Self::Filter => 100,
            Self::Search => 500,
            Self::Export => 10_000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    ItemId,
    Actor,
    Action,
    ChangedAt,
    ItemName,
    /// Item name, actor and both serialized snapshots, matched as any-of.
    SearchText,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    Gte,
    Lte,
    /// Case-insensitive substring; the value is already a LIKE pattern.
    Contains,
    AnyOf,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    Int(i64),
    Text(String),
    Time(DateTime<Utc>),
    TextList(Vec<String>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    pub column: Column,
    pub op: Operator,
    pub value: FilterValue,
}

impl Predicate {
    fn new(column: Column, op: Operator, value: FilterValue) -> Self {
        Self { column, op, value }
    }
}

/// Caller-supplied filter. Every field is optional; present fields are ANDed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistoryFilter {
    pub entity_id: Option<i64>,
    pub actor: Option<String>,
    pub action: Option<Action>,
    pub from_time: Option<DateTime<Utc>>,
    pub to_time: Option<DateTime<Utc>>,
    pub query: Option<String>,
    pub entity_name: Option<String>,
    pub actions: Vec<Action>,
    pub actors: Vec<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HistoryQuery {
    pub predicates: Vec<Predicate>,
    pub limit: i64,
    pub offset: i64,
}

impl HistoryFilter {
    /// Same filter, pinned to one item.
    pub fn for_item(mut self, item_id: i64) -> Self {
        self.entity_id = Some(item_id);
        self
    }

    pub fn compile(&self, scope: Scope) -> Result<HistoryQuery, HistoryError> {
        let max = scope.max_limit();
        let limit = self.limit.unwrap_or(scope.default_limit());
        if !(1..=max).contains(&limit) {
            return Err(HistoryError::Validation(format!(
                "limit must be between 1 and {max}, got {limit}"
            )));
        }
        let offset = self.offset.unwrap_or(0);
        if offset < 0 {
            return Err(HistoryError::Validation(format!(
                "offset must be non-negative, got {offset}"
            )));
        }
        if let (Some(from), Some(to)) = (self.from_time, self.to_time) {
            if from > to {
                return Err(HistoryError::Validation(format!(
                    "from_time {from} is after to_time {to}"
                )));
            }
        }

        let mut predicates = Vec::new();

        if let Some(id) = self.entity_id {
            predicates.push(Predicate::new(Column::ItemId, Operator::Eq, FilterValue::Int(id)));
        }
        if let Some(actor) = non_blank(self.actor.as_deref()) {
            predicates.push(Predicate::new(
                Column::Actor,
                Operator::Eq,
                FilterValue::Text(actor.to_string()),
            ));
        }
        if let Some(action) = self.action {
            predicates.push(Predicate::new(
                Column::Action,
                Operator::Eq,
                FilterValue::Text(action.as_str().to_string()),
            ));
        }
        if let Some(from) = self.from_time {
            predicates.push(Predicate::new(Column::ChangedAt, Operator::Gte, FilterValue::Time(from)));
        }
        if let Some(to) = self.to_time {
            predicates.push(Predicate::new(Column::ChangedAt, Operator::Lte, FilterValue::Time(to)));
        }
        if let Some(query) = non_blank(self.query.as_deref()) {
            predicates.push(Predicate::new(
                Column::SearchText,
                Operator::Contains,
                FilterValue::Text(like_pattern(query)),
            ));
        }
        if let Some(name) = non_blank(self.entity_name.as_deref()) {
            predicates.push(Predicate::new(
                Column::ItemName,
                Operator::Contains,
                FilterValue::Text(like_pattern(name)),
            ));
        }
        if !self.actions.is_empty() {
            let mut actions: Vec<String> =
                self.actions.iter().map(|a| a.as_str().to_string()).collect();
            actions.sort();
            actions.dedup();
            predicates.push(Predicate::new(
                Column::Action,
                Operator::AnyOf,
                FilterValue::TextList(actions),
            ));
        }
        let actors: Vec<String> = self
            .actors
            .iter()
            .filter_map(|a| non_blank(Some(a)))
            .map(str::to_string)
            .collect();
        if !actors.is_empty() {
            predicates.push(Predicate::new(
                Column::Actor,
                Operator::AnyOf,
                FilterValue::TextList(actors),
            ));
        }

        Ok(HistoryQuery {
            predicates,
            limit,
            offset,
        })
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// `%text%` with LIKE metacharacters escaped (Postgres default escape `\`).
fn like_pattern(text: &str) -> String {
    let mut pattern = String::with_capacity(text.len() + 2);
    pattern.push('%');
    for ch in text.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}
