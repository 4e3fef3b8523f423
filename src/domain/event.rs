use {
    super::diff::{self, DiffMap},
    super::error::HistoryError,
    super::snapshot::{FIELD_NAME, Snapshot},
    chrono::{DateTime, Utc},
    derive_more::Display,
    serde::{Deserialize, Serialize},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Action {
    #[display("CREATE")]
    Create,
    #[display("UPDATE")]
    Update,
    #[display("DELETE")]
    Delete,
    #[display("REVERT")]
    Revert,
}

impl Action {
    pub const ALL: [Action; 4] = [Self::Create, Self::Update, Self::Delete, Self::Revert];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "CREATE",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
            Self::Revert => "REVERT",
        }
    }

    /// Only UPDATE and DELETE leave a prior state worth restoring.
    pub fn is_revertible(&self) -> bool {
        matches!(self, Self::Update | Self::Delete)
    }
}

impl TryFrom<&str> for Action {
    type Error = HistoryError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s.trim().to_ascii_uppercase().as_str() {
            "CREATE" => Ok(Self::Create),
            "UPDATE" => Ok(Self::Update),
            "DELETE" => Ok(Self::Delete),
            "REVERT" => Ok(Self::Revert),
            other => Err(HistoryError::Validation(format!(
                "unknown action: {other}, expected one of CREATE, UPDATE, DELETE, REVERT"
            ))),
        }
    }
}

/// One immutable row of the item history log.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChangeEvent {
    pub id: i64,
    pub item_id: i64,
    /// Name of the item as it is now; `None` once the item is gone.
    pub item_name: Option<String>,
    pub action: Action,
    pub actor: String,
    pub changed_at: DateTime<Utc>,
    pub before: Option<Snapshot>,
    pub after: Option<Snapshot>,
    pub diff: DiffMap,
    /// For REVERT rows, the id of the event that was reverted. Never stored
    /// inside `diff`.
    pub reverted_from: Option<i64>,
}

/// A history row that has not been written yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewChangeEvent {
    action: Action,
    item_id: i64,
    actor: String,
    before: Option<Snapshot>,
    after: Option<Snapshot>,
    diff: DiffMap,
    reverted_from: Option<i64>,
}

impl NewChangeEvent {
    /// Checks that the snapshot shape matches the action and computes the
    /// diff when both sides exist.
    pub fn new(
        action: Action,
        item_id: i64,
        before: Option<Snapshot>,
        after: Option<Snapshot>,
        actor: &str,
    ) -> Result<Self, HistoryError> {
        let shape_ok = match action {
            Action::Create => before.is_none() && after.is_some(),
            Action::Delete => before.is_some() && after.is_none(),
            Action::Update => before.is_some() && after.is_some(),
            // Restoring a deleted item has no state before it.
            Action::Revert => after.is_some(),
        };
        if !shape_ok {
            return Err(HistoryError::Validation(format!(
                "{action} event for item {item_id} has an invalid before/after shape"
            )));
        }
        if actor.trim().is_empty() {
            return Err(HistoryError::Validation("actor must not be empty".into()));
        }

        let diff = match (action, &before, &after) {
            (Action::Update, Some(b), Some(a)) => diff::diff(b, a),
            (Action::Revert, b, Some(a)) => diff::diff(&b.clone().unwrap_or_default(), a),
            _ => DiffMap::default(),
        };

        Ok(Self {
            action,
            item_id,
            actor: actor.to_string(),
            before,
            after,
            diff,
            reverted_from: None,
        })
    }

    pub fn reverting(mut self, event_id: i64) -> Self {
        self.reverted_from = Some(event_id);
        self
    }

    pub fn action(&self) -> Action {
        self.action
    }

    pub fn item_id(&self) -> i64 {
        self.item_id
    }

    pub fn actor(&self) -> &str {
        &self.actor
    }

    pub fn before(&self) -> Option<&Snapshot> {
        self.before.as_ref()
    }

    pub fn after(&self) -> Option<&Snapshot> {
        self.after.as_ref()
    }

    pub fn diff(&self) -> &DiffMap {
        &self.diff
    }

    pub fn reverted_from(&self) -> Option<i64> {
        self.reverted_from
    }

    /// Item name as read paths report it right after the write. A DELETE
    /// leaves no live item to name.
    pub fn item_name(&self) -> Option<String> {
        if self.action == Action::Delete {
            return None;
        }
        self.after
            .as_ref()
            .or(self.before.as_ref())
            .and_then(|s| s.get(FIELD_NAME))
            .and_then(|v| v.as_str())
            .map(str::to_string)
    }
}
