use {
    crate::domain::diff::DiffMap,
    crate::domain::error::HistoryError,
    crate::domain::event::{Action, ChangeEvent, NewChangeEvent},
    crate::domain::filter::{Column, FilterValue, HistoryQuery, Operator, Predicate},
    crate::domain::snapshot::Snapshot,
    crate::domain::stats::{ActionStats, ActorStats, HistoryStats, TOP_ACTORS},
    chrono::{DateTime, Utc},
    sqlx::{PgPool, Postgres, QueryBuilder, Transaction},
};

const EVENT_SELECT: &str = r#"
    SELECT h.id, h.item_id, i.name AS item_name, h.action, h.actor, h.changed_at,
           h.before_data, h.after_data, h.diff, h.reverted_from
    FROM item_history h
    LEFT JOIN items i ON i.id = h.item_id
"#;

const EVENT_COUNT: &str = r#"
    SELECT COUNT(*)
    FROM item_history h
    LEFT JOIN items i ON i.id = h.item_id
"#;

#[derive(sqlx::FromRow)]
struct EventRow {
    id: i64,
    item_id: i64,
    item_name: Option<String>,
    action: String,
    actor: String,
    changed_at: DateTime<Utc>,
    before_data: Option<serde_json::Value>,
    after_data: Option<serde_json::Value>,
    diff: Option<serde_json::Value>,
    reverted_from: Option<i64>,
}

impl TryFrom<EventRow> for ChangeEvent {
    type Error = HistoryError;

    fn try_from(row: EventRow) -> Result<Self, Self::Error> {
        Ok(ChangeEvent {
            id: row.id,
            item_id: row.item_id,
            item_name: row.item_name,
            action: Action::try_from(row.action.as_str())?,
            actor: row.actor,
            changed_at: row.changed_at,
            before: Snapshot::from_stored(row.before_data),
            after: Snapshot::from_stored(row.after_data),
            diff: DiffMap::from_stored(row.diff),
            reverted_from: row.reverted_from,
        })
    }
}

/// Append one row to the history log. The only write this table ever sees.
pub async fn insert_event(
    tx: &mut Transaction<'_, Postgres>,
    event: &NewChangeEvent,
) -> Result<ChangeEvent, HistoryError> {
    let before = event.before().map(Snapshot::to_value);
    let after = event.after().map(Snapshot::to_value);
    let diff = event.diff().to_value()?;

    let (id, changed_at) = sqlx::query_as::<_, (i64, DateTime<Utc>)>(
        r#"
        INSERT INTO item_history (item_id, action, actor, before_data, after_data, diff, reverted_from)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING id, changed_at
        "#,
    )
    .bind(event.item_id())
    .bind(event.action().as_str())
    .bind(event.actor())
    .bind(&before)
    .bind(&after)
    .bind(&diff)
    .bind(event.reverted_from())
    .fetch_one(&mut **tx)
    .await?;

    Ok(ChangeEvent {
        id,
        item_id: event.item_id(),
        item_name: event.item_name(),
        action: event.action(),
        actor: event.actor().to_string(),
        changed_at,
        before: event.before().cloned(),
        after: event.after().cloned(),
        diff: event.diff().clone(),
        reverted_from: event.reverted_from(),
    })
}

pub async fn get_event(pool: &PgPool, id: i64) -> Result<Option<ChangeEvent>, HistoryError> {
    let row = sqlx::query_as::<_, EventRow>(&format!("{EVENT_SELECT} WHERE h.id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await?;

    row.map(ChangeEvent::try_from).transpose()
}

/// Page of matching events, most recent first.
pub async fn fetch_page(
    pool: &PgPool,
    query: &HistoryQuery,
) -> Result<Vec<ChangeEvent>, HistoryError> {
    let mut qb = page_query(query);
    let rows = qb.build_query_as::<EventRow>().fetch_all(pool).await?;
    rows.into_iter().map(ChangeEvent::try_from).collect()
}

/// Number of events matching the predicates, ignoring pagination.
pub async fn count(pool: &PgPool, predicates: &[Predicate]) -> Result<i64, HistoryError> {
    let mut qb = count_query(predicates);
    let total = qb.build_query_scalar::<i64>().fetch_one(pool).await?;
    Ok(total)
}

fn page_query(query: &HistoryQuery) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new(EVENT_SELECT);
    push_where(&mut qb, &query.predicates);
    qb.push(" ORDER BY h.changed_at DESC, h.id DESC LIMIT ");
    qb.push_bind(query.limit);
    qb.push(" OFFSET ");
    qb.push_bind(query.offset);
    qb
}

fn count_query(predicates: &[Predicate]) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new(EVENT_COUNT);
    push_where(&mut qb, predicates);
    qb
}

fn push_where(qb: &mut QueryBuilder<'static, Postgres>, predicates: &[Predicate]) {
    qb.push(" WHERE TRUE");
    for predicate in predicates {
        qb.push(" AND ");
        push_predicate(qb, predicate);
    }
}

fn column_exprs(column: Column) -> &'static [&'static str] {
    match column {
        Column::ItemId => &["h.item_id"],
        Column::Actor => &["h.actor"],
        Column::Action => &["h.action"],
        Column::ChangedAt => &["h.changed_at"],
        Column::ItemName => &["i.name"],
        Column::SearchText => &[
            "i.name",
            "h.actor",
            "h.before_data::text",
            "h.after_data::text",
        ],
    }
}

fn push_predicate(qb: &mut QueryBuilder<'static, Postgres>, predicate: &Predicate) {
    let exprs = column_exprs(predicate.column);
    if exprs.len() > 1 {
        qb.push("(");
    }
    for (i, expr) in exprs.iter().enumerate() {
        if i > 0 {
            qb.push(" OR ");
        }
        qb.push(*expr);
        match predicate.op {
            Operator::Eq => qb.push(" = "),
            Operator::Gte => qb.push(" >= "),
            Operator::Lte => qb.push(" <= "),
            Operator::Contains => qb.push(" ILIKE "),
            Operator::AnyOf => qb.push(" = ANY("),
        };
        push_value(qb, &predicate.value);
        if predicate.op == Operator::AnyOf {
            qb.push(")");
        }
    }
    if exprs.len() > 1 {
        qb.push(")");
    }
}

fn push_value(qb: &mut QueryBuilder<'static, Postgres>, value: &FilterValue) {
    match value {
        FilterValue::Int(v) => qb.push_bind(*v),
        FilterValue::Text(v) => qb.push_bind(v.clone()),
        FilterValue::Time(v) => qb.push_bind(*v),
        FilterValue::TextList(v) => qb.push_bind(v.clone()),
    };
}

#[derive(sqlx::FromRow)]
struct ActionStatsRow {
    action: String,
    count: i64,
    unique_actors: i64,
    first_change: Option<DateTime<Utc>>,
    last_change: Option<DateTime<Utc>>,
}

#[derive(sqlx::FromRow)]
struct ActorStatsRow {
    actor: String,
    change_count: i64,
    items_affected: i64,
    actions: Vec<String>,
}

pub async fn stats(pool: &PgPool) -> Result<HistoryStats, HistoryError> {
    let action_rows = sqlx::query_as::<_, ActionStatsRow>(
        r#"
        SELECT action,
               COUNT(*) AS count,
               COUNT(DISTINCT actor) AS unique_actors,
               MIN(changed_at) AS first_change,
               MAX(changed_at) AS last_change
        FROM item_history
        GROUP BY action
        ORDER BY count DESC, action
        "#,
    )
    .fetch_all(pool)
    .await?;

    let actor_rows = sqlx::query_as::<_, ActorStatsRow>(
        r#"
        SELECT actor,
               COUNT(*) AS change_count,
               COUNT(DISTINCT item_id) AS items_affected,
               ARRAY_AGG(DISTINCT action ORDER BY action) AS actions
        FROM item_history
        GROUP BY actor
        ORDER BY change_count DESC, actor
        LIMIT $1
        "#,
    )
    .bind(TOP_ACTORS)
    .fetch_all(pool)
    .await?;

    let (total_changes, first_record, last_record) =
        sqlx::query_as::<_, (i64, Option<DateTime<Utc>>, Option<DateTime<Utc>>)>(
            "SELECT COUNT(*), MIN(changed_at), MAX(changed_at) FROM item_history",
        )
        .fetch_one(pool)
        .await?;

    Ok(HistoryStats {
        total_changes,
        first_record,
        last_record,
        action_stats: action_rows
            .into_iter()
            .map(|r| ActionStats {
                action: r.action,
                count: r.count,
                unique_actors: r.unique_actors,
                first_change: r.first_change,
                last_change: r.last_change,
            })
            .collect(),
        actor_stats: actor_rows
            .into_iter()
            .map(|r| ActorStats {
                actor: r.actor,
                change_count: r.change_count,
                items_affected: r.items_affected,
                actions: r.actions,
            })
            .collect(),
    })
}
