//! SQLite-backed source. Predicates are compiled to parameterised SQL here
//! and nowhere else.

use std::fmt::Write as _;
use std::marker::PhantomData;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::functions::FunctionFlags;
use rusqlite::types::{Value, ValueRef};
use rusqlite::{Connection, InterruptHandle, params_from_iter};
use tracing::debug;

use super::Queryable;
use crate::entity::value::format_timestamp;
use crate::entity::{Entity, FieldDef, FieldKind, FieldValue, Record};
use crate::error::{QueryError, Result};
use crate::query::predicate::fold_case;
use crate::query::{Cancellation, Expr, OrderDirection, Query};

/// Entity table in a SQLite database. Provider order is `rowid`.
///
/// Several sources may point at the same database file, one per entity.
pub struct SqliteSource<E> {
    conn: Arc<Mutex<Connection>>,
    interrupt: InterruptHandle,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> SqliteSource<E> {
    /// Open or create the entity's table in the given database.
    /// Use `":memory:"` for tests.
    pub fn open(path: &str) -> Result<Self> {
        Self::from_connection(Connection::open(path)?)
    }

    pub fn in_memory() -> Result<Self> {
        Self::open(":memory:")
    }

    pub fn from_connection(conn: Connection) -> Result<Self> {
        register_fold(&conn)?;
        conn.execute_batch(&create_table_sql::<E>())?;
        Ok(Self {
            interrupt: conn.get_interrupt_handle(),
            conn: Arc::new(Mutex::new(conn)),
            _entity: PhantomData,
        })
    }

    /// Insert or replace a row by key.
    pub fn insert(&self, entity: &E) -> Result<()> {
        let values = E::FIELDS
            .iter()
            .map(|def| to_sql(&entity.field(def.name).unwrap_or(FieldValue::Null)))
            .collect::<Vec<_>>();
        let conn = self.conn.lock().map_err(|_| QueryError::Poisoned)?;
        conn.execute(&insert_sql::<E>(), params_from_iter(values))?;
        Ok(())
    }

    /// Insert many rows in one transaction.
    pub fn insert_all<'a>(&self, entities: impl IntoIterator<Item = &'a E>) -> Result<usize> {
        let sql = insert_sql::<E>();
        let mut conn = self.conn.lock().map_err(|_| QueryError::Poisoned)?;
        let tx = conn.transaction()?;
        let mut inserted = 0;
        {
            let mut stmt = tx.prepare_cached(&sql)?;
            for entity in entities {
                let values = E::FIELDS
                    .iter()
                    .map(|def| to_sql(&entity.field(def.name).unwrap_or(FieldValue::Null)));
                stmt.execute(params_from_iter(values))?;
                inserted += 1;
            }
        }
        tx.commit()?;
        Ok(inserted)
    }

    /// Run blocking SQLite work off the async runtime.
    ///
    /// The interrupt handle belongs to the shared connection, so cancellation
    /// only fires it while this call's own work holds the connection. A call
    /// still waiting for the lock notices the cancellation once it gets it.
    async fn run<T, F>(&self, cancel: &Cancellation, work: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
    {
        cancel.check()?;
        let conn = Arc::clone(&self.conn);
        let in_flight = Arc::new(Mutex::new(false));
        let task = {
            let in_flight = Arc::clone(&in_flight);
            let cancel = cancel.clone();
            tokio::task::spawn_blocking(move || {
                let conn = conn.lock().map_err(|_| QueryError::Poisoned)?;
                {
                    let mut running = in_flight.lock().map_err(|_| QueryError::Poisoned)?;
                    cancel.check()?;
                    *running = true;
                }
                let result = work(&conn);
                // Cleared before the connection is released to the next caller.
                if let Ok(mut running) = in_flight.lock() {
                    *running = false;
                }
                result
            })
        };
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                if let Ok(running) = in_flight.lock() {
                    if *running {
                        debug!(entity = E::NAME, "interrupting cancelled statement");
                        self.interrupt.interrupt();
                    }
                }
                Err(QueryError::Cancelled)
            }
            joined = task => joined?,
        }
    }
}

#[async_trait]
impl<E: Entity> Queryable<E> for SqliteSource<E> {
    async fn count(&self, query: &Query<E>, cancel: &Cancellation) -> Result<u64> {
        let (sql, params) = count_sql(query);
        debug!(entity = E::NAME, %sql, "count");
        self.run(cancel, move |conn| {
            let count: i64 =
                conn.query_row(&sql, params_from_iter(params), |row| row.get(0))?;
            Ok(u64::try_from(count).unwrap_or(0))
        })
        .await
    }

    async fn fetch(&self, query: &Query<E>, cancel: &Cancellation) -> Result<Vec<E>> {
        let (sql, params) = select_sql(query);
        debug!(entity = E::NAME, %sql, "fetch");
        self.run(cancel, move |conn| {
            let mut stmt = conn.prepare_cached(&sql)?;
            let mut rows = stmt.query(params_from_iter(params))?;
            let mut out = Vec::new();
            while let Some(row) = rows.next()? {
                let mut record = Record::with_capacity(E::FIELDS.len());
                for (i, def) in E::FIELDS.iter().enumerate() {
                    record.push(def.name, from_sql(def, row.get_ref(i)?)?);
                }
                out.push(E::from_record(&record)?);
            }
            Ok(out)
        })
        .await
    }
}

/// `fold(x)`: the same case folding the in-memory evaluator uses.
fn register_fold(conn: &Connection) -> Result<()> {
    conn.create_scalar_function(
        "fold",
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let text: Option<String> = ctx.get(0)?;
            Ok(text.map(|t| fold_case(&t)))
        },
    )?;
    Ok(())
}

fn column_type(kind: FieldKind) -> &'static str {
    match kind {
        FieldKind::Bool | FieldKind::Int => "INTEGER",
        FieldKind::Text | FieldKind::Timestamp | FieldKind::Uuid => "TEXT",
    }
}

fn create_table_sql<E: Entity>() -> String {
    let columns = E::FIELDS
        .iter()
        .map(|def| {
            let key = if def.name == E::KEY { " PRIMARY KEY" } else { "" };
            format!("\"{}\" {}{key}", def.name, column_type(def.kind))
        })
        .collect::<Vec<_>>()
        .join(", ");
    format!("CREATE TABLE IF NOT EXISTS \"{}\" ({columns})", E::NAME)
}

fn column_list<E: Entity>() -> String {
    E::FIELDS
        .iter()
        .map(|def| format!("\"{}\"", def.name))
        .collect::<Vec<_>>()
        .join(", ")
}

fn insert_sql<E: Entity>() -> String {
    let placeholders = vec!["?"; E::FIELDS.len()].join(", ");
    format!(
        "INSERT OR REPLACE INTO \"{}\" ({}) VALUES ({placeholders})",
        E::NAME,
        column_list::<E>()
    )
}

fn count_sql<E: Entity>(query: &Query<E>) -> (String, Vec<Value>) {
    let mut params = Vec::new();
    let mut sql = format!("SELECT COUNT(*) FROM \"{}\" WHERE ", E::NAME);
    compile(query.predicate().expr(), &mut sql, &mut params);
    (sql, params)
}

fn select_sql<E: Entity>(query: &Query<E>) -> (String, Vec<Value>) {
    let mut params = Vec::new();
    let mut sql = format!("SELECT {} FROM \"{}\" WHERE ", column_list::<E>(), E::NAME);
    compile(query.predicate().expr(), &mut sql, &mut params);

    match query.order() {
        Some(order) => {
            let dir = match order.direction {
                OrderDirection::Asc => "ASC",
                OrderDirection::Desc => "DESC",
            };
            let _ = write!(sql, " ORDER BY \"{}\" {dir}", order.field);
            if order.field != E::KEY {
                let _ = write!(sql, ", \"{}\" {dir}", E::KEY);
            }
        }
        None => sql.push_str(" ORDER BY rowid"),
    }

    if query.take().is_some() || query.skip() > 0 {
        // SQLite needs a LIMIT before OFFSET; -1 means unbounded.
        let limit = query
            .take()
            .map_or(-1, |t| i64::try_from(t).unwrap_or(i64::MAX));
        sql.push_str(" LIMIT ? OFFSET ?");
        params.push(Value::Integer(limit));
        params.push(Value::Integer(
            i64::try_from(query.skip()).unwrap_or(i64::MAX),
        ));
    }
    (sql, params)
}

/// Append `expr` as a WHERE clause fragment. Field names come from the
/// entity catalogue, never from callers, so quoting them is enough.
fn compile(expr: &Expr, sql: &mut String, params: &mut Vec<Value>) {
    match expr {
        Expr::True => sql.push('1'),
        Expr::False => sql.push('0'),
        Expr::And(parts) => join(parts, " AND ", sql, params),
        Expr::Or(parts) => join(parts, " OR ", sql, params),
        Expr::Not(inner) => {
            sql.push_str("NOT (");
            compile(inner, sql, params);
            sql.push(')');
        }
        Expr::Compare { field, op, value } => {
            let _ = write!(sql, "\"{field}\" {} ?", op.as_sql());
            params.push(to_sql(value));
        }
        Expr::Contains { field, needle } => {
            let _ = write!(sql, "instr(fold(\"{field}\"), ?) > 0");
            params.push(Value::Text(needle.clone()));
        }
        Expr::IsNull(field) => {
            let _ = write!(sql, "\"{field}\" IS NULL");
        }
    }
}

fn join(parts: &[Expr], sep: &str, sql: &mut String, params: &mut Vec<Value>) {
    sql.push('(');
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            sql.push_str(sep);
        }
        compile(part, sql, params);
    }
    sql.push(')');
}

fn to_sql(value: &FieldValue) -> Value {
    match value {
        FieldValue::Null => Value::Null,
        FieldValue::Bool(b) => Value::Integer(i64::from(*b)),
        FieldValue::Int(i) => Value::Integer(*i),
        FieldValue::Text(s) => Value::Text(s.clone()),
        FieldValue::Timestamp(ts) => Value::Text(format_timestamp(ts)),
        FieldValue::Uuid(u) => Value::Text(u.hyphenated().to_string()),
    }
}

fn from_sql(def: &FieldDef, raw: ValueRef<'_>) -> Result<FieldValue> {
    match (def.kind, raw) {
        (_, ValueRef::Null) => Ok(FieldValue::Null),
        (FieldKind::Bool, ValueRef::Integer(i)) => Ok(FieldValue::Bool(i != 0)),
        (FieldKind::Int, ValueRef::Integer(i)) => Ok(FieldValue::Int(i)),
        (kind, ValueRef::Text(bytes)) => {
            let text = std::str::from_utf8(bytes)
                .map_err(|e| QueryError::decode(def.name, e.to_string()))?;
            FieldValue::parse(kind, text).ok_or_else(|| {
                QueryError::decode(def.name, format!("`{text}` is not a valid {kind:?}"))
            })
        }
        (kind, other) => Err(QueryError::decode(
            def.name,
            format!("expected {kind:?}, got {:?}", other.data_type()),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{CompareOp, Predicate};

    #[derive(Clone, Debug, PartialEq)]
    struct Note {
        id: i64,
        body: String,
    }

    impl Entity for Note {
        type Key = i64;
        const NAME: &'static str = "notes";
        const KEY: &'static str = "id";
        const FIELDS: &'static [FieldDef] = &[
            FieldDef::new("id", FieldKind::Int),
            FieldDef::new("body", FieldKind::Text),
        ];

        fn key(&self) -> i64 {
            self.id
        }

        fn field(&self, name: &str) -> Option<FieldValue> {
            match name {
                "id" => Some(self.id.into()),
                "body" => Some(self.body.clone().into()),
                _ => None,
            }
        }

        fn from_record(record: &Record) -> Result<Self> {
            Ok(Self {
                id: record.int("id")?,
                body: record.text("body")?,
            })
        }
    }

    #[test]
    fn create_table_marks_key_column() {
        assert_eq!(
            create_table_sql::<Note>(),
            "CREATE TABLE IF NOT EXISTS \"notes\" (\"id\" INTEGER PRIMARY KEY, \"body\" TEXT)"
        );
    }

    #[test]
    fn compiles_nested_predicates_with_params() {
        let p = Predicate::<Note>::compare("id", CompareOp::Gt, 3)
            .unwrap()
            .and(
                Predicate::contains("body", "Hi")
                    .unwrap()
                    .or(Predicate::is_null("body").unwrap()),
            );
        let (sql, params) = count_sql(&Query::all().filter(p));
        assert_eq!(
            sql,
            "SELECT COUNT(*) FROM \"notes\" WHERE (\"id\" > ? AND (instr(fold(\"body\"), ?) > 0 OR \"body\" IS NULL))"
        );
        assert_eq!(params, vec![Value::Integer(3), Value::Text("hi".into())]);
    }

    #[test]
    fn select_defaults_to_rowid_order() {
        let (sql, params) = select_sql(&Query::<Note>::all());
        assert_eq!(
            sql,
            "SELECT \"id\", \"body\" FROM \"notes\" WHERE 1 ORDER BY rowid"
        );
        assert!(params.is_empty());
    }

    #[test]
    fn select_orders_with_key_tie_break_and_window() {
        let order = crate::query::OrderBy {
            field: "body",
            direction: OrderDirection::Desc,
        };
        let (sql, params) = select_sql(&Query::<Note>::all().order_by(order).paged(20, 10));
        assert!(sql.ends_with(
            "ORDER BY \"body\" DESC, \"id\" DESC LIMIT ? OFFSET ?"
        ));
        assert_eq!(params, vec![Value::Integer(10), Value::Integer(20)]);
    }

    #[tokio::test]
    async fn fold_matches_non_ascii_case() {
        let source = SqliteSource::<Note>::in_memory().unwrap();
        source
            .insert(&Note {
                id: 1,
                body: "ÄRGER im Büro".into(),
            })
            .unwrap();
        let query = Query::all().filter(Predicate::contains("body", "ärger").unwrap());
        let count = source.count(&query, &Cancellation::never()).await.unwrap();
        assert_eq!(count, 1);
    }
}
