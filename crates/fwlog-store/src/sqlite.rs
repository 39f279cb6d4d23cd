//! SQLite-backed log store.

use async_trait::async_trait;
use chrono::DateTime;
use fwlog_types::{GeoLocation, LogPage, LogQuery, LogRecord, LogStore, StoreError, StoredLog};
use rusqlite::types::Value;
use std::path::Path;

const SELECT_COLUMNS: &str = "id, timestamp_ms, source_ip, destination_ip, source_port, destination_port, action, \
     source_geo_country, source_geo_city, source_latitude, source_longitude, \
     destination_geo_country, destination_geo_city, destination_latitude, destination_longitude";

/// SQLite-backed store; timestamps are kept as epoch milliseconds.
pub struct SqliteLogStore {
    conn: std::sync::Mutex<rusqlite::Connection>,
}

impl SqliteLogStore {
    /// Open (or create) the database at `path`. `":memory:"` gives a private in-memory database.
    pub fn new(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let conn =
            rusqlite::Connection::open(path).map_err(|e| StoreError::Other(e.to_string()))?;

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS log_entries (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp_ms INTEGER NOT NULL,
                source_ip TEXT NOT NULL,
                destination_ip TEXT NOT NULL,
                source_port INTEGER,
                destination_port INTEGER,
                action TEXT NOT NULL,
                source_geo_country TEXT,
                source_geo_city TEXT,
                source_latitude REAL,
                source_longitude REAL,
                destination_geo_country TEXT,
                destination_geo_city TEXT,
                destination_latitude REAL,
                destination_longitude REAL
            );

            CREATE INDEX IF NOT EXISTS idx_log_entries_timestamp ON log_entries(timestamp_ms);
            CREATE INDEX IF NOT EXISTS idx_log_entries_action ON log_entries(action);
            "#,
        )
        .map_err(|e| StoreError::Other(e.to_string()))?;
        tracing::info!("log store schema initialized");

        Ok(Self {
            conn: std::sync::Mutex::new(conn),
        })
    }

    fn with_conn<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&rusqlite::Connection) -> Result<T, rusqlite::Error>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|e| StoreError::Other(format!("failed to acquire lock: {}", e)))?;
        f(&conn).map_err(|e| StoreError::Other(e.to_string()))
    }
}

fn geo_values(geo: Option<&GeoLocation>) -> [Value; 4] {
    match geo {
        Some(g) => [
            Value::Text(g.country.clone()),
            Value::Text(g.city.clone()),
            Value::Real(g.latitude),
            Value::Real(g.longitude),
        ],
        None => [Value::Null, Value::Null, Value::Null, Value::Null],
    }
}

/// Rebuild a geo group; any missing column means the group is unset.
fn geo_from_row(row: &rusqlite::Row<'_>, first: usize) -> rusqlite::Result<Option<GeoLocation>> {
    let country: Option<String> = row.get(first)?;
    let city: Option<String> = row.get(first + 1)?;
    let latitude: Option<f64> = row.get(first + 2)?;
    let longitude: Option<f64> = row.get(first + 3)?;
    Ok(match (country, city, latitude, longitude) {
        (Some(country), Some(city), Some(lat), Some(lon)) => GeoLocation::new(country, city, lat, lon),
        _ => None,
    })
}

fn stored_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<StoredLog> {
    let timestamp_ms: i64 = row.get(1)?;
    let port = |v: Option<i64>| v.and_then(|p| u16::try_from(p).ok());
    let record = LogRecord {
        timestamp: DateTime::from_timestamp_millis(timestamp_ms).unwrap_or_default(),
        source_ip: row.get(2)?,
        destination_ip: row.get(3)?,
        source_port: port(row.get(4)?),
        destination_port: port(row.get(5)?),
        action: row.get(6)?,
        source_geo: geo_from_row(row, 7)?,
        destination_geo: geo_from_row(row, 11)?,
    };
    Ok(StoredLog {
        id: row.get(0)?,
        record,
    })
}

/// WHERE clause and its positional parameters, mirroring `LogQuery::matches`.
fn where_clause(query: &LogQuery) -> (String, Vec<Value>) {
    let mut clauses: Vec<&str> = Vec::new();
    let mut params: Vec<Value> = Vec::new();
    if let Some(needle) = query.source_ip_filter() {
        clauses.push("instr(lower(source_ip), lower(?)) > 0");
        params.push(Value::Text(needle.to_string()));
    }
    if let Some(needle) = query.destination_ip_filter() {
        clauses.push("instr(lower(destination_ip), lower(?)) > 0");
        params.push(Value::Text(needle.to_string()));
    }
    if let Some(action) = query.action_filter() {
        clauses.push("lower(action) = lower(?)");
        params.push(Value::Text(action.to_string()));
    }
    if let Some(start) = query.start {
        clauses.push("timestamp_ms >= ?");
        params.push(Value::Integer(start.timestamp_millis()));
    }
    if let Some(end) = query.end_exclusive() {
        clauses.push("timestamp_ms < ?");
        params.push(Value::Integer(end.timestamp_millis()));
    }
    if clauses.is_empty() {
        (String::new(), params)
    } else {
        (format!(" WHERE {}", clauses.join(" AND ")), params)
    }
}

#[async_trait]
impl LogStore for SqliteLogStore {
    async fn insert_batch(&self, records: &[LogRecord]) -> Result<Vec<i64>, StoreError> {
        self.with_conn(|conn| {
            let tx = conn.unchecked_transaction()?;
            let mut ids = Vec::with_capacity(records.len());
            {
                let mut stmt = tx.prepare(
                    "INSERT INTO log_entries (timestamp_ms, source_ip, destination_ip, source_port, destination_port, action, \
                     source_geo_country, source_geo_city, source_latitude, source_longitude, \
                     destination_geo_country, destination_geo_city, destination_latitude, destination_longitude) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
                )?;
                for r in records {
                    let [sc, sci, slat, slon] = geo_values(r.source_geo.as_ref());
                    let [dc, dci, dlat, dlon] = geo_values(r.destination_geo.as_ref());
                    stmt.execute(rusqlite::params![
                        r.timestamp.timestamp_millis(),
                        r.source_ip,
                        r.destination_ip,
                        r.source_port,
                        r.destination_port,
                        r.action,
                        sc,
                        sci,
                        slat,
                        slon,
                        dc,
                        dci,
                        dlat,
                        dlon,
                    ])?;
                    ids.push(tx.last_insert_rowid());
                }
            }
            tx.commit()?;
            Ok(ids)
        })
    }

    async fn get(&self, id: i64) -> Result<Option<StoredLog>, StoreError> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {SELECT_COLUMNS} FROM log_entries WHERE id = ?1");
            match conn.query_row(&sql, [id], stored_from_row) {
                Ok(stored) => Ok(Some(stored)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
    }

    async fn query(&self, query: &LogQuery) -> Result<LogPage<StoredLog>, StoreError> {
        let (filter, params) = where_clause(query);
        let limit = i64::from(query.page_size);
        let offset = i64::try_from(query.offset()).unwrap_or(i64::MAX);

        let (total, items) = self.with_conn(|conn| {
            let count_sql = format!("SELECT COUNT(*) FROM log_entries{filter}");
            let total: i64 =
                conn.query_row(&count_sql, rusqlite::params_from_iter(params.iter()), |row| {
                    row.get(0)
                })?;

            let page_sql = format!(
                "SELECT {SELECT_COLUMNS} FROM log_entries{filter} \
                 ORDER BY timestamp_ms DESC, id DESC LIMIT {limit} OFFSET {offset}"
            );
            let mut stmt = conn.prepare(&page_sql)?;
            let rows = stmt.query_map(rusqlite::params_from_iter(params.iter()), stored_from_row)?;
            let items = rows.collect::<Result<Vec<_>, _>>()?;
            Ok((total, items))
        })?;

        Ok(LogPage::new(query, u64::try_from(total).unwrap_or(0), items))
    }
}
