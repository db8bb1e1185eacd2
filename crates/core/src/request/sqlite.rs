//! SQLite-backed request store.

use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use super::{
    BookRequest, NewRequest, RequestError, RequestFilter, RequestStatus, RequestStore,
};

const COLUMNS: &str = "id, book, requester, trust, status, created_at, updated_at";

pub struct SqliteRequestStore {
    conn: Mutex<Connection>,
}

impl SqliteRequestStore {
    pub fn new(path: &Path) -> Result<Self, RequestError> {
        let conn = Connection::open(path).map_err(|e| RequestError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory store (useful for testing).
    pub fn in_memory() -> Result<Self, RequestError> {
        let conn =
            Connection::open_in_memory().map_err(|e| RequestError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), RequestError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS book_requests (
                id TEXT PRIMARY KEY,
                book TEXT NOT NULL,
                requester TEXT NOT NULL,
                trust TEXT NOT NULL,
                status TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_book_requests_requester ON book_requests(requester);
            CREATE INDEX IF NOT EXISTS idx_book_requests_created_at ON book_requests(created_at);
            "#,
        )
        .map_err(|e| RequestError::Database(e.to_string()))
    }

    fn row_to_request(row: &rusqlite::Row) -> rusqlite::Result<BookRequest> {
        fn json_column<T: serde::de::DeserializeOwned>(
            idx: usize,
            raw: String,
        ) -> rusqlite::Result<T> {
            serde_json::from_str(&raw).map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(
                    idx,
                    rusqlite::types::Type::Text,
                    Box::new(e),
                )
            })
        }

        fn time_column(idx: usize, raw: String) -> rusqlite::Result<DateTime<Utc>> {
            DateTime::parse_from_rfc3339(&raw)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| {
                    rusqlite::Error::FromSqlConversionFailure(
                        idx,
                        rusqlite::types::Type::Text,
                        Box::new(e),
                    )
                })
        }

        Ok(BookRequest {
            id: row.get(0)?,
            book: json_column(1, row.get(1)?)?,
            requester: row.get(2)?,
            // Stored as a bare JSON string
            trust: json_column(3, format!("\"{}\"", row.get::<_, String>(3)?))?,
            status: json_column(4, row.get(4)?)?,
            created_at: time_column(5, row.get(5)?)?,
            updated_at: time_column(6, row.get(6)?)?,
        })
    }

    fn fetch(conn: &Connection, id: &str) -> Result<Option<BookRequest>, RequestError> {
        conn.query_row(
            &format!("SELECT {} FROM book_requests WHERE id = ?", COLUMNS),
            params![id],
            Self::row_to_request,
        )
        .optional()
        .map_err(|e| RequestError::Database(e.to_string()))
    }
}

impl RequestStore for SqliteRequestStore {
    fn create(&self, request: NewRequest) -> Result<BookRequest, RequestError> {
        let conn = self.conn.lock().unwrap();

        let now = Utc::now();
        let created = BookRequest {
            id: uuid::Uuid::new_v4().to_string(),
            book: request.book,
            requester: request.requester,
            trust: request.trust,
            status: RequestStatus::Pending,
            created_at: now,
            updated_at: now,
        };

        let book_json =
            serde_json::to_string(&created.book).map_err(|e| RequestError::Database(e.to_string()))?;
        let status_json = serde_json::to_string(&created.status)
            .map_err(|e| RequestError::Database(e.to_string()))?;

        conn.execute(
            &format!(
                "INSERT INTO book_requests ({}) VALUES (?, ?, ?, ?, ?, ?, ?)",
                COLUMNS
            ),
            params![
                created.id,
                book_json,
                created.requester,
                created.trust.as_str(),
                status_json,
                now.to_rfc3339(),
                now.to_rfc3339(),
            ],
        )
        .map_err(|e| RequestError::Database(e.to_string()))?;

        Ok(created)
    }

    fn get(&self, id: &str) -> Result<Option<BookRequest>, RequestError> {
        let conn = self.conn.lock().unwrap();
        Self::fetch(&conn, id)
    }

    fn list(&self, filter: &RequestFilter) -> Result<Vec<BookRequest>, RequestError> {
        let conn = self.conn.lock().unwrap();

        let mut conditions = Vec::new();
        let mut values: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();
        if let Some(requester) = &filter.requester {
            conditions.push("requester = ?");
            values.push(Box::new(requester.clone()));
        }
        if let Some(state) = &filter.state {
            conditions.push("json_extract(status, '$.state') = ?");
            values.push(Box::new(state.clone()));
        }
        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };
        values.push(Box::new(filter.limit));
        values.push(Box::new(filter.offset));

        let sql = format!(
            "SELECT {} FROM book_requests {} ORDER BY created_at DESC, id LIMIT ? OFFSET ?",
            COLUMNS, where_clause
        );
        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| RequestError::Database(e.to_string()))?;
        let param_refs: Vec<&dyn rusqlite::ToSql> = values.iter().map(|p| p.as_ref()).collect();
        let rows = stmt
            .query_map(param_refs.as_slice(), Self::row_to_request)
            .map_err(|e| RequestError::Database(e.to_string()))?;

        rows.collect::<Result<Vec<_>, _>>()
            .map_err(|e| RequestError::Database(e.to_string()))
    }

    fn update_status(&self, id: &str, status: RequestStatus) -> Result<BookRequest, RequestError> {
        let conn = self.conn.lock().unwrap();

        let current =
            Self::fetch(&conn, id)?.ok_or_else(|| RequestError::NotFound(id.to_string()))?;

        if !current.status.can_transition_to(&status) {
            return Err(RequestError::InvalidTransition {
                id: id.to_string(),
                from: current.status.state_type().to_string(),
                to: status.state_type().to_string(),
            });
        }

        let now = Utc::now();
        let status_json =
            serde_json::to_string(&status).map_err(|e| RequestError::Database(e.to_string()))?;
        conn.execute(
            "UPDATE book_requests SET status = ?, updated_at = ? WHERE id = ?",
            params![status_json, now.to_rfc3339(), id],
        )
        .map_err(|e| RequestError::Database(e.to_string()))?;

        Ok(BookRequest {
            status,
            updated_at: now,
            ..current
        })
    }
}
