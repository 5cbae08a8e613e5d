//! Demo user store and the query parameterizer.
//!
//! Every statement is a [`ParameterizedQuery`]: a `&'static str` template with
//! positional `?N` placeholders plus values bound out-of-band by the SQLite
//! driver. Because the template is `'static`, request data cannot become part
//! of the statement text, whatever it contains.

use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, OptionalExtension, Row};
use serde::Serialize;

use crate::hashing::PasswordDigest;
use crate::sanitizer::{Registration, UserId};
use crate::Verified;

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS users (
        id INTEGER PRIMARY KEY,
        name TEXT NOT NULL,
        email TEXT NOT NULL UNIQUE,
        password_digest TEXT
    );
    INSERT OR IGNORE INTO users (id, name, email) VALUES (1, 'John Doe', 'john@example.com');
    INSERT OR IGNORE INTO users (id, name, email) VALUES (2, 'Jane Smith', 'jane@example.com');
";

/// Errors raised by the store. Detail is for server-side logs only.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The SQLite driver reported an error.
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// The store was used after [`UserStore::close`].
    #[error("store is closed")]
    Closed,
    /// The blocking task running the statement did not complete.
    #[error("store task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl StoreError {
    /// `true` when a UNIQUE constraint rejected the write.
    pub fn is_unique_violation(&self) -> bool {
        matches!(
            self,
            Self::Sqlite(rusqlite::Error::SqliteFailure(err, _))
                if err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
        )
    }
}

/// A statement template and its bound values.
#[derive(Debug, Clone)]
pub struct ParameterizedQuery {
    statement: &'static str,
    params: Vec<Value>,
}

impl ParameterizedQuery {
    /// Starts a query from a fixed template.
    pub fn new(statement: &'static str) -> Self {
        Self {
            statement,
            params: Vec::new(),
        }
    }

    /// Binds the next positional parameter.
    pub(crate) fn bind(mut self, value: impl Into<Value>) -> Self {
        self.params.push(value.into());
        self
    }

    /// The statement text, identical for every set of bound values.
    pub fn statement(&self) -> &'static str {
        self.statement
    }

    fn query_rows<T>(
        &self,
        conn: &Connection,
        map: impl FnMut(&Row<'_>) -> rusqlite::Result<T>,
    ) -> Result<Vec<T>, StoreError> {
        let mut stmt = conn.prepare_cached(self.statement)?;
        let rows = stmt.query_map(params_from_iter(self.params.iter()), map)?;
        Ok(rows.collect::<rusqlite::Result<Vec<T>>>()?)
    }

    fn execute(&self, conn: &Connection) -> Result<usize, StoreError> {
        let mut stmt = conn.prepare_cached(self.statement)?;
        Ok(stmt.execute(params_from_iter(self.params.iter()))?)
    }
}

/// A user row as returned to callers. Never carries the password digest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserRecord {
    /// Row identifier.
    pub id: i64,
    /// Display name.
    pub name: String,
    /// Contact address.
    pub email: String,
}

impl UserRecord {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            email: row.get(2)?,
        })
    }
}

/// The single shared connection to the demo database.
///
/// Opened once at startup and closed once at shutdown. Statements run on
/// tokio's blocking pool; the mutex serializes access because a
/// `rusqlite::Connection` is not `Sync`.
#[derive(Clone)]
pub struct UserStore {
    conn: Arc<Mutex<Option<Connection>>>,
}

impl UserStore {
    /// Opens an in-memory database with the demo schema and seed rows.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Sqlite`] if the schema cannot be created.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    /// Opens (or creates) a database file with the demo schema and seed rows.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Sqlite`] if the file cannot be opened or migrated.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        Self::from_connection(Connection::open(path)?)
    }

    fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA)?;
        tracing::debug!("user store initialized with seed rows");
        Ok(Self {
            conn: Arc::new(Mutex::new(Some(conn))),
        })
    }

    async fn with_conn<T, F>(&self, op: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, StoreError> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn.lock();
            let conn = guard.as_ref().ok_or(StoreError::Closed)?;
            op(conn)
        })
        .await?
    }

    /// Fetches users by a validated identifier.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on driver failure or after close.
    pub async fn find_by_id(&self, id: &Verified<UserId>) -> Result<Vec<UserRecord>, StoreError> {
        let query = ParameterizedQuery::new("SELECT id, name, email FROM users WHERE id = ?1")
            .bind(id.as_ref().get());
        self.with_conn(move |conn| query.query_rows(conn, UserRecord::from_row))
            .await
    }

    /// Looks up a user and stored digest by normalized email.
    ///
    /// Users without a password (the seed rows) and rows whose stored value
    /// does not parse yield `None` for the digest.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on driver failure or after close.
    pub async fn find_credentials_by_email(
        &self,
        email: &str,
    ) -> Result<Option<(UserRecord, Option<PasswordDigest>)>, StoreError> {
        let query = ParameterizedQuery::new(
            "SELECT id, name, email, password_digest FROM users WHERE email = ?1",
        )
        .bind(email.to_string());
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare_cached(query.statement)?;
            let found = stmt
                .query_row(params_from_iter(query.params.iter()), |row| {
                    let stored: Option<String> = row.get(3)?;
                    Ok((
                        UserRecord::from_row(row)?,
                        stored.as_deref().and_then(PasswordDigest::parse),
                    ))
                })
                .optional()?;
            Ok(found)
        })
        .await
    }

    /// Stores a validated registration with its password digest.
    ///
    /// The plaintext inside `registration` is dropped when this returns.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on driver failure, including a duplicate email.
    pub async fn insert(
        &self,
        registration: Verified<Registration>,
        digest: PasswordDigest,
    ) -> Result<UserRecord, StoreError> {
        let Registration { username, email, .. } = registration.into_inner();
        let query = ParameterizedQuery::new(
            "INSERT INTO users (name, email, password_digest) VALUES (?1, ?2, ?3)",
        )
        .bind(username.clone())
        .bind(email.clone())
        .bind(digest.encode());

        self.with_conn(move |conn| {
            query.execute(conn)?;
            Ok(UserRecord {
                id: conn.last_insert_rowid(),
                name: username,
                email,
            })
        })
        .await
    }

    /// Closes the connection. Later calls fail with [`StoreError::Closed`].
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Sqlite`] if SQLite refuses to close cleanly.
    pub fn close(&self) -> Result<(), StoreError> {
        match self.conn.lock().take() {
            Some(conn) => conn.close().map_err(|(_, err)| StoreError::Sqlite(err)),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hashing::PasswordHasher;
    use crate::sanitizer::{IdentifierSanitizer, RegisterRequest, RegistrationSanitizer};
    use crate::{Sanitizer, Secret, Tainted};

    fn id(raw: &str) -> Verified<UserId> {
        IdentifierSanitizer
            .sanitize(Tainted::new(raw.to_string()))
            .expect("valid id")
    }

    fn registration(name: &str, email: &str) -> Verified<Registration> {
        RegistrationSanitizer
            .sanitize(Tainted::new(RegisterRequest {
                username: name.into(),
                email: email.into(),
                password: "password123".into(),
            }))
            .expect("valid registration")
    }

    #[tokio::test]
    async fn finds_seed_user() {
        let store = UserStore::open_in_memory().unwrap();
        let rows = store.find_by_id(&id("1")).await.unwrap();

        assert_eq!(
            rows,
            vec![UserRecord {
                id: 1,
                name: "John Doe".into(),
                email: "john@example.com".into(),
            }]
        );
    }

    #[tokio::test]
    async fn unknown_id_returns_no_rows() {
        let store = UserStore::open_in_memory().unwrap();
        assert!(store.find_by_id(&id("-5")).await.unwrap().is_empty());
    }

    #[test]
    fn injected_text_is_bound_as_data() {
        let store = UserStore::open_in_memory().unwrap();
        let guard = store.conn.lock();
        let conn = guard.as_ref().unwrap();

        for payload in ["1 OR 1=1", "1; DROP TABLE users", "' OR '1'='1"] {
            let query = ParameterizedQuery::new("SELECT id, name, email FROM users WHERE id = ?1")
                .bind(payload.to_string());
            let rows = query.query_rows(conn, UserRecord::from_row).unwrap();
            assert!(rows.is_empty(), "{payload}");
            assert_eq!(query.statement(), "SELECT id, name, email FROM users WHERE id = ?1");
        }

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 2);
    }

    #[tokio::test]
    async fn insert_and_find_credentials() {
        let store = UserStore::open_in_memory().unwrap();
        let reg = registration("alice", "alice@example.com");
        let digest = PasswordHasher::new().hash(&reg.as_ref().password);

        let user = store.insert(reg, digest).await.unwrap();
        assert_eq!(user.id, 3);
        assert_eq!(user.name, "alice");

        let (found, stored) = store
            .find_credentials_by_email("alice@example.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found, user);
        assert!(PasswordHasher::new().verify(&Secret::new("password123".to_string()), &stored.unwrap()));

        let (_, seeded) = store
            .find_credentials_by_email("john@example.com")
            .await
            .unwrap()
            .unwrap();
        assert!(seeded.is_none());
        assert!(store
            .find_credentials_by_email("nobody@example.com")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn duplicate_email_is_a_store_error() {
        let store = UserStore::open_in_memory().unwrap();
        let reg = registration("janedup", "jane@example.com");
        let digest = PasswordHasher::new().hash(&reg.as_ref().password);

        let err = store.insert(reg, digest).await.unwrap_err();
        assert!(err.is_unique_violation());
        assert!(!StoreError::Closed.is_unique_violation());
    }

    #[tokio::test]
    async fn closed_store_rejects_queries() {
        let store = UserStore::open_in_memory().unwrap();
        store.close().unwrap();
        store.close().unwrap();

        let err = store.find_by_id(&id("1")).await.unwrap_err();
        assert!(matches!(err, StoreError::Closed));
    }

    #[tokio::test]
    async fn file_backed_store_persists_seed() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("demo.db");
        UserStore::open(&path).unwrap().close().unwrap();

        let reopened = UserStore::open(&path).unwrap();
        assert_eq!(reopened.find_by_id(&id("2")).await.unwrap().len(), 1);
    }
}
