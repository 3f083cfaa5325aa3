use std::os::raw::c_int;

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ValueRef};
use rusqlite::{ffi, Connection, OptionalExtension};
use tokio::sync::Mutex;

use crate::time_utils::TIME_FORMAT;
use crate::{models, Error, Result};

const SCHEMA : &str = "
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    email TEXT UNIQUE CHECK(LENGTH(email) <= 36),
    phone_number TEXT UNIQUE CHECK(LENGTH(phone_number) <= 36),
    username TEXT NOT NULL CHECK(LENGTH(username) <= 16),
    password TEXT NOT NULL CHECK(LENGTH(password) <= 128)
);

CREATE TABLE IF NOT EXISTS notes (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL CHECK(LENGTH(title) <= 150),
    body TEXT CHECK(LENGTH(body) <= 10000),
    created TEXT NOT NULL,
    author_id INTEGER NOT NULL,
    deleted INTEGER NOT NULL DEFAULT 0,
    FOREIGN KEY (author_id) REFERENCES users(id)
);
";

fn error_code_match(err : &rusqlite::Error, code : ffi::ErrorCode, ext : c_int) -> bool {
    matches!(
            err,
            rusqlite::Error::SqliteFailure(e, _)
                if e.code == code
                && e.extended_code == ext)
}

// Every method holds the connection lock for the whole call and runs its
// statements off the async worker; cached statements go back to the cache
// when the body returns, error or not.
macro_rules! db_method {
        ($name:ident (
            &$self:ident,
            $conn:ident
            $(, $pname:ident : $ptype:ty)* $(,)?
        ) -> $ret:ty $body:block ) => {
            pub async fn $name (&$self, $( $pname : $ptype, )* ) -> $ret {
                let $conn = $self.conn.lock().await;
                tokio::task::block_in_place(|| $body)
            }
        }
    }

pub struct Db {
    conn : Mutex<Connection>,
}

impl Db {
    pub fn new<P : AsRef<std::path::Path>>(p : P) -> Result<Self> {
        let conn = Connection::open(p.as_ref())?;

        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.execute_batch(SCHEMA)?;

        tracing::debug!(path = %p.as_ref().display(), "database ready");

        Ok(Self {
            conn : Mutex::new(conn),
        })
    }

    db_method! {find_account(
        &self,
        conn,
        email : &str,
        phone_number : &str
    ) -> Result<Option<i64>> {
        Ok(conn
            .prepare_cached(
                "SELECT id FROM users WHERE email = ? OR phone_number = ?",
            )?
            .query_row(rusqlite::params![email, phone_number], |row| row.get(0))
            .optional()?)
    }}

    db_method! {insert_user(
        &self,
        conn,
        email : &str,
        phone_number : &str,
        username : &str,
        password : &str
    ) -> Result<i64> {
        conn
            .prepare_cached(
                "INSERT INTO users (email, phone_number, username, password)
                VALUES (?, ?, ?, ?)",
            )?
            .execute(rusqlite::params![email, phone_number, username, password])
            .map_err(|err| {
                if error_code_match(
                    &err,
                    ffi::ErrorCode::ConstraintViolation,
                    ffi::SQLITE_CONSTRAINT_UNIQUE,
                ) {
                    Error::Integrity(email.to_string())
                } else {
                    err.into()
                }
            })?;

        Ok(conn.last_insert_rowid())
    }}

    db_method! {get_user(&self, conn, user_id : i64) -> Result<Option<models::User>> {
        let mut stmt = conn
            .prepare_cached("SELECT * FROM users WHERE users.id = ?")?;

        let mut rows = stmt.query(rusqlite::params![user_id])?;

        let user = match rows.next()? {
            Some(row) => Some(row_parse(row)?),
            None => None,
        };

        Ok(user)
    }}

    db_method! {get_password_hash(
        &self,
        conn,
        email : &str
    ) -> Result<Option<String>> {
        Ok(conn
            .prepare_cached("SELECT password FROM users WHERE email = ?")?
            .query_row(rusqlite::params![email], |row| row.get(0))
            .optional()?)
    }}

    db_method! {get_identity(
        &self,
        conn,
        email : &str
    ) -> Result<Option<models::Identity>> {
        let mut stmt = conn.prepare_cached(
            "SELECT id AS user_id, username FROM users WHERE email = ?",
        )?;

        let mut rows = stmt.query(rusqlite::params![email])?;

        let identity = match rows.next()? {
            Some(row) => Some(row_parse(row)?),
            None => None,
        };

        Ok(identity)
    }}

    db_method! {get_note(&self, conn, note_id : i64) -> Result<Option<models::Note>> {
        let mut stmt = conn
            .prepare_cached("SELECT * FROM notes WHERE notes.id = ?")?;

        let mut rows = stmt.query(rusqlite::params![note_id])?;

        let note = match rows.next()? {
            Some(row) => Some(row_parse(row)?),
            None => None,
        };

        Ok(note)
    }}

    db_method! {insert_note(
        &self,
        conn,
        title : &str,
        body : &str,
        created : &str,
        author_id : i64
    ) -> Result<i64> {
        conn
            .prepare_cached(
                "INSERT INTO notes (title, body, created, author_id)
                VALUES (?, ?, ?, ?)",
            )?
            .execute(rusqlite::params![title, body, created, author_id])?;

        Ok(conn.last_insert_rowid())
    }}

    db_method! {update_note(
        &self,
        conn,
        note_id : i64,
        title : &str,
        body : &str
    ) -> Result<()> {
        conn
            .prepare_cached("UPDATE notes SET title = ?, body = ? WHERE id = ?")?
            .execute(rusqlite::params![title, body, note_id])?;
        Ok(())
    }}

    db_method! {mark_note_deleted(&self, conn, note_id : i64) -> Result<()> {
        conn
            .prepare_cached("UPDATE notes SET deleted = 1 WHERE id = ?")?
            .execute(rusqlite::params![note_id])?;
        Ok(())
    }}

    db_method! {count_live_notes(&self, conn) -> Result<u32> {
        Ok(conn
            .prepare_cached("SELECT COUNT(*) FROM notes WHERE deleted = 0")?
            .query_row([], |row| row.get(0))?)
    }}

    db_method! {list_live_notes(
        &self,
        conn,
        limit : u32,
        offset : u32
    ) -> Result<Vec<models::PostSummary>> {
        let mut stmt = conn.prepare_cached(
            "SELECT notes.id AS id, notes.author_id AS author_id,
                notes.title AS title, notes.body AS body,
                notes.created AS created, users.username AS creator
            FROM notes INNER JOIN users ON notes.author_id = users.id
            WHERE notes.deleted = 0
            ORDER BY notes.id
            LIMIT ? OFFSET ?",
        )?;

        let rows = stmt.query(rusqlite::params![limit, offset])?;

        collect_rows(rows)
    }}

    db_method! {search_live_notes(
        &self,
        conn,
        pattern : &str
    ) -> Result<Vec<models::Note>> {
        let mut stmt = conn.prepare_cached(
            "SELECT * FROM notes
            WHERE (title LIKE ?1 ESCAPE '\\' OR body LIKE ?1 ESCAPE '\\')
                AND deleted = 0
            ORDER BY id",
        )?;

        let rows = stmt.query(rusqlite::params![pattern])?;

        collect_rows(rows)
    }}
}

fn row_parse<T : FromRow>(row : &rusqlite::Row) -> Result<T> {
    T::from_row(row)
}

fn collect_rows<T : FromRow>(mut rows : rusqlite::Rows) -> Result<Vec<T>> {
    let mut out = Vec::new();
    while let Some(row) = rows.next()? {
        out.push(row_parse(row)?);
    }

    Ok(out)
}

trait FromRow: Sized {
    fn from_row(row : &rusqlite::Row) -> Result<Self>;
}

// Columns are looked up by name, so queries may select them in any order
// as long as every field has a matching (possibly aliased) column.
macro_rules! impl_from_row {
        ($ty:ty { $($field:ident),* }) => {
            impl FromRow for $ty {
                fn from_row(row : &rusqlite::Row) -> Result<$ty> {
                    Ok(Self{
                    $(
                        $field : row.get(stringify!($field))?,
                    )*
                    })
                }
            }
        }
    }

impl_from_row! {models::User {
    id, email, phone_number, username, password
}}

impl_from_row! {models::Note {
    id, title, body, created, author_id, deleted
}}

impl_from_row! {models::PostSummary {
    id, author_id, title, body, created, creator
}}

impl_from_row! {models::Identity {
    user_id, username
}}

impl FromSql for models::Time {
    fn column_result(value : ValueRef) -> FromSqlResult<models::Time> {
        let s : String = String::column_result(value)?;

        let dt = time::PrimitiveDateTime::parse(&s, &TIME_FORMAT)
            .map_err(|err| FromSqlError::Other(Box::new(err)))?;

        Ok(dt.assume_offset(time::UtcOffset::UTC).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open() -> (tempfile::TempDir, Db) {
        let dir = tempfile::tempdir().unwrap();
        let db = Db::new(dir.path().join("test.sqlite3")).expect("should open");
        (dir, db)
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn reopening_keeps_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.sqlite3");

        {
            let db = Db::new(&path).unwrap();
            db.insert_user("a@x.com", "1234567", "alice", "hash")
                .await
                .unwrap();
        }

        let db = Db::new(&path).unwrap();
        assert_eq!(db.find_account("a@x.com", "").await.unwrap(), Some(1));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn duplicate_email_is_an_integrity_error() {
        let (_dir, db) = open();

        db.insert_user("a@x.com", "1234567", "alice", "hash")
            .await
            .unwrap();

        let err = db
            .insert_user("a@x.com", "7654321", "alice2", "hash")
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Integrity(ref email) if email == "a@x.com"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn note_needs_an_existing_author() {
        let (_dir, db) = open();

        let err = db
            .insert_note("title", "", "2024-01-01 00:00:00", 42)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Sqlite(_)));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn schema_checks_reject_long_titles() {
        let (_dir, db) = open();
        let author = db
            .insert_user("a@x.com", "1234567", "alice", "hash")
            .await
            .unwrap();

        let title = "t".repeat(151);
        assert!(db
            .insert_note(&title, "", "2024-01-01 00:00:00", author)
            .await
            .is_err());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn note_rows_parse_back() {
        let (_dir, db) = open();
        let author = db
            .insert_user("a@x.com", "1234567", "alice", "hash")
            .await
            .unwrap();

        let id = db
            .insert_note("title", "body", "2024-01-02 03:04:05", author)
            .await
            .unwrap();

        let note = db.get_note(id).await.unwrap().unwrap();
        assert_eq!(note.title, "title");
        assert_eq!(note.body.as_deref(), Some("body"));
        assert_eq!(note.author_id, author);
        assert!(!note.deleted);
        assert_eq!(note.created.to_column().unwrap(), "2024-01-02 03:04:05");

        let identity = db.get_identity("a@x.com").await.unwrap().unwrap();
        assert_eq!(identity.user_id, author);
        assert_eq!(identity.username, "alice");
    }
}
