/// Database row types for all tables.
/// These correspond 1:1 to the SQLite schema defined in migrations.rs.
use chrono::{DateTime, Utc};
use rusqlite::Row;
use serde::Serialize;

use crate::db::parse_timestamp;

/// User record in the users table
#[derive(Debug, Clone)]
pub struct User {
    pub id: u64,
    pub email: String,
    pub password_hash: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Which table a stored object lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectKind {
    File,
    Text,
}

impl ObjectKind {
    pub fn table(self) -> &'static str {
        match self {
            ObjectKind::File => "files",
            ObjectKind::Text => "texts",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ObjectKind::File => "file",
            ObjectKind::Text => "text",
        }
    }
}

/// Metadata for a stored object. Files keep their bytes in the storage
/// backend; texts keep them inline in the `data` column.
#[derive(Debug, Clone, Serialize)]
pub struct StoredObject {
    pub kind: ObjectKind,
    #[serde(skip)]
    pub id: i64,
    pub hash: String,
    pub name: String,
    pub size: u64,
    pub user_id: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl StoredObject {
    /// Columns expected by [`StoredObject::from_row`], in order.
    pub const COLUMNS: &'static str =
        "id, hash, name, size, user_id, created_at, updated_at, expires_at";

    pub fn from_row(kind: ObjectKind, row: &Row<'_>) -> rusqlite::Result<Self> {
        let expires_at: Option<String> = row.get(7)?;
        Ok(Self {
            kind,
            id: row.get(0)?,
            hash: row.get(1)?,
            name: row.get(2)?,
            size: row.get::<_, i64>(3)? as u64,
            user_id: row.get::<_, i64>(4)? as u64,
            created_at: parse_timestamp(&row.get::<_, String>(5)?)?,
            updated_at: parse_timestamp(&row.get::<_, String>(6)?)?,
            expires_at: expires_at.as_deref().map(parse_timestamp).transpose()?,
        })
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// A text object together with its inline content.
#[derive(Debug, Clone, Serialize)]
pub struct TextObject {
    #[serde(flatten)]
    pub meta: StoredObject,
    pub data: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn object(expires_at: Option<DateTime<Utc>>) -> StoredObject {
        let now = Utc::now();
        StoredObject {
            kind: ObjectKind::File,
            id: 1,
            hash: "a".repeat(64),
            name: "n".into(),
            size: 1,
            user_id: 1,
            created_at: now,
            updated_at: now,
            expires_at,
        }
    }

    #[test]
    fn test_expiry() {
        let now = Utc::now();
        assert!(!object(None).is_expired(now));
        assert!(!object(Some(now + Duration::hours(1))).is_expired(now));
        assert!(object(Some(now - Duration::seconds(1))).is_expired(now));
    }

    #[test]
    fn test_serialized_shape_hides_row_id() {
        let json = serde_json::to_value(object(None)).unwrap();
        assert_eq!(json["kind"], "file");
        assert!(json.get("id").is_none());
        assert_eq!(json["hash"].as_str().unwrap().len(), 64);
    }
}
