#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Saved property storage backed by `SQLite`.
//!
//! Properties live in `data/properties.db` (override with
//! `DATABASE_PATH`), one row per property, scoped by the caller's user id.
//! Location, boundaries, and measurements are stored as JSON text.
//!
//! Saving a property that still carries a temporary id issues it a
//! persisted one; the caller should replace its copy with the returned
//! property.

use std::path::{Path, PathBuf};

use moosicbox_json_utils::database::ToValue as _;
use parcel_property_models::{LngLat, Measurements, Property, PropertyId, Provenance, Ring};
use switchy_database::{Database, DatabaseValue, Row};
use switchy_database_connection::init_sqlite_rusqlite;
use thiserror::Error;

/// Default path for the properties database.
pub const DEFAULT_DB_PATH: &str = "data/properties.db";

/// Errors from property storage operations.
#[derive(Debug, Error)]
pub enum DbError {
    /// A database query or command failed.
    #[error("Database error: {0}")]
    Database(String),

    /// An I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A stored row could not be turned back into a property.
    #[error("Data conversion error: {message}")]
    Conversion {
        /// Description of what went wrong.
        message: String,
    },
}

fn db_err(e: impl std::fmt::Display) -> DbError {
    DbError::Database(e.to_string())
}

/// A property as stored, with its row metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredProperty {
    /// The saved property. Its id is always persisted.
    pub property: Property,
    /// Owner of the row.
    pub user_id: String,
    /// RFC 3339 creation time.
    pub created_at: String,
}

/// Returns the database path from `DATABASE_PATH`, or [`DEFAULT_DB_PATH`].
#[must_use]
pub fn db_path_from_env() -> PathBuf {
    std::env::var("DATABASE_PATH")
        .ok()
        .filter(|p| !p.trim().is_empty())
        .map_or_else(|| PathBuf::from(DEFAULT_DB_PATH), PathBuf::from)
}

/// Opens (or creates) the properties database and ensures the schema
/// exists.
///
/// # Errors
///
/// Returns [`DbError`] if the database cannot be opened or schema creation
/// fails.
pub async fn open_db(path: &Path) -> Result<Box<dyn Database>, DbError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }

    let db = init_sqlite_rusqlite(Some(path)).map_err(db_err)?;
    ensure_schema(db.as_ref()).await?;
    log::debug!("Opened property database at {}", path.display());

    Ok(db)
}

async fn ensure_schema(db: &dyn Database) -> Result<(), DbError> {
    db.exec_raw(
        "CREATE TABLE IF NOT EXISTS properties (
            id            TEXT PRIMARY KEY,
            user_id       TEXT NOT NULL,
            name          TEXT NOT NULL,
            description   TEXT,
            address       TEXT,
            location      TEXT NOT NULL,
            boundaries    TEXT NOT NULL,
            measurements  TEXT,
            provenance    TEXT NOT NULL,
            created_at    TEXT NOT NULL
        )",
    )
    .await
    .map_err(db_err)?;

    db.exec_raw(
        "CREATE INDEX IF NOT EXISTS idx_properties_user
         ON properties (user_id, created_at)",
    )
    .await
    .map_err(db_err)?;

    Ok(())
}

fn optional_string(value: Option<&str>) -> DatabaseValue {
    value.map_or(DatabaseValue::Null, |v| DatabaseValue::String(v.to_string()))
}

/// Saves a property for `user_id` and returns it as stored.
///
/// A temporary id is replaced by a newly issued persisted id. A property
/// that already has a persisted id overwrites its existing row.
///
/// # Errors
///
/// Returns [`DbError`] if serialization or the write fails.
pub async fn save_property(
    db: &dyn Database,
    user_id: &str,
    property: &Property,
) -> Result<StoredProperty, DbError> {
    let mut saved = property.clone();
    if saved.id.is_temporary() {
        saved.id = PropertyId::persisted();
        log::debug!("Issued id {} for {}", saved.id, property.id);
    }

    let created_at = chrono::Utc::now().to_rfc3339();
    let measurements = saved
        .measurements
        .as_ref()
        .map(serde_json::to_string)
        .transpose()?;

    db.exec_raw_params(
        "INSERT INTO properties
            (id, user_id, name, description, address, location, boundaries,
             measurements, provenance, created_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
         ON CONFLICT (id) DO UPDATE SET
           name = excluded.name,
           description = excluded.description,
           address = excluded.address,
           location = excluded.location,
           boundaries = excluded.boundaries,
           measurements = excluded.measurements,
           provenance = excluded.provenance
         WHERE properties.user_id = excluded.user_id",
        &[
            DatabaseValue::String(saved.id.to_string()),
            DatabaseValue::String(user_id.to_string()),
            DatabaseValue::String(saved.name.clone()),
            optional_string(saved.description.as_deref()),
            optional_string(saved.address.as_deref()),
            DatabaseValue::String(serde_json::to_string(&saved.location)?),
            DatabaseValue::String(serde_json::to_string(&saved.boundaries)?),
            optional_string(measurements.as_deref()),
            DatabaseValue::String(saved.provenance.to_string()),
            DatabaseValue::String(created_at),
        ],
    )
    .await
    .map_err(db_err)?;

    log::info!("Saved property {} ({:?})", saved.id, saved.name);

    get_property(db, user_id, saved.id.as_str())
        .await?
        .ok_or_else(|| DbError::Conversion {
            message: format!("Property {} belongs to another user", saved.id),
        })
}

fn required(row: &Row, column: &str) -> Result<String, DbError> {
    row.to_value::<String>(column)
        .map_err(|e| DbError::Conversion {
            message: format!("Failed to read column {column}: {e:?}"),
        })
}

fn row_to_stored(row: &Row) -> Result<StoredProperty, DbError> {
    let id = required(row, "id")?;
    let location = required(row, "location")?;
    let boundaries = required(row, "boundaries")?;
    let measurements = row
        .to_value::<Option<String>>("measurements")
        .unwrap_or(None);
    let provenance = required(row, "provenance")?;

    let location: LngLat = serde_json::from_str(&location)?;
    let boundaries: Vec<Ring> = serde_json::from_str(&boundaries)?;
    let measurements: Option<Measurements> = measurements
        .as_deref()
        .map(serde_json::from_str)
        .transpose()?;

    Ok(StoredProperty {
        property: Property {
            id: PropertyId::from(id),
            name: required(row, "name")?,
            description: row.to_value::<Option<String>>("description").unwrap_or(None),
            address: row.to_value::<Option<String>>("address").unwrap_or(None),
            location,
            boundaries,
            measurements,
            provenance: provenance.parse().unwrap_or(Provenance::Live),
        },
        user_id: required(row, "user_id")?,
        created_at: required(row, "created_at")?,
    })
}

/// Lists a user's saved properties, oldest first.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails or a row cannot be decoded.
pub async fn list_properties(
    db: &dyn Database,
    user_id: &str,
) -> Result<Vec<StoredProperty>, DbError> {
    let rows = db
        .query_raw_params(
            "SELECT * FROM properties WHERE user_id = $1 ORDER BY created_at, id",
            &[DatabaseValue::String(user_id.to_string())],
        )
        .await
        .map_err(db_err)?;

    rows.iter().map(row_to_stored).collect()
}

/// Loads one of a user's properties.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails or the row cannot be decoded.
pub async fn get_property(
    db: &dyn Database,
    user_id: &str,
    id: &str,
) -> Result<Option<StoredProperty>, DbError> {
    let rows = db
        .query_raw_params(
            "SELECT * FROM properties WHERE user_id = $1 AND id = $2",
            &[
                DatabaseValue::String(user_id.to_string()),
                DatabaseValue::String(id.to_string()),
            ],
        )
        .await
        .map_err(db_err)?;

    rows.first().map(row_to_stored).transpose()
}

/// Renames one of a user's properties. Returns the updated property, or
/// `None` if there is no such property.
///
/// # Errors
///
/// Returns [`DbError`] if the query or update fails.
pub async fn rename_property(
    db: &dyn Database,
    user_id: &str,
    id: &str,
    name: &str,
) -> Result<Option<Property>, DbError> {
    let Some(stored) = get_property(db, user_id, id).await? else {
        return Ok(None);
    };

    let mut property = stored.property;
    property.rename(name);

    db.exec_raw_params(
        "UPDATE properties SET name = $1 WHERE user_id = $2 AND id = $3",
        &[
            DatabaseValue::String(property.name.clone()),
            DatabaseValue::String(user_id.to_string()),
            DatabaseValue::String(id.to_string()),
        ],
    )
    .await
    .map_err(db_err)?;

    Ok(Some(property))
}

/// Deletes one of a user's properties. Returns `false` if nothing was
/// deleted.
///
/// # Errors
///
/// Returns [`DbError`] if the delete fails.
pub async fn delete_property(db: &dyn Database, user_id: &str, id: &str) -> Result<bool, DbError> {
    let deleted = db
        .exec_raw_params(
            "DELETE FROM properties WHERE user_id = $1 AND id = $2",
            &[
                DatabaseValue::String(user_id.to_string()),
                DatabaseValue::String(id.to_string()),
            ],
        )
        .await
        .map_err(db_err)?;

    if deleted > 0 {
        log::info!("Deleted property {id}");
    }
    Ok(deleted > 0)
}

#[cfg(test)]
mod tests {
    use parcel_property_models::SegmentMeasurement;

    use super::*;

    async fn temp_db(name: &str) -> (Box<dyn Database>, PathBuf) {
        let path = std::env::temp_dir().join(format!(
            "parcel-db-{}-{name}.db",
            std::process::id()
        ));
        std::fs::remove_file(&path).ok();
        (open_db(&path).await.unwrap(), path)
    }

    fn property() -> Property {
        let ring = vec![
            LngLat::new(153.0, -27.0),
            LngLat::new(153.001, -27.0),
            LngLat::new(153.001, -27.001),
            LngLat::new(153.0, -27.0),
        ];
        let id = PropertyId::temporary();
        Property {
            name: "12 Smith Street".to_string(),
            id,
            description: Some("Corner block".to_string()),
            address: Some("12 Smith Street, Townsville 4810".to_string()),
            location: LngLat::new(153.0007, -27.0003),
            boundaries: vec![ring],
            measurements: Some(Measurements {
                total_length_m: 380.0,
                segments: vec![SegmentMeasurement {
                    index: 0,
                    start: LngLat::new(153.0, -27.0),
                    end: LngLat::new(153.001, -27.0),
                    length_m: 111.3,
                }],
                area_m2: 6_196.0,
            }),
            provenance: Provenance::Synthetic,
        }
    }

    #[tokio::test]
    async fn save_issues_persisted_id_and_round_trips() {
        let (db, path) = temp_db("save").await;
        let original = property();

        let stored = save_property(db.as_ref(), "user-1", &original).await.unwrap();
        assert!(!stored.property.id.is_temporary());
        assert_ne!(stored.property.id, original.id);
        assert_eq!(stored.user_id, "user-1");
        assert_eq!(stored.property.boundaries, original.boundaries);
        assert_eq!(stored.property.measurements, original.measurements);
        assert_eq!(stored.property.provenance, Provenance::Synthetic);

        let listed = list_properties(db.as_ref(), "user-1").await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].property, stored.property);

        std::fs::remove_file(path).ok();
    }

    #[tokio::test]
    async fn saving_a_persisted_property_updates_in_place() {
        let (db, path) = temp_db("update").await;
        let mut stored = save_property(db.as_ref(), "user-1", &property())
            .await
            .unwrap()
            .property;

        stored.description = None;
        let again = save_property(db.as_ref(), "user-1", &stored).await.unwrap();
        assert_eq!(again.property.id, stored.id);
        assert_eq!(again.property.description, None);
        assert_eq!(list_properties(db.as_ref(), "user-1").await.unwrap().len(), 1);

        std::fs::remove_file(path).ok();
    }

    #[tokio::test]
    async fn rows_are_scoped_by_user() {
        let (db, path) = temp_db("scope").await;
        let stored = save_property(db.as_ref(), "alice", &property()).await.unwrap();
        let id = stored.property.id.as_str();

        assert!(list_properties(db.as_ref(), "bob").await.unwrap().is_empty());
        assert!(get_property(db.as_ref(), "bob", id).await.unwrap().is_none());
        assert!(!delete_property(db.as_ref(), "bob", id).await.unwrap());
        assert!(
            rename_property(db.as_ref(), "bob", id, "Mine now")
                .await
                .unwrap()
                .is_none()
        );

        assert!(delete_property(db.as_ref(), "alice", id).await.unwrap());
        assert!(list_properties(db.as_ref(), "alice").await.unwrap().is_empty());

        std::fs::remove_file(path).ok();
    }

    #[tokio::test]
    async fn rename_falls_back_to_address_when_blank() {
        let (db, path) = temp_db("rename").await;
        let stored = save_property(db.as_ref(), "user-1", &property()).await.unwrap();
        let id = stored.property.id.as_str();

        let renamed = rename_property(db.as_ref(), "user-1", id, "Home")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(renamed.name, "Home");

        let renamed = rename_property(db.as_ref(), "user-1", id, "  ")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(renamed.name, "12 Smith Street, Townsville 4810");

        let reloaded = get_property(db.as_ref(), "user-1", id).await.unwrap().unwrap();
        assert_eq!(reloaded.property.name, renamed.name);

        std::fs::remove_file(path).ok();
    }
}
