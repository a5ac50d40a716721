// 📇 Reference Entities - Lazily-created lookup tables
//
// Ten small (id, name) tables back the vehicle foreign keys: bus type,
// AC unit, depot, status, make, model, body type, body subtype, drive
// type, fuel. One generic resolver covers all of them - the kinds differ
// only in target table.

use anyhow::Result;
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};

// ============================================================================
// REFERENCE KIND
// ============================================================================

/// The ten reference entity kinds, each mapping to its own lookup table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReferenceKind {
    BusType,
    AcUnit,
    Depot,
    Status,
    Make,
    Model,
    BodyType,
    BodySubtype,
    DriveType,
    Fuel,
}

impl ReferenceKind {
    /// Every kind, in schema order. `setup_database` iterates this to
    /// create the tables; adding a kind here is the whole registration.
    pub const ALL: [ReferenceKind; 10] = [
        ReferenceKind::BusType,
        ReferenceKind::AcUnit,
        ReferenceKind::Depot,
        ReferenceKind::Status,
        ReferenceKind::Make,
        ReferenceKind::Model,
        ReferenceKind::BodyType,
        ReferenceKind::BodySubtype,
        ReferenceKind::DriveType,
        ReferenceKind::Fuel,
    ];

    /// The backing table name.
    pub fn table(&self) -> &'static str {
        match self {
            ReferenceKind::BusType => "bus_types",
            ReferenceKind::AcUnit => "ac_units",
            ReferenceKind::Depot => "depots",
            ReferenceKind::Status => "statuses",
            ReferenceKind::Make => "makes",
            ReferenceKind::Model => "models",
            ReferenceKind::BodyType => "body_types",
            ReferenceKind::BodySubtype => "body_subtypes",
            ReferenceKind::DriveType => "drive_types",
            ReferenceKind::Fuel => "fuels",
        }
    }
}

// ============================================================================
// RESOLVER
// ============================================================================

/// Resolve a display name to its reference row id, creating the row on
/// first encounter.
///
/// Resolution is idempotent: the same name always converges to the same
/// id, and the table gains at most one row per distinct name. An absent
/// name resolves to `None` - the foreign key stays NULL and no row is
/// ever created for it.
pub fn find_or_create_id_by_name(
    conn: &Connection,
    kind: ReferenceKind,
    name: Option<&str>,
) -> Result<Option<i64>> {
    let name = match name {
        Some(name) => name,
        None => return Ok(None),
    };

    if let Some(id) = find_id_by_name(conn, kind, name)? {
        return Ok(Some(id));
    }

    conn.execute(
        &format!("INSERT INTO {} (name) VALUES (?1)", kind.table()),
        params![name],
    )?;
    Ok(Some(conn.last_insert_rowid()))
}

/// Read-only lookup: id of the row with this exact name, if any.
pub fn find_id_by_name(
    conn: &Connection,
    kind: ReferenceKind,
    name: &str,
) -> Result<Option<i64>> {
    let id = conn
        .query_row(
            &format!("SELECT id FROM {} WHERE name = ?1", kind.table()),
            params![name],
            |row| row.get(0),
        )
        .optional()?;
    Ok(id)
}

/// Reverse lookup, used by reporting and tests.
pub fn name_by_id(conn: &Connection, kind: ReferenceKind, id: i64) -> Result<Option<String>> {
    let name = conn
        .query_row(
            &format!("SELECT name FROM {} WHERE id = ?1", kind.table()),
            params![id],
            |row| row.get(0),
        )
        .optional()?;
    Ok(name)
}

/// Number of rows in one reference table.
pub fn count(conn: &Connection, kind: ReferenceKind) -> Result<i64> {
    let count = conn.query_row(
        &format!("SELECT COUNT(*) FROM {}", kind.table()),
        [],
        |row| row.get(0),
    )?;
    Ok(count)
}

// ============================================================================
// TESTS
// ============================================================================
