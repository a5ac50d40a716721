// 🗄️ Database - schema setup, document loading, audit trail
//
// All persistence goes through a caller-supplied rusqlite Connection,
// passed by reference down the call tree. No ambient globals: the caller
// owns the connection lifecycle, this module owns the schema.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::document::VehicleDocument;
use crate::entities::ReferenceKind;

// ============================================================================
// SCHEMA
// ============================================================================

/// Create every table and index the crate uses. Idempotent - safe to run
/// against an already-initialized database.
pub fn setup_database(conn: &Connection) -> Result<()> {
    // WAL mode for crash recovery
    conn.pragma_update(None, "journal_mode", "WAL")?;

    // Reference tables first; the vehicle tables point at them.
    for kind in ReferenceKind::ALL {
        conn.execute(
            &format!(
                "CREATE TABLE IF NOT EXISTS {} (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    name TEXT UNIQUE NOT NULL
                )",
                kind.table()
            ),
            [],
        )?;
    }

    // ==========================================================================
    // Vehicles Table - one row per Fleetio id
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS vehicles (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            fleetio_id INTEGER UNIQUE NOT NULL,
            nycsbus_id TEXT,
            year INTEGER,
            passenger_windows INTEGER,
            back_wheels INTEGER,
            bus_type_id INTEGER REFERENCES bus_types(id),
            ac_unit_id INTEGER REFERENCES ac_units(id),
            depot_id INTEGER REFERENCES depots(id),
            status_id INTEGER REFERENCES statuses(id),
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    // ==========================================================================
    // Vehicle Specs Table - 1:1 extension keyed by vehicle id
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS vehicle_specs (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            vehicle_id INTEGER UNIQUE NOT NULL REFERENCES vehicles(id),
            vin TEXT,
            license_plate TEXT,
            odometer INTEGER,
            date_odometer TEXT,
            child_capacity INTEGER,
            adult_capacity INTEGER,
            wheelchair_capacity INTEGER,
            make_id INTEGER REFERENCES makes(id),
            model_id INTEGER REFERENCES models(id),
            body_type_id INTEGER REFERENCES body_types(id),
            body_subtype_id INTEGER REFERENCES body_subtypes(id),
            drive_type_id INTEGER REFERENCES drive_types(id),
            fuel_id INTEGER REFERENCES fuels(id),
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    // ==========================================================================
    // Events Table (audit trail)
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS events (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            event_id TEXT UNIQUE NOT NULL,
            timestamp TEXT NOT NULL,
            event_type TEXT NOT NULL,
            entity_type TEXT NOT NULL,
            entity_id TEXT NOT NULL,
            data TEXT NOT NULL,
            actor TEXT NOT NULL,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    // ==========================================================================
    // Indexes
    // ==========================================================================
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_vehicles_fleetio_id ON vehicles(fleetio_id)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_specs_vehicle_id ON vehicle_specs(vehicle_id)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_events_entity ON events(entity_type, entity_id)",
        [],
    )?;

    Ok(())
}

// ============================================================================
// DOCUMENT LOADING
// ============================================================================

/// Load a JSON array of vehicle documents from disk - the shape of a
/// saved Fleetio API page. Fails if the file is not an array or any
/// element is not a usable vehicle document.
pub fn load_vehicle_documents(path: &Path) -> Result<Vec<VehicleDocument>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let root: serde_json::Value =
        serde_json::from_str(&text).with_context(|| format!("Failed to parse {}", path.display()))?;

    let items = root
        .as_array()
        .with_context(|| format!("{} is not a JSON array of vehicles", path.display()))?;

    let mut documents = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        let doc = VehicleDocument::from_value(item.clone())
            .with_context(|| format!("Invalid vehicle document at index {}", index))?;
        documents.push(doc);
    }

    Ok(documents)
}

// ============================================================================
// AUDIT TRAIL
// ============================================================================

/// Event for the audit trail - every created vehicle leaves one behind.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SyncEvent {
    pub event_id: String,
    pub timestamp: DateTime<Utc>,
    pub event_type: String,
    pub entity_type: String,
    pub entity_id: String,
    pub data: serde_json::Value,
    pub actor: String,
}

impl SyncEvent {
    pub fn new(
        event_type: &str,
        entity_type: &str,
        entity_id: &str,
        data: serde_json::Value,
        actor: &str,
    ) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            event_type: event_type.to_string(),
            entity_type: entity_type.to_string(),
            entity_id: entity_id.to_string(),
            data,
            actor: actor.to_string(),
        }
    }
}

/// Insert event into audit trail
pub fn insert_event(conn: &Connection, event: &SyncEvent) -> Result<()> {
    let data_json = serde_json::to_string(&event.data)?;

    conn.execute(
        "INSERT INTO events (
            event_id, timestamp, event_type, entity_type, entity_id, data, actor
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            event.event_id,
            event.timestamp.to_rfc3339(),
            event.event_type,
            event.entity_type,
            event.entity_id,
            data_json,
            event.actor,
        ],
    )?;

    Ok(())
}

/// Get events for a specific entity
pub fn get_events_for_entity(
    conn: &Connection,
    entity_type: &str,
    entity_id: &str,
) -> Result<Vec<SyncEvent>> {
    let mut stmt = conn.prepare(
        "SELECT event_id, timestamp, event_type, entity_type, entity_id, data, actor
         FROM events
         WHERE entity_type = ?1 AND entity_id = ?2
         ORDER BY timestamp DESC",
    )?;

    let events = stmt
        .query_map(params![entity_type, entity_id], |row| {
            let timestamp_str: String = row.get(1)?;
            let data_json: String = row.get(5)?;

            Ok(SyncEvent {
                event_id: row.get(0)?,
                timestamp: DateTime::parse_from_rfc3339(&timestamp_str)
                    .map_err(|_| rusqlite::Error::InvalidQuery)?
                    .with_timezone(&Utc),
                event_type: row.get(2)?,
                entity_type: row.get(3)?,
                entity_id: row.get(4)?,
                data: serde_json::from_str(&data_json)
                    .map_err(|_| rusqlite::Error::InvalidQuery)?,
                actor: row.get(6)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(events)
}

// ============================================================================
// COUNTS
// ============================================================================

pub fn count_vehicles(conn: &Connection) -> Result<i64> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM vehicles", [], |row| row.get(0))?;
    Ok(count)
}

pub fn count_vehicle_specs(conn: &Connection) -> Result<i64> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM vehicle_specs", [], |row| row.get(0))?;
    Ok(count)
}

// ============================================================================
// TESTS
// ============================================================================
