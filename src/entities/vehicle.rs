// 🚌 Vehicle Entity - The primary fleet record
//
// One row per Fleetio id. Rows are created once by reconciliation and
// never mutated or deleted afterwards; re-encountering a vehicle returns
// the stored row as-is.

use anyhow::Result;
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};

/// A vehicle as stored in the `vehicles` table.
///
/// `fleetio_id` is the external identifier from the fleet-management API
/// and uniquely identifies a row. `nycsbus_id` is our own internal id,
/// cleaned from the Fleetio display name. Every other column is nullable:
/// a sparse source document simply produces a sparse row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vehicle {
    /// Database rowid, assigned on insert.
    pub id: Option<i64>,
    pub fleetio_id: i64,
    pub nycsbus_id: Option<String>,
    pub year: Option<i64>,
    pub passenger_windows: Option<i64>,
    pub back_wheels: Option<i64>,
    pub bus_type_id: Option<i64>,
    pub ac_unit_id: Option<i64>,
    pub depot_id: Option<i64>,
    pub status_id: Option<i64>,

    /// Whether this vehicle was already in the database when it was
    /// reconciled. Runtime flag only, never persisted.
    #[serde(skip)]
    pub exists: bool,
}

impl Vehicle {
    /// Derive the internal nycsbus id from the Fleetio display name:
    /// uppercase, ASCII alphanumerics only. "bus-0042" becomes "BUS0042".
    /// A name that cleans down to nothing yields `None`.
    pub fn clean_nycsbus_id(name: Option<&str>) -> Option<String> {
        let cleaned: String = name?
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_uppercase())
            .collect();
        if cleaned.is_empty() {
            None
        } else {
            Some(cleaned)
        }
    }

    /// Look up a vehicle by its external identifier. A row that is found
    /// comes back with `exists = true`.
    pub fn find_by_fleetio_id(conn: &Connection, fleetio_id: i64) -> Result<Option<Vehicle>> {
        let vehicle = conn
            .query_row(
                "SELECT id, fleetio_id, nycsbus_id, year, passenger_windows,
                        back_wheels, bus_type_id, ac_unit_id, depot_id, status_id
                 FROM vehicles
                 WHERE fleetio_id = ?1",
                params![fleetio_id],
                |row| {
                    Ok(Vehicle {
                        id: row.get(0)?,
                        fleetio_id: row.get(1)?,
                        nycsbus_id: row.get(2)?,
                        year: row.get(3)?,
                        passenger_windows: row.get(4)?,
                        back_wheels: row.get(5)?,
                        bus_type_id: row.get(6)?,
                        ac_unit_id: row.get(7)?,
                        depot_id: row.get(8)?,
                        status_id: row.get(9)?,
                        exists: true,
                    })
                },
            )
            .optional()?;
        Ok(vehicle)
    }

    /// Insert this vehicle and return it with the assigned rowid.
    ///
    /// A duplicate `fleetio_id` violates the UNIQUE constraint and
    /// propagates - callers are expected to have checked existence first.
    pub fn insert(&self, conn: &Connection) -> Result<Vehicle> {
        conn.execute(
            "INSERT INTO vehicles (
                fleetio_id, nycsbus_id, year, passenger_windows, back_wheels,
                bus_type_id, ac_unit_id, depot_id, status_id
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                self.fleetio_id,
                self.nycsbus_id,
                self.year,
                self.passenger_windows,
                self.back_wheels,
                self.bus_type_id,
                self.ac_unit_id,
                self.depot_id,
                self.status_id,
            ],
        )?;

        let mut saved = self.clone();
        saved.id = Some(conn.last_insert_rowid());
        Ok(saved)
    }
}

// ============================================================================
// TESTS
// ============================================================================
