// 🔩 Vehicle Specs Entity - 1:1 extension of a vehicle
//
// Holds the identification and capacity details that only matter once a
// vehicle exists: VIN, plate, odometer, capacities, and the drivetrain
// reference keys. Created together with its vehicle, never updated.

use anyhow::Result;
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};

/// A row of the `vehicle_specs` table. `vehicle_id` is unique - at most
/// one specs row per vehicle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleSpecs {
    /// Database rowid, assigned on insert.
    pub id: Option<i64>,
    pub vehicle_id: i64,
    pub vin: Option<String>,
    pub license_plate: Option<String>,
    pub odometer: Option<i64>,
    pub date_odometer: Option<String>,
    pub child_capacity: Option<i64>,
    pub adult_capacity: Option<i64>,
    pub wheelchair_capacity: Option<i64>,
    pub make_id: Option<i64>,
    pub model_id: Option<i64>,
    pub body_type_id: Option<i64>,
    pub body_subtype_id: Option<i64>,
    pub drive_type_id: Option<i64>,
    pub fuel_id: Option<i64>,
}

impl VehicleSpecs {
    /// Insert this specs row and return it with the assigned rowid. A
    /// second row for the same vehicle violates UNIQUE(vehicle_id) and
    /// propagates.
    pub fn insert(&self, conn: &Connection) -> Result<VehicleSpecs> {
        conn.execute(
            "INSERT INTO vehicle_specs (
                vehicle_id, vin, license_plate, odometer, date_odometer,
                child_capacity, adult_capacity, wheelchair_capacity,
                make_id, model_id, body_type_id, body_subtype_id,
                drive_type_id, fuel_id
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
            params![
                self.vehicle_id,
                self.vin,
                self.license_plate,
                self.odometer,
                self.date_odometer,
                self.child_capacity,
                self.adult_capacity,
                self.wheelchair_capacity,
                self.make_id,
                self.model_id,
                self.body_type_id,
                self.body_subtype_id,
                self.drive_type_id,
                self.fuel_id,
            ],
        )?;

        let mut saved = self.clone();
        saved.id = Some(conn.last_insert_rowid());
        Ok(saved)
    }

    /// Load the specs row owned by a vehicle, if one was ever created.
    pub fn find_by_vehicle_id(conn: &Connection, vehicle_id: i64) -> Result<Option<VehicleSpecs>> {
        let specs = conn
            .query_row(
                "SELECT id, vehicle_id, vin, license_plate, odometer, date_odometer,
                        child_capacity, adult_capacity, wheelchair_capacity,
                        make_id, model_id, body_type_id, body_subtype_id,
                        drive_type_id, fuel_id
                 FROM vehicle_specs
                 WHERE vehicle_id = ?1",
                params![vehicle_id],
                |row| {
                    Ok(VehicleSpecs {
                        id: row.get(0)?,
                        vehicle_id: row.get(1)?,
                        vin: row.get(2)?,
                        license_plate: row.get(3)?,
                        odometer: row.get(4)?,
                        date_odometer: row.get(5)?,
                        child_capacity: row.get(6)?,
                        adult_capacity: row.get(7)?,
                        wheelchair_capacity: row.get(8)?,
                        make_id: row.get(9)?,
                        model_id: row.get(10)?,
                        body_type_id: row.get(11)?,
                        body_subtype_id: row.get(12)?,
                        drive_type_id: row.get(13)?,
                        fuel_id: row.get(14)?,
                    })
                },
            )
            .optional()?;
        Ok(specs)
    }
}

// ============================================================================
// TESTS
// ============================================================================
