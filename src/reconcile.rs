// ⚖️ Reconcile Engine - match one Fleetio document against the store
//
// Two terminal outcomes, nothing in between:
//   1. A vehicle with the document's fleetio_id already exists - return
//      it untouched, marked existing. No writes of any kind.
//   2. No match - extract attributes (creating reference rows as needed),
//      insert the vehicle, then extract and insert its specs row, and
//      return the vehicle marked newly created.
//
// There is no update-in-place path: stored vehicles are immutable on
// re-encounter.

use anyhow::{Context, Result};
use rusqlite::Connection;
use serde_json::Value;

use crate::coerce::{coerce_int, coerce_text};
use crate::db::{insert_event, SyncEvent};
use crate::document::VehicleDocument;
use crate::entities::reference::{find_or_create_id_by_name, ReferenceKind};
use crate::entities::{Vehicle, VehicleSpecs};

/// Actor recorded on audit events written by the engine.
pub const IMPORT_ACTOR: &str = "fleet_importer";

// ============================================================================
// RECONCILE ENGINE
// ============================================================================

/// Stateless reconciler. All state lives in the caller-supplied
/// connection; the engine only decides existence-vs-creation and maps
/// document fields onto entity columns.
pub struct ReconcileEngine;

impl ReconcileEngine {
    pub fn new() -> Self {
        ReconcileEngine
    }

    /// Reconcile one vehicle document against the store.
    ///
    /// Returns the matching vehicle with `exists = true`, or the newly
    /// created one (vehicle row + specs row) with `exists = false`.
    /// Persistence and resolver failures propagate unmodified; if the
    /// specs insert fails after the vehicle row landed, the vehicle row
    /// remains with no compensating delete.
    pub fn reconcile(&self, conn: &Connection, doc: &VehicleDocument) -> Result<Vehicle> {
        if let Some(vehicle) = Vehicle::find_by_fleetio_id(conn, doc.fleetio_id())? {
            return Ok(vehicle);
        }

        let vehicle = self.extract_vehicle(conn, doc)?.insert(conn)?;
        let vehicle_id = vehicle.id.context("vehicle insert assigned no rowid")?;

        self.extract_specs(conn, vehicle_id, doc)?.insert(conn)?;

        // Audit trail is best-effort: a failed event never fails the sync.
        let event = SyncEvent::new(
            "vehicle_created",
            "vehicle",
            &vehicle.fleetio_id.to_string(),
            serde_json::json!({
                "fleetio_id": vehicle.fleetio_id,
                "nycsbus_id": vehicle.nycsbus_id,
                "document_sha256": doc.fingerprint(),
            }),
            IMPORT_ACTOR,
        );
        let _ = insert_event(conn, &event);

        Ok(vehicle)
    }

    /// Map the document onto a `Vehicle` value. Pure over the document
    /// except for resolver calls, which may create reference rows - the
    /// only extraction side effect.
    pub fn extract_vehicle(&self, conn: &Connection, doc: &VehicleDocument) -> Result<Vehicle> {
        let name = coerce_text(doc.field("name"));

        Ok(Vehicle {
            id: None,
            fleetio_id: doc.fleetio_id(),
            nycsbus_id: Vehicle::clean_nycsbus_id(name.as_deref()),
            year: coerce_int(doc.field("year")),
            passenger_windows: coerce_int(doc.custom_field("passenger_windows")),
            back_wheels: coerce_int(doc.custom_field("count_back_wheels")),
            bus_type_id: resolve(conn, ReferenceKind::BusType, doc.field("vehicle_type_name"))?,
            ac_unit_id: resolve(conn, ReferenceKind::AcUnit, doc.custom_field("ac_units"))?,
            depot_id: resolve(conn, ReferenceKind::Depot, doc.field("group_ancestry"))?,
            status_id: resolve(conn, ReferenceKind::Status, doc.field("vehicle_status_name"))?,
            exists: false,
        })
    }

    /// Map the document onto the `VehicleSpecs` value owned by
    /// `vehicle_id`. Same tolerance and same resolver side effect.
    pub fn extract_specs(
        &self,
        conn: &Connection,
        vehicle_id: i64,
        doc: &VehicleDocument,
    ) -> Result<VehicleSpecs> {
        Ok(VehicleSpecs {
            id: None,
            vehicle_id,
            vin: coerce_text(doc.field("vin")),
            license_plate: coerce_text(doc.field("license_plate")),
            odometer: coerce_int(doc.field("current_meter_value")),
            date_odometer: coerce_text(doc.field("current_meter_date")),
            child_capacity: coerce_int(doc.custom_field("child_capacity")),
            adult_capacity: coerce_int(doc.custom_field("adult_capacity")),
            wheelchair_capacity: coerce_int(doc.custom_field("wheelchair_capacity")),
            make_id: resolve(conn, ReferenceKind::Make, doc.field("make"))?,
            model_id: resolve(conn, ReferenceKind::Model, doc.field("model"))?,
            body_type_id: resolve(conn, ReferenceKind::BodyType, doc.spec_field("body_type"))?,
            body_subtype_id: resolve(
                conn,
                ReferenceKind::BodySubtype,
                doc.spec_field("body_subtype"),
            )?,
            drive_type_id: resolve(conn, ReferenceKind::DriveType, doc.spec_field("drive_type"))?,
            fuel_id: resolve(conn, ReferenceKind::Fuel, doc.field("fuel_type_name"))?,
        })
    }
}

impl Default for ReconcileEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Coerce a raw field to a display name and resolve it to its reference
/// row id. Absent or blank names resolve to `None` without a row.
fn resolve(conn: &Connection, kind: ReferenceKind, value: Option<&Value>) -> Result<Option<i64>> {
    let name = coerce_text(value);
    find_or_create_id_by_name(conn, kind, name.as_deref())
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{count_vehicle_specs, count_vehicles, get_events_for_entity, setup_database};
    use crate::entities::reference;
    use serde_json::json;

    fn test_conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();
        conn
    }

    fn doc(value: Value) -> VehicleDocument {
        VehicleDocument::from_value(value).unwrap()
    }

    fn full_doc(fleetio_id: i64) -> VehicleDocument {
        doc(json!({
            "id": fleetio_id,
            "name": "BUS-0042",
            "year": "2019",
            "vehicle_type_name": "Transit",
            "vehicle_status_name": "Active",
            "group_ancestry": "NYCSBUS|Zerega",
            "make": "Ford",
            "model": "E-450",
            "fuel_type_name": "Diesel",
            "vin": "1HGCM82633A004352",
            "license_plate": "AB12345",
            "current_meter_value": "120433.7",
            "current_meter_date": "2024-11-02",
            "custom_fields": {
                "passenger_windows": "12",
                "count_back_wheels": 4,
                "ac_units": "2",
                "child_capacity": "48",
                "adult_capacity": "32",
                "wheelchair_capacity": "2"
            },
            "specs": {
                "body_type": "Cutaway",
                "body_subtype": "School Bus",
                "drive_type": "RWD"
            }
        }))
    }

    fn table_counts(conn: &Connection) -> (i64, i64, Vec<i64>) {
        let refs = ReferenceKind::ALL
            .iter()
            .map(|kind| reference::count(conn, *kind).unwrap())
            .collect();
        (
            count_vehicles(conn).unwrap(),
            count_vehicle_specs(conn).unwrap(),
            refs,
        )
    }

    #[test]
    fn test_new_vehicle_creates_one_row_pair() {
        let conn = test_conn();
        let engine = ReconcileEngine::new();

        let vehicle = engine.reconcile(&conn, &full_doc(42)).unwrap();

        assert!(!vehicle.exists);
        assert_eq!(count_vehicles(&conn).unwrap(), 1);
        assert_eq!(count_vehicle_specs(&conn).unwrap(), 1);

        let specs = VehicleSpecs::find_by_vehicle_id(&conn, vehicle.id.unwrap())
            .unwrap()
            .unwrap();
        assert_eq!(specs.vin, Some("1HGCM82633A004352".to_string()));
        assert_eq!(specs.odometer, Some(120433), "meter value truncates");
        assert_eq!(specs.date_odometer, Some("2024-11-02".to_string()));
        assert_eq!(specs.child_capacity, Some(48));
        assert_eq!(specs.adult_capacity, Some(32));
        assert_eq!(specs.wheelchair_capacity, Some(2));
    }

    #[test]
    fn test_existing_vehicle_returns_as_is_with_no_writes() {
        let conn = test_conn();
        let engine = ReconcileEngine::new();
        let created = engine.reconcile(&conn, &full_doc(42)).unwrap();
        let before = table_counts(&conn);
        let events_before = get_events_for_entity(&conn, "vehicle", "42").unwrap().len();

        // Same id, different payload: the stored row wins, untouched.
        let again = engine
            .reconcile(
                &conn,
                &doc(json!({"id": 42, "name": "RENAMED", "year": 1999})),
            )
            .unwrap();

        assert!(again.exists);
        assert_eq!(again.id, created.id);
        assert_eq!(again.nycsbus_id, Some("BUS0042".to_string()));
        assert_eq!(again.year, Some(2019), "no attribute refresh on re-encounter");
        assert_eq!(table_counts(&conn), before, "exists path performs no writes");
        assert_eq!(
            get_events_for_entity(&conn, "vehicle", "42").unwrap().len(),
            events_before
        );
    }

    #[test]
    fn test_missing_custom_fields_yields_nulls_not_errors() {
        let conn = test_conn();
        let engine = ReconcileEngine::new();

        let vehicle = engine
            .reconcile(&conn, &doc(json!({"id": 7, "name": "BUS-7"})))
            .unwrap();

        assert!(!vehicle.exists);
        assert_eq!(vehicle.passenger_windows, None);
        assert_eq!(vehicle.back_wheels, None);
        assert_eq!(vehicle.bus_type_id, None);
        assert_eq!(vehicle.depot_id, None);

        let specs = VehicleSpecs::find_by_vehicle_id(&conn, vehicle.id.unwrap())
            .unwrap()
            .unwrap();
        assert_eq!(specs.child_capacity, None);
        assert_eq!(specs.body_type_id, None);

        // No reference rows were created for the absent names.
        for kind in ReferenceKind::ALL {
            assert_eq!(reference::count(&conn, kind).unwrap(), 0);
        }
    }

    #[test]
    fn test_reference_rows_are_shared_across_vehicles() {
        let conn = test_conn();
        let engine = ReconcileEngine::new();

        let first = engine.reconcile(&conn, &full_doc(1)).unwrap();
        let second = engine
            .reconcile(
                &conn,
                &doc(json!({
                    "id": 2,
                    "name": "BUS-0099",
                    "vehicle_type_name": "Transit",
                    "group_ancestry": "NYCSBUS|Zerega"
                })),
            )
            .unwrap();

        assert_eq!(first.bus_type_id, second.bus_type_id);
        assert_eq!(first.depot_id, second.depot_id);
        assert_eq!(reference::count(&conn, ReferenceKind::BusType).unwrap(), 1);
        assert_eq!(reference::count(&conn, ReferenceKind::Depot).unwrap(), 1);
    }

    #[test]
    fn test_created_vehicle_leaves_an_audit_event() {
        let conn = test_conn();
        let engine = ReconcileEngine::new();
        let document = full_doc(42);

        engine.reconcile(&conn, &document).unwrap();

        let events = get_events_for_entity(&conn, "vehicle", "42").unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, "vehicle_created");
        assert_eq!(events[0].actor, IMPORT_ACTOR);
        assert_eq!(events[0].data["fleetio_id"], 42);
        assert_eq!(
            events[0].data["document_sha256"],
            Value::String(document.fingerprint())
        );
    }

    #[test]
    fn test_extract_vehicle_field_mapping() {
        let conn = test_conn();
        let engine = ReconcileEngine::new();

        let vehicle = engine.extract_vehicle(&conn, &full_doc(42)).unwrap();

        assert_eq!(vehicle.fleetio_id, 42);
        assert_eq!(vehicle.nycsbus_id, Some("BUS0042".to_string()));
        assert_eq!(vehicle.year, Some(2019));
        assert_eq!(vehicle.passenger_windows, Some(12));
        assert_eq!(vehicle.back_wheels, Some(4));
        assert_eq!(
            reference::name_by_id(&conn, ReferenceKind::BusType, vehicle.bus_type_id.unwrap())
                .unwrap(),
            Some("Transit".to_string())
        );
        assert_eq!(
            reference::name_by_id(&conn, ReferenceKind::AcUnit, vehicle.ac_unit_id.unwrap())
                .unwrap(),
            Some("2".to_string())
        );
        assert_eq!(
            reference::name_by_id(&conn, ReferenceKind::Depot, vehicle.depot_id.unwrap())
                .unwrap(),
            Some("NYCSBUS|Zerega".to_string())
        );
        assert_eq!(
            reference::name_by_id(&conn, ReferenceKind::Status, vehicle.status_id.unwrap())
                .unwrap(),
            Some("Active".to_string())
        );
    }

    #[test]
    fn test_extract_specs_field_mapping() {
        let conn = test_conn();
        let engine = ReconcileEngine::new();

        let specs = engine.extract_specs(&conn, 1, &full_doc(42)).unwrap();

        assert_eq!(specs.vehicle_id, 1);
        assert_eq!(specs.license_plate, Some("AB12345".to_string()));
        assert_eq!(
            reference::name_by_id(&conn, ReferenceKind::Make, specs.make_id.unwrap()).unwrap(),
            Some("Ford".to_string())
        );
        assert_eq!(
            reference::name_by_id(&conn, ReferenceKind::Model, specs.model_id.unwrap()).unwrap(),
            Some("E-450".to_string())
        );
        assert_eq!(
            reference::name_by_id(&conn, ReferenceKind::BodyType, specs.body_type_id.unwrap())
                .unwrap(),
            Some("Cutaway".to_string())
        );
        assert_eq!(
            reference::name_by_id(
                &conn,
                ReferenceKind::BodySubtype,
                specs.body_subtype_id.unwrap()
            )
            .unwrap(),
            Some("School Bus".to_string())
        );
        assert_eq!(
            reference::name_by_id(&conn, ReferenceKind::DriveType, specs.drive_type_id.unwrap())
                .unwrap(),
            Some("RWD".to_string())
        );
        assert_eq!(
            reference::name_by_id(&conn, ReferenceKind::Fuel, specs.fuel_id.unwrap()).unwrap(),
            Some("Diesel".to_string())
        );
    }

    #[test]
    fn test_end_to_end_example() {
        // The worked example: a fresh id 42 produces one vehicle row, one
        // specs row, and freshly-created reference rows.
        let conn = test_conn();
        let engine = ReconcileEngine::new();

        let vehicle = engine
            .reconcile(
                &conn,
                &doc(json!({
                    "id": 42,
                    "name": "BUS-0042",
                    "year": "2019",
                    "vehicle_type_name": "Transit",
                    "custom_fields": {"ac_units": "2"},
                    "vin": "1HGCM82633A004352",
                    "make": "Ford"
                })),
            )
            .unwrap();

        assert!(!vehicle.exists);
        assert_eq!(vehicle.fleetio_id, 42);
        assert_eq!(vehicle.nycsbus_id, Some("BUS0042".to_string()));
        assert_eq!(vehicle.year, Some(2019));
        assert_eq!(
            vehicle.bus_type_id,
            reference::find_id_by_name(&conn, ReferenceKind::BusType, "Transit").unwrap()
        );
        assert_eq!(
            vehicle.ac_unit_id,
            reference::find_id_by_name(&conn, ReferenceKind::AcUnit, "2").unwrap()
        );

        let specs = VehicleSpecs::find_by_vehicle_id(&conn, vehicle.id.unwrap())
            .unwrap()
            .unwrap();
        assert_eq!(specs.vin, Some("1HGCM82633A004352".to_string()));
        assert_eq!(
            specs.make_id,
            reference::find_id_by_name(&conn, ReferenceKind::Make, "Ford").unwrap()
        );
        assert_eq!(specs.model_id, None);

        println!("✅ End-to-end example PASSED");
    }
}
