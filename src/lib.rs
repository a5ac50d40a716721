// Fleetio Sync - Core Library
// Reconciles Fleetio vehicle documents into the nycsbus SQLite store.

pub mod coerce;
pub mod db;
pub mod document;
pub mod entities;
pub mod reconcile;

// Re-export commonly used types
pub use coerce::{coerce_int, coerce_text};
pub use db::{
    count_vehicle_specs, count_vehicles, get_events_for_entity, insert_event,
    load_vehicle_documents, setup_database, SyncEvent,
};
pub use document::VehicleDocument;
pub use entities::{
    find_id_by_name, find_or_create_id_by_name, name_by_id, ReferenceKind, Vehicle, VehicleSpecs,
};
pub use reconcile::{ReconcileEngine, IMPORT_ACTOR};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
