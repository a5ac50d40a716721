// Entity Models - the vehicle schema relations
//
// Each entity maps one table:
// - Vehicle: primary record, one row per Fleetio id
// - VehicleSpecs: 1:1 extension row keyed by vehicle id
// - ReferenceKind: the ten (id, name) lookup tables behind the foreign keys

pub mod reference;
pub mod vehicle;
pub mod vehicle_specs;

pub use reference::{find_id_by_name, find_or_create_id_by_name, name_by_id, ReferenceKind};
pub use vehicle::Vehicle;
pub use vehicle_specs::VehicleSpecs;
