use anyhow::{bail, Result};
use rusqlite::Connection;
use std::env;
use std::path::Path;

use fleetio_sync::{
    count_vehicle_specs, count_vehicles, load_vehicle_documents, setup_database, ReconcileEngine,
};

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();

    match args.get(1).map(String::as_str) {
        Some("import") => {
            let input = match args.get(2) {
                Some(input) => Path::new(input),
                None => bail!("Usage: fleetio-sync import <vehicles.json> [db-path]"),
            };
            let db_path = args.get(3).map(String::as_str).unwrap_or("fleet.db");
            run_import(input, Path::new(db_path))
        }
        _ => {
            eprintln!("Usage: fleetio-sync import <vehicles.json> [db-path]");
            std::process::exit(1);
        }
    }
}

fn run_import(input: &Path, db_path: &Path) -> Result<()> {
    println!("🚌 Fleetio Sync - vehicle import");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    // 1. Load vehicle documents
    println!("\n📂 Loading {}...", input.display());
    let documents = load_vehicle_documents(input)?;
    println!("✓ Loaded {} vehicle documents", documents.len());

    // 2. Setup database
    println!("\n🔧 Setting up database...");
    let conn = Connection::open(db_path)?;
    setup_database(&conn)?;
    println!("✓ Database initialized with WAL mode");

    // 3. Reconcile each document
    println!("\n💾 Reconciling vehicles...");
    let engine = ReconcileEngine::new();
    let mut created = 0;
    let mut existing = 0;
    let mut failed = 0;

    for document in &documents {
        match engine.reconcile(&conn, document) {
            Ok(vehicle) if vehicle.exists => existing += 1,
            Ok(_) => created += 1,
            Err(err) => {
                failed += 1;
                eprintln!("✗ Vehicle {}: {:#}", document.fleetio_id(), err);
            }
        }
    }

    println!("✓ Created: {} vehicles", created);
    println!("✓ Already present: {}", existing);
    if failed > 0 {
        println!("✗ Failed: {}", failed);
    }

    // 4. Verify counts
    println!("\n🔍 Verifying database...");
    let vehicles = count_vehicles(&conn)?;
    let specs = count_vehicle_specs(&conn)?;
    println!("✓ Database contains {} vehicles, {} specs rows", vehicles, specs);

    println!("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("✅ Import complete");

    Ok(())
}
