use anyhow::Context;
use dynamic_tables::domain::inspect::MetadataInspector;
use dynamic_tables::domain::schema::{SchemaRegistry, REGISTRY_TABLE};
use dynamic_tables::infra::config;
use dynamic_tables::storage::{PgStore, StoreClient};
use std::sync::Arc;

fn usage_and_exit() -> ! {
    eprintln!(
        "Usage: cargo run --bin preflight -- [--init-registry-if-missing]\n\
         \n\
         Requires env vars:\n\
           DATABASE_URL\n\
         Optional:\n\
           DB_SCHEMA (default public), DB_MAX_CONNECTIONS, BIND_ADDR, MAX_UPLOAD_BYTES\n"
    );
    std::process::exit(2);
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.iter().any(|a| a == "-h" || a == "--help") {
        usage_and_exit();
    }
    let init_registry_if_missing = args.iter().any(|a| a == "--init-registry-if-missing");

    // Force-read config (nice error messages if missing)
    let database_url = config::database_url()?;
    let schema = config::db_schema();
    let max_connections = config::max_connections()?;
    let bind_addr = config::bind_addr();
    let max_upload_bytes = config::max_upload_bytes()?;

    println!("> Preflight:");
    println!("  DB_SCHEMA={}", schema);
    println!("  DB_MAX_CONNECTIONS={}", max_connections);
    println!("  BIND_ADDR={}", bind_addr);
    println!("  MAX_UPLOAD_BYTES={}", max_upload_bytes);

    // Basic connectivity
    let store = PgStore::connect(&database_url, max_connections, &schema)
        .await
        .context("Failed to connect to DATABASE_URL")?;
    store.ping().await.context("Database ping failed")?;
    println!("  Database reachable.");

    let store: Arc<dyn StoreClient> = Arc::new(store);

    // Catalog visibility
    let inspector = MetadataInspector::new(store.clone());
    let tables = inspector
        .list_tables()
        .await
        .context("Failed to read information_schema")?;
    println!("  {} user table(s) visible in schema '{}'.", tables.len(), schema);
    for t in &tables {
        println!("    - {}", t);
    }

    // Registry table
    let registry = SchemaRegistry::new(store.clone());
    if store.catalog_has_table(REGISTRY_TABLE).await? {
        let entries = registry.list().await?;
        println!("  Registry table {} exists ({} schema(s)).", REGISTRY_TABLE, entries.len());
        for e in &entries {
            if !tables.contains(&e.table_name) {
                eprintln!(
                    "  Warning: '{}' is registered but has no physical table.",
                    e.table_name
                );
            }
        }
    } else if init_registry_if_missing {
        println!("  Registry table missing -> creating {}...", REGISTRY_TABLE);
        registry.ensure_storage().await?;
        println!("  Registry table created.");
    } else {
        return Err(anyhow::anyhow!(
            "Registry table {} does not exist. Re-run with --init-registry-if-missing (or start api_server once)",
            REGISTRY_TABLE
        ));
    }

    println!("> Preflight OK.");
    Ok(())
}
