//! # Seed Data Generator
//!
//! Provisions a demo company with quote/invoice counters and a few clients.
//!
//! ## Usage
//! ```bash
//! # Default database ./folio_dev.db, company "demo"
//! cargo run -p folio-db --bin seed
//!
//! # Custom database and plan
//! cargo run -p folio-db --bin seed -- --db ./data/folio.db --plan pro
//! ```
//!
//! Counters start at Q-0001 and INV-{YYYY}-00001.

use anyhow::{bail, Context};
use chrono::Utc;
use folio_core::{Client, Company, DocumentKind, PlanTier, SequenceCounter};
use folio_db::{Database, DbConfig};
use std::env;
use tracing::info;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

const DEMO_COMPANY_ID: &str = "demo";

const CLIENTS: &[(&str, Option<&str>)] = &[
    ("Harbourside Cafe", Some("accounts@harbourside.example")),
    ("Northgate Builders", Some("admin@northgate.example")),
    ("Marlow & Daughters", Some("hello@marlow.example")),
    ("Walk-in Customer", None),
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,folio=debug,sqlx=warn"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args: Vec<String> = env::args().collect();

    let mut db_path = String::from("./folio_dev.db");
    let mut plan = PlanTier::Free;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--plan" | "-p" => {
                if i + 1 < args.len() {
                    plan = parse_plan(&args[i + 1])?;
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Folio Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>      Database file path (default: ./folio_dev.db)");
                println!("  -p, --plan <PLAN>    free | starter | pro (default: free)");
                println!("  -h, --help           Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    let db = Database::new(DbConfig::new(&db_path))
        .await
        .with_context(|| format!("opening {db_path}"))?;

    if db.companies().get(DEMO_COMPANY_ID).await.is_ok() {
        info!(company_id = DEMO_COMPANY_ID, "Demo company already present, skipping seed");
        return Ok(());
    }

    let now = Utc::now();
    let company = Company {
        id: DEMO_COMPANY_ID.to_string(),
        name: "Demo Trading Co".to_string(),
        plan,
        currency: "AUD".to_string(),
        merchant_account_id: None,
        created_at: now,
    };
    let counters = [
        SequenceCounter::starting_at(DEMO_COMPANY_ID, DocumentKind::Quote, "Q-", "", 4, 1),
        SequenceCounter::starting_at(DEMO_COMPANY_ID, DocumentKind::Invoice, "INV-{YYYY}-", "", 5, 1),
    ];

    db.companies()
        .provision(&company, &counters)
        .await
        .context("provisioning demo company")?;

    for (name, email) in CLIENTS {
        let client = Client {
            id: Uuid::new_v4().to_string(),
            company_id: DEMO_COMPANY_ID.to_string(),
            name: name.to_string(),
            email: email.map(str::to_string),
            created_at: now,
        };
        db.clients().insert(&client).await?;
        info!(client_id = %client.id, name = %client.name, "Client created");
    }

    info!(
        path = %db_path,
        company_id = DEMO_COMPANY_ID,
        plan = %plan,
        clients = CLIENTS.len(),
        "Seed complete"
    );
    db.close().await;
    Ok(())
}

fn parse_plan(s: &str) -> anyhow::Result<PlanTier> {
    match s.to_ascii_lowercase().as_str() {
        "free" => Ok(PlanTier::Free),
        "starter" => Ok(PlanTier::Starter),
        "pro" => Ok(PlanTier::Pro),
        other => bail!("unknown plan '{other}', expected free | starter | pro"),
    }
}
