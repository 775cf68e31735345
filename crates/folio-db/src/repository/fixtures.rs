//! Shared test setup: an in-memory database with one provisioned company.

use chrono::Utc;
use folio_core::{Client, Company, DocumentKind, PlanTier, SequenceCounter};

use crate::pool::{Database, DbConfig};

pub const COMPANY_ID: &str = "co-1";
pub const CLIENT_ID: &str = "client-1";

pub fn company(id: &str, plan: PlanTier) -> Company {
    Company {
        id: id.to_string(),
        name: "Acme Plumbing".to_string(),
        plan,
        currency: "AUD".to_string(),
        merchant_account_id: None,
        created_at: Utc::now(),
    }
}

pub fn counters(company_id: &str) -> Vec<SequenceCounter> {
    vec![
        SequenceCounter::starting_at(company_id, DocumentKind::Quote, "Q-", "", 4, 1),
        SequenceCounter::starting_at(company_id, DocumentKind::Invoice, "INV-", "", 4, 1),
    ]
}

pub fn client(id: &str, company_id: &str) -> Client {
    Client {
        id: id.to_string(),
        company_id: company_id.to_string(),
        name: "Jane Citizen".to_string(),
        email: Some("jane@example.com".to_string()),
        created_at: Utc::now(),
    }
}

/// In-memory database with `co-1` (free plan, both counters) and `client-1`.
pub async fn setup() -> Database {
    let db = Database::new(DbConfig::in_memory()).await.unwrap();
    db.companies()
        .provision(&company(COMPANY_ID, PlanTier::Free), &counters(COMPANY_ID))
        .await
        .unwrap();
    db.clients().insert(&client(CLIENT_ID, COMPANY_ID)).await.unwrap();
    db
}
