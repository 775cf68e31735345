//! # Approval Token Service
//!
//! Signed, time-limited public links that let a client view a document and
//! accept or reject a quote without logging in.
//!
//! ## Validation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  presented token                                                        │
//! │       │                                                                 │
//! │       ├── 1. HS256 signature ok?                  no → TokenInvalid     │
//! │       ├── 2. claims.token_type == expected?       no → AccessDenied     │
//! │       ├── 3. claims.exp > now?                    no → TokenInvalid     │
//! │       │                                                                 │
//! │       │   key = (claims.client_id, claims.company_id, claims.token_type)│
//! │       │                                                                 │
//! │       ├── 4. stored row for key exists?           no → TokenInvalid     │
//! │       ├── 5. row.token == presented?              no → TokenInvalid     │
//! │       ├── 6. row.expires_at > now?                no → TokenInvalid     │
//! │       └── 7. row.document_id == claims.sub?       no → AccessDenied     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Deleting the row revokes the link immediately even though its signature
//! stays valid until `exp`. Issuing a new token for the same key overwrites
//! the row, so the previous link stops working.

use chrono::{DateTime, Duration, Utc};
use folio_core::status::QuoteStatus;
use folio_core::validation::validate_client_note;
use folio_core::{Actor, ApprovalToken, Document, DocumentStatus, TokenType};
use folio_db::{Database, DocumentRepository, TokenRepository};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, TokenData, Validation};
use serde::{Deserialize, Serialize};
use sqlx::SqliteConnection;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::clock::Clock;
use crate::config::TokenSettings;
use crate::documents::{is_current_in, transition_in};
use crate::error::{EngineError, EngineResult};

/// JWT claims embedded in an approval link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalClaims {
    /// Subject (document id)
    pub sub: String,

    pub company_id: String,

    pub client_id: String,

    pub token_type: TokenType,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration (Unix timestamp)
    pub exp: i64,

    /// JWT ID, so two links issued in the same second still differ
    pub jti: String,
}

impl ApprovalClaims {
    pub fn document_id(&self) -> &str {
        &self.sub
    }
}

// =============================================================================
// Signer
// =============================================================================

/// HS256 signing and verification. Expiry is checked by the service against
/// its clock, not by the JWT library.
#[derive(Clone)]
struct TokenSigner {
    secret: String,
}

impl TokenSigner {
    fn sign(&self, claims: &ApprovalClaims) -> EngineResult<String> {
        encode(
            &Header::default(),
            claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| EngineError::Config(format!("Failed to sign approval token: {}", e)))
    }

    fn verify(&self, token: &str) -> EngineResult<ApprovalClaims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;

        let token_data: TokenData<ApprovalClaims> = decode(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &validation,
        )
        .map_err(|e| {
            debug!(error = %e, "Approval token failed verification");
            EngineError::TokenInvalid
        })?;

        Ok(token_data.claims)
    }
}

// =============================================================================
// Service
// =============================================================================

#[derive(Clone)]
pub struct ApprovalTokenService {
    db: Database,
    signer: TokenSigner,
    quote_ttl: Duration,
    invoice_ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl ApprovalTokenService {
    pub fn new(db: Database, settings: &TokenSettings, clock: Arc<dyn Clock>) -> Self {
        ApprovalTokenService {
            db,
            signer: TokenSigner {
                secret: settings.signing_secret.clone(),
            },
            quote_ttl: Duration::hours(settings.quote_ttl_hours as i64),
            invoice_ttl: Duration::hours(settings.invoice_ttl_hours as i64),
            clock,
        }
    }

    /// Configured lifetime for a token type.
    pub fn ttl_for(&self, token_type: TokenType) -> Duration {
        match token_type {
            TokenType::QuoteToken => self.quote_ttl,
            TokenType::InvoiceToken => self.invoice_ttl,
        }
    }

    // =========================================================================
    // Issue / invalidate
    // =========================================================================

    /// Issues a token for `document_id`, superseding any live token for the
    /// same (client, company, type).
    pub async fn issue(
        &self,
        client_id: &str,
        company_id: &str,
        token_type: TokenType,
        document_id: &str,
        ttl: Duration,
    ) -> EngineResult<ApprovalToken> {
        let mut tx = self.db.begin_write().await?;
        let token = self
            .issue_in(&mut tx, client_id, company_id, token_type, document_id, ttl, self.clock.now())
            .await?;
        tx.commit().await?;
        Ok(token)
    }

    /// Issues inside the caller's transaction, so the token commits together
    /// with the status change that prompted it.
    #[allow(clippy::too_many_arguments)]
    pub async fn issue_in(
        &self,
        conn: &mut SqliteConnection,
        client_id: &str,
        company_id: &str,
        token_type: TokenType,
        document_id: &str,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> EngineResult<ApprovalToken> {
        let exp = now + ttl;
        let claims = ApprovalClaims {
            sub: document_id.to_string(),
            company_id: company_id.to_string(),
            client_id: client_id.to_string(),
            token_type,
            iat: now.timestamp(),
            exp: exp.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        let token = ApprovalToken {
            client_id: client_id.to_string(),
            company_id: company_id.to_string(),
            token_type,
            document_id: document_id.to_string(),
            token: self.signer.sign(&claims)?,
            expires_at: claims.exp,
        };
        TokenRepository::upsert(conn, &token).await?;

        info!(
            document_id = %document_id,
            client_id = %client_id,
            token_type = %token_type,
            expires_at = claims.exp,
            "Approval token issued"
        );
        Ok(token)
    }

    /// Deletes the live token for a key. Returns whether one existed.
    pub async fn invalidate(&self, client_id: &str, company_id: &str, token_type: TokenType) -> EngineResult<bool> {
        let mut conn = self.db.pool().acquire().await?;
        let deleted = TokenRepository::delete(&mut conn, client_id, company_id, token_type).await?;
        if deleted {
            info!(client_id = %client_id, company_id = %company_id, token_type = %token_type, "Approval token invalidated");
        }
        Ok(deleted)
    }

    /// Removes expired rows. Returns the number deleted.
    pub async fn prune_expired(&self) -> EngineResult<u64> {
        let removed = self.db.tokens().delete_expired(self.clock.now().timestamp()).await?;
        if removed > 0 {
            info!(removed, "Pruned expired approval tokens");
        }
        Ok(removed)
    }

    // =========================================================================
    // Validation
    // =========================================================================

    pub async fn validate(&self, token: &str, expected: TokenType) -> EngineResult<ApprovalClaims> {
        let mut conn = self.db.pool().acquire().await?;
        self.validate_in(&mut conn, token, expected, self.clock.now()).await
    }

    pub async fn validate_in(
        &self,
        conn: &mut SqliteConnection,
        token: &str,
        expected: TokenType,
        now: DateTime<Utc>,
    ) -> EngineResult<ApprovalClaims> {
        let claims = self.signer.verify(token)?;
        let now = now.timestamp();

        if claims.token_type != expected {
            return Err(EngineError::AccessDenied);
        }
        if claims.exp <= now {
            return Err(EngineError::TokenInvalid);
        }

        let stored = TokenRepository::find_in(conn, &claims.client_id, &claims.company_id, claims.token_type)
            .await?
            .ok_or(EngineError::TokenInvalid)?;

        if stored.token != token || stored.expires_at <= now {
            debug!(document_id = %claims.sub, "Approval token superseded or expired");
            return Err(EngineError::TokenInvalid);
        }
        if stored.document_id != claims.sub {
            return Err(EngineError::AccessDenied);
        }

        Ok(claims)
    }

    /// Validates and loads the document the token grants access to.
    async fn resolve_in(
        &self,
        conn: &mut SqliteConnection,
        token: &str,
        expected: TokenType,
        now: DateTime<Utc>,
    ) -> EngineResult<(ApprovalClaims, Document)> {
        let claims = self.validate_in(conn, token, expected, now).await?;

        let document = DocumentRepository::find_in(conn, &claims.sub)
            .await?
            .ok_or(EngineError::TokenInvalid)?;

        if document.company_id != claims.company_id
            || document.client_id != claims.client_id
            || document.kind != expected.document_kind()
        {
            return Err(EngineError::AccessDenied);
        }
        if !is_current_in(conn, &document).await? {
            debug!(document_id = %document.id, "Approval link points at a superseded revision");
            return Err(EngineError::TokenInvalid);
        }

        Ok((claims, document))
    }

    // =========================================================================
    // Public flow
    // =========================================================================

    /// The document behind a public link.
    pub async fn view(&self, token: &str, token_type: TokenType) -> EngineResult<Document> {
        let mut conn = self.db.pool().acquire().await?;
        let (_, document) = self.resolve_in(&mut conn, token, token_type, self.clock.now()).await?;
        Ok(document)
    }

    /// Accepts a quote through its public link. The token is revoked in the
    /// same transaction.
    pub async fn approve_quote(&self, token: &str) -> EngineResult<Document> {
        self.decide_quote(token, QuoteStatus::Accepted, None).await
    }

    /// Rejects a quote through its public link, storing the client's note.
    pub async fn reject_quote(&self, token: &str, note: Option<&str>) -> EngineResult<Document> {
        if let Some(note) = note {
            validate_client_note(note)?;
        }
        self.decide_quote(token, QuoteStatus::Rejected, note).await
    }

    async fn decide_quote(&self, token: &str, decision: QuoteStatus, note: Option<&str>) -> EngineResult<Document> {
        let now = self.clock.now();
        let mut tx = self.db.begin_write().await?;

        let (claims, document) = self.resolve_in(&mut tx, token, TokenType::QuoteToken, now).await?;
        let actor = Actor::PublicClient {
            client_id: claims.client_id.clone(),
        };
        let decided = transition_in(&mut tx, &document, DocumentStatus::Quote(decision), &actor, note, now).await?;

        tx.commit().await?;

        info!(
            document_id = %decided.id,
            number = %decided.display_number(),
            status = %decided.status,
            "Quote decided via public link"
        );
        Ok(decided)
    }
}
