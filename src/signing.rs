//! Signed handoff-confirmation tokens.
//!
//! A confirmation token is an opaque random value bound to one transfer. The
//! signed URL embeds the token, its expiry and an HMAC-SHA256 signature over
//! the compact payload `"{id}:{token}:{ts}"`, so a scanning device can carry
//! the full credential offline: no session store is consulted at
//! verification time, only the confirming actor must be authenticated and
//! tenant-matched.
//!
//! Wire format of the signed URL (bit-exact for scanning clients):
//! `{base}?token={token}&sig={hex}&ts={unix_expiry}&id={transfer_id}`.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use rand::RngCore;
use serde::Serialize;
use sha2::Sha256;

use crate::core_types::{ActorRef, ItemId, LocationSnapshot, Priority, TransferId};
use crate::error::{CoreError, CoreResult};
use crate::inventory::item::{ItemCategory, ItemState};
use crate::store::Store;
use crate::transfer::state::TransferState;

type HmacSha256 = Hmac<Sha256>;

/// A freshly minted confirmation credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedToken {
    pub token: String,
    pub signature: String,
    /// Unix seconds after which verification fails.
    pub expires_at: i64,
    pub url: String,
}

/// Read-only projection returned when a token is resolved, shaped for
/// confirmation screens.
#[derive(Debug, Clone, Serialize)]
pub struct TransferTicket {
    pub transfer_id: TransferId,
    pub order_number: String,
    pub state: TransferState,
    pub priority: Priority,
    pub origin: LocationSnapshot,
    pub destination: LocationSnapshot,
    pub requested_by: ActorRef,
    pub approved_by: Option<ActorRef>,
    pub reason: String,
    pub items: Vec<TicketLine>,
    pub can_confirm_departure: bool,
    pub can_confirm_receipt: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct TicketLine {
    pub item_id: ItemId,
    pub sku: String,
    pub name: String,
    pub category: ItemCategory,
    pub state: ItemState,
    pub quantity: u32,
    pub note: String,
}

/// Token minting, HMAC signing, constant-time verification, resolution.
pub struct SigningService {
    secret: Vec<u8>,
    base_url: String,
    ttl: Duration,
    store: Arc<dyn Store>,
}

impl SigningService {
    pub fn new(
        secret: impl Into<Vec<u8>>,
        base_url: impl Into<String>,
        ttl: Duration,
        store: Arc<dyn Store>,
    ) -> Self {
        Self {
            secret: secret.into(),
            base_url: base_url.into(),
            ttl,
            store,
        }
    }

    /// Mint an opaque 128-bit random token, hex encoded.
    pub fn mint_token(&self) -> String {
        let mut bytes = [0u8; 16];
        rand::rngs::OsRng.fill_bytes(&mut bytes);
        hex::encode(bytes)
    }

    /// HMAC-SHA256 over `"{id}:{token}:{ts}"`, lowercase hex.
    pub fn sign(&self, transfer_id: TransferId, token: &str, expires_at: i64) -> String {
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .expect("HMAC accepts keys of any length");
        mac.update(payload(transfer_id, token, expires_at).as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    pub fn build_signed_url(
        &self,
        transfer_id: TransferId,
        token: &str,
        expires_at: i64,
        signature: &str,
    ) -> String {
        format!(
            "{}?token={}&sig={}&ts={}&id={}",
            self.base_url, token, signature, expires_at, transfer_id
        )
    }

    /// Mint a token, sign it, and build the confirmation URL. Pure
    /// computation: the caller persists the token atomically with the
    /// transfer-row update.
    pub fn issue(&self, transfer_id: TransferId) -> SignedToken {
        let token = self.mint_token();
        let expires_at = (Utc::now() + self.ttl).timestamp();
        let signature = self.sign(transfer_id, &token, expires_at);
        let url = self.build_signed_url(transfer_id, &token, expires_at, &signature);
        SignedToken {
            token,
            signature,
            expires_at,
            url,
        }
    }

    /// Verify a presented credential. Idempotent and free of side effects:
    /// re-verifying an expired token simply re-fails.
    pub fn verify(
        &self,
        token: &str,
        signature: &str,
        expires_at: i64,
        transfer_id: TransferId,
    ) -> CoreResult<()> {
        self.verify_at(Utc::now(), token, signature, expires_at, transfer_id)
    }

    fn verify_at(
        &self,
        now: DateTime<Utc>,
        token: &str,
        signature: &str,
        expires_at: i64,
        transfer_id: TransferId,
    ) -> CoreResult<()> {
        if now.timestamp() > expires_at {
            return Err(CoreError::TokenExpired);
        }

        let presented = hex::decode(signature).map_err(|_| CoreError::InvalidSignature)?;
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .expect("HMAC accepts keys of any length");
        mac.update(payload(transfer_id, token, expires_at).as_bytes());
        // verify_slice is a constant-time comparison
        mac.verify_slice(&presented)
            .map_err(|_| CoreError::InvalidSignature)
    }

    /// Look the transfer up by its stored token and project it for a
    /// confirmation screen.
    pub async fn resolve(&self, token: &str) -> CoreResult<TransferTicket> {
        let transfer = self
            .store
            .fetch_transfer_by_token(token)
            .await?
            .ok_or(CoreError::NotFound("transfer"))?;

        let origin_unit = self
            .store
            .fetch_unit(transfer.origin_unit)
            .await?
            .ok_or(CoreError::NotFound("unit"))?;
        let origin_sub = self
            .store
            .fetch_sub_location(transfer.origin_sub_location)
            .await?
            .ok_or(CoreError::NotFound("sub-location"))?;
        let destination_unit = self
            .store
            .fetch_unit(transfer.destination_unit)
            .await?
            .ok_or(CoreError::NotFound("unit"))?;
        let destination_sub = self
            .store
            .fetch_sub_location(transfer.destination_sub_location)
            .await?
            .ok_or(CoreError::NotFound("sub-location"))?;

        let mut items = Vec::new();
        for line in self.store.transfer_lines(transfer.id).await? {
            let item = self
                .store
                .fetch_item(line.item_id)
                .await?
                .ok_or(CoreError::NotFound("item"))?;
            items.push(TicketLine {
                item_id: item.id,
                sku: item.sku,
                name: item.name,
                category: item.category,
                state: item.state,
                quantity: line.quantity,
                note: line.note,
            });
        }

        Ok(TransferTicket {
            transfer_id: transfer.id,
            order_number: transfer.order_number.clone(),
            state: transfer.state,
            priority: transfer.priority,
            origin: LocationSnapshot::of(&origin_unit, Some(&origin_sub)),
            destination: LocationSnapshot::of(&destination_unit, Some(&destination_sub)),
            requested_by: transfer.requested_by.clone(),
            approved_by: transfer.approved_by.clone(),
            reason: transfer.reason.clone(),
            items,
            can_confirm_departure: transfer.state.can_confirm_departure(),
            can_confirm_receipt: transfer.state.can_confirm_receipt(),
        })
    }
}

fn payload(transfer_id: TransferId, token: &str, expires_at: i64) -> String {
    format!("{}:{}:{}", transfer_id, token, expires_at)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use uuid::Uuid;

    fn service() -> SigningService {
        SigningService::new(
            b"test-secret".to_vec(),
            "https://confirm.example/qr/validate",
            Duration::hours(24),
            Arc::new(MemoryStore::new()),
        )
    }

    #[test]
    fn test_token_entropy_and_shape() {
        let svc = service();
        let a = svc.mint_token();
        let b = svc.mint_token();
        assert_eq!(a.len(), 32); // 16 bytes hex-encoded
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[test]
    fn test_round_trip_succeeds_until_expiry() {
        let svc = service();
        let id = Uuid::new_v4();
        let token = svc.mint_token();
        let expiry = Utc::now().timestamp() + 3600;
        let sig = svc.sign(id, &token, expiry);

        assert!(svc.verify(&token, &sig, expiry, id).is_ok());
        // verification is idempotent: no consumption state
        assert!(svc.verify(&token, &sig, expiry, id).is_ok());
    }

    #[test]
    fn test_expired_token_fails_before_signature_check() {
        let svc = service();
        let id = Uuid::new_v4();
        let token = svc.mint_token();
        let expiry = Utc::now().timestamp() - 1;
        let sig = svc.sign(id, &token, expiry);

        assert!(matches!(
            svc.verify(&token, &sig, expiry, id),
            Err(CoreError::TokenExpired)
        ));
        // re-verifying re-fails identically
        assert!(matches!(
            svc.verify(&token, &sig, expiry, id),
            Err(CoreError::TokenExpired)
        ));
    }

    #[test]
    fn test_tampering_any_field_invalidates_signature() {
        let svc = service();
        let id = Uuid::new_v4();
        let token = svc.mint_token();
        let expiry = Utc::now().timestamp() + 3600;
        let sig = svc.sign(id, &token, expiry);

        let other_token = svc.mint_token();
        assert!(matches!(
            svc.verify(&other_token, &sig, expiry, id),
            Err(CoreError::InvalidSignature)
        ));
        assert!(matches!(
            svc.verify(&token, &sig, expiry + 1, id),
            Err(CoreError::InvalidSignature)
        ));
        assert!(matches!(
            svc.verify(&token, &sig, expiry, Uuid::new_v4()),
            Err(CoreError::InvalidSignature)
        ));
        assert!(matches!(
            svc.verify(&token, "not-hex!", expiry, id),
            Err(CoreError::InvalidSignature)
        ));
    }

    #[test]
    fn test_signature_is_lowercase_hex_over_colon_payload() {
        let svc = service();
        let id = Uuid::new_v4();
        let sig = svc.sign(id, "abc123", 1_700_000_000);

        assert_eq!(sig.len(), 64); // SHA-256 output, hex encoded
        assert!(sig.chars().all(|c| c.is_ascii_hexdigit() && !c.is_uppercase()));

        // deterministic for identical payload
        assert_eq!(sig, svc.sign(id, "abc123", 1_700_000_000));
        assert_ne!(sig, svc.sign(id, "abc124", 1_700_000_000));
    }

    #[test]
    fn test_signed_url_wire_format() {
        let svc = service();
        let id = Uuid::new_v4();
        let url = svc.build_signed_url(id, "tok", 1_700_000_000, "deadbeef");
        assert_eq!(
            url,
            format!(
                "https://confirm.example/qr/validate?token=tok&sig=deadbeef&ts=1700000000&id={}",
                id
            )
        );
    }

    #[test]
    fn test_issue_produces_verifiable_credential() {
        let svc = service();
        let id = Uuid::new_v4();
        let minted = svc.issue(id);

        assert!(minted.expires_at > Utc::now().timestamp());
        assert!(
            svc.verify(&minted.token, &minted.signature, minted.expires_at, id)
                .is_ok()
        );
        assert!(minted.url.contains(&minted.token));
        assert!(minted.url.contains(&minted.signature));
    }
}
