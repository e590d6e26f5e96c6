//! Transfer workflow orchestration.
//!
//! The coordinator drives every transition of the closed workflow table,
//! re-checking the expected state inside the atomic commit (CAS) so two
//! concurrent transitions on the same transfer serialize instead of
//! clobbering each other. Item mutations and their life-record events ride
//! in the same commit as the transfer-row update.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;

use crate::core_types::{Actor, ItemId, Priority, SubLocationId, TransferId, UnitId};
use crate::error::{CoreError, CoreResult};
use crate::history::event::{HistoryEvent, HistoryEventKind};
use crate::inventory::guard::{self, ItemGuard};
use crate::inventory::item::{Item, ItemState};
use crate::notify::{self, Notifier, NotifyEvent, Recipient};
use crate::signing::SigningService;
use crate::store::{CommitBatch, Store};
use crate::transfer::model::{
    self, SignatureRecord, Transfer, TransferItemLine,
};
use crate::transfer::state::TransferState;

/// One requested item line.
#[derive(Debug, Clone)]
pub struct RequestedLine {
    pub item_id: ItemId,
    pub quantity: u32,
    pub note: String,
}

/// Input for a new transfer request.
#[derive(Debug, Clone)]
pub struct TransferRequest {
    pub origin_unit: UnitId,
    pub origin_sub_location: SubLocationId,
    pub destination_unit: UnitId,
    pub destination_sub_location: SubLocationId,
    pub lines: Vec<RequestedLine>,
    pub reason: String,
    pub priority: Priority,
}

/// Confirmation actions presented by scanning clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmAction {
    Departure,
    Receipt,
}

impl ConfirmAction {
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "confirm_departure" => Some(ConfirmAction::Departure),
            "confirm_receipt" => Some(ConfirmAction::Receipt),
            _ => None,
        }
    }
}

pub struct TransferCoordinator {
    store: Arc<dyn Store>,
    guard: ItemGuard,
    signer: Arc<SigningService>,
    notifier: Arc<dyn Notifier>,
    order_prefix: String,
}

impl TransferCoordinator {
    pub fn new(
        store: Arc<dyn Store>,
        signer: Arc<SigningService>,
        notifier: Arc<dyn Notifier>,
        order_prefix: impl Into<String>,
    ) -> Self {
        let guard = ItemGuard::new(store.clone());
        Self {
            store,
            guard,
            signer,
            notifier,
            order_prefix: order_prefix.into(),
        }
    }

    /// `request`: creates a new transfer in Requested.
    ///
    /// Guards: origin ≠ destination; requester belongs to the origin unit;
    /// every line item belongs to the origin unit and is transferable.
    /// Item states are left untouched until approval.
    pub async fn request(&self, req: TransferRequest, requester: &Actor) -> CoreResult<Transfer> {
        if req.origin_unit == req.destination_unit {
            return Err(CoreError::Validation(
                "origin and destination unit must differ".into(),
            ));
        }
        if req.lines.is_empty() {
            return Err(CoreError::Validation(
                "transfer must contain at least one item".into(),
            ));
        }
        if req.reason.trim().is_empty() {
            return Err(CoreError::Validation("reason is required".into()));
        }
        if !requester.belongs_to(req.origin_unit) {
            return Err(CoreError::PermissionDenied(
                "requester must belong to the origin unit".into(),
            ));
        }

        self.store
            .fetch_unit(req.origin_unit)
            .await?
            .ok_or(CoreError::NotFound("unit"))?;
        self.store
            .fetch_unit(req.destination_unit)
            .await?
            .ok_or(CoreError::NotFound("unit"))?;
        let origin_sub = self
            .store
            .fetch_sub_location(req.origin_sub_location)
            .await?
            .ok_or(CoreError::NotFound("sub-location"))?;
        let destination_sub = self
            .store
            .fetch_sub_location(req.destination_sub_location)
            .await?
            .ok_or(CoreError::NotFound("sub-location"))?;
        if origin_sub.unit_id != req.origin_unit {
            return Err(CoreError::Validation(
                "origin sub-location does not belong to the origin unit".into(),
            ));
        }
        if destination_sub.unit_id != req.destination_unit {
            return Err(CoreError::Validation(
                "destination sub-location does not belong to the destination unit".into(),
            ));
        }

        let mut seen: HashSet<ItemId> = HashSet::new();
        let mut items: Vec<Item> = Vec::with_capacity(req.lines.len());
        for line in &req.lines {
            if line.quantity == 0 {
                return Err(CoreError::Validation(
                    "line quantity must be at least 1".into(),
                ));
            }
            if !seen.insert(line.item_id) {
                return Err(CoreError::Validation(
                    "an item may appear on a transfer only once".into(),
                ));
            }
            let item = self
                .store
                .fetch_item(line.item_id)
                .await?
                .ok_or(CoreError::NotFound("item"))?;
            if item.unit_id != req.origin_unit {
                return Err(CoreError::Validation(format!(
                    "item {} does not belong to the origin unit",
                    item.sku
                )));
            }
            guard::assert_transferable(&item)?;
            items.push(item);
        }

        let now = Utc::now();
        let prefix = model::order_prefix(&self.order_prefix, now);
        let max_suffix = self.store.max_order_suffix(&prefix).await?;
        let order_number = model::next_order_number(&self.order_prefix, now, max_suffix);

        let transfer = Transfer::new(
            order_number.clone(),
            req.origin_unit,
            req.origin_sub_location,
            req.destination_unit,
            req.destination_sub_location,
            requester.into(),
            req.reason.clone(),
            req.priority,
        );

        let lines: Vec<TransferItemLine> = req
            .lines
            .iter()
            .map(|l| TransferItemLine {
                transfer_id: transfer.id,
                item_id: l.item_id,
                quantity: l.quantity,
                note: l.note.clone(),
            })
            .collect();

        // Note the request in each item's life record; states stay untouched
        // until approval.
        let mut batch = CommitBatch::new().create_transfer(transfer.clone(), lines);
        for item in items {
            let event = HistoryEvent::new(
                HistoryEventKind::ExternalTransfer {
                    order_number: order_number.clone(),
                },
                Some(requester),
            )
            .with_note(format!("transfer order {} requested", order_number));
            batch = batch.write_item(item, vec![event]);
        }
        self.store.commit(batch).await?;

        tracing::info!(
            order = %transfer.order_number,
            origin = %transfer.origin_unit,
            destination = %transfer.destination_unit,
            "transfer requested"
        );

        notify::dispatch(
            self.notifier.as_ref(),
            Recipient::CoordinatingAuthority,
            NotifyEvent::TransferRequested,
            serde_json::json!({
                "transfer_id": transfer.id,
                "order_number": transfer.order_number,
                "priority": transfer.priority,
            }),
        )
        .await;

        Ok(transfer)
    }

    /// `approve`: Requested → Approved.
    ///
    /// Mints the signed confirmation token; the token and the transfer-row
    /// update commit atomically. Every line item enters InTransit.
    pub async fn approve(
        &self,
        transfer_id: TransferId,
        approver: &Actor,
        note: &str,
    ) -> CoreResult<Transfer> {
        if !approver.is_coordinating_authority() {
            return Err(CoreError::PermissionDenied(
                "only the coordinating authority may approve transfers".into(),
            ));
        }

        let mut transfer = self.fetch(transfer_id).await?;
        if !transfer.state.can_review() {
            return Err(CoreError::TransferInvalidState);
        }

        let now = Utc::now();
        transfer.state = TransferState::Approved;
        transfer.approved_by = Some(approver.into());
        transfer.approved_at = Some(now);
        transfer.updated_at = now;
        if !note.trim().is_empty() {
            transfer.push_note(&format!("Approval: {}", note.trim()));
        }

        let minted = self.signer.issue(transfer.id);
        transfer.token = Some(minted.token);
        transfer.signed_url = Some(minted.url);

        let mut batch =
            CommitBatch::new().transition_transfer(transfer.clone(), TransferState::Requested);
        let reason = format!("transfer approved - order {}", transfer.order_number);
        for line in self.store.transfer_lines(transfer.id).await? {
            let mut item = self
                .store
                .fetch_item(line.item_id)
                .await?
                .ok_or(CoreError::NotFound("item"))?;
            // the guard condition re-checked since request time
            guard::assert_transferable(&item)?;
            let event = guard::state_change_event(&item, ItemState::InTransit, Some(approver), &reason);
            item.state = ItemState::InTransit;
            item.updated_at = now;
            batch = batch.write_item(item, vec![event]);
        }
        self.store.commit(batch).await?;

        tracing::info!(order = %transfer.order_number, "transfer approved");

        notify::dispatch(
            self.notifier.as_ref(),
            Recipient::Actor(transfer.requested_by.id),
            NotifyEvent::TransferApproved,
            serde_json::json!({
                "transfer_id": transfer.id,
                "order_number": transfer.order_number,
            }),
        )
        .await;

        Ok(transfer)
    }

    /// `reject`: Requested → Rejected. A rejection reason is required; item
    /// states stay untouched.
    pub async fn reject(
        &self,
        transfer_id: TransferId,
        approver: &Actor,
        reason: &str,
    ) -> CoreResult<Transfer> {
        if !approver.is_coordinating_authority() {
            return Err(CoreError::PermissionDenied(
                "only the coordinating authority may reject transfers".into(),
            ));
        }
        if reason.trim().is_empty() {
            return Err(CoreError::Validation("rejection reason is required".into()));
        }

        let mut transfer = self.fetch(transfer_id).await?;
        if !transfer.state.can_review() {
            return Err(CoreError::TransferInvalidState);
        }

        let now = Utc::now();
        transfer.state = TransferState::Rejected;
        transfer.approved_by = Some(approver.into());
        transfer.approved_at = Some(now);
        transfer.updated_at = now;
        transfer.push_note(&format!("Rejected: {}", reason.trim()));

        self.store
            .commit(
                CommitBatch::new()
                    .transition_transfer(transfer.clone(), TransferState::Requested),
            )
            .await?;

        tracing::info!(order = %transfer.order_number, "transfer rejected");

        notify::dispatch(
            self.notifier.as_ref(),
            Recipient::Actor(transfer.requested_by.id),
            NotifyEvent::TransferRejected,
            serde_json::json!({
                "transfer_id": transfer.id,
                "order_number": transfer.order_number,
                "reason": reason.trim(),
            }),
        )
        .await;

        Ok(transfer)
    }

    /// `confirm-departure`: Approved → InTransit.
    ///
    /// The presented credential must verify against the signing secret and
    /// match the transfer's stored token; the actor must belong to the
    /// origin unit.
    pub async fn confirm_departure(
        &self,
        token: &str,
        signature: &str,
        expires_at: i64,
        transfer_id: TransferId,
        actor: &Actor,
    ) -> CoreResult<Transfer> {
        self.signer.verify(token, signature, expires_at, transfer_id)?;

        let mut transfer = self.fetch(transfer_id).await?;
        if transfer.token.as_deref() != Some(token) {
            return Err(CoreError::InvalidSignature);
        }
        if !actor.belongs_to(transfer.origin_unit) {
            return Err(CoreError::PermissionDenied(
                "departure must be confirmed by the origin unit".into(),
            ));
        }
        if !transfer.state.can_confirm_departure() {
            return Err(CoreError::TransferInvalidState);
        }

        let now = Utc::now();
        transfer.state = TransferState::InTransit;
        transfer.transit_started_at = Some(now);
        transfer.origin_signature = Some(SignatureRecord::now(actor, "departure_confirmed"));
        transfer.updated_at = now;

        self.store
            .commit(
                CommitBatch::new()
                    .transition_transfer(transfer.clone(), TransferState::Approved),
            )
            .await?;

        tracing::info!(order = %transfer.order_number, "departure confirmed, transfer in transit");

        notify::dispatch(
            self.notifier.as_ref(),
            Recipient::Unit(transfer.destination_unit),
            NotifyEvent::TransferInTransit,
            serde_json::json!({
                "transfer_id": transfer.id,
                "order_number": transfer.order_number,
            }),
        )
        .await;

        Ok(transfer)
    }

    /// `confirm-receipt`: InTransit → Completed.
    ///
    /// Items move to the destination unit/sub-location, return to Available
    /// and get an ExternalTransfer life-record event carrying the order
    /// number. All of it lands in the same commit as the transfer-row update.
    pub async fn confirm_receipt(
        &self,
        token: &str,
        signature: &str,
        expires_at: i64,
        transfer_id: TransferId,
        actor: &Actor,
    ) -> CoreResult<Transfer> {
        self.signer.verify(token, signature, expires_at, transfer_id)?;

        let mut transfer = self.fetch(transfer_id).await?;
        if transfer.token.as_deref() != Some(token) {
            return Err(CoreError::InvalidSignature);
        }
        if !actor.belongs_to(transfer.destination_unit) {
            return Err(CoreError::PermissionDenied(
                "receipt must be confirmed by the destination unit".into(),
            ));
        }
        if !transfer.state.can_confirm_receipt() {
            return Err(CoreError::TransferInvalidState);
        }

        let now = Utc::now();
        transfer.state = TransferState::Completed;
        transfer.completed_at = Some(now);
        transfer.destination_signature = Some(SignatureRecord::now(actor, "receipt_confirmed"));
        transfer.updated_at = now;

        let origin_snapshot = self
            .guard
            .snapshot(transfer.origin_unit, Some(transfer.origin_sub_location))
            .await?;
        let destination_snapshot = self
            .guard
            .snapshot(
                transfer.destination_unit,
                Some(transfer.destination_sub_location),
            )
            .await?;

        let mut batch =
            CommitBatch::new().transition_transfer(transfer.clone(), TransferState::InTransit);
        let reason = format!("transfer completed - order {}", transfer.order_number);
        for line in self.store.transfer_lines(transfer.id).await? {
            let item = self
                .store
                .fetch_item(line.item_id)
                .await?
                .ok_or(CoreError::NotFound("item"))?;

            let arrival =
                guard::state_change_event(&item, ItemState::Available, Some(actor), &reason);
            let (mut moved, crossing) = guard::relocate(
                &item,
                transfer.destination_unit,
                transfer.destination_sub_location,
                origin_snapshot.clone(),
                destination_snapshot.clone(),
                HistoryEventKind::ExternalTransfer {
                    order_number: transfer.order_number.clone(),
                },
                Some(actor),
                &format!("order {} - {}", transfer.order_number, transfer.reason),
            );
            moved.state = ItemState::Available;
            batch = batch.write_item(moved, vec![arrival, crossing]);
        }
        self.store.commit(batch).await?;

        tracing::info!(order = %transfer.order_number, "transfer completed");

        let payload = serde_json::json!({
            "transfer_id": transfer.id,
            "order_number": transfer.order_number,
        });
        for recipient in [
            Recipient::Unit(transfer.origin_unit),
            Recipient::Unit(transfer.destination_unit),
            Recipient::CoordinatingAuthority,
        ] {
            notify::dispatch(
                self.notifier.as_ref(),
                recipient,
                NotifyEvent::TransferCompleted,
                payload.clone(),
            )
            .await;
        }

        Ok(transfer)
    }

    /// Dispatch a scanning client's confirmation by action name. Unknown
    /// actions are not part of the workflow.
    pub async fn confirm(
        &self,
        action: &str,
        token: &str,
        signature: &str,
        expires_at: i64,
        transfer_id: TransferId,
        actor: &Actor,
    ) -> CoreResult<Transfer> {
        match ConfirmAction::from_str(action) {
            Some(ConfirmAction::Departure) => {
                self.confirm_departure(token, signature, expires_at, transfer_id, actor)
                    .await
            }
            Some(ConfirmAction::Receipt) => {
                self.confirm_receipt(token, signature, expires_at, transfer_id, actor)
                    .await
            }
            None => Err(CoreError::InvalidTransferWorkflow),
        }
    }

    /// The signed confirmation URL minted at approval.
    pub async fn signed_confirmation_url(&self, transfer_id: TransferId) -> CoreResult<String> {
        let transfer = self.fetch(transfer_id).await?;
        transfer
            .signed_url
            .ok_or(CoreError::TransferInvalidState)
    }

    /// Store the opaque reference reported by the external document
    /// renderer and flip the generated flag.
    pub async fn attach_order_document(
        &self,
        transfer_id: TransferId,
        file_ref: &str,
    ) -> CoreResult<Transfer> {
        let mut transfer = self.fetch(transfer_id).await?;
        let expected = transfer.state;
        transfer.document_generated = true;
        transfer.document_ref = Some(file_ref.to_string());
        transfer.updated_at = Utc::now();

        self.store
            .commit(CommitBatch::new().transition_transfer(transfer.clone(), expected))
            .await?;
        Ok(transfer)
    }

    pub async fn get(&self, transfer_id: TransferId) -> CoreResult<Transfer> {
        self.fetch(transfer_id).await
    }

    /// Approval work queue for the coordinating authority.
    pub async fn pending_transfers(&self) -> CoreResult<Vec<Transfer>> {
        self.store.pending_transfers().await
    }

    /// Transfers involving the unit as origin or destination.
    pub async fn unit_transfers(&self, unit: UnitId) -> CoreResult<Vec<Transfer>> {
        self.store.unit_transfers(unit).await
    }

    async fn fetch(&self, transfer_id: TransferId) -> CoreResult<Transfer> {
        self.store
            .fetch_transfer(transfer_id)
            .await?
            .ok_or(CoreError::NotFound("transfer"))
    }
}
