//! # Replicated Code Document
//!
//! Wraps a `yrs` document holding the session's shared buffer under the root
//! text `"code"`. Every mutation runs as exactly one transaction and yields a
//! [`DocumentChange`]: the origin tag, the retain/insert/delete delta observed
//! on the text, and the v1-encoded update for the network.
//!
//! ## Offsets
//!
//! The document uses `OffsetKind::Utf16`, so positions agree with Yjs peers
//! and with browser text widgets.
//!
//! ## Local batches
//!
//! A single widget event may describe several edited regions, all expressed
//! in pre-event coordinates. [`rebase_batch`] sorts them by offset and moves
//! each one past the net length change of the regions before it, so the
//! whole batch lands as one transaction at the right places. Offsets that
//! still fall outside the document are clamped; the snapshot check on the
//! next join repairs any drift this causes.

use crate::shared::crdt::{utf16_len, DeltaOp, EditOp};
use crate::shared::update::check_update_v1;
use std::fmt;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use yrs::types::Delta;
use yrs::updates::decoder::Decode;
use yrs::{
    Any, Doc, GetString, Observable, OffsetKind, Options, Out, ReadTxn, StateVector,
    Subscription, Text, TextRef, Transact, TransactionMut, Update,
};

/// Root name of the shared text
pub const TEXT_NAME: &str = "code";

/// Failures while integrating a remote payload
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("malformed update: {0}")]
    MalformedUpdate(String),
    #[error("update could not be integrated: {0}")]
    Integration(String),
}

/// Where a transaction came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeOrigin {
    /// Captured from the local editing surface
    Local,
    /// Applied from a relay snapshot or update
    RemoteSync,
    /// Starter template seeded into an empty buffer
    Template,
}

impl ChangeOrigin {
    /// Origin tag attached to the `yrs` transaction
    pub fn tag(&self) -> &'static str {
        match self {
            ChangeOrigin::Local => "local",
            ChangeOrigin::RemoteSync => "remote-sync",
            ChangeOrigin::Template => "init-template",
        }
    }
}

/// Notification raised once per transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentChange {
    pub origin: ChangeOrigin,
    /// Text delta in running-cursor form
    pub delta: Vec<DeltaOp>,
    /// v1 update encoding of this transaction
    pub update: Vec<u8>,
}

impl DocumentChange {
    /// Whether the transaction left the text untouched
    pub fn is_empty(&self) -> bool {
        self.delta.is_empty()
    }
}

/// The session's replicated text buffer
pub struct CodeDocument {
    doc: Doc,
    text: TextRef,
    observed: Arc<Mutex<Vec<DeltaOp>>>,
    _subscription: Subscription,
}

impl fmt::Debug for CodeDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CodeDocument")
            .field("client_id", &self.doc.client_id())
            .field("len", &self.len())
            .finish()
    }
}

impl Default for CodeDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl CodeDocument {
    /// Create an empty replica
    pub fn new() -> Self {
        let doc = Doc::with_options(Options {
            offset_kind: OffsetKind::Utf16,
            ..Options::default()
        });
        let text = doc.get_or_insert_text(TEXT_NAME);

        let observed: Arc<Mutex<Vec<DeltaOp>>> = Arc::default();
        let sink = Arc::clone(&observed);
        let subscription = text.observe(move |txn, event| {
            let ops: Vec<DeltaOp> = event.delta(txn).iter().filter_map(to_delta_op).collect();
            match sink.lock() {
                Ok(mut pending) => pending.extend(ops),
                Err(poisoned) => poisoned.into_inner().extend(ops),
            }
        });

        Self {
            doc,
            text,
            observed,
            _subscription: subscription,
        }
    }

    /// Current content of the buffer
    pub fn content(&self) -> String {
        let txn = self.doc.transact();
        self.text.get_string(&txn)
    }

    /// Length in UTF-16 code units
    pub fn len(&self) -> usize {
        utf16_len(&self.content())
    }

    /// Whether the buffer holds no text
    pub fn is_empty(&self) -> bool {
        self.content().is_empty()
    }

    /// Merge a remote update or snapshot
    ///
    /// Applying the same payload twice, or payloads out of causal order, leaves
    /// the same content as applying them once in order.
    ///
    /// Payloads that fail the bounds check are rejected before decoding and
    /// leave the document untouched.
    pub fn apply_remote(&mut self, bytes: &[u8]) -> Result<DocumentChange, DocumentError> {
        check_update_v1(bytes).map_err(|e| DocumentError::MalformedUpdate(e.to_string()))?;
        let update = Update::decode_v1(bytes)
            .map_err(|e| DocumentError::MalformedUpdate(e.to_string()))?;
        self.transact(ChangeOrigin::RemoteSync, move |txn, _| {
            txn.apply_update(update)
                .map_err(|e| DocumentError::Integration(e.to_string()))
        })
    }

    /// Apply a batch of widget edits as one transaction
    ///
    /// Returns `None` when the batch contains nothing to apply.
    pub fn capture_local_change(&mut self, ops: &[EditOp]) -> Option<DocumentChange> {
        let ops: Vec<EditOp> = ops.iter().filter(|op| !op.is_noop()).cloned().collect();
        if ops.is_empty() {
            return None;
        }
        let rebased = rebase_batch(&ops);

        let result = self.transact(ChangeOrigin::Local, |txn, text| {
            for op in &rebased {
                apply_clamped(txn, text, op);
            }
            Ok(())
        });
        match result {
            Ok(change) => Some(change),
            Err(e) => {
                tracing::warn!("[Doc] Local batch failed: {}", e);
                None
            }
        }
    }

    /// Seed an empty buffer with starter text
    ///
    /// Does nothing if the buffer already has content.
    pub fn insert_template(&mut self, template: &str) -> Option<DocumentChange> {
        if !self.is_empty() || template.is_empty() {
            return None;
        }
        self.transact(ChangeOrigin::Template, |txn, text| {
            text.insert(txn, 0, template);
            Ok(())
        })
        .ok()
    }

    /// Full-state encoding sufficient to initialise a fresh replica
    pub fn snapshot(&self) -> Vec<u8> {
        let txn = self.doc.transact();
        txn.encode_state_as_update_v1(&StateVector::default())
    }

    /// Encoded state this replica has that `snapshot` lacks
    ///
    /// Used after a join to push edits made before the relay answered.
    /// Returns `None` if the snapshot already covers everything local, or if
    /// it cannot be decoded.
    pub fn missing_from(&self, snapshot: &[u8]) -> Option<Vec<u8>> {
        check_update_v1(snapshot).ok()?;
        let remote = Update::decode_v1(snapshot).ok()?.state_vector();
        let txn = self.doc.transact();
        let local = txn.state_vector();
        let ahead = local
            .iter()
            .any(|(client, clock)| *clock > remote.get(client));
        if !ahead {
            return None;
        }
        Some(txn.encode_state_as_update_v1(&remote))
    }

    fn transact<F>(&mut self, origin: ChangeOrigin, f: F) -> Result<DocumentChange, DocumentError>
    where
        F: FnOnce(&mut TransactionMut<'_>, &TextRef) -> Result<(), DocumentError>,
    {
        self.take_observed();
        let update = {
            let mut txn = self.doc.transact_mut_with(origin.tag());
            f(&mut txn, &self.text)?;
            txn.encode_update_v1()
        };
        let delta = self.take_observed();
        tracing::trace!(
            "[Doc] {} transaction: {} delta ops, {} bytes",
            origin.tag(),
            delta.len(),
            update.len()
        );
        Ok(DocumentChange {
            origin,
            delta,
            update,
        })
    }

    fn take_observed(&self) -> Vec<DeltaOp> {
        match self.observed.lock() {
            Ok(mut pending) => std::mem::take(&mut *pending),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        }
    }
}

fn apply_clamped(txn: &mut TransactionMut<'_>, text: &TextRef, op: &EditOp) {
    let len = utf16_len(&text.get_string(&*txn));
    let offset = op.offset.min(len);
    let delete_len = op.delete_len.min(len - offset);
    if offset != op.offset || delete_len != op.delete_len {
        tracing::debug!(
            "[Doc] Clamped edit at {} (+{}) to {} (+{}) for length {}",
            op.offset,
            op.delete_len,
            offset,
            delete_len,
            len
        );
    }
    if delete_len > 0 {
        text.remove_range(txn, offset as u32, delete_len as u32);
    }
    if !op.insert.is_empty() {
        text.insert(txn, offset as u32, &op.insert);
    }
}

fn to_delta_op(delta: &Delta) -> Option<DeltaOp> {
    match delta {
        Delta::Retain(len, _) => Some(DeltaOp::Retain { len: *len as usize }),
        Delta::Deleted(len) => Some(DeltaOp::Delete { len: *len as usize }),
        Delta::Inserted(Out::Any(Any::String(text)), _) => Some(DeltaOp::Insert {
            text: text.to_string(),
        }),
        Delta::Inserted(other, _) => {
            tracing::warn!("[Doc] Ignoring non-text insert in code buffer: {:?}", other);
            None
        }
    }
}

/// Re-express a batch of edits given in pre-batch coordinates as a sequence
/// to apply one after another.
///
/// Edits are stably sorted by offset. Each edit is moved by the net length
/// change of every earlier edit whose affected range ends at or before its
/// offset. An offset inside an earlier deleted range collapses to the end of
/// that edit's inserted text, and the overlapping part of its own deletion is
/// dropped.
pub fn rebase_batch(ops: &[EditOp]) -> Vec<EditOp> {
    let mut sorted: Vec<&EditOp> = ops.iter().collect();
    sorted.sort_by_key(|op| op.offset);

    let mut applied: Vec<&EditOp> = Vec::with_capacity(sorted.len());
    let mut rebased = Vec::with_capacity(sorted.len());

    for op in sorted {
        let mut position = op.offset as i64;
        let mut delete_len = op.delete_len;
        for prior in &applied {
            let prior_end = prior.offset + prior.delete_len;
            if prior_end <= op.offset {
                position += prior.net_change();
            } else if prior.offset < op.offset {
                let overlap = prior_end - op.offset;
                delete_len = delete_len.saturating_sub(overlap);
                position += (prior.offset + prior.insert_len()) as i64 - op.offset as i64;
            }
        }
        rebased.push(EditOp {
            offset: position.max(0) as usize,
            delete_len,
            insert: op.insert.clone(),
        });
        applied.push(op);
    }
    rebased
}
