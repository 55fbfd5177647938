//! Document ↔ surface binding with echo suppression.
//!
//! Two flags break the feedback loops between the replicated document, the
//! editing surface and the relay:
//!
//! - `suppress_local` is held while the adapter writes into the surface;
//!   change events the surface raises in that window are discarded.
//! - `suppress_network` is held while an inbound relay payload is merged
//!   into the document; the resulting change is never sent back.
//!
//! Both flags are scoped: [`Suppression`] restores the previous value on
//! drop, so an early return cannot leave a flag stuck.

use crate::client::document::ChangeOrigin;
use crate::client::surface::EditorSurface;
use crate::shared::crdt::{utf16_len, DeltaOp, EditOp};
use std::cell::Cell;
use std::rc::Rc;

/// Shared echo-suppression state for one session
#[derive(Debug, Default)]
pub struct EchoGuard {
    suppress_local: Cell<bool>,
    suppress_network: Cell<bool>,
}

/// Scope during which one suppression flag is held
#[must_use = "the flag is released when the guard is dropped"]
pub struct Suppression<'a> {
    flag: &'a Cell<bool>,
    previous: bool,
}

impl Drop for Suppression<'_> {
    fn drop(&mut self) {
        self.flag.set(self.previous);
    }
}

impl EchoGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ignore surface change events until the returned scope ends
    pub fn suppress_local(&self) -> Suppression<'_> {
        Self::hold(&self.suppress_local)
    }

    /// Withhold broadcasts until the returned scope ends
    pub fn suppress_network(&self) -> Suppression<'_> {
        Self::hold(&self.suppress_network)
    }

    pub fn local_suppressed(&self) -> bool {
        self.suppress_local.get()
    }

    pub fn network_suppressed(&self) -> bool {
        self.suppress_network.get()
    }

    /// Whether a change with this origin is mirrored into the surface
    pub fn should_write_surface(&self, origin: ChangeOrigin) -> bool {
        origin != ChangeOrigin::Local
    }

    /// Whether a change with this origin is sent to the relay
    pub fn should_broadcast(&self, origin: ChangeOrigin) -> bool {
        origin != ChangeOrigin::RemoteSync && !self.network_suppressed()
    }

    fn hold(flag: &Cell<bool>) -> Suppression<'_> {
        let previous = flag.replace(true);
        Suppression { flag, previous }
    }
}

/// Binds an [`EditorSurface`] to the session's document
pub struct SurfaceAdapter<S> {
    surface: S,
    guard: Rc<EchoGuard>,
}

impl<S: EditorSurface> SurfaceAdapter<S> {
    pub fn new(surface: S, guard: Rc<EchoGuard>) -> Self {
        Self { surface, guard }
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn guard(&self) -> &Rc<EchoGuard> {
        &self.guard
    }

    /// Mirror a document delta into the surface without capturing it back
    pub fn write_delta(&mut self, delta: &[DeltaOp]) {
        let edits = delta_to_edits(delta);
        if edits.is_empty() {
            return;
        }
        let guard = Rc::clone(&self.guard);
        let _quiet = guard.suppress_local();
        self.surface.execute_edits(&edits);
        self.discard_pending();
    }

    /// Replace the surface text wholesale without capturing it back
    pub fn overwrite(&mut self, text: &str) {
        let guard = Rc::clone(&self.guard);
        let _quiet = guard.suppress_local();
        self.surface.set_value(text);
        self.discard_pending();
    }

    /// User edit batches to feed into the document
    ///
    /// Returns nothing while `suppress_local` is held.
    pub fn drain_local(&mut self) -> Vec<Vec<EditOp>> {
        if self.guard.local_suppressed() {
            self.discard_pending();
            return Vec::new();
        }
        self.surface.take_changes()
    }

    /// Whether the surface text equals `content`
    pub fn matches(&self, content: &str) -> bool {
        self.surface.value() == content
    }

    fn discard_pending(&mut self) {
        let dropped = self.surface.take_changes();
        if !dropped.is_empty() {
            tracing::trace!("[Sync] Dropped {} self-inflicted surface events", dropped.len());
        }
    }
}

/// Translate a running-cursor delta into sequential positional edits
pub fn delta_to_edits(delta: &[DeltaOp]) -> Vec<EditOp> {
    let mut index = 0;
    let mut edits = Vec::new();
    for op in delta {
        match op {
            DeltaOp::Retain { len } => index += len,
            DeltaOp::Insert { text } => {
                edits.push(EditOp::insert(index, text.clone()));
                index += utf16_len(text);
            }
            DeltaOp::Delete { len } => edits.push(EditOp::delete(index, *len)),
        }
    }
    edits
}
