//! Property-based tests for replica convergence and batch rebasing

use proptest::prelude::*;
use xfcollab::client::{EditorSurface, TextBuffer};
use xfcollab::client::CodeDocument;
use xfcollab::shared::EditOp;

/// One edit expressed relative to the current length of a document
#[derive(Debug, Clone)]
struct RelativeEdit {
    position: usize,
    delete: usize,
    insert: String,
}

impl RelativeEdit {
    fn resolve(&self, len: usize) -> EditOp {
        let offset = if len == 0 { 0 } else { self.position % (len + 1) };
        let delete = self.delete.min(len - offset);
        EditOp::replace(offset, delete, self.insert.clone())
    }
}

fn relative_edit() -> impl Strategy<Value = RelativeEdit> {
    (0usize..64, 0usize..4, "[a-z]{0,3}").prop_map(|(position, delete, insert)| RelativeEdit {
        position,
        delete,
        insert,
    })
}

/// Apply edits one transaction at a time and return the updates produced
fn edit_all(doc: &mut CodeDocument, edits: &[RelativeEdit]) -> Vec<Vec<u8>> {
    edits
        .iter()
        .filter_map(|edit| {
            let op = edit.resolve(doc.len());
            doc.capture_local_change(&[op]).map(|change| change.update)
        })
        .collect()
}

/// Merge two ordered update streams, taking from `a` where the mask says so
fn interleave(a: &[Vec<u8>], b: &[Vec<u8>], mask: &[bool]) -> Vec<Vec<u8>> {
    let (mut i, mut j) = (0, 0);
    let mut out = Vec::with_capacity(a.len() + b.len());
    for take_a in mask.iter().copied().chain(std::iter::repeat(true)) {
        if i == a.len() && j == b.len() {
            break;
        }
        if (take_a && i < a.len()) || j == b.len() {
            out.push(a[i].clone());
            i += 1;
        } else {
            out.push(b[j].clone());
            j += 1;
        }
    }
    out
}

/// Non-overlapping regions of a base string, in pre-edit coordinates
fn batch_over(base: &str, regions: &[(usize, usize, String)]) -> Vec<EditOp> {
    let len = base.len();
    let mut cursor = 0;
    let mut batch = Vec::new();
    for (index, (gap, delete, insert)) in regions.iter().enumerate() {
        let gap = if index == 0 { *gap } else { gap + 1 };
        let offset = cursor + gap;
        if offset > len {
            break;
        }
        let delete = (*delete).min(len - offset);
        batch.push(EditOp::replace(offset, delete, insert.clone()));
        cursor = offset + delete;
    }
    batch
}

proptest! {
    #[test]
    fn test_two_replicas_converge(
        base in "[a-z]{0,12}",
        a_edits in prop::collection::vec(relative_edit(), 0..12),
        b_edits in prop::collection::vec(relative_edit(), 0..12),
        mask_a in prop::collection::vec(any::<bool>(), 0..24),
        mask_b in prop::collection::vec(any::<bool>(), 0..24),
    ) {
        let mut origin = CodeDocument::new();
        origin.capture_local_change(&[EditOp::insert(0, base.clone())]);
        let snapshot = origin.snapshot();

        let mut a = CodeDocument::new();
        let mut b = CodeDocument::new();
        a.apply_remote(&snapshot).unwrap();
        b.apply_remote(&snapshot).unwrap();

        let from_a = edit_all(&mut a, &a_edits);
        let from_b = edit_all(&mut b, &b_edits);

        // Each replica sees its peer's stream in order; only the
        // interleaving with its own history differs.
        let mut a_view = CodeDocument::new();
        for update in interleave(&[snapshot.clone()], &from_a, &mask_a)
            .iter()
            .chain(from_b.iter())
        {
            a_view.apply_remote(update).unwrap();
        }
        for update in &from_b {
            a.apply_remote(update).unwrap();
        }
        for update in &from_a {
            b.apply_remote(update).unwrap();
        }

        let mut relay_order = CodeDocument::new();
        relay_order.apply_remote(&snapshot).unwrap();
        for update in interleave(&from_a, &from_b, &mask_b) {
            relay_order.apply_remote(&update).unwrap();
        }

        prop_assert_eq!(a.content(), b.content());
        prop_assert_eq!(a_view.content(), a.content());
        prop_assert_eq!(relay_order.content(), a.content());
    }

    #[test]
    fn test_reapplying_updates_is_idempotent(
        edits in prop::collection::vec(relative_edit(), 1..10),
    ) {
        let mut source = CodeDocument::new();
        let updates = edit_all(&mut source, &edits);

        let mut replica = CodeDocument::new();
        for update in updates.iter().chain(updates.iter()) {
            replica.apply_remote(update).unwrap();
        }
        replica.apply_remote(&source.snapshot()).unwrap();

        prop_assert_eq!(replica.content(), source.content());
    }

    #[test]
    fn test_out_of_order_delivery_converges(
        edits in prop::collection::vec(relative_edit(), 1..10),
    ) {
        let mut source = CodeDocument::new();
        let updates = edit_all(&mut source, &edits);

        let mut replica = CodeDocument::new();
        for update in updates.iter().rev() {
            replica.apply_remote(update).unwrap();
        }

        prop_assert_eq!(replica.content(), source.content());
    }

    #[test]
    fn test_batch_matches_surface_edit(
        base in "[a-z]{0,20}",
        regions in prop::collection::vec((0usize..4, 0usize..4, "[A-Z]{0,3}"), 0..5),
        reverse in any::<bool>(),
    ) {
        let mut batch = batch_over(&base, &regions);
        if reverse {
            batch.reverse();
        }

        let mut surface = TextBuffer::with_text(base.clone());
        surface.apply_user_edit(batch.clone());

        let mut doc = CodeDocument::new();
        doc.capture_local_change(&[EditOp::insert(0, base.clone())]);
        doc.capture_local_change(&batch);

        prop_assert_eq!(doc.content(), surface.value());
    }
}
