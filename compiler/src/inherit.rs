// inherit.rs — Inheritance reduction over type prerequisites
//
// Schema prerequisites list every type a type derives from, including ones
// already reachable through another prerequisite. C++ base lists and the
// property-access delegation only want the *direct* bases, so redundant
// entries (diamonds, linear chains) are removed here.
//
// Preconditions: the prerequisite graph is acyclic.
// Postconditions: `reduce` output has no element reachable from another
//                 element, and `reduce(reduce(x)) == reduce(x)`.
// Failure modes: none; cycles are rejected upstream.
// Side effects: none.

use std::collections::HashSet;

use crate::id::TypeId;
use crate::model::TypeModel;

/// Whether `ancestor` is in the transitive prerequisite closure of `child`.
/// Each type is walked at most once.
pub fn has_ancestor(model: &TypeModel, child: TypeId, ancestor: TypeId) -> bool {
    fn walk(
        model: &TypeModel,
        id: TypeId,
        ancestor: TypeId,
        visited: &mut HashSet<TypeId>,
    ) -> bool {
        for &p in &model.get(id).prerequisites {
            if p == ancestor {
                return true;
            }
            if visited.insert(p) && walk(model, p, ancestor, visited) {
                return true;
            }
        }
        false
    }
    walk(model, child, ancestor, &mut HashSet::new())
}

/// Remove every candidate that equals, or is an ancestor of, another
/// candidate. Survivors keep their declaration order.
///
/// Candidates are processed back to front; the tie-break between unrelated
/// candidates is therefore purely positional.
pub fn reduce(model: &TypeModel, prerequisites: &[TypeId]) -> Vec<TypeId> {
    let mut pending = prerequisites.to_vec();
    let mut reduced: Vec<TypeId> = Vec::with_capacity(pending.len());
    while let Some(candidate) = pending.pop() {
        let redundant = pending
            .iter()
            .chain(reduced.iter())
            .any(|&other| other == candidate || has_ancestor(model, other, candidate));
        if !redundant {
            reduced.insert(0, candidate);
        }
    }
    reduced
}

/// Direct bases of a type: its reduced prerequisite list.
pub fn bases(model: &TypeModel, id: TypeId) -> Vec<TypeId> {
    reduce(model, &model.get(id).prerequisites)
}

/// The type itself followed by all of its ancestors in depth-first
/// pre-order, first occurrence wins.
pub fn class_ancestry(model: &TypeModel, id: TypeId) -> Vec<TypeId> {
    fn deep(
        model: &TypeModel,
        id: TypeId,
        seen: &mut HashSet<TypeId>,
        out: &mut Vec<TypeId>,
    ) {
        if !seen.insert(id) {
            return;
        }
        out.push(id);
        for &p in &model.get(id).prerequisites {
            deep(model, p, seen, out);
        }
    }
    let mut all = Vec::new();
    deep(model, id, &mut HashSet::new(), &mut all);
    all
}
