// scope.rs — Namespace scope tracking for emitted C++ text
//
// Keeps the stack of currently open `namespace X {` blocks and computes the
// minimal close/open sequence needed to move to the namespace chain of the
// next emitted type. Also renders names relative to the open scope.
//
// Preconditions: chains passed to `enter` come from the same `TypeModel`.
// Postconditions: after `enter(&[])` the stack is empty again.
// Failure modes: none.
// Side effects: none (returns text; the caller appends it).

use crate::id::NamespaceId;
use crate::model::TypeModel;

#[derive(Debug, Default, Clone)]
pub struct NamespaceScope {
    stack: Vec<NamespaceId>,
}

impl NamespaceScope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Currently open chain, outer → inner.
    pub fn current(&self) -> &[NamespaceId] {
        &self.stack
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    /// Transition to `target` and return the close/open text for it.
    ///
    /// Scopes shared with `target` as a common prefix stay open; anonymous
    /// namespaces are tracked but produce no text.
    pub fn enter(&mut self, model: &TypeModel, target: &[NamespaceId]) -> String {
        let mut s = String::new();
        while self.stack.len() > target.len() {
            s.push_str(&self.close_inner(model));
        }
        while !self.stack.is_empty() && target[..self.stack.len()] != self.stack[..] {
            s.push_str(&self.close_inner(model));
        }
        for &ns in &target[self.stack.len()..] {
            s.push_str(&self.open_inner(model, ns));
        }
        s
    }

    fn close_inner(&mut self, model: &TypeModel) -> String {
        match self.stack.pop() {
            Some(ns) => {
                let name = &model.namespace(ns).name;
                if name.is_empty() {
                    String::new()
                } else {
                    format!("}} // {}\n", name)
                }
            }
            None => String::new(),
        }
    }

    fn open_inner(&mut self, model: &TypeModel, ns: NamespaceId) -> String {
        self.stack.push(ns);
        let name = &model.namespace(ns).name;
        if name.is_empty() {
            String::new()
        } else {
            format!("\nnamespace {} {{\n", name)
        }
    }

    /// Names of `chain` that remain after stripping the prefix it shares with
    /// the open scope.
    pub fn relative_namespaces<'m>(&self, model: &'m TypeModel, chain: &[NamespaceId]) -> Vec<&'m str> {
        let shared = self
            .stack
            .iter()
            .zip(chain)
            .take_while(|(open, ns)| open == ns)
            .count();
        model.namespace_names(&chain[shared..])
    }

    /// `ident` qualified by the open scope (`Bse::Device`).
    pub fn namespaced_identifier(&self, model: &TypeModel, ident: &str) -> String {
        let mut names = model.namespace_names(&self.stack);
        if !ident.is_empty() {
            names.push(ident);
        }
        names.join("::")
    }
}
