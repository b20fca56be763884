//! Read-only expression walker.
//!
//! Exporter back-ends (TPTP, SMT, graph queries) consume expressions by
//! traversal rather than by pattern matching on the kernel's
//! representation. [`walk_term`] and [`walk_type`] visit constructors
//! child-first (post-order); abstraction bodies are presented in named
//! (un-De-Bruijned) form, so visitors never see a raw index.

use crate::term::{Term, TermKind};
use crate::ty::{Type, TypeKind};

/// Visitor over types and terms. The `walk_*` free functions drive the
/// traversal; implementations override only what they need.
pub trait Visitor: Sized {
    fn visit_type(&mut self, _ty: &Type) {}

    fn visit_term(&mut self, _term: &Term) {}
}

/// Walks `ty` child-first, calling `visit_type` on every node.
pub fn walk_type<V: Visitor>(v: &mut V, ty: &Type) {
    if let TypeKind::Application { args, .. } = ty.kind() {
        for arg in args {
            walk_type(v, arg);
        }
    }
    v.visit_type(ty);
}

/// Walks `term` child-first, visiting each subterm's type annotation
/// before the subterm itself. Abstractions are walked through their
/// named form: the binder, then the (closed) body, then the node.
pub fn walk_term<V: Visitor>(v: &mut V, term: &Term) {
    match term.kind() {
        TermKind::Variable { .. } | TermKind::BoundVariable { .. } | TermKind::Constant { .. } => {
            walk_type(v, term.ty());
        }
        TermKind::Application { fun, arg } => {
            walk_term(v, fun);
            walk_term(v, arg);
        }
        TermKind::Abstraction { .. } => {
            if let Some((binder, body)) = term.unpack_abstraction() {
                walk_term(v, &binder);
                walk_term(v, &body);
            }
        }
    }
    v.visit_term(term);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ty::{bool_type, function_type};

    #[derive(Default)]
    struct Collector {
        terms: Vec<String>,
        types: Vec<String>,
    }

    impl Visitor for Collector {
        fn visit_type(&mut self, ty: &Type) {
            self.types.push(ty.dump());
        }

        fn visit_term(&mut self, term: &Term) {
            self.terms.push(
                term.id()
                    .map(|id| id.as_str().to_owned())
                    .unwrap_or_else(|| "<compound>".to_owned()),
            );
        }
    }

    #[test]
    fn application_is_visited_child_first() {
        let f = Term::constant("f", &function_type(&bool_type(), &bool_type()));
        let x = Term::variable("x", &bool_type());
        let fx = Term::app(&f, &x).unwrap();
        let mut v = Collector::default();
        walk_term(&mut v, &fx);
        assert_eq!(v.terms, vec!["f", "x", "<compound>"]);
    }

    #[test]
    fn abstraction_bodies_are_walked_in_named_form() {
        let x = Term::variable("x", &bool_type());
        let lam = Term::abs(&x, &x).unwrap();
        let mut v = Collector::default();
        walk_term(&mut v, &lam);
        // binder, body occurrence (named, not an index), node
        assert_eq!(v.terms, vec!["x", "x", "<compound>"]);
    }

    #[test]
    fn atom_types_are_visited_bottom_up() {
        let x = Term::variable("x", &function_type(&bool_type(), &bool_type()));
        let mut v = Collector::default();
        walk_term(&mut v, &x);
        // bool, bool, then the function type
        assert_eq!(v.types.len(), 3);
        assert!(v.types[2].contains("fun"));
    }
}
