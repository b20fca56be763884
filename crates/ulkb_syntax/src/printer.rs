//! Deterministic pretty printing.
//!
//! Output is a pure function of the object and the settings. Because
//! α-equal terms share one interned node, α-equal abstractions print
//! identically under any settings.
//!
//! Parenthesization is precedence-driven; the table follows the usual
//! convention (application binds tightest, then equality, ¬, ∧, ∨, →,
//! ↔, and binders loosest).

use std::fmt::Write;

use serde::{Deserialize, Serialize};
use ulkb_kernel::term::{Term, TermKind};
use ulkb_kernel::ty::{Type, TypeKind};
use ulkb_kernel::{Extension, Sequent, Theory};

/// A printable symbol with an ASCII and a Unicode spelling.
struct Sym {
    ascii: &'static str,
    unicode: &'static str,
}

const TYPE_SORT: &str = "*";
const TYPE_SEP: &str = " : ";
const BOOL_TYPE: Sym = Sym { ascii: "bool", unicode: "\u{1d539}" };
const FUNCTION_ARROW: Sym = Sym { ascii: "->", unicode: "\u{2192}" };
const EQUAL: Sym = Sym { ascii: "=", unicode: "=" };
const DISTINCT: Sym = Sym { ascii: "!=", unicode: "\u{2260}" };
const IFF: Sym = Sym { ascii: "<->", unicode: "\u{2194}" };
const TRUTH: Sym = Sym { ascii: "true", unicode: "\u{22a4}" };
const FALSITY: Sym = Sym { ascii: "false", unicode: "\u{22a5}" };
const NOT: Sym = Sym { ascii: "not ", unicode: "\u{ac}" };
const AND: Sym = Sym { ascii: "and", unicode: "\u{2227}" };
const OR: Sym = Sym { ascii: "or", unicode: "\u{2228}" };
const IMPLIES: Sym = Sym { ascii: "->", unicode: "\u{2192}" };
const FORALL: Sym = Sym { ascii: "forall ", unicode: "\u{2200}" };
const EXISTS: Sym = Sym { ascii: "exists ", unicode: "\u{2203}" };
const EXISTS1: Sym = Sym { ascii: "exists1 ", unicode: "\u{2203}!" };
const LAMBDA: Sym = Sym { ascii: "fun ", unicode: "\u{1d706} " };
const MAPS_TO: Sym = Sym { ascii: "=>", unicode: "\u{21d2}" };
const TURNSTILE: Sym = Sym { ascii: "|-", unicode: "\u{22a2}" };
const DEFINED_AS: Sym = Sym { ascii: ":=", unicode: "\u{2254}" };

/// Settings of the pretty printer.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct PrinterSettings {
    /// Use the ASCII spelling of every symbol.
    pub ensure_ascii: bool,
    /// Annotate atomic terms and top-level objects with their types.
    pub show_types: bool,
    /// Parenthesize every compound subexpression.
    pub show_parentheses: bool,
    /// Show generated ids (those carrying `generated_id_prefix`).
    pub show_generated_ids: bool,
    /// Prefix that marks generated ids.
    pub generated_id_prefix: String,
}

impl Default for PrinterSettings {
    fn default() -> Self {
        PrinterSettings {
            ensure_ascii: false,
            show_types: true,
            show_parentheses: false,
            show_generated_ids: false,
            generated_id_prefix: "_".to_owned(),
        }
    }
}

impl PrinterSettings {
    fn sym(&self, sym: &Sym) -> &'static str {
        if self.ensure_ascii {
            sym.ascii
        } else {
            sym.unicode
        }
    }

    fn is_generated(&self, id: &str) -> bool {
        !self.generated_id_prefix.is_empty() && id.starts_with(&self.generated_id_prefix)
    }
}

// Precedence: the *maximum* precedence a position admits without
// parentheses. Lower binds tighter.
const PREC_ATOM: u8 = 0;
const PREC_APPLICATION: u8 = 40;
const PREC_EQUAL: u8 = 70;
const PREC_NOT: u8 = 75;
const PREC_AND: u8 = 80;
const PREC_OR: u8 = 85;
const PREC_IMPLIES: u8 = 90;
const PREC_IFF: u8 = 95;
const PREC_BINDER: u8 = 100;

fn term_prec(t: &Term) -> u8 {
    if t.is_atomic() || t.is_truth() || t.is_falsity() {
        // An atom (or a constant printed as a symbol) never needs
        // parentheses; a type-annotated atom carries its own.
        return PREC_ATOM;
    }
    if t.is_iff() {
        return PREC_IFF;
    }
    if t.is_equal() {
        return PREC_EQUAL;
    }
    if t.is_not() {
        return PREC_NOT;
    }
    if t.is_and() {
        return PREC_AND;
    }
    if t.is_or() {
        return PREC_OR;
    }
    if t.is_implies() {
        return PREC_IMPLIES;
    }
    if t.is_forall() || t.is_exists() || t.is_exists1() || t.is_abstraction() {
        return PREC_BINDER;
    }
    PREC_APPLICATION
}

/// Serializes a type with default settings.
pub fn type_to_string(ty: &Type, settings: &PrinterSettings) -> String {
    let mut out = String::new();
    write_type(&mut out, ty, settings, PREC_BINDER);
    if settings.show_types {
        out.push_str(TYPE_SEP);
        out.push_str(TYPE_SORT);
    }
    out
}

fn type_body(ty: &Type, settings: &PrinterSettings) -> String {
    let mut out = String::new();
    write_type(&mut out, ty, settings, PREC_BINDER);
    out
}

const TYPE_PREC_ATOM: u8 = 0;
const TYPE_PREC_APPLICATION: u8 = 40;
const TYPE_PREC_FUNCTION: u8 = 90;

fn type_prec(ty: &Type) -> u8 {
    match ty.kind() {
        TypeKind::Variable(_) => TYPE_PREC_ATOM,
        TypeKind::Application { args, .. } if args.is_empty() => TYPE_PREC_ATOM,
        _ if ty.is_function_type() => TYPE_PREC_FUNCTION,
        TypeKind::Application { .. } => TYPE_PREC_APPLICATION,
    }
}

fn write_type(out: &mut String, ty: &Type, settings: &PrinterSettings, max: u8) {
    let max = if settings.show_parentheses { 0 } else { max };
    let prec = type_prec(ty);
    let parens = prec > max && prec > 0;
    if parens {
        out.push('(');
    }
    match ty.kind() {
        TypeKind::Variable(id) => {
            out.push_str(id.as_str());
        }
        TypeKind::Application { head, args } => {
            if ty.is_bool_type() {
                out.push_str(settings.sym(&BOOL_TYPE));
            } else if let Some((domain, codomain)) = ty.unpack_function_type() {
                // Right-associative: the domain side needs parentheses
                // when it is itself a function type.
                write_type(out, domain, settings, TYPE_PREC_FUNCTION - 1);
                out.push(' ');
                out.push_str(settings.sym(&FUNCTION_ARROW));
                out.push(' ');
                write_type(out, codomain, settings, TYPE_PREC_FUNCTION);
            } else {
                out.push_str(head.id().as_str());
                for arg in args {
                    out.push(' ');
                    write_type(out, arg, settings, TYPE_PREC_APPLICATION - 1);
                }
            }
        }
    }
    if parens {
        out.push(')');
    }
}

/// Serializes a term.
pub fn term_to_string(t: &Term, settings: &PrinterSettings) -> String {
    let mut out = String::new();
    write_term(&mut out, t, settings, PREC_BINDER);
    if settings.show_types {
        out.push_str(TYPE_SEP);
        out.push_str(&type_body(t.ty(), settings));
    }
    out
}

fn term_body(t: &Term, settings: &PrinterSettings) -> String {
    let mut out = String::new();
    write_term(&mut out, t, settings, PREC_BINDER);
    out
}

fn write_atom(out: &mut String, t: &Term, settings: &PrinterSettings) {
    let label = match t.kind() {
        TermKind::Variable { id } | TermKind::Constant { id } => id.as_str().to_owned(),
        TermKind::BoundVariable { index } => index.to_string(),
        _ => t.dump(),
    };
    if settings.show_types {
        out.push('(');
        out.push_str(&label);
        out.push_str(TYPE_SEP);
        out.push_str(&type_body(t.ty(), settings));
        out.push(')');
    } else {
        out.push_str(&label);
    }
}

fn write_infix(
    out: &mut String,
    l: &Term,
    sym: &Sym,
    r: &Term,
    prec: u8,
    right_associative: bool,
    settings: &PrinterSettings,
) {
    let (left_max, right_max) = if right_associative {
        (prec - 1, prec)
    } else {
        (prec - 1, prec - 1)
    };
    write_term(out, l, settings, left_max);
    out.push(' ');
    out.push_str(settings.sym(sym));
    out.push(' ');
    write_term(out, r, settings, right_max);
}

fn write_binder(
    out: &mut String,
    quantifier: &Sym,
    separator: &str,
    mut binder: Term,
    mut body: Term,
    same: impl Fn(&Term) -> Option<(Term, Term)>,
    settings: &PrinterSettings,
) {
    out.push_str(settings.sym(quantifier));
    loop {
        write_atom(out, &binder, settings);
        match same(&body) {
            Some((next_binder, next_body)) => {
                out.push(' ');
                binder = next_binder;
                body = next_body;
            }
            None => break,
        }
    }
    out.push_str(separator);
    write_term(out, &body, settings, PREC_BINDER);
}

fn write_term(out: &mut String, t: &Term, settings: &PrinterSettings, max: u8) {
    let max = if settings.show_parentheses { 0 } else { max };
    let prec = term_prec(t);
    let parens = prec > max && prec > 0;
    if parens {
        out.push('(');
    }
    if t.is_truth() {
        out.push_str(settings.sym(&TRUTH));
    } else if t.is_falsity() {
        out.push_str(settings.sym(&FALSITY));
    } else if t.is_atomic() {
        write_atom(out, t, settings);
    } else if let Some((l, r)) = t.unpack_iff() {
        write_infix(out, l, &IFF, r, PREC_IFF, true, settings);
    } else if let Some((l, r)) = t.unpack_equal() {
        write_infix(out, l, &EQUAL, r, PREC_EQUAL, false, settings);
    } else if let Some(q) = t.unpack_not() {
        // ¬(l = r) prints as l ≠ r unless parentheses are forced.
        match q.unpack_equal() {
            Some((l, r)) if !q.is_iff() && !settings.show_parentheses => {
                write_infix(out, l, &DISTINCT, r, PREC_EQUAL, false, settings);
            }
            _ => {
                out.push_str(settings.sym(&NOT));
                write_term(out, q, settings, PREC_NOT);
            }
        }
    } else if let Some((l, r)) = t.unpack_and() {
        write_infix(out, l, &AND, r, PREC_AND, true, settings);
    } else if let Some((l, r)) = t.unpack_or() {
        write_infix(out, l, &OR, r, PREC_OR, true, settings);
    } else if let Some((l, r)) = t.unpack_implies() {
        write_infix(out, l, &IMPLIES, r, PREC_IMPLIES, true, settings);
    } else if let Some((binder, body)) = t.unpack_forall() {
        write_binder(out, &FORALL, ", ", binder, body, |b| b.unpack_forall(), settings);
    } else if let Some((binder, body)) = t.unpack_exists() {
        write_binder(out, &EXISTS, ", ", binder, body, |b| b.unpack_exists(), settings);
    } else if let Some((binder, body)) = t.unpack_exists1() {
        write_binder(out, &EXISTS1, ", ", binder, body, |b| b.unpack_exists1(), settings);
    } else if t.is_abstraction() {
        if let Some((binder, body)) = t.unpack_abstraction() {
            out.push_str(settings.sym(&LAMBDA));
            let mut sep = String::from(" ");
            sep.push_str(settings.sym(&MAPS_TO));
            sep.push(' ');
            write_binder(
                out,
                &Sym { ascii: "", unicode: "" },
                &sep,
                binder,
                body,
                |b| {
                    if b.is_abstraction() {
                        b.unpack_abstraction()
                    } else {
                        None
                    }
                },
                settings,
            );
        }
    } else if let Some((fun, arg)) = t.unpack_application() {
        write_term(out, fun, settings, PREC_APPLICATION);
        out.push(' ');
        write_term(out, arg, settings, PREC_APPLICATION - 1);
    }
    if parens {
        out.push(')');
    }
}

/// Serializes a sequent: sorted hypotheses, turnstile, conclusion.
pub fn sequent_to_string(s: &Sequent, settings: &PrinterSettings) -> String {
    let mut out = String::new();
    let hypotheses = s.sorted_hypotheses();
    for (i, h) in hypotheses.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        write_term(&mut out, h, settings, PREC_BINDER);
    }
    if !hypotheses.is_empty() {
        out.push(' ');
    }
    out.push_str(settings.sym(&TURNSTILE));
    out.push(' ');
    write_term(&mut out, s.conclusion(), settings, PREC_BINDER);
    out
}

/// Serializes an extension.
pub fn extension_to_string(ext: &Extension, settings: &PrinterSettings) -> String {
    let mut out = String::new();
    match ext {
        Extension::NewTypeConstructor(tc) => {
            let _ = write!(out, "type_constructor {} {}", tc.id(), tc.arity());
            if let Some(assoc) = tc.associativity() {
                let _ = write!(out, " {}", assoc);
            }
        }
        Extension::NewConstant(constant) => {
            out.push_str("constant ");
            write_atom(&mut out, constant, settings);
        }
        Extension::NewAxiom { name, formula } => {
            out.push_str("axiom ");
            write_named_body(&mut out, name, formula, settings);
        }
        Extension::NewDefinition { equation } => {
            out.push_str("definition ");
            if let Some((lhs, rhs)) = equation.unpack_equal() {
                write_atom(&mut out, lhs, settings);
                let _ = write!(out, " {} ", settings.sym(&DEFINED_AS));
                out.push_str(&term_body(rhs, settings));
            } else {
                out.push_str(&equation.dump());
            }
        }
        Extension::NewTheorem { name, sequent } => {
            out.push_str("theorem ");
            write_named_body(&mut out, name, sequent.conclusion(), settings);
        }
        Extension::NewTypeAlias { native, ty, spec } => {
            let _ = write!(out, "type_alias {} {}", native, type_body(ty, settings));
            if let Some(spec) = spec {
                let _ = write!(out, " {}", spec);
            }
        }
        Extension::NewTypeSpec { spec } => {
            let _ = write!(out, "type_spec {}", spec);
        }
    }
    out
}

fn write_named_body(out: &mut String, name: &Term, body: &Term, settings: &PrinterSettings) {
    let show_id = name.id().map_or(false, |id| {
        settings.show_generated_ids || !settings.is_generated(id.as_str())
    });
    if show_id {
        if let Some(id) = name.id() {
            out.push_str(id.as_str());
        }
        let _ = write!(out, " {} ", settings.sym(&DEFINED_AS));
    }
    out.push_str(&term_body(body, settings));
}

/// Serializes a theory: its extensions, one per line, bracketed.
pub fn theory_to_string(thy: &Theory, settings: &PrinterSettings) -> String {
    let mut out = String::from("begin theory\n");
    for ext in thy.extensions() {
        out.push_str(&extension_to_string(ext, settings));
        out.push('\n');
    }
    out.push_str("end theory");
    out
}
