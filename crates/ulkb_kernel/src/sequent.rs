//! The sequent layer.
//!
//! A sequent `𝛤 ⊢ t` asserts that the set of hypotheses `𝛤` entails the
//! conclusion `t`. Sequents are immutable and can only be produced by
//! rule application (`crate::rule` and the derived rules built on it);
//! there is no public constructor.
//!
//! When proof recording is enabled (the default), every sequent carries
//! a certificate naming the rule that produced it and the certificates
//! of its premises.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rustc_hash::FxHashSet;

use crate::term::Term;
use crate::ty::Type;

static RECORD_PROOFS: AtomicBool = AtomicBool::new(true);

/// Toggles proof recording for sequents constructed afterwards.
///
/// Recording is never observed by sequent equality.
pub fn set_recording(on: bool) {
    RECORD_PROOFS.store(on, Ordering::Relaxed);
}

/// Whether proof recording is currently enabled.
pub fn recording() -> bool {
    RECORD_PROOFS.load(Ordering::Relaxed)
}

/// A non-sequent argument recorded in a proof step.
#[derive(Clone, Debug)]
pub enum ProofArg {
    /// Certificate of a premise sequent (`None` if that premise was
    /// constructed while recording was off).
    Premise(Option<Arc<Proof>>),
    /// A term argument (assumed formula, reflexivity subject, binder…).
    Term(Term),
    /// A type-variable instantiation, sorted by variable.
    TypeInstantiation(Vec<(Type, Type)>),
    /// A free-variable substitution, sorted by variable.
    Substitution(Vec<(Term, Term)>),
}

/// A tree-shaped proof certificate: the producing rule plus its
/// arguments, premises appearing recursively.
#[derive(Clone, Debug)]
pub struct Proof {
    rule: &'static str,
    args: Vec<ProofArg>,
}

impl Proof {
    /// Name of the rule that produced the sequent.
    pub fn rule(&self) -> &'static str {
        self.rule
    }

    /// The rule's recorded arguments.
    pub fn args(&self) -> &[ProofArg] {
        &self.args
    }

    /// The number of leaves (steps without premise arguments) in the
    /// certificate, counting unrecorded premises as leaves.
    pub fn leaves(&self) -> usize {
        let mut premises = 0;
        let mut total = 0;
        for arg in &self.args {
            if let ProofArg::Premise(premise) = arg {
                premises += 1;
                total += premise.as_ref().map_or(1, |p| p.leaves());
            }
        }
        if premises == 0 {
            1
        } else {
            total
        }
    }
}

/// A hypothetical assertion `𝛤 ⊢ t`.
///
/// Hypotheses collapse under structural (α-)equality; equality and
/// hashing use `(hypotheses, conclusion)` only.
#[derive(Clone)]
pub struct Sequent {
    hypotheses: FxHashSet<Term>,
    conclusion: Term,
    proof: Option<Arc<Proof>>,
}

impl Sequent {
    /// Seals a rule application into a sequent. Only rule constructors
    /// call this.
    pub(crate) fn derive(
        rule: &'static str,
        hypotheses: FxHashSet<Term>,
        conclusion: Term,
        args: Vec<ProofArg>,
    ) -> Sequent {
        let proof = if recording() {
            Some(Arc::new(Proof { rule, args }))
        } else {
            None
        };
        Sequent {
            hypotheses,
            conclusion,
            proof,
        }
    }

    pub fn hypotheses(&self) -> &FxHashSet<Term> {
        &self.hypotheses
    }

    /// Hypotheses in a deterministic order, for display.
    pub fn sorted_hypotheses(&self) -> Vec<Term> {
        let mut out: Vec<Term> = self.hypotheses.iter().cloned().collect();
        out.sort();
        out
    }

    pub fn conclusion(&self) -> &Term {
        &self.conclusion
    }

    /// The proof certificate, if recording was on when the sequent was
    /// derived.
    pub fn proof(&self) -> Option<&Arc<Proof>> {
        self.proof.as_ref()
    }

    pub(crate) fn proof_arg(&self) -> ProofArg {
        ProofArg::Premise(self.proof.clone())
    }

    /// Raw s-expression dump, used for digests and `Display`.
    pub fn dump(&self) -> String {
        let mut out = String::from("(Sequent");
        for h in self.sorted_hypotheses() {
            out.push(' ');
            out.push_str(&h.dump());
        }
        out.push(' ');
        out.push_str(&self.conclusion.dump());
        out.push(')');
        out
    }
}

impl PartialEq for Sequent {
    fn eq(&self, other: &Self) -> bool {
        self.conclusion == other.conclusion && self.hypotheses == other.hypotheses
    }
}

impl Eq for Sequent {}

impl Hash for Sequent {
    fn hash<H: Hasher>(&self, state: &mut H) {
        // Order-independent combination of the hypothesis hashes.
        let mut acc: u64 = 0;
        for h in &self.hypotheses {
            let mut hasher = rustc_hash::FxHasher::default();
            h.hash(&mut hasher);
            acc ^= hasher.finish();
        }
        state.write_u64(acc);
        self.conclusion.hash(state);
    }
}

impl fmt::Display for Sequent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.dump())
    }
}

impl fmt::Debug for Sequent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.dump())
    }
}
