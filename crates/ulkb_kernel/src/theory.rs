//! The theory: an ordered, append-only log of extensions.
//!
//! A [`Theory`] records every step of the logic development so far and
//! maintains incremental per-kind indices over the log. All mutation
//! flows through [`Theory::extend`] and [`Theory::reset`]; within one
//! theory the observable order of extensions is insertion order.
//!
//! Multiple theories can coexist. The [`current`] module offers a
//! task-local stack of shared handles as thin sugar for the common case
//! of one ambient theory.

use std::cell::RefCell;

use log::debug;
use regex::Regex;
use rustc_hash::{FxHashMap, FxHashSet};
use ulkb_base::digest::hex_digest;
use ulkb_base::Symbol;

use crate::error::{Error, ExtensionError, LookupError};
use crate::extension::{Extension, ExtensionKind};
use crate::formula::{self, definiens};
use crate::rule;
use crate::sequent::Sequent;
use crate::settings::TheorySettings;
use crate::term::Term;
use crate::ty::{bool_type, Type, TypeConstructor, BOOL_CONSTRUCTOR, FUN_CONSTRUCTOR};

/// Where [`Theory::reset`] rolls back to.
#[derive(Clone, Debug)]
pub enum ResetPoint<'a> {
    /// Back to the end of the prelude.
    Prelude,
    /// Drop everything at index `n` and after.
    Index(usize),
    /// Drop the last `k` extensions.
    Last(usize),
    /// Drop from the extension introducing `id` on.
    Id(&'a str),
}

/// Filter for [`Theory::enumerate_extensions`].
#[derive(Default)]
pub struct ExtensionQuery {
    offset: Option<usize>,
    limit: Option<usize>,
    id: Option<Regex>,
    kind: Option<ExtensionKind>,
    mention_constants: FxHashSet<Term>,
    mention_type_constructors: FxHashSet<TypeConstructor>,
}

impl ExtensionQuery {
    pub fn new() -> Self {
        ExtensionQuery::default()
    }

    /// Start index; defaults to the theory's prelude offset.
    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Maximum number of results.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Keep only extensions whose id matches `re` at the start.
    pub fn id_regex(mut self, re: Regex) -> Self {
        self.id = Some(re);
        self
    }

    /// Keep only extensions of the given kind.
    pub fn kind(mut self, kind: ExtensionKind) -> Self {
        self.kind = Some(kind);
        self
    }

    /// Keep only extensions mentioning some constant or type
    /// constructor of `expr`.
    pub fn mentioning_term(mut self, expr: &Term) -> Self {
        self.mention_constants
            .extend(expr.constants().iter().cloned());
        self.mention_type_constructors
            .extend(expr.type_constructors().iter().cloned());
        self
    }

    /// Keep only extensions mentioning some type constructor of `ty`.
    pub fn mentioning_type(mut self, ty: &Type) -> Self {
        self.mention_type_constructors
            .extend(ty.type_constructors().iter().cloned());
        self
    }

    fn admits(&self, ext: &Extension) -> bool {
        if let Some(re) = &self.id {
            let matched = ext
                .id()
                .is_some_and(|id| re.find(id.as_str()).is_some_and(|m| m.start() == 0));
            if !matched {
                return false;
            }
        }
        if let Some(kind) = self.kind {
            if ext.kind() != kind {
                return false;
            }
        }
        if !self.mention_constants.is_empty() {
            let mentioned = ext.terms().iter().any(|t| {
                t.constants()
                    .iter()
                    .any(|c| self.mention_constants.contains(c))
            });
            if !mentioned {
                return false;
            }
        }
        if !self.mention_type_constructors.is_empty() {
            let in_terms = ext.terms().iter().any(|t| {
                t.type_constructors()
                    .iter()
                    .any(|tc| self.mention_type_constructors.contains(tc))
            });
            let in_types = ext.types().iter().any(|ty| {
                ty.type_constructors()
                    .iter()
                    .any(|tc| self.mention_type_constructors.contains(tc))
            });
            let own = ext
                .as_type_constructor()
                .is_some_and(|tc| self.mention_type_constructors.contains(tc));
            if !in_terms && !in_types && !own {
                return false;
            }
        }
        true
    }
}

/// The state of the logic development so far.
pub struct Theory {
    args: Vec<Extension>,
    prelude_offset: usize,
    ids: FxHashMap<Symbol, usize>,
    type_constructors: FxHashMap<Symbol, TypeConstructor>,
    constants: FxHashMap<Symbol, Term>,
    axioms: FxHashMap<Symbol, Sequent>,
    definitions: FxHashMap<Symbol, Sequent>,
    theorems: FxHashMap<Symbol, Sequent>,
    type_aliases: FxHashMap<Symbol, Type>,
    type_alias_specs: FxHashMap<Symbol, Symbol>,
    type_specs: FxHashSet<Symbol>,
    digest: RefCell<Option<String>>,
    settings: TheorySettings,
}

impl Theory {
    /// A theory with the standard prelude installed: `bool`, `fun`,
    /// `equal`, and the defined logical constants.
    pub fn new() -> Theory {
        let mut thy = Theory::empty();
        thy.install_prelude()
            .expect("prelude construction is well-typed");
        thy.prelude_offset = thy.args.len();
        thy
    }

    /// A theory with no prelude (`prelude_offset` 0).
    pub fn empty() -> Theory {
        Theory {
            args: Vec::new(),
            prelude_offset: 0,
            ids: FxHashMap::default(),
            type_constructors: FxHashMap::default(),
            constants: FxHashMap::default(),
            axioms: FxHashMap::default(),
            definitions: FxHashMap::default(),
            theorems: FxHashMap::default(),
            type_aliases: FxHashMap::default(),
            type_alias_specs: FxHashMap::default(),
            type_specs: FxHashSet::default(),
            digest: RefCell::new(None),
            settings: TheorySettings::default(),
        }
    }

    fn install_prelude(&mut self) -> Result<(), Error> {
        self.extend(Extension::new_type_constructor(BOOL_CONSTRUCTOR.clone()))?;
        self.extend(Extension::new_type_constructor(FUN_CONSTRUCTOR.clone()))?;
        self.extend(Extension::new_constant(formula::EQUAL.clone())?)?;
        self.new_definition("true", &definiens::truth()?)?;
        self.new_definition("and", &definiens::and()?)?;
        self.new_definition("implies", &definiens::implies()?)?;
        self.new_definition("forall", &definiens::forall()?)?;
        self.new_definition("false", &definiens::falsity()?)?;
        self.new_definition("not", &definiens::not()?)?;
        self.new_definition("or", &definiens::or()?)?;
        self.new_definition("exists", &definiens::exists()?)?;
        self.new_definition("exists1", &definiens::exists1()?)?;
        self.extend(Extension::new_type_alias("bool", bool_type(), None))?;
        Ok(())
    }

    // -- State accessors ---------------------------------------------------

    /// The extension log, in insertion order.
    pub fn extensions(&self) -> &[Extension] {
        &self.args
    }

    /// Start index of non-prelude extensions.
    pub fn prelude_offset(&self) -> usize {
        self.prelude_offset
    }

    /// Extensions added after the prelude.
    pub fn extensions_no_prelude(&self) -> &[Extension] {
        &self.args[self.prelude_offset..]
    }

    pub fn len(&self) -> usize {
        self.args.len()
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    pub fn settings(&self) -> &TheorySettings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut TheorySettings {
        &mut self.settings
    }

    /// SHA-256 hex digest of the extension log, cached until the next
    /// mutation.
    pub fn digest(&self) -> String {
        if let Some(digest) = self.digest.borrow().as_ref() {
            return digest.clone();
        }
        let digest = hex_digest(&self.dump());
        *self.digest.borrow_mut() = Some(digest.clone());
        digest
    }

    /// Raw s-expression dump of the extension log.
    pub fn dump(&self) -> String {
        let mut out = String::from("(Theory");
        for ext in &self.args {
            out.push(' ');
            out.push_str(&ext.dump());
        }
        out.push(')');
        out
    }

    // -- Extending ---------------------------------------------------------

    /// Adds an extension, validating it against the current state.
    ///
    /// Returns the extension's index in the log. A structurally
    /// identical re-insertion is a silent no-op returning the existing
    /// index, unless `strict_duplicates` is set.
    pub fn extend(&mut self, ext: Extension) -> Result<usize, ExtensionError> {
        if let Some(index) = self.args.iter().position(|existing| *existing == ext) {
            if self.settings.strict_duplicates {
                return Err(ExtensionError::new(
                    ext.variant_name(),
                    format!("extension '{}' already exists", id_or_dump(&ext)),
                ));
            }
            debug!("extend: duplicate of #{}, merged", index);
            return Ok(index);
        }
        if let Some(id) = ext.id() {
            if self.ids.contains_key(&id) {
                return Err(ExtensionError::new(
                    ext.variant_name(),
                    format!("extension '{}' already exists", id),
                ));
            }
        }
        match &ext {
            Extension::NewTypeConstructor(_) => {}
            Extension::NewConstant(constant) => {
                self.check_types_declared(&ext, constant.type_constructors())?;
            }
            Extension::NewAxiom { formula, .. } => {
                self.check_types_declared(&ext, formula.type_constructors())?;
            }
            Extension::NewDefinition { equation } => {
                self.check_types_declared(&ext, equation.type_constructors())?;
                let Some((_, rhs)) = equation.unpack_equal() else {
                    return Err(ExtensionError::new(
                        ext.variant_name(),
                        "not a definitional equation",
                    ));
                };
                self.check_constants_declared(&ext, rhs)?;
            }
            Extension::NewTheorem { sequent, .. } => {
                for h in sequent.hypotheses() {
                    self.check_types_declared(&ext, h.type_constructors())?;
                }
                self.check_types_declared(&ext, sequent.conclusion().type_constructors())?;
            }
            Extension::NewTypeAlias { ty, spec, .. } => {
                self.check_types_declared(&ext, ty.type_constructors())?;
                if let Some(spec) = spec {
                    if !self.type_specs.contains(spec) {
                        return Err(ExtensionError::new(
                            ext.variant_name(),
                            format!("undefined type alias spec '{}'", spec),
                        ));
                    }
                }
            }
            Extension::NewTypeSpec { .. } => {}
        }
        self.index_extension(&ext)?;
        debug!("extend: #{} {}", self.args.len(), ext.variant_name());
        self.args.push(ext);
        self.reset_digest();
        Ok(self.args.len() - 1)
    }

    fn check_types_declared(
        &self,
        ext: &Extension,
        used: &FxHashSet<TypeConstructor>,
    ) -> Result<(), ExtensionError> {
        let mut undefined: Vec<String> = used
            .iter()
            .filter(|tc| {
                self.type_constructors
                    .get(&tc.id())
                    .map_or(true, |declared| declared != *tc)
            })
            .map(|tc| format!("'{}'", tc.id()))
            .collect();
        if undefined.is_empty() {
            return Ok(());
        }
        undefined.sort();
        let noun = if undefined.len() == 1 {
            "undefined type constructor"
        } else {
            "undefined type constructors"
        };
        Err(ExtensionError::new(
            ext.variant_name(),
            format!("{} {}", noun, undefined.join(", ")),
        ))
    }

    fn check_constants_declared(
        &self,
        ext: &Extension,
        term: &Term,
    ) -> Result<(), ExtensionError> {
        for c in term.constants() {
            let declared = c.id().and_then(|id| self.constants.get(&id));
            let matches = declared.is_some_and(|d| d.ty().matches(c.ty()));
            if !matches {
                return Err(ExtensionError::new(
                    ext.variant_name(),
                    format!("undefined constant '{}'", c),
                ));
            }
        }
        Ok(())
    }

    /// Updates the per-kind indices for `ext`, including the implicit
    /// constant synthesized by axioms, definitions, and theorems.
    fn index_extension(&mut self, ext: &Extension) -> Result<(), ExtensionError> {
        match ext {
            Extension::NewTypeConstructor(tc) => {
                self.type_constructors.insert(tc.id(), tc.clone());
            }
            Extension::NewConstant(constant) => {
                if let Some(id) = constant.id() {
                    self.constants.insert(id, constant.clone());
                }
            }
            Extension::NewAxiom { name, formula } => {
                let sealed = rule::axiom(formula).map_err(|err| {
                    ExtensionError::new(ext.variant_name(), err.reason)
                })?;
                if let Some(id) = name.id() {
                    self.constants.insert(id, name.clone());
                    self.axioms.insert(id, sealed);
                }
            }
            Extension::NewDefinition { equation } => {
                let Some((lhs, rhs)) = equation.unpack_equal() else {
                    return Err(ExtensionError::new(
                        ext.variant_name(),
                        "not a definitional equation",
                    ));
                };
                let Some(id) = lhs.id() else {
                    return Err(ExtensionError::new(
                        ext.variant_name(),
                        "not a definitional equation",
                    ));
                };
                let constant = Term::constant(id.as_str(), lhs.ty());
                let eq = formula::equal(&constant, rhs)
                    .map_err(|err| ExtensionError::new(ext.variant_name(), err.reason))?;
                let defining = rule::axiom(&eq)
                    .map_err(|err| ExtensionError::new(ext.variant_name(), err.reason))?;
                self.constants.insert(id, constant);
                self.definitions.insert(id, defining);
            }
            Extension::NewTheorem { name, sequent } => {
                if let Some(id) = name.id() {
                    self.constants.insert(id, name.clone());
                    self.theorems.insert(id, sequent.clone());
                }
            }
            Extension::NewTypeAlias { native, ty, spec } => {
                self.type_aliases.insert(*native, ty.clone());
                if let Some(spec) = spec {
                    self.type_alias_specs.insert(*native, *spec);
                }
            }
            Extension::NewTypeSpec { spec } => {
                self.type_specs.insert(*spec);
            }
        }
        if let Some(id) = ext.id() {
            self.ids.insert(id, self.args.len());
        }
        Ok(())
    }

    /// Removes `ext` from the per-kind indices; the reverse of
    /// `index_extension`.
    fn unindex_extension(&mut self, ext: &Extension) {
        match ext {
            Extension::NewTypeConstructor(tc) => {
                self.type_constructors.remove(&tc.id());
            }
            Extension::NewConstant(constant) => {
                if let Some(id) = constant.id() {
                    self.constants.remove(&id);
                }
            }
            Extension::NewAxiom { name, .. } => {
                if let Some(id) = name.id() {
                    self.constants.remove(&id);
                    self.axioms.remove(&id);
                }
            }
            Extension::NewDefinition { equation } => {
                if let Some(id) = equation.unpack_equal().and_then(|(lhs, _)| lhs.id()) {
                    self.constants.remove(&id);
                    self.definitions.remove(&id);
                }
            }
            Extension::NewTheorem { name, .. } => {
                if let Some(id) = name.id() {
                    self.constants.remove(&id);
                    self.theorems.remove(&id);
                }
            }
            Extension::NewTypeAlias { native, .. } => {
                self.type_aliases.remove(native);
                self.type_alias_specs.remove(native);
            }
            Extension::NewTypeSpec { spec } => {
                self.type_specs.remove(spec);
            }
        }
        if let Some(id) = ext.id() {
            self.ids.remove(&id);
        }
    }

    fn reset_digest(&self) {
        *self.digest.borrow_mut() = None;
    }

    // -- Commands ----------------------------------------------------------

    /// Adds a new base type (arity-0 constructor) and returns the type.
    pub fn new_base_type(&mut self, id: &str) -> Result<Type, Error> {
        let tc = self.new_type_constructor(id, 0, None)?;
        tc.apply(&[]).map_err(Error::from)
    }

    /// Adds a new type constructor.
    pub fn new_type_constructor(
        &mut self,
        id: &str,
        arity: usize,
        associativity: Option<crate::ty::Associativity>,
    ) -> Result<TypeConstructor, Error> {
        let tc = TypeConstructor::new(id, arity, associativity);
        self.extend(Extension::new_type_constructor(tc.clone()))?;
        Ok(tc)
    }

    /// Adds a new constant.
    pub fn new_constant(&mut self, id: &str, ty: &Type) -> Result<Term, Error> {
        let constant = Term::constant(id, ty);
        self.extend(Extension::new_constant(constant.clone())?)?;
        Ok(constant)
    }

    /// Adds a new named axiom and returns its sealed sequent.
    pub fn new_axiom(&mut self, id: &str, formula: &Term) -> Result<Sequent, Error> {
        let name = Term::constant(id, &bool_type());
        self.extend(Extension::new_axiom(name, formula.clone())?)?;
        self.lookup_axiom(id).cloned().map_err(Error::from)
    }

    /// Adds an axiom named by a generated id
    /// (`<generated_id_prefix><digest of the formula>`).
    pub fn new_axiom_unnamed(&mut self, formula: &Term) -> Result<Sequent, Error> {
        let id = self.generated_id(formula);
        self.new_axiom(&id, formula)
    }

    /// Adds a new definition `id = definiens` and returns the new
    /// constant.
    ///
    /// The definiens must be closed and its type variables must occur
    /// in the constant's type; the id must be fresh.
    pub fn new_definition(&mut self, id: &str, definiens: &Term) -> Result<Term, Error> {
        let lhs = Term::variable(id, definiens.ty());
        let equation = formula::equal(&lhs, definiens)?;
        self.extend(Extension::new_definition(equation)?)?;
        self.lookup_constant(id).cloned().map_err(Error::from)
    }

    /// Records a proved sequent under a new name.
    pub fn new_theorem(&mut self, id: &str, sequent: &Sequent) -> Result<Sequent, Error> {
        let name = Term::constant(id, &bool_type());
        self.extend(Extension::new_theorem(name, sequent.clone())?)?;
        self.lookup_theorem(id).cloned().map_err(Error::from)
    }

    /// Records a proved sequent under a generated name.
    pub fn new_theorem_unnamed(&mut self, sequent: &Sequent) -> Result<Sequent, Error> {
        let id = format!(
            "{}{}",
            self.settings.generated_id_prefix,
            hex_digest(&sequent.dump())
        );
        self.new_theorem(&id, sequent)
    }

    /// Adds a native type alias (pure notation).
    pub fn new_type_alias(
        &mut self,
        native: &str,
        ty: &Type,
        spec: Option<&str>,
    ) -> Result<(), Error> {
        self.extend(Extension::new_type_alias(native, ty.clone(), spec))?;
        Ok(())
    }

    /// Declares a type specification name (pure notation).
    pub fn new_type_spec(&mut self, spec: &str) -> Result<(), Error> {
        self.extend(Extension::new_type_spec(spec))?;
        Ok(())
    }

    fn generated_id(&self, term: &Term) -> String {
        format!(
            "{}{}",
            self.settings.generated_id_prefix,
            hex_digest(&term.dump())
        )
    }

    /// Whether `id` carries the generated-id prefix.
    pub fn is_generated_id(&self, id: &str) -> bool {
        !self.settings.generated_id_prefix.is_empty()
            && id.starts_with(&self.settings.generated_id_prefix)
    }

    // -- Resetting ---------------------------------------------------------

    /// Rolls the theory back to the state immediately before `point`,
    /// un-indexing dropped extensions in reverse order. Returns the
    /// number of extensions removed.
    pub fn reset(&mut self, point: ResetPoint<'_>) -> Result<usize, LookupError> {
        let start = match point {
            ResetPoint::Prelude => self.prelude_offset,
            ResetPoint::Index(n) => n,
            ResetPoint::Last(k) => self.args.len().saturating_sub(k),
            ResetPoint::Id(id) => {
                let sym = Symbol::intern(id);
                *self
                    .ids
                    .get(&sym)
                    .ok_or_else(|| LookupError::new("extension", id))?
            }
        };
        if start < self.prelude_offset {
            self.prelude_offset = start;
        }
        let n = self.args.len();
        while self.args.len() > start {
            if let Some(ext) = self.args.pop() {
                self.unindex_extension(&ext);
            }
        }
        if n > start {
            debug!("reset: dropped {} extension(s)", n - start);
            self.reset_digest();
        }
        Ok(n.saturating_sub(start))
    }

    // -- Querying ----------------------------------------------------------

    /// Iterates `(index, extension)` pairs matching `query`, starting at
    /// the query's offset (default: the prelude offset).
    pub fn enumerate_extensions<'a>(
        &'a self,
        query: &'a ExtensionQuery,
    ) -> impl Iterator<Item = (usize, &'a Extension)> + 'a {
        let offset = query.offset.unwrap_or(self.prelude_offset);
        self.args
            .iter()
            .enumerate()
            .skip(offset)
            .filter(move |(_, ext)| query.admits(ext))
            .take(query.limit.unwrap_or(usize::MAX))
    }

    pub fn lookup_extension(&self, id: &str) -> Result<&Extension, LookupError> {
        self.find_extension(id)
            .ok_or_else(|| LookupError::new("extension", id))
    }

    pub fn find_extension(&self, id: &str) -> Option<&Extension> {
        let index = *self.ids.get(&Symbol::intern(id))?;
        self.args.get(index)
    }

    pub fn lookup_type_constructor(&self, id: &str) -> Result<&TypeConstructor, LookupError> {
        self.find_type_constructor(id)
            .ok_or_else(|| LookupError::new("type constructor", id))
    }

    pub fn find_type_constructor(&self, id: &str) -> Option<&TypeConstructor> {
        self.type_constructors.get(&Symbol::intern(id))
    }

    pub fn lookup_constant(&self, id: &str) -> Result<&Term, LookupError> {
        self.find_constant(id)
            .ok_or_else(|| LookupError::new("constant", id))
    }

    pub fn find_constant(&self, id: &str) -> Option<&Term> {
        self.constants.get(&Symbol::intern(id))
    }

    pub fn lookup_axiom(&self, id: &str) -> Result<&Sequent, LookupError> {
        self.find_axiom(id)
            .ok_or_else(|| LookupError::new("axiom", id))
    }

    pub fn find_axiom(&self, id: &str) -> Option<&Sequent> {
        self.axioms.get(&Symbol::intern(id))
    }

    /// The defining equation `⊢ c = definiens` of constant `id`.
    pub fn lookup_definition(&self, id: &str) -> Result<&Sequent, LookupError> {
        self.find_definition(id)
            .ok_or_else(|| LookupError::new("definition", id))
    }

    pub fn find_definition(&self, id: &str) -> Option<&Sequent> {
        self.definitions.get(&Symbol::intern(id))
    }

    pub fn lookup_theorem(&self, id: &str) -> Result<&Sequent, LookupError> {
        self.find_theorem(id)
            .ok_or_else(|| LookupError::new("theorem", id))
    }

    pub fn find_theorem(&self, id: &str) -> Option<&Sequent> {
        self.theorems.get(&Symbol::intern(id))
    }

    pub fn lookup_type_alias(&self, native: &str) -> Result<&Type, LookupError> {
        self.find_type_alias(native)
            .ok_or_else(|| LookupError::new("type alias", native))
    }

    pub fn find_type_alias(&self, native: &str) -> Option<&Type> {
        self.type_aliases.get(&Symbol::intern(native))
    }

    pub fn lookup_type_alias_spec(&self, native: &str) -> Result<Symbol, LookupError> {
        self.find_type_alias_spec(native)
            .ok_or_else(|| LookupError::new("type alias spec", native))
    }

    pub fn find_type_alias_spec(&self, native: &str) -> Option<Symbol> {
        self.type_alias_specs.get(&Symbol::intern(native)).copied()
    }
}

impl Default for Theory {
    fn default() -> Self {
        Theory::new()
    }
}

fn id_or_dump(ext: &Extension) -> String {
    ext.id()
        .map(|id| id.as_str().to_owned())
        .unwrap_or_else(|| ext.dump())
}

/// Task-local current-theory stack.
///
/// Thin sugar over explicit [`Theory`] handles: `push` makes a theory
/// current for this thread, [`Scope`] pops on drop, and [`with`] runs a
/// closure against the top of the stack, creating a fresh prelude
/// theory if the stack is empty. Theories are never shared between
/// threads through this stack.
pub mod current {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::Theory;

    thread_local! {
        static STACK: RefCell<Vec<Rc<RefCell<Theory>>>> = const { RefCell::new(Vec::new()) };
    }

    /// Pushes `theory`, making it current; returns its shared handle.
    pub fn push(theory: Theory) -> Rc<RefCell<Theory>> {
        let handle = Rc::new(RefCell::new(theory));
        STACK.with(|stack| stack.borrow_mut().push(handle.clone()));
        handle
    }

    /// Pops the current theory, if any.
    pub fn pop() -> Option<Rc<RefCell<Theory>>> {
        STACK.with(|stack| stack.borrow_mut().pop())
    }

    /// Runs `f` against the current theory, pushing a fresh prelude
    /// theory first if the stack is empty.
    pub fn with<R>(f: impl FnOnce(&mut Theory) -> R) -> R {
        let handle = STACK.with(|stack| {
            let mut stack = stack.borrow_mut();
            if stack.is_empty() {
                stack.push(Rc::new(RefCell::new(Theory::new())));
            }
            stack
                .last()
                .cloned()
                .expect("stack was just made non-empty")
        });
        let mut theory = handle.borrow_mut();
        f(&mut theory)
    }

    /// RAII guard: pushes on construction, pops on drop. Supports
    /// nesting.
    pub struct Scope {
        handle: Rc<RefCell<Theory>>,
    }

    impl Scope {
        pub fn enter(theory: Theory) -> Scope {
            Scope {
                handle: push(theory),
            }
        }

        pub fn handle(&self) -> Rc<RefCell<Theory>> {
            self.handle.clone()
        }
    }

    impl Drop for Scope {
        fn drop(&mut self) {
            let _ = pop();
        }
    }

    // Command forms of the theory operations, applied to the current
    // theory.

    use crate::error::{Error, LookupError};
    use crate::extension::Extension;
    use crate::sequent::Sequent;
    use crate::term::Term;
    use crate::ty::{Associativity, Type, TypeConstructor};

    pub fn extend(ext: Extension) -> Result<usize, Error> {
        with(|thy| thy.extend(ext).map_err(Error::from))
    }

    pub fn new_base_type(id: &str) -> Result<Type, Error> {
        with(|thy| thy.new_base_type(id))
    }

    pub fn new_type_constructor(
        id: &str,
        arity: usize,
        associativity: Option<Associativity>,
    ) -> Result<TypeConstructor, Error> {
        with(|thy| thy.new_type_constructor(id, arity, associativity))
    }

    pub fn new_constant(id: &str, ty: &Type) -> Result<Term, Error> {
        with(|thy| thy.new_constant(id, ty))
    }

    pub fn new_axiom(id: &str, formula: &Term) -> Result<Sequent, Error> {
        with(|thy| thy.new_axiom(id, formula))
    }

    pub fn new_definition(id: &str, definiens: &Term) -> Result<Term, Error> {
        with(|thy| thy.new_definition(id, definiens))
    }

    pub fn new_theorem(id: &str, sequent: &Sequent) -> Result<Sequent, Error> {
        with(|thy| thy.new_theorem(id, sequent))
    }

    pub fn reset(point: super::ResetPoint<'_>) -> Result<usize, LookupError> {
        with(|thy| thy.reset(point))
    }

    pub fn lookup_constant(id: &str) -> Result<Term, LookupError> {
        with(|thy| thy.lookup_constant(id).cloned())
    }

    pub fn lookup_axiom(id: &str) -> Result<Sequent, LookupError> {
        with(|thy| thy.lookup_axiom(id).cloned())
    }

    pub fn lookup_definition(id: &str) -> Result<Sequent, LookupError> {
        with(|thy| thy.lookup_definition(id).cloned())
    }

    pub fn lookup_theorem(id: &str) -> Result<Sequent, LookupError> {
        with(|thy| thy.lookup_theorem(id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formula::{equal, truth};

    #[test]
    fn prelude_declares_the_logical_constants() {
        let thy = Theory::new();
        assert!(thy.prelude_offset() > 0);
        for id in [
            "equal", "true", "and", "implies", "forall", "false", "not", "or", "exists",
            "exists1",
        ] {
            assert!(thy.find_constant(id).is_some(), "missing constant {}", id);
        }
        assert!(thy.find_type_constructor("bool").is_some());
        assert!(thy.find_type_constructor("fun").is_some());
        assert!(thy.find_definition("true").is_some());
        assert_eq!(*thy.lookup_type_alias("bool").unwrap(), bool_type());
    }

    #[test]
    fn extend_rejects_duplicate_ids() {
        let mut thy = Theory::new();
        thy.new_base_type("ind").unwrap();
        let err = thy.new_base_type("ind").unwrap_err();
        match err {
            Error::Extension(err) => assert!(err.reason.contains("already exists")),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn extend_merges_structural_duplicates() {
        let mut thy = Theory::new();
        let before = thy.len();
        let first = thy
            .extend(Extension::new_type_constructor(TypeConstructor::new(
                "ind", 0, None,
            )))
            .unwrap();
        let again = thy
            .extend(Extension::new_type_constructor(TypeConstructor::new(
                "ind", 0, None,
            )))
            .unwrap();
        assert_eq!(first, again);
        assert_eq!(thy.len(), before + 1);
    }

    #[test]
    fn strict_duplicates_turns_merging_into_an_error() {
        let mut thy = Theory::new();
        thy.settings_mut().strict_duplicates = true;
        thy.new_base_type("ind").unwrap();
        let err = thy
            .extend(Extension::new_type_constructor(TypeConstructor::new(
                "ind", 0, None,
            )))
            .unwrap_err();
        assert!(err.reason.contains("already exists"));
    }

    #[test]
    fn constants_require_declared_type_constructors() {
        let mut thy = Theory::new();
        let nat = Type::base("nat");
        let err = thy.new_constant("zero", &nat).unwrap_err();
        match err {
            Error::Extension(err) => {
                assert!(err.reason.contains("undefined type constructor"))
            }
            other => panic!("unexpected error: {}", other),
        }
        thy.new_base_type("nat").unwrap();
        assert!(thy.new_constant("zero", &nat).is_ok());
    }

    #[test]
    fn definitions_require_declared_constants() {
        let mut thy = Theory::new();
        let ghost = Term::constant("ghost", &bool_type());
        let err = thy.new_definition("spooky", &ghost).unwrap_err();
        match err {
            Error::Extension(err) => assert!(err.reason.contains("undefined constant")),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn new_definition_returns_the_constant_and_indexes_the_equation() {
        let mut thy = Theory::new();
        let c = thy.new_definition("self_equal", &definiens::truth().unwrap()).unwrap();
        assert!(c.is_constant());
        assert_eq!(*c.ty(), bool_type());
        let defining = thy.lookup_definition("self_equal").unwrap();
        let (lhs, _) = defining.conclusion().unpack_equal().unwrap();
        assert_eq!(*lhs, c);
    }

    #[test]
    fn axioms_synthesize_their_name_constant() {
        let mut thy = Theory::new();
        let seq = thy.new_axiom("everything", &truth()).unwrap();
        assert!(seq.hypotheses().is_empty());
        assert!(seq.conclusion().is_truth());
        assert!(thy.find_constant("everything").is_some());
        assert!(thy.lookup_extension("everything").unwrap().is_new_axiom());
    }

    #[test]
    fn reset_unwinds_in_reverse_order() {
        let mut thy = Theory::new();
        let digest0 = thy.digest();
        thy.new_base_type("nat").unwrap();
        let digest1 = thy.digest();
        thy.new_constant("zero", &Type::base("nat")).unwrap();
        assert_ne!(thy.digest(), digest1);

        let removed = thy.reset(ResetPoint::Last(1)).unwrap();
        assert_eq!(removed, 1);
        assert!(thy.find_constant("zero").is_none());
        assert!(thy.find_type_constructor("nat").is_some());
        assert_eq!(thy.digest(), digest1);

        let removed = thy.reset(ResetPoint::Prelude).unwrap();
        assert_eq!(removed, 1);
        assert_eq!(thy.digest(), digest0);
    }

    #[test]
    fn reset_by_id_drops_from_that_extension_on() {
        let mut thy = Theory::new();
        thy.new_base_type("nat").unwrap();
        thy.new_constant("zero", &Type::base("nat")).unwrap();
        thy.new_constant("one", &Type::base("nat")).unwrap();
        let removed = thy.reset(ResetPoint::Id("zero")).unwrap();
        assert_eq!(removed, 2);
        assert!(thy.find_constant("zero").is_none());
        assert!(thy.find_constant("one").is_none());
        assert!(thy.find_type_constructor("nat").is_some());
        assert!(thy.reset(ResetPoint::Id("zero")).is_err());
    }

    #[test]
    fn reset_inside_prelude_lowers_the_offset() {
        let mut thy = Theory::new();
        let offset = thy.prelude_offset();
        thy.reset(ResetPoint::Index(offset - 1)).unwrap();
        assert_eq!(thy.prelude_offset(), offset - 1);
    }

    #[test]
    fn enumerate_filters_by_kind_id_and_mention() {
        let mut thy = Theory::new();
        thy.new_base_type("nat").unwrap();
        let nat = Type::base("nat");
        let zero = thy.new_constant("zero", &nat).unwrap();
        thy.new_constant("one", &nat).unwrap();
        thy.new_axiom("zero_exists", &equal(&zero, &zero).unwrap())
            .unwrap();

        let query = ExtensionQuery::new().kind(ExtensionKind::NewConstant);
        let found: Vec<_> = thy.enumerate_extensions(&query).collect();
        assert_eq!(found.len(), 2);

        let query = ExtensionQuery::new().id_regex(Regex::new("zero").unwrap());
        let found: Vec<_> = thy.enumerate_extensions(&query).collect();
        assert_eq!(found.len(), 2);

        let query = ExtensionQuery::new()
            .id_regex(Regex::new("zero").unwrap())
            .limit(1);
        let found: Vec<_> = thy.enumerate_extensions(&query).collect();
        assert_eq!(found.len(), 1);

        let query = ExtensionQuery::new().mentioning_term(&zero);
        let found: Vec<_> = thy.enumerate_extensions(&query).collect();
        // zero itself and the axiom mentioning it
        assert_eq!(found.len(), 2);
    }

    #[test]
    fn lookup_errors_name_the_target() {
        let thy = Theory::new();
        let err = thy.lookup_theorem("missing").unwrap_err();
        assert_eq!(err.to_string(), "no such theorem 'missing'");
    }

    #[test]
    fn current_theory_commands_delegate() {
        let _scope = current::Scope::enter(Theory::new());
        current::new_base_type("ord").unwrap();
        let ord = Type::base("ord");
        current::new_constant("bottom", &ord).unwrap();
        assert_eq!(*current::lookup_constant("bottom").unwrap().ty(), ord);
        current::reset(ResetPoint::Last(1)).unwrap();
        assert!(current::lookup_constant("bottom").is_err());
    }

    #[test]
    fn current_theory_stack_is_scoped() {
        let handle = current::push(Theory::new());
        current::with(|thy| {
            thy.new_base_type("nat").unwrap();
        });
        assert!(handle.borrow().find_type_constructor("nat").is_some());
        {
            let _scope = current::Scope::enter(Theory::new());
            current::with(|thy| {
                assert!(thy.find_type_constructor("nat").is_none());
            });
        }
        current::with(|thy| {
            assert!(thy.find_type_constructor("nat").is_some());
        });
        current::pop();
    }
}
