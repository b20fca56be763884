//! The type layer.
//!
//! Types are either type variables or applications of a
//! [`TypeConstructor`] to exactly `arity` argument types. Nodes are
//! hash-consed into a process-wide table, so structural equality is
//! pointer equality and sharing is maximal.
//!
//! Two constructors are distinguished: `bool` (arity 0), the type of
//! formulas, and `fun` (arity 2, right-associative), the function type.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Mutex, Weak};

use once_cell::sync::{Lazy, OnceCell};
use rustc_hash::{FxHashMap, FxHashSet, FxHasher};
use ulkb_base::Symbol;

use crate::error::ArgumentError;

/// Associativity of a 2-ary type constructor.
///
/// Affects only how variadic surface forms are folded into binary
/// applications; the stored shape is always binary.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Associativity {
    Left,
    Right,
}

impl fmt::Display for Associativity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Associativity::Left => f.write_str("left"),
            Associativity::Right => f.write_str("right"),
        }
    }
}

/// A type constructor: the building block of type applications.
///
/// Identity is `(id, arity)`; associativity is folding metadata only.
#[derive(Clone, Debug)]
pub struct TypeConstructor {
    id: Symbol,
    arity: usize,
    associativity: Option<Associativity>,
}

impl TypeConstructor {
    pub fn new(id: &str, arity: usize, associativity: Option<Associativity>) -> Self {
        TypeConstructor {
            id: Symbol::intern(id),
            arity,
            associativity,
        }
    }

    pub fn id(&self) -> Symbol {
        self.id
    }

    pub fn arity(&self) -> usize {
        self.arity
    }

    pub fn associativity(&self) -> Option<Associativity> {
        self.associativity
    }

    /// Applies the constructor to argument types.
    ///
    /// More than `arity` arguments are accepted for a 2-ary constructor
    /// with a declared associativity; they are folded into nested binary
    /// applications on that side.
    pub fn apply(&self, args: &[Type]) -> Result<Type, ArgumentError> {
        if args.len() == self.arity {
            return Ok(Type::intern(TypeKind::Application {
                head: self.clone(),
                args: args.to_vec(),
            }));
        }
        if self.arity == 2 && args.len() > 2 {
            match self.associativity {
                Some(Associativity::Left) => {
                    let mut acc = self.apply(&args[..2])?;
                    for arg in &args[2..] {
                        acc = self.apply(&[acc, arg.clone()])?;
                    }
                    return Ok(acc);
                }
                Some(Associativity::Right) => {
                    let mut acc = args[args.len() - 1].clone();
                    for arg in args[..args.len() - 1].iter().rev() {
                        acc = self.apply(&[arg.clone(), acc])?;
                    }
                    return Ok(acc);
                }
                None => {}
            }
        }
        let qtd = if args.len() < self.arity { "few" } else { "many" };
        Err(ArgumentError::new(
            "TypeApplication",
            format!(
                "too {} arguments: expected {}, got {}",
                qtd,
                self.arity,
                args.len()
            ),
        ))
    }

    pub(crate) fn dump(&self) -> String {
        match self.associativity {
            Some(assoc) => format!("(TypeConstructor {} {} {})", self.id, self.arity, assoc),
            None => format!("(TypeConstructor {} {})", self.id, self.arity),
        }
    }
}

impl PartialEq for TypeConstructor {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.arity == other.arity
    }
}

impl Eq for TypeConstructor {}

impl Hash for TypeConstructor {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
        self.arity.hash(state);
    }
}

impl PartialOrd for TypeConstructor {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TypeConstructor {
    fn cmp(&self, other: &Self) -> Ordering {
        self.id
            .cmp(&other.id)
            .then_with(|| self.arity.cmp(&other.arity))
    }
}

impl fmt::Display for TypeConstructor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.dump())
    }
}

/// The `bool` type constructor (arity 0).
pub static BOOL_CONSTRUCTOR: Lazy<TypeConstructor> =
    Lazy::new(|| TypeConstructor::new("bool", 0, None));

/// The `fun` type constructor (arity 2, right-associative).
pub static FUN_CONSTRUCTOR: Lazy<TypeConstructor> =
    Lazy::new(|| TypeConstructor::new("fun", 2, Some(Associativity::Right)));

static BOOL_TYPE: Lazy<Type> = Lazy::new(|| {
    Type::intern(TypeKind::Application {
        head: BOOL_CONSTRUCTOR.clone(),
        args: Vec::new(),
    })
});

/// The type of formulas.
pub fn bool_type() -> Type {
    BOOL_TYPE.clone()
}

/// The function type `domain -> codomain`.
pub fn function_type(domain: &Type, codomain: &Type) -> Type {
    Type::intern(TypeKind::Application {
        head: FUN_CONSTRUCTOR.clone(),
        args: vec![domain.clone(), codomain.clone()],
    })
}

/// A type-variable instantiation: type variables mapped to types.
pub type TypeInstantiation = FxHashMap<Type, Type>;

/// The shape of a type node.
#[derive(Debug)]
pub enum TypeKind {
    /// An arbitrary type, identified by name.
    Variable(Symbol),
    /// A constructor applied to exactly `head.arity()` types.
    Application { head: TypeConstructor, args: Vec<Type> },
}

struct TypeNode {
    kind: TypeKind,
    hash: u64,
    variables: OnceCell<FxHashSet<Type>>,
    constructors: OnceCell<FxHashSet<TypeConstructor>>,
}

/// A type expression. Cheap to clone; equality is pointer equality on
/// the interned node.
#[derive(Clone)]
pub struct Type(Arc<TypeNode>);

static TYPES: Lazy<Mutex<FxHashMap<u64, Vec<Weak<TypeNode>>>>> =
    Lazy::new(|| Mutex::new(FxHashMap::default()));

fn hash_kind(kind: &TypeKind) -> u64 {
    let mut hasher = FxHasher::default();
    match kind {
        TypeKind::Variable(id) => {
            0u8.hash(&mut hasher);
            id.hash(&mut hasher);
        }
        TypeKind::Application { head, args } => {
            1u8.hash(&mut hasher);
            head.hash(&mut hasher);
            for arg in args {
                arg.0.hash.hash(&mut hasher);
            }
        }
    }
    hasher.finish()
}

fn same_kind(a: &TypeKind, b: &TypeKind) -> bool {
    match (a, b) {
        (TypeKind::Variable(x), TypeKind::Variable(y)) => x == y,
        (
            TypeKind::Application { head: h1, args: a1 },
            TypeKind::Application { head: h2, args: a2 },
        ) => h1 == h2 && a1 == a2,
        _ => false,
    }
}

impl Type {
    /// A type variable.
    pub fn variable(id: &str) -> Type {
        Type::intern(TypeKind::Variable(Symbol::intern(id)))
    }

    /// A base type: the application of an arity-0 constructor named `id`.
    pub fn base(id: &str) -> Type {
        Type::intern(TypeKind::Application {
            head: TypeConstructor::new(id, 0, None),
            args: Vec::new(),
        })
    }

    pub(crate) fn intern(kind: TypeKind) -> Type {
        let hash = hash_kind(&kind);
        let mut table = TYPES.lock().expect("type table poisoned");
        let bucket = table.entry(hash).or_default();
        bucket.retain(|weak| weak.strong_count() > 0);
        for weak in bucket.iter() {
            if let Some(node) = weak.upgrade() {
                if same_kind(&node.kind, &kind) {
                    return Type(node);
                }
            }
        }
        let node = Arc::new(TypeNode {
            kind,
            hash,
            variables: OnceCell::new(),
            constructors: OnceCell::new(),
        });
        bucket.push(Arc::downgrade(&node));
        Type(node)
    }

    pub fn kind(&self) -> &TypeKind {
        &self.0.kind
    }

    pub fn is_type_variable(&self) -> bool {
        matches!(self.0.kind, TypeKind::Variable(_))
    }

    pub fn is_type_application(&self) -> bool {
        matches!(self.0.kind, TypeKind::Application { .. })
    }

    /// Tests for an application of an arity-0 constructor.
    pub fn is_base_type(&self) -> bool {
        matches!(&self.0.kind, TypeKind::Application { head, .. } if head.arity() == 0)
    }

    pub fn is_bool_type(&self) -> bool {
        matches!(&self.0.kind, TypeKind::Application { head, .. } if *head == *BOOL_CONSTRUCTOR)
    }

    pub fn is_function_type(&self) -> bool {
        matches!(&self.0.kind, TypeKind::Application { head, .. } if *head == *FUN_CONSTRUCTOR)
    }

    /// Type-variable id, for variables.
    pub fn id(&self) -> Option<Symbol> {
        match &self.0.kind {
            TypeKind::Variable(id) => Some(*id),
            TypeKind::Application { .. } => None,
        }
    }

    pub fn unpack_type_application(&self) -> Option<(&TypeConstructor, &[Type])> {
        match &self.0.kind {
            TypeKind::Application { head, args } => Some((head, args.as_slice())),
            TypeKind::Variable(_) => None,
        }
    }

    /// Domain and codomain of a function type.
    pub fn unpack_function_type(&self) -> Option<(&Type, &Type)> {
        match &self.0.kind {
            TypeKind::Application { head, args } if *head == *FUN_CONSTRUCTOR => {
                Some((&args[0], &args[1]))
            }
            _ => None,
        }
    }

    /// Codomain of a function type; the type itself otherwise.
    pub(crate) fn codomain(&self) -> Type {
        match self.unpack_function_type() {
            Some((_, codomain)) => codomain.clone(),
            None => self.clone(),
        }
    }

    /// The set of type variables occurring in the type (cached).
    pub fn type_variables(&self) -> &FxHashSet<Type> {
        self.0.variables.get_or_init(|| match &self.0.kind {
            TypeKind::Variable(_) => std::iter::once(self.clone()).collect(),
            TypeKind::Application { args, .. } => {
                let mut out = FxHashSet::default();
                for arg in args {
                    out.extend(arg.type_variables().iter().cloned());
                }
                out
            }
        })
    }

    pub fn has_type_variables(&self) -> bool {
        !self.type_variables().is_empty()
    }

    /// The set of type constructors occurring in the type (cached).
    pub fn type_constructors(&self) -> &FxHashSet<TypeConstructor> {
        self.0.constructors.get_or_init(|| match &self.0.kind {
            TypeKind::Variable(_) => FxHashSet::default(),
            TypeKind::Application { head, args } => {
                let mut out = FxHashSet::default();
                out.insert(head.clone());
                for arg in args {
                    out.extend(arg.type_constructors().iter().cloned());
                }
                out
            }
        })
    }

    pub fn has_type_constructors(&self) -> bool {
        !self.type_constructors().is_empty()
    }

    /// Applies a type-variable instantiation.
    ///
    /// Returns a pointer-identical handle when `theta` leaves the type
    /// unchanged; callers may rely on that for change detection.
    pub fn instantiate(&self, theta: &TypeInstantiation) -> Type {
        if theta.is_empty() {
            self.clone()
        } else {
            self.instantiate_rec(theta).0
        }
    }

    pub(crate) fn instantiate_rec(&self, theta: &TypeInstantiation) -> (Type, bool) {
        match &self.0.kind {
            TypeKind::Variable(_) => match theta.get(self) {
                Some(image) => (image.clone(), true),
                None => (self.clone(), false),
            },
            TypeKind::Application { head, args } => {
                let mut changed = false;
                let new_args: Vec<Type> = args
                    .iter()
                    .map(|arg| {
                        let (out, arg_changed) = arg.instantiate_rec(theta);
                        changed |= arg_changed;
                        out
                    })
                    .collect();
                if changed {
                    (
                        Type::intern(TypeKind::Application {
                            head: head.clone(),
                            args: new_args,
                        }),
                        true,
                    )
                } else {
                    (self.clone(), false)
                }
            }
        }
    }

    /// Finds an instantiation that makes the type match `target`.
    ///
    /// One-way: only variables of `self` are bound. A variable already
    /// bound must map to `target` exactly; applications match head-wise
    /// and child-wise.
    pub fn match_type(&self, target: &Type) -> Option<TypeInstantiation> {
        let mut theta = TypeInstantiation::default();
        if self.match_into(target, &mut theta) {
            Some(theta)
        } else {
            None
        }
    }

    pub(crate) fn match_into(&self, target: &Type, theta: &mut TypeInstantiation) -> bool {
        match &self.0.kind {
            TypeKind::Variable(_) => match theta.get(self) {
                Some(bound) => bound == target,
                None => {
                    theta.insert(self.clone(), target.clone());
                    true
                }
            },
            TypeKind::Application { head, args } => match &target.0.kind {
                TypeKind::Application { head: target_head, args: target_args } => {
                    head == target_head
                        && args.len() == target_args.len()
                        && args
                            .iter()
                            .zip(target_args.iter())
                            .all(|(a, b)| a.match_into(b, theta))
                }
                TypeKind::Variable(_) => false,
            },
        }
    }

    /// Tests whether the type can be instantiated to match `target`.
    pub fn matches(&self, target: &Type) -> bool {
        self.match_type(target).is_some()
    }

    /// Raw s-expression dump, used for digests and `Display`.
    pub fn dump(&self) -> String {
        match &self.0.kind {
            TypeKind::Variable(id) => format!("(TypeVariable {})", id),
            TypeKind::Application { head, args } => {
                let mut out = format!("(TypeApplication {}", head.dump());
                for arg in args {
                    out.push(' ');
                    out.push_str(&arg.dump());
                }
                out.push(')');
                out
            }
        }
    }
}

impl PartialEq for Type {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Type {}

impl Hash for Type {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.0.hash);
    }
}

impl PartialOrd for Type {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Type {
    fn cmp(&self, other: &Self) -> Ordering {
        if Arc::ptr_eq(&self.0, &other.0) {
            return Ordering::Equal;
        }
        match (&self.0.kind, &other.0.kind) {
            (TypeKind::Application { .. }, TypeKind::Variable(_)) => Ordering::Less,
            (TypeKind::Variable(_), TypeKind::Application { .. }) => Ordering::Greater,
            (TypeKind::Variable(a), TypeKind::Variable(b)) => a.cmp(b),
            (
                TypeKind::Application { head: h1, args: a1 },
                TypeKind::Application { head: h2, args: a2 },
            ) => h1.cmp(h2).then_with(|| a1.iter().cmp(a2.iter())),
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.dump())
    }
}

impl fmt::Debug for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.dump())
    }
}
