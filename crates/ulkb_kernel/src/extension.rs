//! Theory extensions.
//!
//! Each step that enlarges a theory is recorded as an [`Extension`]: a
//! tagged variant carrying at most one lookup id. Shape validation
//! happens at construction; declaredness checks against the receiving
//! theory happen in `Theory::extend`.

use ulkb_base::Symbol;

use crate::error::ArgumentError;
use crate::sequent::Sequent;
use crate::term::Term;
use crate::ty::{Type, TypeConstructor};

/// Discriminant of an [`Extension`], used for filtering queries.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum ExtensionKind {
    NewTypeConstructor,
    NewConstant,
    NewAxiom,
    NewDefinition,
    NewTheorem,
    NewTypeAlias,
    NewTypeSpec,
}

/// A step that enlarges a theory.
#[derive(Clone, PartialEq, Debug)]
pub enum Extension {
    /// Declares a type constructor.
    NewTypeConstructor(TypeConstructor),
    /// Declares a constant.
    NewConstant(Term),
    /// Asserts a formula, named by a constant of type `bool`.
    NewAxiom { name: Term, formula: Term },
    /// Fixes the meaning of a new constant by a defining equation
    /// `v = definiens`, where `v` is a variable carrying the new
    /// constant's name and type.
    NewDefinition { equation: Term },
    /// Records a proved sequent, named by a constant of type `bool`.
    NewTheorem { name: Term, sequent: Sequent },
    /// Pure notation: aliases a host-language type name to a type.
    NewTypeAlias {
        native: Symbol,
        ty: Type,
        spec: Option<Symbol>,
    },
    /// Pure notation: declares a type specification name.
    NewTypeSpec { spec: Symbol },
}

impl Extension {
    pub fn new_type_constructor(tc: TypeConstructor) -> Extension {
        Extension::NewTypeConstructor(tc)
    }

    pub fn new_constant(constant: Term) -> Result<Extension, ArgumentError> {
        if !constant.is_constant() {
            return Err(ArgumentError::new(
                "NewConstant",
                format!("'{}' is not a constant", constant),
            ));
        }
        Ok(Extension::NewConstant(constant))
    }

    pub fn new_axiom(name: Term, formula: Term) -> Result<Extension, ArgumentError> {
        check_name("NewAxiom", &name)?;
        if !formula.is_formula() {
            return Err(ArgumentError::new(
                "NewAxiom",
                format!("'{}' is not a formula", formula),
            ));
        }
        Ok(Extension::NewAxiom { name, formula })
    }

    /// Validates the shape of a defining equation: the left-hand side is
    /// a variable, the definiens is closed, and every type variable of
    /// the definiens occurs in the variable's type.
    pub fn new_definition(equation: Term) -> Result<Extension, ArgumentError> {
        const CONTEXT: &str = "NewDefinition";
        let Some((lhs, rhs)) = equation.unpack_equal() else {
            return Err(ArgumentError::new(
                CONTEXT,
                format!("'{}' is not a definitional equation", equation),
            ));
        };
        if !lhs.is_variable() {
            return Err(ArgumentError::new(
                CONTEXT,
                format!("'{}' is not a definitional equation", equation),
            ));
        }
        if rhs.has_free_variables() {
            return Err(ArgumentError::new(CONTEXT, "definiens is not closed"));
        }
        let extra: Vec<&Type> = rhs
            .type_variables()
            .iter()
            .filter(|tv| !lhs.type_variables().contains(*tv))
            .collect();
        if !extra.is_empty() {
            let mut names: Vec<String> = extra.iter().map(|tv| format!("'{}'", tv)).collect();
            names.sort();
            return Err(ArgumentError::new(
                CONTEXT,
                format!("extra type variable(s) in definiens: {}", names.join(", ")),
            ));
        }
        Ok(Extension::NewDefinition { equation })
    }

    pub fn new_theorem(name: Term, sequent: Sequent) -> Result<Extension, ArgumentError> {
        check_name("NewTheorem", &name)?;
        Ok(Extension::NewTheorem { name, sequent })
    }

    pub fn new_type_alias(native: &str, ty: Type, spec: Option<&str>) -> Extension {
        Extension::NewTypeAlias {
            native: Symbol::intern(native),
            ty,
            spec: spec.map(Symbol::intern),
        }
    }

    pub fn new_type_spec(spec: &str) -> Extension {
        Extension::NewTypeSpec {
            spec: Symbol::intern(spec),
        }
    }

    /// The extension's lookup id, if it exposes one.
    ///
    /// Aliases and type specs are notation without a lookup id; they
    /// are indexed by the theory's alias tables instead.
    pub fn id(&self) -> Option<Symbol> {
        match self {
            Extension::NewTypeConstructor(tc) => Some(tc.id()),
            Extension::NewConstant(constant) => constant.id(),
            Extension::NewAxiom { name, .. } | Extension::NewTheorem { name, .. } => name.id(),
            Extension::NewDefinition { equation } => {
                equation.unpack_equal().and_then(|(lhs, _)| lhs.id())
            }
            Extension::NewTypeAlias { .. } | Extension::NewTypeSpec { .. } => None,
        }
    }

    pub fn kind(&self) -> ExtensionKind {
        match self {
            Extension::NewTypeConstructor(_) => ExtensionKind::NewTypeConstructor,
            Extension::NewConstant(_) => ExtensionKind::NewConstant,
            Extension::NewAxiom { .. } => ExtensionKind::NewAxiom,
            Extension::NewDefinition { .. } => ExtensionKind::NewDefinition,
            Extension::NewTheorem { .. } => ExtensionKind::NewTheorem,
            Extension::NewTypeAlias { .. } => ExtensionKind::NewTypeAlias,
            Extension::NewTypeSpec { .. } => ExtensionKind::NewTypeSpec,
        }
    }

    /// Variant name, used in error messages and dumps.
    pub fn variant_name(&self) -> &'static str {
        match self.kind() {
            ExtensionKind::NewTypeConstructor => "NewTypeConstructor",
            ExtensionKind::NewConstant => "NewConstant",
            ExtensionKind::NewAxiom => "NewAxiom",
            ExtensionKind::NewDefinition => "NewDefinition",
            ExtensionKind::NewTheorem => "NewTheorem",
            ExtensionKind::NewTypeAlias => "NewTypeAlias",
            ExtensionKind::NewTypeSpec => "NewTypeSpec",
        }
    }

    pub fn is_new_type_constructor(&self) -> bool {
        matches!(self, Extension::NewTypeConstructor(_))
    }

    pub fn is_new_constant(&self) -> bool {
        matches!(self, Extension::NewConstant(_))
    }

    pub fn is_new_axiom(&self) -> bool {
        matches!(self, Extension::NewAxiom { .. })
    }

    pub fn is_new_definition(&self) -> bool {
        matches!(self, Extension::NewDefinition { .. })
    }

    pub fn is_new_theorem(&self) -> bool {
        matches!(self, Extension::NewTheorem { .. })
    }

    pub fn is_new_type_alias(&self) -> bool {
        matches!(self, Extension::NewTypeAlias { .. })
    }

    pub fn is_new_type_spec(&self) -> bool {
        matches!(self, Extension::NewTypeSpec { .. })
    }

    pub fn as_type_constructor(&self) -> Option<&TypeConstructor> {
        match self {
            Extension::NewTypeConstructor(tc) => Some(tc),
            _ => None,
        }
    }

    pub fn as_constant(&self) -> Option<&Term> {
        match self {
            Extension::NewConstant(constant) => Some(constant),
            _ => None,
        }
    }

    pub fn as_axiom(&self) -> Option<(&Term, &Term)> {
        match self {
            Extension::NewAxiom { name, formula } => Some((name, formula)),
            _ => None,
        }
    }

    /// Left-hand variable and definiens of a definition.
    pub fn as_definition(&self) -> Option<(&Term, &Term)> {
        match self {
            Extension::NewDefinition { equation } => equation.unpack_equal(),
            _ => None,
        }
    }

    pub fn as_theorem(&self) -> Option<(&Term, &Sequent)> {
        match self {
            Extension::NewTheorem { name, sequent } => Some((name, sequent)),
            _ => None,
        }
    }

    /// The term components of the extension, for mention queries.
    pub(crate) fn terms(&self) -> Vec<&Term> {
        match self {
            Extension::NewTypeConstructor(_)
            | Extension::NewTypeAlias { .. }
            | Extension::NewTypeSpec { .. } => Vec::new(),
            Extension::NewConstant(constant) => vec![constant],
            Extension::NewAxiom { name, formula } => vec![name, formula],
            Extension::NewDefinition { equation } => vec![equation],
            Extension::NewTheorem { name, .. } => vec![name],
        }
    }

    /// The type components of the extension, for mention queries.
    pub(crate) fn types(&self) -> Vec<&Type> {
        match self {
            Extension::NewTypeAlias { ty, .. } => vec![ty],
            _ => Vec::new(),
        }
    }

    /// Raw s-expression dump, used for digests and `Display`.
    pub fn dump(&self) -> String {
        match self {
            Extension::NewTypeConstructor(tc) => {
                format!("(NewTypeConstructor {})", tc.dump())
            }
            Extension::NewConstant(constant) => format!("(NewConstant {})", constant.dump()),
            Extension::NewAxiom { name, formula } => {
                format!("(NewAxiom {} {})", name.dump(), formula.dump())
            }
            Extension::NewDefinition { equation } => {
                format!("(NewDefinition {})", equation.dump())
            }
            Extension::NewTheorem { name, sequent } => {
                format!("(NewTheorem {} {})", name.dump(), sequent.dump())
            }
            Extension::NewTypeAlias { native, ty, spec } => match spec {
                Some(spec) => format!("(NewTypeAlias {} {} {})", native, ty.dump(), spec),
                None => format!("(NewTypeAlias {} {})", native, ty.dump()),
            },
            Extension::NewTypeSpec { spec } => format!("(NewTypeSpec {})", spec),
        }
    }
}

fn check_name(context: &'static str, name: &Term) -> Result<(), ArgumentError> {
    if !name.is_constant() {
        return Err(ArgumentError::new(
            context,
            format!("'{}' is not a constant", name),
        ));
    }
    if !name.is_formula() {
        return Err(ArgumentError::new(
            context,
            format!("'{}' is not a formula", name),
        ));
    }
    Ok(())
}

impl std::fmt::Display for Extension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.dump())
    }
}
