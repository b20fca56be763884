//! AST interchange.
//!
//! Every kernel object converts to a tagged JSON record with a class
//! tag, an args tuple, and (on input) a tolerated flat bag of extra
//! annotations. The two tag keys are configurable through
//! [`AstSettings`] and round-trip byte-equal under the same settings.
//!
//! Deserialized sequents are re-sealed through the kernel: the
//! conclusion enters via the acceptance rule and each hypothesis is
//! weakened in through primitives, so even imported sequents carry an
//! honest certificate whose leaves say "Accept".

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use ulkb_kernel::rule;
use ulkb_kernel::term::{Term, TermKind};
use ulkb_kernel::ty::{Associativity, Type, TypeConstructor, TypeKind};
use ulkb_kernel::{Extension, Sequent, Theory};

use crate::error::AstError;

/// Tag keys of the AST encoding.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct AstSettings {
    pub class_tag: String,
    pub args_tag: String,
}

impl Default for AstSettings {
    fn default() -> Self {
        AstSettings {
            class_tag: "class".to_owned(),
            args_tag: "args".to_owned(),
        }
    }
}

impl AstSettings {
    fn record(&self, class: &str, args: Vec<Value>) -> Value {
        let mut map = Map::new();
        map.insert(self.class_tag.clone(), Value::String(class.to_owned()));
        map.insert(self.args_tag.clone(), Value::Array(args));
        Value::Object(map)
    }

    fn open<'a>(&self, ast: &'a Value) -> Result<(&'a str, &'a [Value]), AstError> {
        let Some(map) = ast.as_object() else {
            return Err(AstError::malformed("expected an object"));
        };
        let class = map
            .get(&self.class_tag)
            .and_then(Value::as_str)
            .ok_or_else(|| AstError::missing_field(&self.class_tag))?;
        let args = map
            .get(&self.args_tag)
            .and_then(Value::as_array)
            .ok_or_else(|| AstError::missing_field(&self.args_tag))?;
        // Any further entries are annotations; they are tolerated and
        // ignored.
        Ok((class, args))
    }
}

fn expect_args<'a>(
    class: &str,
    args: &'a [Value],
    n: usize,
) -> Result<&'a [Value], AstError> {
    if args.len() == n {
        Ok(args)
    } else {
        Err(AstError::malformed(format!(
            "{}: expected {} args, got {}",
            class,
            n,
            args.len()
        )))
    }
}

fn expect_str<'a>(class: &str, value: &'a Value) -> Result<&'a str, AstError> {
    value
        .as_str()
        .ok_or_else(|| AstError::malformed(format!("{}: expected a string", class)))
}

// -- Type constructors -----------------------------------------------------

pub fn type_constructor_to_ast(tc: &TypeConstructor, settings: &AstSettings) -> Value {
    let assoc = match tc.associativity() {
        Some(Associativity::Left) => json!("left"),
        Some(Associativity::Right) => json!("right"),
        None => Value::Null,
    };
    settings.record(
        "TypeConstructor",
        vec![json!(tc.id().as_str()), json!(tc.arity()), assoc],
    )
}

pub fn type_constructor_from_ast(
    ast: &Value,
    settings: &AstSettings,
) -> Result<TypeConstructor, AstError> {
    let (class, args) = settings.open(ast)?;
    if class != "TypeConstructor" {
        return Err(AstError::invalid_class(class));
    }
    let args = expect_args(class, args, 3)?;
    let id = expect_str(class, &args[0])?;
    let arity = args[1]
        .as_u64()
        .ok_or_else(|| AstError::malformed("TypeConstructor: expected an arity"))?;
    let associativity = match &args[2] {
        Value::Null => None,
        Value::String(s) if s == "left" => Some(Associativity::Left),
        Value::String(s) if s == "right" => Some(Associativity::Right),
        other => {
            return Err(AstError::malformed(format!(
                "TypeConstructor: bad associativity '{}'",
                other
            )))
        }
    };
    Ok(TypeConstructor::new(id, arity as usize, associativity))
}

// -- Types -----------------------------------------------------------------

pub fn type_to_ast(ty: &Type, settings: &AstSettings) -> Value {
    match ty.kind() {
        TypeKind::Variable(id) => settings.record("TypeVariable", vec![json!(id.as_str())]),
        TypeKind::Application { head, args } => {
            let mut out = vec![type_constructor_to_ast(head, settings)];
            out.extend(args.iter().map(|arg| type_to_ast(arg, settings)));
            settings.record("TypeApplication", out)
        }
    }
}

pub fn type_from_ast(ast: &Value, settings: &AstSettings) -> Result<Type, AstError> {
    let (class, args) = settings.open(ast)?;
    match class {
        "TypeVariable" => {
            let args = expect_args(class, args, 1)?;
            Ok(Type::variable(expect_str(class, &args[0])?))
        }
        "TypeApplication" => {
            if args.is_empty() {
                return Err(AstError::malformed("TypeApplication: missing head"));
            }
            let head = type_constructor_from_ast(&args[0], settings)?;
            let mut children = Vec::with_capacity(args.len() - 1);
            for arg in &args[1..] {
                children.push(type_from_ast(arg, settings)?);
            }
            head.apply(&children)
                .map_err(|err| AstError::malformed(err.reason))
        }
        other => Err(AstError::invalid_class(other)),
    }
}

// -- Terms -----------------------------------------------------------------

pub fn term_to_ast(t: &Term, settings: &AstSettings) -> Value {
    match t.kind() {
        TermKind::Variable { id } => settings.record(
            "Variable",
            vec![json!(id.as_str()), type_to_ast(t.ty(), settings)],
        ),
        TermKind::BoundVariable { index } => settings.record(
            "BoundVariable",
            vec![json!(index), type_to_ast(t.ty(), settings)],
        ),
        TermKind::Constant { id } => settings.record(
            "Constant",
            vec![json!(id.as_str()), type_to_ast(t.ty(), settings)],
        ),
        TermKind::Application { fun, arg } => settings.record(
            "Application",
            vec![term_to_ast(fun, settings), term_to_ast(arg, settings)],
        ),
        TermKind::Abstraction { .. } => {
            // Serialized in named form; `from_ast` re-opens the body.
            let (binder, body) = t
                .unpack_abstraction()
                .unwrap_or_else(|| (t.clone(), t.clone()));
            settings.record(
                "Abstraction",
                vec![
                    term_to_ast(&binder, settings),
                    term_to_ast(&body, settings),
                ],
            )
        }
    }
}

pub fn term_from_ast(ast: &Value, settings: &AstSettings) -> Result<Term, AstError> {
    let (class, args) = settings.open(ast)?;
    match class {
        "Variable" | "Constant" => {
            let args = expect_args(class, args, 2)?;
            let id = expect_str(class, &args[0])?;
            let ty = type_from_ast(&args[1], settings)?;
            if class == "Variable" {
                Ok(Term::variable(id, &ty))
            } else {
                Ok(Term::constant(id, &ty))
            }
        }
        "BoundVariable" => {
            let args = expect_args(class, args, 2)?;
            let index = args[0]
                .as_u64()
                .ok_or_else(|| AstError::malformed("BoundVariable: expected an index"))?;
            let ty = type_from_ast(&args[1], settings)?;
            Ok(Term::bound_variable(index as usize, &ty))
        }
        "Application" => {
            let args = expect_args(class, args, 2)?;
            let fun = term_from_ast(&args[0], settings)?;
            let arg = term_from_ast(&args[1], settings)?;
            Term::app(&fun, &arg).map_err(|err| AstError::malformed(err.reason))
        }
        "Abstraction" => {
            let args = expect_args(class, args, 2)?;
            let binder = term_from_ast(&args[0], settings)?;
            let body = term_from_ast(&args[1], settings)?;
            Term::abs(&binder, &body).map_err(|err| AstError::malformed(err.reason))
        }
        other => Err(AstError::invalid_class(other)),
    }
}

// -- Sequents --------------------------------------------------------------

pub fn sequent_to_ast(s: &Sequent, settings: &AstSettings) -> Value {
    let hypotheses: Vec<Value> = s
        .sorted_hypotheses()
        .iter()
        .map(|h| term_to_ast(h, settings))
        .collect();
    settings.record(
        "Sequent",
        vec![
            Value::Array(hypotheses),
            term_to_ast(s.conclusion(), settings),
        ],
    )
}

pub fn sequent_from_ast(ast: &Value, settings: &AstSettings) -> Result<Sequent, AstError> {
    let (class, args) = settings.open(ast)?;
    if class != "Sequent" {
        return Err(AstError::invalid_class(class));
    }
    let args = expect_args(class, args, 2)?;
    let Some(hypotheses) = args[0].as_array() else {
        return Err(AstError::malformed("Sequent: expected a hypothesis list"));
    };
    let conclusion = term_from_ast(&args[1], settings)?;
    let mut sealed = rule::accept(&conclusion).map_err(|err| AstError::malformed(err.reason))?;
    for h in hypotheses {
        let h = term_from_ast(h, settings)?;
        sealed = weaken_in(&h, &sealed).map_err(AstError::malformed)?;
    }
    Ok(sealed)
}

/// `𝛤 ⊢ p` plus hypothesis `q`, through primitives only
/// (EqMP ∘ DeductAntisym over Assume).
fn weaken_in(q: &Term, s: &Sequent) -> Result<Sequent, String> {
    let sq = rule::assume(q).map_err(|err| err.reason)?;
    let bridge = rule::deduct_antisym(&sq, s).map_err(|err| err.reason)?;
    rule::eq_mp(&bridge, &sq).map_err(|err| err.reason)
}

// -- Extensions ------------------------------------------------------------

pub fn extension_to_ast(ext: &Extension, settings: &AstSettings) -> Value {
    match ext {
        Extension::NewTypeConstructor(tc) => settings.record(
            "NewTypeConstructor",
            vec![type_constructor_to_ast(tc, settings)],
        ),
        Extension::NewConstant(constant) => {
            settings.record("NewConstant", vec![term_to_ast(constant, settings)])
        }
        Extension::NewAxiom { name, formula } => settings.record(
            "NewAxiom",
            vec![term_to_ast(name, settings), term_to_ast(formula, settings)],
        ),
        Extension::NewDefinition { equation } => {
            settings.record("NewDefinition", vec![term_to_ast(equation, settings)])
        }
        Extension::NewTheorem { name, sequent } => settings.record(
            "NewTheorem",
            vec![
                term_to_ast(name, settings),
                sequent_to_ast(sequent, settings),
            ],
        ),
        Extension::NewTypeAlias { native, ty, spec } => settings.record(
            "NewTypeAlias",
            vec![
                json!(native.as_str()),
                type_to_ast(ty, settings),
                spec.map_or(Value::Null, |s| json!(s.as_str())),
            ],
        ),
        Extension::NewTypeSpec { spec } => {
            settings.record("NewTypeSpec", vec![json!(spec.as_str())])
        }
    }
}

pub fn extension_from_ast(ast: &Value, settings: &AstSettings) -> Result<Extension, AstError> {
    let (class, args) = settings.open(ast)?;
    match class {
        "NewTypeConstructor" => {
            let args = expect_args(class, args, 1)?;
            Ok(Extension::new_type_constructor(type_constructor_from_ast(
                &args[0], settings,
            )?))
        }
        "NewConstant" => {
            let args = expect_args(class, args, 1)?;
            Extension::new_constant(term_from_ast(&args[0], settings)?)
                .map_err(|err| AstError::malformed(err.reason))
        }
        "NewAxiom" => {
            let args = expect_args(class, args, 2)?;
            Extension::new_axiom(
                term_from_ast(&args[0], settings)?,
                term_from_ast(&args[1], settings)?,
            )
            .map_err(|err| AstError::malformed(err.reason))
        }
        "NewDefinition" => {
            let args = expect_args(class, args, 1)?;
            Extension::new_definition(term_from_ast(&args[0], settings)?)
                .map_err(|err| AstError::malformed(err.reason))
        }
        "NewTheorem" => {
            let args = expect_args(class, args, 2)?;
            Extension::new_theorem(
                term_from_ast(&args[0], settings)?,
                sequent_from_ast(&args[1], settings)?,
            )
            .map_err(|err| AstError::malformed(err.reason))
        }
        "NewTypeAlias" => {
            let args = expect_args(class, args, 3)?;
            let native = expect_str(class, &args[0])?;
            let ty = type_from_ast(&args[1], settings)?;
            let spec = match &args[2] {
                Value::Null => None,
                other => Some(expect_str(class, other)?),
            };
            Ok(Extension::new_type_alias(native, ty, spec))
        }
        "NewTypeSpec" => {
            let args = expect_args(class, args, 1)?;
            Ok(Extension::new_type_spec(expect_str(class, &args[0])?))
        }
        other => Err(AstError::invalid_class(other)),
    }
}

// -- Theories --------------------------------------------------------------

pub fn theory_to_ast(thy: &Theory, settings: &AstSettings) -> Value {
    let extensions: Vec<Value> = thy
        .extensions()
        .iter()
        .map(|ext| extension_to_ast(ext, settings))
        .collect();
    settings.record("Theory", extensions)
}

/// Rebuilds a theory by replaying its extension log into an empty
/// theory (no prelude; the log carries everything).
pub fn theory_from_ast(ast: &Value, settings: &AstSettings) -> Result<Theory, AstError> {
    let (class, args) = settings.open(ast)?;
    if class != "Theory" {
        return Err(AstError::invalid_class(class));
    }
    let mut thy = Theory::empty();
    for ext in args {
        let ext = extension_from_ast(ext, settings)?;
        thy.extend(ext)
            .map_err(|err| AstError::malformed(err.to_string()))?;
    }
    Ok(thy)
}

/// Serializes any AST value to a JSON string (stable key order is the
/// caller's concern; records here have exactly two keys).
pub fn to_json_string(ast: &Value) -> String {
    ast.to_string()
}

/// Parses a JSON string into an AST value.
pub fn from_json_str(s: &str) -> Result<Value, AstError> {
    serde_json::from_str(s).map_err(|err| AstError::malformed(err.to_string()))
}
