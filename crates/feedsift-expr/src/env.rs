//! The expression environment: declared types, variables and functions.
//!
//! An [`Environment`] is built once and then shared read-only by every
//! compilation. [`Environment::new`] declares the canonical `Item` schema,
//! the `item` and `now` variables and the standard function library;
//! [`Environment::builder`] starts from the same declarations and lets
//! callers register more.

use std::collections::{BTreeMap, HashSet};

use crate::checker::Checker;
use crate::error::{CompileError, CompileResult, ConfigurationError, EvalFault};
use crate::functions;
use crate::item::Item;
use crate::parser::Parser;
use crate::program::Program;
use crate::types::{signature, Type};
use crate::value::Value;

/// Reads one field from an item, `None` when the field is absent.
pub type FieldAccessor = fn(&Item) -> Option<Value>;

/// Runs one function overload on already-evaluated arguments.
pub type Implementation = fn(&[Value]) -> Result<Value, EvalFault>;

/// Whether a field may be absent on an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    /// The field always has a value.
    Always,
    /// The field may be absent; reading an absent field fails evaluation.
    Optional,
}

/// A field of a declared object type.
#[derive(Debug, Clone)]
pub struct FieldDecl {
    pub name: String,
    pub ty: Type,
    pub presence: Presence,
    pub accessor: FieldAccessor,
    /// One-line description shown in schema listings.
    pub description: String,
}

impl FieldDecl {
    /// Declares a field.
    pub fn new(
        name: impl Into<String>,
        ty: Type,
        presence: Presence,
        accessor: FieldAccessor,
    ) -> Self {
        Self {
            name: name.into(),
            ty,
            presence,
            accessor,
            description: String::new(),
        }
    }

    /// Sets the description shown in schema listings.
    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// A declared object type with a fixed field set.
#[derive(Debug, Clone)]
pub struct ObjectType {
    pub name: String,
    pub fields: Vec<FieldDecl>,
}

impl ObjectType {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    /// Adds a field.
    pub fn field(mut self, field: FieldDecl) -> Self {
        self.fields.push(field);
        self
    }

    /// Looks up a field by name.
    pub fn get(&self, name: &str) -> Option<&FieldDecl> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// How a variable is bound at evaluation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableRole {
    /// Bound to the item being evaluated.
    Item,
    /// Bound to the batch timestamp.
    Now,
}

/// A declared variable.
#[derive(Debug, Clone)]
pub struct VariableDecl {
    pub name: String,
    pub ty: Type,
    pub role: VariableRole,
}

impl VariableDecl {
    pub fn new(name: impl Into<String>, ty: Type, role: VariableRole) -> Self {
        Self {
            name: name.into(),
            ty,
            role,
        }
    }
}

/// One typed signature of a function.
#[derive(Debug, Clone)]
pub struct Overload {
    /// Unique identifier, e.g. `contains_string`.
    pub id: String,
    /// Called as `receiver.f(args)` rather than `f(args)`. The receiver is
    /// the first parameter.
    pub receiver_style: bool,
    pub params: Vec<Type>,
    pub result: Type,
    pub implementation: Implementation,
    /// Calls with constant arguments are evaluated during compilation.
    pub foldable: bool,
}

impl Overload {
    /// Declares a global-style overload, called as `f(args)`.
    pub fn global(
        id: impl Into<String>,
        params: Vec<Type>,
        result: Type,
        implementation: Implementation,
    ) -> Self {
        Self {
            id: id.into(),
            receiver_style: false,
            params,
            result,
            implementation,
            foldable: false,
        }
    }

    /// Declares a receiver-style overload, called as `receiver.f(args)`.
    pub fn member(
        id: impl Into<String>,
        params: Vec<Type>,
        result: Type,
        implementation: Implementation,
    ) -> Self {
        Self {
            receiver_style: true,
            ..Self::global(id, params, result, implementation)
        }
    }

    /// Marks the overload as safe to evaluate at compile time.
    pub fn foldable(mut self) -> Self {
        self.foldable = true;
        self
    }

    /// Matches argument types, returning the result type on success.
    pub(crate) fn accepts(&self, receiver_style: bool, args: &[Type]) -> Option<Type> {
        if self.receiver_style != receiver_style || self.params.len() != args.len() {
            return None;
        }
        let mut binding = None;
        self.params
            .iter()
            .zip(args)
            .all(|(param, arg)| Type::unify(param, arg, &mut binding))
            .then(|| self.result.substitute(binding.as_ref()))
    }

    fn conflicts_with(&self, other: &Overload) -> bool {
        self.receiver_style == other.receiver_style
            && self.params.len() == other.params.len()
            && self
                .params
                .iter()
                .zip(&other.params)
                .all(|(a, b)| Type::overlaps(a, b))
    }
}

/// A function and its overloads.
#[derive(Debug, Clone)]
pub struct FunctionDecl {
    pub name: String,
    pub overloads: Vec<Overload>,
}

impl FunctionDecl {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            overloads: Vec::new(),
        }
    }

    /// Adds an overload.
    pub fn overload(mut self, overload: Overload) -> Self {
        self.overloads.push(overload);
        self
    }
}

/// Builder for [`Environment`].
///
/// Declarations are collected as given and validated together in
/// [`build`](EnvironmentBuilder::build).
#[derive(Debug, Clone, Default)]
pub struct EnvironmentBuilder {
    variables: Vec<VariableDecl>,
    types: Vec<ObjectType>,
    functions: Vec<FunctionDecl>,
}

impl EnvironmentBuilder {
    /// Creates a builder with no declarations at all.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Declares a variable.
    pub fn variable(mut self, variable: VariableDecl) -> Self {
        self.variables.push(variable);
        self
    }

    /// Declares an object type.
    pub fn object_type(mut self, object_type: ObjectType) -> Self {
        self.types.push(object_type);
        self
    }

    /// Declares a function. Overloads of an already-declared function are
    /// merged into it.
    pub fn function(mut self, function: FunctionDecl) -> Self {
        self.functions.push(function);
        self
    }

    /// Validates the declarations and builds the environment.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigurationError`] if a name is repeated or invalid, a
    /// variable refers to an undeclared type or has a type its role cannot
    /// bind, or two overloads of one function accept the same arguments.
    pub fn build(self) -> Result<Environment, ConfigurationError> {
        let mut types: BTreeMap<String, ObjectType> = BTreeMap::new();
        for object_type in self.types {
            validate_name(&object_type.name)?;
            let mut seen = HashSet::new();
            for field in &object_type.fields {
                validate_name(&field.name)?;
                if !seen.insert(field.name.as_str()) {
                    return Err(ConfigurationError::DuplicateField {
                        type_name: object_type.name.clone(),
                        field: field.name.clone(),
                    });
                }
            }
            if types.contains_key(&object_type.name) {
                return Err(ConfigurationError::DuplicateType {
                    name: object_type.name,
                });
            }
            types.insert(object_type.name.clone(), object_type);
        }

        let mut seen = HashSet::new();
        for variable in &self.variables {
            validate_name(&variable.name)?;
            if !seen.insert(variable.name.as_str()) {
                return Err(ConfigurationError::DuplicateVariable {
                    name: variable.name.clone(),
                });
            }
            validate_variable_type(variable, &types)?;
        }

        let mut functions: BTreeMap<String, FunctionDecl> = BTreeMap::new();
        for function in self.functions {
            if !functions::is_operator(&function.name) {
                validate_name(&function.name)?;
            }
            let entry = functions
                .entry(function.name.clone())
                .or_insert_with(|| FunctionDecl::new(function.name.clone()));
            for overload in function.overloads {
                if entry.overloads.iter().any(|o| o.conflicts_with(&overload)) {
                    return Err(ConfigurationError::DuplicateOverload {
                        function: function.name.clone(),
                        signature: signature(&overload.params),
                    });
                }
                entry.overloads.push(overload);
            }
        }

        Ok(Environment {
            variables: self.variables,
            types,
            functions,
        })
    }
}

fn validate_name(name: &str) -> Result<(), ConfigurationError> {
    let mut chars = name.chars();
    let valid_start = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    let valid_rest = chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    let reserved = matches!(name, "true" | "false" | "in");
    if valid_start && valid_rest && !reserved {
        Ok(())
    } else {
        Err(ConfigurationError::InvalidName {
            name: name.to_string(),
        })
    }
}

fn validate_variable_type(
    variable: &VariableDecl,
    types: &BTreeMap<String, ObjectType>,
) -> Result<(), ConfigurationError> {
    match (&variable.ty, variable.role) {
        (Type::Object(type_name), VariableRole::Item) => {
            if types.contains_key(type_name) {
                Ok(())
            } else {
                Err(ConfigurationError::UndeclaredType {
                    variable: variable.name.clone(),
                    type_name: type_name.clone(),
                })
            }
        }
        (Type::Timestamp, VariableRole::Now) => Ok(()),
        (ty, role) => Err(ConfigurationError::RoleTypeMismatch {
            variable: variable.name.clone(),
            role: format!("{:?}", role),
            type_name: ty.to_string(),
        }),
    }
}

/// Declared variables, object types and functions available to expressions.
///
/// Immutable once built, so it can be shared across threads and compilations
/// without synchronization.
#[derive(Debug, Clone)]
pub struct Environment {
    variables: Vec<VariableDecl>,
    types: BTreeMap<String, ObjectType>,
    functions: BTreeMap<String, FunctionDecl>,
}

impl Environment {
    /// Builds the standard environment: the `Item` type, the `item` and `now`
    /// variables, and the standard function library.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigurationError`] only if the built-in declarations are
    /// inconsistent.
    pub fn new() -> Result<Self, ConfigurationError> {
        Self::builder().build()
    }

    /// Starts a builder preloaded with the standard declarations.
    pub fn builder() -> EnvironmentBuilder {
        let mut builder = EnvironmentBuilder::empty()
            .object_type(item_type())
            .variable(VariableDecl::new(
                "item",
                Type::Object(ITEM_TYPE.to_string()),
                VariableRole::Item,
            ))
            .variable(VariableDecl::new("now", Type::Timestamp, VariableRole::Now));
        for function in functions::standard_library() {
            builder = builder.function(function);
        }
        builder
    }

    /// Compiles an expression into a reusable [`Program`].
    ///
    /// # Errors
    ///
    /// Returns a [`CompileError`] if the expression is malformed, refers to
    /// undeclared names or fields, mismatches operand types, or does not
    /// produce a boolean.
    pub fn compile(&self, source: &str) -> CompileResult<Program> {
        let expr = Parser::parse(source)?;
        let (root, ty) = Checker::new(self).check(&expr)?;
        if ty != Type::Bool {
            return Err(CompileError::NonBooleanResult {
                found: ty.to_string(),
            });
        }
        Ok(Program::new(source, root))
    }

    /// The declared variables, in declaration order.
    pub fn variables(&self) -> &[VariableDecl] {
        &self.variables
    }

    pub fn variable(&self, name: &str) -> Option<&VariableDecl> {
        self.variables.iter().find(|v| v.name == name)
    }

    pub fn object_type(&self, name: &str) -> Option<&ObjectType> {
        self.types.get(name)
    }

    /// The declared functions, sorted by name.
    pub fn functions(&self) -> impl Iterator<Item = &FunctionDecl> {
        self.functions.values()
    }

    pub fn function(&self, name: &str) -> Option<&FunctionDecl> {
        self.functions.get(name)
    }
}

/// Name of the canonical item type.
pub const ITEM_TYPE: &str = "Item";

fn optional_string(value: Option<&str>) -> Option<Value> {
    value.map(Value::from)
}

fn item_type() -> ObjectType {
    ObjectType::new(ITEM_TYPE)
        .field(
            FieldDecl::new("URL", Type::String, Presence::Always, |item| {
                Some(Value::from(item.url()))
            })
            .describe("Entry permalink, empty if unknown"),
        )
        .field(
            FieldDecl::new("Title", Type::String, Presence::Optional, |item| {
                optional_string(item.title())
            })
            .describe("Entry title"),
        )
        .field(
            FieldDecl::new("Author", Type::String, Presence::Optional, |item| {
                optional_string(item.author())
            })
            .describe("First author name"),
        )
        .field(
            FieldDecl::new("Tags", Type::String, Presence::Optional, |item| {
                item.joined_tags().map(Value::String)
            })
            .describe("Comma-separated categories"),
        )
        .field(
            FieldDecl::new(
                "TagList",
                Type::list(Type::String),
                Presence::Optional,
                |item| {
                    item.tags()
                        .map(|tags| Value::List(tags.iter().map(|t| Value::from(t.as_str())).collect()))
                },
            )
            .describe("Categories as an ordered list"),
        )
        .field(
            FieldDecl::new("Content", Type::String, Presence::Optional, |item| {
                optional_string(item.content())
            })
            .describe("Entry body"),
        )
        .field(
            FieldDecl::new("ContentLength", Type::Int, Presence::Optional, |item| {
                item.content_length()
                    .map(|len| Value::Int(i64::try_from(len).unwrap_or(i64::MAX)))
            })
            .describe("Length of Content in characters, absent when Content is"),
        )
        .field(
            FieldDecl::new("Published", Type::Timestamp, Presence::Optional, |item| {
                item.published().map(Value::Timestamp)
            })
            .describe("Publication time"),
        )
        .field(
            FieldDecl::new("Updated", Type::Timestamp, Presence::Optional, |item| {
                item.updated().map(Value::Timestamp)
            })
            .describe("Last update time"),
        )
}
