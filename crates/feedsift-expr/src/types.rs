//! Static types of the expression language.

use std::fmt;

/// The static type of an expression.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    /// `bool`
    Bool,
    /// `int` (64-bit signed)
    Int,
    /// `double`
    Double,
    /// `string`
    String,
    /// `timestamp` (UTC instant)
    Timestamp,
    /// `duration`
    Duration,
    /// `list(T)`
    List(Box<Type>),
    /// A declared object type, such as `Item`.
    Object(String),
    /// The single type parameter used in generic overload signatures.
    Param,
    /// Unknown element type, as in the empty list `[]`.
    Dyn,
}

impl Type {
    /// Creates a `list(T)` type.
    pub fn list(element: Type) -> Self {
        Type::List(Box::new(element))
    }

    /// Returns the element type if this is a list.
    pub fn element(&self) -> Option<&Type> {
        match self {
            Type::List(element) => Some(element),
            _ => None,
        }
    }

    /// Matches an argument type against an overload parameter type,
    /// binding the type parameter on first use.
    pub(crate) fn unify(pattern: &Type, actual: &Type, binding: &mut Option<Type>) -> bool {
        match (pattern, actual) {
            (_, Type::Dyn) => true,
            (Type::Param, actual) => match binding {
                Some(bound) => bound == actual,
                None => {
                    *binding = Some(actual.clone());
                    true
                }
            },
            (Type::List(p), Type::List(a)) => Type::unify(p, a, binding),
            (pattern, actual) => pattern == actual,
        }
    }

    /// Replaces the type parameter with its binding.
    pub(crate) fn substitute(&self, binding: Option<&Type>) -> Type {
        match self {
            Type::Param => binding.cloned().unwrap_or(Type::Dyn),
            Type::List(element) => Type::list(element.substitute(binding)),
            other => other.clone(),
        }
    }

    /// Returns true if two declared signatures could accept the same arguments.
    pub(crate) fn overlaps(a: &Type, b: &Type) -> bool {
        match (a, b) {
            (Type::Param, _) | (_, Type::Param) => true,
            (Type::List(a), Type::List(b)) => Type::overlaps(a, b),
            (a, b) => a == b,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Bool => write!(f, "bool"),
            Type::Int => write!(f, "int"),
            Type::Double => write!(f, "double"),
            Type::String => write!(f, "string"),
            Type::Timestamp => write!(f, "timestamp"),
            Type::Duration => write!(f, "duration"),
            Type::List(element) => write!(f, "list({})", element),
            Type::Object(name) => write!(f, "{}", name),
            Type::Param => write!(f, "T"),
            Type::Dyn => write!(f, "dyn"),
        }
    }
}

/// Formats argument types as a parenthesized signature.
pub(crate) fn signature(types: &[Type]) -> String {
    let parts: Vec<String> = types.iter().map(|t| t.to_string()).collect();
    format!("({})", parts.join(", "))
}
