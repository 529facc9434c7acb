//! Error types for environment construction, compilation and evaluation.

use thiserror::Error;

/// A specialized Result type for expression compilation.
pub type CompileResult<T> = Result<T, CompileError>;

/// Errors raised while building an [`Environment`](crate::Environment).
///
/// These only occur when the declared schema or function registry itself is
/// malformed. User input never triggers them.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigurationError {
    /// Two variables share a name.
    #[error("variable '{name}' is declared more than once")]
    DuplicateVariable {
        /// The repeated variable name.
        name: String,
    },

    /// Two object types share a name.
    #[error("type '{name}' is declared more than once")]
    DuplicateType {
        /// The repeated type name.
        name: String,
    },

    /// An object type declares the same field twice.
    #[error("type '{type_name}' declares field '{field}' more than once")]
    DuplicateField {
        /// The object type.
        type_name: String,
        /// The repeated field name.
        field: String,
    },

    /// Two overloads of one function accept the same argument types.
    #[error("function '{function}' has conflicting overloads for {signature}")]
    DuplicateOverload {
        /// The function name.
        function: String,
        /// The conflicting signature.
        signature: String,
    },

    /// A declared name is not a valid identifier.
    #[error("'{name}' is not a valid identifier")]
    InvalidName {
        /// The offending name.
        name: String,
    },

    /// A variable references an object type that was never declared.
    #[error("variable '{variable}' has undeclared type '{type_name}'")]
    UndeclaredType {
        /// The variable name.
        variable: String,
        /// The missing type.
        type_name: String,
    },

    /// A variable's type cannot be bound by its role.
    #[error("variable '{variable}' with role {role} cannot have type '{type_name}'")]
    RoleTypeMismatch {
        /// The variable name.
        variable: String,
        /// The variable's role.
        role: String,
        /// The declared type.
        type_name: String,
    },
}

/// Errors raised while compiling an expression.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CompileError {
    /// The expression is empty.
    #[error("expression is empty")]
    EmptyExpression,

    /// The expression is not well formed.
    #[error("syntax error at position {position}: {message}")]
    Syntax {
        /// Byte offset of the problem.
        position: usize,
        /// What went wrong.
        message: String,
    },

    /// An identifier does not name a declared variable.
    #[error("undeclared reference to '{name}' at position {position}{}", did_you_mean(.suggestion))]
    UndeclaredReference {
        /// The identifier.
        name: String,
        /// Byte offset of the identifier.
        position: usize,
        /// The closest declared name, if any is close.
        suggestion: Option<String>,
    },

    /// An object variable was used as a value instead of through a field.
    #[error("'{name}' cannot be used as a value at position {position}; select one of its fields, e.g. {name}.Title")]
    BareObject {
        /// The variable name.
        name: String,
        /// Byte offset of the reference.
        position: usize,
    },

    /// A selected field does not exist on the operand's type.
    #[error("type '{type_name}' has no field '{field}' (position {position}){}", did_you_mean(.suggestion))]
    UnknownField {
        /// The operand's type.
        type_name: String,
        /// The requested field.
        field: String,
        /// Byte offset of the selection.
        position: usize,
        /// The closest declared field, if any is close.
        suggestion: Option<String>,
    },

    /// No overload of a function accepts the given argument types.
    #[error("found no matching overload for '{function}' applied to {signature} (position {position})")]
    NoMatchingOverload {
        /// The function or operator.
        function: String,
        /// The argument types, e.g. `(string, int)`.
        signature: String,
        /// Byte offset of the call.
        position: usize,
    },

    /// An operand has the wrong type for its context.
    #[error("{context} expects {expected} but found {found} (position {position})")]
    TypeMismatch {
        /// Where the operand appears.
        context: String,
        /// The expected type.
        expected: String,
        /// The actual type.
        found: String,
        /// Byte offset of the operand.
        position: usize,
    },

    /// The expression does not produce a boolean.
    #[error("expression must evaluate to bool, got {found}")]
    NonBooleanResult {
        /// The expression's type.
        found: String,
    },

    /// A constant argument was rejected at compile time.
    #[error("invalid argument to '{function}' at position {position}: {message}")]
    InvalidArgument {
        /// The function.
        function: String,
        /// Why the argument was rejected.
        message: String,
        /// Byte offset of the call.
        position: usize,
    },

    /// A macro was used with the wrong shape.
    #[error("invalid use of '{name}' at position {position}: {message}")]
    InvalidMacro {
        /// The macro name.
        name: String,
        /// What the macro requires.
        message: String,
        /// Byte offset of the call.
        position: usize,
    },
}

impl CompileError {
    /// Creates a syntax error.
    pub fn syntax(position: usize, message: impl Into<String>) -> Self {
        CompileError::Syntax {
            position,
            message: message.into(),
        }
    }

    /// Creates a type mismatch error.
    pub fn type_mismatch(
        context: impl Into<String>,
        expected: impl ToString,
        found: impl ToString,
        position: usize,
    ) -> Self {
        CompileError::TypeMismatch {
            context: context.into(),
            expected: expected.to_string(),
            found: found.to_string(),
            position,
        }
    }

    /// Creates an invalid macro error.
    pub fn invalid_macro(name: impl Into<String>, message: impl Into<String>, position: usize) -> Self {
        CompileError::InvalidMacro {
            name: name.into(),
            message: message.into(),
            position,
        }
    }
}

fn did_you_mean(suggestion: &Option<String>) -> String {
    match suggestion {
        Some(name) => format!(" (did you mean '{}'?)", name),
        None => String::new(),
    }
}

/// A runtime fault raised while evaluating a program.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EvalFault {
    /// An optional field is absent on the item.
    #[error("no such key: {field}")]
    AbsentField {
        /// The absent field.
        field: String,
    },

    /// Integer arithmetic overflowed.
    #[error("{operation} overflow")]
    Overflow {
        /// The operation that overflowed.
        operation: &'static str,
    },

    /// Integer division or modulus by zero.
    #[error("division by zero")]
    DivisionByZero,

    /// A list index is outside the list.
    #[error("index {index} out of range for list of size {size}")]
    IndexOutOfRange {
        /// The requested index.
        index: i64,
        /// The list size.
        size: usize,
    },

    /// A function rejected an argument value.
    #[error("{function}: {message}")]
    InvalidArgument {
        /// The function.
        function: &'static str,
        /// Why the value was rejected.
        message: String,
    },

    /// A value had an unexpected runtime type.
    #[error("no such overload: {function} applied to ({found})")]
    NoSuchOverload {
        /// The function.
        function: &'static str,
        /// The runtime argument types.
        found: String,
    },
}

impl EvalFault {
    /// Creates an invalid argument fault.
    pub fn invalid_argument(function: &'static str, message: impl Into<String>) -> Self {
        EvalFault::InvalidArgument {
            function,
            message: message.into(),
        }
    }
}

/// Evaluation of a program failed for one item.
///
/// A failure is never reported as a non-match: callers decide whether to
/// skip the item or abort.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("evaluation failed for item '{item}': {fault}")]
pub struct EvaluationError {
    /// Identifies the offending item (its URL, or its title when it has no URL).
    pub item: String,
    /// The underlying fault.
    pub fault: EvalFault,
}
