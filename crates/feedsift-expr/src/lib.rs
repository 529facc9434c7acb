//! Typed filter expressions over normalized feed items.
//!
//! This crate declares the canonical [`Item`] schema and an expression
//! [`Environment`] over it. Expressions are written in a typed subset of the
//! Common Expression Language (CEL) and compiled once into an immutable
//! [`Program`], which can then be evaluated against any number of items.
//!
//! Compilation checks the expression against the declared schema, so unknown
//! fields, operand type mismatches and non-boolean results are rejected before
//! any item is touched.
//!
//! # Bound Variables
//!
//! - `item` - the [`Item`] being filtered
//! - `now` - a timestamp shared by every item in one batch
//!
//! # Example
//!
//! ```
//! use chrono::Utc;
//! use feedsift_expr::{Environment, Evaluator, Item};
//!
//! let env = Environment::new().unwrap();
//! let program = env.compile(r#"item.Title.contains("Go")"#).unwrap();
//!
//! let item = Item::builder("https://example.com/go")
//!     .title("Learning Go")
//!     .build();
//!
//! let evaluator = Evaluator::new(&program, Utc::now());
//! assert!(evaluator.evaluate(&item).unwrap());
//! ```

mod ast;
mod checker;
pub mod duration;
mod env;
mod error;
mod evaluator;
mod functions;
mod item;
mod lexer;
mod parser;
mod program;
mod types;
mod value;

pub use env::{
    Environment, EnvironmentBuilder, FieldAccessor, FieldDecl, FunctionDecl, Implementation,
    ObjectType, Overload, Presence, VariableDecl, VariableRole, ITEM_TYPE,
};
pub use error::{CompileError, CompileResult, ConfigurationError, EvalFault, EvaluationError};
pub use evaluator::{evaluate, Evaluator};
pub use item::{Item, ItemBuilder};
pub use program::Program;
pub use types::Type;
pub use value::Value;

#[cfg(test)]
mod tests;

#[cfg(test)]
mod evaluator_tests;
