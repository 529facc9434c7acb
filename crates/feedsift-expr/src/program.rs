//! Compiled programs.

use regex::Regex;

use crate::env::{FieldAccessor, Implementation};
use crate::value::Value;

/// A compiled, type-checked expression.
///
/// Programs are immutable and side-effect free: compile once, then evaluate
/// against any number of items, from any number of threads.
#[derive(Debug, Clone)]
pub struct Program {
    source: String,
    pub(crate) root: Node,
}

impl Program {
    pub(crate) fn new(source: &str, root: Node) -> Self {
        Self {
            source: source.to_string(),
            root,
        }
    }

    /// The expression this program was compiled from.
    pub fn source(&self) -> &str {
        &self.source
    }
}

/// The kind of a comprehension macro.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ComprehensionKind {
    All,
    Exists,
    ExistsOne,
    Map,
    Filter,
}

/// A node of the checked program tree.
#[derive(Debug, Clone)]
pub(crate) enum Node {
    Const(Value),
    /// The batch timestamp.
    Now,
    /// A field read from the current item; fails when absent.
    Field {
        name: String,
        accessor: FieldAccessor,
    },
    /// `has(item.Field)`.
    Has {
        accessor: FieldAccessor,
    },
    /// A comprehension variable, by nesting level.
    Local(usize),
    List(Vec<Node>),
    And(Box<Node>, Box<Node>),
    Or(Box<Node>, Box<Node>),
    Conditional {
        condition: Box<Node>,
        then: Box<Node>,
        otherwise: Box<Node>,
    },
    Call {
        implementation: Implementation,
        args: Vec<Node>,
    },
    /// `matches` with a pattern compiled ahead of time.
    Matches {
        target: Box<Node>,
        regex: Regex,
    },
    Comprehension {
        kind: ComprehensionKind,
        range: Box<Node>,
        body: Box<Node>,
    },
}
