//! Abstract Syntax Tree (AST) for filter expressions.

use crate::value::Value;

/// A parsed, unchecked expression.
///
/// Every node carries the byte offset of the token that introduced it, so
/// the checker can report errors against the source text.
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    /// The node kind.
    pub kind: ExprKind,
    /// Byte offset of the node in the source.
    pub position: usize,
}

/// The kinds of expression node.
#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    /// A literal value.
    Literal(Value),

    /// A bare identifier, such as `item`, `now` or a macro variable.
    Ident(String),

    /// Field selection: `operand.field`.
    Select {
        /// The selected-from expression.
        operand: Box<Expr>,
        /// The field name.
        field: String,
    },

    /// A function call, either global `f(args)` or receiver-style
    /// `target.f(args)`.
    Call {
        /// The receiver for method-style calls.
        target: Option<Box<Expr>>,
        /// The function name.
        function: String,
        /// The arguments.
        args: Vec<Expr>,
    },

    /// A list literal: `[a, b, c]`.
    List(Vec<Expr>),

    /// A unary operator.
    Unary {
        /// The operator.
        op: UnaryOp,
        /// The operand.
        operand: Box<Expr>,
    },

    /// A binary operator.
    Binary {
        /// The operator.
        op: BinaryOp,
        /// The left operand.
        left: Box<Expr>,
        /// The right operand.
        right: Box<Expr>,
    },

    /// Indexing: `operand[index]`.
    Index {
        /// The indexed expression.
        operand: Box<Expr>,
        /// The index.
        index: Box<Expr>,
    },

    /// The ternary conditional: `condition ? then : otherwise`.
    Conditional {
        /// The condition.
        condition: Box<Expr>,
        /// Value when the condition holds.
        then: Box<Expr>,
        /// Value otherwise.
        otherwise: Box<Expr>,
    },
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    /// Logical NOT (`!`).
    Not,
    /// Arithmetic negation (`-`).
    Negate,
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    And,
    Or,
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    In,
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
}

impl UnaryOp {
    /// The name of the overload family implementing this operator.
    pub fn function_name(self) -> &'static str {
        match self {
            UnaryOp::Not => "!_",
            UnaryOp::Negate => "-_",
        }
    }
}

impl BinaryOp {
    /// The name of the overload family implementing this operator.
    ///
    /// `&&` and `||` are evaluated directly and have no overloads.
    pub fn function_name(self) -> &'static str {
        match self {
            BinaryOp::And => "_&&_",
            BinaryOp::Or => "_||_",
            BinaryOp::Equal => "_==_",
            BinaryOp::NotEqual => "_!=_",
            BinaryOp::Less => "_<_",
            BinaryOp::LessEqual => "_<=_",
            BinaryOp::Greater => "_>_",
            BinaryOp::GreaterEqual => "_>=_",
            BinaryOp::In => "@in",
            BinaryOp::Add => "_+_",
            BinaryOp::Subtract => "_-_",
            BinaryOp::Multiply => "_*_",
            BinaryOp::Divide => "_/_",
            BinaryOp::Modulo => "_%_",
        }
    }
}

impl Expr {
    /// Creates a node at the given position.
    pub fn new(kind: ExprKind, position: usize) -> Self {
        Self { kind, position }
    }

    /// Creates a binary operator node.
    pub fn binary(op: BinaryOp, left: Expr, right: Expr, position: usize) -> Self {
        Self::new(
            ExprKind::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            },
            position,
        )
    }

    /// Creates a unary operator node.
    pub fn unary(op: UnaryOp, operand: Expr, position: usize) -> Self {
        Self::new(
            ExprKind::Unary {
                op,
                operand: Box::new(operand),
            },
            position,
        )
    }

    /// Returns the identifier name if this node is a bare identifier.
    pub fn as_ident(&self) -> Option<&str> {
        match &self.kind {
            ExprKind::Ident(name) => Some(name),
            _ => None,
        }
    }
}
