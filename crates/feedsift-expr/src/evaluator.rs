//! Program evaluation against items.
//!
//! This module provides the [`Evaluator`] for running a compiled [`Program`]
//! against [`Item`]s. Every item in a batch is evaluated against the same
//! `now`, which the caller captures once.
//!
//! # Example
//!
//! ```
//! use chrono::{TimeDelta, Utc};
//! use feedsift_expr::{Environment, Evaluator, Item};
//!
//! let env = Environment::new().unwrap();
//! let program = env.compile(r#"now - item.Published < duration("2h")"#).unwrap();
//!
//! let now = Utc::now();
//! let fresh = Item::builder("https://example.com/fresh")
//!     .published(now - TimeDelta::hours(1))
//!     .build();
//! let undated = Item::builder("https://example.com/undated").build();
//!
//! let evaluator = Evaluator::new(&program, now);
//! assert!(evaluator.evaluate(&fresh).unwrap());
//!
//! // An absent field is an error, never a silent non-match.
//! assert!(evaluator.evaluate(&undated).is_err());
//! ```

use chrono::{DateTime, Utc};

use crate::error::{EvalFault, EvaluationError};
use crate::item::Item;
use crate::program::{ComprehensionKind, Node, Program};
use crate::value::Value;

/// Evaluates one program against items, sharing a single `now`.
#[derive(Debug, Clone, Copy)]
pub struct Evaluator<'p> {
    program: &'p Program,
    now: DateTime<Utc>,
}

impl<'p> Evaluator<'p> {
    /// Creates an evaluator binding `now` for every item it evaluates.
    pub fn new(program: &'p Program, now: DateTime<Utc>) -> Self {
        Self { program, now }
    }

    /// The timestamp bound to `now`.
    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    /// Evaluates the program against one item.
    ///
    /// # Errors
    ///
    /// Returns an [`EvaluationError`] naming the item when evaluation faults,
    /// for example by reading an absent field. A fault is never reported as
    /// a non-match.
    pub fn evaluate(&self, item: &Item) -> Result<bool, EvaluationError> {
        let mut activation = Activation {
            item,
            now: self.now,
            locals: Vec::new(),
        };
        activation
            .eval(&self.program.root)
            .and_then(|value| {
                value.as_bool().ok_or_else(|| EvalFault::NoSuchOverload {
                    function: "result",
                    found: value.type_of().to_string(),
                })
            })
            .map_err(|fault| EvaluationError {
                item: item.label(),
                fault,
            })
    }
}

/// Evaluates `program` against one item with the given `now`.
///
/// # Errors
///
/// See [`Evaluator::evaluate`].
pub fn evaluate(program: &Program, item: &Item, now: DateTime<Utc>) -> Result<bool, EvaluationError> {
    Evaluator::new(program, now).evaluate(item)
}

/// Variable bindings for one evaluation.
struct Activation<'a> {
    item: &'a Item,
    now: DateTime<Utc>,
    /// Comprehension variables, one per enclosing comprehension.
    locals: Vec<Value>,
}

impl Activation<'_> {
    fn eval(&mut self, node: &Node) -> Result<Value, EvalFault> {
        match node {
            Node::Const(value) => Ok(value.clone()),
            Node::Now => Ok(Value::Timestamp(self.now)),
            Node::Field { name, accessor } => {
                accessor(self.item).ok_or_else(|| EvalFault::AbsentField { field: name.clone() })
            }
            Node::Has { accessor } => Ok(Value::Bool(accessor(self.item).is_some())),
            Node::Local(level) => Ok(self.locals[*level].clone()),
            Node::List(elements) => elements
                .iter()
                .map(|element| self.eval(element))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::List),
            Node::And(left, right) => self.logical(left, right, false),
            Node::Or(left, right) => self.logical(left, right, true),
            Node::Conditional {
                condition,
                then,
                otherwise,
            } => {
                if self.eval_bool(condition, "_?_:_")? {
                    self.eval(then)
                } else {
                    self.eval(otherwise)
                }
            }
            Node::Call {
                implementation,
                args,
            } => {
                let values = args
                    .iter()
                    .map(|arg| self.eval(arg))
                    .collect::<Result<Vec<_>, _>>()?;
                implementation(&values)
            }
            Node::Matches { target, regex } => match self.eval(target)? {
                Value::String(text) => Ok(Value::Bool(regex.is_match(&text))),
                other => Err(EvalFault::NoSuchOverload {
                    function: "matches",
                    found: other.type_of().to_string(),
                }),
            },
            Node::Comprehension { kind, range, body } => self.comprehension(*kind, range, body),
        }
    }

    fn eval_bool(&mut self, node: &Node, function: &'static str) -> Result<bool, EvalFault> {
        let value = self.eval(node)?;
        value.as_bool().ok_or_else(|| EvalFault::NoSuchOverload {
            function,
            found: value.type_of().to_string(),
        })
    }

    /// `&&` and `||` with commutative error handling: a deciding operand
    /// wins over an error on the other side, whichever side errs.
    fn logical(&mut self, left: &Node, right: &Node, decisive: bool) -> Result<Value, EvalFault> {
        let function = if decisive { "_||_" } else { "_&&_" };
        let left = self.eval_bool(left, function);
        if left == Ok(decisive) {
            return Ok(Value::Bool(decisive));
        }
        let right = self.eval_bool(right, function);
        match (left, right) {
            (_, Ok(value)) if value == decisive => Ok(Value::Bool(decisive)),
            (Ok(_), Ok(_)) => Ok(Value::Bool(!decisive)),
            (Err(fault), _) | (_, Err(fault)) => Err(fault),
        }
    }

    fn comprehension(
        &mut self,
        kind: ComprehensionKind,
        range: &Node,
        body: &Node,
    ) -> Result<Value, EvalFault> {
        let values = match self.eval(range)? {
            Value::List(values) => values,
            other => {
                return Err(EvalFault::NoSuchOverload {
                    function: "comprehension",
                    found: other.type_of().to_string(),
                })
            }
        };

        self.locals.push(Value::Bool(false));
        let result = self.iterate(kind, values, body);
        self.locals.pop();
        result
    }

    fn iterate(
        &mut self,
        kind: ComprehensionKind,
        values: Vec<Value>,
        body: &Node,
    ) -> Result<Value, EvalFault> {
        let slot = self.locals.len() - 1;
        let mut deferred: Option<EvalFault> = None;
        let mut matched = 0usize;
        let mut collected = Vec::new();

        for value in values {
            self.locals[slot] = value.clone();
            match kind {
                // `all` and `exists` short-circuit on a deciding element and
                // only report an error when no element decides.
                ComprehensionKind::All => match self.eval_bool(body, "all") {
                    Ok(false) => return Ok(Value::Bool(false)),
                    Ok(true) => {}
                    Err(fault) => deferred = deferred.or(Some(fault)),
                },
                ComprehensionKind::Exists => match self.eval_bool(body, "exists") {
                    Ok(true) => return Ok(Value::Bool(true)),
                    Ok(false) => {}
                    Err(fault) => deferred = deferred.or(Some(fault)),
                },
                ComprehensionKind::ExistsOne => {
                    if self.eval_bool(body, "exists_one")? {
                        matched += 1;
                    }
                }
                ComprehensionKind::Map => collected.push(self.eval(body)?),
                ComprehensionKind::Filter => {
                    if self.eval_bool(body, "filter")? {
                        collected.push(value);
                    }
                }
            }
        }

        if let Some(fault) = deferred {
            return Err(fault);
        }
        Ok(match kind {
            ComprehensionKind::All => Value::Bool(true),
            ComprehensionKind::Exists => Value::Bool(false),
            ComprehensionKind::ExistsOne => Value::Bool(matched == 1),
            ComprehensionKind::Map | ComprehensionKind::Filter => Value::List(collected),
        })
    }
}
