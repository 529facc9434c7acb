//! Type checking.
//!
//! The checker resolves every name against the [`Environment`], picks an
//! overload for every call and operator, expands macros and lowers the
//! result into a [`Node`] tree ready for evaluation.

use crate::ast::{BinaryOp, Expr, ExprKind};
use crate::env::{Environment, FieldDecl, VariableRole};
use crate::error::{CompileError, CompileResult};
use crate::functions::{compile_regex, is_operator};
use crate::program::{ComprehensionKind, Node};
use crate::types::{signature, Type};
use crate::value::Value;

type Typed = (Node, Type);

pub(crate) struct Checker<'e> {
    env: &'e Environment,
    /// Comprehension variables in scope, innermost last.
    locals: Vec<(String, Type)>,
}

impl<'e> Checker<'e> {
    pub(crate) fn new(env: &'e Environment) -> Self {
        Self {
            env,
            locals: Vec::new(),
        }
    }

    pub(crate) fn check(&mut self, expr: &Expr) -> CompileResult<Typed> {
        let position = expr.position;
        match &expr.kind {
            ExprKind::Literal(value) => Ok((Node::Const(value.clone()), value.type_of())),
            ExprKind::Ident(name) => self.check_ident(name, position),
            ExprKind::Select { operand, field } => self.check_select(operand, field, position),
            ExprKind::Call {
                target,
                function,
                args,
            } => self.check_call(target.as_deref(), function, args, position),
            ExprKind::List(elements) => self.check_list(elements),
            ExprKind::Unary { op, operand } => {
                let operand = self.check(operand)?;
                self.resolve(op.function_name(), false, vec![operand], position)
            }
            ExprKind::Binary {
                op: op @ (BinaryOp::And | BinaryOp::Or),
                left,
                right,
            } => {
                let (left, left_ty) = self.check(left)?;
                let (right, right_ty) = self.check(right)?;
                let symbol = if *op == BinaryOp::And { "&&" } else { "||" };
                for ty in [&left_ty, &right_ty] {
                    expect_bool(ty, || format!("operator '{}'", symbol), position)?;
                }
                let node = match op {
                    BinaryOp::And => Node::And(Box::new(left), Box::new(right)),
                    _ => Node::Or(Box::new(left), Box::new(right)),
                };
                Ok((node, Type::Bool))
            }
            ExprKind::Binary { op, left, right } => {
                let left = self.check(left)?;
                let right = self.check(right)?;
                self.resolve(op.function_name(), false, vec![left, right], position)
            }
            ExprKind::Index { operand, index } => {
                let operand = self.check(operand)?;
                let index = self.check(index)?;
                self.resolve("_[_]", false, vec![operand, index], position)
            }
            ExprKind::Conditional {
                condition,
                then,
                otherwise,
            } => {
                let (condition, condition_ty) = self.check(condition)?;
                expect_bool(&condition_ty, || "conditional".to_string(), position)?;
                let (then, then_ty) = self.check(then)?;
                let (otherwise, otherwise_ty) = self.check(otherwise)?;
                let ty = match (then_ty, otherwise_ty) {
                    (Type::Dyn, ty) | (ty, Type::Dyn) => ty,
                    (a, b) if a == b => a,
                    (a, b) => {
                        return Err(CompileError::type_mismatch(
                            "conditional branches",
                            a,
                            b,
                            position,
                        ))
                    }
                };
                let node = Node::Conditional {
                    condition: Box::new(condition),
                    then: Box::new(then),
                    otherwise: Box::new(otherwise),
                };
                Ok((node, ty))
            }
        }
    }

    fn local(&self, name: &str) -> Option<(usize, &Type)> {
        self.locals
            .iter()
            .rposition(|(local, _)| local == name)
            .map(|level| (level, &self.locals[level].1))
    }

    fn check_ident(&self, name: &str, position: usize) -> CompileResult<Typed> {
        if let Some((level, ty)) = self.local(name) {
            return Ok((Node::Local(level), ty.clone()));
        }
        match self.env.variable(name) {
            Some(variable) => match variable.role {
                VariableRole::Now => Ok((Node::Now, variable.ty.clone())),
                VariableRole::Item => Err(CompileError::BareObject {
                    name: name.to_string(),
                    position,
                }),
            },
            None => {
                let candidates = self
                    .locals
                    .iter()
                    .map(|(local, _)| local.as_str())
                    .chain(self.env.variables().iter().map(|v| v.name.as_str()));
                Err(CompileError::UndeclaredReference {
                    name: name.to_string(),
                    position,
                    suggestion: closest(name, candidates),
                })
            }
        }
    }

    /// Resolves `operand.field` when the operand names an object variable.
    /// Returns `None` when the operand is some other expression.
    fn object_field(
        &self,
        operand: &Expr,
        field: &str,
        position: usize,
    ) -> CompileResult<Option<&'e FieldDecl>> {
        let Some(name) = operand.as_ident() else {
            return Ok(None);
        };
        if self.local(name).is_some() {
            return Ok(None);
        }
        let Some(Type::Object(type_name)) = self.env.variable(name).map(|v| &v.ty) else {
            return Ok(None);
        };
        let object = self.env.object_type(type_name);
        match object.and_then(|o| o.get(field)) {
            Some(decl) => Ok(Some(decl)),
            None => Err(CompileError::UnknownField {
                type_name: type_name.clone(),
                field: field.to_string(),
                position,
                suggestion: object.and_then(|o| {
                    closest(field, o.fields.iter().map(|f| f.name.as_str()))
                }),
            }),
        }
    }

    fn check_select(&mut self, operand: &Expr, field: &str, position: usize) -> CompileResult<Typed> {
        if let Some(decl) = self.object_field(operand, field, position)? {
            let node = Node::Field {
                name: decl.name.clone(),
                accessor: decl.accessor,
            };
            return Ok((node, decl.ty.clone()));
        }
        let (_, ty) = self.check(operand)?;
        Err(CompileError::UnknownField {
            type_name: ty.to_string(),
            field: field.to_string(),
            position,
            suggestion: None,
        })
    }

    fn check_call(
        &mut self,
        target: Option<&Expr>,
        function: &str,
        args: &[Expr],
        position: usize,
    ) -> CompileResult<Typed> {
        match (target, function, args) {
            (None, "has", _) => self.check_has(args, position),
            (Some(range), "all", _) => {
                self.check_comprehension(ComprehensionKind::All, function, range, args, position)
            }
            (Some(range), "exists", _) => {
                self.check_comprehension(ComprehensionKind::Exists, function, range, args, position)
            }
            (Some(range), "exists_one", _) => self.check_comprehension(
                ComprehensionKind::ExistsOne,
                function,
                range,
                args,
                position,
            ),
            (Some(range), "map", _) => {
                self.check_comprehension(ComprehensionKind::Map, function, range, args, position)
            }
            (Some(range), "filter", _) => {
                self.check_comprehension(ComprehensionKind::Filter, function, range, args, position)
            }
            (Some(text), "matches", [pattern]) | (None, "matches", [text, pattern]) => {
                match &pattern.kind {
                    ExprKind::Literal(Value::String(pattern)) => {
                        self.check_constant_matches(text, pattern, position)
                    }
                    _ => self.check_overloaded(target, function, args, position),
                }
            }
            _ => self.check_overloaded(target, function, args, position),
        }
    }

    fn check_overloaded(
        &mut self,
        target: Option<&Expr>,
        function: &str,
        args: &[Expr],
        position: usize,
    ) -> CompileResult<Typed> {
        let mut typed = Vec::with_capacity(args.len() + 1);
        if let Some(target) = target {
            typed.push(self.check(target)?);
        }
        for arg in args {
            typed.push(self.check(arg)?);
        }
        self.resolve(function, target.is_some(), typed, position)
    }

    fn check_has(&mut self, args: &[Expr], position: usize) -> CompileResult<Typed> {
        let usage = "expects a single field selection, e.g. has(item.Title)";
        let [arg] = args else {
            return Err(CompileError::invalid_macro("has", usage, position));
        };
        let ExprKind::Select { operand, field } = &arg.kind else {
            return Err(CompileError::invalid_macro("has", usage, position));
        };
        match self.object_field(operand, field, arg.position)? {
            Some(decl) => Ok((
                Node::Has {
                    accessor: decl.accessor,
                },
                Type::Bool,
            )),
            None => Err(CompileError::invalid_macro("has", usage, position)),
        }
    }

    fn check_comprehension(
        &mut self,
        kind: ComprehensionKind,
        name: &str,
        range: &Expr,
        args: &[Expr],
        position: usize,
    ) -> CompileResult<Typed> {
        let [variable, body] = args else {
            return Err(CompileError::invalid_macro(
                name,
                "expects a variable and an expression, e.g. list.exists(x, x == \"go\")",
                position,
            ));
        };
        let Some(variable) = variable.as_ident() else {
            return Err(CompileError::invalid_macro(
                name,
                "first argument must be a variable name",
                variable.position,
            ));
        };

        let (range, range_ty) = self.check(range)?;
        let element = match &range_ty {
            Type::List(element) => (**element).clone(),
            Type::Dyn => Type::Dyn,
            other => {
                return Err(CompileError::type_mismatch(
                    format!("'{}'", name),
                    "a list",
                    other,
                    position,
                ))
            }
        };

        self.locals.push((variable.to_string(), element.clone()));
        let checked = self.check(body);
        self.locals.pop();
        let (body_node, body_ty) = checked?;

        let ty = match kind {
            ComprehensionKind::Map => Type::list(body_ty),
            ComprehensionKind::Filter => {
                expect_bool(&body_ty, || format!("'{}' predicate", name), body.position)?;
                Type::list(element)
            }
            _ => {
                expect_bool(&body_ty, || format!("'{}' predicate", name), body.position)?;
                Type::Bool
            }
        };

        let node = Node::Comprehension {
            kind,
            range: Box::new(range),
            body: Box::new(body_node),
        };
        Ok((node, ty))
    }

    fn check_constant_matches(
        &mut self,
        text: &Expr,
        pattern: &str,
        position: usize,
    ) -> CompileResult<Typed> {
        let (target, ty) = self.check(text)?;
        if !matches!(ty, Type::String | Type::Dyn) {
            return Err(CompileError::NoMatchingOverload {
                function: "matches".to_string(),
                signature: signature(&[ty, Type::String]),
                position,
            });
        }
        let regex = compile_regex(pattern).map_err(|message| CompileError::InvalidArgument {
            function: "matches".to_string(),
            message,
            position,
        })?;
        let node = Node::Matches {
            target: Box::new(target),
            regex,
        };
        Ok((node, Type::Bool))
    }

    fn check_list(&mut self, elements: &[Expr]) -> CompileResult<Typed> {
        let mut nodes = Vec::with_capacity(elements.len());
        let mut element_ty = Type::Dyn;
        for element in elements {
            let (node, ty) = self.check(element)?;
            match (&element_ty, &ty) {
                (_, Type::Dyn) => {}
                (Type::Dyn, _) => element_ty = ty,
                (expected, found) if expected != found => {
                    return Err(CompileError::type_mismatch(
                        "list literal",
                        expected,
                        found,
                        element.position,
                    ));
                }
                _ => {}
            }
            nodes.push(node);
        }

        let constants: Option<Vec<Value>> = nodes
            .iter()
            .map(|node| match node {
                Node::Const(value) => Some(value.clone()),
                _ => None,
            })
            .collect();
        let node = match constants {
            Some(values) => Node::Const(Value::List(values)),
            None => Node::List(nodes),
        };
        Ok((node, Type::list(element_ty)))
    }

    /// Picks the overload of `name` that accepts the argument types.
    fn resolve(
        &self,
        name: &str,
        receiver_style: bool,
        typed: Vec<Typed>,
        position: usize,
    ) -> CompileResult<Typed> {
        let Some(function) = self.env.function(name) else {
            let candidates = self
                .env
                .functions()
                .map(|f| f.name.as_str())
                .filter(|f| !is_operator(f));
            return Err(CompileError::UndeclaredReference {
                name: name.to_string(),
                position,
                suggestion: closest(name, candidates),
            });
        };

        let (args, types): (Vec<Node>, Vec<Type>) = typed.into_iter().unzip();
        let Some((overload, result)) = function
            .overloads
            .iter()
            .find_map(|o| o.accepts(receiver_style, &types).map(|ty| (o, ty)))
        else {
            return Err(CompileError::NoMatchingOverload {
                function: name.to_string(),
                signature: signature(&types),
                position,
            });
        };

        if overload.foldable {
            let constants: Option<Vec<Value>> = args
                .iter()
                .map(|node| match node {
                    Node::Const(value) => Some(value.clone()),
                    _ => None,
                })
                .collect();
            if let Some(values) = constants {
                return match (overload.implementation)(&values) {
                    Ok(value) => Ok((Node::Const(value), result)),
                    Err(fault) => Err(CompileError::InvalidArgument {
                        function: name.to_string(),
                        message: fault.to_string(),
                        position,
                    }),
                };
            }
        }

        let node = Node::Call {
            implementation: overload.implementation,
            args,
        };
        Ok((node, result))
    }
}

fn expect_bool(ty: &Type, context: impl FnOnce() -> String, position: usize) -> CompileResult<()> {
    match ty {
        Type::Bool | Type::Dyn => Ok(()),
        other => Err(CompileError::type_mismatch(context(), Type::Bool, other, position)),
    }
}

/// Finds the candidate closest to `name`, ignoring case, if any is close
/// enough to be a plausible typo.
fn closest<'a>(name: &str, candidates: impl IntoIterator<Item = &'a str>) -> Option<String> {
    let lowered = name.to_lowercase();
    let threshold = (name.chars().count() / 3).max(2);
    candidates
        .into_iter()
        .map(|candidate| {
            (
                strsim::levenshtein(&lowered, &candidate.to_lowercase()),
                candidate,
            )
        })
        .filter(|(distance, _)| *distance <= threshold)
        .min_by_key(|(distance, _)| *distance)
        .map(|(_, candidate)| candidate.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closest_is_case_insensitive() {
        assert_eq!(
            closest("title", ["URL", "Title", "Author"]),
            Some("Title".to_string())
        );
    }

    #[test]
    fn test_closest_tolerates_small_typos() {
        assert_eq!(
            closest("Publshed", ["Published", "Updated"]),
            Some("Published".to_string())
        );
    }

    #[test]
    fn test_closest_rejects_distant_names() {
        assert_eq!(closest("NonExistentField", ["URL", "Title", "Content"]), None);
    }
}
