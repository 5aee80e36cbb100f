//! Static type checking of a parsed condition.
//!
//! Identifiers check as [`ObjectType::Ident`], a wildcard that satisfies every
//! operand requirement: their real types are only known once an environment is
//! supplied at evaluation time.

use miette::Diagnostic;
use thiserror::Error;

use crate::{
    CompileError,
    ast::{Expression, InfixOp, PrefixOp, Program},
    object::ObjectType,
    system::Builtins,
};

#[derive(Error, Debug, Diagnostic, Clone, PartialEq)]
pub enum TypeError {
    #[error("operator {operator} cannot be applied to {operand}")]
    PrefixOperand {
        operator: PrefixOp,
        operand: ObjectType,
    },

    #[error("unknown operator {operator} in `{expression}`")]
    #[diagnostic(help("`~=` is reserved and not supported"))]
    UnknownInfixOperator {
        operator: InfixOp,
        expression: String,
    },

    #[error("`{expression}`: operator {operator} does not accept a left operand of type {left}")]
    UnknownLeftType {
        expression: String,
        operator: InfixOp,
        left: ObjectType,
    },

    #[error("`{expression}`: right operand of {operator} must be {expected}, got {found}")]
    RightTypeMismatch {
        expression: String,
        operator: InfixOp,
        expected: ObjectType,
        found: ObjectType,
    },

    #[error("unknown function `{0}`")]
    UnknownFunction(String),

    #[error("`{function}` takes {expected} argument(s), got {got}")]
    Arity {
        function: String,
        expected: String,
        got: usize,
    },

    #[error("no overload of `{function}` accepts ({arguments})")]
    NoMatchingOverload { function: String, arguments: String },

    #[error("condition has no expression to check")]
    Empty,
}

/// Operand types accepted by a prefix operator. The result is always BOOLEAN.
pub fn prefix_protos(operator: PrefixOp) -> &'static [ObjectType] {
    match operator {
        PrefixOp::Not => &[ObjectType::Boolean],
    }
}

/// `(left, right, result)` rows accepted by an infix operator. `None` for
/// operators that cannot be type checked at all.
pub fn infix_protos(operator: InfixOp) -> Option<&'static [(ObjectType, ObjectType, ObjectType)]> {
    use ObjectType::*;

    const ORDERING: &[(ObjectType, ObjectType, ObjectType)] =
        &[(Integer, Integer, Boolean), (String, String, Boolean)];
    const EQUALITY: &[(ObjectType, ObjectType, ObjectType)] = &[
        (Integer, Integer, Boolean),
        (String, String, Boolean),
        (Boolean, Boolean, Boolean),
    ];
    const LOGICAL: &[(ObjectType, ObjectType, ObjectType)] = &[(Boolean, Boolean, Boolean)];
    const MEMBERSHIP: &[(ObjectType, ObjectType, ObjectType)] = &[
        (Integer, ArrayInteger, Boolean),
        (String, ArrayString, Boolean),
    ];
    const CONCAT: &[(ObjectType, ObjectType, ObjectType)] =
        &[(Integer, Integer, Integer), (String, String, String)];
    const ARITHMETIC: &[(ObjectType, ObjectType, ObjectType)] = &[(Integer, Integer, Integer)];

    match operator {
        InfixOp::Less | InfixOp::LessEqual | InfixOp::Greater | InfixOp::GreaterEqual => {
            Some(ORDERING)
        }
        InfixOp::Equal | InfixOp::NotEqual => Some(EQUALITY),
        InfixOp::And | InfixOp::Or => Some(LOGICAL),
        InfixOp::In => Some(MEMBERSHIP),
        InfixOp::Plus => Some(CONCAT),
        InfixOp::Minus | InfixOp::Star | InfixOp::Slash => Some(ARITHMETIC),
        InfixOp::Match => None,
    }
}

pub struct Checker<'a> {
    builtins: &'a Builtins,
    errors: &'a mut Vec<CompileError>,
}

impl<'a> Checker<'a> {
    /// Errors are appended to `errors`. Checking does nothing if it already
    /// holds entries.
    pub fn new(builtins: &'a Builtins, errors: &'a mut Vec<CompileError>) -> Self {
        Self { builtins, errors }
    }

    pub fn check_program(&mut self, program: &Program) -> ObjectType {
        if !self.errors.is_empty() {
            return ObjectType::Error;
        }
        let ty = match &program.expression {
            Some(expression) => self.check_type(expression),
            None => self.error(TypeError::Empty),
        };
        log::debug!("checked `{program}` as {ty}");
        ty
    }

    pub fn check_type(&mut self, expr: &Expression) -> ObjectType {
        if !self.errors.is_empty() {
            return ObjectType::Error;
        }
        match expr {
            Expression::Integer(_) => ObjectType::Integer,
            Expression::String(_) => ObjectType::String,
            Expression::Boolean(_) => ObjectType::Boolean,
            Expression::ArrayInteger(_) => ObjectType::ArrayInteger,
            Expression::ArrayString(_) => ObjectType::ArrayString,
            Expression::Identifier(_) => ObjectType::Ident,
            Expression::Prefix { operator, operand } => {
                let operand = self.check_type(operand);
                match operand {
                    ObjectType::Error => ObjectType::Error,
                    ObjectType::Ident => ObjectType::Boolean,
                    ty if prefix_protos(*operator).contains(&ty) => ObjectType::Boolean,
                    ty => self.error(TypeError::PrefixOperand {
                        operator: *operator,
                        operand: ty,
                    }),
                }
            }
            Expression::Infix {
                left,
                operator,
                right,
            } => {
                let Some(protos) = infix_protos(*operator) else {
                    return self.error(TypeError::UnknownInfixOperator {
                        operator: *operator,
                        expression: expr.to_string(),
                    });
                };
                let left = self.check_type(left);
                let right = self.check_type(right);
                if left == ObjectType::Error || right == ObjectType::Error {
                    return ObjectType::Error;
                }
                if left == ObjectType::Ident || right == ObjectType::Ident {
                    return wildcard_result(protos, left, right);
                }
                let Some(&(_, expected, result)) = protos.iter().find(|row| row.0 == left) else {
                    return self.error(TypeError::UnknownLeftType {
                        expression: expr.to_string(),
                        operator: *operator,
                        left,
                    });
                };
                if expected != right {
                    return self.error(TypeError::RightTypeMismatch {
                        expression: expr.to_string(),
                        operator: *operator,
                        expected,
                        found: right,
                    });
                }
                result
            }
            Expression::Call {
                function,
                arguments,
            } => self.check_call(&function.to_string(), arguments),
        }
    }

    fn check_call(&mut self, name: &str, arguments: &[Expression]) -> ObjectType {
        let builtins = self.builtins;
        let Some(builtin) = builtins.get(name) else {
            return self.error(TypeError::UnknownFunction(name.to_string()));
        };

        let candidates: Vec<_> = builtin
            .signatures()
            .iter()
            .filter(|signature| signature.arguments.len() == arguments.len())
            .collect();
        if candidates.is_empty() {
            let mut arities: Vec<_> = builtin
                .signatures()
                .iter()
                .map(|signature| signature.arguments.len())
                .collect();
            arities.sort_unstable();
            arities.dedup();
            let expected = arities
                .iter()
                .map(usize::to_string)
                .collect::<Vec<_>>()
                .join(" or ");
            return self.error(TypeError::Arity {
                function: name.to_string(),
                expected,
                got: arguments.len(),
            });
        }

        let types: Vec<_> = arguments.iter().map(|arg| self.check_type(arg)).collect();
        if types.contains(&ObjectType::Error) {
            return ObjectType::Error;
        }

        let matched = candidates.iter().find(|signature| {
            signature
                .arguments
                .iter()
                .zip(&types)
                .all(|(want, got)| *got == ObjectType::Ident || want == got)
        });
        match matched {
            Some(signature) => signature.returns,
            None => self.error(TypeError::NoMatchingOverload {
                function: name.to_string(),
                arguments: types
                    .iter()
                    .map(ObjectType::to_string)
                    .collect::<Vec<_>>()
                    .join(", "),
            }),
        }
    }

    fn error(&mut self, error: TypeError) -> ObjectType {
        log::debug!("type error: {error}");
        self.errors.push(error.into());
        ObjectType::Error
    }
}

/// Result type of an infix expression with at least one wildcard operand.
///
/// The rows compatible with the known operand decide the type, or every row
/// when none are. A concrete type is returned only when those rows agree;
/// otherwise the result stays a wildcard.
fn wildcard_result(
    protos: &[(ObjectType, ObjectType, ObjectType)],
    left: ObjectType,
    right: ObjectType,
) -> ObjectType {
    let fits = |want: ObjectType, got: ObjectType| got == ObjectType::Ident || want == got;
    let mut results: Vec<_> = protos
        .iter()
        .filter(|(l, r, _)| fits(*l, left) && fits(*r, right))
        .map(|row| row.2)
        .collect();
    if results.is_empty() {
        results = protos.iter().map(|row| row.2).collect();
    }
    match results.first() {
        Some(&first) if results.iter().all(|&result| result == first) => first,
        _ => ObjectType::Ident,
    }
}
