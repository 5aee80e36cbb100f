use std::collections::{HashMap, HashSet};

use miette::Diagnostic;
use thiserror::Error;

use crate::{
    ast::{Expression, InfixOp, PrefixOp, Program},
    object::{Object, ObjectType},
    system::Builtins,
};

/// Failure produced while evaluating. Carried by [`Object::Error`] rather than
/// returned, so it flows through evaluation like any other value.
#[derive(Error, Debug, Diagnostic, Clone, PartialEq)]
pub enum RuntimeError {
    #[error("identifier not found: {0}")]
    #[diagnostic(help("bind `{0}` in the environment before evaluating"))]
    IdentifierNotFound(String),

    #[error("not a function: {0}")]
    NotAFunction(ObjectType),

    #[error("unknown operator: {left} {operator} {right}")]
    UnknownOperator {
        left: ObjectType,
        operator: InfixOp,
        right: ObjectType,
    },

    #[error("division by zero")]
    DivisionByZero,

    #[error("integer overflow: {left} {operator} {right}")]
    IntegerOverflow {
        left: i64,
        operator: InfixOp,
        right: i64,
    },

    #[error("wrong number of arguments to `{function}`: got {got}, want {expected}")]
    WrongArgumentCount {
        function: String,
        expected: usize,
        got: usize,
    },

    #[error("argument to `{function}` not supported, got {found}")]
    UnsupportedArgument { function: String, found: ObjectType },

    #[error("{0}")]
    Custom(String),
}

#[derive(Error, Debug, Diagnostic, Clone, PartialEq)]
pub enum EnvironmentError {
    #[error("cannot assign to `{0}`: it was declared read-only")]
    #[diagnostic(help("read-only bindings can be read but never reassigned"))]
    ReadOnly(String),
}

/// Host-owned bindings that conditions are evaluated against.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    store: HashMap<String, Object>,
    read_only: HashSet<String>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Object> {
        self.store.get(name)
    }

    pub fn is_readonly(&self, name: &str) -> bool {
        self.read_only.contains(name)
    }

    pub fn set(
        &mut self,
        name: impl Into<String>,
        value: impl Into<Object>,
    ) -> Result<&Object, EnvironmentError> {
        let name = name.into();
        if self.is_readonly(&name) {
            log::debug!("rejected write to read-only `{name}`");
            return Err(EnvironmentError::ReadOnly(name));
        }
        Ok(self.insert(name, value.into()))
    }

    /// Binds `name` and marks it read-only for the rest of the environment's life.
    pub fn set_readonly(
        &mut self,
        name: impl Into<String>,
        value: impl Into<Object>,
    ) -> Result<&Object, EnvironmentError> {
        let name = name.into();
        if !self.read_only.insert(name.clone()) {
            return Err(EnvironmentError::ReadOnly(name));
        }
        Ok(self.insert(name, value.into()))
    }

    fn insert(&mut self, name: String, value: Object) -> &Object {
        match self.store.entry(name) {
            std::collections::hash_map::Entry::Occupied(mut slot) => {
                slot.insert(value);
                slot.into_mut()
            }
            std::collections::hash_map::Entry::Vacant(slot) => slot.insert(value),
        }
    }
}

/// Tree-walking evaluator. Identifiers missing from the environment are
/// looked up in `builtins`.
pub struct Evaluator<'b> {
    builtins: &'b Builtins,
}

impl<'b> Evaluator<'b> {
    pub fn new(builtins: &'b Builtins) -> Self {
        Self { builtins }
    }

    pub fn eval(&self, program: &Program, env: &Environment) -> Object {
        let result = match &program.expression {
            Some(expression) => self.eval_expression(expression, env),
            None => Object::Null,
        };
        log::debug!("evaluated `{program}` to {result}");
        result
    }

    pub fn eval_expression(&self, expr: &Expression, env: &Environment) -> Object {
        match expr {
            Expression::Integer(value) => Object::Integer(*value),
            Expression::String(value) => Object::String(value.clone()),
            Expression::Boolean(value) => Object::from_bool(*value),
            Expression::ArrayInteger(values) => Object::ArrayInteger(values.clone()),
            Expression::ArrayString(values) => Object::ArrayString(values.clone()),
            Expression::Identifier(name) => self.eval_identifier(name, env),
            Expression::Call {
                function,
                arguments,
            } => {
                let function = self.eval_expression(function, env);
                if function.is_error() {
                    return function;
                }
                let mut values = Vec::with_capacity(arguments.len());
                for argument in arguments {
                    let value = self.eval_expression(argument, env);
                    if value.is_error() {
                        return value;
                    }
                    values.push(value);
                }
                match function {
                    Object::Builtin(builtin) => builtin.call(&values),
                    other => RuntimeError::NotAFunction(other.object_type()).into(),
                }
            }
            Expression::Prefix { operator, operand } => {
                let operand = self.eval_expression(operand, env);
                if operand.is_error() {
                    return operand;
                }
                eval_prefix(*operator, operand)
            }
            Expression::Infix {
                left,
                operator,
                right,
            } => {
                let left = self.eval_expression(left, env);
                if left.is_error() {
                    return left;
                }
                let right = self.eval_expression(right, env);
                if right.is_error() {
                    return right;
                }
                eval_infix(*operator, left, right)
            }
        }
    }

    fn eval_identifier(&self, name: &str, env: &Environment) -> Object {
        if let Some(value) = env.get(name) {
            return value.clone();
        }
        match self.builtins.get(name) {
            Some(builtin) => Object::Builtin(builtin.clone()),
            None => RuntimeError::IdentifierNotFound(name.to_string()).into(),
        }
    }
}

fn eval_prefix(operator: PrefixOp, operand: Object) -> Object {
    match operator {
        // anything that is not a boolean negates to false
        PrefixOp::Not => match operand {
            Object::Boolean(value) => Object::from_bool(!value),
            _ => Object::from_bool(false),
        },
    }
}

fn eval_infix(operator: InfixOp, left: Object, right: Object) -> Object {
    // both sides were already evaluated: `&&` and `||` never short-circuit
    match operator {
        InfixOp::And => return Object::from_bool(left.is_truthy() && right.is_truthy()),
        InfixOp::Or => return Object::from_bool(left.is_truthy() || right.is_truthy()),
        _ => {}
    }

    match (left, right) {
        (Object::Integer(lhs), Object::Integer(rhs)) => eval_integer_infix(operator, lhs, rhs),
        (Object::String(lhs), Object::String(rhs)) => eval_string_infix(operator, lhs, rhs),
        (Object::Boolean(lhs), Object::Boolean(rhs)) => match operator {
            InfixOp::Equal => Object::from_bool(lhs == rhs),
            InfixOp::NotEqual => Object::from_bool(lhs != rhs),
            _ => unknown_operator(
                ObjectType::Boolean,
                operator,
                ObjectType::Boolean,
            ),
        },
        (Object::Integer(needle), Object::ArrayInteger(haystack)) if operator == InfixOp::In => {
            Object::Boolean(haystack.contains(&needle))
        }
        (Object::String(needle), Object::ArrayString(haystack)) if operator == InfixOp::In => {
            Object::Boolean(haystack.contains(&needle))
        }
        (left, right) => unknown_operator(left.object_type(), operator, right.object_type()),
    }
}

fn eval_integer_infix(operator: InfixOp, lhs: i64, rhs: i64) -> Object {
    let arithmetic = |result: Option<i64>| match result {
        Some(value) => Object::Integer(value),
        None => RuntimeError::IntegerOverflow {
            left: lhs,
            operator,
            right: rhs,
        }
        .into(),
    };
    match operator {
        InfixOp::Plus => arithmetic(lhs.checked_add(rhs)),
        InfixOp::Minus => arithmetic(lhs.checked_sub(rhs)),
        InfixOp::Star => arithmetic(lhs.checked_mul(rhs)),
        InfixOp::Slash if rhs == 0 => RuntimeError::DivisionByZero.into(),
        InfixOp::Slash => arithmetic(lhs.checked_div(rhs)),
        InfixOp::Less => Object::from_bool(lhs < rhs),
        InfixOp::LessEqual => Object::from_bool(lhs <= rhs),
        InfixOp::Greater => Object::from_bool(lhs > rhs),
        InfixOp::GreaterEqual => Object::from_bool(lhs >= rhs),
        InfixOp::Equal => Object::from_bool(lhs == rhs),
        InfixOp::NotEqual => Object::from_bool(lhs != rhs),
        _ => unknown_operator(ObjectType::Integer, operator, ObjectType::Integer),
    }
}

/// Ordering between strings compares their lengths, not their contents.
fn eval_string_infix(operator: InfixOp, lhs: String, rhs: String) -> Object {
    match operator {
        InfixOp::Plus => Object::String(lhs + &rhs),
        InfixOp::Less => Object::from_bool(lhs.len() < rhs.len()),
        InfixOp::LessEqual => Object::from_bool(lhs.len() <= rhs.len()),
        InfixOp::Greater => Object::from_bool(lhs.len() > rhs.len()),
        InfixOp::GreaterEqual => Object::from_bool(lhs.len() >= rhs.len()),
        InfixOp::Equal => Object::from_bool(lhs == rhs),
        InfixOp::NotEqual => Object::from_bool(lhs != rhs),
        _ => unknown_operator(ObjectType::String, operator, ObjectType::String),
    }
}

fn unknown_operator(left: ObjectType, operator: InfixOp, right: ObjectType) -> Object {
    RuntimeError::UnknownOperator {
        left,
        operator,
        right,
    }
    .into()
}
