//! A small typed condition language.
//!
//! Source text is lexed, parsed with a Pratt parser, type checked against the
//! registered builtins and then evaluated against an [`Environment`] of named
//! values:
//!
//! ```
//! use conditions::{Condition, Environment};
//!
//! let condition = Condition::compile(r#"len(tags) > 1 && role in ["admin", "ops"]"#).unwrap();
//!
//! let mut env = Environment::new();
//! env.set("tags", vec!["a".to_string(), "b".to_string()]).unwrap();
//! env.set("role", "ops").unwrap();
//! assert_eq!(condition.is_satisfied(&env), Ok(true));
//! ```

use miette::{Diagnostic, NamedSource};
use thiserror::Error;

pub mod ast;
pub mod check;
pub mod eval;
pub mod lex;
pub mod object;
pub mod parse;
pub mod system;

pub use ast::Program;
pub use check::{Checker, TypeError};
pub use eval::{Environment, EnvironmentError, Evaluator, RuntimeError};
pub use lex::Lexer;
pub use object::{Object, ObjectType};
pub use parse::{Parser, SyntaxError};
pub use system::{Builtin, Builtins, Signature};

/// One entry of the ordered error channel shared by the parser and the checker.
#[derive(Error, Debug, Diagnostic, Clone, PartialEq)]
pub enum CompileError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Syntax(#[from] SyntaxError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Type(#[from] TypeError),
}

/// Every error found while compiling one condition, with its source attached
/// for rendering.
#[derive(Error, Debug, Diagnostic)]
#[error("invalid condition `{condition}`")]
#[diagnostic(code(conditions::compile))]
pub struct CompileErrors {
    #[source_code]
    src: NamedSource<String>,
    condition: String,
    #[related]
    errors: Vec<CompileError>,
}

impl CompileErrors {
    pub fn new(condition: &str, errors: Vec<CompileError>) -> Self {
        CompileErrors {
            src: NamedSource::new("condition", condition.to_string()),
            condition: condition.to_string(),
            errors,
        }
    }

    pub fn errors(&self) -> &[CompileError] {
        &self.errors
    }
}

/// Parses and checks `source` against the global builtins.
pub fn parse(source: &str) -> (Program, Vec<CompileError>) {
    Parser::new(source).parse_program()
}

pub fn check(program: &Program) -> (ObjectType, Vec<CompileError>) {
    check_with(program, Builtins::global())
}

pub fn check_with(program: &Program, builtins: &Builtins) -> (ObjectType, Vec<CompileError>) {
    let mut errors = Vec::new();
    let ty = Checker::new(builtins, &mut errors).check_program(program);
    (ty, errors)
}

pub fn evaluate(program: &Program, env: &Environment) -> Object {
    Evaluator::new(Builtins::global()).eval(program, env)
}

/// A condition that parsed and type checked cleanly, bound to the builtins it
/// was checked against.
#[derive(Debug, Clone)]
pub struct Condition<'b> {
    program: Program,
    ty: ObjectType,
    builtins: &'b Builtins,
}

impl Condition<'static> {
    pub fn compile(source: &str) -> Result<Self, CompileErrors> {
        Condition::compile_with(source, Builtins::global())
    }
}

impl<'b> Condition<'b> {
    pub fn compile_with(source: &str, builtins: &'b Builtins) -> Result<Self, CompileErrors> {
        let (program, mut errors) = Parser::new(source).with_builtins(builtins).parse_program();
        if !errors.is_empty() {
            return Err(CompileErrors::new(source, errors));
        }
        let ty = Checker::new(builtins, &mut errors).check_program(&program);
        Ok(Condition {
            program,
            ty,
            builtins,
        })
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    /// Static result type. `IDENT` when it depends on the bindings.
    pub fn result_type(&self) -> ObjectType {
        self.ty
    }

    pub fn evaluate(&self, env: &Environment) -> Object {
        Evaluator::new(self.builtins).eval(&self.program, env)
    }

    /// Truthiness of the result; runtime errors are returned instead.
    pub fn is_satisfied(&self, env: &Environment) -> Result<bool, RuntimeError> {
        match self.evaluate(env) {
            Object::Error(error) => Err(error),
            value => Ok(value.is_truthy()),
        }
    }
}
