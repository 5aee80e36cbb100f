//! Syntax tree produced by the parser and consumed by the checker and the
//! evaluator. Rendering a node with `Display` yields source text that parses
//! back to an equal node, for every node the parser can build. Negative
//! integers and strings holding `"` have no source spelling, so hand-built
//! nodes carrying them render but do not parse back.

use std::fmt::{self, Display};

use crate::lex::TokenKind;

/// Root of a parsed condition. `expression` is `None` only when parsing failed.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Program {
    pub expression: Option<Expression>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Identifier(String),
    Integer(i64),
    Boolean(bool),
    String(String),
    ArrayInteger(Vec<i64>),
    ArrayString(Vec<String>),
    Prefix {
        operator: PrefixOp,
        operand: Box<Expression>,
    },
    Infix {
        left: Box<Expression>,
        operator: InfixOp,
        right: Box<Expression>,
    },
    Call {
        function: Box<Expression>,
        arguments: Vec<Expression>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrefixOp {
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InfixOp {
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    Equal,
    NotEqual,
    Match,
    And,
    Or,
    In,
    Plus,
    Minus,
    Star,
    Slash,
}

impl PrefixOp {
    pub fn from_token(kind: TokenKind) -> Option<Self> {
        match kind {
            TokenKind::Bang => Some(PrefixOp::Not),
            _ => None,
        }
    }
}

impl InfixOp {
    pub fn from_token(kind: TokenKind) -> Option<Self> {
        Some(match kind {
            TokenKind::Less => InfixOp::Less,
            TokenKind::LessEqual => InfixOp::LessEqual,
            TokenKind::Greater => InfixOp::Greater,
            TokenKind::GreaterEqual => InfixOp::GreaterEqual,
            TokenKind::EqualEqual => InfixOp::Equal,
            TokenKind::BangEqual => InfixOp::NotEqual,
            TokenKind::Match => InfixOp::Match,
            TokenKind::And => InfixOp::And,
            TokenKind::Or => InfixOp::Or,
            TokenKind::In => InfixOp::In,
            TokenKind::Plus => InfixOp::Plus,
            TokenKind::Minus => InfixOp::Minus,
            TokenKind::Star => InfixOp::Star,
            TokenKind::Slash => InfixOp::Slash,
            _ => return None,
        })
    }
}

impl Display for PrefixOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrefixOp::Not => f.write_str("!"),
        }
    }
}

impl Display for InfixOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = match self {
            InfixOp::Less => "<",
            InfixOp::LessEqual => "<=",
            InfixOp::Greater => ">",
            InfixOp::GreaterEqual => ">=",
            InfixOp::Equal => "==",
            InfixOp::NotEqual => "!=",
            InfixOp::Match => "~=",
            InfixOp::And => "&&",
            InfixOp::Or => "||",
            InfixOp::In => "in",
            InfixOp::Plus => "+",
            InfixOp::Minus => "-",
            InfixOp::Star => "*",
            InfixOp::Slash => "/",
        };
        f.write_str(op)
    }
}

/// Writes `items` separated by `, `.
fn write_list<T>(
    f: &mut fmt::Formatter<'_>,
    items: &[T],
    mut each: impl FnMut(&T, &mut fmt::Formatter<'_>) -> fmt::Result,
) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        each(item, f)?;
    }
    Ok(())
}

impl Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Identifier(name) => f.write_str(name),
            Expression::Integer(value) => write!(f, "{value}"),
            Expression::Boolean(value) => write!(f, "{value}"),
            Expression::String(value) => write!(f, "\"{value}\""),
            Expression::ArrayInteger(values) => {
                f.write_str("[")?;
                write_list(f, values, |v, f| write!(f, "{v}"))?;
                f.write_str("]")
            }
            Expression::ArrayString(values) => {
                f.write_str("[")?;
                write_list(f, values, |v, f| write!(f, "\"{v}\""))?;
                f.write_str("]")
            }
            Expression::Prefix { operator, operand } => write!(f, "({operator}{operand})"),
            Expression::Infix {
                left,
                operator,
                right,
            } => write!(f, "({left} {operator} {right})"),
            Expression::Call {
                function,
                arguments,
            } => {
                write!(f, "{function}(")?;
                write_list(f, arguments, |a, f| write!(f, "{a}"))?;
                f.write_str(")")
            }
        }
    }
}

impl Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.expression {
            Some(expression) => write!(f, "{expression}"),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ident(name: &str) -> Box<Expression> {
        Box::new(Expression::Identifier(name.to_string()))
    }

    #[test]
    fn literals_render_as_source() {
        assert_eq!(Expression::Integer(5).to_string(), "5");
        assert_eq!(Expression::Boolean(false).to_string(), "false");
        assert_eq!(Expression::String("ok".into()).to_string(), "\"ok\"");
        assert_eq!(Expression::ArrayInteger(vec![1, 2, 3]).to_string(), "[1, 2, 3]");
        assert_eq!(
            Expression::ArrayString(vec!["a".into(), "b".into()]).to_string(),
            r#"["a", "b"]"#
        );
    }

    #[test]
    fn composite_nodes_are_parenthesized() {
        let not = Expression::Prefix {
            operator: PrefixOp::Not,
            operand: ident("done"),
        };
        assert_eq!(not.to_string(), "(!done)");

        let call = Expression::Call {
            function: ident("len"),
            arguments: vec![Expression::Identifier("tags".into()), Expression::Integer(1)],
        };
        assert_eq!(call.to_string(), "len(tags, 1)");

        let infix = Expression::Infix {
            left: Box::new(call),
            operator: InfixOp::Greater,
            right: Box::new(Expression::Integer(1)),
        };
        assert_eq!(infix.to_string(), "(len(tags, 1) > 1)");
    }

    #[test]
    fn empty_program_renders_nothing() {
        assert_eq!(Program::default().to_string(), "");
    }

    #[test]
    fn operators_map_from_tokens() {
        assert_eq!(InfixOp::from_token(TokenKind::In), Some(InfixOp::In));
        assert_eq!(InfixOp::from_token(TokenKind::Comma), None);
        assert_eq!(PrefixOp::from_token(TokenKind::Bang), Some(PrefixOp::Not));
        assert_eq!(PrefixOp::from_token(TokenKind::Minus), None);
    }
}
