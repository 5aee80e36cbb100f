use miette::{Diagnostic, SourceSpan};
use thiserror::Error;

use crate::{
    CompileError,
    ast::{Expression, InfixOp, PrefixOp, Program},
    check::Checker,
    lex::{Lexer, Precedence, Token, TokenKind},
    system::Builtins,
};

#[derive(Error, Debug, Diagnostic, Clone, PartialEq)]
pub enum SyntaxError {
    #[error("no prefix parse function for {kind} found")]
    NoPrefix {
        kind: TokenKind,
        #[label("expected an expression")]
        span: SourceSpan,
    },

    #[error("expected next token to be {expected}, got {found} instead")]
    UnexpectedToken {
        expected: TokenKind,
        found: TokenKind,
        #[label("expected {expected}")]
        span: SourceSpan,
    },

    #[error("could not parse {literal:?} as integer")]
    #[diagnostic(help("integers are signed 64-bit"))]
    InvalidInteger {
        literal: String,
        #[label("this literal")]
        span: SourceSpan,
    },

    #[error("empty array is not allowed")]
    #[diagnostic(help("the first element fixes the element type of an array"))]
    EmptyArray {
        #[label("empty array")]
        span: SourceSpan,
    },

    #[error("mixed array element types: expected {expected}, got {found}")]
    MixedArray {
        expected: TokenKind,
        found: TokenKind,
        #[label("this element")]
        span: SourceSpan,
    },

    #[error("unknown array element type {found}")]
    #[diagnostic(help("array elements must be integer or string literals"))]
    UnknownArrayType {
        found: TokenKind,
        #[label("this element")]
        span: SourceSpan,
    },

    #[error("unexpected `{literal}` after the end of the condition")]
    #[diagnostic(help("a condition is a single expression; join expressions with `&&` or `||`"))]
    TrailingInput {
        literal: String,
        #[label("unexpected {found}")]
        span: SourceSpan,
        found: TokenKind,
    },
}

/// Tokens that close or separate a construct. Recovery stops in front of them.
fn is_boundary(kind: TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::Eof
            | TokenKind::RightParen
            | TokenKind::RightBracket
            | TokenKind::Comma
            | TokenKind::Semicolon
    )
}

/// Parses integer literal text, honouring the `0x`, `0o` and `0b` prefixes.
pub fn parse_integer(literal: &str) -> Option<i64> {
    let (digits, radix) = match literal.get(..2) {
        Some("0x" | "0X") => (&literal[2..], 16),
        Some("0o" | "0O") => (&literal[2..], 8),
        Some("0b" | "0B") => (&literal[2..], 2),
        _ => (literal, 10),
    };
    i64::from_str_radix(digits, radix).ok()
}

pub struct Parser<'de, 'b> {
    whole: &'de str,
    lexer: Lexer<'de>,
    peeked: Token<'de>,
    builtins: &'b Builtins,
    errors: Vec<CompileError>,
}

impl<'de> Parser<'de, 'static> {
    /// A parser that checks calls against [`Builtins::global`].
    pub fn new(whole: &'de str) -> Self {
        let mut lexer = Lexer::new(whole);
        let peeked = lexer.next_token();
        Parser {
            whole,
            lexer,
            peeked,
            builtins: Builtins::global(),
            errors: Vec::new(),
        }
    }
}

impl<'de, 'b> Parser<'de, 'b> {
    pub fn with_builtins<'c>(self, builtins: &'c Builtins) -> Parser<'de, 'c> {
        Parser {
            whole: self.whole,
            lexer: self.lexer,
            peeked: self.peeked,
            builtins,
            errors: self.errors,
        }
    }

    /// Parses and type checks one condition.
    ///
    /// Syntax errors do not stop parsing: the parser skips to the next token
    /// it can resume from and keeps collecting errors. The tree then holds only
    /// the parts that parsed, so callers must look at the error list before
    /// using it.
    pub fn parse_program(mut self) -> (Program, Vec<CompileError>) {
        let expression = self.parse_within(Precedence::Lowest);
        // after a recovered error the position is no reliable end of input
        if self.errors.is_empty() {
            if self.peeked.kind == TokenKind::Semicolon {
                self.advance();
            }
            let trailing = self.peeked;
            if trailing.kind != TokenKind::Eof {
                self.error(SyntaxError::TrailingInput {
                    literal: trailing.literal.to_string(),
                    span: self.span(trailing),
                    found: trailing.kind,
                });
            }
        }

        let program = Program { expression };
        log::debug!("parsed `{program}` with {} error(s)", self.errors.len());
        Checker::new(self.builtins, &mut self.errors).check_program(&program);
        (program, self.errors)
    }

    pub fn parse_within(&mut self, min_bp: Precedence) -> Option<Expression> {
        let mut lhs = self.parse_prefix();

        loop {
            let next = self.peeked;
            let bp = next.kind.precedence();
            if bp <= min_bp {
                break;
            }

            if next.kind == TokenKind::LeftParen {
                self.advance();
                let arguments = self.parse_call_arguments();
                lhs = lhs.zip(arguments).map(|(function, arguments)| Expression::Call {
                    function: Box::new(function),
                    arguments,
                });
                continue;
            }

            let Some(operator) = InfixOp::from_token(next.kind) else {
                break;
            };
            self.advance();
            // a broken right side leaves the left side in place
            if let Some(rhs) = self.parse_within(bp) {
                lhs = lhs.map(|lhs| Expression::Infix {
                    left: Box::new(lhs),
                    operator,
                    right: Box::new(rhs),
                });
            }
        }

        lhs
    }

    fn parse_prefix(&mut self) -> Option<Expression> {
        if is_boundary(self.peeked.kind) {
            // left for the enclosing construct to consume
            self.error(SyntaxError::NoPrefix {
                kind: self.peeked.kind,
                span: self.span(self.peeked),
            });
            return None;
        }

        let token = self.advance();
        match token.kind {
            TokenKind::Ident => Some(Expression::Identifier(token.literal.to_string())),
            TokenKind::Int => self.integer(token).map(Expression::Integer),
            TokenKind::String => Some(Expression::String(token.literal.to_string())),
            TokenKind::True => Some(Expression::Boolean(true)),
            TokenKind::False => Some(Expression::Boolean(false)),
            TokenKind::LeftBracket => self.parse_array(token),
            TokenKind::LeftParen => {
                let inner = self.parse_within(Precedence::Lowest);
                self.expect(TokenKind::RightParen)?;
                inner
            }
            kind => match PrefixOp::from_token(kind) {
                Some(operator) => self
                    .parse_within(Precedence::Prefix)
                    .map(|operand| Expression::Prefix {
                        operator,
                        operand: Box::new(operand),
                    }),
                None => {
                    self.error(SyntaxError::NoPrefix {
                        kind,
                        span: self.span(token),
                    });
                    self.synchronize();
                    None
                }
            },
        }
    }

    fn parse_array(&mut self, open: Token<'de>) -> Option<Expression> {
        let first = self.peeked;
        let kind = match first.kind {
            TokenKind::Int | TokenKind::String => first.kind,
            TokenKind::RightBracket => {
                self.advance();
                self.error(SyntaxError::EmptyArray {
                    span: (open.offset, first.offset + 1 - open.offset).into(),
                });
                return None;
            }
            found => {
                self.error(SyntaxError::UnknownArrayType {
                    found,
                    span: self.span(first),
                });
                self.skip_past(TokenKind::RightBracket);
                return None;
            }
        };

        let mut integers = Vec::new();
        let mut strings = Vec::new();
        let mut complete = true;
        loop {
            let element = self.advance();
            if element.kind != kind {
                let span = self.span(element);
                self.error(match element.kind {
                    TokenKind::Int | TokenKind::String => SyntaxError::MixedArray {
                        expected: kind,
                        found: element.kind,
                        span,
                    },
                    found => SyntaxError::UnknownArrayType { found, span },
                });
                if element.kind != TokenKind::RightBracket {
                    self.skip_past(TokenKind::RightBracket);
                }
                return None;
            }
            match kind {
                TokenKind::Int => match self.integer(element) {
                    Some(value) => integers.push(value),
                    None => complete = false,
                },
                _ => strings.push(element.literal.to_string()),
            }

            if self.peeked.kind == TokenKind::Comma {
                self.advance();
            } else if self.expect(TokenKind::RightBracket).is_some() {
                break;
            } else {
                self.skip_past(TokenKind::RightBracket);
                return None;
            }
        }

        complete.then(|| match kind {
            TokenKind::Int => Expression::ArrayInteger(integers),
            _ => Expression::ArrayString(strings),
        })
    }

    fn parse_call_arguments(&mut self) -> Option<Vec<Expression>> {
        let mut arguments = Vec::new();
        if self.peeked.kind == TokenKind::RightParen {
            self.advance();
            return Some(arguments);
        }
        let mut complete = true;
        loop {
            match self.parse_within(Precedence::Lowest) {
                Some(argument) => arguments.push(argument),
                None => complete = false,
            }
            if self.peeked.kind == TokenKind::Comma {
                self.advance();
                continue;
            }
            if self.expect(TokenKind::RightParen).is_none() {
                self.skip_past(TokenKind::RightParen);
                return None;
            }
            return complete.then_some(arguments);
        }
    }

    /// Skips tokens up to one an enclosing construct can resume from.
    fn synchronize(&mut self) {
        while !is_boundary(self.peeked.kind) && self.peeked.kind.precedence() == Precedence::Lowest {
            self.advance();
        }
    }

    /// Skips tokens up to and including the next `closing`.
    fn skip_past(&mut self, closing: TokenKind) {
        while !matches!(self.peeked.kind, TokenKind::Eof) && self.peeked.kind != closing {
            self.advance();
        }
        if self.peeked.kind == closing {
            self.advance();
        }
    }

    fn integer(&mut self, token: Token<'de>) -> Option<i64> {
        let value = parse_integer(token.literal);
        if value.is_none() {
            self.error(SyntaxError::InvalidInteger {
                literal: token.literal.to_string(),
                span: self.span(token),
            });
        }
        value
    }

    fn advance(&mut self) -> Token<'de> {
        std::mem::replace(&mut self.peeked, self.lexer.next_token())
    }

    fn expect(&mut self, expected: TokenKind) -> Option<Token<'de>> {
        if self.peeked.kind == expected {
            return Some(self.advance());
        }
        self.error(SyntaxError::UnexpectedToken {
            expected,
            found: self.peeked.kind,
            span: self.span(self.peeked),
        });
        None
    }

    /// Source span of `token`, including the quotes of string literals.
    fn span(&self, token: Token<'de>) -> SourceSpan {
        let len = match token.kind {
            TokenKind::Eof => 0,
            TokenKind::String => token.literal.len() + 2,
            _ => token.literal.len(),
        };
        let len = len.min(self.whole.len().saturating_sub(token.offset));
        (token.offset, len).into()
    }

    fn error(&mut self, error: SyntaxError) {
        log::debug!("syntax error: {error}");
        self.errors.push(error.into());
    }
}
