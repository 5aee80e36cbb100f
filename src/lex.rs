use std::fmt::Display;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Token<'de> {
    pub kind: TokenKind,
    pub literal: &'de str,
    /// Byte offset of the token's first character in the source.
    pub offset: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Eof,
    Illegal,
    Ident,
    Int,
    String,
    Bang,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    EqualEqual,
    BangEqual,
    Match,
    And,
    Or,
    In,
    Plus,
    Minus,
    Star,
    Slash,
    LeftParen,
    RightParen,
    LeftBracket,
    RightBracket,
    Comma,
    Semicolon,
    True,
    False,
}

/// Binding power of infix operators, lowest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
    Lowest,
    Logical,
    Equals,
    LessGreater,
    Sum,
    Product,
    Prefix,
    Call,
}

impl TokenKind {
    pub fn precedence(self) -> Precedence {
        match self {
            TokenKind::And | TokenKind::Or => Precedence::Logical,
            TokenKind::EqualEqual | TokenKind::BangEqual | TokenKind::Match => Precedence::Equals,
            TokenKind::Less | TokenKind::LessEqual | TokenKind::Greater | TokenKind::GreaterEqual => {
                Precedence::LessGreater
            }
            TokenKind::Plus | TokenKind::Minus => Precedence::Sum,
            TokenKind::Star | TokenKind::Slash | TokenKind::In => Precedence::Product,
            TokenKind::LeftParen => Precedence::Call,
            _ => Precedence::Lowest,
        }
    }
}

const KEYWORDS: &[(&str, TokenKind)] = &[
    ("true", TokenKind::True),
    ("false", TokenKind::False),
    ("in", TokenKind::In),
];

/// Words that may never be used as identifiers.
pub const RESERVED: &[&str] = &[
    "break",
    "case",
    "chan",
    "const",
    "continue",
    "default",
    "defer",
    "else",
    "fallthrough",
    "for",
    "func",
    "go",
    "goto",
    "if",
    "import",
    "interface",
    "map",
    "package",
    "range",
    "return",
    "select",
    "struct",
    "switch",
    "type",
    "var",
    "F",
];

/// Classifies a scanned word as keyword, illegal reserved word or identifier.
pub fn lookup_ident(word: &str) -> TokenKind {
    if let Some((_, kind)) = KEYWORDS.iter().find(|(keyword, _)| *keyword == word) {
        return *kind;
    }
    if RESERVED.contains(&word) {
        return TokenKind::Illegal;
    }
    TokenKind::Ident
}

impl Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            TokenKind::Eof => "EOF",
            TokenKind::Illegal => "ILLEGAL",
            TokenKind::Ident => "IDENT",
            TokenKind::Int => "INT",
            TokenKind::String => "STRING",
            TokenKind::Bang => "!",
            TokenKind::Less => "<",
            TokenKind::LessEqual => "<=",
            TokenKind::Greater => ">",
            TokenKind::GreaterEqual => ">=",
            TokenKind::EqualEqual => "==",
            TokenKind::BangEqual => "!=",
            TokenKind::Match => "~=",
            TokenKind::And => "&&",
            TokenKind::Or => "||",
            TokenKind::In => "in",
            TokenKind::Plus => "+",
            TokenKind::Minus => "-",
            TokenKind::Star => "*",
            TokenKind::Slash => "/",
            TokenKind::LeftParen => "(",
            TokenKind::RightParen => ")",
            TokenKind::LeftBracket => "[",
            TokenKind::RightBracket => "]",
            TokenKind::Comma => ",",
            TokenKind::Semicolon => ";",
            TokenKind::True => "TRUE",
            TokenKind::False => "FALSE",
        };
        f.write_str(name)
    }
}

impl Display for Token<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let lit = self.literal;
        match self.kind {
            TokenKind::Eof => write!(f, "EOF"),
            TokenKind::String => write!(f, "STRING \"{lit}\""),
            TokenKind::Ident | TokenKind::Int | TokenKind::Illegal => write!(f, "{} {lit}", self.kind),
            kind => write!(f, "{kind}"),
        }
    }
}

pub struct Lexer<'de> {
    whole: &'de str,
    rest: &'de str,
    pub byte: usize,
}

impl<'de> Lexer<'de> {
    pub fn new(input: &'de str) -> Self {
        Lexer {
            whole: input,
            rest: input,
            byte: 0,
        }
    }

    pub fn source(&self) -> &'de str {
        self.whole
    }

    /// Scans one token. Once the input is exhausted every call yields `Eof`.
    pub fn next_token(&mut self) -> Token<'de> {
        loop {
            let start = self.byte;
            let mut chars = self.rest.chars();
            let Some(c) = chars.next() else {
                return Token {
                    kind: TokenKind::Eof,
                    literal: "",
                    offset: self.whole.len(),
                };
            };
            let literal = &self.rest[..c.len_utf8()];
            let cur = self.rest;
            self.rest = chars.as_str();
            self.byte += c.len_utf8();

            enum Start {
                String,
                Ident,
                Number,
                IfNextElse(char, TokenKind, TokenKind),
            }

            let token = |kind: TokenKind, literal: &'de str| Token {
                kind,
                literal,
                offset: start,
            };

            let started = match c {
                '(' => return token(TokenKind::LeftParen, literal),
                ')' => return token(TokenKind::RightParen, literal),
                '[' => return token(TokenKind::LeftBracket, literal),
                ']' => return token(TokenKind::RightBracket, literal),
                ',' => return token(TokenKind::Comma, literal),
                ';' => return token(TokenKind::Semicolon, literal),
                '+' => return token(TokenKind::Plus, literal),
                '-' => return token(TokenKind::Minus, literal),
                '*' => return token(TokenKind::Star, literal),
                '/' => return token(TokenKind::Slash, literal),
                '!' => Start::IfNextElse('=', TokenKind::BangEqual, TokenKind::Bang),
                '<' => Start::IfNextElse('=', TokenKind::LessEqual, TokenKind::Less),
                '>' => Start::IfNextElse('=', TokenKind::GreaterEqual, TokenKind::Greater),
                // a lone `=`, `~`, `&` or `|` has no meaning of its own
                '=' => Start::IfNextElse('=', TokenKind::EqualEqual, TokenKind::Illegal),
                '~' => Start::IfNextElse('=', TokenKind::Match, TokenKind::Illegal),
                '&' => Start::IfNextElse('&', TokenKind::And, TokenKind::Illegal),
                '|' => Start::IfNextElse('|', TokenKind::Or, TokenKind::Illegal),
                'a'..='z' | 'A'..='Z' | '_' => Start::Ident,
                '0'..='9' => Start::Number,
                '"' => Start::String,
                ' ' | '\r' | '\t' | '\n' => continue,
                _ => return token(TokenKind::Illegal, literal),
            };

            let tok = match started {
                Start::String => {
                    // no escapes; an unterminated string swallows the rest of the input
                    let end = self.rest.find('"');
                    let literal = &self.rest[..end.unwrap_or(self.rest.len())];
                    let consumed = literal.len() + usize::from(end.is_some());
                    if end.is_none() {
                        log::trace!("unterminated string literal at byte {start}");
                    }
                    self.byte += consumed;
                    self.rest = &self.rest[consumed..];
                    token(TokenKind::String, literal)
                }
                Start::Ident => {
                    let first_non_ident = cur
                        .find(|c| !matches!(c, 'a'..='z' | 'A'..='Z' | '_'))
                        .unwrap_or(cur.len());

                    let literal = &cur[..first_non_ident];
                    let extra_bytes = literal.len() - c.len_utf8();
                    self.byte += extra_bytes;
                    self.rest = &self.rest[extra_bytes..];

                    token(lookup_ident(literal), literal)
                }
                Start::Number => {
                    let radix = match (c, self.rest.as_bytes().first()) {
                        ('0', Some(b'x' | b'X')) => 16,
                        ('0', Some(b'o' | b'O')) => 8,
                        ('0', Some(b'b' | b'B')) => 2,
                        _ => 10,
                    };
                    let digits_from = if radix == 10 { 0 } else { 2 };
                    let first_non_digit = cur[digits_from..]
                        .find(|c: char| !c.is_digit(radix))
                        .map_or(cur.len(), |at| at + digits_from);

                    let literal = &cur[..first_non_digit];
                    let extra_bytes = literal.len() - c.len_utf8();
                    self.byte += extra_bytes;
                    self.rest = &self.rest[extra_bytes..];

                    token(TokenKind::Int, literal)
                }
                Start::IfNextElse(next, yes, no) => {
                    if self.rest.starts_with(next) {
                        self.rest = &self.rest[next.len_utf8()..];
                        self.byte += next.len_utf8();
                        token(yes, &cur[..c.len_utf8() + next.len_utf8()])
                    } else {
                        token(no, literal)
                    }
                }
            };
            log::trace!("lexed {tok} at byte {}", tok.offset);
            return tok;
        }
    }
}

impl<'de> Iterator for Lexer<'de> {
    type Item = Token<'de>;

    fn next(&mut self) -> Option<Self::Item> {
        let token = self.next_token();
        (token.kind != TokenKind::Eof).then_some(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<TokenKind> {
        Lexer::new(input).map(|token| token.kind).collect()
    }

    #[test]
    fn operators_and_brackets() {
        assert_eq!(
            kinds("! < <= > >= == != ~= && || ( ) [ ] , ; + - * /"),
            vec![
                TokenKind::Bang,
                TokenKind::Less,
                TokenKind::LessEqual,
                TokenKind::Greater,
                TokenKind::GreaterEqual,
                TokenKind::EqualEqual,
                TokenKind::BangEqual,
                TokenKind::Match,
                TokenKind::And,
                TokenKind::Or,
                TokenKind::LeftParen,
                TokenKind::RightParen,
                TokenKind::LeftBracket,
                TokenKind::RightBracket,
                TokenKind::Comma,
                TokenKind::Semicolon,
                TokenKind::Plus,
                TokenKind::Minus,
                TokenKind::Star,
                TokenKind::Slash,
            ]
        );
    }

    #[test]
    fn lone_halves_of_two_char_operators_are_illegal() {
        for input in ["=", "&", "|", "~"] {
            let token = Lexer::new(input).next_token();
            assert_eq!(token.kind, TokenKind::Illegal, "input {input:?}");
            assert_eq!(token.literal, input);
        }
        assert_eq!(
            kinds("a = b"),
            vec![TokenKind::Ident, TokenKind::Illegal, TokenKind::Ident]
        );
    }

    #[test]
    fn eof_is_sticky() {
        let mut lexer = Lexer::new("  x ");
        assert_eq!(lexer.next_token().kind, TokenKind::Ident);
        for _ in 0..3 {
            let token = lexer.next_token();
            assert_eq!(token.kind, TokenKind::Eof);
            assert_eq!(token.literal, "");
        }
    }

    #[test]
    fn keywords_and_reserved_words() {
        assert_eq!(
            kinds("true false in index inner"),
            vec![
                TokenKind::True,
                TokenKind::False,
                TokenKind::In,
                TokenKind::Ident,
                TokenKind::Ident,
            ]
        );
        assert_eq!(kinds("if"), vec![TokenKind::Illegal]);
        assert_eq!(kinds("F"), vec![TokenKind::Illegal]);
        assert_eq!(kinds("Fx"), vec![TokenKind::Ident]);
    }

    #[test]
    fn digits_end_identifiers() {
        let tokens: Vec<_> = Lexer::new("abc123").collect();
        assert_eq!(tokens.len(), 2);
        assert_eq!((tokens[0].kind, tokens[0].literal), (TokenKind::Ident, "abc"));
        assert_eq!((tokens[1].kind, tokens[1].literal), (TokenKind::Int, "123"));
    }

    #[test]
    fn integer_prefixes() {
        let literals: Vec<_> = Lexer::new("42 0x1F 0o17 0b101 007")
            .map(|token| token.literal)
            .collect();
        assert_eq!(literals, vec!["42", "0x1F", "0o17", "0b101", "007"]);
    }

    #[test]
    fn strings_are_verbatim() {
        let token = Lexer::new(r#""a\nb c""#).next_token();
        assert_eq!(token.kind, TokenKind::String);
        assert_eq!(token.literal, r"a\nb c");
    }

    #[test]
    fn unterminated_string_runs_to_end() {
        let mut lexer = Lexer::new("\"open ended");
        let token = lexer.next_token();
        assert_eq!(token.kind, TokenKind::String);
        assert_eq!(token.literal, "open ended");
        assert_eq!(lexer.next_token().kind, TokenKind::Eof);
    }

    #[test]
    fn offsets_track_bytes() {
        let offsets: Vec<_> = Lexer::new("len(x) >= 10")
            .map(|token| token.offset)
            .collect();
        assert_eq!(offsets, vec![0, 3, 4, 5, 7, 10]);
    }

    #[test]
    fn unknown_characters_are_illegal() {
        let token = Lexer::new("é").next_token();
        assert_eq!(token.kind, TokenKind::Illegal);
        assert_eq!(token.literal, "é");
        assert_eq!(kinds("a . b"), vec![TokenKind::Ident, TokenKind::Illegal, TokenKind::Ident]);
    }

    #[test]
    fn token_display() {
        let rendered: Vec<_> = Lexer::new(r#"a "s" 1 && ?"#)
            .map(|token| token.to_string())
            .collect();
        assert_eq!(rendered, vec!["IDENT a", "STRING \"s\"", "INT 1", "&&", "ILLEGAL ?"]);
    }
}
