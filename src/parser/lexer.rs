//! Lexer (tokenizer) for C source code
//!
//! Converts raw source text into a flat [`Token`] stream consumed by the parser.
//! Object-like `#define` macros are recorded and expanded while lexing;
//! `#include` and every other directive line is skipped.

use super::ast::SourceLocation;
use rustc_hash::FxHashMap;
use std::fmt;
use thiserror::Error;

/// Token categories produced by the lexer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    // Literals
    IntLiteral(i64),
    CharLiteral(i8),
    StringLiteral(Vec<u8>),

    // Identifiers
    Ident(String),

    // Keywords
    Int,
    Char,
    Short,
    Long,
    Signed,
    Unsigned,
    Void,
    Struct,
    Enum,
    Const,
    Extern,
    If,
    Else,
    While,
    Do,
    For,
    Switch,
    Case,
    Default,
    Break,
    Continue,
    Return,
    Sizeof,

    // Arithmetic
    Plus,
    Minus,
    Star,
    Slash,
    Percent,

    // Comparison
    EqEq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,

    // Logical
    AndAnd,
    OrOr,
    Bang,

    // Bitwise
    Amp,
    Pipe,
    Caret,
    Tilde,
    LtLt,
    GtGt,

    // Assignment
    Eq,
    PlusEq,
    MinusEq,
    StarEq,
    SlashEq,
    PercentEq,

    PlusPlus,
    MinusMinus,

    Dot,
    Arrow,
    Ellipsis,

    Question,
    Colon,

    // Punctuation
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Semicolon,
    Comma,

    Eof,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::IntLiteral(n) => write!(f, "int literal {}", n),
            TokenKind::CharLiteral(c) => {
                let byte = *c as u8;
                if byte.is_ascii_graphic() || byte == b' ' {
                    write!(f, "char literal '{}'", byte as char)
                } else {
                    write!(f, "char literal '\\x{:02x}'", byte)
                }
            }
            TokenKind::StringLiteral(s) => {
                write!(f, "string literal \"{}\"", s.escape_ascii())
            }
            TokenKind::Ident(s) => write!(f, "identifier '{}'", s),
            TokenKind::Eof => write!(f, "end of file"),
            other => write!(f, "'{}'", other.spelling()),
        }
    }
}

impl TokenKind {
    /// Source spelling of keyword and punctuator tokens.
    fn spelling(&self) -> &'static str {
        match self {
            TokenKind::Int => "int",
            TokenKind::Char => "char",
            TokenKind::Short => "short",
            TokenKind::Long => "long",
            TokenKind::Signed => "signed",
            TokenKind::Unsigned => "unsigned",
            TokenKind::Void => "void",
            TokenKind::Struct => "struct",
            TokenKind::Enum => "enum",
            TokenKind::Const => "const",
            TokenKind::Extern => "extern",
            TokenKind::If => "if",
            TokenKind::Else => "else",
            TokenKind::While => "while",
            TokenKind::Do => "do",
            TokenKind::For => "for",
            TokenKind::Switch => "switch",
            TokenKind::Case => "case",
            TokenKind::Default => "default",
            TokenKind::Break => "break",
            TokenKind::Continue => "continue",
            TokenKind::Return => "return",
            TokenKind::Sizeof => "sizeof",
            TokenKind::Plus => "+",
            TokenKind::Minus => "-",
            TokenKind::Star => "*",
            TokenKind::Slash => "/",
            TokenKind::Percent => "%",
            TokenKind::EqEq => "==",
            TokenKind::NotEq => "!=",
            TokenKind::Lt => "<",
            TokenKind::Le => "<=",
            TokenKind::Gt => ">",
            TokenKind::Ge => ">=",
            TokenKind::AndAnd => "&&",
            TokenKind::OrOr => "||",
            TokenKind::Bang => "!",
            TokenKind::Amp => "&",
            TokenKind::Pipe => "|",
            TokenKind::Caret => "^",
            TokenKind::Tilde => "~",
            TokenKind::LtLt => "<<",
            TokenKind::GtGt => ">>",
            TokenKind::Eq => "=",
            TokenKind::PlusEq => "+=",
            TokenKind::MinusEq => "-=",
            TokenKind::StarEq => "*=",
            TokenKind::SlashEq => "/=",
            TokenKind::PercentEq => "%=",
            TokenKind::PlusPlus => "++",
            TokenKind::MinusMinus => "--",
            TokenKind::Dot => ".",
            TokenKind::Arrow => "->",
            TokenKind::Ellipsis => "...",
            TokenKind::Question => "?",
            TokenKind::Colon => ":",
            TokenKind::LParen => "(",
            TokenKind::RParen => ")",
            TokenKind::LBrace => "{",
            TokenKind::RBrace => "}",
            TokenKind::LBracket => "[",
            TokenKind::RBracket => "]",
            TokenKind::Semicolon => ";",
            TokenKind::Comma => ",",
            TokenKind::IntLiteral(_)
            | TokenKind::CharLiteral(_)
            | TokenKind::StringLiteral(_)
            | TokenKind::Ident(_)
            | TokenKind::Eof => "",
        }
    }
}

/// A lexed token: its kind, the source text it was read from, and where.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: String,
    pub location: SourceLocation,
}

impl Token {
    pub fn new(kind: TokenKind, lexeme: impl Into<String>, location: SourceLocation) -> Self {
        Self {
            kind,
            lexeme: lexeme.into(),
            location,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)
    }
}

/// Lexer error type
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct LexError {
    pub message: String,
    pub location: SourceLocation,
}

impl LexError {
    fn new(message: impl Into<String>, location: SourceLocation) -> Self {
        Self {
            message: message.into(),
            location,
        }
    }
}

/// Lexer for C source code
pub struct Lexer {
    input: Vec<char>,
    position: usize,
    line: usize,
    column: usize,
    /// Object-like macros: name -> replacement tokens.
    macros: FxHashMap<String, Vec<Token>>,
}

impl Lexer {
    /// Create a new lexer for the given source string.
    pub fn new(input: &str) -> Self {
        Self {
            input: input.chars().collect(),
            position: 0,
            line: 1,
            column: 1,
            macros: FxHashMap::default(),
        }
    }

    /// Tokenize the entire input
    pub fn tokenize(&mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();

        loop {
            self.skip_whitespace_and_comments()?;

            if self.is_at_end() {
                tokens.push(Token::new(TokenKind::Eof, "", self.current_location()));
                break;
            }

            if self.peek() == Some('#') && self.at_line_start() {
                self.preprocessor_directive()?;
                continue;
            }

            let token = self.next_token()?;
            self.push_expanded(token, &mut tokens, &mut Vec::new());
        }

        tracing::trace!(count = tokens.len(), "lexed tokens");
        Ok(tokens)
    }

    /// Push `token`, replacing a macro name by its (recursively expanded)
    /// body. Names in `active` are mid-expansion and stay untouched.
    fn push_expanded(&self, token: Token, out: &mut Vec<Token>, active: &mut Vec<String>) {
        let TokenKind::Ident(name) = &token.kind else {
            out.push(token);
            return;
        };

        match self.macros.get(name) {
            Some(body) if !active.contains(name) => {
                active.push(name.clone());
                for replacement in body {
                    let mut replacement = replacement.clone();
                    replacement.location = token.location;
                    self.push_expanded(replacement, out, active);
                }
                active.pop();
            }
            _ => out.push(token),
        }
    }

    /// Get next token
    fn next_token(&mut self) -> Result<Token, LexError> {
        let loc = self.current_location();
        let start = self.position;
        let ch = self
            .advance()
            .ok_or_else(|| LexError::new("Unexpected end of file", loc))?;

        let kind = match ch {
            '"' => self.string_literal(loc)?,
            '\'' => self.char_literal(loc)?,
            '0'..='9' => self.number_literal(ch, loc)?,
            'a'..='z' | 'A'..='Z' | '_' => self.identifier_or_keyword(ch),

            '+' => self.either(&[('+', TokenKind::PlusPlus), ('=', TokenKind::PlusEq)], TokenKind::Plus),
            '-' => self.either(
                &[
                    ('-', TokenKind::MinusMinus),
                    ('=', TokenKind::MinusEq),
                    ('>', TokenKind::Arrow),
                ],
                TokenKind::Minus,
            ),
            '*' => self.either(&[('=', TokenKind::StarEq)], TokenKind::Star),
            '/' => self.either(&[('=', TokenKind::SlashEq)], TokenKind::Slash),
            '%' => self.either(&[('=', TokenKind::PercentEq)], TokenKind::Percent),
            '=' => self.either(&[('=', TokenKind::EqEq)], TokenKind::Eq),
            '!' => self.either(&[('=', TokenKind::NotEq)], TokenKind::Bang),
            '<' => self.either(&[('=', TokenKind::Le), ('<', TokenKind::LtLt)], TokenKind::Lt),
            '>' => self.either(&[('=', TokenKind::Ge), ('>', TokenKind::GtGt)], TokenKind::Gt),
            '&' => self.either(&[('&', TokenKind::AndAnd)], TokenKind::Amp),
            '|' => self.either(&[('|', TokenKind::OrOr)], TokenKind::Pipe),
            '.' => {
                if self.peek() == Some('.') && self.peek_ahead(1) == Some('.') {
                    self.advance();
                    self.advance();
                    TokenKind::Ellipsis
                } else {
                    TokenKind::Dot
                }
            }
            '^' => TokenKind::Caret,
            '~' => TokenKind::Tilde,
            '?' => TokenKind::Question,
            ':' => TokenKind::Colon,
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '{' => TokenKind::LBrace,
            '}' => TokenKind::RBrace,
            '[' => TokenKind::LBracket,
            ']' => TokenKind::RBracket,
            ';' => TokenKind::Semicolon,
            ',' => TokenKind::Comma,

            _ => {
                return Err(LexError::new(
                    format!("Unexpected character: '{}'", ch.escape_default()),
                    loc,
                ));
            }
        };

        let lexeme: String = self.input[start..self.position].iter().collect();
        Ok(Token::new(kind, lexeme, loc))
    }

    /// Consume one of the two-character continuations in `table`, or fall
    /// back to the single-character token.
    fn either(&mut self, table: &[(char, TokenKind)], single: TokenKind) -> TokenKind {
        for (next, kind) in table {
            if self.peek() == Some(*next) {
                self.advance();
                return kind.clone();
            }
        }
        single
    }

    /// Parse string literal
    fn string_literal(&mut self, loc: SourceLocation) -> Result<TokenKind, LexError> {
        let mut bytes = Vec::new();

        while let Some(ch) = self.peek() {
            match ch {
                '"' => {
                    self.advance(); // consume closing quote
                    return Ok(TokenKind::StringLiteral(bytes));
                }
                '\n' => break,
                '\\' => {
                    self.advance();
                    bytes.push(self.escape_sequence()?);
                }
                _ => {
                    if !ch.is_ascii() {
                        return Err(LexError::new(
                            format!("Non-ASCII character '{}' in string literal", ch),
                            self.current_location(),
                        ));
                    }
                    bytes.push(ch as u8);
                    self.advance();
                }
            }
        }

        Err(LexError::new("Unterminated string literal", loc))
    }

    /// Parse character literal
    fn char_literal(&mut self, loc: SourceLocation) -> Result<TokenKind, LexError> {
        let value = match self.advance() {
            None | Some('\n') => {
                return Err(LexError::new("Unterminated character literal", loc));
            }
            Some('\'') => return Err(LexError::new("Empty character literal", loc)),
            Some('\\') => self.escape_sequence()?,
            Some(ch) if ch.is_ascii() => ch as u8,
            Some(ch) => {
                return Err(LexError::new(
                    format!("Non-ASCII character '{}' in character literal", ch),
                    loc,
                ));
            }
        };

        if self.advance() != Some('\'') {
            return Err(LexError::new("Unterminated character literal", loc));
        }

        Ok(TokenKind::CharLiteral(value as i8))
    }

    /// Decode the escape sequence following a consumed backslash.
    fn escape_sequence(&mut self) -> Result<u8, LexError> {
        let loc = self.current_location();
        let escaped = self
            .advance()
            .ok_or_else(|| LexError::new("Unexpected end of file in escape sequence", loc))?;

        let byte = match escaped {
            'n' => b'\n',
            't' => b'\t',
            'r' => b'\r',
            '0' => 0,
            '\\' => b'\\',
            '\'' => b'\'',
            '"' => b'"',
            'x' => {
                let mut digits = String::new();
                while let Some(ch) = self.peek() {
                    if ch.is_ascii_hexdigit() && digits.len() < 2 {
                        digits.push(ch);
                        self.advance();
                    } else {
                        break;
                    }
                }
                u8::from_str_radix(&digits, 16).map_err(|_| {
                    LexError::new(format!("Invalid hex escape sequence: \\x{}", digits), loc)
                })?
            }
            _ => {
                return Err(LexError::new(
                    format!("Unknown escape sequence: \\{}", escaped),
                    loc,
                ));
            }
        };

        Ok(byte)
    }

    /// Parse numeric literal (decimal, octal, or hex integers)
    fn number_literal(&mut self, first_digit: char, loc: SourceLocation) -> Result<TokenKind, LexError> {
        let mut digits = String::new();
        let radix = if first_digit == '0' && matches!(self.peek(), Some('x') | Some('X')) {
            self.advance();
            16
        } else if first_digit == '0' {
            8
        } else {
            digits.push(first_digit);
            10
        };

        while let Some(ch) = self.peek() {
            if ch.is_digit(radix) {
                digits.push(ch);
                self.advance();
            } else if ch.is_ascii_alphanumeric() && !matches!(ch, 'u' | 'U' | 'l' | 'L') {
                return Err(LexError::new(
                    format!("Invalid digit '{}' in integer literal", ch),
                    self.current_location(),
                ));
            } else {
                break;
            }
        }

        // Suffixes carry no meaning beyond what the value already implies.
        while matches!(self.peek(), Some('u') | Some('U') | Some('l') | Some('L')) {
            self.advance();
        }

        if digits.is_empty() {
            if radix == 16 {
                return Err(LexError::new("Hex literal has no digits", loc));
            }
            return Ok(TokenKind::IntLiteral(0));
        }

        let value = u64::from_str_radix(&digits, radix)
            .map_err(|_| LexError::new(format!("Integer literal out of range: {}", digits), loc))?;

        Ok(TokenKind::IntLiteral(value as i64))
    }

    /// Parse identifier or keyword
    fn identifier_or_keyword(&mut self, first_char: char) -> TokenKind {
        let mut ident = String::new();
        ident.push(first_char);

        while let Some(ch) = self.peek() {
            if ch.is_ascii_alphanumeric() || ch == '_' {
                ident.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        match ident.as_str() {
            "int" => TokenKind::Int,
            "char" => TokenKind::Char,
            "short" => TokenKind::Short,
            "long" => TokenKind::Long,
            "signed" => TokenKind::Signed,
            "unsigned" => TokenKind::Unsigned,
            "void" => TokenKind::Void,
            "struct" => TokenKind::Struct,
            "enum" => TokenKind::Enum,
            "const" => TokenKind::Const,
            "extern" => TokenKind::Extern,
            "if" => TokenKind::If,
            "else" => TokenKind::Else,
            "while" => TokenKind::While,
            "do" => TokenKind::Do,
            "for" => TokenKind::For,
            "switch" => TokenKind::Switch,
            "case" => TokenKind::Case,
            "default" => TokenKind::Default,
            "break" => TokenKind::Break,
            "continue" => TokenKind::Continue,
            "return" => TokenKind::Return,
            "sizeof" => TokenKind::Sizeof,
            _ => TokenKind::Ident(ident),
        }
    }

    /// Skip whitespace and comments
    fn skip_whitespace_and_comments(&mut self) -> Result<(), LexError> {
        loop {
            match self.peek() {
                Some(' ') | Some('\t') | Some('\r') | Some('\n') => {
                    self.advance();
                }
                Some('/') if self.peek_ahead(1) == Some('/') => self.skip_line_comment(),
                Some('/') if self.peek_ahead(1) == Some('*') => self.skip_block_comment()?,
                _ => break,
            }
        }
        Ok(())
    }

    /// Like [`Self::skip_whitespace_and_comments`], but stops at the end of
    /// the current line. Backslash-newline continues a directive.
    fn skip_directive_whitespace(&mut self) -> Result<(), LexError> {
        loop {
            match self.peek() {
                Some(' ') | Some('\t') | Some('\r') => {
                    self.advance();
                }
                Some('\\') if self.peek_ahead(1) == Some('\n') => {
                    self.advance();
                    self.advance();
                }
                Some('/') if self.peek_ahead(1) == Some('*') => self.skip_block_comment()?,
                Some('/') if self.peek_ahead(1) == Some('/') => {
                    while !matches!(self.peek(), None | Some('\n')) {
                        self.advance();
                    }
                }
                _ => break,
            }
        }
        Ok(())
    }

    /// Skip single-line comment (// ...)
    fn skip_line_comment(&mut self) {
        while let Some(ch) = self.peek() {
            self.advance();
            if ch == '\n' {
                break;
            }
        }
    }

    /// Skip multi-line comment (/* ... */)
    fn skip_block_comment(&mut self) -> Result<(), LexError> {
        let start_loc = self.current_location();
        self.advance(); // skip '/'
        self.advance(); // skip '*'

        while !self.is_at_end() {
            if self.peek() == Some('*') && self.peek_ahead(1) == Some('/') {
                self.advance();
                self.advance();
                return Ok(());
            }
            self.advance();
        }

        Err(LexError::new("Unterminated block comment", start_loc))
    }

    /// Whether only blanks precede the current position on its line.
    fn at_line_start(&self) -> bool {
        self.input[..self.position]
            .iter()
            .rev()
            .take_while(|&&ch| ch != '\n')
            .all(|&ch| ch == ' ' || ch == '\t')
    }

    /// Handle a `#` line: record `#define`/`#undef`, skip everything else.
    fn preprocessor_directive(&mut self) -> Result<(), LexError> {
        let loc = self.current_location();
        self.advance(); // consume '#'
        self.skip_directive_whitespace()?;

        let mut directive = String::new();
        while let Some(ch) = self.peek() {
            if ch.is_ascii_alphabetic() {
                directive.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        match directive.as_str() {
            "define" => self.define_directive(loc),
            "undef" => {
                self.skip_directive_whitespace()?;
                let name = self.directive_name(loc)?;
                self.macros.remove(&name);
                self.skip_rest_of_line();
                Ok(())
            }
            _ => {
                tracing::trace!(directive = %directive, line = loc.line, "skipping directive");
                self.skip_rest_of_line();
                Ok(())
            }
        }
    }

    /// `#define NAME replacement-tokens...`
    fn define_directive(&mut self, loc: SourceLocation) -> Result<(), LexError> {
        self.skip_directive_whitespace()?;
        let name = self.directive_name(loc)?;

        if self.peek() == Some('(') {
            return Err(LexError::new(
                format!("Function-like macro '{}' is not supported", name),
                loc,
            ));
        }

        let mut body = Vec::new();
        loop {
            self.skip_directive_whitespace()?;
            if matches!(self.peek(), None | Some('\n')) {
                break;
            }
            body.push(self.next_token()?);
        }

        tracing::trace!(name = %name, tokens = body.len(), "defined macro");
        self.macros.insert(name, body);
        Ok(())
    }

    fn directive_name(&mut self, loc: SourceLocation) -> Result<String, LexError> {
        let mut name = String::new();
        while let Some(ch) = self.peek() {
            if ch.is_ascii_alphanumeric() || ch == '_' {
                name.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        if name.is_empty() || name.starts_with(|c: char| c.is_ascii_digit()) {
            return Err(LexError::new("Expected macro name after directive", loc));
        }
        Ok(name)
    }

    fn skip_rest_of_line(&mut self) {
        while let Some(ch) = self.peek() {
            if ch == '\\' && self.peek_ahead(1) == Some('\n') {
                self.advance();
            } else if ch == '\n' {
                break;
            }
            self.advance();
        }
    }

    /// Peek at current character without consuming
    fn peek(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    /// Peek ahead n characters
    fn peek_ahead(&self, n: usize) -> Option<char> {
        self.input.get(self.position + n).copied()
    }

    /// Advance to next character
    fn advance(&mut self) -> Option<char> {
        let ch = *self.input.get(self.position)?;
        self.position += 1;

        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }

        Some(ch)
    }

    /// Check if at end of input
    fn is_at_end(&self) -> bool {
        self.position >= self.input.len()
    }

    /// Get current source location
    fn current_location(&self) -> SourceLocation {
        SourceLocation::new(self.line, self.column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        Lexer::new(source)
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn test_simple_tokens() {
        let tokens = kinds("int main() { return 0; }");

        assert_eq!(
            tokens,
            vec![
                TokenKind::Int,
                TokenKind::Ident("main".to_string()),
                TokenKind::LParen,
                TokenKind::RParen,
                TokenKind::LBrace,
                TokenKind::Return,
                TokenKind::IntLiteral(0),
                TokenKind::Semicolon,
                TokenKind::RBrace,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_operators() {
        let tokens = kinds("++ -- += -= == != && || -> ... << >>=");

        assert!(matches!(tokens[0], TokenKind::PlusPlus));
        assert!(matches!(tokens[1], TokenKind::MinusMinus));
        assert!(matches!(tokens[2], TokenKind::PlusEq));
        assert!(matches!(tokens[3], TokenKind::MinusEq));
        assert!(matches!(tokens[4], TokenKind::EqEq));
        assert!(matches!(tokens[5], TokenKind::NotEq));
        assert!(matches!(tokens[6], TokenKind::AndAnd));
        assert!(matches!(tokens[7], TokenKind::OrOr));
        assert!(matches!(tokens[8], TokenKind::Arrow));
        assert!(matches!(tokens[9], TokenKind::Ellipsis));
        assert!(matches!(tokens[10], TokenKind::LtLt));
        // `>>=` is not a token of this subset: `>>` then `=`.
        assert!(matches!(tokens[11], TokenKind::GtGt));
        assert!(matches!(tokens[12], TokenKind::Eq));
    }

    #[test]
    fn test_comments() {
        let tokens = kinds("int x; // comment\nint y; /* block\ncomment */ int z;");

        assert!(matches!(tokens[0], TokenKind::Int));
        assert!(matches!(tokens[1], TokenKind::Ident(ref s) if s == "x"));
        assert!(matches!(tokens[2], TokenKind::Semicolon));
        assert!(matches!(tokens[3], TokenKind::Int));
        assert!(matches!(tokens[4], TokenKind::Ident(ref s) if s == "y"));
        assert!(matches!(tokens[5], TokenKind::Semicolon));
        assert!(matches!(tokens[6], TokenKind::Int));
        assert!(matches!(tokens[7], TokenKind::Ident(ref s) if s == "z"));
    }

    #[test]
    fn test_number_literals() {
        let tokens = kinds("42 0x12345678 017 0 10u 3L");

        assert_eq!(tokens[0], TokenKind::IntLiteral(42));
        assert_eq!(tokens[1], TokenKind::IntLiteral(0x1234_5678));
        assert_eq!(tokens[2], TokenKind::IntLiteral(15));
        assert_eq!(tokens[3], TokenKind::IntLiteral(0));
        assert_eq!(tokens[4], TokenKind::IntLiteral(10));
        assert_eq!(tokens[5], TokenKind::IntLiteral(3));
    }

    #[test]
    fn test_string_literal() {
        let tokens = kinds(r#""hello\nworld\t\\ \"q\"""#);

        match &tokens[0] {
            TokenKind::StringLiteral(s) => assert_eq!(s, b"hello\nworld\t\\ \"q\""),
            other => panic!("Expected string literal, got {:?}", other),
        }
    }

    #[test]
    fn test_char_literals() {
        let tokens = kinds(r"'a' '\n' '\'' '\\' '\x41'");

        assert_eq!(tokens[0], TokenKind::CharLiteral(b'a' as i8));
        assert_eq!(tokens[1], TokenKind::CharLiteral(b'\n' as i8));
        assert_eq!(tokens[2], TokenKind::CharLiteral(b'\'' as i8));
        assert_eq!(tokens[3], TokenKind::CharLiteral(b'\\' as i8));
        assert_eq!(tokens[4], TokenKind::CharLiteral(0x41));
    }

    #[test]
    fn test_token_positions() {
        let tokens = Lexer::new("int x;\n  return").tokenize().unwrap();

        assert_eq!(tokens[1].location, SourceLocation::new(1, 5));
        assert_eq!(tokens[1].lexeme, "x");
        assert_eq!(tokens[3].location, SourceLocation::new(2, 3));
        assert_eq!(tokens[3].lexeme, "return");
    }

    #[test]
    fn test_preprocessor_skip() {
        let tokens = kinds("#include <stdio.h>\nint x;");

        assert!(matches!(tokens[0], TokenKind::Int));
        assert!(matches!(tokens[1], TokenKind::Ident(ref s) if s == "x"));
    }

    #[test]
    fn test_object_like_macro() {
        let tokens = kinds("#define MAXGUESSES 10\nint a[MAXGUESSES];");

        assert_eq!(tokens[3], TokenKind::IntLiteral(10));
    }

    #[test]
    fn test_nested_and_self_referential_macros() {
        let tokens = kinds("#define A B + 1\n#define B A\nA");

        // A -> B + 1 -> (A) + 1; the inner A is not expanded again.
        assert_eq!(tokens[0], TokenKind::Ident("A".to_string()));
        assert_eq!(tokens[1], TokenKind::Plus);
        assert_eq!(tokens[2], TokenKind::IntLiteral(1));
    }

    #[test]
    fn test_undef() {
        let tokens = kinds("#define N 3\n#undef N\nN");

        assert_eq!(tokens[0], TokenKind::Ident("N".to_string()));
    }

    #[test]
    fn test_directive_must_start_line() {
        let tokens = kinds("  #define N 4\nN");
        assert_eq!(tokens[0], TokenKind::IntLiteral(4));

        let err = Lexer::new("int x;\nx = 1; # define N 2\n").tokenize().unwrap_err();
        assert_eq!(err.location, SourceLocation::new(2, 8));
        assert!(err.message.contains("Unexpected character"));
    }

    #[test]
    fn test_function_like_macro_rejected() {
        let err = Lexer::new("#define F(x) x\n").tokenize().unwrap_err();
        assert!(err.message.contains("Function-like macro"));
    }

    #[test]
    fn test_unterminated_string() {
        let err = Lexer::new("int x;\n\"abc").tokenize().unwrap_err();

        assert_eq!(err.location, SourceLocation::new(2, 1));
        assert!(err.message.contains("Unterminated string"));
    }

    #[test]
    fn test_unterminated_char() {
        let err = Lexer::new("'a").tokenize().unwrap_err();
        assert!(err.message.contains("Unterminated character"));
    }

    #[test]
    fn test_invalid_character() {
        let err = Lexer::new("int @x;").tokenize().unwrap_err();

        assert_eq!(err.location, SourceLocation::new(1, 5));
        assert!(err.message.contains("Unexpected character"));
    }
}
