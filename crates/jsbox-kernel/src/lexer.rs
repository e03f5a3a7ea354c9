//! Lexer for the jsbox expression subset.
//!
//! Converts expression source into a stream of tokens using the logos lexer
//! generator. The token set covers the ES5.1 subset the evaluator accepts,
//! plus a few ES6 marker tokens (`let`, `const`, `=>`, template literals)
//! that exist only so the validator can flag them with a source location —
//! the parser rejects them.

use logos::{Logos, Span};
use std::fmt;

/// A token with its span in the source text.
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned<T> {
    pub token: T,
    pub span: Span,
}

impl<T> Spanned<T> {
    pub fn new(token: T, span: Span) -> Self {
        Self { token, span }
    }
}

/// Lexer error types.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum LexerError {
    #[default]
    UnexpectedCharacter,
    InvalidEscape,
    InvalidNumber,
}

impl fmt::Display for LexerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LexerError::UnexpectedCharacter => write!(f, "unexpected character"),
            LexerError::InvalidEscape => write!(f, "invalid escape sequence"),
            LexerError::InvalidNumber => write!(f, "invalid number literal"),
        }
    }
}

impl std::error::Error for LexerError {}

/// Unescape the body of a quoted string literal.
fn unescape(body: &str) -> Result<String, LexerError> {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('b') => out.push('\u{0008}'),
            Some('f') => out.push('\u{000C}'),
            Some('0') => out.push('\0'),
            Some('\\') => out.push('\\'),
            Some('/') => out.push('/'),
            Some('\'') => out.push('\''),
            Some('"') => out.push('"'),
            Some('u') => {
                let hex: String = chars.by_ref().take(4).collect();
                if hex.len() != 4 {
                    return Err(LexerError::InvalidEscape);
                }
                let code = u32::from_str_radix(&hex, 16).map_err(|_| LexerError::InvalidEscape)?;
                out.push(char::from_u32(code).ok_or(LexerError::InvalidEscape)?);
            }
            _ => return Err(LexerError::InvalidEscape),
        }
    }
    Ok(out)
}

fn lex_double_string(lex: &logos::Lexer<Token>) -> Result<String, LexerError> {
    let s = lex.slice();
    unescape(&s[1..s.len() - 1])
}

fn lex_single_string(lex: &logos::Lexer<Token>) -> Result<String, LexerError> {
    let s = lex.slice();
    unescape(&s[1..s.len() - 1])
}

fn lex_int(lex: &logos::Lexer<Token>) -> Result<i64, LexerError> {
    lex.slice().parse().map_err(|_| LexerError::InvalidNumber)
}

fn lex_float(lex: &logos::Lexer<Token>) -> Result<f64, LexerError> {
    lex.slice().parse().map_err(|_| LexerError::InvalidNumber)
}

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(error = LexerError)]
#[logos(skip r"[ \t\r\n]+")]
#[logos(skip r"//[^\n]*")]
#[logos(skip r"/\*[^*]*\*+([^/*][^*]*\*+)*/")]
pub enum Token {
    // ═══════════════════════════════════════════════════════════════════
    // Keywords (must come before Ident for priority)
    // ═══════════════════════════════════════════════════════════════════
    #[token("function")]
    Function,

    #[token("return")]
    Return,

    #[token("var")]
    Var,

    #[token("if")]
    If,

    #[token("else")]
    Else,

    #[token("while")]
    While,

    #[token("typeof")]
    TypeOf,

    #[token("this")]
    This,

    #[token("true")]
    True,

    #[token("false")]
    False,

    #[token("null")]
    Null,

    // ═══════════════════════════════════════════════════════════════════
    // ES6 markers — recognized so the validator can flag them, never
    // accepted by the parser
    // ═══════════════════════════════════════════════════════════════════
    #[token("let")]
    Let,

    #[token("const")]
    Const,

    #[token("=>")]
    Arrow,

    #[regex(r"`[^`]*`")]
    TemplateString,

    // ═══════════════════════════════════════════════════════════════════
    // Multi-character operators (must come before single-char versions)
    // ═══════════════════════════════════════════════════════════════════
    #[token("===")]
    EqEqEq,

    #[token("!==")]
    NotEqEq,

    #[token("==")]
    EqEq,

    #[token("!=")]
    NotEq,

    #[token("<=")]
    LtEq,

    #[token(">=")]
    GtEq,

    #[token("&&")]
    And,

    #[token("||")]
    Or,

    #[token("+=")]
    PlusEq,

    #[token("-=")]
    MinusEq,

    #[token("*=")]
    StarEq,

    #[token("/=")]
    SlashEq,

    // ═══════════════════════════════════════════════════════════════════
    // Single-character operators and punctuation
    // ═══════════════════════════════════════════════════════════════════
    #[token("=")]
    Eq,

    #[token("<")]
    Lt,

    #[token(">")]
    Gt,

    #[token("!")]
    Bang,

    #[token("+")]
    Plus,

    #[token("-")]
    Minus,

    #[token("*")]
    Star,

    #[token("/")]
    Slash,

    #[token("%")]
    Percent,

    #[token("?")]
    Question,

    #[token(":")]
    Colon,

    #[token(";")]
    Semi,

    #[token(",")]
    Comma,

    #[token(".")]
    Dot,

    #[token("(")]
    LParen,

    #[token(")")]
    RParen,

    #[token("{")]
    LBrace,

    #[token("}")]
    RBrace,

    #[token("[")]
    LBracket,

    #[token("]")]
    RBracket,

    // ═══════════════════════════════════════════════════════════════════
    // Literals and identifiers
    // ═══════════════════════════════════════════════════════════════════
    #[regex(r#""([^"\\\n]|\\.)*""#, lex_double_string)]
    #[regex(r"'([^'\\\n]|\\.)*'", lex_single_string)]
    String(String),

    #[regex(r"[0-9]+\.[0-9]+([eE][+-]?[0-9]+)?", lex_float)]
    #[regex(r"[0-9]+[eE][+-]?[0-9]+", lex_float)]
    Float(f64),

    #[regex(r"[0-9]+", lex_int, priority = 3)]
    Int(i64),

    #[regex(r"[A-Za-z_$][A-Za-z0-9_$]*", |lex| lex.slice().to_string())]
    Ident(String),
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Function => write!(f, "function"),
            Token::Return => write!(f, "return"),
            Token::Var => write!(f, "var"),
            Token::If => write!(f, "if"),
            Token::Else => write!(f, "else"),
            Token::While => write!(f, "while"),
            Token::TypeOf => write!(f, "typeof"),
            Token::This => write!(f, "this"),
            Token::True => write!(f, "true"),
            Token::False => write!(f, "false"),
            Token::Null => write!(f, "null"),
            Token::Let => write!(f, "let"),
            Token::Const => write!(f, "const"),
            Token::Arrow => write!(f, "=>"),
            Token::TemplateString => write!(f, "template string"),
            Token::EqEqEq => write!(f, "==="),
            Token::NotEqEq => write!(f, "!=="),
            Token::EqEq => write!(f, "=="),
            Token::NotEq => write!(f, "!="),
            Token::LtEq => write!(f, "<="),
            Token::GtEq => write!(f, ">="),
            Token::And => write!(f, "&&"),
            Token::Or => write!(f, "||"),
            Token::PlusEq => write!(f, "+="),
            Token::MinusEq => write!(f, "-="),
            Token::StarEq => write!(f, "*="),
            Token::SlashEq => write!(f, "/="),
            Token::Eq => write!(f, "="),
            Token::Lt => write!(f, "<"),
            Token::Gt => write!(f, ">"),
            Token::Bang => write!(f, "!"),
            Token::Plus => write!(f, "+"),
            Token::Minus => write!(f, "-"),
            Token::Star => write!(f, "*"),
            Token::Slash => write!(f, "/"),
            Token::Percent => write!(f, "%"),
            Token::Question => write!(f, "?"),
            Token::Colon => write!(f, ":"),
            Token::Semi => write!(f, ";"),
            Token::Comma => write!(f, ","),
            Token::Dot => write!(f, "."),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
            Token::LBrace => write!(f, "{{"),
            Token::RBrace => write!(f, "}}"),
            Token::LBracket => write!(f, "["),
            Token::RBracket => write!(f, "]"),
            Token::String(s) => write!(f, "\"{}\"", s),
            Token::Float(x) => write!(f, "{}", x),
            Token::Int(n) => write!(f, "{}", n),
            Token::Ident(name) => write!(f, "{}", name),
        }
    }
}

impl Token {
    /// True for tokens outside the supported ES5.1 subset.
    pub fn is_es6_marker(&self) -> bool {
        matches!(
            self,
            Token::Let | Token::Const | Token::Arrow | Token::TemplateString
        )
    }
}

/// Tokenize expression source into spanned tokens.
///
/// All lexer errors are collected rather than stopping at the first, so the
/// validator can report every offending location.
pub fn tokenize(source: &str) -> Result<Vec<Spanned<Token>>, Vec<Spanned<LexerError>>> {
    let lexer = Token::lexer(source);
    let mut tokens = Vec::new();
    let mut errors = Vec::new();

    for (result, span) in lexer.spanned() {
        match result {
            Ok(token) => tokens.push(Spanned::new(token, span)),
            Err(err) => errors.push(Spanned::new(err, span)),
        }
    }

    if errors.is_empty() {
        Ok(tokens)
    } else {
        Err(errors)
    }
}
