//! Token definitions for the Heir lexer.

use crate::diagnostics::Span;
use std::fmt;

/// A token produced by the lexer.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    /// The kind of token
    pub kind: TokenKind,
    /// The span in the source code
    pub span: Span,
}

impl Token {
    /// Creates a new token.
    pub fn new(kind: TokenKind, span: Span) -> Self {
        Self { kind, span }
    }
}

/// The kind of a token.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Literals
    /// Integer literal
    Int(i64),
    /// Floating point literal
    Float(f64),
    /// String literal
    String(String),
    /// Character literal
    Char(char),
    /// `true` or `false`
    Bool(bool),
    /// Identifier
    Identifier(String),

    // Keywords
    /// `let`
    Let,
    /// `mut`
    Mut,
    /// `fn`
    Fn,
    /// `if`
    If,
    /// `else`
    Else,
    /// `return`
    Return,
    /// `none`
    None,
    /// `int`
    IntKeyword,
    /// `float`
    FloatKeyword,
    /// `string`
    StringKeyword,
    /// `char`
    CharKeyword,
    /// `bool`
    BoolKeyword,

    // Punctuation
    /// `{`
    LeftBrace,
    /// `}`
    RightBrace,
    /// `(`
    LeftParen,
    /// `)`
    RightParen,
    /// `[`
    LeftBracket,
    /// `]`
    RightBracket,
    /// `.`
    Dot,
    /// `,`
    Comma,
    /// `:`
    Colon,
    /// `;`
    Semicolon,
    /// `->`
    Arrow,

    // Operators
    /// `+`
    Plus,
    /// `++`
    PlusPlus,
    /// `+=`
    PlusEqual,
    /// `-`
    Minus,
    /// `--`
    MinusMinus,
    /// `-=`
    MinusEqual,
    /// `*`
    Star,
    /// `*=`
    StarEqual,
    /// `/`
    Slash,
    /// `/=`
    SlashEqual,
    /// `//`
    SlashSlash,
    /// `//=`
    SlashSlashEqual,
    /// `%`
    Percent,
    /// `%=`
    PercentEqual,
    /// `^`
    Caret,
    /// `^=`
    CaretEqual,
    /// `&`
    Ampersand,
    /// `&=`
    AmpersandEqual,
    /// `&&`
    AmpersandAmpersand,
    /// `&&=`
    AmpersandAmpersandEqual,
    /// `|`
    Pipe,
    /// `|=`
    PipeEqual,
    /// `||`
    PipePipe,
    /// `||=`
    PipePipeEqual,
    /// `~`
    Tilde,
    /// `~=`
    TildeEqual,
    /// `!`
    Bang,
    /// `!=`
    BangEqual,
    /// `=`
    Equal,
    /// `==`
    EqualEqual,
    /// `<`
    Less,
    /// `<=`
    LessEqual,
    /// `<<`
    LessLess,
    /// `<<=`
    LessLessEqual,
    /// `>`
    Greater,
    /// `>=`
    GreaterEqual,
    /// `>>`
    GreaterGreater,
    /// `>>=`
    GreaterGreaterEqual,

    // Special
    /// End of file
    Eof,
    /// Invalid token
    Invalid,
}

impl TokenKind {
    /// Returns the keyword token for `word`, if it is one.
    pub fn keyword(word: &str) -> Option<TokenKind> {
        let kind = match word {
            "let" => TokenKind::Let,
            "mut" => TokenKind::Mut,
            "fn" => TokenKind::Fn,
            "if" => TokenKind::If,
            "else" => TokenKind::Else,
            "return" => TokenKind::Return,
            "none" => TokenKind::None,
            "true" => TokenKind::Bool(true),
            "false" => TokenKind::Bool(false),
            "int" => TokenKind::IntKeyword,
            "float" => TokenKind::FloatKeyword,
            "string" => TokenKind::StringKeyword,
            "char" => TokenKind::CharKeyword,
            "bool" => TokenKind::BoolKeyword,
            _ => return None,
        };
        Some(kind)
    }

    /// Returns true for the type keywords usable in annotations.
    pub fn is_type_keyword(&self) -> bool {
        matches!(
            self,
            TokenKind::IntKeyword
                | TokenKind::FloatKeyword
                | TokenKind::StringKeyword
                | TokenKind::CharKeyword
                | TokenKind::BoolKeyword
                | TokenKind::None
        )
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            TokenKind::Int(n) => return write!(f, "{}", n),
            TokenKind::Float(n) => return write!(f, "{}", n),
            TokenKind::String(s) => return write!(f, "{:?}", s),
            TokenKind::Char(c) => return write!(f, "{:?}", c),
            TokenKind::Bool(b) => return write!(f, "{}", b),
            TokenKind::Identifier(name) => return write!(f, "{}", name),
            TokenKind::Let => "let",
            TokenKind::Mut => "mut",
            TokenKind::Fn => "fn",
            TokenKind::If => "if",
            TokenKind::Else => "else",
            TokenKind::Return => "return",
            TokenKind::None => "none",
            TokenKind::IntKeyword => "int",
            TokenKind::FloatKeyword => "float",
            TokenKind::StringKeyword => "string",
            TokenKind::CharKeyword => "char",
            TokenKind::BoolKeyword => "bool",
            TokenKind::LeftBrace => "{",
            TokenKind::RightBrace => "}",
            TokenKind::LeftParen => "(",
            TokenKind::RightParen => ")",
            TokenKind::LeftBracket => "[",
            TokenKind::RightBracket => "]",
            TokenKind::Dot => ".",
            TokenKind::Comma => ",",
            TokenKind::Colon => ":",
            TokenKind::Semicolon => ";",
            TokenKind::Arrow => "->",
            TokenKind::Plus => "+",
            TokenKind::PlusPlus => "++",
            TokenKind::PlusEqual => "+=",
            TokenKind::Minus => "-",
            TokenKind::MinusMinus => "--",
            TokenKind::MinusEqual => "-=",
            TokenKind::Star => "*",
            TokenKind::StarEqual => "*=",
            TokenKind::Slash => "/",
            TokenKind::SlashEqual => "/=",
            TokenKind::SlashSlash => "//",
            TokenKind::SlashSlashEqual => "//=",
            TokenKind::Percent => "%",
            TokenKind::PercentEqual => "%=",
            TokenKind::Caret => "^",
            TokenKind::CaretEqual => "^=",
            TokenKind::Ampersand => "&",
            TokenKind::AmpersandEqual => "&=",
            TokenKind::AmpersandAmpersand => "&&",
            TokenKind::AmpersandAmpersandEqual => "&&=",
            TokenKind::Pipe => "|",
            TokenKind::PipeEqual => "|=",
            TokenKind::PipePipe => "||",
            TokenKind::PipePipeEqual => "||=",
            TokenKind::Tilde => "~",
            TokenKind::TildeEqual => "~=",
            TokenKind::Bang => "!",
            TokenKind::BangEqual => "!=",
            TokenKind::Equal => "=",
            TokenKind::EqualEqual => "==",
            TokenKind::Less => "<",
            TokenKind::LessEqual => "<=",
            TokenKind::LessLess => "<<",
            TokenKind::LessLessEqual => "<<=",
            TokenKind::Greater => ">",
            TokenKind::GreaterEqual => ">=",
            TokenKind::GreaterGreater => ">>",
            TokenKind::GreaterGreaterEqual => ">>=",
            TokenKind::Eof => "end of file",
            TokenKind::Invalid => "invalid token",
        };
        f.write_str(text)
    }
}
