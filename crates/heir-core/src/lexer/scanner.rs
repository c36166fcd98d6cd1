//! The scanner that produces tokens from source text.

use super::{Token, TokenKind};
use crate::diagnostics::{DiagnosticBag, DiagnosticCode, Span};

/// A scanner that tokenizes Heir source code.
///
/// Lexical errors are reported to the diagnostics bag; scanning always
/// continues with the next character.
pub struct Scanner<'a> {
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
    current_pos: usize,
    diagnostics: DiagnosticBag,
}

/// Scans the whole source, returning every token followed by `Eof`.
pub fn tokenize(source: &str, diagnostics: DiagnosticBag) -> Vec<Token> {
    let mut scanner = Scanner::new(source, diagnostics);
    let mut tokens = Vec::new();
    loop {
        let token = scanner.next_token();
        let done = token.kind == TokenKind::Eof;
        tokens.push(token);
        if done {
            return tokens;
        }
    }
}

impl<'a> Scanner<'a> {
    /// Creates a new scanner for the given source code.
    pub fn new(source: &'a str, diagnostics: DiagnosticBag) -> Self {
        Self {
            chars: source.char_indices().peekable(),
            current_pos: 0,
            diagnostics,
        }
    }

    /// Returns the next token from the source.
    pub fn next_token(&mut self) -> Token {
        self.skip_whitespace_and_comments();

        let start = self.current_pos;

        let Some((_pos, ch)) = self.advance() else {
            return Token::new(TokenKind::Eof, Span::new(start, start));
        };

        let kind = match ch {
            '{' => TokenKind::LeftBrace,
            '}' => TokenKind::RightBrace,
            '(' => TokenKind::LeftParen,
            ')' => TokenKind::RightParen,
            '[' => TokenKind::LeftBracket,
            ']' => TokenKind::RightBracket,
            '.' => TokenKind::Dot,
            ',' => TokenKind::Comma,
            ':' => TokenKind::Colon,
            ';' => TokenKind::Semicolon,

            '+' => self.scan_doubled('+', TokenKind::Plus, TokenKind::PlusPlus, TokenKind::PlusEqual),
            '-' => {
                if self.eat('>') {
                    TokenKind::Arrow
                } else {
                    self.scan_doubled('-', TokenKind::Minus, TokenKind::MinusMinus, TokenKind::MinusEqual)
                }
            }
            '*' => self.scan_assign(TokenKind::Star, TokenKind::StarEqual),
            '/' => {
                if self.eat('/') {
                    self.scan_assign(TokenKind::SlashSlash, TokenKind::SlashSlashEqual)
                } else {
                    self.scan_assign(TokenKind::Slash, TokenKind::SlashEqual)
                }
            }
            '%' => self.scan_assign(TokenKind::Percent, TokenKind::PercentEqual),
            '^' => self.scan_assign(TokenKind::Caret, TokenKind::CaretEqual),
            '~' => self.scan_assign(TokenKind::Tilde, TokenKind::TildeEqual),
            '!' => self.scan_assign(TokenKind::Bang, TokenKind::BangEqual),
            '=' => self.scan_assign(TokenKind::Equal, TokenKind::EqualEqual),
            '&' => {
                if self.eat('&') {
                    self.scan_assign(TokenKind::AmpersandAmpersand, TokenKind::AmpersandAmpersandEqual)
                } else {
                    self.scan_assign(TokenKind::Ampersand, TokenKind::AmpersandEqual)
                }
            }
            '|' => {
                if self.eat('|') {
                    self.scan_assign(TokenKind::PipePipe, TokenKind::PipePipeEqual)
                } else {
                    self.scan_assign(TokenKind::Pipe, TokenKind::PipeEqual)
                }
            }
            '<' => {
                if self.eat('<') {
                    self.scan_assign(TokenKind::LessLess, TokenKind::LessLessEqual)
                } else {
                    self.scan_assign(TokenKind::Less, TokenKind::LessEqual)
                }
            }
            '>' => {
                if self.eat('>') {
                    self.scan_assign(TokenKind::GreaterGreater, TokenKind::GreaterGreaterEqual)
                } else {
                    self.scan_assign(TokenKind::Greater, TokenKind::GreaterEqual)
                }
            }

            '"' => self.scan_string(start),
            '\'' => self.scan_char(start),

            '0'..='9' => self.scan_number(start, ch),

            _ if is_id_start(ch) => self.scan_identifier(ch),

            _ => {
                self.diagnostics.error(
                    DiagnosticCode::UnexpectedCharacter,
                    format!("Unexpected character '{}'", ch.escape_debug()),
                    Span::new(start, self.current_pos),
                );
                TokenKind::Invalid
            }
        };

        Token::new(kind, Span::new(start, self.current_pos))
    }

    fn advance(&mut self) -> Option<(usize, char)> {
        let result = self.chars.next();
        if let Some((pos, ch)) = result {
            self.current_pos = pos + ch.len_utf8();
        }
        result
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().map(|(_, ch)| *ch)
    }

    fn peek_next(&self) -> Option<char> {
        let mut iter = self.chars.clone();
        iter.next();
        iter.next().map(|(_, ch)| ch)
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn skip_whitespace_and_comments(&mut self) {
        while let Some(ch) = self.peek() {
            match ch {
                ' ' | '\t' | '\n' | '\r' => {
                    self.advance();
                }
                '#' => {
                    while let Some(ch) = self.peek() {
                        if ch == '\n' {
                            break;
                        }
                        self.advance();
                    }
                }
                _ => break,
            }
        }
    }

    /// `op`, `op=`
    fn scan_assign(&mut self, plain: TokenKind, assign: TokenKind) -> TokenKind {
        if self.eat('=') { assign } else { plain }
    }

    /// `op`, `opop`, `op=`
    fn scan_doubled(
        &mut self,
        ch: char,
        plain: TokenKind,
        doubled: TokenKind,
        assign: TokenKind,
    ) -> TokenKind {
        if self.eat(ch) {
            doubled
        } else {
            self.scan_assign(plain, assign)
        }
    }

    fn scan_escape(&mut self) -> Option<char> {
        let (_, escaped) = self.advance()?;
        Some(match escaped {
            'n' => '\n',
            'r' => '\r',
            't' => '\t',
            '0' => '\0',
            other => other,
        })
    }

    fn scan_string(&mut self, start: usize) -> TokenKind {
        let mut value = String::new();

        loop {
            match self.advance() {
                None => {
                    self.diagnostics.error(
                        DiagnosticCode::UnterminatedString,
                        "Unterminated string literal",
                        Span::new(start, self.current_pos),
                    );
                    break;
                }
                Some((_, '"')) => break,
                Some((_, '\\')) => {
                    if let Some(escaped) = self.scan_escape() {
                        value.push(escaped);
                    }
                }
                Some((_, ch)) => value.push(ch),
            }
        }

        TokenKind::String(value)
    }

    fn scan_char(&mut self, start: usize) -> TokenKind {
        let value = match self.advance() {
            Some((_, '\\')) => self.scan_escape(),
            Some((_, '\'')) | Some((_, '\n')) | None => None,
            Some((_, ch)) => Some(ch),
        };

        match value {
            Some(ch) if self.eat('\'') => TokenKind::Char(ch),
            _ => {
                // Skip the rest of the literal on this line
                while let Some(ch) = self.peek() {
                    if ch == '\n' {
                        break;
                    }
                    self.advance();
                    if ch == '\'' {
                        break;
                    }
                }
                self.diagnostics.error(
                    DiagnosticCode::UnterminatedChar,
                    "Unterminated or malformed character literal",
                    Span::new(start, self.current_pos),
                );
                TokenKind::Invalid
            }
        }
    }

    fn scan_digits(&mut self, value: &mut String, radix: u32) {
        while let Some(ch) = self.peek() {
            if ch.is_digit(radix) || ch == '_' {
                if ch != '_' {
                    value.push(ch);
                }
                self.advance();
            } else {
                break;
            }
        }
    }

    fn scan_number(&mut self, start: usize, first: char) -> TokenKind {
        if first == '0' {
            let radix = match self.peek() {
                Some('x' | 'X') => Some(16),
                Some('o' | 'O') => Some(8),
                Some('b' | 'B') => Some(2),
                _ => None,
            };
            if let Some(radix) = radix {
                self.advance();
                return self.scan_radix_number(start, radix);
            }
        }

        let mut value = String::from(first);
        self.scan_digits(&mut value, 10);

        let mut is_float = false;
        if self.peek() == Some('.') && self.peek_next().is_some_and(|c| c.is_ascii_digit()) {
            is_float = true;
            value.push('.');
            self.advance();
            self.scan_digits(&mut value, 10);
        }

        if is_float && self.peek() == Some('.') && self.peek_next().is_some_and(|c| c.is_ascii_digit()) {
            while self.peek() == Some('.') || self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.advance();
            }
            return self.malformed_number(start);
        }

        if is_float {
            match value.parse::<f64>() {
                Ok(n) => TokenKind::Float(n),
                Err(_) => self.malformed_number(start),
            }
        } else {
            match value.parse::<i64>() {
                Ok(n) => TokenKind::Int(n),
                Err(_) => self.malformed_number(start),
            }
        }
    }

    fn scan_radix_number(&mut self, start: usize, radix: u32) -> TokenKind {
        let mut value = String::new();
        self.scan_digits(&mut value, radix);

        match i64::from_str_radix(&value, radix) {
            Ok(n) if !value.is_empty() => TokenKind::Int(n),
            _ => self.malformed_number(start),
        }
    }

    fn malformed_number(&mut self, start: usize) -> TokenKind {
        self.diagnostics.error(
            DiagnosticCode::MalformedNumber,
            "Malformed number literal",
            Span::new(start, self.current_pos),
        );
        TokenKind::Invalid
    }

    fn scan_identifier(&mut self, first: char) -> TokenKind {
        let mut name = String::from(first);

        while let Some(ch) = self.peek() {
            if is_id_continue(ch) {
                name.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        TokenKind::keyword(&name).unwrap_or(TokenKind::Identifier(name))
    }
}

/// Checks if a character can start an identifier.
fn is_id_start(ch: char) -> bool {
    ch == '_' || unicode_xid::UnicodeXID::is_xid_start(ch)
}

/// Checks if a character can continue an identifier.
fn is_id_continue(ch: char) -> bool {
    ch == '_' || unicode_xid::UnicodeXID::is_xid_continue(ch)
}

impl<'a> Iterator for Scanner<'a> {
    type Item = Token;

    fn next(&mut self) -> Option<Self::Item> {
        let token = self.next_token();
        if token.kind == TokenKind::Eof {
            None
        } else {
            Some(token)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        Scanner::new(source, DiagnosticBag::new())
            .map(|t| t.kind)
            .collect()
    }

    fn diagnostics_for(source: &str) -> DiagnosticBag {
        let bag = DiagnosticBag::new();
        tokenize(source, bag.clone());
        bag
    }

    #[test]
    fn test_simple_tokens() {
        assert_eq!(
            kinds("{ } ( ) [ ] . , : ; ->"),
            vec![
                TokenKind::LeftBrace,
                TokenKind::RightBrace,
                TokenKind::LeftParen,
                TokenKind::RightParen,
                TokenKind::LeftBracket,
                TokenKind::RightBracket,
                TokenKind::Dot,
                TokenKind::Comma,
                TokenKind::Colon,
                TokenKind::Semicolon,
                TokenKind::Arrow,
            ]
        );
    }

    #[test]
    fn test_numbers() {
        assert_eq!(
            kinds("69 69.420 0b1101 0o420 0x03E 1_000"),
            vec![
                TokenKind::Int(69),
                TokenKind::Float(69.420),
                TokenKind::Int(13),
                TokenKind::Int(272),
                TokenKind::Int(62),
                TokenKind::Int(1000),
            ]
        );
    }

    #[test]
    fn test_malformed_numbers() {
        assert!(diagnostics_for("1.2.3").contains(DiagnosticCode::MalformedNumber));
        assert!(diagnostics_for("0x").contains(DiagnosticCode::MalformedNumber));
        assert!(diagnostics_for("99999999999999999999").contains(DiagnosticCode::MalformedNumber));
    }

    #[test]
    fn test_member_access_on_int_is_not_a_float() {
        assert_eq!(
            kinds("1.a"),
            vec![
                TokenKind::Int(1),
                TokenKind::Dot,
                TokenKind::Identifier("a".into()),
            ]
        );
    }

    #[test]
    fn test_strings_and_chars() {
        assert_eq!(
            kinds(r#""abc\n" 'a' '\t'"#),
            vec![
                TokenKind::String("abc\n".into()),
                TokenKind::Char('a'),
                TokenKind::Char('\t'),
            ]
        );
    }

    #[test]
    fn test_unterminated_literals() {
        assert!(diagnostics_for("\"abc").contains(DiagnosticCode::UnterminatedString));
        assert!(diagnostics_for("'ab'").contains(DiagnosticCode::UnterminatedChar));
        assert!(diagnostics_for("''").contains(DiagnosticCode::UnterminatedChar));
    }

    #[test]
    fn test_keywords() {
        assert_eq!(
            kinds("let mut fn if else return int float string char bool none true false"),
            vec![
                TokenKind::Let,
                TokenKind::Mut,
                TokenKind::Fn,
                TokenKind::If,
                TokenKind::Else,
                TokenKind::Return,
                TokenKind::IntKeyword,
                TokenKind::FloatKeyword,
                TokenKind::StringKeyword,
                TokenKind::CharKeyword,
                TokenKind::BoolKeyword,
                TokenKind::None,
                TokenKind::Bool(true),
                TokenKind::Bool(false),
            ]
        );
    }

    #[test]
    fn test_identifiers() {
        assert_eq!(
            kinds("foo _bar café"),
            vec![
                TokenKind::Identifier("foo".into()),
                TokenKind::Identifier("_bar".into()),
                TokenKind::Identifier("café".into()),
            ]
        );
    }

    #[test]
    fn test_operators() {
        assert_eq!(
            kinds("+ ++ += - -- -= // //= ~ ~= && &&= || ||= << <<= >> >>= != =="),
            vec![
                TokenKind::Plus,
                TokenKind::PlusPlus,
                TokenKind::PlusEqual,
                TokenKind::Minus,
                TokenKind::MinusMinus,
                TokenKind::MinusEqual,
                TokenKind::SlashSlash,
                TokenKind::SlashSlashEqual,
                TokenKind::Tilde,
                TokenKind::TildeEqual,
                TokenKind::AmpersandAmpersand,
                TokenKind::AmpersandAmpersandEqual,
                TokenKind::PipePipe,
                TokenKind::PipePipeEqual,
                TokenKind::LessLess,
                TokenKind::LessLessEqual,
                TokenKind::GreaterGreater,
                TokenKind::GreaterGreaterEqual,
                TokenKind::BangEqual,
                TokenKind::EqualEqual,
            ]
        );
    }

    #[test]
    fn test_comments() {
        assert_eq!(
            kinds("1 # a comment\n2"),
            vec![TokenKind::Int(1), TokenKind::Int(2)]
        );
    }

    #[test]
    fn test_unexpected_character() {
        let bag = DiagnosticBag::new();
        let tokens = tokenize("1 @ 2", bag.clone());
        assert_eq!(tokens[1].kind, TokenKind::Invalid);
        assert_eq!(tokens[1].span, Span::new(2, 3));
        assert!(bag.contains(DiagnosticCode::UnexpectedCharacter));
        assert_eq!(tokens.last().map(|t| &t.kind), Some(&TokenKind::Eof));
    }
}
