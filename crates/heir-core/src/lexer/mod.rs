//! Lexical analysis (tokenization) for Heir source code.
//!
//! - `scanner.rs` - `Scanner`, which produces tokens and reports lexical
//!   diagnostics (H001, H002, H002B, H003)
//! - `token.rs` - `Token` and `TokenKind` definitions
//!
//! ```rust
//! use heir_core::diagnostics::DiagnosticBag;
//! use heir_core::lexer::{Scanner, TokenKind};
//!
//! let mut scanner = Scanner::new("let x = 0x2A;", DiagnosticBag::new());
//! assert_eq!(scanner.next_token().kind, TokenKind::Let);
//! ```

mod scanner;
mod token;

pub use crate::diagnostics::Span;
pub use scanner::{Scanner, tokenize};
pub use token::{Token, TokenKind};
