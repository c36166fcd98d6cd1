//! Parser for Heir source code.
//!
//! Transforms a token stream into a [`SyntaxTree`](crate::ast::SyntaxTree).
//!
//! - `parser` - the `Parser` struct, token helpers and statement parsing
//! - `expressions` - precedence-climbing expression parsing
//!
//! The parser never fails: syntax errors are reported to the diagnostics
//! bag (H004, H005) and replaced with `NoOp` nodes.
//!
//! ```rust
//! use heir_core::diagnostics::DiagnosticBag;
//! use heir_core::parser::Parser;
//!
//! let diagnostics = DiagnosticBag::new();
//! let tree = Parser::new("let x = 1 + 2;", diagnostics.clone()).parse();
//! assert_eq!(tree.statements.len(), 1);
//! assert!(diagnostics.is_empty());
//! ```

mod expressions;
mod parser;

pub use parser::Parser;
