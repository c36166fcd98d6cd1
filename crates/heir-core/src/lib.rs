// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! # heir-core
//!
//! The Heir language toolchain: lexer, parser, binder, bytecode generator
//! and stack-based virtual machine.
//!
//! ## Overview
//!
//! Source text flows through the pipeline
//!
//! ```text
//! source -> tokens -> SyntaxTree -> BoundTree -> Bytecode -> Value
//! ```
//!
//! Every stage reports problems to one shared [`DiagnosticBag`] and keeps
//! going, so a single run surfaces every problem it can find.
//!
//! ## Quick Start
//!
//! ```rust
//! use heir_core::{Engine, Value};
//!
//! let mut engine = Engine::new();
//! let result = engine.eval("let mut a = 1; a += 1; a");
//! assert!(!result.has_errors());
//! assert_eq!(result.value, Value::Float(2.0));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod ast;
pub mod binder;
pub mod compiler;
pub mod diagnostics;
pub mod lexer;
pub mod parser;
pub mod runtime;
pub mod vm;

pub use compiler::{Bytecode, BytecodeGenerator};
pub use diagnostics::{Diagnostic, DiagnosticBag, DiagnosticCode, Severity, Span};
pub use runtime::{Scope, Value};
pub use vm::{VirtualMachine, VmOptions};

use std::path::{Path, PathBuf};

/// A Heir execution environment.
///
/// The engine keeps its global scope and the binder's global declarations
/// between calls, so successive inputs build on each other.
pub struct Engine {
    binder: binder::Binder,
    scope: Scope,
    options: VmOptions,
}

impl Engine {
    /// Creates an engine with default limits.
    pub fn new() -> Self {
        Self::with_options(VmOptions::default())
    }

    /// Creates an engine with explicit interpreter limits.
    pub fn with_options(options: VmOptions) -> Self {
        Self {
            binder: binder::Binder::new(),
            scope: Scope::new(),
            options,
        }
    }

    /// Compiles `source` without running it.
    ///
    /// Binding happens against a copy of the global declarations, so names
    /// declared here stay unknown to later inputs.
    pub fn compile(&self, source: &str) -> Bytecode {
        Self::generate(&mut self.binder.clone(), source)
    }

    /// Compiles and runs `source` in the global scope.
    ///
    /// Execution proceeds even when compilation reported errors; check
    /// [`Evaluation::has_errors`] before trusting the value.
    pub fn eval(&mut self, source: &str) -> Evaluation {
        let bytecode = Self::generate(&mut self.binder, source);
        let value = VirtualMachine::with_options(&bytecode, self.scope.clone(), self.options).evaluate();

        Evaluation {
            value,
            diagnostics: bytecode.diagnostics().take(),
        }
    }

    fn generate(binder: &mut binder::Binder, source: &str) -> Bytecode {
        let diagnostics = DiagnosticBag::new();

        let tree = parser::Parser::new(source, diagnostics.clone()).parse();
        let bound = binder.bind(&tree, diagnostics.clone());
        BytecodeGenerator::new(&bound, diagnostics).generate(&tree)
    }

    /// Reads and runs a source file.
    pub fn eval_file(&mut self, path: impl AsRef<Path>) -> Result<Evaluation> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;

        tracing::debug!(path = %path.display(), bytes = source.len(), "evaluating file");
        Ok(self.eval(&source))
    }

    /// The global scope.
    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    /// The interpreter limits in use.
    pub fn options(&self) -> VmOptions {
        self.options
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

/// The outcome of [`Engine::eval`].
#[derive(Debug, Clone)]
pub struct Evaluation {
    /// The salvaged result value
    pub value: Value,
    /// Everything reported while compiling and running
    pub diagnostics: Vec<Diagnostic>,
}

impl Evaluation {
    /// Returns true if any error diagnostic was reported.
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }

    /// The value, or the diagnostics if any of them is an error.
    pub fn into_result(self) -> Result<Value> {
        if self.has_errors() {
            Err(Error::Diagnostics(self.diagnostics))
        } else {
            Ok(self.value)
        }
    }
}

/// Errors surfaced by the engine facade.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A source file could not be read.
    #[error("cannot read {}: {source}", path.display())]
    Io {
        /// The file
        path: PathBuf,
        /// The underlying error
        #[source]
        source: std::io::Error,
    },
    /// Evaluation reported errors.
    #[error("evaluation failed with {} error(s)", .0.iter().filter(|d| d.is_error()).count())]
    Diagnostics(Vec<Diagnostic>),
}

/// Result alias for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_globals_persist() {
        let mut engine = Engine::new();
        engine.eval("let mut counter = 1;");
        let result = engine.eval("counter += 1; counter");

        assert!(!result.has_errors(), "{:?}", result.diagnostics);
        assert_eq!(result.value, Value::Float(2.0));
        assert!(engine.scope().is_declared("counter"));
    }

    #[test]
    fn test_errors_do_not_stop_execution() {
        let mut engine = Engine::new();
        let result = engine.eval("let x: int = \"no\"; x");

        assert!(result.has_errors());
        assert_eq!(result.value, Value::from("no"));
        assert!(matches!(result.into_result(), Err(Error::Diagnostics(_))));
    }

    #[test]
    fn test_compile_does_not_declare() {
        let mut engine = Engine::new();
        let bytecode = engine.compile("let y = 1;");
        assert!(!bytecode.is_empty());

        let result = engine.eval("y");
        assert!(result.diagnostics.iter().any(|d| d.code == DiagnosticCode::UnresolvedName));
        assert!(!engine.scope().is_declared("y"));
    }

    #[test]
    fn test_into_result_ok() {
        let mut engine = Engine::new();
        assert_eq!(engine.eval("7 // 3").into_result().ok(), Some(Value::Int(2)));
    }

    #[test]
    fn test_missing_file() {
        let mut engine = Engine::new();
        let err = engine.eval_file("/definitely/not/here.heir").unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
        assert!(err.to_string().starts_with("cannot read /definitely/not/here.heir"));
    }
}
