// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Interactive REPL (Read-Eval-Print Loop) for Heir.

use crate::config::Config;
use crate::print_diagnostics;
use heir_core::lexer::TokenKind;
use heir_core::{Engine, Value};
use owo_colors::OwoColorize;
use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::history::DefaultHistory;
use rustyline::validate::{ValidationContext, ValidationResult, Validator};
use rustyline::{Editor, Helper};
use std::borrow::Cow;
use std::path::PathBuf;

const MAX_HISTORY_SIZE: usize = 1000;

const KEYWORDS: &[&str] = &[
    "let", "mut", "fn", "if", "else", "return", "none", "true", "false", "int", "float", "string",
    "char", "bool",
];

/// REPL commands that can be executed with a dot prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplCommand {
    Help,
    Exit,
    Clear,
    Version,
    Load,
    Bytecode,
    Scope,
}

impl ReplCommand {
    /// Parse a REPL command from input string
    pub fn parse(input: &str) -> Option<(Self, Option<&str>)> {
        let rest = input.trim().strip_prefix('.')?;

        let mut parts = rest.splitn(2, char::is_whitespace);
        let cmd = parts.next()?.to_lowercase();
        let arg = parts.next().map(str::trim).filter(|a| !a.is_empty());

        let command = match cmd.as_str() {
            "help" | "h" | "?" => ReplCommand::Help,
            "exit" | "quit" | "q" => ReplCommand::Exit,
            "clear" | "cls" => ReplCommand::Clear,
            "version" | "v" => ReplCommand::Version,
            "load" | "l" => ReplCommand::Load,
            "bytecode" | "bc" => ReplCommand::Bytecode,
            "scope" | "s" => ReplCommand::Scope,
            _ => return None,
        };
        Some((command, arg))
    }

    /// Get all available commands for help/completion
    pub fn all_commands() -> &'static [(&'static str, &'static str)] {
        &[
            (".help", "Show this help message"),
            (".exit", "Exit the REPL"),
            (".clear", "Clear the screen"),
            (".version", "Show version information"),
            (".load <file>", "Load and execute a Heir file"),
            (".bytecode <code>", "Show the bytecode for a snippet"),
            (".scope", "List global variables"),
        ]
    }
}

/// Completion, hints, highlighting and validation for rustyline
struct HeirHelper {
    words: Vec<String>,
}

impl HeirHelper {
    fn new() -> Self {
        let commands = ReplCommand::all_commands()
            .iter()
            .map(|&(cmd, _)| cmd.split_whitespace().next().unwrap_or(cmd));

        Self {
            words: KEYWORDS
                .iter()
                .copied()
                .chain(commands)
                .map(String::from)
                .collect(),
        }
    }

    /// Start of the word ending at `pos`.
    fn word_start(line: &str, pos: usize) -> usize {
        line[..pos]
            .rfind(|c: char| !c.is_alphanumeric() && c != '_' && c != '.')
            .map(|i| i + 1)
            .unwrap_or(0)
    }
}

impl Completer for HeirHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &rustyline::Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let word = &line[Self::word_start(line, pos)..pos];
        if word.is_empty() {
            return Ok((pos, vec![]));
        }

        let matches = self
            .words
            .iter()
            .filter(|w| w.starts_with(word))
            .map(|w| Pair {
                display: w.clone(),
                replacement: w[word.len()..].to_string(),
            })
            .collect();

        Ok((pos, matches))
    }
}

impl Hinter for HeirHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &rustyline::Context<'_>) -> Option<Self::Hint> {
        if pos < line.len() {
            return None;
        }

        let word = &line[Self::word_start(line, pos)..];
        if word.len() < 2 {
            return None;
        }

        self.words
            .iter()
            .find(|w| w.starts_with(word) && w.len() > word.len())
            .map(|w| (&w[word.len()..]).dimmed().to_string())
    }
}

impl Highlighter for HeirHelper {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        let mut result = String::with_capacity(line.len() * 2);
        let mut current_word = String::new();

        for c in line.chars() {
            if c.is_alphanumeric() || c == '_' {
                current_word.push(c);
                continue;
            }
            if !current_word.is_empty() {
                result.push_str(&highlight_word(&current_word));
                current_word.clear();
            }
            let colored = match c {
                '(' | ')' | '[' | ']' | '{' | '}' => c.yellow().to_string(),
                '+' | '-' | '*' | '/' | '%' | '=' | '<' | '>' | '!' | '&' | '|' | '^' | '~' => {
                    c.cyan().to_string()
                }
                '"' | '\'' => c.green().to_string(),
                '#' => c.dimmed().to_string(),
                '.' if line.starts_with('.') => c.magenta().to_string(),
                _ => c.to_string(),
            };
            result.push_str(&colored);
        }

        if !current_word.is_empty() {
            result.push_str(&highlight_word(&current_word));
        }

        Cow::Owned(result)
    }

    fn highlight_char(&self, _line: &str, _pos: usize, _forced: bool) -> bool {
        true
    }
}

fn highlight_word(word: &str) -> String {
    match TokenKind::keyword(word) {
        Some(TokenKind::Bool(_) | TokenKind::None) => word.blue().to_string(),
        Some(kind) if kind.is_type_keyword() => word.cyan().to_string(),
        Some(_) => word.magenta().bold().to_string(),
        None if word.starts_with(|c: char| c.is_ascii_digit()) => word.yellow().to_string(),
        None => word.to_string(),
    }
}

impl Validator for HeirHelper {
    fn validate(&self, ctx: &mut ValidationContext<'_>) -> rustyline::Result<ValidationResult> {
        let input = ctx.input();

        if !is_balanced(input) {
            return Ok(ValidationResult::Incomplete);
        }

        // A trailing operator expects more input
        let trimmed = input.trim_end();
        if trimmed.ends_with(['\\', '+', '-', '*', '/', '=', ',', '{', '(', '[']) {
            return Ok(ValidationResult::Incomplete);
        }

        Ok(ValidationResult::Valid(None))
    }
}

/// Check if brackets, braces, and parentheses are balanced
fn is_balanced(input: &str) -> bool {
    let mut stack = Vec::new();
    let mut in_string = None;
    let mut in_comment = false;
    let mut escape_next = false;

    for c in input.chars() {
        if in_comment {
            in_comment = c != '\n';
            continue;
        }
        if escape_next {
            escape_next = false;
            continue;
        }
        if c == '\\' && in_string.is_some() {
            escape_next = true;
            continue;
        }

        match in_string {
            Some(quote) if c == quote => in_string = None,
            Some(_) => {}
            None => match c {
                '"' | '\'' => in_string = Some(c),
                '#' => in_comment = true,
                '(' => stack.push(')'),
                '[' => stack.push(']'),
                '{' => stack.push('}'),
                ')' | ']' | '}' => {
                    if stack.pop() != Some(c) {
                        // Let the parser report it
                        return true;
                    }
                }
                _ => {}
            },
        }
    }

    stack.is_empty() && in_string.is_none()
}

impl Helper for HeirHelper {}

/// Result of executing a REPL command
enum CommandResult {
    Continue,
    Exit,
}

/// The interactive REPL
pub struct Repl {
    engine: Engine,
    editor: Editor<HeirHelper, DefaultHistory>,
    history_path: Option<PathBuf>,
}

impl Repl {
    /// Create a REPL around an existing engine
    pub fn new(engine: Engine, config: &Config) -> rustyline::Result<Self> {
        let editor_config = rustyline::Config::builder()
            .history_ignore_dups(true)?
            .history_ignore_space(true)
            .max_history_size(MAX_HISTORY_SIZE)?
            .auto_add_history(true)
            .build();

        let mut editor = Editor::with_config(editor_config)?;
        editor.set_helper(Some(HeirHelper::new()));

        let history_path = config.history_path.clone();
        if let Some(path) = &history_path {
            if let Some(parent) = path.parent() {
                if let Err(err) = std::fs::create_dir_all(parent) {
                    tracing::warn!(path = %parent.display(), %err, "cannot create history directory");
                }
            }
            if let Err(err) = editor.load_history(path) {
                tracing::debug!(path = %path.display(), %err, "no history loaded");
            }
        }

        Ok(Self {
            engine,
            editor,
            history_path,
        })
    }

    /// Run the REPL main loop
    pub fn run(&mut self) -> rustyline::Result<()> {
        self.print_banner();

        loop {
            let prompt = format!("{} ", "heir>".bright_green().bold());

            match self.editor.readline(&prompt) {
                Ok(line) => {
                    let trimmed = line.trim();
                    if trimmed.is_empty() {
                        continue;
                    }

                    if let Some((cmd, arg)) = ReplCommand::parse(trimmed) {
                        match self.execute_command(cmd, arg) {
                            CommandResult::Continue => continue,
                            CommandResult::Exit => break,
                        }
                    }

                    self.eval_and_print(trimmed);
                }
                Err(ReadlineError::Interrupted) => {
                    println!("{}", "^C".dimmed());
                }
                Err(ReadlineError::Eof) => {
                    println!("{}", "^D".dimmed());
                    break;
                }
                Err(err) => return Err(err),
            }
        }

        if let Some(path) = &self.history_path {
            if let Err(err) = self.editor.save_history(path) {
                tracing::warn!(path = %path.display(), %err, "cannot save history");
            }
        }

        println!();
        Ok(())
    }

    fn print_banner(&self) {
        println!();
        println!(
            "  {} {} {}",
            "Heir".white().bold(),
            "v".dimmed(),
            env!("CARGO_PKG_VERSION").bright_yellow()
        );
        println!(
            "  {} {} {}",
            "Type".dimmed(),
            ".help".cyan(),
            "for available commands".dimmed()
        );
        println!();
    }

    fn execute_command(&mut self, cmd: ReplCommand, arg: Option<&str>) -> CommandResult {
        match cmd {
            ReplCommand::Help => self.print_help(),
            ReplCommand::Exit => return CommandResult::Exit,
            ReplCommand::Clear => print!("\x1B[2J\x1B[H"),
            ReplCommand::Version => {
                println!("{} {}", "heir".bright_cyan().bold(), env!("CARGO_PKG_VERSION").yellow());
            }
            ReplCommand::Load => match arg {
                Some(path) => self.load_file(path),
                None => missing_argument(".load", "requires a file path"),
            },
            ReplCommand::Bytecode => match arg {
                Some(code) => {
                    let bytecode = self.engine.compile(code);
                    print!("{}", bytecode.disassemble());
                    print_diagnostics(&bytecode.diagnostics().take(), code);
                }
                None => missing_argument(".bytecode", "requires code to compile"),
            },
            ReplCommand::Scope => self.print_scope(),
        }
        CommandResult::Continue
    }

    fn print_help(&self) {
        println!();
        println!("{}", "REPL Commands:".white().bold());
        println!();
        for (cmd, desc) in ReplCommand::all_commands() {
            println!("  {:18} {}", cmd.cyan(), desc.dimmed());
        }
        println!();
        println!("{}", "Keyboard Shortcuts:".white().bold());
        println!();
        println!("  {:18} {}", "Ctrl+C".yellow(), "Cancel current input".dimmed());
        println!("  {:18} {}", "Ctrl+D".yellow(), "Exit REPL".dimmed());
        println!("  {:18} {}", "Tab".yellow(), "Autocomplete".dimmed());
        println!();
    }

    fn print_scope(&self) {
        let scope = self.engine.scope();
        let names = scope.names();
        if names.is_empty() {
            println!("{}", "(empty)".dimmed());
        }
        for name in names {
            let value = scope.lookup(&name);
            println!("  {} = {}", name.white().bold(), format_value(&value));
        }
    }

    fn load_file(&mut self, path: &str) {
        match self.engine.eval_file(path) {
            Ok(result) => {
                if let Ok(source) = std::fs::read_to_string(path) {
                    print_diagnostics(&result.diagnostics, &source);
                }
                println!("{}", format_value(&result.value));
            }
            Err(err) => eprintln!("{}: {}", "Error".red().bold(), err),
        }
    }

    fn eval_and_print(&mut self, input: &str) {
        let result = self.engine.eval(input);
        print_diagnostics(&result.diagnostics, input);
        println!("{}", format_value(&result.value));
    }
}

fn missing_argument(command: &str, message: &str) {
    eprintln!("{}: {} {}", "Error".red().bold(), command.cyan(), message.dimmed());
}

/// Format a value for display with syntax coloring
fn format_value(value: &Value) -> String {
    match value {
        Value::None => "none".blue().dimmed().to_string(),
        Value::Bool(b) => b.yellow().to_string(),
        Value::Int(_) | Value::Float(_) => value.yellow().to_string(),
        Value::Char(c) => format!("{:?}", c).green().to_string(),
        Value::String(s) => format!("{:?}", s).green().to_string(),
        Value::Object(_) => value.cyan().to_string(),
        Value::Function(function) => format!("<fn {}/{}>", function.name, function.arity())
            .magenta()
            .to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repl_command_parse() {
        assert_eq!(ReplCommand::parse(".help"), Some((ReplCommand::Help, None)));
        assert_eq!(ReplCommand::parse(".exit"), Some((ReplCommand::Exit, None)));
        assert_eq!(ReplCommand::parse(".q"), Some((ReplCommand::Exit, None)));
        assert_eq!(
            ReplCommand::parse(".load test.heir"),
            Some((ReplCommand::Load, Some("test.heir")))
        );
        assert_eq!(
            ReplCommand::parse(".bytecode 1 + 2"),
            Some((ReplCommand::Bytecode, Some("1 + 2")))
        );
        assert_eq!(ReplCommand::parse("  .SCOPE  "), Some((ReplCommand::Scope, None)));
        assert!(ReplCommand::parse(".unknown").is_none());
        assert!(ReplCommand::parse("not a command").is_none());
    }

    #[test]
    fn test_is_balanced() {
        assert!(is_balanced("(1 + 2)"));
        assert!(is_balanced("{ a: 1 }"));
        assert!(is_balanced("fn f() { return 1; }"));
        assert!(!is_balanced("(1 + 2"));
        assert!(!is_balanced("{ a: 1"));
        assert!(is_balanced("\"string with (unbalanced\""));
        assert!(is_balanced("1 # comment with {"));
        assert!(!is_balanced("\"open"));
    }

    #[test]
    fn test_highlight_word() {
        assert!(highlight_word("let").contains("let"));
        assert_ne!(highlight_word("let"), "let");
        assert_eq!(highlight_word("counter"), "counter");
    }

    #[test]
    fn test_helper_words() {
        let helper = HeirHelper::new();
        assert!(helper.words.iter().any(|w| w == "return"));
        assert!(helper.words.iter().any(|w| w == ".bytecode"));
    }
}
