//! The main parser implementation.

use crate::ast::*;
use crate::diagnostics::{DiagnosticBag, DiagnosticCode, Span};
use crate::lexer::{Token, TokenKind, tokenize};

/// A recursive descent parser for Heir.
pub struct Parser {
    tokens: Vec<Token>,
    position: usize,
    next_id: u32,
    end: usize,
    pub(super) diagnostics: DiagnosticBag,
}

impl Parser {
    /// Creates a new parser for the given source code.
    ///
    /// The source is tokenized eagerly; lexical errors land in `diagnostics`.
    pub fn new(source: &str, diagnostics: DiagnosticBag) -> Self {
        let mut tokens = tokenize(source, diagnostics.clone());
        // Already reported by the scanner
        tokens.retain(|t| t.kind != TokenKind::Invalid);

        Self {
            tokens,
            position: 0,
            next_id: 0,
            end: source.len(),
            diagnostics,
        }
    }

    /// Parses the whole source into a syntax tree.
    pub fn parse(&mut self) -> SyntaxTree {
        let mut statements = Vec::new();

        loop {
            while self.eat(&TokenKind::Semicolon) {}
            if self.is_at_end() {
                break;
            }
            let before = self.position;
            statements.push(self.parse_statement());
            if self.position == before {
                self.advance();
            }
        }

        tracing::debug!(statements = statements.len(), nodes = self.next_id, "parsed program");

        SyntaxTree {
            statements,
            span: Span::new(0, self.end),
        }
    }

    /// Parses a single statement.
    pub fn parse_statement(&mut self) -> Statement {
        let statement = match &self.current().kind {
            TokenKind::Let => self.parse_variable_declaration(),
            TokenKind::Fn => self.parse_function_declaration(),
            TokenKind::If => return self.parse_if_statement(),
            TokenKind::Return => self.parse_return_statement(),
            TokenKind::LeftBrace if !self.looks_like_object() => return self.parse_block_statement(),
            _ => self.parse_expression_statement(),
        };
        self.eat(&TokenKind::Semicolon);
        statement
    }

    fn parse_variable_declaration(&mut self) -> Statement {
        let start = self.advance().span; // consume 'let'
        let mutable = self.eat(&TokenKind::Mut);
        let name = self.expect_identifier();

        let type_ref = if self.eat(&TokenKind::Colon) {
            Some(self.parse_type())
        } else {
            None
        };

        let initializer = if self.eat(&TokenKind::Equal) {
            Some(self.parse_expression())
        } else {
            None
        };

        self.statement(
            start,
            StatementKind::Variable(VariableDeclaration {
                name,
                mutable,
                type_ref,
                initializer,
            }),
        )
    }

    fn parse_function_declaration(&mut self) -> Statement {
        let start = self.advance().span; // consume 'fn'
        let name = self.expect_identifier();

        let parameters = if self.eat(&TokenKind::LeftParen) {
            self.parse_parameters()
        } else {
            Vec::new()
        };

        let return_type = if self.eat(&TokenKind::Colon) {
            Some(self.parse_type())
        } else {
            None
        };

        let body = if self.check(&TokenKind::Arrow) {
            let arrow = self.advance().span;
            let value = self.parse_expression();
            vec![self.statement(arrow, StatementKind::Return(Some(value)))]
        } else if self.check(&TokenKind::LeftBrace) {
            self.parse_block_body()
        } else {
            self.error_expected("'->' or '{'");
            Vec::new()
        };

        self.statement(
            start,
            StatementKind::Function(FunctionDeclaration {
                name,
                parameters,
                return_type,
                body,
            }),
        )
    }

    fn parse_parameters(&mut self) -> Vec<Parameter> {
        let mut parameters = Vec::new();

        while !self.check(&TokenKind::RightParen) && !self.is_at_end() {
            let before = self.position;
            let name = self.expect_identifier();
            let type_ref = if self.eat(&TokenKind::Colon) {
                Some(self.parse_type())
            } else {
                None
            };
            parameters.push(Parameter { name, type_ref });

            if !self.eat(&TokenKind::Comma) {
                if self.position == before {
                    self.advance();
                }
                break;
            }
        }

        self.expect(&TokenKind::RightParen);
        parameters
    }

    /// Parses `a`, `a | b | ...`.
    pub(super) fn parse_type(&mut self) -> TypeRef {
        let first = self.parse_single_type();
        if !self.check(&TokenKind::Pipe) {
            return first;
        }

        let mut members = vec![first];
        while self.eat(&TokenKind::Pipe) {
            members.push(self.parse_single_type());
        }
        let span = members[0].span.merge(members[members.len() - 1].span);
        TypeRef {
            span,
            kind: TypeRefKind::Union(members),
        }
    }

    fn parse_single_type(&mut self) -> TypeRef {
        let token = self.current().clone();
        let name = match &token.kind {
            kind if kind.is_type_keyword() => kind.to_string(),
            TokenKind::Identifier(name) => name.clone(),
            _ => {
                self.error_expected("a type");
                return TypeRef {
                    span: token.span,
                    kind: TypeRefKind::Named("any".into()),
                };
            }
        };
        self.advance();
        TypeRef {
            span: token.span,
            kind: TypeRefKind::Named(name),
        }
    }

    fn parse_if_statement(&mut self) -> Statement {
        let start = self.advance().span; // consume 'if'
        let condition = self.parse_expression();
        let body = Box::new(self.parse_statement());

        let else_branch = if self.eat(&TokenKind::Else) {
            Some(Box::new(self.parse_statement()))
        } else {
            None
        };

        self.statement(
            start,
            StatementKind::If(IfStatement {
                condition,
                body,
                else_branch,
            }),
        )
    }

    fn parse_return_statement(&mut self) -> Statement {
        let start = self.advance().span; // consume 'return'

        let value = if self.check(&TokenKind::Semicolon)
            || self.check(&TokenKind::RightBrace)
            || self.is_at_end()
        {
            None
        } else {
            Some(self.parse_expression())
        };

        self.statement(start, StatementKind::Return(value))
    }

    fn parse_block_statement(&mut self) -> Statement {
        let start = self.current().span;
        let body = self.parse_block_body();
        self.statement(start, StatementKind::Block(body))
    }

    fn parse_block_body(&mut self) -> Vec<Statement> {
        self.expect(&TokenKind::LeftBrace);
        let mut statements = Vec::new();

        loop {
            while self.eat(&TokenKind::Semicolon) {}
            if self.check(&TokenKind::RightBrace) || self.is_at_end() {
                break;
            }
            let before = self.position;
            statements.push(self.parse_statement());
            if self.position == before {
                self.advance();
            }
        }

        self.expect(&TokenKind::RightBrace);
        statements
    }

    fn parse_expression_statement(&mut self) -> Statement {
        let expression = self.parse_expression();
        let span = expression.span;
        Statement {
            id: self.node_id(),
            span,
            kind: StatementKind::Expression(expression),
        }
    }

    /// `{ key: ...` or `{ [` at statement position starts an object literal.
    fn looks_like_object(&self) -> bool {
        match self.peek_kind(1) {
            TokenKind::LeftBracket => true,
            TokenKind::Identifier(_)
            | TokenKind::String(_)
            | TokenKind::Int(_)
            | TokenKind::Char(_)
            | TokenKind::Bool(_)
            | TokenKind::None => matches!(self.peek_kind(2), TokenKind::Colon),
            _ => false,
        }
    }

    // Helper methods

    pub(super) fn node_id(&mut self) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        id
    }

    fn statement(&mut self, start: Span, kind: StatementKind) -> Statement {
        Statement {
            id: self.node_id(),
            span: start.merge(self.previous_span()),
            kind,
        }
    }

    pub(super) fn current(&self) -> &Token {
        // `tokenize` always ends with Eof and we never advance past it
        &self.tokens[self.position.min(self.tokens.len() - 1)]
    }

    pub(super) fn peek_kind(&self, offset: usize) -> &TokenKind {
        let index = (self.position + offset).min(self.tokens.len() - 1);
        &self.tokens[index].kind
    }

    pub(super) fn previous_span(&self) -> Span {
        match self.position.checked_sub(1) {
            Some(index) => self.tokens[index].span,
            None => self.current().span,
        }
    }

    pub(super) fn advance(&mut self) -> Token {
        let token = self.current().clone();
        if !self.is_at_end() {
            self.position += 1;
        }
        token
    }

    pub(super) fn check(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(&self.current().kind) == std::mem::discriminant(kind)
    }

    pub(super) fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    pub(super) fn expect(&mut self, kind: &TokenKind) {
        if !self.eat(kind) {
            self.error_expected(&format!("'{}'", kind));
        }
    }

    pub(super) fn expect_identifier(&mut self) -> Identifier {
        let token = self.current().clone();
        if let TokenKind::Identifier(name) = token.kind {
            self.advance();
            Identifier {
                name,
                span: token.span,
            }
        } else {
            self.error_expected("an identifier");
            Identifier {
                name: String::new(),
                span: token.span,
            }
        }
    }

    pub(super) fn error_expected(&self, what: &str) {
        let token = self.current();
        self.diagnostics.error(
            DiagnosticCode::ExpectedToken,
            format!("Expected {}, found '{}'", what, token.kind),
            token.span,
        );
    }

    pub(super) fn is_at_end(&self) -> bool {
        matches!(self.current().kind, TokenKind::Eof)
    }
}
