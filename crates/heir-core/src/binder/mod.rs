//! Name resolution and type checking.
//!
//! The binder walks a [`SyntaxTree`] and produces a [`BoundTree`]: a lookup
//! from syntax node ids to resolved operators and invocation metadata, plus
//! the static type of every expression. Problems are reported to the shared
//! diagnostics bag; binding never stops early.

mod operators;
mod types;

pub use operators::{
    BoundBinaryOperator, BoundBinaryOperatorKind, BoundUnaryOperator, BoundUnaryOperatorKind,
};
pub use types::Type;

use crate::ast::*;
use crate::diagnostics::{DiagnosticBag, DiagnosticCode, Span};
use rustc_hash::FxHashMap;

/// The resolved counterpart of a syntax node.
#[derive(Debug, Clone, PartialEq)]
pub enum BoundNode {
    /// A binary expression or compound assignment
    Binary(BoundBinaryOperator),
    /// A unary expression
    Unary(BoundUnaryOperator),
    /// A call, with the callee's parameter names when known
    Invocation {
        /// Parameter names in declaration order
        parameter_names: Vec<String>,
    },
}

/// Syntax node id to bound node lookup.
#[derive(Debug, Clone, Default)]
pub struct BoundTree {
    nodes: FxHashMap<NodeId, BoundNode>,
    types: FxHashMap<NodeId, Type>,
}

impl BoundTree {
    /// Creates an empty lookup.
    pub fn new() -> Self {
        Self::default()
    }

    /// The bound node for `id`, if binding succeeded.
    pub fn get(&self, id: NodeId) -> Option<&BoundNode> {
        self.nodes.get(&id)
    }

    /// The static type of the expression `id`.
    pub fn type_of(&self, id: NodeId) -> Option<&Type> {
        self.types.get(&id)
    }

    /// Records a bound node.
    pub fn insert(&mut self, id: NodeId, node: BoundNode) {
        self.nodes.insert(id, node);
    }

    /// Number of bound nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns true if nothing was bound.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

#[derive(Debug, Clone)]
struct Symbol {
    ty: Type,
    mutable: bool,
    signature: Option<Signature>,
}

#[derive(Debug, Clone)]
struct Signature {
    parameters: Vec<(String, Type)>,
    return_type: Type,
}

/// Binds syntax trees.
///
/// Global declarations persist across calls to [`Binder::bind`] so that
/// successive inputs (REPL lines) see earlier declarations.
#[derive(Debug, Clone, Default)]
pub struct Binder {
    globals: FxHashMap<String, Symbol>,
}

impl Binder {
    /// Creates a binder with an empty global scope.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if `name` has been declared at the top level.
    pub fn is_global(&self, name: &str) -> bool {
        self.globals.contains_key(name)
    }

    /// Binds `tree`, reporting problems to `diagnostics`.
    pub fn bind(&mut self, tree: &SyntaxTree, diagnostics: DiagnosticBag) -> BoundTree {
        let mut walker = Walker {
            scopes: vec![std::mem::take(&mut self.globals)],
            return_types: Vec::new(),
            bound: BoundTree::new(),
            diagnostics,
        };

        for statement in &tree.statements {
            walker.statement(statement);
        }

        self.globals = walker.scopes.into_iter().next().unwrap_or_default();
        tracing::debug!(bound = walker.bound.len(), "bound program");
        walker.bound
    }
}

struct Walker {
    scopes: Vec<FxHashMap<String, Symbol>>,
    return_types: Vec<Option<Type>>,
    bound: BoundTree,
    diagnostics: DiagnosticBag,
}

impl Walker {
    fn statement(&mut self, statement: &Statement) {
        match &statement.kind {
            StatementKind::Expression(expression) => {
                self.expression(expression);
            }
            StatementKind::Variable(declaration) => self.variable_declaration(declaration),
            StatementKind::Function(function) => self.function_declaration(function),
            StatementKind::Block(statements) => {
                self.scopes.push(FxHashMap::default());
                for statement in statements {
                    self.statement(statement);
                }
                self.scopes.pop();
            }
            StatementKind::If(if_stmt) => {
                self.expression(&if_stmt.condition);
                self.statement(&if_stmt.body);
                if let Some(else_branch) = &if_stmt.else_branch {
                    self.statement(else_branch);
                }
            }
            StatementKind::Return(value) => {
                let ty = match value {
                    Some(value) => self.expression(value),
                    None => Type::None,
                };
                if let Some(Some(expected)) = self.return_types.last().cloned() {
                    self.check_assignable(&ty, &expected, statement.span);
                }
            }
            StatementKind::NoOp => {}
        }
    }

    fn variable_declaration(&mut self, declaration: &VariableDeclaration) {
        let value_type = declaration
            .initializer
            .as_ref()
            .map(|initializer| (self.expression(initializer), initializer.span));
        let annotated = declaration.type_ref.as_ref().map(|t| self.resolve_type(t));

        if let (Some((ty, span)), Some(expected)) = (&value_type, &annotated) {
            self.check_assignable(ty, expected, *span);
        }

        let ty = match (annotated, value_type) {
            (Some(annotated), _) => annotated,
            // `let x = none` leaves the variable open for later assignments
            (None, Some((Type::None, _))) | (None, None) => Type::Any,
            (None, Some((ty, _))) => ty,
        };

        self.declare(
            &declaration.name.name,
            Symbol {
                ty,
                mutable: declaration.mutable,
                signature: None,
            },
        );
    }

    fn function_declaration(&mut self, function: &FunctionDeclaration) {
        let parameters: Vec<(String, Type)> = function
            .parameters
            .iter()
            .map(|p| {
                let ty = match &p.type_ref {
                    Some(type_ref) => self.resolve_type(type_ref),
                    None => Type::Any,
                };
                (p.name.name.clone(), ty)
            })
            .collect();
        let return_type = function.return_type.as_ref().map(|t| self.resolve_type(t));

        // Declared before the body so the function can call itself
        self.declare(
            &function.name.name,
            Symbol {
                ty: Type::Function,
                mutable: false,
                signature: Some(Signature {
                    parameters: parameters.clone(),
                    return_type: return_type.clone().unwrap_or(Type::Any),
                }),
            },
        );

        let mut scope = FxHashMap::default();
        for (name, ty) in parameters {
            scope.insert(
                name,
                Symbol {
                    ty,
                    mutable: true,
                    signature: None,
                },
            );
        }

        self.scopes.push(scope);
        self.return_types.push(return_type);
        for statement in &function.body {
            self.statement(statement);
        }
        self.return_types.pop();
        self.scopes.pop();
    }

    fn expression(&mut self, expression: &Expression) -> Type {
        let ty = self.expression_type(expression);
        self.bound.types.insert(expression.id, ty.clone());
        ty
    }

    fn expression_type(&mut self, expression: &Expression) -> Type {
        match &expression.kind {
            ExpressionKind::Literal(literal) => match literal {
                Literal::None => Type::None,
                Literal::Bool(_) => Type::Bool,
                Literal::Int(_) => Type::Int,
                Literal::Float(_) => Type::Float,
                Literal::Char(_) => Type::Char,
                Literal::String(_) => Type::String,
            },
            ExpressionKind::Identifier(name) => match self.lookup(name) {
                Some(symbol) => symbol.ty.clone(),
                None => {
                    self.unresolved(name, expression.span);
                    Type::Any
                }
            },
            ExpressionKind::Parenthesized(inner) => self.expression(inner),
            ExpressionKind::Unary { operator, operand } => {
                let operand_type = self.expression(operand);
                if matches!(operator, UnaryOperator::Increment | UnaryOperator::Decrement) {
                    self.check_mutable_target(operand);
                }
                match BoundUnaryOperator::bind(*operator, &operand_type) {
                    Some(bound) => {
                        let result = bound.result.clone();
                        self.bound.insert(expression.id, BoundNode::Unary(bound));
                        result
                    }
                    None => {
                        self.diagnostics.error(
                            DiagnosticCode::NoMatchingOperator,
                            format!(
                                "Operator '{}' cannot be applied to type '{}'",
                                operator.symbol(),
                                operand_type
                            ),
                            expression.span,
                        );
                        Type::Any
                    }
                }
            }
            ExpressionKind::Binary {
                left,
                operator,
                right,
            } => {
                let left_type = self.expression(left);
                let right_type = self.expression(right);
                self.bind_binary(expression, *operator, &left_type, &right_type)
                    .unwrap_or(Type::Any)
            }
            ExpressionKind::Assignment {
                target,
                operator,
                value,
            } => self.assignment(expression, target, *operator, value),
            ExpressionKind::Object(properties) => {
                for property in properties {
                    if !matches!(property.key.kind, ExpressionKind::Identifier(_)) {
                        self.expression(&property.key);
                    }
                    self.expression(&property.value);
                }
                Type::Object
            }
            ExpressionKind::Invocation { callee, arguments } => {
                self.invocation(expression, callee, arguments)
            }
            ExpressionKind::Member { object, .. } => {
                let object_type = self.expression(object);
                self.check_indexable(&object_type, object.span);
                Type::Any
            }
            ExpressionKind::Element { object, index } => {
                let object_type = self.expression(object);
                self.expression(index);
                self.check_indexable(&object_type, object.span);
                Type::Any
            }
            ExpressionKind::NoOp => Type::Any,
        }
    }

    fn bind_binary(
        &mut self,
        node: &Expression,
        operator: BinaryOperator,
        left: &Type,
        right: &Type,
    ) -> Option<Type> {
        match BoundBinaryOperator::bind(operator, left, right) {
            Some(bound) => {
                let result = bound.result.clone();
                self.bound.insert(node.id, BoundNode::Binary(bound));
                Some(result)
            }
            None => {
                self.diagnostics.error(
                    DiagnosticCode::NoMatchingOperator,
                    format!(
                        "Operator '{}' cannot be applied to types '{}' and '{}'",
                        operator.symbol(),
                        left,
                        right
                    ),
                    node.span,
                );
                None
            }
        }
    }

    fn assignment(
        &mut self,
        node: &Expression,
        target: &Expression,
        operator: AssignmentOperator,
        value: &Expression,
    ) -> Type {
        let value_type = self.expression(value);

        let ExpressionKind::Identifier(name) = &target.kind else {
            self.diagnostics.error(
                DiagnosticCode::InvalidAssignment,
                "Invalid assignment target",
                target.span,
            );
            self.expression(target);
            return value_type;
        };

        let Some(symbol) = self.lookup(name).cloned() else {
            self.unresolved(name, target.span);
            return value_type;
        };
        self.bound.types.insert(target.id, symbol.ty.clone());

        if !symbol.mutable {
            self.immutable(name, target.span);
        }

        let result = match operator {
            AssignmentOperator::Assign => value_type,
            AssignmentOperator::Compound(op) => {
                match self.bind_binary(node, op, &symbol.ty, &value_type) {
                    Some(result) => result,
                    None => return symbol.ty,
                }
            }
        };

        self.check_assignable(&result, &symbol.ty, value.span);
        result
    }

    fn invocation(&mut self, node: &Expression, callee: &Expression, arguments: &[Expression]) -> Type {
        let callee_type = self.expression(callee);
        let argument_types: Vec<(Type, Span)> = arguments
            .iter()
            .map(|argument| (self.expression(argument), argument.span))
            .collect();

        let signature = match &callee.kind {
            ExpressionKind::Identifier(name) => self.lookup(name).and_then(|s| s.signature.clone()),
            _ => None,
        };

        let Some(signature) = signature else {
            if !matches!(callee_type, Type::Function | Type::Any) {
                self.diagnostics.error(
                    DiagnosticCode::NotCallable,
                    format!("Value of type '{}' is not callable", callee_type),
                    callee.span,
                );
            }
            self.bound.insert(
                node.id,
                BoundNode::Invocation {
                    parameter_names: Vec::new(),
                },
            );
            return Type::Any;
        };

        if signature.parameters.len() != arguments.len() {
            self.diagnostics.error(
                DiagnosticCode::ArgumentCount,
                format!(
                    "Expected {} arguments, but got {}",
                    signature.parameters.len(),
                    arguments.len()
                ),
                node.span,
            );
        }

        for ((_, expected), (actual, span)) in signature.parameters.iter().zip(&argument_types) {
            self.check_assignable(actual, expected, *span);
        }

        self.bound.insert(
            node.id,
            BoundNode::Invocation {
                parameter_names: signature.parameters.iter().map(|(n, _)| n.clone()).collect(),
            },
        );
        signature.return_type
    }

    fn check_mutable_target(&mut self, target: &Expression) {
        match &target.kind {
            ExpressionKind::Identifier(name) => {
                if self.lookup(name).is_some_and(|s| !s.mutable) {
                    self.immutable(name, target.span);
                }
            }
            _ => self.diagnostics.error(
                DiagnosticCode::InvalidAssignment,
                "The operand of an increment or decrement must be a variable",
                target.span,
            ),
        }
    }

    fn check_indexable(&mut self, ty: &Type, span: Span) {
        if !Type::Object.is_assignable_to(ty) {
            self.diagnostics.error(
                DiagnosticCode::NotIndexable,
                format!("Value of type '{}' cannot be indexed", ty),
                span,
            );
        }
    }

    fn check_assignable(&mut self, actual: &Type, expected: &Type, span: Span) {
        if !actual.is_assignable_to(expected) {
            self.diagnostics.error(
                DiagnosticCode::TypeMismatch,
                format!("Type '{}' is not assignable to type '{}'", actual, expected),
                span,
            );
        }
    }

    fn resolve_type(&mut self, type_ref: &TypeRef) -> Type {
        let (ty, unknown) = Type::from_ref(type_ref);
        for name in unknown {
            self.diagnostics.error(
                DiagnosticCode::UnresolvedName,
                format!("Cannot find type '{}'", name),
                type_ref.span,
            );
        }
        ty
    }

    fn declare(&mut self, name: &str, symbol: Symbol) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string(), symbol);
        }
    }

    fn lookup(&self, name: &str) -> Option<&Symbol> {
        self.scopes.iter().rev().find_map(|scope| scope.get(name))
    }

    fn unresolved(&mut self, name: &str, span: Span) {
        self.diagnostics.error(
            DiagnosticCode::UnresolvedName,
            format!("Cannot find name '{}'", name),
            span,
        );
    }

    fn immutable(&mut self, name: &str, span: Span) {
        self.diagnostics.error(
            DiagnosticCode::InvalidAssignment,
            format!("Cannot assign to '{}' because it is not mutable", name),
            span,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;

    fn bind(src: &str) -> (SyntaxTree, BoundTree, DiagnosticBag) {
        let diagnostics = DiagnosticBag::new();
        let tree = Parser::new(src, diagnostics.clone()).parse();
        let bound = Binder::new().bind(&tree, diagnostics.clone());
        (tree, bound, diagnostics)
    }

    fn bind_ok(src: &str) -> (SyntaxTree, BoundTree) {
        let (tree, bound, diagnostics) = bind(src);
        assert!(diagnostics.is_empty(), "unexpected diagnostics: {:?}", diagnostics.snapshot());
        (tree, bound)
    }

    fn bind_err(src: &str, code: DiagnosticCode) {
        let (_, _, diagnostics) = bind(src);
        assert!(
            diagnostics.contains(code),
            "expected {} in {:?}",
            code,
            diagnostics.snapshot()
        );
    }

    fn last_expression(tree: &SyntaxTree) -> &Expression {
        match tree.statements.last().map(|s| &s.kind) {
            Some(StatementKind::Expression(expression)) => expression,
            other => panic!("expected expression statement, got {:?}", other),
        }
    }

    #[test]
    fn test_binary_operator_is_bound() {
        let (tree, bound) = bind_ok("1 + 2");
        let expression = last_expression(&tree);
        assert!(matches!(
            bound.get(expression.id),
            Some(BoundNode::Binary(op)) if op.kind == BoundBinaryOperatorKind::Addition
        ));
        assert_eq!(bound.type_of(expression.id), Some(&Type::number()));
    }

    #[test]
    fn test_concatenation_is_bound() {
        let (tree, bound) = bind_ok("'a' + 'b'");
        let expression = last_expression(&tree);
        assert!(matches!(
            bound.get(expression.id),
            Some(BoundNode::Binary(op)) if op.kind == BoundBinaryOperatorKind::Concatenation
        ));
    }

    #[test]
    fn test_compound_assignment_is_bound_on_assignment_node() {
        let (tree, bound) = bind_ok("let mut a = 1; a //= 2");
        let expression = last_expression(&tree);
        assert!(matches!(
            bound.get(expression.id),
            Some(BoundNode::Binary(op)) if op.kind == BoundBinaryOperatorKind::IntegerDivision
        ));
    }

    #[test]
    fn test_invocation_records_parameter_names() {
        let (tree, bound) = bind_ok("fn abc(x: int): int -> 123 + x; abc(69)");
        let expression = last_expression(&tree);
        assert_eq!(
            bound.get(expression.id),
            Some(&BoundNode::Invocation {
                parameter_names: vec!["x".to_string()]
            })
        );
        assert_eq!(bound.type_of(expression.id), Some(&Type::Int));
    }

    #[test]
    fn test_recursive_function_binds() {
        bind_ok("fn f(n) { if n < 1 return 0; return f(n - 1) }");
    }

    #[test]
    fn test_errors() {
        bind_err("\"a\" + 1", DiagnosticCode::NoMatchingOperator);
        bind_err("let a = 1; a = 2", DiagnosticCode::InvalidAssignment);
        bind_err("let a = 1; ++a", DiagnosticCode::InvalidAssignment);
        bind_err("1 = 2", DiagnosticCode::InvalidAssignment);
        bind_err("let a: int = \"x\"", DiagnosticCode::TypeMismatch);
        bind_err("let a: widget = 1", DiagnosticCode::UnresolvedName);
        bind_err("missing + 1", DiagnosticCode::UnresolvedName);
        bind_err("fn f(a, b) -> a; f(1)", DiagnosticCode::ArgumentCount);
        bind_err("fn f(a: int) -> a; f(\"x\")", DiagnosticCode::TypeMismatch);
        bind_err("fn f(): int -> \"x\"", DiagnosticCode::TypeMismatch);
        bind_err("let a = 1; a()", DiagnosticCode::NotCallable);
        bind_err("let a = 1; a.b", DiagnosticCode::NotIndexable);
    }

    #[test]
    fn test_block_scoped_names_are_not_visible_outside() {
        bind_err("{ let inner = 1 } inner", DiagnosticCode::UnresolvedName);
    }

    #[test]
    fn test_globals_persist_across_binds() {
        let diagnostics = DiagnosticBag::new();
        let mut binder = Binder::new();

        let first = Parser::new("let mut total = 1", diagnostics.clone()).parse();
        binder.bind(&first, diagnostics.clone());
        let second = Parser::new("total += 1", diagnostics.clone()).parse();
        binder.bind(&second, diagnostics.clone());

        assert!(binder.is_global("total"));
        assert!(diagnostics.is_empty(), "{:?}", diagnostics.snapshot());
    }

    #[test]
    fn test_none_initializer_is_open() {
        bind_ok("let mut a = none; a = 5");
    }
}
