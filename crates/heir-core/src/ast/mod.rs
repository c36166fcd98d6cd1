//! Abstract Syntax Tree definitions for Heir.
//!
//! Every statement and expression carries a [`NodeId`], unique within one
//! parse, which the binder uses to attach resolved operators and types.

use crate::diagnostics::Span;

/// Identifies a syntax node within a single parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

/// A parsed program.
#[derive(Debug, Clone, PartialEq)]
pub struct SyntaxTree {
    /// Top-level statements
    pub statements: Vec<Statement>,
    /// Span of the whole source
    pub span: Span,
}

/// A statement node.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    /// Node identifier
    pub id: NodeId,
    /// Source location
    pub span: Span,
    /// What kind of statement this is
    pub kind: StatementKind,
}

/// Statement kinds.
#[derive(Debug, Clone, PartialEq)]
pub enum StatementKind {
    /// An expression evaluated for its value
    Expression(Expression),
    /// `let [mut] name [: type] [= value]`
    Variable(VariableDeclaration),
    /// `fn name(params): type -> body`
    Function(FunctionDeclaration),
    /// `{ ... }`
    Block(Vec<Statement>),
    /// `if cond body [else other]`
    If(IfStatement),
    /// `return [value]`
    Return(Option<Expression>),
    /// Placeholder left behind by a parse error
    NoOp,
}

/// A name together with its location.
#[derive(Debug, Clone, PartialEq)]
pub struct Identifier {
    /// The name
    pub name: String,
    /// Source location
    pub span: Span,
}

/// A type annotation.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeRef {
    /// Source location
    pub span: Span,
    /// What was written
    pub kind: TypeRefKind,
}

/// Type annotation kinds.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeRefKind {
    /// A single named type (`int`, `none`, ...)
    Named(String),
    /// `a | b`
    Union(Vec<TypeRef>),
}

/// `let` declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct VariableDeclaration {
    /// Declared name
    pub name: Identifier,
    /// Whether `mut` was given
    pub mutable: bool,
    /// Optional annotation
    pub type_ref: Option<TypeRef>,
    /// Optional initializer
    pub initializer: Option<Expression>,
}

/// `fn` declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDeclaration {
    /// Function name
    pub name: Identifier,
    /// Parameters
    pub parameters: Vec<Parameter>,
    /// Optional return annotation
    pub return_type: Option<TypeRef>,
    /// Body statements. `-> expr` bodies hold a single `return`.
    pub body: Vec<Statement>,
}

/// A function parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    /// Parameter name
    pub name: Identifier,
    /// Optional annotation
    pub type_ref: Option<TypeRef>,
}

/// `if` statement. `else if` chains nest through `else_branch`.
#[derive(Debug, Clone, PartialEq)]
pub struct IfStatement {
    /// Condition
    pub condition: Expression,
    /// Taken when the condition holds
    pub body: Box<Statement>,
    /// Taken otherwise
    pub else_branch: Option<Box<Statement>>,
}

/// An expression node.
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    /// Node identifier
    pub id: NodeId,
    /// Source location
    pub span: Span,
    /// What kind of expression this is
    pub kind: ExpressionKind,
}

/// Expression kinds.
#[derive(Debug, Clone, PartialEq)]
pub enum ExpressionKind {
    /// Literal value
    Literal(Literal),
    /// Name reference
    Identifier(String),
    /// `( expr )`
    Parenthesized(Box<Expression>),
    /// Prefix operator
    Unary {
        /// Operator
        operator: UnaryOperator,
        /// Operand
        operand: Box<Expression>,
    },
    /// Infix operator
    Binary {
        /// Left operand
        left: Box<Expression>,
        /// Operator
        operator: BinaryOperator,
        /// Right operand
        right: Box<Expression>,
    },
    /// `target = value` or `target op= value`
    Assignment {
        /// Assigned expression (must be an identifier)
        target: Box<Expression>,
        /// Operator
        operator: AssignmentOperator,
        /// Right-hand side
        value: Box<Expression>,
    },
    /// `{ key: value, ... }`
    Object(Vec<ObjectProperty>),
    /// `callee(arguments)`
    Invocation {
        /// Called expression
        callee: Box<Expression>,
        /// Arguments
        arguments: Vec<Expression>,
    },
    /// `object.member`
    Member {
        /// Accessed object
        object: Box<Expression>,
        /// Member name
        member: Identifier,
    },
    /// `object[index]`
    Element {
        /// Accessed object
        object: Box<Expression>,
        /// Index expression
        index: Box<Expression>,
    },
    /// Placeholder left behind by a parse error
    NoOp,
}

/// One `key: value` pair of an object literal.
///
/// Bare identifier keys stay identifiers here; computed keys (`[expr]`)
/// are wrapped in a parenthesized expression.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectProperty {
    /// Key
    pub key: Expression,
    /// Value
    pub value: Expression,
}

/// Literal values.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    /// `none`
    None,
    /// `true` / `false`
    Bool(bool),
    /// Integer
    Int(i64),
    /// Float
    Float(f64),
    /// Character
    Char(char),
    /// String
    String(String),
}

/// Prefix operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOperator {
    /// `-`
    Negate,
    /// `!`
    Not,
    /// `~`
    BitwiseNot,
    /// `++`
    Increment,
    /// `--`
    Decrement,
}

/// Infix operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOperator {
    /// `+`
    Add,
    /// `-`
    Subtract,
    /// `*`
    Multiply,
    /// `/`
    Divide,
    /// `//`
    IntegerDivide,
    /// `%`
    Modulo,
    /// `^`
    Power,
    /// `&`
    BitwiseAnd,
    /// `|`
    BitwiseOr,
    /// `~`
    BitwiseXor,
    /// `<<`
    ShiftLeft,
    /// `>>`
    ShiftRight,
    /// `&&`
    LogicalAnd,
    /// `||`
    LogicalOr,
    /// `==`
    Equal,
    /// `!=`
    NotEqual,
    /// `<`
    Less,
    /// `<=`
    LessEqual,
    /// `>`
    Greater,
    /// `>=`
    GreaterEqual,
}

impl BinaryOperator {
    /// The operator's source spelling.
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOperator::Add => "+",
            BinaryOperator::Subtract => "-",
            BinaryOperator::Multiply => "*",
            BinaryOperator::Divide => "/",
            BinaryOperator::IntegerDivide => "//",
            BinaryOperator::Modulo => "%",
            BinaryOperator::Power => "^",
            BinaryOperator::BitwiseAnd => "&",
            BinaryOperator::BitwiseOr => "|",
            BinaryOperator::BitwiseXor => "~",
            BinaryOperator::ShiftLeft => "<<",
            BinaryOperator::ShiftRight => ">>",
            BinaryOperator::LogicalAnd => "&&",
            BinaryOperator::LogicalOr => "||",
            BinaryOperator::Equal => "==",
            BinaryOperator::NotEqual => "!=",
            BinaryOperator::Less => "<",
            BinaryOperator::LessEqual => "<=",
            BinaryOperator::Greater => ">",
            BinaryOperator::GreaterEqual => ">=",
        }
    }
}

impl UnaryOperator {
    /// The operator's source spelling.
    pub fn symbol(&self) -> &'static str {
        match self {
            UnaryOperator::Negate => "-",
            UnaryOperator::Not => "!",
            UnaryOperator::BitwiseNot => "~",
            UnaryOperator::Increment => "++",
            UnaryOperator::Decrement => "--",
        }
    }
}

/// Assignment operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssignmentOperator {
    /// `=`
    Assign,
    /// `op=`
    Compound(BinaryOperator),
}
