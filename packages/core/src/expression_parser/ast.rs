/**
 * Binding Expression AST
 *
 * Restricted node set: literals, variable roots, member/keyed access, calls,
 * operators, literal arrays/maps, filter pipes and text interpolations.
 */
use serde::{Deserialize, Serialize};

/// Source span (offsets into the expression text)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseSpan {
    pub start: usize,
    pub end: usize,
}

impl ParseSpan {
    pub fn new(start: usize, end: usize) -> Self {
        ParseSpan { start, end }
    }
}

/// Visitor pattern for AST traversal
pub trait AstVisitor {
    type Result;

    fn visit_literal_primitive(&mut self, ast: &LiteralPrimitive) -> Self::Result;
    fn visit_variable_read(&mut self, ast: &VariableRead) -> Self::Result;
    fn visit_property_read(&mut self, ast: &PropertyRead) -> Self::Result;
    fn visit_keyed_read(&mut self, ast: &KeyedRead) -> Self::Result;
    fn visit_call(&mut self, ast: &Call) -> Self::Result;
    fn visit_prefix_not(&mut self, ast: &PrefixNot) -> Self::Result;
    fn visit_unary(&mut self, ast: &Unary) -> Self::Result;
    fn visit_binary(&mut self, ast: &Binary) -> Self::Result;
    fn visit_conditional(&mut self, ast: &Conditional) -> Self::Result;
    fn visit_literal_array(&mut self, ast: &LiteralArray) -> Self::Result;
    fn visit_literal_map(&mut self, ast: &LiteralMap) -> Self::Result;
    fn visit_pipe(&mut self, ast: &BindingPipe) -> Self::Result;
    fn visit_parenthesized(&mut self, ast: &ParenthesizedExpression) -> Self::Result;
    fn visit_interpolation(&mut self, ast: &Interpolation) -> Self::Result;
}

/// Main AST enum containing all node types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum Ast {
    LiteralPrimitive(LiteralPrimitive),
    VariableRead(VariableRead),
    PropertyRead(PropertyRead),
    KeyedRead(KeyedRead),
    Call(Call),
    PrefixNot(PrefixNot),
    Unary(Unary),
    Binary(Binary),
    Conditional(Conditional),
    LiteralArray(LiteralArray),
    LiteralMap(LiteralMap),
    BindingPipe(BindingPipe),
    ParenthesizedExpression(ParenthesizedExpression),
    Interpolation(Interpolation),
}

impl Ast {
    pub fn visit<V: AstVisitor>(&self, visitor: &mut V) -> V::Result {
        match self {
            Ast::LiteralPrimitive(a) => visitor.visit_literal_primitive(a),
            Ast::VariableRead(a) => visitor.visit_variable_read(a),
            Ast::PropertyRead(a) => visitor.visit_property_read(a),
            Ast::KeyedRead(a) => visitor.visit_keyed_read(a),
            Ast::Call(a) => visitor.visit_call(a),
            Ast::PrefixNot(a) => visitor.visit_prefix_not(a),
            Ast::Unary(a) => visitor.visit_unary(a),
            Ast::Binary(a) => visitor.visit_binary(a),
            Ast::Conditional(a) => visitor.visit_conditional(a),
            Ast::LiteralArray(a) => visitor.visit_literal_array(a),
            Ast::LiteralMap(a) => visitor.visit_literal_map(a),
            Ast::BindingPipe(a) => visitor.visit_pipe(a),
            Ast::ParenthesizedExpression(a) => visitor.visit_parenthesized(a),
            Ast::Interpolation(a) => visitor.visit_interpolation(a),
        }
    }

    pub fn span(&self) -> ParseSpan {
        match self {
            Ast::LiteralPrimitive(a) => a.span,
            Ast::VariableRead(a) => a.span,
            Ast::PropertyRead(a) => a.span,
            Ast::KeyedRead(a) => a.span,
            Ast::Call(a) => a.span,
            Ast::PrefixNot(a) => a.span,
            Ast::Unary(a) => a.span,
            Ast::Binary(a) => a.span,
            Ast::Conditional(a) => a.span,
            Ast::LiteralArray(a) => a.span,
            Ast::LiteralMap(a) => a.span,
            Ast::BindingPipe(a) => a.span,
            Ast::ParenthesizedExpression(a) => a.span,
            Ast::Interpolation(a) => a.span,
        }
    }

    /// Strip redundant parentheses around the node
    pub fn unwrap_parens(&self) -> &Ast {
        match self {
            Ast::ParenthesizedExpression(p) => p.expression.unwrap_parens(),
            other => other,
        }
    }
}

/// Literal primitive value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LiteralValue {
    Null,
    Undefined,
    Boolean(bool),
    Number(f64),
    String(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiteralPrimitive {
    pub span: ParseSpan,
    pub value: LiteralValue,
}

/// Free variable root (e.g. `user` in `user.name`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableRead {
    pub span: ParseSpan,
    pub name: String,
}

/// Property read (e.g. `obj.property`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyRead {
    pub span: ParseSpan,
    pub receiver: Box<Ast>,
    pub name: String,
}

/// Keyed read (e.g. `obj[key]`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyedRead {
    pub span: ParseSpan,
    pub receiver: Box<Ast>,
    pub key: Box<Ast>,
}

/// Function call (e.g. `fn(a, b)`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Call {
    pub span: ParseSpan,
    pub receiver: Box<Ast>,
    pub args: Vec<Ast>,
}

/// Logical not (e.g. `!flag`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrefixNot {
    pub span: ParseSpan,
    pub expression: Box<Ast>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOperator {
    Minus,
    Plus,
}

impl UnaryOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnaryOperator::Minus => "-",
            UnaryOperator::Plus => "+",
        }
    }
}

/// Unary sign (e.g. `-value`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Unary {
    pub span: ParseSpan,
    pub operator: UnaryOperator,
    pub expr: Box<Ast>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOperator {
    Or,
    And,
    Equal,
    NotEqual,
    StrictEqual,
    StrictNotEqual,
    Less,
    Greater,
    LessEqual,
    GreaterEqual,
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
}

impl BinaryOperator {
    pub fn from_str(op: &str) -> Option<Self> {
        let op = match op {
            "||" => BinaryOperator::Or,
            "&&" => BinaryOperator::And,
            "==" => BinaryOperator::Equal,
            "!=" => BinaryOperator::NotEqual,
            "===" => BinaryOperator::StrictEqual,
            "!==" => BinaryOperator::StrictNotEqual,
            "<" => BinaryOperator::Less,
            ">" => BinaryOperator::Greater,
            "<=" => BinaryOperator::LessEqual,
            ">=" => BinaryOperator::GreaterEqual,
            "+" => BinaryOperator::Add,
            "-" => BinaryOperator::Subtract,
            "*" => BinaryOperator::Multiply,
            "/" => BinaryOperator::Divide,
            "%" => BinaryOperator::Modulo,
            _ => return None,
        };
        Some(op)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BinaryOperator::Or => "||",
            BinaryOperator::And => "&&",
            BinaryOperator::Equal => "==",
            BinaryOperator::NotEqual => "!=",
            BinaryOperator::StrictEqual => "===",
            BinaryOperator::StrictNotEqual => "!==",
            BinaryOperator::Less => "<",
            BinaryOperator::Greater => ">",
            BinaryOperator::LessEqual => "<=",
            BinaryOperator::GreaterEqual => ">=",
            BinaryOperator::Add => "+",
            BinaryOperator::Subtract => "-",
            BinaryOperator::Multiply => "*",
            BinaryOperator::Divide => "/",
            BinaryOperator::Modulo => "%",
        }
    }
}

/// Binary operation (e.g. `a + b`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Binary {
    pub span: ParseSpan,
    pub operation: BinaryOperator,
    pub left: Box<Ast>,
    pub right: Box<Ast>,
}

/// Ternary conditional (e.g. `condition ? a : b`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conditional {
    pub span: ParseSpan,
    pub condition: Box<Ast>,
    pub true_exp: Box<Ast>,
    pub false_exp: Box<Ast>,
}

/// Literal array (e.g. `[1, 2, 3]`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiteralArray {
    pub span: ParseSpan,
    pub expressions: Vec<Ast>,
}

/// Literal map key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiteralMapKey {
    pub key: String,
    pub quoted: bool,
}

/// Literal map (e.g. `{a: 1, 'b c': 2}`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiteralMap {
    pub span: ParseSpan,
    pub keys: Vec<LiteralMapKey>,
    pub values: Vec<Ast>,
}

/// Filter pipe (e.g. `value | name : arg1 : arg2`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BindingPipe {
    pub span: ParseSpan,
    pub name_span: ParseSpan,
    pub exp: Box<Ast>,
    pub name: String,
    pub args: Vec<Ast>,
}

/// Parenthesized expression (kept so the normalized form reproduces grouping)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParenthesizedExpression {
    pub span: ParseSpan,
    pub expression: Box<Ast>,
}

/// Text with embedded `{{ }}` expressions; `strings.len() == expressions.len() + 1`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interpolation {
    pub span: ParseSpan,
    pub strings: Vec<String>,
    pub expressions: Vec<Ast>,
}

impl Ast {
    /// Direct sub-expressions in source order
    pub fn children(&self) -> Vec<&Ast> {
        match self {
            Ast::LiteralPrimitive(_) | Ast::VariableRead(_) => Vec::new(),
            Ast::PropertyRead(p) => vec![&*p.receiver],
            Ast::KeyedRead(k) => vec![&*k.receiver, &*k.key],
            Ast::Call(c) => std::iter::once(&*c.receiver).chain(c.args.iter()).collect(),
            Ast::PrefixNot(p) => vec![&*p.expression],
            Ast::Unary(u) => vec![&*u.expr],
            Ast::Binary(b) => vec![&*b.left, &*b.right],
            Ast::Conditional(c) => vec![&*c.condition, &*c.true_exp, &*c.false_exp],
            Ast::LiteralArray(a) => a.expressions.iter().collect(),
            Ast::LiteralMap(m) => m.values.iter().collect(),
            Ast::BindingPipe(p) => std::iter::once(&*p.exp).chain(p.args.iter()).collect(),
            Ast::ParenthesizedExpression(p) => vec![&*p.expression],
            Ast::Interpolation(i) => i.expressions.iter().collect(),
        }
    }
}

/// Walks every node once in source order, depth first.
pub fn walk_ast<F: FnMut(&Ast)>(ast: &Ast, callback: &mut F) {
    callback(ast);
    for child in ast.children() {
        walk_ast(child, callback);
    }
}

/// Like [`walk_ast`], but a node is visited after all of its sub-expressions.
pub fn walk_ast_post_order<F: FnMut(&Ast)>(ast: &Ast, callback: &mut F) {
    for child in ast.children() {
        walk_ast_post_order(child, callback);
    }
    callback(ast);
}
