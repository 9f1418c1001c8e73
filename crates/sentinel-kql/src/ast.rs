//! Syntax tree for the supported Kusto query subset.
//!
//! The tree is intentionally loose: operators whose arguments we never need to
//! reason about are kept as [`Operator::Opaque`] with their raw text, so
//! the parser accepts a much larger language than the analyzer understands.

use std::fmt;

use serde::Serialize;

use crate::schema::ScalarType;

/// Byte range in the original query text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A name as written in the query, with the location it was written at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Ident {
    pub name: String,
    pub span: Span,
}

impl fmt::Display for Ident {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

// =============================================================================
// Statements
// =============================================================================

/// A complete query: zero or more `let`/`set` statements and usually one
/// trailing tabular expression.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Query {
    pub statements: Vec<Statement>,
}

impl Query {
    /// The last tabular statement, which produces the query result.
    pub fn result(&self) -> Option<&Pipeline> {
        self.statements.iter().rev().find_map(|s| match s {
            Statement::Pipeline(p) => Some(p),
            _ => None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Statement {
    Let { name: Ident, value: LetValue },
    /// `set`, `declare` or `alias` statement, kept verbatim.
    Directive(String),
    Pipeline(Pipeline),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum LetValue {
    Scalar(Expr),
    Tabular(Pipeline),
    Function(Lambda),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Lambda {
    pub params: Vec<LambdaParam>,
    pub body: Vec<Statement>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LambdaParam {
    pub name: Ident,
    /// `None` for tabular parameters such as `T:(*)`.
    pub ty: Option<String>,
    pub default: Option<Expr>,
}

// =============================================================================
// Tabular expressions
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Pipeline {
    pub source: Source,
    pub operators: Vec<Operator>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Source {
    Table(Ident),
    Call(Call),
    Nested(Box<Pipeline>),
    Datatable {
        columns: Vec<ColumnDecl>,
        values: Vec<Expr>,
    },
    Print(Vec<NamedExpr>),
    Range {
        column: Ident,
        from: Expr,
        to: Expr,
        step: Expr,
    },
    Union {
        params: Vec<Param>,
        tables: Vec<UnionTable>,
    },
    /// `search`, `find`, `externaldata` and friends.
    Opaque { keyword: String, text: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnDecl {
    pub name: Ident,
    pub ty: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum UnionTable {
    /// A table name, possibly with `*` wildcards.
    Pattern(String),
    Nested(Pipeline),
}

/// `kind=inner`, `hint.strategy=shuffle`, ...
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Param {
    pub name: String,
    pub value: String,
}

pub fn param<'a>(params: &'a [Param], name: &str) -> Option<&'a str> {
    params
        .iter()
        .find(|p| p.name.eq_ignore_ascii_case(name))
        .map(|p| p.value.as_str())
}

/// An optionally named expression (`Name = expr` or just `expr`).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NamedExpr {
    pub name: Option<Ident>,
    pub expr: Expr,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SortKey {
    pub expr: Expr,
    pub descending: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rename {
    pub new: Ident,
    pub old: Ident,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExpandItem {
    pub item: NamedExpr,
    pub to_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ParseItem {
    Literal(String),
    Wildcard,
    Column { name: Ident, ty: Option<String> },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Operator {
    Where(Expr),
    Project(Vec<NamedExpr>),
    ProjectAway(Vec<String>),
    ProjectKeep(Vec<String>),
    ProjectRename(Vec<Rename>),
    ProjectReorder(Vec<String>),
    Extend(Vec<NamedExpr>),
    Summarize {
        params: Vec<Param>,
        aggregates: Vec<NamedExpr>,
        by: Vec<NamedExpr>,
    },
    Count {
        alias: Option<Ident>,
    },
    /// `distinct *` is represented by `None`.
    Distinct(Option<Vec<NamedExpr>>),
    Take(Expr),
    Top {
        count: Expr,
        by: SortKey,
    },
    Sort(Vec<SortKey>),
    Join {
        params: Vec<Param>,
        right: Pipeline,
        on: Vec<Expr>,
    },
    Lookup {
        params: Vec<Param>,
        right: Pipeline,
        on: Vec<Expr>,
    },
    Union {
        params: Vec<Param>,
        tables: Vec<UnionTable>,
    },
    MvExpand(Vec<ExpandItem>),
    Parse {
        filter: bool,
        params: Vec<Param>,
        input: Expr,
        items: Vec<ParseItem>,
    },
    GetSchema,
    As(Ident),
    Opaque {
        keyword: String,
        text: String,
    },
}

// =============================================================================
// Scalar expressions
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Literal {
    String(String),
    Long(i64),
    Real(f64),
    Bool(bool),
    Timespan(String),
    /// `datetime(...)`, `dynamic(...)`, `guid(...)` etc. with the raw body.
    Typed { ty: ScalarType, raw: String },
}

impl Literal {
    pub fn scalar_type(&self) -> ScalarType {
        match self {
            Literal::String(_) => ScalarType::String,
            Literal::Long(_) => ScalarType::Long,
            Literal::Real(_) => ScalarType::Real,
            Literal::Bool(_) => ScalarType::Bool,
            Literal::Timespan(_) => ScalarType::TimeSpan,
            Literal::Typed { ty, .. } => *ty,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum UnaryOp {
    Neg,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum BinaryOp {
    Or,
    And,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    /// `=~` / `!~`
    EqIgnoreCase,
    NotEqIgnoreCase,
    /// `has`, `!contains_cs`, `matches regex`, ...
    Text(String),
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

impl BinaryOp {
    pub fn from_token(token: &str) -> Self {
        match token {
            "or" => BinaryOp::Or,
            "and" => BinaryOp::And,
            "==" => BinaryOp::Eq,
            "!=" | "<>" => BinaryOp::NotEq,
            "<" => BinaryOp::Lt,
            "<=" => BinaryOp::LtEq,
            ">" => BinaryOp::Gt,
            ">=" => BinaryOp::GtEq,
            "=~" => BinaryOp::EqIgnoreCase,
            "!~" => BinaryOp::NotEqIgnoreCase,
            "+" => BinaryOp::Add,
            "-" => BinaryOp::Sub,
            "*" => BinaryOp::Mul,
            "/" => BinaryOp::Div,
            "%" => BinaryOp::Mod,
            other => BinaryOp::Text(other.split_whitespace().collect::<Vec<_>>().join(" ")),
        }
    }

    /// Ordering and equality comparisons, which require comparable operand types.
    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            BinaryOp::Eq
                | BinaryOp::NotEq
                | BinaryOp::Lt
                | BinaryOp::LtEq
                | BinaryOp::Gt
                | BinaryOp::GtEq
        )
    }

    pub fn is_arithmetic(&self) -> bool {
        matches!(
            self,
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Arg {
    Star,
    Expr(Expr),
    Tabular(Pipeline),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Call {
    pub name: Ident,
    pub args: Vec<Arg>,
}

impl Call {
    pub fn expr_args(&self) -> impl Iterator<Item = &Expr> {
        self.args.iter().filter_map(|a| match a {
            Arg::Expr(e) => Some(e),
            _ => None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum InList {
    Values(Vec<Expr>),
    Tabular(Box<Pipeline>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Expr {
    Literal(Literal),
    Column(Ident),
    Member {
        base: Box<Expr>,
        member: Ident,
    },
    Index {
        base: Box<Expr>,
        index: Box<Expr>,
    },
    Call(Call),
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Between {
        operand: Box<Expr>,
        low: Box<Expr>,
        high: Box<Expr>,
        negated: bool,
    },
    In {
        operand: Box<Expr>,
        op: String,
        list: InList,
    },
}

impl Expr {
    /// Location of the first name referenced by this expression, if any.
    pub fn first_span(&self) -> Option<Span> {
        match self {
            Expr::Literal(_) => None,
            Expr::Column(id) => Some(id.span),
            Expr::Call(call) => Some(call.name.span),
            Expr::Member { base, .. } | Expr::Index { base, .. } => base.first_span(),
            Expr::Unary { operand, .. } => operand.first_span(),
            Expr::Binary { lhs, rhs, .. } => lhs.first_span().or_else(|| rhs.first_span()),
            Expr::Between { operand, .. } | Expr::In { operand, .. } => operand.first_span(),
        }
    }

    /// `a.b['c']` → `a_b_c`, the name Kusto gives an unnamed column built
    /// from a plain column or property path.
    pub fn path_name(&self) -> Option<String> {
        match self {
            Expr::Column(id) => Some(id.name.clone()),
            Expr::Member { base, member } => Some(format!("{}_{}", base.path_name()?, member.name)),
            Expr::Index { base, index } => match index.as_ref() {
                Expr::Literal(Literal::String(key)) => Some(format!("{}_{key}", base.path_name()?)),
                _ => None,
            },
            _ => None,
        }
    }
}
