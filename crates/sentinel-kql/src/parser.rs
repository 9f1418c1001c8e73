//! KQL parser: pest grammar plus a Pratt parser for scalar expressions.
//!
//! Parsing either yields a full [`Query`] or a single [`SyntaxError`]
//! positioned at the furthest point the grammar could reach.

use std::sync::LazyLock;

use pest::Parser;
use pest::error::{ErrorVariant, InputLocation};
use pest::iterators::{Pair, Pairs};
use pest::pratt_parser::{Assoc, Op, PrattParser};
use pest_derive::Parser;
use thiserror::Error;

use crate::ast::*;
use crate::schema::ScalarType;

// ---------------------------------------------------------------------------
// Pest parser (generated from kql.pest grammar)
// ---------------------------------------------------------------------------

#[derive(Parser)]
#[grammar = "src/kql.pest"]
struct KqlParser;

/// A syntax error with the byte range of the offending token.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct SyntaxError {
    pub message: String,
    pub start: usize,
    pub length: usize,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Parse a KQL query into an AST.
///
/// # Examples
///
/// ```
/// use sentinel_kql::parser::parse_query;
///
/// let query = parse_query("SecurityEvent | where EventID == 4625 | take 10").unwrap();
/// assert_eq!(query.statements.len(), 1);
/// ```
pub fn parse_query(text: &str) -> Result<Query, SyntaxError> {
    let mut pairs = KqlParser::parse(Rule::query, text).map_err(|e| syntax_error(text, &e))?;
    let builder = Builder::new();
    let statements = match pairs.next() {
        Some(query) => builder.statements(query.into_inner()),
        None => Vec::new(),
    };
    Ok(Query { statements })
}

// ---------------------------------------------------------------------------
// Tree building
// ---------------------------------------------------------------------------

static PRATT: LazyLock<PrattParser<Rule>> = LazyLock::new(|| {
    PrattParser::new()
        .op(Op::infix(Rule::or_op, Assoc::Left))
        .op(Op::infix(Rule::and_op, Assoc::Left))
        .op(Op::infix(Rule::sym_op, Assoc::Left)
            | Op::infix(Rule::word_op, Assoc::Left)
            | Op::postfix(Rule::between_tail)
            | Op::postfix(Rule::in_tail))
        .op(Op::infix(Rule::add_op, Assoc::Left))
        .op(Op::infix(Rule::mul_op, Assoc::Left))
        .op(Op::prefix(Rule::neg_op))
        .op(Op::postfix(Rule::member_access) | Op::postfix(Rule::index_access))
});

struct Builder {
    pratt: &'static PrattParser<Rule>,
}

impl Builder {
    fn new() -> Self {
        Builder { pratt: &PRATT }
    }

    // ── Statements ──────────────────────────────────────────────────────────

    fn statements(&self, pairs: Pairs<'_, Rule>) -> Vec<Statement> {
        pairs.filter_map(|p| self.statement(p)).collect()
    }

    fn statement(&self, pair: Pair<'_, Rule>) -> Option<Statement> {
        match pair.as_rule() {
            Rule::let_stmt => Some(self.let_stmt(pair)),
            Rule::directive => Some(Statement::Directive(pair.as_str().trim().to_string())),
            Rule::pipeline => Some(Statement::Pipeline(self.pipeline(pair))),
            _ => None,
        }
    }

    fn let_stmt(&self, pair: Pair<'_, Rule>) -> Statement {
        let mut name = None;
        let mut value = None;
        for p in pair.into_inner() {
            match p.as_rule() {
                Rule::ident | Rule::bracket_ident if name.is_none() => name = Some(ident(p)),
                Rule::lambda => value = Some(LetValue::Function(self.lambda(p))),
                Rule::pipeline => value = Some(LetValue::Tabular(self.pipeline(p))),
                Rule::expr => value = Some(LetValue::Scalar(self.expr(p))),
                _ => {}
            }
        }
        Statement::Let {
            name: name.expect("let must have a name"),
            value: value.expect("let must have a value"),
        }
    }

    fn lambda(&self, pair: Pair<'_, Rule>) -> Lambda {
        let mut params = Vec::new();
        let mut body = Vec::new();
        for p in pair.into_inner() {
            match p.as_rule() {
                Rule::lambda_param => params.push(self.lambda_param(p)),
                Rule::lambda_body => body = self.statements(p.into_inner()),
                _ => {}
            }
        }
        Lambda { params, body }
    }

    fn lambda_param(&self, pair: Pair<'_, Rule>) -> LambdaParam {
        let mut inner = pair.into_inner();
        let name = ident(inner.next().expect("parameter must have a name"));
        let mut ty = None;
        let mut default = None;
        for p in inner {
            match p.as_rule() {
                Rule::type_name => ty = Some(p.as_str().to_string()),
                Rule::expr => default = Some(self.expr(p)),
                _ => {}
            }
        }
        LambdaParam { name, ty, default }
    }

    // ── Tabular expressions ─────────────────────────────────────────────────

    /// Works for `pipeline` and `subquery`, which share a shape.
    fn pipeline(&self, pair: Pair<'_, Rule>) -> Pipeline {
        let mut inner = pair.into_inner();
        let source = self.source(inner.next().expect("pipeline must have a source"));
        let operators = inner.map(|p| self.operator(p)).collect();
        Pipeline { source, operators }
    }

    fn nested(&self, pair: Pair<'_, Rule>) -> Pipeline {
        let inner = pair
            .into_inner()
            .next()
            .expect("parenthesized pipeline must have a body");
        self.pipeline(inner)
    }

    fn source(&self, pair: Pair<'_, Rule>) -> Source {
        match pair.as_rule() {
            Rule::table_ref => Source::Table(inner_ident(pair)),
            Rule::func_call => Source::Call(self.call(pair)),
            Rule::paren_pipeline => Source::Nested(Box::new(self.nested(pair))),
            Rule::datatable_src => {
                let mut columns = Vec::new();
                let mut values = Vec::new();
                for p in pair.into_inner() {
                    match p.as_rule() {
                        Rule::col_decl => columns.push(col_decl(p)),
                        Rule::expr => values.push(self.expr(p)),
                        _ => {}
                    }
                }
                Source::Datatable { columns, values }
            }
            Rule::print_src => Source::Print(self.named_list(pair)),
            Rule::range_src => {
                let mut column = None;
                let mut bounds = Vec::new();
                for p in pair.into_inner() {
                    match p.as_rule() {
                        Rule::ident | Rule::bracket_ident => column = Some(ident(p)),
                        Rule::expr => bounds.push(self.expr(p)),
                        _ => {}
                    }
                }
                let mut bounds = bounds.into_iter();
                Source::Range {
                    column: column.expect("range must have a column"),
                    from: bounds.next().expect("range must have 'from'"),
                    to: bounds.next().expect("range must have 'to'"),
                    step: bounds.next().expect("range must have 'step'"),
                }
            }
            Rule::union_src => {
                let (params, tables) = self.union_parts(pair);
                Source::Union { params, tables }
            }
            Rule::opaque_src => {
                let (keyword, text) = opaque(pair);
                Source::Opaque { keyword, text }
            }
            other => unreachable!("unexpected source rule: {other:?}"),
        }
    }

    fn union_parts(&self, pair: Pair<'_, Rule>) -> (Vec<Param>, Vec<UnionTable>) {
        let mut params = Vec::new();
        let mut tables = Vec::new();
        for p in pair.into_inner() {
            match p.as_rule() {
                Rule::op_param => params.push(op_param(p)),
                Rule::paren_pipeline => tables.push(UnionTable::Nested(self.nested(p))),
                Rule::wildcard_name | Rule::bracket_ident => tables.push(UnionTable::Pattern(pattern(p))),
                _ => {}
            }
        }
        (params, tables)
    }

    fn join_parts(&self, pair: Pair<'_, Rule>) -> (Vec<Param>, Pipeline, Vec<Expr>) {
        let mut params = Vec::new();
        let mut right = None;
        let mut on = Vec::new();
        for p in pair.into_inner() {
            match p.as_rule() {
                Rule::op_param => params.push(op_param(p)),
                Rule::paren_pipeline => right = Some(self.nested(p)),
                Rule::table_ref => {
                    right = Some(Pipeline {
                        source: Source::Table(inner_ident(p)),
                        operators: Vec::new(),
                    })
                }
                Rule::join_cond => {
                    let cond = p.into_inner().next().expect("join condition must have an expression");
                    on.push(self.expr(cond));
                }
                _ => {}
            }
        }
        (params, right.expect("join must have a right side"), on)
    }

    fn operator(&self, pair: Pair<'_, Rule>) -> Operator {
        match pair.as_rule() {
            Rule::where_op => Operator::Where(self.first_expr(pair)),
            Rule::project_op => Operator::Project(self.named_list(pair)),
            Rule::project_away_op => Operator::ProjectAway(patterns(pair)),
            Rule::project_keep_op => Operator::ProjectKeep(patterns(pair)),
            Rule::project_rename_op => Operator::ProjectRename(
                pair.into_inner()
                    .filter(|p| p.as_rule() == Rule::rename)
                    .map(|p| {
                        let mut names = p.into_inner();
                        let new = ident(names.next().expect("rename must have a new name"));
                        let old = ident(names.next().expect("rename must have an old name"));
                        Rename { new, old }
                    })
                    .collect(),
            ),
            Rule::project_reorder_op => Operator::ProjectReorder(
                pair.into_inner()
                    .filter(|p| p.as_rule() == Rule::reorder_item)
                    .filter_map(|p| p.into_inner().next().map(pattern))
                    .collect(),
            ),
            Rule::extend_op => Operator::Extend(self.named_list(pair)),
            Rule::summarize_op => {
                let mut params = Vec::new();
                let mut aggregates = Vec::new();
                let mut by = Vec::new();
                for p in pair.into_inner() {
                    match p.as_rule() {
                        Rule::op_param => params.push(op_param(p)),
                        Rule::aggregates => aggregates = self.named_list(p),
                        Rule::group_by => by = self.named_list(p),
                        _ => {}
                    }
                }
                Operator::Summarize {
                    params,
                    aggregates,
                    by,
                }
            }
            Rule::count_op => Operator::Count {
                alias: pair
                    .into_inner()
                    .find(|p| matches!(p.as_rule(), Rule::ident | Rule::bracket_ident))
                    .map(ident),
            },
            Rule::distinct_op => {
                if pair.clone().into_inner().any(|p| p.as_rule() == Rule::distinct_star) {
                    Operator::Distinct(None)
                } else {
                    Operator::Distinct(Some(self.named_list(pair)))
                }
            }
            Rule::take_op => Operator::Take(self.first_expr(pair)),
            Rule::top_op => {
                let mut count = None;
                let mut by = None;
                for p in pair.into_inner() {
                    match p.as_rule() {
                        Rule::expr => count = Some(self.expr(p)),
                        Rule::sort_key => by = Some(self.sort_key(p)),
                        _ => {}
                    }
                }
                Operator::Top {
                    count: count.expect("top must have a count"),
                    by: by.expect("top must have a sort key"),
                }
            }
            Rule::sort_op => Operator::Sort(
                pair.into_inner()
                    .filter(|p| p.as_rule() == Rule::sort_key)
                    .map(|p| self.sort_key(p))
                    .collect(),
            ),
            Rule::join_op => {
                let (params, right, on) = self.join_parts(pair);
                Operator::Join { params, right, on }
            }
            Rule::lookup_op => {
                let (params, right, on) = self.join_parts(pair);
                Operator::Lookup { params, right, on }
            }
            Rule::union_op => {
                let (params, tables) = self.union_parts(pair);
                Operator::Union { params, tables }
            }
            Rule::mv_expand_op => Operator::MvExpand(
                pair.into_inner()
                    .filter(|p| p.as_rule() == Rule::expand_item)
                    .map(|p| self.expand_item(p))
                    .collect(),
            ),
            Rule::parse_op => {
                let mut filter = false;
                let mut params = Vec::new();
                let mut input = None;
                let mut items = Vec::new();
                for p in pair.into_inner() {
                    match p.as_rule() {
                        Rule::kw_parse_where => filter = true,
                        Rule::op_param => params.push(op_param(p)),
                        Rule::expr => input = Some(self.expr(p)),
                        Rule::string_lit => items.push(ParseItem::Literal(decode_string_lit(p))),
                        Rule::parse_star => items.push(ParseItem::Wildcard),
                        Rule::parse_column => {
                            let mut inner = p.into_inner();
                            let name = ident(inner.next().expect("parse column must have a name"));
                            let ty = inner.next().map(|t| t.as_str().to_string());
                            items.push(ParseItem::Column { name, ty });
                        }
                        _ => {}
                    }
                }
                Operator::Parse {
                    filter,
                    params,
                    input: input.expect("parse must have an input expression"),
                    items,
                }
            }
            Rule::getschema_op => Operator::GetSchema,
            Rule::as_op => Operator::As(
                pair.into_inner()
                    .find(|p| matches!(p.as_rule(), Rule::ident | Rule::bracket_ident))
                    .map(ident)
                    .expect("as must have a name"),
            ),
            Rule::opaque_op => {
                let (keyword, text) = opaque(pair);
                Operator::Opaque { keyword, text }
            }
            other => unreachable!("unexpected operator rule: {other:?}"),
        }
    }

    fn sort_key(&self, pair: Pair<'_, Rule>) -> SortKey {
        let mut expr = None;
        let mut descending = true;
        for p in pair.into_inner() {
            match p.as_rule() {
                Rule::expr => expr = Some(self.expr(p)),
                Rule::kw_asc => descending = false,
                _ => {}
            }
        }
        SortKey {
            expr: expr.expect("sort key must have an expression"),
            descending,
        }
    }

    fn expand_item(&self, pair: Pair<'_, Rule>) -> ExpandItem {
        let mut item = None;
        let mut to_type = None;
        for p in pair.into_inner() {
            match p.as_rule() {
                Rule::named_expr => item = Some(self.named_expr(p)),
                Rule::expand_type => {
                    to_type = p
                        .into_inner()
                        .find(|t| t.as_rule() == Rule::type_name)
                        .map(|t| t.as_str().to_string())
                }
                _ => {}
            }
        }
        ExpandItem {
            item: item.expect("mv-expand item must have an expression"),
            to_type,
        }
    }

    // ── Scalar expressions ──────────────────────────────────────────────────

    fn named_list(&self, pair: Pair<'_, Rule>) -> Vec<NamedExpr> {
        pair.into_inner()
            .filter(|p| p.as_rule() == Rule::named_expr)
            .map(|p| self.named_expr(p))
            .collect()
    }

    fn named_expr(&self, pair: Pair<'_, Rule>) -> NamedExpr {
        let mut name = None;
        let mut expr = None;
        for p in pair.into_inner() {
            match p.as_rule() {
                Rule::ident | Rule::bracket_ident => name = Some(ident(p)),
                Rule::expr => expr = Some(self.expr(p)),
                _ => {}
            }
        }
        NamedExpr {
            name,
            expr: expr.expect("named expression must have an expression"),
        }
    }

    fn first_expr(&self, pair: Pair<'_, Rule>) -> Expr {
        let expr = pair
            .into_inner()
            .find(|p| p.as_rule() == Rule::expr)
            .expect("operator must have an expression");
        self.expr(expr)
    }

    fn expr(&self, pair: Pair<'_, Rule>) -> Expr {
        self.pratt
            .map_primary(|primary| self.primary(primary))
            .map_prefix(|op, operand| match op.as_str() {
                "-" => Expr::Unary {
                    op: UnaryOp::Neg,
                    operand: Box::new(operand),
                },
                _ => operand,
            })
            .map_postfix(|lhs, op| self.postfix(lhs, op))
            .map_infix(|lhs, op, rhs| Expr::Binary {
                op: BinaryOp::from_token(op.as_str()),
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            })
            .parse(pair.into_inner())
    }

    fn primary(&self, pair: Pair<'_, Rule>) -> Expr {
        match pair.as_rule() {
            Rule::expr => self.expr(pair),
            Rule::column_ref => Expr::Column(inner_ident(pair)),
            Rule::func_call => Expr::Call(self.call(pair)),
            Rule::string_lit => Expr::Literal(Literal::String(decode_string_lit(pair))),
            Rule::number => Expr::Literal(number(pair.as_str())),
            Rule::timespan_lit => Expr::Literal(Literal::Timespan(pair.as_str().to_string())),
            Rule::bool_lit => Expr::Literal(Literal::Bool(pair.as_str().eq_ignore_ascii_case("true"))),
            Rule::typed_lit => {
                let mut inner = pair.into_inner();
                let kw = inner.next().expect("typed literal must have a type");
                let raw = inner.next().map(|b| b.as_str().trim().to_string()).unwrap_or_default();
                let ty = kw.as_str().parse().unwrap_or(ScalarType::Unknown);
                Expr::Literal(Literal::Typed { ty, raw })
            }
            other => unreachable!("unexpected primary rule: {other:?}"),
        }
    }

    fn postfix(&self, lhs: Expr, op: Pair<'_, Rule>) -> Expr {
        let base = Box::new(lhs);
        match op.as_rule() {
            Rule::member_access => Expr::Member {
                base,
                member: inner_ident(op),
            },
            Rule::index_access => Expr::Index {
                base,
                index: Box::new(self.first_expr(op)),
            },
            Rule::between_tail => {
                let mut inner = op.into_inner();
                let kw = inner.next().expect("between must have a keyword");
                let low = self.expr(inner.next().expect("between must have a lower bound"));
                let high = self.expr(inner.next().expect("between must have an upper bound"));
                Expr::Between {
                    operand: base,
                    low: Box::new(low),
                    high: Box::new(high),
                    negated: kw.as_str().starts_with('!'),
                }
            }
            Rule::in_tail => {
                let mut inner = op.into_inner();
                let kw = inner.next().expect("in must have a keyword").as_str().to_string();
                let mut values = Vec::new();
                let mut tabular = None;
                for p in inner {
                    match p.as_rule() {
                        Rule::subquery => tabular = Some(self.pipeline(p)),
                        Rule::paren_pipeline => tabular = Some(self.nested(p)),
                        Rule::expr => values.push(self.expr(p)),
                        _ => {}
                    }
                }
                let list = match tabular {
                    Some(p) => InList::Tabular(Box::new(p)),
                    None => InList::Values(values),
                };
                Expr::In {
                    operand: base,
                    op: kw,
                    list,
                }
            }
            other => unreachable!("unexpected postfix rule: {other:?}"),
        }
    }

    fn call(&self, pair: Pair<'_, Rule>) -> Call {
        let mut inner = pair.into_inner();
        let name = ident(inner.next().expect("call must have a name"));
        let args = inner
            .map(|p| match p.as_rule() {
                Rule::star => Arg::Star,
                Rule::subquery => Arg::Tabular(self.pipeline(p)),
                _ => Arg::Expr(self.expr(p)),
            })
            .collect();
        Call { name, args }
    }
}

// ---------------------------------------------------------------------------
// Leaf helpers
// ---------------------------------------------------------------------------

fn span_of(pair: &Pair<'_, Rule>) -> Span {
    let span = pair.as_span();
    Span {
        start: span.start(),
        end: span.end(),
    }
}

fn ident(pair: Pair<'_, Rule>) -> Ident {
    let span = span_of(&pair);
    let name = match pair.as_rule() {
        Rule::bracket_ident => pair.into_inner().map(|p| decode_string_part(p.as_str())).collect(),
        _ => pair.as_str().to_string(),
    };
    Ident { name, span }
}

/// The name inside a wrapper rule such as `column_ref` or `table_ref`.
fn inner_ident(pair: Pair<'_, Rule>) -> Ident {
    let inner = pair.into_inner().next().expect("reference must have a name");
    ident(inner)
}

fn pattern(pair: Pair<'_, Rule>) -> String {
    match pair.as_rule() {
        Rule::bracket_ident => ident(pair).name,
        _ => pair.as_str().to_string(),
    }
}

fn patterns(pair: Pair<'_, Rule>) -> Vec<String> {
    pair.into_inner()
        .filter(|p| matches!(p.as_rule(), Rule::wildcard_name | Rule::bracket_ident))
        .map(pattern)
        .collect()
}

fn col_decl(pair: Pair<'_, Rule>) -> ColumnDecl {
    let mut inner = pair.into_inner();
    let name = ident(inner.next().expect("column declaration must have a name"));
    let ty = inner
        .next()
        .expect("column declaration must have a type")
        .as_str()
        .to_string();
    ColumnDecl { name, ty }
}

fn op_param(pair: Pair<'_, Rule>) -> Param {
    let mut inner = pair.into_inner();
    let name = inner.next().expect("parameter must have a name").as_str().to_string();
    let value = inner
        .next()
        .and_then(|v| v.into_inner().next())
        .map(|v| match v.as_rule() {
            Rule::string_lit => decode_string_lit(v),
            _ => v.as_str().to_string(),
        })
        .unwrap_or_default();
    Param { name, value }
}

fn opaque(pair: Pair<'_, Rule>) -> (String, String) {
    let mut inner = pair.into_inner();
    let keyword = inner.next().expect("opaque operator must have a keyword").as_str().to_string();
    let text = inner.next().map(|t| t.as_str().trim().to_string()).unwrap_or_default();
    (keyword, text)
}

fn number(raw: &str) -> Literal {
    if let Some(hex) = raw.strip_prefix("0x") {
        return match i64::from_str_radix(hex, 16) {
            Ok(v) => Literal::Long(v),
            Err(_) => Literal::Real(f64::INFINITY),
        };
    }
    if raw.contains(['.', 'e', 'E']) {
        return Literal::Real(raw.parse().unwrap_or(f64::NAN));
    }
    match raw.parse::<i64>() {
        Ok(v) => Literal::Long(v),
        Err(_) => Literal::Real(raw.parse().unwrap_or(f64::INFINITY)),
    }
}

fn decode_string_lit(pair: Pair<'_, Rule>) -> String {
    pair.into_inner().map(|p| decode_string_part(p.as_str())).collect()
}

/// Strip quotes and resolve escapes of a single string token.
fn decode_string_part(raw: &str) -> String {
    if let Some(body) = raw.strip_prefix("```").and_then(|r| r.strip_suffix("```")) {
        return body.to_string();
    }
    let raw = raw.strip_prefix(['h', 'H']).unwrap_or(raw);
    let (verbatim, quoted) = match raw.strip_prefix('@') {
        Some(rest) => (true, rest),
        None => (false, raw),
    };
    let Some(quote) = quoted.chars().next() else {
        return String::new();
    };
    let body = &quoted[1..quoted.len().saturating_sub(1).max(1)];
    if verbatim {
        let doubled: String = [quote, quote].iter().collect();
        return body.replace(&doubled, &quote.to_string());
    }

    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('0') => out.push('\0'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Syntax errors
// ---------------------------------------------------------------------------

fn syntax_error(text: &str, err: &pest::error::Error<Rule>) -> SyntaxError {
    let pos = match err.location {
        InputLocation::Pos(p) => p,
        InputLocation::Span((s, _)) => s,
    };
    let (start, token) = token_at(text, pos);
    let length = token.len().max(1);

    let expected = match &err.variant {
        ErrorVariant::ParsingError { positives, .. } => expected_list(positives),
        ErrorVariant::CustomError { message } => {
            return SyntaxError {
                message: message.clone(),
                start,
                length,
            };
        }
    };

    let found = if token.is_empty() {
        "end of query".to_string()
    } else {
        format!("'{token}'")
    };
    let message = if expected.is_empty() {
        format!("Unexpected {found}")
    } else {
        format!("Unexpected {found}; expected {}", join_alternatives(&expected))
    };
    SyntaxError {
        message,
        start,
        length,
    }
}

/// The token starting at `pos`, after skipping whitespace.
fn token_at(text: &str, pos: usize) -> (usize, &str) {
    let rest = text.get(pos..).unwrap_or("");
    let trimmed = rest.trim_start();
    let start = pos + (rest.len() - trimmed.len());
    let Some(first) = trimmed.chars().next() else {
        return (start, "");
    };
    let end = if first.is_ascii_alphanumeric() || first == '_' {
        trimmed
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
            .unwrap_or(trimmed.len())
    } else {
        first.len_utf8()
    };
    (start, &trimmed[..end])
}

fn expected_list(positives: &[Rule]) -> Vec<&'static str> {
    let mut out: Vec<&'static str> = Vec::new();
    for rule in positives {
        if let Some(desc) = describe(*rule)
            && !out.contains(&desc)
        {
            out.push(desc);
        }
    }
    out
}

fn describe(rule: Rule) -> Option<&'static str> {
    let desc = match rule {
        Rule::EOI => "end of query",
        Rule::expr
        | Rule::named_expr
        | Rule::column_ref
        | Rule::func_call
        | Rule::star
        | Rule::subquery
        | Rule::neg_op
        | Rule::string_lit
        | Rule::string_part
        | Rule::number
        | Rule::timespan_lit
        | Rule::bool_lit
        | Rule::typed_lit
        | Rule::typed_kw
        | Rule::aggregates
        | Rule::group_by
        | Rule::sort_key
        | Rule::join_cond
        | Rule::expand_item
        | Rule::distinct_star => "expression",
        Rule::ident
        | Rule::bracket_ident
        | Rule::wildcard_name
        | Rule::col_decl
        | Rule::rename
        | Rule::reorder_item
        | Rule::parse_column
        | Rule::parse_star => "name",
        Rule::type_name | Rule::table_type => "type",
        Rule::or_op
        | Rule::and_op
        | Rule::sym_op
        | Rule::word_op
        | Rule::add_op
        | Rule::mul_op
        | Rule::between_kw
        | Rule::between_tail
        | Rule::in_kw
        | Rule::in_tail
        | Rule::member_access
        | Rule::index_access => "operator",
        Rule::kw_where
        | Rule::kw_project
        | Rule::kw_project_away
        | Rule::kw_project_keep
        | Rule::kw_project_rename
        | Rule::kw_project_reorder
        | Rule::kw_extend
        | Rule::kw_summarize
        | Rule::kw_count
        | Rule::kw_distinct
        | Rule::kw_take
        | Rule::kw_top
        | Rule::kw_sort
        | Rule::kw_join
        | Rule::kw_lookup
        | Rule::kw_union
        | Rule::kw_mv_expand
        | Rule::kw_parse
        | Rule::kw_parse_where
        | Rule::kw_getschema
        | Rule::kw_as
        | Rule::opaque_kw => "query operator",
        Rule::pipeline
        | Rule::table_ref
        | Rule::paren_pipeline
        | Rule::datatable_src
        | Rule::print_src
        | Rule::range_src
        | Rule::union_src
        | Rule::opaque_src
        | Rule::kw_datatable
        | Rule::kw_print
        | Rule::kw_range => "tabular expression",
        Rule::let_stmt | Rule::kw_let => "'let'",
        Rule::directive | Rule::kw_set | Rule::kw_declare | Rule::kw_alias => "directive",
        Rule::lambda | Rule::lambda_param | Rule::lambda_body | Rule::kw_view => "function definition",
        Rule::op_param | Rule::param_name | Rule::param_value | Rule::param_word => "parameter",
        Rule::kw_by => "'by'",
        Rule::kw_on => "'on'",
        Rule::kw_with => "'with'",
        Rule::kw_from => "'from'",
        Rule::kw_to | Rule::expand_type => "'to'",
        Rule::kw_step => "'step'",
        Rule::kw_typeof => "'typeof'",
        Rule::kw_asc => "'asc'",
        Rule::kw_desc => "'desc'",
        Rule::kw_nulls => "'nulls'",
        Rule::kw_first => "'first'",
        Rule::kw_last => "'last'",
        Rule::kw_limit | Rule::expand_limit => "'limit'",
        _ => return None,
    };
    Some(desc)
}

fn join_alternatives(items: &[&str]) -> String {
    match items {
        [] => String::new(),
        [one] => one.to_string(),
        [init @ .., last] => format!("{} or {last}", init.join(", ")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pipeline(text: &str) -> Pipeline {
        let query = parse_query(text).unwrap();
        query.result().cloned().expect("query has a tabular statement")
    }

    fn where_expr(text: &str) -> Expr {
        match pipeline(text).operators.into_iter().next() {
            Some(Operator::Where(e)) => e,
            other => panic!("expected where, got {other:?}"),
        }
    }

    #[test]
    fn test_table_with_operators() {
        let p = pipeline("SecurityEvent | where EventID == 4625 | take 10");
        assert!(matches!(&p.source, Source::Table(id) if id.name == "SecurityEvent"));
        assert_eq!(p.operators.len(), 2);
        assert!(matches!(p.operators[1], Operator::Take(_)));
    }

    #[test]
    fn test_ident_span() {
        let p = pipeline("  SigninLogs");
        let Source::Table(id) = p.source else { panic!("expected table") };
        assert_eq!(id.span, Span { start: 2, end: 12 });
    }

    #[test]
    fn test_precedence_and_binds_tighter_than_or() {
        let e = where_expr("T | where a == 1 or b == 2 and c == 3");
        let Expr::Binary { op, rhs, .. } = e else { panic!("expected binary") };
        assert_eq!(op, BinaryOp::Or);
        assert!(matches!(*rhs, Expr::Binary { op: BinaryOp::And, .. }));
    }

    #[test]
    fn test_arithmetic_precedence() {
        let e = where_expr("T | where a + b * 2 > 10");
        let Expr::Binary { op, lhs, .. } = e else { panic!("expected binary") };
        assert_eq!(op, BinaryOp::Gt);
        let Expr::Binary { op, rhs, .. } = *lhs else { panic!("expected sum") };
        assert_eq!(op, BinaryOp::Add);
        assert!(matches!(*rhs, Expr::Binary { op: BinaryOp::Mul, .. }));
    }

    #[test]
    fn test_string_operators() {
        let e = where_expr("T | where CommandLine !contains_cs 'x' and Name matches regex @'\\d+'");
        let Expr::Binary { lhs, rhs, .. } = e else { panic!("expected and") };
        assert!(matches!(*lhs, Expr::Binary { op: BinaryOp::Text(ref t), .. } if t == "!contains_cs"));
        assert!(matches!(*rhs, Expr::Binary { op: BinaryOp::Text(ref t), .. } if t == "matches regex"));
    }

    #[test]
    fn test_in_and_between() {
        let e = where_expr("T | where EventID in (4624, 4625) and TimeGenerated between (ago(1d) .. now())");
        let Expr::Binary { lhs, rhs, .. } = e else { panic!("expected and") };
        assert!(matches!(*lhs, Expr::In { list: InList::Values(ref v), .. } if v.len() == 2));
        assert!(matches!(*rhs, Expr::Between { negated: false, .. }));
    }

    #[test]
    fn test_in_subquery() {
        let e = where_expr("T | where Account !in (Other | distinct Account)");
        assert!(matches!(e, Expr::In { list: InList::Tabular(_), ref op, .. } if op == "!in"));
    }

    #[test]
    fn test_string_literals_decode() {
        let e = where_expr(r#"T | where a == "x\ty" or b == @'c:\temp' or c == 'it''s' 'ok'"#);
        let mut strings = Vec::new();
        collect_strings(&e, &mut strings);
        assert_eq!(strings, vec!["x\ty", "c:\\temp", "itsok"]);
    }

    fn collect_strings(e: &Expr, out: &mut Vec<String>) {
        match e {
            Expr::Literal(Literal::String(s)) => out.push(s.clone()),
            Expr::Binary { lhs, rhs, .. } => {
                collect_strings(lhs, out);
                collect_strings(rhs, out);
            }
            _ => {}
        }
    }

    #[test]
    fn test_let_statements() {
        let q = parse_query(
            "let threshold = 5;\nlet failures = SigninLogs | where ResultType != '0';\nlet f = (x:string) { x };\nfailures | count",
        )
        .unwrap();
        assert_eq!(q.statements.len(), 4);
        assert!(matches!(&q.statements[0], Statement::Let { value: LetValue::Scalar(_), .. }));
        assert!(matches!(&q.statements[1], Statement::Let { value: LetValue::Tabular(_), .. }));
        assert!(matches!(&q.statements[2], Statement::Let { value: LetValue::Function(_), .. }));
    }

    #[test]
    fn test_summarize_with_bin() {
        let p = pipeline("T | summarize Count = count(), dcount(Ip) by Account, bin(TimeGenerated, 1h)");
        let Operator::Summarize { aggregates, by, .. } = &p.operators[0] else {
            panic!("expected summarize")
        };
        assert_eq!(aggregates.len(), 2);
        assert_eq!(aggregates[0].name.as_ref().map(|n| n.name.as_str()), Some("Count"));
        assert_eq!(by.len(), 2);
    }

    #[test]
    fn test_summarize_arg_max_star() {
        let p = pipeline("T | summarize arg_max(TimeGenerated, *) by Computer");
        let Operator::Summarize { aggregates, .. } = &p.operators[0] else {
            panic!("expected summarize")
        };
        let Expr::Call(call) = &aggregates[0].expr else { panic!("expected call") };
        assert_eq!(call.args.len(), 2);
        assert!(matches!(call.args[1], Arg::Star));
    }

    #[test]
    fn test_join_with_kind_and_conditions() {
        let p = pipeline("A | join kind=inner (B | where x > 1) on $left.Id == $right.Id, Host");
        let Operator::Join { params, right, on } = &p.operators[0] else {
            panic!("expected join")
        };
        assert_eq!(param(params, "kind"), Some("inner"));
        assert_eq!(right.operators.len(), 1);
        assert_eq!(on.len(), 2);
    }

    #[test]
    fn test_project_variants() {
        let p = pipeline("T | project-away Foo, Bar* | project-rename New = Old | project A, B = C + 1");
        assert!(matches!(&p.operators[0], Operator::ProjectAway(v) if v == &["Foo", "Bar*"]));
        assert!(matches!(&p.operators[1], Operator::ProjectRename(v) if v[0].new.name == "New"));
        assert!(matches!(&p.operators[2], Operator::Project(v) if v.len() == 2));
    }

    #[test]
    fn test_parse_operator() {
        let p = pipeline(r#"Syslog | parse SyslogMessage with * "user=" User:string " " *"#);
        let Operator::Parse { items, filter, .. } = &p.operators[0] else {
            panic!("expected parse")
        };
        assert!(!filter);
        assert_eq!(items.len(), 5);
        assert!(matches!(&items[2], ParseItem::Column { name, ty: Some(t) } if name.name == "User" && t == "string"));
    }

    #[test]
    fn test_opaque_operators() {
        let p = pipeline("T | evaluate bag_unpack(Props) | render timechart with (title='x')");
        assert!(matches!(&p.operators[0], Operator::Opaque { keyword, .. } if keyword == "evaluate"));
        assert!(matches!(&p.operators[1], Operator::Opaque { keyword, .. } if keyword == "render"));
    }

    #[test]
    fn test_datatable_and_typed_literals() {
        let p = pipeline("datatable(Name:string, When:datetime) ['a', datetime(2024-01-01)]");
        let Source::Datatable { columns, values } = p.source else { panic!("expected datatable") };
        assert_eq!(columns.len(), 2);
        assert!(matches!(
            &values[1],
            Expr::Literal(Literal::Typed { ty: ScalarType::DateTime, raw }) if raw == "2024-01-01"
        ));
    }

    #[test]
    fn test_dynamic_literal_with_paren_in_string() {
        let e = where_expr("T | where x in (dynamic(['a)', 'b']))");
        assert!(matches!(e, Expr::In { .. }));
    }

    #[test]
    fn test_comments_and_bracket_names() {
        let p = pipeline("// header\nT // trailing\n| extend ['my col'] = 1");
        let Operator::Extend(items) = &p.operators[0] else { panic!("expected extend") };
        assert_eq!(items[0].name.as_ref().map(|n| n.name.as_str()), Some("my col"));
    }

    #[test]
    fn test_member_access_chain() {
        let p = pipeline("AuditLogs | extend Actor = InitiatedBy.user.userPrincipalName");
        let Operator::Extend(items) = &p.operators[0] else { panic!("expected extend") };
        assert_eq!(items[0].expr.path_name().as_deref(), Some("InitiatedBy_user_userPrincipalName"));
    }

    #[test]
    fn test_syntax_error_reports_offending_token() {
        let err = parse_query("SecurityEvent | wher EventID == 1").unwrap_err();
        assert_eq!(err.start, 16);
        assert_eq!(err.length, 4);
        assert!(err.message.starts_with("Unexpected 'wher'"), "got: {}", err.message);
        assert!(err.message.contains("query operator"), "got: {}", err.message);
    }

    #[test]
    fn test_syntax_error_at_end_of_query() {
        let err = parse_query("SecurityEvent | where").unwrap_err();
        assert!(err.message.starts_with("Unexpected end of query"), "got: {}", err.message);
        assert_eq!(err.length, 1);
    }

    #[test]
    fn test_join_alternatives() {
        assert_eq!(join_alternatives(&["a"]), "a");
        assert_eq!(join_alternatives(&["a", "b"]), "a or b");
        assert_eq!(join_alternatives(&["a", "b", "c"]), "a, b or c");
    }
}
