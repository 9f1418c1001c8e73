//! Output-column inference and schema-aware checks.
//!
//! Without a [`Database`] this only infers what it can about the result
//! columns. With one, unresolved names and incomparable operand types are
//! reported as diagnostics using Kusto's own wording.

use std::collections::HashMap;

use crate::ast::*;
use crate::code::{Diagnostic, Severity};
use crate::schema::{Column, Database, ScalarType};

/// `None` when the column set cannot be determined.
type Columns = Option<Vec<Column>>;

#[derive(Debug, Clone)]
enum Binding {
    Scalar(ScalarType),
    Tabular(Columns),
    Function,
}

pub(crate) struct Analysis {
    pub output_columns: Columns,
    pub diagnostics: Vec<Diagnostic>,
}

pub(crate) fn analyze_query(query: &Query, db: Option<&Database>) -> Analysis {
    let mut analyzer = Analyzer {
        db,
        bindings: HashMap::new(),
        diagnostics: Vec::new(),
    };
    let mut output = None;
    for statement in &query.statements {
        match statement {
            Statement::Let { name, value } => {
                let binding = analyzer.let_binding(value);
                analyzer.bindings.insert(name.name.clone(), binding);
            }
            Statement::Directive(_) => {}
            Statement::Pipeline(p) => output = Some(analyzer.pipeline(p)),
        }
    }
    Analysis {
        output_columns: output.flatten(),
        diagnostics: analyzer.diagnostics,
    }
}

fn unknown_column(name: &str) -> String {
    format!("The name '{name}' does not refer to any known column, table, variable or function.")
}

fn unknown_table(name: &str) -> String {
    format!("The name '{name}' does not refer to any known table, tabular variable or function.")
}

struct Analyzer<'a> {
    db: Option<&'a Database>,
    bindings: HashMap<String, Binding>,
    diagnostics: Vec<Diagnostic>,
}

impl Analyzer<'_> {
    /// Semantic diagnostics are only meaningful against a schema.
    fn report(&mut self, span: Span, message: String) {
        if self.db.is_none() {
            return;
        }
        self.diagnostics.push(Diagnostic {
            severity: Severity::Error,
            message,
            start: span.start,
            length: span.len().max(1),
        });
    }

    fn lookup_tabular(&self, name: &str) -> Option<Columns> {
        match self.bindings.get(name) {
            Some(Binding::Tabular(cols)) => Some(cols.clone()),
            Some(_) => None,
            None => self
                .db
                .and_then(|db| db.table(name))
                .map(|t| Some(t.columns.clone())),
        }
    }

    fn let_binding(&mut self, value: &LetValue) -> Binding {
        match value {
            LetValue::Tabular(p) => Binding::Tabular(self.pipeline(p)),
            LetValue::Function(_) => Binding::Function,
            LetValue::Scalar(Expr::Column(id)) => match self.lookup_tabular(&id.name) {
                Some(cols) => Binding::Tabular(cols),
                None => Binding::Scalar(self.scalar(&Expr::Column(id.clone()), None)),
            },
            LetValue::Scalar(Expr::Call(call)) if is_tabular_wrapper(&call.name.name) => {
                Binding::Tabular(self.call_source(call))
            }
            LetValue::Scalar(expr) => Binding::Scalar(self.scalar(expr, None)),
        }
    }

    // =========================================================================
    // Tabular expressions
    // =========================================================================

    fn pipeline(&mut self, pipeline: &Pipeline) -> Columns {
        let mut columns = self.source(&pipeline.source);
        for op in &pipeline.operators {
            columns = self.operator(op, columns);
        }
        columns
    }

    fn source(&mut self, source: &Source) -> Columns {
        match source {
            Source::Table(id) => match self.lookup_tabular(&id.name) {
                Some(cols) => cols,
                None => {
                    if !self.bindings.contains_key(&id.name) {
                        self.report(id.span, unknown_table(&id.name));
                    }
                    None
                }
            },
            Source::Call(call) => self.call_source(call),
            Source::Nested(p) => self.pipeline(p),
            Source::Datatable { columns, values } => {
                for v in values {
                    self.scalar(v, None);
                }
                Some(
                    columns
                        .iter()
                        .map(|c| Column::new(c.name.name.clone(), parse_type(&c.ty)))
                        .collect(),
                )
            }
            Source::Print(items) => {
                let mut out = Vec::new();
                for (i, item) in items.iter().enumerate() {
                    let ty = self.scalar(&item.expr, None);
                    let name = match &item.name {
                        Some(n) => n.name.clone(),
                        None => format!("print_{i}"),
                    };
                    push_column(&mut out, name, ty);
                }
                Some(out)
            }
            Source::Range {
                column,
                from,
                to,
                step,
            } => {
                let ty = self.scalar(from, None);
                self.scalar(to, None);
                self.scalar(step, None);
                let ty = if ty == ScalarType::Unknown {
                    ScalarType::Long
                } else {
                    ty
                };
                Some(vec![Column::new(column.name.clone(), ty)])
            }
            Source::Union { tables, .. } => self.union(Vec::new(), tables),
            Source::Opaque { .. } => None,
        }
    }

    fn call_source(&mut self, call: &Call) -> Columns {
        let mut tabular = None;
        for arg in &call.args {
            match arg {
                Arg::Expr(e) => {
                    self.scalar(e, None);
                }
                Arg::Tabular(p) => {
                    let cols = self.pipeline(p);
                    tabular.get_or_insert(cols);
                }
                Arg::Star => {}
            }
        }
        if !is_tabular_wrapper(&call.name.name) {
            return None;
        }
        match (tabular, call.args.first()) {
            (Some(cols), _) => cols,
            (None, Some(Arg::Expr(Expr::Column(id)))) => self.lookup_tabular(&id.name).flatten(),
            (None, Some(Arg::Expr(Expr::Literal(Literal::String(name))))) => {
                self.lookup_tabular(name).flatten()
            }
            _ => None,
        }
    }

    fn union(&mut self, mut parts: Vec<Columns>, tables: &[UnionTable]) -> Columns {
        let db = self.db;
        for table in tables {
            match table {
                UnionTable::Nested(p) => parts.push(self.pipeline(p)),
                UnionTable::Pattern(pattern) if pattern.contains('*') => {
                    let matched: Vec<Columns> = db
                        .map(|db| {
                            db.tables()
                                .filter(|t| wildcard_match(pattern, &t.name))
                                .map(|t| Some(t.columns.clone()))
                                .collect()
                        })
                        .unwrap_or_default();
                    if matched.is_empty() {
                        parts.push(None);
                    } else {
                        parts.extend(matched);
                    }
                }
                UnionTable::Pattern(name) => parts.push(self.lookup_tabular(name).flatten()),
            }
        }

        let mut out: Vec<Column> = Vec::new();
        for part in parts {
            for column in part? {
                if !out.iter().any(|c| c.name == column.name) {
                    out.push(column);
                }
            }
        }
        Some(out)
    }

    fn operator(&mut self, op: &Operator, input: Columns) -> Columns {
        match op {
            Operator::Where(e) | Operator::Take(e) => {
                self.scalar(e, input.as_deref());
                input
            }
            Operator::Top { count, by } => {
                self.scalar(count, None);
                self.scalar(&by.expr, input.as_deref());
                input
            }
            Operator::Sort(keys) => {
                for key in keys {
                    self.scalar(&key.expr, input.as_deref());
                }
                input
            }
            Operator::Project(items) | Operator::Distinct(Some(items)) => {
                Some(self.project(items, input.as_deref()))
            }
            Operator::Distinct(None) | Operator::As(_) => input,
            Operator::ProjectAway(patterns) => input.map(|cols| {
                cols.into_iter()
                    .filter(|c| !patterns.iter().any(|p| wildcard_match(p, &c.name)))
                    .collect()
            }),
            Operator::ProjectKeep(patterns) => input.map(|cols| {
                cols.into_iter()
                    .filter(|c| patterns.iter().any(|p| wildcard_match(p, &c.name)))
                    .collect()
            }),
            Operator::ProjectRename(renames) => {
                let mut cols = input?;
                for rename in renames {
                    match cols.iter_mut().find(|c| c.name == rename.old.name) {
                        Some(c) => c.name = rename.new.name.clone(),
                        None => self.report(rename.old.span, unknown_column(&rename.old.name)),
                    }
                }
                Some(cols)
            }
            Operator::ProjectReorder(patterns) => input.map(|cols| {
                let mut ordered: Vec<Column> = Vec::new();
                for p in patterns {
                    for c in &cols {
                        if wildcard_match(p, &c.name) && !ordered.iter().any(|o| o.name == c.name) {
                            ordered.push(c.clone());
                        }
                    }
                }
                for c in cols {
                    if !ordered.iter().any(|o| o.name == c.name) {
                        ordered.push(c);
                    }
                }
                ordered
            }),
            Operator::Extend(items) => {
                let mut cols = input;
                let mut ordinal = 0;
                for item in items {
                    let ty = self.scalar(&item.expr, cols.as_deref());
                    let name = column_name(item, &mut ordinal);
                    if let Some(cols) = cols.as_mut() {
                        set_column(cols, name, ty);
                    }
                }
                cols
            }
            Operator::Summarize {
                aggregates, by, ..
            } => self.summarize(aggregates, by, input.as_deref()),
            Operator::Count { alias } => {
                let name = alias.as_ref().map_or("Count", |a| a.name.as_str());
                Some(vec![Column::new(name, ScalarType::Long)])
            }
            Operator::Join { params, right, on } => {
                let right_cols = self.pipeline(right);
                self.check_join_keys(on, input.as_deref(), right_cols.as_deref());
                let kind = param(params, "kind").unwrap_or("innerunique").to_ascii_lowercase();
                match kind.as_str() {
                    "leftsemi" | "leftanti" | "leftantisemi" | "anti" => input,
                    "rightsemi" | "rightanti" | "rightantisemi" => right_cols,
                    _ => {
                        let (mut left, right) = (input?, right_cols?);
                        for c in right {
                            push_column(&mut left, c.name, c.ty);
                        }
                        Some(left)
                    }
                }
            }
            Operator::Lookup { right, on, .. } => {
                let right_cols = self.pipeline(right);
                self.check_join_keys(on, input.as_deref(), right_cols.as_deref());
                let keys: Vec<String> = on.iter().filter_map(join_key_name).collect();
                let (mut left, right) = (input?, right_cols?);
                for c in right {
                    if !keys.contains(&c.name) {
                        push_column(&mut left, c.name, c.ty);
                    }
                }
                Some(left)
            }
            Operator::Union { tables, .. } => self.union(vec![input], tables),
            Operator::MvExpand(items) => {
                let mut cols = input;
                let mut ordinal = 0;
                for expand in items {
                    self.scalar(&expand.item.expr, cols.as_deref());
                    let ty = expand
                        .to_type
                        .as_deref()
                        .map_or(ScalarType::Dynamic, parse_type);
                    let name = column_name(&expand.item, &mut ordinal);
                    if let Some(cols) = cols.as_mut() {
                        set_column(cols, name, ty);
                    }
                }
                cols
            }
            Operator::Parse {
                input: source,
                items,
                ..
            } => {
                self.scalar(source, input.as_deref());
                let mut cols = input?;
                for item in items {
                    if let ParseItem::Column { name, ty } = item {
                        let ty = ty.as_deref().map_or(ScalarType::String, parse_type);
                        set_column(&mut cols, name.name.clone(), ty);
                    }
                }
                Some(cols)
            }
            Operator::GetSchema => Some(vec![
                Column::new("ColumnName", ScalarType::String),
                Column::new("ColumnOrdinal", ScalarType::Int),
                Column::new("DataType", ScalarType::String),
                Column::new("ColumnType", ScalarType::String),
            ]),
            Operator::Opaque { keyword, .. } => match keyword.as_str() {
                "render" | "serialize" | "sample" => input,
                _ => None,
            },
        }
    }

    fn project(&mut self, items: &[NamedExpr], row: Option<&[Column]>) -> Vec<Column> {
        let mut out = Vec::new();
        let mut ordinal = 0;
        for item in items {
            let ty = self.scalar(&item.expr, row);
            push_column(&mut out, column_name(item, &mut ordinal), ty);
        }
        out
    }

    fn summarize(
        &mut self,
        aggregates: &[NamedExpr],
        by: &[NamedExpr],
        row: Option<&[Column]>,
    ) -> Columns {
        let mut out = Vec::new();
        let mut known = true;
        let mut ordinal = 0;

        for item in by {
            let ty = self.scalar(&item.expr, row);
            let name = match &item.name {
                Some(n) => n.name.clone(),
                None => group_key_name(&item.expr).unwrap_or_else(|| next_column(&mut ordinal)),
            };
            push_column(&mut out, name, ty);
        }

        for item in aggregates {
            if item.name.is_none()
                && let Expr::Call(call) = &item.expr
                && matches!(call.name.name.as_str(), "arg_max" | "arg_min")
            {
                for arg in &call.args {
                    match arg {
                        Arg::Star => match row {
                            Some(cols) => {
                                for c in cols {
                                    if !out.iter().any(|o: &Column| o.name == c.name) {
                                        out.push(c.clone());
                                    }
                                }
                            }
                            None => known = false,
                        },
                        Arg::Expr(e) => {
                            let ty = self.scalar(e, row);
                            let name = e.path_name().unwrap_or_else(|| next_column(&mut ordinal));
                            push_column(&mut out, name, ty);
                        }
                        Arg::Tabular(p) => {
                            self.pipeline(p);
                        }
                    }
                }
                continue;
            }

            let ty = self.scalar(&item.expr, row);
            let name = match &item.name {
                Some(n) => n.name.clone(),
                None => aggregate_name(&item.expr).unwrap_or_else(|| next_column(&mut ordinal)),
            };
            push_column(&mut out, name, ty);
        }

        known.then_some(out)
    }

    /// `on Key` must name a column of both sides; `$left.A == $right.B`
    /// is checked against the respective side.
    fn check_join_keys(&mut self, on: &[Expr], left: Option<&[Column]>, right: Option<&[Column]>) {
        for cond in on {
            match cond {
                Expr::Column(id) => {
                    let missing = [left, right]
                        .into_iter()
                        .flatten()
                        .any(|cols| !cols.iter().any(|c| c.name == id.name));
                    if missing {
                        self.report(id.span, unknown_column(&id.name));
                    }
                }
                Expr::Binary { lhs, rhs, .. } => {
                    self.join_side(lhs, left, right);
                    self.join_side(rhs, left, right);
                }
                other => {
                    self.scalar(other, None);
                }
            }
        }
    }

    fn join_side(&mut self, expr: &Expr, left: Option<&[Column]>, right: Option<&[Column]>) {
        let Expr::Member { base, member } = expr else {
            self.scalar(expr, None);
            return;
        };
        let Expr::Column(side) = base.as_ref() else {
            return;
        };
        let cols = match side.name.as_str() {
            "$left" => left,
            "$right" => right,
            _ => return,
        };
        if let Some(cols) = cols
            && !cols.iter().any(|c| c.name == member.name)
        {
            let span = Span {
                start: side.span.start,
                end: member.span.end,
            };
            self.report(span, unknown_column(&member.name));
        }
    }

    // =========================================================================
    // Scalar expressions
    // =========================================================================

    fn scalar(&mut self, expr: &Expr, row: Option<&[Column]>) -> ScalarType {
        match expr {
            Expr::Literal(lit) => lit.scalar_type(),
            Expr::Column(id) => self.column_type(id, row),
            Expr::Member { base, .. } => match self.scalar(base, row) {
                ScalarType::Dynamic => ScalarType::Dynamic,
                _ => ScalarType::Unknown,
            },
            Expr::Index { base, index } => {
                self.scalar(base, row);
                self.scalar(index, row);
                ScalarType::Dynamic
            }
            Expr::Call(call) => {
                let mut arg_types = Vec::new();
                for arg in &call.args {
                    match arg {
                        Arg::Expr(e) => arg_types.push(self.scalar(e, row)),
                        Arg::Tabular(p) => {
                            self.pipeline(p);
                            arg_types.push(ScalarType::Unknown);
                        }
                        Arg::Star => {}
                    }
                }
                function_type(&call.name.name, &arg_types)
            }
            Expr::Unary { operand, .. } => self.scalar(operand, row),
            Expr::Binary { op, lhs, rhs } => {
                let l = self.scalar(lhs, row);
                let r = self.scalar(rhs, row);
                if op.is_comparison() && !l.is_comparable_with(r) {
                    let span = expr.first_span().unwrap_or_default();
                    self.report(
                        span,
                        format!("Cannot compare values of types {l} and {r}. Try adding explicit casts"),
                    );
                }
                if op.is_arithmetic() {
                    arithmetic_type(op, l, r)
                } else {
                    ScalarType::Bool
                }
            }
            Expr::Between {
                operand, low, high, ..
            } => {
                self.scalar(operand, row);
                self.scalar(low, row);
                self.scalar(high, row);
                ScalarType::Bool
            }
            Expr::In { operand, list, .. } => {
                self.scalar(operand, row);
                match list {
                    InList::Values(values) => {
                        for v in values {
                            self.scalar(v, row);
                        }
                    }
                    InList::Tabular(p) => {
                        self.pipeline(p);
                    }
                }
                ScalarType::Bool
            }
        }
    }

    fn column_type(&mut self, id: &Ident, row: Option<&[Column]>) -> ScalarType {
        if let Some(c) = row.and_then(|cols| cols.iter().find(|c| c.name == id.name)) {
            return c.ty;
        }
        match self.bindings.get(&id.name) {
            Some(Binding::Scalar(ty)) => return *ty,
            Some(_) => return ScalarType::Unknown,
            None => {}
        }
        let is_table = self.db.is_some_and(|db| db.table(&id.name).is_some());
        if row.is_some() && !is_table && !id.name.starts_with('$') {
            self.report(id.span, unknown_column(&id.name));
        }
        ScalarType::Unknown
    }
}

// =============================================================================
// Naming and typing helpers
// =============================================================================

fn is_tabular_wrapper(name: &str) -> bool {
    matches!(name, "materialize" | "view" | "table")
}

fn parse_type(name: &str) -> ScalarType {
    name.parse().unwrap_or(ScalarType::Unknown)
}

fn next_column(ordinal: &mut usize) -> String {
    *ordinal += 1;
    format!("Column{ordinal}")
}

fn column_name(item: &NamedExpr, ordinal: &mut usize) -> String {
    match &item.name {
        Some(n) => n.name.clone(),
        None => item.expr.path_name().unwrap_or_else(|| next_column(ordinal)),
    }
}

/// `bin(TimeGenerated, 1h)` in a by-clause keeps the column name.
fn group_key_name(expr: &Expr) -> Option<String> {
    match expr {
        Expr::Call(call) if matches!(call.name.name.as_str(), "bin" | "bin_at" | "floor") => {
            call.expr_args().next().and_then(Expr::path_name)
        }
        _ => expr.path_name(),
    }
}

/// Kusto's default name for an unnamed aggregate, e.g. `dcount(Ip)` → `dcount_Ip`.
fn aggregate_name(expr: &Expr) -> Option<String> {
    let Expr::Call(call) = expr else {
        return expr.path_name();
    };
    let prefix = match call.name.name.as_str() {
        "make_set" | "makeset" | "make_set_if" => "set",
        "make_list" | "makelist" | "make_list_if" => "list",
        "make_bag" | "make_bag_if" => "bag",
        "take_any" | "any" | "take_anyif" | "anyif" => "any",
        other => other,
    };
    Some(match call.expr_args().next().and_then(Expr::path_name) {
        Some(arg) => format!("{prefix}_{arg}"),
        None => format!("{prefix}_"),
    })
}

fn join_key_name(expr: &Expr) -> Option<String> {
    match expr {
        Expr::Column(id) => Some(id.name.clone()),
        Expr::Binary { rhs, .. } => match rhs.as_ref() {
            Expr::Member { member, .. } => Some(member.name.clone()),
            _ => None,
        },
        _ => None,
    }
}

/// Append a column, suffixing `1`, `2`, ... on a name collision.
fn push_column(out: &mut Vec<Column>, name: String, ty: ScalarType) {
    let mut candidate = name.clone();
    let mut n = 0;
    while out.iter().any(|c| c.name == candidate) {
        n += 1;
        candidate = format!("{name}{n}");
    }
    out.push(Column::new(candidate, ty));
}

/// Replace a column of the same name or append a new one.
fn set_column(out: &mut Vec<Column>, name: String, ty: ScalarType) {
    match out.iter_mut().find(|c| c.name == name) {
        Some(c) => c.ty = ty,
        None => out.push(Column::new(name, ty)),
    }
}

fn wildcard_match(pattern: &str, name: &str) -> bool {
    let parts: Vec<&str> = pattern.split('*').collect();
    if parts.len() == 1 {
        return pattern == name;
    }
    let last = parts.len() - 1;
    let mut rest = name;
    for (i, part) in parts.iter().enumerate() {
        if i == 0 {
            match rest.strip_prefix(part) {
                Some(r) => rest = r,
                None => return false,
            }
        } else if i == last {
            return rest.ends_with(part);
        } else {
            match rest.find(part) {
                Some(idx) => rest = &rest[idx + part.len()..],
                None => return false,
            }
        }
    }
    true
}

fn arithmetic_type(op: &BinaryOp, l: ScalarType, r: ScalarType) -> ScalarType {
    use ScalarType::*;
    match (op, l, r) {
        (_, Unknown, _) | (_, _, Unknown) => Unknown,
        (BinaryOp::Sub, DateTime, DateTime) => TimeSpan,
        (BinaryOp::Add | BinaryOp::Sub, DateTime, TimeSpan) | (BinaryOp::Add, TimeSpan, DateTime) => {
            DateTime
        }
        (BinaryOp::Add | BinaryOp::Sub, TimeSpan, TimeSpan) => TimeSpan,
        (BinaryOp::Div, TimeSpan, TimeSpan) => Real,
        (BinaryOp::Mul | BinaryOp::Div, TimeSpan, n) if n.is_numeric() => TimeSpan,
        (_, a, b) if a.is_numeric() && b.is_numeric() => a.widen(b),
        (_, Dynamic, _) | (_, _, Dynamic) => Dynamic,
        _ => Unknown,
    }
}

/// Return type of a built-in function given its argument types.
fn function_type(name: &str, args: &[ScalarType]) -> ScalarType {
    use ScalarType::*;
    let first = args.first().copied().unwrap_or(Unknown);
    match name {
        "count" | "countif" | "dcount" | "dcountif" | "strlen" | "tolong" | "array_length"
        | "indexof" | "countof" | "datetime_diff" | "hash" | "row_number" | "estimate_data_size" => {
            Long
        }
        "toint" | "getyear" | "getmonth" | "dayofmonth" | "dayofyear" | "weekofyear"
        | "hourofday" => Int,
        "avg" | "avgif" | "stdev" | "stdevif" | "variance" | "todouble" | "toreal" | "log"
        | "log10" | "log2" | "exp" | "sqrt" | "pow" | "rand" => Real,
        "todecimal" => Decimal,
        "tostring" | "strcat" | "strcat_delim" | "tolower" | "toupper" | "substring" | "trim"
        | "trim_start" | "trim_end" | "replace" | "replace_string" | "replace_regex"
        | "extract" | "format_datetime" | "format_timespan" | "tohex" | "url_encode"
        | "url_decode" | "base64_encode_tostring" | "base64_decode_tostring" | "strrep"
        | "reverse" | "gettype" | "hash_sha256" | "hash_md5" | "hash_sha1" | "dayofweek_name" => {
            String
        }
        "ago" | "now" | "todatetime" | "datetime_add" | "startofday" | "startofweek"
        | "startofmonth" | "startofyear" | "endofday" | "endofweek" | "endofmonth"
        | "endofyear" | "make_datetime" | "unixtime_seconds_todatetime"
        | "unixtime_milliseconds_todatetime" => DateTime,
        "totimespan" | "make_timespan" | "dayofweek" => TimeSpan,
        "isempty" | "isnotempty" | "isnull" | "isnotnull" | "tobool" | "toboolean" | "not"
        | "ipv4_is_private" | "ipv4_is_match" | "ipv4_is_in_range" | "set_has_element"
        | "has_ipv4" | "has_ipv4_prefix" | "has_any_ipv4" => Bool,
        "toguid" | "new_guid" => Guid,
        "parse_json" | "todynamic" | "parse_url" | "parse_path" | "split" | "extract_all"
        | "pack" | "bag_pack" | "pack_array" | "make_set" | "make_list" | "make_bag"
        | "make_set_if" | "make_list_if" | "make_bag_if" | "set_union" | "set_intersect"
        | "set_difference" | "array_concat" | "array_slice" | "bag_keys" | "bag_merge"
        | "zip" | "geo_info_from_ip_address" | "parse_xml" => Dynamic,
        "min" | "max" | "sum" | "minif" | "maxif" | "sumif" | "any" | "take_any"
        | "take_anyif" | "arg_max" | "arg_min" | "bin" | "bin_at" | "floor" | "abs"
        | "round" | "ceiling" | "percentile" | "coalesce" => first,
        "iff" | "iif" | "case" => args.get(1).copied().unwrap_or(Unknown),
        _ => Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_query;
    use crate::schema::Table;

    fn db() -> Database {
        Database::from_tables(
            "test",
            [
                Table::new(
                    "SecurityEvent",
                    [
                        ("TimeGenerated", "datetime"),
                        ("Computer", "string"),
                        ("Account", "string"),
                        ("EventID", "int"),
                    ],
                )
                .unwrap(),
                Table::new("SigninLogs", [("TimeGenerated", "datetime"), ("UserPrincipalName", "string"), ("IPAddress", "string")])
                    .unwrap(),
            ],
        )
        .unwrap()
    }

    fn columns(text: &str, db: Option<&Database>) -> Option<Vec<String>> {
        let query = parse_query(text).unwrap();
        analyze_query(&query, db)
            .output_columns
            .map(|cols| cols.into_iter().map(|c| c.name).collect())
    }

    fn messages(text: &str) -> Vec<String> {
        let query = parse_query(text).unwrap();
        let db = db();
        analyze_query(&query, Some(&db))
            .diagnostics
            .into_iter()
            .map(|d| d.message)
            .collect()
    }

    #[test]
    fn project_columns_known_without_schema() {
        assert_eq!(
            columns("T | project Account, Host = Computer, tolower(Name)", None),
            Some(vec!["Account".into(), "Host".into(), "Column1".into()])
        );
    }

    #[test]
    fn table_columns_unknown_without_schema() {
        assert_eq!(columns("SecurityEvent | where EventID == 4625", None), None);
    }

    #[test]
    fn table_columns_from_schema() {
        let db = db();
        assert_eq!(
            columns("SecurityEvent | project-away EventID", Some(&db)),
            Some(vec!["TimeGenerated".into(), "Computer".into(), "Account".into()])
        );
    }

    #[test]
    fn summarize_default_names() {
        assert_eq!(
            columns(
                "T | summarize count(), dcount(IpAddress), make_set(Computer), Total = sum(Bytes) by Account, bin(TimeGenerated, 1h)",
                None
            ),
            Some(vec![
                "Account".into(),
                "TimeGenerated".into(),
                "count_".into(),
                "dcount_IpAddress".into(),
                "set_Computer".into(),
                "Total".into(),
            ])
        );
    }

    #[test]
    fn arg_max_star_expands_input() {
        let db = db();
        assert_eq!(
            columns("SecurityEvent | summarize arg_max(TimeGenerated, *) by Computer", Some(&db)),
            Some(vec![
                "Computer".into(),
                "TimeGenerated".into(),
                "Account".into(),
                "EventID".into(),
            ])
        );
        assert_eq!(columns("T | summarize arg_max(TimeGenerated, *) by Computer", None), None);
    }

    #[test]
    fn extend_applies_progressively() {
        let db = db();
        let cols = columns("SecurityEvent | extend A = 1, B = A + 1 | project A, B", Some(&db));
        assert_eq!(cols, Some(vec!["A".into(), "B".into()]));
        assert!(messages("SecurityEvent | extend A = 1, B = A + 1").is_empty());
    }

    #[test]
    fn let_bound_tabular_expression() {
        let db = db();
        let cols = columns(
            "let failures = SecurityEvent | where EventID == 4625;\nfailures | project Account",
            Some(&db),
        );
        assert_eq!(cols, Some(vec!["Account".into()]));
    }

    #[test]
    fn join_renames_duplicate_columns() {
        let db = db();
        let cols = columns(
            "SecurityEvent | project Computer, Account | join kind=inner (SigninLogs | project Account = UserPrincipalName, IPAddress) on Account",
            Some(&db),
        );
        assert_eq!(
            cols,
            Some(vec!["Computer".into(), "Account".into(), "Account1".into(), "IPAddress".into()])
        );
    }

    #[test]
    fn leftsemi_join_keeps_left_columns() {
        let db = db();
        let cols = columns(
            "SecurityEvent | project Account | join kind=leftsemi (SigninLogs | project Account = UserPrincipalName) on Account",
            Some(&db),
        );
        assert_eq!(cols, Some(vec!["Account".into()]));
    }

    #[test]
    fn count_and_getschema() {
        assert_eq!(columns("T | count", None), Some(vec!["Count".into()]));
        assert_eq!(
            columns("T | getschema", None).map(|c| c.len()),
            Some(4)
        );
    }

    #[test]
    fn opaque_operator_loses_columns() {
        let db = db();
        assert_eq!(columns("SecurityEvent | evaluate bag_unpack(x)", Some(&db)), None);
        assert!(columns("SecurityEvent | render timechart", Some(&db)).is_some());
    }

    #[test]
    fn reports_unknown_table() {
        let msgs = messages("SecurityEvnt | take 1");
        assert_eq!(msgs.len(), 1);
        assert!(msgs[0].contains("'SecurityEvnt' does not refer to any known table"), "{msgs:?}");
    }

    #[test]
    fn reports_unknown_column() {
        let msgs = messages("SecurityEvent | where EventId == 4625");
        assert_eq!(msgs.len(), 1);
        assert!(msgs[0].contains("'EventId' does not refer to any known column"), "{msgs:?}");
    }

    #[test]
    fn let_scalars_are_not_columns() {
        assert!(messages("let threshold = 5;\nSecurityEvent | where EventID > threshold").is_empty());
    }

    #[test]
    fn reports_incomparable_types() {
        let msgs = messages("SecurityEvent | where Computer == 5");
        assert_eq!(msgs.len(), 1);
        assert!(msgs[0].starts_with("Cannot compare values of types string and long"), "{msgs:?}");
    }

    #[test]
    fn datetime_comparisons_are_fine() {
        assert!(messages("SecurityEvent | where TimeGenerated > ago(1d) and EventID in (4624, 4625)").is_empty());
    }

    #[test]
    fn checks_join_sides() {
        let msgs = messages(
            "SecurityEvent | join kind=inner (SigninLogs) on $left.Account == $right.Nope",
        );
        assert_eq!(msgs.len(), 1);
        assert!(msgs[0].contains("'Nope'"), "{msgs:?}");
    }

    #[test]
    fn no_diagnostics_without_schema() {
        let query = parse_query("Anything | where Foo == 1").unwrap();
        assert!(analyze_query(&query, None).diagnostics.is_empty());
    }

    #[test]
    fn wildcard_matching() {
        assert!(wildcard_match("Event*", "EventID"));
        assert!(wildcard_match("*ID", "EventID"));
        assert!(wildcard_match("E*t*D", "EventID"));
        assert!(!wildcard_match("Event", "EventID"));
        assert!(!wildcard_match("a*a", "a"));
    }
}
