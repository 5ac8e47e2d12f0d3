//! CQL evaluation for fixture data.
//!
//! Understands the filters the panel generates: `AND`/`OR` groups in
//! parentheses, comparisons (`=`, `<>`, `<`, `<=`, `>`, `>=`),
//! `IS [NOT] NULL`, `[I]LIKE` with `%`/`_` wildcards, `IN (...)` and
//! `NOT(...)`.

use std::cmp::Ordering;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};

use attrlist_core::prelude::*;

static NULL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\S+) IS (NOT )?NULL$").expect("Invalid null pattern regex")
});

static IN_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\S+) IN \((.*)\)$").expect("Invalid IN pattern regex"));

static LIKE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\S+) (I?LIKE) (.+)$").expect("Invalid LIKE pattern regex"));

static COMPARE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\S+) (>=|<=|<>|=|>|<) (.+)$").expect("Invalid comparison pattern regex")
});

#[derive(Debug, Clone)]
enum Expr {
    All(Vec<Expr>),
    Any(Vec<Expr>),
    Not(Box<Expr>),
    IsNull(String),
    IsNotNull(String),
    Compare(String, CompareOp, Value),
    Like(String, Regex),
    In(String, Vec<Value>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CompareOp {
    fn from_token(token: &str) -> Option<Self> {
        match token {
            "=" => Some(Self::Eq),
            "<>" => Some(Self::Ne),
            "<" => Some(Self::Lt),
            "<=" => Some(Self::Le),
            ">" => Some(Self::Gt),
            ">=" => Some(Self::Ge),
            _ => None,
        }
    }

    fn holds(self, ord: Ordering) -> bool {
        match self {
            Self::Eq => ord == Ordering::Equal,
            Self::Ne => ord != Ordering::Equal,
            Self::Lt => ord == Ordering::Less,
            Self::Le => ord != Ordering::Greater,
            Self::Gt => ord == Ordering::Greater,
            Self::Ge => ord != Ordering::Less,
        }
    }
}

/// A parsed filter expression
#[derive(Debug, Clone)]
pub struct CqlFilter {
    expr: Expr,
}

impl CqlFilter {
    pub fn parse(cql: &str) -> Result<Self> {
        Ok(Self {
            expr: parse_or(cql.trim())?,
        })
    }

    pub fn matches(&self, attributes: &Map<String, Value>) -> bool {
        self.expr.matches(attributes)
    }
}

/// Split on `sep` where it is outside quotes and parentheses
fn split_top_level<'a>(s: &'a str, sep: &str) -> Vec<&'a str> {
    let mut parts = Vec::new();
    let mut in_quote = false;
    let mut depth = 0i32;
    let mut start = 0;
    let mut skip_until = 0;
    for (i, c) in s.char_indices() {
        if i < skip_until {
            continue;
        }
        match c {
            '\'' => in_quote = !in_quote,
            '(' if !in_quote => depth += 1,
            ')' if !in_quote => depth -= 1,
            _ if !in_quote && depth == 0 && s[i..].starts_with(sep) => {
                parts.push(&s[start..i]);
                start = i + sep.len();
                skip_until = start;
            }
            _ => {}
        }
    }
    parts.push(&s[start..]);
    parts
}

/// Inner text when `s` is one parenthesised group, e.g. `(a = 1 OR b = 2)`
fn enclosed(s: &str) -> Option<&str> {
    let inner = s.strip_prefix('(')?.strip_suffix(')')?;
    let mut in_quote = false;
    let mut depth = 0i32;
    for c in inner.chars() {
        match c {
            '\'' => in_quote = !in_quote,
            '(' if !in_quote => depth += 1,
            ')' if !in_quote => {
                depth -= 1;
                if depth < 0 {
                    return None;
                }
            }
            _ => {}
        }
    }
    (depth == 0).then_some(inner)
}

fn parse_or(s: &str) -> Result<Expr> {
    let parts = split_top_level(s, " OR ");
    if parts.len() == 1 {
        return parse_and(s);
    }
    parts
        .into_iter()
        .map(|p| parse_and(p.trim()))
        .collect::<Result<Vec<_>>>()
        .map(Expr::Any)
}

fn parse_and(s: &str) -> Result<Expr> {
    let parts = split_top_level(s, " AND ");
    if parts.len() == 1 {
        return parse_term(s);
    }
    parts
        .into_iter()
        .map(|p| parse_term(p.trim()))
        .collect::<Result<Vec<_>>>()
        .map(Expr::All)
}

fn parse_term(s: &str) -> Result<Expr> {
    if let Some(inner) = enclosed(s) {
        return parse_or(inner.trim());
    }
    if let Some(inner) = s.strip_prefix("NOT").and_then(|rest| enclosed(rest.trim_start())) {
        return Ok(Expr::Not(Box::new(parse_or(inner.trim())?)));
    }
    parse_comparison(s)
}

fn parse_comparison(s: &str) -> Result<Expr> {
    if let Some(caps) = NULL_PATTERN.captures(s) {
        let attribute = caps[1].to_string();
        return Ok(if caps.get(2).is_some() {
            Expr::IsNotNull(attribute)
        } else {
            Expr::IsNull(attribute)
        });
    }
    if let Some(caps) = IN_PATTERN.captures(s) {
        let values = split_top_level(&caps[2], ",")
            .into_iter()
            .map(|v| parse_literal(v.trim()))
            .collect::<Result<Vec<_>>>()?;
        return Ok(Expr::In(caps[1].to_string(), values));
    }
    if let Some(caps) = LIKE_PATTERN.captures(s) {
        let pattern = match parse_literal(caps[3].trim())? {
            Value::String(p) => p,
            other => other.to_string(),
        };
        let regex = like_regex(&pattern, &caps[2] == "LIKE")?;
        return Ok(Expr::Like(caps[1].to_string(), regex));
    }
    if let Some(caps) = COMPARE_PATTERN.captures(s) {
        if let Some(op) = CompareOp::from_token(&caps[2]) {
            return Ok(Expr::Compare(
                caps[1].to_string(),
                op,
                parse_literal(caps[3].trim())?,
            ));
        }
    }
    Err(Error::transport(format!("Unsupported filter: {}", s)))
}

/// Compile a LIKE pattern: `%` is any run of characters, `_` any one character
fn like_regex(pattern: &str, case_sensitive: bool) -> Result<Regex> {
    let mut source = String::from(if case_sensitive { "^" } else { "(?i)^" });
    for c in pattern.chars() {
        match c {
            '%' => source.push_str(".*"),
            '_' => source.push('.'),
            other => source.push_str(&regex::escape(other.encode_utf8(&mut [0; 4]))),
        }
    }
    source.push('$');
    Regex::new(&source).map_err(|e| Error::transport(format!("Invalid LIKE pattern: {}", e)))
}

fn parse_literal(s: &str) -> Result<Value> {
    if let Some(quoted) = s.strip_prefix('\'').and_then(|r| r.strip_suffix('\'')) {
        return Ok(Value::String(quoted.replace("''", "'")));
    }
    match s {
        "NULL" => Ok(Value::Null),
        "true" => Ok(Value::Bool(true)),
        "false" => Ok(Value::Bool(false)),
        _ => serde_json::from_str::<serde_json::Number>(s)
            .map(Value::Number)
            .map_err(|_| Error::transport(format!("Invalid filter value: {}", s))),
    }
}

/// Order two JSON values: numbers numerically, everything else as text
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Null, _) => Ordering::Less,
        (_, Value::Null) => Ordering::Greater,
        (Value::Number(x), Value::Number(y)) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        _ => text(a).cmp(&text(b)),
    }
}

fn text(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl Expr {
    fn matches(&self, attributes: &Map<String, Value>) -> bool {
        let get = |attr: &str| attributes.get(attr).unwrap_or(&Value::Null);
        match self {
            Expr::All(exprs) => exprs.iter().all(|e| e.matches(attributes)),
            Expr::Any(exprs) => exprs.iter().any(|e| e.matches(attributes)),
            Expr::Not(inner) => !inner.matches(attributes),
            Expr::IsNull(attr) => get(attr).is_null(),
            Expr::IsNotNull(attr) => !get(attr).is_null(),
            Expr::Compare(attr, op, literal) => {
                let value = get(attr);
                !value.is_null() && op.holds(compare_values(value, literal))
            }
            Expr::Like(attr, regex) => {
                let value = get(attr);
                !value.is_null() && regex.is_match(&text(value))
            }
            Expr::In(attr, values) => {
                let value = get(attr);
                values
                    .iter()
                    .any(|v| compare_values(value, v) == Ordering::Equal)
            }
        }
    }
}
