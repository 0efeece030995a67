//! Paging, filtering and sorting for store queries.
//!
//! Criteria are evaluated against the JSON form of an entity so one
//! implementation serves every store. Left operands are dotted paths; a path
//! not found at the top level is also looked up inside the entity's
//! `properties` object, which is where assets keep their metadata.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ServiceError;

/// Comparison operator of a [`Criterion`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operator {
    /// Textual equality.
    #[serde(rename = "=")]
    Eq,
    /// Textual inequality.
    #[serde(rename = "!=")]
    NotEq,
    /// Membership in a list (`in (a, b)` or a JSON array).
    #[serde(rename = "in")]
    In,
    /// Pattern match where `%` matches any run of characters.
    #[serde(rename = "like")]
    Like,
}

impl Operator {
    fn parse(token: &str) -> Option<Self> {
        match token.to_ascii_lowercase().as_str() {
            "=" => Some(Self::Eq),
            "!=" => Some(Self::NotEq),
            "in" => Some(Self::In),
            "like" => Some(Self::Like),
            _ => None,
        }
    }
}

/// A single filter expression: `left operator right`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Criterion {
    /// Dotted path into the entity.
    pub operand_left: String,
    /// Comparison operator.
    pub operator: Operator,
    /// Value to compare against.
    pub operand_right: Value,
}

impl Criterion {
    /// Creates a criterion.
    pub fn new(left: impl Into<String>, operator: Operator, right: impl Into<Value>) -> Self {
        Self {
            operand_left: left.into(),
            operator,
            operand_right: right.into(),
        }
    }

    /// Shorthand for `left = right`.
    pub fn equals(left: impl Into<String>, right: impl Into<Value>) -> Self {
        Self::new(left, Operator::Eq, right)
    }

    /// Parses `"left op right"`. `=` and `!=` may also be written without
    /// surrounding spaces.
    pub fn parse(expression: &str) -> Result<Self, ServiceError> {
        let expression = expression.trim();
        let invalid =
            || ServiceError::BadRequest(format!("Invalid filter expression '{expression}'"));

        let (first, rest) = next_token(expression);
        if first.is_empty() {
            return Err(invalid());
        }
        let (op, right) = next_token(rest);
        match (op.is_empty(), right.is_empty()) {
            (false, false) => {
                let operator = Operator::parse(op).ok_or_else(invalid)?;
                Ok(Self::new(first, operator, right))
            }
            (true, _) => {
                let (left, operator, right) = if let Some((l, r)) = first.split_once("!=") {
                    (l, Operator::NotEq, r)
                } else if let Some((l, r)) = first.split_once('=') {
                    (l, Operator::Eq, r)
                } else {
                    return Err(invalid());
                };
                if left.is_empty() {
                    return Err(invalid());
                }
                Ok(Self::new(left, operator, right))
            }
            _ => Err(invalid()),
        }
    }

    /// Evaluates this criterion against an entity's JSON form.
    pub fn matches(&self, entity: &Value) -> bool {
        let Some(left) = lookup(entity, &self.operand_left) else {
            return self.operator == Operator::NotEq;
        };
        let left = as_text(left);
        match self.operator {
            Operator::Eq => left == as_text(&self.operand_right),
            Operator::NotEq => left != as_text(&self.operand_right),
            Operator::In => in_list(&self.operand_right).iter().any(|v| *v == left),
            Operator::Like => like(&left, &as_text(&self.operand_right)),
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SortOrder {
    /// Ascending (default).
    #[default]
    Asc,
    /// Descending.
    Desc,
}

/// Paging, filtering and sorting parameters for store queries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QuerySpec {
    /// Number of matching entities to skip.
    pub offset: usize,
    /// Maximum number of entities returned.
    pub limit: usize,
    /// All criteria must match.
    pub filter: Vec<Criterion>,
    /// Field to sort by; insertion order when absent.
    pub sort_field: Option<String>,
    /// Sort direction.
    pub sort_order: SortOrder,
}

impl Default for QuerySpec {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: Self::DEFAULT_LIMIT,
            filter: Vec::new(),
            sort_field: None,
            sort_order: SortOrder::Asc,
        }
    }
}

impl QuerySpec {
    /// Page size used when none is given.
    pub const DEFAULT_LIMIT: usize = 50;

    /// A query returning every entity.
    pub fn all() -> Self {
        Self {
            limit: usize::MAX,
            ..Self::default()
        }
    }

    /// Adds a criterion, builder style.
    #[must_use]
    pub fn with_filter(mut self, criterion: Criterion) -> Self {
        self.filter.push(criterion);
        self
    }

    /// Returns `true` if the entity satisfies every criterion.
    pub fn matches(&self, entity: &Value) -> bool {
        self.filter.iter().all(|c| c.matches(entity))
    }

    /// Filters, sorts and pages `items`.
    ///
    /// Items that cannot be serialised never match.
    pub fn apply<T: Serialize>(&self, items: impl IntoIterator<Item = T>) -> Vec<T> {
        let mut matching: Vec<(Value, T)> = items
            .into_iter()
            .filter_map(|item| serde_json::to_value(&item).ok().map(|json| (json, item)))
            .filter(|(json, _)| self.matches(json))
            .collect();

        if let Some(field) = &self.sort_field {
            matching.sort_by(|(a, _), (b, _)| {
                let ordering = compare(lookup(a, field), lookup(b, field));
                match self.sort_order {
                    SortOrder::Asc => ordering,
                    SortOrder::Desc => ordering.reverse(),
                }
            });
        }

        matching
            .into_iter()
            .skip(self.offset)
            .take(self.limit)
            .map(|(_, item)| item)
            .collect()
    }
}

/// Splits off the first whitespace-delimited token; the remainder is trimmed.
fn next_token(input: &str) -> (&str, &str) {
    let input = input.trim_start();
    input
        .split_once(char::is_whitespace)
        .map_or((input, ""), |(token, rest)| (token, rest.trim()))
}

fn lookup<'v>(entity: &'v Value, path: &str) -> Option<&'v Value> {
    if let Some(found) = entity.get(path) {
        return Some(found);
    }
    let walked = path
        .split('.')
        .try_fold(entity, |current, segment| current.get(segment));
    walked.or_else(|| entity.get("properties").and_then(|p| p.get(path)))
}

fn as_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn in_list(right: &Value) -> Vec<String> {
    match right {
        Value::Array(items) => items.iter().map(as_text).collect(),
        other => as_text(other)
            .trim()
            .trim_start_matches('(')
            .trim_end_matches(')')
            .split(',')
            .map(|s| s.trim().to_owned())
            .filter(|s| !s.is_empty())
            .collect(),
    }
}

fn like(text: &str, pattern: &str) -> bool {
    let pieces: Vec<&str> = pattern.split('%').collect();
    if pieces.len() == 1 {
        return text == pattern;
    }
    let (first, last) = (pieces[0], pieces[pieces.len() - 1]);
    if !text.starts_with(first) || text.len() < first.len() + last.len() || !text.ends_with(last) {
        return false;
    }
    let mut rest = &text[first.len()..text.len() - last.len()];
    for piece in &pieces[1..pieces.len() - 1] {
        match rest.find(piece) {
            Some(at) => rest = &rest[at + piece.len()..],
            None => return false,
        }
    }
    true
}

fn compare(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(x), Some(y)) => as_text(x).cmp(&as_text(y)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Serialize)]
    struct Item {
        id: &'static str,
        size: u32,
        properties: std::collections::BTreeMap<&'static str, &'static str>,
    }

    fn items() -> Vec<Item> {
        vec![
            Item { id: "a", size: 10, properties: [("type", "file")].into() },
            Item { id: "b", size: 2, properties: [("type", "s3")].into() },
            Item { id: "c", size: 33, properties: [("type", "file")].into() },
        ]
    }

    fn ids(items: Vec<Item>) -> Vec<&'static str> {
        items.into_iter().map(|i| i.id).collect()
    }

    #[test]
    fn parses_spaced_and_compact_expressions() {
        assert_eq!(Criterion::parse("id = a").unwrap(), Criterion::equals("id", "a"));
        assert_eq!(Criterion::parse("id=a").unwrap(), Criterion::equals("id", "a"));
        assert_eq!(
            Criterion::parse("id!=a").unwrap(),
            Criterion::new("id", Operator::NotEq, "a")
        );
        assert_eq!(
            Criterion::parse("id in (a, b)").unwrap().operator,
            Operator::In
        );
        assert_eq!(
            Criterion::parse("id  =  asset-1").unwrap(),
            Criterion::equals("id", "asset-1")
        );
        assert_eq!(
            Criterion::parse("\tid in  (a, b) ").unwrap().operand_right,
            json!("(a, b)")
        );
        assert!(Criterion::parse("id =").is_err());
        assert!(Criterion::parse("id ~ a").is_err());
        assert!(Criterion::parse("=a").is_err());
        assert!(Criterion::parse("").is_err());
    }

    #[test]
    fn filters_on_nested_properties() {
        let spec = QuerySpec::all().with_filter(Criterion::equals("type", "file"));
        assert_eq!(ids(spec.apply(items())), vec!["a", "c"]);
    }

    #[test]
    fn in_and_like_operators() {
        let entity = json!({ "id": "document-42" });
        assert!(Criterion::parse("id in (x, document-42)").unwrap().matches(&entity));
        assert!(Criterion::new("id", Operator::In, json!(["document-42"])).matches(&entity));
        assert!(Criterion::new("id", Operator::Like, "doc%42").matches(&entity));
        assert!(Criterion::new("id", Operator::Like, "%ment%").matches(&entity));
        assert!(!Criterion::new("id", Operator::Like, "%x%").matches(&entity));
        assert!(!Criterion::new("id", Operator::Like, "document-4").matches(&entity));
    }

    #[test]
    fn missing_fields_only_satisfy_inequality() {
        let entity = json!({ "id": "a" });
        assert!(!Criterion::equals("name", "a").matches(&entity));
        assert!(Criterion::new("name", Operator::NotEq, "a").matches(&entity));
    }

    #[test]
    fn sorts_numerically_and_pages() {
        let spec = QuerySpec {
            sort_field: Some("size".into()),
            sort_order: SortOrder::Desc,
            offset: 1,
            limit: 1,
            ..QuerySpec::default()
        };
        assert_eq!(ids(spec.apply(items())), vec!["a"]);
    }
}
