//! Filter type definitions
//!
//! `FilterCondition` is the wire form agents send. Each condition compiles
//! into a `Predicate`, a small tagged AST whose `Display` renders the SQL
//! fragment. New operators or escaping rules go into `compile`/`fmt` rather
//! than into ad hoc string building.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;

use crate::data::error::StoreError;
use crate::utils::sql::{escape_like_pattern, quote_literal};

/// Dotted identifiers only (`status`, `meta.owner`); anything else would be
/// spliced into the predicate verbatim.
static FIELD_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)*$").expect("Invalid regex")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOp {
    #[serde(alias = "=", alias = "==")]
    Eq,
    #[serde(alias = "!=", alias = "<>", alias = "ne")]
    Neq,
    #[serde(alias = ">")]
    Gt,
    #[serde(alias = ">=")]
    Gte,
    #[serde(alias = "<")]
    Lt,
    #[serde(alias = "<=")]
    Lte,
    In,
    Contains,
}

impl FilterOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Eq => "eq",
            Self::Neq => "neq",
            Self::Gt => "gt",
            Self::Gte => "gte",
            Self::Lt => "lt",
            Self::Lte => "lte",
            Self::In => "in",
            Self::Contains => "contains",
        }
    }
}

impl fmt::Display for FilterOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Condition value as supplied by the caller
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    List(Vec<FilterValue>),
}

impl From<&str> for FilterValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<i64> for FilterValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<i32> for FilterValue {
    fn from(value: i32) -> Self {
        Self::Integer(value.into())
    }
}

impl From<f64> for FilterValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for FilterValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl<T: Into<FilterValue>> From<Vec<T>> for FilterValue {
    fn from(values: Vec<T>) -> Self {
        Self::List(values.into_iter().map(Into::into).collect())
    }
}

/// One `field <op> value` condition; a query ANDs all of them
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FilterCondition {
    pub field: String,
    #[serde(alias = "op")]
    pub operator: FilterOp,
    pub value: FilterValue,
}

impl FilterCondition {
    pub fn new(field: impl Into<String>, operator: FilterOp, value: impl Into<FilterValue>) -> Self {
        Self {
            field: field.into(),
            operator,
            value: value.into(),
        }
    }
}

/// Scalar SQL literal
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(true) => f.write_str("TRUE"),
            Self::Bool(false) => f.write_str("FALSE"),
            Self::Integer(v) => write!(f, "{}", v),
            // Debug keeps the decimal point (3.0 rather than 3)
            Self::Float(v) => write!(f, "{:?}", v),
            Self::String(s) => f.write_str(&quote_literal(s)),
        }
    }
}

/// Compiled condition
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Eq { field: String, value: Literal },
    Neq { field: String, value: Literal },
    Gt { field: String, value: Literal },
    Gte { field: String, value: Literal },
    Lt { field: String, value: Literal },
    Lte { field: String, value: Literal },
    In { field: String, values: Vec<Literal> },
    Contains { field: String, value: Literal },
}

impl Predicate {
    /// Validate a condition and turn it into a predicate node
    pub fn compile(condition: &FilterCondition) -> Result<Self, StoreError> {
        let field = &condition.field;
        if !FIELD_PATTERN.is_match(field) {
            return Err(StoreError::invalid_condition(
                field,
                "field must be an identifier (letters, digits, '_', dotted paths)",
            ));
        }

        let op = condition.operator;
        let scalar = || scalar_literal(&condition.field, op, &condition.value);
        let field = field.clone();
        let predicate = match op {
            FilterOp::Eq => Self::Eq { value: scalar()?, field },
            FilterOp::Neq => Self::Neq { value: scalar()?, field },
            FilterOp::Gt => Self::Gt { value: scalar()?, field },
            FilterOp::Gte => Self::Gte { value: scalar()?, field },
            FilterOp::Lt => Self::Lt { value: scalar()?, field },
            FilterOp::Lte => Self::Lte { value: scalar()?, field },
            FilterOp::Contains => Self::Contains { value: scalar()?, field },
            FilterOp::In => Self::In {
                values: list_literals(&condition.field, op, &condition.value)?,
                field,
            },
        };
        Ok(predicate)
    }

    pub fn field(&self) -> &str {
        match self {
            Self::Eq { field, .. }
            | Self::Neq { field, .. }
            | Self::Gt { field, .. }
            | Self::Gte { field, .. }
            | Self::Lt { field, .. }
            | Self::Lte { field, .. }
            | Self::In { field, .. }
            | Self::Contains { field, .. } => field,
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Eq { field, value } => write!(f, "{} = {}", field, value),
            Self::Neq { field, value } => write!(f, "{} != {}", field, value),
            Self::Gt { field, value } => write!(f, "{} > {}", field, value),
            Self::Gte { field, value } => write!(f, "{} >= {}", field, value),
            Self::Lt { field, value } => write!(f, "{} < {}", field, value),
            Self::Lte { field, value } => write!(f, "{} <= {}", field, value),
            Self::In { field, values } => {
                let rendered: Vec<String> = values.iter().map(ToString::to_string).collect();
                write!(f, "{} IN ({})", field, rendered.join(", "))
            }
            Self::Contains {
                field,
                value: Literal::String(s),
            } => {
                let pattern = format!("%{}%", escape_like_pattern(s));
                write!(f, "{} LIKE {} ESCAPE '\\'", field, quote_literal(&pattern))
            }
            // Non-string needle: membership in a list column
            Self::Contains { field, value } => write!(f, "array_contains({}, {})", field, value),
        }
    }
}

fn scalar_literal(field: &str, op: FilterOp, value: &FilterValue) -> Result<Literal, StoreError> {
    match value {
        FilterValue::Bool(b) => Ok(Literal::Bool(*b)),
        FilterValue::Integer(i) => Ok(Literal::Integer(*i)),
        FilterValue::Float(v) if v.is_finite() => Ok(Literal::Float(*v)),
        FilterValue::Float(v) => Err(StoreError::invalid_condition(
            field,
            format!("non-finite number {} is not allowed", v),
        )),
        FilterValue::String(s) => Ok(Literal::String(s.clone())),
        FilterValue::List(_) => Err(StoreError::invalid_condition(
            field,
            format!("operator '{}' expects a single value, got a list", op),
        )),
    }
}

fn list_literals(field: &str, op: FilterOp, value: &FilterValue) -> Result<Vec<Literal>, StoreError> {
    let FilterValue::List(items) = value else {
        return Err(StoreError::invalid_condition(
            field,
            format!("operator '{}' expects a list of values", op),
        ));
    };
    if items.is_empty() {
        return Err(StoreError::invalid_condition(
            field,
            format!("operator '{}' needs at least one value", op),
        ));
    }
    items
        .iter()
        .map(|item| match item {
            FilterValue::List(_) => Err(StoreError::invalid_condition(
                field,
                "nested lists are not supported",
            )),
            scalar => scalar_literal(field, op, scalar),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(condition: FilterCondition) -> String {
        Predicate::compile(&condition).unwrap().to_string()
    }

    #[test]
    fn string_eq_is_quoted() {
        let sql = render(FilterCondition::new("status", FilterOp::Eq, "active"));
        assert_eq!(sql, "status = 'active'");
    }

    #[test]
    fn number_gt_is_bare() {
        let sql = render(FilterCondition::new("priority", FilterOp::Gt, 3));
        assert_eq!(sql, "priority > 3");
    }

    #[test]
    fn comparison_operators() {
        let operators = [
            (FilterOp::Eq, "="),
            (FilterOp::Neq, "!="),
            (FilterOp::Gt, ">"),
            (FilterOp::Gte, ">="),
            (FilterOp::Lt, "<"),
            (FilterOp::Lte, "<="),
        ];

        for (op, expected_op) in operators {
            let sql = render(FilterCondition::new("score", op, 0.5));
            assert_eq!(sql, format!("score {} 0.5", expected_op));
        }
    }

    #[test]
    fn float_keeps_decimal_point() {
        let sql = render(FilterCondition::new("score", FilterOp::Gte, 3.0));
        assert_eq!(sql, "score >= 3.0");
    }

    #[test]
    fn bool_literal() {
        let sql = render(FilterCondition::new("archived", FilterOp::Eq, false));
        assert_eq!(sql, "archived = FALSE");
    }

    #[test]
    fn string_with_quote_is_escaped() {
        let sql = render(FilterCondition::new("owner", FilterOp::Eq, "O'Brien"));
        assert_eq!(sql, "owner = 'O''Brien'");
    }

    #[test]
    fn in_quotes_each_element_by_type() {
        let condition = FilterCondition {
            field: "category".to_string(),
            operator: FilterOp::In,
            value: FilterValue::List(vec![
                FilterValue::from("a"),
                FilterValue::from(2),
                FilterValue::from(true),
            ]),
        };
        assert_eq!(render(condition), "category IN ('a', 2, TRUE)");
    }

    #[test]
    fn contains_string_uses_like() {
        let sql = render(FilterCondition::new("title", FilterOp::Contains, "50%_off"));
        assert_eq!(sql, r"title LIKE '%50\%\_off%' ESCAPE '\'");
    }

    #[test]
    fn contains_number_uses_array_contains() {
        let sql = render(FilterCondition::new("tags", FilterOp::Contains, 7));
        assert_eq!(sql, "array_contains(tags, 7)");
    }

    #[test]
    fn dotted_field_allowed() {
        let sql = render(FilterCondition::new("meta.owner", FilterOp::Eq, "ana"));
        assert_eq!(sql, "meta.owner = 'ana'");
    }

    #[test]
    fn rejects_injected_field() {
        for field in ["status; DROP TABLE events", "1abc", "", "a b", "a..b", "x'"] {
            let err = Predicate::compile(&FilterCondition::new(field, FilterOp::Eq, 1)).unwrap_err();
            assert!(matches!(err, StoreError::InvalidCondition { .. }), "{field}");
        }
    }

    #[test]
    fn rejects_in_with_scalar() {
        let err = Predicate::compile(&FilterCondition::new("status", FilterOp::In, "a")).unwrap_err();
        assert!(matches!(err, StoreError::InvalidCondition { .. }));
    }

    #[test]
    fn rejects_in_with_empty_list() {
        let empty: Vec<String> = vec![];
        let err = Predicate::compile(&FilterCondition::new("status", FilterOp::In, empty)).unwrap_err();
        assert!(matches!(err, StoreError::InvalidCondition { .. }));
    }

    #[test]
    fn rejects_nested_list() {
        let condition = FilterCondition {
            field: "status".to_string(),
            operator: FilterOp::In,
            value: FilterValue::List(vec![FilterValue::from(vec![1, 2])]),
        };
        assert!(Predicate::compile(&condition).is_err());
    }

    #[test]
    fn rejects_list_for_comparison() {
        let err = Predicate::compile(&FilterCondition::new("priority", FilterOp::Gt, vec![1, 2])).unwrap_err();
        assert!(err.to_string().contains("expects a single value"));
    }

    #[test]
    fn rejects_non_finite_float() {
        assert!(Predicate::compile(&FilterCondition::new("score", FilterOp::Lt, f64::NAN)).is_err());
        assert!(Predicate::compile(&FilterCondition::new("score", FilterOp::Lt, f64::INFINITY)).is_err());
    }

    #[test]
    fn deserialize_named_and_symbolic_operators() {
        let json = r#"[
            {"field": "status", "operator": "eq", "value": "active"},
            {"field": "priority", "op": ">=", "value": 2},
            {"field": "score", "operator": "lt", "value": 0.75},
            {"field": "kind", "operator": "in", "value": ["a", "b"]},
            {"field": "flag", "operator": "!=", "value": true}
        ]"#;
        let conditions: Vec<FilterCondition> = serde_json::from_str(json).unwrap();

        assert_eq!(conditions[0], FilterCondition::new("status", FilterOp::Eq, "active"));
        assert_eq!(conditions[1], FilterCondition::new("priority", FilterOp::Gte, 2));
        assert_eq!(conditions[2], FilterCondition::new("score", FilterOp::Lt, 0.75));
        assert_eq!(conditions[3], FilterCondition::new("kind", FilterOp::In, vec!["a", "b"]));
        assert_eq!(conditions[4], FilterCondition::new("flag", FilterOp::Neq, true));
    }

    #[test]
    fn predicate_field_accessor() {
        let predicate = Predicate::compile(&FilterCondition::new("kind", FilterOp::In, vec![1])).unwrap();
        assert_eq!(predicate.field(), "kind");
    }
}
