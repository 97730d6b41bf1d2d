//! Named parameter binding
//!
//! Statements reference parameters as `@name`; arguments are identified by
//! name, not position. Before execution every `@name` token outside a quoted
//! region is rewritten to the driver's `$n` placeholder, numbering names in
//! order of first appearance, and the matching values are bound once each.

use serde_json::{Map, Value};
use sqlx::postgres::PgArguments;
use sqlx::query::Query;
use sqlx::Postgres;

use crate::errors::{BridgeError, BridgeResult};

/// A scalar value ready to bind onto a statement
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl ParamValue {
    /// Convert a JSON parameter value; only scalars are accepted
    pub fn from_json(name: &str, value: &Value) -> BridgeResult<Self> {
        match value {
            Value::Null => Ok(ParamValue::Null),
            Value::Bool(b) => Ok(ParamValue::Bool(*b)),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(ParamValue::Int(i))
                } else if let Some(f) = n.as_f64() {
                    Ok(ParamValue::Float(f))
                } else {
                    Err(BridgeError::validation(format!(
                        "parameter '{}' is out of range",
                        name
                    )))
                }
            }
            Value::String(s) => Ok(ParamValue::Text(s.clone())),
            Value::Array(_) | Value::Object(_) => Err(BridgeError::validation(format!(
                "parameter '{}' must be a scalar value",
                name
            ))),
        }
    }

    /// Bind this value onto a query
    pub fn bind_to<'q>(
        &'q self,
        query: Query<'q, Postgres, PgArguments>,
    ) -> Query<'q, Postgres, PgArguments> {
        match self {
            ParamValue::Null => query.bind(None::<String>),
            ParamValue::Bool(b) => query.bind(*b),
            ParamValue::Int(i) => query.bind(*i),
            ParamValue::Float(f) => query.bind(*f),
            ParamValue::Text(s) => query.bind(s.as_str()),
        }
    }
}

/// Rewrite `@name` references to `$n` placeholders and collect the values
/// to bind, in placeholder order.
///
/// Quoted regions (single-quoted literals, double-quoted identifiers) are
/// left untouched, as are `@@` (text-search match) and `@` followed by a
/// non-identifier character (operators like `@>`). A referenced name absent
/// from `params` is a validation error; supplied-but-unreferenced
/// parameters are ignored.
pub fn bind_named(
    sql: &str,
    params: &Map<String, Value>,
) -> BridgeResult<(String, Vec<ParamValue>)> {
    let mut out = String::with_capacity(sql.len());
    let mut names: Vec<String> = Vec::new();
    let mut values: Vec<ParamValue> = Vec::new();

    let mut chars = sql.chars().peekable();
    let mut in_literal = false;
    let mut in_identifier = false;

    while let Some(c) = chars.next() {
        match c {
            '\'' if !in_identifier => {
                in_literal = !in_literal;
                out.push(c);
            }
            '"' if !in_literal => {
                in_identifier = !in_identifier;
                out.push(c);
            }
            '@' if !in_literal && !in_identifier => {
                if chars.peek() == Some(&'@') {
                    // `@@` operator, not a parameter
                    chars.next();
                    out.push_str("@@");
                    continue;
                }
                if !matches!(chars.peek(), Some(n) if n.is_ascii_alphabetic() || *n == '_') {
                    out.push(c);
                    continue;
                }

                let mut name = String::new();
                while let Some(&n) = chars.peek() {
                    if n.is_ascii_alphanumeric() || n == '_' {
                        name.push(n);
                        chars.next();
                    } else {
                        break;
                    }
                }

                let index = match names.iter().position(|n| n == &name) {
                    Some(i) => i,
                    None => {
                        let value = params.get(&name).ok_or_else(|| {
                            BridgeError::validation(format!(
                                "parameter '{}' is referenced by the statement but not provided",
                                name
                            ))
                        })?;
                        values.push(ParamValue::from_json(&name, value)?);
                        names.push(name);
                        names.len() - 1
                    }
                };
                out.push('$');
                out.push_str(&(index + 1).to_string());
            }
            _ => out.push(c),
        }
    }

    Ok((out, values))
}

/// Build a `CALL` statement for a stored procedure, binding every supplied
/// parameter in insertion order.
pub fn procedure_call(
    name: &str,
    params: &Map<String, Value>,
) -> BridgeResult<(String, Vec<ParamValue>)> {
    let quoted = name
        .split('.')
        .map(quote_identifier)
        .collect::<BridgeResult<Vec<_>>>()?;

    let mut values = Vec::with_capacity(params.len());
    for (param_name, value) in params {
        values.push(ParamValue::from_json(param_name, value)?);
    }

    let placeholders: Vec<String> = (1..=values.len()).map(|i| format!("${}", i)).collect();
    let sql = format!("CALL {}({})", quoted.join("."), placeholders.join(", "));
    Ok((sql, values))
}

/// Quote an identifier segment, doubling embedded quotes
pub fn quote_identifier(segment: &str) -> BridgeResult<String> {
    if segment.trim().is_empty() {
        return Err(BridgeError::validation("identifier must not be empty"));
    }
    Ok(format!("\"{}\"", segment.replace('"', "\"\"")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params_from(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_rewrites_named_parameters_in_first_appearance_order() {
        let params = params_from(json!({"id": 7, "name": "ada"}));
        let (sql, values) =
            bind_named("SELECT * FROM t WHERE name = @name AND id = @id", &params).unwrap();
        assert_eq!(sql, "SELECT * FROM t WHERE name = $1 AND id = $2");
        assert_eq!(
            values,
            vec![ParamValue::Text("ada".to_string()), ParamValue::Int(7)]
        );
    }

    #[test]
    fn test_repeated_name_reuses_placeholder() {
        let params = params_from(json!({"v": 1}));
        let (sql, values) = bind_named("SELECT @v + @v", &params).unwrap();
        assert_eq!(sql, "SELECT $1 + $1");
        assert_eq!(values.len(), 1);
    }

    #[test]
    fn test_parameters_inside_string_literals_are_untouched() {
        let params = Map::new();
        let (sql, values) = bind_named("SELECT 'reach me @home'", &params).unwrap();
        assert_eq!(sql, "SELECT 'reach me @home'");
        assert!(values.is_empty());
    }

    #[test]
    fn test_escaped_quote_inside_literal() {
        let params = params_from(json!({"a": 1}));
        let (sql, _) = bind_named("SELECT 'it''s @a', @a", &params).unwrap();
        assert_eq!(sql, "SELECT 'it''s @a', $1");
    }

    #[test]
    fn test_operators_are_not_parameters() {
        let params = Map::new();
        let (sql, values) =
            bind_named("SELECT doc @> '{}' , tsv @@ query FROM t", &params).unwrap();
        assert_eq!(sql, "SELECT doc @> '{}' , tsv @@ query FROM t");
        assert!(values.is_empty());
    }

    #[test]
    fn test_missing_parameter_is_a_validation_error() {
        let err = bind_named("SELECT @missing", &Map::new()).unwrap_err();
        assert!(matches!(err, BridgeError::Validation(_)));
        assert!(err.to_string().contains("missing"));
    }

    #[test]
    fn test_unreferenced_parameters_are_ignored() {
        let params = params_from(json!({"used": 1, "spare": 2}));
        let (sql, values) = bind_named("SELECT @used", &params).unwrap();
        assert_eq!(sql, "SELECT $1");
        assert_eq!(values, vec![ParamValue::Int(1)]);
    }

    #[test]
    fn test_non_scalar_parameter_is_rejected() {
        let params = params_from(json!({"bad": [1, 2]}));
        let err = bind_named("SELECT @bad", &params).unwrap_err();
        assert!(matches!(err, BridgeError::Validation(_)));
    }

    #[test]
    fn test_scalar_conversions() {
        assert_eq!(
            ParamValue::from_json("p", &json!(null)).unwrap(),
            ParamValue::Null
        );
        assert_eq!(
            ParamValue::from_json("p", &json!(true)).unwrap(),
            ParamValue::Bool(true)
        );
        assert_eq!(
            ParamValue::from_json("p", &json!(2.5)).unwrap(),
            ParamValue::Float(2.5)
        );
    }

    #[test]
    fn test_procedure_call_shape() {
        let params = params_from(json!({"a": 1, "b": "x"}));
        let (sql, values) = procedure_call("billing.settle", &params).unwrap();
        assert_eq!(sql, "CALL \"billing\".\"settle\"($1, $2)");
        assert_eq!(values.len(), 2);
    }

    #[test]
    fn test_procedure_call_without_params() {
        let (sql, values) = procedure_call("refresh_totals", &Map::new()).unwrap();
        assert_eq!(sql, "CALL \"refresh_totals\"()");
        assert!(values.is_empty());
    }

    #[test]
    fn test_quote_identifier_doubles_quotes() {
        assert_eq!(quote_identifier("we\"ird").unwrap(), "\"we\"\"ird\"");
        assert!(quote_identifier("  ").is_err());
    }
}
