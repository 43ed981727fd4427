//! Parameter value transformations.
//!
//! Applied in declared order to a supplied raw value before it is sent to
//! the procedure. Every transformation is idempotent, so replaying an
//! already-resolved value through the resolver leaves it unchanged.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ParamTransformType {
    /// Strip every `-` (`"12-34"` → `"1234"`).
    RemoveDashes,
    /// Strip every whitespace character.
    RemoveWhitespace,
    /// Trim leading and trailing whitespace.
    Trim,
    Uppercase,
    Lowercase,
}

impl ParamTransformType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RemoveDashes => "REMOVE_DASHES",
            Self::RemoveWhitespace => "REMOVE_WHITESPACE",
            Self::Trim => "TRIM",
            Self::Uppercase => "UPPERCASE",
            Self::Lowercase => "LOWERCASE",
        }
    }

    /// Apply to a JSON value. Only strings can be transformed; any other
    /// type is an error naming what was found.
    pub fn apply(&self, value: &Value) -> Result<Value, String> {
        let Some(s) = value.as_str() else {
            return Err(format!("expected string, got {}", value_type_name(value)));
        };
        let out = match self {
            Self::RemoveDashes => s.replace('-', ""),
            Self::RemoveWhitespace => s.chars().filter(|c| !c.is_whitespace()).collect(),
            Self::Trim => s.trim().to_string(),
            Self::Uppercase => s.to_uppercase(),
            Self::Lowercase => s.to_lowercase(),
        };
        Ok(Value::String(out))
    }
}

impl fmt::Display for ParamTransformType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn value_type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn remove_dashes() {
        let out = ParamTransformType::RemoveDashes.apply(&json!("12-34")).unwrap();
        assert_eq!(out, json!("1234"));
    }

    #[test]
    fn string_transforms() {
        assert_eq!(
            ParamTransformType::RemoveWhitespace.apply(&json!(" 12 34\t5 ")).unwrap(),
            json!("12345")
        );
        assert_eq!(ParamTransformType::Trim.apply(&json!("  ab ")).unwrap(), json!("ab"));
        assert_eq!(ParamTransformType::Uppercase.apply(&json!("ab")).unwrap(), json!("AB"));
        assert_eq!(ParamTransformType::Lowercase.apply(&json!("AB")).unwrap(), json!("ab"));
    }

    #[test]
    fn non_string_values_fail() {
        let err = ParamTransformType::RemoveDashes.apply(&json!(1234)).unwrap_err();
        assert!(err.contains("expected string, got number"));
        assert!(ParamTransformType::Trim.apply(&json!(["a"])).is_err());
        assert!(ParamTransformType::Uppercase.apply(&json!(true)).is_err());
    }

    #[test]
    fn transforms_are_idempotent() {
        let all = [
            ParamTransformType::RemoveDashes,
            ParamTransformType::RemoveWhitespace,
            ParamTransformType::Trim,
            ParamTransformType::Uppercase,
            ParamTransformType::Lowercase,
        ];
        for t in all {
            let once = t.apply(&json!(" 12-ab Cd ")).unwrap();
            let twice = t.apply(&once).unwrap();
            assert_eq!(once, twice, "{t} is not idempotent");
        }
    }

    #[test]
    fn wire_names() {
        let parsed: Vec<ParamTransformType> =
            serde_json::from_str(r#"["REMOVE_DASHES", "TRIM", "REMOVE_WHITESPACE"]"#).unwrap();
        assert_eq!(
            parsed,
            vec![
                ParamTransformType::RemoveDashes,
                ParamTransformType::Trim,
                ParamTransformType::RemoveWhitespace
            ]
        );
        assert!(serde_json::from_str::<ParamTransformType>(r#""SHOUT""#).is_err());
    }
}
