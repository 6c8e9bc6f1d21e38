//! Conversion of host-supplied arguments into component values.
//!
//! Arity and type faults are detected here, before the guest is entered.

use serde_json::Value;
use wasmtime::component::Val;

/// An exported function of `fibench:kernel/kernel`.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    serde::Deserialize,
    serde::Serialize,
    strum::Display,
    strum::EnumString,
    strum::IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EntryPoint {
    /// `fib: func(n: u32) -> s64`
    Fib,
    /// `test: func(n: u32, count: u32) -> s64`
    Test,
}

impl EntryPoint {
    /// Name of the function inside the exported interface.
    #[must_use]
    pub fn function_name(self) -> &'static str {
        self.into()
    }

    #[must_use]
    pub fn param_names(self) -> &'static [&'static str] {
        match self {
            Self::Fib => &["n"],
            Self::Test => &["n", "count"],
        }
    }
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum ParamsError {
    #[error("`{entry_point}` expects {expected} parameter(s), got {actual}")]
    ArityMismatch {
        entry_point: EntryPoint,
        expected: usize,
        actual: usize,
    },
    #[error("parameter #{idx} `{name}`: {reason}")]
    ParameterError {
        idx: usize,
        name: &'static str,
        reason: String,
    },
}

/// Convert JSON values into the parameters of `entry_point`.
///
/// Every parameter is a `u32`. Integral JSON numbers in range are accepted,
/// including floats without a fractional part.
pub fn params_from_json(
    entry_point: EntryPoint,
    values: &[Value],
) -> Result<Vec<Val>, ParamsError> {
    let names = entry_point.param_names();
    if names.len() != values.len() {
        return Err(ParamsError::ArityMismatch {
            entry_point,
            expected: names.len(),
            actual: values.len(),
        });
    }
    names
        .iter()
        .copied()
        .zip(values)
        .enumerate()
        .map(|(idx, (name, value))| {
            coerce_u32(value)
                .map(Val::U32)
                .map_err(|reason| ParamsError::ParameterError { idx, name, reason })
        })
        .collect()
}

/// Parse a command line argument as JSON, keeping it as a string if it is not valid JSON.
#[must_use]
pub fn parse_cli_param(input: &str) -> Value {
    serde_json::from_str(input).unwrap_or_else(|_| Value::String(input.to_string()))
}

#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::float_cmp
)]
fn coerce_u32(value: &Value) -> Result<u32, String> {
    match value {
        Value::Number(number) => {
            if let Some(unsigned) = number.as_u64() {
                u32::try_from(unsigned).map_err(|_| format!("{unsigned} does not fit into u32"))
            } else if let Some(signed) = number.as_i64() {
                Err(format!("{signed} is negative"))
            } else if let Some(float) = number.as_f64()
                && float.trunc() == float
                && (0.0..=f64::from(u32::MAX)).contains(&float)
            {
                Ok(float as u32)
            } else {
                Err(format!("{number} is not an unsigned 32-bit integer"))
            }
        }
        other => Err(format!(
            "expected an unsigned integer, got {}",
            json_type_name(other)
        )),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::{EntryPoint, ParamsError, params_from_json, parse_cli_param};
    use assert_matches::assert_matches;
    use rstest::rstest;
    use serde_json::{Value, json};
    use std::str::FromStr;
    use wasmtime::component::Val;

    #[test]
    fn entry_points_use_wit_names() {
        assert_eq!("fib", EntryPoint::Fib.function_name());
        assert_eq!("test", EntryPoint::Test.function_name());
        assert_eq!(EntryPoint::Test, EntryPoint::from_str("test").unwrap());
        assert!(EntryPoint::from_str("fibo").is_err());
        assert_eq!(
            EntryPoint::Fib,
            serde_json::from_value::<EntryPoint>(json!("fib")).unwrap()
        );
    }

    #[test]
    fn arity_is_checked_first() {
        let err = params_from_json(EntryPoint::Test, &[json!(10)]).unwrap_err();
        assert_eq!(
            ParamsError::ArityMismatch {
                entry_point: EntryPoint::Test,
                expected: 2,
                actual: 1
            },
            err
        );
        let err = params_from_json(EntryPoint::Fib, &[json!("x"), json!(1)]).unwrap_err();
        assert_matches!(err, ParamsError::ArityMismatch { expected: 1, actual: 2, .. });
    }

    #[rstest]
    #[case(json!(0), 0)]
    #[case(json!(10), 10)]
    #[case(json!(10.0), 10)]
    #[case(json!(u32::MAX), u32::MAX)]
    fn integral_numbers_are_coerced(#[case] input: Value, #[case] expected: u32) {
        let params = params_from_json(EntryPoint::Fib, &[input]).unwrap();
        assert_matches!(params.as_slice(), [Val::U32(actual)] if *actual == expected);
    }

    #[rstest]
    #[case(json!(-1))]
    #[case(json!(1.5))]
    #[case(json!(u64::from(u32::MAX) + 1))]
    #[case(json!("10"))]
    #[case(json!(null))]
    #[case(json!([1]))]
    #[case(json!(true))]
    fn other_values_are_rejected(#[case] input: Value) {
        let err = params_from_json(EntryPoint::Test, &[json!(1), input]).unwrap_err();
        assert_matches!(err, ParamsError::ParameterError { idx: 1, name: "count", .. });
    }

    #[test]
    fn cli_params_fall_back_to_strings() {
        assert_eq!(json!(42), parse_cli_param("42"));
        assert_eq!(json!(-3), parse_cli_param("-3"));
        assert_eq!(json!("forty"), parse_cli_param("forty"));
    }
}
