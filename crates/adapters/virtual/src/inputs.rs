//! Input and parameter parsing shared by the drivers.

use sensorhub_domain::definition::{InputValue, Inputs};
use sensorhub_domain::error::DriverError;
use serde_json::Value;

/// Highest GPIO line on the simulated header.
pub const MAX_PIN: i64 = 40;

fn invalid(key: &str, reason: impl Into<String>) -> DriverError {
    DriverError::InvalidInput {
        key: key.to_string(),
        reason: reason.into(),
    }
}

/// Required `pin_no` input, a GPIO line in `0..=MAX_PIN`.
pub fn pin(inputs: &Inputs) -> Result<u8, DriverError> {
    let value = inputs
        .get("pin_no")
        .ok_or(DriverError::MissingInput("pin_no"))?;
    let pin = value
        .as_i64()
        .ok_or_else(|| invalid("pin_no", "expected an integer"))?;
    if !(0..=MAX_PIN).contains(&pin) {
        return Err(invalid("pin_no", format!("{pin} is outside 0..={MAX_PIN}")));
    }
    u8::try_from(pin).map_err(|_| invalid("pin_no", "out of range"))
}

/// Required 7-bit I2C `address`, given as an integer or a `"0x27"` string.
pub fn i2c_address(inputs: &Inputs) -> Result<u8, DriverError> {
    let value = inputs
        .get("address")
        .ok_or(DriverError::MissingInput("address"))?;
    let address = match value {
        InputValue::String(text) => {
            let digits = text
                .strip_prefix("0x")
                .or_else(|| text.strip_prefix("0X"));
            let parsed = match digits {
                Some(hex) => i64::from_str_radix(hex, 16),
                None => text.parse::<i64>(),
            };
            parsed.map_err(|_| invalid("address", format!("`{text}` is not a number")))?
        }
        other => other
            .as_i64()
            .ok_or_else(|| invalid("address", "expected an integer or hex string"))?,
    };
    if !(0x03..=0x77).contains(&address) {
        return Err(invalid(
            "address",
            format!("{address:#04x} is not a valid 7-bit address"),
        ));
    }
    u8::try_from(address).map_err(|_| invalid("address", "out of range"))
}

/// Optional boolean input with a default.
pub fn flag(inputs: &Inputs, key: &str, default: bool) -> Result<bool, DriverError> {
    match inputs.get(key) {
        None => Ok(default),
        Some(InputValue::Bool(value)) => Ok(*value),
        Some(InputValue::Int(0)) => Ok(false),
        Some(InputValue::Int(1)) => Ok(true),
        Some(_) => Err(invalid(key, "expected a boolean")),
    }
}

/// Optional string input.
pub fn text<'a>(inputs: &'a Inputs, key: &str) -> Result<Option<&'a str>, DriverError> {
    match inputs.get(key) {
        None => Ok(None),
        Some(InputValue::String(value)) => Ok(Some(value)),
        Some(_) => Err(invalid(key, "expected a string")),
    }
}

/// Boolean execute parameter; accepts `true`/`false`, `0`/`1` and `"on"`/`"off"`.
pub fn bool_param(params: &Value, key: &str) -> Result<Option<bool>, DriverError> {
    let reject = || DriverError::InvalidParam {
        key: key.to_string(),
        reason: "expected a boolean".to_string(),
    };
    match params.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Bool(value)) => Ok(Some(*value)),
        Some(Value::Number(number)) => match number.as_i64() {
            Some(0) => Ok(Some(false)),
            Some(1) => Ok(Some(true)),
            _ => Err(reject()),
        },
        Some(Value::String(value)) => match value.as_str() {
            "on" | "true" => Ok(Some(true)),
            "off" | "false" => Ok(Some(false)),
            _ => Err(reject()),
        },
        Some(_) => Err(reject()),
    }
}

/// String execute parameter.
pub fn text_param<'a>(params: &'a Value, key: &str) -> Result<Option<&'a str>, DriverError> {
    match params.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(value)) => Ok(Some(value)),
        Some(_) => Err(DriverError::InvalidParam {
            key: key.to_string(),
            reason: "expected a string".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn inputs(pairs: &[(&str, InputValue)]) -> Inputs {
        pairs
            .iter()
            .map(|(key, value)| ((*key).to_string(), value.clone()))
            .collect()
    }

    #[test]
    fn should_parse_pin() {
        assert_eq!(pin(&inputs(&[("pin_no", InputValue::Int(17))])).unwrap(), 17);
        assert_eq!(pin(&inputs(&[("pin_no", InputValue::Float(4.0))])).unwrap(), 4);
    }

    #[test]
    fn should_reject_missing_or_out_of_range_pin() {
        assert!(matches!(
            pin(&Inputs::new()),
            Err(DriverError::MissingInput("pin_no"))
        ));
        assert!(matches!(
            pin(&inputs(&[("pin_no", InputValue::Int(99))])),
            Err(DriverError::InvalidInput { .. })
        ));
        assert!(pin(&inputs(&[("pin_no", "17".into())])).is_err());
    }

    #[test]
    fn should_parse_address_in_every_notation() {
        for value in [InputValue::Int(0x27), "0x27".into(), "39".into()] {
            assert_eq!(i2c_address(&inputs(&[("address", value)])).unwrap(), 0x27);
        }
    }

    #[test]
    fn should_reject_reserved_address() {
        assert!(i2c_address(&inputs(&[("address", InputValue::Int(0x78))])).is_err());
        assert!(i2c_address(&inputs(&[("address", "0xZZ".into())])).is_err());
    }

    #[test]
    fn should_default_flags() {
        assert!(flag(&Inputs::new(), "initial_value", true).unwrap());
        assert!(!flag(&inputs(&[("x", InputValue::Int(0))]), "x", true).unwrap());
        assert!(flag(&inputs(&[("x", "yes".into())]), "x", true).is_err());
    }

    #[test]
    fn should_parse_bool_params_leniently() {
        let params = json!({"a": true, "b": 0, "c": "on", "d": "maybe"});
        assert_eq!(bool_param(&params, "a").unwrap(), Some(true));
        assert_eq!(bool_param(&params, "b").unwrap(), Some(false));
        assert_eq!(bool_param(&params, "c").unwrap(), Some(true));
        assert_eq!(bool_param(&params, "missing").unwrap(), None);
        assert!(bool_param(&params, "d").is_err());
    }
}
