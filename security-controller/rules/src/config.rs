use serde_json::Value;

/// A provider configuration did not have the shape a rule requires.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} is not set in the configuration")]
    Missing(String),

    #[error("{path} must be {expected}, found {found}")]
    Mistyped {
        path: String,
        expected: &'static str,
        found: &'static str,
    },
}

/// Resolves a dotted path such as `nodePools.0.enableAutorepair`. Numeric
/// segments index into arrays.
pub(crate) fn lookup<'v>(config: &'v Value, path: &str) -> Option<&'v Value> {
    path.split('.').try_fold(config, |value, segment| match value {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

pub(crate) fn require<'v>(config: &'v Value, path: &str) -> Result<&'v Value, ConfigError> {
    match lookup(config, path) {
        None | Some(Value::Null) => Err(ConfigError::Missing(path.to_string())),
        Some(value) => Ok(value),
    }
}

pub(crate) fn require_bool(config: &Value, path: &str) -> Result<bool, ConfigError> {
    let value = require(config, path)?;
    value.as_bool().ok_or_else(|| mistyped(path, "a boolean", value))
}

pub(crate) fn require_array<'v>(config: &'v Value, path: &str) -> Result<&'v [Value], ConfigError> {
    let value = require(config, path)?;
    value
        .as_array()
        .map(Vec::as_slice)
        .ok_or_else(|| mistyped(path, "an array", value))
}

pub(crate) fn mistyped(path: impl ToString, expected: &'static str, found: &Value) -> ConfigError {
    ConfigError::Mistyped {
        path: path.to_string(),
        expected,
        found: type_name(found),
    }
}

pub(crate) fn type_name(value: &Value) -> &'static str {
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
    use super::*;
    use serde_json::json;

    #[test]
    fn lookup_paths() {
        let config = json!({
            "nodePools": [
                { "name": "default", "enableAutorepair": true },
                { "name": "spot", "enableAutorepair": false },
            ],
            "authProxyAllowedIPs": [],
        });

        assert_eq!(
            lookup(&config, "nodePools.0.enableAutorepair"),
            Some(&json!(true))
        );
        assert_eq!(lookup(&config, "nodePools.1.name"), Some(&json!("spot")));
        assert_eq!(lookup(&config, "nodePools.2.name"), None);
        assert_eq!(lookup(&config, "nodePools.first.name"), None);
        assert_eq!(lookup(&config, "authProxyAllowedIPs"), Some(&json!([])));
        assert_eq!(lookup(&config, "missing"), None);
        assert_eq!(lookup(&config, "authProxyAllowedIPs.0"), None);
    }

    #[test]
    fn required_fields() {
        let config = json!({
            "enabled": true,
            "count": 3,
            "unset": null,
            "pools": [],
        });

        assert_eq!(require_bool(&config, "enabled"), Ok(true));
        assert_eq!(
            require_bool(&config, "count"),
            Err(ConfigError::Mistyped {
                path: "count".to_string(),
                expected: "a boolean",
                found: "a number",
            })
        );
        assert_eq!(
            require_bool(&config, "unset"),
            Err(ConfigError::Missing("unset".to_string()))
        );
        assert_eq!(
            require_bool(&config, "absent"),
            Err(ConfigError::Missing("absent".to_string()))
        );
        assert_eq!(require_array(&config, "pools").map(<[Value]>::len), Ok(0));
        assert_eq!(
            require_array(&config, "enabled").unwrap_err().to_string(),
            "enabled must be an array, found a boolean"
        );
    }
}
