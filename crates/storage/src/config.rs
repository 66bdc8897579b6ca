use std::path::PathBuf;

#[derive(serde::Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// Database file. An in-memory database is used if no path is given.
    pub path: Option<PathBuf>,
    pub busy_timeout_ms: u64,
    pub case_sensitive_search: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            path: None,
            busy_timeout_ms: 5000,
            case_sensitive_search: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn test_config_defaults() {
        assert_eq!(
            serde_json::from_value::<Config>(json!({})).unwrap(),
            Config::default()
        );
    }

    #[test]
    fn test_config_deserialize() {
        assert_eq!(
            serde_json::from_value::<Config>(json!({
                "path": "liftbook.db",
                "case_sensitive_search": true
            }))
            .unwrap(),
            Config {
                path: Some(PathBuf::from("liftbook.db")),
                busy_timeout_ms: 5000,
                case_sensitive_search: true,
            }
        );
    }
}
