use crate::config::toml_config::RedbiomConfig;
use crate::utils::error::{RedbiomError, Result};
use reqwest::Client;
use serde_json::Value;
use std::collections::HashMap;
use url::Url;

/// Read-only Redis access through a webdis HTTP endpoint.
///
/// A command is issued as `GET {host}/{COMMAND}/{arg}/...` and webdis answers
/// with a JSON object keyed by the command name, e.g. `{"SMEMBERS": [...]}`.
#[derive(Debug, Clone)]
pub struct WebdisClient {
    client: Client,
    base: Url,
}

impl WebdisClient {
    pub fn new(config: &RedbiomConfig) -> Result<Self> {
        let base = Url::parse(&config.hostname).map_err(|e| RedbiomError::InvalidConfigValueError {
            field: "hostname".to_string(),
            value: config.hostname.clone(),
            reason: format!("Invalid URL format: {}", e),
        })?;
        if base.cannot_be_a_base() {
            return Err(RedbiomError::config(format!(
                "hostname '{}' cannot be used as a base URL",
                config.hostname
            )));
        }

        let client = Client::builder().timeout(config.timeout()).build()?;
        Ok(Self { client, base })
    }

    pub fn command_url(&self, command: &str, args: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(command).extend(args);
        }
        url
    }

    async fn command(&self, command: &str, args: &[&str]) -> Result<Value> {
        let url = self.command_url(command, args);
        tracing::debug!("webdis request: {}", url);

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(RedbiomError::store(format!(
                "{} {} returned HTTP {}",
                command,
                args.join(" "),
                status
            )));
        }

        let mut body: Value = response.json().await?;
        body.get_mut(command).map(Value::take).ok_or_else(|| {
            RedbiomError::store(format!("reply to {} has no '{}' field", command, command))
        })
    }

    pub async fn hexists(&self, key: &str, field: &str) -> Result<bool> {
        match self.command("HEXISTS", &[key, field]).await? {
            Value::Number(n) => Ok(n.as_i64() == Some(1)),
            Value::Bool(b) => Ok(b),
            other => Err(unexpected("HEXISTS", &other)),
        }
    }

    pub async fn smembers(&self, key: &str) -> Result<Vec<String>> {
        match self.command("SMEMBERS", &[key]).await? {
            Value::Array(items) => items.into_iter().map(|v| into_string("SMEMBERS", v)).collect(),
            Value::Null => Ok(Vec::new()),
            other => Err(unexpected("SMEMBERS", &other)),
        }
    }

    /// Accepts the object reply as well as the flat `[field, value, ...]` form.
    pub async fn hgetall(&self, key: &str) -> Result<HashMap<String, String>> {
        match self.command("HGETALL", &[key]).await? {
            Value::Object(map) => map
                .into_iter()
                .map(|(field, value)| Ok((field, into_string("HGETALL", value)?)))
                .collect(),
            Value::Array(items) => {
                if items.len() % 2 != 0 {
                    return Err(RedbiomError::store(
                        "HGETALL reply has an odd number of elements",
                    ));
                }
                let mut map = HashMap::with_capacity(items.len() / 2);
                let mut items = items.into_iter();
                while let (Some(field), Some(value)) = (items.next(), items.next()) {
                    map.insert(
                        into_string("HGETALL", field)?,
                        into_string("HGETALL", value)?,
                    );
                }
                Ok(map)
            }
            Value::Null => Ok(HashMap::new()),
            other => Err(unexpected("HGETALL", &other)),
        }
    }
}

fn into_string(command: &str, value: Value) -> Result<String> {
    match value {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(unexpected(command, &other)),
    }
}

fn unexpected(command: &str, value: &Value) -> RedbiomError {
    RedbiomError::store(format!("unexpected {} reply: {}", command, value))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(host: &str) -> WebdisClient {
        let config = RedbiomConfig {
            hostname: host.to_string(),
            ..RedbiomConfig::default()
        };
        WebdisClient::new(&config).unwrap()
    }

    #[test]
    fn test_command_url() {
        let client = client("http://127.0.0.1:7379");
        assert_eq!(
            client
                .command_url("HEXISTS", &["state:contexts", "ctx1"])
                .as_str(),
            "http://127.0.0.1:7379/HEXISTS/state:contexts/ctx1"
        );
    }

    #[test]
    fn test_command_url_keeps_base_path_and_encodes_arguments() {
        let client = client("https://example.org/webdis/");
        assert_eq!(
            client
                .command_url("SMEMBERS", &["ctx:samples:k__Bacteria; p__Firmicutes/x"])
                .as_str(),
            "https://example.org/webdis/SMEMBERS/ctx:samples:k__Bacteria;%20p__Firmicutes%2Fx"
        );
    }

    #[test]
    fn test_rejects_non_base_host() {
        let config = RedbiomConfig {
            hostname: "mailto:someone@example.org".to_string(),
            ..RedbiomConfig::default()
        };
        assert!(WebdisClient::new(&config).is_err());
    }

    #[test]
    fn test_into_string() {
        assert_eq!(
            into_string("SMEMBERS", Value::String("s1".to_string())).unwrap(),
            "s1"
        );
        assert_eq!(
            into_string("HGETALL", serde_json::json!(42)).unwrap(),
            "42"
        );
        assert!(into_string("SMEMBERS", serde_json::json!([1])).is_err());
    }
}
