use anyhow::{anyhow, Context};
use axum::http::HeaderValue;
use shuttle_runtime::SecretStore;

pub const DEFAULT_DATABASE_NAME: &str = "showtime";

/// Runtime settings, read from `Secrets.toml` when deployed on Shuttle.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub mongodb_uri: String,
    pub app_url: String,
    pub database_name: String,
}

impl AppConfig {
    pub fn from_secrets(secret_store: &SecretStore) -> anyhow::Result<Self> {
        Self::from_lookup(|key| secret_store.get(key))
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|value| !value.trim().is_empty())
                .ok_or_else(|| anyhow!("secret {key} was not found"))
        };

        Ok(Self {
            mongodb_uri: required("MONGODB_URI")?,
            app_url: required("APP_URL")?,
            database_name: lookup("DATABASE_NAME")
                .filter(|value| !value.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_DATABASE_NAME.to_string()),
        })
    }

    /// The single origin allowed through CORS.
    pub fn allowed_origin(&self) -> anyhow::Result<HeaderValue> {
        self.app_url
            .parse::<HeaderValue>()
            .with_context(|| format!("APP_URL '{}' is not a valid origin", self.app_url))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn reads_required_secrets_and_defaults_database() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("MONGODB_URI", "mongodb://localhost:27017"),
            ("APP_URL", "http://localhost:3000"),
        ]))
        .unwrap();

        assert_eq!(config.mongodb_uri, "mongodb://localhost:27017");
        assert_eq!(config.database_name, DEFAULT_DATABASE_NAME);
        assert!(config.allowed_origin().is_ok());
    }

    #[test]
    fn missing_mongodb_uri_fails() {
        let err = AppConfig::from_lookup(lookup_from(&[("APP_URL", "http://localhost:3000")]))
            .unwrap_err();
        assert!(err.to_string().contains("MONGODB_URI"));
    }

    #[test]
    fn database_name_can_be_overridden() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("MONGODB_URI", "mongodb://localhost:27017"),
            ("APP_URL", "http://localhost:3000"),
            ("DATABASE_NAME", "showtime-staging"),
        ]))
        .unwrap();
        assert_eq!(config.database_name, "showtime-staging");
    }
}
