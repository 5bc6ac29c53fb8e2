//! Client settings resolved from flags and the environment.

use reqwest::Url;

use crate::client::{ClientRegistry, HttpResourceClient};
use crate::error::{ConfigError, Result};

/// Default API endpoint.
pub const DEFAULT_ENDPOINT: &str = "http://localhost:3365";

/// Default number of concurrent lookups while planning.
pub const DEFAULT_CONCURRENCY: usize = 8;

/// Connection settings shared by every command.
#[derive(Debug, Clone)]
pub struct ClientSettings {
    /// API endpoint, e.g. `http://localhost:3365`.
    pub endpoint: String,
    /// Value of the `client-id` header.
    pub client_id: Option<String>,
    /// Bearer key, if the endpoint requires one.
    pub api_key: Option<String>,
    /// Per-request timeout.
    pub timeout_secs: u64,
    /// Maximum concurrent lookups while planning.
    pub concurrency: usize,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            endpoint: String::from(DEFAULT_ENDPOINT),
            client_id: None,
            api_key: None,
            timeout_secs: crate::client::DEFAULT_TIMEOUT_SECS,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

impl ClientSettings {
    /// Checks the settings once, before any command runs.
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint is not an http(s) URL, or a numeric
    /// setting is zero.
    pub fn validate(&self) -> Result<()> {
        self.endpoint_url()?;

        if self.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                name: String::from("timeout-secs"),
                message: String::from("must be at least 1"),
            }
            .into());
        }

        if self.concurrency == 0 {
            return Err(ConfigError::InvalidValue {
                name: String::from("concurrency"),
                message: String::from("must be at least 1"),
            }
            .into());
        }

        Ok(())
    }

    /// The endpoint parsed as an http(s) base URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint does not parse, is not http(s), has
    /// no host, or carries a query or fragment.
    pub fn endpoint_url(&self) -> Result<Url> {
        let invalid = |message: String| ConfigError::InvalidEndpoint {
            endpoint: self.endpoint.clone(),
            message,
        };

        let url = Url::parse(&self.endpoint).map_err(|e| invalid(e.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(invalid(format!("unsupported scheme '{}'", url.scheme())).into());
        }
        if url.host_str().is_none_or(str::is_empty) {
            return Err(invalid(String::from("missing host")).into());
        }
        if url.query().is_some() || url.fragment().is_some() {
            return Err(invalid(String::from("must not carry a query or fragment")).into());
        }
        Ok(url)
    }

    /// HTTP clients for every kind.
    ///
    /// # Errors
    ///
    /// Returns an error if the settings are invalid or the HTTP client cannot
    /// be created.
    pub fn registry(&self) -> Result<ClientRegistry> {
        self.validate()?;
        let base = HttpResourceClient::new(self.endpoint_url()?, self.timeout_secs)?
            .with_client_id(self.client_id.clone())
            .with_api_key(self.api_key.clone());
        Ok(ClientRegistry::http(&base))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::KaskadaError;

    #[test]
    fn test_defaults_are_valid() {
        assert!(ClientSettings::default().validate().is_ok());
    }

    #[test]
    fn test_endpoint_scheme_required() {
        let settings = ClientSettings {
            endpoint: String::from("localhost:3365"),
            ..ClientSettings::default()
        };
        assert!(matches!(
            settings.validate(),
            Err(KaskadaError::Config(ConfigError::InvalidEndpoint { .. }))
        ));
    }

    #[test]
    fn test_endpoint_host_required() {
        let settings = ClientSettings {
            endpoint: String::from("https://"),
            ..ClientSettings::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_malformed_endpoints_rejected() {
        for endpoint in [
            "http://host:notaport",
            "http://[::1",
            "https://a/b?c#d",
            "ftp://files.example.com",
            "http://bad host",
        ] {
            let settings = ClientSettings {
                endpoint: String::from(endpoint),
                ..ClientSettings::default()
            };
            assert!(
                matches!(
                    settings.validate(),
                    Err(KaskadaError::Config(ConfigError::InvalidEndpoint { .. }))
                ),
                "{endpoint} should be rejected"
            );
        }
    }

    #[test]
    fn test_endpoint_with_base_path_accepted() {
        let settings = ClientSettings {
            endpoint: String::from("https://kaskada.example.com/gateway/"),
            ..ClientSettings::default()
        };
        let url = settings.endpoint_url().unwrap();
        assert_eq!(url.host_str(), Some("kaskada.example.com"));
        assert_eq!(url.path(), "/gateway/");
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let settings = ClientSettings {
            concurrency: 0,
            ..ClientSettings::default()
        };
        assert!(matches!(
            settings.validate(),
            Err(KaskadaError::Config(ConfigError::InvalidValue { ref name, .. })) if name == "concurrency"
        ));
    }

    #[test]
    fn test_registry_covers_every_kind() {
        let registry = ClientSettings::default().registry().unwrap();
        for kind in crate::resource::ResourceKind::ALL {
            assert_eq!(registry.client(kind).unwrap().kind(), kind);
        }
    }
}
