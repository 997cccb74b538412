//! Vault HTTP API client.

use super::SecretStore;
use crate::error::StoreError;
use crate::models::Record;
use reqwest::blocking::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

const TOKEN_HEADER: &str = "X-Vault-Token";

/// Where the secret store lives and how to talk to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Base address of the Vault server.
    #[serde(default = "default_vault_addr")]
    pub vault_addr: String,
    /// Secret engine mount and application namespace, e.g. `secret/vpwmgr`.
    #[serde(default = "default_mount")]
    pub mount: String,
    /// Auth method used for `login`.
    #[serde(default = "default_auth_method")]
    pub auth_method: String,
    /// Per-request timeout. Unset means wait indefinitely.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout_secs: Option<u64>,
}

fn default_vault_addr() -> String {
    "http://127.0.0.1:8200".to_string()
}

fn default_mount() -> String {
    "secret/vpwmgr".to_string()
}

fn default_auth_method() -> String {
    "userpass".to_string()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            vault_addr: default_vault_addr(),
            mount: default_mount(),
            auth_method: default_auth_method(),
            request_timeout_secs: None,
        }
    }
}

#[derive(Deserialize)]
struct ListResponse {
    data: ListData,
}

#[derive(Deserialize)]
struct ListData {
    #[serde(default)]
    keys: Vec<String>,
}

#[derive(Deserialize)]
struct ReadResponse {
    data: Record,
}

#[derive(Deserialize)]
struct LoginResponse {
    auth: Option<LoginAuth>,
}

#[derive(Deserialize)]
struct LoginAuth {
    #[serde(default)]
    client_token: String,
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    password: &'a str,
}

/// Blocking client for a Vault key/value mount.
pub struct VaultClient {
    http: Client,
    base: Url,
    mount: String,
    auth_method: String,
}

impl VaultClient {
    pub fn new(config: &StoreConfig) -> Result<Self, StoreError> {
        let mut addr = config.vault_addr.clone();
        if !addr.ends_with('/') {
            addr.push('/');
        }
        let base = Url::parse(&addr).map_err(|e| StoreError::InvalidAddress {
            addr: config.vault_addr.clone(),
            reason: e.to_string(),
        })?;

        let http = Client::builder()
            .timeout(config.request_timeout_secs.map(Duration::from_secs))
            .build()?;

        Ok(Self {
            http,
            base,
            mount: config.mount.trim_matches('/').to_string(),
            auth_method: config.auth_method.trim_matches('/').to_string(),
        })
    }

    fn url(&self, rel: &str) -> Result<Url, StoreError> {
        self.base
            .join(rel)
            .map_err(|e| StoreError::InvalidAddress {
                addr: format!("{}{}", self.base, rel),
                reason: e.to_string(),
            })
    }

    fn secret_url(&self, key: &str) -> Result<Url, StoreError> {
        self.url(&format!("v1/{}/{}", self.mount, key))
    }

    fn authed(&self, request: RequestBuilder, token: &str) -> RequestBuilder {
        request
            .header(TOKEN_HEADER, token)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
    }

    fn expect_success(op: &'static str, key: &str, response: Response) -> Result<(), StoreError> {
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            tracing::warn!("Vault {} of {} failed with status {}", op, key, status);
            Err(StoreError::Status {
                op,
                key: key.to_string(),
                status: status.as_u16(),
            })
        }
    }
}

impl SecretStore for VaultClient {
    fn login(&self, id: &str, password: &str) -> Result<Option<String>, StoreError> {
        let url = self.url(&format!(
            "v1/auth/{}/login/{}",
            self.auth_method,
            crate::path::encode(id)
        ))?;
        tracing::debug!("Vault login for {}", id);

        let response = self
            .http
            .post(url)
            .json(&LoginRequest { password })
            .send()?;
        if !response.status().is_success() {
            tracing::info!("Vault rejected login for {} ({})", id, response.status());
            return Ok(None);
        }

        let body: LoginResponse = response.json()?;
        Ok(body
            .auth
            .map(|auth| auth.client_token)
            .filter(|token| !token.is_empty()))
    }

    fn list(&self, token: &str, prefix: &str) -> Result<Option<Vec<String>>, StoreError> {
        let url = self.secret_url(prefix)?;
        tracing::debug!("Vault list {}", prefix);

        let response = self
            .authed(self.http.get(url), token)
            .query(&[("list", "true")])
            .send()?;
        let status = response.status();
        if !status.is_success() {
            // Vault answers 404 for an empty folder and 403 for one outside the
            // caller's policy; both read as "nothing here".
            tracing::debug!("Vault list {} returned {}", prefix, status);
            return Ok(None);
        }

        let body: ListResponse = response.json()?;
        Ok(Some(body.data.keys))
    }

    fn read(&self, token: &str, key: &str) -> Result<Option<Record>, StoreError> {
        let url = self.secret_url(key)?;
        tracing::debug!("Vault read {}", key);

        let response = self.authed(self.http.get(url), token).send()?;
        let status = response.status();
        if !status.is_success() {
            tracing::debug!("Vault read {} returned {}", key, status);
            return Ok(None);
        }

        let body: ReadResponse = response.json()?;
        Ok(Some(body.data))
    }

    fn write(&self, token: &str, key: &str, record: &Record) -> Result<(), StoreError> {
        let url = self.secret_url(key)?;
        tracing::debug!("Vault write {}", key);

        let response = self.authed(self.http.post(url), token).json(record).send()?;
        Self::expect_success("write", key, response)
    }

    fn delete(&self, token: &str, key: &str) -> Result<(), StoreError> {
        let url = self.secret_url(key)?;
        tracing::debug!("Vault delete {}", key);

        let response = self.authed(self.http.delete(url), token).send()?;
        Self::expect_success("delete", key, response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urls_are_rooted_under_the_mount() {
        let client = VaultClient::new(&StoreConfig::default()).unwrap();
        let url = client.secret_url("user/alice/web/google.com").unwrap();
        assert_eq!(
            url.as_str(),
            "http://127.0.0.1:8200/v1/secret/vpwmgr/user/alice/web/google.com"
        );
    }

    #[test]
    fn encoded_segments_survive_url_joining() {
        let config = StoreConfig {
            vault_addr: "https://vault.example.com:8200/".into(),
            mount: "/kv/pw/".into(),
            ..StoreConfig::default()
        };
        let client = VaultClient::new(&config).unwrap();
        let url = client.secret_url("user/alice/home%20network/a%2Fb").unwrap();
        assert_eq!(
            url.as_str(),
            "https://vault.example.com:8200/v1/kv/pw/user/alice/home%20network/a%2Fb"
        );
    }

    #[test]
    fn bad_address_is_rejected() {
        let config = StoreConfig {
            vault_addr: "not a url".into(),
            ..StoreConfig::default()
        };
        assert!(matches!(
            VaultClient::new(&config),
            Err(StoreError::InvalidAddress { .. })
        ));
    }

    #[test]
    fn config_defaults_fill_missing_fields() {
        let config: StoreConfig = serde_json::from_str(r#"{"vault_addr":"http://vault:8200"}"#).unwrap();
        assert_eq!(config.vault_addr, "http://vault:8200");
        assert_eq!(config.mount, "secret/vpwmgr");
        assert_eq!(config.auth_method, "userpass");
        assert_eq!(config.request_timeout_secs, None);
    }
}
