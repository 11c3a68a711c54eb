//! API server configuration.

use std::path::PathBuf;

use tcv_core::auth::jwt::resolve_jwt_secret;
use tcv_core::documents::DocumentConfig;
use tracing::warn;

/// Outbound mail relay.
#[derive(Clone, Debug)]
pub struct SmtpConfig {
    pub host: String,
    /// `None` uses the relay's default submission port.
    pub port: Option<u16>,
    pub username: String,
    pub password: String,
    /// Sender address; the display name is always "Temp Cover".
    pub from: String,
}

/// Cloudinary credentials for policy image uploads.
#[derive(Clone, Debug)]
pub struct CloudinaryConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
}

/// Configuration for the API server.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    /// Address to bind the HTTP listener (e.g. "0.0.0.0:5000").
    pub bind_addr: String,
    /// PostgreSQL connection URL.
    pub database_url: String,
    /// JWT signing secret.
    pub jwt_secret: String,
    /// Front-end origin used to build verification links.
    pub client_url: String,
    pub documents: DocumentConfig,
    pub smtp: Option<SmtpConfig>,
    pub cloudinary: Option<CloudinaryConfig>,
}

impl ApiConfig {
    /// Reads configuration from environment variables with sensible defaults.
    ///
    /// | Variable                    | Default                                  |
    /// |-----------------------------|------------------------------------------|
    /// | `BIND_ADDR`                 | `0.0.0.0:5000`                           |
    /// | `DATABASE_URL`              | `postgres://localhost:5432/tempcover`    |
    /// | `JWT_SECRET`                | generated & persisted to file            |
    /// | `CLIENT_URL`                | `http://localhost:5173`                  |
    /// | `ASSETS_DIR`                | `public`                                 |
    /// | `SMTP_USER` / `SMTP_PASS`   | unset: mail is logged, not sent          |
    /// | `SMTP_HOST`                 | `smtp.gmail.com`                         |
    /// | `SMTP_PORT`                 | relay default                            |
    /// | `SMTP_FROM`                 | `SMTP_USER`                              |
    /// | `CLOUDINARY_CLOUD_NAME`, `CLOUDINARY_API_KEY`, `CLOUDINARY_API_SECRET` | unset: uploads disabled |
    pub fn from_env() -> Self {
        let mut config = Self::from_lookup(|key| std::env::var(key).ok());
        if config.jwt_secret.is_empty() {
            config.jwt_secret = resolve_jwt_secret();
        }
        config
    }

    /// Build from an arbitrary key lookup. Empty values count as unset.
    ///
    /// `jwt_secret` is left empty when `JWT_SECRET` is absent;
    /// [`ApiConfig::from_env`] fills it from the persisted secret.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let smtp = match (get("SMTP_USER"), get("SMTP_PASS")) {
            (Some(username), Some(password)) => Some(SmtpConfig {
                host: get("SMTP_HOST").unwrap_or_else(|| "smtp.gmail.com".into()),
                port: get("SMTP_PORT").and_then(|raw| smtp_port(&raw)),
                from: get("SMTP_FROM").unwrap_or_else(|| username.clone()),
                username,
                password,
            }),
            _ => None,
        };

        let cloudinary = match (
            get("CLOUDINARY_CLOUD_NAME"),
            get("CLOUDINARY_API_KEY"),
            get("CLOUDINARY_API_SECRET"),
        ) {
            (Some(cloud_name), Some(api_key), Some(api_secret)) => Some(CloudinaryConfig {
                cloud_name,
                api_key,
                api_secret,
            }),
            _ => None,
        };

        let documents = DocumentConfig {
            assets_dir: get("ASSETS_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| DocumentConfig::default().assets_dir),
            ..DocumentConfig::default()
        };

        Self {
            bind_addr: get("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:5000".into()),
            database_url: get("DATABASE_URL")
                .unwrap_or_else(|| "postgres://localhost:5432/tempcover".into()),
            jwt_secret: get("JWT_SECRET").unwrap_or_default(),
            client_url: get("CLIENT_URL")
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or_else(|| "http://localhost:5173".into()),
            documents,
            smtp,
            cloudinary,
        }
    }
}

/// A set but unparsable port falls back to the relay default, loudly.
fn smtp_port(raw: &str) -> Option<u16> {
    match raw.trim().parse() {
        Ok(port) => Some(port),
        Err(e) => {
            warn!(value = %raw, error = %e, "ignoring invalid SMTP_PORT, using relay default");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(vars: &[(&str, &str)]) -> ApiConfig {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ApiConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_without_environment() {
        let config = config(&[]);
        assert_eq!(config.bind_addr, "0.0.0.0:5000");
        assert_eq!(config.client_url, "http://localhost:5173");
        assert_eq!(config.documents.assets_dir, PathBuf::from("public"));
        assert!(config.smtp.is_none());
        assert!(config.cloudinary.is_none());
        assert!(config.jwt_secret.is_empty());
    }

    #[test]
    fn smtp_needs_user_and_password() {
        assert!(config(&[("SMTP_USER", "ops@example.com")]).smtp.is_none());

        let smtp = config(&[("SMTP_USER", "ops@example.com"), ("SMTP_PASS", "pw")])
            .smtp
            .expect("smtp");
        assert_eq!(smtp.host, "smtp.gmail.com");
        assert_eq!(smtp.from, "ops@example.com");
        assert_eq!(smtp.port, None);
    }

    #[test]
    fn cloudinary_needs_all_three_keys() {
        let partial = config(&[("CLOUDINARY_CLOUD_NAME", "demo"), ("CLOUDINARY_API_KEY", "k")]);
        assert!(partial.cloudinary.is_none());

        let full = config(&[
            ("CLOUDINARY_CLOUD_NAME", "demo"),
            ("CLOUDINARY_API_KEY", "k"),
            ("CLOUDINARY_API_SECRET", "s"),
        ]);
        assert_eq!(full.cloudinary.expect("cloudinary").cloud_name, "demo");
    }

    #[test]
    fn client_url_loses_trailing_slash_and_blanks_are_unset() {
        let config = config(&[("CLIENT_URL", "https://tempcover.com/"), ("BIND_ADDR", "  ")]);
        assert_eq!(config.client_url, "https://tempcover.com");
        assert_eq!(config.bind_addr, "0.0.0.0:5000");
    }

    #[test]
    fn smtp_port_is_parsed_and_junk_falls_back_to_default() {
        let with_port = |port: &str| {
            config(&[("SMTP_USER", "ops@example.com"), ("SMTP_PASS", "pw"), ("SMTP_PORT", port)])
                .smtp
                .expect("smtp")
                .port
        };
        assert_eq!(with_port(" 2525 "), Some(2525));
        assert_eq!(with_port("submission"), None);
        assert_eq!(with_port("70000"), None);
    }
}
