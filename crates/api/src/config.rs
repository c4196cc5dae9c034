use std::collections::HashSet;

/// Server configuration loaded from environment variables and secret files.
///
/// The service sits behind a reverse proxy in production; `dev_mode` relaxes
/// the `X-Forwarded-For` requirement for local runs.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `8080`).
    pub port: u16,
    /// Public base URL, used for post-login redirects.
    pub base_url: String,

    /// Database host, name, and credentials. The password comes from the
    /// file named by `QUEUE_DB_PASSWORD_FILE`.
    pub db_host: String,
    pub db_database: String,
    pub db_username: String,
    pub db_password: String,

    /// OIDC issuer and OAuth2 client settings. The client secret comes from
    /// the file named by `QUEUE_OAUTH2_CLIENT_SECRET_FILE`.
    pub oidc_issuer_url: String,
    pub oauth_client_id: String,
    pub oauth_client_secret: String,
    pub oauth_redirect_uri: String,
    pub oauth_use_pkce: bool,

    /// Email domain sessions must belong to; empty disables the check.
    pub valid_domain: String,
    /// Identity-provider groups whose members are site admins.
    pub site_admin_groups: HashSet<String>,

    /// HMAC key for the session cookie, from `QUEUE_SESSIONS_KEY_FILE`.
    pub sessions_key: Vec<u8>,
    pub use_secure_cookies: bool,
    pub dev_mode: bool,
}

impl ServerConfig {
    /// Load configuration from the environment, panicking on malformed
    /// values or unreadable secret files so misconfiguration fails fast at
    /// startup.
    pub fn from_env() -> Self {
        let host = env_or("HOST", "0.0.0.0");
        let port: u16 = env_or("PORT", "8080")
            .parse()
            .expect("PORT must be a valid u16");

        let site_admin_groups = env_or("QUEUE_SITE_ADMIN_GROUPS", "")
            .split(',')
            .map(|g| g.trim().to_string())
            .filter(|g| !g.is_empty())
            .collect();

        Self {
            host,
            port,
            base_url: env_or("QUEUE_BASE_URL", "http://localhost:8080/"),
            db_host: required("QUEUE_DB_URL"),
            db_database: required("QUEUE_DB_DATABASE"),
            db_username: required("QUEUE_DB_USERNAME"),
            db_password: secret_file("QUEUE_DB_PASSWORD_FILE"),
            oidc_issuer_url: required("QUEUE_OIDC_ISSUER_URL"),
            oauth_client_id: required("QUEUE_OAUTH2_CLIENT_ID"),
            oauth_client_secret: secret_file("QUEUE_OAUTH2_CLIENT_SECRET_FILE"),
            oauth_redirect_uri: required("QUEUE_OAUTH2_REDIRECT_URI"),
            oauth_use_pkce: env_or("QUEUE_OAUTH2_USE_PKCE", "true") == "true",
            valid_domain: env_or("QUEUE_VALID_DOMAIN", ""),
            site_admin_groups,
            sessions_key: secret_file("QUEUE_SESSIONS_KEY_FILE").into_bytes(),
            use_secure_cookies: env_or("USE_SECURE_COOKIES", "false") == "true",
            dev_mode: env_or("QUEUE_DEV_MODE", "false") == "true",
        }
    }

    /// Whether any of the session's identity-provider groups grants site
    /// admin.
    pub fn any_in_site_admin_groups(&self, groups: &[String]) -> bool {
        groups.iter().any(|g| self.site_admin_groups.contains(g))
    }
}

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

fn required(name: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| panic!("{name} must be set"))
}

fn secret_file(name: &str) -> String {
    let path = required(name);
    let contents =
        std::fs::read_to_string(&path).unwrap_or_else(|e| panic!("failed to read {path}: {e}"));
    contents.trim_end_matches(['\r', '\n']).to_string()
}
