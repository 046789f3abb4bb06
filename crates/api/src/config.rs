use crate::auth::jwt::JwtConfig;

/// Deployment environment. Only `production` changes behaviour (secure cookies).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
}

/// Log output format selected by `LOG_FORMAT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Lifetimes and sizes of the single-use secrets handed out by email.
#[derive(Debug, Clone)]
pub struct TokenSettings {
    /// Default invite lifetime in days.
    pub invite_expiration_days: i64,
    /// Random bytes per invite token.
    pub invite_token_bytes: usize,
    /// Password reset token lifetime in hours.
    pub password_reset_expiration_hours: i64,
    /// Magic-link login code lifetime in minutes.
    pub login_code_expiry_mins: i64,
}

impl Default for TokenSettings {
    fn default() -> Self {
        Self {
            invite_expiration_days: 7,
            invite_token_bytes: onboard_core::tokens::DEFAULT_TOKEN_BYTES,
            password_reset_expiration_hours: 1,
            login_code_expiry_mins: 10,
        }
    }
}

/// Credentials for the administrator created on first start.
#[derive(Clone)]
pub struct BootstrapAdmin {
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for BootstrapAdmin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BootstrapAdmin")
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

/// Server configuration loaded from environment variables.
///
/// All fields except the database URL and JWT secret have defaults suitable
/// for local development.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    pub app_env: AppEnv,
    /// Product name used in email subjects and on the SOW.
    pub app_name: String,
    /// Public web origin used to build links in emails.
    pub app_base_url: String,
    pub tokens: TokenSettings,
    /// Root directory of the disk object store.
    pub storage_dir: String,
    /// HMAC key for signed download URLs.
    pub storage_signing_secret: String,
    /// Period of the background invite expiry sweep.
    pub invite_sweep_interval_secs: u64,
    pub log_format: LogFormat,
    /// First administrator, created at startup when both are set.
    pub bootstrap_admin: Option<BootstrapAdmin>,
    /// JWT token configuration (secret, expiry durations).
    pub jwt: JwtConfig,
}

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.into())
}

fn parse_env<T: std::str::FromStr>(name: &str, default: &str) -> T {
    env_or(name, default)
        .parse()
        .unwrap_or_else(|_| panic!("{name} must be a valid number"))
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                           | Default                  |
    /// |-----------------------------------|--------------------------|
    /// | `HOST`                            | `0.0.0.0`                |
    /// | `PORT`                            | `3000`                   |
    /// | `CORS_ORIGINS`                    | `http://localhost:5173`  |
    /// | `REQUEST_TIMEOUT_SECS`            | `30`                     |
    /// | `APP_ENV`                         | `development`            |
    /// | `APP_NAME`                        | `Client Onboarding`      |
    /// | `APP_BASE_URL`                    | `http://localhost:5173`  |
    /// | `INVITE_EXPIRATION_DAYS`          | `7`                      |
    /// | `INVITE_TOKEN_BYTES`              | `32`                     |
    /// | `PASSWORD_RESET_EXPIRATION_HOURS` | `1`                      |
    /// | `LOGIN_CODE_EXPIRY_MINS`          | `10`                     |
    /// | `STORAGE_DIR`                     | `./data/uploads`         |
    /// | `STORAGE_SIGNING_SECRET`          | value of `JWT_SECRET`    |
    /// | `INVITE_SWEEP_INTERVAL_SECS`      | `3600`                   |
    /// | `LOG_FORMAT`                      | `pretty`                 |
    /// | `BOOTSTRAP_ADMIN_EMAIL`           | unset                    |
    /// | `BOOTSTRAP_ADMIN_PASSWORD`        | unset                    |
    ///
    /// JWT variables are documented on [`JwtConfig::from_env`].
    pub fn from_env() -> Self {
        let host = env_or("HOST", "0.0.0.0");
        let port: u16 = parse_env("PORT", "3000");

        let cors_origins: Vec<String> = env_or("CORS_ORIGINS", "http://localhost:5173")
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = parse_env("REQUEST_TIMEOUT_SECS", "30");

        let app_env = match env_or("APP_ENV", "development").as_str() {
            "production" => AppEnv::Production,
            _ => AppEnv::Development,
        };

        let app_name = env_or("APP_NAME", "Client Onboarding");

        let app_base_url = env_or("APP_BASE_URL", "http://localhost:5173")
            .trim_end_matches('/')
            .to_string();

        let defaults = TokenSettings::default();
        let tokens = TokenSettings {
            invite_expiration_days: parse_env(
                "INVITE_EXPIRATION_DAYS",
                &defaults.invite_expiration_days.to_string(),
            ),
            invite_token_bytes: parse_env(
                "INVITE_TOKEN_BYTES",
                &defaults.invite_token_bytes.to_string(),
            ),
            password_reset_expiration_hours: parse_env(
                "PASSWORD_RESET_EXPIRATION_HOURS",
                &defaults.password_reset_expiration_hours.to_string(),
            ),
            login_code_expiry_mins: parse_env(
                "LOGIN_CODE_EXPIRY_MINS",
                &defaults.login_code_expiry_mins.to_string(),
            ),
        };

        let jwt = JwtConfig::from_env();

        let storage_dir = env_or("STORAGE_DIR", "./data/uploads");
        let storage_signing_secret =
            std::env::var("STORAGE_SIGNING_SECRET").unwrap_or_else(|_| jwt.secret.clone());

        let invite_sweep_interval_secs: u64 = parse_env("INVITE_SWEEP_INTERVAL_SECS", "3600");

        let log_format = match env_or("LOG_FORMAT", "pretty").as_str() {
            "json" => LogFormat::Json,
            _ => LogFormat::Pretty,
        };

        let bootstrap_admin = match (
            std::env::var("BOOTSTRAP_ADMIN_EMAIL"),
            std::env::var("BOOTSTRAP_ADMIN_PASSWORD"),
        ) {
            (Ok(email), Ok(password)) if !email.is_empty() && !password.is_empty() => {
                Some(BootstrapAdmin { email, password })
            }
            _ => None,
        };

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            app_env,
            app_name,
            app_base_url,
            tokens,
            storage_dir,
            storage_signing_secret,
            invite_sweep_interval_secs,
            log_format,
            bootstrap_admin,
            jwt,
        }
    }

    /// Cookies carry the `Secure` attribute only in production.
    pub fn secure_cookies(&self) -> bool {
        self.app_env == AppEnv::Production
    }
}
