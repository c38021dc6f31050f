use std::time::Duration;

/// Default signing secret for local runs and tests
pub const DEV_JWT_SECRET: &str = "ayur-mock-dev-secret-change-me";

/// ayur-auth-mock configuration, read from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Listen port (0 picks an ephemeral port)
    pub port: u16,
    /// HS256 signing secret
    pub jwt_secret: String,
    /// Token lifetime
    pub token_ttl_minutes: i64,
    /// Fixed latency added to login, register and me
    pub auth_delay: Duration,
    /// Admin account created at startup (admins cannot self-register)
    pub seed_admin: Option<SeedAdmin>,
}

#[derive(Debug, Clone)]
pub struct SeedAdmin {
    pub email: String,
    pub password: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 0,
            jwt_secret: DEV_JWT_SECRET.to_string(),
            token_ttl_minutes: 60,
            auth_delay: Duration::ZERO,
            seed_admin: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let seed_admin = match (
            std::env::var("SEED_ADMIN_EMAIL"),
            std::env::var("SEED_ADMIN_PASSWORD"),
        ) {
            (Ok(email), Ok(password)) => Some(SeedAdmin { email, password }),
            _ => None,
        };

        Self {
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(5000),
            jwt_secret: std::env::var("JWT_SECRET").unwrap_or_else(|_| {
                tracing::warn!("JWT_SECRET not set, using the development secret");
                DEV_JWT_SECRET.to_string()
            }),
            token_ttl_minutes: std::env::var("TOKEN_TTL_MINUTES")
                .ok()
                .and_then(|m| m.parse().ok())
                .unwrap_or(60 * 24 * 30),
            auth_delay: std::env::var("AUTH_DELAY_MS")
                .ok()
                .and_then(|ms| ms.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(Duration::ZERO),
            seed_admin,
        }
    }

    pub fn with_auth_delay(mut self, delay: Duration) -> Self {
        self.auth_delay = delay;
        self
    }

    pub fn with_token_ttl_minutes(mut self, minutes: i64) -> Self {
        self.token_ttl_minutes = minutes;
        self
    }

    pub fn with_seed_admin(
        mut self,
        email: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.seed_admin = Some(SeedAdmin {
            email: email.into(),
            password: password.into(),
        });
        self
    }
}
