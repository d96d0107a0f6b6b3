use serde::Deserialize;

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "dev" | "development" | "local" | "test" => Environment::Development,
            _ => Environment::Production,
        }
    }

    /// Reset links are echoed in API responses outside production.
    pub fn exposes_reset_links(self) -> bool {
        self == Environment::Development
    }

    /// Internal error detail is added to 500 bodies outside production.
    pub fn exposes_error_detail(self) -> bool {
        self == Environment::Development
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResetConfig {
    pub ttl_minutes: i64,
    pub frontend_origin: String,
}

impl ResetConfig {
    pub fn reset_url(&self, token: &str) -> String {
        format!(
            "{}/reset-password?token={}",
            self.frontend_origin.trim_end_matches('/'),
            token
        )
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub environment: Environment,
    pub jwt: JwtConfig,
    pub reset: ResetConfig,
    pub smtp: Option<SmtpConfig>,
}

fn env_i64(key: &str, default: i64) -> i64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<i64>().ok())
        .unwrap_or(default)
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let environment = std::env::var("APP_ENV")
            .map(|v| Environment::parse(&v))
            .unwrap_or(Environment::Production);
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "travelhub".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "travelhub-users".into()),
            ttl_minutes: env_i64("JWT_TTL_MINUTES", 60 * 24),
        };
        let reset = ResetConfig {
            ttl_minutes: env_i64("RESET_TOKEN_TTL_MINUTES", 60),
            frontend_origin: std::env::var("FRONTEND_ORIGIN")
                .unwrap_or_else(|_| "http://localhost:3000".into()),
        };
        let smtp = match std::env::var("SMTP_HOST") {
            Ok(host) if !host.trim().is_empty() => Some(SmtpConfig {
                host,
                port: std::env::var("SMTP_PORT")
                    .ok()
                    .and_then(|v| v.parse::<u16>().ok())
                    .unwrap_or(587),
                username: std::env::var("SMTP_USERNAME").ok(),
                password: std::env::var("SMTP_PASSWORD").ok(),
                from: std::env::var("MAIL_FROM")
                    .unwrap_or_else(|_| "TravelHub <no-reply@travelhub.local>".into()),
            }),
            _ => None,
        };
        Ok(Self {
            database_url,
            environment,
            jwt,
            reset,
            smtp,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn environment_parsing_defaults_to_production() {
        assert_eq!(Environment::parse("development"), Environment::Development);
        assert_eq!(Environment::parse(" DEV "), Environment::Development);
        assert_eq!(Environment::parse("production"), Environment::Production);
        assert_eq!(Environment::parse("staging"), Environment::Production);
        assert!(!Environment::Production.exposes_reset_links());
        assert!(Environment::Development.exposes_error_detail());
    }

    #[test]
    fn reset_url_uses_query_form_and_trims_slash() {
        let cfg = ResetConfig {
            ttl_minutes: 60,
            frontend_origin: "https://travelhub.example/".into(),
        };
        assert_eq!(
            cfg.reset_url("abc123"),
            "https://travelhub.example/reset-password?token=abc123"
        );
    }
}
