use std::net::IpAddr;

use ipnet::IpNet;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub host: IpAddr,
    pub port: u16,
    pub base_url: String,
    pub session_ttl_secs: i64,
    pub max_body_size: usize,
    /// Peers allowed to report the client address via `x-forwarded-for`.
    pub trusted_proxies: Vec<IpNet>,
    pub log_level: String,
    /// Entity types whose reads skip authentication. `None` keeps each
    /// resource's built-in default.
    pub public_reads: Option<Vec<String>>,
    pub contact_recipient: Option<String>,
    pub smtp: Option<SmtpConfig>,
}

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub pass: String,
    pub from: String,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        let database_url = std::env::var("DATABASE_URL").ok().filter(|s| !s.is_empty());
        let jwt_secret = env_required("JWT_SECRET")?;

        let host: IpAddr = env_or("HUMANIKA_HOST", "0.0.0.0")
            .parse()
            .map_err(|e| format!("Invalid HUMANIKA_HOST: {e}"))?;

        let port: u16 = env_or("HUMANIKA_PORT", "3000")
            .parse()
            .map_err(|e| format!("Invalid HUMANIKA_PORT: {e}"))?;

        let base_url = env_or("HUMANIKA_BASE_URL", &format!("http://{host}:{port}"));

        let session_ttl_secs: i64 = env_or("HUMANIKA_SESSION_TTL_SECS", "604800")
            .parse()
            .map_err(|e| format!("Invalid HUMANIKA_SESSION_TTL_SECS: {e}"))?;

        let max_body_size: usize = env_or("HUMANIKA_MAX_BODY_SIZE", "1048576")
            .parse()
            .map_err(|e| format!("Invalid HUMANIKA_MAX_BODY_SIZE: {e}"))?;

        let trusted_proxies: Vec<IpNet> = parse_list(&env_or("HUMANIKA_TRUSTED_PROXIES", ""))
            .iter()
            .map(|s| {
                s.parse()
                    .map_err(|e| format!("Invalid HUMANIKA_TRUSTED_PROXIES entry '{s}': {e}"))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let log_level = env_or("HUMANIKA_LOG_LEVEL", "info");

        let public_reads = std::env::var("HUMANIKA_PUBLIC_READS")
            .ok()
            .map(|raw| parse_list(&raw));

        let contact_recipient = std::env::var("HUMANIKA_CONTACT_RECIPIENT")
            .ok()
            .filter(|s| !s.trim().is_empty());

        let smtp = match (
            std::env::var("HUMANIKA_SMTP_HOST").ok(),
            std::env::var("HUMANIKA_SMTP_PORT").ok(),
            std::env::var("HUMANIKA_SMTP_USER").ok(),
            std::env::var("HUMANIKA_SMTP_PASS").ok(),
            std::env::var("HUMANIKA_SMTP_FROM").ok(),
        ) {
            (Some(host), Some(port), Some(user), Some(pass), Some(from)) => Some(SmtpConfig {
                host,
                port: port
                    .parse()
                    .map_err(|e| format!("Invalid HUMANIKA_SMTP_PORT: {e}"))?,
                user,
                pass,
                from,
            }),
            _ => None,
        };

        Ok(Config {
            database_url,
            jwt_secret,
            host,
            port,
            base_url,
            session_ttl_secs,
            max_body_size,
            trusted_proxies,
            log_level,
            public_reads,
            contact_recipient,
            smtp,
        })
    }

    /// Whether reads of `entity_type` are open to anonymous callers.
    pub fn is_public_read(&self, entity_type: &str, default: bool) -> bool {
        match &self.public_reads {
            Some(list) => list.iter().any(|t| t.eq_ignore_ascii_case(entity_type)),
            None => default,
        }
    }
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn env_required(key: &str) -> Result<String, String> {
    std::env::var(key).map_err(|_| format!("Missing required environment variable: {key}"))
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
