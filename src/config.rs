use anyhow::Context;
use std::env;

const DEFAULT_DATABASE_URL: &str = "sqlite://meal_management.db?mode=rwc";
const DEFAULT_SECRET_KEY: &str = "your-secret-key-change-this-in-production";
const DEFAULT_ADMIN_PASSWORD: &str = "admin123";
const DEFAULT_ORGANIZATION_NAME: &str = "Banasree Boys";

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub rust_log: String,
    pub secret_key: String,
    pub admin_password: String,
    pub port: u16,
    pub template_dir: String,
    pub static_dir: String,
    pub organization_name: String,
}

impl Config {
    /// Reads the environment, loading `.env` first when one exists.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let debug = env::var("DEBUG")
            .map(|v| v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);
        let rust_log = env::var("RUST_LOG")
            .unwrap_or_else(|_| if debug { "debug" } else { "info" }.into());
        let port = match env::var("PORT") {
            Ok(port) => port
                .parse()
                .with_context(|| format!("PORT must be a port number, got {port:?}"))?,
            Err(_) => 5000,
        };

        Ok(Self {
            database_url: env_or("DATABASE_URL", DEFAULT_DATABASE_URL),
            rust_log,
            secret_key: env_or("SECRET_KEY", DEFAULT_SECRET_KEY),
            admin_password: env_or("ADMIN_PASSWORD", DEFAULT_ADMIN_PASSWORD),
            port,
            template_dir: env_or("TEMPLATE_DIR", "templates"),
            static_dir: env_or("STATIC_DIR", "static"),
            organization_name: env_or("ORGANIZATION_NAME", DEFAULT_ORGANIZATION_NAME),
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.into(),
            rust_log: "info".into(),
            secret_key: DEFAULT_SECRET_KEY.into(),
            admin_password: DEFAULT_ADMIN_PASSWORD.into(),
            port: 5000,
            template_dir: "templates".into(),
            static_dir: "static".into(),
            organization_name: DEFAULT_ORGANIZATION_NAME.into(),
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}
