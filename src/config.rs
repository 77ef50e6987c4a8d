//! Runtime configuration from environment variables, overridable by CLI flags.

use std::collections::HashMap;
use std::time::Duration;

use anyhow::{anyhow, Result};

use crate::catalog::DEFAULT_PRIVILEGED_ROLE;
use crate::identity::CookieSettings;

pub const DEFAULT_HTTP_PORT: u16 = 7880;
pub const DEFAULT_BACKEND_TIMEOUT_MS: u64 = 5000;

#[derive(Debug, Clone)]
pub struct Config {
    pub http_port: u16,
    pub backend_url: String,
    pub backend_anon_key: String,
    /// Optional elevated key for table access; the anon key is used when unset.
    pub backend_service_key: Option<String>,
    pub backend_timeout: Duration,
    pub privileged_role: String,
    pub roles_require_auth: bool,
    pub cookies: CookieSettings,
}

impl Config {
    pub fn new(backend_url: impl Into<String>, backend_anon_key: impl Into<String>) -> Self {
        Self {
            http_port: DEFAULT_HTTP_PORT,
            backend_url: backend_url.into(),
            backend_anon_key: backend_anon_key.into(),
            backend_service_key: None,
            backend_timeout: Duration::from_millis(DEFAULT_BACKEND_TIMEOUT_MS),
            privileged_role: DEFAULT_PRIVILEGED_ROLE.to_string(),
            roles_require_auth: true,
            cookies: CookieSettings::default(),
        }
    }

    pub fn from_env() -> Result<Self> {
        let vars: HashMap<String, String> = std::env::vars().collect();
        Self::from_vars(&vars)
    }

    /// Build from an explicit variable map; `from_env` is a thin wrapper.
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self> {
        let get = |k: &str| vars.get(k).map(|s| s.trim().to_string()).filter(|s| !s.is_empty());

        let backend_url = get("BACKEND_URL").ok_or_else(|| anyhow!("BACKEND_URL must be set"))?;
        let backend_anon_key = get("BACKEND_ANON_KEY").ok_or_else(|| anyhow!("BACKEND_ANON_KEY must be set"))?;
        check_backend_url("BACKEND_URL", &backend_url)?;

        let mut cfg = Config::new(backend_url, backend_anon_key);
        cfg.backend_service_key = get("BACKEND_SERVICE_KEY");
        if let Some(v) = get("GATE_HTTP_PORT") {
            cfg.http_port = v.parse::<u16>().map_err(|e| anyhow!("invalid GATE_HTTP_PORT '{}': {}", v, e))?;
        }
        if let Some(v) = get("BACKEND_TIMEOUT_MS") {
            let ms = v.parse::<u64>().map_err(|e| anyhow!("invalid BACKEND_TIMEOUT_MS '{}': {}", v, e))?;
            cfg.backend_timeout = Duration::from_millis(ms);
        }
        if let Some(v) = get("PRIVILEGED_ROLE") { cfg.privileged_role = v; }
        if let Some(v) = get("ROLES_REQUIRE_AUTH") {
            cfg.roles_require_auth = parse_bool(&v).ok_or_else(|| anyhow!("invalid ROLES_REQUIRE_AUTH '{}'", v))?;
        }
        if let Some(v) = get("SESSION_COOKIE") { cfg.cookies.access_cookie = v; }
        if let Some(v) = get("REFRESH_COOKIE") { cfg.cookies.refresh_cookie = v; }
        if let Some(v) = get("SECURE_COOKIES") {
            cfg.cookies.secure = parse_bool(&v).ok_or_else(|| anyhow!("invalid SECURE_COOKIES '{}'", v))?;
        }
        Ok(cfg)
    }

    /// Apply `--http-port N` and `--backend-url URL` from the command line.
    pub fn apply_args(&mut self, args: &[String]) -> Result<()> {
        if let Some(v) = arg_value(args, "--http-port") {
            self.http_port = v.parse::<u16>().map_err(|e| anyhow!("invalid --http-port '{}': {}", v, e))?;
        }
        if let Some(v) = arg_value(args, "--backend-url") {
            let v = v.trim();
            check_backend_url("--backend-url", v)?;
            self.backend_url = v.to_string();
        }
        Ok(())
    }
}

fn check_backend_url(source: &str, url: &str) -> Result<()> {
    if url.starts_with("http://") || url.starts_with("https://") {
        Ok(())
    } else {
        Err(anyhow!("{} must be an http(s) URL, got '{}'", source, url))
    }
}

pub fn parse_bool(v: &str) -> Option<bool> {
    match v.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn arg_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    let i = args.iter().position(|a| a == flag)?;
    args.get(i + 1).map(|s| s.as_str())
}

pub fn has_flag(args: &[String], flag: &str) -> bool {
    args.iter().any(|a| a == flag)
}
