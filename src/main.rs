use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use inventory_gate::config::{has_flag, Config};

const USAGE: &str = "inventory_gate\n\nUSAGE:\n  inventory_gate [--http-port N] [--backend-url URL]\n\nOPTIONS:\n  --http-port N        HTTP port (env: GATE_HTTP_PORT, default 7880)\n  --backend-url URL    Identity/data backend base URL (env: BACKEND_URL, required)\n\nENVIRONMENT:\n  BACKEND_ANON_KEY     Public API key for the backend (required)\n  BACKEND_SERVICE_KEY  Key for table access (optional)\n  PRIVILEGED_ROLE      Role hidden from self-service listings (default super_admin)\n  ROLES_REQUIRE_AUTH   Require a session for GET /api/roles (default true)\n  SESSION_COOKIE, REFRESH_COOKIE, SECURE_COOKIES, BACKEND_TIMEOUT_MS\n";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))?;
    fmt().with_env_filter(filter).init();

    let args: Vec<String> = std::env::args().collect();
    if has_flag(&args, "--help") || has_flag(&args, "-h") {
        println!("{}", USAGE);
        return Ok(());
    }

    let rust_log = std::env::var("RUST_LOG").unwrap_or_else(|_| "<unset>".to_string());
    info!(target: "startup", "RUST_LOG='{}'", rust_log);

    let mut config = Config::from_env()?;
    config.apply_args(&args)?;
    inventory_gate::server::run_with_config(config).await
}
