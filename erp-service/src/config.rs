use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(name = "erp-service", about = "CustoSmart ERP API")]
pub struct Args {
    /// PostgreSQL URL. Without it the service keeps everything in memory.
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,

    #[arg(long, env = "PORT", default_value = "5000")]
    pub port: u16,

    #[arg(long, env = "JWT_SECRET", default_value = "custosmart-dev-secret")]
    pub jwt_secret: String,

    #[arg(long, env = "TOKEN_TTL_HOURS", default_value = "24")]
    pub token_ttl_hours: i64,

    #[arg(long, env = "PASSWORD_ITERATIONS", default_value = "100000")]
    pub password_iterations: u32,

    #[arg(long, env = "ADMIN_USERNAME", default_value = "admin")]
    pub admin_username: String,

    #[arg(long, env = "ADMIN_PASSWORD", default_value = "admin123")]
    pub admin_password: String,

    #[arg(long, env = "UPLOADS_DIR", default_value = "uploads")]
    pub uploads_dir: PathBuf,

    #[arg(long, env = "SWEEP_INTERVAL_SECS", default_value = "300")]
    pub sweep_interval_secs: u64,

    /// Days before expiry at which certificate alerts are raised.
    #[arg(long, env = "CERTIFICATE_WARNING_DAYS", default_value = "30")]
    pub certificate_warning_days: u64,
}

/// Runtime settings shared by handlers.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
    pub password_iterations: u32,
    pub uploads_dir: PathBuf,
    pub max_upload_bytes: usize,
}

impl AppConfig {
    pub const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

    pub fn from_args(args: &Args) -> Self {
        AppConfig {
            jwt_secret: args.jwt_secret.clone(),
            token_ttl_hours: args.token_ttl_hours,
            password_iterations: args.password_iterations,
            uploads_dir: args.uploads_dir.clone(),
            max_upload_bytes: Self::MAX_UPLOAD_BYTES,
        }
    }
}
