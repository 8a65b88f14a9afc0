use crate::config::ProvisioningConfig;

pub const LIMIT_MEMORY_HARD: u64 = 2_684_354_560;
pub const LIMIT_MEMORY_SOFT: u64 = 2_147_483_648;
pub const LIMIT_REQUEST: u32 = 8192;
pub const LIMIT_TIME_CPU: u32 = 600;
pub const LIMIT_TIME_REAL: u32 = 1200;
pub const MAX_CRON_THREADS: u32 = 1;
pub const LOG_LEVEL: &str = "info";

/// Render the application server's `[options]` file.
pub fn render(cfg: &ProvisioningConfig) -> String {
    let layout = &cfg.layout;
    format!(
        "[options]
admin_passwd = {admin}
db_host = localhost
db_port = 5432
db_user = {user}
db_password = {db}
addons_path = {addons}
http_port = {http_port}
{realtime_key} = {realtime_port}
proxy_mode = True
workers = {workers}
max_cron_threads = {MAX_CRON_THREADS}
limit_memory_hard = {LIMIT_MEMORY_HARD}
limit_memory_soft = {LIMIT_MEMORY_SOFT}
limit_request = {LIMIT_REQUEST}
limit_time_cpu = {LIMIT_TIME_CPU}
limit_time_real = {LIMIT_TIME_REAL}
logfile = {logfile}
log_level = {LOG_LEVEL}
",
        admin = cfg.secrets.admin_password,
        user = layout.user,
        db = cfg.secrets.db_password,
        addons = layout.addons_path(),
        http_port = layout.http_port,
        realtime_key = cfg.realtime_port_key(),
        realtime_port = layout.realtime_port,
        workers = cfg.workers,
        logfile = layout.log_file().display(),
    )
}
