// ==========================================
// MRP 订单系统 - 日志初始化
// ==========================================
// RUST_LOG 优先; 未设置时订单模块 debug, 其余 info
// MRP_ORDERS_LOG_JSON=1 时输出 JSON 行, 便于采集订单事件字段
// ==========================================

use tracing_subscriber::{fmt, EnvFilter};

const DEFAULT_DIRECTIVES: &str = "info,mrp_orders::api=debug";
const JSON_ENV: &str = "MRP_ORDERS_LOG_JSON";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LogFormat {
    Pretty,
    Json,
}

impl LogFormat {
    fn from_flag(flag: Option<&str>) -> Self {
        match flag.map(|v| v.trim().to_ascii_lowercase()) {
            Some(v) if matches!(v.as_str(), "1" | "true" | "yes") => LogFormat::Json,
            _ => LogFormat::Pretty,
        }
    }
}

fn build_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES))
}

/// 初始化进程级日志（只应在入口调用一次）
///
/// ```no_run
/// mrp_orders::logging::init();
/// ```
pub fn init() {
    let format = LogFormat::from_flag(std::env::var(JSON_ENV).ok().as_deref());
    let builder = fmt().with_env_filter(build_filter()).with_target(true);

    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.with_line_number(true).init(),
    }
}

/// 测试日志: 输出交给 libtest 捕获, 重复调用无副作用
pub fn init_test() {
    let _ = fmt()
        .with_env_filter(EnvFilter::new("debug"))
        .with_test_writer()
        .try_init();
}
