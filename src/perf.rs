// ==========================================
// MRP 订单系统 - SQL 性能统计
// ==========================================
// 每个订单操作（下单/收货/分配/完工）统计 SQL 语句数与慢语句数
// MRP_ORDERS_PERF_SQL=1 强制开启（Debug 构建默认开启）
// MRP_ORDERS_SLOW_SQL_MS 慢语句阈值（毫秒）
// ==========================================

use rusqlite::Connection;
use std::cell::Cell;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

static ENABLED: AtomicBool = AtomicBool::new(false);
static SLOW_MS: AtomicU64 = AtomicU64::new(0);

/// 当前线程上正在进行的订单操作计数器
#[derive(Clone, Copy, Default)]
struct OpCounters {
    depth: u32,
    statements: u64,
    slow: u64,
}

thread_local! {
    static COUNTERS: Cell<OpCounters> = const {
        Cell::new(OpCounters { depth: 0, statements: 0, slow: 0 })
    };
}

fn update(f: impl FnOnce(&mut OpCounters)) {
    COUNTERS.with(|cell| {
        let mut c = cell.get();
        f(&mut c);
        cell.set(c);
    });
}

fn snapshot() -> OpCounters {
    COUNTERS.with(Cell::get)
}

fn perf_enabled_from_env() -> bool {
    match std::env::var("MRP_ORDERS_PERF_SQL") {
        Ok(v) => matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "on"),
        Err(_) => cfg!(debug_assertions),
    }
}

/// 日志中的 SQL 压成一行并截断
fn compact_sql(sql: &str, limit: usize) -> String {
    let mut words = sql.split_whitespace();
    let mut flat = words.next().unwrap_or_default().to_string();
    for w in words {
        flat.push(' ');
        flat.push_str(w);
    }
    match flat.char_indices().nth(limit) {
        Some((cut, _)) => format!("{}…", &flat[..cut]),
        None => flat,
    }
}

/// 为连接挂上 trace/profile 回调; 关闭时清除旧回调
pub fn install_sqlite_tracing(conn: &mut Connection) {
    let enabled = perf_enabled_from_env();
    ENABLED.store(enabled, Ordering::Relaxed);
    if !enabled {
        conn.trace(None);
        conn.profile(None);
        return;
    }

    let default_ms = if cfg!(debug_assertions) { 50 } else { 200 };
    let slow_ms = std::env::var("MRP_ORDERS_SLOW_SQL_MS")
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default_ms);
    SLOW_MS.store(slow_ms, Ordering::Relaxed);

    conn.trace(Some(count_statement));
    conn.profile(Some(check_slow_statement));
}

fn count_statement(_sql: &str) {
    if ENABLED.load(Ordering::Relaxed) {
        update(|c| {
            if c.depth > 0 {
                c.statements += 1;
            }
        });
    }
}

fn check_slow_statement(sql: &str, elapsed: Duration) {
    let threshold = SLOW_MS.load(Ordering::Relaxed);
    if !ENABLED.load(Ordering::Relaxed) || threshold == 0 {
        return;
    }
    let ms = elapsed.as_millis() as u64;
    if ms < threshold {
        return;
    }
    tracing::warn!(target: "slow_sql", duration_ms = ms, sql = %compact_sql(sql, 400), "slow sql");
    update(|c| {
        if c.depth > 0 {
            c.slow += 1;
        }
    });
}

/// 订单操作计时; drop 时以 debug 级别输出耗时与语句数
///
/// 可嵌套, 外层操作的统计包含内层
pub struct PerfGuard {
    op: &'static str,
    started: Instant,
    base: OpCounters,
}

impl PerfGuard {
    pub fn new(op: &'static str) -> Self {
        update(|c| c.depth += 1);
        Self {
            op,
            started: Instant::now(),
            base: snapshot(),
        }
    }

    pub fn sql_count(&self) -> u64 {
        snapshot().statements - self.base.statements
    }
}

impl Drop for PerfGuard {
    fn drop(&mut self) {
        let now = snapshot();
        tracing::debug!(
            target: "perf",
            op = self.op,
            elapsed_ms = self.started.elapsed().as_millis() as u64,
            sql_count = now.statements - self.base.statements,
            slow_sql_count = now.slow - self.base.slow,
            "order operation finished"
        );
        update(|c| c.depth = c.depth.saturating_sub(1));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compact_sql() {
        let sql = "SELECT *\n   FROM stock_item\n WHERE id = ?";
        assert_eq!(compact_sql(sql, 100), "SELECT * FROM stock_item WHERE id = ?");
        assert_eq!(compact_sql(sql, 6), "SELECT…");
        assert_eq!(compact_sql("   ", 10), "");
    }

    #[test]
    fn test_nested_guards_restore_depth() {
        {
            let _outer = PerfGuard::new("complete_build");
            let _inner = PerfGuard::new("allocate_build_stock");
            assert_eq!(snapshot().depth, 2);
        }
        assert_eq!(snapshot().depth, 0);
    }
}
