// ==========================================
// 物流批次跟踪系统 - 请求耗时与慢 SQL 记录
// ==========================================
// 慢 SQL: rusqlite profile 回调，超过阈值输出 warn (target = slow_sql)
// 请求耗时: OpTimer 在 drop 时输出 elapsed_ms 与本线程执行的语句数
// ==========================================

use rusqlite::Connection;
use std::cell::Cell;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

// 0 表示关闭
static SLOW_SQL_MS: AtomicU64 = AtomicU64::new(0);

thread_local! {
    static STATEMENTS: Cell<u64> = const { Cell::new(0) };
}

fn shorten(sql: &str, max_chars: usize) -> String {
    let flat = sql.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= max_chars {
        return flat;
    }
    let cut: String = flat.chars().take(max_chars).collect();
    format!("{}…", cut)
}

/// 在连接上安装语句耗时回调
///
/// # 参数
/// - slow_sql_ms: None 时清除回调，不记录
pub fn install_sql_profiling(conn: &mut Connection, slow_sql_ms: Option<u64>) {
    match slow_sql_ms {
        Some(ms) => {
            SLOW_SQL_MS.store(ms, Ordering::Relaxed);
            conn.profile(Some(on_statement_profiled));
            tracing::info!(slow_sql_ms = ms, "已开启慢 SQL 记录");
        }
        None => {
            SLOW_SQL_MS.store(0, Ordering::Relaxed);
            conn.profile(None);
        }
    }
}

fn on_statement_profiled(sql: &str, duration: Duration) {
    STATEMENTS.with(|c| c.set(c.get().saturating_add(1)));

    let threshold = SLOW_SQL_MS.load(Ordering::Relaxed);
    let ms = duration.as_millis() as u64;
    if threshold > 0 && ms >= threshold {
        tracing::warn!(
            target: "slow_sql",
            duration_ms = ms,
            sql = %shorten(sql, 300),
            "slow sql"
        );
    }
}

/// 操作计时 Guard
///
/// ```ignore
/// let _timer = shipment_tracker::perf::OpTimer::new("http.assign_carriers");
/// ```
pub struct OpTimer {
    op: &'static str,
    start: Instant,
    statements_at_start: u64,
}

impl OpTimer {
    pub fn new(op: &'static str) -> Self {
        Self {
            op,
            start: Instant::now(),
            statements_at_start: STATEMENTS.with(|c| c.get()),
        }
    }
}

impl Drop for OpTimer {
    fn drop(&mut self) {
        let statements = STATEMENTS
            .with(|c| c.get())
            .saturating_sub(self.statements_at_start);
        tracing::debug!(
            target: "perf",
            op = self.op,
            elapsed_ms = self.start.elapsed().as_millis() as u64,
            statements,
            "done"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shorten_flattens_whitespace() {
        assert_eq!(shorten("SELECT *\n   FROM batch", 100), "SELECT * FROM batch");
        assert_eq!(shorten("SELECT id FROM shipment", 6), "SELECT…");
    }

    #[test]
    fn test_statements_counted_when_profiling_enabled() {
        let mut conn = Connection::open_in_memory().unwrap();
        install_sql_profiling(&mut conn, Some(10_000));

        let before = STATEMENTS.with(|c| c.get());
        conn.execute_batch("CREATE TABLE t (id INTEGER); INSERT INTO t VALUES (1);")
            .unwrap();
        let after = STATEMENTS.with(|c| c.get());
        assert!(after > before);

        install_sql_profiling(&mut conn, None);
    }
}
