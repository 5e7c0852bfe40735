//! 日誌初始化
//!
//! 使用 tracing-subscriber，日誌層級由 `RUST_LOG` 控制（預設 info），
//! 例如 `RUST_LOG=cutplan_sync=debug`。

use tracing_subscriber::{fmt, EnvFilter};

/// 初始化日誌
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_line_number(true)
        .init();
}

/// 測試用日誌（debug 層級，輸出到測試擷取器；可重複呼叫）
pub fn init_test() {
    let _ = fmt()
        .with_env_filter(EnvFilter::new("debug"))
        .with_test_writer()
        .try_init();
}
