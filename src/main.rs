// ==========================================
// 物流批次跟踪系统 - HTTP 服务入口
// ==========================================
// 配置来源: 环境变量 (见 config::app_config)
// ==========================================

use anyhow::Context;
use shipment_tracker::config::AppConfig;
use shipment_tracker::{logging, router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 初始化日志系统
    logging::init();

    tracing::info!("==================================================");
    tracing::info!("{}", shipment_tracker::APP_NAME);
    tracing::info!("系统版本: {}", shipment_tracker::VERSION);
    tracing::info!("==================================================");

    let config = AppConfig::from_env();
    tracing::info!(
        db_path = %config.db_path,
        bind_addr = %config.bind_addr,
        busy_timeout_ms = config.busy_timeout_ms,
        "进程配置已加载"
    );

    let state = AppState::new(&config).map_err(anyhow::Error::msg)?;

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("无法监听地址 {}", config.bind_addr))?;
    tracing::info!("HTTP 服务已启动: {}", config.bind_addr);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP 服务异常退出")?;

    tracing::info!("HTTP 服务已停止");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("监听退出信号失败: {}", e);
    }
}
