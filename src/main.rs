use std::sync::Arc;

use anyhow::Result;
use clap::{Arg, Command};
use surge::app::Application;
use surge::common::{init_logging, load_config, wait_for_shutdown_signal, StartupConfig};
use surge::shutdown::ShutdownManager;
use surge_config::{LogLevel, OutputFormat};
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // 解析命令行参数, 不带参数时完全依赖环境变量
    let matches = Command::new("surge-worker")
        .version("1.0.0")
        .about("风暴潮模拟队列 Worker")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("配置文件路径"),
        )
        .arg(
            Arg::new("log-level")
                .short('l')
                .long("log-level")
                .value_name("LEVEL")
                .help("日志级别")
                .value_parser(clap::value_parser!(LogLevel)),
        )
        .arg(
            Arg::new("log-format")
                .long("log-format")
                .value_name("FORMAT")
                .help("日志格式")
                .value_parser(clap::value_parser!(OutputFormat)),
        )
        .get_matches();

    let startup_config = StartupConfig {
        config_path: matches.get_one::<String>("config").cloned(),
        log_level: matches.get_one::<LogLevel>("log-level").copied(),
        log_format: matches.get_one::<OutputFormat>("log-format").copied(),
    };

    let config = load_config(&startup_config)?;
    init_logging(
        config.observability.log_level,
        config.observability.log_format,
    )?;

    info!("启动风暴潮模拟 Worker");
    if let Some(ref path) = startup_config.config_path {
        info!("配置文件: {path}");
    }

    let grace = config.worker.shutdown_timeout();
    let app = Arc::new(Application::new(config));
    let shutdown_manager = ShutdownManager::new();

    let mut app_handle = {
        let shutdown_rx = shutdown_manager.subscribe().await;
        let app = Arc::clone(&app);
        tokio::spawn(async move { app.run(shutdown_rx).await })
    };

    // 会话结束或收到信号, 先到者触发关闭
    let outcome = tokio::select! {
        joined = &mut app_handle => Some(joined),
        _ = wait_for_shutdown_signal() => None,
    };

    shutdown_manager.shutdown().await;

    let joined = match outcome {
        Some(joined) => joined,
        None => {
            info!("收到关闭信号，开始优雅关闭...");
            // 服务自身在宽限期内收尾, 这里多留一秒
            match tokio::time::timeout(grace + std::time::Duration::from_secs(1), app_handle).await
            {
                Ok(joined) => joined,
                Err(_) => {
                    warn!("应用关闭超时，强制退出");
                    return Ok(());
                }
            }
        }
    };

    match joined {
        Ok(Ok(())) => {
            info!("风暴潮模拟 Worker 已退出");
            Ok(())
        }
        Ok(Err(e)) => {
            error!("应用运行失败: {e:#}");
            Err(e)
        }
        Err(e) => Err(anyhow::anyhow!("应用任务异常终止: {e}")),
    }
}
