mod schedule;
mod settings;

use chrono::Utc;
use clap::Parser;
use plotin_core::common::time::{RealTimeProvider, TimeProvider};
use plotin_core::config::AppConfig;
use plotin_core::notify::port::Notifier;
use plotin_feed::yahoo::YahooProvider;
use plotin_notify::log::LogNotifier;
use plotin_notify::telegram::TelegramNotifier;
use plotin_signal::orchestrator::{NotificationOrchestrator, NotificationSettings};
use plotin_signal::runner::{AnalysisRunner, RunPlan};
use plotin_store::json::JsonSignalStore;
use schedule::CronSchedule;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

/// 均线金叉监控，信号变化时推送 Telegram 提醒。
#[derive(Parser, Debug)]
#[command(name = "plotin", version, about)]
struct Args {
    /// 配置文件路径
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,

    /// 将提醒发送到 Telegram (否则只写日志)
    #[arg(long)]
    send: bool,

    /// 按配置中的 schedules 常驻运行
    #[arg(long)]
    schedule: bool,
}

/// 同时输出到终端与 `plotin.log`；级别由 `RUST_LOG` 控制，默认 info。
fn init_tracing() -> WorkerGuard {
    let (file_writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::never(".", "plotin.log"));
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(fmt::layer().with_ansi(false).with_writer(file_writer))
        .init();
    guard
}

/// # Summary
/// 选择提醒通道。
///
/// # Logic
/// 需要发送且 Telegram 凭据完整时使用 `TelegramNotifier`；否则退化为 `LogNotifier`，
/// 分析流程照常进行。
fn build_notifier(app_config: &AppConfig, send: bool) -> Arc<dyn Notifier> {
    if !send {
        info!("Notifications enabled but --send flag not provided. Alerts will be logged only.");
        return Arc::new(LogNotifier);
    }
    let Some((token, chat_id)) = app_config.telegram_credentials() else {
        warn!("Telegram credentials missing. Alerts will be logged only.");
        return Arc::new(LogNotifier);
    };
    match TelegramNotifier::new(token.to_string(), chat_id.to_string()) {
        Ok(notifier) => Arc::new(notifier),
        Err(e) => {
            error!("Failed to initialize Telegram notifier: {}. Alerts will be logged only.", e);
            Arc::new(LogNotifier)
        }
    }
}

async fn run_once(runner: &AnalysisRunner) {
    let summary = runner.run().await;
    info!(
        "Run finished: {} symbols, {} alerts, {} alignments, {} delivery failures, persisted={}",
        summary.symbols_processed,
        summary.alerts_sent,
        summary.alignments_fired,
        summary.delivery_failures,
        summary.persisted
    );
}

/// # Summary
/// 常驻调度循环。
///
/// # Logic
/// 1. `run_initial` 为真时先立即执行一轮。
/// 2. 计算所有规则中最早的下一次触发并休眠至该时刻；期间收到 Ctrl+C 立即退出。
/// 3. 游标推进到已触发时刻，保证同一分钟不会重复执行。
async fn run_scheduled(
    runner: &AnalysisRunner,
    schedules: &[CronSchedule],
    run_initial: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if schedules.is_empty() {
        warn!("No schedules found in configuration");
    }
    if run_initial {
        info!("Running initial analysis");
        run_once(runner).await;
    }

    let mut cursor = Utc::now();
    loop {
        let now = Utc::now().max(cursor);
        let Some((fire_at, next)) = schedule::next_fire(schedules, now) else {
            info!("Nothing scheduled. Press Ctrl+C to exit");
            tokio::signal::ctrl_c().await?;
            return Ok(());
        };
        info!("Next run '{}' at {}", next.id(), fire_at);
        let wait = (fire_at - Utc::now()).to_std().unwrap_or_default();

        tokio::select! {
            _ = tokio::time::sleep(wait) => {
                info!("Running scheduled task '{}'", next.id());
                run_once(runner).await;
                cursor = fire_at;
            }
            signal = tokio::signal::ctrl_c() => {
                signal?;
                info!("Received exit signal. Shutting down...");
                return Ok(());
            }
        }
    }
}

/// # Summary
/// 应用启动入口，负责装配全部组件。
///
/// # Logic
/// 1. 初始化日志与 TLS 加密后端。
/// 2. 加载配置；提醒功能关闭时直接退出。
/// 3. 实例化基础设施层 (Yahoo 行情、JSON 状态文件、提醒通道)。
/// 4. 构造编排器与分析执行器。
/// 5. 单次执行，或进入调度循环。调度模式总是发送提醒，带 `--send` 时额外立即执行一轮。
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let _guard = init_tracing();
    info!("Starting golden cross monitor");

    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        warn!("TLS crypto provider already installed");
    }

    let app_config = settings::load_app_config(&args.config)?;
    if !app_config.notifications.enabled {
        warn!("Notifications are disabled in configuration. Nothing to do.");
        return Ok(());
    }
    let schedules = if args.schedule {
        schedule::parse_schedules(&app_config.schedules)?
    } else {
        Vec::new()
    };

    let clock: Arc<dyn TimeProvider> = Arc::new(RealTimeProvider);
    let provider = Arc::new(YahooProvider::new()?);
    let repository = Arc::new(JsonSignalStore::new(app_config.state_file()));
    let notifier = build_notifier(&app_config, args.send || args.schedule);

    let orchestrator = NotificationOrchestrator::new(
        notifier,
        clock.clone(),
        NotificationSettings::from(&app_config.notifications),
    );
    let runner = AnalysisRunner::new(
        provider,
        repository,
        orchestrator,
        clock,
        RunPlan {
            symbols: app_config.stocks.clone(),
            lookback_days: app_config.time_period,
            fast_period: app_config.notifications.fast_period,
            slow_period: app_config.notifications.slow_period,
        },
    );

    if args.schedule {
        run_scheduled(&runner, &schedules, args.send).await?;
    } else {
        run_once(&runner).await;
    }

    info!("Golden cross monitor finished");
    Ok(())
}
