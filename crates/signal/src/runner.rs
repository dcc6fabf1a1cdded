use crate::classifier::classify;
use crate::indicator::attach_indicators;
use crate::orchestrator::NotificationOrchestrator;
use chrono::Duration;
use futures::future::join_all;
use plotin_core::common::time::TimeProvider;
use plotin_core::common::{Stock, TimeFrame};
use plotin_core::market::port::MarketDataProvider;
use plotin_core::signal::entity::{SignalRecord, SignalStateMap};
use plotin_core::signal::port::SignalStateRepository;
use plotin_core::store::error::StoreError;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{error, info, warn};

/// 抓取窗口在回看天数之外追加的缓冲天数。
pub const HISTORY_BUFFER_DAYS: i64 = 150;
// 美股常规交易时段 (6.5 小时)
const SESSION_SECS: i64 = 23_400;
// 一年内休市日的余量
const HOLIDAY_MARGIN_DAYS: i64 = 12;

/// # Summary
/// 计算某周期需要回溯的自然日天数。
///
/// # Logic
/// 1. 分类需要慢均线填满后至少两根 K 线，再留一根余量：`slow_period + 2` 根。
/// 2. 按每个交易时段可产生的 K 线数折算交易日 (日线每日一根)。
/// 3. 交易日按 5/7 折算为自然日，并加上休市余量。
/// 4. 与 `lookback_days + HISTORY_BUFFER_DAYS` 取较大值。
pub fn history_days(timeframe: TimeFrame, lookback_days: u32, slow_period: u32) -> i64 {
    let required_bars = i64::from(slow_period) + 2;
    let bars_per_session = (SESSION_SECS / timeframe.seconds()).max(1);
    let trading_days = (required_bars + bars_per_session - 1) / bars_per_session;
    let calendar_days = (trading_days * 7 + 4) / 5 + HOLIDAY_MARGIN_DAYS;
    (i64::from(lookback_days) + HISTORY_BUFFER_DAYS).max(calendar_days)
}

/// # Summary
/// 一轮运行的输入参数。
#[derive(Debug, Clone)]
pub struct RunPlan {
    pub symbols: Vec<String>,
    // 回看天数
    pub lookback_days: u32,
    pub fast_period: u32,
    pub slow_period: u32,
}

/// # Summary
/// 一轮运行的汇总。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    // 至少有一个周期分类成功的标的数
    pub symbols_processed: usize,
    pub alerts_sent: usize,
    pub alignments_fired: usize,
    pub delivery_failures: usize,
    // 本轮是否成功落盘
    pub persisted: bool,
}

/// # Summary
/// 分析执行器：一轮完整的 加载状态 -> 抓取 -> 分类 -> 编排 -> 落盘。
///
/// # Invariants
/// - 状态在每轮开始时加载一次，结束时最多保存一次。
/// - 任何单个 (标的, 周期) 的失败都只会跳过该组合。
pub struct AnalysisRunner {
    provider: Arc<dyn MarketDataProvider>,
    repository: Arc<dyn SignalStateRepository>,
    orchestrator: NotificationOrchestrator,
    clock: Arc<dyn TimeProvider>,
    plan: RunPlan,
}

impl AnalysisRunner {
    pub fn new(
        provider: Arc<dyn MarketDataProvider>,
        repository: Arc<dyn SignalStateRepository>,
        orchestrator: NotificationOrchestrator,
        clock: Arc<dyn TimeProvider>,
        plan: RunPlan,
    ) -> Self {
        Self {
            provider,
            repository,
            orchestrator,
            clock,
            plan,
        }
    }

    /// # Summary
    /// 执行一轮分析。
    ///
    /// # Logic
    /// 1. 加载状态；文件损坏时记录警告并从空状态开始。
    /// 2. 并发抓取所有 标的 x {快, 慢} 周期的 K 线并完成分类。
    /// 3. 按标的顺序串行交给编排器，保证状态写入顺序确定。
    /// 4. 若状态有变更则保存一次；保存失败只记录错误。
    pub async fn run(&self) -> RunSummary {
        let mut state = self.load_state().await;
        let mut summary = RunSummary::default();

        let settings = self.orchestrator.settings();
        let timeframes = [settings.fast_timeframe, settings.slow_timeframe];
        info!(
            "Analyzing {} stocks: {}",
            self.plan.symbols.len(),
            self.plan.symbols.join(", ")
        );

        let jobs = self.plan.symbols.iter().flat_map(|symbol| {
            timeframes
                .iter()
                .map(move |&timeframe| self.evaluate(symbol, timeframe))
        });
        let results = join_all(jobs).await;

        let mut by_symbol: BTreeMap<&str, BTreeMap<TimeFrame, SignalRecord>> = BTreeMap::new();
        for (symbol, timeframe, record) in results.into_iter().flatten() {
            by_symbol.entry(symbol).or_default().insert(timeframe, record);
        }

        for symbol in &self.plan.symbols {
            let Some(signals) = by_symbol.get(symbol.as_str()) else {
                warn!("No usable signal data for {}. Skipping.", symbol);
                continue;
            };
            let outcome = self
                .orchestrator
                .process_symbol(&mut state, symbol, signals)
                .await;
            summary.symbols_processed += 1;
            summary.alerts_sent += outcome.notified.len();
            summary.delivery_failures += outcome.delivery_failures;
            if outcome.alignment_fired {
                summary.alignments_fired += 1;
                summary.alerts_sent += 1;
            }
        }

        if state.is_dirty() {
            match self.repository.save(&state).await {
                Ok(()) => {
                    state.mark_clean();
                    summary.persisted = true;
                }
                Err(e) => error!("Failed to persist signal state: {}", e),
            }
        }

        info!(
            "Run complete: {} of {} stocks processed, {} alerts sent",
            summary.symbols_processed,
            self.plan.symbols.len(),
            summary.alerts_sent
        );
        summary
    }

    async fn load_state(&self) -> SignalStateMap {
        match self.repository.load().await {
            Ok(state) => state,
            Err(StoreError::Corrupted(reason)) => {
                warn!("Signal state is corrupted ({}). Starting fresh.", reason);
                SignalStateMap::new()
            }
            Err(e) => {
                warn!("Failed to load signal state ({}). Starting fresh.", e);
                SignalStateMap::new()
            }
        }
    }

    // 单个 (标的, 周期)：抓取 -> 均线 -> 分类，失败返回 None
    async fn evaluate<'a>(
        &self,
        symbol: &'a str,
        timeframe: TimeFrame,
    ) -> Option<(&'a str, TimeFrame, SignalRecord)> {
        let end = self.clock.now();
        let start = end
            - Duration::days(history_days(
                timeframe,
                self.plan.lookback_days,
                self.plan.slow_period,
            ));

        let candles = match self
            .provider
            .fetch_candles(&Stock::new(symbol), timeframe, start, end)
            .await
        {
            Ok(candles) if !candles.is_empty() => candles,
            Ok(_) => {
                error!("No {} data found for {}", timeframe, symbol);
                return None;
            }
            Err(e) => {
                error!("Error retrieving {} data for {}: {}", timeframe, symbol, e);
                return None;
            }
        };

        let record = attach_indicators(&candles, self.plan.fast_period, self.plan.slow_period)
            .and_then(|bars| classify(&bars, self.orchestrator.settings().near_threshold_pct));
        match record {
            Ok(record) => {
                info!(
                    "{} {}: {} (spread {:.2}%)",
                    symbol, timeframe, record.state, record.spread_pct
                );
                Some((symbol, timeframe, record))
            }
            Err(e) => {
                warn!("Skipping {} {}: {}", symbol, timeframe, e);
                None
            }
        }
    }
}
