use crate::alignment::AlignmentDetector;
use crate::message::{build_alignment_message, build_signal_message};
use crate::policy::{settle_record, should_notify};
use plotin_core::common::TimeFrame;
use plotin_core::common::time::TimeProvider;
use plotin_core::config::NotificationConfig;
use plotin_core::notify::port::Notifier;
use plotin_core::signal::entity::{SignalRecord, SignalStateMap, StateKey};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, error, info};

/// # Summary
/// 编排器运行参数。
#[derive(Debug, Clone)]
pub struct NotificationSettings {
    pub near_threshold_pct: f64,
    pub cooldown_hours: f64,
    pub alignment_enabled: bool,
    pub fast_timeframe: TimeFrame,
    pub slow_timeframe: TimeFrame,
}

impl From<&NotificationConfig> for NotificationSettings {
    fn from(config: &NotificationConfig) -> Self {
        Self {
            near_threshold_pct: config.near_cross_threshold_pct,
            cooldown_hours: config.cooldown_hours,
            alignment_enabled: config.alignment_enabled,
            fast_timeframe: config.fast_timeframe,
            slow_timeframe: config.slow_timeframe,
        }
    }
}

/// # Summary
/// 单个标的一轮处理的结果。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SymbolOutcome {
    // 本轮发出普通告警的周期
    pub notified: Vec<TimeFrame>,
    // 本轮是否发出共振告警
    pub alignment_fired: bool,
    // 推送失败次数 (状态仍按已通知写回)
    pub delivery_failures: usize,
}

/// # Summary
/// 通知编排器：逐周期运行决策、推送告警、写回状态，最后评估跨周期共振。
///
/// # Invariants
/// - 状态存储以 `&mut` 传入，同一时刻只有一个写者。
/// - 推送失败不会中断处理，也不会阻止状态写回。
pub struct NotificationOrchestrator {
    // 告警推送通道 (未开启推送时注入只写日志的实现)
    notifier: Arc<dyn Notifier>,
    // 时钟，决定冷却判断与 `last_notified_at`
    clock: Arc<dyn TimeProvider>,
    settings: NotificationSettings,
    alignment: AlignmentDetector,
}

impl NotificationOrchestrator {
    pub fn new(
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn TimeProvider>,
        settings: NotificationSettings,
    ) -> Self {
        let alignment = AlignmentDetector::new(
            settings.fast_timeframe,
            settings.slow_timeframe,
            settings.cooldown_hours,
        );
        Self {
            notifier,
            clock,
            settings,
            alignment,
        }
    }

    pub fn settings(&self) -> &NotificationSettings {
        &self.settings
    }

    /// # Summary
    /// 处理单个标的本轮的全部周期记录。
    ///
    /// # Logic
    /// 1. 对每个周期：读取上一条记录，运行决策；需要通知则格式化并推送。
    /// 2. 按决策补齐 `last_notified_at` 后写回存储，并记录是否为本轮新发出的告警。
    /// 3. 所有周期完成后，若开启共振检测，则以快周期是否已通知作为闸门评估共振；
    ///    闸门打开时无论是否通知都写回共振记录。
    ///
    /// # Arguments
    /// * `state`: 本轮独占的状态存储。
    /// * `symbol`: 标的代码。
    /// * `signals`: 本轮成功分类的 周期 -> 记录。
    ///
    /// # Returns
    /// 返回本标的的处理结果。
    pub async fn process_symbol(
        &self,
        state: &mut SignalStateMap,
        symbol: &str,
        signals: &BTreeMap<TimeFrame, SignalRecord>,
    ) -> SymbolOutcome {
        let mut outcome = SymbolOutcome::default();
        let mut fast_notified = false;

        for (&timeframe, record) in signals {
            let now = self.clock.now();
            let key = StateKey::Timeframe(timeframe);
            let previous = state.get(symbol, key);
            let notify = should_notify(previous, Some(record), self.settings.cooldown_hours, now);

            if notify {
                let message = build_signal_message(
                    symbol,
                    timeframe,
                    record,
                    self.settings.near_threshold_pct,
                );
                if !self.dispatch(&message).await {
                    outcome.delivery_failures += 1;
                }
                outcome.notified.push(timeframe);
            } else {
                debug!(
                    "{} {}: {} unchanged, no notification",
                    symbol, timeframe, record.state
                );
            }

            let settled = settle_record(record.clone(), previous, notify, now);
            state.set(symbol, key, settled);
            if timeframe == self.settings.fast_timeframe {
                fast_notified = notify;
            }
        }

        if self.settings.alignment_enabled {
            let now = self.clock.now();
            let previous = state.get(symbol, StateKey::Alignment);
            if let Some(decision) = self.alignment.evaluate(signals, fast_notified, previous, now) {
                if decision.notify {
                    if let (Some(fast), Some(slow)) = (
                        signals.get(&self.alignment.fast()),
                        signals.get(&self.alignment.slow()),
                    ) {
                        let message = build_alignment_message(
                            symbol,
                            self.alignment.fast(),
                            fast,
                            self.alignment.slow(),
                            slow,
                        );
                        if !self.dispatch(&message).await {
                            outcome.delivery_failures += 1;
                        }
                    }
                    outcome.alignment_fired = true;
                }
                let settled = settle_record(decision.record, previous, decision.notify, now);
                state.set(symbol, StateKey::Alignment, settled);
            }
        }

        outcome
    }

    // 推送失败只记录，返回是否成功
    async fn dispatch(&self, message: &str) -> bool {
        match self.notifier.notify(message).await {
            Ok(()) => {
                info!("Alert delivered: {}", first_line(message));
                true
            }
            Err(e) => {
                error!("Failed to deliver alert {:?}: {}", first_line(message), e);
                false
            }
        }
    }
}

fn first_line(message: &str) -> &str {
    message.lines().next().unwrap_or_default()
}
