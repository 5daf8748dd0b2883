//! 变更驱动的批处理调度
//!
//! 观察根节点子树的结构变化（子节点增删），把一帧之内到达的任意数量变更记录合并成
//! 一次 `process_all`。`batch_pending` 在请求下一帧时置位、在帧回调开始时清除，
//! 保证同一帧内不会重复调度。某一轮处理失败只记录日志，观察继续进行。

use std::rc::Rc;
use std::time::Duration;

use markup5ever_rcdom::{Handle, WeakHandle};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error};

use crate::core::CleanerResult;
use crate::parsers::html::{find_first, get_node_name, is_inclusive_ancestor, Selector};

use super::batch::{BatchProcessor, RunStatistics};

/// 默认帧间隔（约 60 Hz）
pub const DEFAULT_FRAME_INTERVAL: Duration = Duration::from_millis(16);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MutationKind {
    ChildListAdded,
    ChildListRemoved,
}

/// 一条结构变更记录，`target` 是子节点列表发生变化的父节点
#[derive(Clone, Debug)]
pub struct MutationRecord {
    pub kind: MutationKind,
    pub target: WeakHandle,
}

impl MutationRecord {
    pub fn added(target: &Handle) -> Self {
        Self {
            kind: MutationKind::ChildListAdded,
            target: Rc::downgrade(target),
        }
    }

    pub fn removed(target: &Handle) -> Self {
        Self {
            kind: MutationKind::ChildListRemoved,
            target: Rc::downgrade(target),
        }
    }
}

/// 选择观察根节点
///
/// 按顺序尝试每个选择器，第一个命中的元素胜出；都没有命中时观察整个文档。
pub fn select_root(document: &Handle, selectors: &[Selector]) -> Handle {
    selectors
        .iter()
        .find_map(|selector| find_first(document, selector))
        .unwrap_or_else(|| document.clone())
}

/// 调度器运行情况
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SchedulerReport {
    pub records_seen: usize,
    pub frames_requested: usize,
    pub passes_run: usize,
    pub passes_failed: usize,
}

pub struct MutationScheduler {
    root: Handle,
    batch_pending: bool,
    report: SchedulerReport,
}

impl MutationScheduler {
    pub fn new(root: Handle) -> Self {
        Self {
            root,
            batch_pending: false,
            report: SchedulerReport::default(),
        }
    }

    pub fn root(&self) -> &Handle {
        &self.root
    }

    pub fn root_name(&self) -> &str {
        get_node_name(&self.root).unwrap_or("#document")
    }

    pub fn is_batch_pending(&self) -> bool {
        self.batch_pending
    }

    pub fn report(&self) -> SchedulerReport {
        self.report
    }

    /// 接收一批变更记录
    ///
    /// 只有根节点子树内的变更才会触发调度。返回 `true` 表示这次调用请求了新的一帧；
    /// 已有待处理批次时返回 `false`。
    pub fn notify(&mut self, records: &[MutationRecord]) -> bool {
        let relevant = records
            .iter()
            .filter(|record| {
                record
                    .target
                    .upgrade()
                    .map(|target| is_inclusive_ancestor(&self.root, &target))
                    .unwrap_or(false)
            })
            .count();
        self.report.records_seen += relevant;

        if relevant == 0 || self.batch_pending {
            return false;
        }

        self.batch_pending = true;
        self.report.frames_requested += 1;
        true
    }

    /// 帧回调：有待处理批次时运行一轮 `process_all`
    ///
    /// 错误在这里被捕获并记录，不会中断观察；返回值仅供调用方查看本轮结果。
    pub fn run_pending(
        &mut self,
        processor: &mut BatchProcessor,
    ) -> Option<CleanerResult<RunStatistics>> {
        if !self.batch_pending {
            return None;
        }
        self.batch_pending = false;
        self.report.passes_run += 1;

        let result = processor.process_all();
        if let Err(err) = &result {
            self.report.passes_failed += 1;
            error!(target: "tb_clean", "Error in processAll (MO): {}", err);
        }

        Some(result)
    }

    /// 异步驱动：同时等待变更记录和帧时钟
    ///
    /// 变更通道关闭（页面卸载）时，先把尚未处理的批次跑完再返回。
    pub async fn run(
        &mut self,
        processor: &mut BatchProcessor,
        mut mutations: UnboundedReceiver<Vec<MutationRecord>>,
        frame_interval: Duration,
    ) -> SchedulerReport {
        let mut frames = tokio::time::interval(frame_interval);
        frames.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;

                records = mutations.recv() => match records {
                    Some(records) => {
                        if self.notify(&records) {
                            // 帧时钟从调度时刻重新计时，空闲期间积压的 tick 不算数
                            frames.reset();
                            debug!(target: "tb_clean", "batch scheduled for next frame");
                        }
                    }
                    None => break,
                },
                _ = frames.tick(), if self.batch_pending => {
                    self.run_pending(processor);
                }
            }
        }

        self.run_pending(processor);
        self.report
    }
}
