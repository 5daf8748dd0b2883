//! 批量处理
//!
//! 每一轮都重新读取文档中的候选评论节点（候选集合在两轮之间会变化，不能缓存），
//! 按文档顺序逐个处理：登记表把关 → 文本清理 → 预览渲染，并累加运行统计。

use markup5ever_rcdom::Handle;
use tracing::{debug, info};

use crate::core::{CleanerResult, LogLevel};
use crate::parsers::html::{find_all, text_content, Selector};

use super::preview::PreviewRenderer;
use super::registry::NodeRegistry;
use super::text::TextCleaner;

/// 候选评论节点的来源
pub trait CandidateSource {
    /// 按文档顺序返回当前所有候选节点
    fn candidates(&self) -> CleanerResult<Vec<Handle>>;
}

/// 用选择器在活动文档中查找候选节点
pub struct SelectorSource {
    document: Handle,
    selector: Selector,
}

impl SelectorSource {
    pub fn new(document: Handle, selector: Selector) -> Self {
        Self { document, selector }
    }
}

impl CandidateSource for SelectorSource {
    fn candidates(&self) -> CleanerResult<Vec<Handle>> {
        Ok(find_all(&self.document, &self.selector))
    }
}

/// 运行统计
///
/// 整个页面生命周期内单调递增，只在页面重新加载（新建处理器）时归零。
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunStatistics {
    pub nodes_seen: usize,
    pub nodes_processed: usize,
    pub invisible_chars_removed: usize,
    pub blank_runs_collapsed: usize,
    pub previews_created: usize,
}

impl RunStatistics {
    pub fn merge(&mut self, other: &RunStatistics) {
        self.nodes_seen += other.nodes_seen;
        self.nodes_processed += other.nodes_processed;
        self.invisible_chars_removed += other.invisible_chars_removed;
        self.blank_runs_collapsed += other.blank_runs_collapsed;
        self.previews_created += other.previews_created;
    }
}

pub struct BatchProcessor {
    source: Box<dyn CandidateSource>,
    registry: NodeRegistry,
    cleaner: TextCleaner,
    renderer: PreviewRenderer,
    statistics: RunStatistics,
    log_level: LogLevel,
    location: String,
}

impl BatchProcessor {
    pub fn new(
        source: Box<dyn CandidateSource>,
        cleaner: TextCleaner,
        renderer: PreviewRenderer,
        log_level: LogLevel,
        location: impl Into<String>,
    ) -> Self {
        Self {
            source,
            registry: NodeRegistry::new(),
            cleaner,
            renderer,
            statistics: RunStatistics::default(),
            log_level,
            location: location.into(),
        }
    }

    /// 处理当前文档中的全部候选节点，返回累计统计的快照
    ///
    /// 已登记的节点直接跳过：不重新清理、不重新渲染、不重复插入按钮。
    /// 节点在清理之前登记，因此某个节点写回失败时，本轮中止且该节点不会在下一轮被重试。
    pub fn process_all(&mut self) -> CleanerResult<RunStatistics> {
        let candidates = self.source.candidates()?;

        for (index, node) in candidates.iter().enumerate() {
            self.statistics.nodes_seen += 1;

            if self.registry.has_processed(node) {
                continue;
            }

            self.registry.mark_processed(node);
            self.statistics.nodes_processed += 1;

            let raw = text_content(node);
            let result = self.cleaner.clean(&raw);

            self.statistics.invisible_chars_removed += result.invisible_chars_removed;
            self.statistics.blank_runs_collapsed += result.blank_runs_collapsed;

            let outcome = self.renderer.render(node, &result.cleaned_text)?;
            if outcome.toggle_created {
                self.statistics.previews_created += 1;
            }

            if self.log_level >= LogLevel::Verbose {
                debug!(
                    target: "tb_clean",
                    comment = index + 1,
                    length_before = result.length_before,
                    length_after = result.length_after,
                    lines_before = result.line_count_before,
                    lines_after = result.line_count_after,
                    invisible_removed = result.invisible_chars_removed,
                    blank_runs_collapsed = result.blank_runs_collapsed,
                    toggle_added = outcome.toggle_created,
                    "Comment #{}",
                    index + 1
                );
            }
        }

        self.registry.prune();
        self.renderer.prune();

        if self.log_level >= LogLevel::Summary {
            info!(
                target: "tb_clean",
                url = %self.location,
                nodes_seen = self.statistics.nodes_seen,
                nodes_processed = self.statistics.nodes_processed,
                invisible_removed = self.statistics.invisible_chars_removed,
                blank_runs_collapsed = self.statistics.blank_runs_collapsed,
                previewed = self.statistics.previews_created,
                "Summary"
            );
        }

        Ok(self.statistics)
    }

    pub fn statistics(&self) -> RunStatistics {
        self.statistics
    }

    pub fn registry(&self) -> &NodeRegistry {
        &self.registry
    }

    pub fn cleaner(&self) -> &TextCleaner {
        &self.cleaner
    }

    pub fn renderer(&self) -> &PreviewRenderer {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut PreviewRenderer {
        &mut self.renderer
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn log_level(&self) -> LogLevel {
        self.log_level
    }
}
