//! # 清理流水线
//!
//! 增量式、可自我观察的文本处理流水线：
//!
//! - `text` - 文本清理（不可见字符、空行折叠、首尾空白）
//! - `registry` - 已处理节点登记表（按身份、弱引用）
//! - `preview` - 预览截断与展开/收起按钮
//! - `batch` - 批量处理与运行统计
//! - `scheduler` - 变更驱动的逐帧调度
//! - `startup` - 启动延迟

pub mod batch;
pub mod preview;
pub mod registry;
pub mod scheduler;
pub mod startup;
pub mod text;

pub use batch::{BatchProcessor, CandidateSource, RunStatistics, SelectorSource};
pub use preview::{
    ActivationEvent, Labels, PreviewRenderer, RenderOutcome, RenderState, ToggleState,
};
pub use registry::NodeRegistry;
pub use scheduler::{
    select_root, MutationKind, MutationRecord, MutationScheduler, SchedulerReport,
    DEFAULT_FRAME_INTERVAL,
};
pub use startup::{defer_startup, StartupTiming, StartupTrigger};
pub use text::{CleaningResult, InvisibleCharSet, TextCleaner};
