//! # Talkback Cleaner Library
//!
//! 清理新闻评论区（talkback）中的垃圾排版：去除不可见字符、压缩过长的空行，
//! 并为过长的评论生成可展开/收起的预览。
//!
//! ## 模块组织
//!
//! - `core` - 错误类型、选项和入口 `init`
//! - `env` - 环境变量配置
//! - `config` - TOML 配置文件
//! - `parsers` - HTML 解析、DOM 辅助函数和序列化
//! - `pipeline` - 文本清理、节点登记、预览渲染、批处理和变更调度

pub mod config;
pub mod core;
pub mod env;
pub mod parsers;
pub mod pipeline;

// Re-export commonly used items for convenience
pub use crate::core::*;
pub use parsers::*;
pub use pipeline::*;
