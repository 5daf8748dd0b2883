//! # 解析器模块
//!
//! 宿主文档的解析、遍历与写回。目前只有 HTML 一种文档格式。

pub mod html;

// Re-export commonly used items for convenience
pub use html::{append_fragment, html_to_dom, serialize_document, Selector};
