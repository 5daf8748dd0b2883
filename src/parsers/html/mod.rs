//! HTML解析和处理模块
//!
//! - `dom`: 基础DOM操作（查找、读写文本与属性、插入节点）
//! - `selector`: 简单复合选择器
//! - `metadata`: 文档元数据（字符编码、语言）
//! - `fragment`: HTML片段注入
//! - `serializer`: 序列化功能

pub mod dom;
pub mod fragment;
pub mod metadata;
pub mod selector;
pub mod serializer;

pub use dom::{
    append_child, create_element, detach, find_all, find_first, find_nodes,
    get_node_attr, get_node_name, get_parent_node, has_class,
    html_to_dom, insert_after, is_inclusive_ancestor, set_node_attr, set_text_content,
    text_content,
};
pub use fragment::append_fragment;
pub use metadata::{get_charset, get_document_lang};
pub use selector::Selector;
pub use serializer::serialize_document;
