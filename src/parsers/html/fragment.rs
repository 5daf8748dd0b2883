//! HTML 片段注入
//!
//! 模拟宿主页面异步加载评论（无限滚动、懒加载）：把一段 HTML 解析后追加到
//! 已有文档的某个容器里。

use markup5ever_rcdom::Handle;

use crate::core::CleanerResult;

use super::dom::{append_child, find_nodes, html_to_dom};

/// 解析 HTML 片段并把顶层节点依次追加到 `parent`
///
/// 返回被追加的节点（按顺序）。片段为空时不修改文档。
pub fn append_fragment(parent: &Handle, fragment: &str) -> CleanerResult<Vec<Handle>> {
    let fragment_dom = html_to_dom(fragment.as_bytes(), "utf-8")?;

    let Some(body) = find_nodes(&fragment_dom.document, &["html", "body"])
        .into_iter()
        .next()
    else {
        return Ok(Vec::new());
    };

    let nodes: Vec<Handle> = body.children.borrow().clone();
    for node in nodes.iter() {
        append_child(parent, node);
    }

    Ok(nodes)
}
