//! HTML 文档元数据处理模块
//!
//! 从文档中读取清理流程需要的元数据：
//! - 字符编码声明（写回文档时保持原编码）
//! - `<html lang>` 语言标记（决定展开按钮的文案语言）

use markup5ever_rcdom::Handle;

use super::dom::{find_nodes, get_node_attr};

/// 获取文档字符编码
///
/// 支持两种格式：
/// 1. HTML5 格式：`<meta charset="utf-8">`
/// 2. HTML4 格式：`<meta http-equiv="content-type" content="text/html; charset=utf-8">`
pub fn get_charset(node: &Handle) -> Option<String> {
    for meta_node in find_nodes(node, &["html", "head", "meta"]).iter() {
        if let Some(meta_charset_node_attr_value) = get_node_attr(meta_node, "charset") {
            return Some(meta_charset_node_attr_value);
        }

        if get_node_attr(meta_node, "http-equiv")
            .unwrap_or_default()
            .eq_ignore_ascii_case("content-type")
        {
            if let Some(content) = get_node_attr(meta_node, "content") {
                if let Some(charset) = parse_charset_param(&content) {
                    return Some(charset);
                }
            }
        }
    }

    None
}

fn parse_charset_param(content_type: &str) -> Option<String> {
    content_type.split(';').skip(1).find_map(|param| {
        let (key, value) = param.split_once('=')?;
        key.trim()
            .eq_ignore_ascii_case("charset")
            .then(|| value.trim().trim_matches(|c| c == '"' || c == '\'').to_string())
    })
}

/// 获取文档语言
///
/// 读取根元素 `<html>` 的 `lang` 属性；没有或为空时返回 `None`。
pub fn get_document_lang(node: &Handle) -> Option<String> {
    find_nodes(node, &["html"])
        .first()
        .and_then(|html| get_node_attr(html, "lang"))
        .map(|lang| lang.trim().to_string())
        .filter(|lang| !lang.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::html::dom::html_to_dom;

    #[test]
    fn reads_html5_charset() {
        let dom = html_to_dom(b"<html><head><meta charset=\"windows-1255\"></head></html>", "")
            .unwrap();
        assert_eq!(get_charset(&dom.document).as_deref(), Some("windows-1255"));
    }

    #[test]
    fn reads_http_equiv_charset() {
        let dom = html_to_dom(
            b"<html><head><meta http-equiv=\"Content-Type\" content=\"text/html; charset=utf-8\"></head></html>",
            "",
        )
        .unwrap();
        assert_eq!(get_charset(&dom.document).as_deref(), Some("utf-8"));
    }

    #[test]
    fn reads_document_lang() {
        let dom = html_to_dom(b"<html lang=\"he-IL\"><body></body></html>", "").unwrap();
        assert_eq!(get_document_lang(&dom.document).as_deref(), Some("he-IL"));

        let dom = html_to_dom(b"<html><body></body></html>", "").unwrap();
        assert_eq!(get_document_lang(&dom.document), None);
    }
}
