// 集成测试公共模块
//
// 提供测试页面构建和节点查找等共享功能

#![allow(dead_code)]

use markup5ever_rcdom::{Handle, RcDom};

use talkback_cleaner::core::{CleanerOptions, LogLevel};
use talkback_cleaner::parsers::html::{find_all, html_to_dom, set_text_content};
use talkback_cleaner::parsers::Selector;

pub const ITEM_URL: &str = "https://news.walla.co.il/item/3612345";
pub const NON_ITEM_URL: &str = "https://news.walla.co.il/category/1";

/// 构建评论页面
///
/// 评论文本在解析之后才写入节点，避免 HTML 解析器改写 `<pre>` 开头的换行。
pub fn build_page(comments: &[&str]) -> RcDom {
    build_page_with_lang(comments, "he")
}

pub fn build_page_with_lang(comments: &[&str], lang: &str) -> RcDom {
    let mut html = format!(
        "<!DOCTYPE html><html lang=\"{lang}\"><head><meta charset=\"utf-8\"></head><body>\
         <div class=\"talkback-list-wrapper\"><div class=\"talkback-list\">"
    );
    for _ in comments.iter() {
        html.push_str("<div class=\"talkback-item\"><pre class=\"comment-item-text\"></pre></div>");
    }
    html.push_str("</div></div></body></html>");

    let dom = html_to_dom(html.as_bytes(), "utf-8").unwrap();
    for (node, text) in comment_nodes(&dom).iter().zip(comments.iter()) {
        set_text_content(node, text).unwrap();
    }
    dom
}

pub fn comment_nodes(dom: &RcDom) -> Vec<Handle> {
    find_all(&dom.document, &Selector::parse("pre.comment-item-text").unwrap())
}

pub fn toggle_nodes(dom: &RcDom) -> Vec<Handle> {
    find_all(&dom.document, &Selector::parse("button.tb-clean-toggle-btn").unwrap())
}

pub fn first_match(dom: &RcDom, selector: &str) -> Handle {
    find_all(&dom.document, &Selector::parse(selector).unwrap())
        .into_iter()
        .next()
        .unwrap()
}

/// 生成 `line 1` 到 `line n` 的多行文本
pub fn numbered_lines(n: usize) -> String {
    (1..=n)
        .map(|i| format!("line {i}"))
        .collect::<Vec<String>>()
        .join("\n")
}

pub fn quiet_options() -> CleanerOptions {
    CleanerOptions {
        log_level: LogLevel::Off,
        ..Default::default()
    }
}
