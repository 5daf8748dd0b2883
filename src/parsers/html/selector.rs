//! 简单的复合选择器
//!
//! 只支持 `tag`、`.class`、`#id` 三种简单选择器的组合（如 `pre.comment-item-text`），
//! 足以定位评论节点和观察根节点，不支持组合符与伪类。

use std::fmt;

use markup5ever_rcdom::Handle;

use crate::core::{CleanerError, CleanerResult};

use super::dom::{get_node_attr, get_node_name, has_class};

/// 复合选择器
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Selector {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
}

impl Selector {
    /// 解析选择器字符串
    pub fn parse(source: &str) -> CleanerResult<Selector> {
        let source = source.trim();
        if source.is_empty() {
            return Err(CleanerError::Config("selector cannot be empty".to_string()));
        }
        if source.contains(|c: char| c.is_whitespace() || matches!(c, '>' | '+' | '~' | ',' | ':' | '[')) {
            return Err(CleanerError::Config(format!(
                "unsupported selector '{source}': only tag, .class and #id are allowed"
            )));
        }

        let mut selector = Selector {
            tag: None,
            id: None,
            classes: Vec::new(),
        };

        let mut rest = source;
        let tag_end = rest.find(['.', '#']).unwrap_or(rest.len());
        if tag_end > 0 {
            selector.tag = Some(rest[..tag_end].to_ascii_lowercase());
        }
        rest = &rest[tag_end..];

        while let Some(marker) = rest.chars().next() {
            let body = &rest[1..];
            let end = body.find(['.', '#']).unwrap_or(body.len());
            let name = &body[..end];
            if name.is_empty() {
                return Err(CleanerError::Config(format!(
                    "selector '{source}' has an empty '{marker}' part"
                )));
            }

            if marker == '.' {
                selector.classes.push(name.to_string());
            } else if selector.id.replace(name.to_string()).is_some() {
                return Err(CleanerError::Config(format!(
                    "selector '{source}' has more than one id"
                )));
            }

            rest = &body[end..];
        }

        Ok(selector)
    }

    /// 检查节点是否匹配
    pub fn matches(&self, node: &Handle) -> bool {
        let Some(node_name) = get_node_name(node) else {
            return false;
        };

        if let Some(tag) = &self.tag {
            if !node_name.eq_ignore_ascii_case(tag) {
                return false;
            }
        }

        if let Some(id) = &self.id {
            if get_node_attr(node, "id").as_deref() != Some(id.as_str()) {
                return false;
            }
        }

        self.classes.iter().all(|class| has_class(node, class))
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(tag) = &self.tag {
            write!(f, "{tag}")?;
        }
        if let Some(id) = &self.id {
            write!(f, "#{id}")?;
        }
        for class in &self.classes {
            write!(f, ".{class}")?;
        }
        Ok(())
    }
}
