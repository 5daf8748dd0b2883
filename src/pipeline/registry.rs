//! 已处理节点登记表
//!
//! 以节点身份（`Rc` 指针）而不是文本内容判断是否处理过。登记表只持有弱引用：
//! 宿主丢弃节点后，节点内容随即释放，对应条目在下一次 `prune` 时被移除。

use std::collections::HashMap;
use std::rc::Rc;

use markup5ever_rcdom::{Handle, WeakHandle};

/// 节点身份键
///
/// 条目存在期间，弱引用让分配块保持占用，因此同一地址不会被其他节点复用。
pub(crate) fn node_key(node: &Handle) -> usize {
    Rc::as_ptr(node) as usize
}

#[derive(Default)]
pub struct NodeRegistry {
    entries: HashMap<usize, WeakHandle>,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_processed(&self, node: &Handle) -> bool {
        self.entries
            .get(&node_key(node))
            .map(|weak| weak.strong_count() > 0)
            .unwrap_or(false)
    }

    pub fn mark_processed(&mut self, node: &Handle) {
        self.entries.insert(node_key(node), Rc::downgrade(node));
    }

    /// 移除已被宿主丢弃的节点，返回移除的条目数
    pub fn prune(&mut self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, weak| weak.strong_count() > 0);
        before - self.entries.len()
    }

    /// 仍然存活的已处理节点数
    pub fn len(&self) -> usize {
        self.entries
            .values()
            .filter(|weak| weak.strong_count() > 0)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::html::create_element;

    #[test]
    fn membership_is_by_identity() {
        let mut registry = NodeRegistry::new();
        let first = create_element("pre", &[("class", "comment-item-text")]);
        let twin = create_element("pre", &[("class", "comment-item-text")]);

        assert!(!registry.has_processed(&first));
        registry.mark_processed(&first);

        assert!(registry.has_processed(&first));
        assert!(!registry.has_processed(&twin));
    }

    #[test]
    fn does_not_keep_nodes_alive() {
        let mut registry = NodeRegistry::new();
        let node = create_element("pre", &[]);
        let weak = Rc::downgrade(&node);
        registry.mark_processed(&node);
        assert_eq!(registry.len(), 1);

        drop(node);

        assert!(weak.upgrade().is_none());
        assert_eq!(registry.len(), 0);
        assert_eq!(registry.prune(), 1);
        assert!(registry.is_empty());
    }
}
