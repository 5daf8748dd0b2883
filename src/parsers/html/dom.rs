use std::cell::RefCell;

use encoding_rs::Encoding;
use html5ever::interface::{Attribute, QualName};
use html5ever::parse_document;
use html5ever::tendril::{format_tendril, StrTendril, TendrilSink};
use html5ever::{namespace_url, ns, LocalName};
use markup5ever_rcdom::{Handle, Node, NodeData, RcDom};

use crate::core::{CleanerError, CleanerResult};

use super::selector::Selector;

/// 将 HTML 字节转换为 DOM
pub fn html_to_dom(data: &[u8], document_encoding: &str) -> CleanerResult<RcDom> {
    let s: String = match Encoding::for_label(document_encoding.as_bytes()) {
        Some(encoding) => {
            let (string, _, _) = encoding.decode(data);
            string.to_string()
        }
        None => String::from_utf8_lossy(data).to_string(),
    };

    parse_document(RcDom::default(), Default::default())
        .from_utf8()
        .read_from(&mut s.as_bytes())
        .map_err(|e| CleanerError::Parse(e.to_string()))
}

/// 查找指定路径的DOM节点
pub fn find_nodes(node: &Handle, node_names: &[&str]) -> Vec<Handle> {
    let Some((&node_name, rest)) = node_names.split_first() else {
        return Vec::new();
    };

    let mut found_nodes = Vec::new();

    if rest.is_empty() {
        if get_node_name(node) == Some(node_name) {
            found_nodes.push(node.clone());
        }

        for child_node in node.children.borrow().iter() {
            found_nodes.append(&mut find_nodes(child_node, node_names));
        }
    } else if get_node_name(node) == Some(node_name) {
        found_nodes.append(&mut find_nodes(node, rest));
    } else {
        for child_node in node.children.borrow().iter() {
            found_nodes.append(&mut find_nodes(child_node, node_names));
        }
    }

    found_nodes
}

/// 按文档顺序查找所有匹配选择器的元素
pub fn find_all(node: &Handle, selector: &Selector) -> Vec<Handle> {
    let mut found_nodes = Vec::new();
    collect_matching(node, selector, &mut found_nodes);
    found_nodes
}

fn collect_matching(node: &Handle, selector: &Selector, found_nodes: &mut Vec<Handle>) {
    if selector.matches(node) {
        found_nodes.push(node.clone());
    }

    for child_node in node.children.borrow().iter() {
        collect_matching(child_node, selector, found_nodes);
    }
}

/// 查找第一个匹配选择器的元素（深度优先，文档顺序）
pub fn find_first(node: &Handle, selector: &Selector) -> Option<Handle> {
    if selector.matches(node) {
        return Some(node.clone());
    }

    node.children
        .borrow()
        .iter()
        .find_map(|child_node| find_first(child_node, selector))
}

/// 获取节点属性值
pub fn get_node_attr(node: &Handle, attr_name: &str) -> Option<String> {
    match &node.data {
        NodeData::Element { attrs, .. } => {
            for attr in attrs.borrow().iter() {
                if &*attr.name.local == attr_name {
                    return Some(attr.value.to_string());
                }
            }
            None
        }
        _ => None,
    }
}

/// 获取节点名称
pub fn get_node_name(node: &Handle) -> Option<&'_ str> {
    match &node.data {
        NodeData::Element { name, .. } => Some(name.local.as_ref()),
        _ => None,
    }
}

/// 检查元素的 class 属性是否包含指定类名
pub fn has_class(node: &Handle, class_name: &str) -> bool {
    get_node_attr(node, "class")
        .map(|classes| classes.split_ascii_whitespace().any(|c| c == class_name))
        .unwrap_or(false)
}

/// 获取父节点
///
/// rcdom 把父指针存放在 `Cell` 里，读取时必须放回原值，否则节点会与父节点脱离。
pub fn get_parent_node(child: &Handle) -> Option<Handle> {
    let weak = child.parent.take();
    let parent = weak.as_ref().and_then(|node| node.upgrade());
    child.parent.set(weak);
    parent
}

/// 判断 `ancestor` 是否为 `node` 本身或其祖先
pub fn is_inclusive_ancestor(ancestor: &Handle, node: &Handle) -> bool {
    let mut current = Some(node.clone());
    while let Some(candidate) = current {
        if std::rc::Rc::ptr_eq(&candidate, ancestor) {
            return true;
        }
        current = get_parent_node(&candidate);
    }
    false
}

/// 设置节点属性
pub fn set_node_attr(
    node: &Handle,
    attr_name: &str,
    attr_value: Option<String>,
) -> CleanerResult<()> {
    let NodeData::Element { attrs, .. } = &node.data else {
        return Err(CleanerError::DomWrite(format!(
            "cannot set attribute '{attr_name}' on a non-element node"
        )));
    };

    let attrs_mut = &mut attrs.borrow_mut();
    let mut i = 0;
    let mut found_existing_attr: bool = false;

    while i < attrs_mut.len() {
        if &attrs_mut[i].name.local == attr_name {
            found_existing_attr = true;

            if let Some(attr_value) = attr_value.as_deref() {
                attrs_mut[i].value.clear();
                attrs_mut[i].value.push_slice(attr_value);
            } else {
                // Remove attr completely if attr_value is not defined
                attrs_mut.remove(i);
                continue;
            }
        }

        i += 1;
    }

    if !found_existing_attr {
        if let Some(attr_value) = attr_value {
            attrs_mut.push(Attribute {
                name: QualName::new(None, ns!(), LocalName::from(attr_name)),
                value: format_tendril!("{}", attr_value),
            });
        }
    }

    Ok(())
}

/// 收集节点及其后代中的全部文本
pub fn text_content(node: &Handle) -> String {
    let mut text = String::new();
    push_text(node, &mut text);
    text
}

fn push_text(node: &Handle, text: &mut String) {
    if let NodeData::Text { contents } = &node.data {
        text.push_str(&contents.borrow());
    }

    for child_node in node.children.borrow().iter() {
        push_text(child_node, text);
    }
}

/// 用单个文本节点替换元素的全部子节点
pub fn set_text_content(node: &Handle, text: &str) -> CleanerResult<()> {
    if !matches!(node.data, NodeData::Element { .. }) {
        return Err(CleanerError::DomWrite(
            "cannot replace text content of a non-element node".to_string(),
        ));
    }

    let text_node = Node::new(NodeData::Text {
        contents: RefCell::new(StrTendril::from_slice(text)),
    });
    text_node.parent.set(Some(std::rc::Rc::downgrade(node)));

    let old_children = std::mem::replace(&mut *node.children.borrow_mut(), vec![text_node]);
    for old_child in old_children {
        old_child.parent.set(None);
    }

    Ok(())
}

/// 创建一个 HTML 元素
pub fn create_element(tag_name: &str, attributes: &[(&str, &str)]) -> Handle {
    let attrs = attributes
        .iter()
        .map(|(name, value)| Attribute {
            name: QualName::new(None, ns!(), LocalName::from(*name)),
            value: format_tendril!("{}", value),
        })
        .collect();

    Node::new(NodeData::Element {
        name: QualName::new(None, ns!(html), LocalName::from(tag_name)),
        attrs: RefCell::new(attrs),
        template_contents: RefCell::new(None),
        mathml_annotation_xml_integration_point: false,
    })
}

/// 把节点从原父节点上摘下
pub fn detach(node: &Handle) {
    if let Some(parent) = get_parent_node(node) {
        parent
            .children
            .borrow_mut()
            .retain(|child| !std::rc::Rc::ptr_eq(child, node));
    }
    node.parent.set(None);
}

/// 把节点追加为 `parent` 的最后一个子节点
pub fn append_child(parent: &Handle, child: &Handle) {
    detach(child);
    child.parent.set(Some(std::rc::Rc::downgrade(parent)));
    parent.children.borrow_mut().push(child.clone());
}

/// 把 `new_node` 插入到 `reference` 之后
///
/// `reference` 已经脱离文档时返回 `false`，不做任何修改。
pub fn insert_after(reference: &Handle, new_node: &Handle) -> bool {
    let Some(parent) = get_parent_node(reference) else {
        return false;
    };

    detach(new_node);

    let mut children = parent.children.borrow_mut();
    let Some(position) = children
        .iter()
        .position(|child| std::rc::Rc::ptr_eq(child, reference))
    else {
        return false;
    };

    new_node.parent.set(Some(std::rc::Rc::downgrade(&parent)));
    children.insert(position + 1, new_node.clone());
    true
}
