//! 评论预览与展开/收起按钮
//!
//! 清理后的评论超过预览行数时，只显示前 N 行加一行省略号，并在评论节点后插入一个按钮。
//! 按钮在两种状态之间来回切换：
//!
//! - `Collapsed`（初始）：显示短文本，按钮文案为“显示更多”
//! - `Expanded`：显示全文，按钮文案为“显示更少”
//!
//! 展开状态保存在渲染器内部，以节点身份为键；节点上的 `data-tb-expanded` 属性只是镜像，
//! 供序列化输出查看，从不回读。

use std::collections::HashMap;
use std::rc::Rc;

use markup5ever_rcdom::{Handle, WeakHandle};

use crate::core::CleanerResult;
use crate::parsers::html::{create_element, insert_after, set_node_attr, set_text_content};

use super::registry::node_key;
use super::text::count_lines;

/// 默认预览行数
pub const DEFAULT_PREVIEW_LINES: usize = 5;

/// 短文本末尾单独一行的省略号
pub const ELLIPSIS: &str = "…";

pub const TOGGLE_CLASS: &str = "tb-clean-toggle-btn";

pub const TOGGLE_STYLE: &str = "display: block; margin-top: 5px; cursor: pointer; \
    background: transparent; border: none; color: #0073e6; font-weight: bold; \
    padding: 0; text-decoration: underline";

pub const EXPANDED_ATTR: &str = "data-tb-expanded";

/// 按钮文案
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Labels {
    pub show_more: String,
    pub show_less: String,
}

impl Default for Labels {
    fn default() -> Self {
        Self::english()
    }
}

impl Labels {
    pub fn english() -> Self {
        Self {
            show_more: "Show more".to_string(),
            show_less: "Show less".to_string(),
        }
    }

    pub fn hebrew() -> Self {
        Self {
            show_more: "הצג עוד".to_string(),
            show_less: "הצג פחות".to_string(),
        }
    }

    /// 根据页面语言选择文案，`he`、`he-IL` 等使用希伯来语，其余使用英语
    pub fn for_lang(lang: Option<&str>) -> Self {
        match lang {
            Some(lang) if is_hebrew(lang) => Self::hebrew(),
            _ => Self::english(),
        }
    }

    fn for_state(&self, state: ToggleState) -> &str {
        match state {
            ToggleState::Collapsed => &self.show_more,
            ToggleState::Expanded => &self.show_less,
        }
    }
}

fn is_hebrew(lang: &str) -> bool {
    let Some(prefix) = lang.get(..2) else {
        return false;
    };
    if !prefix.eq_ignore_ascii_case("he") {
        return false;
    }
    match lang[2..].chars().next() {
        None => true,
        Some(c) => !(c.is_ascii_alphanumeric() || c == '_'),
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ToggleState {
    Collapsed,
    Expanded,
}

impl ToggleState {
    fn flipped(self) -> Self {
        match self {
            ToggleState::Collapsed => ToggleState::Expanded,
            ToggleState::Expanded => ToggleState::Collapsed,
        }
    }
}

/// 评论的渲染状态
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderState {
    pub full_text: String,
    pub short_text: String,
    pub is_expanded: bool,
}

impl RenderState {
    pub fn toggle_state(&self) -> ToggleState {
        if self.is_expanded {
            ToggleState::Expanded
        } else {
            ToggleState::Collapsed
        }
    }

    fn displayed_text(&self) -> &str {
        if self.is_expanded {
            &self.full_text
        } else {
            &self.short_text
        }
    }
}

/// 一次渲染的结果
#[derive(Debug)]
pub struct RenderOutcome {
    pub displayed_text: String,
    pub toggle_created: bool,
    /// 按钮是否实际插入了文档（节点已脱离文档时为 `false`）
    pub toggle_inserted: bool,
    pub toggle: Option<Handle>,
}

/// 按钮点击事件
///
/// 激活只影响本按钮所属的评论，处理后事件不再向外传播。
#[derive(Debug, Default)]
pub struct ActivationEvent {
    propagation_stopped: bool,
}

impl ActivationEvent {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop_propagation(&mut self) {
        self.propagation_stopped = true;
    }

    pub fn is_propagation_stopped(&self) -> bool {
        self.propagation_stopped
    }
}

struct CommentEntry {
    node: WeakHandle,
    toggle: Option<WeakHandle>,
    state: RenderState,
}

pub struct PreviewRenderer {
    preview_lines: usize,
    labels: Labels,
    entries: HashMap<usize, CommentEntry>,
    // toggle key -> comment key
    toggles: HashMap<usize, usize>,
}

impl Default for PreviewRenderer {
    fn default() -> Self {
        Self::new(DEFAULT_PREVIEW_LINES, Labels::default())
    }
}

impl PreviewRenderer {
    pub fn new(preview_lines: usize, labels: Labels) -> Self {
        Self {
            preview_lines,
            labels,
            entries: HashMap::new(),
            toggles: HashMap::new(),
        }
    }

    pub fn labels(&self) -> &Labels {
        &self.labels
    }

    pub fn preview_lines(&self) -> usize {
        self.preview_lines
    }

    /// 生成短文本；未超过预览行数时返回 `None`
    pub fn short_form(&self, cleaned_text: &str) -> Option<String> {
        if count_lines(cleaned_text) <= self.preview_lines {
            return None;
        }

        let mut short_text = cleaned_text
            .split('\n')
            .take(self.preview_lines)
            .collect::<Vec<&str>>()
            .join("\n");
        short_text.push('\n');
        short_text.push_str(ELLIPSIS);
        Some(short_text)
    }

    /// 把清理后的文本写回节点，必要时创建展开按钮
    pub fn render(&mut self, node: &Handle, cleaned_text: &str) -> CleanerResult<RenderOutcome> {
        let short_text = self.short_form(cleaned_text);
        let toggle_created = short_text.is_some();

        let state = RenderState {
            full_text: cleaned_text.to_string(),
            short_text: short_text.unwrap_or_else(|| cleaned_text.to_string()),
            is_expanded: false,
        };
        let displayed_text = state.displayed_text().to_string();

        set_text_content(node, &displayed_text)?;
        set_node_attr(node, EXPANDED_ATTR, Some("0".to_string()))?;

        let mut toggle = None;
        let mut toggle_inserted = false;
        if toggle_created {
            let button = create_element(
                "button",
                &[("type", "button"), ("class", TOGGLE_CLASS), ("style", TOGGLE_STYLE)],
            );
            set_text_content(&button, self.labels.for_state(ToggleState::Collapsed))?;
            toggle_inserted = insert_after(node, &button);
            toggle = Some(button);
        }

        let comment_key = node_key(node);
        if let Some(previous) = self.entries.get(&comment_key) {
            if let Some(old_toggle) = previous.toggle.as_ref().and_then(|weak| weak.upgrade()) {
                self.toggles.remove(&node_key(&old_toggle));
            }
        }
        if let Some(button) = toggle.as_ref() {
            self.toggles.insert(node_key(button), comment_key);
        }
        self.entries.insert(
            comment_key,
            CommentEntry {
                node: Rc::downgrade(node),
                toggle: toggle.as_ref().map(Rc::downgrade),
                state,
            },
        );

        Ok(RenderOutcome {
            displayed_text,
            toggle_created,
            toggle_inserted,
            toggle,
        })
    }

    /// 节点当前的渲染状态
    pub fn state(&self, node: &Handle) -> Option<&RenderState> {
        self.entries
            .get(&node_key(node))
            .filter(|entry| entry.node.strong_count() > 0)
            .map(|entry| &entry.state)
    }

    /// 节点对应的展开按钮
    pub fn toggle_for(&self, node: &Handle) -> Option<Handle> {
        self.entries
            .get(&node_key(node))
            .and_then(|entry| entry.toggle.as_ref())
            .and_then(|weak| weak.upgrade())
    }

    /// 处于收起状态的评论的按钮
    pub fn collapsed_toggles(&self) -> Vec<Handle> {
        self.entries
            .values()
            .filter(|entry| !entry.state.is_expanded && entry.node.strong_count() > 0)
            .filter_map(|entry| entry.toggle.as_ref().and_then(|weak| weak.upgrade()))
            .collect()
    }

    /// 点击按钮：在收起和展开之间切换
    ///
    /// 按钮不属于本渲染器，或评论节点已被宿主丢弃时返回 `Ok(None)`，不做任何修改。
    pub fn activate(
        &mut self,
        toggle: &Handle,
        event: &mut ActivationEvent,
    ) -> CleanerResult<Option<ToggleState>> {
        let Some(comment_key) = self.toggles.get(&node_key(toggle)).copied() else {
            return Ok(None);
        };
        let Some(entry) = self.entries.get_mut(&comment_key) else {
            return Ok(None);
        };
        let Some(node) = entry.node.upgrade() else {
            return Ok(None);
        };

        event.stop_propagation();

        let next = entry.state.toggle_state().flipped();
        entry.state.is_expanded = next == ToggleState::Expanded;

        set_text_content(&node, entry.state.displayed_text())?;
        set_node_attr(
            &node,
            EXPANDED_ATTR,
            Some(if entry.state.is_expanded { "1" } else { "0" }.to_string()),
        )?;
        set_text_content(toggle, self.labels.for_state(next))?;

        Ok(Some(next))
    }

    /// 移除宿主已丢弃节点的状态，返回移除的条目数
    pub fn prune(&mut self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.node.strong_count() > 0);
        let entries = &self.entries;
        self.toggles
            .retain(|_, comment_key| entries.contains_key(comment_key));
        before - self.entries.len()
    }
}
