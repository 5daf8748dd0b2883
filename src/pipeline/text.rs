//! 评论文本清理
//!
//! 纯函数式的清理步骤，按顺序执行：
//!
//! 1. 统一换行符（CRLF、单独的 CR 都转成 LF）
//! 2. 统计并删除不可见字符（零宽字符、BOM、软连字符、填充符等）
//! 3. 按行折叠过长的空行段，最多保留 `max_consecutive_blanks` 个连续空行
//! 4. 去掉整段文本首尾的空白
//!
//! 清理结果是幂等的：对清理后的文本再清理一次不会有任何变化。

use std::fmt;

use crate::core::{CleanerError, CleanerResult};

/// 默认的不可见字符集合
///
/// 垃圾评论常用这些字符撑开空白或绕过关键词过滤。
pub const DEFAULT_INVISIBLE_RANGES: &[(char, char)] = &[
    ('\u{00AD}', '\u{00AD}'), // soft hyphen
    ('\u{115F}', '\u{1160}'), // Hangul choseong/jungseong fillers
    ('\u{180E}', '\u{180E}'), // Mongolian vowel separator
    ('\u{200B}', '\u{200F}'), // zero-width space/joiners, LRM/RLM
    ('\u{2060}', '\u{2064}'), // word joiner and invisible operators
    ('\u{FEFF}', '\u{FEFF}'), // byte-order mark
];

/// 连续空行的默认上限
pub const DEFAULT_MAX_CONSECUTIVE_BLANKS: usize = 2;

/// 可更新的不可见字符集合
///
/// 以闭区间保存；出现新的垃圾字符时通过配置追加，无需修改清理算法。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InvisibleCharSet {
    ranges: Vec<(char, char)>,
}

impl Default for InvisibleCharSet {
    fn default() -> Self {
        Self {
            ranges: DEFAULT_INVISIBLE_RANGES.to_vec(),
        }
    }
}

impl InvisibleCharSet {
    /// 空集合
    pub fn empty() -> Self {
        Self { ranges: Vec::new() }
    }

    pub fn insert(&mut self, c: char) {
        if !self.contains(c) {
            self.ranges.push((c, c));
        }
    }

    pub fn insert_range(&mut self, lo: char, hi: char) -> CleanerResult<()> {
        if lo > hi {
            return Err(CleanerError::Config(format!(
                "invalid codepoint range U+{:04X}-U+{:04X}",
                lo as u32, hi as u32
            )));
        }
        self.ranges.push((lo, hi));
        Ok(())
    }

    pub fn contains(&self, c: char) -> bool {
        self.ranges.iter().any(|&(lo, hi)| lo <= c && c <= hi)
    }

    /// 合并另一个集合的全部成员
    pub fn extend(&mut self, other: &InvisibleCharSet) {
        for &(lo, hi) in other.ranges.iter() {
            if !self.ranges.contains(&(lo, hi)) {
                self.ranges.push((lo, hi));
            }
        }
    }

    /// 解析逗号分隔的码位列表
    ///
    /// 每一项可以是 `200B`、`U+200B` 或区间 `2060-2064`（区间两端同样允许 `U+` 前缀）。
    pub fn parse_list(list: &str) -> CleanerResult<InvisibleCharSet> {
        let mut set = InvisibleCharSet::empty();

        for item in list.split(',').map(str::trim).filter(|item| !item.is_empty()) {
            match item.split_once('-') {
                Some((lo, hi)) => set.insert_range(parse_codepoint(lo)?, parse_codepoint(hi)?)?,
                None => set.insert(parse_codepoint(item)?),
            }
        }

        Ok(set)
    }

    pub fn ranges(&self) -> &[(char, char)] {
        &self.ranges
    }
}

impl fmt::Display for InvisibleCharSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let items: Vec<String> = self
            .ranges
            .iter()
            .map(|&(lo, hi)| {
                if lo == hi {
                    format!("U+{:04X}", lo as u32)
                } else {
                    format!("U+{:04X}-U+{:04X}", lo as u32, hi as u32)
                }
            })
            .collect();
        write!(f, "{}", items.join(","))
    }
}

fn parse_codepoint(item: &str) -> CleanerResult<char> {
    let item = item.trim();
    let hex = item
        .strip_prefix("U+")
        .or_else(|| item.strip_prefix("u+"))
        .unwrap_or(item);

    u32::from_str_radix(hex, 16)
        .ok()
        .and_then(char::from_u32)
        .ok_or_else(|| CleanerError::Config(format!("invalid codepoint '{item}'")))
}

/// 单条评论的清理结果
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CleaningResult {
    pub cleaned_text: String,
    pub invisible_chars_removed: usize,
    pub blank_runs_collapsed: usize,
    pub line_count_before: usize,
    pub line_count_after: usize,
    /// 原始文本长度（字符数）
    pub length_before: usize,
    /// 清理后文本长度（字符数）
    pub length_after: usize,
}

/// 文本清理器
#[derive(Clone, Debug)]
pub struct TextCleaner {
    invisible_chars: InvisibleCharSet,
    max_consecutive_blanks: usize,
}

impl Default for TextCleaner {
    fn default() -> Self {
        Self::new(InvisibleCharSet::default(), DEFAULT_MAX_CONSECUTIVE_BLANKS)
    }
}

impl TextCleaner {
    pub fn new(invisible_chars: InvisibleCharSet, max_consecutive_blanks: usize) -> Self {
        Self {
            invisible_chars,
            max_consecutive_blanks,
        }
    }

    pub fn invisible_chars(&self) -> &InvisibleCharSet {
        &self.invisible_chars
    }

    pub fn max_consecutive_blanks(&self) -> usize {
        self.max_consecutive_blanks
    }

    /// 清理一条评论文本
    pub fn clean(&self, raw: &str) -> CleaningResult {
        let normalized = normalize_newlines(raw);

        let mut invisible_chars_removed = 0;
        let visible: String = normalized
            .chars()
            .filter(|&c| {
                let invisible = self.invisible_chars.contains(c);
                if invisible {
                    invisible_chars_removed += 1;
                }
                !invisible
            })
            .collect();

        let raw_lines: Vec<&str> = visible.split('\n').collect();
        let (collapsed_lines, blank_runs_collapsed) =
            collapse_blank_runs(&raw_lines, self.max_consecutive_blanks);

        let cleaned_text = collapsed_lines.join("\n").trim().to_string();

        CleaningResult {
            invisible_chars_removed,
            blank_runs_collapsed,
            line_count_before: count_lines(&visible),
            line_count_after: count_lines(&cleaned_text),
            length_before: raw.chars().count(),
            length_after: cleaned_text.chars().count(),
            cleaned_text,
        }
    }
}

/// 统计行数；空文本按 0 行计
pub fn count_lines(text: &str) -> usize {
    if text.is_empty() {
        0
    } else {
        text.split('\n').count()
    }
}

fn normalize_newlines(raw: &str) -> String {
    raw.replace("\r\n", "\n").replace('\r', "\n")
}

/// 折叠空行段
///
/// 空行（trim 后为空）统一输出为空字符串。只有长度超过上限的空行段才计数，每段计一次。
fn collapse_blank_runs<'a>(lines: &[&'a str], max_blank: usize) -> (Vec<&'a str>, usize) {
    let mut collapsed_runs = 0;
    let mut out = Vec::with_capacity(lines.len());
    let mut blank_count = 0;

    for &line in lines {
        if line.trim().is_empty() {
            blank_count += 1;
            if blank_count <= max_blank {
                out.push("");
            } else if blank_count == max_blank + 1 {
                collapsed_runs += 1;
            }
        } else {
            blank_count = 0;
            out.push(line);
        }
    }

    (out, collapsed_runs)
}
