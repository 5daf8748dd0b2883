//! 配置文件加载
//!
//! TOML 文件中的每一项都是可选的，缺省的项保持原值不变。
//! 优先级：默认值 < 配置文件 < 环境变量 < 命令行参数。
//!
//! ```toml
//! [cleaning]
//! max_consecutive_blanks = 2
//! extra_invisible = "U+3164, 2800-28FF"
//!
//! [preview]
//! lines = 5
//! locale = "he"
//!
//! [selectors]
//! candidate = "pre.comment-item-text"
//! roots = [".talkback-list-wrapper", ".talkback-list", "body"]
//! page_pattern = "https://news\\.walla\\.co\\.il/item"
//!
//! [logging]
//! level = "summary"
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::core::{CleanerError, CleanerOptions, CleanerResult, LogLevel};
use crate::pipeline::InvisibleCharSet;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    #[serde(default)]
    pub cleaning: CleaningSection,
    #[serde(default)]
    pub preview: PreviewSection,
    #[serde(default)]
    pub selectors: SelectorsSection,
    #[serde(default)]
    pub logging: LoggingSection,
    #[serde(default)]
    pub timing: TimingSection,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CleaningSection {
    pub max_consecutive_blanks: Option<usize>,
    /// 追加到默认集合上的不可见字符
    pub extra_invisible: Option<String>,
    /// 完全替换默认集合
    pub invisible: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PreviewSection {
    pub lines: Option<usize>,
    pub locale: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SelectorsSection {
    pub candidate: Option<String>,
    pub roots: Option<Vec<String>>,
    pub page_pattern: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingSection {
    pub level: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TimingSection {
    pub idle_timeout_ms: Option<u64>,
    pub fallback_delay_ms: Option<u64>,
    pub frame_ms: Option<u64>,
}

impl FileConfig {
    pub fn from_toml_str(content: &str) -> CleanerResult<Self> {
        toml::from_str(content)
            .map_err(|e| CleanerError::Config(format!("failed to parse TOML config: {}", e)))
    }

    pub fn load(path: &Path) -> CleanerResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            CleanerError::Config(format!("failed to read config file {}: {}", path.display(), e))
        })?;
        info!(target: "tb_clean", "Loaded config file: {}", path.display());
        Self::from_toml_str(&content)
    }

    /// 把文件中出现的项写入选项
    pub fn apply(&self, options: &mut CleanerOptions) -> CleanerResult<()> {
        if let Some(invisible) = &self.cleaning.invisible {
            options.invisible_chars = InvisibleCharSet::parse_list(invisible)?;
        }
        if let Some(extra) = &self.cleaning.extra_invisible {
            options
                .invisible_chars
                .extend(&InvisibleCharSet::parse_list(extra)?);
        }
        if let Some(max) = self.cleaning.max_consecutive_blanks {
            options.max_consecutive_blanks = max;
        }

        if let Some(lines) = self.preview.lines {
            options.preview_lines = lines;
        }
        if let Some(locale) = &self.preview.locale {
            options.locale = Some(locale.clone());
        }

        if let Some(candidate) = &self.selectors.candidate {
            options.candidate_selector = candidate.clone();
        }
        if let Some(roots) = &self.selectors.roots {
            options.root_selectors = roots.clone();
        }
        if let Some(page_pattern) = &self.selectors.page_pattern {
            options.page_pattern = page_pattern.clone();
        }

        if let Some(level) = &self.logging.level {
            options.log_level = level.parse::<LogLevel>()?;
        }

        if let Some(ms) = self.timing.idle_timeout_ms {
            options.startup.idle_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = self.timing.fallback_delay_ms {
            options.startup.fallback_delay = Duration::from_millis(ms);
        }
        if let Some(ms) = self.timing.frame_ms {
            options.frame_interval = Duration::from_millis(ms);
        }

        Ok(())
    }
}

impl CleanerOptions {
    /// 在默认选项上叠加一份 TOML 配置
    pub fn from_toml_str(content: &str) -> CleanerResult<CleanerOptions> {
        let mut options = CleanerOptions::default();
        FileConfig::from_toml_str(content)?.apply(&mut options)?;
        options.validate()?;
        Ok(options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_keeps_defaults() {
        let options = CleanerOptions::from_toml_str("").unwrap();
        let defaults = CleanerOptions::default();
        assert_eq!(options.preview_lines, defaults.preview_lines);
        assert_eq!(options.root_selectors, defaults.root_selectors);
        assert_eq!(options.log_level, LogLevel::Summary);
    }

    #[test]
    fn sections_override_defaults() {
        let options = CleanerOptions::from_toml_str(
            r##"
            [cleaning]
            max_consecutive_blanks = 1
            extra_invisible = "U+3164"

            [preview]
            lines = 3
            locale = "he-IL"

            [selectors]
            candidate = "div.comment"
            roots = ["#comments"]

            [logging]
            level = "verbose"

            [timing]
            frame_ms = 33
            "##,
        )
        .unwrap();

        assert_eq!(options.max_consecutive_blanks, 1);
        assert!(options.invisible_chars.contains('\u{3164}'));
        assert!(options.invisible_chars.contains('\u{FEFF}'));
        assert_eq!(options.preview_lines, 3);
        assert_eq!(options.locale.as_deref(), Some("he-IL"));
        assert_eq!(options.candidate_selector, "div.comment");
        assert_eq!(options.root_selectors, vec!["#comments".to_string()]);
        assert_eq!(options.log_level, LogLevel::Verbose);
        assert_eq!(options.frame_interval, Duration::from_millis(33));
    }

    #[test]
    fn invisible_replaces_default_set() {
        let options = CleanerOptions::from_toml_str(
            r#"
            [cleaning]
            invisible = "200B"
            "#,
        )
        .unwrap();
        assert!(options.invisible_chars.contains('\u{200B}'));
        assert!(!options.invisible_chars.contains('\u{FEFF}'));
    }

    #[test]
    fn rejects_invalid_files() {
        assert!(CleanerOptions::from_toml_str("[cleaning\n").is_err());
        assert!(CleanerOptions::from_toml_str("[unknown]\nx = 1\n").is_err());
        assert!(CleanerOptions::from_toml_str("[logging]\nlevel = \"loud\"\n").is_err());
        assert!(CleanerOptions::from_toml_str("[preview]\nlines = 0\n").is_err());
    }
}
