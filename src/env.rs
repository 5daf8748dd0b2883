//! 统一的环境变量管理系统
//!
//! 提供类型安全、可验证的环境变量读取；读取结果叠加到 `CleanerOptions` 之上。

use std::env;
use std::fmt;
use std::time::Duration;

use crate::core::{CleanerError, CleanerOptions, LogLevel};
use crate::pipeline::InvisibleCharSet;

/// 环境变量解析错误
#[derive(Debug, Clone)]
pub struct EnvError {
    pub variable: String,
    pub message: String,
}

impl fmt::Display for EnvError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Environment variable '{}': {}", self.variable, self.message)
    }
}

impl std::error::Error for EnvError {}

impl From<EnvError> for CleanerError {
    fn from(error: EnvError) -> Self {
        CleanerError::Config(error.to_string())
    }
}

pub type EnvResult<T> = Result<T, EnvError>;

/// 环境变量访问器特性
pub trait EnvVar<T> {
    const NAME: &'static str;
    const DEFAULT: Option<T>;
    const DESCRIPTION: &'static str;

    fn parse(value: &str) -> EnvResult<T>;

    fn get() -> EnvResult<T> {
        match Self::lookup()? {
            Some(value) => Ok(value),
            None => Self::DEFAULT.ok_or_else(|| EnvError {
                variable: Self::NAME.to_string(),
                message: "Required environment variable not set".to_string(),
            }),
        }
    }

    /// 只在变量已设置时返回值，用于叠加到其他配置来源之上
    fn lookup() -> EnvResult<Option<T>> {
        match env::var(Self::NAME) {
            Ok(value) => Self::parse(&value).map(Some),
            Err(_) => Ok(None),
        }
    }

    fn get_or_default(default: T) -> T {
        Self::get().unwrap_or(default)
    }
}

/// 日志相关环境变量
pub mod logging {
    use super::*;

    /// 运行日志级别
    pub struct Level;
    impl EnvVar<LogLevel> for Level {
        const NAME: &'static str = "TB_CLEAN_LOG_LEVEL";
        const DEFAULT: Option<LogLevel> = Some(LogLevel::Summary);
        const DESCRIPTION: &'static str = "Run log verbosity: off, summary, verbose";

        fn parse(value: &str) -> EnvResult<LogLevel> {
            value.parse().map_err(|_| EnvError {
                variable: Self::NAME.to_string(),
                message: format!("Invalid log level '{}'. Use: off, summary, verbose", value),
            })
        }
    }

    /// 禁用彩色输出
    pub struct NoColor;
    impl EnvVar<bool> for NoColor {
        const NAME: &'static str = "NO_COLOR";
        const DEFAULT: Option<bool> = Some(false);
        const DESCRIPTION: &'static str = "Disable colored output when set to any value";

        fn parse(value: &str) -> EnvResult<bool> {
            // NO_COLOR 遵循标准：任何值都表示禁用颜色
            Ok(!value.is_empty())
        }
    }
}

/// 清理相关环境变量
pub mod cleaning {
    use super::*;

    /// 预览行数
    pub struct PreviewLines;
    impl EnvVar<usize> for PreviewLines {
        const NAME: &'static str = "TB_CLEAN_PREVIEW_LINES";
        const DEFAULT: Option<usize> = Some(5);
        const DESCRIPTION: &'static str = "Lines shown before a comment is collapsed behind a toggle";

        fn parse(value: &str) -> EnvResult<usize> {
            parse_bounded_usize(value, Self::NAME, 1, 100)
        }
    }

    /// 连续空行上限
    pub struct MaxBlanks;
    impl EnvVar<usize> for MaxBlanks {
        const NAME: &'static str = "TB_CLEAN_MAX_BLANKS";
        const DEFAULT: Option<usize> = Some(2);
        const DESCRIPTION: &'static str = "Maximum consecutive blank lines kept inside a comment";

        fn parse(value: &str) -> EnvResult<usize> {
            parse_bounded_usize(value, Self::NAME, 0, 20)
        }
    }

    /// 追加的不可见字符
    pub struct ExtraInvisible;
    impl EnvVar<InvisibleCharSet> for ExtraInvisible {
        const NAME: &'static str = "TB_CLEAN_EXTRA_INVISIBLE";
        const DEFAULT: Option<InvisibleCharSet> = None;
        const DESCRIPTION: &'static str =
            "Extra invisible codepoints to strip, comma-separated (e.g. U+3164,2800-28FF)";

        fn get() -> EnvResult<InvisibleCharSet> {
            Ok(Self::lookup()?.unwrap_or_else(InvisibleCharSet::empty))
        }

        fn parse(value: &str) -> EnvResult<InvisibleCharSet> {
            InvisibleCharSet::parse_list(value).map_err(|e| EnvError {
                variable: Self::NAME.to_string(),
                message: e.to_string(),
            })
        }
    }
}

/// 时序相关环境变量
pub mod timing {
    use super::*;

    /// 等待页面空闲的上限
    pub struct IdleTimeout;
    impl EnvVar<Duration> for IdleTimeout {
        const NAME: &'static str = "TB_CLEAN_IDLE_TIMEOUT_MS";
        const DEFAULT: Option<Duration> = Some(Duration::from_millis(1500));
        const DESCRIPTION: &'static str = "Longest wait for the page to become idle before init, in ms";

        fn parse(value: &str) -> EnvResult<Duration> {
            parse_millis(value, Self::NAME, 0, 60_000)
        }
    }

    /// 没有空闲信号时的启动延迟
    pub struct FallbackDelay;
    impl EnvVar<Duration> for FallbackDelay {
        const NAME: &'static str = "TB_CLEAN_FALLBACK_DELAY_MS";
        const DEFAULT: Option<Duration> = Some(Duration::from_millis(800));
        const DESCRIPTION: &'static str = "Init delay when no idle signal is available, in ms";

        fn parse(value: &str) -> EnvResult<Duration> {
            parse_millis(value, Self::NAME, 0, 60_000)
        }
    }

    /// 帧间隔
    pub struct FrameInterval;
    impl EnvVar<Duration> for FrameInterval {
        const NAME: &'static str = "TB_CLEAN_FRAME_MS";
        const DEFAULT: Option<Duration> = Some(Duration::from_millis(16));
        const DESCRIPTION: &'static str = "Frame interval used to coalesce mutation bursts, in ms";

        fn parse(value: &str) -> EnvResult<Duration> {
            parse_millis(value, Self::NAME, 1, 1000)
        }
    }
}

/// 辅助函数
fn parse_bounded_usize(value: &str, var_name: &str, min: usize, max: usize) -> EnvResult<usize> {
    let num: usize = value.trim().parse().map_err(|_| EnvError {
        variable: var_name.to_string(),
        message: "Must be a valid non-negative number".to_string(),
    })?;

    if num < min {
        return Err(EnvError {
            variable: var_name.to_string(),
            message: format!("Value {} is below minimum {}", num, min),
        });
    }

    if num > max {
        return Err(EnvError {
            variable: var_name.to_string(),
            message: format!("Value {} exceeds maximum {}", num, max),
        });
    }

    Ok(num)
}

fn parse_millis(value: &str, var_name: &str, min: u64, max: u64) -> EnvResult<Duration> {
    let millis = parse_bounded_usize(value, var_name, min as usize, max as usize)?;
    Ok(Duration::from_millis(millis as u64))
}

/// 环境变量配置汇总
///
/// 每一项只在对应变量已设置时为 `Some`。
#[derive(Debug, Clone, Default)]
pub struct EnvConfig {
    pub log_level: Option<LogLevel>,
    pub no_color: bool,
    pub preview_lines: Option<usize>,
    pub max_blanks: Option<usize>,
    pub extra_invisible: Option<InvisibleCharSet>,
    pub idle_timeout: Option<Duration>,
    pub fallback_delay: Option<Duration>,
    pub frame_interval: Option<Duration>,
}

impl EnvConfig {
    /// 从环境变量加载配置
    pub fn from_env() -> EnvResult<Self> {
        Ok(Self {
            log_level: logging::Level::lookup()?,
            no_color: logging::NoColor::get()?,
            preview_lines: cleaning::PreviewLines::lookup()?,
            max_blanks: cleaning::MaxBlanks::lookup()?,
            extra_invisible: cleaning::ExtraInvisible::lookup()?,
            idle_timeout: timing::IdleTimeout::lookup()?,
            fallback_delay: timing::FallbackDelay::lookup()?,
            frame_interval: timing::FrameInterval::lookup()?,
        })
    }

    /// 把已设置的变量叠加到选项上
    pub fn apply(&self, options: &mut CleanerOptions) {
        if let Some(log_level) = self.log_level {
            options.log_level = log_level;
        }
        if let Some(preview_lines) = self.preview_lines {
            options.preview_lines = preview_lines;
        }
        if let Some(max_blanks) = self.max_blanks {
            options.max_consecutive_blanks = max_blanks;
        }
        if let Some(extra_invisible) = &self.extra_invisible {
            options.invisible_chars.extend(extra_invisible);
        }
        if let Some(idle_timeout) = self.idle_timeout {
            options.startup.idle_timeout = idle_timeout;
        }
        if let Some(fallback_delay) = self.fallback_delay {
            options.startup.fallback_delay = fallback_delay;
        }
        if let Some(frame_interval) = self.frame_interval {
            options.frame_interval = frame_interval;
        }
    }
}

/// 环境变量文档生成器
pub fn generate_env_docs() -> String {
    let mut docs = String::new();
    docs.push_str("# Environment Variables Documentation\n\n");

    docs.push_str("## Logging\n\n");
    docs.push_str(&format!("- `{}`: {} (default: {:?})\n",
        logging::Level::NAME, logging::Level::DESCRIPTION, logging::Level::DEFAULT));
    docs.push_str(&format!("- `{}`: {} (default: {:?})\n",
        logging::NoColor::NAME, logging::NoColor::DESCRIPTION, logging::NoColor::DEFAULT));

    docs.push_str("\n## Cleaning\n\n");
    docs.push_str(&format!("- `{}`: {} (default: {:?})\n",
        cleaning::PreviewLines::NAME, cleaning::PreviewLines::DESCRIPTION, cleaning::PreviewLines::DEFAULT));
    docs.push_str(&format!("- `{}`: {} (default: {:?})\n",
        cleaning::MaxBlanks::NAME, cleaning::MaxBlanks::DESCRIPTION, cleaning::MaxBlanks::DEFAULT));
    docs.push_str(&format!("- `{}`: {}\n",
        cleaning::ExtraInvisible::NAME, cleaning::ExtraInvisible::DESCRIPTION));

    docs.push_str("\n## Timing\n\n");
    docs.push_str(&format!("- `{}`: {} (default: {:?})\n",
        timing::IdleTimeout::NAME, timing::IdleTimeout::DESCRIPTION, timing::IdleTimeout::DEFAULT));
    docs.push_str(&format!("- `{}`: {} (default: {:?})\n",
        timing::FallbackDelay::NAME, timing::FallbackDelay::DESCRIPTION, timing::FallbackDelay::DEFAULT));
    docs.push_str(&format!("- `{}`: {} (default: {:?})\n",
        timing::FrameInterval::NAME, timing::FrameInterval::DESCRIPTION, timing::FrameInterval::DEFAULT));

    docs
}
