use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use markup5ever_rcdom::Handle;
use regex::Regex;
use thiserror::Error;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{error, info};
use url::Url;

use crate::parsers::html::{get_document_lang, Selector};
use crate::pipeline::{
    select_root, ActivationEvent, BatchProcessor, InvisibleCharSet, Labels, MutationRecord,
    MutationScheduler, PreviewRenderer, RunStatistics, SchedulerReport, SelectorSource,
    StartupTiming, TextCleaner, ToggleState, DEFAULT_FRAME_INTERVAL,
};
use crate::pipeline::preview::DEFAULT_PREVIEW_LINES;
use crate::pipeline::text::DEFAULT_MAX_CONSECUTIVE_BLANKS;

/// Represents errors that can occur while cleaning a page
#[derive(Error, Debug)]
pub enum CleanerError {
    /// The host document or location cannot be used
    #[error("init error: {0}")]
    Init(String),

    #[error("parse error: {0}")]
    Parse(String),

    /// A text or attribute write was rejected by the node
    #[error("DOM write error: {0}")]
    DomWrite(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type CleanerResult<T> = Result<T, CleanerError>;

/// Verbosity of the advisory run log
///
/// Never affects behavior, only what gets emitted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Off,
    #[default]
    Summary,
    Verbose,
}

impl LogLevel {
    /// Filter directive for the tracing subscriber
    pub fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Off => "off",
            LogLevel::Summary => "info",
            LogLevel::Verbose => "debug",
        }
    }
}

impl FromStr for LogLevel {
    type Err = CleanerError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "off" => Ok(LogLevel::Off),
            "summary" => Ok(LogLevel::Summary),
            "verbose" => Ok(LogLevel::Verbose),
            _ => Err(CleanerError::Config(format!(
                "invalid log level '{value}'. Use: off, summary, verbose"
            ))),
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LogLevel::Off => "off",
            LogLevel::Summary => "summary",
            LogLevel::Verbose => "verbose",
        };
        write!(f, "{name}")
    }
}

pub const DEFAULT_CANDIDATE_SELECTOR: &str = "pre.comment-item-text";
pub const DEFAULT_ROOT_SELECTORS: &[&str] = &[".talkback-list-wrapper", ".talkback-list", "body"];
pub const DEFAULT_PAGE_PATTERN: &str = r"https://news\.walla\.co\.il/item";

/// Configuration options for cleaning a page
///
/// Defaults reproduce the behavior expected on talkback item pages.
/// Environment variables, a TOML file and CLI flags may override them.
#[derive(Clone, Debug)]
pub struct CleanerOptions {
    pub log_level: LogLevel,
    pub preview_lines: usize,
    pub max_consecutive_blanks: usize,
    pub invisible_chars: InvisibleCharSet,
    pub candidate_selector: String,
    pub root_selectors: Vec<String>,
    pub page_pattern: String,
    /// Overrides the language detected from `<html lang>`
    pub locale: Option<String>,
    pub startup: StartupTiming,
    pub frame_interval: Duration,
}

impl Default for CleanerOptions {
    fn default() -> Self {
        Self {
            log_level: LogLevel::default(),
            preview_lines: DEFAULT_PREVIEW_LINES,
            max_consecutive_blanks: DEFAULT_MAX_CONSECUTIVE_BLANKS,
            invisible_chars: InvisibleCharSet::default(),
            candidate_selector: DEFAULT_CANDIDATE_SELECTOR.to_string(),
            root_selectors: DEFAULT_ROOT_SELECTORS.iter().map(|s| s.to_string()).collect(),
            page_pattern: DEFAULT_PAGE_PATTERN.to_string(),
            locale: None,
            startup: StartupTiming::default(),
            frame_interval: DEFAULT_FRAME_INTERVAL,
        }
    }
}

impl CleanerOptions {
    /// Checks values that cannot be validated field by field at parse time
    pub fn validate(&self) -> CleanerResult<()> {
        if self.preview_lines == 0 {
            return Err(CleanerError::Config(
                "preview_lines must be greater than 0".to_string(),
            ));
        }
        if self.frame_interval.is_zero() {
            return Err(CleanerError::Config(
                "frame interval must be greater than 0".to_string(),
            ));
        }
        Selector::parse(&self.candidate_selector)?;
        for selector in self.root_selectors.iter() {
            Selector::parse(selector)?;
        }
        Regex::new(&self.page_pattern)
            .map_err(|e| CleanerError::Config(format!("invalid page pattern: {e}")))?;
        Ok(())
    }
}

/// A cleaner attached to one page view
///
/// Owns the batch processor (with its registry, renderer and statistics)
/// and the scheduler observing the page's comment container.
pub struct Cleaner {
    processor: BatchProcessor,
    scheduler: MutationScheduler,
    frame_interval: Duration,
}

impl Cleaner {
    pub fn processor(&self) -> &BatchProcessor {
        &self.processor
    }

    pub fn scheduler(&self) -> &MutationScheduler {
        &self.scheduler
    }

    pub fn statistics(&self) -> RunStatistics {
        self.processor.statistics()
    }

    /// Runs a full pass outside of the scheduler
    pub fn process_all(&mut self) -> CleanerResult<RunStatistics> {
        self.processor.process_all()
    }

    pub fn notify(&mut self, records: &[MutationRecord]) -> bool {
        self.scheduler.notify(records)
    }

    pub fn run_pending(&mut self) -> Option<CleanerResult<RunStatistics>> {
        self.scheduler.run_pending(&mut self.processor)
    }

    /// Observes mutations until the channel closes
    pub async fn observe(
        &mut self,
        mutations: UnboundedReceiver<Vec<MutationRecord>>,
    ) -> SchedulerReport {
        self.scheduler
            .run(&mut self.processor, mutations, self.frame_interval)
            .await
    }

    /// Activates a toggle control, as a click on it would
    pub fn activate(&mut self, toggle: &Handle) -> CleanerResult<Option<ToggleState>> {
        let mut event = ActivationEvent::new();
        self.processor.renderer_mut().activate(toggle, &mut event)
    }

    /// Expands every collapsed comment, returns how many were expanded
    pub fn expand_all(&mut self) -> CleanerResult<usize> {
        let mut expanded = 0;
        for toggle in self.processor.renderer().collapsed_toggles() {
            if self.activate(&toggle)? == Some(ToggleState::Expanded) {
                expanded += 1;
            }
        }
        Ok(expanded)
    }
}

/// Attaches the cleaner to a page
///
/// Checks the location against the configured page pattern, runs the initial
/// pass over all comments and prepares a scheduler on the most specific
/// comment container available.
///
/// # Arguments
///
/// * `document` - The document node of the page
/// * `location` - Absolute URL the page was loaded from
/// * `options` - Cleaning options
///
/// # Returns
///
/// `Ok(None)` when the location is not a comment page (the page is left
/// untouched), otherwise the attached cleaner.
///
/// # Examples
///
/// ```
/// use talkback_cleaner::core::{init, CleanerOptions};
/// use talkback_cleaner::parsers::html_to_dom;
///
/// let html = "<pre class=\"comment-item-text\">hi\u{200B}</pre>";
/// let dom = html_to_dom(html.as_bytes(), "utf-8").unwrap();
/// let cleaner = init(
///     &dom.document,
///     "https://news.walla.co.il/item/1",
///     &CleanerOptions::default(),
/// )
/// .unwrap()
/// .unwrap();
///
/// assert_eq!(cleaner.statistics().invisible_chars_removed, 1);
/// ```
pub fn init(
    document: &Handle,
    location: &str,
    options: &CleanerOptions,
) -> CleanerResult<Option<Cleaner>> {
    let result = attach(document, location, options);
    if let Err(err) = &result {
        error!(target: "tb_clean", "Init error: {}", err);
    }
    result
}

fn attach(
    document: &Handle,
    location: &str,
    options: &CleanerOptions,
) -> CleanerResult<Option<Cleaner>> {
    let url = Url::parse(location)
        .map_err(|e| CleanerError::Init(format!("invalid location '{location}': {e}")))?;

    options.validate()?;
    let page_pattern = Regex::new(&options.page_pattern)
        .map_err(|e| CleanerError::Config(format!("invalid page pattern: {e}")))?;

    if !page_pattern.is_match(url.as_str()) {
        if options.log_level >= LogLevel::Summary {
            info!(target: "tb_clean", "Not an item page, exiting.");
        }
        return Ok(None);
    }

    if options.log_level >= LogLevel::Summary {
        info!(target: "tb_clean", "Init on {}", url);
    }

    let lang = options
        .locale
        .clone()
        .or_else(|| get_document_lang(document));
    let labels = Labels::for_lang(lang.as_deref());

    let candidate_selector = Selector::parse(&options.candidate_selector)?;
    let root_selectors = options
        .root_selectors
        .iter()
        .map(String::as_str)
        .map(Selector::parse)
        .collect::<CleanerResult<Vec<Selector>>>()?;

    let mut processor = BatchProcessor::new(
        Box::new(SelectorSource::new(document.clone(), candidate_selector)),
        TextCleaner::new(options.invisible_chars.clone(), options.max_consecutive_blanks),
        PreviewRenderer::new(options.preview_lines, labels),
        options.log_level,
        url.as_str(),
    );
    processor.process_all()?;

    let scheduler = MutationScheduler::new(select_root(document, &root_selectors));
    if options.log_level >= LogLevel::Summary {
        info!(target: "tb_clean", "MutationObserver attached to {}", scheduler.root_name());
    }

    Ok(Some(Cleaner {
        processor,
        scheduler,
        frame_interval: options.frame_interval,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_level_parsing() {
        assert_eq!("off".parse::<LogLevel>().unwrap(), LogLevel::Off);
        assert_eq!("SUMMARY".parse::<LogLevel>().unwrap(), LogLevel::Summary);
        assert_eq!(" verbose ".parse::<LogLevel>().unwrap(), LogLevel::Verbose);
        assert!("loud".parse::<LogLevel>().is_err());
    }

    #[test]
    fn log_levels_are_ordered() {
        assert!(LogLevel::Off < LogLevel::Summary);
        assert!(LogLevel::Summary < LogLevel::Verbose);
    }

    #[test]
    fn default_options_are_valid() {
        assert!(CleanerOptions::default().validate().is_ok());
    }

    #[test]
    fn validate_rejects_bad_values() {
        let options = CleanerOptions {
            preview_lines: 0,
            ..Default::default()
        };
        assert!(options.validate().is_err());

        let options = CleanerOptions {
            root_selectors: vec!["div > p".to_string()],
            ..Default::default()
        };
        assert!(options.validate().is_err());

        let options = CleanerOptions {
            page_pattern: "(unclosed".to_string(),
            ..Default::default()
        };
        assert!(options.validate().is_err());
    }
}
