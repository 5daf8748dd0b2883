//! 命令行入口
//!
//! 读取一个已渲染的评论页面，清理其中的评论，可选地回放懒加载的评论片段，
//! 然后把结果写回。

use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::process;

use clap::{ArgAction, Parser};
use encoding_rs::Encoding;
use markup5ever_rcdom::RcDom;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info};

use talkback_cleaner::config::FileConfig;
use talkback_cleaner::core::{init, Cleaner, CleanerError, CleanerOptions, CleanerResult, LogLevel};
use talkback_cleaner::env::{generate_env_docs, EnvConfig};
use talkback_cleaner::parsers::html::{get_charset, html_to_dom, serialize_document};
use talkback_cleaner::parsers::append_fragment;
use talkback_cleaner::pipeline::{defer_startup, MutationRecord};

const STDIN_INPUT: &str = "-";
const DEFAULT_ENCODING: &str = "utf-8";

#[derive(Parser)]
#[command(name = "talkback-cleaner", version)]
#[command(about = "Strips invisible-character spam and blank-line padding from talkback comments", long_about = None)]
struct Cli {
    /// Input HTML file, or - to read from stdin
    #[arg(required_unless_present = "env_docs")]
    input: Option<String>,

    /// Location the page was loaded from
    #[arg(short, long, required_unless_present = "env_docs")]
    url: Option<String>,

    /// HTML fragments appended to the comment list after the initial pass
    #[arg(short, long, action = ArgAction::Append)]
    append: Vec<PathBuf>,

    /// Write the cleaned page here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Charset of the input, detected from the document when omitted
    #[arg(short = 'E', long)]
    encoding: Option<String>,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Run log verbosity (off, summary, verbose)
    #[arg(long)]
    log_level: Option<LogLevel>,

    /// Lines shown before a comment is collapsed
    #[arg(long)]
    preview_lines: Option<usize>,

    /// Maximum consecutive blank lines kept inside a comment
    #[arg(long)]
    max_blanks: Option<usize>,

    /// Expand every collapsed comment before writing the page
    #[arg(long)]
    expand_all: bool,

    /// Print the supported environment variables and exit
    #[arg(long)]
    env_docs: bool,
}

fn main() {
    let cli = Cli::parse();

    if cli.env_docs {
        print!("{}", generate_env_docs());
        return;
    }

    let env_config = match EnvConfig::from_env() {
        Ok(env_config) => env_config,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    let options = match build_options(&cli, &env_config) {
        Ok(options) => options,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    init_tracing(options.log_level, env_config.no_color);

    if let Err(e) = run(&cli, &options) {
        error!(target: "tb_clean", "{}", e);
        process::exit(1);
    }
}

/// 默认值 < 配置文件 < 环境变量 < 命令行参数
fn build_options(cli: &Cli, env_config: &EnvConfig) -> CleanerResult<CleanerOptions> {
    let mut options = CleanerOptions::default();

    if let Some(path) = &cli.config {
        FileConfig::load(path)?.apply(&mut options)?;
    }

    env_config.apply(&mut options);

    if let Some(log_level) = cli.log_level {
        options.log_level = log_level;
    }
    if let Some(preview_lines) = cli.preview_lines {
        options.preview_lines = preview_lines;
    }
    if let Some(max_blanks) = cli.max_blanks {
        options.max_consecutive_blanks = max_blanks;
    }

    options.validate()?;
    Ok(options)
}

fn init_tracing(log_level: LogLevel, no_color: bool) {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level.as_filter())),
        )
        .with_writer(io::stderr)
        .with_ansi(!no_color)
        .init();
}

fn run(cli: &Cli, options: &CleanerOptions) -> CleanerResult<()> {
    let input = cli.input.as_deref().unwrap_or(STDIN_INPUT);
    let url = cli.url.as_deref().unwrap_or_default();

    let data = read_input(input)?;
    let (dom, encoding) = parse_page(&data, cli.encoding.as_deref())?;

    let fragments = cli
        .append
        .iter()
        .map(|path| fs::read_to_string(path).map_err(CleanerError::from))
        .collect::<CleanerResult<Vec<String>>>()?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()?;

    let cleaner = runtime.block_on(async {
        // 文档已经完整解析，页面立即进入空闲状态
        let (idle_tx, idle_rx) = oneshot::channel();
        let _ = idle_tx.send(());
        let trigger = defer_startup(Some(idle_rx), options.startup).await;
        debug!(target: "tb_clean", "startup triggered by {:?}", trigger);

        let Some(mut cleaner) = init(&dom.document, url, options)? else {
            return Ok(None);
        };

        replay_fragments(&mut cleaner, fragments, options).await?;
        Ok::<_, CleanerError>(Some(cleaner))
    })?;

    let Some(mut cleaner) = cleaner else {
        // 非评论页面：原样输出
        return write_output(cli.output.as_ref(), &data);
    };

    if cli.expand_all {
        let expanded = cleaner.expand_all()?;
        if options.log_level >= LogLevel::Summary {
            info!(target: "tb_clean", "Expanded {} comments", expanded);
        }
    }

    let output = serialize_document(&dom, &encoding)?;
    write_output(cli.output.as_ref(), &output)
}

/// 把片段逐帧追加到观察根节点，模拟评论列表的懒加载
async fn replay_fragments(
    cleaner: &mut Cleaner,
    fragments: Vec<String>,
    options: &CleanerOptions,
) -> CleanerResult<()> {
    let (mutations_tx, mutations_rx) = mpsc::unbounded_channel();
    let root = cleaner.scheduler().root().clone();
    let frame_interval = options.frame_interval;

    let feeder = async move {
        for fragment in fragments.iter() {
            let added = append_fragment(&root, fragment)?;
            if !added.is_empty() {
                let _ = mutations_tx.send(vec![MutationRecord::added(&root)]);
            }
            tokio::time::sleep(frame_interval).await;
        }
        // mutations_tx 在这里被丢弃，观察随之结束
        Ok::<_, CleanerError>(())
    };

    let (fed, report) = tokio::join!(feeder, cleaner.observe(mutations_rx));
    fed?;

    if options.log_level >= LogLevel::Summary && report.records_seen > 0 {
        info!(
            target: "tb_clean",
            records = report.records_seen,
            passes = report.passes_run,
            failed = report.passes_failed,
            "Replayed lazily loaded comments"
        );
    }

    Ok(())
}

fn read_input(input: &str) -> CleanerResult<Vec<u8>> {
    if input == STDIN_INPUT {
        let mut data = Vec::new();
        io::stdin().read_to_end(&mut data)?;
        Ok(data)
    } else {
        Ok(fs::read(input)?)
    }
}

/// 先按 UTF-8 解析；文档声明了其他字符编码时按声明重新解析
fn parse_page(data: &[u8], encoding: Option<&str>) -> CleanerResult<(RcDom, String)> {
    if let Some(encoding) = encoding {
        if Encoding::for_label(encoding.as_bytes()).is_none() {
            return Err(CleanerError::Config(format!("unknown encoding '{}'", encoding)));
        }
        return Ok((html_to_dom(data, encoding)?, encoding.to_string()));
    }

    let dom = html_to_dom(data, DEFAULT_ENCODING)?;
    match get_charset(&dom.document) {
        Some(charset)
            if !charset.eq_ignore_ascii_case(DEFAULT_ENCODING)
                && Encoding::for_label(charset.as_bytes()).is_some() =>
        {
            Ok((html_to_dom(data, &charset)?, charset))
        }
        _ => Ok((dom, DEFAULT_ENCODING.to_string())),
    }
}

fn write_output(output: Option<&PathBuf>, data: &[u8]) -> CleanerResult<()> {
    match output {
        Some(path) => fs::write(path, data)?,
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(data)?;
            stdout.flush()?;
        }
    }
    Ok(())
}
