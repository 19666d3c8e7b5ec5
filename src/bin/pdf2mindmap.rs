//! CLI binary for pdf2mindmap.
//!
//! A thin shim over the library crate: maps CLI flags to `MindMapConfig`,
//! drives one `MindMapSession` and, with `--edit`, hands the session to an
//! interactive prompt where nodes are edited by id.

use anyhow::{Context, Result};
use clap::Parser;
use futures::future::{BoxFuture, FutureExt};
use indicatif::{ProgressBar, ProgressStyle};
use pdf2mindmap::pipeline::extract::{library_path_exists, PDFIUM_LIB_PATH_ENV};
use pdf2mindmap::pipeline::input::resolve_input;
use pdf2mindmap::pipeline::render::{
    render_ascii, HtmlRenderer, MarkdownFileRenderer, MultiRenderer, TerminalRenderer,
};
use pdf2mindmap::{
    inspect, Completion, DocumentExtractor, GenerationError, GenerationStats, LlmOutlineGenerator,
    MindMapConfig, MindMapOutput, MindMapSession, NodeId, Notice, NoticeLevel, OutlineGenerator,
    OutlineRequest, PdfiumExtractor, RenderOptions, SessionObserver, SessionState,
    DEFAULT_API_TIMEOUT_SECS, DEFAULT_DOWNLOAD_TIMEOUT_SECS,
};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::warn;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI observer using indicatif ─────────────────────────────────────────────

/// Terminal observer: a spinner while the outline request is in flight and
/// coloured notice lines.
struct CliObserver {
    spinner: Mutex<Option<ProgressBar>>,
    show_progress: bool,
    show_notices: bool,
}

impl CliObserver {
    fn new(show_progress: bool, show_notices: bool) -> Arc<Self> {
        Arc::new(Self {
            spinner: Mutex::new(None),
            show_progress,
            show_notices,
        })
    }

    fn stop_spinner(&self) {
        if let Ok(mut guard) = self.spinner.lock() {
            if let Some(bar) = guard.take() {
                bar.finish_and_clear();
            }
        }
    }
}

impl SessionObserver for CliObserver {
    fn on_state_change(&self, _from: &SessionState, to: &SessionState) {
        if *to == SessionState::Failed {
            self.stop_spinner();
        }
    }

    fn on_generation_start(&self, source_chars: usize) {
        if !self.show_progress {
            return;
        }
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  ⏱ {elapsed}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]),
        );
        bar.set_prefix("Generating");
        bar.set_message(format!("outline for {source_chars} chars of text…"));
        bar.enable_steady_tick(Duration::from_millis(80));
        if let Ok(mut guard) = self.spinner.lock() {
            *guard = Some(bar);
        }
    }

    fn on_generation_complete(&self, stats: &GenerationStats) {
        self.stop_spinner();
        if self.show_progress {
            eprintln!(
                "{} {} nodes, depth {}  {}",
                green("✔"),
                bold(&stats.node_count.to_string()),
                stats.max_depth,
                dim(&format!("{:.1}s", stats.duration_ms as f64 / 1000.0)),
            );
        }
    }

    fn on_notice(&self, notice: &Notice) {
        if !self.show_notices {
            return;
        }
        let line = match notice.level {
            NoticeLevel::Info => format!("{} {}", cyan("ℹ"), notice),
            NoticeLevel::Warning => format!("{} {}", yellow("⚠"), notice),
            NoticeLevel::Error => format!("{} {}", red("✗"), red(&notice.message)),
        };
        eprintln!("{line}");
    }
}

/// Stand-in generator for `--outline`, where no provider is configured.
struct OfflineGenerator;

impl OutlineGenerator for OfflineGenerator {
    fn generate<'a>(
        &'a self,
        _request: &'a OutlineRequest,
    ) -> BoxFuture<'a, Result<Completion, GenerationError>> {
        async {
            Err(GenerationError::ProviderNotConfigured {
                provider: "none".to_string(),
                hint: "started with --outline; restart without it to regenerate".to_string(),
            })
        }
        .boxed()
    }
}

const EXAMPLES_HELP: &str = r#"EXAMPLES:
  # Outline to stdout
  pdf2mindmap paper.pdf

  # Interactive mind map page
  pdf2mindmap paper.pdf -o paper.html

  # Keep the outline next to the page
  pdf2mindmap paper.pdf -o paper.html --markdown paper.md

  # Edit node labels, then keep the result
  pdf2mindmap paper.pdf -o paper.html --markdown paper.md --edit

  # Re-open a saved outline without calling the LLM
  pdf2mindmap --outline paper.md -o paper.html --edit

  # From a URL, with a specific model
  pdf2mindmap --provider openai --model gpt-4.1 https://arxiv.org/pdf/1706.03762

  # Inspect PDF metadata (no API key needed)
  pdf2mindmap --inspect-only paper.pdf

"#;

const ENVIRONMENT_HELP: &str = r#"ENVIRONMENT VARIABLES:
  OPENAI_API_KEY          OpenAI API key
  ANTHROPIC_API_KEY       Anthropic API key
  GEMINI_API_KEY          Google Gemini API key
  EDGEQUAKE_LLM_PROVIDER  Override provider (openai, anthropic, gemini, ollama)
  EDGEQUAKE_MODEL         Override model ID
  PDFIUM_LIB_PATH         Path to libpdfium (file or directory)
"#;

fn after_long_help() -> String {
    format!("{EXAMPLES_HELP}EDIT COMMANDS:\n{EDIT_HELP}\n{ENVIRONMENT_HELP}")
}

/// Turn PDF documents into editable mind maps with an LLM.
#[derive(Parser, Debug)]
#[command(
    name = "pdf2mindmap",
    version,
    about = "Turn PDF documents into editable mind maps with an LLM",
    long_about = "Extract the text of a PDF (local file or URL), ask an LLM for a hierarchical \
outline and render it as an interactive markmap page. Supports OpenAI, Anthropic, Google Gemini, \
Azure OpenAI and any OpenAI-compatible endpoint (Ollama, vLLM, LiteLLM, etc.).",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = after_long_help()
)]
struct Cli {
    /// PDF or text file path, or HTTP/HTTPS URL.
    input: String,

    /// Write the interactive mind map page (HTML) to this file.
    #[arg(short, long, env = "PDF2MINDMAP_OUTPUT")]
    output: Option<PathBuf>,

    /// Write the canonical outline (Markdown) to this file.
    #[arg(long, env = "PDF2MINDMAP_MARKDOWN")]
    markdown: Option<PathBuf>,

    /// Treat the input as an existing outline and skip the LLM.
    #[arg(long)]
    outline: bool,

    /// LLM model ID (e.g. gpt-4.1-mini, gpt-4.1, claude-sonnet-4-20250514).
    #[arg(long, env = "EDGEQUAKE_MODEL")]
    model: Option<String>,

    /// LLM provider: openai, anthropic, gemini, ollama, azure.
    #[arg(
        long,
        env = "EDGEQUAKE_PROVIDER",
        long_help = "LLM provider. Auto-detected from API key env vars if not set.\n\
          Supported: openai, anthropic, gemini, azure, ollama, or any OpenAI-compatible URL."
    )]
    provider: Option<String>,

    /// LLM temperature (0.0–2.0).
    #[arg(long, env = "PDF2MINDMAP_TEMPERATURE", default_value_t = 0.2)]
    temperature: f32,

    /// Max LLM output tokens for the outline.
    #[arg(long, env = "PDF2MINDMAP_MAX_TOKENS", default_value_t = 4096)]
    max_tokens: usize,

    /// Transport retries on LLM failure.
    #[arg(long, env = "PDF2MINDMAP_MAX_RETRIES", default_value_t = 0)]
    max_retries: u32,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "PDF2MINDMAP_PASSWORD")]
    password: Option<String>,

    /// Path to a text file containing a custom system prompt.
    #[arg(long, env = "PDF2MINDMAP_SYSTEM_PROMPT")]
    system_prompt: Option<PathBuf>,

    /// Levels expanded when the page opens (-1 = all).
    #[arg(long, env = "PDF2MINDMAP_EXPAND_LEVEL", default_value_t = -1,
          allow_negative_numbers = true)]
    expand_level: i32,

    /// Maximum node label width in pixels.
    #[arg(long, env = "PDF2MINDMAP_MAX_WIDTH", default_value_t = 300)]
    max_width: u32,

    /// pdfium library file or directory (overrides PDFIUM_LIB_PATH).
    #[arg(long, value_name = "PATH")]
    pdfium_lib: Option<PathBuf>,

    /// Edit node labels interactively after generation.
    #[arg(short, long)]
    edit: bool,

    /// Print the tree with node ids to stderr after each render.
    #[arg(long)]
    tree: bool,

    /// Output structured JSON (MindMapOutput) instead of the outline.
    #[arg(long, env = "PDF2MINDMAP_JSON")]
    json: bool,

    /// Disable the progress spinner.
    #[arg(long, env = "PDF2MINDMAP_NO_PROGRESS")]
    no_progress: bool,

    /// Print PDF metadata only, no generation.
    #[arg(long)]
    inspect_only: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDF2MINDMAP_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PDF2MINDMAP_QUIET")]
    quiet: bool,

    /// HTTP download timeout in seconds.
    #[arg(
        long,
        env = "PDF2MINDMAP_DOWNLOAD_TIMEOUT",
        default_value_t = DEFAULT_DOWNLOAD_TIMEOUT_SECS
    )]
    download_timeout: u64,

    /// LLM call timeout in seconds.
    #[arg(long, env = "PDF2MINDMAP_API_TIMEOUT", default_value_t = DEFAULT_API_TIMEOUT_SECS)]
    api_timeout: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let pdfium_lib = cli
        .pdfium_lib
        .clone()
        .or_else(|| std::env::var_os(PDFIUM_LIB_PATH_ENV).map(PathBuf::from));
    if let Some(ref path) = pdfium_lib {
        if !library_path_exists(path) {
            warn!(
                "No pdfium library at {:?} (from --pdfium-lib or {}); PDF input will fail to bind",
                path, PDFIUM_LIB_PATH_ENV
            );
        }
    }

    // ── Inspect-only mode ────────────────────────────────────────────────
    if cli.inspect_only {
        let meta = inspect(&cli.input).await.context("Failed to inspect PDF")?;

        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&meta).context("Failed to serialize metadata")?
            );
        } else {
            println!("File:         {}", cli.input);
            if let Some(ref t) = meta.title {
                println!("Title:        {}", t);
            }
            if let Some(ref a) = meta.author {
                println!("Author:       {}", a);
            }
            if let Some(ref s) = meta.subject {
                println!("Subject:      {}", s);
            }
            println!("Pages:        {}", meta.page_count);
        }
        return Ok(());
    }

    let config = build_config(&cli).await?;
    let document = resolve_input(&cli.input, config.download_timeout_secs)
        .await
        .context("Failed to load input")?;

    // ── Build session ────────────────────────────────────────────────────
    let generator: Arc<dyn OutlineGenerator> = if cli.outline {
        Arc::new(OfflineGenerator)
    } else {
        Arc::new(LlmOutlineGenerator::from_config(&config).context("No usable LLM provider")?)
    };

    let mut renderer = MultiRenderer::new();
    if let Some(ref path) = cli.output {
        renderer = renderer.with(HtmlRenderer::new(path).with_title(document.stem()));
    }
    if let Some(ref path) = cli.markdown {
        renderer = renderer.with(MarkdownFileRenderer::new(path));
    }
    if (cli.tree || cli.edit) && !cli.quiet {
        renderer = renderer.with(TerminalRenderer::new(io::stderr()));
    }

    let mut pdf = PdfiumExtractor::new().with_password(config.password.clone());
    if let Some(path) = pdfium_lib {
        pdf = pdf.with_library_path(path);
    }
    let extractor = DocumentExtractor::new(pdf);
    let observer = CliObserver::new(show_progress, cli.edit && !cli.quiet);

    let mut session = MindMapSession::builder(generator)
        .config(&config)
        .extractor(Arc::new(extractor))
        .renderer(renderer)
        .observer(observer)
        .build();

    // ── Generate ─────────────────────────────────────────────────────────
    if cli.outline {
        let text = String::from_utf8(document.bytes).context("Outline file is not UTF-8")?;
        session
            .open_outline(&text)
            .context("Failed to open outline")?;
    } else {
        session
            .load_document(document.bytes)
            .await
            .context("Failed to extract text")?;
        session
            .generate()
            .await
            .context("Mind map generation failed")?;
    }

    if cli.edit {
        run_editor(&mut session).await?;
    }

    // ── Output ───────────────────────────────────────────────────────────
    if cli.json {
        let tree = session
            .tree()
            .cloned()
            .context("No mind map to serialise")?;
        let output = MindMapOutput {
            markdown: session.outline().to_string(),
            tree,
            stats: session.last_stats().cloned().unwrap_or_default(),
            document: None,
        };
        let json = serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
        println!("{json}");
    } else if cli.output.is_none() && cli.markdown.is_none() {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        handle
            .write_all(session.outline().as_bytes())
            .context("Failed to write to stdout")?;
    }

    if !cli.quiet && !cli.json {
        if let Some(ref path) = cli.output {
            eprintln!("{}  →  {}", green("✔"), bold(&path.display().to_string()));
        }
        if let Some(stats) = session.last_stats() {
            eprintln!(
                "   {} tokens in  /  {} tokens out{}",
                dim(&stats.input_tokens.to_string()),
                dim(&stats.output_tokens.to_string()),
                if stats.used_fallback {
                    yellow("  (untagged response)")
                } else {
                    String::new()
                },
            );
        }
    }

    Ok(())
}

/// Map CLI args to `MindMapConfig`.
async fn build_config(cli: &Cli) -> Result<MindMapConfig> {
    let system_prompt = if let Some(ref path) = cli.system_prompt {
        Some(
            tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read system prompt from {:?}", path))?,
        )
    } else {
        None
    };

    let render = RenderOptions {
        initial_expand_level: cli.expand_level,
        max_width: cli.max_width,
        ..RenderOptions::default()
    };

    let mut builder = MindMapConfig::builder()
        .temperature(cli.temperature)
        .max_tokens(cli.max_tokens)
        .max_retries(cli.max_retries)
        .download_timeout_secs(cli.download_timeout)
        .api_timeout_secs(cli.api_timeout)
        .render(render);

    if let Some(ref model) = cli.model {
        builder = builder.model(model);
    }
    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider);
    }
    if let Some(ref password) = cli.password {
        builder = builder.password(password);
    }
    if let Some(prompt) = system_prompt {
        builder = builder.system_prompt(prompt);
    }

    builder.build().context("Invalid configuration")
}

// ── Interactive editor ───────────────────────────────────────────────────────

#[derive(Debug, PartialEq, Eq)]
enum Command<'a> {
    Show,
    Edit(usize, &'a str),
    Find(&'a str),
    Outline,
    Regenerate,
    Redraw,
    Help,
    Quit,
    Invalid(String),
}

fn parse_command(line: &str) -> Option<Command<'_>> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    let (verb, rest) = match line.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim()),
        None => (line, ""),
    };

    let command = match verb {
        "show" | "ls" => Command::Show,
        "outline" => Command::Outline,
        "regen" => Command::Regenerate,
        "redraw" => Command::Redraw,
        "help" | "?" => Command::Help,
        "quit" | "exit" | "q" => Command::Quit,
        "find" if !rest.is_empty() => Command::Find(rest),
        "find" => Command::Invalid("usage: find <text>".to_string()),
        "edit" => match rest.split_once(char::is_whitespace) {
            Some((id, text)) => match id.trim_start_matches('#').parse::<usize>() {
                Ok(id) => Command::Edit(id, text.trim()),
                Err(_) => Command::Invalid(format!("not a node id: '{id}'")),
            },
            None => Command::Invalid("usage: edit <id> <text>".to_string()),
        },
        other => Command::Invalid(format!("unknown command '{other}' (try 'help')")),
    };
    Some(command)
}

async fn run_editor(session: &mut MindMapSession) -> Result<()> {
    session.set_edit_mode(true);
    eprintln!(
        "{} {}",
        cyan("◆"),
        bold("Edit mode: 'edit <id> <text>' to relabel a node, 'help' for more, 'quit' to finish")
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        eprint!("{} ", cyan("edit>"));
        io::stderr().flush().ok();

        let Some(line) = lines.next_line().await.context("Failed to read stdin")? else {
            break;
        };
        let Some(command) = parse_command(&line) else {
            continue;
        };

        // Failures are already reported through the observer's notices.
        match command {
            Command::Show => {
                if let Some(tree) = session.tree() {
                    eprint!("{}", render_ascii(tree));
                }
            }
            Command::Edit(id, text) => {
                if let Ok(outcome) = session.handle_node_click(NodeId::from_index(id), text) {
                    eprintln!(
                        "{} {}  {} → {}",
                        green("✓"),
                        outcome.node,
                        dim(&outcome.previous),
                        bold(&outcome.content)
                    );
                }
            }
            Command::Find(query) => {
                if let Some(tree) = session.tree() {
                    let hits = tree.find(query);
                    if hits.is_empty() {
                        eprintln!("{}", dim("no match"));
                    }
                    for id in hits {
                        let path = tree.path(id).unwrap_or_default().join(" › ");
                        eprintln!("  [{}] {}", id.index(), path);
                    }
                }
            }
            Command::Outline => eprint!("{}", session.outline()),
            Command::Regenerate => {
                let _ = session.generate().await;
            }
            Command::Redraw => {
                let _ = session.rerender();
            }
            Command::Help => eprint!("{}", EDIT_HELP),
            Command::Quit => break,
            Command::Invalid(message) => eprintln!("{} {}", yellow("?"), message),
        }
    }

    session.set_edit_mode(false);
    Ok(())
}

const EDIT_HELP: &str = "\
  show                 print the tree with node ids
  edit <id> <text>     replace the label of node <id>
  find <text>          list nodes whose label contains <text>
  outline              print the current outline
  regen                request a fresh outline for the same text
  redraw               render the current tree again
  quit                 leave the editor
";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_edit_with_spaces_in_label() {
        assert_eq!(
            parse_command("edit 3 New label here"),
            Some(Command::Edit(3, "New label here"))
        );
        assert_eq!(parse_command("edit #2 x"), Some(Command::Edit(2, "x")));
    }

    #[test]
    fn rejects_malformed_edit() {
        assert!(matches!(parse_command("edit 3"), Some(Command::Invalid(_))));
        assert!(matches!(parse_command("edit x y"), Some(Command::Invalid(_))));
    }

    #[test]
    fn blank_line_is_ignored() {
        assert_eq!(parse_command("   "), None);
        assert_eq!(parse_command("q"), Some(Command::Quit));
        assert_eq!(parse_command("find  deep  "), Some(Command::Find("deep")));
    }

    #[test]
    fn listed_commands_are_recognised() {
        assert!(after_long_help().contains(EDIT_HELP));
        for line in EDIT_HELP.lines() {
            let keyword = line.split_whitespace().next().unwrap();
            let sample = match keyword {
                "edit" => "edit 1 label".to_string(),
                "find" => "find label".to_string(),
                other => other.to_string(),
            };
            assert!(
                !matches!(parse_command(&sample), None | Some(Command::Invalid(_))),
                "{keyword} is listed but not parsed"
            );
        }
    }
}
