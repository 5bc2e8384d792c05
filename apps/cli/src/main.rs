use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use codevertex_settings::{
    AppConfig, ConfigStore, DraftAutoSave, FileStore, PersistentStore, StaticAppearance,
    ThemeController, ThemeState,
};
use codevertex_translate::{
    language_options, search_languages, supported_languages, Clipboard, ClipboardError,
    CopyOutcome, HttpEndpoint, Keymap, MemoryClipboard, OrchestratorParts, TranslateOutcome,
    TranslationOrchestrator,
};
use codevertex_ui::{
    EditorRegion, LineNumberSync, Selector, SelectorGroup, SystemClock, ToastQueue,
};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "codevertex-cli",
    about = "Translate source code between programming languages",
    author,
    version
)]
struct Cli {
    /// 設定檔路徑。 / Configuration file (defaults to the user config directory).
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    /// 鍵值儲存檔路徑。 / Key-value store holding theme and draft state.
    #[arg(long, global = true, value_name = "PATH")]
    store: Option<PathBuf>,
    /// 翻譯服務位址，覆寫設定檔。 / Translation service base URL, overriding the config file.
    #[arg(long, global = true, env = "CODEVERTEX_ENDPOINT", value_name = "URL")]
    endpoint: Option<String>,
    /// 作業系統外觀。 / OS colour scheme used when no theme was chosen.
    #[arg(
        long,
        global = true,
        env = "CODEVERTEX_COLOR_SCHEME",
        value_enum,
        default_value_t = ColorScheme::Light
    )]
    color_scheme: ColorScheme,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 列出支援的語言。 / List supported languages.
    Languages(LanguagesArgs),
    /// 翻譯程式碼。 / Translate code from a file or stdin.
    Translate(TranslateArgs),
    /// 檢視或變更主題。 / Show or change the colour theme.
    #[command(subcommand)]
    Theme(ThemeCommand),
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
enum ColorScheme {
    Light,
    Dark,
}

#[derive(Args)]
struct LanguagesArgs {
    /// 篩選字串；無結果時列出全部。 / Filter text; everything is listed when nothing matches.
    #[arg(long, short = 'q', value_name = "TEXT")]
    query: Option<String>,
    /// 向翻譯服務查詢清單。 / Ask the translation service instead of the built-in list.
    #[arg(long)]
    remote: bool,
}

#[derive(Args)]
struct TranslateArgs {
    /// 來源語言。 / Source language.
    #[arg(long, value_name = "LANGUAGE")]
    from: Option<String>,
    /// 目標語言。 / Target language.
    #[arg(long, value_name = "LANGUAGE")]
    to: Option<String>,
    /// 輸入檔案；省略或 `-` 時讀取 stdin。 / Input file; stdin when omitted or `-`.
    #[arg(value_name = "INPUT")]
    input: Option<PathBuf>,
    /// 將結果寫入檔案。 / Write the translation to a file instead of stdout.
    #[arg(long, value_name = "PATH")]
    output: Option<PathBuf>,
    /// 複製結果到剪貼簿。 / Copy the translation to the system clipboard.
    #[arg(long)]
    copy: bool,
}

#[derive(Subcommand)]
enum ThemeCommand {
    /// 顯示目前主題。 / Print the resolved theme.
    Show,
    /// 切換淺色／深色。 / Flip between light and dark.
    Toggle,
    /// 設定主題。 / Choose a theme explicitly.
    Set(ThemeSetArgs),
    /// 清除選擇，跟隨系統。 / Forget the choice and follow the OS.
    Clear,
}

#[derive(Args)]
struct ThemeSetArgs {
    /// `light` 或 `dark`。 / `light` or `dark`.
    #[arg(value_name = "MODE")]
    mode: String,
}

struct Session {
    config: AppConfig,
    store_path: PathBuf,
    prefers_dark: bool,
}

fn main() {
    init_tracing();
    if let Err(err) = run() {
        eprintln!("Error: {err:#}");
        std::process::exit(1);
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .try_init();
}

fn run() -> Result<()> {
    let Cli {
        config,
        store,
        endpoint,
        color_scheme,
        command,
    } = Cli::parse();

    let config_path = config.unwrap_or_else(|| default_path(dirs::config_dir(), "config.json"));
    let mut app_config = ConfigStore::load(&config_path)
        .with_context(|| format!("load config {}", config_path.display()))?
        .into_config();
    if let Some(url) = endpoint {
        app_config.endpoint.base_url = url;
        app_config.sanitize();
    }
    let session = Session {
        config: app_config,
        store_path: store.unwrap_or_else(|| default_path(dirs::data_dir(), "store.json")),
        prefers_dark: color_scheme == ColorScheme::Dark,
    };

    match command {
        Commands::Languages(args) => block_on(execute_languages(args, &session)),
        Commands::Translate(args) => block_on(execute_translate(args, &session)),
        Commands::Theme(subcommand) => execute_theme_command(subcommand, &session),
    }
}

fn default_path(base: Option<PathBuf>, file: &str) -> PathBuf {
    base.unwrap_or_else(|| PathBuf::from("."))
        .join("codevertex")
        .join(file)
}

fn block_on<F>(future: F) -> Result<()>
where
    F: std::future::Future<Output = Result<()>>,
{
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("start async runtime")?;
    runtime.block_on(future)
}

fn http_endpoint(session: &Session) -> Result<HttpEndpoint> {
    let endpoint = &session.config.endpoint;
    HttpEndpoint::new(endpoint.base_url.clone(), endpoint.timeout())
        .with_context(|| format!("configure endpoint {}", endpoint.base_url))
}

fn open_store(session: &Session) -> Result<Rc<FileStore>> {
    let store = FileStore::load(&session.store_path)
        .with_context(|| format!("open store {}", session.store_path.display()))?;
    Ok(Rc::new(store))
}

async fn execute_languages(args: LanguagesArgs, session: &Session) -> Result<()> {
    let languages: Vec<String> = if args.remote {
        let endpoint = http_endpoint(session)?;
        let fetched = match args.query.as_deref() {
            Some(query) => endpoint.search_languages(query).await,
            None => endpoint.fetch_languages().await,
        };
        fetched.context("fetch languages from the translation service")?
    } else {
        match args.query.as_deref() {
            Some(query) => search_languages(query)
                .into_iter()
                .map(str::to_string)
                .collect(),
            None => supported_languages(),
        }
    };
    for language in languages {
        println!("{language}");
    }
    Ok(())
}

/// 以 arboard 存取系統剪貼簿。 / System clipboard backed by arboard.
struct SystemClipboard;

impl Clipboard for SystemClipboard {
    fn write_text(&self, text: &str) -> Result<(), ClipboardError> {
        let mut clipboard = arboard::Clipboard::new()
            .map_err(|err| ClipboardError::Unavailable(err.to_string()))?;
        clipboard
            .set_text(text.to_string())
            .map_err(|err| ClipboardError::Write(err.to_string()))
    }
}

fn read_input(input: Option<&Path>) -> Result<String> {
    match input {
        Some(path) if path != Path::new("-") => fs::read_to_string(path)
            .with_context(|| format!("read input {}", path.display())),
        _ => {
            let mut code = String::new();
            io::stdin()
                .read_to_string(&mut code)
                .context("read code from stdin")?;
            Ok(code)
        }
    }
}

fn select_language(selector: &Selector, language: Option<&str>) -> Result<()> {
    if let Some(language) = language {
        selector.open();
        selector.filter(language);
        selector
            .select(language)
            .map_err(|err| anyhow!("{err}; run `codevertex-cli languages` for the list"))?;
    }
    Ok(())
}

async fn execute_translate(args: TranslateArgs, session: &Session) -> Result<()> {
    let code = read_input(args.input.as_deref())?;
    let store = open_store(session)?;
    let clock = Rc::new(SystemClock);

    let toasts =
        ToastQueue::with_default_duration(clock.clone(), session.config.ui.toast_duration());
    let _toast_printer = toasts.on_show(|entry| {
        eprintln!("[{}] {}", entry.severity, entry.message);
    });

    let group = SelectorGroup::new();
    let options = language_options(&supported_languages());
    let source_selector = Selector::new(&group, "source-select", options.clone());
    let target_selector = Selector::new(&group, "target-select", options);
    let source_pane = EditorRegion::new("");
    let output_pane = EditorRegion::new("");

    let clipboard: Rc<dyn Clipboard> = if args.copy {
        Rc::new(SystemClipboard)
    } else {
        Rc::new(MemoryClipboard::new())
    };
    let orchestrator = TranslationOrchestrator::new(OrchestratorParts {
        source_selector: source_selector.clone(),
        target_selector: target_selector.clone(),
        source_pane: source_pane.clone(),
        output_pane,
        line_numbers: LineNumberSync::new(session.config.ui.gutter_min_lines),
        toasts,
        endpoint: Rc::new(http_endpoint(session)?),
        clipboard,
        keymap: Keymap::default(),
    });

    let store_handle: Rc<dyn PersistentStore> = store;
    let autosave = DraftAutoSave::attach(
        &source_pane,
        store_handle,
        clock,
        &session.config.autosave,
    );

    select_language(&source_selector, args.from.as_deref())?;
    select_language(&target_selector, args.to.as_deref())?;
    source_pane.input(code);
    autosave.flush().context("save source draft")?;
    debug!(state = ?orchestrator, "form ready");

    match orchestrator.translate().await {
        TranslateOutcome::Translated => {}
        TranslateOutcome::Invalid(err) => bail!("{err}"),
        TranslateOutcome::Rejected(message) => bail!("translation rejected: {message}"),
        TranslateOutcome::Failed => bail!(
            "could not reach the translation service at {}",
            session.config.endpoint.base_url
        ),
        TranslateOutcome::Busy => bail!("a translation is already running"),
    }

    let translated = orchestrator.output_pane().text();
    match args.output {
        Some(path) => fs::write(&path, translated.as_bytes())
            .with_context(|| format!("write output {}", path.display()))?,
        None => println!("{translated}"),
    }

    if args.copy && orchestrator.copy_result() != CopyOutcome::Copied {
        bail!("failed to copy the translation to the clipboard");
    }
    Ok(())
}

fn describe(state: ThemeState) -> String {
    format!(
        "{} ({}) {}",
        state.mode,
        state.origin.as_str(),
        state.mode.meta_color()
    )
}

fn execute_theme_command(command: ThemeCommand, session: &Session) -> Result<()> {
    let store = open_store(session)?;
    let appearance = Rc::new(StaticAppearance::new(session.prefers_dark));
    let controller = ThemeController::new(store, appearance, Rc::new(SystemClock));

    let state = match command {
        ThemeCommand::Show => controller.state(),
        ThemeCommand::Toggle => controller.toggle_theme().context("toggle theme")?,
        ThemeCommand::Set(args) => controller
            .set_theme(&args.mode)
            .with_context(|| format!("set theme to `{}`", args.mode))?,
        ThemeCommand::Clear => controller.clear_preference().context("clear theme")?,
    };
    println!("{}", describe(state));
    Ok(())
}
