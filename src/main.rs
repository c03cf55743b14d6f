//! json-handle CLI: runs one observer and one renderer over a file and prints the view.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use parking_lot::Mutex;
use tracing::debug;
use tracing_subscriber::{fmt, EnvFilter};

use json_handle_lib::config::{load_settings, FileStore};
use json_handle_lib::observer::{Delivery, Header, ResponseInfo};
use json_handle_lib::{
    serve_renderer, Error, HtmlSink, Observer, ObserverConfig, PageContent, RenderSink, Renderer,
    Request, Result, Settings, Status, TabMessenger, TabRegistry, TextSink,
};

const TAB: i64 = 1;

#[derive(Parser, Debug)]
#[command(name = "json-handle", version, about = "Render a JSON document as a collapsible tree")]
struct Cli {
    /// File holding the response body
    file: PathBuf,

    /// URL the body was served from
    #[arg(long)]
    url: Option<String>,

    /// Content-Type header of the response
    #[arg(long, default_value = "application/json")]
    content_type: String,

    /// Collapse containers with more entries than this
    #[arg(long)]
    collapse_threshold: Option<usize>,

    /// Search the rendered rows and list the matches
    #[arg(long)]
    search: Option<String>,

    /// Print escaped HTML instead of indented text
    #[arg(long)]
    html: bool,
}

fn init_logging() {
    let filter = EnvFilter::try_from_env("JSON_HANDLE_LOG").unwrap_or_else(|_| EnvFilter::new("off"));

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    init_logging();
    let cli = Cli::parse();

    let result = if cli.html {
        let sink = Arc::new(Mutex::new(HtmlSink::new()));
        run(&cli, sink.clone(), move || sink.lock().html().to_string()).await
    } else {
        let sink = Arc::new(Mutex::new(TextSink::new()));
        run(&cli, sink.clone(), move || sink.lock().output().to_string()).await
    };

    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => {
            eprintln!("json-handle: no JSON found in {}", cli.file.display());
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("json-handle: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Returns whether a document was rendered.
async fn run<S>(cli: &Cli, sink: S, rendered: impl Fn() -> String) -> Result<bool>
where
    S: RenderSink + 'static,
{
    let body = std::fs::read_to_string(&cli.file).map_err(|source| Error::Io {
        path: cli.file.clone(),
        source,
    })?;
    let url = cli
        .url
        .clone()
        .unwrap_or_else(|| format!("file://{}", cli.file.display()));

    let mut settings = FileStore::in_config_dir()
        .map(|store| load_settings(&store))
        .unwrap_or_else(Settings::default);
    if let Some(n) = cli.collapse_threshold {
        settings.collapse_threshold = n;
    }

    let renderer = Renderer::new(PageContent::raw(url.clone(), body), sink).with_settings(settings);
    let renderer = Arc::new(Mutex::new(renderer));

    let config = ObserverConfig { dispatch_delay: Duration::ZERO, ..ObserverConfig::default() };
    let registry = Arc::new(TabRegistry::new(config.delivery_timeout));
    let inbox = registry.connect(TAB);
    tokio::spawn(serve_renderer(renderer.clone(), inbox));

    let observer = Observer::new(registry.clone(), config);
    let response = ResponseInfo {
        url: url.clone(),
        response_headers: vec![Header::new("Content-Type", cli.content_type.clone())],
        tab_id: TAB,
    };
    let status = match observer.on_response(&response) {
        Some(handle) => match handle.await {
            Ok(Delivery::Delivered(resp)) => resp.as_status(),
            Ok(Delivery::Failed(e)) => return Err(e.into()),
            Err(_) => None,
        },
        None => {
            debug!(url = %url, "heuristic declined, checking anyway");
            let request = Request::CheckForJson { url: Some(url.clone()), content_type: None, force: true };
            registry.send(TAB, request).await?.as_status()
        }
    };
    registry.disconnect(TAB);
    if status != Some(Status::Processed) {
        return Ok(false);
    }

    let mut renderer = renderer.lock();
    let matches: Vec<String> = match &cli.search {
        Some(query) => {
            renderer.search_now(query);
            renderer
                .search()
                .matches()
                .iter()
                .filter_map(|id| renderer.view().row(*id))
                .map(|row| format!("{}  {}", row.display_path, row.text))
                .collect()
        }
        None => Vec::new(),
    };

    print!("{}", rendered());
    if cli.search.is_some() {
        println!();
        println!("{}", renderer.search().count_label());
        for line in &matches {
            println!("  {line}");
        }
    }
    if let Some(stats) = renderer.stats() {
        println!();
        println!("{} · {}", stats.size, stats.complexity);
    }
    Ok(true)
}
