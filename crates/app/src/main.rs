use std::fs;
use std::sync::mpsc;

use anyhow::Context as _;
use application::{
    AppContext, CatalogSource as _, FetchOutcome, FetchSpec, PanelSet, PassageSource as _,
    RouteChange, Session,
};
use directories::ProjectDirs;
use lectio_core::{BookCatalog, DEFAULT_TRANSLATION, Panel, PanelId, TRANSLATIONS, nav};
use lectio_storage::migrate::{PrimaryContext, run_startup_migrations};
use lectio_storage::Store;
use remote::Client;
use ui::Ui;

const DEFAULT_API_URL: &str = "http://localhost:3000/api/v1";

fn main() {
    env_logger::init();
    if let Err(err) = run() {
        eprintln!("{err:?}");
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let args = parse_args(std::env::args().skip(1))?;

    let project_dirs =
        ProjectDirs::from("dev", "lectio", "lectio").context("resolve project dirs")?;
    let config_dir = project_dirs.config_dir();
    fs::create_dir_all(config_dir)
        .with_context(|| format!("create config dir {}", config_dir.display()))?;
    let store = Store::open(config_dir.join("lectio.db"))?;

    let base_url =
        std::env::var("LECTIO_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());
    let user = std::env::var("LECTIO_USER").ok().filter(|u| !u.trim().is_empty());
    let client = Client::new(&base_url, user.clone())?;

    let catalog = BookCatalog::new(
        client
            .fetch_books()
            .with_context(|| format!("fetch book catalog from {base_url}"))?,
    );
    if catalog.is_empty() {
        anyhow::bail!("the server at {base_url} returned an empty book catalog");
    }

    let route = resolve_route(&catalog, &args);
    run_startup_migrations(
        &store,
        &PrimaryContext {
            book_abbr: route.book_abbr.clone(),
            book_name: route.book_name.clone(),
            chapter: route.chapter,
        },
    )?;

    let prefs = store.load_preferences()?;
    let chapter_bookmarks = store.load_chapter_bookmarks()?;
    let snapshots = store.load_panel_snapshots()?;

    let mut panels = PanelSet::new(Panel {
        id: PanelId::Panel1,
        translation: route.translation.clone(),
        book_abbr: route.book_abbr.clone(),
        book_name: route.book_name.clone(),
        chapter: route.chapter,
        verses: Vec::new(),
        loading: true,
        error: None,
    });
    let primary_spec = panels.apply_route(&route);
    let restore_specs = panels.restore_snapshots(&snapshots);

    let session = match user {
        Some(user) => Session::signed_in(user),
        None => Session::default(),
    };
    let mut ctx = AppContext::new(catalog, panels)
        .with_session(session)
        .with_prefs(prefs)
        .with_chapter_bookmarks(chapter_bookmarks);

    if ctx.session.is_authenticated() {
        if let Err(err) = ctx.annotations.load_session(&client) {
            log::warn!("could not load annotations: {}", err.user_message());
        }
    }

    let (fetch_tx, outcome_rx) = spawn_fetch_worker(client.clone());
    fetch_tx.send(primary_spec).context("queue initial passage fetch")?;
    for spec in restore_specs {
        fetch_tx.send(spec).context("queue restored panel fetch")?;
    }

    let mut ui = Ui::new(ctx, store, Box::new(client), fetch_tx, outcome_rx);
    ui.run()?;
    Ok(())
}

/// One resolver thread per in-flight request, so slow chapters never
/// queue behind each other. Staleness is handled at the apply site, not
/// here.
fn spawn_fetch_worker(client: Client) -> (mpsc::Sender<FetchSpec>, mpsc::Receiver<FetchOutcome>) {
    let (spec_tx, spec_rx) = mpsc::channel::<FetchSpec>();
    let (out_tx, out_rx) = mpsc::channel::<FetchOutcome>();

    std::thread::spawn(move || {
        while let Ok(spec) = spec_rx.recv() {
            let client = client.clone();
            let out_tx = out_tx.clone();
            std::thread::spawn(move || {
                let result =
                    client.fetch_passage(&spec.translation, &spec.book_abbr, spec.chapter);
                // The UI side may have quit; a dead channel is fine.
                let _ = out_tx.send(FetchOutcome {
                    panel: spec.panel,
                    generation: spec.generation,
                    result,
                });
            });
        }
    });

    (spec_tx, out_rx)
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
struct Args {
    book: Option<String>,
    chapter: Option<u32>,
    translation: Option<String>,
}

fn parse_args(args: impl Iterator<Item = String>) -> anyhow::Result<Args> {
    let mut parsed = Args::default();
    for arg in args {
        if let Some(code) = arg.strip_prefix("--translation=") {
            let code = code.trim();
            if !TRANSLATIONS.iter().any(|t| t.code == code && t.available) {
                anyhow::bail!("unknown or unavailable translation {code:?}");
            }
            parsed.translation = Some(code.to_string());
        } else if arg == "--help" || arg == "-h" {
            anyhow::bail!("usage: lectio [BOOK] [CHAPTER] [--translation=CODE]");
        } else if parsed.book.is_none() {
            parsed.book = Some(arg);
        } else if parsed.chapter.is_none() {
            parsed.chapter =
                Some(arg.parse().with_context(|| format!("invalid chapter {arg:?}"))?);
        } else {
            anyhow::bail!("unexpected argument {arg:?}");
        }
    }
    Ok(parsed)
}

/// Picks the starting position: requested book/chapter when they exist
/// in the catalog, Genesis 1 otherwise.
fn resolve_route(catalog: &BookCatalog, args: &Args) -> RouteChange {
    let book = args
        .book
        .as_deref()
        .and_then(|requested| {
            catalog
                .by_abbr(requested)
                .or_else(|| catalog.by_name(requested))
        })
        .or_else(|| catalog.books.first())
        .cloned();

    let (book_abbr, book_name) = match book {
        Some(entry) => (entry.abbr, entry.name),
        None => ("Gen".to_string(), "Genesis".to_string()),
    };

    let chapter = args
        .chapter
        .filter(|c| nav::chapter_in_range(catalog, &book_abbr, *c))
        .unwrap_or(1);

    RouteChange {
        translation: args
            .translation
            .clone()
            .unwrap_or_else(|| DEFAULT_TRANSLATION.to_string()),
        book_abbr,
        book_name,
        chapter,
    }
}
