use std::error::Error;
use std::io::{self, Read};
use std::path::PathBuf;

use atty::Stream;
use clap::{Parser, Subcommand};
use once_cell::sync::Lazy;
use plainword::{
    Annotated, AnySource, AppConfig, Cutoff, GlossarySources, Selection, VocabularyState,
    VocabularyStore, classify, highlight, normalize,
};
use serde_json::json;
use termimad::CompoundStyle;
use termimad::crossterm::style::{Attribute, Color};
use tracing::warn;

static FLAGGED_STYLE: Lazy<CompoundStyle> = Lazy::new(|| {
    let mut style = CompoundStyle::with_fg(Color::Red);
    style.add_attr(Attribute::Underlined);
    style
});

#[derive(Parser, Debug)]
#[command(
    name = "plainword",
    about = "Flag words outside a common-words list and a ranked glossary",
    version
)]
pub struct Cli {
    /// Emit JSON instead of human-readable output.
    #[arg(long, global = true)]
    json: bool,

    /// Directory or http(s) base URL holding the word lists.
    #[arg(long, global = true, env = "PLAINWORD_SOURCE")]
    source: Option<String>,

    /// JSON config file; flags override its values.
    #[arg(long, global = true, env = "PLAINWORD_CONFIG")]
    config: Option<PathBuf>,

    /// Identifier of the base word list.
    #[arg(long, global = true)]
    base: Option<String>,

    /// Identifier of the index document listing glossaries.
    #[arg(long, global = true, conflicts_with = "glossary_source")]
    index: Option<String>,

    /// Load this single glossary instead of reading an index.
    #[arg(long = "glossary-source", global = true)]
    glossary_source: Option<String>,

    /// Log debug output to stderr.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Annotate text, marking words outside the vocabulary.
    Highlight {
        /// Text to annotate. Reads stdin when omitted.
        text: Vec<String>,
        /// Glossary to allow in addition to the base list.
        #[arg(short, long)]
        glossary: Option<String>,
        /// Number of leading glossary rows to allow (1-248).
        #[arg(short, long, default_value_t = Cutoff::default())]
        cutoff: Cutoff,
        /// Print HTML with flagged words underlined in red.
        #[arg(long)]
        html: bool,
    },
    /// Show the lookup key and verdict for individual words.
    Check {
        /// Words to check.
        #[arg(required = true)]
        words: Vec<String>,
        #[arg(short, long)]
        glossary: Option<String>,
        #[arg(short, long, default_value_t = Cutoff::default())]
        cutoff: Cutoff,
    },
    /// List the glossaries that loaded and the ones that were skipped.
    Glossaries,
    /// Run the editor web service.
    #[cfg(feature = "web")]
    Serve {
        /// Address to bind, e.g. 127.0.0.1:8080.
        #[arg(long, env = "PLAINWORD_ADDR")]
        addr: Option<std::net::SocketAddr>,
    },
}

pub fn run() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    plainword::logging::init(cli.verbose);
    let config = resolve_config(&cli)?;
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(dispatch(cli, config))
}

fn resolve_config(cli: &Cli) -> Result<AppConfig, Box<dyn Error>> {
    let mut config = match &cli.config {
        Some(path) => AppConfig::from_file(path)?,
        None => AppConfig::default(),
    };
    if let Some(source) = &cli.source {
        config.source = source.clone();
    }
    if let Some(base) = &cli.base {
        config.loader.base = base.clone();
    }
    if let Some(document) = &cli.index {
        config.loader.glossaries = GlossarySources::Index {
            document: document.clone(),
        };
    }
    if let Some(document) = &cli.glossary_source {
        config.loader.glossaries = GlossarySources::Single {
            document: document.clone(),
        };
    }
    Ok(config)
}

async fn dispatch(cli: Cli, config: AppConfig) -> Result<(), Box<dyn Error>> {
    let source = AnySource::from_location(&config.source)?;
    let store = VocabularyStore::new(source, config.loader.clone());
    match cli.command {
        Command::Highlight {
            text,
            glossary,
            cutoff,
            html,
        } => {
            let state = store.ensure_loaded().await?;
            let text = if text.is_empty() {
                read_stdin()?
            } else {
                text.join(" ")
            };
            handle_highlight(&state, &text, glossary, cutoff, html, cli.json)
        }
        Command::Check {
            words,
            glossary,
            cutoff,
        } => {
            let state = store.ensure_loaded().await?;
            handle_check(&state, words, glossary, cutoff, cli.json)
        }
        Command::Glossaries => {
            store.ensure_loaded().await?;
            handle_glossaries(&store, cli.json)
        }
        #[cfg(feature = "web")]
        Command::Serve { addr } => {
            let mut serve_config = config.serve;
            if let Some(addr) = addr {
                serve_config.addr = addr;
            }
            plainword::web::serve(serve_config, store).await?;
            Ok(())
        }
    }
}

fn read_stdin() -> Result<String, Box<dyn Error>> {
    let mut buffer = String::new();
    io::stdin().read_to_string(&mut buffer)?;
    Ok(buffer)
}

fn selection_for(state: &VocabularyState, glossary: Option<String>, cutoff: Cutoff) -> Selection {
    let selection = Selection::new(glossary, cutoff);
    if let Some(id) = selection.glossary.as_deref() {
        if !state.catalog.contains(id) {
            warn!(glossary = %id, "glossary is not loaded; checking against the base list only");
        }
    }
    selection
}

fn handle_highlight(
    state: &VocabularyState,
    text: &str,
    glossary: Option<String>,
    cutoff: Cutoff,
    html: bool,
    as_json: bool,
) -> Result<(), Box<dyn Error>> {
    let selection = selection_for(state, glossary, cutoff);
    let subset = state.subset(&selection);
    let annotated = highlight(text, &subset, &state.base);

    if as_json {
        let payload = json!({
            "glossary": selection.glossary,
            "cutoff": selection.cutoff,
            "rows_in_effect": subset.len(),
            "word_count": annotated.word_count(),
            "flagged_count": annotated.flagged_count(),
            "flagged": annotated.flagged_keys(),
            "text": annotated.render_marked("[", "]"),
            "html": annotated.render_html(),
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }

    if html {
        println!("{}", annotated.render_html());
    } else if stdout_is_tty() {
        println!("{}", render_styled(&annotated));
    } else {
        println!("{}", annotated.render_marked("[", "]"));
    }
    println!("Word count: {}", annotated.word_count());
    Ok(())
}

fn handle_check(
    state: &VocabularyState,
    words: Vec<String>,
    glossary: Option<String>,
    cutoff: Cutoff,
    as_json: bool,
) -> Result<(), Box<dyn Error>> {
    let selection = selection_for(state, glossary, cutoff);
    let subset = state.subset(&selection);
    let rows: Vec<(String, String, &'static str)> = words
        .into_iter()
        .map(|word| {
            let key = normalize(&word);
            let verdict = if classify(&word, &subset, &state.base).is_flagged() {
                "flagged"
            } else {
                "allowed"
            };
            (word, key, verdict)
        })
        .collect();

    if as_json {
        let payload: Vec<_> = rows
            .iter()
            .map(|(word, key, verdict)| json!({ "word": word, "key": key, "verdict": verdict }))
            .collect();
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else {
        print_check_table(&rows);
    }
    Ok(())
}

fn handle_glossaries(
    store: &VocabularyStore<AnySource>,
    as_json: bool,
) -> Result<(), Box<dyn Error>> {
    let state = store
        .snapshot()
        .ok_or("vocabulary did not finish loading")?;
    let warnings = store
        .last_report()
        .map(|report| report.warnings.clone())
        .unwrap_or_default();

    if as_json {
        let payload = json!({
            "base_words": state.base.len(),
            "glossaries": state.catalog.iter().map(|(id, glossary)| {
                json!({ "id": id, "rows": glossary.len() })
            }).collect::<Vec<_>>(),
            "warnings": warnings,
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }

    println!("Base list: {} words", state.base.len());
    if state.catalog.is_empty() {
        println!("No glossaries loaded.");
    } else {
        let width = state
            .catalog
            .ids()
            .map(str::len)
            .max()
            .unwrap_or(2)
            .max("GLOSSARY".len());
        println!("{:<width$}  {}", "GLOSSARY", "ROWS", width = width);
        println!("{:-<width$}  {}", "", "----", width = width);
        for (id, glossary) in state.catalog.iter() {
            println!("{:<width$}  {}", id, glossary.len(), width = width);
        }
    }
    for warning in &warnings {
        println!("skipped {}: {}", warning.source, warning.reason);
    }
    Ok(())
}

fn print_check_table(rows: &[(String, String, &'static str)]) {
    let word_width = rows
        .iter()
        .map(|(word, _, _)| word.len())
        .max()
        .unwrap_or(4)
        .max("WORD".len());
    let key_width = rows
        .iter()
        .map(|(_, key, _)| key.len())
        .max()
        .unwrap_or(3)
        .max("KEY".len());
    println!(
        "{:<word_width$}  {:<key_width$}  {}",
        "WORD", "KEY", "VERDICT"
    );
    println!("{:-<word_width$}  {:-<key_width$}  {}", "", "", "-------");
    for (word, key, verdict) in rows {
        println!("{:<word_width$}  {:<key_width$}  {}", word, key, verdict);
    }
}

fn render_styled(annotated: &Annotated) -> String {
    annotated
        .tokens
        .iter()
        .map(|token| {
            if token.verdict.is_flagged() {
                FLAGGED_STYLE.apply_to(token.text.as_str()).to_string()
            } else {
                token.text.clone()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn stdout_is_tty() -> bool {
    atty::is(Stream::Stdout)
}
