//! render-csl - render CSL-JSON items with a CSL style

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, ValueEnum};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use citeproc::{Processor, RenderMode, Rendered};

#[derive(Parser, Debug)]
#[command(name = "render-csl")]
#[command(about = "Render a citation or bibliography from CSL-JSON items")]
struct Args {
    /// CSL style file
    #[arg(short, long)]
    style: PathBuf,

    /// CSL-JSON items (an array, or an object of items)
    #[arg(short, long)]
    items: PathBuf,

    #[arg(short, long, value_enum, default_value = "bibliography")]
    mode: Mode,

    /// Citation items: an array of {id, locator?, label?}, or an array of
    /// such arrays
    #[arg(short, long)]
    cite: Option<PathBuf>,

    /// Locale, e.g. en-GB (defaults to the style's default-locale)
    #[arg(short, long)]
    locale: Option<String>,

    /// Print grouped citations as a JSON array
    #[arg(long)]
    as_array: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Mode {
    Citation,
    Bibliography,
}

impl From<Mode> for RenderMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Citation => RenderMode::Citation,
            Mode::Bibliography => RenderMode::Bibliography,
        }
    }
}

fn read_json(path: &Path) -> anyhow::Result<serde_json::Value> {
    let content =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("parsing {}", path.display()))
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    let style = fs::read_to_string(&args.style)
        .with_context(|| format!("reading {}", args.style.display()))?;
    let mut processor = match &args.locale {
        Some(lang) => Processor::with_locale(&style, lang),
        None => Processor::new(&style),
    }
    .with_context(|| format!("loading style {}", args.style.display()))?;

    let items = read_json(&args.items)?;
    let cites = args.cite.as_deref().map(read_json).transpose()?;

    info!(style = %args.style.display(), mode = ?args.mode, "rendering");
    let rendered = processor
        .render(&items, args.mode.into(), cites.as_ref(), args.as_array)
        .context("rendering")?;

    match rendered {
        Rendered::Text(text) => println!("{}", text),
        groups @ Rendered::Groups(_) => println!("{}", serde_json::to_string_pretty(&groups)?),
    }

    Ok(())
}
