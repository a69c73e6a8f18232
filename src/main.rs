use std::path::PathBuf;

use clap::Parser;
use picweave::config::OptimizeOptions;
use picweave::optimize::ImageOptimizer;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "picweave")]
#[command(about = "Rewrite <img> elements into responsive <picture> markup")]
#[command(long_about = "\
Rewrite <img> elements into responsive <picture> markup

Reads an HTML file, derives responsive variants for every eligible image
through an image-transcoding endpoint, and writes the rewritten document.

Each rewritten image becomes:

  <picture style=\"... aspect-ratio ...\">
    <source media=\"(max-width: 639px)\" srcset=\"/_image?href=...\" type=\"image/avif\">
    ...one per enabled format and breakpoint...
    <img src=\"...\" loading=\"lazy\" width=\"...\" height=\"...\">
  </picture>

Leading images (the above-the-fold threshold, default 2) load eagerly with
fetchpriority=\"high\"; the rest lazy-load behind a blur-up placeholder.

Images already optimized, already inside a <picture>, or inlined as data:
URIs are left untouched, so the command is safe to run on its own output.

Options may be given as a TOML file (--config picweave.toml); see the
crate documentation for all keys. Flags override the file.")]
#[command(version)]
struct Cli {
    /// HTML file to optimize
    input: PathBuf,

    /// Output file (stdout when omitted)
    #[arg(long, short)]
    output: Option<PathBuf>,

    /// TOML options file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Image service endpoint that serves the variants
    #[arg(long, default_value = "/_image")]
    endpoint: String,

    /// Process images one at a time instead of fanning out
    #[arg(long)]
    sequential: bool,

    /// Skip blur-up placeholder generation
    #[arg(long)]
    no_placeholder: bool,

    /// Cap on generated variant width in pixels
    #[arg(long)]
    max_width: Option<u32>,

    /// Encoding quality (1-100)
    #[arg(long)]
    quality: Option<u32>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logs go to stderr; stdout may be the rewritten document.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut options = match &cli.config {
        Some(path) => OptimizeOptions::from_toml_file(path)?,
        None => OptimizeOptions::default(),
    };
    if cli.sequential {
        options.parallel = Some(false);
    }
    if cli.no_placeholder {
        options.add_placeholder = Some(false);
    }
    if let Some(max_width) = cli.max_width {
        options.max_width = Some(max_width);
    }
    if let Some(quality) = cli.quality {
        options.quality = Some(quality);
    }

    let html = std::fs::read_to_string(&cli.input)?;

    let optimizer = ImageOptimizer::with_endpoint(cli.endpoint.clone());
    let rewritten = optimizer.optimize(&html, &options)?;

    match &cli.output {
        Some(path) => std::fs::write(path, rewritten)?,
        None => print!("{rewritten}"),
    }

    Ok(())
}
