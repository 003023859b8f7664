use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use ebook_assemble::{AssembleRequest, AssembleStatus, Assembler, OUTLINE_FILE};
use ebook_config::{Config, LoadOptions};
use tracing::debug;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

const USAGE: &str = "make_mobi usage:
1. prepare html files and a toc.md file in a source dir
2. make_mobi <source_dir> <output_dir>";

/// Entry point for CLI execution. Returns the desired exit code.
pub fn run() -> Result<i32> {
    let cli = Cli::parse();
    init_tracing();

    let (Some(source_dir), Some(output_dir)) = (cli.source_dir, cli.output_dir) else {
        println!("{USAGE}");
        return Ok(0);
    };

    let mut load = LoadOptions::default();
    if let Some(path) = cli.config {
        load = load.with_override_path(path);
    }
    let config = Config::load(load).context("loading configuration")?;
    debug!(layers = config.sources.layers.len(), "configuration loaded");

    let assembler = Assembler::from_config(config)?;

    let mut request = AssembleRequest::new(&source_dir)
        .with_output_dir(output_dir)
        .with_package(cli.mobi)
        .with_link(!cli.no_link);
    if let Some(author) = cli.author {
        request = request.with_author(author);
    }

    let outcome = assembler.assemble(&request)?;

    match outcome.status {
        AssembleStatus::EmptyOutline => {
            println!(
                "nothing to do: {} has no title",
                source_dir.join(OUTLINE_FILE).display()
            );
        }
        AssembleStatus::Built => {
            if !cli.quiet {
                println!("success");
            }
        }
    }

    Ok(0)
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}

#[derive(Parser, Debug)]
#[command(
    name = "make_mobi",
    version,
    about = "Build an e-book from HTML chapters and a toc.md outline"
)]
struct Cli {
    /// Directory holding toc.md and the chapter HTML files
    #[arg(value_name = "SOURCE_DIR")]
    source_dir: Option<PathBuf>,

    /// Directory that receives the package and the entry link
    #[arg(value_name = "OUTPUT_DIR")]
    output_dir: Option<PathBuf>,

    /// Run the configured compiler to produce a packaged e-book
    #[arg(long)]
    mobi: bool,

    /// Do not link <title>.html in the output directory
    #[arg(long = "no-link")]
    no_link: bool,

    /// Use this configuration file as the highest-precedence layer
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Override the configured book author
    #[arg(long, value_name = "NAME")]
    author: Option<String>,

    /// Suppress the success message
    #[arg(short, long)]
    quiet: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn positionals_are_optional() {
        let cli = Cli::try_parse_from(["make_mobi", "src"]).expect("parse");
        assert_eq!(cli.source_dir, Some(PathBuf::from("src")));
        assert_eq!(cli.output_dir, None);
        assert!(!cli.mobi);
        assert!(!cli.no_link);
    }

    #[test]
    fn flags_parse_alongside_positionals() {
        let cli = Cli::try_parse_from([
            "make_mobi", "--mobi", "--no-link", "-q", "--author", "Ferris", "in", "out",
        ])
        .expect("parse");
        assert!(cli.mobi);
        assert!(cli.no_link);
        assert!(cli.quiet);
        assert_eq!(cli.author.as_deref(), Some("Ferris"));
        assert_eq!(cli.output_dir, Some(PathBuf::from("out")));
    }
}
