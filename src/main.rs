use clap::{Parser, Subcommand};
use folio::config::{self, Config};
use folio::output;
use folio::render::MAX_RENDER_DEPTH;
use folio::site::{self, BuildError};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "folio")]
#[command(about = "Static site compiler for books")]
#[command(long_about = "\
Static site compiler for books

A book is an ordered list of pages named in folio.toml. Each page is a
Markdown file with optional YAML front matter; its body is a Tera template
that can pull in code samples, exercises and shared fragments.

Source layout:

  folio.toml                  # Page order, asset globs, include paths
  links.yml                   # Optional: [{slug, url}] reference links
  src/
  ├── inc/head.html           # Included before every page body
  ├── inc/foot.html           # Included after every page body
  ├── intro/
  │   ├── index.md            # Chapter source (default <slug>/index.md)
  │   ├── hello.py            # Code sample: read_file(path=page.source, sub=\"hello.py\")
  │   └── first/
  │       ├── problem.md      # exercise(chapter=page, exercise=ex, which=\"problem\")
  │       └── solution.md
  └── static/site.css         # Copied when matched by a `copy` glob

Output: <output>/<slug>/index.html per page, plus <output>/numbering.js.

Run 'folio gen-config' to generate a documented folio.toml.")]
#[command(version)]
struct Cli {
    /// Config file
    #[arg(long, default_value = config::DEFAULT_CONFIG_FILE, global = true)]
    config: PathBuf,

    /// Override the source root from the config file
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    /// Override the output directory from the config file
    #[arg(long, global = true)]
    output: Option<PathBuf>,

    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only print errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compile the book into the output directory
    Build,
    /// Validate config, page list and page sources without writing anything
    Check,
    /// Print a stock folio.toml with all options documented
    GenConfig,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            output::print_error(&err);
            if let BuildError::Render(render) = &err {
                if render.is_recursion_limit() {
                    eprintln!("hint: includes nest at most {MAX_RENDER_DEPTH} levels deep");
                }
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<(), BuildError> {
    match cli.command {
        Command::Build => {
            let mut config = load(cli)?;
            init_thread_pool(&config.processing);
            if !cli.quiet {
                println!("==> Building {}", config.root.display());
            }
            let summary = site::build(&mut config)?;
            if !cli.quiet {
                output::print_build_output(&summary, &config.root);
            }
        }
        Command::Check => {
            let mut config = load(cli)?;
            if !cli.quiet {
                println!("==> Checking {}", config.root.display());
            }
            let summary = site::check(&mut config)?;
            if !cli.quiet {
                output::print_check_output(&summary, &config.root);
            }
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }
    Ok(())
}

/// Load the config file and apply command-line path overrides.
///
/// The overridden paths are validated by `site::build`/`site::check`.
fn load(cli: &Cli) -> Result<Config, BuildError> {
    let mut config = config::load_config(&cli.config)?;
    if let Some(root) = &cli.root {
        config.root = root.clone();
    }
    if let Some(output) = &cli.output {
        config.output = output.clone();
    }
    Ok(config)
}

/// `RUST_LOG` wins when set; otherwise the level follows `-v`/`-q`.
fn init_logging(verbose: u8, quiet: bool) {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        let level = match (quiet, verbose) {
            (true, _) => "error",
            (false, 0) => "warn",
            (false, 1) => "info",
            (false, 2) => "debug",
            (false, _) => "trace",
        };
        EnvFilter::new(format!("folio={level}"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Initialize the rayon thread pool based on processing config.
///
/// Capped at the number of available CPU cores.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
