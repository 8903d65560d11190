//! pptree CLI: runs the adder-tree rewrite over a JSON design, drives the
//! tree generator on its own, and builds or runs logic-synthesis backend
//! scripts.

#![warn(missing_docs)]

mod generate;
mod lso;
mod opt;

use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use log::LevelFilter;
use pptree_config::{load_config, load_config_or_default, PptreeConfig};
use pptree_diagnostics::{DiagnosticRenderer, DiagnosticSink, JsonRenderer, TerminalRenderer};

/// pptree: attribute-preserving adder-tree rewriting.
#[derive(Parser, Debug)]
#[command(name = "pptree", version, about = "Prefix-tree adder rewriting")]
pub struct Cli {
    /// Suppress all output except errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Enable verbose (debug-level) output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to a `pptree.toml` configuration file.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// The subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Rewrite marked adders in a JSON design.
    Opt(OptArgs),
    /// Run the tree generator once.
    Generate(GenerateArgs),
    /// Build or run a logic-synthesis backend script.
    Lso(LsoArgs),
}

/// Arguments for `pptree opt`.
#[derive(Parser, Debug)]
pub struct OptArgs {
    /// Design to rewrite, as JSON.
    #[arg(long)]
    pub design: PathBuf,

    /// Where to write the rewritten design.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Report format.
    #[arg(short, long, value_enum, default_value_t = ReportFormat::Text)]
    pub format: ReportFormat,

    /// Pass arguments: `-width N -start S -transforms T -mapping M [module...]`.
    #[arg(last = true, allow_hyphen_values = true)]
    pub pass_args: Vec<String>,
}

/// Arguments for `pptree generate`.
#[derive(Parser, Debug)]
pub struct GenerateArgs {
    /// Adder width.
    #[arg(long)]
    pub width: Option<u32>,

    /// Starting topology.
    #[arg(long)]
    pub start: Option<String>,

    /// Encoded transform sequence, such as `_LF@6_LF@4`.
    #[arg(long, allow_hyphen_values = true)]
    pub transforms: Option<String>,

    /// Mapping strategy.
    #[arg(long)]
    pub mapping: Option<String>,

    /// Generate the mapping library instead of a tree.
    #[arg(long)]
    pub maps: bool,

    /// Keep the working directory and print its artifact paths.
    #[arg(long)]
    pub keep: bool,
}

/// Arguments for `pptree lso`.
#[derive(Parser, Debug)]
pub struct LsoArgs {
    /// Input netlist read by the backend.
    #[arg(long)]
    pub input: PathBuf,

    /// Output netlist written by the backend.
    #[arg(long)]
    pub output: PathBuf,

    /// Partition the design before optimizing.
    #[arg(long)]
    pub partitioned: bool,

    /// Optimize each partition exclusively into one representation.
    #[arg(long)]
    pub exclusive: bool,

    /// Use a majority-inverter graph.
    #[arg(long)]
    pub mig: bool,

    /// Use an and-inverter graph.
    #[arg(long)]
    pub aig: bool,

    /// Deep (model-driven) effort.
    #[arg(long)]
    pub deep: bool,

    /// Merge partitions after optimization.
    #[arg(long)]
    pub merge: bool,

    /// Read and emit only.
    #[arg(long)]
    pub test: bool,

    /// Emit LUTs instead of BLIF.
    #[arg(long)]
    pub lut: bool,

    /// Optimization script body to wrap instead of the generated one.
    #[arg(long)]
    pub script: Option<PathBuf>,

    /// Backend executable, overriding `backend.executable`.
    #[arg(long)]
    pub executable: Option<String>,

    /// Partition count, overriding `backend.partitions`.
    #[arg(long)]
    pub partitions: Option<u32>,

    /// JSON file naming primary inputs and outputs by index, used to
    /// annotate start and end points in the backend's timing output.
    #[arg(long, value_name = "FILE")]
    pub io_names: Option<PathBuf>,

    /// Print the script without running the backend.
    #[arg(long)]
    pub dry_run: bool,
}

/// Report format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    /// Human-readable terminal output.
    Text,
    /// Machine-readable JSON output.
    Json,
}

/// Global settings derived from CLI flags.
pub struct GlobalArgs {
    /// Whether to suppress non-error output.
    pub quiet: bool,
    /// Whether to print debug information.
    pub verbose: bool,
    /// Whether stderr is a terminal.
    pub color: bool,
    /// Optional path to a config file.
    pub config: Option<PathBuf>,
}

impl GlobalArgs {
    /// Loads the configuration named by `--config`, or `pptree.toml` in the
    /// current directory, or the defaults.
    pub fn load_config(&self) -> Result<PptreeConfig, pptree_config::ConfigError> {
        match &self.config {
            Some(path) => load_config(path),
            None => load_config_or_default(Path::new(".")),
        }
    }

    /// Renders every diagnostic in `sink`, text to stderr or JSON lines to stdout.
    pub fn render(&self, sink: &DiagnosticSink, format: ReportFormat) {
        let diagnostics = sink.diagnostics();
        match format {
            ReportFormat::Text => {
                let renderer = TerminalRenderer::new(self.color);
                for diag in &diagnostics {
                    eprint!("{}", renderer.render(diag));
                }
            }
            ReportFormat::Json => {
                for diag in &diagnostics {
                    print!("{}", JsonRenderer.render(diag));
                }
            }
        }
    }
}

fn log_level(quiet: bool, verbose: bool) -> LevelFilter {
    if quiet {
        LevelFilter::Error
    } else if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    }
}

fn init_logging(global: &GlobalArgs) {
    env_logger::Builder::new()
        .filter_level(log_level(global.quiet, global.verbose))
        .parse_default_env()
        .format_timestamp(None)
        .format_target(false)
        .target(env_logger::Target::Stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();

    let global = GlobalArgs {
        quiet: cli.quiet,
        verbose: cli.verbose,
        color: std::io::stderr().is_terminal(),
        config: cli.config,
    };
    init_logging(&global);

    let result = match cli.command {
        Command::Opt(ref args) => opt::run(args, &global),
        Command::Generate(ref args) => generate::run(args, &global),
        Command::Lso(ref args) => lso::run(args, &global),
    };

    match result {
        Ok(code) => process::exit(code),
        Err(e) => {
            log::error!("{e}");
            process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_opt_with_pass_args() {
        let cli = Cli::parse_from([
            "pptree", "opt", "--design", "top.json", "--", "-width", "16", "-start", "kogge-stone", "top",
        ]);
        match cli.command {
            Command::Opt(ref args) => {
                assert_eq!(args.design, PathBuf::from("top.json"));
                assert!(args.output.is_none());
                assert_eq!(args.format, ReportFormat::Text);
                assert_eq!(args.pass_args, vec!["-width", "16", "-start", "kogge-stone", "top"]);
            }
            _ => panic!("expected Opt command"),
        }
    }

    #[test]
    fn parse_opt_json_output() {
        let cli = Cli::parse_from([
            "pptree", "opt", "--design", "in.json", "-o", "out.json", "--format", "json",
        ]);
        match cli.command {
            Command::Opt(ref args) => {
                assert_eq!(args.output, Some(PathBuf::from("out.json")));
                assert_eq!(args.format, ReportFormat::Json);
                assert!(args.pass_args.is_empty());
            }
            _ => panic!("expected Opt command"),
        }
    }

    #[test]
    fn parse_generate() {
        let cli = Cli::parse_from([
            "pptree", "generate", "--width", "8", "--transforms", "_LF@6", "--keep",
        ]);
        match cli.command {
            Command::Generate(ref args) => {
                assert_eq!(args.width, Some(8));
                assert_eq!(args.transforms.as_deref(), Some("_LF@6"));
                assert!(args.start.is_none());
                assert!(args.keep);
                assert!(!args.maps);
            }
            _ => panic!("expected Generate command"),
        }
    }

    #[test]
    fn parse_lso_flags() {
        let cli = Cli::parse_from([
            "pptree", "lso", "--input", "a.aig", "--output", "b.blif", "--partitioned", "--mig",
            "--dry-run",
        ]);
        match cli.command {
            Command::Lso(ref args) => {
                assert!(args.partitioned && args.mig && args.dry_run);
                assert!(!args.aig && !args.exclusive);
                assert!(args.script.is_none());
            }
            _ => panic!("expected Lso command"),
        }
    }

    #[test]
    fn parse_global_flags() {
        let cli = Cli::parse_from(["pptree", "--quiet", "--config", "/tmp/pptree.toml", "generate", "--maps"]);
        assert!(cli.quiet);
        assert!(!cli.verbose);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/pptree.toml")));
    }

    #[test]
    fn quiet_wins_over_verbose() {
        assert_eq!(log_level(true, true), LevelFilter::Error);
        assert_eq!(log_level(false, true), LevelFilter::Debug);
        assert_eq!(log_level(false, false), LevelFilter::Info);
    }
}
