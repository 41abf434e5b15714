/*!
Main binary for jsonshake.
*/

use anyhow::{Context, Result, bail};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use log::debug;
use serde_json::Value;
use std::{
    fs,
    io::{self, IsTerminal, Read, Write},
    path::PathBuf,
};

use jsonshake::{
    commands,
    shake,
    query::{Limits, MAX_DEPTH, MAX_PATH_COUNT, MAX_PATH_LENGTH, Mode, Query},
    utils,
};

/// Prune a JSON document down to (or away from) the fields selected by
/// JSONPath expressions.
#[derive(Parser)]
#[command(
    name = "jshake",
    version,
    about,
    long_about = None,
    arg_required_else_help = true,
    args_conflicts_with_subcommands = true,
    disable_help_subcommand = true
)]
struct Args {
    /// Optional subcommands
    #[command(subcommand)]
    command: Option<Commands>,
    #[command(flatten)]
    shake: ShakeArgs,
    #[command(flatten)]
    verbose: Verbosity<WarnLevel>,
}

#[derive(clap::Args)]
struct ShakeArgs {
    /// Keep the matched subtrees (include) or remove them (exclude)
    #[arg(short, long, value_enum, default_value_t = ModeArg::Include)]
    mode: ModeArg,
    /// Path expression (e.g. "$..password"); repeat for several paths
    #[arg(short = 'p', long = "path", value_name = "PATH")]
    paths: Vec<String>,
    /// Scope relative paths (those not starting with `$`) under this path
    #[arg(long, value_name = "PATH")]
    prefix: Option<String>,
    /// Optional path to JSON file. If omitted, reads from STDIN
    #[arg(value_name = "FILE")]
    input: Option<PathBuf>,
    /// Write the result to this file instead of STDOUT
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,
    /// Pretty-print the JSON output instead of compact
    #[arg(long)]
    pretty: bool,
    /// Print the nesting depth of the input document to STDERR
    #[arg(long)]
    depth: bool,
    /// Maximum nesting depth of the document [default: 1000, 0 = no limit]
    #[arg(long, value_name = "N")]
    max_depth: Option<usize>,
    /// Maximum byte length of each path [default: 10000, 0 = no limit]
    #[arg(long, value_name = "N")]
    max_path_length: Option<usize>,
    /// Maximum number of paths [default: 1000, 0 = no limit]
    #[arg(long, value_name = "N")]
    max_path_count: Option<usize>,
}

#[derive(Clone, Copy, ValueEnum)]
enum ModeArg {
    Include,
    Exclude,
}

impl From<ModeArg> for Mode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Include => Self::Include,
            ModeArg::Exclude => Self::Exclude,
        }
    }
}

/// Available subcommands for `jshake`
#[derive(Subcommand)]
enum Commands {
    #[command(subcommand)]
    /// Generate additional documentation and/or completions
    Generate(GenerateCommand),
}

/// Generate shell completions and man page
#[derive(Subcommand)]
enum GenerateCommand {
    /// Generate shell completions for the given shell to stdout.
    Shell { shell: clap_complete::Shell },
    /// Generate man pages for jshake to output directory if specified, else
    /// the current directory.
    Man {
        /// The output directory to write the man pages.
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },
}

impl ShakeArgs {
    /// Omitted flags get the documented default, `0` disables the bound.
    fn limits(&self) -> Limits {
        let bound = |flag: Option<usize>, default: usize| match flag {
            None => Some(default),
            Some(0) => None,
            Some(n) => Some(n),
        };
        Limits {
            max_depth: bound(self.max_depth, MAX_DEPTH),
            max_path_length: bound(self.max_path_length, MAX_PATH_LENGTH),
            max_path_count: bound(self.max_path_count, MAX_PATH_COUNT),
        }
    }
}

/// Entry point for main binary.
///
/// Reads the document from the given file or from piped STDIN, prunes it
/// and writes the result to STDOUT or the `--output` file.
fn main() -> Result<()> {
    let args = Args::parse();

    env_logger::Builder::new()
        .filter_level(args.verbose.log_level_filter())
        .format_timestamp(None)
        .init();

    match args.command {
        Some(Commands::Generate(GenerateCommand::Shell { shell })) => {
            let mut cmd = Args::command();
            commands::generate::write_completions(
                shell,
                &mut cmd,
                &mut io::stdout().lock(),
            );
            Ok(())
        }
        Some(Commands::Generate(GenerateCommand::Man { output_dir })) => {
            let written = commands::generate::generate_man_pages(
                &Args::command(),
                output_dir,
            )?;
            for path in written {
                println!("Generated: {}", path.display());
            }
            Ok(())
        }
        None => run(args.shake),
    }
}

fn run(args: ShakeArgs) -> Result<()> {
    if args.paths.is_empty() {
        bail!("at least one --path is required");
    }

    let mut query =
        Query::new(args.mode.into(), args.paths.clone()).with_limits(args.limits());
    if let Some(prefix) = &args.prefix {
        query = query.with_prefix(prefix.clone());
    }
    // report bad paths before reading a potentially large input
    query.compile().context("Failed to compile paths")?;

    let input = if let Some(path) = &args.input {
        fs::read(path)
            .with_context(|| format!("Failed to read file {}", path.display()))?
    } else {
        if io::stdin().is_terminal() {
            // No piped input and no file specified
            let mut cmd = Args::command();
            return Ok(cmd.print_help()?);
        }
        let mut buffer = Vec::new();
        io::stdin()
            .read_to_end(&mut buffer)
            .context("Failed to read STDIN")?;
        buffer
    };
    debug!("read {} bytes of input", input.len());

    let json = shake::decode(&input).context("Failed to parse JSON")?;
    if args.depth {
        eprintln!("Depth: {}", utils::depth(&json));
    }

    let result = query.walk(&json).context("Failed to shake document")?;

    if let Some(path) = &args.output {
        let mut bytes = encode(&result, args.pretty)?;
        bytes.push(b'\n');
        return fs::write(path, bytes)
            .with_context(|| format!("Failed to write {}", path.display()));
    }

    let stdout = io::stdout();
    if stdout.is_terminal() {
        return utils::write_colored_result(
            &mut stdout.lock(),
            &result,
            args.pretty,
        );
    }

    let written = (|| -> Result<()> {
        let mut out = stdout.lock();
        out.write_all(&encode(&result, args.pretty)?)?;
        out.write_all(b"\n")?;
        out.flush()?;
        Ok(())
    })();
    match written {
        Err(err) if utils::is_broken_pipe(&err) => Ok(()),
        other => other.context("Failed to write output"),
    }
}

fn encode(value: &Value, pretty: bool) -> Result<Vec<u8>> {
    let bytes = if pretty {
        serde_json::to_vec_pretty(value)
    } else {
        serde_json::to_vec(value)
    };
    bytes.context("Failed to encode JSON")
}
