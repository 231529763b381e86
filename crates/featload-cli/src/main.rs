#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::needless_pass_by_value)]

mod commands;
mod logging;

use clap::Parser;
use featload_core::LoaderConfig;
use miette::Result;
use std::ffi::OsString;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "featload")]
#[command(author, version, about = "Inspect require decisions against a loaded-features log", long_about = None)]
struct Cli {
    /// Increase logging verbosity (-v for DEBUG, -vv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit JSON formatted output (stable, machine-readable)
    #[arg(long, global = true)]
    json: bool,

    /// Override the working directory
    #[arg(long, global = true, value_name = "PATH")]
    cwd: Option<PathBuf>,

    /// Read loader settings from a JSON file
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Search-path list, separated like PATH
    #[arg(long, global = true, env = "FEATLOAD_LOAD_PATH", value_name = "PATHS")]
    load_path: Option<OsString>,

    /// Add a search-path directory (searched before all others; repeatable)
    #[arg(short = 'I', long = "include", global = true, value_name = "DIR")]
    include: Vec<String>,

    /// Platform dynamic-library suffix, e.g. "bundle"
    #[arg(long, global = true, env = "FEATLOAD_DLEXT", value_name = "EXT")]
    dlext: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Print version information
    Version,

    /// Decide, for each specifier, whether it is loaded, found, or missing
    Resolve {
        /// Specifiers to resolve, in order
        #[arg(required = true)]
        specifiers: Vec<String>,

        /// Register each found file before resolving the next specifier
        #[arg(long)]
        require: bool,

        /// Seed the loaded-features log from a file (one path per line)
        #[arg(long, value_name = "FILE")]
        preload: Option<PathBuf>,

        /// Freeze the loaded-features log after preloading
        #[arg(long)]
        freeze: bool,
    },

    /// Show the step-by-step resolution of one specifier
    Explain {
        /// Specifier to explain
        specifier: String,

        /// Seed the loaded-features log from a file (one path per line)
        #[arg(long, value_name = "FILE")]
        preload: Option<PathBuf>,
    },
}

/// Layer config file, search-path list, `-I` and `--dlext`. Later layers
/// win: `-I` directories are searched before the list, which is searched
/// before the config file's.
fn build_config(cli: &Cli) -> featload_core::Result<LoaderConfig> {
    let mut config = match &cli.config {
        Some(path) => LoaderConfig::from_file(path)?,
        None => LoaderConfig::default(),
    };

    if let Some(cwd) = &cli.cwd {
        config = config.with_cwd(cwd.clone());
    }

    let listed = cli
        .load_path
        .iter()
        .flat_map(std::env::split_paths)
        .filter(|dir| !dir.as_os_str().is_empty())
        .map(|dir| dir.to_string_lossy().into_owned());
    let from_file = std::mem::take(&mut config.load_path);
    config = config
        .with_load_path(cli.include.iter().cloned().chain(listed))
        .with_extra_load_path(from_file);

    if let Some(dlext) = &cli.dlext {
        config = config.with_dlext(dlext.clone());
    }

    let verbosity = config.verbosity.max(cli.verbose);
    let json_logs = config.json_logs || cli.json;
    Ok(config.with_verbosity(verbosity).with_json_logs(json_logs))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match build_config(&cli) {
        Ok(config) => config,
        Err(err) => return commands::fail(err, cli.json),
    };

    logging::init(config.verbosity, config.json_logs);

    match cli.command {
        None | Some(Commands::Version) => commands::version::run(),
        Some(Commands::Resolve {
            specifiers,
            require,
            preload,
            freeze,
        }) => {
            let options = commands::resolve::ResolveOptions {
                specifiers,
                require,
                preload,
                freeze,
            };
            commands::resolve::run(&config, &options, cli.json)
        }
        Some(Commands::Explain { specifier, preload }) => {
            commands::explain::run(&config, &specifier, preload.as_deref(), cli.json)
        }
    }
}
