use anyhow::Result;
use clap::Parser;
use pvp::commands::{self, Config};
use std::path::PathBuf;

/// pvp - a small package publishing and installation tool
///
/// Publish a package from its config file, install it into the local store,
/// and switch which version is active through one link per package name.
///
/// Examples:
///   pvp publish foo.toml    # Fetch the archive and record foo
///   pvp install foo-1.0     # Extract foo 1.0 and activate it
///   pvp search foo          # Show active packages matching "foo"
#[derive(Parser, Debug)]
#[command(author, version = env!("PVP_VERSION"), about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Package store directory (overrides defaults; also via PVP_STORE)
    #[arg(long = "store", env = "PVP_STORE", value_name = "PATH", global = true)]
    store_root: Option<PathBuf>,

    /// Directory holding one activation link per package (also via PVP_LINK_DIR)
    #[arg(long = "links", env = "PVP_LINK_DIR", value_name = "PATH", global = true)]
    link_dir: Option<PathBuf>,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Fetch a package archive and record it from a config file
    Publish {
        /// Package config file (TOML, or JSON when it ends in .json)
        #[arg(value_name = "CONFIG")]
        config: PathBuf,
    },

    /// Extract a published package and make it active
    Install {
        /// Record name, e.g. foo-1.0 or foo-1.0.pv
        #[arg(value_name = "RECORD")]
        record: String,
    },

    /// Deactivate a package and delete its extracted files
    Uninstall {
        #[arg(value_name = "NAME")]
        name: String,
    },

    /// Reinstall the active version of a package
    Upgrade {
        #[arg(value_name = "NAME")]
        name: String,
    },

    /// Show active packages whose name contains a term
    Search {
        #[arg(value_name = "TERM")]
        term: String,
    },

    /// List active packages
    List,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();
    let runtime = pvp::runtime::RealRuntime;
    let config = Config::load(&runtime, cli.store_root, cli.link_dir)?;

    match cli.command {
        Commands::Publish { config: path } => commands::publish(runtime, &path, config).await?,
        Commands::Install { record } => commands::install(runtime, &record, config).await?,
        Commands::Uninstall { name } => commands::uninstall(runtime, &name, config)?,
        Commands::Upgrade { name } => commands::upgrade(runtime, &name, config).await?,
        Commands::Search { term } => commands::search(runtime, &term, config)?,
        Commands::List => commands::list(runtime, config)?,
    }
    Ok(())
}
