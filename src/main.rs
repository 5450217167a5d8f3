//! vend - a dependency manager for Go-style package trees.

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use vend::cmd::{self, Session};

#[derive(Parser)]
#[command(name = "vend")]
#[command(version, about = "A minimum-version-selection dependency manager")]
struct Cli {
    /// Never touch the network; trust the cache.
    #[arg(long, global = true)]
    offline: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the dependency cache and an empty lockfile
    Init,
    /// Solve the lockfile's constraints and write the result
    Solve,
    /// Add modules by spec: name, name@version, name@ref, or name@hash
    Add {
        #[arg(required = true)]
        specs: Vec<String>,
        /// Add as test-only dependencies
        #[arg(long)]
        test: bool,
    },
    /// Remove modules and everything that depends on them
    Remove {
        #[arg(required = true)]
        names: Vec<String>,
    },
    /// Add modules that export missing imported packages
    Missing,
    /// Remove modules nothing in the working copy needs
    Prune,
    /// Promote modules to newer compatible revisions
    Upgrade,
    /// Sync module repositories into the cache
    Fetch {
        #[arg(required = true)]
        names: Vec<String>,
    },
    /// Materialize the solved modules under vendor/
    Checkout,
    /// Pull vendor references from the shared cache
    Pull,
    /// Push vendor references to the shared cache
    Push,
    /// Reports over the current solution
    Show {
        #[command(subcommand)]
        report: Reports,
    },
}

#[derive(Subcommand)]
enum Reports {
    /// The full solution
    Solution,
    /// The modules the working copy imports directly
    Shallow,
    /// The modules nothing imports
    Extra,
    /// The working copy's import graph
    Packages,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut session = Session::open(cli.offline)?;

    match cli.command {
        Commands::Init => cmd::init::run(&mut session),
        Commands::Solve => cmd::solve::run(&mut session),
        Commands::Add { specs, test } => cmd::add::run(&mut session, &specs, test),
        Commands::Remove { names } => cmd::remove::run(&mut session, &names),
        Commands::Missing => cmd::missing::run(&mut session),
        Commands::Prune => cmd::prune::run(&mut session),
        Commands::Upgrade => cmd::upgrade::run(&mut session),
        Commands::Fetch { names } => cmd::fetch::run(&mut session, &names),
        Commands::Checkout => cmd::checkout::run(&mut session),
        Commands::Pull => cmd::cache::pull(&mut session),
        Commands::Push => cmd::cache::push(&mut session),
        Commands::Show { report } => match report {
            Reports::Solution => cmd::show::solution(&mut session),
            Reports::Shallow => cmd::show::shallow(&mut session),
            Reports::Extra => cmd::show::extra(&mut session),
            Reports::Packages => cmd::show::packages(&mut session),
        },
    }
}
