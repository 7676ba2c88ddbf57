use clap::{Args, Parser, Subcommand};
use linkchain::demo::{self, BuildConfig, TamperConfig};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "linkchain",
    version,
    about = "Hash-linked append-only ledger with prefix validation"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct BuildArgs {
    /// Blocks to append after genesis
    #[arg(short = 'n', long, default_value = "20")]
    length: usize,
    /// Payload prefix for appended blocks
    #[arg(long, default_value = "some data here")]
    data: String,
}

impl From<BuildArgs> for BuildConfig {
    fn from(args: BuildArgs) -> Self {
        Self {
            length: args.length,
            data: args.data,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Build a chain and print its blocks
    Build {
        #[command(flatten)]
        build: BuildArgs,
        /// Print the chain as JSON
        #[arg(long)]
        json: bool,
    },
    /// Edit one block of a copy and show what validation keeps
    Tamper {
        #[command(flatten)]
        build: BuildArgs,
        /// Position of the block to edit
        #[arg(long, default_value = "9")]
        at: usize,
        /// Replacement payload
        #[arg(long = "with", default_value = "Edited data")]
        replacement: String,
        /// Recompute the edited block's hash
        #[arg(long)]
        rehash: bool,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Build { build, json } => cmd_build(build.into(), json),
        Commands::Tamper {
            build,
            at,
            replacement,
            rehash,
        } => cmd_tamper(TamperConfig {
            build: build.into(),
            position: at,
            replacement,
            rehash,
        }),
    };

    if let Err(e) = result {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

fn cmd_build(config: BuildConfig, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let blockchain = demo::run_build(&config);
    if json {
        println!("{}", demo::to_json(&blockchain)?);
        return Ok(());
    }
    for block in &blockchain {
        println!("{} added to blockchain", block);
        println!("Hash: {}\n", block.hash);
    }
    Ok(())
}

fn cmd_tamper(config: TamperConfig) -> Result<(), Box<dyn std::error::Error>> {
    let report = demo::run_tamper(&config)?;
    print!("{}", report);
    Ok(())
}
