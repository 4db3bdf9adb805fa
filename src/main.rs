use anyhow::Result;
use clap::{Parser, Subcommand};
use is_terminal::IsTerminal;
use pathbloom::BloomSettings;
use pathbloom::areas::store::IndexStore;
use pathbloom::artifacts::bloom::{DEFAULT_BITS_PER_ENTRY, DEFAULT_MAX_CHANGED_PATHS};
use pathbloom::artifacts::graph_index::OpenOptions;
use std::io::BufReader;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "pathbloom",
    version = "0.1.0",
    author = "Sami Barbut-Dica",
    about = "Changed-path bloom filter index for commit history",
    long_about = "Builds and queries a compact index of per-commit bloom filters over changed paths. \
    A negative answer is definite; a positive one has to be confirmed with a real diff.",
    help_template = r"
{name} {version} - {about}

USAGE:
    {usage}

OPTIONS:
    {all-args}
",
)]
struct Cli {
    #[arg(
        long,
        global = true,
        env = "PATHBLOOM_NO_VERIFY",
        help = "Skip checksum verification when opening an index"
    )]
    no_verify: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(
        name = "build",
        about = "Build an index from a changed-path manifest",
        long_about = "This command reads the output of `git log --format='commit %H' --name-only` \
        from a file or stdin and atomically writes the filter index."
    )]
    Build {
        #[arg(index = 1, help = "The index file to write")]
        index: PathBuf,
        #[arg(short, long, help = "The manifest file, stdin if omitted")]
        input: Option<PathBuf>,
        #[arg(long, default_value_t = DEFAULT_BITS_PER_ENTRY, help = "Filter bits per changed path")]
        bits_per_entry: u32,
        #[arg(long, default_value_t = DEFAULT_MAX_CHANGED_PATHS, help = "Commits changing more paths get no filter")]
        max_changed_paths: usize,
    },
    #[command(name = "inspect", about = "Print the header, chunk table and statistics of an index")]
    Inspect {
        #[arg(index = 1)]
        index: PathBuf,
    },
    #[command(name = "verify", about = "Verify the checksum and structure of an index")]
    Verify {
        #[arg(index = 1)]
        index: PathBuf,
    },
    #[command(name = "ids", about = "List indexed commits in ascending order")]
    Ids {
        #[arg(index = 1)]
        index: PathBuf,
        #[arg(long, help = "Show abbreviated commit ids")]
        abbrev: bool,
    },
    #[command(
        name = "lookup",
        about = "Ask whether a commit may have changed the given paths",
        long_about = "Prints `no` for paths the commit definitely did not change and `maybe` for \
        paths that have to be confirmed with a real diff."
    )]
    Lookup {
        #[arg(index = 1)]
        index: PathBuf,
        #[arg(index = 2, help = "The full commit id")]
        commit: String,
        #[arg(index = 3, required = true, num_args = 1..)]
        paths: Vec<String>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    if !std::io::stdout().is_terminal() {
        colored::control::set_override(false);
    }

    let cli = Cli::parse();
    let options = OpenOptions::default().verify_checksum(!cli.no_verify);
    let store = |path: &PathBuf| {
        IndexStore::new(path, Box::new(std::io::stdout())).with_options(options)
    };

    match &cli.command {
        Commands::Build {
            index,
            input,
            bits_per_entry,
            max_changed_paths,
        } => {
            let settings = BloomSettings::default()
                .with_bits_per_entry(*bits_per_entry)
                .with_max_changed_paths(*max_changed_paths);

            match input {
                Some(input) => {
                    let manifest = BufReader::new(std::fs::File::open(input)?);
                    store(index).build(manifest, settings)?
                }
                None => store(index).build(std::io::stdin().lock(), settings)?,
            }
        }
        Commands::Inspect { index } => store(index).inspect()?,
        Commands::Verify { index } => store(index).verify()?,
        Commands::Ids { index, abbrev } => store(index).ids(*abbrev)?,
        Commands::Lookup {
            index,
            commit,
            paths,
        } => store(index).lookup(commit, paths)?,
    }

    Ok(())
}
