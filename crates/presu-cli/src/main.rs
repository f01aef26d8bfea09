mod commands;
mod output;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "presu",
    version,
    about = "Structure recovery for Spanish construction-budget PDFs"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract a budget PDF into clean, ordered text lines
    Extract {
        /// Path to the PDF file
        pdf_file: PathBuf,

        /// Owner id, part of the cache key
        #[arg(long, default_value_t = 0)]
        owner: u64,

        /// Document id, part of the cache key
        #[arg(long, default_value_t = 0)]
        document: u64,

        /// Directory for the extraction cache (cache disabled when absent)
        #[arg(long, value_name = "DIR")]
        cache_dir: Option<PathBuf>,

        /// Write the extracted lines to a file instead of stdout
        #[arg(short = 'O', long = "out", value_name = "FILE")]
        out: Option<PathBuf>,
    },
    /// Recover the chapter tree from a budget PDF
    Parse {
        /// Path to the PDF file
        pdf_file: PathBuf,

        /// Owner id, part of the cache key
        #[arg(long, default_value_t = 0)]
        owner: u64,

        /// Document id, part of the cache key
        #[arg(long, default_value_t = 0)]
        document: u64,

        /// Directory for the extraction cache (cache disabled when absent)
        #[arg(long, value_name = "DIR")]
        cache_dir: Option<PathBuf>,

        /// Output format: table (default) or json
        #[arg(short, long, default_value = "table")]
        output: String,

        /// Write the analysis as JSON to a file
        #[arg(short = 'O', long = "out", value_name = "FILE")]
        out: Option<PathBuf>,
    },
    /// Check declared totals against bottom-up sums of line items
    Reconcile {
        /// Chapter tree JSON, as produced by `presu parse -o json`
        tree_file: PathBuf,

        /// Line-item JSON: a map from node code to its items
        items_file: PathBuf,

        /// Discrepancy rule: relative (default) or absolute
        #[arg(long, default_value = "relative")]
        rule: String,

        /// Output format: table (default) or json
        #[arg(short, long, default_value = "table")]
        output: String,
    },
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Extract {
            pdf_file,
            owner,
            document,
            cache_dir,
            out,
        } => commands::extract::run(pdf_file, owner, document, cache_dir, out),
        Commands::Parse {
            pdf_file,
            owner,
            document,
            cache_dir,
            output,
            out,
        } => commands::parse::run(pdf_file, owner, document, cache_dir, &output, out),
        Commands::Reconcile {
            tree_file,
            items_file,
            rule,
            output,
        } => commands::reconcile::run(tree_file, items_file, &rule, &output),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
