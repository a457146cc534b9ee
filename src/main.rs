//! triplewalk CLI: random-walk corpora from RDF graphs.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};

use triplewalk::config::WalkConfig;
use triplewalk::engine::WalkEngine;
use triplewalk::walk::WalkMode;

#[derive(Parser)]
#[command(name = "triplewalk", version, about = "Random walks over knowledge graphs")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate walks for the entities of an RDF graph.
    Walks {
        /// RDF input files (.nt, .ttl, .nq, .rdf, ... optionally .gz).
        #[arg(long, required = true, num_args = 1..)]
        input: Vec<PathBuf>,

        /// TOML config file; flags below override its values.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Walk file to write.
        #[arg(long)]
        output: Option<PathBuf>,

        /// Worker threads.
        #[arg(long)]
        threads: Option<usize>,

        /// Walks per entity.
        #[arg(long)]
        walks: Option<usize>,

        /// Maximum hops per walk.
        #[arg(long)]
        depth: Option<usize>,

        /// random, random-duplicate-free, mid or weighted-mid.
        #[arg(long)]
        mode: Option<WalkMode>,

        /// RNG seed for reproducible output.
        #[arg(long)]
        seed: Option<u64>,

        /// File with one entity per line; only these get walks.
        #[arg(long)]
        entities: Option<PathBuf>,

        /// Directory of earlier walk files; their entities are skipped.
        #[arg(long)]
        resume: Option<PathBuf>,

        /// Write plain text instead of gzip.
        #[arg(long)]
        plain: bool,

        /// Keep literal objects as walk tokens.
        #[arg(long)]
        literals: bool,

        /// Shorten well-known vocabulary IRIs (rdf:, owl:, dbr:, ...).
        #[arg(long)]
        common_prefixes: bool,

        /// Skip malformed RDF statements instead of failing.
        #[arg(long)]
        lenient: bool,
    },

    /// Show graph statistics.
    Info {
        /// RDF input files.
        #[arg(long, required = true, num_args = 1..)]
        input: Vec<PathBuf>,

        /// Skip malformed RDF statements instead of failing.
        #[arg(long)]
        lenient: bool,
    },
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(3)
                .build(),
        )
    }))
    .ok(); // Ignore error if hook already set (e.g., in tests)

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Walks {
            input,
            config,
            output,
            threads,
            walks,
            depth,
            mode,
            seed,
            entities,
            resume,
            plain,
            literals,
            common_prefixes,
            lenient,
        } => {
            let mut cfg = match config {
                Some(path) => WalkConfig::load(&path).into_diagnostic()?,
                None => WalkConfig::default(),
            };
            if let Some(output) = output {
                cfg.output_path = output;
            }
            if let Some(threads) = threads {
                cfg.threads = threads;
            }
            if let Some(walks) = walks {
                cfg.walks_per_entity = walks;
            }
            if let Some(depth) = depth {
                cfg.depth = depth;
            }
            if let Some(mode) = mode {
                cfg.mode = mode;
            }
            if seed.is_some() {
                cfg.seed = seed;
            }
            if entities.is_some() {
                cfg.entity_file = entities;
            }
            if resume.is_some() {
                cfg.resume_dir = resume;
            }
            if plain {
                cfg.compress = false;
            }
            cfg.include_literals |= literals;
            cfg.common_prefixes |= common_prefixes;
            cfg.lenient |= lenient;

            let engine = WalkEngine::from_rdf(cfg, input.as_slice())?;
            let summary = engine.run()?;
            println!("{summary}");
        }

        Commands::Info { input, lenient } => {
            let cfg = WalkConfig {
                lenient,
                ..Default::default()
            };
            let engine = WalkEngine::from_rdf(cfg, input.as_slice())?;
            print!("{}", engine.info());
        }
    }

    Ok(())
}
