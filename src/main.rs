mod ui;

use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use morphpass::{KeystreamRng, MorphDict, PasswordGenerator, PasswordMode};

#[derive(Parser)]
#[command(
    name = "morphpass",
    version,
    author,
    about = "Memorable German adjective-noun passwords from a morphological dictionary"
)]
struct Cli {
    /// Morphological dictionary file, or "-" for standard input
    #[arg(short, long)]
    dict: PathBuf,

    #[arg(short, long, value_enum, default_value = "strong")]
    mode: Mode,

    /// Number of distinct passwords to generate
    #[arg(short = 'n', long, default_value_t = 1)]
    count: usize,

    /// Derive all randomness from this text instead of the OS
    #[arg(long)]
    seed: Option<String>,

    #[arg(short, long)]
    quiet: bool,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "lowercase")]
enum Mode {
    Simple,
    Strong,
}

impl From<Mode> for PasswordMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Simple => PasswordMode::Simple,
            Mode::Strong => PasswordMode::Strong,
        }
    }
}

fn load_dictionary(path: &Path, options: &ui::DisplayOptions) -> Result<(MorphDict, Duration)> {
    if path.as_os_str() == "-" {
        let stdin = io::stdin().lock();
        return ui::show_load_progress(None, options, |sink| {
            Ok(MorphDict::from_reader_with_progress(stdin, None, sink)?)
        });
    }

    let file = File::open(path)
        .with_context(|| format!("Failed to open dictionary {}", path.display()))?;
    let size_hint = file.metadata().ok().map(|m| m.len());

    ui::show_load_progress(size_hint, options, |sink| {
        MorphDict::from_reader_with_progress(BufReader::new(file), size_hint, sink)
            .with_context(|| format!("Failed to read dictionary {}", path.display()))
    })
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let options = ui::DisplayOptions {
        unicode_support: ui::detect_unicode_support(),
        color_support: ui::detect_color_support(),
        quiet: cli.quiet,
    };

    let start = Instant::now();
    let (dict, load_elapsed) = load_dictionary(&cli.dict, &options)?;

    let rng = match &cli.seed {
        Some(seed) => KeystreamRng::from_seed(seed),
        None => KeystreamRng::from_entropy(),
    };
    let mut generator = PasswordGenerator::new(&dict, rng);
    let mode = PasswordMode::from(cli.mode);

    let passwords = generator.generate_passwords(mode, cli.count)?;

    let dict_info = ui::DictInfo {
        source: cli.dict.display().to_string(),
        words: dict.len(),
        entries: dict.total_entries(),
        load_time: load_elapsed,
    };
    let output_config = ui::OutputConfig {
        mode,
        requested: cli.count,
        seeded: cli.seed.is_some(),
    };
    let stats = ui::PoolStats::collect(generator.pools(), mode, generator.entropy_bits(mode));

    ui::display_output(
        &passwords,
        &dict_info,
        &output_config,
        &stats,
        start.elapsed(),
        &options,
    );

    Ok(())
}
