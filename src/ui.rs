use std::time::{Duration, Instant};

use anyhow::Result;
use console::{Style, Term};
use indicatif::{ProgressBar, ProgressStyle};
use zeroize::Zeroizing;

use morphpass::{Gender, GenderPools, PasswordMode, Progress};

pub const MIN_COMFORT_ENTROPY: f64 = 40.0;

pub struct DictInfo {
    pub source: String,
    pub words: usize,
    pub entries: usize,
    pub load_time: Duration,
}

pub struct OutputConfig {
    pub mode: PasswordMode,
    pub requested: usize,
    pub seeded: bool,
}

pub struct PoolStats {
    /// (adjectives, nouns) per gender, in `Gender::ALL` order.
    pub sizes: [(usize, usize); 3],
    pub entropy: f64,
}

impl PoolStats {
    pub fn collect(pools: &GenderPools<'_>, mode: PasswordMode, entropy: f64) -> Self {
        let mut sizes = [(0, 0); 3];
        for (slot, gender) in sizes.iter_mut().zip(Gender::ALL) {
            *slot = (
                pools.adjectives(gender, mode).len(),
                pools.nouns(gender, mode).len(),
            );
        }
        Self { sizes, entropy }
    }
}

pub struct DisplayOptions {
    pub unicode_support: bool,
    pub color_support: bool,
    pub quiet: bool,
}

pub fn detect_unicode_support() -> bool {
    supports_unicode::on(supports_unicode::Stream::Stdout)
}

pub fn detect_color_support() -> bool {
    supports_color::on(supports_color::Stream::Stdout).is_some()
}

pub fn get_status_symbols(unicode_support: bool) -> (&'static str, &'static str) {
    if unicode_support {
        ("✓", "!")
    } else {
        ("+", "!")
    }
}

fn plural(n: usize, one: &'static str, many: &'static str) -> &'static str {
    if n == 1 { one } else { many }
}

fn status_style(ok: bool, options: &DisplayOptions) -> Style {
    if !options.color_support {
        Style::new()
    } else if ok {
        Style::new().green()
    } else {
        Style::new().yellow()
    }
}

/// Runs `f` behind a byte bar when the size is known, a spinner otherwise.
pub fn show_load_progress<F, T>(
    size_hint: Option<u64>,
    options: &DisplayOptions,
    f: F,
) -> Result<(T, Duration)>
where
    F: FnOnce(&mut dyn FnMut(Progress)) -> Result<T>,
{
    let term = Term::stderr();
    term.hide_cursor().ok();

    let pb = match size_hint.filter(|&total| total > 0) {
        Some(total) => {
            let pb = ProgressBar::new(total);
            let bar_chars = if options.unicode_support { "█▉▊▋▌▍▎▏ " } else { "#>-" };
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("{msg} [{bar:40}] {bytes}/{total_bytes} ({percent}%)")
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars(bar_chars),
            );
            pb
        }
        None => {
            let pb = ProgressBar::new_spinner();
            pb.set_style(
                ProgressStyle::default_spinner()
                    .template("{spinner} {msg} {bytes}")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner())
                    .tick_chars("-\\|/-"),
            );
            pb.enable_steady_tick(Duration::from_millis(80));
            pb
        }
    };

    if options.quiet {
        pb.set_draw_target(indicatif::ProgressDrawTarget::hidden());
    }
    pb.set_message("Loading dictionary...");

    let start = Instant::now();
    let result = f(&mut |progress: Progress| pb.set_position(progress.processed));
    let elapsed = start.elapsed();

    pb.finish_and_clear();
    term.show_cursor().ok();

    result.map(|r| (r, elapsed))
}

pub fn display_output(
    passwords: &[Zeroizing<String>],
    dict: &DictInfo,
    config: &OutputConfig,
    stats: &PoolStats,
    elapsed: Duration,
    options: &DisplayOptions,
) {
    for (i, password) in passwords.iter().enumerate() {
        if options.quiet {
            println!("{}", password.as_str());
        } else {
            println!("Out[{}]:\n{}\n", i, password.as_str());
        }
    }

    if !options.quiet {
        display_settings(dict, config, options);
        display_stats(passwords.len(), dict, config, stats, elapsed, options);
    }
}

fn display_settings(dict: &DictInfo, config: &OutputConfig, options: &DisplayOptions) {
    let (check_ok, check_warn) = get_status_symbols(options.unicode_support);

    let dict_ok = dict.entries > 0;
    let dict_style = status_style(dict_ok, options);
    let dict_status = if dict_ok { check_ok } else { check_warn };

    println!("Settings:");
    println!("  ├─ Dictionary {}", dict.source);
    println!(
        "  │  ├─ Words   {} {} {}",
        dict_style.apply_to(format!("[{}]", dict_status)),
        dict_style.apply_to(dict.words),
        plural(dict.words, "word", "words")
    );
    println!(
        "  │  └─ Entries {} {}",
        dict_style.apply_to(dict.entries),
        plural(dict.entries, "analysis", "analyses")
    );
    println!(
        "  ├─ Mode       {}",
        match config.mode {
            PasswordMode::Simple => "Simple (adjective + noun)",
            PasswordMode::Strong => "Strong (substitution + 2 digits)",
        }
    );
    println!(
        "  ├─ Sampling   {}",
        if config.seeded {
            "ChaCha20 (seeded)"
        } else {
            "ChaCha20 (OS entropy)"
        }
    );
    println!(
        "  └─ Output     {} {}",
        config.requested,
        plural(config.requested, "password", "passwords")
    );
    println!();
}

fn display_stats(
    produced: usize,
    dict: &DictInfo,
    config: &OutputConfig,
    stats: &PoolStats,
    elapsed: Duration,
    options: &DisplayOptions,
) {
    let (check_ok, check_warn) = get_status_symbols(options.unicode_support);

    let entropy_ok = stats.entropy >= MIN_COMFORT_ENTROPY;
    let entropy_style = status_style(entropy_ok, options);
    let entropy_status = if entropy_ok { check_ok } else { check_warn };

    let count_ok = produced == config.requested;
    let count_style = status_style(count_ok, options);
    let count_status = if count_ok { check_ok } else { check_warn };

    println!("Stats:");
    println!("  ├─ Pools      adjectives / nouns");
    for (i, (gender, (adjectives, nouns))) in Gender::ALL.iter().zip(stats.sizes).enumerate() {
        let prefix = if i == Gender::ALL.len() - 1 {
            "│  └─"
        } else {
            "│  ├─"
        };
        println!("  {} {:<5}   {} / {}", prefix, gender.tag(), adjectives, nouns);
    }

    println!(
        "  ├─ Entropy    {} {} bits",
        entropy_style.apply_to(format!("[{}]", entropy_status)),
        entropy_style.apply_to(format!("{:.1}", stats.entropy))
    );
    println!(
        "  ├─ Produced   {} {} of {}",
        count_style.apply_to(format!("[{}]", count_status)),
        count_style.apply_to(produced),
        config.requested
    );
    println!("  ├─ Load       {:.1}s", dict.load_time.as_secs_f64());
    println!("  └─ Time       {:.1}s", elapsed.as_secs_f64());
}
