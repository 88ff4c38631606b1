use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::str::FromStr;
use tracklog::config::{AppConfig, default_cache_path, default_data_dir};
use tracklog::db::Database;
use tracklog::layout::ChartLayout;
use tracklog::models::{Granularity, Metric, SortDirection, SortSpec, TrackField};
use tracklog::pagination::PageItem;
use tracklog::store::{CachedStore, FileStore, HttpStore, TrackSource};
use tracklog::view::{ChartState, SongsTable, row_cells};

#[derive(Parser)]
#[command(name = "tracklog", version, about = "Listening-history analytics")]
struct Cli {
    /// Store layout directory (written by `ingest`, read by everything else)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Read the store layout from this base URL instead of --data-dir
    #[arg(long, global = true)]
    remote: Option<String>,

    /// Skip the persistent fetch cache for remote reads
    #[arg(long, global = true)]
    no_cache: bool,

    /// Verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the store layout from exported streaming-history JSON files
    Ingest {
        /// Files or directories to read
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Output directory (defaults to --data-dir)
        #[arg(long)]
        out: Option<PathBuf>,

        /// Number of parallel workers (0 = auto-detect from config)
        #[arg(short = 'j', long, default_value = "0")]
        jobs: usize,
    },

    /// Show one page of the songs table
    Songs {
        /// Case-insensitive match on song, artist or album
        #[arg(short, long)]
        search: Option<String>,

        /// Column to sort by: song, artist, album, playCount, skipCount,
        /// duration or avgSkipTime (default: playCount, descending)
        #[arg(long, value_parser = TrackField::from_str)]
        sort: Option<TrackField>,

        /// Sort ascending instead of descending
        #[arg(long)]
        asc: bool,

        /// Rows per page: 5, 10, 20, 40 or 80
        #[arg(long)]
        page_size: Option<usize>,

        /// Page to show; read like a typed page number ("3", " 3rd")
        #[arg(long)]
        page: Option<String>,
    },

    /// Chart a metric per month or per year
    Chart {
        /// month or year
        #[arg(long, value_parser = Granularity::from_str, default_value = "month")]
        view: Granularity,

        /// Year to chart in month view (defaults to the latest)
        #[arg(long)]
        year: Option<String>,

        /// plays, duration or skips
        #[arg(long, value_parser = Metric::from_str, default_value = "plays")]
        metric: Metric,
    },

    /// List the periods available in the store
    Periods {
        /// month or year
        #[arg(long, value_parser = Granularity::from_str, default_value = "month")]
        view: Granularity,
    },

    /// Manage the persistent fetch cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// Drop every cached payload
    Clear,
    /// Show entry count, size and age
    Stats,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    // Load config file (optional, defaults if missing)
    let config = AppConfig::load();

    // Resolve store directory: CLI > config > XDG default
    let data_dir = cli
        .data_dir
        .clone()
        .or(config.data_dir.clone())
        .unwrap_or_else(default_data_dir);

    match cli.command {
        Commands::Ingest { ref paths, ref out, jobs } => {
            let out_dir = out.clone().unwrap_or_else(|| data_dir.clone());
            let options = tracklog::ingest::IngestOptions {
                workers: config.resolve_workers(jobs),
                show_progress: true,
            };
            let index = tracklog::ingest::ingest(paths, &options).context("Ingest failed")?;
            index
                .write_store(&out_dir)
                .with_context(|| format!("Failed to write store to {}", out_dir.display()))?;

            let r = &index.report;
            println!(
                "Ingest complete: {} files ({} failed), {} plays, \
                 {} podcast and {} zero-length events skipped",
                r.files,
                r.failed_files,
                r.plays,
                r.podcasts,
                r.zero_length
            );
            if r.bad_timestamps > 0 {
                println!("{} events had unreadable timestamps", r.bad_timestamps);
            }
            println!(
                "Totals: {} plays, {} skips, {:.1} hours across {} songs",
                index.totals.plays,
                index.totals.skips,
                index.totals.seconds as f64 / 3600.0,
                index.all_time.len()
            );
            println!("Store written to {}", out_dir.display());
        }

        Commands::Songs {
            ref search,
            sort,
            asc,
            page_size,
            ref page,
        } => {
            let store = open_store(&cli, &config, &data_dir)?;
            let tracks = store.fetch_all_tracks().context("Could not load tracks")?;

            let mut table = SongsTable::new(tracks, config.page_size);
            if let Some(size) = page_size {
                if !table.set_page_size(size) {
                    log::warn!(
                        "Page size {} not offered ({:?}), keeping {}",
                        size,
                        tracklog::PAGE_SIZE_OPTIONS,
                        table.pagination().page_size()
                    );
                }
            }
            if sort.is_some() || asc {
                let field = sort.unwrap_or(TrackField::PlayCount);
                let direction = if asc {
                    SortDirection::Ascending
                } else {
                    SortDirection::Descending
                };
                table.set_sort(SortSpec { field, direction });
            }
            if let Some(q) = search {
                table.set_query(q);
            }
            if let Some(p) = page {
                table.set_page_input(p);
                if !table.submit_page_input() {
                    log::warn!(
                        "No page {:?}; showing page {}",
                        p,
                        table.pagination().current_page()
                    );
                }
            }

            print_songs(&table);
        }

        Commands::Chart { view, ref year, metric } => {
            let store = open_store(&cli, &config, &data_dir)?;
            let mut state = ChartState {
                view,
                chosen_year: year.clone(),
                metric,
                ..ChartState::default()
            };
            let chart = state.load(&store);
            if chart.data_unavailable {
                anyhow::bail!("Data unavailable. Re-run with -v for details.");
            }

            match (&state.view, &state.chosen_year) {
                (Granularity::Month, Some(y)) => {
                    println!("{} by month, {}", chart.metric.label(), y)
                }
                _ => println!("{} by {}", chart.metric.label(), state.view),
            }
            if state.view == Granularity::Month && !state.years.is_empty() {
                println!("Years: {}", state.years.join("  "));
            }
            println!();

            if chart.points.is_empty() {
                println!("No listening data for this selection.");
                return Ok(());
            }

            let layout = ChartLayout::for_viewport(terminal_width());
            println!("{} / {}  (bar colour {})", chart.y_title, chart.x_title, chart.color);
            for line in chart.render(&layout) {
                println!("{line}");
            }

            if let Some(s) = &chart.summary_display {
                println!();
                println!("Peak:    {} ({})", s.peak_period, s.peak_value);
                println!("Average: {}", s.average);
                println!("Total:   {}", s.total);
            }
        }

        Commands::Periods { view } => {
            let store = open_store(&cli, &config, &data_dir)?;
            let granularity = view;
            let periods = store
                .fetch_periods(granularity)
                .context("Could not load periods")?;

            if periods.is_empty() {
                println!("No {granularity} periods in the store.");
                return Ok(());
            }
            println!("{} {} periods:", periods.len(), granularity);
            for p in &periods {
                println!("  {:<8} {}", p, tracklog::format::format_period_label(p));
            }
            if granularity == Granularity::Month {
                println!();
                println!("Years: {}", tracklog::periods::available_years(&periods).join("  "));
            }
        }

        Commands::Cache { ref action } => {
            let cache_path = config.cache_path.clone().unwrap_or_else(default_cache_path);
            let db = Database::open(&cache_path)
                .context("Failed to open fetch cache")?
                .with_ttl_days(config.cache_ttl_days);

            match action {
                CacheAction::Clear => {
                    let removed = db.cache_clear().context("Failed to clear cache")?;
                    println!("Removed {} cached payloads from {}", removed, cache_path.display());
                }
                CacheAction::Stats => {
                    let stats = db.cache_stats().context("Failed to read cache")?;
                    println!("Cache: {}", cache_path.display());
                    println!("  Entries:  {}", stats.entries);
                    println!("  Size:     {:.1} KiB", stats.total_bytes as f64 / 1024.0);
                    match db.ttl_days() {
                        Some(days) => println!("  Expired:  {} (TTL {} days)", stats.expired, days),
                        None => println!("  Expired:  - (no TTL)"),
                    }
                    if let Some(ts) = stats.oldest_fetched_at {
                        if let Some(when) = chrono::DateTime::from_timestamp(ts, 0) {
                            println!("  Oldest:   {}", when.format("%Y-%m-%d %H:%M UTC"));
                        }
                    }
                }
            }
        }
    }

    Ok(())
}

/// Local directory or remote URL; remote reads go through the fetch cache
/// unless `--no-cache` is given.
fn open_store(
    cli: &Cli,
    config: &AppConfig,
    data_dir: &std::path::Path,
) -> Result<Box<dyn TrackSource>> {
    let remote = cli.remote.clone().or(config.remote_url.clone());
    let Some(url) = remote else {
        log::info!("Store: {}", data_dir.display());
        return Ok(Box::new(FileStore::new(data_dir)));
    };

    log::info!("Store: {url}");
    let http = HttpStore::new(&url, config.http_timeout());
    if cli.no_cache {
        return Ok(Box::new(http));
    }

    let cache_path = config.cache_path.clone().unwrap_or_else(default_cache_path);
    log::info!("Fetch cache: {}", cache_path.display());
    let db = Database::open(&cache_path)
        .context("Failed to open fetch cache")?
        .with_ttl_days(config.cache_ttl_days);
    Ok(Box::new(CachedStore::new(http, db)))
}

fn terminal_width() -> usize {
    std::env::var("COLUMNS")
        .ok()
        .and_then(|c| c.trim().parse().ok())
        .unwrap_or(80)
}

/// Cut to `width` characters, marking the cut with "...".
fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() > width {
        let kept: String = s.chars().take(width.saturating_sub(3)).collect();
        format!("{kept}...")
    } else {
        s.to_string()
    }
}

/// Print the current page of the songs table with its page picker.
fn print_songs(table: &SongsTable) {
    const WIDTHS: [usize; 7] = [30, 22, 22, 8, 8, 9, 9];

    if !table.query().is_empty() {
        println!("Search: \"{}\"", table.query());
    }

    let headers = table.headers();
    println!(
        "{:<30} {:<22} {:<22} {:>8} {:>8} {:>9} {:>9}",
        headers[0], headers[1], headers[2], headers[3], headers[4], headers[5], headers[6]
    );
    println!("{}", "-".repeat(WIDTHS.iter().sum::<usize>() + WIDTHS.len() - 1));

    if table.rows().is_empty() {
        println!("No results found.");
    }
    for track in table.rows() {
        let c = row_cells(track);
        println!(
            "{:<30} {:<22} {:<22} {:>8} {:>8} {:>9} {:>9}",
            truncate(&c[0], WIDTHS[0]),
            truncate(&c[1], WIDTHS[1]),
            truncate(&c[2], WIDTHS[2]),
            c[3],
            c[4],
            c[5],
            c[6],
        );
    }

    let p = table.pagination();
    println!();
    println!("Total Results: {}", table.total_results());
    if p.total_pages() > 1 {
        let picker: Vec<String> = table
            .window()
            .iter()
            .map(|item| match item {
                PageItem::Page(n) if *n == p.current_page() => format!("[{n}]"),
                PageItem::Page(n) => n.to_string(),
                PageItem::Ellipsis => "...".to_string(),
            })
            .collect();
        println!(
            "Page {} of {} ({} per page):  {}",
            p.current_page(),
            p.total_pages(),
            p.page_size(),
            picker.join(" ")
        );
    }
}
