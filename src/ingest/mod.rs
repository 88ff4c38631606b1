pub mod history;

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use thiserror::Error;
use walkdir::WalkDir;

use crate::models::{Granularity, PeriodData, Track};
use crate::store::{PeriodFile, TracksFile, layout};
use history::{Dropped, Play, PlayEvent, SongLog, SongTotals};

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Malformed history file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("Could not serialize {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("No streaming history files found under {0}")]
    NoHistoryFiles(String),
    #[error("Thread pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

pub type Result<T> = std::result::Result<T, IngestError>;

pub struct IngestOptions {
    /// Parser threads; 0 lets rayon decide.
    pub workers: usize,
    pub show_progress: bool,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            workers: 0,
            show_progress: true,
        }
    }
}

/// What happened to the input, for the summary line.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct IngestReport {
    pub files: u64,
    pub failed_files: u64,
    pub plays: u64,
    pub podcasts: u64,
    pub zero_length: u64,
    pub bad_timestamps: u64,
}

/// Everything the store layout is built from.
#[derive(Debug, Default)]
pub struct HistoryIndex {
    /// Name of the first history file, in processing order.
    pub already_loaded: Option<String>,
    pub all_time: Vec<Track>,
    pub months: PeriodData,
    pub years: PeriodData,
    pub totals: SongTotals,
    pub report: IngestReport,
}

/// Read every history file under `paths` and tally it.
pub fn ingest(paths: &[PathBuf], options: &IngestOptions) -> Result<HistoryIndex> {
    let files = discover_history_files(paths);
    if files.is_empty() {
        let roots: Vec<String> = paths.iter().map(|p| p.display().to_string()).collect();
        return Err(IngestError::NoHistoryFiles(roots.join(", ")));
    }

    log::info!("Parsing {} history files", files.len());

    let pb = if options.show_progress {
        ProgressBar::new(files.len() as u64)
    } else {
        ProgressBar::hidden()
    };
    let template = "{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}";
    pb.set_style(
        ProgressStyle::with_template(template)
            .unwrap()
            .progress_chars("#>-"),
    );
    pb.set_message("Parsing...");

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(options.workers)
        .build()?;

    // Parse in parallel; `collect` keeps file order, so the merge below is deterministic.
    let parsed: Vec<Result<ParsedFile>> = pool.install(|| {
        use rayon::prelude::*;
        files
            .par_iter()
            .map(|path| {
                let result = read_history_file(path);
                pb.inc(1);
                result
            })
            .collect()
    });

    let mut report = IngestReport::default();
    let mut plays: Vec<Play> = Vec::new();
    for result in parsed {
        report.files += 1;
        match result {
            Ok(file) => {
                report.podcasts += file.podcasts;
                report.zero_length += file.zero_length;
                report.bad_timestamps += file.bad_timestamps;
                plays.extend(file.plays);
            }
            Err(e) => {
                log::warn!("Skipping {e}");
                report.failed_files += 1;
            }
        }
    }
    report.plays = plays.len() as u64;

    pb.finish_with_message(format!(
        "Done: {} plays from {} files ({} failed)",
        report.plays, report.files, report.failed_files
    ));

    let already_loaded = files
        .first()
        .and_then(|p| p.file_name())
        .map(|n| n.to_string_lossy().to_string());

    let mut index = HistoryIndex::from_plays(&plays);
    index.already_loaded = already_loaded;
    index.report = report;

    log::info!(
        "Tallied {} plays, {} skips, {:.1} hours across {} songs",
        index.totals.plays,
        index.totals.skips,
        index.totals.seconds as f64 / 3600.0,
        index.all_time.len()
    );

    Ok(index)
}

/// `*.json` files under `paths`, ordered by the name segments after the first `_`
/// (`Streaming_History_Audio_2023-2024_1.json` sorts on `History`, `Audio`, ...).
pub fn discover_history_files(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = Vec::new();
    for path in paths {
        for entry in WalkDir::new(path).follow_links(true).into_iter().filter_map(|e| e.ok()) {
            if !entry.file_type().is_file() {
                continue;
            }
            let is_json = entry
                .path()
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case("json"));
            if is_json {
                files.push(entry.into_path());
            }
        }
    }

    files.sort_by(|a, b| history_sort_key(a).cmp(&history_sort_key(b)).then_with(|| a.cmp(b)));
    files
}

pub fn history_sort_key(path: &Path) -> Vec<String> {
    let name = path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
    name.split('_').skip(1).map(str::to_string).collect()
}

struct ParsedFile {
    plays: Vec<Play>,
    podcasts: u64,
    zero_length: u64,
    bad_timestamps: u64,
}

fn read_history_file(path: &Path) -> Result<ParsedFile> {
    log::debug!("Reading {}", path.display());
    let raw = fs::read_to_string(path).map_err(|source| IngestError::Io {
        path: path.display().to_string(),
        source,
    })?;
    parse_history(&raw).map_err(|source| IngestError::Parse {
        path: path.display().to_string(),
        source,
    })
}

fn parse_history(raw: &str) -> std::result::Result<ParsedFile, serde_json::Error> {
    let events: Vec<PlayEvent> = serde_json::from_str(raw)?;
    let mut parsed = ParsedFile {
        plays: Vec::with_capacity(events.len()),
        podcasts: 0,
        zero_length: 0,
        bad_timestamps: 0,
    };
    for event in events {
        match event.into_play() {
            Ok(play) => parsed.plays.push(play),
            Err(Dropped::NoTrack) => parsed.podcasts += 1,
            Err(Dropped::ZeroLength) => parsed.zero_length += 1,
            Err(Dropped::BadTimestamp) => parsed.bad_timestamps += 1,
        }
    }
    Ok(parsed)
}

impl HistoryIndex {
    /// Tally plays into months, then fold months (in first-seen order) into
    /// years and the all-time list.
    pub fn from_plays(plays: &[Play]) -> Self {
        let mut month_order: Vec<String> = Vec::new();
        let mut months: HashMap<String, SongLog> = HashMap::new();
        for play in plays {
            let log = months.entry(play.month.clone()).or_insert_with(|| {
                month_order.push(play.month.clone());
                SongLog::default()
            });
            log.record(&play.key, play.seconds, play.skipped);
        }

        let mut all_time = SongLog::default();
        let mut years: BTreeMap<String, SongLog> = BTreeMap::new();
        for month in &month_order {
            let log = &months[month];
            all_time.absorb(log);
            let year = month.split('-').next().unwrap_or(month).to_string();
            years.entry(year).or_default().absorb(log);
        }

        Self {
            already_loaded: None,
            all_time: all_time.tracks(),
            months: months.iter().map(|(k, log)| (k.clone(), log.tracks())).collect(),
            years: years.iter().map(|(k, log)| (k.clone(), log.tracks())).collect(),
            totals: all_time.totals(),
            report: IngestReport::default(),
        }
    }

    /// Write `tracks.json` and the `periods/` tree under `out_dir`.
    pub fn write_store(&self, out_dir: &Path) -> Result<()> {
        write_json(
            &out_dir.join(layout::TRACKS),
            &TracksFile {
                already_loaded: self.already_loaded.clone(),
                data: self.all_time.clone(),
            },
        )?;

        let partitions = [
            (Granularity::Month, &self.months),
            (Granularity::Year, &self.years),
        ];
        for (granularity, periods) in partitions {
            let keys: Vec<&String> = periods.keys().collect();
            write_json(&out_dir.join(layout::periods_index(granularity)), &keys)?;
            for (period, tracks) in periods {
                write_json(
                    &out_dir.join(layout::period(granularity, period)),
                    &PeriodFile { data: tracks.clone() },
                )?;
            }
        }

        log::info!(
            "Wrote {} tracks, {} months, {} years to {}",
            self.all_time.len(),
            self.months.len(),
            self.years.len(),
            out_dir.display()
        );
        Ok(())
    }
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let io_err = |source| IngestError::Io {
        path: path.display().to_string(),
        source,
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(io_err)?;
    }
    let file = fs::File::create(path).map_err(io_err)?;
    serde_json::to_writer_pretty(BufWriter::new(file), value).map_err(|source| IngestError::Write {
        path: path.display().to_string(),
        source,
    })
}
