// src/signal.rs

// Signal Joiner. Reads per-sample ChromHMM binarized call files for one
// chromosome and assembles the sample x bin matrix, excluding whole
// files that fail validation and reporting each exclusion with its
// position in the original input order.

use std::fmt;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

use indicatif::{ProgressBar, ProgressStyle};
use ndarray::Array2;

/// Histone marks recognized in binarized call files, with their fixed
/// column position on the mark-name line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoneMark {
    H3K27ac,
    H3K4me1,
}

impl HistoneMark {
    /// Column index of this mark on line 2 of every call file.
    pub fn column(self) -> usize {
        match self {
            HistoneMark::H3K27ac => 0,
            HistoneMark::H3K4me1 => 1,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            HistoneMark::H3K27ac => "H3K27ac",
            HistoneMark::H3K4me1 => "H3K4me1",
        }
    }

    /// Accepts the full mark name or its short alias.
    pub fn parse(value: &str) -> Option<HistoneMark> {
        match value {
            "ac" | "H3K27ac" => Some(HistoneMark::H3K27ac),
            "me1" | "H3K4me1" => Some(HistoneMark::H3K4me1),
            _ => None,
        }
    }
}

// chrX landmarks, as 0-based 200 bp bin indices. PAR1 covers the bins
// before PAR1_END_BIN, PAR2 starts at PAR2_START_BIN, and the XIST locus
// (~73,060,000-73,080,000 b) spans XIST_START_BIN..=XIST_END_BIN.
const PAR1_END_BIN: usize = 13497;
const PAR2_START_BIN: usize = 774652;
const XIST_START_BIN: usize = 365299;
const XIST_END_BIN: usize = 365399;

/// Optional chrX bin exclusions applied while reading call files.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BinFilter {
    pub remove_par: bool,
    pub remove_xist: bool,
}

impl BinFilter {
    /// Whether the 0-based bin survives the filter.
    pub fn keeps(&self, bin: usize) -> bool {
        if self.remove_par && !(PAR1_END_BIN..PAR2_START_BIN).contains(&bin) {
            return false;
        }
        if self.remove_xist && (XIST_START_BIN..=XIST_END_BIN).contains(&bin) {
            return false;
        }
        true
    }
}

/// Why a sample file contributed no row to the matrix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExclusionReason {
    /// The mark-name line has no column at the requested mark's position.
    MissingMarkColumn,
    /// The column at the mark's position names a different mark.
    MarkMismatch { found: String },
    /// A bin carries the ambiguous call value 2.
    NoCall { bin: usize },
    /// A data line has no parseable integer call in the mark's column.
    MalformedCall { line: usize },
}

impl fmt::Display for ExclusionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExclusionReason::MissingMarkColumn => write!(f, "mark column missing"),
            ExclusionReason::MarkMismatch { found } => {
                write!(f, "unexpected mark name {:?}", found)
            }
            ExclusionReason::NoCall { bin } => write!(f, "no-call value at bin {}", bin),
            ExclusionReason::MalformedCall { line } => {
                write!(f, "unreadable call on line {}", line)
            }
        }
    }
}

/// One excluded input file, positioned by its index in the original
/// path list so the caller can drop the matching group label.
#[derive(Debug, Clone)]
pub struct Exclusion {
    pub index: usize,
    pub path: PathBuf,
    pub reason: ExclusionReason,
}

/// Sample x bin matrix of binarized calls for one chromosome.
#[derive(Debug, Clone)]
pub struct SignalMatrix {
    pub sample_ids: Vec<String>,
    pub calls: Array2<u8>,
}

impl SignalMatrix {
    pub fn n_samples(&self) -> usize {
        self.calls.nrows()
    }

    pub fn n_bins(&self) -> usize {
        self.calls.ncols()
    }
}

/// Build the signal matrix for one chromosome from an ordered list of
/// call files. Valid files contribute one row each, keyed by file name;
/// files failing validation are returned in the exclusion list instead.
///
/// Bin counts are assumed uniform across valid files; the first valid
/// file fixes the matrix width.
pub fn join_signal(
    paths: &[PathBuf],
    mark: HistoneMark,
    filter: BinFilter,
    verbose: bool,
) -> io::Result<(SignalMatrix, Vec<Exclusion>)> {
    if verbose {
        println!("Loading files...");
    }
    let bar = if verbose || paths.is_empty() {
        None
    } else {
        let bar = ProgressBar::new(paths.len() as u64);
        bar.set_style(
            ProgressStyle::with_template(
                "{prefix:.bold.dim} [{elapsed_precise}] {wide_bar:.cyan/blue} {pos}/{len} files",
            )
            .unwrap()
            .progress_chars("█▓░"),
        );
        bar.set_prefix("join");
        Some(bar)
    };

    let mut sample_ids: Vec<String> = Vec::new();
    let mut values: Vec<u8> = Vec::new();
    let mut n_bins: Option<usize> = None;
    let mut excluded: Vec<Exclusion> = Vec::new();

    for (index, path) in paths.iter().enumerate() {
        if verbose {
            println!("{}", path.display());
        }
        match read_call_file(path, mark, filter)? {
            Ok(calls) => {
                if n_bins.is_none() {
                    n_bins = Some(calls.len());
                }
                sample_ids.push(file_name(path));
                values.extend_from_slice(&calls);
            }
            Err(reason) => {
                if verbose {
                    println!(
                        "Warning: {} is a bad file, skipping ({}).",
                        path.display(),
                        reason
                    );
                }
                excluded.push(Exclusion {
                    index,
                    path: path.clone(),
                    reason,
                });
            }
        }
        if let Some(bar) = &bar {
            bar.inc(1);
        }
    }
    if let Some(bar) = bar {
        bar.finish_and_clear();
    }

    let n_bins = n_bins.unwrap_or(0);
    let calls = Array2::from_shape_vec((sample_ids.len(), n_bins), values)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

    Ok((SignalMatrix { sample_ids, calls }, excluded))
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Read one call file: line 1 is the sample id (skipped), line 2 names
/// the marks, every later line carries one integer call per mark. The
/// inner `Err` is a validation failure that excludes the whole file.
fn read_call_file(
    path: &Path,
    mark: HistoneMark,
    filter: BinFilter,
) -> io::Result<Result<Vec<u8>, ExclusionReason>> {
    let reader = BufReader::new(File::open(path)?);
    let mut calls: Vec<u8> = Vec::new();

    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            break;
        }
        if line_no == 0 {
            continue;
        }
        let fields: Vec<&str> = line.split('\t').collect();
        if line_no == 1 {
            if fields.len() <= mark.column() {
                return Ok(Err(ExclusionReason::MissingMarkColumn));
            }
            if fields[mark.column()] != mark.name() {
                return Ok(Err(ExclusionReason::MarkMismatch {
                    found: fields[mark.column()].to_string(),
                }));
            }
            continue;
        }

        // Bin indices count data lines, including ones a filter drops.
        let bin = line_no - 2;
        if !filter.keeps(bin) {
            continue;
        }
        let value: u8 = match fields.get(mark.column()).and_then(|f| f.parse().ok()) {
            Some(value) => value,
            None => return Ok(Err(ExclusionReason::MalformedCall { line: line_no + 1 })),
        };
        if value == 2 {
            return Ok(Err(ExclusionReason::NoCall { bin }));
        }
        calls.push(value);
    }

    Ok(Ok(calls))
}
