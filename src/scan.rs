// src/scan.rs

// Region Scan Driver. Walks the TAD boundary rows of each chromosome
// with a running cursor, emits TAD / inter-TAD / flanking segments that
// span at least two bins, slices the signal matrix per segment, and
// scores every segment across repeated random states.

use std::io;
use std::path::{Path, PathBuf};

use ndarray::s;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::grouping::Grouping;
use crate::score::segment_score;
use crate::signal::{join_signal, BinFilter, HistoneMark};
use crate::tsv::{self, ColumnFormat, Field};

/// Segment kinds emitted by the scan state machine. The stretch before
/// the first TAD of a chromosome is `Starting`, later gaps between TADs
/// are `interTAD`, and the stretch after the last TAD is `Ending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentKind {
    Starting,
    InterTad,
    Tad,
    Ending,
}

impl SegmentKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SegmentKind::Starting => "Starting",
            SegmentKind::InterTad => "interTAD",
            SegmentKind::Tad => "TAD",
            SegmentKind::Ending => "Ending",
        }
    }
}

/// One scored stretch of a chromosome, in bin coordinates (end
/// exclusive).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub id: String,
    pub kind: SegmentKind,
    pub bin_start: usize,
    pub bin_end: usize,
}

/// One TAD boundary row. An `end` of 0 is the open-ended sentinel: the
/// region runs to the last bin of the chromosome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionRow {
    pub chrom_suffix: String,
    pub start: i64,
    pub end: i64,
}

/// How group labels are permuted when a null comparison is requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RandomizeMethod {
    /// Shuffle the existing labels, preserving their counts.
    Scramble,
    /// Redraw every label uniformly from the two-label universe.
    Coin,
}

/// Everything one `test-prediction` run needs.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    pub grouping_file: PathBuf,
    pub region_file: Option<PathBuf>,
    /// Single chromosome to scan; `None` scans chr1..chr22 plus chrX,
    /// chrXnoPAR and chrXnoPARnoXist.
    pub chrom: Option<String>,
    pub mark: HistoneMark,
    pub test_size: f64,
    pub tot_random_states: usize,
    pub bin_size: usize,
    pub inter_region_tested: bool,
    pub output_file: PathBuf,
    pub randomize: Option<RandomizeMethod>,
    pub label_seed: u64,
    pub rf_seed: u64,
    pub verbose: bool,
}

/// Scores for one segment, one entry per random state.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreRecord {
    pub region_id: String,
    pub scores: Vec<f64>,
}

const REGION_ROW_FORMAT: [ColumnFormat; 3] =
    [ColumnFormat::Str, ColumnFormat::Int, ColumnFormat::Int];

/// Load a cleaned TAD boundary file (header dropped, malformed rows
/// skipped).
pub fn load_region_rows<P: AsRef<Path>>(path: P) -> io::Result<Vec<RegionRow>> {
    let raw = tsv::strip_header(tsv::load_rows(path, b'\t')?);
    Ok(tsv::coerce_rows(&raw, &REGION_ROW_FORMAT)
        .into_iter()
        .filter_map(|row| match (&row[0], &row[1], &row[2]) {
            (Field::Str(chrom), Field::Int(start), Field::Int(end)) => Some(RegionRow {
                chrom_suffix: chrom.clone(),
                start: *start,
                end: *end,
            }),
            _ => None,
        })
        .collect())
}

/// Partition one chromosome into TAD / inter-TAD / flanking segments.
///
/// The cursor `previous_end` starts at 0 and advances to each boundary
/// row's end, sentinel included. A segment is emitted only when it spans
/// at least 2 bins; inter-region segments additionally require
/// `inter_region_tested`. Boundary rows of other chromosomes are
/// skipped.
pub fn chromosome_segments(
    regions: &[RegionRow],
    chrom: &str,
    n_bins: usize,
    bin_size: usize,
    inter_region_tested: bool,
) -> Vec<Segment> {
    let bin = bin_size as i64;
    let mut segments = Vec::new();
    let mut previous_end: i64 = 0;
    let mut inter_kind = SegmentKind::Starting;

    for region in regions {
        if format!("chr{}", region.chrom_suffix) != chrom {
            continue;
        }

        let inter_start = (previous_end / bin) as usize;
        let inter_span_end = (region.start / bin) as usize;
        if inter_region_tested && inter_start + 2 <= inter_span_end {
            let bin_end = if region.end == 0 { n_bins } else { inter_span_end };
            segments.push(Segment {
                id: format!(
                    "{}_{}-{}_{}",
                    chrom,
                    previous_end,
                    region.start,
                    inter_kind.as_str()
                ),
                kind: inter_kind,
                bin_start: inter_start,
                bin_end,
            });
            inter_kind = SegmentKind::InterTad;
        }

        let tad_start = (region.start / bin) as usize;
        let tad_end = if region.end == 0 {
            n_bins
        } else {
            (region.end / bin) as usize
        };
        if tad_start + 2 <= tad_end {
            let end_bp = if region.end == 0 {
                n_bins as i64 * bin
            } else {
                region.end
            };
            segments.push(Segment {
                id: format!("{}_{}-{}_TAD", chrom, region.start, end_bp),
                kind: SegmentKind::Tad,
                bin_start: tad_start,
                bin_end: tad_end,
            });
        }

        previous_end = region.end;
    }

    let tail_start = (previous_end / bin) as usize;
    if inter_region_tested && tail_start + 2 <= n_bins {
        segments.push(Segment {
            id: format!("{}_{}-{}_Ending", chrom, previous_end, n_bins * bin_size),
            kind: SegmentKind::Ending,
            bin_start: tail_start,
            bin_end: n_bins,
        });
    }

    segments
}

/// Permute group labels in place for a null comparison.
pub fn permute_labels(
    labels: &mut [String],
    universe: &[String; 2],
    method: RandomizeMethod,
    rng: &mut ChaCha8Rng,
) {
    match method {
        RandomizeMethod::Scramble => labels.shuffle(rng),
        RandomizeMethod::Coin => {
            for label in labels.iter_mut() {
                *label = universe[rng.gen_range(0..2usize)].clone();
            }
        }
    }
}

// The chrXnoPAR and chrXnoPARnoXist pseudo-chromosomes re-scan chrX with
// the corresponding bin filters; everything else maps to itself.
fn resolve_chromosome(name: &str) -> (String, BinFilter) {
    match name {
        "chrXnoPAR" => (
            "chrX".to_string(),
            BinFilter {
                remove_par: true,
                remove_xist: false,
            },
        ),
        "chrXnoPARnoXist" => (
            "chrX".to_string(),
            BinFilter {
                remove_par: true,
                remove_xist: true,
            },
        ),
        _ => (name.to_string(), BinFilter::default()),
    }
}

fn encode_labels(labels: &[String], universe: &[String; 2]) -> Vec<usize> {
    labels
        .iter()
        .map(|label| usize::from(label == &universe[1]))
        .collect()
}

fn thousands(value: usize) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (offset, ch) in digits.chars().enumerate() {
        if offset > 0 && (digits.len() - offset) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

fn report_segment(segment: &Segment, chrom: &str, bin_size: usize, scores: &[f64], median_pos: usize) {
    let coordinates = format!(
        "{}:{}-{}",
        chrom,
        thousands(segment.bin_start * bin_size),
        thousands(segment.bin_end * bin_size)
    );
    let mut sorted = scores.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    match sorted.get(median_pos).or_else(|| sorted.last()) {
        Some(median) => println!(
            "{} {}: {:?}, median = {}",
            segment.kind.as_str(),
            coordinates,
            scores,
            median
        ),
        None => println!("{} {}: {:?}", segment.kind.as_str(), coordinates, scores),
    }
}

fn save_scores(path: &Path, records: &[ScoreRecord]) -> io::Result<()> {
    let rows: Vec<Vec<String>> = records
        .iter()
        .map(|record| {
            let mut row = vec![record.region_id.clone()];
            row.extend(record.scores.iter().map(|score| score.to_string()));
            row
        })
        .collect();
    tsv::save_rows(path, Some(&["chrom_init-end_region"]), &rows, b'\t')
}

/// Run the full scan: validate the grouping, then for each chromosome
/// build the signal matrix, align and optionally permute the labels,
/// segment the chromosome, and score every segment across
/// `tot_random_states` splits.
///
/// Returns the per-chromosome score records. Only the first
/// chromosome's table is written to `output_file`; later chromosomes
/// are reported on stdout only.
pub fn run_scan(config: &ScanConfig) -> io::Result<Vec<Vec<ScoreRecord>>> {
    // Two-label precondition, checked before any sample file is touched.
    let grouping = Grouping::load(&config.grouping_file)?;

    let regions = match &config.region_file {
        Some(path) => load_region_rows(path)?,
        // A placeholder row whose chromosome matches nothing: every
        // chromosome then yields a single Ending segment over all bins.
        None => vec![RegionRow {
            chrom_suffix: "0".to_string(),
            start: 0,
            end: 0,
        }],
    };

    let chrom_names: Vec<String> = match &config.chrom {
        Some(chrom) => vec![chrom.clone()],
        None => (1..=22)
            .map(|n| format!("chr{}", n))
            .chain(
                ["chrX", "chrXnoPAR", "chrXnoPARnoXist"]
                    .iter()
                    .map(|s| s.to_string()),
            )
            .collect(),
    };
    // Index of the reported median in the sorted score list; exact for
    // odd numbers of random states.
    let median_pos = config.tot_random_states / 2;

    let mut all_scores: Vec<Vec<ScoreRecord>> = Vec::new();
    for name in &chrom_names {
        let (chrom, filter) = resolve_chromosome(name);
        let paths = grouping.paths_for(&chrom);
        let (matrix, excluded) = join_signal(&paths, config.mark, filter, config.verbose)?;
        if config.verbose {
            println!("Data joined.");
        }

        let mut labels = grouping.labels_in_order();
        // Drop labels of excluded files, highest index first so earlier
        // positions stay valid.
        for exclusion in excluded.iter().rev() {
            labels.remove(exclusion.index);
        }
        debug_assert_eq!(labels.len(), matrix.n_samples());

        if let Some(method) = config.randomize {
            if config.verbose {
                println!("Randomising labels, as requested...");
            }
            let mut rng = ChaCha8Rng::seed_from_u64(config.label_seed);
            permute_labels(&mut labels, &grouping.labels, method, &mut rng);
        }
        let y = encode_labels(&labels, &grouping.labels);

        // Segment matching and identifiers use the requested name, so a
        // chrXnoPAR scan keeps its own ids and, having no boundary rows
        // of its own, is tested as one Ending segment.
        let segments = chromosome_segments(
            &regions,
            name,
            matrix.n_bins(),
            config.bin_size,
            config.inter_region_tested,
        );

        let mut chrom_scores = Vec::new();
        for segment in &segments {
            if config.verbose {
                println!("Getting patterns in region {}", segment.id);
            }
            let hi = segment.bin_end.min(matrix.n_bins());
            let lo = segment.bin_start.min(hi);
            let features = matrix.calls.slice(s![.., lo..hi]);

            let mut scores = Vec::with_capacity(config.tot_random_states);
            for random_state in 0..config.tot_random_states {
                scores.push(segment_score(
                    features,
                    &y,
                    config.test_size,
                    random_state as u64,
                    config.rf_seed,
                )?);
            }
            report_segment(segment, name, config.bin_size, &scores, median_pos);
            chrom_scores.push(ScoreRecord {
                region_id: segment.id.clone(),
                scores,
            });
        }
        all_scores.push(chrom_scores);
    }

    if let Some(first) = all_scores.first() {
        if config.verbose {
            println!("Saving results in file {}", config.output_file.display());
        }
        save_scores(&config.output_file, first)?;
    }

    Ok(all_scores)
}
