// src/merge.rs

// Interval Merge Engine. Pools TAD boundary coordinates from a folder of
// BED files into one breakpoint list per chromosome, collapses
// breakpoints closer than a minimum distance into their midpoint, and
// writes the surviving consecutive pairs back out as a cleaned boundary
// file.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::tsv::{self, ColumnFormat};

/// Canonical chromosome order used for all outputs.
pub const CHROM_SUFFIXES: [&str; 24] = [
    "1", "2", "3", "4", "5", "6", "7", "8", "9", "10", "11", "12", "13", "14", "15", "16", "17",
    "18", "19", "20", "21", "22", "X", "Y",
];

/// Position of a chromosome suffix in the canonical order, or `None` for
/// anything that is not a recognized chromosome.
pub fn chrom_index(suffix: &str) -> Option<usize> {
    CHROM_SUFFIXES.iter().position(|chrom| *chrom == suffix)
}

/// Counts reported after a merge run.
#[derive(Debug, Clone)]
pub struct MergeSummary {
    pub files_processed: usize,
    pub intervals_generated: usize,
    pub output_file: PathBuf,
}

// Boundary rows are `chrom, start, end, score`; the score is required by
// the row format but ignored for merging.
const BOUNDARY_ROW_FORMAT: [ColumnFormat; 4] = [
    ColumnFormat::Str,
    ColumnFormat::Int,
    ColumnFormat::Int,
    ColumnFormat::Float,
];

/// Collapse neighbouring breakpoints closer than `min_distance` into
/// their integer midpoint. The cursor stays put after a merge so the new
/// midpoint is re-tested against the next survivor; this ordering decides
/// which pairs merge first and is part of the contract.
pub fn merge_close_breakpoints(points: &mut Vec<i64>, min_distance: i64) {
    let mut n = 0;
    while n + 2 <= points.len() {
        if (points[n] - points[n + 1]).abs() < min_distance {
            points[n] = (points[n] + points[n + 1]) / 2;
            points.remove(n + 1);
        } else {
            n += 1;
        }
    }
}

/// Merge every `*.bed` file in `input_dir` into one cleaned boundary
/// file with header `chr\tstart\tend`.
///
/// Both the start and the end of every valid row are pooled into the
/// row's chromosome breakpoint list; the lists are sorted before
/// merging, so the result does not depend on input file order. A
/// chromosome left with fewer than 2 breakpoints contributes no
/// intervals.
pub fn merge_region_files<P: AsRef<Path>>(
    input_dir: P,
    min_distance: i64,
    output_file: Option<PathBuf>,
) -> io::Result<MergeSummary> {
    let input_dir = input_dir.as_ref();
    // The default output is not named `*.bed` so a re-run does not pick
    // up its own result as input.
    let output_file = output_file.unwrap_or_else(|| input_dir.join("merged_regions.bed.txt"));

    let mut bed_files: Vec<PathBuf> = fs::read_dir(input_dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.extension().map_or(false, |ext| ext == "bed"))
        .collect();
    bed_files.sort();

    let mut breakpoints: Vec<Vec<i64>> = vec![Vec::new(); CHROM_SUFFIXES.len()];
    for path in &bed_files {
        let raw = tsv::strip_header(tsv::load_rows(path, b'\t')?);
        for row in tsv::coerce_rows(&raw, &BOUNDARY_ROW_FORMAT) {
            let (Some(chrom), Some(start), Some(end)) =
                (row[0].str_value(), row[1].int_value(), row[2].int_value())
            else {
                continue;
            };
            let Some(index) = chrom_index(chrom) else {
                continue;
            };
            breakpoints[index].push(start);
            breakpoints[index].push(end);
        }
    }

    let mut intervals: Vec<Vec<String>> = Vec::new();
    for (index, points) in breakpoints.iter_mut().enumerate() {
        points.sort_unstable();
        merge_close_breakpoints(points, min_distance);
        for pair in points.windows(2) {
            intervals.push(vec![
                CHROM_SUFFIXES[index].to_string(),
                pair[0].to_string(),
                pair[1].to_string(),
            ]);
        }
    }

    tsv::save_rows(&output_file, Some(&["chr", "start", "end"]), &intervals, b'\t')?;

    println!(
        "\nProcessed {} files.\nGenerated {} subregions.\nNew file saved at {}",
        bed_files.len(),
        intervals.len(),
        output_file.display()
    );

    Ok(MergeSummary {
        files_processed: bed_files.len(),
        intervals_generated: intervals.len(),
        output_file,
    })
}
