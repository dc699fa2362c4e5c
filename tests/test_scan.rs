use std::fs;
use std::path::{Path, PathBuf};

use chromascan::scan::{run_scan, RandomizeMethod, ScanConfig};
use chromascan::signal::HistoneMark;
use tempfile::TempDir;

const N_BINS: usize = 20;
const TAD_BINS: std::ops::Range<usize> = 5..15;

/// A call file whose H3K27ac column is 1 inside the TAD bins for "mal"
/// samples and 0 everywhere else.
fn call_file_content(sample: &str, is_mal: bool) -> String {
    let mut content = format!("{}\nH3K27ac\tH3K4me1\n", sample);
    for bin in 0..N_BINS {
        let value = if is_mal && TAD_BINS.contains(&bin) { 1 } else { 0 };
        content.push_str(&format!("{}\t0\n", value));
    }
    content
}

/// Eight samples on chrX, four per group, with a grouping file whose
/// templates carry the chromosome wildcard.
fn setup_samples(dir: &Path) -> PathBuf {
    let mut grouping = String::new();
    for i in 1..=8 {
        let is_mal = i > 4;
        let name = format!("s{}_chrX_binary.txt", i);
        fs::write(dir.join(&name), call_file_content(&format!("s{}", i), is_mal)).unwrap();
        grouping.push_str(&format!(
            "{}/s{}_*_binary.txt\t{}\n",
            dir.display(),
            i,
            if is_mal { "mal" } else { "fem" }
        ));
    }
    let grouping_file = dir.join("grouping.txt");
    fs::write(&grouping_file, grouping).unwrap();
    grouping_file
}

fn base_config(dir: &Path, grouping_file: PathBuf) -> ScanConfig {
    ScanConfig {
        grouping_file,
        region_file: None,
        chrom: Some("chrX".to_string()),
        mark: HistoneMark::H3K27ac,
        test_size: 0.3,
        tot_random_states: 3,
        bin_size: 200,
        inter_region_tested: true,
        output_file: dir.join("output.txt"),
        randomize: None,
        label_seed: 0,
        rf_seed: 0,
        verbose: false,
    }
}

#[test]
fn tad_with_group_difference_scores_perfectly() {
    let dir = TempDir::new().unwrap();
    let grouping_file = setup_samples(dir.path());
    let region_file = dir.path().join("regions.txt");
    fs::write(&region_file, "chr\tstart\tend\nX\t1000\t3000\n").unwrap();

    let mut config = base_config(dir.path(), grouping_file);
    config.region_file = Some(region_file);
    let scores = run_scan(&config).unwrap();

    assert_eq!(scores.len(), 1);
    let records = &scores[0];
    assert_eq!(records.len(), 3);
    assert_eq!(records[0].region_id, "chrX_0-1000_Starting");
    assert_eq!(records[1].region_id, "chrX_1000-3000_TAD");
    assert_eq!(records[2].region_id, "chrX_3000-4000_Ending");

    // The TAD bins separate the groups exactly; the flanks carry no
    // signal, so the constant prediction gets one of the two held-out
    // rows right.
    for record in records {
        assert_eq!(record.scores.len(), 3);
        assert!(record.scores.iter().all(|s| (0.0..=1.0).contains(s)));
    }
    assert!(records[1].scores.iter().all(|s| *s == 1.0));
    assert!(records[0].scores.iter().all(|s| *s == 0.5));
    assert!(records[2].scores.iter().all(|s| *s == 0.5));
}

#[test]
fn score_table_is_written_with_header_and_region_ids() {
    let dir = TempDir::new().unwrap();
    let grouping_file = setup_samples(dir.path());
    let region_file = dir.path().join("regions.txt");
    fs::write(&region_file, "chr\tstart\tend\nX\t1000\t3000\n").unwrap();

    let mut config = base_config(dir.path(), grouping_file);
    config.region_file = Some(region_file);
    run_scan(&config).unwrap();

    let output = fs::read_to_string(dir.path().join("output.txt")).unwrap();
    let lines: Vec<&str> = output.lines().collect();
    assert_eq!(lines[0], "chrom_init-end_region");
    assert_eq!(lines.len(), 4);
    for line in &lines[1..] {
        let fields: Vec<&str> = line.split('\t').collect();
        assert_eq!(fields.len(), 4);
        for score in &fields[1..] {
            let value: f64 = score.parse().unwrap();
            assert!((0.0..=1.0).contains(&value));
        }
    }
}

#[test]
fn repeated_runs_are_bit_identical() {
    let dir = TempDir::new().unwrap();
    let grouping_file = setup_samples(dir.path());
    let region_file = dir.path().join("regions.txt");
    fs::write(&region_file, "chr\tstart\tend\nX\t1000\t3000\n").unwrap();

    let mut config = base_config(dir.path(), grouping_file);
    config.region_file = Some(region_file);
    let first = run_scan(&config).unwrap();
    let second = run_scan(&config).unwrap();
    assert_eq!(first, second);
}

#[test]
fn no_region_file_tests_the_whole_chromosome_as_ending() {
    let dir = TempDir::new().unwrap();
    let grouping_file = setup_samples(dir.path());

    let config = base_config(dir.path(), grouping_file);
    let scores = run_scan(&config).unwrap();

    assert_eq!(scores[0].len(), 1);
    assert_eq!(scores[0][0].region_id, "chrX_0-4000_Ending");
    // The whole chromosome includes the separating TAD bins.
    assert!(scores[0][0].scores.iter().all(|s| *s == 1.0));
}

#[test]
fn scrambled_labels_still_produce_bounded_scores() {
    let dir = TempDir::new().unwrap();
    let grouping_file = setup_samples(dir.path());

    let mut config = base_config(dir.path(), grouping_file);
    config.randomize = Some(RandomizeMethod::Scramble);
    config.label_seed = 42;
    let first = run_scan(&config).unwrap();
    let second = run_scan(&config).unwrap();

    assert_eq!(first, second);
    assert!(first[0][0].scores.iter().all(|s| (0.0..=1.0).contains(s)));
}

#[test]
fn three_group_labels_abort_before_any_sample_file_is_read() {
    let dir = TempDir::new().unwrap();
    // Templates point at files that do not exist; the label check has
    // to fire first.
    let grouping_file = dir.path().join("grouping.txt");
    fs::write(
        &grouping_file,
        "missing/a_*.txt\tfem\nmissing/b_*.txt\tmal\nmissing/c_*.txt\tother\n",
    )
    .unwrap();

    let config = base_config(dir.path(), grouping_file);
    let error = run_scan(&config).unwrap_err();
    assert_eq!(error.kind(), std::io::ErrorKind::InvalidData);
    assert!(error.to_string().contains("exactly 2"));
}

#[test]
fn only_the_first_chromosome_table_is_persisted() {
    let dir = TempDir::new().unwrap();
    // Reuse the chrX call files for every chromosome by leaving the
    // wildcard out of the templates.
    let mut grouping = String::new();
    for i in 1..=8 {
        let is_mal = i > 4;
        let name = format!("s{}_chrX_binary.txt", i);
        fs::write(dir.path().join(&name), call_file_content(&format!("s{}", i), is_mal))
            .unwrap();
        grouping.push_str(&format!(
            "{}/{}\t{}\n",
            dir.path().display(),
            name,
            if is_mal { "mal" } else { "fem" }
        ));
    }
    let grouping_file = dir.path().join("grouping.txt");
    fs::write(&grouping_file, grouping).unwrap();

    let mut config = base_config(dir.path(), grouping_file);
    config.chrom = None;
    config.tot_random_states = 1;
    let scores = run_scan(&config).unwrap();

    // chr1..chr22, chrX and the two filtered chrX variants.
    assert_eq!(scores.len(), 25);
    assert_eq!(scores[0][0].region_id, "chr1_0-4000_Ending");
    assert_eq!(scores[22][0].region_id, "chrX_0-4000_Ending");
    // The PAR filter drops every bin of this short test chromosome, so
    // the filtered variants have nothing to score.
    assert!(scores[23].is_empty());
    assert!(scores[24].is_empty());

    let output = fs::read_to_string(dir.path().join("output.txt")).unwrap();
    let lines: Vec<&str> = output.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[1].starts_with("chr1_"));
}
