use clap::{Args, Parser, Subcommand};
use chromascan::{merge, scan, signal};
use std::io;
use std::path::PathBuf;

/// Chromascan: differential chromatin-state scanning over TAD segments
#[derive(Parser, Debug)]
#[command(
    name = "chromascan",
    about = "Detect differential binarized ChIP-seq patterns between two sample groups, region by region",
    version,
    propagate_version = true,
    arg_required_else_help = true
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Merge TAD boundary BED files into one cleaned boundary file
    MergeRegions(MergeRegionsArgs),
    /// Score two-group classification accuracy per TAD and inter-TAD segment
    TestPrediction(TestPredictionArgs),
}

#[derive(Args, Debug)]
struct MergeRegionsArgs {
    /// Directory containing the input *.bed boundary files
    #[arg(short, long, value_name = "DIR")]
    input_dir: PathBuf,
    /// Breakpoints closer than this many bp are collapsed into their midpoint
    #[arg(long, value_name = "BP", default_value_t = 1000)]
    min_distance: i64,
    /// Output boundary file (default: <input-dir>/merged_regions.bed.txt)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct TestPredictionArgs {
    /// Grouping file: one `pathTemplate<TAB>groupLabel` row per sample;
    /// `*` in the template stands for the chromosome name
    #[arg(short, long, value_name = "FILE")]
    grouping: PathBuf,
    /// Cleaned TAD boundary file; omit to test whole chromosomes
    #[arg(short, long, value_name = "FILE")]
    region_file: Option<PathBuf>,
    /// Histone mark: ac/H3K27ac or me1/H3K4me1
    #[arg(long, default_value = "ac")]
    histmod: String,
    /// Single chromosome (e.g. chrX, chrXnoPAR); omit to scan all
    #[arg(long, value_name = "CHROM")]
    chrom: Option<String>,
    /// Held-out fraction of each group per split
    #[arg(long, default_value_t = 0.3)]
    test_size: f64,
    /// Number of repeated random splits per segment
    #[arg(long, default_value_t = 11)]
    random_states: usize,
    /// Genomic bin width in bp
    #[arg(long, default_value_t = 200)]
    bin_size: usize,
    /// Output score table
    #[arg(short, long, value_name = "FILE", default_value = "output.txt")]
    output: PathBuf,
    /// Permute group labels to build a null comparison
    #[arg(long)]
    randomize: bool,
    /// scramble (preserves label counts) or coin (uniform redraw)
    #[arg(long, value_name = "METHOD", default_value = "scramble")]
    randomize_method: String,
    /// Seed for label permutation
    #[arg(long, default_value_t = 0)]
    label_seed: u64,
    /// Seed for forest training
    #[arg(long, default_value_t = 0)]
    rf_seed: u64,
    /// Score TAD segments only, skipping Starting/interTAD/Ending stretches
    #[arg(long)]
    skip_inter_regions: bool,
    /// Print per-file progress and exclusion warnings
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> io::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::MergeRegions(args) => {
            merge::merge_region_files(&args.input_dir, args.min_distance, args.output)?;
        }
        Command::TestPrediction(args) => {
            let mark = signal::HistoneMark::parse(&args.histmod).ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("unknown histone mark: {}", args.histmod),
                )
            })?;
            let randomize = if args.randomize {
                Some(match args.randomize_method.as_str() {
                    "scramble" => scan::RandomizeMethod::Scramble,
                    "coin" => scan::RandomizeMethod::Coin,
                    other => {
                        return Err(io::Error::new(
                            io::ErrorKind::InvalidInput,
                            format!("unknown randomize method: {}", other),
                        ))
                    }
                })
            } else {
                None
            };

            let config = scan::ScanConfig {
                grouping_file: args.grouping,
                region_file: args.region_file,
                chrom: args.chrom,
                mark,
                test_size: args.test_size,
                tot_random_states: args.random_states,
                bin_size: args.bin_size,
                inter_region_tested: !args.skip_inter_regions,
                output_file: args.output,
                randomize,
                label_seed: args.label_seed,
                rf_seed: args.rf_seed,
                verbose: args.verbose,
            };
            scan::run_scan(&config)?;
        }
    }

    Ok(())
}
