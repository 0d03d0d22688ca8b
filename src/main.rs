use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

use clap::Parser;
use log::{error, info};

use mzinspect::{
    AnalyteList, ConfigurationError, DuplicateAnalytePolicy, InspectError, OutputFormat,
    ReportAssembler, SearchParameters, TargetedSearch,
};

/// Search spectrum files for targeted analytes and summarize their quantifier signal
#[derive(Debug, Parser)]
#[command(author, version, about, allow_negative_numbers = true)]
struct Cli {
    /// The earliest scan time to search, in seconds
    rt_start: f64,
    /// The latest scan time to search, in seconds
    rt_stop: f64,
    /// Precursor tolerance below the target m/z, in ppm
    precursor_tol_lower: f64,
    /// Precursor tolerance above the target m/z, in ppm
    precursor_tol_upper: f64,
    /// Fragment tolerance below the target m/z, in ppm
    fragment_tol_lower: f64,
    /// Fragment tolerance above the target m/z, in ppm
    fragment_tol_upper: f64,
    /// Delimited target list with the columns `name`, `precursor_mz`, `quantifier_mz`
    /// and `qualifier_mz`
    analytes_file: PathBuf,
    /// The directory to write result tables to, created if missing
    output_folder: PathBuf,
    /// The mzML or MGF files to search
    #[arg(required = true)]
    spectrum_paths: Vec<PathBuf>,
    /// The format to write result tables in (`tsv` or `xlsx`)
    #[arg(long, default_value_t = String::from("tsv"))]
    output_type: String,
    /// Fail if the target list names the same analyte more than once instead of merging
    /// their matches
    #[arg(long)]
    reject_duplicate_analytes: bool,
    /// Only keep fragment matches whose selected precursor is in the analyte's precursor
    /// window
    #[arg(long)]
    require_precursor_match: bool,
    /// The number of files to search concurrently
    #[cfg(feature = "parallelism")]
    #[arg(long)]
    threads: Option<usize>,
}

impl Cli {
    fn parameters(&self) -> Result<SearchParameters, ConfigurationError> {
        Ok(SearchParameters::new(
            self.rt_start,
            self.rt_stop,
            self.precursor_tol_lower,
            self.precursor_tol_upper,
            self.fragment_tol_lower,
            self.fragment_tol_upper,
        )?
        .with_precursor_requirement(self.require_precursor_match))
    }

    fn duplicate_policy(&self) -> DuplicateAnalytePolicy {
        if self.reject_duplicate_analytes {
            DuplicateAnalytePolicy::Reject
        } else {
            DuplicateAnalytePolicy::Merge
        }
    }
}

fn run(cli: &Cli) -> Result<(), InspectError> {
    let format: OutputFormat = cli.output_type.parse()?;
    let params = cli.parameters()?;

    #[cfg(feature = "parallelism")]
    if let Some(threads) = cli.threads {
        if let Err(e) = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
        {
            log::warn!("Failed to configure {threads} threads: {e}");
        }
    }

    let analytes = AnalyteList::open_path(
        &cli.analytes_file,
        params.precursor_tolerance,
        params.fragment_tolerance,
        cli.duplicate_policy(),
    )?;
    info!(
        "Loaded {} analytes from {}",
        analytes.len(),
        cli.analytes_file.display()
    );

    let search = TargetedSearch::new(&analytes, params);
    let buckets = search.search_files(&cli.spectrum_paths)?;
    let report = ReportAssembler::from_buckets(&buckets)?;

    fs::create_dir_all(&cli.output_folder)?;
    report.write_to_dir(&cli.output_folder, format)?;
    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let start = Instant::now();
    match run(&cli) {
        Ok(()) => {
            let elapsed = Instant::now() - start;
            info!("Finished in {:0.2} seconds", elapsed.as_secs_f64());
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}
