use anyhow::{bail, Context, Result};
use clap::{Args, CommandFactory, Parser, Subcommand, ValueHint};
use clap_complete::{generate, Shell};
use console::style;
use rayon::prelude::*;
use serde::Serialize;
use std::io;
use std::path::{Path, PathBuf};
use tracing::info;

use snp_ingest::{
    genotype_counts, load, save, FileFormat, GenomeBuild, GenotypeCount, LoadMeta, LoadOptions,
    SnpSet, SnpStats,
};

/// Consumer genotyping raw data loader
#[derive(Parser, Debug)]
#[command(
    name = "snp-ingest",
    version,
    about = "Load consumer genotyping raw data into normalized SNP sets",
    long_about = r#"
Reads raw data downloads from direct-to-consumer genotyping services,
detecting the vendor format and reference build automatically.

Supports 23andMe, AncestryDNA, FTDNA, MyHeritage and VCF, plain or
compressed with zip or gzip.
"#
)]
#[command(arg_required_else_help = true)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Load one or more raw data files
    Load(LoadArgs),
    /// List supported file formats
    Formats,
    /// Generate shell completions
    Completions { shell: Shell },
}

#[derive(Args, Debug)]
struct LoadArgs {
    /// Raw data files (plain, .zip or .gz)
    #[arg(value_name = "FILES", num_args = 1.., required = true, value_hint = ValueHint::FilePath)]
    files: Vec<PathBuf>,

    /// Chromosomes to keep, comma separated (default: all)
    #[arg(short, long, value_delimiter = ',')]
    chromosomes: Vec<String>,

    /// Regular expression selecting the VCF sample column
    #[arg(short, long, value_name = "PATTERN")]
    sample: Option<String>,

    /// Force the reference build instead of detecting it
    #[arg(short, long, value_name = "BUILD")]
    build: Option<u32>,

    /// TOML file with load options; command line flags take precedence
    #[arg(long, value_name = "FILE", value_hint = ValueHint::FilePath)]
    config: Option<PathBuf>,

    /// Write the loaded SNPs as a 23andMe-style file (single input only)
    #[arg(long, value_name = "OUT", value_hint = ValueHint::FilePath)]
    save: Option<PathBuf>,

    /// Build to export with --save (default: the loaded build)
    #[arg(long, value_name = "BUILD", requires = "save")]
    save_build: Option<u32>,

    /// Print per-chromosome SNP counts
    #[arg(long)]
    stats: bool,

    /// Print genotype frequencies
    #[arg(long)]
    genotypes: bool,

    /// Print results as JSON
    #[arg(long)]
    json: bool,

    /// Number of threads (0 = auto)
    #[arg(short, long, default_value = "0")]
    threads: usize,
}

impl LoadArgs {
    fn load_options(&self) -> Result<LoadOptions> {
        let mut options = match &self.config {
            Some(path) => read_config(path)?,
            None => LoadOptions::default(),
        };

        if !self.chromosomes.is_empty() {
            options = options.with_chromosomes(self.chromosomes.iter().map(|c| c.trim()));
        }
        if let Some(pattern) = &self.sample {
            options = options.with_sample_pattern(pattern.as_str());
        }
        if let Some(build) = self.build {
            options = options.with_forced_build(build);
        }

        Ok(options)
    }
}

/// Result of loading one file, as printed by `load`
#[derive(Debug, Serialize)]
struct FileSummary {
    path: PathBuf,
    #[serde(flatten)]
    meta: LoadMeta,
    snps: usize,
    chromosomes: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    stats: Option<SnpStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    genotypes: Option<Vec<GenotypeCount>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    saved: Option<usize>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Completions { shell } => {
            generate_completions(shell);
            Ok(())
        }
        Commands::Formats => {
            list_formats();
            Ok(())
        }
        Commands::Load(args) => {
            init_logging(cli.verbose);
            run_load(args)
        }
    }
}

fn generate_completions(shell: Shell) {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    generate(shell, &mut cmd, name, &mut io::stdout());
}

fn list_formats() {
    println!("{}", style("Supported Raw Data Formats:").bold().cyan());
    println!();

    for format in FileFormat::ALL {
        let (ext, desc) = match format {
            FileFormat::AndMe => ("23andMe raw data (.txt, .zip)", "Tab separated, one genotype column"),
            FileFormat::AncestryDNA => ("AncestryDNA (.txt, .zip)", "Tab separated, two allele columns"),
            FileFormat::FTDNA => ("Family Tree DNA (.csv, .csv.gz)", "Quoted CSV with RSID header"),
            FileFormat::MyHeritage => ("MyHeritage (.csv, .zip)", "Quoted CSV, FTDNA layout"),
            FileFormat::VCF => ("Variant Call Format (.vcf, .vcf.gz)", "SNVs from one sample column"),
        };
        println!(
            "  {} ({}) - {}",
            style(format.display_name()).green().bold(),
            format.as_str(),
            style(ext).yellow()
        );
        println!("         {}", style(desc).dim());
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(format!("snp_ingest={}", level))
        .with_writer(io::stderr)
        .init();
}

fn init_thread_pool(threads: usize) -> Result<()> {
    let num_threads = if threads == 0 {
        num_cpus::get()
    } else {
        threads
    };

    rayon::ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .build_global()
        .map_err(|e| anyhow::anyhow!("Failed to initialize thread pool: {}", e))?;

    Ok(())
}

fn read_config(path: &Path) -> Result<LoadOptions> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    toml::from_str(&contents).with_context(|| format!("Invalid config {}", path.display()))
}

fn run_load(args: LoadArgs) -> Result<()> {
    if args.save.is_some() && args.files.len() != 1 {
        bail!("--save takes exactly one input file, got {}", args.files.len());
    }

    let options = args.load_options()?;
    init_thread_pool(args.threads)?;
    info!(
        "Loading {} files on {} threads",
        args.files.len(),
        rayon::current_num_threads()
    );

    let loaded: Vec<(PathBuf, SnpSet, LoadMeta)> = args
        .files
        .par_iter()
        .map(|path| {
            let (snps, meta) = load(path, &options);
            (path.clone(), snps, meta)
        })
        .collect();

    let mut summaries = Vec::with_capacity(loaded.len());
    for (path, snps, meta) in loaded {
        let saved = match &args.save {
            Some(out) => {
                let build = args.save_build.map(GenomeBuild::from_number).unwrap_or(meta.build);
                Some(save(out, &snps, build)?)
            }
            None => None,
        };

        summaries.push(FileSummary {
            path,
            snps: snps.len(),
            chromosomes: snps.chromosome_count(),
            stats: args.stats.then(|| SnpStats::from_set(&snps)),
            genotypes: args.genotypes.then(|| genotype_counts(&snps)),
            saved,
            meta,
        });
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summaries)?);
    } else {
        for summary in &summaries {
            print_summary(summary, args.save.as_deref());
        }
    }

    Ok(())
}

fn print_summary(summary: &FileSummary, saved_to: Option<&Path>) {
    println!("{}", style(summary.path.display()).bold().cyan());

    let Some(format) = summary.meta.format else {
        println!("  {} format not recognized", style("✗").red());
        return;
    };
    println!(
        "  {} {} (build {}): {} SNPs on {} chromosomes from {} accepted lines",
        style("✓").green(),
        style(format.display_name()).green(),
        summary.meta.build,
        summary.snps,
        summary.chromosomes,
        summary.meta.total
    );
    if !summary.meta.build.is_supported() {
        println!("  {} build {} is not supported", style("!").yellow(), summary.meta.build);
    }

    if let Some(stats) = &summary.stats {
        for count in &stats.chromosomes {
            println!("    {:>3}  {}", count.chromosome, count.snps);
        }
        println!("    {}  {}", style("all").dim(), stats.total);
    }

    if let Some(genotypes) = &summary.genotypes {
        for count in genotypes {
            println!("    {:>2}  {}", count.genotype, count.count);
        }
    }

    if let (Some(written), Some(out)) = (summary.saved, saved_to) {
        println!(
            "  {} {} SNPs saved to: {}",
            style("✓").green().bold(),
            written,
            style(out.display()).cyan()
        );
    }
}
