//! # SNP Ingest
//!
//! Loader for consumer genotyping raw data exports.
//!
//! ## Features
//!
//! - Format and reference build autodetection from file headers and anchor SNPs
//! - Parsers for 23andMe, AncestryDNA, FTDNA, MyHeritage and single-sample VCF
//! - Transparent zip and gzip decompression
//! - Normalized chromosome symbols and sorted, de-duplicated genotypes
//! - 23andMe-style export with per-chromosome and genotype statistics

pub mod detect;
pub mod loader;
pub mod normalize;
pub mod output;
pub mod parsers;
pub mod preprocess;
pub mod types;

// Re-export key types
pub use detect::detect_format;
pub use loader::{classify, detect_file, load, LoadError, LoadOptions};
pub use output::{genotype_counts, save, GenotypeCount, SnpStats};
pub use parsers::{FormatParser, LineError, LineOutcome};
pub use types::*;
