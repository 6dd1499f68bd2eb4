//! Ingestion driver: classify a genotype export, parse it with the matching
//! vendor parser and accumulate a normalized [`SnpSet`].

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::io::{self, BufRead};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info, trace, warn};

use crate::detect::{detect_format, resolve_vcf_samples};
use crate::normalize::{
    canonical_chromosome, is_no_call, normalize_genotype, UNMAPPED_CHROMOSOME,
};
use crate::parsers::{FormatParser, LineOutcome, RawCall};
use crate::preprocess::{preprocess, PreprocessError, WorkingCopy};
use crate::types::{Detection, FileFormat, GenomeBuild, LoadMeta, SnpRecord, SnpSet};

/// Caller-supplied settings for one load
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadOptions {
    /// Canonical chromosome symbols to keep; empty keeps everything
    pub chromosomes: HashSet<String>,
    /// Regular expression selecting the VCF sample column; empty matches the first sample
    pub sample_pattern: String,
    /// Overrides the detected build when set to a non-zero value
    pub forced_build: Option<u32>,
}

impl LoadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_chromosomes<I, S>(mut self, chromosomes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.chromosomes = chromosomes.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_sample_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.sample_pattern = pattern.into();
        self
    }

    pub fn with_forced_build(mut self, build: u32) -> Self {
        self.forced_build = Some(build);
        self
    }

    pub fn accepts(&self, chromosome: &str) -> bool {
        self.chromosomes.is_empty() || self.chromosomes.contains(chromosome)
    }

    fn forced(&self) -> Option<GenomeBuild> {
        self.forced_build
            .filter(|&build| build != 0)
            .map(GenomeBuild::from_number)
    }
}

/// Failures that end a load before any record is parsed
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("failed to prepare input: {0}")]
    Preprocess(#[from] PreprocessError),

    #[error("format autodetection failed: {0}")]
    Detection(#[source] io::Error),

    #[error("invalid VCF sample pattern: {0}")]
    SamplePattern(#[from] regex::Error),

    #[error("no parser for file (build {build}, format undetected)")]
    UnsupportedFormat { build: GenomeBuild },
}

/// Progress of a single load
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    Start,
    Preprocessed,
    Classified,
    Parsing,
    Done,
    Failed,
}

/// A classified input, ready to be parsed
#[derive(Debug)]
pub struct Classification {
    pub working: WorkingCopy,
    pub detection: Detection,
    /// Sample column for VCF inputs, relative to the first sample
    pub sample_index: usize,
}

/// Load a genotype export into a normalized SNP set.
///
/// Never fails: every failure mode yields an empty set (or the records read
/// before a decode fault) and is reported through `tracing`.
pub fn load(path: impl AsRef<Path>, options: &LoadOptions) -> (SnpSet, LoadMeta) {
    let mut ingestion = Ingestion::new(options);
    ingestion.run(path.as_ref());
    ingestion.finish()
}

/// Decompress and classify `path` without parsing it
pub fn classify(path: &Path, options: &LoadOptions) -> Result<Classification, LoadError> {
    classify_working(preprocess(path)?, options)
}

/// Detect format and build of an already decompressed copy, resolving the VCF sample
fn classify_working(
    working: WorkingCopy,
    options: &LoadOptions,
) -> Result<Classification, LoadError> {
    let detection = detect_format(working.open().map_err(LoadError::Detection)?)
        .map_err(LoadError::Detection)?;

    let mut sample_index = 0;
    if detection.format == Some(FileFormat::VCF) {
        let pattern = Regex::new(&options.sample_pattern)?;
        let reader = working.open().map_err(LoadError::Detection)?;
        let matches = resolve_vcf_samples(reader, &pattern).map_err(LoadError::Detection)?;
        if let Some(&first) = matches.first() {
            sample_index = first;
        }
        debug!("VCF sample idx: {}", sample_index);
    }

    Ok(Classification {
        working,
        detection,
        sample_index,
    })
}

/// Format and build of `path` as the loader would see them
pub fn detect_file(path: &Path) -> Result<Detection, LoadError> {
    Ok(classify(path, &LoadOptions::default())?.detection)
}

struct Ingestion<'a> {
    options: &'a LoadOptions,
    state: LoadState,
    transitions: Vec<LoadState>,
    snps: SnpSet,
    meta: LoadMeta,
}

impl<'a> Ingestion<'a> {
    fn new(options: &'a LoadOptions) -> Self {
        Self {
            options,
            state: LoadState::Start,
            transitions: Vec::new(),
            snps: SnpSet::new(),
            meta: LoadMeta::default(),
        }
    }

    fn advance(&mut self, state: LoadState) {
        trace!("load state {:?} -> {:?}", self.state, state);
        self.state = state;
        self.transitions.push(state);
    }

    fn run(&mut self, path: &Path) {
        let working = match preprocess(path) {
            Ok(working) => working,
            Err(e) => {
                warn!("FORMAT AUTODETECT FAILED for {}: {}", path.display(), e);
                self.advance(LoadState::Failed);
                return;
            }
        };
        self.advance(LoadState::Preprocessed);

        let classification = match classify_working(working, self.options) {
            Ok(classification) => classification,
            Err(e) => {
                warn!("FORMAT AUTODETECT FAILED for {}: {}", path.display(), e);
                self.advance(LoadState::Failed);
                return;
            }
        };

        let Classification {
            working,
            detection,
            sample_index,
        } = classification;
        let build = self.options.forced().unwrap_or(detection.build);
        self.meta.build = build;
        self.meta.format = detection.format;
        self.advance(LoadState::Classified);

        let Some(format) = detection.format else {
            warn!(
                "{}: {}",
                path.display(),
                LoadError::UnsupportedFormat { build }
            );
            self.advance(LoadState::Failed);
            return;
        };
        info!(
            "{}: detected format {}, build {}",
            path.display(),
            format,
            build
        );

        let parser = FormatParser::for_format(format, sample_index);
        let reader = match working.open() {
            Ok(reader) => reader,
            Err(e) => {
                warn!("failed to reopen working copy of {}: {}", path.display(), e);
                self.advance(LoadState::Failed);
                return;
            }
        };

        self.advance(LoadState::Parsing);
        if let Err(e) = self.ingest(reader, &parser, build) {
            warn!(
                "stopped reading {}: {}; keeping {} records",
                path.display(),
                e,
                self.meta.total
            );
            self.advance(LoadState::Failed);
            return;
        }

        if !build.is_supported() {
            warn!("BUILD NOT SUPPORTED: {} ({})", build, path.display());
        }
        info!("{}: loaded {} SNPs", path.display(), self.meta.total);
        self.advance(LoadState::Done);
    }

    /// Stream every line through `parser`; an I/O or decode fault ends the stream
    fn ingest<R: BufRead>(
        &mut self,
        mut reader: R,
        parser: &FormatParser,
        build: GenomeBuild,
    ) -> io::Result<()> {
        let mut line = String::new();
        let mut line_number = 0usize;

        loop {
            line.clear();
            if reader.read_line(&mut line)? == 0 {
                return Ok(());
            }
            line_number += 1;

            let raw = match parser.parse_line(&line, build) {
                Ok(LineOutcome::Call(raw)) => raw,
                Ok(LineOutcome::Skip(reason)) => {
                    trace!("line {} skipped: {:?}", line_number, reason);
                    continue;
                }
                Err(e) => {
                    debug!("line {} rejected: {}", line_number, e);
                    continue;
                }
            };

            let Some(record) = finish_call(raw) else {
                continue;
            };
            if self.options.accepts(&record.chromosome) {
                self.snps.insert(record);
                self.meta.total += 1;
            }
        }
    }

    fn finish(self) -> (SnpSet, LoadMeta) {
        (self.snps, self.meta)
    }
}

/// Drop no-calls and unmapped chromosomes, then canonicalize the rest
fn finish_call(raw: RawCall) -> Option<SnpRecord> {
    if is_no_call(&raw.genotype) {
        return None;
    }
    let chromosome = canonical_chromosome(&raw.chromosome).to_string();
    if chromosome == UNMAPPED_CHROMOSOME {
        return None;
    }
    if raw.genotype.chars().count() > 2 {
        return None;
    }
    let genotype = normalize_genotype(&raw.genotype, &chromosome);
    Some(raw.into_record(chromosome, genotype))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_file(contents: &[u8]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents).unwrap();
        file.flush().unwrap();
        file
    }

    fn raw(chromosome: &str, genotype: &str) -> RawCall {
        RawCall {
            id: "rs1".to_string(),
            chromosome: chromosome.to_string(),
            position: "10".to_string(),
            genotype: genotype.to_string(),
            build: GenomeBuild::Build37,
        }
    }

    #[test]
    fn test_finish_call_rules() {
        assert!(finish_call(raw("1", "--")).is_none());
        assert!(finish_call(raw("0", "AG")).is_none());
        assert!(finish_call(raw("chrUn", "AG")).is_none());
        assert!(finish_call(raw("1", "AGT")).is_none());

        let folded = finish_call(raw("YAUTO", "TC")).unwrap();
        assert_eq!(folded.chromosome, "XY");
        assert_eq!(folded.genotype, "CT");

        assert_eq!(finish_call(raw("MT", "G")).unwrap().genotype, "G");
        assert_eq!(finish_call(raw("X", "G")).unwrap().genotype, "GG");
    }

    #[test]
    fn test_state_reaches_done() {
        let file = write_file(b"# 23andMe build 37\nrs1\t1\t100\tAG\n");
        let options = LoadOptions::default();
        let mut ingestion = Ingestion::new(&options);
        ingestion.run(file.path());
        assert_eq!(ingestion.state, LoadState::Done);
        assert_eq!(ingestion.meta.total, 1);
        assert_eq!(
            ingestion.transitions,
            vec![
                LoadState::Preprocessed,
                LoadState::Classified,
                LoadState::Parsing,
                LoadState::Done,
            ]
        );
    }

    #[test]
    fn test_state_fails_on_unknown_format() {
        let file = write_file(b"nothing recognizable here\n");
        let options = LoadOptions::default();
        let mut ingestion = Ingestion::new(&options);
        ingestion.run(file.path());
        assert_eq!(ingestion.state, LoadState::Failed);
        assert_eq!(ingestion.meta, LoadMeta::default());
        assert_eq!(
            ingestion.transitions,
            vec![LoadState::Preprocessed, LoadState::Classified, LoadState::Failed]
        );
    }

    #[test]
    fn test_unreadable_input_fails_before_preprocessing() {
        let dir = tempfile::TempDir::new().unwrap();
        let options = LoadOptions::default();
        let mut ingestion = Ingestion::new(&options);
        ingestion.run(&dir.path().join("absent.txt"));
        assert_eq!(ingestion.transitions, vec![LoadState::Failed]);
    }

    #[test]
    fn test_bad_sample_pattern_fails_after_preprocessing() {
        let file = write_file(
            b"##fileformat=VCFv4.2\n#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\ts1\n",
        );
        let options = LoadOptions::default().with_sample_pattern("(unclosed");
        let mut ingestion = Ingestion::new(&options);
        ingestion.run(file.path());
        assert_eq!(
            ingestion.transitions,
            vec![LoadState::Preprocessed, LoadState::Failed]
        );
    }

    #[test]
    fn test_decode_fault_keeps_partial_results() {
        let file = write_file(
            b"# 23andMe build 37\nrs1\t1\t100\tAG\nrs2\t1\t200\tCT\nrs3\t1\t300\t\xff\xfe\nrs4\t1\t400\tAA\n",
        );

        let options = LoadOptions::default();
        let mut ingestion = Ingestion::new(&options);
        ingestion.run(file.path());

        assert_eq!(ingestion.state, LoadState::Failed);
        assert!(ingestion.snps.get("1", "200").is_some());
        assert!(ingestion.snps.get("1", "400").is_none());
        assert_eq!(ingestion.meta.total, 2);
        assert_eq!(ingestion.meta.format, Some(FileFormat::AndMe));
    }

    #[test]
    fn test_invalid_sample_pattern_fails_classification() {
        let file = write_file(
            b"##fileformat=VCFv4.2\n#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\ts1\n",
        );
        let options = LoadOptions::default().with_sample_pattern("(unclosed");
        assert!(matches!(
            classify(file.path(), &options),
            Err(LoadError::SamplePattern(_))
        ));

        let (snps, meta) = load(file.path(), &options);
        assert!(snps.is_empty());
        assert_eq!(meta, LoadMeta::default());
    }

    #[test]
    fn test_forced_build_overrides_detection() {
        let file = write_file(b"# 23andMe build 37\nrs1\t1\t100\tAG\n");
        let options = LoadOptions::default().with_forced_build(36);
        let (snps, meta) = load(file.path(), &options);

        assert_eq!(meta.build, GenomeBuild::Build36);
        let record = snps.get("1", "100").unwrap();
        assert_eq!(record.position_for(GenomeBuild::Build36), Some("100"));
    }

    #[test]
    fn test_zero_forced_build_is_ignored() {
        let file = write_file(b"# 23andMe build 37\nrs1\t1\t100\tAG\n");
        let (_, meta) = load(file.path(), &LoadOptions::default().with_forced_build(0));
        assert_eq!(meta.build, GenomeBuild::Build37);
    }

    #[test]
    fn test_options_from_toml() {
        let options: LoadOptions = toml::from_str(
            r#"
chromosomes = ["1", "X"]
sample_pattern = "NA12878"
forced_build = 38
"#,
        )
        .unwrap();
        assert!(options.accepts("X"));
        assert!(!options.accepts("2"));
        assert_eq!(options.forced(), Some(GenomeBuild::Build38));

        let defaults: LoadOptions = toml::from_str("").unwrap();
        assert_eq!(defaults, LoadOptions::default());
    }
}
