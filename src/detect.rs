//! Format and build classification from a bounded prefix of the file.

use lazy_static::lazy_static;
use regex::Regex;
use std::io::{self, BufRead};
use tracing::debug;

use crate::parsers::vcf::FIRST_SAMPLE_COLUMN;
use crate::parsers::COMMENT_MARKER;
use crate::types::{Detection, FileFormat, GenomeBuild};

/// Lines inspected by [`detect_format`] before giving up
pub const MAX_DETECT_LINES: usize = 4000;
/// Lines inspected by [`resolve_vcf_samples`] looking for `#CHROM`
pub const MAX_SAMPLE_HEADER_LINES: usize = 10_000;

/// Header signatures, checked in order; the first hit fixes the format
const SIGNATURES: [(&str, FileFormat); 4] = [
    ("23andMe", FileFormat::AndMe),
    ("AncestryDNA", FileFormat::AncestryDNA),
    ("MyHeritage", FileFormat::MyHeritage),
    ("##fileformat=VCF", FileFormat::VCF),
];

/// rs-id, build 37 position, build 36 position
const BUILD_ANCHORS: [(&str, &str, &str); 4] = [
    ("rs6681049", "800007", "789870"),
    ("rs3131972", "752721", "742584"),
    ("rs3934834", "1005806", "995669"),
    ("rs11260549", "1121794", "1111657"),
];

lazy_static! {
    static ref BUILD_DECLARATION: Regex =
        Regex::new(r"(?:build |Build: )(\d+)").expect("build declaration pattern is valid");
}

/// Classify a text stream by vendor signature and reference build.
///
/// Stops once both are known or after [`MAX_DETECT_LINES`] lines. A stream that
/// is not valid UTF-8 is an error.
pub fn detect_format<R: BufRead>(reader: R) -> io::Result<Detection> {
    let mut detection = Detection::default();

    for (index, line) in reader.lines().enumerate() {
        let line_number = index + 1;
        if line_number > MAX_DETECT_LINES || detection.is_complete() {
            break;
        }
        let line = line?;

        if line.starts_with(COMMENT_MARKER) {
            scan_header_line(&line, &mut detection);
            continue;
        }

        if line_number == 1 && line.starts_with("RSID") {
            detection.format = Some(FileFormat::FTDNA);
        }

        if !detection.build.is_known() {
            if let Some(build) = anchor_build(&line) {
                debug!("build {} inferred from anchor at line {}", build, line_number);
                detection.build = build;
            }
        }
    }

    Ok(detection)
}

fn scan_header_line(line: &str, detection: &mut Detection) {
    // VCF builds come from ##reference instead
    if detection.format != Some(FileFormat::VCF) {
        if let Some(build) = declared_build(line) {
            detection.build = build;
        }
    }

    if detection.format.is_none() {
        detection.format = SIGNATURES
            .iter()
            .find(|(marker, _)| line.contains(marker))
            .map(|(_, format)| *format);
    }

    if line.contains("##reference") {
        if line.contains("37") {
            detection.build = GenomeBuild::Build37;
        }
        if line.contains("38") {
            detection.build = GenomeBuild::Build38;
        }
    }
}

/// Build number from a "build 37" / "Build: 37" comment
pub fn declared_build(line: &str) -> Option<GenomeBuild> {
    BUILD_DECLARATION
        .captures(line)
        .and_then(|captures| captures[1].parse::<u32>().ok())
        .map(GenomeBuild::from_number)
}

/// Build pinned by a known rs-id whose position differs between builds 36 and 37
pub fn anchor_build(line: &str) -> Option<GenomeBuild> {
    let fields: Vec<&str> = if line.contains(',') {
        line.split(',').collect()
    } else {
        line.split_whitespace().collect()
    };
    if fields.len() < 3 {
        return None;
    }

    let id = fields[0].trim().trim_matches('"');
    let position = fields[2].trim().trim_matches('"');

    BUILD_ANCHORS
        .iter()
        .find(|(anchor, _, _)| *anchor == id)
        .and_then(|(_, b37, b36)| {
            if position == *b37 {
                Some(GenomeBuild::Build37)
            } else if position == *b36 {
                Some(GenomeBuild::Build36)
            } else {
                None
            }
        })
}

/// Sample indices (relative to the first sample column) whose names match `pattern`.
///
/// Returns an empty list when no `#CHROM` header appears within
/// [`MAX_SAMPLE_HEADER_LINES`] lines.
pub fn resolve_vcf_samples<R: BufRead>(reader: R, pattern: &Regex) -> io::Result<Vec<usize>> {
    for line in reader.lines().take(MAX_SAMPLE_HEADER_LINES) {
        let line = line?;
        if !line.starts_with("#CHROM") {
            continue;
        }

        let samples: Vec<&str> = line
            .split('\t')
            .skip(FIRST_SAMPLE_COLUMN)
            .map(str::trim)
            .collect();
        debug!("VCF samples: {}", samples.join(" "));

        return Ok(samples
            .iter()
            .enumerate()
            .filter(|(_, name)| pattern.is_match(name))
            .map(|(index, _)| index)
            .collect());
    }

    Ok(Vec::new())
}
