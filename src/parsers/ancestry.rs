use crate::normalize::normalize_chromosome;
use crate::parsers::{screen_line, LineError, LineOutcome, RawCall, SkipReason};
use crate::types::{FileFormat, GenomeBuild};

/// AncestryDNA raw data: `rsid chromosome position allele1 allele2`, with
/// chromosomes 23-26 standing for X, Y, pseudo-autosomal Y and MT.
///
/// Ancestry writes no-calls as alleles `0 0`; they pass through as genotype
/// `"00"` since only a leading `-` marks a no-call.
#[derive(Debug, Clone, Default)]
pub struct AncestryDNAParser;

impl AncestryDNAParser {
    pub fn new() -> Self {
        Self
    }

    pub fn parse_line(&self, line: &str, build: GenomeBuild) -> Result<LineOutcome, LineError> {
        if line.contains("allele1") && line.contains("allele2") {
            return Ok(LineOutcome::Skip(SkipReason::Header));
        }
        if let Some(reason) = screen_line(line) {
            return Ok(LineOutcome::Skip(reason));
        }

        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 5 {
            return Err(LineError::TooFewFields {
                expected: 5,
                found: parts.len(),
            });
        }

        Ok(LineOutcome::Call(RawCall {
            id: parts[0].to_string(),
            chromosome: normalize_chromosome(parts[1], FileFormat::AncestryDNA),
            position: parts[2].to_string(),
            genotype: format!("{}{}", parts[3], parts[4]),
            build,
        }))
    }
}
