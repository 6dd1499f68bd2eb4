use crate::normalize::normalize_chromosome;
use crate::parsers::{screen_line, LineError, LineOutcome, RawCall, SkipReason};
use crate::types::{FileFormat, GenomeBuild};

/// Index of the first sample column in a VCF data line
pub const FIRST_SAMPLE_COLUMN: usize = 9;
const FORMAT_COLUMN: usize = 8;

/// Single-sample VCF reader for SNVs.
///
/// Only the first allele index of the GT subfield is read, and the resolved
/// allele is doubled into a homozygous call. Diploid GT pairs such as `0/1`
/// therefore come out as the first allele twice.
#[derive(Debug, Clone, Default)]
pub struct VcfParser {
    sample_index: usize,
}

impl VcfParser {
    /// `sample_index` counts from the first sample column
    pub fn new(sample_index: usize) -> Self {
        Self { sample_index }
    }

    pub fn parse_line(&self, line: &str, build: GenomeBuild) -> Result<LineOutcome, LineError> {
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

        let reference = parts[3];
        let alternate = parts[4];
        if reference.len() != 1 || alternate.len() != 1 {
            return Ok(LineOutcome::Skip(SkipReason::Indel));
        }

        let mut alleles = vec![reference];
        alleles.extend(alternate.split(','));

        let format = *parts.get(FORMAT_COLUMN).ok_or(LineError::TooFewFields {
            expected: FIRST_SAMPLE_COLUMN + 1,
            found: parts.len(),
        })?;
        let gt_index = format
            .split(':')
            .position(|key| key == "GT")
            .ok_or(LineError::MissingGenotypeField)?;

        let column = FIRST_SAMPLE_COLUMN + self.sample_index;
        let sample = parts
            .get(column)
            .ok_or(LineError::MissingSample { column })?;
        let gt = sample
            .split(':')
            .nth(gt_index)
            .ok_or(LineError::MissingGenotypeField)?;

        let first = gt.chars().next().ok_or(LineError::MissingGenotypeField)?;
        if first == '.' {
            return Ok(LineOutcome::Skip(SkipReason::NoCall));
        }
        let allele = first
            .to_digit(10)
            .and_then(|index| alleles.get(index as usize))
            .ok_or_else(|| LineError::InvalidAlleleIndex(gt.to_string()))?;
        // ALT "." resolved from index 1
        if *allele == "." {
            return Ok(LineOutcome::Skip(SkipReason::NoCall));
        }

        Ok(LineOutcome::Call(RawCall {
            id: parts[2].to_string(),
            chromosome: normalize_chromosome(parts[0], FileFormat::VCF),
            position: parts[1].to_string(),
            genotype: format!("{allele}{allele}"),
            build,
        }))
    }
}
