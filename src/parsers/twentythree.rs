use crate::normalize::normalize_chromosome;
use crate::parsers::{screen_line, LineError, LineOutcome, RawCall};
use crate::types::{FileFormat, GenomeBuild};

/// 23andMe raw data: whitespace separated `rsid chromosome position genotype`
#[derive(Debug, Clone, Default)]
pub struct TwentyThreeAndMeParser;

impl TwentyThreeAndMeParser {
    pub fn new() -> Self {
        Self
    }

    pub fn parse_line(&self, line: &str, build: GenomeBuild) -> Result<LineOutcome, LineError> {
        if let Some(reason) = screen_line(line) {
            return Ok(LineOutcome::Skip(reason));
        }

        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 4 {
            return Err(LineError::TooFewFields {
                expected: 4,
                found: parts.len(),
            });
        }

        Ok(LineOutcome::Call(RawCall {
            id: parts[0].to_string(),
            chromosome: normalize_chromosome(parts[1], FileFormat::AndMe),
            position: parts[2].to_string(),
            genotype: parts[3].to_string(),
            build,
        }))
    }
}
