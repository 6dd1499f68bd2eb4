use crate::normalize::normalize_chromosome;
use crate::parsers::{screen_line, LineError, LineOutcome, RawCall, SkipReason};
use crate::types::{FileFormat, GenomeBuild};

/// FamilyTreeDNA and MyHeritage raw data: comma separated, optionally quoted
/// `RSID,CHROMOSOME,POSITION,RESULT`
#[derive(Debug, Clone, Default)]
pub struct FtdnaParser;

impl FtdnaParser {
    pub fn new() -> Self {
        Self
    }

    pub fn parse_line(&self, line: &str, build: GenomeBuild) -> Result<LineOutcome, LineError> {
        if let Some(reason) = screen_line(line) {
            return Ok(LineOutcome::Skip(reason));
        }
        if line.starts_with("RSID") {
            return Ok(LineOutcome::Skip(SkipReason::Header));
        }

        let parts: Vec<&str> = line.split(',').collect();
        if parts.len() < 4 {
            return Err(LineError::TooFewFields {
                expected: 4,
                found: parts.len(),
            });
        }

        Ok(LineOutcome::Call(RawCall {
            id: unquote(parts[0]).to_string(),
            chromosome: normalize_chromosome(unquote(parts[1]), FileFormat::FTDNA),
            position: unquote(parts[2]).to_string(),
            genotype: unquote(parts[3].trim()).to_string(),
            build,
        }))
    }
}

fn unquote(field: &str) -> &str {
    field.trim_matches('"')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(line: &str) -> RawCall {
        match FtdnaParser::new().parse_line(line, GenomeBuild::Build37) {
            Ok(LineOutcome::Call(call)) => call,
            other => panic!("expected a call, got {:?}", other),
        }
    }

    #[test]
    fn test_quoted_fields() {
        let raw = call("\"rs4477212\",\"1\",\"82154\",\"AA\"\r\n");
        assert_eq!(raw.id, "rs4477212");
        assert_eq!(raw.chromosome, "1");
        assert_eq!(raw.position, "82154");
        assert_eq!(raw.genotype, "AA");
    }

    #[test]
    fn test_unquoted_fields() {
        let raw = call("rs3094315,1,752566,AG\n");
        assert_eq!(raw.id, "rs3094315");
        assert_eq!(raw.genotype, "AG");
    }

    #[test]
    fn test_header_and_comments_skipped() {
        let parser = FtdnaParser::new();
        assert_eq!(
            parser.parse_line("RSID,CHROMOSOME,POSITION,RESULT\n", GenomeBuild::Build37),
            Ok(LineOutcome::Skip(SkipReason::Header))
        );
        assert_eq!(
            parser.parse_line("# MyHeritage DNA raw data.\n", GenomeBuild::Build37),
            Ok(LineOutcome::Skip(SkipReason::Comment))
        );
    }

    #[test]
    fn test_chromosome_passes_through() {
        assert_eq!(call("\"rs1\",\"XY\",\"2700157\",\"AG\"\n").chromosome, "XY");
    }
}
