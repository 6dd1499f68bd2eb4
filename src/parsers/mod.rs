//! Per-vendor line parsers.
//!
//! Every parser turns one raw text line into a [`LineOutcome`]: either a
//! [`RawCall`] or an explicit skip for lines that are not data (comments,
//! vendor headers, variants the pipeline does not model). Malformed data lines
//! are reported as [`LineError`] so the loader can log and move on.

pub mod ancestry;
pub mod ftdna;
pub mod twentythree;
pub mod vcf;

pub use ancestry::AncestryDNAParser;
pub use ftdna::FtdnaParser;
pub use twentythree::TwentyThreeAndMeParser;
pub use vcf::VcfParser;

use thiserror::Error;

use crate::types::{FileFormat, GenomeBuild, SnpRecord};

pub const COMMENT_MARKER: char = '#';
/// Lines shorter than this (terminator included) are never data
pub const MIN_LINE_LEN: usize = 7;

/// One data line as the vendor wrote it: chromosome aliased, genotype untouched
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawCall {
    pub id: String,
    pub chromosome: String,
    pub position: String,
    pub genotype: String,
    pub build: GenomeBuild,
}

impl RawCall {
    /// Finish the call with its canonical chromosome and genotype
    pub fn into_record(self, chromosome: String, genotype: String) -> SnpRecord {
        SnpRecord {
            id: self.id,
            chromosome,
            genotype,
            build: self.build,
            position: self.position,
        }
    }
}

/// Why a line produced no call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    TooShort,
    Comment,
    /// Vendor column header ("RSID,...", "rsid chromosome position allele1 allele2")
    Header,
    /// VCF REF/ALT not exactly one base
    Indel,
    /// VCF GT starting with '.'
    NoCall,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineOutcome {
    Call(RawCall),
    Skip(SkipReason),
}

/// A data line that could not be turned into a call
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LineError {
    #[error("expected at least {expected} fields, found {found}")]
    TooFewFields { expected: usize, found: usize },

    #[error("sample column {column} is missing")]
    MissingSample { column: usize },

    #[error("FORMAT column has no GT subfield")]
    MissingGenotypeField,

    #[error("GT value '{0}' does not index an allele")]
    InvalidAlleleIndex(String),
}

/// Skip checks shared by every format
pub(crate) fn screen_line(line: &str) -> Option<SkipReason> {
    if line.len() < MIN_LINE_LEN {
        Some(SkipReason::TooShort)
    } else if line.starts_with(COMMENT_MARKER) {
        Some(SkipReason::Comment)
    } else {
        None
    }
}

/// Parser selected for a classified file
#[derive(Debug, Clone)]
pub enum FormatParser {
    AndMe(TwentyThreeAndMeParser),
    AncestryDNA(AncestryDNAParser),
    Ftdna(FtdnaParser),
    Vcf(VcfParser),
}

impl FormatParser {
    /// `sample_index` is only used for VCF and is relative to the first sample column
    pub fn for_format(format: FileFormat, sample_index: usize) -> Self {
        match format {
            FileFormat::AndMe => FormatParser::AndMe(TwentyThreeAndMeParser::new()),
            FileFormat::AncestryDNA => FormatParser::AncestryDNA(AncestryDNAParser::new()),
            FileFormat::FTDNA | FileFormat::MyHeritage => FormatParser::Ftdna(FtdnaParser::new()),
            FileFormat::VCF => FormatParser::Vcf(VcfParser::new(sample_index)),
        }
    }

    pub fn parse_line(&self, line: &str, build: GenomeBuild) -> Result<LineOutcome, LineError> {
        match self {
            FormatParser::AndMe(parser) => parser.parse_line(line, build),
            FormatParser::AncestryDNA(parser) => parser.parse_line(line, build),
            FormatParser::Ftdna(parser) => parser.parse_line(line, build),
            FormatParser::Vcf(parser) => parser.parse_line(line, build),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_screen_line() {
        assert_eq!(screen_line("rs1\t1\n"), Some(SkipReason::TooShort));
        assert_eq!(
            screen_line("# rsid\tchromosome\n"),
            Some(SkipReason::Comment)
        );
        assert_eq!(screen_line("rs1\t1\t100\tAA\n"), None);
    }

    #[test]
    fn test_dispatch_covers_every_format() {
        let line = "rs1\t1\t100\tAG\n";
        let tabbed = FormatParser::for_format(FileFormat::AndMe, 0);
        assert!(matches!(
            tabbed.parse_line(line, GenomeBuild::Build37),
            Ok(LineOutcome::Call(_))
        ));

        // Comma-delimited parser sees a single field
        let comma = FormatParser::for_format(FileFormat::FTDNA, 0);
        assert_eq!(
            comma.parse_line(line, GenomeBuild::Build37),
            Err(LineError::TooFewFields {
                expected: 4,
                found: 1
            })
        );

        assert!(matches!(
            FormatParser::for_format(FileFormat::MyHeritage, 0),
            FormatParser::Ftdna(_)
        ));
        assert!(matches!(
            FormatParser::for_format(FileFormat::VCF, 2),
            FormatParser::Vcf(_)
        ));
        assert!(matches!(
            FormatParser::for_format(FileFormat::AncestryDNA, 0),
            FormatParser::AncestryDNA(_)
        ));
    }

    #[test]
    fn test_into_record_keeps_build_and_position() {
        let raw = RawCall {
            id: "rs9".to_string(),
            chromosome: "YAUTO".to_string(),
            position: "500".to_string(),
            genotype: "TC".to_string(),
            build: GenomeBuild::Build36,
        };
        let record = raw.into_record("XY".to_string(), "CT".to_string());
        assert_eq!(record.chromosome, "XY");
        assert_eq!(record.genotype, "CT");
        assert_eq!(record.position_for(GenomeBuild::Build36), Some("500"));
        assert_eq!(record.position_for(GenomeBuild::Build37), None);
    }
}
