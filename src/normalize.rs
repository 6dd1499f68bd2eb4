//! Chromosome and genotype canonicalization shared by every vendor parser.

use crate::types::FileFormat;

/// Leading character of a vendor no-call ("--", "-")
pub const NO_CALL: char = '-';
/// Sentinel for chromosomes outside the canonical alphabet; such records are dropped
pub const UNMAPPED_CHROMOSOME: &str = "0";
/// AncestryDNA code 25, folded into [`PSEUDO_AUTOSOMAL`]
pub const PSEUDO_AUTOSOMAL_Y: &str = "YAUTO";
pub const PSEUDO_AUTOSOMAL: &str = "XY";

/// Apply the per-format chromosome alias table.
///
/// The result may still be `YAUTO` or a non-canonical contig name; see
/// [`canonical_chromosome`] for the post-pass.
pub fn normalize_chromosome(raw: &str, format: FileFormat) -> String {
    let aliased = match format {
        FileFormat::AncestryDNA => match raw {
            "23" => "X",
            "24" => "Y",
            "25" => PSEUDO_AUTOSOMAL_Y,
            "26" => "MT",
            other => other,
        },
        FileFormat::VCF => match raw {
            "chrY" => "Y",
            "chrMT" | "chrM" | "M" => "MT",
            other => other.strip_prefix("chr").unwrap_or(other),
        },
        FileFormat::AndMe | FileFormat::FTDNA | FileFormat::MyHeritage => raw,
    };
    aliased.to_string()
}

/// Fold YAUTO into XY and map anything outside 1-22, X, Y, XY, MT to "0"
pub fn canonical_chromosome(symbol: &str) -> &str {
    if symbol == PSEUDO_AUTOSOMAL_Y {
        PSEUDO_AUTOSOMAL
    } else if is_canonical_chromosome(symbol) {
        symbol
    } else {
        UNMAPPED_CHROMOSOME
    }
}

pub fn is_canonical_chromosome(symbol: &str) -> bool {
    match symbol {
        "X" | "Y" | "MT" | PSEUDO_AUTOSOMAL => true,
        other => other
            .parse::<u8>()
            .map(|n| (1..=22).contains(&n) && n.to_string() == other)
            .unwrap_or(false),
    }
}

/// Y and mitochondrial calls may carry a single observed allele
pub fn is_haploid(chromosome: &str) -> bool {
    matches!(chromosome, "Y" | "MT")
}

/// Empty genotypes and vendor no-calls ("--") never become records
pub fn is_no_call(genotype: &str) -> bool {
    genotype.is_empty() || genotype.starts_with(NO_CALL)
}

/// Canonical genotype: alleles sorted character-wise.
///
/// A single allele on Y or MT is stored as observed. On any other chromosome it
/// is doubled so that stored genotypes are always pairs there.
pub fn normalize_genotype(raw: &str, chromosome: &str) -> String {
    let mut alleles: Vec<char> = raw.chars().collect();
    if alleles.len() == 1 && !is_haploid(chromosome) {
        alleles.push(alleles[0]);
    }
    alleles.sort_unstable();
    alleles.into_iter().collect()
}

/// Ordering key for genotype summaries.
///
/// Haploid calls are padded with a placeholder and deletion/insertion markers
/// sort after every base.
/// Display only; stored genotypes are never rewritten with it.
pub fn allele_sort_key(genotype: &str) -> String {
    let mut key: Vec<char> = genotype.chars().collect();
    if key.len() == 1 {
        key.insert(0, '_');
    }
    for allele in key.iter_mut().take(2) {
        *allele = match *allele {
            'D' => 'U',
            'I' => 'V',
            other => other,
        };
    }
    key.into_iter().collect()
}

/// Karyotype position used to order chromosomes in output
pub fn chromosome_rank(chromosome: &str) -> u8 {
    match chromosome {
        "X" => 23,
        "Y" => 24,
        PSEUDO_AUTOSOMAL => 25,
        "MT" => 26,
        other => match other.parse::<u8>() {
            Ok(n) if (1..=22).contains(&n) => n,
            _ => u8::MAX,
        },
    }
}
