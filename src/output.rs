use anyhow::{Context, Result};
use csv::WriterBuilder;
use hashbrown::HashMap;
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::warn;

use crate::normalize::allele_sort_key;
use crate::types::{GenomeBuild, SnpSet};

/// Sentinel position for a record with no coordinate in the requested build
const MISSING_POSITION: &str = "0";

/// Write `snps` as a 23andMe-style raw data file for `build`.
///
/// Returns the number of data rows written.
pub fn save(path: &Path, snps: &SnpSet, build: GenomeBuild) -> Result<usize> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create output file {}", path.display()))?;
    let written = write_23andme(BufWriter::new(file), snps, build)
        .with_context(|| format!("Failed to write SNPs to {}", path.display()))?;
    Ok(written)
}

/// Same as [`save`] for any writer
pub fn write_23andme<W: Write>(mut writer: W, snps: &SnpSet, build: GenomeBuild) -> Result<usize> {
    write_disclaimer(&mut writer, build)?;

    let mut wtr = WriterBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .from_writer(&mut writer);

    let mut written = 0;
    for chromosome in snps.sorted_chromosomes() {
        for record in snps.sorted_records(chromosome) {
            let position = match record.position_for(build) {
                Some(position) if position != MISSING_POSITION => position,
                _ => {
                    warn!(
                        "skipping {} on chromosome {}: no build {} position",
                        record.id, chromosome, build
                    );
                    continue;
                }
            };

            let genotype = record.diploid_genotype();
            wtr.write_record([record.id.as_str(), chromosome, position, genotype.as_str()])?;
            written += 1;
        }
    }

    wtr.flush()?;
    drop(wtr);
    writer.flush()?;
    Ok(written)
}

fn write_disclaimer<W: Write>(writer: &mut W, build: GenomeBuild) -> std::io::Result<()> {
    writeln!(writer, "# This data file generated by snp-ingest, not by 23andMe")?;
    for _ in 0..10 {
        writeln!(writer, "# ")?;
    }
    writeln!(writer, "# We are using reference human assembly build {} ", build)?;
    for _ in 0..4 {
        writeln!(writer, "# ")?;
    }
    writeln!(writer, "# More information on reference human assembly build {} ", build)?;
    for _ in 0..2 {
        writeln!(writer, "# ")?;
    }
    writeln!(writer, "# rsid\tchromosome\tposition\tgenotype")
}

/// SNP count for one chromosome
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChromosomeCount {
    pub chromosome: String,
    pub snps: usize,
}

/// Per-chromosome record counts in karyotype order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SnpStats {
    pub chromosomes: Vec<ChromosomeCount>,
    pub total: usize,
}

impl SnpStats {
    pub fn from_set(snps: &SnpSet) -> Self {
        let chromosomes: Vec<ChromosomeCount> = snps
            .sorted_chromosomes()
            .into_iter()
            .map(|chromosome| ChromosomeCount {
                chromosome: chromosome.to_string(),
                snps: snps.chromosome(chromosome).map_or(0, |positions| positions.len()),
            })
            .collect();
        let total = chromosomes.iter().map(|count| count.snps).sum();

        Self { chromosomes, total }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenotypeCount {
    pub genotype: String,
    pub count: usize,
}

/// How often each stored genotype occurs, ordered by [`allele_sort_key`]
pub fn genotype_counts(snps: &SnpSet) -> Vec<GenotypeCount> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for record in snps.records() {
        *counts.entry(record.genotype.as_str()).or_insert(0) += 1;
    }

    let mut counts: Vec<GenotypeCount> = counts
        .into_iter()
        .map(|(genotype, count)| GenotypeCount {
            genotype: genotype.to_string(),
            count,
        })
        .collect();
    counts.sort_by_key(|entry| allele_sort_key(&entry.genotype));
    counts
}
