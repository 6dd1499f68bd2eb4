use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::normalize::chromosome_rank;

/// Vendor export formats the loader can classify and parse
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum FileFormat {
    #[serde(rename = "23andme")]
    AndMe,
    #[serde(rename = "ancestry")]
    AncestryDNA,
    #[serde(rename = "ftdna")]
    FTDNA,
    #[serde(rename = "myheritage")]
    MyHeritage,
    #[serde(rename = "vcf")]
    VCF,
}

impl FileFormat {
    pub const ALL: [FileFormat; 5] = [
        FileFormat::AndMe,
        FileFormat::AncestryDNA,
        FileFormat::FTDNA,
        FileFormat::MyHeritage,
        FileFormat::VCF,
    ];

    /// Short lowercase tag, as reported in [`LoadMeta`]
    pub fn as_str(&self) -> &'static str {
        match self {
            FileFormat::AndMe => "23andme",
            FileFormat::AncestryDNA => "ancestry",
            FileFormat::FTDNA => "ftdna",
            FileFormat::MyHeritage => "myheritage",
            FileFormat::VCF => "vcf",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        FileFormat::ALL.into_iter().find(|format| format.as_str() == tag)
    }

    /// Vendor name as printed in the export header
    pub fn display_name(&self) -> &'static str {
        match self {
            FileFormat::AndMe => "23andMe",
            FileFormat::AncestryDNA => "AncestryDNA",
            FileFormat::FTDNA => "FamilyTreeDNA",
            FileFormat::MyHeritage => "MyHeritage",
            FileFormat::VCF => "VCF",
        }
    }
}

impl fmt::Display for FileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reference genome build a position is expressed in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "u32", into = "u32")]
pub enum GenomeBuild {
    #[default]
    Unknown,
    Build36,
    Build37,
    Build38,
    /// A declared or forced build number the pipeline has no anchors for
    Other(u32),
}

impl GenomeBuild {
    pub fn from_number(number: u32) -> Self {
        match number {
            0 => GenomeBuild::Unknown,
            36 => GenomeBuild::Build36,
            37 => GenomeBuild::Build37,
            38 => GenomeBuild::Build38,
            other => GenomeBuild::Other(other),
        }
    }

    pub fn number(&self) -> u32 {
        match self {
            GenomeBuild::Unknown => 0,
            GenomeBuild::Build36 => 36,
            GenomeBuild::Build37 => 37,
            GenomeBuild::Build38 => 38,
            GenomeBuild::Other(number) => *number,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, GenomeBuild::Unknown)
    }

    pub fn is_supported(&self) -> bool {
        matches!(
            self,
            GenomeBuild::Build36 | GenomeBuild::Build37 | GenomeBuild::Build38
        )
    }
}

impl From<u32> for GenomeBuild {
    fn from(number: u32) -> Self {
        GenomeBuild::from_number(number)
    }
}

impl From<GenomeBuild> for u32 {
    fn from(build: GenomeBuild) -> Self {
        build.number()
    }
}

impl fmt::Display for GenomeBuild {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.number())
    }
}

/// A single normalized SNP call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnpRecord {
    /// rs-id or vendor internal id (e.g. "i3000001")
    pub id: String,
    /// Canonical chromosome symbol: 1-22, X, Y, XY, MT
    pub chromosome: String,
    /// One or two allele characters, sorted
    pub genotype: String,
    /// Build the position is expressed in
    pub build: GenomeBuild,
    /// Position exactly as it appeared in the source line
    pub position: String,
}

impl SnpRecord {
    /// Position under `build`, or `None` when the record carries another build's coordinate
    pub fn position_for(&self, build: GenomeBuild) -> Option<&str> {
        (self.build == build).then_some(self.position.as_str())
    }

    /// Genotype as a diploid pair; haploid calls are doubled
    pub fn diploid_genotype(&self) -> String {
        let mut chars = self.genotype.chars();
        match (chars.next(), chars.next()) {
            (Some(allele), None) => format!("{allele}{allele}"),
            _ => self.genotype.clone(),
        }
    }
}

/// Chromosome -> (position -> record)
///
/// Positions are kept verbatim, so "1" and "01" are distinct keys. At most one
/// record is held per (chromosome, position); a later insert replaces it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SnpSet {
    chromosomes: HashMap<String, HashMap<String, SnpRecord>>,
}

impl SnpSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record keyed by its chromosome and position, returning the replaced one
    pub fn insert(&mut self, record: SnpRecord) -> Option<SnpRecord> {
        self.chromosomes
            .entry(record.chromosome.clone())
            .or_default()
            .insert(record.position.clone(), record)
    }

    pub fn get(&self, chromosome: &str, position: &str) -> Option<&SnpRecord> {
        self.chromosomes.get(chromosome)?.get(position)
    }

    pub fn chromosome(&self, chromosome: &str) -> Option<&HashMap<String, SnpRecord>> {
        self.chromosomes.get(chromosome)
    }

    pub fn chromosome_count(&self) -> usize {
        self.chromosomes.len()
    }

    /// Number of records across all chromosomes
    pub fn len(&self) -> usize {
        self.chromosomes.values().map(|positions| positions.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.chromosomes.values().all(|positions| positions.is_empty())
    }

    pub fn records(&self) -> impl Iterator<Item = &SnpRecord> {
        self.chromosomes.values().flat_map(|positions| positions.values())
    }

    /// Chromosome symbols in karyotype order (1..22, X, Y, XY, MT)
    pub fn sorted_chromosomes(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.chromosomes.keys().map(String::as_str).collect();
        names.sort_by_key(|name| (chromosome_rank(name), *name));
        names
    }

    /// Records of one chromosome ordered by numeric position
    pub fn sorted_records(&self, chromosome: &str) -> Vec<&SnpRecord> {
        let mut records: Vec<&SnpRecord> = self
            .chromosomes
            .get(chromosome)
            .map(|positions| positions.values().collect())
            .unwrap_or_default();
        records.sort_by(|a, b| {
            let key_a = a.position.parse::<u64>().unwrap_or(u64::MAX);
            let key_b = b.position.parse::<u64>().unwrap_or(u64::MAX);
            key_a.cmp(&key_b).then_with(|| a.position.cmp(&b.position))
        });
        records
    }

    /// Re-key every chromosome by record id instead of position
    pub fn index_by_rsid(&self) -> RsidIndex {
        let mut chromosomes: HashMap<String, HashMap<String, SnpRecord>> = HashMap::new();
        for chromosome in self.sorted_chromosomes() {
            let by_id = chromosomes.entry(chromosome.to_string()).or_default();
            for record in self.sorted_records(chromosome) {
                by_id.insert(record.id.clone(), record.clone());
            }
        }
        RsidIndex { chromosomes }
    }
}

/// Chromosome -> (rs-id -> record), built by [`SnpSet::index_by_rsid`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RsidIndex {
    chromosomes: HashMap<String, HashMap<String, SnpRecord>>,
}

impl RsidIndex {
    pub fn get(&self, chromosome: &str, id: &str) -> Option<&SnpRecord> {
        self.chromosomes.get(chromosome)?.get(id)
    }

    /// Look an id up on every chromosome
    pub fn find(&self, id: &str) -> Option<&SnpRecord> {
        self.chromosomes.values().find_map(|ids| ids.get(id))
    }

    pub fn len(&self) -> usize {
        self.chromosomes.values().map(|ids| ids.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Outcome of the format/build classifier for one file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Detection {
    pub build: GenomeBuild,
    pub format: Option<FileFormat>,
}

impl Detection {
    /// Neither a build nor a format could be established
    pub fn is_failure(&self) -> bool {
        !self.build.is_known() && self.format.is_none()
    }

    pub fn is_complete(&self) -> bool {
        self.build.is_known() && self.format.is_some()
    }
}

/// Summary of one load: build, format and number of accepted records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LoadMeta {
    pub build: GenomeBuild,
    #[serde(with = "format_tag")]
    pub format: Option<FileFormat>,
    pub total: usize,
}

/// Serializes a missing format as the empty string
mod format_tag {
    use super::FileFormat;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        format: &Option<FileFormat>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(format.map(|f| f.as_str()).unwrap_or(""))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<FileFormat>, D::Error> {
        let tag = String::deserialize(deserializer)?;
        if tag.is_empty() {
            return Ok(None);
        }
        FileFormat::from_tag(&tag)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown file format '{tag}'")))
    }
}
