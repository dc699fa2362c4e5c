// src/grouping.rs

// Grouping file: one `pathTemplate<TAB>groupLabel` row per sample, no
// header. A `*` in the template stands for the chromosome name, so one
// grouping file drives every chromosome of a run. Exactly two distinct
// labels are required before anything else is read.

use std::io;
use std::path::{Path, PathBuf};

use crate::tsv::{self, ColumnFormat};

/// One grouping row: a sample's path template and its group label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupingEntry {
    pub template: String,
    pub label: String,
}

/// The parsed grouping file. `labels` holds the two-value label universe
/// in first-appearance order.
#[derive(Debug, Clone)]
pub struct Grouping {
    pub entries: Vec<GroupingEntry>,
    pub labels: [String; 2],
}

impl Grouping {
    pub fn load<P: AsRef<Path>>(path: P) -> io::Result<Grouping> {
        let rows = tsv::load_rows(path.as_ref(), b'\t')?;
        let rows = tsv::coerce_rows(&rows, &[ColumnFormat::Str, ColumnFormat::Str]);
        let entries: Vec<GroupingEntry> = rows
            .iter()
            .map(|row| GroupingEntry {
                template: row[0].str_value().unwrap_or_default().to_string(),
                label: row[1].str_value().unwrap_or_default().to_string(),
            })
            .collect();

        let mut universe: Vec<String> = Vec::new();
        for entry in &entries {
            if !universe.contains(&entry.label) {
                universe.push(entry.label.clone());
            }
        }
        if universe.len() != 2 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "grouping file {} must define exactly 2 distinct group labels, found {} ({})",
                    path.as_ref().display(),
                    universe.len(),
                    universe.join(", ")
                ),
            ));
        }

        let labels = [universe[0].clone(), universe[1].clone()];
        Ok(Grouping { entries, labels })
    }

    /// Sample file paths for one chromosome, in grouping-file order.
    pub fn paths_for(&self, chrom: &str) -> Vec<PathBuf> {
        self.entries
            .iter()
            .map(|entry| PathBuf::from(entry.template.replace('*', chrom)))
            .collect()
    }

    /// Group labels aligned 1:1 with the `paths_for` output.
    pub fn labels_in_order(&self) -> Vec<String> {
        self.entries.iter().map(|entry| entry.label.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_grouping(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn template_wildcard_is_replaced_per_chromosome() {
        let file = write_grouping("data/s1_*_binary.txt\tfem\ndata/s2_*_binary.txt\tmal\n");
        let grouping = Grouping::load(file.path()).unwrap();
        let paths = grouping.paths_for("chrX");
        assert_eq!(paths[0], PathBuf::from("data/s1_chrX_binary.txt"));
        assert_eq!(paths[1], PathBuf::from("data/s2_chrX_binary.txt"));
        assert_eq!(grouping.labels_in_order(), vec!["fem", "mal"]);
    }

    #[test]
    fn label_universe_keeps_first_appearance_order() {
        let file = write_grouping("a\tmal\nb\tfem\nc\tmal\n");
        let grouping = Grouping::load(file.path()).unwrap();
        assert_eq!(grouping.labels, ["mal".to_string(), "fem".to_string()]);
    }

    #[test]
    fn three_labels_are_rejected() {
        let file = write_grouping("a\tfem\nb\tmal\nc\tother\n");
        let error = Grouping::load(file.path()).unwrap_err();
        assert_eq!(error.kind(), io::ErrorKind::InvalidData);
        assert!(error.to_string().contains("exactly 2"));
    }

    #[test]
    fn one_label_is_rejected() {
        let file = write_grouping("a\tfem\nb\tfem\n");
        assert!(Grouping::load(file.path()).is_err());
    }
}
