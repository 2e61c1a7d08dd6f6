//! The merge engine: parses each input document in turn and folds it into a
//! single working tree under the configured merge mode.

use std::fmt;
use std::str::FromStr;

use crate::error::{MergeError, Result};
use crate::metrics::Metrics;
use crate::tree::Document;

/// Policy for combining same-identity nodes from different documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeMode {
    /// Combine every hit from every source; structurally identical to
    /// `Inclusive`.
    Additive,
    /// Inputs are mutually exclusive partitions: the first-seen version of a
    /// duplicated file (or line) wins and later ones are discarded.
    Exclusive,
    /// The default: recursively merge duplicates, summing hit counts, with
    /// attribute priority to the running document.
    Inclusive,
}

impl MergeMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            MergeMode::Additive => "additive",
            MergeMode::Exclusive => "exclusive",
            MergeMode::Inclusive => "inclusive",
        }
    }
}

impl fmt::Display for MergeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MergeMode {
    type Err = MergeError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "additive" => Ok(MergeMode::Additive),
            "exclusive" => Ok(MergeMode::Exclusive),
            "inclusive" => Ok(MergeMode::Inclusive),
            _ => Err(MergeError::Argument(
                "Merge option must be one of: additive, exclusive or inclusive.".to_string(),
            )),
        }
    }
}

/// Accumulates parsed documents into one merged tree. Single use: one run of
/// [`Accumulator::parse_all`] followed by [`Accumulator::to_xml`].
#[derive(Debug)]
pub struct Accumulator {
    mode: MergeMode,
    document: Option<Document>,
}

impl Accumulator {
    pub fn new(mode: MergeMode) -> Self {
        Accumulator {
            mode,
            document: None,
        }
    }

    pub fn mode(&self) -> MergeMode {
        self.mode
    }

    /// Parse one document and fold it into the working tree. The first
    /// document is adopted as-is; later ones merge into it.
    pub fn parse(&mut self, input: &[u8]) -> Result<()> {
        let incoming = Document::parse(input)?;
        match self.document.as_mut() {
            Some(document) => document.merge(incoming, self.mode),
            None => self.document = Some(incoming),
        }
        Ok(())
    }

    /// Parse every document, in supplied order. Any parse failure aborts the
    /// run immediately.
    pub fn parse_all<I>(&mut self, documents: I) -> Result<()>
    where
        I: IntoIterator,
        I::Item: AsRef<[u8]>,
    {
        for document in documents {
            self.parse(document.as_ref())?;
        }
        Ok(())
    }

    /// The current working tree, if any document has been accumulated.
    pub fn document(&self) -> Option<&Document> {
        self.document.as_ref()
    }

    /// Serialize the merged tree, computing its metrics in the same
    /// traversal. With nothing accumulated this produces an empty, valid
    /// document and all-zero metrics.
    pub fn to_xml(&self) -> Result<(String, Metrics)> {
        match &self.document {
            Some(document) => document.to_xml(),
            None => Document::new().to_xml(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC_A: &[u8] = br#"<coverage generated="1"><project>
        <package name="app">
            <file name="f.php"><line num="1" type="stmt" count="4"/></file>
        </package>
    </project></coverage>"#;

    const DOC_B: &[u8] = br#"<coverage generated="2"><project>
        <package name="app">
            <file name="f.php"><line num="1" type="stmt" count="1"/></file>
        </package>
    </project></coverage>"#;

    const DOC_DISJOINT: &[u8] = br#"<coverage generated="3"><project>
        <package name="lib">
            <file name="g.php"><line num="1" type="stmt" count="0"/></file>
        </package>
    </project></coverage>"#;

    #[test]
    fn test_mode_from_str() {
        assert_eq!("additive".parse::<MergeMode>().unwrap(), MergeMode::Additive);
        assert_eq!("exclusive".parse::<MergeMode>().unwrap(), MergeMode::Exclusive);
        assert_eq!("inclusive".parse::<MergeMode>().unwrap(), MergeMode::Inclusive);
    }

    #[test]
    fn test_mode_from_str_invalid() {
        let err = "bogus".parse::<MergeMode>().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Argument error: Merge option must be one of: additive, exclusive or inclusive."
        );
    }

    #[test]
    fn test_inclusive_sums_shared_line() {
        let mut accumulator = Accumulator::new(MergeMode::Inclusive);
        accumulator.parse_all([DOC_A, DOC_B]).unwrap();

        let (_, metrics) = accumulator.to_xml().unwrap();
        assert_eq!(metrics.file_count, 1);
        assert_eq!(metrics.element_count(), 1);
        assert_eq!(metrics.covered_element_count(), 1);

        let document = accumulator.document().unwrap();
        let file = document.package("app").unwrap().file("f.php").unwrap();
        assert_eq!(file.line("1").unwrap().count(), 5);
    }

    #[test]
    fn test_additive_behaves_like_inclusive() {
        let mut accumulator = Accumulator::new(MergeMode::Additive);
        accumulator.parse_all([DOC_A, DOC_B]).unwrap();

        let file = accumulator
            .document()
            .unwrap()
            .package("app")
            .unwrap()
            .file("f.php")
            .unwrap();
        assert_eq!(file.line("1").unwrap().count(), 5);
    }

    #[test]
    fn test_exclusive_keeps_first_seen_file() {
        let mut accumulator = Accumulator::new(MergeMode::Exclusive);
        accumulator.parse_all([DOC_A, DOC_B]).unwrap();

        let document = accumulator.document().unwrap();
        let file = document.package("app").unwrap().file("f.php").unwrap();
        assert_eq!(file.line("1").unwrap().count(), 4);

        let (_, metrics) = accumulator.to_xml().unwrap();
        assert_eq!(metrics.file_count, 1);
        assert_eq!(metrics.covered_element_count(), 1);
    }

    #[test]
    fn test_disjoint_documents_add_file_counts() {
        let mut a = Accumulator::new(MergeMode::Inclusive);
        a.parse(DOC_A).unwrap();
        let (_, metrics_a) = a.to_xml().unwrap();

        let mut b = Accumulator::new(MergeMode::Inclusive);
        b.parse(DOC_DISJOINT).unwrap();
        let (_, metrics_b) = b.to_xml().unwrap();

        let mut merged = Accumulator::new(MergeMode::Inclusive);
        merged.parse_all([DOC_A, DOC_DISJOINT]).unwrap();
        let (_, metrics) = merged.to_xml().unwrap();

        assert_eq!(
            metrics.file_count,
            metrics_a.file_count + metrics_b.file_count
        );
        assert_eq!(metrics.element_count(), 2);
        assert_eq!(metrics.covered_element_count(), 1);
    }

    #[test]
    fn test_to_xml_with_no_documents() {
        let accumulator = Accumulator::new(MergeMode::Inclusive);
        let (xml, metrics) = accumulator.to_xml().unwrap();

        assert_eq!(metrics.file_count, 0);
        assert_eq!(metrics.element_count(), 0);
        assert_eq!(metrics.coverage_percentage(), 0.0);
        assert!(crate::tree::Document::parse(xml.as_bytes()).is_ok());
    }

    #[test]
    fn test_parse_failure_propagates() {
        let mut accumulator = Accumulator::new(MergeMode::Inclusive);
        let err = accumulator
            .parse_all([&b"<coverage><project><file name=\"f\"><line num=\"1\"/></file></project></coverage>"[..]])
            .unwrap_err();
        assert!(err.to_string().contains("missing count attribute"));
    }

    #[test]
    fn test_merge_order_first_document_wins_attributes() {
        let first = br#"<coverage><project><package name="app" vendor="one"/></project></coverage>"#;
        let second = br#"<coverage><project><package name="app" vendor="two"/></project></coverage>"#;

        let mut accumulator = Accumulator::new(MergeMode::Inclusive);
        accumulator.parse_all([&first[..], &second[..]]).unwrap();

        let package = accumulator.document().unwrap().package("app").unwrap();
        assert_eq!(package.properties().get("vendor"), Some("one"));
    }
}
