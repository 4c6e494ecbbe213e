//! The ordered analysis report.

use serde::Serialize;
use serde::ser::SerializeMap;

use super::grouping::{GroupValue, SumMean};
use crate::io::RawRecord;

/// Body of one report section.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum SectionContent {
    /// A movie listing.
    Movies(Vec<RawRecord>),
    /// One aggregate per group.
    Groups(Vec<GroupValue>),
    /// Sum and mean per group.
    SumMean(Vec<SumMean>),
    /// The section's query failed.
    Error(String),
}

impl SectionContent {
    pub fn is_error(&self) -> bool {
        matches!(self, SectionContent::Error(_))
    }

    /// Number of rows or groups in the body (0 for an error).
    pub fn len(&self) -> usize {
        match self {
            SectionContent::Movies(rows) => rows.len(),
            SectionContent::Groups(groups) => groups.len(),
            SectionContent::SumMean(groups) => groups.len(),
            SectionContent::Error(_) => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportSection {
    pub title: String,
    pub content: SectionContent,
}

/// Report sections in insertion order.
///
/// Serializes as a map from section title to content.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AnalysisReport {
    sections: Vec<ReportSection>,
}

impl AnalysisReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, title: impl Into<String>, content: SectionContent) {
        self.sections.push(ReportSection {
            title: title.into(),
            content,
        });
    }

    pub fn sections(&self) -> &[ReportSection] {
        &self.sections
    }

    pub fn get(&self, title: &str) -> Option<&SectionContent> {
        self.sections
            .iter()
            .find(|s| s.title == title)
            .map(|s| &s.content)
    }

    pub fn titles(&self) -> Vec<&str> {
        self.sections.iter().map(|s| s.title.as_str()).collect()
    }

    /// Sections whose query failed.
    pub fn errors(&self) -> usize {
        self.sections.iter().filter(|s| s.content.is_error()).count()
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }
}

impl Serialize for AnalysisReport {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.sections.len()))?;
        for section in &self.sections {
            map.serialize_entry(&section.title, &section.content)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serializes_in_insertion_order() {
        let mut report = AnalysisReport::new();
        report.push(
            "Mean Revenue",
            SectionContent::Groups(vec![GroupValue {
                group: "Franchise".to_string(),
                movies: 2,
                value: 150.0,
            }]),
        );
        report.push("Budget Stats", SectionContent::Error("column not found".to_string()));

        let text = serde_json::to_string(&report).unwrap();
        let mean = text.find("Mean Revenue").unwrap();
        let budget = text.find("Budget Stats").unwrap();
        assert!(mean < budget);

        let json: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(json["Mean Revenue"]["kind"], "groups");
        assert_eq!(json["Mean Revenue"]["data"][0]["value"], 150.0);
        assert_eq!(json["Budget Stats"]["kind"], "error");
        assert_eq!(report.errors(), 1);
        assert_eq!(report.titles(), vec!["Mean Revenue", "Budget Stats"]);
    }
}
