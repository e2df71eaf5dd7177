//! Computed values and where they land in a record
//!
//! [`compute_assignments`] turns the values derived from the catalog and the
//! run configuration into `(path, index) -> text` slots. Rules run in a fixed
//! order (doi, landing_id, child_id with browse_file, edition, pubdate, then
//! the metadata date); a later rule that targets an already assigned slot
//! replaces the earlier text.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

use crate::document::MetadataDocument;
use crate::error::{MetadataError, Result};
use crate::path::ElementPath;

pub const CATALOG_ITEM_URL: &str = "https://www.sciencebase.gov/catalog/item/";
pub const CATALOG_FILE_URL: &str = "https://www.sciencebase.gov/catalog/file/get/";

pub const SERIES_ID: &str = "./idinfo/citation/citeinfo/serinfo/issue";
pub const CITATION_LINK: &str = "./idinfo/citation/citeinfo/onlink";
pub const LARGER_WORK_LINK: &str = "./idinfo/citation/citeinfo/lworkcit/citeinfo/onlink";
pub const LARGER_WORK_SERIES_ID: &str =
    "./idinfo/citation/citeinfo/lworkcit/citeinfo/serinfo/issue";
pub const LARGER_WORK_PUBDATE: &str = "./idinfo/citation/citeinfo/lworkcit/citeinfo/pubdate";
pub const EDITION: &str = "./idinfo/citation/citeinfo/edition";
pub const PUBDATE: &str = "./idinfo/citation/citeinfo/pubdate";
pub const NETWORK_RESOURCE: &str =
    "./distinfo/stdorder/digform/digtopt/onlinopt/computer/networka/networkr";
pub const ACCESS_INSTRUCTIONS: &str = "./distinfo/stdorder/digform/digtopt/onlinopt/accinstr";
pub const METADATA_DATE: &str = "./metainfo/metd";
pub const BROWSE_NAME: &str = "./idinfo/browse/browsen";
pub const BROWSE_TYPE: &str = "./idinfo/browse/browset";
pub const BROWSE_DESCRIPTION: &str = "./idinfo/browse/browsed";

pub const ACCESS_TEXT: &str = "The first link is to the page containing the data. \
The second is a direct link to download all data available from the page as a zip file. \
The final link is to the publication landing page. \
The data page (first link) may have additional data access options, including web services.";

/// Page URL for a catalog identifier
pub fn item_url(id: &str) -> String {
    format!("{}{}", CATALOG_ITEM_URL, id)
}

/// Bulk download URL for a catalog identifier
pub fn file_url(id: &str) -> String {
    format!("{}{}", CATALOG_FILE_URL, id)
}

/// Values written into each record
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewValues {
    pub doi: Option<String>,
    pub landing_id: Option<String>,
    pub child_id: Option<String>,
    pub browse_file: Option<String>,
    pub edition: Option<String>,
    pub pubdate: Option<String>,
}

/// A slot that could not be written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedSlot {
    pub path: String,
    pub index: usize,
    pub reason: String,
}

/// `path -> {index -> text}`, paths kept in first-assignment order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValueAssignments {
    entries: Vec<(ElementPath, BTreeMap<usize, String>)>,
}

impl ValueAssignments {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign `text` to `(path, index)`, replacing any earlier text for the slot
    pub fn assign(&mut self, path: ElementPath, index: usize, text: impl Into<String>) {
        let text = text.into();
        match self.entries.iter_mut().find(|(p, _)| *p == path) {
            Some((_, slots)) => {
                slots.insert(index, text);
            }
            None => {
                let mut slots = BTreeMap::new();
                slots.insert(index, text);
                self.entries.push((path, slots));
            }
        }
    }

    pub fn get(&self, path: &str, index: usize) -> Option<&str> {
        self.entries
            .iter()
            .find(|(p, _)| p.as_str() == path)
            .and_then(|(_, slots)| slots.get(&index))
            .map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ElementPath, &BTreeMap<usize, String>)> {
        self.entries.iter().map(|(p, slots)| (p, slots))
    }

    /// Total number of slots
    pub fn len(&self) -> usize {
        self.entries.iter().map(|(_, slots)| slots.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Write every slot into `doc`, lowest index first per path.
    ///
    /// A slot whose container is missing is logged and skipped; the other
    /// slots are still written. Any other failure aborts.
    pub fn apply(&self, doc: &mut MetadataDocument) -> Result<Vec<SkippedSlot>> {
        let mut skipped = Vec::new();
        for (path, slots) in &self.entries {
            for (&index, text) in slots {
                match doc.write(path, index, text) {
                    Ok(()) => {}
                    Err(MetadataError::Structural { message, .. }) => {
                        warn!(path = %path, index, reason = %message, "Skipping metadata slot");
                        skipped.push(SkippedSlot {
                            path: path.to_string(),
                            index,
                            reason: message,
                        });
                    }
                    Err(e) => return Err(e),
                }
            }
        }
        Ok(skipped)
    }
}

/// Build the slot assignments for one record
pub fn compute_assignments(values: &NewValues, today: NaiveDate) -> Result<ValueAssignments> {
    // Each computed text and the slots it fills, in rule order
    let mut rules: Vec<(String, Vec<(&str, usize)>)> = Vec::new();

    if let Some(doi) = &values.doi {
        rules.push((format!("DOI:{}", doi), vec![(SERIES_ID, 0), (LARGER_WORK_SERIES_ID, 0)]));
        rules.push((
            format!("https://doi.org/{}", doi),
            vec![(CITATION_LINK, 0), (LARGER_WORK_LINK, 0), (NETWORK_RESOURCE, 2)],
        ));
    }

    if let Some(landing_id) = &values.landing_id {
        rules.push((item_url(landing_id), vec![(LARGER_WORK_LINK, 1)]));
    }

    if let Some(child_id) = &values.child_id {
        let download = file_url(child_id);
        rules.push((item_url(child_id), vec![(CITATION_LINK, 1), (NETWORK_RESOURCE, 0)]));
        rules.push((download.clone(), vec![(NETWORK_RESOURCE, 1)]));
        rules.push((ACCESS_TEXT.to_string(), vec![(ACCESS_INSTRUCTIONS, 0)]));
        if let Some(browse_file) = &values.browse_file {
            rules.push((format!("{}/?name={}", download, browse_file), vec![(BROWSE_NAME, 0)]));
        }
    }

    if let Some(edition) = &values.edition {
        rules.push((edition.clone(), vec![(EDITION, 0)]));
    }

    if let Some(pubdate) = &values.pubdate {
        rules.push((pubdate.clone(), vec![(PUBDATE, 0), (LARGER_WORK_PUBDATE, 0)]));
    }

    rules.push((today.format("%Y%m%d").to_string(), vec![(METADATA_DATE, 0)]));

    let mut assignments = ValueAssignments::new();
    for (text, slots) in rules {
        for (path, index) in slots {
            assignments.assign(ElementPath::parse(path)?, index, text.clone());
        }
    }
    Ok(assignments)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 17).unwrap()
    }

    #[test]
    fn test_doi_slots() {
        let values = NewValues {
            doi: Some("10.5066/ABCD".to_string()),
            ..Default::default()
        };
        let a = compute_assignments(&values, today()).unwrap();

        assert_eq!(a.get(SERIES_ID, 0), Some("DOI:10.5066/ABCD"));
        assert_eq!(a.get(LARGER_WORK_SERIES_ID, 0), Some("DOI:10.5066/ABCD"));
        assert_eq!(a.get(CITATION_LINK, 0), Some("https://doi.org/10.5066/ABCD"));
        assert_eq!(a.get(LARGER_WORK_LINK, 0), Some("https://doi.org/10.5066/ABCD"));
        assert_eq!(a.get(NETWORK_RESOURCE, 2), Some("https://doi.org/10.5066/ABCD"));
        assert_eq!(a.get(METADATA_DATE, 0), Some("20240517"));
        assert_eq!(a.len(), 6);
    }

    #[test]
    fn test_child_slots() {
        let values = NewValues {
            child_id: Some("5f0000000000000000000000".to_string()),
            ..Default::default()
        };
        let a = compute_assignments(&values, today()).unwrap();

        assert_eq!(
            a.get(NETWORK_RESOURCE, 1),
            Some("https://www.sciencebase.gov/catalog/file/get/5f0000000000000000000000")
        );
        assert_eq!(
            a.get(CITATION_LINK, 1),
            Some("https://www.sciencebase.gov/catalog/item/5f0000000000000000000000")
        );
        assert_eq!(
            a.get(NETWORK_RESOURCE, 0),
            Some("https://www.sciencebase.gov/catalog/item/5f0000000000000000000000")
        );
        assert_eq!(a.get(ACCESS_INSTRUCTIONS, 0), Some(ACCESS_TEXT));
        assert_eq!(a.get(BROWSE_NAME, 0), None);
    }

    #[test]
    fn test_browse_requires_child() {
        let values = NewValues {
            browse_file: Some("site_browse.png".to_string()),
            ..Default::default()
        };
        let a = compute_assignments(&values, today()).unwrap();
        assert_eq!(a.get(BROWSE_NAME, 0), None);

        let values = NewValues {
            child_id: Some("abc".to_string()),
            browse_file: Some("site_browse.png".to_string()),
            ..Default::default()
        };
        let a = compute_assignments(&values, today()).unwrap();
        assert_eq!(
            a.get(BROWSE_NAME, 0),
            Some("https://www.sciencebase.gov/catalog/file/get/abc/?name=site_browse.png")
        );
    }

    #[test]
    fn test_pubdate_and_edition() {
        let values = NewValues {
            edition: Some("1.0".to_string()),
            pubdate: Some("2018".to_string()),
            ..Default::default()
        };
        let a = compute_assignments(&values, today()).unwrap();
        assert_eq!(a.get(EDITION, 0), Some("1.0"));
        assert_eq!(a.get(PUBDATE, 0), Some("2018"));
        assert_eq!(a.get(LARGER_WORK_PUBDATE, 0), Some("2018"));
    }

    #[test]
    fn test_landing_and_doi_share_larger_work_path() {
        let values = NewValues {
            doi: Some("10.5066/ABCD".to_string()),
            landing_id: Some("landing".to_string()),
            ..Default::default()
        };
        let a = compute_assignments(&values, today()).unwrap();
        assert_eq!(a.get(LARGER_WORK_LINK, 0), Some("https://doi.org/10.5066/ABCD"));
        assert_eq!(
            a.get(LARGER_WORK_LINK, 1),
            Some("https://www.sciencebase.gov/catalog/item/landing")
        );
    }

    #[test]
    fn test_later_assignment_wins() {
        let path = ElementPath::parse(EDITION).unwrap();
        let mut a = ValueAssignments::new();
        a.assign(path.clone(), 0, "first");
        a.assign(path, 0, "second");
        assert_eq!(a.get(EDITION, 0), Some("second"));
        assert_eq!(a.len(), 1);
    }

    #[test]
    fn test_deterministic() {
        let values = NewValues {
            doi: Some("10.5066/ABCD".to_string()),
            landing_id: Some("landing".to_string()),
            child_id: Some("child".to_string()),
            browse_file: Some("x_browse.jpg".to_string()),
            edition: Some("2".to_string()),
            pubdate: Some("2019".to_string()),
        };
        let first = compute_assignments(&values, today()).unwrap();
        let second = compute_assignments(&values, today()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_apply_skips_missing_containers() {
        let xml = r#"<metadata>
  <idinfo><citation><citeinfo><title>T</title><onlink>old</onlink></citeinfo></citation></idinfo>
  <distinfo/>
</metadata>"#;
        let mut doc = MetadataDocument::parse(xml.as_bytes()).unwrap();
        let values = NewValues {
            child_id: Some("child".to_string()),
            ..Default::default()
        };
        let a = compute_assignments(&values, today()).unwrap();
        let skipped = a.apply(&mut doc).unwrap();

        let onlink = ElementPath::parse(CITATION_LINK).unwrap();
        assert_eq!(doc.read(&onlink, 0).unwrap(), "old");
        assert_eq!(
            doc.read(&onlink, 1).unwrap(),
            "https://www.sciencebase.gov/catalog/item/child"
        );
        // networkr, accinstr and metd have no container in this record
        let skipped_paths: Vec<_> = skipped.iter().map(|s| s.path.as_str()).collect();
        assert!(skipped_paths.contains(&NETWORK_RESOURCE));
        assert!(skipped_paths.contains(&ACCESS_INSTRUCTIONS));
        assert!(skipped_paths.contains(&METADATA_DATE));
    }
}
