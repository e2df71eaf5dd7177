//! Translation of the configured record edits into engine options

use core_metadata::text::DEFAULT_FILL_MARKER;
use core_metadata::{parse_element, Element, ElementPath, TextEdits};
use core_runtime::{ElementEdit, SyncConfig};
use core_sync::{EngineOptions, XmlEdits};

use crate::error::Result;

fn element_edits(edits: &[ElementEdit]) -> Result<Vec<(ElementPath, Element)>> {
    edits
        .iter()
        .map(|edit| Ok((ElementPath::parse(&edit.path)?, parse_element(&edit.xml)?)))
        .collect()
}

/// Parse every configured path, element and pattern.
///
/// Fails on the first entry that does not parse, before any record is
/// touched.
pub fn xml_edits(config: &SyncConfig) -> Result<XmlEdits> {
    let remove_fills = config
        .remove_fills
        .iter()
        .map(|removal| Ok((ElementPath::parse(&removal.path)?, removal.markers.clone())))
        .collect::<Result<Vec<_>>>()?;

    let mut text_edits = TextEdits::new().with_fill_marker(DEFAULT_FILL_MARKER)?;
    for pair in &config.find_and_replace {
        text_edits = text_edits.with_literal(pair.find.as_str(), pair.replace.as_str());
    }
    for rule in &config.regex_replacements {
        text_edits = text_edits.with_regex(&rule.find, rule.replace.as_str())?;
    }

    Ok(XmlEdits {
        remove_fills,
        additions: element_edits(&config.metadata_additions)?,
        replacements: element_edits(&config.metadata_replacements)?,
        text_edits,
    })
}

pub fn engine_options(config: &SyncConfig) -> Result<EngineOptions> {
    Ok(EngineOptions {
        doi: config.doi.clone(),
        landing_id: config.landing_id(),
        edition: config.edition.clone(),
        pubdate: config.pubdate.clone(),
        xml_edits: xml_edits(config)?,
        max_upload_bytes: config.max_upload_bytes(),
        start_index: config.start_index,
        replace_existing_files: config.replace_files,
        landing_fields_from_xml: config.landing_fields_from_xml.clone(),
        preview_image: config.preview_image.clone(),
    })
}
