//! End-to-end rewrites of a full FGDC record: computed values, fill
//! removal, domain repair and text edits applied the way the sync engine
//! chains them.

use chrono::NaiveDate;
use core_metadata::text::DEFAULT_FILL_MARKER;
use core_metadata::value_map::{
    ACCESS_INSTRUCTIONS, ACCESS_TEXT, BROWSE_NAME, CITATION_LINK, LARGER_WORK_LINK,
    METADATA_DATE, NETWORK_RESOURCE, SERIES_ID,
};
use core_metadata::{compute_assignments, ElementPath, MetadataDocument, NewValues, TextEdits};

const RECORD: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<metadata>
  <idinfo>
    <citation>
      <citeinfo>
        <origin>Survey Team</origin>
        <pubdate>xxx</pubdate>
        <title>Sediment cores, outer shelf</title>
        <edition>xxx</edition>
        <serinfo><sername>Data Release</sername><issue>xxx</issue></serinfo>
        <onlink>xxx</onlink>
        <onlink>xxx</onlink>
        <lworkcit>
          <citeinfo>
            <pubdate>xxx</pubdate>
            <serinfo><sername>Data Release</sername><issue>xxx</issue></serinfo>
            <onlink>xxx</onlink>
          </citeinfo>
        </lworkcit>
      </citeinfo>
    </citation>
    <browse><browsen>xxx</browsen><browset>PNG</browset></browse>
    <ptcontac><cntinfo><cntperp><cntper>AUTHOR</cntper></cntperp></cntinfo></ptcontac>
    <ptcontac><cntinfo><cntperp><cntper>Data Manager</cntper></cntperp></cntinfo></ptcontac>
  </idinfo>
  <eainfo>
    <detailed>
      <attr>
        <attrlabl>grain</attrlabl>
        <attrdomv><edom>sand</edom><edom>mud</edom></attrdomv>
      </attr>
    </detailed>
  </eainfo>
  <distinfo>
    <stdorder>
      <digform>
        <digtopt>
          <onlinopt>
            <computer><networka><networkr>xxx</networkr></networka></computer>
            <accinstr>xxx</accinstr>
          </onlinopt>
        </digtopt>
      </digform>
    </stdorder>
  </distinfo>
  <metainfo><metd>xxx</metd></metainfo>
</metadata>
"#;

fn p(path: &str) -> ElementPath {
    ElementPath::parse(path).unwrap()
}

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 9).unwrap()
}

fn values() -> NewValues {
    NewValues {
        doi: Some("10.5066/P9TEST01".to_string()),
        landing_id: Some("landing01".to_string()),
        child_id: Some("child01".to_string()),
        browse_file: Some("cores_browse.png".to_string()),
        edition: Some("1.0".to_string()),
        pubdate: Some("2024".to_string()),
    }
}

#[test]
fn test_full_record_rewrite() {
    let mut doc = MetadataDocument::parse(RECORD.as_bytes()).unwrap();
    let assignments = compute_assignments(&values(), today()).unwrap();

    let skipped = assignments.apply(&mut doc).unwrap();
    assert!(skipped.is_empty(), "unexpected skips: {:?}", skipped);

    assert_eq!(doc.read(&p(SERIES_ID), 0).unwrap(), "DOI:10.5066/P9TEST01");
    assert_eq!(doc.read(&p(CITATION_LINK), 0).unwrap(), "https://doi.org/10.5066/P9TEST01");
    assert_eq!(
        doc.read(&p(CITATION_LINK), 1).unwrap(),
        "https://www.sciencebase.gov/catalog/item/child01"
    );
    assert_eq!(
        doc.read(&p(LARGER_WORK_LINK), 1).unwrap(),
        "https://www.sciencebase.gov/catalog/item/landing01"
    );

    // One network resource existed; the next two are created in order
    let networkr = p(NETWORK_RESOURCE);
    assert_eq!(doc.count(&networkr), 3);
    assert_eq!(
        doc.read(&networkr, 0).unwrap(),
        "https://www.sciencebase.gov/catalog/item/child01"
    );
    assert_eq!(
        doc.read(&networkr, 1).unwrap(),
        "https://www.sciencebase.gov/catalog/file/get/child01"
    );
    assert_eq!(doc.read(&networkr, 2).unwrap(), "https://doi.org/10.5066/P9TEST01");

    assert_eq!(doc.read(&p(ACCESS_INSTRUCTIONS), 0).unwrap(), ACCESS_TEXT);
    assert_eq!(
        doc.read(&p(BROWSE_NAME), 0).unwrap(),
        "https://www.sciencebase.gov/catalog/file/get/child01/?name=cores_browse.png"
    );
    assert_eq!(doc.read(&p(METADATA_DATE), 0).unwrap(), "20240309");
    assert_eq!(doc.title().as_deref(), Some("Sediment cores, outer shelf"));
}

#[test]
fn test_rewrite_is_stable_when_repeated() {
    let assignments = compute_assignments(&values(), today()).unwrap();

    let mut once = MetadataDocument::parse(RECORD.as_bytes()).unwrap();
    once.normalize_multi_value_domain();
    assignments.apply(&mut once).unwrap();

    let mut twice = once.clone();
    twice.normalize_multi_value_domain();
    assignments.apply(&mut twice).unwrap();

    assert_eq!(once.to_xml_string().unwrap(), twice.to_xml_string().unwrap());
}

#[test]
fn test_missing_distribution_section_is_skipped() {
    let start = RECORD.find("<distinfo>").unwrap();
    let end = RECORD.find("</distinfo>").unwrap() + "</distinfo>".len();
    let trimmed = format!("{}{}", &RECORD[..start], &RECORD[end..]);
    let mut doc = MetadataDocument::parse(trimmed.as_bytes()).unwrap();

    let skipped = compute_assignments(&values(), today())
        .unwrap()
        .apply(&mut doc)
        .unwrap();

    let skipped_paths: Vec<_> = skipped.iter().map(|s| s.path.as_str()).collect();
    assert_eq!(skipped.len(), 4);
    assert!(skipped_paths.iter().all(|path| path.starts_with("./distinfo")));
    // The rest of the record was still written
    assert_eq!(doc.read(&p(METADATA_DATE), 0).unwrap(), "20240309");
}

#[test]
fn test_fill_removal_and_text_pass() {
    let mut doc = MetadataDocument::parse(RECORD.as_bytes()).unwrap();
    let ptcontac = p("./idinfo/ptcontac");

    assert_eq!(doc.remove_matching(&ptcontac, &["AUTHOR"]).unwrap(), 1);
    assert_eq!(doc.count(&ptcontac), 1);
    assert_eq!(doc.normalize_multi_value_domain(), 1);
    assert_eq!(doc.count(&p("./eainfo/detailed/attr/attrdomv")), 2);

    let edits = TextEdits::new()
        .with_fill_marker(DEFAULT_FILL_MARKER)
        .unwrap()
        .with_literal("Survey Team", "Coastal Survey Team")
        .with_regex(r"<edition>xxx</edition>", "<edition>2.0</edition>")
        .unwrap();
    let outcome = edits.apply(&doc.to_xml_string().unwrap());

    assert!(outcome.text.contains("Coastal Survey Team"));
    assert!(outcome.text.contains("<edition>2.0</edition>"));
    assert_eq!(outcome.regex_replacements, 1);
    // Untouched placeholders are still reported
    assert!(outcome.remaining_fills > 0);
    assert!(MetadataDocument::parse(outcome.text.as_bytes()).is_ok());
}
