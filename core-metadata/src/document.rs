//! Metadata Document
//!
//! An FGDC/CSDGM record held as an element tree. Every mutation addresses
//! elements through an [`ElementPath`]; where an operation takes an index it
//! means the i-th match of the path in document order.
//!
//! ## Usage
//!
//! ```ignore
//! use core_metadata::{ElementPath, MetadataDocument};
//!
//! let mut doc = MetadataDocument::parse(xml.as_bytes())?;
//! let onlink = ElementPath::parse("./idinfo/citation/citeinfo/onlink")?;
//! doc.write(&onlink, 1, "https://www.sciencebase.gov/catalog/item/abc")?;
//! let removed = doc.remove_matching(&ElementPath::parse("./idinfo/ptcontac")?, &["AUTHOR"])?;
//! let xml = doc.to_xml_string()?;
//! ```

use xmltree::{Element, EmitterConfig, XMLNode};

use crate::error::{MetadataError, Result};
use crate::path::ElementPath;

const TITLE_PATH: &str = "./idinfo/citation/citeinfo/title";
const DOMAIN_VALUES_PATH: &str = "./eainfo/detailed/attr/attrdomv";

/// Child positions from the root down to one element
type Trail = Vec<usize>;

#[derive(Debug, Clone, PartialEq)]
pub struct MetadataDocument {
    root: Element,
}

impl MetadataDocument {
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let root = Element::parse(bytes).map_err(|e| MetadataError::Parse(e.to_string()))?;
        Ok(Self { root })
    }

    pub fn from_element(root: Element) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Element {
        &self.root
    }

    pub fn into_element(self) -> Element {
        self.root
    }

    /// Serialize with indentation. Whitespace between elements is not preserved.
    pub fn to_xml_string(&self) -> Result<String> {
        let mut out = Vec::new();
        self.root
            .write_with_config(&mut out, EmitterConfig::new().perform_indent(true))
            .map_err(|e| MetadataError::Serialize(e.to_string()))?;
        String::from_utf8(out).map_err(|e| MetadataError::Serialize(e.to_string()))
    }

    /// Number of elements the path matches
    pub fn count(&self, path: &ElementPath) -> usize {
        locate(&self.root, path).len()
    }

    /// Citation title, if the record has one
    pub fn title(&self) -> Option<String> {
        let path = ElementPath::parse(TITLE_PATH).ok()?;
        self.read(&path, 0).ok().filter(|t| !t.trim().is_empty())
    }

    /// Direct text of the `index`-th match; an element without text reads as `""`
    pub fn read(&self, path: &ElementPath, index: usize) -> Result<String> {
        let trail = locate(&self.root, path)
            .into_iter()
            .nth(index)
            .ok_or_else(|| MetadataError::NotFound(format!("{}[{}]", path, index)))?;
        let element = element_at(&self.root, &trail)
            .ok_or_else(|| MetadataError::NotFound(format!("{}[{}]", path, index)))?;
        Ok(direct_text(element))
    }

    /// Set the text of the `index`-th match.
    ///
    /// When the match does not exist yet, one element is appended under the
    /// first match of the parent path and receives the text. Indices past the
    /// next free position are rejected so a single call never creates more
    /// than one element.
    pub fn write(&mut self, path: &ElementPath, index: usize, text: &str) -> Result<()> {
        let matches = locate(&self.root, path);
        if let Some(trail) = matches.get(index) {
            let element = element_at_mut(&mut self.root, trail)
                .ok_or_else(|| MetadataError::structural(path.as_str(), "match vanished"))?;
            set_text(element, text);
            return Ok(());
        }

        if index > matches.len() {
            return Err(MetadataError::structural(
                path.as_str(),
                format!(
                    "cannot create index {} when only {} match(es) exist",
                    index,
                    matches.len()
                ),
            ));
        }

        let (tag, parent) = match (path.tag(), path.parent()) {
            (Some(tag), Some(parent)) => (tag.to_string(), parent),
            _ => {
                return Err(MetadataError::structural(
                    path.as_str(),
                    "path addresses the document root",
                ))
            }
        };
        let container = first_match_mut(&mut self.root, &parent).ok_or_else(|| {
            MetadataError::structural(path.as_str(), format!("container '{}' is missing", parent))
        })?;

        let mut element = Element::new(&tag);
        set_text(&mut element, text);
        container.children.push(XMLNode::Element(element));
        Ok(())
    }

    /// Append `element` as the last child of the first container match
    pub fn insert_child(&mut self, container_path: &ElementPath, element: Element) -> Result<()> {
        let container = first_match_mut(&mut self.root, container_path)
            .ok_or_else(|| MetadataError::NotFound(container_path.to_string()))?;
        container.children.push(XMLNode::Element(element));
        Ok(())
    }

    /// Like [`insert_child`](Self::insert_child), but does nothing when the
    /// container already has a child with the same tag, attributes and
    /// content. Returns whether the element was appended.
    pub fn insert_child_once(
        &mut self,
        container_path: &ElementPath,
        element: Element,
    ) -> Result<bool> {
        let container = first_match_mut(&mut self.root, container_path)
            .ok_or_else(|| MetadataError::NotFound(container_path.to_string()))?;
        let present = container
            .children
            .iter()
            .any(|node| matches!(node, XMLNode::Element(child) if same_content(child, &element)));
        if present {
            return Ok(false);
        }
        container.children.push(XMLNode::Element(element));
        Ok(true)
    }

    /// Replace, in place, the first child of the container that shares `element`'s tag
    pub fn replace_element(
        &mut self,
        container_path: &ElementPath,
        element: Element,
    ) -> Result<()> {
        let container = first_match_mut(&mut self.root, container_path)
            .ok_or_else(|| MetadataError::NotFound(container_path.to_string()))?;

        let slot = container
            .children
            .iter_mut()
            .find(|node| matches!(node, XMLNode::Element(child) if child.name == element.name))
            .ok_or_else(|| {
                MetadataError::NotFound(format!("{}/{}", container_path, element.name))
            })?;
        *slot = XMLNode::Element(element);
        Ok(())
    }

    /// Remove every element matching `path` whose text, at any depth,
    /// contains one of `markers`. Only direct children of the first
    /// container match are considered. Returns how many were removed.
    pub fn remove_matching<S: AsRef<str>>(
        &mut self,
        path: &ElementPath,
        markers: &[S],
    ) -> Result<usize> {
        let tag = path
            .tag()
            .ok_or_else(|| MetadataError::structural(path.as_str(), "path has no final tag"))?
            .to_string();
        let parent = path
            .parent()
            .ok_or_else(|| MetadataError::structural(path.as_str(), "path has no container"))?;
        let container = first_match_mut(&mut self.root, &parent).ok_or_else(|| {
            MetadataError::structural(path.as_str(), format!("container '{}' is missing", parent))
        })?;

        let before = container.children.len();
        container.children.retain(|node| match node {
            XMLNode::Element(child) if child.name == tag => !contains_marker(child, markers),
            _ => true,
        });
        Ok(before - container.children.len())
    }

    /// Split every attribute-domain element holding more than one value
    /// element into one clone per value, in place and in order. Returns the
    /// number of elements repaired; a second call on the result returns 0.
    pub fn normalize_multi_value_domain(&mut self) -> usize {
        let Ok(path) = ElementPath::parse(DOMAIN_VALUES_PATH) else {
            return 0;
        };

        let mut repaired = 0;
        // Reverse document order keeps the remaining trails valid while splicing
        for trail in locate(&self.root, &path).into_iter().rev() {
            let Some((&position, parent_trail)) = trail.split_last() else {
                continue;
            };
            let Some(parent) = element_at_mut(&mut self.root, parent_trail) else {
                continue;
            };
            let Some(XMLNode::Element(domain)) = parent.children.get(position) else {
                continue;
            };

            let values: Vec<&Element> = domain
                .children
                .iter()
                .filter_map(|node| match node {
                    XMLNode::Element(e) => Some(e),
                    _ => None,
                })
                .collect();
            if values.len() <= 1 {
                continue;
            }

            let clones: Vec<XMLNode> = values
                .into_iter()
                .map(|value| {
                    let mut single = domain.clone();
                    single.children = vec![XMLNode::Element(value.clone())];
                    XMLNode::Element(single)
                })
                .collect();
            parent.children.splice(position..=position, clones);
            repaired += 1;
        }
        repaired
    }
}

/// Parse a standalone element, e.g. a configured addition
pub fn parse_element(xml: &str) -> Result<Element> {
    Element::parse(xml.as_bytes()).map_err(|e| MetadataError::Parse(e.to_string()))
}

fn locate(root: &Element, path: &ElementPath) -> Vec<Trail> {
    if let Some(name) = path.root_name() {
        if name != root.name {
            return Vec::new();
        }
    }

    let mut frontier: Vec<(Trail, &Element)> = vec![(Vec::new(), root)];
    for segment in path.segments() {
        let mut next = Vec::new();
        for (trail, element) in frontier {
            for (i, node) in element.children.iter().enumerate() {
                if let XMLNode::Element(child) = node {
                    if child.name == *segment {
                        let mut child_trail = trail.clone();
                        child_trail.push(i);
                        next.push((child_trail, child));
                    }
                }
            }
        }
        frontier = next;
    }
    frontier.into_iter().map(|(trail, _)| trail).collect()
}

fn element_at<'a>(root: &'a Element, trail: &[usize]) -> Option<&'a Element> {
    let mut current = root;
    for &i in trail {
        current = match current.children.get(i) {
            Some(XMLNode::Element(e)) => e,
            _ => return None,
        };
    }
    Some(current)
}

fn element_at_mut<'a>(root: &'a mut Element, trail: &[usize]) -> Option<&'a mut Element> {
    let mut current = root;
    for &i in trail {
        current = match current.children.get_mut(i) {
            Some(XMLNode::Element(e)) => e,
            _ => return None,
        };
    }
    Some(current)
}

fn first_match_mut<'a>(root: &'a mut Element, path: &ElementPath) -> Option<&'a mut Element> {
    let trail = locate(root, path).into_iter().next()?;
    element_at_mut(root, &trail)
}

fn direct_text(element: &Element) -> String {
    element
        .children
        .iter()
        .filter_map(|node| match node {
            XMLNode::Text(t) | XMLNode::CData(t) => Some(t.as_str()),
            _ => None,
        })
        .collect()
}

fn child_elements(element: &Element) -> impl Iterator<Item = &Element> {
    element.children.iter().filter_map(|node| match node {
        XMLNode::Element(child) => Some(child),
        _ => None,
    })
}

/// Tag, attributes, trimmed text and child elements all match
fn same_content(a: &Element, b: &Element) -> bool {
    a.name == b.name
        && a.attributes == b.attributes
        && direct_text(a).trim() == direct_text(b).trim()
        && child_elements(a).count() == child_elements(b).count()
        && child_elements(a)
            .zip(child_elements(b))
            .all(|(x, y)| same_content(x, y))
}

fn set_text(element: &mut Element, text: &str) {
    element
        .children
        .retain(|node| !matches!(node, XMLNode::Text(_) | XMLNode::CData(_)));
    element.children.insert(0, XMLNode::Text(text.to_string()));
}

fn contains_marker<S: AsRef<str>>(element: &Element, markers: &[S]) -> bool {
    element.children.iter().any(|node| match node {
        XMLNode::Text(t) | XMLNode::CData(t) => {
            markers.iter().any(|m| t.contains(m.as_ref()))
        }
        XMLNode::Element(child) => contains_marker(child, markers),
        _ => false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<metadata>
  <idinfo>
    <citation>
      <citeinfo>
        <title>Marsh vulnerability, Fire Island</title>
        <onlink>https://example.com/first</onlink>
        <lworkcit>
          <citeinfo>
            <onlink>https://example.com/larger</onlink>
          </citeinfo>
        </lworkcit>
      </citeinfo>
    </citation>
    <ptcontac>
      <cntinfo><cntperp><cntper>AUTHOR NAME</cntper></cntperp></cntinfo>
    </ptcontac>
    <ptcontac>
      <cntinfo><cntperp><cntper>Jane Doe</cntper></cntperp></cntinfo>
    </ptcontac>
    <keywords/>
  </idinfo>
  <distinfo>
    <distrib>Old distributor</distrib>
    <resdesc>Data</resdesc>
  </distinfo>
  <eainfo>
    <detailed>
      <attr>
        <attrlabl>FID</attrlabl>
        <attrdomv><edom>A</edom><edom>B</edom><udom>C</udom></attrdomv>
      </attr>
      <attr>
        <attrlabl>Shape</attrlabl>
        <attrdomv><udom>Coordinates</udom></attrdomv>
      </attr>
    </detailed>
  </eainfo>
</metadata>"#;

    fn doc() -> MetadataDocument {
        MetadataDocument::parse(SAMPLE.as_bytes()).unwrap()
    }

    fn p(s: &str) -> ElementPath {
        ElementPath::parse(s).unwrap()
    }

    #[test]
    fn test_read_by_index() {
        let doc = doc();
        assert_eq!(
            doc.read(&p("./idinfo/citation/citeinfo/onlink"), 0).unwrap(),
            "https://example.com/first"
        );
        assert!(matches!(
            doc.read(&p("./idinfo/citation/citeinfo/onlink"), 1),
            Err(MetadataError::NotFound(_))
        ));
        assert_eq!(doc.read(&p("./idinfo/keywords"), 0).unwrap(), "");
        assert_eq!(doc.title().as_deref(), Some("Marsh vulnerability, Fire Island"));
    }

    #[test]
    fn test_write_existing_and_new_index() {
        let mut doc = doc();
        let onlink = p("./idinfo/citation/citeinfo/onlink");

        doc.write(&onlink, 0, "https://doi.org/10.5066/ABCD").unwrap();
        doc.write(&onlink, 1, "https://www.sciencebase.gov/catalog/item/abc")
            .unwrap();

        assert_eq!(doc.count(&onlink), 2);
        assert_eq!(doc.read(&onlink, 0).unwrap(), "https://doi.org/10.5066/ABCD");
        assert_eq!(
            doc.read(&onlink, 1).unwrap(),
            "https://www.sciencebase.gov/catalog/item/abc"
        );
        // The larger-work link is a different path and stays put
        assert_eq!(
            doc.read(&p("./idinfo/citation/citeinfo/lworkcit/citeinfo/onlink"), 0)
                .unwrap(),
            "https://example.com/larger"
        );
    }

    #[test]
    fn test_write_creates_exactly_one_element() {
        let mut doc = doc();
        let edition = p("./idinfo/citation/citeinfo/edition");
        doc.write(&edition, 0, "1.0").unwrap();
        assert_eq!(doc.count(&edition), 1);

        assert!(matches!(
            doc.write(&edition, 3, "2.0"),
            Err(MetadataError::Structural { .. })
        ));
        assert_eq!(doc.count(&edition), 1);
    }

    #[test]
    fn test_write_without_container_is_structural() {
        let mut doc = doc();
        let err = doc.write(&p("./metainfo/metd"), 0, "20240101").unwrap_err();
        assert!(matches!(err, MetadataError::Structural { .. }));
    }

    #[test]
    fn test_insert_child_appends_last() {
        let mut doc = doc();
        let element = parse_element("<native>ArcGIS</native>").unwrap();
        doc.insert_child(&p("./idinfo"), element).unwrap();

        let idinfo = doc.root().get_child("idinfo").unwrap();
        let last = idinfo
            .children
            .iter()
            .rev()
            .find_map(|n| match n {
                XMLNode::Element(e) => Some(e.name.clone()),
                _ => None,
            })
            .unwrap();
        assert_eq!(last, "native");

        let err = doc
            .insert_child(&p("./spdoinfo"), parse_element("<x/>").unwrap())
            .unwrap_err();
        assert!(matches!(err, MetadataError::NotFound(_)));
    }

    #[test]
    fn test_insert_child_once_skips_equivalent_child() {
        let mut doc = doc();
        let crossref = "<crossref><citeinfo><title>Related</title></citeinfo></crossref>";
        let idinfo = p("./idinfo");

        assert!(doc.insert_child_once(&idinfo, parse_element(crossref).unwrap()).unwrap());
        // Same content after a save and reload, with indentation in between
        let mut reloaded = MetadataDocument::parse(doc.to_xml_string().unwrap().as_bytes()).unwrap();
        assert!(!reloaded
            .insert_child_once(&idinfo, parse_element(crossref).unwrap())
            .unwrap());
        assert_eq!(reloaded.count(&p("./idinfo/crossref")), 1);

        let other = "<crossref><citeinfo><title>Other</title></citeinfo></crossref>";
        assert!(reloaded.insert_child_once(&idinfo, parse_element(other).unwrap()).unwrap());
        assert_eq!(reloaded.count(&p("./idinfo/crossref")), 2);
    }

    #[test]
    fn test_replace_element_preserves_position() {
        let mut doc = doc();
        let element = parse_element("<distrib>New distributor</distrib>").unwrap();
        doc.replace_element(&p("./distinfo"), element).unwrap();

        assert_eq!(doc.read(&p("./distinfo/distrib"), 0).unwrap(), "New distributor");
        let distinfo = doc.root().get_child("distinfo").unwrap();
        let first = distinfo.children.iter().find_map(|n| match n {
            XMLNode::Element(e) => Some(e.name.as_str()),
            _ => None,
        });
        assert_eq!(first, Some("distrib"));

        let missing = parse_element("<stdorder/>").unwrap();
        assert!(matches!(
            doc.replace_element(&p("./distinfo"), missing),
            Err(MetadataError::NotFound(_))
        ));
        let no_container = parse_element("<distrib/>").unwrap();
        assert!(matches!(
            doc.replace_element(&p("./nothing"), no_container),
            Err(MetadataError::NotFound(_))
        ));
    }

    #[test]
    fn test_remove_matching_only_removes_marked_element() {
        let mut doc = doc();
        let contacts = p("./idinfo/ptcontac");

        let removed = doc.remove_matching(&contacts, &["AUTHOR"]).unwrap();
        assert_eq!(removed, 1);
        assert_eq!(doc.count(&contacts), 1);
        assert_eq!(
            doc.read(&p("./idinfo/ptcontac/cntinfo/cntperp/cntper"), 0)
                .unwrap(),
            "Jane Doe"
        );
        assert_eq!(doc.count(&p("./idinfo/keywords")), 1);
        assert_eq!(doc.count(&p("./idinfo/citation")), 1);
    }

    #[test]
    fn test_remove_matching_missing_container() {
        let mut doc = doc();
        let err = doc
            .remove_matching(&p("./dataqual/lineage/srcinfo"), &["xxx"])
            .unwrap_err();
        assert!(matches!(err, MetadataError::Structural { .. }));
    }

    #[test]
    fn test_normalize_splits_domains_in_order() {
        let mut doc = doc();
        let domains = p("./eainfo/detailed/attr/attrdomv");
        assert_eq!(doc.count(&domains), 2);

        assert_eq!(doc.normalize_multi_value_domain(), 1);
        assert_eq!(doc.count(&domains), 4);
        assert_eq!(doc.read(&p("./eainfo/detailed/attr/attrdomv/edom"), 0).unwrap(), "A");
        assert_eq!(doc.read(&p("./eainfo/detailed/attr/attrdomv/edom"), 1).unwrap(), "B");
        assert_eq!(doc.read(&p("./eainfo/detailed/attr/attrdomv/udom"), 0).unwrap(), "C");

        // The label still precedes the split domains
        let attr = doc
            .root()
            .get_child("eainfo")
            .and_then(|e| e.get_child("detailed"))
            .and_then(|e| e.get_child("attr"))
            .unwrap();
        let names: Vec<_> = attr
            .children
            .iter()
            .filter_map(|n| match n {
                XMLNode::Element(e) => Some(e.name.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(names, vec!["attrlabl", "attrdomv", "attrdomv", "attrdomv"]);
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let mut once = doc();
        once.normalize_multi_value_domain();
        let mut twice = once.clone();
        assert_eq!(twice.normalize_multi_value_domain(), 0);
        assert_eq!(once, twice);
        assert_eq!(once.to_xml_string().unwrap(), twice.to_xml_string().unwrap());
    }

    #[test]
    fn test_serialization_round_trips() {
        let doc = doc();
        let xml = doc.to_xml_string().unwrap();
        let reparsed = MetadataDocument::parse(xml.as_bytes()).unwrap();
        assert_eq!(reparsed.title(), doc.title());
        assert_eq!(reparsed.count(&p("./idinfo/ptcontac")), 2);
    }

    #[test]
    fn test_absolute_path_must_name_root() {
        let doc = doc();
        assert_eq!(doc.count(&p("/metadata/idinfo")), 1);
        assert_eq!(doc.count(&p("/other/idinfo")), 0);
    }

    #[test]
    fn test_parse_error() {
        assert!(matches!(
            MetadataDocument::parse(b"<metadata><idinfo></metadata>"),
            Err(MetadataError::Parse(_))
        ));
    }
}
