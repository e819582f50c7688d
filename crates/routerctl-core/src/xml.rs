//! XML helpers for the router's web API.
//!
//! Every request and response body exchanged with the router is a small XML
//! document. This module builds request bodies, extracts fields from
//! responses and merges two same-rooted responses into one tree.
//!
//! # Merging
//!
//! [`merge`] combines two documents that share a root tag:
//!
//! - attributes are unioned, the second document wins on conflicts
//! - child elements are matched by tag name one level at a time, the first
//!   same-tagged sibling in the second tree is merged recursively
//! - children present in only one tree pass through unchanged
//! - the first document's order is kept, unmatched children of the second
//!   document are appended after it
//! - text of the second element replaces the first's when it is non-empty
//!
//! ```
//! use routerctl_core::xml::{child_text, merge, parse};
//!
//! let info = parse("<response><DeviceName>B612</DeviceName></response>").unwrap();
//! let signal = parse("<response><rsrp>-95dBm</rsrp></response>").unwrap();
//! let merged = merge(&info, &signal).unwrap();
//!
//! assert_eq!(child_text(&merged, "DeviceName").as_deref(), Some("B612"));
//! assert_eq!(child_text(&merged, "rsrp").as_deref(), Some("-95dBm"));
//! ```

use xmltree::{Element, EmitterConfig, XMLNode};

use crate::error::Error;

/// Declaration prefixed to every request body.
pub const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;

/// Marker the router returns for successful control requests.
pub const OK_MARKER: &str = "<response>OK</response>";

/// Parses a response body into an element tree.
pub fn parse(body: &str) -> Result<Element, Error> {
    Ok(Element::parse(body.as_bytes())?)
}

/// Returns the trimmed text of the first child element named `name`.
pub fn child_text(element: &Element, name: &str) -> Option<String> {
    element
        .get_child(name)
        .and_then(|child| child.get_text())
        .map(|text| text.trim().to_string())
}

/// Like [`child_text`] but returns an empty string for missing fields.
pub fn child_text_or_default(element: &Element, name: &str) -> String {
    child_text(element, name).unwrap_or_default()
}

/// Iterates over the element children of `element`, skipping text nodes.
pub fn child_elements(element: &Element) -> impl Iterator<Item = &Element> {
    element.children.iter().filter_map(XMLNode::as_element)
}

/// Builds a `<request>` body with one child element per field.
///
/// # Example
///
/// ```
/// use routerctl_core::xml::request_body;
///
/// let body = request_body(&[("Control", "1")]).unwrap();
/// assert_eq!(
///     body,
///     r#"<?xml version="1.0" encoding="UTF-8"?><request><Control>1</Control></request>"#
/// );
/// ```
pub fn request_body(fields: &[(&str, &str)]) -> Result<String, Error> {
    let mut request = Element::new("request");
    for (name, value) in fields {
        let mut field = Element::new(name);
        field.children.push(XMLNode::Text((*value).to_string()));
        request.children.push(XMLNode::Element(field));
    }

    Ok(format!("{}{}", XML_DECLARATION, to_string(&request)?))
}

/// Serialises an element without a document declaration.
pub fn to_string(element: &Element) -> Result<String, Error> {
    let mut buf = Vec::new();
    let config = EmitterConfig::new()
        .write_document_declaration(false)
        .perform_indent(false);
    element
        .write_with_config(&mut buf, config)
        .map_err(|e| Error::Parse(format!("failed to serialise XML: {}", e)))?;
    String::from_utf8(buf).map_err(|e| Error::Parse(format!("serialised XML is not UTF-8: {}", e)))
}

/// Converts an `<error>` document into [`Error::Api`].
///
/// Returns `None` for any other root element.
pub fn api_error(element: &Element) -> Option<Error> {
    if element.name != "error" {
        return None;
    }
    Some(Error::Api {
        code: child_text_or_default(element, "code"),
        message: child_text_or_default(element, "message"),
    })
}

/// Merges two documents sharing a root tag.
///
/// # Errors
///
/// Returns [`Error::RootMismatch`] if the root tags differ.
pub fn merge(first: &Element, second: &Element) -> Result<Element, Error> {
    if first.name != second.name {
        return Err(Error::RootMismatch {
            left: first.name.clone(),
            right: second.name.clone(),
        });
    }
    Ok(merge_elements(first, second))
}

fn merge_elements(first: &Element, second: &Element) -> Element {
    let mut merged = Element::new(&first.name);
    merged.prefix = first.prefix.clone();
    merged.namespace = first.namespace.clone();
    merged.namespaces = first.namespaces.clone();

    merged.attributes = first.attributes.clone();
    for (key, value) in &second.attributes {
        merged.attributes.insert(key.clone(), value.clone());
    }

    let text_source = if has_text(second) { second } else { first };
    merged.children.extend(
        text_source
            .children
            .iter()
            .filter(|node| matches!(node, XMLNode::Text(_) | XMLNode::CData(_)))
            .cloned(),
    );

    for child in child_elements(first) {
        match second.get_child(child.name.as_str()) {
            Some(other) => merged
                .children
                .push(XMLNode::Element(merge_elements(child, other))),
            None => merged.children.push(XMLNode::Element(child.clone())),
        }
    }

    for child in child_elements(second) {
        if first.get_child(child.name.as_str()).is_none() {
            merged.children.push(XMLNode::Element(child.clone()));
        }
    }

    merged
}

fn has_text(element: &Element) -> bool {
    element
        .get_text()
        .is_some_and(|text| !text.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(element: &Element) -> Vec<&str> {
        child_elements(element).map(|e| e.name.as_str()).collect()
    }

    #[test]
    fn test_merge_with_itself_is_identity() {
        let doc = parse(
            r#"<response version="2"><DeviceName>B612</DeviceName><Wan><Ip>10.0.0.2</Ip><Mask>255.0.0.0</Mask></Wan></response>"#,
        )
        .unwrap();
        let merged = merge(&doc, &doc).unwrap();
        assert_eq!(merged, doc);
    }

    #[test]
    fn test_merge_disjoint_children_keeps_first_order() {
        let a = parse("<response><a>1</a><b>2</b></response>").unwrap();
        let b = parse("<response><c>3</c><d>4</d></response>").unwrap();
        let merged = merge(&a, &b).unwrap();

        assert_eq!(merged.name, "response");
        assert_eq!(names(&merged), vec!["a", "b", "c", "d"]);
        assert_eq!(child_text(&merged, "c").as_deref(), Some("3"));
    }

    #[test]
    fn test_merge_attributes_second_wins() {
        let a = parse(r#"<response x="1" y="1"/>"#).unwrap();
        let b = parse(r#"<response y="2" z="2"/>"#).unwrap();
        let merged = merge(&a, &b).unwrap();

        assert_eq!(merged.attributes.get("x").map(String::as_str), Some("1"));
        assert_eq!(merged.attributes.get("y").map(String::as_str), Some("2"));
        assert_eq!(merged.attributes.get("z").map(String::as_str), Some("2"));
    }

    #[test]
    fn test_merge_recurses_into_matching_children() {
        let a = parse("<response><Wan><Ip>10.0.0.2</Ip></Wan><x>1</x></response>").unwrap();
        let b = parse("<response><Wan><Ipv6>fe80::1</Ipv6></Wan></response>").unwrap();
        let merged = merge(&a, &b).unwrap();

        assert_eq!(names(&merged), vec!["Wan", "x"]);
        let wan = merged.get_child("Wan").unwrap();
        assert_eq!(names(wan), vec!["Ip", "Ipv6"]);
    }

    #[test]
    fn test_merge_matches_only_first_same_tagged_sibling() {
        let a = parse("<r><h><id>1</id></h><h><id>2</id></h></r>").unwrap();
        let b = parse("<r><h><name>x</name></h><h><name>y</name></h></r>").unwrap();
        let merged = merge(&a, &b).unwrap();

        // both of a's <h> merge with b's first <h>; b's second <h> is never used
        let hosts: Vec<_> = child_elements(&merged).collect();
        assert_eq!(hosts.len(), 2);
        for host in hosts {
            assert_eq!(child_text(host, "name").as_deref(), Some("x"));
        }
    }

    #[test]
    fn test_merge_text_prefers_second_when_present() {
        let a = parse("<r><v>old</v><w>keep</w></r>").unwrap();
        let b = parse("<r><v>new</v><w/></r>").unwrap();
        let merged = merge(&a, &b).unwrap();

        assert_eq!(child_text(&merged, "v").as_deref(), Some("new"));
        assert_eq!(child_text(&merged, "w").as_deref(), Some("keep"));
    }

    #[test]
    fn test_merge_root_mismatch_fails() {
        let a = parse("<response/>").unwrap();
        let b = parse("<error><code>125002</code></error>").unwrap();
        assert!(matches!(
            merge(&a, &b),
            Err(Error::RootMismatch { left, right }) if left == "response" && right == "error"
        ));
    }

    #[test]
    fn test_request_body_escapes_values() {
        let body = request_body(&[("username", "a<b&c")]).unwrap();
        assert!(body.starts_with(XML_DECLARATION));
        assert!(body.contains("<username>a&lt;b&amp;c</username>"));
    }

    #[test]
    fn test_api_error() {
        let doc = parse("<error><code>108006</code><message></message></error>").unwrap();
        assert!(matches!(
            api_error(&doc),
            Some(Error::Api { code, .. }) if code == "108006"
        ));

        let doc = parse("<response>OK</response>").unwrap();
        assert!(api_error(&doc).is_none());
    }

    #[test]
    fn test_child_text_trims_and_defaults() {
        let doc = parse("<response><salt>  abcd  </salt></response>").unwrap();
        assert_eq!(child_text(&doc, "salt").as_deref(), Some("abcd"));
        assert_eq!(child_text(&doc, "missing"), None);
        assert_eq!(child_text_or_default(&doc, "missing"), "");
    }
}
