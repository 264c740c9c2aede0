//! Comprehensive tests for fos-html
//!
//! Markup must arrive in the DOM with every attribute intact, including the
//! namespaced-looking `class:*` names custom elements read at upgrade time.

use fos_html::{HtmlParser, parse};

// ============================================================================
// STRUCTURE
// ============================================================================

#[test]
fn test_parse_minimal_html() {
    let doc = parse("").unwrap();
    assert!(doc.document_element().is_valid(), "html5ever always synthesizes <html>");
    assert!(doc.body().is_valid());
}

#[test]
fn test_parse_nested_structure() {
    let html = r#"
        <html>
            <head><title>Test</title></head>
            <body>
                <section id="outer"><div class="child"></div><div class="child"></div></section>
            </body>
        </html>
    "#;
    let doc = HtmlParser::new().parse(html).unwrap();
    let outer = doc.get_element_by_id("outer").unwrap();
    assert_eq!(doc.query_selector_all(outer, ".child").unwrap().len(), 2);
}

#[test]
fn test_whitespace_text_dropped() {
    let doc = parse("<body>\n   <p>x</p>\n</body>").unwrap();
    let kids: Vec<_> = doc.tree().children(doc.body()).collect();
    assert_eq!(kids.len(), 1);
}

// ============================================================================
// ATTRIBUTES
// ============================================================================

#[test]
fn test_colon_attributes_preserved() {
    let html = r#"<int-obs class:in="visible" class:out="hidden" class:targets=".child"
                          root-margin=" 10px " threshold="[0, 0.5]"></int-obs>"#;
    let doc = parse(html).unwrap();
    let el = doc.query_selector(doc.body(), "int-obs").unwrap().unwrap();

    assert_eq!(doc.get_attribute(el, "class:in"), Some("visible"));
    assert_eq!(doc.get_attribute(el, "class:out"), Some("hidden"));
    assert_eq!(doc.get_attribute(el, "class:targets"), Some(".child"));
    assert_eq!(doc.get_attribute(el, "root-margin"), Some(" 10px "));
    assert_eq!(doc.get_attribute(el, "threshold"), Some("[0, 0.5]"));
}

#[test]
fn test_attribute_names_lowercased() {
    let doc = parse(r#"<div DATA-X="1" Class="A"></div>"#).unwrap();
    let div = doc.query_selector(doc.body(), "div").unwrap().unwrap();
    assert_eq!(doc.get_attribute(div, "data-x"), Some("1"));
    assert!(doc.class_list(div).unwrap().contains("A"));
}

#[test]
fn test_custom_tag_is_lowercase_element() {
    let doc = parse("<INT-OBS init=false></INT-OBS>").unwrap();
    let el = doc.query_selector(doc.body(), "int-obs").unwrap().unwrap();
    assert_eq!(doc.tree().element(el).unwrap().tag_name, "int-obs");
    assert_eq!(doc.get_attribute(el, "init"), Some("false"));
}
