//! Display output and spans of load errors.

use citeproc_style::{Error, parse_csl};
use citeproc_xml::Span;
use insta::assert_snapshot;

#[test]
fn test_missing_attribute_display() {
    let err = Error::MissingAttribute {
        element: "style".to_string(),
        attribute: "class".to_string(),
        span: Span::new(0, 7),
    };
    assert_snapshot!(err.to_string(), @"<style> is missing required attribute 'class'");
}

#[test]
fn test_invalid_attribute_value_display() {
    let err = Error::InvalidAttributeValue {
        element: "style".to_string(),
        attribute: "class".to_string(),
        value: "invalid".to_string(),
        expected: "\"in-text\" or \"note\"".to_string(),
        span: Span::new(0, 7),
    };
    assert_snapshot!(
        err.to_string(),
        @r#"invalid value 'invalid' for class on <style>, expected "in-text" or "note""#
    );
}

#[test]
fn test_circular_macro_display() {
    let err = Error::CircularMacro {
        chain: vec!["a".into(), "b".into(), "a".into()],
        span: Span::default(),
    };
    assert_snapshot!(err.to_string(), @"circular macro reference: a -> b -> a");
}

#[test]
fn test_unknown_element_from_macro() {
    let csl = r#"<style class="in-text" version="1.0">
  <macro name="m"><foo/></macro>
  <citation><layout><text macro="m"/></layout></citation>
</style>"#;
    let err = parse_csl(csl).unwrap_err();
    assert_snapshot!(err.to_string(), @"unknown element <foo> inside <macro>");

    let span = err.span().unwrap();
    assert_eq!(&csl[span.start..span.start + 4], "<foo");
}

#[test]
fn test_unknown_element_inside_names() {
    let csl = r#"<style class="in-text" version="1.0">
  <citation><layout><names variable="author"><text value="x"/></names></layout></citation>
</style>"#;
    assert!(matches!(
        parse_csl(csl),
        Err(Error::UnknownElement { context, .. }) if context == "names"
    ));
}

#[test]
fn test_wrong_root_element() {
    let err = parse_csl("<locale/>").unwrap_err();
    assert_snapshot!(err.to_string(), @"expected <style> root element, found <locale>");
}

#[test]
fn test_malformed_xml_is_an_xml_error() {
    let err = parse_csl("<style class=\"in-text\" version=\"1.0\"><citation>").unwrap_err();
    assert!(matches!(err, Error::Xml(_)));
}
