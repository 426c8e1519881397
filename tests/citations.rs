//! Citation Enrichment Tests
//!
//! Enrichment against parsed documents, including the line numbering
//! contract shared with the formatter.

use doc_intel::citation::{enrich_citations, strip_citations};
use doc_intel::document::{
    denormalize_bounding_box, normalize_bounding_box, BoundingBox, Line, Page,
};
use doc_intel::formatter::{DigitalPdfFormatter, DocumentFormatter, FormatOptions};
use doc_intel::parser::parse_bbox_layout;
use doc_intel::{Document, Error, ParsedPdf};
use serde_json::json;

fn two_page_document() -> Document {
    let line = |text: &str, top: f64| Line {
        text: text.to_string(),
        bounding_box: BoundingBox::new(0.1, top, 0.5, top + 0.05),
    };
    Document::with_content(
        "statement.pdf",
        ParsedPdf::new(vec![
            Page {
                lines: vec![line("Statement", 0.0), line("Account 991", 0.1), line("Zeel", 0.2)],
                width: 612.0,
                height: 792.0,
            },
            Page {
                lines: vec![line("Balance 12.00", 0.5)],
                width: 612.0,
                height: 792.0,
            },
        ]),
    )
}

#[test]
fn test_zeel_scenario() {
    let response = json!({"name": {"value": "Zeel", "citations": [{"page": 0, "lines": [2]}]}});
    let enriched = enrich_citations(&response, &two_page_document()).unwrap();

    assert_eq!(
        enriched,
        json!({"name": {"value": "Zeel", "citations": [{
            "page": 0,
            "bboxes": [{"x0": 0.1, "top": 0.2, "x1": 0.5, "bottom": 0.25}]
        }]}})
    );
    assert_eq!(strip_citations(&response), json!({"name": "Zeel"}));
    assert_eq!(strip_citations(&enriched), json!({"name": "Zeel"}));
}

#[test]
fn test_bad_indices_never_fail() {
    let doc = two_page_document();

    let far_page = json!({"page": 999, "lines": [0]});
    let enriched = enrich_citations(&far_page, &doc).unwrap();
    assert_eq!(enriched, far_page);
    assert!(enriched.get("bboxes").is_none());

    let one_good = json!({"page": 1, "lines": [0, 999]});
    let enriched = enrich_citations(&one_good, &doc).unwrap();
    assert_eq!(enriched["bboxes"].as_array().map(Vec::len), Some(1));
    assert!(enriched.get("lines").is_none());
}

#[test]
fn test_citation_shaped_mapping_anywhere_is_enriched() {
    // Structural match: a user field that happens to look like a citation.
    let response = json!({"meta": {"page": 1, "lines": [0], "note": "kept"}});
    let enriched = enrich_citations(&response, &two_page_document()).unwrap();
    assert_eq!(enriched["meta"]["note"], "kept");
    assert_eq!(enriched["meta"]["bboxes"][0]["top"], json!(0.5));
}

#[test]
fn test_unparsed_document_is_rejected_before_walking() {
    let err = enrich_citations(&json!("anything"), &Document::new("x.pdf")).unwrap_err();
    assert!(matches!(err, Error::NotParsed(_)));
}

#[test]
fn test_formatter_line_numbers_match_citation_indices() {
    let xhtml = r#"<html><body><doc>
      <page width="500" height="1000">
        <flow><block>
          <line xMin="50" yMin="100" xMax="250" yMax="120"><word>Invoice</word><word>9</word></line>
          <line xMin="50" yMin="130" xMax="250" yMax="150"><word> </word></line>
          <line xMin="50" yMin="200" xMax="450" yMax="220"><word>Total</word><word>$40</word></line>
        </block></flow>
      </page>
    </doc></body></html>"#;
    let doc = Document::with_content("inv.pdf", parse_bbox_layout(xhtml).unwrap());

    let text = DigitalPdfFormatter
        .format_document(&doc, &FormatOptions::default())
        .unwrap();
    assert_eq!(text, "<page number=0>\n0: Invoice 9\n1: Total $40\n</page>");

    // The model cites "Total" by the number it saw in the prompt.
    let enriched = enrich_citations(&json!({"page": 0, "lines": [1]}), &doc).unwrap();
    let bbox: BoundingBox = serde_json::from_value(enriched["bboxes"][0].clone()).unwrap();
    let points = denormalize_bounding_box(&bbox, 500.0, 1000.0);
    assert!((points.x0 - 50.0).abs() < 1e-9);
    assert!((points.top - 200.0).abs() < 1e-9);
    assert!((points.x1 - 450.0).abs() < 1e-9);
    assert!((points.bottom - 220.0).abs() < 1e-9);
}

#[test]
fn test_normalize_round_trip() {
    let raw = BoundingBox::new(61.2, 79.2, 306.0, 396.0);
    let normalized = normalize_bounding_box(&raw, 612.0, 792.0);
    assert!((normalized.x0 - 0.1).abs() < 1e-9);
    assert!((normalized.bottom - 0.5).abs() < 1e-9);

    let back = denormalize_bounding_box(&normalized, 612.0, 792.0);
    assert!((back.x1 - raw.x1).abs() < 1e-9);
    assert!((back.top - raw.top).abs() < 1e-9);
}
