//! Reader for `pdftotext -bbox-layout` XHTML.
//!
//! The output nests `page > flow > block > line > word`; pages carry their
//! size in points and lines carry `xMin/yMin/xMax/yMax`. The HTML parser
//! lowercases attribute names, so both spellings are accepted.

use scraper::{ElementRef, Html, Selector};

use super::ParseError;
use crate::document::{normalize_bounding_box, BoundingBox, Line, Page, ParsedPdf};

/// Build a [`ParsedPdf`] from bbox-layout XHTML.
///
/// Line text is the line's words joined by single spaces; blank lines are
/// dropped so that line numbers only count lines the model can see.
pub fn parse_bbox_layout(xhtml: &str) -> Result<ParsedPdf, ParseError> {
    let document = Html::parse_document(xhtml);
    let page_sel = selector("page")?;
    let line_sel = selector("line")?;
    let word_sel = selector("word")?;

    let mut pages = Vec::new();
    for (page_idx, page_el) in document.select(&page_sel).enumerate() {
        let width = float_attr(&page_el, "width")?;
        let height = float_attr(&page_el, "height")?;
        if width <= 0.0 || height <= 0.0 {
            return Err(ParseError::InvalidLayout(format!(
                "page {} has zero size ({}x{})",
                page_idx, width, height
            )));
        }

        let mut lines = Vec::new();
        for line_el in page_el.select(&line_sel) {
            let text = line_el
                .select(&word_sel)
                .map(|w| w.text().collect::<String>())
                .map(|w| w.trim().to_string())
                .filter(|w| !w.is_empty())
                .collect::<Vec<_>>()
                .join(" ");
            if text.is_empty() {
                continue;
            }

            let raw = BoundingBox::new(
                float_attr(&line_el, "xMin")?,
                float_attr(&line_el, "yMin")?,
                float_attr(&line_el, "xMax")?,
                float_attr(&line_el, "yMax")?,
            );
            lines.push(Line {
                text,
                bounding_box: normalize_bounding_box(&raw, width, height),
            });
        }

        pages.push(Page {
            lines,
            width,
            height,
        });
    }

    Ok(ParsedPdf::new(pages))
}

fn selector(s: &str) -> Result<Selector, ParseError> {
    Selector::parse(s).map_err(|e| ParseError::InvalidLayout(format!("bad selector {}: {:?}", s, e)))
}

fn float_attr(el: &ElementRef<'_>, name: &str) -> Result<f64, ParseError> {
    let value = el
        .value()
        .attr(name)
        .or_else(|| el.value().attr(&name.to_lowercase()))
        .ok_or_else(|| {
            ParseError::InvalidLayout(format!("<{}> missing {}", el.value().name(), name))
        })?;
    value.trim().parse::<f64>().map_err(|_| {
        ParseError::InvalidLayout(format!(
            "<{}> has non-numeric {}: {}",
            el.value().name(),
            name,
            value
        ))
    })
}
