use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle in PDF top-left coordinates.
///
/// Serializes as the plain `{x0, top, x1, bottom}` mapping that ends up in
/// enriched citations.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x0: f64,
    pub top: f64,
    pub x1: f64,
    pub bottom: f64,
}

impl BoundingBox {
    pub fn new(x0: f64, top: f64, x1: f64, bottom: f64) -> Self {
        Self {
            x0,
            top,
            x1,
            bottom,
        }
    }
}

/// Scale a point-space box into the 0-1 range of its page.
pub fn normalize_bounding_box(bbox: &BoundingBox, page_width: f64, page_height: f64) -> BoundingBox {
    BoundingBox {
        x0: bbox.x0 / page_width,
        top: bbox.top / page_height,
        x1: bbox.x1 / page_width,
        bottom: bbox.bottom / page_height,
    }
}

/// Inverse of [`normalize_bounding_box`].
pub fn denormalize_bounding_box(
    bbox: &BoundingBox,
    page_width: f64,
    page_height: f64,
) -> BoundingBox {
    BoundingBox {
        x0: bbox.x0 * page_width,
        top: bbox.top * page_height,
        x1: bbox.x1 * page_width,
        bottom: bbox.bottom * page_height,
    }
}
