//! WebAssembly bindings for locus-viz.
//!
//! Exposes the panel geometry model to JavaScript. Setters take arbitrary
//! `JsValue`s and apply the same per-field leniency as the Rust API, so a
//! caller passing `"q"` or `{}` simply leaves that field unchanged.
//!
//! # Usage (JavaScript)
//!
//! ```javascript
//! import init, { PanelGeometry, merge_layouts_json } from 'locus-viz';
//!
//! await init();
//!
//! const geometry = new PanelGeometry(500, 500, 1, 1);
//! geometry.set_margin(700, 1000, 900, 800);
//! console.log(geometry.margin_top, geometry.cliparea_width); // 150 0
//! ```

use wasm_bindgen::prelude::*;

use crate::geometry::{GeometryState, Scalar};
use crate::layout;

// ============================================================================
// Helper Functions
// ============================================================================

fn scalar(value: &JsValue) -> Scalar {
    if let Some(n) = value.as_f64() {
        Scalar::from(n)
    } else if let Some(s) = value.as_string() {
        Scalar::from(s)
    } else {
        Scalar::NONE
    }
}

fn js_error(err: &crate::Error) -> JsValue {
    JsValue::from_str(&err.to_string())
}

// ============================================================================
// Geometry
// ============================================================================

/// Panel geometry with lenient, per-field validated setters.
#[wasm_bindgen]
#[derive(Debug, Clone, Default)]
pub struct PanelGeometry {
    inner: GeometryState,
}

#[wasm_bindgen]
impl PanelGeometry {
    /// Create a geometry with the given size and minimum size.
    #[wasm_bindgen(constructor)]
    pub fn new(width: f64, height: f64, min_width: f64, min_height: f64) -> Self {
        Self {
            inner: GeometryState::new(width, height, min_width, min_height),
        }
    }

    /// Resize; invalid values leave the axis unchanged.
    pub fn set_dimensions(&mut self, width: &JsValue, height: &JsValue) {
        self.inner.set_dimensions(scalar(width), scalar(height));
    }

    /// Move within a parent of the given extent.
    pub fn set_origin(&mut self, x: &JsValue, y: &JsValue, parent_width: f64, parent_height: f64) {
        self.inner
            .set_origin(scalar(x), scalar(y), parent_width, parent_height);
    }

    /// Set margins; invalid values keep the previous side.
    pub fn set_margin(&mut self, top: &JsValue, right: &JsValue, bottom: &JsValue, left: &JsValue) {
        self.inner
            .set_margin(scalar(top), scalar(right), scalar(bottom), scalar(left));
    }

    /// Record the parent extent; re-clamps the origin.
    pub fn set_parent_extent(&mut self, parent_width: f64, parent_height: f64) {
        self.inner.set_parent_extent(parent_width, parent_height);
    }

    /// Width as a fraction of the parent.
    #[wasm_bindgen(getter)]
    pub fn proportional_width(&self) -> f64 {
        self.inner.proportional_width()
    }

    /// Height as a fraction of the parent.
    #[wasm_bindgen(getter)]
    pub fn proportional_height(&self) -> f64 {
        self.inner.proportional_height()
    }

    /// Current width.
    #[wasm_bindgen(getter)]
    pub fn width(&self) -> f64 {
        self.inner.width()
    }

    /// Current height.
    #[wasm_bindgen(getter)]
    pub fn height(&self) -> f64 {
        self.inner.height()
    }

    /// Origin x.
    #[wasm_bindgen(getter)]
    pub fn origin_x(&self) -> f64 {
        self.inner.origin().x
    }

    /// Origin y.
    #[wasm_bindgen(getter)]
    pub fn origin_y(&self) -> f64 {
        self.inner.origin().y
    }

    /// Top margin.
    #[wasm_bindgen(getter)]
    pub fn margin_top(&self) -> f64 {
        self.inner.margin().top
    }

    /// Right margin.
    #[wasm_bindgen(getter)]
    pub fn margin_right(&self) -> f64 {
        self.inner.margin().right
    }

    /// Bottom margin.
    #[wasm_bindgen(getter)]
    pub fn margin_bottom(&self) -> f64 {
        self.inner.margin().bottom
    }

    /// Left margin.
    #[wasm_bindgen(getter)]
    pub fn margin_left(&self) -> f64 {
        self.inner.margin().left
    }

    /// Clip area x.
    #[wasm_bindgen(getter)]
    pub fn cliparea_x(&self) -> f64 {
        self.inner.cliparea().origin.x
    }

    /// Clip area y.
    #[wasm_bindgen(getter)]
    pub fn cliparea_y(&self) -> f64 {
        self.inner.cliparea().origin.y
    }

    /// Clip area width.
    #[wasm_bindgen(getter)]
    pub fn cliparea_width(&self) -> f64 {
        self.inner.cliparea().width
    }

    /// Clip area height.
    #[wasm_bindgen(getter)]
    pub fn cliparea_height(&self) -> f64 {
        self.inner.cliparea().height
    }
}

// ============================================================================
// Layouts
// ============================================================================

/// Merge a JSON layout over a JSON default and return the merged JSON.
#[wasm_bindgen]
pub fn merge_layouts_json(custom: &str, default: &str) -> Result<String, JsValue> {
    let custom: serde_json::Value =
        serde_json::from_str(custom).map_err(|e| js_error(&e.into()))?;
    let default: serde_json::Value =
        serde_json::from_str(default).map_err(|e| js_error(&e.into()))?;
    let merged = layout::merge_layouts(&custom, &default).map_err(|e| js_error(&e))?;
    Ok(merged.to_string())
}
