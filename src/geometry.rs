//! Panel geometry: dimensions, origin, margins and the derived clip area.
//!
//! Every setter validates its arguments per axis. Malformed input never
//! fails; the affected field simply keeps its previous value. After every
//! mutation the following hold:
//!
//! - `width >= min_width` and `height >= min_height`
//! - `top + bottom <= height` and `left + right <= width`
//! - the clip area is the panel rectangle minus its margins
//! - once a parent extent is known, `0 <= origin <= parent - size` per axis
//!   and the proportional size is `size / parent`

use serde_json::Value;
use tracing::debug;

/// A 2D point with floating-point coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    /// X coordinate.
    pub x: f64,
    /// Y coordinate.
    pub y: f64,
}

impl Point {
    /// Origin point (0, 0).
    pub const ORIGIN: Self = Self::new(0.0, 0.0);

    /// Create a new point.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Translate this point by another point's coordinates.
    #[must_use]
    pub fn offset(self, by: Self) -> Self {
        Self::new(self.x + by.x, self.y + by.y)
    }
}

/// Panel margins in pixels, all non-negative.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Margin {
    /// Top margin.
    pub top: f64,
    /// Right margin.
    pub right: f64,
    /// Bottom margin.
    pub bottom: f64,
    /// Left margin.
    pub left: f64,
}

impl Margin {
    /// Create a margin set.
    #[must_use]
    pub const fn new(top: f64, right: f64, bottom: f64, left: f64) -> Self {
        Self {
            top,
            right,
            bottom,
            left,
        }
    }
}

/// The inner rectangle of a panel after subtracting margins.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ClipArea {
    /// Top-left corner relative to the panel origin.
    pub origin: Point,
    /// Width of the clip area.
    pub width: f64,
    /// Height of the clip area.
    pub height: f64,
}

impl ClipArea {
    /// Check if a point (in panel coordinates) is inside the clip area.
    #[must_use]
    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.origin.x
            && point.x <= self.origin.x + self.width
            && point.y >= self.origin.y
            && point.y <= self.origin.y + self.height
    }
}

/// A loosely typed numeric argument.
///
/// Geometry setters accept anything that converts into a `Scalar`: numbers,
/// numeric strings and JSON values. Anything that is not a finite number
/// becomes an empty scalar, which setters treat as "leave unchanged".
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Scalar(Option<f64>);

impl Scalar {
    /// A scalar carrying no number.
    pub const NONE: Self = Self(None);

    /// The numeric value, if any.
    #[must_use]
    pub fn value(self) -> Option<f64> {
        self.0
    }

    fn non_negative(self) -> Option<f64> {
        self.0.filter(|v| *v >= 0.0)
    }

    fn finite(v: f64) -> Self {
        Self(v.is_finite().then_some(v))
    }
}

impl From<f64> for Scalar {
    fn from(v: f64) -> Self {
        Self::finite(v)
    }
}

impl From<f32> for Scalar {
    fn from(v: f32) -> Self {
        Self::finite(f64::from(v))
    }
}

impl From<i32> for Scalar {
    fn from(v: i32) -> Self {
        Self(Some(f64::from(v)))
    }
}

impl From<u32> for Scalar {
    fn from(v: u32) -> Self {
        Self(Some(f64::from(v)))
    }
}

impl From<i64> for Scalar {
    fn from(v: i64) -> Self {
        Self(Some(v as f64))
    }
}

impl From<Option<f64>> for Scalar {
    fn from(v: Option<f64>) -> Self {
        v.map_or(Self::NONE, Self::finite)
    }
}

impl From<&str> for Scalar {
    fn from(s: &str) -> Self {
        s.trim().parse::<f64>().map_or(Self::NONE, Self::finite)
    }
}

impl From<String> for Scalar {
    fn from(s: String) -> Self {
        Self::from(s.as_str())
    }
}

impl From<&Value> for Scalar {
    fn from(v: &Value) -> Self {
        match v {
            Value::Number(n) => n.as_f64().map_or(Self::NONE, Self::finite),
            Value::String(s) => Self::from(s.as_str()),
            _ => Self::NONE,
        }
    }
}

impl From<Value> for Scalar {
    fn from(v: Value) -> Self {
        Self::from(&v)
    }
}

impl From<Option<&Value>> for Scalar {
    fn from(v: Option<&Value>) -> Self {
        v.map_or(Self::NONE, Self::from)
    }
}

/// Dimensions, position and margins of a panel.
#[derive(Debug, Clone, PartialEq)]
pub struct GeometryState {
    width: f64,
    height: f64,
    min_width: f64,
    min_height: f64,
    origin: Point,
    margin: Margin,
    cliparea: ClipArea,
    proportional_width: f64,
    proportional_height: f64,
    parent: Option<(f64, f64)>,
}

impl Default for GeometryState {
    fn default() -> Self {
        Self::new(800.0, 225.0, 400.0, 100.0)
    }
}

impl GeometryState {
    /// Create a geometry with the given size and minimum size.
    ///
    /// Minimums are floored at zero and the size is clamped up to them.
    #[must_use]
    pub fn new(width: f64, height: f64, min_width: f64, min_height: f64) -> Self {
        let mut geometry = Self {
            width: 0.0,
            height: 0.0,
            min_width: 0.0,
            min_height: 0.0,
            origin: Point::ORIGIN,
            margin: Margin::default(),
            cliparea: ClipArea::default(),
            proportional_width: 1.0,
            proportional_height: 1.0,
            parent: None,
        };
        geometry.set_min_dimensions(min_width, min_height);
        geometry.set_dimensions(width, height);
        geometry
    }

    /// Build a geometry from a merged panel layout.
    ///
    /// Reads `width`, `height`, `min_width`, `min_height`, `origin.{x,y}` and
    /// `margin.{top,right,bottom,left}`. Missing or malformed entries fall
    /// back to the defaults.
    #[must_use]
    pub fn from_layout(layout: &Value) -> Self {
        let mut geometry = Self::default();
        geometry.set_min_dimensions(layout.get("min_width"), layout.get("min_height"));
        geometry.set_dimensions(layout.get("width"), layout.get("height"));

        let margin = layout.get("margin");
        let side = |name: &str| margin.and_then(|m| m.get(name));
        geometry.set_margin(side("top"), side("right"), side("bottom"), side("left"));

        let origin = layout.get("origin");
        let axis = |name: &str| Scalar::from(origin.and_then(|o| o.get(name))).non_negative();
        geometry.origin = Point::new(axis("x").unwrap_or(0.0), axis("y").unwrap_or(0.0));
        geometry
    }

    /// Current width.
    #[must_use]
    pub fn width(&self) -> f64 {
        self.width
    }

    /// Current height.
    #[must_use]
    pub fn height(&self) -> f64 {
        self.height
    }

    /// Minimum width.
    #[must_use]
    pub fn min_width(&self) -> f64 {
        self.min_width
    }

    /// Minimum height.
    #[must_use]
    pub fn min_height(&self) -> f64 {
        self.min_height
    }

    /// Position relative to the parent.
    #[must_use]
    pub fn origin(&self) -> Point {
        self.origin
    }

    /// Current margins.
    #[must_use]
    pub fn margin(&self) -> Margin {
        self.margin
    }

    /// Derived clip area.
    #[must_use]
    pub fn cliparea(&self) -> ClipArea {
        self.cliparea
    }

    /// Width as a fraction of the parent width. 1.0 until a parent is known.
    #[must_use]
    pub fn proportional_width(&self) -> f64 {
        self.proportional_width
    }

    /// Height as a fraction of the parent height. 1.0 until a parent is known.
    #[must_use]
    pub fn proportional_height(&self) -> f64 {
        self.proportional_height
    }

    /// Extent of the parent last passed to [`GeometryState::set_origin`] or
    /// [`GeometryState::set_parent_extent`].
    #[must_use]
    pub fn parent_extent(&self) -> Option<(f64, f64)> {
        self.parent
    }

    /// Set the minimum size, growing the current size if needed.
    pub fn set_min_dimensions(&mut self, min_width: impl Into<Scalar>, min_height: impl Into<Scalar>) {
        if let Some(v) = Into::<Scalar>::into(min_width).non_negative() {
            self.min_width = v.floor();
        }
        if let Some(v) = Into::<Scalar>::into(min_height).non_negative() {
            self.min_height = v.floor();
        }
        self.width = self.width.max(self.min_width);
        self.height = self.height.max(self.min_height);
        self.fit_margins();
        self.fit_parent();
    }

    /// Resize. Each axis is floored to an integer and clamped to its
    /// minimum; non-numeric or negative values leave the axis unchanged.
    pub fn set_dimensions(&mut self, width: impl Into<Scalar>, height: impl Into<Scalar>) {
        let (width, height): (Scalar, Scalar) = (width.into(), height.into());
        match width.non_negative() {
            Some(v) => self.width = v.floor().max(self.min_width),
            None => debug!(value = ?width.value(), "ignoring invalid width"),
        }
        match height.non_negative() {
            Some(v) => self.height = v.floor().max(self.min_height),
            None => debug!(value = ?height.value(), "ignoring invalid height"),
        }
        self.fit_margins();
        self.fit_parent();
    }

    /// Move within a parent of the given extent.
    ///
    /// Each axis is clamped to `[0, parent - own]` (or exactly 0 when the
    /// panel is larger than its parent). Non-numeric values leave the axis
    /// unchanged. The parent extent is remembered, so later resizes keep
    /// the origin inside it.
    pub fn set_origin(
        &mut self,
        x: impl Into<Scalar>,
        y: impl Into<Scalar>,
        parent_width: f64,
        parent_height: f64,
    ) {
        self.parent = Some((parent_width, parent_height));
        if let Some(x) = Into::<Scalar>::into(x).value() {
            self.origin.x = x;
        }
        if let Some(y) = Into::<Scalar>::into(y).value() {
            self.origin.y = y;
        }
        self.fit_parent();
    }

    /// Record the parent extent, then re-clamp the origin and recompute the
    /// proportional size against it.
    pub fn set_parent_extent(&mut self, parent_width: f64, parent_height: f64) {
        self.parent = Some((parent_width, parent_height));
        self.fit_parent();
    }

    /// Set margins. Non-numeric or negative values keep the previous side.
    ///
    /// When opposite margins together exceed the panel extent, the excess is
    /// taken from both sides in equal halves so that they fill the extent
    /// exactly.
    pub fn set_margin(
        &mut self,
        top: impl Into<Scalar>,
        right: impl Into<Scalar>,
        bottom: impl Into<Scalar>,
        left: impl Into<Scalar>,
    ) {
        let sides: [(&mut f64, Scalar); 4] = [
            (&mut self.margin.top, top.into()),
            (&mut self.margin.right, right.into()),
            (&mut self.margin.bottom, bottom.into()),
            (&mut self.margin.left, left.into()),
        ];
        for (side, value) in sides {
            match value.non_negative() {
                Some(v) => *side = v,
                None => debug!(value = ?value.value(), "ignoring invalid margin"),
            }
        }
        self.fit_margins();
    }

    /// Page position of the clip area's top-left corner.
    ///
    /// `svg_bounds` is the top-left of the plot's SVG in the viewport and
    /// `scroll` the document scroll offset.
    #[must_use]
    pub fn page_origin(&self, svg_bounds: Point, scroll: Point) -> Point {
        svg_bounds
            .offset(self.origin)
            .offset(self.cliparea.origin)
            .offset(scroll)
    }

    fn fit_parent(&mut self) {
        let Some((parent_width, parent_height)) = self.parent else {
            return;
        };
        self.origin.x = self.origin.x.min(parent_width - self.width).max(0.0);
        self.origin.y = self.origin.y.min(parent_height - self.height).max(0.0);
        if parent_width > 0.0 {
            self.proportional_width = self.width / parent_width;
        }
        if parent_height > 0.0 {
            self.proportional_height = self.height / parent_height;
        }
    }

    fn fit_margins(&mut self) {
        fit_pair(&mut self.margin.top, &mut self.margin.bottom, self.height);
        fit_pair(&mut self.margin.right, &mut self.margin.left, self.width);
        self.cliparea = ClipArea {
            origin: Point::new(self.margin.left, self.margin.top),
            width: self.width - self.margin.left - self.margin.right,
            height: self.height - self.margin.top - self.margin.bottom,
        };
    }
}

fn fit_pair(a: &mut f64, b: &mut f64, extent: f64) {
    let excess = *a + *b - extent;
    if excess <= 0.0 {
        return;
    }
    let half = (excess / 2.0).floor();
    *a -= half;
    *b -= excess - half;
    if *a < 0.0 {
        *b += *a;
        *a = 0.0;
    } else if *b < 0.0 {
        *a += *b;
        *b = 0.0;
    }
}


// ============================================================================
// Property-based tests with proptest
// ============================================================================

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn any_input() -> impl Strategy<Value = Scalar> {
        prop_oneof![
            (-5000.0f64..5000.0).prop_map(Scalar::from),
            Just(Scalar::NONE),
            Just(Scalar::from(f64::INFINITY)),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(500))]

        /// Size never drops below the minimum.
        #[test]
        fn prop_dimensions_respect_minimum(w in any_input(), h in any_input()) {
            let mut g = GeometryState::default();
            g.set_dimensions(w, h);
            prop_assert!(g.width() >= g.min_width());
            prop_assert!(g.height() >= g.min_height());
        }

        /// Origin stays inside the parent.
        #[test]
        fn prop_origin_within_parent(
            x in any_input(),
            y in any_input(),
            pw in 0.0f64..3000.0,
            ph in 0.0f64..3000.0,
        ) {
            let mut g = GeometryState::default();
            g.set_origin(x, y, pw, ph);
            let o = g.origin();
            prop_assert!(o.x >= 0.0 && o.y >= 0.0);
            prop_assert!(o.x <= (pw - g.width()).max(0.0));
            prop_assert!(o.y <= (ph - g.height()).max(0.0));
        }

        /// Resizing after placement keeps the origin inside the parent.
        #[test]
        fn prop_resize_keeps_origin_within_parent(
            x in any_input(),
            y in any_input(),
            w in any_input(),
            h in any_input(),
            pw in 0.0f64..3000.0,
            ph in 0.0f64..3000.0,
        ) {
            let mut g = GeometryState::default();
            g.set_origin(x, y, pw, ph);
            g.set_dimensions(w, h);
            let o = g.origin();
            prop_assert!(o.x >= 0.0 && o.y >= 0.0);
            prop_assert!(o.x <= (pw - g.width()).max(0.0));
            prop_assert!(o.y <= (ph - g.height()).max(0.0));
        }

        /// Margins stay non-negative and the clip area never inverts.
        #[test]
        fn prop_cliparea_consistent(
            t in any_input(), r in any_input(), b in any_input(), l in any_input(),
            w in any_input(), h in any_input(),
        ) {
            let mut g = GeometryState::default();
            g.set_margin(t, r, b, l);
            g.set_dimensions(w, h);
            let m = g.margin();
            let c = g.cliparea();
            prop_assert!(m.top >= 0.0 && m.right >= 0.0 && m.bottom >= 0.0 && m.left >= 0.0);
            prop_assert!(c.width >= 0.0 && c.height >= 0.0);
            prop_assert_eq!(c.origin, Point::new(m.left, m.top));
            prop_assert_eq!(c.width, g.width() - m.left - m.right);
            prop_assert_eq!(c.height, g.height() - m.top - m.bottom);
        }
    }
}
