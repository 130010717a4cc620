//! Data layers: a dataset plus its render subtree and tooltips.
//!
//! A layer owns three nested nodes inside its panel's group:
//!
//! ```text
//! g#<base>.data_layer_container        translate(cliparea origin)
//! ├── clipPath#<base>.clip > rect      cliparea size
//! └── g#<base>.data_layer              clip-path="url(#<base>.clip)"
//! ```
//!
//! where `<base>` is `<plot_id>.<panel_id>.<layer_id>`.
//!
//! # Refresh protocol
//!
//! [`DataLayer::re_map`] destroys every tooltip, issues exactly one
//! [`DataSource::get_data`] call and returns a [`Remap`] future. When that
//! future resolves successfully the layer's data is replaced wholesale by
//! the response body. Overlapping refreshes are not tracked: each one
//! applies its response when it resolves, so the last *response* wins. Use
//! [`DataLayer::re_map_latest`] to discard responses that were overtaken by
//! a newer refresh.
//!
//! Destroying all tooltips is deliberately coarse. Tooltips that were
//! visible before the refresh disappear and are not recreated.

use crate::dom::{Document, NodeId};
use crate::error::{Error, Result};
use crate::geometry::{ClipArea, GeometryState, Point, Scalar};
use crate::layout::merge_layouts;
use crate::source::{DataFuture, DataSource, Record};
use crate::tooltip::{TooltipLayout, TooltipSet};
use serde_json::{json, Map, Value};
use std::cell::{Ref, RefCell};
use std::future::Future;
use std::pin::Pin;
use std::rc::{Rc, Weak};
use std::task::{ready, Context, Poll};
use tracing::{debug, warn};

/// Y-axis extent options read from a layer layout's `y_axis` section.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct YAxisLayout {
    /// Field the extent is computed over.
    pub field: Option<String>,
    /// Fraction subtracted from the lower bound (`min * (1 - b)`).
    pub lower_buffer: Option<f64>,
    /// Fraction added to the upper bound (`max * (1 + b)`).
    pub upper_buffer: Option<f64>,
    /// Smallest allowed lower bound.
    pub floor: Option<f64>,
    /// Largest allowed upper bound.
    pub ceiling: Option<f64>,
}

impl YAxisLayout {
    /// Read the `y_axis` section of a layout. Non-numeric options are unset.
    #[must_use]
    pub fn from_layout(layout: &Value) -> Self {
        let axis = layout.get("y_axis");
        let number = |name: &str| Scalar::from(axis.and_then(|a| a.get(name))).value();
        Self {
            field: axis
                .and_then(|a| a.get("field"))
                .and_then(Value::as_str)
                .map(str::to_string),
            lower_buffer: number("lower_buffer"),
            upper_buffer: number("upper_buffer"),
            floor: number("floor"),
            ceiling: number("ceiling"),
        }
    }

    /// Apply buffers, then floor/ceiling, to a raw `[min, max]`.
    #[must_use]
    pub fn adjust(&self, extent: [f64; 2]) -> [f64; 2] {
        let [mut lower, mut upper] = extent;
        if let Some(b) = self.lower_buffer {
            lower *= 1.0 - b;
        }
        if let Some(b) = self.upper_buffer {
            upper *= 1.0 + b;
        }
        if let Some(floor) = self.floor {
            lower = lower.max(floor);
        }
        if let Some(ceiling) = self.ceiling {
            upper = upper.min(ceiling);
        }
        [lower, upper]
    }
}

#[derive(Debug, Default)]
struct Dataset {
    records: Vec<Record>,
    generation: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ParentRef {
    plot_id: String,
    panel_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RenderHandles {
    container: NodeId,
    clip_rect: NodeId,
    group: NodeId,
    tooltip_anchor: NodeId,
}

/// A dataset and its rendering and tooltip behaviour within a panel.
#[derive(Debug)]
pub struct DataLayer {
    id: String,
    parent: Option<ParentRef>,
    layout: Value,
    state: Value,
    data: Rc<RefCell<Dataset>>,
    metadata: Map<String, Value>,
    tooltips: TooltipSet,
    svg: Option<RenderHandles>,
}

impl DataLayer {
    /// Defaults every layer layout is merged over.
    #[must_use]
    pub fn default_layout() -> Value {
        json!({
            "type": "",
            "fields": []
        })
    }

    /// Defaults every layer state is merged over.
    #[must_use]
    pub fn default_state() -> Value {
        json!({})
    }

    /// Create a detached layer from a layout and state.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfiguration`] if the layout or state is not
    /// an object.
    pub fn new(id: impl Into<String>, layout: &Value, state: &Value) -> Result<Self> {
        Ok(Self {
            id: id.into(),
            parent: None,
            layout: merge_layouts(layout, &Self::default_layout())?,
            state: merge_layouts(state, &Self::default_state())?,
            data: Rc::new(RefCell::new(Dataset::default())),
            metadata: Map::new(),
            tooltips: TooltipSet::default(),
            svg: None,
        })
    }

    /// Layer id, unique within its panel.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Merged layout.
    #[must_use]
    pub fn layout(&self) -> &Value {
        &self.layout
    }

    /// Merged runtime state.
    #[must_use]
    pub fn state(&self) -> &Value {
        &self.state
    }

    /// Current records.
    ///
    /// Drop the returned guard before awaiting a [`Remap`] of this layer: a
    /// refresh that resolves while the records are borrowed fails with
    /// [`Error::DataBorrowed`] and leaves them unchanged.
    #[must_use]
    pub fn data(&self) -> Ref<'_, [Record]> {
        Ref::map(self.data.borrow(), |d| d.records.as_slice())
    }

    /// Replace the records wholesale, outside of a refresh.
    pub fn replace_data(&mut self, records: Vec<Record>) {
        self.data.borrow_mut().records = records;
    }

    /// Free-form auxiliary data.
    #[must_use]
    pub fn metadata(&self) -> &Map<String, Value> {
        &self.metadata
    }

    /// Mutable access to the auxiliary data.
    pub fn metadata_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.metadata
    }

    /// Live tooltips.
    #[must_use]
    pub fn tooltips(&self) -> &TooltipSet {
        &self.tooltips
    }

    /// Field names requested from the data source.
    #[must_use]
    pub fn fields(&self) -> Vec<String> {
        self.layout
            .get("fields")
            .and_then(Value::as_array)
            .map(|fields| {
                fields
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Record the owning plot and panel. The layer does not own either.
    pub fn attach(&mut self, plot_id: &str, panel_id: &str) {
        self.parent = Some(ParentRef {
            plot_id: plot_id.to_string(),
            panel_id: panel_id.to_string(),
        });
    }

    /// `<plot_id>.<panel_id>.<layer_id>`, the prefix of every node id.
    pub fn base_id(&self) -> Result<String> {
        let parent = self.parent.as_ref().ok_or_else(|| {
            Error::InvalidConfiguration(format!("data layer [{}] is not attached to a panel", self.id))
        })?;
        Ok(format!("{}.{}.{}", parent.plot_id, parent.panel_id, self.id))
    }

    /// Whether [`DataLayer::initialize`] has run.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.svg.is_some()
    }

    /// The content group that marks are drawn into.
    #[must_use]
    pub fn content_group(&self) -> Option<NodeId> {
        self.svg.map(|svg| svg.group)
    }

    /// Create the container, clip path and content group under
    /// `panel_group`. Tooltips will be appended under `tooltip_anchor`.
    ///
    /// Calling this twice appends a second subtree; guard with
    /// [`DataLayer::is_initialized`].
    pub fn initialize(&mut self, doc: &mut Document, panel_group: NodeId, tooltip_anchor: NodeId) -> Result<()> {
        let base = self.base_id()?;

        let container = doc.append(panel_group, "g")?;
        doc.set_attr(container, "id", format!("{base}.data_layer_container"))?;

        let clip_path = doc.append(container, "clipPath")?;
        doc.set_attr(clip_path, "id", format!("{base}.clip"))?;
        let clip_rect = doc.append(clip_path, "rect")?;

        let group = doc.append(container, "g")?;
        doc.set_attr(group, "id", format!("{base}.data_layer"))?;
        doc.set_attr(group, "clip-path", format!("url(#{base}.clip)"))?;

        self.svg = Some(RenderHandles {
            container,
            clip_rect,
            group,
            tooltip_anchor,
        });
        debug!(layer = %base, "initialized data layer");
        Ok(())
    }

    fn handles(&self) -> Result<RenderHandles> {
        self.svg.ok_or_else(|| Error::NotInitialized(self.id.clone()))
    }

    /// Apply the panel's clip area to the render subtree and reposition
    /// every tooltip at `pointer`.
    pub fn draw(&mut self, doc: &mut Document, cliparea: &ClipArea, pointer: Point) -> Result<()> {
        let svg = self.handles()?;
        doc.set_attr(
            svg.container,
            "transform",
            format!("translate({},{})", cliparea.origin.x, cliparea.origin.y),
        )?;
        doc.set_attr(svg.clip_rect, "width", cliparea.width)?;
        doc.set_attr(svg.clip_rect, "height", cliparea.height)?;
        self.position_all_tooltips(doc, pointer)
    }

    /// Create a tooltip for `datum` and position it at `pointer`.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidConfiguration`] if the layout has no `tooltip`
    ///   section.
    /// - [`Error::InvalidArgument`] if `id` is empty.
    /// - [`Error::NotInitialized`] before [`DataLayer::initialize`].
    pub fn create_tooltip(&mut self, doc: &mut Document, datum: &Record, id: &str, pointer: Point) -> Result<()> {
        let tooltip = match self.layout.get("tooltip") {
            Some(section @ Value::Object(_)) => serde_json::from_value::<TooltipLayout>(section.clone())?,
            _ => {
                return Err(Error::InvalidConfiguration(format!(
                    "data layer [{}] layout does not define a tooltip",
                    self.id
                )))
            }
        };
        let base = self.base_id()?;
        let anchor = self.handles()?.tooltip_anchor;
        self.tooltips.create(doc, anchor, &base, &tooltip, datum, id, pointer)
    }

    /// Move a live tooltip to `pointer`.
    pub fn position_tooltip(&mut self, doc: &mut Document, id: &str, pointer: Point) -> Result<()> {
        self.tooltips.position(doc, id, pointer)
    }

    /// Move every live tooltip to `pointer`.
    pub fn position_all_tooltips(&mut self, doc: &mut Document, pointer: Point) -> Result<()> {
        self.tooltips.position_all(doc, pointer)
    }

    /// Remove a tooltip; unknown ids are ignored.
    pub fn destroy_tooltip(&mut self, doc: &mut Document, id: &str) -> Result<()> {
        self.tooltips.destroy(doc, id)
    }

    /// Remove every tooltip.
    pub fn destroy_all_tooltips(&mut self, doc: &mut Document) -> Result<()> {
        self.tooltips.destroy_all(doc)
    }

    /// Page coordinates of this layer's drawing origin.
    ///
    /// `svg_bounds` is the top-left of the plot's SVG in the viewport,
    /// `scroll` the document scroll offset.
    #[must_use]
    pub fn page_origin(&self, panel: &GeometryState, svg_bounds: Point, scroll: Point) -> Point {
        panel.page_origin(svg_bounds, scroll)
    }

    /// Refresh the data for `state`. See the module docs for the protocol.
    pub fn re_map(&mut self, doc: &mut Document, state: &Value, source: &dyn DataSource) -> Result<Remap> {
        self.start_remap(doc, state, source, false)
    }

    /// Like [`DataLayer::re_map`], but the response is discarded if another
    /// refresh of this layer started before it resolved.
    pub fn re_map_latest(&mut self, doc: &mut Document, state: &Value, source: &dyn DataSource) -> Result<Remap> {
        self.start_remap(doc, state, source, true)
    }

    fn start_remap(
        &mut self,
        doc: &mut Document,
        state: &Value,
        source: &dyn DataSource,
        latest_only: bool,
    ) -> Result<Remap> {
        self.destroy_all_tooltips(doc)?;
        let generation = {
            let mut data = self.data.borrow_mut();
            data.generation += 1;
            data.generation
        };
        let fields = self.fields();
        debug!(layer = %self.id, generation, fields = fields.len(), "requesting data");
        Ok(Remap {
            layer: self.id.clone(),
            fetch: source.get_data(state, &fields),
            slot: Rc::downgrade(&self.data),
            generation,
            latest_only,
        })
    }

    /// `[min, max]` of `field` over the current data, adjusted by the
    /// layout's `y_axis` buffers and then its floor/ceiling.
    ///
    /// Values that are not numeric are skipped; returns `None` when no
    /// record has a numeric value.
    #[must_use]
    pub fn y_extent(&self, field: &str) -> Option<[f64; 2]> {
        let extent = self
            .data()
            .iter()
            .filter_map(|record| Scalar::from(record.get(field)).value())
            .fold(None, |acc: Option<[f64; 2]>, v| match acc {
                None => Some([v, v]),
                Some([lo, hi]) => Some([lo.min(v), hi.max(v)]),
            })?;
        Some(YAxisLayout::from_layout(&self.layout).adjust(extent))
    }

    /// [`DataLayer::y_extent`] over the layout's `y_axis.field`.
    #[must_use]
    pub fn y_extent_from_layout(&self) -> Option<[f64; 2]> {
        let field = YAxisLayout::from_layout(&self.layout).field?;
        self.y_extent(&field)
    }
}

/// How a resolved [`Remap`] was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemapOutcome {
    /// The layer's data was replaced with this many records.
    Applied(usize),
    /// A newer refresh had started; the response was dropped.
    Superseded,
    /// The layer no longer exists; the response was dropped.
    LayerDropped,
}

/// A pending data layer refresh.
///
/// Does not borrow the layer: it holds a weak handle to the layer's data, so
/// the layer stays usable (and other refreshes can start) while this is
/// pending.
#[must_use = "a refresh only applies its response when awaited"]
pub struct Remap {
    layer: String,
    fetch: DataFuture,
    slot: Weak<RefCell<Dataset>>,
    generation: u64,
    latest_only: bool,
}

impl std::fmt::Debug for Remap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Remap")
            .field("layer", &self.layer)
            .field("generation", &self.generation)
            .field("latest_only", &self.latest_only)
            .finish_non_exhaustive()
    }
}

impl Future for Remap {
    type Output = Result<RemapOutcome>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let response = match ready!(self.fetch.as_mut().poll(cx)) {
            Ok(response) => response,
            Err(err) => {
                warn!(layer = %self.layer, error = %err, "data request failed");
                return Poll::Ready(Err(err));
            }
        };
        let Some(slot) = self.slot.upgrade() else {
            return Poll::Ready(Ok(RemapOutcome::LayerDropped));
        };
        let Ok(mut dataset) = slot.try_borrow_mut() else {
            warn!(layer = %self.layer, "layer data still borrowed; dropping response");
            return Poll::Ready(Err(Error::DataBorrowed(self.layer.clone())));
        };
        if self.latest_only && dataset.generation != self.generation {
            debug!(layer = %self.layer, generation = self.generation, "discarding superseded response");
            return Poll::Ready(Ok(RemapOutcome::Superseded));
        }
        let count = response.body.len();
        dataset.records = response.body;
        debug!(layer = %self.layer, records = count, "replaced layer data");
        Poll::Ready(Ok(RemapOutcome::Applied(count)))
    }
}
