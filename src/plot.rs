//! Plots (top-level instances) and the registry that owns them.

use crate::data_layer::{DataLayer, Remap};
use crate::dom::{Document, NodeId};
use crate::error::{Error, Result};
use crate::geometry::{GeometryState, Point, Scalar};
use crate::layout::merge_layouts;
use crate::panel::Panel;
use crate::source::DataSource;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::rc::Rc;
use tracing::{debug, warn};

/// A plot: shared state, a document, a data source and its panels.
pub struct Plot {
    id: String,
    layout: Value,
    state: Value,
    geometry: GeometryState,
    doc: Document,
    svg: NodeId,
    panels: Vec<Panel>,
    source: Rc<dyn DataSource>,
    initialized: bool,
}

impl std::fmt::Debug for Plot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Plot")
            .field("id", &self.id)
            .field("state", &self.state)
            .field("geometry", &self.geometry)
            .field("panels", &self.panels)
            .finish_non_exhaustive()
    }
}

impl Plot {
    /// Defaults every plot layout is merged over.
    #[must_use]
    pub fn default_layout() -> Value {
        json!({
            "width": 800,
            "height": 450,
            "min_width": 400,
            "min_height": 225,
            "state": {},
            "panels": {}
        })
    }

    /// Build a plot and the panels declared under `panels` in its layout.
    ///
    /// The document root is a `div#<id>` holding `svg#<id>.svg`.
    pub fn new(id: impl Into<String>, layout: &Value, source: Rc<dyn DataSource>) -> Result<Self> {
        let id: String = id.into();
        let layout = merge_layouts(layout, &Self::default_layout())?;
        let state = merge_layouts(&layout["state"], &json!({}))?;
        let geometry = GeometryState::from_layout(&layout);

        let mut doc = Document::new("div");
        let root = doc.root();
        doc.set_attr(root, "id", &id)?;
        let svg = doc.append(root, "svg")?;
        doc.set_attr(svg, "id", format!("{id}.svg"))?;

        let mut plot = Self {
            id,
            state,
            geometry,
            doc,
            svg,
            panels: Vec::new(),
            source,
            initialized: false,
            layout,
        };
        plot.update_svg_size()?;
        if let Some(declared) = plot.layout.get("panels").and_then(Value::as_object).cloned() {
            for (panel_id, panel_layout) in &declared {
                plot.add_panel(panel_id.clone(), panel_layout)?;
            }
        }
        Ok(plot)
    }

    /// Plot id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Merged layout.
    #[must_use]
    pub fn layout(&self) -> &Value {
        &self.layout
    }

    /// Shared state passed to the data source on every refresh.
    #[must_use]
    pub fn state(&self) -> &Value {
        &self.state
    }

    /// Plot geometry. Only the dimensions are meaningful.
    #[must_use]
    pub fn geometry(&self) -> &GeometryState {
        &self.geometry
    }

    /// The plot's document.
    #[must_use]
    pub fn document(&self) -> &Document {
        &self.doc
    }

    /// Panels in insertion order.
    pub fn panels(&self) -> impl Iterator<Item = &Panel> {
        self.panels.iter()
    }

    /// Look up a panel.
    #[must_use]
    pub fn panel(&self, id: &str) -> Option<&Panel> {
        self.panels.iter().find(|p| p.id() == id)
    }

    /// Look up a panel mutably.
    pub fn panel_mut(&mut self, id: &str) -> Option<&mut Panel> {
        self.panels.iter_mut().find(|p| p.id() == id)
    }

    /// Document and panel together, for tooltip and curtain operations.
    pub fn panel_with_document(&mut self, id: &str) -> Option<(&mut Panel, &mut Document)> {
        let panel = self.panels.iter_mut().find(|p| p.id() == id)?;
        Some((panel, &mut self.doc))
    }

    /// A data layer and the document together, for tooltip operations.
    pub fn data_layer_with_document(
        &mut self,
        panel_id: &str,
        layer_id: &str,
    ) -> Option<(&mut DataLayer, &mut Document)> {
        let (panel, doc) = self.panel_with_document(panel_id)?;
        Some((panel.data_layer_mut(layer_id)?, doc))
    }

    /// Add a panel. If the plot is already mounted the new panel is mounted
    /// immediately.
    ///
    /// A numeric `proportional_width`/`proportional_height` in the panel
    /// layout sizes the panel as that fraction of the plot.
    pub fn add_panel(&mut self, id: impl Into<String>, layout: &Value) -> Result<&mut Panel> {
        let mut panel = Panel::new(id, layout)?;
        if self.panel(panel.id()).is_some() {
            return Err(Error::InvalidArgument(format!(
                "plot [{}] already has a panel [{}]",
                self.id,
                panel.id()
            )));
        }
        panel.attach(&self.id);
        let (w, h) = (self.geometry.width(), self.geometry.height());
        let fraction = |name: &str| Scalar::from(panel.layout().get(name)).value();
        let requested = (
            fraction("proportional_width").map(|p| p * w),
            fraction("proportional_height").map(|p| p * h),
        );
        panel.set_dimensions(requested.0, requested.1);
        panel.geometry_mut().set_parent_extent(w, h);
        if self.initialized {
            let root = self.doc.root();
            panel.initialize(&mut self.doc, self.svg, root)?;
        }
        self.panels.push(panel);
        let index = self.panels.len() - 1;
        Ok(&mut self.panels[index])
    }

    /// Resize the plot, keep every panel inside it and update each panel's
    /// proportional size.
    pub fn set_dimensions(&mut self, width: impl Into<Scalar>, height: impl Into<Scalar>) -> Result<()> {
        self.geometry.set_dimensions(width, height);
        let (w, h) = (self.geometry.width(), self.geometry.height());
        for panel in &mut self.panels {
            panel.geometry_mut().set_parent_extent(w, h);
        }
        self.update_svg_size()
    }

    /// Resize a panel, keeping it inside the plot.
    pub fn set_panel_dimensions(
        &mut self,
        panel_id: &str,
        width: impl Into<Scalar>,
        height: impl Into<Scalar>,
    ) -> Result<()> {
        let (w, h) = (self.geometry.width(), self.geometry.height());
        let panel = self
            .panel_mut(panel_id)
            .ok_or_else(|| Error::InvalidArgument(format!("no panel [{panel_id}]")))?;
        panel.set_dimensions(width, height);
        panel.geometry_mut().set_parent_extent(w, h);
        Ok(())
    }

    fn update_svg_size(&mut self) -> Result<()> {
        self.doc.set_attr(self.svg, "width", self.geometry.width())?;
        self.doc.set_attr(self.svg, "height", self.geometry.height())
    }

    /// Move a panel within the plot.
    pub fn set_panel_origin(&mut self, panel_id: &str, x: impl Into<Scalar>, y: impl Into<Scalar>) -> Result<()> {
        let (w, h) = (self.geometry.width(), self.geometry.height());
        let panel = self
            .panel_mut(panel_id)
            .ok_or_else(|| Error::InvalidArgument(format!("no panel [{panel_id}]")))?;
        panel.set_origin(x, y, w, h);
        Ok(())
    }

    /// Mount every panel and data layer that is not mounted yet.
    pub fn initialize(&mut self) -> Result<()> {
        let root = self.doc.root();
        for panel in &mut self.panels {
            panel.initialize(&mut self.doc, self.svg, root)?;
        }
        self.initialized = true;
        Ok(())
    }

    /// Draw every panel, positioning tooltips at `pointer`.
    pub fn draw(&mut self, pointer: Point) -> Result<()> {
        for panel in &mut self.panels {
            panel.draw(&mut self.doc, pointer)?;
        }
        Ok(())
    }

    /// Merge `changes` into the shared state. Keys in `changes` win.
    pub fn apply_state(&mut self, changes: &Value) -> Result<()> {
        self.state = merge_layouts(changes, &self.state)?;
        debug!(plot = %self.id, state = %self.state, "state changed");
        Ok(())
    }

    /// Start a refresh of every data layer against the current state.
    pub fn re_map_all(&mut self) -> Result<Vec<Remap>> {
        Ok(self.re_map_by_panel()?.into_iter().map(|(_, remap)| remap).collect())
    }

    fn re_map_by_panel(&mut self) -> Result<Vec<(String, Remap)>> {
        let mut pending = Vec::new();
        for panel in &mut self.panels {
            let remaps = panel.re_map(&mut self.doc, &self.state, self.source.as_ref())?;
            pending.extend(remaps.into_iter().map(|r| (panel.id().to_string(), r)));
        }
        Ok(pending)
    }

    /// Refresh every data layer, then redraw.
    ///
    /// Refreshes are awaited one after another in panel and layer order.
    /// Panels whose refresh failed get their curtain dropped with the
    /// message of their first error; the others have it raised. The first
    /// error in that order is returned after the redraw.
    pub async fn refresh(&mut self, pointer: Point) -> Result<()> {
        let pending = self.re_map_by_panel()?;
        let mut failures: Vec<(String, Error)> = Vec::new();
        for (panel_id, remap) in pending {
            match remap.await {
                Ok(outcome) => debug!(plot = %self.id, panel = %panel_id, ?outcome, "refresh resolved"),
                Err(err) => {
                    warn!(plot = %self.id, panel = %panel_id, error = %err, "refresh failed");
                    failures.push((panel_id, err));
                }
            }
        }
        for panel in &mut self.panels {
            match failures.iter().find(|(id, _)| id == panel.id()) {
                Some((_, err)) => panel.drop_curtain(&mut self.doc, &err.to_string())?,
                None => panel.raise_curtain(&mut self.doc)?,
            }
        }
        self.draw(pointer)?;
        match failures.into_iter().next() {
            Some((_, err)) => Err(err),
            None => Ok(()),
        }
    }

    /// Serialize the whole document.
    pub fn to_markup(&self) -> Result<String> {
        self.doc.to_markup(self.doc.root())
    }
}

/// Explicit owner of every live plot, keyed by id.
#[derive(Debug, Default)]
pub struct Registry {
    plots: BTreeMap<String, Plot>,
}

impl Registry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build, mount and register a plot.
    pub fn populate(&mut self, id: &str, layout: &Value, source: Rc<dyn DataSource>) -> Result<&mut Plot> {
        if self.plots.contains_key(id) {
            return Err(Error::InvalidArgument(format!("a plot with id [{id}] already exists")));
        }
        let mut plot = Plot::new(id, layout, source)?;
        plot.initialize()?;
        Ok(self.plots.entry(id.to_string()).or_insert(plot))
    }

    /// Look up a plot.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Plot> {
        self.plots.get(id)
    }

    /// Look up a plot mutably.
    pub fn get_mut(&mut self, id: &str) -> Option<&mut Plot> {
        self.plots.get_mut(id)
    }

    /// Remove and return a plot.
    pub fn remove(&mut self, id: &str) -> Option<Plot> {
        self.plots.remove(id)
    }

    /// Drop every plot.
    pub fn clear(&mut self) {
        self.plots.clear();
    }

    /// Registered plot ids, sorted.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.plots.keys().map(String::as_str)
    }

    /// Number of registered plots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.plots.len()
    }

    /// Whether no plot is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.plots.is_empty()
    }
}
