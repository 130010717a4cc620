//! Panels: rectangular regions of a plot holding data layers.

use crate::data_layer::{DataLayer, Remap};
use crate::dom::{Document, NodeId};
use crate::error::{Error, Result};
use crate::geometry::{GeometryState, Point, Scalar};
use crate::layout::merge_layouts;
use crate::source::DataSource;
use serde_json::{json, Value};
use tracing::debug;

/// Class of the curtain overlay shown over a panel on errors.
pub const CURTAIN_CLASS: &str = "lz-curtain";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PanelHandles {
    container: NodeId,
    group: NodeId,
    curtain: NodeId,
    curtain_rect: NodeId,
    curtain_text: NodeId,
}

/// A rectangular region of a plot. Owns its geometry and data layers.
#[derive(Debug)]
pub struct Panel {
    id: String,
    plot_id: Option<String>,
    layout: Value,
    state: Value,
    geometry: GeometryState,
    layers: Vec<DataLayer>,
    svg: Option<PanelHandles>,
}

impl Panel {
    /// Defaults every panel layout is merged over.
    #[must_use]
    pub fn default_layout() -> Value {
        json!({
            "width": 800,
            "height": 225,
            "min_width": 400,
            "min_height": 100,
            "origin": {"x": 0, "y": 0},
            "margin": {"top": 0, "right": 0, "bottom": 0, "left": 0},
            "state": {},
            "data_layers": {}
        })
    }

    /// Build a detached panel and the data layers declared under
    /// `data_layers` in its layout, in declaration order.
    pub fn new(id: impl Into<String>, layout: &Value) -> Result<Self> {
        let layout = merge_layouts(layout, &Self::default_layout())?;
        let mut panel = Self {
            id: id.into(),
            plot_id: None,
            state: merge_layouts(&layout["state"], &json!({}))?,
            geometry: GeometryState::from_layout(&layout),
            layers: Vec::new(),
            svg: None,
            layout,
        };
        if let Some(declared) = panel.layout.get("data_layers").and_then(Value::as_object) {
            let declared = declared.clone();
            for (layer_id, layer_layout) in &declared {
                let state = layer_layout.get("state").cloned().unwrap_or_else(|| json!({}));
                panel.add_data_layer(DataLayer::new(layer_id.clone(), layer_layout, &state)?)?;
            }
        }
        Ok(panel)
    }

    /// Panel id, unique within its plot.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Merged layout.
    #[must_use]
    pub fn layout(&self) -> &Value {
        &self.layout
    }

    /// Panel-local state, seeded from the layout's `state` section.
    #[must_use]
    pub fn state(&self) -> &Value {
        &self.state
    }

    /// Merge `changes` into the panel state. Keys in `changes` win.
    pub fn apply_state(&mut self, changes: &Value) -> Result<()> {
        self.state = merge_layouts(changes, &self.state)?;
        debug!(panel = %self.id, state = %self.state, "panel state changed");
        Ok(())
    }

    /// Current geometry.
    #[must_use]
    pub fn geometry(&self) -> &GeometryState {
        &self.geometry
    }

    /// Resize the panel. Once the panel belongs to a plot its origin is
    /// re-clamped to the plot and its proportional size updated.
    pub fn set_dimensions(&mut self, width: impl Into<Scalar>, height: impl Into<Scalar>) {
        self.geometry.set_dimensions(width, height);
    }

    /// Move the panel within a parent of the given extent.
    pub fn set_origin(&mut self, x: impl Into<Scalar>, y: impl Into<Scalar>, parent_width: f64, parent_height: f64) {
        self.geometry.set_origin(x, y, parent_width, parent_height);
    }

    /// Set the panel margins.
    pub fn set_margin(
        &mut self,
        top: impl Into<Scalar>,
        right: impl Into<Scalar>,
        bottom: impl Into<Scalar>,
        left: impl Into<Scalar>,
    ) {
        self.geometry.set_margin(top, right, bottom, left);
    }

    pub(crate) fn geometry_mut(&mut self) -> &mut GeometryState {
        &mut self.geometry
    }

    /// Record the owning plot, for this panel and all of its layers.
    pub fn attach(&mut self, plot_id: &str) {
        self.plot_id = Some(plot_id.to_string());
        for layer in &mut self.layers {
            layer.attach(plot_id, &self.id);
        }
    }

    /// `<plot_id>.<panel_id>`.
    pub fn base_id(&self) -> Result<String> {
        let plot_id = self.plot_id.as_deref().ok_or_else(|| {
            Error::InvalidConfiguration(format!("panel [{}] is not attached to a plot", self.id))
        })?;
        Ok(format!("{plot_id}.{}", self.id))
    }

    /// Add a data layer. Layer ids must be unique within the panel.
    pub fn add_data_layer(&mut self, mut layer: DataLayer) -> Result<&mut DataLayer> {
        if self.layers.iter().any(|l| l.id() == layer.id()) {
            return Err(Error::InvalidArgument(format!(
                "panel [{}] already has a data layer [{}]",
                self.id,
                layer.id()
            )));
        }
        if let Some(plot_id) = &self.plot_id {
            layer.attach(plot_id, &self.id);
        }
        self.layers.push(layer);
        let index = self.layers.len() - 1;
        Ok(&mut self.layers[index])
    }

    /// Data layers in declaration order, then in the order they were added.
    pub fn data_layers(&self) -> impl Iterator<Item = &DataLayer> {
        self.layers.iter()
    }

    /// Look up a data layer.
    #[must_use]
    pub fn data_layer(&self, id: &str) -> Option<&DataLayer> {
        self.layers.iter().find(|l| l.id() == id)
    }

    /// Look up a data layer mutably.
    pub fn data_layer_mut(&mut self, id: &str) -> Option<&mut DataLayer> {
        self.layers.iter_mut().find(|l| l.id() == id)
    }

    /// Whether the panel's groups exist.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.svg.is_some()
    }

    /// The group data layers mount into.
    #[must_use]
    pub fn group(&self) -> Option<NodeId> {
        self.svg.map(|svg| svg.group)
    }

    /// Create the panel groups under `parent`, initialize any layers that
    /// are not yet initialized, and append the curtain last.
    ///
    /// Safe to call repeatedly: existing panel groups are kept.
    pub fn initialize(&mut self, doc: &mut Document, parent: NodeId, tooltip_anchor: NodeId) -> Result<()> {
        let base = self.base_id()?;
        let handles = match self.svg {
            Some(handles) => handles,
            None => {
                let container = doc.append(parent, "g")?;
                doc.set_attr(container, "id", format!("{base}.panel_container"))?;
                let group = doc.append(container, "g")?;
                doc.set_attr(group, "id", format!("{base}.panel"))?;

                let curtain = doc.append(container, "g")?;
                doc.set_attr(curtain, "id", format!("{base}.curtain"))?;
                doc.set_attr(curtain, "class", CURTAIN_CLASS)?;
                doc.set_style(curtain, "display", "none")?;
                let curtain_rect = doc.append(curtain, "rect")?;
                let curtain_text = doc.append(curtain, "text")?;
                let handles = PanelHandles {
                    container,
                    group,
                    curtain,
                    curtain_rect,
                    curtain_text,
                };
                self.svg = Some(handles);
                debug!(panel = %base, "initialized panel");
                handles
            }
        };
        for layer in self.layers.iter_mut().filter(|l| !l.is_initialized()) {
            layer.initialize(doc, handles.group, tooltip_anchor)?;
        }
        Ok(())
    }

    fn handles(&self) -> Result<PanelHandles> {
        self.svg.ok_or_else(|| Error::NotInitialized(self.id.clone()))
    }

    /// Position the panel, size its curtain and draw every layer.
    pub fn draw(&mut self, doc: &mut Document, pointer: Point) -> Result<()> {
        let svg = self.handles()?;
        let origin = self.geometry.origin();
        doc.set_attr(svg.container, "transform", format!("translate({},{})", origin.x, origin.y))?;
        doc.set_attr(svg.curtain_rect, "width", self.geometry.width())?;
        doc.set_attr(svg.curtain_rect, "height", self.geometry.height())?;
        let cliparea = self.geometry.cliparea();
        for layer in &mut self.layers {
            layer.draw(doc, &cliparea, pointer)?;
        }
        Ok(())
    }

    /// Show the curtain over the panel with `message`.
    pub fn drop_curtain(&mut self, doc: &mut Document, message: &str) -> Result<()> {
        let svg = self.handles()?;
        doc.remove_style(svg.curtain, "display")?;
        doc.set_html(svg.curtain_text, message)?;
        debug!(panel = %self.id, message, "dropped curtain");
        Ok(())
    }

    /// Hide the curtain.
    pub fn raise_curtain(&mut self, doc: &mut Document) -> Result<()> {
        let svg = self.handles()?;
        doc.set_style(svg.curtain, "display", "none")
    }

    /// Whether the curtain is currently shown.
    #[must_use]
    pub fn curtain_visible(&self, doc: &Document) -> bool {
        self.svg
            .is_some_and(|svg| doc.style(svg.curtain, "display") != Some("none"))
    }

    /// Start a refresh of every layer. See [`DataLayer::re_map`].
    pub fn re_map(&mut self, doc: &mut Document, state: &Value, source: &dyn DataSource) -> Result<Vec<Remap>> {
        self.layers
            .iter_mut()
            .map(|layer| layer.re_map(doc, state, source))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mounted(layout: Value) -> (Document, Panel) {
        let mut doc = Document::default();
        let root = doc.root();
        let svg = doc.append(root, "svg").unwrap();
        let mut panel = Panel::new("positions", &layout).unwrap();
        panel.attach("plot");
        panel.initialize(&mut doc, svg, root).unwrap();
        (doc, panel)
    }

    #[test]
    fn test_constructor_defaults() {
        let panel = Panel::new("p", &json!({})).unwrap();
        let g = panel.geometry();
        assert_eq!((g.width(), g.height()), (800.0, 225.0));
        assert_eq!((g.min_width(), g.min_height()), (400.0, 100.0));
        assert_eq!(g.origin(), Point::ORIGIN);
        assert_eq!(g.cliparea().width, 800.0);
        assert_eq!(panel.data_layers().count(), 0);
    }

    #[test]
    fn test_layers_from_layout() {
        let panel = Panel::new(
            "p",
            &json!({"data_layers": {"genes": {"fields": ["gene"]}, "assoc": {"state": {"ld": true}}}}),
        )
        .unwrap();
        let ids: Vec<&str> = panel.data_layers().map(DataLayer::id).collect();
        assert_eq!(ids, vec!["genes", "assoc"]);
        assert_eq!(panel.data_layer("genes").unwrap().fields(), vec!["gene".to_string()]);
        assert_eq!(panel.data_layer("assoc").unwrap().state()["ld"], json!(true));
    }

    #[test]
    fn test_yaml_layers_keep_declaration_order() {
        let layout = crate::layout::from_yaml(
            "data_layers:\n  zeta: {}\n  alpha: {}\n  mid: {}\n",
        )
        .unwrap();
        let panel = Panel::new("p", &layout).unwrap();
        let ids: Vec<&str> = panel.data_layers().map(DataLayer::id).collect();
        assert_eq!(ids, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_panel_state() {
        let mut panel = Panel::new("p", &json!({"state": {"ld_refvar": "rs1"}})).unwrap();
        assert_eq!(panel.state(), &json!({"ld_refvar": "rs1"}));
        panel.apply_state(&json!({"ld_refvar": "rs2", "selected": true})).unwrap();
        assert_eq!(panel.state(), &json!({"ld_refvar": "rs2", "selected": true}));
        assert_eq!(Panel::new("q", &json!({})).unwrap().state(), &json!({}));
        assert!(Panel::new("r", &json!({"state": 3})).is_err());
    }

    #[test]
    fn test_duplicate_layer_rejected() {
        let mut panel = Panel::new("p", &json!({})).unwrap();
        panel
            .add_data_layer(DataLayer::new("a", &json!({}), &json!({})).unwrap())
            .unwrap();
        let dup = DataLayer::new("a", &json!({}), &json!({})).unwrap();
        assert!(matches!(panel.add_data_layer(dup), Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn test_curtain_is_last_child() {
        let (doc, panel) = mounted(json!({"data_layers": {"a": {}}}));
        let container = doc.find_by_id("plot.positions.panel_container").unwrap();
        let last = doc.last_child(container).unwrap();
        assert_eq!(doc.attr(last, "id"), Some("plot.positions.curtain"));
        assert_eq!(doc.attr(last, "class"), Some(CURTAIN_CLASS));
        assert!(!panel.curtain_visible(&doc));
        assert!(doc.find_by_id("plot.positions.a.data_layer").is_some());
    }

    #[test]
    fn test_curtain_drop_and_raise() {
        let (mut doc, mut panel) = mounted(json!({}));
        panel.drop_curtain(&mut doc, "request failed").unwrap();
        let curtain = doc.find_by_id("plot.positions.curtain").unwrap();
        assert_eq!(doc.style(curtain, "display"), None);
        assert!(panel.curtain_visible(&doc));
        panel.raise_curtain(&mut doc).unwrap();
        assert_eq!(doc.style(curtain, "display"), Some("none"));
    }

    #[test]
    fn test_initialize_is_guarded() {
        let (mut doc, mut panel) = mounted(json!({"data_layers": {"a": {}}}));
        let root = doc.root();
        let svg = doc.children(root)[0];
        panel.initialize(&mut doc, svg, root).unwrap();
        assert_eq!(doc.nodes_with_id("plot.positions.panel_container").count(), 1);
        assert_eq!(doc.nodes_with_id("plot.positions.a.data_layer").count(), 1);
    }

    #[test]
    fn test_draw_translates_container() {
        let (mut doc, mut panel) = mounted(json!({"data_layers": {"a": {}}}));
        panel.set_dimensions(400, 200);
        panel.set_origin(10, 20, 800.0, 800.0);
        panel.set_margin(5, 5, 5, 5);
        panel.draw(&mut doc, Point::ORIGIN).unwrap();
        let container = doc.find_by_id("plot.positions.panel_container").unwrap();
        assert_eq!(doc.attr(container, "transform"), Some("translate(10,20)"));
        let layer = doc.find_by_id("plot.positions.a.data_layer_container").unwrap();
        assert_eq!(doc.attr(layer, "transform"), Some("translate(5,5)"));
    }

    #[test]
    fn test_unattached_panel_cannot_initialize() {
        let mut doc = Document::default();
        let root = doc.root();
        let mut panel = Panel::new("p", &json!({})).unwrap();
        assert!(panel.initialize(&mut doc, root, root).is_err());
    }
}
