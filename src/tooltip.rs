//! Tooltip overlays anchored to data points.
//!
//! Tooltips are HTML nodes appended next to the plot's SVG rather than
//! inside a clipped data layer group, so they are never clipped. Each one is
//! positioned at explicit page coordinates supplied by the caller.

use crate::dom::{Document, NodeId};
use crate::error::{Error, Result};
use crate::geometry::Point;
use crate::source::Record;
use crate::template::parse_fields;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, trace};

/// Class applied to every tooltip node.
pub const TOOLTIP_CLASS: &str = "lz-data_layer-tooltip";

/// Class applied to the arrow connecting a tooltip to its datum.
pub const ARROW_CLASS: &str = "lz-data_layer-tooltip-arrow_top_left";

/// The `tooltip` section of a data layer layout.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TooltipLayout {
    /// Single template, interpolated with the datum. Wins over `divs`.
    #[serde(default)]
    pub html: Option<String>,
    /// Child elements built in order when there is no template.
    #[serde(default)]
    pub divs: Option<Vec<TooltipDiv>>,
}

/// One declared tooltip child element.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TooltipDiv {
    /// Element id.
    #[serde(default)]
    pub id: Option<String>,
    /// Element class.
    #[serde(default)]
    pub class: Option<String>,
    /// Inline style properties.
    #[serde(default)]
    pub style: Option<BTreeMap<String, Value>>,
    /// Template interpolated with the datum.
    #[serde(default)]
    pub html: Option<String>,
}

/// A live tooltip.
#[derive(Debug, Clone, PartialEq)]
pub struct Tooltip {
    datum: Record,
    node: NodeId,
    arrow: Option<NodeId>,
    position: Point,
}

impl Tooltip {
    /// The datum this tooltip describes.
    #[must_use]
    pub fn datum(&self) -> &Record {
        &self.datum
    }

    /// The tooltip's document node.
    #[must_use]
    pub fn node(&self) -> NodeId {
        self.node
    }

    /// The arrow node, once the tooltip has been positioned.
    #[must_use]
    pub fn arrow(&self) -> Option<NodeId> {
        self.arrow
    }

    /// Last page position applied.
    #[must_use]
    pub fn position(&self) -> Point {
        self.position
    }
}

/// The tooltips owned by one data layer, keyed by id.
#[derive(Debug, Clone, Default)]
pub struct TooltipSet {
    tooltips: HashMap<String, Tooltip>,
}

impl TooltipSet {
    /// Number of live tooltips.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tooltips.len()
    }

    /// Whether no tooltip is live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tooltips.is_empty()
    }

    /// Look up a live tooltip.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Tooltip> {
        self.tooltips.get(id)
    }

    /// Ids of every live tooltip, sorted.
    #[must_use]
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.tooltips.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Build a tooltip node under `anchor` and position it at `pointer`.
    ///
    /// The node id is `<base_id>.tooltip.<id>`. An existing tooltip with
    /// the same id is replaced.
    #[allow(clippy::too_many_arguments)]
    pub fn create(
        &mut self,
        doc: &mut Document,
        anchor: NodeId,
        base_id: &str,
        layout: &TooltipLayout,
        datum: &Record,
        id: &str,
        pointer: Point,
    ) -> Result<()> {
        if id.is_empty() {
            return Err(Error::InvalidArgument("tooltip id must be a non-empty string".to_string()));
        }
        self.destroy(doc, id)?;

        let node = doc.append(anchor, "div")?;
        doc.set_attr(node, "class", TOOLTIP_CLASS)?;
        doc.set_attr(node, "id", format!("{base_id}.tooltip.{id}"))?;

        if let Some(html) = layout.html.as_deref().filter(|h| !h.is_empty()) {
            doc.set_html(node, parse_fields(datum, html))?;
        } else if let Some(divs) = &layout.divs {
            for div in divs {
                let child = doc.append(node, "div")?;
                if let Some(div_id) = &div.id {
                    doc.set_attr(child, "id", div_id)?;
                }
                if let Some(class) = &div.class {
                    doc.set_attr(child, "class", class)?;
                }
                for (name, value) in div.style.iter().flatten() {
                    let value = match value {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    };
                    doc.set_style(child, name, value)?;
                }
                if let Some(html) = &div.html {
                    doc.set_html(child, parse_fields(datum, html))?;
                }
            }
        }

        self.tooltips.insert(
            id.to_string(),
            Tooltip {
                datum: datum.clone(),
                node,
                arrow: None,
                position: pointer,
            },
        );
        debug!(tooltip = id, base = base_id, "created tooltip");
        self.position(doc, id, pointer)
    }

    /// Move a live tooltip to `pointer`, creating its arrow on first use.
    pub fn position(&mut self, doc: &mut Document, id: &str, pointer: Point) -> Result<()> {
        let tooltip = self
            .tooltips
            .get_mut(id)
            .ok_or_else(|| Error::InvalidArgument(format!("no live tooltip with id [{id}]")))?;

        doc.set_style(tooltip.node, "left", format!("{}px", pointer.x))?;
        doc.set_style(tooltip.node, "top", format!("{}px", pointer.y))?;
        tooltip.position = pointer;

        let arrow = match tooltip.arrow {
            Some(arrow) => arrow,
            None => {
                let arrow = doc.append(tooltip.node, "div")?;
                doc.set_style(arrow, "position", "absolute")?;
                doc.set_attr(arrow, "class", ARROW_CLASS)?;
                tooltip.arrow = Some(arrow);
                arrow
            }
        };
        doc.set_style(arrow, "left", "-1px")?;
        doc.set_style(arrow, "top", "-1px")?;
        trace!(tooltip = id, x = pointer.x, y = pointer.y, "positioned tooltip");
        Ok(())
    }

    /// Reposition every live tooltip.
    pub fn position_all(&mut self, doc: &mut Document, pointer: Point) -> Result<()> {
        for id in self.ids() {
            self.position(doc, &id, pointer)?;
        }
        Ok(())
    }

    /// Remove a tooltip. Unknown ids are ignored.
    pub fn destroy(&mut self, doc: &mut Document, id: &str) -> Result<()> {
        if let Some(tooltip) = self.tooltips.remove(id) {
            if doc.contains(tooltip.node) {
                doc.remove(tooltip.node)?;
            }
            debug!(tooltip = id, "destroyed tooltip");
        }
        Ok(())
    }

    /// Remove every tooltip.
    pub fn destroy_all(&mut self, doc: &mut Document) -> Result<()> {
        for id in self.ids() {
            self.destroy(doc, &id)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fixture() -> (Document, NodeId, TooltipSet) {
        let mut doc = Document::default();
        let anchor = doc.root();
        let _svg = doc.append(anchor, "svg").unwrap();
        (doc, anchor, TooltipSet::default())
    }

    #[test]
    fn test_template_wins_over_divs() {
        let (mut doc, anchor, mut set) = fixture();
        let layout = TooltipLayout {
            html: Some("<b>{{id}}</b>".to_string()),
            divs: Some(vec![TooltipDiv::default()]),
        };
        set.create(&mut doc, anchor, "p.a.l", &layout, &json!({"id": "rs7"}), "t1", Point::new(3.0, 4.0))
            .unwrap();
        let node = doc.find_by_id("p.a.l.tooltip.t1").unwrap();
        assert_eq!(doc.attr(node, "class"), Some(TOOLTIP_CLASS));
        assert_eq!(doc.html(node), Some("<b>rs7</b>"));
        // Only the arrow was appended.
        assert_eq!(doc.children(node).len(), 1);
        assert_eq!(doc.style(node, "left"), Some("3px"));
        assert_eq!(doc.style(node, "top"), Some("4px"));
    }

    #[test]
    fn test_divs_built_in_order() {
        let (mut doc, anchor, mut set) = fixture();
        let layout: TooltipLayout = serde_json::from_value(json!({
            "divs": [
                {"id": "head", "class": "title", "style": {"font-weight": "bold", "width": 40}, "html": "{{id}}"},
                {"html": "p={{p}}"}
            ]
        }))
        .unwrap();
        set.create(&mut doc, anchor, "b", &layout, &json!({"id": "x", "p": 0.5}), "t", Point::ORIGIN)
            .unwrap();
        let node = set.get("t").unwrap().node();
        let children = doc.children(node).to_vec();
        assert_eq!(children.len(), 3);
        assert_eq!(doc.attr(children[0], "id"), Some("head"));
        assert_eq!(doc.attr(children[0], "class"), Some("title"));
        assert_eq!(doc.style(children[0], "font-weight"), Some("bold"));
        assert_eq!(doc.style(children[0], "width"), Some("40"));
        assert_eq!(doc.html(children[0]), Some("x"));
        assert_eq!(doc.html(children[1]), Some("p=0.5"));
        assert_eq!(doc.attr(children[2], "class"), Some(ARROW_CLASS));
    }

    #[test]
    fn test_arrow_created_once() {
        let (mut doc, anchor, mut set) = fixture();
        let layout = TooltipLayout::default();
        set.create(&mut doc, anchor, "b", &layout, &json!({}), "t", Point::ORIGIN)
            .unwrap();
        let arrow = set.get("t").unwrap().arrow().unwrap();
        set.position(&mut doc, "t", Point::new(10.0, 20.0)).unwrap();
        set.position(&mut doc, "t", Point::new(11.0, 21.0)).unwrap();
        let node = set.get("t").unwrap().node();
        assert_eq!(set.get("t").unwrap().arrow(), Some(arrow));
        assert_eq!(doc.children(node), &[arrow]);
        assert_eq!(doc.style(arrow, "position"), Some("absolute"));
        assert_eq!(doc.style(arrow, "left"), Some("-1px"));
        assert_eq!(doc.style(node, "left"), Some("11px"));
    }

    #[test]
    fn test_invalid_ids() {
        let (mut doc, anchor, mut set) = fixture();
        let layout = TooltipLayout::default();
        assert!(matches!(
            set.create(&mut doc, anchor, "b", &layout, &json!({}), "", Point::ORIGIN),
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            set.position(&mut doc, "ghost", Point::ORIGIN),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_destroy() {
        let (mut doc, anchor, mut set) = fixture();
        let layout = TooltipLayout::default();
        for id in ["a", "b"] {
            set.create(&mut doc, anchor, "b", &layout, &json!({}), id, Point::ORIGIN)
                .unwrap();
        }
        let nodes_before = doc.len();
        set.destroy(&mut doc, "missing").unwrap();
        assert_eq!(doc.len(), nodes_before);
        assert_eq!(set.len(), 2);

        set.destroy(&mut doc, "a").unwrap();
        assert!(set.get("a").is_none());
        assert!(doc.find_by_id("b.tooltip.a").is_none());

        set.destroy_all(&mut doc).unwrap();
        assert!(set.is_empty());
        assert!(doc.find_by_id("b.tooltip.b").is_none());
    }

    #[test]
    fn test_recreate_replaces_node() {
        let (mut doc, anchor, mut set) = fixture();
        let layout = TooltipLayout::default();
        set.create(&mut doc, anchor, "b", &layout, &json!({"v": 1}), "t", Point::ORIGIN)
            .unwrap();
        set.create(&mut doc, anchor, "b", &layout, &json!({"v": 2}), "t", Point::ORIGIN)
            .unwrap();
        assert_eq!(doc.nodes_with_id("b.tooltip.t").count(), 1);
        assert_eq!(set.get("t").unwrap().datum(), &json!({"v": 2}));
    }
}
