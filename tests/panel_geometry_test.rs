//! Panel geometry, tooltip lifecycle and document id tests driven through
//! the public plot API.
//!
//! Run: cargo test --test panel_geometry_test

#![allow(clippy::unwrap_used)]

use std::rc::Rc;

use serde_json::{json, Value};

use locus_viz::prelude::*;
use locus_viz::tooltip::ARROW_CLASS;

const LAYOUT: &str = r#"
width: 500
height: 600
panels:
  positions:
    width: 400
    height: 300
    data_layers:
      assoc:
        fields: [id, position, pvalue]
        y_axis:
          field: pvalue
          lower_buffer: 0.5
          upper_buffer: 0.5
        tooltip:
          divs:
            - id: title
              class: lz-tooltip-title
              style: {font-weight: bold}
              html: "{{id}}"
            - html: "p = {{pvalue}}"
"#;

fn plot() -> Plot {
    let layout = layout::from_yaml(LAYOUT).unwrap();
    let source = Rc::new(StaticSource::new(vec![
        json!({"id": "rs1", "position": 100, "pvalue": 10}),
        json!({"id": "rs2", "position": 200, "pvalue": 20}),
    ]));
    let mut plot = Plot::new("lz", &layout, source).unwrap();
    plot.initialize().unwrap();
    plot
}

#[test]
fn dimensions_are_floored_clamped_and_lenient() {
    let mut plot = plot();
    let panel = plot.panel_mut("positions").unwrap();
    panel.set_dimensions(840, 560);
    panel.set_dimensions(675.3, -50);
    assert_eq!(panel.geometry().width(), 675.0);
    assert_eq!(panel.geometry().height(), 560.0);
    panel.set_dimensions("q", 942);
    assert_eq!(panel.geometry().width(), 675.0);
    assert_eq!(panel.geometry().height(), 942.0);
    panel.set_dimensions(0, Value::Null);
    assert_eq!(panel.geometry().width(), panel.geometry().min_width());
}

#[test]
fn margins_shrink_to_fill_and_drive_cliparea() {
    let mut plot = plot();
    let panel = plot.panel_mut("positions").unwrap();
    panel.set_dimensions(500, 500);
    panel.set_margin(700, 1000, 900, 800);
    assert_eq!(panel.geometry().margin(), Margin::new(150.0, 350.0, 350.0, 150.0));

    panel.set_margin(1, 2, 3, 4);
    let clip = panel.geometry().cliparea();
    assert_eq!(clip.origin, Point::new(4.0, 1.0));
    assert_eq!(clip.width, 494.0);
    assert_eq!(clip.height, 496.0);
}

#[tokio::test]
async fn tooltip_lifecycle_and_ids() {
    let mut plot = plot();
    plot.refresh(Point::ORIGIN).await.unwrap();

    let (layer, doc) = plot.data_layer_with_document("positions", "assoc").unwrap();
    assert_eq!(layer.y_extent_from_layout(), Some([5.0, 30.0]));

    let datum = layer.data()[1].clone();
    layer
        .create_tooltip(doc, &datum, "rs2", Point::new(120.0, 80.0))
        .unwrap();
    layer.position_tooltip(doc, "rs2", Point::new(130.0, 90.0)).unwrap();
    layer.position_tooltip(doc, "rs2", Point::new(140.0, 95.0)).unwrap();

    let node = doc.find_by_id("lz.positions.assoc.tooltip.rs2").unwrap();
    let children = doc.children(node).to_vec();
    let arrows = children
        .iter()
        .filter(|c| doc.attr(**c, "class") == Some(ARROW_CLASS))
        .count();
    assert_eq!(arrows, 1);
    assert_eq!(doc.style(node, "left"), Some("140px"));
    assert_eq!(doc.html(children[0]), Some("rs2"));
    assert_eq!(doc.style(children[0], "font-weight"), Some("bold"));
    assert_eq!(doc.html(children[1]), Some("p = 20"));

    // Tooltips hang off the plot container, next to the svg.
    assert_eq!(doc.parent(node), Some(doc.root()));

    layer.destroy_tooltip(doc, "never-created").unwrap();
    assert_eq!(layer.tooltips().len(), 1);

    plot.draw(Point::new(1.0, 2.0)).unwrap();
    let doc = plot.document();
    assert_eq!(doc.style(node, "left"), Some("1px"));
    assert_eq!(doc.style(node, "top"), Some("2px"));

    let markup = plot.to_markup().unwrap();
    assert!(markup.starts_with(r#"<div id="lz">"#));
    assert!(markup.contains(r#"id="lz.positions.assoc.clip""#));
    assert!(markup.contains(r#"clip-path="url(#lz.positions.assoc.clip)""#));
}

#[test]
fn tooltip_requires_layout_section() {
    let layout = json!({"panels": {"p": {"data_layers": {"plain": {}}}}});
    let mut plot = Plot::new("lz", &layout, Rc::new(StaticSource::new(vec![]))).unwrap();
    plot.initialize().unwrap();
    let (layer, doc) = plot.data_layer_with_document("p", "plain").unwrap();
    let err = layer
        .create_tooltip(doc, &json!({}), "t", Point::ORIGIN)
        .unwrap_err();
    assert!(matches!(err, Error::InvalidConfiguration(_)));
}

#[test]
fn yaml_panels_follow_declaration_order_and_stay_inside_plot() {
    let layout = layout::from_yaml(
        r"
width: 600
height: 400
panels:
  zeta:
    proportional_width: 0.5
    min_width: 10
  alpha:
    width: 400
    height: 100
",
    )
    .unwrap();
    let mut plot = Plot::new("lz", &layout, Rc::new(StaticSource::new(vec![]))).unwrap();
    let ids: Vec<&str> = plot.panels().map(Panel::id).collect();
    assert_eq!(ids, vec!["zeta", "alpha"]);
    assert_eq!(plot.panel("zeta").unwrap().geometry().width(), 300.0);

    plot.set_panel_origin("alpha", 200, 300).unwrap();
    plot.panel_mut("alpha").unwrap().set_dimensions(500, 250);
    let alpha = plot.panel("alpha").unwrap().geometry();
    assert_eq!(alpha.origin(), Point::new(100.0, 150.0));
    assert_eq!(alpha.proportional_width(), 500.0 / 600.0);
}
