//! # Locus-Viz
//!
//! Geometry and data-refresh core for interactive genomic plots.
//!
//! A plot is made of rectangular panels; each panel holds data layers that
//! render a bound dataset into an in-memory SVG/HTML document. This crate
//! keeps panel geometry consistent under arbitrary resize requests and
//! drives the asynchronous refresh of each layer's data, together with the
//! tooltip overlays that depend on it.
//!
//! ## Features
//!
//! - **Constrained geometry**: dimensions, origin, margins and clip area stay
//!   mutually consistent; malformed input is ignored per field
//! - **Layout merging**: user layouts deep-merged over component defaults
//! - **Refresh protocol**: one fetch per refresh, wholesale data replacement,
//!   optional discarding of superseded responses
//! - **Tooltips**: template or div-list overlays positioned at explicit
//!   pointer coordinates
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use locus_viz::prelude::*;
//! use std::rc::Rc;
//!
//! let source = Rc::new(StaticSource::new(records));
//! let mut plot = Plot::new("lz", &layout::from_yaml(LAYOUT)?, source)?;
//! plot.initialize()?;
//! plot.apply_state(&serde_json::json!({"start": 1000, "end": 2000}))?;
//! plot.refresh(Point::ORIGIN).await?;
//! println!("{}", plot.to_markup()?);
//! ```
//!
//! ## Feature Flags
//!
//! - `wasm`: JavaScript bindings for the geometry model

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]
// Allow unwrap() in tests only - banned in production code
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Core Modules
// ============================================================================

/// Layout documents and default merging.
pub mod layout;

/// Panel geometry (dimensions, origin, margins, clip area).
pub mod geometry;

/// In-memory document tree.
pub mod dom;

/// Field interpolation for tooltip templates.
pub mod template;

// ============================================================================
// Plot Modules
// ============================================================================

/// Tooltip overlays.
pub mod tooltip;

/// Data source abstraction.
pub mod source;

/// Data layers and the refresh protocol.
pub mod data_layer;

/// Panels.
pub mod panel;

/// Plots and the plot registry.
pub mod plot;

// ============================================================================
// Optional Integration Modules
// ============================================================================

/// WebAssembly bindings for browser usage.
#[cfg(feature = "wasm")]
#[cfg_attr(docsrs, doc(cfg(feature = "wasm")))]
pub mod wasm;

// ============================================================================
// Error Types
// ============================================================================

/// Error types for locus-viz operations.
pub mod error;

pub use error::{Error, Result};

// ============================================================================
// Prelude
// ============================================================================

/// Commonly used types and traits for convenient imports.
///
/// ```rust,ignore
/// use locus_viz::prelude::*;
/// ```
pub mod prelude {
    pub use crate::data_layer::{DataLayer, Remap, RemapOutcome, YAxisLayout};
    pub use crate::dom::{Document, NodeId};
    pub use crate::error::{Error, Result};
    pub use crate::geometry::{ClipArea, GeometryState, Margin, Point, Scalar};
    pub use crate::layout::{self, merge_layouts};
    pub use crate::panel::Panel;
    pub use crate::plot::{Plot, Registry};
    pub use crate::source::{DataFuture, DataResponse, DataSource, Record, StaticSource};
    pub use crate::tooltip::{Tooltip, TooltipDiv, TooltipLayout};
}
