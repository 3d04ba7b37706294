//! Celexta - observable item collections kept in sync with their views.
//!
//! Celexta manages four kinds of astronomical items per tab: image frames,
//! sky regions, catalog tables and transient candidates. Each kind lives in
//! an [`ItemCollection`](model::ItemCollection) that announces every change
//! through a [`Signal`](celexta_core::Signal). List panels, per-frame plot
//! surfaces and the light-curve plot subscribe to those announcements and
//! keep one visual handle per item. The [`Controller`] routes user actions
//! to the right collection and surfaces.
//!
//! # Example
//!
//! ```
//! use celexta::prelude::*;
//!
//! let controller = Controller::new();
//! let frame = samples::example_image(ExampleImage::Starfield)?;
//! let region = samples::example_region(&frame, 1).ok_or("frame has no WCS")?;
//!
//! let frame_id = controller.add_image_frame(frame);
//! let region_id = controller.add(region);
//!
//! assert_eq!(controller.focused_surface(), Some(frame_id));
//! assert_eq!(controller.with_surface(frame_id, |view| view.has_item(region_id)), Some(true));
//! assert_eq!(controller.list_model::<Region>().row_count(), 1);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod astro;
pub mod config;
pub mod controller;
pub mod error;
pub mod file;
pub mod items;
pub mod model;
pub mod persist;
pub mod prelude;
pub mod samples;
pub mod session;
pub mod view;

pub use celexta_core::{logging, ConnectionGuard, ConnectionId, Signal};
pub use config::Config;
pub use controller::{Controller, Managed};
pub use error::{CelextaError, Result};
pub use session::Workspace;
