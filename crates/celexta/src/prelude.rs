//! Commonly used types.
//!
//! ```
//! use celexta::prelude::*;
//! ```

// Notification
pub use celexta_core::{ConnectionGuard, ConnectionId, Signal};

// Items
pub use crate::astro::{Angle, Interval, SkyCoord, Wcs};
pub use crate::items::{
    AnyItem, Candidate, CatalogTable, CollectionItem, Color, ImageData, ImageFrame, ItemId,
    ItemKind, ItemUpdate, PhotometricPoint, Region,
};

// Collections and view-models
pub use crate::model::{
    CollectionEvent, ColorPool, ItemCollection, ItemListModel, ItemRole, ModelIndex,
};

// Surfaces
pub use crate::view::{FrameView, ListSurface, LightCurveView, PresentationAdapter, attach};

// Application
pub use crate::config::Config;
pub use crate::controller::{Controller, Managed};
pub use crate::error::{CelextaError, Result};
pub use crate::persist::{Persist, TabState};
pub use crate::samples::{self, ExampleImage};
pub use crate::session::Workspace;
