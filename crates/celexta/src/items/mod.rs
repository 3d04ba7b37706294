//! Domain items: image frames, sky regions, catalog tables and transient
//! candidates.
//!
//! Every item carries an [`ItemId`] assigned at construction. Clones share
//! the id, so a clone is "the same item" as far as collections and surfaces
//! are concerned; a freshly constructed (or freshly loaded) item is a new one.

mod candidate;
mod frame;
mod region;
mod table;

use std::fmt;
use std::num::NonZeroU64;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::astro::{Angle, Interval, SkyCoord};
use crate::error::{CelextaError, Result};

pub use candidate::{Candidate, PhotometricPoint, REQUIRED_OBSERVATION_COLUMNS};
pub use frame::{ImageData, ImageFrame};
pub use region::{Region, RegionShape, REGION_Z_VALUE};
pub use table::{CatalogTable, TableRow, DEFAULT_MARKER_SIZE};

static NEXT_ITEM_ID: AtomicU64 = AtomicU64::new(1);

/// Opaque identity of an item, unique within the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemId(NonZeroU64);

impl ItemId {
    /// Allocates a new id.
    pub fn next() -> Self {
        let raw = NEXT_ITEM_ID.fetch_add(1, Ordering::Relaxed);
        // The counter starts at 1 and would need 2^64 allocations to wrap.
        Self(NonZeroU64::new(raw).unwrap_or(NonZeroU64::MIN))
    }

    /// The raw value.
    pub fn get(self) -> u64 {
        self.0.get()
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// An RGB color.
///
/// Parsed from `#rgb`, `#rrggbb` or a handful of names; always formatted as
/// lowercase `#rrggbb`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    r: u8,
    g: u8,
    b: u8,
}

impl Color {
    /// Color given to items added without one.
    pub const FALLBACK: Color = Color::rgb(0xff, 0x00, 0x00);

    /// Creates a color from components.
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Red, green and blue components.
    pub fn components(self) -> (u8, u8, u8) {
        (self.r, self.g, self.b)
    }

    /// Parses a hex string or a color name.
    pub fn parse(text: &str) -> Result<Self> {
        let text = text.trim();
        let named = match text.to_ascii_lowercase().as_str() {
            "red" => Some(Self::rgb(0xff, 0x00, 0x00)),
            "green" => Some(Self::rgb(0x00, 0x80, 0x00)),
            "blue" => Some(Self::rgb(0x00, 0x00, 0xff)),
            "yellow" => Some(Self::rgb(0xff, 0xff, 0x00)),
            "cyan" => Some(Self::rgb(0x00, 0xff, 0xff)),
            "magenta" => Some(Self::rgb(0xff, 0x00, 0xff)),
            "orange" => Some(Self::rgb(0xff, 0xa5, 0x00)),
            "white" => Some(Self::rgb(0xff, 0xff, 0xff)),
            "black" => Some(Self::rgb(0x00, 0x00, 0x00)),
            "gray" | "grey" => Some(Self::rgb(0x80, 0x80, 0x80)),
            _ => None,
        };
        if let Some(color) = named {
            return Ok(color);
        }

        let invalid = || CelextaError::InvalidInput(format!("'{text}' is not a color"));
        let hex = text.strip_prefix('#').ok_or_else(invalid)?;
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(invalid());
        }
        let channel = |s: &str| u8::from_str_radix(s, 16).map_err(|_| invalid());
        match hex.len() {
            3 => {
                let expand = |i: usize| channel(&hex[i..=i].repeat(2));
                Ok(Self::rgb(expand(0)?, expand(1)?, expand(2)?))
            }
            6 => Ok(Self::rgb(
                channel(&hex[0..2])?,
                channel(&hex[2..4])?,
                channel(&hex[4..6])?,
            )),
            _ => Err(invalid()),
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl FromStr for Color {
    type Err = CelextaError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Color {
    type Error = CelextaError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_string()
    }
}

/// The four kinds of item a workspace tab manages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    /// An image with its WCS.
    Frame,
    /// A circle or quadrangle on the sky.
    Region,
    /// A catalog of sky positions.
    Table,
    /// A transient candidate with photometry.
    Candidate,
}

impl ItemKind {
    /// All kinds, in session file order.
    pub const ALL: [ItemKind; 4] = [
        ItemKind::Frame,
        ItemKind::Region,
        ItemKind::Table,
        ItemKind::Candidate,
    ];

    /// Lowercase name, as used for session keys.
    pub fn name(self) -> &'static str {
        match self {
            ItemKind::Frame => "frame",
            ItemKind::Region => "region",
            ItemKind::Table => "table",
            ItemKind::Candidate => "candidate",
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A partial edit of an item.
///
/// Each item type applies the fields it has and ignores the others.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemUpdate {
    /// New display name.
    pub name: Option<String>,
    /// New color.
    pub color: Option<Color>,
    /// New circle center.
    pub center: Option<SkyCoord>,
    /// New circle radius.
    pub radius: Option<Angle>,
    /// New quadrangle anchor.
    pub anchor: Option<SkyCoord>,
    /// New quadrangle width.
    pub width: Option<Angle>,
    /// New quadrangle height.
    pub height: Option<Angle>,
    /// New candidate position.
    pub position: Option<SkyCoord>,
    /// New candidate positional uncertainty.
    pub uncertainty: Option<Angle>,
    /// New candidate reference time.
    pub t0: Option<DateTime<Utc>>,
    /// New table marker size, in screen pixels.
    pub marker_size: Option<f64>,
    /// New frame rotation, in degrees.
    pub rotation_deg: Option<f64>,
    /// New frame display interval.
    pub interval: Option<Interval>,
}

impl ItemUpdate {
    /// An update with no fields set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the name.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the color.
    pub fn color(mut self, color: Color) -> Self {
        self.color = Some(color);
        self
    }

    /// Sets the circle center.
    pub fn center(mut self, center: SkyCoord) -> Self {
        self.center = Some(center);
        self
    }

    /// Sets the circle radius.
    pub fn radius(mut self, radius: Angle) -> Self {
        self.radius = Some(radius);
        self
    }

    /// Sets the quadrangle anchor.
    pub fn anchor(mut self, anchor: SkyCoord) -> Self {
        self.anchor = Some(anchor);
        self
    }

    /// Sets the quadrangle width.
    pub fn width(mut self, width: Angle) -> Self {
        self.width = Some(width);
        self
    }

    /// Sets the quadrangle height.
    pub fn height(mut self, height: Angle) -> Self {
        self.height = Some(height);
        self
    }

    /// Sets the candidate position.
    pub fn position(mut self, position: SkyCoord) -> Self {
        self.position = Some(position);
        self
    }

    /// Sets the candidate positional uncertainty.
    pub fn uncertainty(mut self, uncertainty: Angle) -> Self {
        self.uncertainty = Some(uncertainty);
        self
    }

    /// Sets the candidate reference time.
    pub fn t0(mut self, t0: DateTime<Utc>) -> Self {
        self.t0 = Some(t0);
        self
    }

    /// Sets the table marker size.
    pub fn marker_size(mut self, size: f64) -> Self {
        self.marker_size = Some(size);
        self
    }

    /// Sets the frame rotation.
    pub fn rotation_deg(mut self, degrees: f64) -> Self {
        self.rotation_deg = Some(degrees);
        self
    }

    /// Sets the frame display interval.
    pub fn interval(mut self, interval: Interval) -> Self {
        self.interval = Some(interval);
        self
    }

    /// Returns true when no field is set.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Behavior shared by everything an [`ItemCollection`] can hold.
///
/// [`ItemCollection`]: crate::model::ItemCollection
pub trait CollectionItem: Clone + fmt::Debug + Send + Sync + 'static {
    /// Which collection this type belongs in.
    const KIND: ItemKind;

    /// Whether the type has a color attribute at all.
    const COLORED: bool = true;

    /// The item's identity.
    fn id(&self) -> ItemId;

    /// Display name.
    fn name(&self) -> &str;

    /// Current color, if one was set.
    fn color(&self) -> Option<Color> {
        None
    }

    /// Sets the color. Types without a color ignore this.
    fn set_color(&mut self, _color: Color) {}

    /// Applies the fields of `update` this type recognizes.
    ///
    /// Returns true if any field was applied.
    fn apply_update(&mut self, update: &ItemUpdate) -> bool;
}

/// Any item, for code that dispatches on kind.
#[derive(Debug, Clone)]
pub enum AnyItem {
    /// An image frame.
    Frame(ImageFrame),
    /// A sky region.
    Region(Region),
    /// A catalog table.
    Table(CatalogTable),
    /// A transient candidate.
    Candidate(Candidate),
}

impl AnyItem {
    /// The item's kind.
    pub fn kind(&self) -> ItemKind {
        match self {
            AnyItem::Frame(_) => ItemKind::Frame,
            AnyItem::Region(_) => ItemKind::Region,
            AnyItem::Table(_) => ItemKind::Table,
            AnyItem::Candidate(_) => ItemKind::Candidate,
        }
    }

    /// The item's identity.
    pub fn id(&self) -> ItemId {
        match self {
            AnyItem::Frame(item) => item.id(),
            AnyItem::Region(item) => item.id(),
            AnyItem::Table(item) => item.id(),
            AnyItem::Candidate(item) => item.id(),
        }
    }

    /// The item's display name.
    pub fn name(&self) -> &str {
        match self {
            AnyItem::Frame(item) => item.name(),
            AnyItem::Region(item) => item.name(),
            AnyItem::Table(item) => item.name(),
            AnyItem::Candidate(item) => item.name(),
        }
    }

    /// The item's color, if it has one.
    pub fn color(&self) -> Option<Color> {
        match self {
            AnyItem::Frame(item) => item.color(),
            AnyItem::Region(item) => item.color(),
            AnyItem::Table(item) => item.color(),
            AnyItem::Candidate(item) => item.color(),
        }
    }
}

impl From<ImageFrame> for AnyItem {
    fn from(item: ImageFrame) -> Self {
        AnyItem::Frame(item)
    }
}

impl From<Region> for AnyItem {
    fn from(item: Region) -> Self {
        AnyItem::Region(item)
    }
}

impl From<CatalogTable> for AnyItem {
    fn from(item: CatalogTable) -> Self {
        AnyItem::Table(item)
    }
}

impl From<Candidate> for AnyItem {
    fn from(item: Candidate) -> Self {
        AnyItem::Candidate(item)
    }
}

/// File-system friendly form of an item name: spaces become underscores and
/// path separators are dropped.
pub(crate) fn file_stem(name: &str) -> String {
    let stem: String = name
        .chars()
        .filter(|c| !matches!(c, '/' | '\\' | ':'))
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .collect();
    if stem.is_empty() {
        "item".to_string()
    } else {
        stem
    }
}
