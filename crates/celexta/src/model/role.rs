//! Data roles for list models.
//!
//! Roles define what type of data is being requested or set on a model row.
//! Each row can have multiple pieces of data associated with it, distinguished
//! by their role.

use crate::items::{Color, ItemId};

/// What a caller wants from a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemRole {
    /// Text shown in the row: the item name.
    Display,
    /// Swatch shown next to the text: the item color.
    Decoration,
    /// Tooltip: kind and name.
    ToolTip,
    /// Check box: the visibility flag.
    CheckState,
    /// The item itself, as its id.
    User,
}

/// State of a row's check box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CheckState {
    /// Hidden.
    #[default]
    Unchecked,
    /// Shown.
    Checked,
}

impl CheckState {
    /// Returns true for [`CheckState::Checked`].
    pub fn is_checked(&self) -> bool {
        matches!(self, CheckState::Checked)
    }

    /// The opposite state.
    pub fn toggle(&self) -> CheckState {
        match self {
            CheckState::Unchecked => CheckState::Checked,
            CheckState::Checked => CheckState::Unchecked,
        }
    }
}

impl From<bool> for CheckState {
    fn from(checked: bool) -> Self {
        if checked {
            CheckState::Checked
        } else {
            CheckState::Unchecked
        }
    }
}

/// A value returned by [`ItemListModel::data`](super::ItemListModel::data).
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ItemData {
    /// No data for this role.
    #[default]
    None,
    /// Text.
    String(String),
    /// A color.
    Color(Color),
    /// A check box state.
    CheckState(CheckState),
    /// An item reference.
    Item(ItemId),
}

impl ItemData {
    /// Returns true for [`ItemData::None`].
    pub fn is_none(&self) -> bool {
        matches!(self, ItemData::None)
    }

    /// The text, if this is a string.
    pub fn as_string(&self) -> Option<&str> {
        match self {
            ItemData::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// The color, if this is a color.
    pub fn as_color(&self) -> Option<Color> {
        match self {
            ItemData::Color(c) => Some(*c),
            _ => None,
        }
    }

    /// The check state, if this is one.
    pub fn as_check_state(&self) -> Option<CheckState> {
        match self {
            ItemData::CheckState(s) => Some(*s),
            _ => None,
        }
    }

    /// The item id, if this is an item reference.
    pub fn as_item(&self) -> Option<ItemId> {
        match self {
            ItemData::Item(id) => Some(*id),
            _ => None,
        }
    }
}

impl From<String> for ItemData {
    fn from(s: String) -> Self {
        ItemData::String(s)
    }
}

impl From<&str> for ItemData {
    fn from(s: &str) -> Self {
        ItemData::String(s.to_string())
    }
}

impl From<Color> for ItemData {
    fn from(c: Color) -> Self {
        ItemData::Color(c)
    }
}

impl From<CheckState> for ItemData {
    fn from(s: CheckState) -> Self {
        ItemData::CheckState(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_state() {
        assert!(CheckState::Checked.is_checked());
        assert!(!CheckState::Unchecked.is_checked());
        assert_eq!(CheckState::Checked.toggle(), CheckState::Unchecked);
        assert_eq!(CheckState::from(true), CheckState::Checked);
    }

    #[test]
    fn test_item_data_accessors() {
        let data = ItemData::from("Circle");
        assert_eq!(data.as_string(), Some("Circle"));
        assert!(data.as_color().is_none());
        assert!(ItemData::default().is_none());
        assert_eq!(
            ItemData::from(CheckState::Checked).as_check_state(),
            Some(CheckState::Checked)
        );
    }
}
