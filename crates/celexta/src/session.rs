//! Tabs and whole-session save/restore.
//!
//! A [`Workspace`] is the tab strip of the main window: each tab owns a
//! [`Controller`]. A session is saved as `latest_session.json`, a JSON
//! object mapping tab titles (in tab order) to their [`TabState`], plus a
//! `latest_session_data/` directory holding one sub-directory of side
//! files per tab.

use std::fmt;
use std::path::{Path, PathBuf};

use celexta_core::logging::targets;
use celexta_core::PerfSpan;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::controller::Controller;
use crate::error::{CelextaError, Result};
use crate::file;
use crate::items::{file_stem, Color};
use crate::model::ColorPool;
use crate::persist::TabState;

/// Name of the session file inside the session directory.
pub const SESSION_FILE: &str = "latest_session.json";

/// Name of the side-file directory inside the session directory.
pub const SESSION_DATA_DIR: &str = "latest_session_data";

/// Tabs in order, keyed by title.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionFile {
    /// `(title, state)` per tab.
    pub tabs: Vec<(String, TabState)>,
}

impl Serialize for SessionFile {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.tabs.len()))?;
        for (title, state) in &self.tabs {
            map.serialize_entry(title, state)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for SessionFile {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct TabsVisitor;

        impl<'de> Visitor<'de> for TabsVisitor {
            type Value = SessionFile;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of tab titles to tab states")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> std::result::Result<SessionFile, A::Error> {
                let mut tabs = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((title, state)) = access.next_entry::<String, TabState>()? {
                    tabs.push((title, state));
                }
                Ok(SessionFile { tabs })
            }
        }

        deserializer.deserialize_map(TabsVisitor)
    }
}

struct Tab {
    title: String,
    controller: Controller,
}

/// The tab strip.
pub struct Workspace {
    tabs: Vec<Tab>,
    current: Option<usize>,
    palette: Vec<Color>,
}

impl Default for Workspace {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl Workspace {
    /// An empty workspace whose tabs allocate colors from `palette` (the
    /// default palette when empty).
    pub fn new(palette: Vec<Color>) -> Self {
        Self {
            tabs: Vec::new(),
            current: None,
            palette,
        }
    }

    /// Opens a new tab and makes it current. Returns its index.
    pub fn add_tab(&mut self, title: impl Into<String>) -> usize {
        let title = title.into();
        tracing::debug!(target: targets::SESSION, %title, "adding tab");
        let colors = if self.palette.is_empty() {
            ColorPool::default()
        } else {
            ColorPool::new(self.palette.clone())
        };
        self.tabs.push(Tab {
            title,
            controller: Controller::with_colors(colors),
        });
        let index = self.tabs.len() - 1;
        self.current = Some(index);
        index
    }

    /// Closes tab `index`. The current tab stays current if it survives;
    /// otherwise its neighbour takes over.
    pub fn close_tab(&mut self, index: usize) -> bool {
        if index >= self.tabs.len() {
            tracing::debug!(target: targets::SESSION, index, "no such tab, ignoring close");
            return false;
        }
        let tab = self.tabs.remove(index);
        tracing::debug!(target: targets::SESSION, title = %tab.title, "closed tab");
        self.current = match self.current {
            _ if self.tabs.is_empty() => None,
            Some(current) if current > index => Some(current - 1),
            Some(current) => Some(current.min(self.tabs.len() - 1)),
            None => None,
        };
        true
    }

    /// Renames tab `index`.
    pub fn rename_tab(&mut self, index: usize, title: impl Into<String>) -> bool {
        match self.tabs.get_mut(index) {
            Some(tab) => {
                tab.title = title.into();
                true
            }
            None => false,
        }
    }

    /// Makes tab `index` current.
    pub fn set_current(&mut self, index: usize) -> bool {
        if index < self.tabs.len() {
            self.current = Some(index);
            true
        } else {
            false
        }
    }

    /// Index of the current tab.
    pub fn current_index(&self) -> Option<usize> {
        self.current
    }

    /// Controller of the current tab.
    pub fn current(&self) -> Option<&Controller> {
        self.current.and_then(|index| self.tab(index))
    }

    /// Controller of tab `index`.
    pub fn tab(&self, index: usize) -> Option<&Controller> {
        self.tabs.get(index).map(|tab| &tab.controller)
    }

    /// Title of tab `index`.
    pub fn title(&self, index: usize) -> Option<&str> {
        self.tabs.get(index).map(|tab| tab.title.as_str())
    }

    /// Tab titles in order.
    pub fn titles(&self) -> Vec<&str> {
        self.tabs.iter().map(|tab| tab.title.as_str()).collect()
    }

    /// Number of tabs.
    pub fn len(&self) -> usize {
        self.tabs.len()
    }

    /// Returns true if there are no tabs.
    pub fn is_empty(&self) -> bool {
        self.tabs.is_empty()
    }

    /// Saves every tab under `dir` and returns the session file path.
    ///
    /// The side-file directory is emptied first. Tabs sharing a title are
    /// saved as "title (2)", "title (3)" and so on.
    pub fn save_session(&self, dir: impl AsRef<Path>) -> Result<PathBuf> {
        let _span = PerfSpan::new("save_session");
        let dir = dir.as_ref();
        let data_dir = dir.join(SESSION_DATA_DIR);
        tracing::info!(target: targets::SESSION, dir = %data_dir.display(), "saving session");
        file::reset_dir(&data_dir)?;

        let mut session = SessionFile::default();
        for tab in &self.tabs {
            let title = unique_title(&session.tabs, &tab.title);
            let state = tab.controller.to_tab_state(&data_dir.join(file_stem(&title)))?;
            tracing::debug!(target: targets::SESSION, %title, items = state.len(), "saved tab");
            session.tabs.push((title, state));
        }

        let path = dir.join(SESSION_FILE);
        file::atomic_write(&path, &serde_json::to_vec_pretty(&session)?)?;
        tracing::info!(target: targets::SESSION, tabs = session.tabs.len(), "session saved");
        Ok(path)
    }

    /// Opens one tab per saved tab of the session under `dir`.
    ///
    /// A missing session file is logged and loads nothing. If any tab fails
    /// to load, the tabs opened by this call are closed again and the error
    /// is returned. Returns the number of tabs opened.
    pub fn load_session(&mut self, dir: impl AsRef<Path>) -> Result<usize> {
        let _span = PerfSpan::new("load_session");
        let path = dir.as_ref().join(SESSION_FILE);
        if !path.exists() {
            tracing::warn!(target: targets::SESSION, path = %path.display(), "no session data found, skipping");
            return Ok(0);
        }
        tracing::info!(target: targets::SESSION, path = %path.display(), "loading session");
        let session: SessionFile = serde_json::from_slice(&file::read_bytes(&path)?)?;

        let first_new = self.tabs.len();
        let previous_current = self.current;
        for (title, state) in &session.tabs {
            let index = self.add_tab(title.clone());
            if let Err(err) = self.tabs[index].controller.load_tab_state(state) {
                tracing::error!(target: targets::SESSION, %title, error = %err, "failed to load tab, discarding session");
                self.tabs.truncate(first_new);
                self.current = previous_current;
                return Err(err);
            }
        }
        tracing::info!(target: targets::SESSION, tabs = session.tabs.len(), "session loaded");
        Ok(session.tabs.len())
    }
}

impl fmt::Debug for Workspace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Workspace")
            .field("tabs", &self.titles())
            .field("current", &self.current)
            .finish()
    }
}

fn unique_title(taken: &[(String, TabState)], title: &str) -> String {
    let is_taken = |candidate: &str| taken.iter().any(|(t, _)| t == candidate);
    if !is_taken(title) {
        return title.to_string();
    }
    (2..)
        .map(|n| format!("{title} ({n})"))
        .find(|candidate| !is_taken(candidate))
        .unwrap_or_else(|| title.to_string())
}

/// Reads a session file without opening anything.
pub fn read_session_file(path: impl AsRef<Path>) -> Result<SessionFile> {
    let path = path.as_ref();
    let bytes = file::read_bytes(path)?;
    serde_json::from_slice(&bytes).map_err(|source| {
        CelextaError::InvalidDescriptor(format!("{}: {source}", path.display()))
    })
}
