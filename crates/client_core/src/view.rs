//! View-state machine.
//!
//! Transitions are pure: they update presentation state and return the
//! [`Command`]s the orchestration layer must run against the sync
//! controller. The add-new variant suspends the browse state, so an
//! expanded stack outside of browse mode cannot be represented.

use shared::domain::MemoryId;
use tracing::debug;

use crate::{
    store::ItemStore,
    types::{CreateRequest, ImageUpload},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Browse,
    AddNew,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BrowseState {
    pub query: String,
    pub search_active: bool,
    pub stack_expanded: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Presentation {
    Browse(BrowseState),
    AddNew { suspended: BrowseState },
}

impl Default for Presentation {
    fn default() -> Self {
        Self::Browse(BrowseState::default())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadForm {
    pub file: Option<ImageUpload>,
    pub location: String,
    pub tags: String,
}

#[derive(Debug, Clone)]
pub enum ViewEvent {
    SessionStarted,
    SessionEnded,
    SearchInput(String),
    StackTapped,
    CollapseTapped,
    EditRequested(MemoryId),
    EditSubmitted { location: String, tags: String },
    EditSaved,
    EditCancelled,
    DeleteConfirmed(MemoryId),
    ItemDeleted(MemoryId),
    TabSelected(Mode),
    ImageSelected(ImageUpload),
    UploadLocationChanged(String),
    UploadTagsChanged(String),
    UploadSubmitted,
    ItemCreated,
}

/// Work requested from the sync controller.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    FetchAll,
    Search(String),
    Create(CreateRequest),
    Update {
        id: MemoryId,
        location: String,
        tags: String,
    },
    Delete(MemoryId),
    ClearItems,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewState {
    presentation: Presentation,
    editing: Option<MemoryId>,
    upload: UploadForm,
}

impl ViewState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> Mode {
        match self.presentation {
            Presentation::Browse(_) => Mode::Browse,
            Presentation::AddNew { .. } => Mode::AddNew,
        }
    }

    pub fn search_active(&self) -> bool {
        self.browse().search_active
    }

    /// Always false outside browse mode.
    pub fn stack_expanded(&self) -> bool {
        match &self.presentation {
            Presentation::Browse(browse) => browse.stack_expanded,
            Presentation::AddNew { .. } => false,
        }
    }

    pub fn query(&self) -> &str {
        &self.browse().query
    }

    pub fn editing(&self) -> Option<&MemoryId> {
        self.editing.as_ref()
    }

    pub fn upload(&self) -> &UploadForm {
        &self.upload
    }

    pub fn apply(&mut self, event: ViewEvent, store: &ItemStore) -> Vec<Command> {
        match event {
            ViewEvent::SessionStarted => vec![Command::FetchAll],
            ViewEvent::SessionEnded => {
                *self = Self::default();
                vec![Command::ClearItems]
            }
            ViewEvent::SearchInput(query) => {
                let browse = self.browse_mut();
                browse.query = query.clone();
                if query.trim().is_empty() {
                    browse.search_active = false;
                    vec![Command::FetchAll]
                } else {
                    browse.search_active = true;
                    browse.stack_expanded = true;
                    vec![Command::Search(query)]
                }
            }
            ViewEvent::StackTapped => {
                if let Presentation::Browse(browse) = &mut self.presentation {
                    browse.stack_expanded = true;
                }
                Vec::new()
            }
            ViewEvent::CollapseTapped => {
                if let Presentation::Browse(browse) = &mut self.presentation {
                    browse.stack_expanded = false;
                }
                Vec::new()
            }
            ViewEvent::EditRequested(id) => {
                if store.contains(&id) {
                    self.editing = Some(id);
                } else {
                    debug!(memory_id = %id, "ignoring edit request for unknown memory");
                }
                Vec::new()
            }
            ViewEvent::EditSubmitted { location, tags } => match &self.editing {
                Some(id) => vec![Command::Update {
                    id: id.clone(),
                    location,
                    tags,
                }],
                None => Vec::new(),
            },
            ViewEvent::EditSaved | ViewEvent::EditCancelled => {
                self.editing = None;
                Vec::new()
            }
            ViewEvent::DeleteConfirmed(id) => vec![Command::Delete(id)],
            ViewEvent::ItemDeleted(id) => {
                if self.editing.as_ref() == Some(&id) {
                    self.editing = None;
                }
                Vec::new()
            }
            ViewEvent::TabSelected(mode) => {
                self.switch_to(mode);
                Vec::new()
            }
            ViewEvent::ImageSelected(file) => {
                self.upload.file = Some(file);
                Vec::new()
            }
            ViewEvent::UploadLocationChanged(location) => {
                self.upload.location = location;
                Vec::new()
            }
            ViewEvent::UploadTagsChanged(tags) => {
                self.upload.tags = tags;
                Vec::new()
            }
            ViewEvent::UploadSubmitted => vec![Command::Create(CreateRequest {
                file: self.upload.file.clone(),
                location: self.upload.location.clone(),
                tags: self.upload.tags.clone(),
            })],
            ViewEvent::ItemCreated => {
                if self.mode() == Mode::AddNew {
                    self.switch_to(Mode::Browse);
                }
                self.upload = UploadForm::default();
                Vec::new()
            }
        }
    }

    fn switch_to(&mut self, mode: Mode) {
        let presentation = std::mem::take(&mut self.presentation);
        self.presentation = match (presentation, mode) {
            (Presentation::AddNew { suspended }, Mode::Browse) => Presentation::Browse(suspended),
            (Presentation::Browse(browse), Mode::AddNew) => {
                Presentation::AddNew { suspended: browse }
            }
            (unchanged, _) => unchanged,
        };
    }

    fn browse(&self) -> &BrowseState {
        match &self.presentation {
            Presentation::Browse(browse) => browse,
            Presentation::AddNew { suspended } => suspended,
        }
    }

    fn browse_mut(&mut self) -> &mut BrowseState {
        match &mut self.presentation {
            Presentation::Browse(browse) => browse,
            Presentation::AddNew { suspended } => suspended,
        }
    }
}

#[cfg(test)]
#[path = "tests/view_tests.rs"]
mod tests;
