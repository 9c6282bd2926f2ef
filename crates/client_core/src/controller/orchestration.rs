//! Runs view-state commands against the sync controller.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::debug;

use crate::{
    error::SyncError,
    session::{Session, SessionScope, SessionTransition},
    sync::SyncController,
    view::{Command, ViewEvent, ViewState},
};

pub struct RecallApp {
    sync: Arc<SyncController>,
    view: Mutex<ViewState>,
    session: Mutex<Option<Session>>,
}

impl RecallApp {
    pub fn new(sync: Arc<SyncController>) -> Arc<Self> {
        Arc::new(Self {
            sync,
            view: Mutex::new(ViewState::new()),
            session: Mutex::new(None),
        })
    }

    pub fn sync(&self) -> &Arc<SyncController> {
        &self.sync
    }

    pub async fn view(&self) -> ViewState {
        self.view.lock().await.clone()
    }

    pub async fn session(&self) -> Option<Session> {
        self.session.lock().await.clone()
    }

    /// Records the session reported by the authentication collaborator.
    pub async fn set_session(&self, next: Option<Session>) -> Result<(), SyncError> {
        let transition = {
            let mut guard = self.session.lock().await;
            let transition = SessionTransition::between(guard.as_ref(), next.as_ref());
            *guard = next;
            transition
        };

        match transition {
            SessionTransition::Unchanged => Ok(()),
            SessionTransition::Started(_) => self.handle(ViewEvent::SessionStarted).await,
            SessionTransition::Ended => self.handle(ViewEvent::SessionEnded).await,
            SessionTransition::Switched(_) => {
                self.handle(ViewEvent::SessionEnded).await?;
                self.handle(ViewEvent::SessionStarted).await
            }
        }
    }

    /// Applies a view event and runs the commands it produced, in order.
    pub async fn handle(&self, event: ViewEvent) -> Result<(), SyncError> {
        for command in self.apply(event).await {
            self.execute(command).await?;
        }
        Ok(())
    }

    async fn apply(&self, event: ViewEvent) -> Vec<Command> {
        let mut view = self.view.lock().await;
        self.sync
            .with_store(|store| view.apply(event, store))
            .await
    }

    async fn execute(&self, command: Command) -> Result<(), SyncError> {
        debug!(command = command_name(&command), "executing view command");
        match command {
            Command::FetchAll => {
                let scope = self.scope().await?;
                self.sync.fetch_all_scoped(&scope).await?;
            }
            Command::Search(query) => {
                let scope = self.scope().await?;
                self.sync.search_scoped(&query, &scope).await?;
            }
            Command::Create(request) => {
                let scope = self.scope().await?;
                self.sync.create_item_scoped(request, &scope).await?;
                self.apply(ViewEvent::ItemCreated).await;
            }
            Command::Update { id, location, tags } => {
                self.sync.update_item(&id, &location, &tags).await?;
                self.apply(ViewEvent::EditSaved).await;
            }
            Command::Delete(id) => {
                self.sync.delete_item(&id).await?;
                self.apply(ViewEvent::ItemDeleted(id)).await;
            }
            Command::ClearItems => self.sync.clear().await,
        }
        Ok(())
    }

    /// Reads the user and the store epoch together, so a sign-out that lands
    /// afterwards invalidates the scope.
    async fn scope(&self) -> Result<SessionScope, SyncError> {
        let session = self.session.lock().await;
        match session.as_ref() {
            Some(session) => Ok(self.sync.scope(&session.user_id).await),
            None => Err(self.sync.fail(SyncError::NoSession)),
        }
    }
}

fn command_name(command: &Command) -> &'static str {
    match command {
        Command::FetchAll => "fetch_all",
        Command::Search(_) => "search",
        Command::Create(_) => "create",
        Command::Update { .. } => "update",
        Command::Delete(_) => "delete",
        Command::ClearItems => "clear_items",
    }
}

#[cfg(test)]
#[path = "../tests/orchestration_tests.rs"]
mod tests;
