use shared::domain::UserId;

/// An authenticated principal, as reported by the authentication collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: UserId,
}

impl Session {
    pub fn new(user_id: impl Into<UserId>) -> Self {
        Self {
            user_id: user_id.into(),
        }
    }
}

/// A user id bound to the store epoch it was read under.
///
/// Clearing the store starts a new epoch; reads and follow-up refreshes
/// carrying an older scope are refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionScope {
    pub user_id: UserId,
    pub epoch: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionTransition {
    Started(Session),
    Ended,
    /// A different user signed in without an intermediate sign-out.
    Switched(Session),
    Unchanged,
}

impl SessionTransition {
    pub fn between(previous: Option<&Session>, next: Option<&Session>) -> Self {
        match (previous, next) {
            (None, None) => Self::Unchanged,
            (None, Some(next)) => Self::Started(next.clone()),
            (Some(_), None) => Self::Ended,
            (Some(previous), Some(next)) if previous == next => Self::Unchanged,
            (Some(_), Some(next)) => Self::Switched(next.clone()),
        }
    }
}
