use std::collections::HashMap;
use std::fmt;

use bm_store::BotFile;

use crate::machine::StateMachine;
use crate::reply::Reply;
use crate::services::UpdateTarget;

/// Opaque, stable identity of a conversing user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Identity(pub u64);

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Dialogue step a session is at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Menu,
    EditCoinList,
    EditUserConfig,
    ConfirmDeleteDatabase,
    ConfirmUpdateSelf,
    ConfirmUpdateExternalBot,
}

/// Context carried from a prompt to the answer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pending {
    EditFile(BotFile),
    /// The database the store manages, confirmed for deletion
    DeleteDatabase,
    Update { target: UpdateTarget, commits: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    identity: Identity,
    state: SessionState,
    pending: Option<Pending>,
}

impl Session {
    pub fn new(identity: Identity) -> Self {
        Self { identity, state: SessionState::Menu, pending: None }
    }

    pub fn identity(&self) -> Identity {
        self.identity
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn pending(&self) -> Option<&Pending> {
        self.pending.as_ref()
    }

    pub(crate) fn transition(&mut self, state: SessionState, pending: Option<Pending>) {
        if state != self.state {
            tracing::debug!(identity = %self.identity, from = ?self.state, to = ?state, "Session transition");
        }
        self.state = state;
        self.pending = pending;
    }

    /// Back to the menu, dropping any pending context
    pub fn reset(&mut self) {
        self.transition(SessionState::Menu, None);
    }
}

/// All live sessions, keyed by identity
#[derive(Debug, Default)]
pub struct Sessions {
    sessions: HashMap<Identity, Session>,
}

impl Sessions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, identity: Identity) -> Option<&Session> {
        self.sessions.get(&identity)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Feed one event to the identity's session.
    ///
    /// An identity without a session only gets one when the text is an entry event; anything else
    /// from it is ignored and `None` is returned.
    pub fn dispatch(&mut self, machine: &StateMachine, identity: Identity, text: &str) -> Option<Reply> {
        if !self.sessions.contains_key(&identity) {
            if !machine.is_entry(text) {
                tracing::debug!(%identity, "Ignoring input from identity without a session");
                return None;
            }
            tracing::info!(%identity, "Session opened");
            self.sessions.insert(identity, Session::new(identity));
        }

        let session = self.sessions.get_mut(&identity)?;
        Some(machine.handle(session, text))
    }
}
