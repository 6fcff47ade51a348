//! Per-user posting sessions and their state machine.
//!
//! A session walks a fixed sequence of collection steps, then sits in a
//! confirm state from which individual fields can be edited. Sessions live
//! in a process-wide [`SessionStore`] keyed by user identity and are
//! dropped on cancel or completion; there is no persistence across
//! restarts.

use std::collections::HashMap;

use crate::error::Result;
use crate::fields::{Field, FieldMap};

/// Identity of a chat user, as issued by the transport.
pub type UserId = i64;

/// Where a session currently is in the posting flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Collecting the field at the given step index (`0..Field::COUNT`).
    Collecting(usize),
    /// Awaiting a replacement value for one field.
    EditingField(Field),
    /// All fields collected; awaiting confirm, cancel, or edit.
    Confirm,
}

/// What applying one piece of user input did to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    /// The session moved on to collecting the given field.
    NextField(Field),
    /// All fields are collected; the session is awaiting confirmation.
    Confirm,
}

/// One user's in-progress post.
#[derive(Debug, Clone)]
pub struct PostSession {
    state: SessionState,
    fields: FieldMap,
}

impl PostSession {
    /// Creates a session at the first collection step.
    pub fn new() -> Self {
        Self {
            state: SessionState::Collecting(0),
            fields: FieldMap::new(),
        }
    }

    /// Returns the current state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Returns the collected fields.
    pub fn fields(&self) -> &FieldMap {
        &self.fields
    }

    /// Returns the field currently awaiting input, if the session is
    /// collecting or editing.
    pub fn current_field(&self) -> Option<Field> {
        match self.state {
            SessionState::Collecting(step) => Field::ALL.get(step).copied(),
            SessionState::EditingField(field) => Some(field),
            SessionState::Confirm => None,
        }
    }

    /// Returns `(completed_steps, total_steps)` for status reporting.
    pub fn progress(&self) -> (usize, usize) {
        let completed = match self.state {
            SessionState::Collecting(step) => step,
            SessionState::EditingField(_) | SessionState::Confirm => Field::COUNT,
        };
        (completed, Field::COUNT)
    }

    /// Applies user input to the current step.
    ///
    /// Validates the input for the awaited field and stores it. While
    /// collecting, a valid input advances to the next field or to the
    /// confirm state after the last one. While editing, a valid input
    /// returns to the confirm state; other fields are not re-validated.
    /// Invalid input leaves the session unchanged.
    pub fn apply_input(&mut self, input: &str) -> Result<Advance> {
        match self.state {
            SessionState::Collecting(step) => {
                let field = Field::ALL[step.min(Field::COUNT - 1)];
                field.validate(input)?;
                self.fields.set(field, input.trim());
                if step + 1 < Field::COUNT {
                    self.state = SessionState::Collecting(step + 1);
                    Ok(Advance::NextField(Field::ALL[step + 1]))
                } else {
                    self.state = SessionState::Confirm;
                    Ok(Advance::Confirm)
                }
            }
            SessionState::EditingField(field) => {
                field.validate(input)?;
                self.fields.set(field, input.trim());
                self.state = SessionState::Confirm;
                Ok(Advance::Confirm)
            }
            SessionState::Confirm => Ok(Advance::Confirm),
        }
    }

    /// Moves the session into editing one field.
    pub fn begin_edit(&mut self, field: Field) {
        self.state = SessionState::EditingField(field);
    }
}

impl Default for PostSession {
    fn default() -> Self {
        Self::new()
    }
}

/// Storage for active sessions, keyed by user identity.
///
/// The in-memory implementation is the process-wide default; the trait is
/// the seam for swapping in a persistent store without touching the
/// controller.
pub trait SessionStore: Send {
    /// Starts (or restarts) a session for the user.
    fn insert(&mut self, user: UserId, session: PostSession);

    /// Removes and returns the user's session, if any.
    fn remove(&mut self, user: UserId) -> Option<PostSession>;

    /// Returns the user's session for mutation, if any.
    fn get_mut(&mut self, user: UserId) -> Option<&mut PostSession>;

    /// Returns true if the user has an active session.
    fn contains(&self, user: UserId) -> bool;
}

/// In-memory session store with no persistence.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    sessions: HashMap<UserId, PostSession>,
}

impl MemorySessionStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    fn insert(&mut self, user: UserId, session: PostSession) {
        self.sessions.insert(user, session);
    }

    fn remove(&mut self, user: UserId) -> Option<PostSession> {
        self.sessions.remove(&user)
    }

    fn get_mut(&mut self, user: UserId) -> Option<&mut PostSession> {
        self.sessions.get_mut(&user)
    }

    fn contains(&self, user: UserId) -> bool {
        self.sessions.contains_key(&user)
    }
}
