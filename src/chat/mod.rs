//! Conversational front-end for collecting and publishing movie posts.
//!
//! This module provides the chat-facing layer on top of the reelpost
//! client library. It supports:
//!
//! - Slash commands for session control, status, and authentication
//! - A step-by-step collection flow with per-field validation
//! - A confirm/edit/cancel summary before publishing
//!
//! # Architecture
//!
//! The module is organized into several components:
//!
//! - [`commands`]: slash command and choice-token parsing
//! - [`config`]: CLI argument parsing and configuration
//! - [`session`]: per-user posting sessions and the [`SessionStore`] seam
//! - [`controller`]: the handlers that turn input into [`Reply`] messages
//!
//! The controller is transport-agnostic: a front-end delivers lines (or
//! choice tokens) and renders the replies however it likes.

mod commands;
mod config;
mod controller;
mod session;

pub use commands::{BotCommand, Selection, help_text, parse_command, parse_selection};
pub use config::{ChatArgs, ChatConfig};
pub use controller::{BotController, Choice, Reply};
pub use session::{
    Advance, MemorySessionStore, PostSession, SessionState, SessionStore, UserId,
};
