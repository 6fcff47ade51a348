//! Command and selection parsing for the conversation front-end.
//!
//! Commands start with `/` and control the posting flow; anything else is
//! treated as free-text input for the current collection step. Selections
//! are the stable data tokens attached to reply choices (confirm, cancel,
//! and the edit menu).

use crate::fields::Field;

/// A parsed bot command.
#[derive(Debug, Clone, PartialEq)]
pub enum BotCommand {
    /// Show the welcome message.
    Start,

    /// Begin collecting fields for a new post.
    Post,

    /// Discard the active session.
    Cancel,

    /// Open the edit menu for the active session.
    Edit,

    /// Report per-field collection progress.
    Status,

    /// Show the help message.
    Help,

    /// Describe the template placeholders.
    Template,

    /// Report authentication status or start an authorization flow.
    Auth,

    /// Complete a pending authorization flow.
    CompleteAuth,

    /// Report a parsing error back to the caller.
    Invalid(String),
}

/// Parses user input for bot commands.
///
/// Returns `Some(BotCommand)` if the input is a command, or `None` if it
/// should be treated as free-text field input.
pub fn parse_command(input: &str) -> Option<BotCommand> {
    let input = input.trim();

    if !input.starts_with('/') {
        return None;
    }

    let command = input[1..]
        .split_whitespace()
        .next()
        .unwrap_or("")
        .to_lowercase();

    let result = match command.as_str() {
        "start" => BotCommand::Start,
        "post" | "new" => BotCommand::Post,
        "cancel" => BotCommand::Cancel,
        "edit" => BotCommand::Edit,
        "status" => BotCommand::Status,
        "help" | "?" => BotCommand::Help,
        "template" => BotCommand::Template,
        "auth" => BotCommand::Auth,
        "complete_auth" | "completeauth" => BotCommand::CompleteAuth,
        _ => BotCommand::Invalid(format!("Unknown command: /{}", command)),
    };

    Some(result)
}

/// A selection made from reply choices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    /// Publish the post.
    Confirm,
    /// Discard the session.
    Cancel,
    /// Show the per-field edit menu.
    EditMenu,
    /// Edit one specific field.
    EditField(Field),
}

impl Selection {
    /// Stable data token carried by the choice.
    pub fn token(self) -> String {
        match self {
            Selection::Confirm => "post_confirm".to_string(),
            Selection::Cancel => "post_cancel".to_string(),
            Selection::EditMenu => "post_edit".to_string(),
            Selection::EditField(field) => format!("edit_{}", field.key()),
        }
    }
}

/// Parses a choice data token back into a selection.
pub fn parse_selection(data: &str) -> Option<Selection> {
    match data {
        "post_confirm" => Some(Selection::Confirm),
        "post_cancel" => Some(Selection::Cancel),
        "post_edit" => Some(Selection::EditMenu),
        _ => data
            .strip_prefix("edit_")
            .and_then(Field::from_key)
            .map(Selection::EditField),
    }
}

/// Returns help text describing available commands.
pub fn help_text() -> &'static str {
    r#"Available commands:
  /start           Welcome message and introduction
  /post            Start creating a new movie post
  /cancel          Cancel the current posting process
  /edit            Edit any field in your current post
  /status          Check your current post status
  /template        View the HTML template structure
  /auth            Check Blogger authentication status
  /complete_auth   Complete authentication after authorizing
  /help            Show this help message

How to use:
  1. Use /post to start creating a post
  2. Follow the step-by-step prompts (title, labels, poster,
     rating, review, scenes, YouTube link, source data)
  3. Review the summary and edit any field if needed
  4. Confirm to publish to your blog

All fields are validated before posting, and /cancel works at any time."#
}
