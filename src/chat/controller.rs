//! The conversation controller.
//!
//! Drives the per-user posting flow: routes commands, free-text field
//! input, and choice selections to the session state machine, and invokes
//! the template engine and publishing client on confirmation. Every
//! handler returns a [`Reply`]; errors are converted to user-visible text
//! at this boundary and never propagate to the transport.

use crate::blogger::{AuthCompletion, AuthState, BloggerClient};
use crate::chat::commands::{BotCommand, Selection, help_text};
use crate::chat::session::{
    Advance, MemorySessionStore, PostSession, SessionState, SessionStore, UserId,
};
use crate::credentials::CredentialStore;
use crate::error::Error;
use crate::fields::Field;
use crate::template::{TemplateEngine, required_placeholders};

/// One selectable option attached to a reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Choice {
    /// Human-readable label.
    pub label: String,
    /// Stable data token delivered back as a selection.
    pub data: String,
}

impl Choice {
    fn new(label: impl Into<String>, selection: Selection) -> Self {
        Self {
            label: label.into(),
            data: selection.token(),
        }
    }
}

/// A message for the transport to deliver to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// The message text.
    pub text: String,
    /// Selectable options, if any.
    pub choices: Vec<Choice>,
}

impl Reply {
    /// A plain text reply.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            choices: Vec::new(),
        }
    }

    fn with_choices(text: impl Into<String>, choices: Vec<Choice>) -> Self {
        Self {
            text: text.into(),
            choices,
        }
    }
}

/// Conversation controller over a session store, a template engine, and a
/// publishing client.
pub struct BotController<C: CredentialStore, S: SessionStore = MemorySessionStore> {
    sessions: S,
    template: TemplateEngine,
    client: BloggerClient<C>,
}

impl<C: CredentialStore> BotController<C> {
    /// Creates a controller with the default in-memory session store.
    pub fn new(client: BloggerClient<C>, template: TemplateEngine) -> Self {
        Self::with_session_store(client, template, MemorySessionStore::new())
    }
}

impl<C: CredentialStore, S: SessionStore> BotController<C, S> {
    /// Creates a controller with a custom session store.
    pub fn with_session_store(
        client: BloggerClient<C>,
        template: TemplateEngine,
        sessions: S,
    ) -> Self {
        Self {
            sessions,
            template,
            client,
        }
    }

    /// Handles a parsed command from the user.
    pub async fn handle_command(&mut self, user: UserId, command: BotCommand) -> Reply {
        match command {
            BotCommand::Start => Reply::text(welcome_text()),
            BotCommand::Help => Reply::text(help_text()),
            BotCommand::Post => {
                self.sessions.insert(user, PostSession::new());
                Reply::text(step_prompt(0))
            }
            BotCommand::Cancel => {
                if self.sessions.remove(user).is_some() {
                    Reply::text("Post creation cancelled.")
                } else {
                    Reply::text("No active post creation to cancel.")
                }
            }
            BotCommand::Edit => {
                if self.sessions.contains(user) {
                    edit_menu()
                } else {
                    Reply::text("No active post to edit. Use /post to start creating a post.")
                }
            }
            BotCommand::Status => self.status_reply(user),
            BotCommand::Template => Reply::text(self.template_info()),
            BotCommand::Auth => self.auth_reply().await,
            BotCommand::CompleteAuth => self.complete_auth_reply().await,
            BotCommand::Invalid(message) => {
                Reply::text(format!("{message}\nUse /help to see available commands."))
            }
        }
    }

    /// Handles free-text input for the current collection or edit step.
    pub async fn handle_text(&mut self, user: UserId, text: &str) -> Reply {
        let Some(session) = self.sessions.get_mut(user) else {
            return Reply::text("Please use /post to start creating a new movie post.");
        };

        let was_editing = match session.state() {
            SessionState::EditingField(field) => Some(field),
            _ => None,
        };

        match session.apply_input(text) {
            Err(Error::Validation { message, .. }) => Reply::text(message),
            Err(err) => Reply::text(format!("Something went wrong: {err}")),
            Ok(Advance::NextField(field)) => Reply::text(step_prompt(field.index())),
            Ok(Advance::Confirm) => {
                let summary = summary_reply(session);
                match was_editing {
                    Some(field) => Reply::with_choices(
                        format!(
                            "{} updated successfully.\n\n{}",
                            field.display_name(),
                            summary.text
                        ),
                        summary.choices,
                    ),
                    None => summary,
                }
            }
        }
    }

    /// Handles a choice selection.
    pub async fn handle_selection(&mut self, user: UserId, selection: Selection) -> Reply {
        if !self.sessions.contains(user) {
            return Reply::text("Session expired. Please use /post to start again.");
        }

        match selection {
            Selection::Cancel => {
                self.sessions.remove(user);
                Reply::text("Post creation cancelled.")
            }
            Selection::EditMenu => edit_menu(),
            Selection::EditField(field) => {
                let Some(session) = self.sessions.get_mut(user) else {
                    return Reply::text("Session expired. Please use /post to start again.");
                };
                let current = session
                    .fields()
                    .get(field)
                    .unwrap_or("Not set")
                    .to_string();
                session.begin_edit(field);
                Reply::text(format!("Current value: {current}\n\n{}", field.prompt()))
            }
            Selection::Confirm => self.publish_post(user).await,
        }
    }

    /// Convenience router for transports that deliver raw lines: choice
    /// tokens first, then commands, then free text.
    pub async fn handle_input(&mut self, user: UserId, line: &str) -> Reply {
        let line = line.trim();
        if let Some(selection) = crate::chat::commands::parse_selection(line) {
            return self.handle_selection(user, selection).await;
        }
        if let Some(command) = crate::chat::commands::parse_command(line) {
            return self.handle_command(user, command).await;
        }
        self.handle_text(user, line).await
    }

    /// Publishes the session's post. The session terminates on success and
    /// failure alike.
    async fn publish_post(&mut self, user: UserId) -> Reply {
        let Some(session) = self.sessions.remove(user) else {
            return Reply::text("Session expired. Please use /post to start again.");
        };

        let fields = session.fields();
        let html = self.template.render(fields);
        let title = fields.get(Field::Title).unwrap_or("Untitled");
        let labels = fields.get(Field::Labels);

        match self.client.publish(title, &html, labels).await {
            Ok(url) => Reply::text(format!("Post published successfully!\n\nURL: {url}")),
            Err(Error::AuthRequired { url }) => Reply::text(auth_instructions(&url)),
            Err(err) => Reply::text(format!("Failed to publish post:\n{err}")),
        }
    }

    fn status_reply(&mut self, user: UserId) -> Reply {
        let Some(session) = self.sessions.get_mut(user) else {
            return Reply::text(
                "No active post creation in progress.\nUse /post to start creating a new movie post.",
            );
        };

        let current = session.current_field();
        let (completed, total) = session.progress();
        let mut status = String::from("Current post status:\n\n");
        for field in Field::ALL {
            let line = match (session.fields().get(field), current == Some(field)) {
                (_, true) => format!("> {}: currently asking\n", field.display_name()),
                (Some(value), false) => {
                    format!("+ {}: {}\n", field.display_name(), truncate(value, 50))
                }
                (None, false) => format!("- {}: pending\n", field.display_name()),
            };
            status.push_str(&line);
        }
        status.push_str(&format!("\nProgress: {completed}/{total} steps completed"));
        Reply::text(status)
    }

    fn template_info(&self) -> String {
        let mut info = String::from(
            "HTML template structure:\n\n\
             The post template uses the following placeholders:\n",
        );
        for token in required_placeholders() {
            info.push_str(&format!("  {token}\n"));
        }
        let validation = self.template.validate();
        if validation.is_valid() {
            info.push_str("\nTemplate file is valid; all placeholders are present.");
        } else {
            info.push_str("\nWarning: the template file is missing placeholders:\n");
            for token in &validation.missing {
                info.push_str(&format!("  {token}\n"));
            }
        }
        info
    }

    async fn auth_reply(&mut self) -> Reply {
        match self.client.ensure_authenticated().await {
            Ok(AuthState::Ready) => Reply::text(
                "Authentication status: ACTIVE\n\n\
                 The bot is connected to the Blogger API and can publish posts.",
            ),
            Ok(AuthState::AuthorizationRequired(url)) => Reply::text(auth_instructions(&url)),
            Err(err) => Reply::text(format!("Error checking authentication: {err}")),
        }
    }

    async fn complete_auth_reply(&mut self) -> Reply {
        match self.client.complete_authorization().await {
            Ok(AuthCompletion::Success) => Reply::text(
                "Authentication successful!\n\n\
                 The bot is now connected to the Blogger API.\n\
                 You can create and publish posts using the /post command.",
            ),
            Ok(AuthCompletion::NoCodeReceived) => Reply::text(
                "No authorization received. Please complete the authorization in \
                 your browser first, then try /complete_auth again.",
            ),
            Err(err) => Reply::text(format!(
                "Authorization failed: {err}\nUse /auth to start over."
            )),
        }
    }
}

fn welcome_text() -> &'static str {
    "Welcome to the Blogger movie post bot!\n\n\
     I can help you create and publish movie review posts to your blog.\n\n\
     Available commands:\n\
     /post - Start creating a new movie post\n\
     /cancel - Cancel the current operation\n\
     /edit - Edit current post data\n\
     /status - Check your current post status\n\
     /help - Show the full help message\n\n\
     Use /post to get started!"
}

fn step_prompt(index: usize) -> String {
    let field = Field::ALL[index.min(Field::COUNT - 1)];
    format!("Step {}/{}: {}", index + 1, Field::COUNT, field.prompt())
}

fn summary_reply(session: &PostSession) -> Reply {
    let fields = session.fields();
    let value = |field: Field| fields.get(field).unwrap_or("N/A");

    let mut summary = String::from("Post summary:\n\n");
    summary.push_str(&format!("Title: {}\n", value(Field::Title)));
    summary.push_str(&format!("Labels: {}\n", value(Field::Labels)));
    summary.push_str(&format!("Poster: {}\n", value(Field::Poster)));
    summary.push_str(&format!("Rating: {}\n", value(Field::Rating)));
    summary.push_str(&format!(
        "Review: {}\n",
        truncate(value(Field::Review), 100)
    ));
    summary.push_str(&format!("Scenes: {}\n", value(Field::Scenes)));
    summary.push_str(&format!("YouTube: {}\n", value(Field::Youtube)));
    summary.push_str(&format!("Source: {}\n", value(Field::SourceData)));
    summary.push_str("\nWhat would you like to do?");

    Reply::with_choices(
        summary,
        vec![
            Choice::new("Edit", Selection::EditMenu),
            Choice::new("Cancel", Selection::Cancel),
            Choice::new("POST", Selection::Confirm),
        ],
    )
}

fn edit_menu() -> Reply {
    let choices = Field::ALL
        .iter()
        .map(|field| Choice::new(field.display_name(), Selection::EditField(*field)))
        .collect();
    Reply::with_choices("Which field would you like to edit?", choices)
}

fn auth_instructions(url: &str) -> String {
    format!(
        "Authorization required\n\n\
         To publish posts to Blogger, you need to authorize this application.\n\n\
         Steps to complete setup:\n\
         1. Open this URL: {url}\n\
         2. Sign in with your Google account\n\
         3. Grant permission to access Blogger\n\
         4. You'll be redirected to a success page\n\
         5. Return here and use /complete_auth to finish setup\n\n\
         This is a one-time setup process."
    )
}

/// Truncates to at most `max` characters, appending an ellipsis marker.
fn truncate(value: &str, max: usize) -> String {
    if value.chars().count() <= max {
        value.to_string()
    } else {
        let mut out: String = value.chars().take(max).collect();
        out.push_str("...");
        out
    }
}
