//! Interactive chat front-end for creating and publishing movie posts.
//!
//! This binary provides a REPL interface for the posting flow: collect the
//! review fields step by step, confirm or edit, and publish to Blogger.
//!
//! # Usage
//!
//! ```bash
//! # Publish to one blog, with the defaults for every path
//! reelpost-chat --blog-id 1234567890
//!
//! # Point at explicit credential and template files
//! reelpost-chat --blog-id 1234567890 \
//!     --client-secret /etc/reelpost/client_secret.json \
//!     --token /var/lib/reelpost/token.json \
//!     --template review_template.html
//! ```
//!
//! # Commands
//!
//! While chatting, you can use slash commands:
//! - `/post` - Start creating a new movie post
//! - `/status` - Check the current post status
//! - `/edit` - Edit a collected field
//! - `/auth` - Check Blogger authentication status
//! - `/complete_auth` - Finish a pending authorization
//! - `/help` - Show all commands
//!
//! Reply choices are printed as `[token] label`; type the token to select.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use arrrg::CommandLine;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

use reelpost::chat::{BotController, ChatArgs, ChatConfig, Reply, UserId};
use reelpost::{BloggerClient, FileCredentialStore, OAuthConfig, TemplateEngine};

/// The REPL serves a single operator.
const REPL_USER: UserId = 0;

fn print_reply(reply: &Reply) {
    println!("{}", reply.text);
    if !reply.choices.is_empty() {
        println!();
        for choice in &reply.choices {
            println!("  [{}] {}", choice.data, choice.label);
        }
    }
    println!();
}

/// Main entry point for the reelpost-chat application.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (args, _) = ChatArgs::from_command_line_relaxed("reelpost-chat [OPTIONS]");
    let config = ChatConfig::from(args);

    let Some(blog_id) = config.blog_id.clone() else {
        eprintln!("reelpost-chat: --blog-id is required");
        std::process::exit(1);
    };

    let oauth = OAuthConfig::from_file(&config.client_secret)?
        .with_callback_port(config.callback_port);
    let store = FileCredentialStore::new(config.token.clone());
    let client = BloggerClient::new(oauth, store, blog_id)?;
    let template = TemplateEngine::new(config.template.clone());
    let mut controller = BotController::new(client, template);

    let mut rl = DefaultEditor::new()?;

    // Flag for interrupt handling while a publish is in flight.
    let interrupted = Arc::new(AtomicBool::new(false));
    let interrupted_clone = interrupted.clone();
    ctrlc::set_handler(move || {
        interrupted_clone.store(true, Ordering::Relaxed);
    })?;

    println!("Reelpost Chat (template: {})", config.template.display());
    println!("Type /post to start a post, /help for commands, /quit to exit\n");

    loop {
        interrupted.store(false, Ordering::Relaxed);

        let readline = rl.readline("You: ");

        match readline {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                let _ = rl.add_history_entry(line);

                if matches!(line.to_lowercase().as_str(), "/quit" | "/exit" | "/q") {
                    println!("Goodbye!");
                    break;
                }

                let reply = controller.handle_input(REPL_USER, line).await;
                print_reply(&reply);
            }
            Err(ReadlineError::Interrupted) => {
                println!("^C (use /quit to exit)");
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!("Goodbye!");
                break;
            }
            Err(err) => {
                eprintln!("Error reading input: {err}");
                break;
            }
        }
    }

    Ok(())
}
