//! Integration tests for the reelpost library.
//! Remote endpoints are played by local stub servers; nothing leaves the
//! loopback interface.

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;
    use std::path::Path;
    use std::time::Duration;

    use time::OffsetDateTime;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    use reelpost::chat::BotController;
    use reelpost::template::required_placeholders;
    use reelpost::{
        BloggerClient, CredentialRecord, CredentialStore, FileCredentialStore, OAuthConfig,
        TemplateEngine,
    };

    const INPUTS: [&str; 8] = [
        "Alien",
        "horror, sci-fi",
        "AlienPoster",
        "9.1",
        "In space no one can hear you scream.",
        "3,7,12,19",
        "https://youtu.be/abc123",
        "1979/05/alien79",
    ];

    fn write_template(dir: &Path) -> std::path::PathBuf {
        let mut doc = String::from("<html><body>\n");
        for token in required_placeholders() {
            doc.push_str(&format!("<div>{token}</div>\n"));
        }
        doc.push_str("</body></html>\n");
        let path = dir.join("post_template.html");
        std::fs::write(&path, doc).unwrap();
        path
    }

    fn oauth(port: u16) -> OAuthConfig {
        OAuthConfig::new("id-int", "sec-int").with_callback_port(port)
    }

    fn controller(dir: &Path, port: u16) -> BotController<FileCredentialStore> {
        let store = FileCredentialStore::new(dir.join("token.json"));
        let client = BloggerClient::new(oauth(port), store, "b-int").unwrap();
        let template = TemplateEngine::new(write_template(dir));
        BotController::new(client, template)
    }

    async fn store_valid_record(dir: &Path) {
        let store = FileCredentialStore::new(dir.join("token.json"));
        let record = CredentialRecord {
            access_token: "tok-valid".to_string(),
            refresh_token: Some("r-valid".to_string()),
            expiry: OffsetDateTime::now_utc() + time::Duration::hours(1),
            scope: "https://www.googleapis.com/auth/blogger".to_string(),
        };
        store.store(&record).await.unwrap();
    }

    /// Serves one connection with a canned HTTP response, then exits.
    async fn spawn_stub(
        status_line: &'static str,
        body: String,
    ) -> (SocketAddr, tokio::task::JoinHandle<()>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            if let Ok((mut stream, _)) = listener.accept().await {
                let mut buf = vec![0u8; 8192];
                let _ = stream.read(&mut buf).await;
                let response = format!(
                    "HTTP/1.1 {status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = stream.write_all(response.as_bytes()).await;
            }
        });
        (addr, handle)
    }

    /// Delivers one browser-style GET to the callback listener.
    async fn deliver_callback(port: u16, target: &str) {
        let mut stream = TcpStream::connect(("127.0.0.1", port)).await.unwrap();
        let request = format!("GET {target} HTTP/1.1\r\nHost: localhost\r\n\r\n");
        stream.write_all(request.as_bytes()).await.unwrap();
        let mut reply = Vec::new();
        let _ = stream.read_to_end(&mut reply).await;
    }

    #[tokio::test]
    async fn full_conversation_reaches_confirm_summary() {
        let dir = tempfile::tempdir().unwrap();
        let mut bot = controller(dir.path(), 18290);

        let reply = bot.handle_input(1, "/post").await;
        assert!(reply.text.starts_with("Step 1/8"), "{}", reply.text);

        for (i, input) in INPUTS.iter().enumerate().take(7) {
            let reply = bot.handle_input(1, input).await;
            let expected = format!("Step {}/8", i + 2);
            assert!(reply.text.starts_with(&expected), "{}", reply.text);
            assert!(reply.choices.is_empty());
        }

        let reply = bot.handle_input(1, INPUTS[7]).await;
        assert!(reply.text.contains("Post summary:"));
        for value in INPUTS {
            assert!(reply.text.contains(value), "summary missing {value}");
        }
        let tokens: Vec<&str> = reply.choices.iter().map(|c| c.data.as_str()).collect();
        assert_eq!(tokens, vec!["post_edit", "post_cancel", "post_confirm"]);
    }

    #[tokio::test]
    async fn invalid_input_does_not_advance_the_step() {
        let dir = tempfile::tempdir().unwrap();
        let mut bot = controller(dir.path(), 18291);

        bot.handle_input(1, "/post").await;
        for input in &INPUTS[..3] {
            bot.handle_input(1, input).await;
        }

        // Rating step rejects a non-number and an out-of-range number.
        let reply = bot.handle_input(1, "eleven out of ten").await;
        assert!(reply.text.contains("valid number"));
        let reply = bot.handle_input(1, "11").await;
        assert!(reply.text.contains("between 0 and 10"));

        let reply = bot.handle_input(1, "9.1").await;
        assert!(reply.text.starts_with("Step 5/8"), "{}", reply.text);
    }

    #[tokio::test]
    async fn cancel_and_status_reporting() {
        let dir = tempfile::tempdir().unwrap();
        let mut bot = controller(dir.path(), 18292);

        let reply = bot.handle_input(1, "/status").await;
        assert!(reply.text.contains("No active post creation"));

        bot.handle_input(1, "/post").await;
        bot.handle_input(1, INPUTS[0]).await;
        bot.handle_input(1, INPUTS[1]).await;

        let reply = bot.handle_input(1, "/status").await;
        assert!(reply.text.contains("currently asking"));
        assert!(reply.text.contains("Progress: 2/8"));
        assert!(reply.text.contains("Alien"));

        let reply = bot.handle_input(1, "/cancel").await;
        assert_eq!(reply.text, "Post creation cancelled.");

        let reply = bot.handle_input(1, "/status").await;
        assert!(reply.text.contains("No active post creation"));

        let reply = bot.handle_input(1, "/cancel").await;
        assert_eq!(reply.text, "No active post creation to cancel.");
    }

    #[tokio::test]
    async fn edit_round_trip_updates_the_summary() {
        let dir = tempfile::tempdir().unwrap();
        let mut bot = controller(dir.path(), 18293);

        bot.handle_input(1, "/post").await;
        for input in INPUTS {
            bot.handle_input(1, input).await;
        }

        let reply = bot.handle_input(1, "post_edit").await;
        assert_eq!(reply.choices.len(), 8);

        let reply = bot.handle_input(1, "edit_rating").await;
        assert!(reply.text.contains("Current value: 9.1"));

        let reply = bot.handle_input(1, "7.5").await;
        assert!(reply.text.starts_with("Rating updated successfully."));
        assert!(reply.text.contains("Rating: 7.5"));
        assert_eq!(reply.choices.len(), 3);
    }

    #[tokio::test]
    async fn sessions_are_isolated_per_user() {
        let dir = tempfile::tempdir().unwrap();
        let mut bot = controller(dir.path(), 18294);

        bot.handle_input(1, "/post").await;
        bot.handle_input(1, "Alien").await;

        let reply = bot.handle_input(2, "/status").await;
        assert!(reply.text.contains("No active post creation"));

        let reply = bot.handle_input(2, "Aliens").await;
        assert!(reply.text.contains("/post"));

        // User 1's session is untouched.
        let reply = bot.handle_input(1, "/status").await;
        assert!(reply.text.contains("Progress: 1/8"));
    }

    #[tokio::test]
    async fn publish_without_credentials_asks_for_authorization() {
        let dir = tempfile::tempdir().unwrap();
        let mut bot = controller(dir.path(), 18295);

        bot.handle_input(1, "/post").await;
        for input in INPUTS {
            bot.handle_input(1, input).await;
        }

        let reply = bot.handle_input(1, "post_confirm").await;
        assert!(reply.text.contains("Authorization required"));
        assert!(reply.text.contains("https://accounts.google.com/o/oauth2/auth?"));
        assert!(reply.text.contains("/complete_auth"));

        // Publishing terminated the session either way.
        let reply = bot.handle_input(1, "/status").await;
        assert!(reply.text.contains("No active post creation"));
    }

    #[tokio::test]
    async fn publish_success_reports_the_post_url() {
        let dir = tempfile::tempdir().unwrap();
        store_valid_record(dir.path()).await;

        let (addr, stub) = spawn_stub(
            "200 OK",
            r#"{"id": "99", "url": "https://blog.example.com/1979/05/alien.html"}"#.to_string(),
        )
        .await;

        let store = FileCredentialStore::new(dir.path().join("token.json"));
        let client = BloggerClient::with_options(
            oauth(18296),
            store,
            "b-int",
            Some(format!("http://{addr}/")),
            Some(Duration::from_secs(5)),
        )
        .unwrap();
        let template = TemplateEngine::new(write_template(dir.path()));
        let mut bot = BotController::new(client, template);

        bot.handle_input(1, "/post").await;
        for input in INPUTS {
            bot.handle_input(1, input).await;
        }

        let reply = bot.handle_input(1, "post_confirm").await;
        assert!(reply.text.contains("Post published successfully!"));
        assert!(reply.text.contains("https://blog.example.com/1979/05/alien.html"));

        let reply = bot.handle_input(1, "/status").await;
        assert!(reply.text.contains("No active post creation"));
        stub.await.unwrap();
    }

    #[tokio::test]
    async fn publish_failure_reports_status_and_body_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        store_valid_record(dir.path()).await;

        let (addr, stub) = spawn_stub(
            "403 Forbidden",
            r#"{"error": {"message": "The caller does not have permission"}}"#.to_string(),
        )
        .await;

        let store = FileCredentialStore::new(dir.path().join("token.json"));
        let client = BloggerClient::with_options(
            oauth(18297),
            store,
            "b-int",
            Some(format!("http://{addr}/")),
            Some(Duration::from_secs(5)),
        )
        .unwrap();
        let template = TemplateEngine::new(write_template(dir.path()));
        let mut bot = BotController::new(client, template);

        bot.handle_input(1, "/post").await;
        for input in INPUTS {
            bot.handle_input(1, input).await;
        }

        let reply = bot.handle_input(1, "post_confirm").await;
        assert!(reply.text.starts_with("Failed to publish post:"));
        assert!(reply.text.contains("403"));
        assert!(reply.text.contains("The caller does not have permission"));
        stub.await.unwrap();
    }

    #[tokio::test]
    async fn authorization_code_flow_persists_exchanged_credentials() {
        let dir = tempfile::tempdir().unwrap();

        let (addr, stub) = spawn_stub(
            "200 OK",
            r#"{"access_token": "tok-ABC", "refresh_token": "r-1", "expires_in": 3600,
               "scope": "https://www.googleapis.com/auth/blogger"}"#
                .to_string(),
        )
        .await;

        let mut config = oauth(18298);
        config.token_uri = format!("http://{addr}/token");
        let store = FileCredentialStore::new(dir.path().join("token.json"));
        let mut client = BloggerClient::new(config, store, "b-int").unwrap();
        client.set_callback_wait(Duration::from_secs(5));

        let state = client.ensure_authenticated().await.unwrap();
        let reelpost::AuthState::AuthorizationRequired(url) = state else {
            panic!("expected authorization to be required");
        };
        assert!(url.contains("redirect_uri=http%3A%2F%2Flocalhost%3A18298"));

        deliver_callback(18298, "/?code=ABC&scope=blogger").await;

        let completion = client.complete_authorization().await.unwrap();
        assert_eq!(completion, reelpost::AuthCompletion::Success);

        // The record was persisted and is now valid.
        let store = FileCredentialStore::new(dir.path().join("token.json"));
        let record = store.load().await.unwrap().unwrap();
        assert_eq!(record.access_token, "tok-ABC");
        assert_eq!(record.refresh_token.as_deref(), Some("r-1"));
        assert!(record.is_valid());

        assert_eq!(
            client.ensure_authenticated().await.unwrap(),
            reelpost::AuthState::Ready
        );
        stub.await.unwrap();
    }

    async fn store_expired_record(dir: &Path) {
        let store = FileCredentialStore::new(dir.join("token.json"));
        let record = CredentialRecord {
            access_token: "tok-old".to_string(),
            refresh_token: Some("r-old".to_string()),
            expiry: OffsetDateTime::now_utc() - time::Duration::hours(1),
            scope: "https://www.googleapis.com/auth/blogger".to_string(),
        };
        store.store(&record).await.unwrap();
    }

    #[tokio::test]
    async fn expired_record_is_refreshed_and_persisted() {
        let dir = tempfile::tempdir().unwrap();
        store_expired_record(dir.path()).await;

        // Refresh responses usually omit the refresh token; the old one
        // must be carried over into the persisted record.
        let (addr, stub) = spawn_stub(
            "200 OK",
            r#"{"access_token": "tok-refreshed", "expires_in": 3600}"#.to_string(),
        )
        .await;

        let mut config = oauth(18300);
        config.token_uri = format!("http://{addr}/token");
        let store = FileCredentialStore::new(dir.path().join("token.json"));
        let mut client = BloggerClient::new(config, store, "b-int").unwrap();

        assert_eq!(
            client.ensure_authenticated().await.unwrap(),
            reelpost::AuthState::Ready
        );

        let store = FileCredentialStore::new(dir.path().join("token.json"));
        let record = store.load().await.unwrap().unwrap();
        assert_eq!(record.access_token, "tok-refreshed");
        assert_eq!(record.refresh_token.as_deref(), Some("r-old"));
        assert!(record.is_valid());
        stub.await.unwrap();
    }

    #[tokio::test]
    async fn failed_refresh_falls_back_to_a_fresh_authorization_flow() {
        let dir = tempfile::tempdir().unwrap();
        store_expired_record(dir.path()).await;

        let (addr, stub) = spawn_stub(
            "400 Bad Request",
            r#"{"error": "invalid_grant"}"#.to_string(),
        )
        .await;

        let mut config = oauth(18301);
        config.token_uri = format!("http://{addr}/token");
        let store = FileCredentialStore::new(dir.path().join("token.json"));
        let mut client = BloggerClient::new(config, store, "b-int").unwrap();

        let state = client.ensure_authenticated().await.unwrap();
        let reelpost::AuthState::AuthorizationRequired(url) = state else {
            panic!("expected a fresh flow after the failed refresh");
        };
        assert!(url.contains("redirect_uri=http%3A%2F%2Flocalhost%3A18301"));

        // The stale record was left in place; nothing new was persisted.
        let store = FileCredentialStore::new(dir.path().join("token.json"));
        let record = store.load().await.unwrap().unwrap();
        assert_eq!(record.access_token, "tok-old");
        assert!(!record.is_valid());
        stub.await.unwrap();
    }

    #[tokio::test]
    async fn denied_authorization_surfaces_the_provider_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCredentialStore::new(dir.path().join("token.json"));
        let mut client = BloggerClient::new(oauth(18299), store, "b-int").unwrap();
        client.set_callback_wait(Duration::from_secs(5));

        let state = client.ensure_authenticated().await.unwrap();
        assert!(matches!(
            state,
            reelpost::AuthState::AuthorizationRequired(_)
        ));

        deliver_callback(18299, "/?error=access_denied").await;

        let err = client.complete_authorization().await.unwrap_err();
        assert!(err.is_auth_exchange());
        assert!(err.to_string().contains("access_denied"));

        // Nothing was persisted.
        let store = FileCredentialStore::new(dir.path().join("token.json"));
        assert!(store.load().await.unwrap().is_none());
    }
}
