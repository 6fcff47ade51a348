//! HTML template rendering for movie-review posts.
//!
//! The template document is arbitrary markup carrying nine required
//! placeholder tokens. Substitution is literal exact-token replacement,
//! first to last, of every occurrence; there is no template language.
//!
//! Rendering never fails: a missing or unreadable template document is
//! reported as rendered error markup so the caller always has a body to
//! show the user.

use std::fs;
use std::path::{Path, PathBuf};

use crate::fields::{Field, FieldMap};

/// Placeholder for the poster image name.
pub const PLACEHOLDER_POSTER: &str = "(1#Poster)";
/// Placeholder for the rating value.
pub const PLACEHOLDER_RATING: &str = "(2#Rating)";
/// Placeholder for the review body.
pub const PLACEHOLDER_REVIEW: &str = "(3#MovieReview)";
/// Placeholder for the YouTube embed URL.
pub const PLACEHOLDER_YOUTUBE: &str = "(5#YoutubeEmbedLink)";
/// Placeholder for the Year/Month/MovieCode source path.
pub const PLACEHOLDER_SOURCE: &str = "(6#Year/Month/MovieCode)";

/// The four numbered scene placeholders.
pub const PLACEHOLDER_SCENES: [&str; 4] = [
    "(4#Scene1)",
    "(4#Scene2)",
    "(4#Scene3)",
    "(4#Scene4)",
];

/// Embed URL substituted when no YouTube link was collected.
const DEFAULT_EMBED_URL: &str = "https://www.youtube.com/embed/dQw4w9WgXcQ";

/// All nine placeholders a valid template must contain.
pub fn required_placeholders() -> [&'static str; 9] {
    [
        PLACEHOLDER_POSTER,
        PLACEHOLDER_RATING,
        PLACEHOLDER_REVIEW,
        PLACEHOLDER_SCENES[0],
        PLACEHOLDER_SCENES[1],
        PLACEHOLDER_SCENES[2],
        PLACEHOLDER_SCENES[3],
        PLACEHOLDER_YOUTUBE,
        PLACEHOLDER_SOURCE,
    ]
}

/// Outcome of validating a template document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateValidation {
    /// Required placeholder tokens absent from the document, in order.
    pub missing: Vec<String>,
}

impl TemplateValidation {
    /// Returns true when every required placeholder was present.
    pub fn is_valid(&self) -> bool {
        self.missing.is_empty()
    }
}

/// Renders field maps into post markup using a fixed template document.
#[derive(Debug, Clone)]
pub struct TemplateEngine {
    template_path: PathBuf,
}

impl TemplateEngine {
    /// Creates an engine reading the template from the given path.
    ///
    /// The document is re-read on each render so edits are picked up
    /// without a restart and read failures stay local to one render.
    pub fn new(template_path: impl Into<PathBuf>) -> Self {
        Self {
            template_path: template_path.into(),
        }
    }

    /// Returns the path of the template document.
    pub fn template_path(&self) -> &Path {
        &self.template_path
    }

    /// Renders the collected fields into post markup.
    ///
    /// Missing fields fall back to fixed defaults. A template read failure
    /// is reported inline as error markup rather than returned as an error.
    pub fn render(&self, fields: &FieldMap) -> String {
        let template = match fs::read_to_string(&self.template_path) {
            Ok(template) => template,
            Err(err) => {
                return format!(
                    "<p>Error processing template {}: {}</p>",
                    self.template_path.display(),
                    err
                );
            }
        };
        substitute(&template, fields)
    }

    /// Checks that the template document contains all nine required
    /// placeholder tokens.
    ///
    /// An unreadable document reports a single pseudo-entry rather than
    /// erroring, so callers can always show the result.
    pub fn validate(&self) -> TemplateValidation {
        let content = match fs::read_to_string(&self.template_path) {
            Ok(content) => content,
            Err(err) => {
                return TemplateValidation {
                    missing: vec![format!(
                        "template file unreadable ({}): {}",
                        self.template_path.display(),
                        err
                    )],
                };
            }
        };

        let missing = required_placeholders()
            .iter()
            .filter(|token| !content.contains(**token))
            .map(|token| token.to_string())
            .collect();
        TemplateValidation { missing }
    }
}

/// Substitutes every placeholder occurrence with its field value.
fn substitute(template: &str, fields: &FieldMap) -> String {
    let mut html = template.to_string();

    html = html.replace(
        PLACEHOLDER_POSTER,
        fields.get(Field::Poster).unwrap_or("DefaultPoster"),
    );
    html = html.replace(PLACEHOLDER_RATING, fields.get(Field::Rating).unwrap_or("0.0"));
    html = html.replace(
        PLACEHOLDER_REVIEW,
        fields.get(Field::Review).unwrap_or("No review available"),
    );
    html = html.replace(
        PLACEHOLDER_YOUTUBE,
        &embed_url(fields.get(Field::Youtube).unwrap_or("")),
    );
    html = html.replace(
        PLACEHOLDER_SOURCE,
        fields.get(Field::SourceData).unwrap_or("2025/01/default"),
    );

    let scenes = scene_list(fields.get(Field::Scenes).unwrap_or("1,2,3,4"));
    for (placeholder, scene) in PLACEHOLDER_SCENES.iter().zip(scenes.iter()) {
        html = html.replace(placeholder, scene);
    }

    html
}

/// Splits a comma-separated scene field into exactly four tokens.
///
/// Tokens are trimmed; short lists are padded with `"1"` and long lists
/// truncated.
pub fn scene_list(input: &str) -> [String; 4] {
    let mut scenes: Vec<String> = input.split(',').map(|s| s.trim().to_string()).collect();
    while scenes.len() < 4 {
        scenes.push("1".to_string());
    }
    scenes.truncate(4);
    scenes.try_into().expect("exactly four scenes")
}

/// Canonicalizes a YouTube link into an embed URL.
///
/// Recognizes the `watch?v=` query form and the `youtu.be/` shortened form
/// and rebuilds them as `https://www.youtube.com/embed/<id>`. A link that
/// is already an embed URL passes through, as does any unrecognized shape;
/// an empty input yields a fixed default embed.
pub fn embed_url(youtube_url: &str) -> String {
    if youtube_url.is_empty() {
        return DEFAULT_EMBED_URL.to_string();
    }

    let video_id = if let Some((_, tail)) = youtube_url.split_once("youtube.com/watch?v=") {
        Some(tail.split('&').next().unwrap_or(tail))
    } else if let Some((_, tail)) = youtube_url.split_once("youtu.be/") {
        Some(tail.split('?').next().unwrap_or(tail))
    } else if youtube_url.contains("youtube.com/embed/") {
        return youtube_url.to_string();
    } else {
        None
    };

    match video_id {
        Some(id) if !id.is_empty() => format!("https://www.youtube.com/embed/{id}"),
        _ => youtube_url.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn full_template() -> String {
        let mut doc = String::from("<html><body>\n");
        for token in required_placeholders() {
            doc.push_str(&format!("<div>{token}</div>\n"));
        }
        doc.push_str("</body></html>\n");
        doc
    }

    fn write_template(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    fn complete_fields() -> FieldMap {
        let mut fields = FieldMap::new();
        fields.set(Field::Title, "Alien");
        fields.set(Field::Labels, "horror, sci-fi");
        fields.set(Field::Poster, "AlienPoster");
        fields.set(Field::Rating, "9.1");
        fields.set(Field::Review, "In space no one can hear you scream.");
        fields.set(Field::Scenes, "3, 7, 12, 19");
        fields.set(Field::Youtube, "https://youtube.com/watch?v=xyz&list=z");
        fields.set(Field::SourceData, "1979/05/alien79");
        fields
    }

    #[test]
    fn scene_padding_and_truncation() {
        assert_eq!(scene_list("1,2"), ["1", "2", "1", "1"]);
        assert_eq!(scene_list("1,2,3,4,5"), ["1", "2", "3", "4"]);
        assert_eq!(scene_list(" 5 , 6 , 7 , 8 "), ["5", "6", "7", "8"]);
    }

    #[test]
    fn embed_url_shapes() {
        assert_eq!(
            embed_url("https://youtu.be/abc123?t=5"),
            "https://www.youtube.com/embed/abc123"
        );
        assert_eq!(
            embed_url("https://youtube.com/watch?v=xyz&list=z"),
            "https://www.youtube.com/embed/xyz"
        );
        assert_eq!(
            embed_url("https://www.youtube.com/embed/xyz"),
            "https://www.youtube.com/embed/xyz"
        );
    }

    #[test]
    fn embed_url_unrecognized_passes_through() {
        assert_eq!(embed_url("https://vimeo.com/12345"), "https://vimeo.com/12345");
        assert_eq!(embed_url("not a url"), "not a url");
    }

    #[test]
    fn embed_url_empty_uses_default() {
        assert_eq!(embed_url(""), DEFAULT_EMBED_URL);
    }

    #[test]
    fn render_substitutes_every_placeholder() {
        let file = write_template(&full_template());
        let engine = TemplateEngine::new(file.path());
        let html = engine.render(&complete_fields());

        for token in required_placeholders() {
            assert!(!html.contains(token), "unreplaced placeholder {token}");
        }
        assert!(html.contains("AlienPoster"));
        assert!(html.contains("9.1"));
        assert!(html.contains("In space no one can hear you scream."));
        assert!(html.contains("https://www.youtube.com/embed/xyz"));
        assert!(html.contains("1979/05/alien79"));
        for scene in ["3", "7", "12", "19"] {
            assert!(html.contains(&format!("<div>{scene}</div>")));
        }
    }

    #[test]
    fn render_replaces_every_occurrence() {
        let doc = format!("{p} and again {p}", p = PLACEHOLDER_POSTER);
        let file = write_template(&doc);
        let engine = TemplateEngine::new(file.path());
        let html = engine.render(&complete_fields());
        assert_eq!(html, "AlienPoster and again AlienPoster");
    }

    #[test]
    fn render_is_idempotent_for_a_field_map() {
        let file = write_template(&full_template());
        let engine = TemplateEngine::new(file.path());
        let fields = complete_fields();
        assert_eq!(engine.render(&fields), engine.render(&fields));
    }

    #[test]
    fn render_defaults_for_missing_fields() {
        let file = write_template(&full_template());
        let engine = TemplateEngine::new(file.path());
        let html = engine.render(&FieldMap::new());

        assert!(html.contains("DefaultPoster"));
        assert!(html.contains("0.0"));
        assert!(html.contains("No review available"));
        assert!(html.contains(DEFAULT_EMBED_URL));
        assert!(html.contains("2025/01/default"));
        // Default scenes are 1,2,3,4.
        for scene in ["1", "2", "3", "4"] {
            assert!(html.contains(&format!("<div>{scene}</div>")));
        }
    }

    #[test]
    fn render_missing_file_reports_inline() {
        let engine = TemplateEngine::new("/nonexistent/post_template.html");
        let html = engine.render(&FieldMap::new());
        assert!(html.starts_with("<p>Error processing template"));
    }

    #[test]
    fn validate_reports_missing_tokens() {
        let doc = full_template().replace(&format!("<div>{PLACEHOLDER_RATING}</div>\n"), "");
        let file = write_template(&doc);
        let engine = TemplateEngine::new(file.path());
        let report = engine.validate();
        assert!(!report.is_valid());
        assert_eq!(report.missing, vec![PLACEHOLDER_RATING.to_string()]);
    }

    #[test]
    fn validate_complete_template() {
        let file = write_template(&full_template());
        let engine = TemplateEngine::new(file.path());
        let report = engine.validate();
        assert!(report.is_valid());
        assert!(report.missing.is_empty());
    }

    #[test]
    fn validate_unreadable_file() {
        let engine = TemplateEngine::new("/nonexistent/post_template.html");
        let report = engine.validate();
        assert!(!report.is_valid());
        assert_eq!(report.missing.len(), 1);
        assert!(report.missing[0].contains("unreadable"));
    }
}
