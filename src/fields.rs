//! Field definitions for a movie-review post.
//!
//! A post is assembled from eight fields collected in a fixed order. Each
//! field has a stable string key (used in edit-selection tokens and status
//! output), a prompt shown while collecting, and a validation rule.

use crate::error::{Error, Result};

/// One field of a movie-review post, in collection order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    /// Movie title; becomes the post title.
    Title,
    /// Comma-separated labels for the post.
    Labels,
    /// Poster image name.
    Poster,
    /// Rating between 0 and 10.
    Rating,
    /// Free-form review text.
    Review,
    /// Exactly four comma-separated scene numbers.
    Scenes,
    /// YouTube link for the embedded trailer.
    Youtube,
    /// Year/Month/MovieCode source path.
    SourceData,
}

impl Field {
    /// All fields in collection order.
    pub const ALL: [Field; 8] = [
        Field::Title,
        Field::Labels,
        Field::Poster,
        Field::Rating,
        Field::Review,
        Field::Scenes,
        Field::Youtube,
        Field::SourceData,
    ];

    /// Number of fields collected per post.
    pub const COUNT: usize = Self::ALL.len();

    /// Stable string key for this field.
    pub fn key(self) -> &'static str {
        match self {
            Field::Title => "title",
            Field::Labels => "labels",
            Field::Poster => "poster",
            Field::Rating => "rating",
            Field::Review => "review",
            Field::Scenes => "scenes",
            Field::Youtube => "youtube",
            Field::SourceData => "source_data",
        }
    }

    /// Looks a field up by its stable key.
    pub fn from_key(key: &str) -> Option<Field> {
        Field::ALL.iter().copied().find(|f| f.key() == key)
    }

    /// Human-readable name for status and edit menus.
    pub fn display_name(self) -> &'static str {
        match self {
            Field::Title => "Title",
            Field::Labels => "Labels",
            Field::Poster => "Poster",
            Field::Rating => "Rating",
            Field::Review => "Review",
            Field::Scenes => "Scenes",
            Field::Youtube => "YouTube",
            Field::SourceData => "Source Data",
        }
    }

    /// Prompt shown when asking the user for this field.
    pub fn prompt(self) -> &'static str {
        match self {
            Field::Title => "Please enter the movie title:",
            Field::Labels => "Please enter labels (comma-separated):",
            Field::Poster => "Please enter the poster image name (e.g. MovieName):",
            Field::Rating => "Please enter the movie rating (e.g. 8.5):",
            Field::Review => "Please enter your movie review:",
            Field::Scenes => "Please enter scene numbers (comma-separated, e.g. 1,2,3,4):",
            Field::Youtube => "Please enter the YouTube link:",
            Field::SourceData => {
                "Please enter source data (Year/Month/MovieCode, e.g. 2025/08/asd5tg):"
            }
        }
    }

    /// Position of this field in the collection order.
    pub fn index(self) -> usize {
        Field::ALL
            .iter()
            .position(|f| *f == self)
            .expect("field is in ALL")
    }

    /// Validates user input for this field.
    ///
    /// Returns `Ok(())` when the input is acceptable, or a
    /// [`Error::Validation`] whose message is suitable for re-prompting the
    /// user. Fields without a specific rule accept any non-empty text.
    pub fn validate(self, input: &str) -> Result<()> {
        let input = input.trim();
        if input.is_empty() {
            return Err(self.reject("Input cannot be empty. Please try again."));
        }

        match self {
            Field::Rating => {
                let rating: f64 = input.parse().map_err(|_| {
                    self.reject("Please enter a valid number for the rating.")
                })?;
                if !(0.0..=10.0).contains(&rating) {
                    return Err(
                        self.reject("Rating should be between 0 and 10. Please try again.")
                    );
                }
            }
            Field::Scenes => {
                let scenes: Vec<&str> = input.split(',').map(str::trim).collect();
                if scenes.len() != 4 {
                    return Err(self.reject(
                        "Please provide exactly 4 scene numbers separated by commas (e.g. 1,2,3,4).",
                    ));
                }
            }
            Field::Youtube => {
                if !input.contains("youtube.com") && !input.contains("youtu.be") {
                    return Err(self.reject("Please provide a valid YouTube link."));
                }
            }
            Field::SourceData => {
                if input.split('/').count() != 3 {
                    return Err(self.reject(
                        "Please use the format Year/Month/MovieCode (e.g. 2025/08/asd5tg).",
                    ));
                }
            }
            _ => {}
        }

        Ok(())
    }

    fn reject(self, message: &str) -> Error {
        Error::validation(message, Some(self.key().to_string()))
    }
}

/// Ordered collection of field values for one post session.
///
/// Values are stored per field slot; unset fields read as `None`. The map
/// is owned by a single session and dropped with it.
#[derive(Debug, Clone, Default)]
pub struct FieldMap {
    values: [Option<String>; Field::COUNT],
}

impl FieldMap {
    /// Creates an empty field map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the value for a field, if set.
    pub fn get(&self, field: Field) -> Option<&str> {
        self.values[field.index()].as_deref()
    }

    /// Sets the value for a field, replacing any previous value.
    pub fn set(&mut self, field: Field, value: impl Into<String>) {
        self.values[field.index()] = Some(value.into());
    }

    /// Returns the number of fields that have values.
    pub fn len(&self) -> usize {
        self.values.iter().filter(|v| v.is_some()).count()
    }

    /// Returns true when no field has a value.
    pub fn is_empty(&self) -> bool {
        self.values.iter().all(|v| v.is_none())
    }

    /// Returns true when every field has a value.
    pub fn is_complete(&self) -> bool {
        self.values.iter().all(|v| v.is_some())
    }

    /// Iterates over `(field, value)` pairs in collection order for fields
    /// that have values.
    pub fn iter(&self) -> impl Iterator<Item = (Field, &str)> {
        Field::ALL
            .iter()
            .filter_map(|f| self.get(*f).map(|v| (*f, v)))
    }
}
