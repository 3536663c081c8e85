//! `key: value` directives embedded in event descriptions.
//!
//! Editors attach teaser images, copyright notes and external links to an
//! event by writing lines such as `teaserimage: AbC123` into its description.
//! The extractor pulls those values out and returns the remaining text
//! rendered for HTML.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

/// Preview URL used for teaser images when none is configured.
pub const DEFAULT_PREVIEW_URL: &str =
    "https://cloud.jonasebert.de/index.php/apps/files_sharing/publicpreview/{id}?x=3440&y=1440&a=true";

/// Line break marker substituted for newlines in the cleaned description.
const LINE_BREAK: &str = "<br>";

/// A recognized directive key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Directive {
    TeaserImage,
    TeaserCopyright,
    TeaserUrl,
    EventUrl,
}

impl Directive {
    /// Every recognized directive. New keys only need an entry here and in
    /// [`Directive::key`].
    pub const ALL: [Directive; 4] = [
        Directive::TeaserImage,
        Directive::TeaserCopyright,
        Directive::TeaserUrl,
        Directive::EventUrl,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Directive::TeaserImage => "teaserimage",
            Directive::TeaserCopyright => "teasercopyright",
            Directive::TeaserUrl => "teaserurl",
            Directive::EventUrl => "eventurl",
        }
    }

    fn from_key(key: &str) -> Option<Directive> {
        Directive::ALL.into_iter().find(|d| d.key() == key)
    }
}

/// Matches `<key>:<spaces><value>` up to and including the line terminator.
static DIRECTIVE_LINE: LazyLock<Regex> = LazyLock::new(|| {
    let keys = Directive::ALL
        .iter()
        .map(|d| regex::escape(d.key()))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!(r"({keys}):[^\S\r\n]*([^\r\n]*)(?:\r?\n)?"))
        .expect("directive pattern is valid")
});

/// Values found in a description.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedFields {
    pub teaser_image_id: Option<String>,
    pub teaser_image_url: Option<String>,
    pub teaser_copyright_text: Option<String>,
    pub teaser_copyright_url: Option<String>,
    pub external_event_url: Option<String>,
    pub cleaned_description: Option<String>,
}

/// Pulls directives out of descriptions.
#[derive(Debug, Clone)]
pub struct FieldExtractor {
    preview_url_template: String,
}

impl Default for FieldExtractor {
    fn default() -> Self {
        FieldExtractor::new(DEFAULT_PREVIEW_URL)
    }
}

impl FieldExtractor {
    /// `preview_url_template` must contain `{id}`, replaced with the teaser
    /// image id.
    pub fn new(preview_url_template: impl Into<String>) -> Self {
        FieldExtractor {
            preview_url_template: preview_url_template.into(),
        }
    }

    /// Extract all directives from `description`.
    ///
    /// The first occurrence of each key wins and only that line is removed.
    /// Keys are case-sensitive. A directive with an empty value is removed
    /// but yields no field.
    pub fn extract(&self, description: Option<&str>) -> ExtractedFields {
        let Some(description) = description else {
            return ExtractedFields::default();
        };

        let (values, remaining) = scan(description);
        let get = |d: Directive| values.get(&d).cloned().flatten();

        let teaser_image_id = get(Directive::TeaserImage);
        let teaser_image_url = teaser_image_id
            .as_deref()
            .map(|id| self.preview_url_template.replace("{id}", id));

        ExtractedFields {
            teaser_image_url,
            teaser_image_id,
            teaser_copyright_text: get(Directive::TeaserCopyright),
            teaser_copyright_url: get(Directive::TeaserUrl),
            external_event_url: get(Directive::EventUrl),
            cleaned_description: Some(render_line_breaks(&remaining)),
        }
    }
}

/// Collect first-occurrence values and the text with those lines removed.
fn scan(description: &str) -> (HashMap<Directive, Option<String>>, String) {
    let mut values = HashMap::new();
    let mut remaining = String::with_capacity(description.len());
    let mut last = 0;

    for caps in DIRECTIVE_LINE.captures_iter(description) {
        let (Some(whole), Some(directive)) = (caps.get(0), Directive::from_key(&caps[1])) else {
            continue;
        };
        if values.contains_key(&directive) {
            continue;
        }

        let value = caps[2].trim();
        values.insert(directive, (!value.is_empty()).then(|| value.to_string()));

        remaining.push_str(&description[last..whole.start()]);
        last = whole.end();
    }
    remaining.push_str(&description[last..]);

    (values, remaining)
}

fn render_line_breaks(text: &str) -> String {
    text.replace("\r\n", LINE_BREAK).replace('\n', LINE_BREAK)
}
