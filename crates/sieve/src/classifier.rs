//! # Entry Classifier
//!
//! Decides whether a playlist entry is kept or skipped, from its metadata
//! line and (optionally) its resource line.
//!
//! The decision is an ordered disjunction of independent signals, evaluated
//! on the lowercased metadata line:
//!
//! 1. disqualifying tokens: any match forces [`Classification::Skipped`]
//! 2. attribute rules on `name="value"` pairs
//! 3. accepted tokens at a separator boundary (`IT|`, `|it|`)
//! 4. free-text keywords
//!
//! The first positive signal keeps the entry. Classification is pure and
//! total: text that cannot be parsed simply matches nothing.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

static ATTRIBUTE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"([a-z0-9_-]+)\s*=\s*"([^"]*)""#).unwrap());

/// Attribute holding the channel identifier in extended M3U
pub const ID_ATTRIBUTE: &str = "tvg-id";

const ITALIAN_KEYWORDS: &[&str] = &[
    "rai ",
    "rai|",
    "canale 5",
    "canale5",
    "italia ",
    "italia1",
    "rete 4",
    "rete4",
    "sky ",
    "helbiz",
    "boing",
    "gulp",
    "yoyo",
    "nickelodeon",
    "cartoonito",
    "discovery",
    "dmax",
    "focus",
    "laeffe",
];

/// Disposition of a playlist entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    Kept,
    Skipped,
}

impl Classification {
    pub fn is_kept(self) -> bool {
        matches!(self, Classification::Kept)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Classification::Kept => "kept",
            Classification::Skipped => "skipped",
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Accepted values for one named attribute of the metadata line.
///
/// The rule matches when the attribute value equals one of `equals`, ends
/// with one of `suffix` (and is longer than it), or contains one of
/// `contains`. All comparisons ignore case.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttributeRule {
    pub name: String,
    pub equals: Vec<String>,
    pub suffix: Vec<String>,
    pub contains: Vec<String>,
}

impl AttributeRule {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

/// Where a token may start
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenAnchor {
    /// At the start of the searched text
    Start,
    /// Right after a separator
    Separator,
    /// Either of the above
    #[default]
    Either,
}

/// Which text tokens are searched in
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenScope {
    /// The whole metadata line
    Line,
    /// The display text after the first unquoted comma
    Display,
    /// Both
    #[default]
    Both,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Attribute rules, see [`AttributeRule`]
    pub attributes: Vec<AttributeRule>,

    /// Tokens that keep an entry when found at a separator boundary
    pub accepted_tokens: Vec<String>,

    /// Tokens that force an entry to be skipped
    pub disqualifying_tokens: Vec<String>,

    /// Character terminating a token (`|` in `IT| Rai 1`)
    pub token_separator: char,

    pub token_anchor: TokenAnchor,

    pub token_scope: TokenScope,

    /// Free-text substrings, matched case-insensitively
    pub keywords: Vec<String>,

    /// Also match keywords against the resource line
    pub match_resource: bool,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            attributes: Vec::new(),
            accepted_tokens: Vec::new(),
            disqualifying_tokens: Vec::new(),
            token_separator: '|',
            token_anchor: TokenAnchor::default(),
            token_scope: TokenScope::default(),
            keywords: Vec::new(),
            match_resource: false,
        }
    }
}

fn to_strings<I, S>(values: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    values.into_iter().map(Into::into).collect()
}

impl ClassifierConfig {
    /// Rules keeping Italian channels, as used for the `MyList` deployment.
    pub fn italian() -> Self {
        Self::default()
            .accept_attribute_values("tvg-language", ["ita", "it"])
            .accept_id_suffixes([".it"])
            .accept_attribute_containing("group-title", ["it|", "italia", "italiano"])
            .accept_tokens(["it"])
            .keyword_whitelist(ITALIAN_KEYWORDS.iter().copied())
            .match_resource(true)
    }

    /// Keep entries whose attribute `name` equals one of `values`.
    pub fn accept_attribute_values<I, S>(mut self, name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut rule = AttributeRule::new(name);
        rule.equals = to_strings(values);
        self.attributes.push(rule);
        self
    }

    /// Keep entries whose `tvg-id` ends with one of `suffixes`.
    pub fn accept_id_suffixes<I, S>(mut self, suffixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut rule = AttributeRule::new(ID_ATTRIBUTE);
        rule.suffix = to_strings(suffixes);
        self.attributes.push(rule);
        self
    }

    /// Keep entries whose attribute `name` contains one of `values`.
    pub fn accept_attribute_containing<I, S>(mut self, name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut rule = AttributeRule::new(name);
        rule.contains = to_strings(values);
        self.attributes.push(rule);
        self
    }

    pub fn accept_tokens<I, S>(mut self, tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.accepted_tokens.extend(to_strings(tokens));
        self
    }

    pub fn disqualifying_tokens<I, S>(mut self, tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.disqualifying_tokens.extend(to_strings(tokens));
        self
    }

    pub fn keyword_whitelist<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords.extend(to_strings(keywords));
        self
    }

    pub fn token_separator(mut self, separator: char) -> Self {
        self.token_separator = separator;
        self
    }

    pub fn token_anchor(mut self, anchor: TokenAnchor) -> Self {
        self.token_anchor = anchor;
        self
    }

    pub fn token_scope(mut self, scope: TokenScope) -> Self {
        self.token_scope = scope;
        self
    }

    pub fn match_resource(mut self, enabled: bool) -> Self {
        self.match_resource = enabled;
        self
    }
}

#[derive(Debug, Clone)]
struct CompiledRule {
    name: String,
    equals: Vec<String>,
    suffix: Vec<String>,
    contains: Vec<String>,
}

impl CompiledRule {
    fn matches(&self, value: &str) -> bool {
        let trimmed = value.trim();
        self.equals.iter().any(|v| trimmed == v)
            || self
                .suffix
                .iter()
                .any(|s| trimmed.len() > s.len() && trimmed.ends_with(s.as_str()))
            || self.contains.iter().any(|c| value.contains(c.as_str()))
    }
}

fn normalize(values: &[String]) -> Vec<String> {
    values
        .iter()
        .map(|v| v.trim().to_lowercase())
        .filter(|v| !v.is_empty())
        .collect()
}

// Keywords are matched verbatim, so surrounding spaces are significant
// ("rai " must not match "rainbow").
fn normalize_keywords(values: &[String]) -> Vec<String> {
    values
        .iter()
        .map(|v| v.to_lowercase())
        .filter(|v| !v.trim().is_empty())
        .collect()
}

/// Returns the display text of a metadata line: everything after the first
/// comma that is not inside a quoted attribute value.
pub fn display_text(line: &str) -> &str {
    let mut in_quotes = false;
    for (idx, ch) in line.char_indices() {
        match ch {
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => return line[idx + 1..].trim(),
            _ => {}
        }
    }
    ""
}

/// Compiled form of a [`ClassifierConfig`]
#[derive(Debug, Clone)]
pub struct Classifier {
    attributes: Vec<CompiledRule>,
    accepted_tokens: Vec<String>,
    disqualifying_tokens: Vec<String>,
    separator: char,
    anchor: TokenAnchor,
    scope: TokenScope,
    keywords: Vec<String>,
    match_resource: bool,
}

impl Classifier {
    pub fn new(config: &ClassifierConfig) -> Self {
        let separator = config.token_separator.to_lowercase().next().unwrap_or('|');
        let with_separator = |tokens: &[String]| -> Vec<String> {
            normalize(tokens)
                .into_iter()
                .map(|t| format!("{t}{separator}"))
                .collect()
        };

        let attributes = config
            .attributes
            .iter()
            .filter(|rule| !rule.name.trim().is_empty())
            .map(|rule| CompiledRule {
                name: rule.name.trim().to_lowercase(),
                equals: normalize(&rule.equals),
                suffix: normalize(&rule.suffix),
                contains: normalize(&rule.contains),
            })
            .collect();

        Self {
            attributes,
            accepted_tokens: with_separator(&config.accepted_tokens),
            disqualifying_tokens: with_separator(&config.disqualifying_tokens),
            separator,
            anchor: config.token_anchor,
            scope: config.token_scope,
            keywords: normalize_keywords(&config.keywords),
            match_resource: config.match_resource,
        }
    }

    /// Classify an entry from its metadata line and resource line.
    pub fn classify(&self, info_line: &str, resource_line: &str) -> Classification {
        let line = info_line.to_lowercase();
        let display = display_text(&line);

        if self.has_token(&self.disqualifying_tokens, &line, display) {
            return Classification::Skipped;
        }

        if self.matches_attribute(&line)
            || self.has_token(&self.accepted_tokens, &line, display)
            || self.matches_keyword(&line, resource_line)
        {
            Classification::Kept
        } else {
            Classification::Skipped
        }
    }

    fn matches_attribute(&self, line: &str) -> bool {
        if self.attributes.is_empty() {
            return false;
        }
        ATTRIBUTE_REGEX.captures_iter(line).any(|caps| {
            let name = &caps[1];
            let value = &caps[2];
            self.attributes
                .iter()
                .any(|rule| rule.name == name && rule.matches(value))
        })
    }

    fn has_token(&self, tokens: &[String], line: &str, display: &str) -> bool {
        tokens.iter().any(|token| match self.scope {
            TokenScope::Line => self.token_in(line, token),
            TokenScope::Display => self.token_in(display, token),
            TokenScope::Both => self.token_in(line, token) || self.token_in(display, token),
        })
    }

    fn token_in(&self, text: &str, token: &str) -> bool {
        text.match_indices(token).any(|(idx, _)| {
            let at_start = idx == 0;
            let after_separator = text[..idx].ends_with(self.separator);
            match self.anchor {
                TokenAnchor::Start => at_start,
                TokenAnchor::Separator => after_separator,
                TokenAnchor::Either => at_start || after_separator,
            }
        })
    }

    fn matches_keyword(&self, line: &str, resource_line: &str) -> bool {
        if self.keywords.is_empty() {
            return false;
        }
        // The display text is part of the metadata line
        if self.keywords.iter().any(|k| line.contains(k.as_str())) {
            return true;
        }
        if self.match_resource {
            let resource = resource_line.to_lowercase();
            return self.keywords.iter().any(|k| resource.contains(k.as_str()));
        }
        false
    }
}

impl From<&ClassifierConfig> for Classifier {
    fn from(config: &ClassifierConfig) -> Self {
        Classifier::new(config)
    }
}

impl Default for Classifier {
    fn default() -> Self {
        Classifier::new(&ClassifierConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn italian() -> Classifier {
        Classifier::new(&ClassifierConfig::italian())
    }

    #[test]
    fn test_display_text() {
        assert_eq!(display_text("#EXTINF:-1 tvg-id=\"a\",Rai 1"), "Rai 1");
        assert_eq!(
            display_text("#EXTINF:-1 group-title=\"News, IT\",Rai News 24"),
            "Rai News 24"
        );
        assert_eq!(display_text("#EXTINF:-1,Title, with comma"), "Title, with comma");
        assert_eq!(display_text("#EXTINF:-1 tvg-id=\"a\""), "");
    }

    #[test]
    fn test_empty_config_skips_everything() {
        let classifier = Classifier::default();
        assert_eq!(
            classifier.classify("#EXTINF:-1 tvg-language=\"it\",Rai 1", "http://a"),
            Classification::Skipped
        );
    }

    #[test]
    fn test_attribute_equals_is_case_insensitive() {
        let classifier =
            Classifier::new(&ClassifierConfig::default().accept_attribute_values("lang", ["it"]));
        assert!(classifier.classify("#META lang=\"it\"", "http://a").is_kept());
        assert!(classifier.classify("#META LANG=\"IT\"", "http://a").is_kept());
        assert!(classifier.classify("#META lang = \"It\"", "http://a").is_kept());
        assert!(!classifier.classify("#META lang=\"en\"", "http://b").is_kept());
        assert!(!classifier.classify("#META lang=\"ita\"", "http://b").is_kept());
    }

    #[test]
    fn test_id_suffix() {
        let classifier = italian();
        assert!(
            classifier
                .classify("#EXTINF:-1 tvg-id=\"Rai1.it\",Channel", "http://x")
                .is_kept()
        );
        assert!(
            !classifier
                .classify("#EXTINF:-1 tvg-id=\".it\",Channel", "http://x")
                .is_kept()
        );
        assert!(
            !classifier
                .classify("#EXTINF:-1 tvg-id=\"bbc.uk\",Channel", "http://x")
                .is_kept()
        );
    }

    #[test]
    fn test_group_title_contains() {
        let classifier = italian();
        assert!(
            classifier
                .classify("#EXTINF:-1 group-title=\"ITALIA | Sport\",Channel", "http://x")
                .is_kept()
        );
        assert!(
            classifier
                .classify("#EXTINF:-1 group-title=\"IT| Kids\",Channel", "http://x")
                .is_kept()
        );
        assert!(
            !classifier
                .classify("#EXTINF:-1 group-title=\"UK| Kids\",Channel", "http://x")
                .is_kept()
        );
    }

    #[test]
    fn test_token_boundaries() {
        let classifier = italian();
        // At the start of the display text
        assert!(classifier.classify("#EXTINF:-1,IT| Channel", "http://x").is_kept());
        // After a separator
        assert!(
            classifier
                .classify("#EXTINF:-1,VOD|IT| Channel", "http://x")
                .is_kept()
        );
        // Not at a boundary
        assert!(
            !classifier
                .classify("#EXTINF:-1,SPLIT| Channel", "http://x")
                .is_kept()
        );
    }

    #[test]
    fn test_token_anchor_start_only() {
        let classifier = Classifier::new(
            &ClassifierConfig::default()
                .accept_tokens(["it"])
                .token_anchor(TokenAnchor::Start)
                .token_scope(TokenScope::Display),
        );
        assert!(classifier.classify("#EXTINF:-1,IT| Channel", "http://x").is_kept());
        assert!(
            !classifier
                .classify("#EXTINF:-1,VOD|IT| Channel", "http://x")
                .is_kept()
        );
    }

    #[test]
    fn test_token_scope_line_ignores_display_start() {
        let classifier = Classifier::new(
            &ClassifierConfig::default()
                .accept_tokens(["it"])
                .token_scope(TokenScope::Line),
        );
        // The line starts with the metadata prefix, so only separator matches count
        assert!(!classifier.classify("#EXTINF:-1,IT| Channel", "http://x").is_kept());
        assert!(classifier.classify("#EXTINF:-1,A|IT| Channel", "http://x").is_kept());
    }

    #[test]
    fn test_custom_separator() {
        let classifier = Classifier::new(
            &ClassifierConfig::default()
                .accept_tokens(["it"])
                .token_separator(':'),
        );
        assert!(classifier.classify("#EXTINF:-1,IT: Channel", "http://x").is_kept());
        assert!(!classifier.classify("#EXTINF:-1,IT| Channel", "http://x").is_kept());
    }

    #[test]
    fn test_keywords() {
        let classifier = italian();
        assert!(classifier.classify("#EXTINF:-1,Rai 1 HD", "http://x").is_kept());
        assert!(classifier.classify("#EXTINF:-1,CANALE 5", "http://x").is_kept());
        assert!(!classifier.classify("#EXTINF:-1,Rainbow TV", "http://x").is_kept());
    }

    #[test]
    fn test_keywords_on_resource_line() {
        let classifier = italian();
        assert!(
            classifier
                .classify("#EXTINF:-1,Channel", "http://cdn/Boing/index.m3u8")
                .is_kept()
        );

        let without = Classifier::new(
            &ClassifierConfig::default()
                .keyword_whitelist(["boing"])
                .match_resource(false),
        );
        assert!(
            !without
                .classify("#EXTINF:-1,Channel", "http://cdn/Boing/index.m3u8")
                .is_kept()
        );
    }

    #[test]
    fn test_disqualifying_token_overrides_keyword() {
        let classifier = Classifier::new(
            &ClassifierConfig::italian().disqualifying_tokens(["de", "fr"]),
        );
        assert!(
            !classifier
                .classify("#EXTINF:-1,DE| Discovery Channel", "http://x")
                .is_kept()
        );
        assert!(
            classifier
                .classify("#EXTINF:-1,Discovery Channel", "http://x")
                .is_kept()
        );
    }

    #[test]
    fn test_disqualifying_token_overrides_attribute() {
        let classifier = Classifier::new(
            &ClassifierConfig::default()
                .accept_attribute_values("tvg-language", ["it"])
                .disqualifying_tokens(["fr"]),
        );
        assert!(
            !classifier
                .classify("#EXTINF:-1 tvg-language=\"it\",FR| Channel", "http://x")
                .is_kept()
        );
    }

    #[test]
    fn test_total_on_garbage() {
        let classifier = italian();
        assert!(!classifier.classify("", "").is_kept());
        assert!(!classifier.classify("\"\"\"", "\u{fffd}").is_kept());
        assert!(!classifier.classify("#EXTINF:-1 tvg-id=\"", "x").is_kept());
    }

    #[test]
    fn test_empty_values_are_ignored() {
        let classifier = Classifier::new(
            &ClassifierConfig::default()
                .keyword_whitelist(["", "  "])
                .accept_tokens([""]),
        );
        assert!(!classifier.classify("#EXTINF:-1,anything", "http://x").is_kept());
    }
}
