use std::collections::HashSet;

use serde::Serialize;

use crate::normalize::{normalize, replace_hyphens, tokens, word_count};
use crate::vocabulary::{BaseVocabulary, EffectiveSubset};

/// Inline style the editor uses for words outside the vocabulary.
pub const FLAGGED_STYLE: &str = "text-decoration: underline; color: red;";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Allowed,
    Flagged,
}

impl Verdict {
    pub fn is_flagged(self) -> bool {
        matches!(self, Verdict::Flagged)
    }
}

/// Classifies one raw token against the active subset and the base list.
pub fn classify(word: &str, subset: &EffectiveSubset<'_>, base: &BaseVocabulary) -> Verdict {
    classify_key(&normalize(word), subset, base)
}

/// Classifies an already-normalized key.
pub fn classify_key(key: &str, subset: &EffectiveSubset<'_>, base: &BaseVocabulary) -> Verdict {
    if subset.contains(key) || base.contains(key) {
        Verdict::Allowed
    } else {
        Verdict::Flagged
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnnotatedToken {
    pub text: String,
    pub key: String,
    pub verdict: Verdict,
}

/// Tokens of a text with their verdicts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Annotated {
    pub tokens: Vec<AnnotatedToken>,
    word_count: usize,
}

/// Splits `text` into tokens and classifies each one.
pub fn highlight(text: &str, subset: &EffectiveSubset<'_>, base: &BaseVocabulary) -> Annotated {
    let replaced = replace_hyphens(text);
    let tokens = tokens(&replaced)
        .map(|token| {
            let key = normalize(token);
            let verdict = classify_key(&key, subset, base);
            AnnotatedToken {
                text: token.to_string(),
                key,
                verdict,
            }
        })
        .collect();
    Annotated {
        tokens,
        word_count: word_count(text),
    }
}

impl Annotated {
    /// Words in the input as typed, before hyphens were split.
    pub fn word_count(&self) -> usize {
        self.word_count
    }

    pub fn flagged_count(&self) -> usize {
        self.tokens
            .iter()
            .filter(|token| token.verdict.is_flagged())
            .count()
    }

    /// Distinct flagged keys in the order they first appear.
    pub fn flagged_keys(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.tokens
            .iter()
            .filter(|token| token.verdict.is_flagged())
            .map(|token| token.key.as_str())
            .filter(|key| seen.insert(*key))
            .collect()
    }

    /// Joins tokens with single spaces, wrapping flagged ones in `open`/`close`.
    pub fn render_marked(&self, open: &str, close: &str) -> String {
        self.render_with(|token, out| {
            if token.verdict.is_flagged() {
                out.push_str(open);
                out.push_str(&token.text);
                out.push_str(close);
            } else {
                out.push_str(&token.text);
            }
        })
    }

    /// Joins tokens with single spaces and no markers.
    pub fn render_plain(&self) -> String {
        self.render_marked("", "")
    }

    /// HTML with flagged tokens underlined in red. Token text is escaped.
    pub fn render_html(&self) -> String {
        self.render_with(|token, out| {
            let text = html_escape(&token.text);
            if token.verdict.is_flagged() {
                out.push_str(r#"<span style=""#);
                out.push_str(FLAGGED_STYLE);
                out.push_str(r#"">"#);
                out.push_str(&text);
                out.push_str("</span>");
            } else {
                out.push_str(&text);
            }
        })
    }

    fn render_with<F>(&self, mut render: F) -> String
    where
        F: FnMut(&AnnotatedToken, &mut String),
    {
        let mut out = String::new();
        for (idx, token) in self.tokens.iter().enumerate() {
            if idx > 0 {
                out.push(' ');
            }
            render(token, &mut out);
        }
        out
    }
}

pub(crate) fn html_escape(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
