use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;

use fst::Set;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Words that are allowed regardless of the selected glossary.
pub struct BaseVocabulary {
    set: Set<Vec<u8>>,
}

impl BaseVocabulary {
    /// Builds the set from already-lowercased words. Duplicates collapse.
    pub fn from_words<I, S>(words: I) -> Result<Self, fst::Error>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let sorted: BTreeSet<String> = words.into_iter().map(Into::into).collect();
        let set = Set::from_iter(sorted.iter())?;
        Ok(Self { set })
    }

    pub fn empty() -> Self {
        Self {
            set: Set::default(),
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.set.contains(key)
    }

    pub fn len(&self) -> usize {
        self.set.len()
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }
}

impl fmt::Debug for BaseVocabulary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BaseVocabulary")
            .field("len", &self.len())
            .finish()
    }
}

/// A rank-ordered topical word list. Each row groups variants of one word.
#[derive(Debug, Clone, Default)]
pub struct Glossary {
    rows: Vec<Vec<String>>,
    first_row: HashMap<String, usize>,
}

impl Glossary {
    pub fn new(rows: Vec<Vec<String>>) -> Self {
        let mut first_row = HashMap::new();
        for (idx, row) in rows.iter().enumerate() {
            for word in row {
                first_row.entry(word.clone()).or_insert(idx);
            }
        }
        Self { rows, first_row }
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// True if `key` appears in one of the first `limit` rows.
    pub fn contains_within(&self, key: &str, limit: usize) -> bool {
        self.first_row.get(key).is_some_and(|&row| row < limit)
    }
}

/// Glossaries keyed by source identifier, iterated in load order.
#[derive(Debug, Clone, Default)]
pub struct VocabularyCatalog {
    order: Vec<String>,
    glossaries: HashMap<String, Glossary>,
}

impl VocabularyCatalog {
    /// Inserts or replaces a glossary. A replaced id keeps its original position.
    pub fn insert(&mut self, id: impl Into<String>, glossary: Glossary) {
        let id = id.into();
        if !self.glossaries.contains_key(&id) {
            self.order.push(id.clone());
        }
        self.glossaries.insert(id, glossary);
    }

    pub fn get(&self, id: &str) -> Option<&Glossary> {
        self.glossaries.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.glossaries.contains_key(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Glossary)> {
        self.order
            .iter()
            .filter_map(|id| self.glossaries.get(id).map(|g| (id.as_str(), g)))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("cutoff must be a whole number between {min} and {max}, got {input:?}", min = Cutoff::MIN, max = Cutoff::MAX)]
pub struct CutoffError {
    input: String,
}

/// How many leading glossary rows count as allowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "i64", into = "u16")]
pub struct Cutoff(u16);

impl Cutoff {
    pub const MIN: u16 = 1;
    pub const MAX: u16 = 248;

    /// Clamps `value` into `MIN..=MAX`.
    pub fn new(value: i64) -> Self {
        Self(value.clamp(i64::from(Self::MIN), i64::from(Self::MAX)) as u16)
    }

    pub fn get(self) -> usize {
        usize::from(self.0)
    }
}

impl Default for Cutoff {
    fn default() -> Self {
        Self(Self::MAX)
    }
}

impl From<i64> for Cutoff {
    fn from(value: i64) -> Self {
        Self::new(value)
    }
}

impl From<Cutoff> for u16 {
    fn from(value: Cutoff) -> Self {
        value.0
    }
}

impl FromStr for Cutoff {
    type Err = CutoffError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<i64>()
            .map(Self::new)
            .map_err(|_| CutoffError {
                input: s.to_string(),
            })
    }
}

impl fmt::Display for Cutoff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The glossary the user picked plus the rank cutoff applied to it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    #[serde(default)]
    pub glossary: Option<String>,
    #[serde(default)]
    pub cutoff: Cutoff,
}

impl Selection {
    pub fn new(glossary: Option<String>, cutoff: Cutoff) -> Self {
        // An empty id is the "nothing selected" option.
        let glossary = glossary.filter(|id| !id.is_empty());
        Self { glossary, cutoff }
    }
}

/// The rows of one glossary that are in effect for a selection.
#[derive(Debug, Clone, Copy)]
pub struct EffectiveSubset<'a> {
    glossary: Option<&'a Glossary>,
    limit: usize,
}

impl<'a> EffectiveSubset<'a> {
    pub fn empty() -> Self {
        Self {
            glossary: None,
            limit: 0,
        }
    }

    pub fn of(glossary: &'a Glossary, cutoff: Cutoff) -> Self {
        Self {
            glossary: Some(glossary),
            limit: cutoff.get().min(glossary.len()),
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.glossary
            .is_some_and(|glossary| glossary.contains_within(key, self.limit))
    }

    pub fn rows(&self) -> &'a [Vec<String>] {
        match self.glossary {
            Some(glossary) => &glossary.rows()[..self.limit],
            None => &[],
        }
    }

    pub fn len(&self) -> usize {
        self.limit
    }

    pub fn is_empty(&self) -> bool {
        self.limit == 0
    }
}

/// An immutable snapshot of everything a load produced.
#[derive(Debug)]
pub struct VocabularyState {
    pub base: BaseVocabulary,
    pub catalog: VocabularyCatalog,
}

impl VocabularyState {
    pub fn new(base: BaseVocabulary, catalog: VocabularyCatalog) -> Self {
        Self { base, catalog }
    }

    /// Resolves a selection. Unknown or missing glossary ids give an empty subset.
    pub fn subset(&self, selection: &Selection) -> EffectiveSubset<'_> {
        selection
            .glossary
            .as_deref()
            .and_then(|id| self.catalog.get(id))
            .map(|glossary| EffectiveSubset::of(glossary, selection.cutoff))
            .unwrap_or_else(EffectiveSubset::empty)
    }
}
