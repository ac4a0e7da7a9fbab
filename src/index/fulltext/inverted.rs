//! Inverted index for one full-text descriptor
//!
//! `token -> doc id -> [(field slot, position)]`. A reverse map from each
//! document to the tokens it contributed per field slot lets removal touch
//! only that document's postings, so write cost is bounded by document
//! size rather than corpus size.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use super::analyzer::{Analyzer, QueryTerm};

/// Where a token occurs inside a document
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Occurrence {
    /// Index into the descriptor's field list
    pub field: u16,
    /// Token position within that field
    pub position: u32,
}

/// Posting list of one token: doc id -> sorted occurrences
pub type Postings = BTreeMap<String, Vec<Occurrence>>;

/// Position gap inserted between elements of an array field so that a
/// phrase never spans two elements.
const ELEMENT_GAP: u32 = 1;

/// Full-text inverted index
#[derive(Debug, Default)]
pub struct FullTextIndex {
    analyzer: Analyzer,
    postings: BTreeMap<String, Postings>,
    doc_terms: HashMap<String, BTreeMap<u16, BTreeSet<String>>>,
}

impl FullTextIndex {
    pub fn new(analyzer: Analyzer) -> Self {
        Self {
            analyzer,
            postings: BTreeMap::new(),
            doc_terms: HashMap::new(),
        }
    }

    pub fn analyzer(&self) -> &Analyzer {
        &self.analyzer
    }

    /// Indexes `text` as the whole content of document `id`, replacing
    /// whatever was indexed for it before.
    pub fn index_document(&mut self, id: &str, text: &str) {
        self.remove_document(id);
        self.index_field(id, 0, &[text]);
    }

    /// Indexes the text of one field slot of `id`.
    ///
    /// Existing postings for the same slot are replaced; other slots are
    /// left alone.
    pub fn index_field(&mut self, id: &str, field: u16, texts: &[&str]) {
        self.remove_field(id, field);

        let mut base = 0u32;
        let mut seen = BTreeSet::new();

        for text in texts {
            let tokens = self.analyzer.tokenize(text);
            let next_base = base + tokens.len() as u32 + ELEMENT_GAP;

            for token in tokens {
                let occurrence = Occurrence {
                    field,
                    position: base + token.position,
                };
                let occurrences = self
                    .postings
                    .entry(token.text.clone())
                    .or_default()
                    .entry(id.to_string())
                    .or_default();
                if let Err(at) = occurrences.binary_search(&occurrence) {
                    occurrences.insert(at, occurrence);
                }
                seen.insert(token.text);
            }

            base = next_base;
        }

        if !seen.is_empty() {
            self.doc_terms
                .entry(id.to_string())
                .or_default()
                .insert(field, seen);
        }
    }

    /// Removes the postings of one field slot of `id`.
    pub fn remove_field(&mut self, id: &str, field: u16) {
        let Some(slots) = self.doc_terms.get_mut(id) else {
            return;
        };
        let Some(tokens) = slots.remove(&field) else {
            return;
        };
        if slots.is_empty() {
            self.doc_terms.remove(id);
        }

        for token in tokens {
            if let Some(postings) = self.postings.get_mut(&token) {
                if let Some(occurrences) = postings.get_mut(id) {
                    occurrences.retain(|o| o.field != field);
                    if occurrences.is_empty() {
                        postings.remove(id);
                    }
                }
                if postings.is_empty() {
                    self.postings.remove(&token);
                }
            }
        }
    }

    /// Removes every posting of `id`.
    pub fn remove_document(&mut self, id: &str) {
        let fields: Vec<u16> = match self.doc_terms.get(id) {
            Some(slots) => slots.keys().copied().collect(),
            None => return,
        };
        for field in fields {
            self.remove_field(id, field);
        }
    }

    /// Whether `id` has any postings
    pub fn contains(&self, id: &str) -> bool {
        self.doc_terms.contains_key(id)
    }

    /// Number of documents with at least one token
    pub fn document_count(&self) -> usize {
        self.doc_terms.len()
    }

    /// Number of distinct tokens
    pub fn token_count(&self) -> usize {
        self.postings.len()
    }

    /// Postings for an exact, already-normalized token
    pub fn postings(&self, token: &str) -> Option<&Postings> {
        self.postings.get(token)
    }

    /// Matches documents containing every term of `search`.
    ///
    /// Posting lists are intersected eagerly; see [`FullTextMatches`].
    ///
    /// Score is the summed term frequency of the query terms in the
    /// document. Results are ordered by descending score, ties by
    /// ascending id.
    pub fn query(&self, search: &str) -> FullTextMatches {
        let terms = self.analyzer.query_terms(search);
        if terms.is_empty() {
            return FullTextMatches::default();
        }

        let mut scores: Option<BTreeMap<String, u32>> = None;
        for term in &terms {
            let hits = self.term_frequencies(term);
            scores = Some(match scores {
                None => hits,
                Some(acc) => acc
                    .into_iter()
                    .filter_map(|(id, score)| hits.get(&id).map(|tf| (id, score + tf)))
                    .collect(),
            });
            if scores.as_ref().map_or(true, BTreeMap::is_empty) {
                return FullTextMatches::default();
            }
        }

        FullTextMatches::ranked(scores.unwrap_or_default())
    }

    /// Matches documents where the terms of `phrase` occur at consecutive
    /// positions within one field. Score is the number of occurrences of
    /// the phrase.
    pub fn query_phrase(&self, phrase: &str) -> FullTextMatches {
        let terms: Vec<String> = self
            .analyzer
            .query_terms(phrase)
            .into_iter()
            .map(|t| t.text)
            .collect();

        let Some((first, rest)) = terms.split_first() else {
            return FullTextMatches::default();
        };
        let Some(first_postings) = self.postings.get(first) else {
            return FullTextMatches::default();
        };

        let mut lists = Vec::with_capacity(rest.len());
        for term in rest {
            match self.postings.get(term) {
                Some(postings) => lists.push(postings),
                None => return FullTextMatches::default(),
            }
        }

        let mut scores = BTreeMap::new();
        'docs: for (id, starts) in first_postings {
            let mut follow = Vec::with_capacity(lists.len());
            for postings in &lists {
                match postings.get(id) {
                    Some(occurrences) => follow.push(occurrences),
                    None => continue 'docs,
                }
            }

            let count = starts
                .iter()
                .filter(|start| {
                    follow.iter().enumerate().all(|(i, occurrences)| {
                        let wanted = Occurrence {
                            field: start.field,
                            position: start.position + i as u32 + 1,
                        };
                        occurrences.binary_search(&wanted).is_ok()
                    })
                })
                .count() as u32;

            if count > 0 {
                scores.insert(id.clone(), count);
            }
        }

        FullTextMatches::ranked(scores)
    }

    fn term_frequencies(&self, term: &QueryTerm) -> BTreeMap<String, u32> {
        let mut hits: BTreeMap<String, u32> = BTreeMap::new();

        if term.prefix {
            let matching = self
                .postings
                .range(term.text.clone()..)
                .take_while(|(token, _)| token.starts_with(&term.text));
            for (_, postings) in matching {
                for (id, occurrences) in postings {
                    *hits.entry(id.clone()).or_default() += occurrences.len() as u32;
                }
            }
        } else if let Some(postings) = self.postings.get(&term.text) {
            for (id, occurrences) in postings {
                hits.insert(id.clone(), occurrences.len() as u32);
            }
        }

        hits
    }
}

/// Ranked full-text matches.
///
/// A finite sequence that can be iterated any number of times; each call
/// to [`iter`](Self::iter) starts from the best match. Ranking needs every
/// score before the first result is known, so matches are materialized
/// when the query runs. Iteration is then allocation-free and unaffected by
/// later changes to the index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FullTextMatches {
    hits: Vec<(String, u32)>,
}

impl FullTextMatches {
    fn ranked(scores: BTreeMap<String, u32>) -> Self {
        let mut hits: Vec<(String, u32)> = scores.into_iter().collect();
        // BTreeMap yields ids ascending; a stable sort keeps that for ties.
        hits.sort_by(|a, b| b.1.cmp(&a.1));
        Self { hits }
    }

    /// Iterates `(doc id, score)` best first.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> + '_ {
        self.hits.iter().map(|(id, score)| (id.as_str(), *score))
    }

    /// Matching ids, best first
    pub fn ids(&self) -> Vec<String> {
        self.hits.iter().map(|(id, _)| id.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.hits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }
}

impl IntoIterator for FullTextMatches {
    type Item = (String, u32);
    type IntoIter = std::vec::IntoIter<(String, u32)>;

    fn into_iter(self) -> Self::IntoIter {
        self.hits.into_iter()
    }
}
