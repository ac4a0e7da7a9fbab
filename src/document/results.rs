//! Query results

use super::types::Document;

/// One matching document.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryHit {
    pub document: Document,
    /// Relevance for full-text queries, `None` for value queries
    pub score: Option<u32>,
}

/// Documents matched by a query, in result order.
///
/// Full-text results are ranked by descending score with ties in ascending
/// id order; value results are in key order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResults {
    hits: Vec<QueryHit>,
}

impl QueryResults {
    pub fn iter(&self) -> std::slice::Iter<'_, QueryHit> {
        self.hits.iter()
    }

    pub fn documents(&self) -> impl Iterator<Item = &Document> + '_ {
        self.hits.iter().map(|hit| &hit.document)
    }

    /// Matching ids in result order
    pub fn ids(&self) -> Vec<String> {
        self.hits
            .iter()
            .map(|hit| hit.document.id().to_string())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.hits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }
}

impl FromIterator<QueryHit> for QueryResults {
    fn from_iter<I: IntoIterator<Item = QueryHit>>(iter: I) -> Self {
        Self {
            hits: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for QueryResults {
    type Item = QueryHit;
    type IntoIter = std::vec::IntoIter<QueryHit>;

    fn into_iter(self) -> Self::IntoIter {
        self.hits.into_iter()
    }
}

impl<'a> IntoIterator for &'a QueryResults {
    type Item = &'a QueryHit;
    type IntoIter = std::slice::Iter<'a, QueryHit>;

    fn into_iter(self) -> Self::IntoIter {
        self.hits.iter()
    }
}
