//! Text analysis for full-text indexes
//!
//! Text is segmented into Unicode words, each word is split further on any
//! non-alphanumeric character, and every piece is lowercased. With
//! `ignore_accents`, diacritics are stripped (NFD, combining marks
//! dropped); otherwise text is NFC-normalized so composed and decomposed
//! spellings of the same accented letter produce the same token.

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;
use unicode_segmentation::UnicodeSegmentation;

/// Tokens longer than this many bytes are dropped
pub const MAX_TOKEN_LEN: usize = 255;

/// A normalized token and its position within the analyzed text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub text: String,
    pub position: u32,
}

/// One term of a search query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryTerm {
    pub text: String,
    /// Match every token starting with `text`
    pub prefix: bool,
}

/// Tokenizer shared by indexing and querying
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Analyzer {
    ignore_accents: bool,
}

impl Analyzer {
    pub fn new(ignore_accents: bool) -> Self {
        Self { ignore_accents }
    }

    pub fn ignores_accents(&self) -> bool {
        self.ignore_accents
    }

    /// Lowercases and applies the accent policy.
    pub fn normalize(&self, text: &str) -> String {
        if self.ignore_accents {
            text.nfd()
                .filter(|c| !is_combining_mark(*c))
                .collect::<String>()
                .to_lowercase()
        } else {
            text.nfc().collect::<String>().to_lowercase()
        }
    }

    /// Splits text into positioned tokens.
    pub fn tokenize(&self, text: &str) -> Vec<Token> {
        let normalized = self.normalize(text);
        let mut tokens = Vec::new();
        let mut position = 0u32;

        for piece in split_words(&normalized) {
            if piece.len() <= MAX_TOKEN_LEN {
                tokens.push(Token {
                    text: piece.to_string(),
                    position,
                });
                position += 1;
            }
        }

        tokens
    }

    /// Analyzes a search string.
    ///
    /// A word ending in `*` marks its last token as a prefix term, so
    /// `ocea*` matches `ocean`.
    pub fn query_terms(&self, query: &str) -> Vec<QueryTerm> {
        let mut terms = Vec::new();

        for word in query.split_whitespace() {
            let prefix = word.ends_with('*');
            let normalized = self.normalize(word.trim_end_matches('*'));
            let start = terms.len();

            terms.extend(
                split_words(&normalized)
                    .filter(|piece| piece.len() <= MAX_TOKEN_LEN)
                    .map(|piece| QueryTerm {
                        text: piece.to_string(),
                        prefix: false,
                    }),
            );

            if prefix && terms.len() > start {
                if let Some(last) = terms.last_mut() {
                    last.prefix = true;
                }
            }
        }

        terms
    }
}

fn split_words(text: &str) -> impl Iterator<Item = &str> {
    text.unicode_words()
        .flat_map(|word| word.split(|c: char| !c.is_alphanumeric()))
        .filter(|piece| !piece.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(tokens: &[Token]) -> Vec<&str> {
        tokens.iter().map(|t| t.text.as_str()).collect()
    }

    #[test]
    fn test_lowercases_and_splits() {
        let tokens = Analyzer::default().tokenize("Ocean-view SUITE, 2 beds!");
        assert_eq!(texts(&tokens), vec!["ocean", "view", "suite", "2", "beds"]);
        let positions: Vec<u32> = tokens.iter().map(|t| t.position).collect();
        assert_eq!(positions, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_apostrophes_split_tokens() {
        let tokens = Analyzer::default().tokenize("Guest's favourite");
        assert_eq!(texts(&tokens), vec!["guest", "s", "favourite"]);
    }

    #[test]
    fn test_accents_preserved_by_default() {
        let analyzer = Analyzer::default();
        assert_eq!(texts(&analyzer.tokenize("Café")), vec!["café"]);
        // decomposed input normalizes to the same token
        assert_eq!(texts(&analyzer.tokenize("Cafe\u{301}")), vec!["café"]);
    }

    #[test]
    fn test_accents_folded_when_ignored() {
        let analyzer = Analyzer::new(true);
        assert_eq!(texts(&analyzer.tokenize("Café Crème")), vec!["cafe", "creme"]);
    }

    #[test]
    fn test_query_prefix_terms() {
        let terms = Analyzer::default().query_terms("Ocea* view");
        assert_eq!(
            terms,
            vec![
                QueryTerm { text: "ocea".into(), prefix: true },
                QueryTerm { text: "view".into(), prefix: false },
            ]
        );
    }

    #[test]
    fn test_bare_star_yields_nothing() {
        assert!(Analyzer::default().query_terms("* --").is_empty());
    }

    #[test]
    fn test_overlong_tokens_dropped() {
        let long = "a".repeat(MAX_TOKEN_LEN + 1);
        let tokens = Analyzer::default().tokenize(&format!("{} ok", long));
        assert_eq!(texts(&tokens), vec!["ok"]);
        assert_eq!(tokens[0].position, 0);
    }
}
