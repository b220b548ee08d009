//! Property tests for canonicalization, join and aggregation invariants

use std::collections::HashSet;

use proptest::prelude::*;

use lexnorm::aggregate::Aggregator;
use lexnorm::corpus::{AnnotatedToken, CorpusTokenStore, Document};
use lexnorm::join::{join_norms, MetricSelection};
use lexnorm::norms::{canonicalize, normalize_word, CanonicalNormTable, NormSource, Study};
use lexnorm::stopwords::StopwordList;

const VOCABULARY: [(&str, &str); 12] = [
    ("The", "DET"),
    ("the", "DET"),
    ("and", "CCONJ"),
    ("of", "ADP"),
    ("cat", "NOUN"),
    ("Cat", "NOUN"),
    ("dog", "NOUN"),
    ("idea", "NOUN"),
    ("zorp", "NOUN"),
    ("!", "PUNCT"),
    (".", "PUNCT"),
    ("42", "NUM"),
];

const RAW_WORDS: [&str; 8] = ["cat", "Cat ", " CAT", "dog", "idea", "the", "The", "naïve"];

fn norm_table() -> CanonicalNormTable {
    let conc = NormSource::from_reader(
        Study::Concreteness,
        "conc",
        "word,conc.m,conc.sd\ncat,4.9,0.3\ndog,4.8,\nidea,1.6,0.9\nthe,1.4,NA\n".as_bytes(),
        b',',
    )
    .expect("valid table");
    canonicalize(&[conc]).expect("merges")
}

/// Value derived from the normalized word, so duplicate rows never conflict.
fn rating(word: &str) -> String {
    format!("{}.5", normalize_word(word).chars().count())
}

fn raw_source(words: &[usize]) -> NormSource {
    let rows = words
        .iter()
        .map(|&i| vec![RAW_WORDS[i].to_string(), rating(RAW_WORDS[i])])
        .collect();
    NormSource::new(
        Study::Aoa,
        "aoa",
        vec!["word".to_string(), "rating.mean".to_string()],
        rows,
    )
    .expect("valid source")
}

fn corpus_strategy() -> impl Strategy<Value = Vec<(usize, usize, usize)>> {
    prop::collection::vec((0..4usize, 1..4usize, 0..VOCABULARY.len()), 0..60)
}

fn build_store(picks: &[(usize, usize, usize)]) -> (Vec<Document>, CorpusTokenStore) {
    let documents: Vec<Document> = (0..4).map(|i| Document::new(format!("d{i}"), "")).collect();
    let tokens = picks
        .iter()
        .map(|&(doc, sentence, word)| {
            let (surface, tag) = VOCABULARY[word];
            AnnotatedToken::new(format!("d{doc}"), sentence, surface, tag)
        })
        .collect();
    let store = CorpusTokenStore::build(&documents, tokens, &StopwordList::english())
        .expect("every token has a document");
    (documents, store)
}

proptest! {
    #[test]
    fn canonical_words_are_unique_and_normalized(words in prop::collection::vec(0..RAW_WORDS.len(), 1..30)) {
        let table = canonicalize(&[raw_source(&words)]).expect("duplicates agree");

        let expected: HashSet<String> = words.iter().map(|&i| normalize_word(RAW_WORDS[i])).collect();
        prop_assert_eq!(table.len(), expected.len());
        for (word, _) in table.iter() {
            prop_assert_eq!(word, normalize_word(word));
            prop_assert!(expected.contains(word));
        }
    }

    #[test]
    fn canonicalizing_twice_changes_nothing(words in prop::collection::vec(0..RAW_WORDS.len(), 1..30)) {
        let table = canonicalize(&[raw_source(&words)]).expect("duplicates agree");
        let again = canonicalize(&[table.to_source("again").expect("valid source")])
            .expect("canonical table merges");

        prop_assert_eq!(again.columns(), table.columns());
        prop_assert_eq!(again.iter().collect::<Vec<_>>(), table.iter().collect::<Vec<_>>());
        prop_assert_eq!(again.stats().rows_nulled, 0);
    }

    #[test]
    fn every_token_is_joined_exactly_once(picks in corpus_strategy()) {
        let table = norm_table();
        let (_, store) = build_store(&picks);
        let selection = MetricSelection::new(&table, &["conc_mean", "conc_sd"]).expect("metrics exist");

        let joined = join_norms(&store, &table, &selection);

        prop_assert_eq!(joined.tokens().len(), store.len());
        for (joined_token, token) in joined.tokens().iter().zip(store.tokens()) {
            prop_assert_eq!(&joined_token.token, token);
            prop_assert_eq!(joined_token.metrics.len(), 2);
        }
    }

    #[test]
    fn coverage_is_bounded_and_consistent_with_mean(picks in corpus_strategy()) {
        let table = norm_table();
        let (_, store) = build_store(&picks);
        let selection = MetricSelection::new(&table, &["conc_mean", "conc_sd"]).expect("metrics exist");
        let joined = join_norms(&store, &table, &selection);
        let aggregator = Aggregator::default();

        let full = aggregator.summarize_full(&joined, &[]).expect("no sentiment rows");
        let content = aggregator.summarize_content(&joined);

        for summary in full.rows().iter().chain(content.rows()) {
            for metric in &summary.metrics {
                match metric.coverage {
                    None => {
                        prop_assert_eq!(summary.word_count, 0);
                        prop_assert_eq!(metric.mean, None);
                    }
                    Some(coverage) => {
                        prop_assert!((0.0..=1.0).contains(&coverage));
                        if coverage == 0.0 {
                            prop_assert_eq!(metric.mean, None);
                        } else {
                            prop_assert!(metric.mean.is_some());
                        }
                        if coverage == 1.0 {
                            prop_assert_eq!(metric.rated, summary.word_count);
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn removing_stopwords_never_adds_tokens(picks in corpus_strategy()) {
        let table = norm_table();
        let (documents, store) = build_store(&picks);
        let selection = MetricSelection::new(&table, &["conc_mean"]).expect("metric exists");
        let joined = join_norms(&store, &table, &selection);
        let aggregator = Aggregator::default();

        let full = aggregator.summarize_full(&joined, &[]).expect("no sentiment rows");
        let content = aggregator.summarize_content(&joined);

        for document in &documents {
            let with = full.get(&document.id).expect("row per document");
            let without = content.get(&document.id).expect("row per document");
            let has_stopwords = store
                .tokens_for(&document.id)
                .any(|t| t.is_stopword && !t.is_excluded());

            prop_assert!(without.word_count <= with.word_count);
            prop_assert_eq!(without.word_count == with.word_count, !has_stopwords);
            prop_assert!(without.sentiment.is_none());
        }
    }
}
