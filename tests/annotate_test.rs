//! Tests for the built-in annotator and sentiment scorer

use lexnorm::annotate::{Annotator, LexiconSentiment, RuleAnnotator, SentimentScorer, WORD_TAG};
use lexnorm::corpus::{CorpusTokenStore, Document, PosTag};
use lexnorm::stopwords::StopwordList;

#[test]
fn test_annotator_creation() {
    assert!(RuleAnnotator::new().is_ok());
    assert!(LexiconSentiment::new().is_ok());
}

#[test]
fn test_sentence_splitting() {
    let annotator = RuleAnnotator::new().expect("regexes compile");
    let sentences = annotator.sentences("\"Stop!\" she said. He didn't… Then: silence?");
    assert_eq!(sentences, vec!["\"Stop!\"", "she said.", "He didn't…", "Then: silence?"]);
}

#[test]
fn test_tokenization_keeps_contractions_and_hyphens() {
    let annotator = RuleAnnotator::new().expect("regexes compile");
    let tokens: Vec<String> = annotator
        .tokenize("Don't over-think it, 3,000 times.")
        .into_iter()
        .map(|(token, _)| token)
        .collect();
    assert_eq!(
        tokens,
        vec!["Don't", "over-think", "it", ",", "3,000", "times", "."]
    );
}

#[test]
fn test_annotator_output_fits_the_token_store() {
    let annotator = RuleAnnotator::new().expect("regexes compile");
    let docs = vec![
        Document::new("a", "The cat sat. It purred 2 times!"),
        Document::new("b", ""),
    ];
    let tokens = annotator.annotate(&docs).expect("annotates");
    let store = CorpusTokenStore::build(&docs, tokens, &StopwordList::english()).expect("builds");

    let a: Vec<_> = store.tokens_for("a").collect();
    assert_eq!(a.len(), 9);
    assert_eq!(a[0].tag.as_str(), WORD_TAG);
    assert!(a[3].tag.is_punctuation());
    assert_eq!(a[4].sentence_id, 2);
    assert_eq!(a[6].tag.as_str(), PosTag::NUM);
    assert_eq!(store.tokens_for("b").count(), 0);
}

#[test]
fn test_control_characters_are_stripped_before_tokenizing() {
    let annotator = RuleAnnotator::new().expect("regexes compile");
    let docs = vec![Document::new("a", "cat\u{0}dog")];
    let tokens = annotator.annotate(&docs).expect("annotates");
    assert_eq!(tokens.len(), 1);
    assert_eq!(tokens[0].token, "catdog");
}

#[test]
fn test_sentiment_polarity() {
    let scorer = LexiconSentiment::new().expect("builds");
    let (positive, _) = scorer.sentence_scores("This is great and amazing!");
    let (negative, _) = scorer.sentence_scores("This is terrible and awful!");
    let (neutral, _) = scorer.sentence_scores("The sky is blue and the grass is green");

    assert!(positive[0] > 0.0);
    assert!(negative[0] < 0.0);
    assert_eq!(neutral[0], 0.0);
}

#[test]
fn test_intensifier_scales_sentiment() {
    let scorer = LexiconSentiment::new().expect("builds");
    let (plain, _) = scorer.sentence_scores("it was good");
    let (intense, _) = scorer.sentence_scores("it was very good");
    assert!(intense[0] > plain[0]);
}

#[test]
fn test_document_sentiment_statistics() {
    let scorer = LexiconSentiment::new().expect("builds");
    let docs = vec![
        Document::new("one", "Great."),
        Document::new("two", "Great. Awful."),
        Document::new("none", "!!! 42"),
    ];
    let scored = scorer.score(&docs).expect("scores");

    assert_eq!(scored.len(), 2);
    assert_eq!(scored[0].document_id, "one");
    assert_eq!(scored[0].sd, None);
    assert_eq!(scored[0].word_count, 1);
    assert_eq!(scored[1].document_id, "two");
    assert!(scored[1].sd.is_some_and(|sd| sd > 0.0));
}
