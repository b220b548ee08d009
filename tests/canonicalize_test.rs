//! Integration tests for norm loading and canonicalization

use lexnorm::error::LexnormError;
use lexnorm::export::{ExportFormat, Exporter};
use lexnorm::norms::{canonicalize, NormSource, Study};

fn csv_source(study: Study, data: &str) -> NormSource {
    NormSource::from_reader(study, study.name(), data.as_bytes(), b',').expect("valid table")
}

fn tsv_source(study: Study, data: &str) -> NormSource {
    NormSource::from_reader(study, study.name(), data.as_bytes(), b'\t').expect("valid table")
}

#[test]
fn test_flagged_duplicate_is_nulled_before_merge() {
    let conc = csv_source(Study::Concreteness, "Word,Conc.M,Conc.SD\ncat,4.0,0.5\n");
    let cp_flagged = csv_source(Study::ClarkPaivio, "word,aoa,pym\ncat,3.0,1\n");
    let cp_plain = csv_source(Study::ClarkPaivio, "word,aoa,pym\ncat,5.0,0\n");

    let table = canonicalize(&[conc, cp_flagged, cp_plain]).expect("no conflict after nulling");

    assert_eq!(table.value("cat", "conc_mean"), Some(4.0));
    assert_eq!(table.value("cat", "cp_aoa"), Some(5.0));
    assert_eq!(table.stats().rows_nulled, 1);
    assert_eq!(table.len(), 1);
}

#[test]
fn test_flag_alone_does_not_null_a_unique_word() {
    let cp = csv_source(Study::ClarkPaivio, "word,aoa,pym\nboat,2.5,yes\n");
    let table = canonicalize(&[cp]).expect("merges");
    assert_eq!(table.value("boat", "cp_aoa"), Some(2.5));
    assert_eq!(table.stats().rows_nulled, 0);
}

#[test]
fn test_conflicting_values_are_a_data_integrity_error() {
    let first = csv_source(Study::Aoa, "Word,Rating.Mean\ncat,3.1\n");
    let second = csv_source(Study::Aoa, "Word,Rating.Mean\nCAT,3.4\n");

    let err = canonicalize(&[first, second]).unwrap_err();
    match err {
        LexnormError::DataIntegrity { word, column, .. } => {
            assert_eq!(word, "cat");
            assert_eq!(column, "aoa_mean");
        }
        other => panic!("expected a data integrity error, got {other:?}"),
    }
}

#[test]
fn test_missing_word_column_is_a_schema_error() {
    let err = NormSource::from_reader(
        Study::Socialness,
        "social.csv",
        "term,mean\ncat,2.0\n".as_bytes(),
        b',',
    )
    .unwrap_err();
    assert!(matches!(err, LexnormError::Schema(_)));
}

#[test]
fn test_generic_column_names_are_namespaced() {
    let conc = csv_source(Study::Concreteness, "word,mean,sd\ncat,4.9,0.3\n");
    let soc = csv_source(Study::Socialness, "word,mean,sd\ncat,1.2,0.8\n");

    let table = canonicalize(&[conc, soc]).expect("no collision");

    assert_eq!(table.value("cat", "conc_mean"), Some(4.9));
    assert_eq!(table.value("cat", "soc_mean"), Some(1.2));
    assert_eq!(table.value("cat", "soc_sd"), Some(0.8));
}

#[test]
fn test_fallback_prefix_for_unlisted_columns() {
    let cp = csv_source(
        Study::ClarkPaivio,
        "word,imagery,new measure,freq_kf,pym\ncat,6.1,2,30,0\n",
    );
    let table = canonicalize(&[cp]).expect("merges");

    assert!(table.column_index("cp_imagery").is_some());
    assert!(table.column_index("cp_new_measure").is_some());
    // already namespaced, kept as is
    assert!(table.column_index("freq_kf").is_some());
    assert!(table.column_index("cp_pym").is_none());
}

#[test]
fn test_strict_sources_drop_unlisted_columns() {
    let conc = csv_source(Study::Concreteness, "word,conc.m,dom_pos\ncat,4.9,Noun\n");
    let table = canonicalize(&[conc]).expect("merges");
    assert_eq!(table.columns(), &["conc_mean".to_string()]);
}

#[test]
fn test_rows_without_a_word_are_skipped() {
    let aoa = tsv_source(Study::Aoa, "Word\tRating.Mean\n\t4.0\ndog\t2.9\n");
    let table = canonicalize(&[aoa]).expect("merges");
    assert_eq!(table.len(), 1);
    assert_eq!(table.stats().rows_skipped, 1);
    assert_eq!(table.stats().rows_read, 2);
}

#[test]
fn test_missing_markers_and_unrated_words() {
    let freq = csv_source(
        Study::Frequency,
        "Word,Lg10WF,Zipf-value\ncat,3.2,NA\nzorp,#N/A,n/a\n",
    );
    let table = canonicalize(&[freq]).expect("merges");

    assert_eq!(table.value("cat", "freq_lg10wf"), Some(3.2));
    assert_eq!(table.value("cat", "freq_zipf"), None);
    assert!(table.contains("zorp"));
    assert_eq!(table.value("zorp", "freq_lg10wf"), None);
}

#[test]
fn test_words_that_look_like_missing_markers_are_kept() {
    let conc = csv_source(Study::Concreteness, "word,conc.m\nnone,1.9\nnull,2.1\n");
    let table = canonicalize(&[conc]).expect("merges");
    assert_eq!(table.value("none", "conc_mean"), Some(1.9));
    assert_eq!(table.value("null", "conc_mean"), Some(2.1));
    assert_eq!(table.stats().rows_skipped, 0);
}

#[test]
fn test_same_column_from_two_studies_is_a_schema_error() {
    let conc = csv_source(Study::Concreteness, "word,conc.m\ncat,4.9\n");
    let canonical = csv_source(Study::Canonical, "word,conc_mean\ndog,4.8\n");
    let err = canonicalize(&[conc, canonical]).unwrap_err();
    assert!(matches!(err, LexnormError::Schema(_)));
}

#[test]
fn test_exported_table_reads_back_identically() {
    let conc = csv_source(Study::Concreteness, "word,conc.m,conc.sd\ncat,4.9,0.3\nidea,1.6,\n");
    let aoa = csv_source(Study::Aoa, "word,rating.mean\ncat,3.1\n");
    let table = canonicalize(&[conc, aoa]).expect("merges");

    let mut out = Vec::new();
    Exporter::new(ExportFormat::Csv, "NA")
        .write_canonical(&mut out, &table)
        .expect("writes");
    let reread = canonicalize(&[NormSource::from_reader(
        Study::Canonical,
        "canonical_norms.csv",
        out.as_slice(),
        b',',
    )
    .expect("valid export")])
    .expect("merges");

    assert_eq!(reread.columns(), table.columns());
    assert_eq!(
        reread.iter().collect::<Vec<_>>(),
        table.iter().collect::<Vec<_>>()
    );
}

#[test]
fn test_fallback_column_can_be_selected() {
    use lexnorm::join::MetricSelection;

    let cp = csv_source(Study::ClarkPaivio, "word,vividness.m,pym\ncat,5.5,0\n");
    let table = canonicalize(&[cp]).expect("merges");

    let selection = MetricSelection::new(&table, &["cp_vividness.m"]).expect("column exists");
    assert_eq!(selection.names(), &["cp_vividness.m".to_string()]);
    assert_eq!(table.value("cat", "cp_vividness.m"), Some(5.5));
}
