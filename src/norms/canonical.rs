//! Merge of raw norm tables into one word-keyed table.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;
use tracing::{debug, info, warn};

use super::source::{NormSource, Study};
use super::{is_missing, normalize_word};
use crate::error::{LexnormError, Result};

/// Flag cells that mean "not a duplicate", besides the missing markers.
const FALSE_FLAGS: [&str; 5] = ["0", "false", "no", "n", "f"];

/// Counters from one canonicalization run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MergeStats {
    /// Rows read across all sources
    pub rows_read: usize,
    /// Rows without a usable word
    pub rows_skipped: usize,
    /// Flagged duplicate rows whose study columns were nulled
    pub rows_nulled: usize,
}

/// Reconciled norms: one entry per normalized word, one nullable value per
/// canonical column.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CanonicalNormTable {
    columns: Vec<String>,
    entries: BTreeMap<String, Vec<Option<f64>>>,
    stats: MergeStats,
}

impl CanonicalNormTable {
    /// Canonical metric columns, in first-seen order.
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Position of a metric column.
    #[must_use]
    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    /// Values for a word, aligned with [`columns`](Self::columns). The word is
    /// normalized before lookup.
    #[must_use]
    pub fn get(&self, word: &str) -> Option<&[Option<f64>]> {
        self.get_normalized(&normalize_word(word))
    }

    /// Lookup for a key that is already normalized.
    #[must_use]
    pub fn get_normalized(&self, key: &str) -> Option<&[Option<f64>]> {
        self.entries.get(key).map(Vec::as_slice)
    }

    /// Single value for a word and column.
    #[must_use]
    pub fn value(&self, word: &str, column: &str) -> Option<f64> {
        let index = self.column_index(column)?;
        self.get(word).and_then(|values| values[index])
    }

    /// Whether the table has an entry for the word.
    #[must_use]
    pub fn contains(&self, word: &str) -> bool {
        self.get(word).is_some()
    }

    /// Entries in word order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Option<f64>])> {
        self.entries
            .iter()
            .map(|(word, values)| (word.as_str(), values.as_slice()))
    }

    /// Number of words.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table has no words.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Counters from the run that built this table.
    #[must_use]
    pub const fn stats(&self) -> MergeStats {
        self.stats
    }

    /// The table as a raw source of the passthrough `canonical` study, so an
    /// exported table can be read back through the same merge.
    pub fn to_source(&self, label: impl Into<String>) -> Result<NormSource> {
        let mut headers = Vec::with_capacity(self.columns.len() + 1);
        headers.push("word".to_string());
        headers.extend(self.columns.iter().cloned());

        let rows = self
            .iter()
            .map(|(word, values)| {
                std::iter::once(word.to_string())
                    .chain(
                        values
                            .iter()
                            .map(|v| v.map(|v| v.to_string()).unwrap_or_default()),
                    )
                    .collect()
            })
            .collect();

        NormSource::new(Study::Canonical, label, headers, rows)
    }
}

/// One source row after key resolution: word plus (canonical column, raw cell).
struct KeyedRow<'a> {
    word: String,
    study: Study,
    flagged: bool,
    cells: Vec<(usize, &'a str)>,
}

/// Where each raw column of a source lands in the canonical table.
struct ColumnPlan {
    targets: Vec<(usize, usize)>,
    word: usize,
    secondary_word: Option<usize>,
    flag: Option<usize>,
}

/// Merge raw norm sources into a [`CanonicalNormTable`].
///
/// Rows flagged as duplicates of an earlier norm set (the Clark & Paivio
/// `pym` column) have their study's columns nulled when the same word occurs
/// in another row, before rows are grouped by word. Within a group the
/// distinct non-missing values of each column are joined with a space and
/// cast to a number; anything that does not cast is a data integrity error
/// naming the word and column.
pub fn canonicalize(sources: &[NormSource]) -> Result<CanonicalNormTable> {
    let mut columns: Vec<String> = Vec::new();
    let mut owners: HashMap<String, Study> = HashMap::new();
    let mut plans = Vec::with_capacity(sources.len());

    for source in sources {
        plans.push(plan_columns(source, &mut columns, &mut owners)?);
    }

    let mut stats = MergeStats::default();
    let mut keyed: Vec<KeyedRow<'_>> = Vec::new();
    for (source, plan) in sources.iter().zip(&plans) {
        for (line, row) in source.rows().iter().enumerate() {
            stats.rows_read += 1;
            let Some(word) = resolve_word(source, plan, row, line)? else {
                stats.rows_skipped += 1;
                continue;
            };
            let flagged = plan.flag.is_some_and(|i| is_flag_set(&row[i]));
            let cells = plan
                .targets
                .iter()
                .map(|&(raw, canonical)| (canonical, row[raw].as_str()))
                .filter(|(_, value)| !is_missing(value))
                .collect();
            keyed.push(KeyedRow {
                word,
                study: source.study(),
                flagged,
                cells,
            });
        }
    }

    // a flagged row only competes with rows of its own study; other studies
    // fill disjoint columns
    let mut occurrences: HashMap<(&str, Study), usize> = HashMap::new();
    for row in &keyed {
        *occurrences.entry((row.word.as_str(), row.study)).or_default() += 1;
    }

    // word -> per column, distinct raw values in row order
    let mut grouped: BTreeMap<&str, Vec<Vec<&str>>> = BTreeMap::new();
    for row in &keyed {
        let cells = grouped
            .entry(row.word.as_str())
            .or_insert_with(|| vec![Vec::new(); columns.len()]);

        if row.flagged && occurrences[&(row.word.as_str(), row.study)] > 1 {
            debug!(word = %row.word, "Nulling flagged duplicate row");
            stats.rows_nulled += 1;
            continue;
        }

        for &(column, value) in &row.cells {
            let value = value.trim();
            if !cells[column].iter().any(|seen| same_value(seen, value)) {
                cells[column].push(value);
            }
        }
    }

    let mut entries = BTreeMap::new();
    for (word, cells) in grouped {
        let values = cells
            .iter()
            .enumerate()
            .map(|(column, parts)| cast_cell(word, &columns[column], parts))
            .collect::<Result<Vec<_>>>()?;
        entries.insert(word.to_string(), values);
    }

    if stats.rows_skipped > 0 {
        warn!(
            rows_skipped = stats.rows_skipped,
            "Norm rows without a word were skipped"
        );
    }
    info!(
        sources = sources.len(),
        rows_read = stats.rows_read,
        rows_nulled = stats.rows_nulled,
        words = entries.len(),
        columns = columns.len(),
        "Canonical norm table built"
    );

    Ok(CanonicalNormTable {
        columns,
        entries,
        stats,
    })
}

fn plan_columns(
    source: &NormSource,
    columns: &mut Vec<String>,
    owners: &mut HashMap<String, Study>,
) -> Result<ColumnPlan> {
    let spec = source.spec();
    let study = source.study();
    let mut targets = Vec::new();
    let mut claimed: HashMap<String, &str> = HashMap::new();

    for (raw_index, raw) in source.headers().iter().enumerate() {
        let Some(canonical) = spec.canonical_name(raw) else {
            if !spec.is_key_column(raw) {
                debug!(study = %study, column = %raw, "Dropping unmapped norm column");
            }
            continue;
        };

        if let Some(previous) = claimed.insert(canonical.clone(), raw) {
            return Err(LexnormError::schema(format!(
                "columns `{previous}` and `{raw}` of `{}` both map to `{canonical}`",
                source.label()
            )));
        }

        match owners.get(&canonical) {
            Some(owner) if *owner != study => {
                return Err(LexnormError::schema(format!(
                    "column `{canonical}` is produced by both {owner} and {study}"
                )));
            }
            Some(_) => {}
            None => {
                owners.insert(canonical.clone(), study);
                columns.push(canonical.clone());
            }
        }

        let canonical_index = columns
            .iter()
            .position(|c| *c == canonical)
            .ok_or_else(|| LexnormError::schema(format!("column `{canonical}` was not registered")))?;
        targets.push((raw_index, canonical_index));
    }

    let word = source.column_index(spec.word_column).ok_or_else(|| {
        LexnormError::schema(format!(
            "{study} table `{}` has no `{}` column",
            source.label(),
            spec.word_column
        ))
    })?;

    Ok(ColumnPlan {
        targets,
        word,
        secondary_word: spec
            .secondary_word_column
            .and_then(|name| source.column_index(name)),
        flag: spec.duplicate_flag.and_then(|name| source.column_index(name)),
    })
}

/// Union of the primary and secondary word columns.
fn resolve_word(
    source: &NormSource,
    plan: &ColumnPlan,
    row: &[String],
    line: usize,
) -> Result<Option<String>> {
    // "none" and "null" are words too; only blank keys are missing
    let primary = Some(row[plan.word].as_str()).filter(|w| !w.trim().is_empty());
    let secondary = plan
        .secondary_word
        .map(|i| row[i].as_str())
        .filter(|w| !w.trim().is_empty());

    match (primary, secondary) {
        (Some(first), Some(second)) => Err(LexnormError::integrity(
            first.trim(),
            source.spec().secondary_word_column.unwrap_or_default(),
            format!(
                "row {} of `{}` populates both word columns (`{}` and `{}`)",
                line + 1,
                source.label(),
                first.trim(),
                second.trim()
            ),
        )),
        (Some(word), None) | (None, Some(word)) => Ok(Some(normalize_word(word))),
        (None, None) => {
            debug!(source = %source.label(), row = line + 1, "Norm row has no word");
            Ok(None)
        }
    }
}

fn is_flag_set(cell: &str) -> bool {
    let cell = cell.trim();
    !is_missing(cell) && !FALSE_FLAGS.iter().any(|f| cell.eq_ignore_ascii_case(f))
}

/// `3` and `3.0` are the same rating; text that does not parse only matches itself.
#[allow(clippy::float_cmp)]
fn same_value(a: &str, b: &str) -> bool {
    match (a.parse::<f64>(), b.parse::<f64>()) {
        (Ok(x), Ok(y)) => x == y,
        _ => a == b,
    }
}

fn cast_cell(word: &str, column: &str, parts: &[&str]) -> Result<Option<f64>> {
    if parts.is_empty() {
        return Ok(None);
    }
    let merged = parts.join(" ");
    match merged.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(Some(value)),
        Ok(_) => Err(LexnormError::integrity(
            word,
            column,
            format!("value `{merged}` is not finite"),
        )),
        Err(_) if parts.len() > 1 => Err(LexnormError::integrity(
            word,
            column,
            format!("conflicting values `{merged}` after merging duplicate rows"),
        )),
        Err(_) => Err(LexnormError::integrity(
            word,
            column,
            format!("cannot parse `{merged}` as a number"),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(study: Study, headers: &[&str], rows: &[&[&str]]) -> NormSource {
        NormSource::new(
            study,
            study.name(),
            headers.iter().map(ToString::to_string).collect(),
            rows.iter()
                .map(|r| r.iter().map(ToString::to_string).collect())
                .collect(),
        )
        .expect("valid source")
    }

    #[test]
    fn test_flagged_duplicate_is_nulled_before_merge() {
        let conc = source(Study::Concreteness, &["word", "conc.m"], &[&["cat", "4.0"]]);
        let flagged = source(Study::ClarkPaivio, &["word", "aoa", "pym"], &[&["cat", "3.0", "1"]]);
        let kept = source(Study::ClarkPaivio, &["word", "aoa", "pym"], &[&["Cat", "5.0", "0"]]);

        let table = canonicalize(&[conc, flagged, kept]).expect("merge succeeds");

        assert_eq!(table.len(), 1);
        assert_eq!(table.value("cat", "conc_mean"), Some(4.0));
        assert_eq!(table.value("cat", "cp_aoa"), Some(5.0));
        assert_eq!(table.stats().rows_nulled, 1);
    }

    #[test]
    fn test_flag_kept_for_words_seen_once() {
        let cp = source(Study::ClarkPaivio, &["word", "aoa", "pym"], &[&["dog", "2.5", "1"]]);
        let table = canonicalize(&[cp]).expect("merge succeeds");
        assert_eq!(table.value("dog", "cp_aoa"), Some(2.5));
        assert_eq!(table.stats().rows_nulled, 0);
    }

    #[test]
    fn test_conflicting_values_are_integrity_error() {
        let a = source(Study::Aoa, &["word", "rating.mean"], &[&["cat", "3.0"], &["cat", "5.0"]]);
        let err = canonicalize(&[a]).unwrap_err();
        match err {
            LexnormError::DataIntegrity { word, column, .. } => {
                assert_eq!(word, "cat");
                assert_eq!(column, "aoa_mean");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_flag_ignores_rows_of_other_studies() {
        let conc = source(Study::Concreteness, &["word", "conc.m"], &[&["cat", "4.0"]]);
        let cp = source(Study::ClarkPaivio, &["word", "aoa", "pym"], &[&["cat", "5.0", "1"]]);

        let table = canonicalize(&[conc, cp]).expect("merge succeeds");

        assert_eq!(table.value("cat", "conc_mean"), Some(4.0));
        assert_eq!(table.value("cat", "cp_aoa"), Some(5.0));
        assert_eq!(table.stats().rows_nulled, 0);
    }

    #[test]
    fn test_numerically_equal_duplicates_merge() {
        let a = source(
            Study::Aoa,
            &["word", "rating.mean"],
            &[&["cat", "3"], &["cat", "3.0"], &["dog", "4"], &["dog", "4.00"]],
        );
        let table = canonicalize(&[a]).expect("merge succeeds");
        assert_eq!(table.value("cat", "aoa_mean"), Some(3.0));
        assert_eq!(table.value("dog", "aoa_mean"), Some(4.0));
    }

    #[test]
    fn test_identical_duplicates_merge_cleanly() {
        let a = source(Study::Aoa, &["word", "rating.mean"], &[&["cat", "3.0"], &["CAT", "3.0"]]);
        let table = canonicalize(&[a]).expect("merge succeeds");
        assert_eq!(table.value("cat", "aoa_mean"), Some(3.0));
    }

    #[test]
    fn test_non_numeric_residue_is_integrity_error() {
        let a = source(Study::Socialness, &["word", "mean"], &[&["cat", "high"]]);
        assert!(matches!(
            canonicalize(&[a]),
            Err(LexnormError::DataIntegrity { .. })
        ));
    }

    #[test]
    fn test_secondary_word_column_is_unioned() {
        let glasgow = source(
            Study::Glasgow,
            &["words", "word", "imag"],
            &[&["apple", "", "6.1"], &["", "Pear", "5.9"]],
        );
        let table = canonicalize(&[glasgow]).expect("merge succeeds");
        assert_eq!(table.value("apple", "glas_imageability"), Some(6.1));
        assert_eq!(table.value("pear", "glas_imageability"), Some(5.9));
    }

    #[test]
    fn test_both_word_columns_populated_is_integrity_error() {
        let glasgow = source(
            Study::Glasgow,
            &["words", "word", "imag"],
            &[&["bank", "bank (money)", "4.0"]],
        );
        assert!(matches!(
            canonicalize(&[glasgow]),
            Err(LexnormError::DataIntegrity { .. })
        ));
    }

    #[test]
    fn test_missing_markers_stay_missing() {
        let soc = source(Study::Socialness, &["word", "mean", "sd"], &[&["cat", "NA", "0.4"]]);
        let table = canonicalize(&[soc]).expect("merge succeeds");
        assert_eq!(table.value("cat", "soc_mean"), None);
        assert_eq!(table.value("cat", "soc_sd"), Some(0.4));
    }

    #[test]
    fn test_same_canonical_column_from_two_aliases_is_schema_error() {
        let conc = source(Study::Concreteness, &["word", "conc.m", "mean"], &[&["cat", "4", "4"]]);
        assert!(matches!(canonicalize(&[conc]), Err(LexnormError::Schema(_))));
    }

    #[test]
    fn test_round_trip_through_canonical_source() {
        let conc = source(Study::Concreteness, &["word", "conc.m"], &[&["cat", "4.12"], &["dog", ""]]);
        let table = canonicalize(&[conc]).expect("merge succeeds");
        let again = canonicalize(&[table.to_source("again").expect("valid source")])
            .expect("merge succeeds");
        assert_eq!(again.columns(), table.columns());
        assert_eq!(again.iter().collect::<Vec<_>>(), table.iter().collect::<Vec<_>>());
    }
}
