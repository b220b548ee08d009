//! Raw norm tables and the static registry of the studies they come from.
//!
//! Every study has a fixed [`SourceSpec`]: which header carries the word, how
//! each raw column is renamed into the canonical namespace, and which column
//! (if any) flags rows duplicated from an earlier norm set. Renaming is never
//! inferred from header patterns beyond what a source spec spells out.

use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{LexnormError, Result};

/// Separator between a study prefix and a metric name (`conc_mean`).
pub const NAMESPACE_SEPARATOR: char = '_';

/// The lexical studies a norm table can come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Study {
    /// Brysbaert, Warriner & Kuperman concreteness ratings
    Concreteness,
    /// Diveica, Pexman & Binney socialness ratings
    Socialness,
    /// Brysbaert et al. word prevalence
    Prevalence,
    /// SUBTLEX-US frequency counts
    Frequency,
    /// Kuperman et al. age-of-acquisition ratings
    Aoa,
    /// Glasgow norms (Scott et al.)
    Glasgow,
    /// Clark & Paivio extended norms, with the PYM duplicate flag
    ClarkPaivio,
    /// A previously exported canonical table, read back unchanged
    Canonical,
}

impl Study {
    /// Every study in the registry.
    pub const ALL: [Self; 8] = [
        Self::Concreteness,
        Self::Socialness,
        Self::Prevalence,
        Self::Frequency,
        Self::Aoa,
        Self::Glasgow,
        Self::ClarkPaivio,
        Self::Canonical,
    ];

    /// Configuration name of the study.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Concreteness => "concreteness",
            Self::Socialness => "socialness",
            Self::Prevalence => "prevalence",
            Self::Frequency => "frequency",
            Self::Aoa => "aoa",
            Self::Glasgow => "glasgow",
            Self::ClarkPaivio => "clark_paivio",
            Self::Canonical => "canonical",
        }
    }

    /// Static reading instructions for this study.
    #[must_use]
    pub fn spec(self) -> &'static SourceSpec {
        match self {
            Self::Concreteness => &CONCRETENESS,
            Self::Socialness => &SOCIALNESS,
            Self::Prevalence => &PREVALENCE,
            Self::Frequency => &FREQUENCY,
            Self::Aoa => &AOA,
            Self::Glasgow => &GLASGOW,
            Self::ClarkPaivio => &CLARK_PAIVIO,
            Self::Canonical => &CANONICAL,
        }
    }
}

impl fmt::Display for Study {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Study {
    type Err = LexnormError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_lowercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|study| study.name() == wanted)
            .ok_or_else(|| {
                LexnormError::InvalidConfig(format!(
                    "Unknown study: {s}. Must be one of: {:?}",
                    Self::ALL.map(Self::name)
                ))
            })
    }
}

/// What happens to a raw column the source spec does not list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnPolicy {
    /// Unlisted columns are dropped.
    Strict,
    /// Unlisted columns are kept as `<prefix>_<raw>`, unless the raw name
    /// already contains the namespace separator.
    Fallback,
    /// Column names are kept as they are.
    Passthrough,
}

/// One canonical column and the raw headers (lowercased) it can appear under.
#[derive(Debug)]
pub struct ColumnMapping {
    /// Accepted raw header spellings
    pub aliases: &'static [&'static str],
    /// Canonical, namespaced column name
    pub canonical: &'static str,
}

const fn map(aliases: &'static [&'static str], canonical: &'static str) -> ColumnMapping {
    ColumnMapping { aliases, canonical }
}

/// Static description of how one study's table is read.
#[derive(Debug)]
pub struct SourceSpec {
    /// Study this spec belongs to
    pub study: Study,
    /// Namespace prefix for the study's metrics
    pub prefix: &'static str,
    /// Header of the word column
    pub word_column: &'static str,
    /// Header of the alternative word column, unioned with the primary one
    pub secondary_word_column: Option<&'static str>,
    /// Explicit renames
    pub columns: &'static [ColumnMapping],
    /// Handling of unlisted columns
    pub policy: ColumnPolicy,
    /// Header of the "also present in an earlier norm set" flag
    pub duplicate_flag: Option<&'static str>,
}

impl SourceSpec {
    /// Canonical column name for a lowercased raw header, or `None` if the
    /// column is a key column or is dropped.
    #[must_use]
    pub fn canonical_name(&self, raw: &str) -> Option<String> {
        if self.is_key_column(raw) {
            return None;
        }
        if let Some(mapping) = self.columns.iter().find(|m| m.aliases.contains(&raw)) {
            return Some(mapping.canonical.to_string());
        }
        match self.policy {
            ColumnPolicy::Strict => None,
            ColumnPolicy::Passthrough => Some(raw.to_string()),
            ColumnPolicy::Fallback if raw.contains(NAMESPACE_SEPARATOR) => Some(raw.to_string()),
            ColumnPolicy::Fallback => Some(format!(
                "{}{NAMESPACE_SEPARATOR}{}",
                self.prefix,
                raw.split_whitespace().collect::<Vec<_>>().join("_")
            )),
        }
    }

    /// Whether a header is the word column, the secondary word column or the
    /// duplicate flag.
    #[must_use]
    pub fn is_key_column(&self, raw: &str) -> bool {
        raw == self.word_column
            || self.secondary_word_column == Some(raw)
            || self.duplicate_flag == Some(raw)
    }
}

static CONCRETENESS: SourceSpec = SourceSpec {
    study: Study::Concreteness,
    prefix: "conc",
    word_column: "word",
    secondary_word_column: None,
    columns: &[
        map(&["conc.m", "mean"], "conc_mean"),
        map(&["conc.sd", "sd"], "conc_sd"),
        map(&["unknown"], "conc_unknown"),
        map(&["total"], "conc_total"),
        map(&["percent_known"], "conc_percent_known"),
        map(&["subtlex"], "conc_subtlex"),
        map(&["bigram"], "conc_bigram"),
    ],
    policy: ColumnPolicy::Strict,
    duplicate_flag: None,
};

static SOCIALNESS: SourceSpec = SourceSpec {
    study: Study::Socialness,
    prefix: "soc",
    word_column: "word",
    secondary_word_column: None,
    columns: &[
        map(&["mean"], "soc_mean"),
        map(&["sd"], "soc_sd"),
        map(&["n"], "soc_n"),
    ],
    policy: ColumnPolicy::Strict,
    duplicate_flag: None,
};

static PREVALENCE: SourceSpec = SourceSpec {
    study: Study::Prevalence,
    prefix: "prev",
    word_column: "word",
    secondary_word_column: None,
    columns: &[
        map(&["pknown"], "prev_pknown"),
        map(&["nobs"], "prev_nobs"),
        map(&["prevalence"], "prev_prevalence"),
        map(&["freqzipfus"], "prev_freq_zipf_us"),
    ],
    policy: ColumnPolicy::Strict,
    duplicate_flag: None,
};

static FREQUENCY: SourceSpec = SourceSpec {
    study: Study::Frequency,
    prefix: "freq",
    word_column: "word",
    secondary_word_column: None,
    columns: &[
        map(&["freqcount"], "freq_count"),
        map(&["cdcount"], "freq_cd_count"),
        map(&["subtlwf"], "freq_per_million"),
        map(&["lg10wf"], "freq_lg10wf"),
        map(&["subtlcd"], "freq_cd_percent"),
        map(&["lg10cd"], "freq_lg10cd"),
        map(&["zipf-value", "zipf"], "freq_zipf"),
    ],
    policy: ColumnPolicy::Strict,
    duplicate_flag: None,
};

static AOA: SourceSpec = SourceSpec {
    study: Study::Aoa,
    prefix: "aoa",
    word_column: "word",
    secondary_word_column: None,
    columns: &[
        map(&["rating.mean", "aoa_kup", "aoa"], "aoa_mean"),
        map(&["rating.sd", "aoa_kup_sd"], "aoa_sd"),
        map(&["occurtotal"], "aoa_occur_total"),
        map(&["occurnum"], "aoa_occur_num"),
        map(&["dunno"], "aoa_dunno"),
    ],
    policy: ColumnPolicy::Strict,
    duplicate_flag: None,
};

static GLASGOW: SourceSpec = SourceSpec {
    study: Study::Glasgow,
    prefix: "glas",
    word_column: "words",
    secondary_word_column: Some("word"),
    columns: &[
        map(&["length"], "glas_length"),
        map(&["arou", "arousal"], "glas_arousal"),
        map(&["val", "valence"], "glas_valence"),
        map(&["dom", "dominance"], "glas_dominance"),
        map(&["cnc", "concreteness"], "glas_concreteness"),
        map(&["imag", "imageability"], "glas_imageability"),
        map(&["fam", "familiarity"], "glas_familiarity"),
        map(&["aoa"], "glas_aoa"),
        map(&["size"], "glas_size"),
        map(&["gend", "gender"], "glas_gender"),
    ],
    policy: ColumnPolicy::Strict,
    duplicate_flag: None,
};

static CLARK_PAIVIO: SourceSpec = SourceSpec {
    study: Study::ClarkPaivio,
    prefix: "cp",
    word_column: "word",
    secondary_word_column: None,
    columns: &[
        map(&["imagery", "imag", "img"], "cp_imagery"),
        map(&["concreteness", "conc"], "cp_concreteness"),
        map(&["meaningfulness", "m"], "cp_meaningfulness"),
        map(&["familiarity", "fam"], "cp_familiarity"),
        map(&["aoa", "age of acquisition"], "cp_aoa"),
        map(&["goodness"], "cp_goodness"),
        map(&["emotionality", "emo"], "cp_emotionality"),
        map(&["pleasantness", "pls"], "cp_pleasantness"),
        map(&["letters"], "cp_letters"),
        map(&["syllables"], "cp_syllables"),
        map(&["kf", "kucera-francis"], "cp_kucera_francis"),
    ],
    policy: ColumnPolicy::Fallback,
    duplicate_flag: Some("pym"),
};

static CANONICAL: SourceSpec = SourceSpec {
    study: Study::Canonical,
    prefix: "",
    word_column: "word",
    secondary_word_column: None,
    columns: &[],
    policy: ColumnPolicy::Passthrough,
    duplicate_flag: None,
};

/// One raw rating table, before reconciliation.
#[derive(Debug, Clone)]
pub struct NormSource {
    study: Study,
    label: String,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl NormSource {
    /// Build a source from already-split cells.
    ///
    /// Headers are trimmed and lowercased. Fails with a schema error when the
    /// study's word column is absent, a header repeats, or a row's width does
    /// not match the header.
    pub fn new(
        study: Study,
        label: impl Into<String>,
        headers: Vec<String>,
        rows: Vec<Vec<String>>,
    ) -> Result<Self> {
        let label = label.into();
        let headers: Vec<String> = headers
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').trim().to_lowercase())
            .collect();

        let spec = study.spec();
        if !headers.iter().any(|h| h == spec.word_column) {
            return Err(LexnormError::schema(format!(
                "{study} table `{label}` has no `{}` column (found: {headers:?})",
                spec.word_column
            )));
        }

        for (i, header) in headers.iter().enumerate() {
            if headers[..i].contains(header) {
                return Err(LexnormError::schema(format!(
                    "{study} table `{label}` repeats the `{header}` column"
                )));
            }
        }

        if let Some((line, row)) = rows
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != headers.len())
        {
            return Err(LexnormError::schema(format!(
                "{study} table `{label}` row {} has {} cells, expected {}",
                line + 1,
                row.len(),
                headers.len()
            )));
        }

        debug!(study = %study, label = %label, rows = rows.len(), "Loaded norm source");
        Ok(Self {
            study,
            label,
            headers,
            rows,
        })
    }

    /// Read a delimited table.
    pub fn from_reader<R: Read>(
        study: Study,
        label: impl Into<String>,
        reader: R,
        delimiter: u8,
    ) -> Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = csv_reader
            .headers()?
            .iter()
            .map(ToString::to_string)
            .collect();
        let rows = csv_reader
            .records()
            .map(|record| record.map(|r| r.iter().map(ToString::to_string).collect()))
            .collect::<std::result::Result<Vec<Vec<String>>, csv::Error>>()?;

        Self::new(study, label, headers, rows)
    }

    /// Read a table from disk. Without an explicit delimiter, `.tsv` and
    /// `.txt` files are read tab-separated and everything else comma-separated.
    pub fn from_path(study: Study, path: &Path, delimiter: Option<u8>) -> Result<Self> {
        let delimiter = delimiter.unwrap_or_else(|| delimiter_for(path));
        let file = File::open(path)?;
        Self::from_reader(study, path.display().to_string(), file, delimiter)
    }

    /// Study the table belongs to.
    #[must_use]
    pub const fn study(&self) -> Study {
        self.study
    }

    /// Reading instructions of the table's study.
    #[must_use]
    pub fn spec(&self) -> &'static SourceSpec {
        self.study.spec()
    }

    /// Human-readable label, usually the file path.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Lowercased headers.
    #[must_use]
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Raw rows, aligned with [`headers`](Self::headers).
    #[must_use]
    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of a lowercased header.
    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }
}

/// Delimiter guessed from a file extension.
#[must_use]
pub fn delimiter_for(path: &Path) -> u8 {
    match path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_lowercase)
        .as_deref()
    {
        Some("tsv" | "txt" | "tab") => b'\t',
        _ => b',',
    }
}
