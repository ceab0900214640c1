//! Dataset registry
//!
//! Static catalogue of every dataset in a registry export: the file-name
//! prefix that identifies its files, the field separator, whether a header row
//! is present and whether one id can own several rows ("cumulative").
//!
//! Each descriptor also owns the 3-letter code used to build join store keys
//! and, for cumulative datasets, the ordinal counter that keeps those keys
//! unique. A registry instance is scoped to one run.

use crate::error::{Result, TransformError};
use std::sync::atomic::{AtomicU64, Ordering};

pub const CNAES: &str = "cna";
pub const EMPRESAS: &str = "emp";
pub const IMUNES_E_ISENTAS: &str = "imu";
pub const LUCRO_ARBITRADO: &str = "arb";
pub const LUCRO_PRESUMIDO: &str = "pre";
pub const LUCRO_REAL: &str = "rea";
pub const MOTIVOS: &str = "mot";
pub const MUNICIPIOS: &str = "mun";
pub const NATUREZAS: &str = "nat";
pub const PAISES: &str = "pai";
pub const QUALIFICACOES: &str = "qua";
pub const SIMPLES: &str = "sim";
pub const SOCIOS: &str = "soc";
pub const TABMUN: &str = "tab";
pub const ESTABELECIMENTOS: &str = "est";

/// The four tax-regime datasets, merged into one history per registrant
pub const TAX_REGIMES: [&str; 4] = [LUCRO_ARBITRADO, IMUNES_E_ISENTAS, LUCRO_PRESUMIDO, LUCRO_REAL];

/// Key separator between id, dataset code and ordinal
pub const KEY_SEPARATOR: &str = "::";

/// Digits of a cumulative key ordinal; zero-padded so key order is numeric order
pub const ORDINAL_WIDTH: usize = 10;

/// Which column holds the id a row is keyed by
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyColumn {
    /// Column 0 is the id, every other column is the value
    Leading,
    /// Column `n` holds a (punctuated) full id reduced to its 8-digit base;
    /// the value is every other column, in order
    TaxpayerBase(usize),
}

/// Descriptor of one source dataset
#[derive(Debug)]
pub struct Dataset {
    pub prefix: &'static str,
    pub code: &'static str,
    pub separator: u8,
    pub has_header: bool,
    pub is_cumulative: bool,
    pub key_column: KeyColumn,
    counter: AtomicU64,
}

impl Dataset {
    fn new(prefix: &'static str, separator: u8, has_header: bool, is_cumulative: bool) -> Self {
        Self {
            prefix,
            code: code_for(prefix),
            separator,
            has_header,
            is_cumulative,
            key_column: KeyColumn::Leading,
            counter: AtomicU64::new(0),
        }
    }

    fn keyed_by(mut self, key_column: KeyColumn) -> Self {
        self.key_column = key_column;
        self
    }

    /// Join store key for a new row of this dataset
    ///
    /// Cumulative datasets draw the next ordinal from the descriptor's
    /// counter, so two calls never return the same key. Ordinals follow call
    /// order, so callers that need reproducible keys must call in a fixed
    /// order (the loader reads a cumulative dataset's files one after another).
    pub fn key_for(&self, id: &str) -> String {
        if self.is_cumulative {
            let ordinal = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
            format!(
                "{id}{sep}{}{sep}{ordinal:0width$}",
                self.code,
                sep = KEY_SEPARATOR,
                width = ORDINAL_WIDTH
            )
        } else {
            self.lookup_key(id)
        }
    }

    /// Exact key for a point lookup on a non-cumulative dataset
    pub fn lookup_key(&self, id: &str) -> String {
        format!("{id}{KEY_SEPARATOR}{}", self.code)
    }

    /// Key prefix covering every row of `id` in this dataset
    pub fn scan_prefix(&self, id: &str) -> String {
        if self.is_cumulative {
            format!("{id}{sep}{}{sep}", self.code, sep = KEY_SEPARATOR)
        } else {
            self.lookup_key(id)
        }
    }

    /// Whether a file name belongs to this dataset
    ///
    /// Case-insensitive, so the legacy upper-case `TABMUN.CSV` matches too.
    pub fn matches_file(&self, file_name: &str) -> bool {
        file_name
            .to_lowercase()
            .starts_with(&self.prefix.to_lowercase())
    }
}

/// Lowercase of the first 3 characters of the prefix, ignoring a leading "Lucro "
fn code_for(prefix: &str) -> &'static str {
    let name = prefix.strip_prefix("Lucro ").unwrap_or(prefix);
    match name.to_lowercase().get(..3) {
        Some("cna") => CNAES,
        Some("emp") => EMPRESAS,
        Some("imu") => IMUNES_E_ISENTAS,
        Some("arb") => LUCRO_ARBITRADO,
        Some("pre") => LUCRO_PRESUMIDO,
        Some("rea") => LUCRO_REAL,
        Some("mot") => MOTIVOS,
        Some("mun") => MUNICIPIOS,
        Some("nat") => NATUREZAS,
        Some("pai") => PAISES,
        Some("qua") => QUALIFICACOES,
        Some("sim") => SIMPLES,
        Some("soc") => SOCIOS,
        Some("tab") => TABMUN,
        _ => ESTABELECIMENTOS,
    }
}

/// Catalogue of every dataset, one instance per run
#[derive(Debug)]
pub struct DatasetRegistry {
    auxiliary: Vec<Dataset>,
    primary: Dataset,
}

impl Default for DatasetRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl DatasetRegistry {
    pub fn new() -> Self {
        let tax = |prefix| Dataset::new(prefix, b',', true, true).keyed_by(KeyColumn::TaxpayerBase(1));

        Self {
            auxiliary: vec![
                Dataset::new("Cnaes", b';', false, false),
                Dataset::new("Empresas", b';', false, false),
                tax("Imunes e Isentas"),
                tax("Lucro Arbitrado"),
                tax("Lucro Presumido"),
                tax("Lucro Real"),
                Dataset::new("Motivos", b';', false, false),
                Dataset::new("Municipios", b';', false, false),
                Dataset::new("Naturezas", b';', false, false),
                Dataset::new("Paises", b';', false, false),
                Dataset::new("Qualificacoes", b';', false, false),
                Dataset::new("Simples", b';', false, false),
                Dataset::new("Socios", b';', false, true),
                Dataset::new("tabmun", b';', false, false),
            ],
            primary: Dataset::new("Estabelecimentos", b';', false, false),
        }
    }

    /// Descriptor for a dataset code
    pub fn get(&self, code: &str) -> Result<&Dataset> {
        if code == ESTABELECIMENTOS {
            return Ok(&self.primary);
        }
        self.auxiliary
            .iter()
            .find(|d| d.code == code)
            .ok_or_else(|| TransformError::UnknownDataset(code.to_string()))
    }

    /// Every dataset loaded into the join store
    pub fn auxiliary(&self) -> &[Dataset] {
        &self.auxiliary
    }

    /// The per-establishment dataset streamed during enrichment
    pub fn primary(&self) -> &Dataset {
        &self.primary
    }
}
