//! Record assembler
//!
//! Turns one establishment row into a complete [`Record`] by joining it with
//! everything phase 1 loaded: lookup-table descriptions, the registrant base,
//! the simplified-tax option, partners, secondary activities and the
//! tax-regime history. Lookups run concurrently on the blocking pool and are
//! all joined before the record is returned.
//!
//! A lookup miss leaves the field empty. Malformed input (column count, codes,
//! numbers, dates) is a structural error.

use crate::cast::{non_empty, required_int, to_bool, to_date, to_float, to_int};
use crate::decode;
use crate::error::{Result, TransformError};
use crate::privacy;
use crate::record::{Partner, Record, SecondaryActivity, TaxRegimeEntry};
use crate::registry::{
    DatasetRegistry, CNAES, EMPRESAS, MOTIVOS, MUNICIPIOS, NATUREZAS, PAISES, QUALIFICACOES, SIMPLES, SOCIOS,
    TABMUN, TAX_REGIMES,
};
use crate::store::JoinStore;
use futures::future::try_join_all;
use receita_common::ids;
use std::sync::Arc;

/// Columns of an establishment row
pub const PRIMARY_COLUMNS: usize = 30;

const REGISTRANT_COLUMNS: usize = 6;
const SIMPLIFIED_COLUMNS: usize = 6;
const PARTNER_COLUMNS: usize = 10;
const TAX_REGIME_COLUMNS: usize = 4;

/// Fields that come from the registrant-base dataset
#[derive(Debug, Default)]
struct Registrant {
    legal_name: Option<String>,
    legal_nature_code: Option<i64>,
    legal_nature: Option<String>,
    responsible_qualification_code: Option<i64>,
    share_capital: Option<f64>,
    size_code: Option<i64>,
    size: Option<String>,
    federative_entity: Option<String>,
}

fn require_columns(row: &[String], expected: usize, what: &str) -> Result<()> {
    if row.len() < expected {
        return Err(TransformError::structural(
            what,
            format!("expected {} columns, got {}", expected, row.len()),
        ));
    }
    Ok(())
}

/// Joins establishment rows against the loaded join store
#[derive(Clone)]
pub struct Assembler {
    store: Arc<JoinStore>,
    registry: Arc<DatasetRegistry>,
    privacy: bool,
}

impl Assembler {
    pub fn new(store: Arc<JoinStore>, registry: Arc<DatasetRegistry>, privacy: bool) -> Self {
        Self {
            store,
            registry,
            privacy,
        }
    }

    async fn get(&self, code: &str, id: &str) -> Result<Option<Vec<String>>> {
        if id.is_empty() {
            return Ok(None);
        }
        let key = self.registry.get(code)?.lookup_key(id);
        let store = self.store.clone();
        tokio::task::spawn_blocking(move || store.get(&key)).await?
    }

    /// Column `index` of the row stored for `id`, if any
    async fn field(&self, code: &str, id: &str, index: usize) -> Result<Option<String>> {
        Ok(self
            .get(code, id)
            .await?
            .and_then(|row| row.into_iter().nth(index)))
    }

    async fn scan(&self, code: &str, id: &str) -> Result<Vec<Vec<String>>> {
        let prefix = self.registry.get(code)?.scan_prefix(id);
        let store = self.store.clone();
        tokio::task::spawn_blocking(move || store.get_prefix(&prefix)).await?
    }

    async fn registrant(&self, base: &str) -> Result<Registrant> {
        let Some(row) = self.get(EMPRESAS, base).await? else {
            return Ok(Registrant::default());
        };
        require_columns(&row, REGISTRANT_COLUMNS, "empresa")?;

        let size_code = to_int(&row[4], "codigo_porte")?;
        Ok(Registrant {
            legal_name: Some(row[0].clone()),
            legal_nature_code: to_int(&row[1], "codigo_natureza_juridica")?,
            legal_nature: self.field(NATUREZAS, &row[1], 0).await?,
            responsible_qualification_code: to_int(&row[2], "qualificacao_do_responsavel")?,
            share_capital: to_float(&row[3], "capital_social")?,
            size_code,
            size: decode::optional(size_code, decode::size)?,
            federative_entity: non_empty(&row[5]),
        })
    }

    async fn simplified(&self, base: &str) -> Result<Option<Vec<String>>> {
        let row = self.get(SIMPLES, base).await?;
        if let Some(row) = &row {
            require_columns(row, SIMPLIFIED_COLUMNS, "simples")?;
        }
        Ok(row)
    }

    /// Codes in the order they appear in the row
    async fn secondary_activities(&self, codes: &str) -> Result<Vec<SecondaryActivity>> {
        let lookups = codes
            .split(',')
            .map(str::trim)
            .filter(|code| !code.is_empty())
            .map(|code| async move {
                Ok::<_, TransformError>(SecondaryActivity {
                    code: required_int(code, "cnaes_secundarios")?,
                    description: self.field(CNAES, code, 0).await?,
                })
            });
        try_join_all(lookups).await
    }

    async fn partner(&self, row: Vec<String>) -> Result<Partner> {
        require_columns(&row, PARTNER_COLUMNS, "socio")?;
        let (qualification, country, representative_qualification) = tokio::try_join!(
            self.field(QUALIFICACOES, &row[3], 0),
            self.field(PAISES, &row[5], 0),
            self.field(QUALIFICACOES, &row[8], 0),
        )?;
        let age_bracket_code = to_int(&row[9], "codigo_faixa_etaria")?;

        Ok(Partner {
            role_code: to_int(&row[0], "identificador_de_socio")?,
            name: row[1].clone(),
            document: row[2].clone(),
            qualification_code: to_int(&row[3], "codigo_qualificacao_socio")?,
            qualification,
            joined_on: to_date(&row[4], "data_entrada_sociedade")?,
            country_code: to_int(&row[5], "codigo_pais")?,
            country,
            representative_document: row[6].clone(),
            representative_name: row[7].clone(),
            representative_qualification_code: to_int(&row[8], "codigo_qualificacao_representante_legal")?,
            representative_qualification,
            age_bracket_code,
            age_bracket: decode::optional(age_bracket_code, decode::age_bracket)?,
        })
    }

    /// Partners in key order, then stably sorted by name
    async fn partners(&self, base: &str) -> Result<Vec<Partner>> {
        let rows = self.scan(SOCIOS, base).await?;
        let mut partners = try_join_all(rows.into_iter().map(|row| self.partner(row))).await?;
        partners.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(partners)
    }

    /// Entries of the four tax-regime datasets, sorted by year
    async fn tax_regimes(&self, base: &str) -> Result<Vec<TaxRegimeEntry>> {
        let scans = try_join_all(TAX_REGIMES.iter().map(|code| self.scan(code, base))).await?;

        let mut entries = scans
            .into_iter()
            .flatten()
            .map(|row| -> Result<TaxRegimeEntry> {
                require_columns(&row, TAX_REGIME_COLUMNS, "regime_tributario")?;
                Ok(TaxRegimeEntry {
                    year: required_int(&row[0], "ano")?,
                    joint_venture_id: match row[1].as_str() {
                        "" | "0" => None,
                        id => Some(id.to_string()),
                    },
                    regime: row[2].clone(),
                    entries: required_int(&row[3], "quantidade_de_escrituracoes")?,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        entries.sort_by_key(|entry| entry.year);
        Ok(entries)
    }

    /// Build the record for one establishment row
    pub async fn assemble(&self, row: &[String]) -> Result<Record> {
        if row.len() != PRIMARY_COLUMNS {
            return Err(TransformError::structural(
                "estabelecimento",
                format!("expected {} columns, got {}", PRIMARY_COLUMNS, row.len()),
            ));
        }
        let id = ids::full_id(&row[0], &row[1], &row[2])
            .map_err(|e| TransformError::structural("cnpj", e.to_string()))?;
        let base = row[0].as_str();

        let branch_code = to_int(&row[3], "identificador_matriz_filial")?;
        let status_code = to_int(&row[5], "situacao_cadastral")?;
        let municipality_code = &row[20];

        let (reason, country, main_activity, municipality, national_code) = tokio::try_join!(
            self.field(MOTIVOS, &row[7], 0),
            self.field(PAISES, &row[9], 0),
            self.field(CNAES, &row[11], 0),
            self.field(MUNICIPIOS, municipality_code, 0),
            self.field(TABMUN, municipality_code, 3),
        )?;
        let (registrant, simplified, secondary_activities, partners, tax_regimes) = tokio::try_join!(
            self.registrant(base),
            self.simplified(base),
            self.secondary_activities(&row[12]),
            self.partners(base),
            self.tax_regimes(base),
        )?;

        let mut record = Record {
            id,
            branch_code,
            branch: decode::optional(branch_code, decode::branch)?,
            trade_name: row[4].clone(),
            status_code,
            status: decode::optional(status_code, decode::status)?,
            status_date: to_date(&row[6], "data_situacao_cadastral")?,
            reason_code: to_int(&row[7], "motivo_situacao_cadastral")?,
            reason,
            foreign_city: row[8].clone(),
            country_code: to_int(&row[9], "codigo_pais")?,
            country,
            activity_start: to_date(&row[10], "data_inicio_atividade")?,
            main_activity_code: to_int(&row[11], "cnae_fiscal")?,
            main_activity,
            street_type: row[13].clone(),
            street: row[14].clone(),
            number: row[15].clone(),
            complement: row[16].clone(),
            district: row[17].clone(),
            postal_code: row[18].clone(),
            state: row[19].clone(),
            municipality_code: to_int(municipality_code, "codigo_municipio")?,
            municipality_national_code: match national_code {
                Some(code) => to_int(&code, "codigo_municipio_ibge")?,
                None => None,
            },
            municipality,
            phone_1: format!("{}{}", row[21], row[22]),
            phone_2: format!("{}{}", row[23], row[24]),
            fax: format!("{}{}", row[25], row[26]),
            email: non_empty(&row[27]),
            special_situation: row[28].clone(),
            special_situation_date: to_date(&row[29], "data_situacao_especial")?,
            legal_name: registrant.legal_name,
            legal_nature_code: registrant.legal_nature_code,
            legal_nature: registrant.legal_nature,
            responsible_qualification_code: registrant.responsible_qualification_code,
            share_capital: registrant.share_capital,
            size_code: registrant.size_code,
            size: registrant.size,
            federative_entity: registrant.federative_entity,
            partners,
            secondary_activities,
            tax_regimes,
            ..Default::default()
        };

        if let Some(simplified) = simplified {
            record.simplified_opted = to_bool(&simplified[0]);
            record.simplified_opted_on = to_date(&simplified[1], "data_opcao_pelo_simples")?;
            record.simplified_left_on = to_date(&simplified[2], "data_exclusao_do_simples")?;
            record.micro_entrepreneur_opted = to_bool(&simplified[3]);
            record.micro_entrepreneur_opted_on = to_date(&simplified[4], "data_opcao_pelo_mei")?;
            record.micro_entrepreneur_left_on = to_date(&simplified[5], "data_exclusao_do_mei")?;
        }

        if self.privacy {
            privacy::redact(&mut record);
        }
        Ok(record)
    }

    /// Assemble a row and serialise it, returning `(full id, JSON document)`
    pub async fn assemble_json(&self, row: &[String]) -> Result<(String, String)> {
        let record = self.assemble(row).await?;
        let json = record.to_json()?;
        Ok((record.id, json))
    }
}
