//! Output document model
//!
//! Field names follow the JSON layout consumers of the registry dumps already
//! rely on. Absent values serialise as `null` and dates as `YYYY-MM-DD`.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One establishment, fully joined
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
    #[serde(rename = "cnpj")]
    pub id: String,
    #[serde(rename = "identificador_matriz_filial")]
    pub branch_code: Option<i64>,
    #[serde(rename = "descricao_identificador_matriz_filial")]
    pub branch: Option<String>,
    #[serde(rename = "nome_fantasia")]
    pub trade_name: String,
    #[serde(rename = "situacao_cadastral")]
    pub status_code: Option<i64>,
    #[serde(rename = "descricao_situacao_cadastral")]
    pub status: Option<String>,
    #[serde(rename = "data_situacao_cadastral")]
    pub status_date: Option<NaiveDate>,
    #[serde(rename = "motivo_situacao_cadastral")]
    pub reason_code: Option<i64>,
    #[serde(rename = "descricao_motivo_situacao_cadastral")]
    pub reason: Option<String>,
    #[serde(rename = "nome_cidade_no_exterior")]
    pub foreign_city: String,
    #[serde(rename = "codigo_pais")]
    pub country_code: Option<i64>,
    #[serde(rename = "pais")]
    pub country: Option<String>,
    #[serde(rename = "data_inicio_atividade")]
    pub activity_start: Option<NaiveDate>,
    #[serde(rename = "cnae_fiscal")]
    pub main_activity_code: Option<i64>,
    #[serde(rename = "cnae_fiscal_descricao")]
    pub main_activity: Option<String>,
    #[serde(rename = "descricao_tipo_de_logradouro")]
    pub street_type: String,
    #[serde(rename = "logradouro")]
    pub street: String,
    #[serde(rename = "numero")]
    pub number: String,
    #[serde(rename = "complemento")]
    pub complement: String,
    #[serde(rename = "bairro")]
    pub district: String,
    #[serde(rename = "cep")]
    pub postal_code: String,
    #[serde(rename = "uf")]
    pub state: String,
    #[serde(rename = "codigo_municipio")]
    pub municipality_code: Option<i64>,
    #[serde(rename = "codigo_municipio_ibge")]
    pub municipality_national_code: Option<i64>,
    #[serde(rename = "municipio")]
    pub municipality: Option<String>,
    #[serde(rename = "ddd_telefone_1")]
    pub phone_1: String,
    #[serde(rename = "ddd_telefone_2")]
    pub phone_2: String,
    #[serde(rename = "ddd_fax")]
    pub fax: String,
    pub email: Option<String>,
    #[serde(rename = "situacao_especial")]
    pub special_situation: String,
    #[serde(rename = "data_situacao_especial")]
    pub special_situation_date: Option<NaiveDate>,

    #[serde(rename = "opcao_pelo_simples")]
    pub simplified_opted: Option<bool>,
    #[serde(rename = "data_opcao_pelo_simples")]
    pub simplified_opted_on: Option<NaiveDate>,
    #[serde(rename = "data_exclusao_do_simples")]
    pub simplified_left_on: Option<NaiveDate>,
    #[serde(rename = "opcao_pelo_mei")]
    pub micro_entrepreneur_opted: Option<bool>,
    #[serde(rename = "data_opcao_pelo_mei")]
    pub micro_entrepreneur_opted_on: Option<NaiveDate>,
    #[serde(rename = "data_exclusao_do_mei")]
    pub micro_entrepreneur_left_on: Option<NaiveDate>,

    #[serde(rename = "razao_social")]
    pub legal_name: Option<String>,
    #[serde(rename = "codigo_natureza_juridica")]
    pub legal_nature_code: Option<i64>,
    #[serde(rename = "natureza_juridica")]
    pub legal_nature: Option<String>,
    #[serde(rename = "qualificacao_do_responsavel")]
    pub responsible_qualification_code: Option<i64>,
    #[serde(rename = "capital_social")]
    pub share_capital: Option<f64>,
    #[serde(rename = "codigo_porte")]
    pub size_code: Option<i64>,
    #[serde(rename = "porte")]
    pub size: Option<String>,
    #[serde(rename = "ente_federativo_responsavel")]
    pub federative_entity: Option<String>,

    #[serde(rename = "qsa")]
    pub partners: Vec<Partner>,
    #[serde(rename = "cnaes_secundarios")]
    pub secondary_activities: Vec<SecondaryActivity>,
    #[serde(rename = "regime_tributario")]
    pub tax_regimes: Vec<TaxRegimeEntry>,
}

/// Member of the partners and administrators board
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Partner {
    #[serde(rename = "identificador_de_socio")]
    pub role_code: Option<i64>,
    #[serde(rename = "nome_socio")]
    pub name: String,
    #[serde(rename = "cnpj_cpf_do_socio")]
    pub document: String,
    #[serde(rename = "codigo_qualificacao_socio")]
    pub qualification_code: Option<i64>,
    #[serde(rename = "qualificacao_socio")]
    pub qualification: Option<String>,
    #[serde(rename = "data_entrada_sociedade")]
    pub joined_on: Option<NaiveDate>,
    #[serde(rename = "codigo_pais")]
    pub country_code: Option<i64>,
    #[serde(rename = "pais")]
    pub country: Option<String>,
    #[serde(rename = "cpf_representante_legal")]
    pub representative_document: String,
    #[serde(rename = "nome_representante_legal")]
    pub representative_name: String,
    #[serde(rename = "codigo_qualificacao_representante_legal")]
    pub representative_qualification_code: Option<i64>,
    #[serde(rename = "qualificacao_representante_legal")]
    pub representative_qualification: Option<String>,
    #[serde(rename = "codigo_faixa_etaria")]
    pub age_bracket_code: Option<i64>,
    #[serde(rename = "faixa_etaria")]
    pub age_bracket: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecondaryActivity {
    #[serde(rename = "codigo")]
    pub code: i64,
    #[serde(rename = "descricao")]
    pub description: Option<String>,
}

/// One year of declared taxation method
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxRegimeEntry {
    #[serde(rename = "ano")]
    pub year: i64,
    #[serde(rename = "cnpj_da_scp")]
    pub joint_venture_id: Option<String>,
    #[serde(rename = "forma_de_tributacao")]
    pub regime: String,
    #[serde(rename = "quantidade_de_escrituracoes")]
    pub entries: i64,
}

impl Record {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_json_field_names() {
        let record = Record {
            id: "33683111000280".to_string(),
            status_date: NaiveDate::from_ymd_opt(2004, 5, 22),
            partners: vec![Partner {
                name: "ANDRE DE CESERO".to_string(),
                ..Default::default()
            }],
            tax_regimes: vec![TaxRegimeEntry {
                year: 2018,
                joint_venture_id: None,
                regime: "LUCRO PRESUMIDO".to_string(),
                entries: 1,
            }],
            ..Default::default()
        };

        let value: serde_json::Value = serde_json::from_str(&record.to_json().unwrap()).unwrap();
        assert_eq!(value["cnpj"], "33683111000280");
        assert_eq!(value["data_situacao_cadastral"], "2004-05-22");
        assert!(value["email"].is_null());
        assert!(value["razao_social"].is_null());
        assert_eq!(value["qsa"][0]["nome_socio"], "ANDRE DE CESERO");
        assert_eq!(value["regime_tributario"][0]["forma_de_tributacao"], "LUCRO PRESUMIDO");
        assert!(value["regime_tributario"][0]["cnpj_da_scp"].is_null());
        assert_eq!(value["cnaes_secundarios"], serde_json::json!([]));
    }

    #[test]
    fn test_json_round_trip() {
        let record = Record {
            id: "1".to_string(),
            share_capital: Some(1061004829.23),
            secondary_activities: vec![SecondaryActivity {
                code: 6201501,
                description: Some("Desenvolvimento de programas".to_string()),
            }],
            ..Default::default()
        };
        let back: Record = serde_json::from_str(&record.to_json().unwrap()).unwrap();
        assert_eq!(back, record);
    }
}
