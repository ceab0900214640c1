//! Enumeration tables of the registry layout
//!
//! Every table is total on its documented codes; any other code is a
//! structural error rather than a silent default.

use crate::error::{Result, TransformError};

fn unknown(table: &str, code: i64) -> TransformError {
    TransformError::structural(table, format!("unknown code {code}"))
}

/// Headquarters or branch
pub fn branch(code: i64) -> Result<&'static str> {
    match code {
        1 => Ok("MATRIZ"),
        2 => Ok("FILIAL"),
        _ => Err(unknown("identificador_matriz_filial", code)),
    }
}

/// Registration status
pub fn status(code: i64) -> Result<&'static str> {
    match code {
        1 => Ok("NULA"),
        2 => Ok("ATIVA"),
        3 => Ok("SUSPENSA"),
        4 => Ok("INAPTA"),
        8 => Ok("BAIXADA"),
        _ => Err(unknown("situacao_cadastral", code)),
    }
}

/// Company size bracket
pub fn size(code: i64) -> Result<&'static str> {
    match code {
        0 => Ok("NÃO INFORMADO"),
        1 => Ok("MICRO EMPRESA"),
        3 => Ok("EMPRESA DE PEQUENO PORTE"),
        5 => Ok("DEMAIS"),
        _ => Err(unknown("codigo_porte", code)),
    }
}

/// Partner age bracket
pub fn age_bracket(code: i64) -> Result<&'static str> {
    match code {
        0 => Ok("Não se aplica"),
        1 => Ok("Entre 0 a 12 anos"),
        2 => Ok("Entre 13 a 20 ano"),
        3 => Ok("Entre 21 a 30 anos"),
        4 => Ok("Entre 31 a 40 anos"),
        5 => Ok("Entre 41 a 50 anos"),
        6 => Ok("Entre 51 a 60 anos"),
        7 => Ok("Entre 61 a 70 anos"),
        8 => Ok("Entre 71 a 80 anos"),
        9 => Ok("Maiores de 80 anos"),
        _ => Err(unknown("codigo_faixa_etaria", code)),
    }
}

/// Decode an optional code with one of the tables above
pub fn optional(code: Option<i64>, table: fn(i64) -> Result<&'static str>) -> Result<Option<String>> {
    code.map(|c| table(c).map(str::to_string)).transpose()
}
