//! Fixture builder for registry export directories
//!
//! Writes files the way the registry publishes them: ISO-8859-15 text, quoted
//! fields, mostly zip archives with a single member.

#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use encoding_rs::ISO_8859_15;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use tempfile::TempDir;

pub const SERPRO_BASE: &str = "33683111";
pub const SERPRO_ID: &str = "33683111000280";
pub const OKBR_ID: &str = "19131243000197";

/// Quote and join rows, then encode as ISO-8859-15
fn encode_rows(rows: &[Vec<String>], separator: char, quoted: bool) -> Vec<u8> {
    let mut text = String::new();
    for row in rows {
        let fields: Vec<String> = row
            .iter()
            .map(|f| if quoted { format!("\"{f}\"") } else { f.clone() })
            .collect();
        text.push_str(&fields.join(&separator.to_string()));
        text.push('\n');
    }
    ISO_8859_15.encode(&text).0.into_owned()
}

fn to_rows(rows: &[&[&str]]) -> Vec<Vec<String>> {
    rows.iter()
        .map(|r| r.iter().map(|f| f.to_string()).collect())
        .collect()
}

/// Temporary export directory
pub struct ExportFixture {
    dir: TempDir,
}

impl ExportFixture {
    pub fn empty() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Zip archive with one member holding `rows`
    pub fn zip(&self, name: &str, rows: &[Vec<String>], separator: char) -> &Self {
        let mut zip = zip::ZipWriter::new(File::create(self.path().join(name)).unwrap());
        let member = format!("{}.CSV", name.trim_end_matches(".zip").to_uppercase());
        zip.start_file(member, zip::write::SimpleFileOptions::default())
            .unwrap();
        zip.write_all(&encode_rows(rows, separator, true)).unwrap();
        zip.finish().unwrap();
        self
    }

    pub fn zip_str(&self, name: &str, rows: &[&[&str]]) -> &Self {
        self.zip(name, &to_rows(rows), ';')
    }

    /// Plain unquoted file
    pub fn plain(&self, name: &str, rows: &[&[&str]], separator: char) -> &Self {
        std::fs::write(self.path().join(name), encode_rows(&to_rows(rows), separator, false)).unwrap();
        self
    }

    /// Tax-regime export: header line, comma separated
    pub fn tax_regime(&self, name: &str, rows: &[&[&str]]) -> &Self {
        let mut all = vec![vec![
            "ano".to_string(),
            "cnpj".to_string(),
            "cnpj_da_scp".to_string(),
            "forma_de_tributacao".to_string(),
            "quantidade_de_escrituracoes".to_string(),
        ]];
        all.extend(to_rows(rows));
        self.zip(name, &all, ',')
    }

    pub fn updated_at(&self, date: &str) -> &Self {
        std::fs::write(self.path().join("updated_at.txt"), format!("{date}\n")).unwrap();
        self
    }

    /// Full export with two registrants: SERPRO (partners, simplified-tax
    /// option, one tax-regime year) and Open Knowledge Brasil (no partners,
    /// two tax-regime years from different datasets)
    pub fn serpro(trade_name: &str) -> Self {
        let fixture = Self::empty();
        fixture
            .zip(
                "Estabelecimentos0.zip",
                &[serpro_establishment(trade_name), okbr_establishment()],
                ';',
            )
            .zip_str(
                "Empresas0.zip",
                &[
                    &[SERPRO_BASE, "SERVICO FEDERAL DE PROCESSAMENTO DE DADOS (SERPRO)", "2011", "16", "1061004829,23", "05", ""],
                    &["19131243", "OPEN KNOWLEDGE BRASIL", "3999", "16", "0,00", "01", ""],
                ],
            )
            .zip_str("Naturezas.zip", &[&["2011", "Empresa Pública"], &["3999", "Associação Privada"]])
            .zip_str(
                "Qualificacoes.zip",
                &[&["00", "Não informada"], &["05", "Administrador"], &["10", "Diretor"], &["16", "Presidente"]],
            )
            .zip_str("Motivos.zip", &[&["00", "SEM MOTIVO"]])
            .zip_str("Paises.zip", &[&["105", "BRASIL"]])
            .zip_str(
                "Cnaes.zip",
                &[
                    &["6204000", "Consultoria em tecnologia da informação"],
                    &["6201501", "Desenvolvimento de programas de computador sob encomenda"],
                    &["6202300", "Desenvolvimento e licenciamento de programas de computador customizáveis"],
                    &["6203100", "Desenvolvimento e licenciamento de programas de computador não-customizáveis"],
                    &["6209100", "Suporte técnico, manutenção e outros serviços em tecnologia da informação"],
                    &["6311900", "Tratamento de dados, provedores de serviços de aplicação e serviços de hospedagem na internet"],
                    &["9430800", "Atividades de associações de defesa de direitos sociais"],
                ],
            )
            .zip_str("Municipios.zip", &[&["9701", "BRASILIA"], &["7107", "SAO PAULO"]])
            .plain(
                "tabmun.csv",
                &[
                    &["9701", "00394460000141", "BRASILIA", "DF", "5300108"],
                    &["7107", "46395000000139", "SAO PAULO", "SP", "3550308"],
                ],
                ';',
            )
            .zip_str(
                "Socios0.zip",
                &[
                    &[SERPRO_BASE, "2", "RICARDO CEZAR DE MOURA JUCA", "***989951**", "10", "20170411", "", "***000000**", "", "00", "5"],
                    &[SERPRO_BASE, "2", "GILENO GURJAO BARRETO", "***099595**", "16", "20180522", "", "***000000**", "", "00", "5"],
                    &[SERPRO_BASE, "2", "ANDRE DE CESERO", "***220050**", "10", "20160331", "", "***000000**", "", "00", "6"],
                    &[SERPRO_BASE, "2", "WILSON BIANCARDI COURY", "***414127**", "10", "20190114", "", "***000000**", "", "00", "7"],
                    &[SERPRO_BASE, "2", "ANTONIO DE PADUA FERREIRA PASSOS", "***595901**", "10", "20170505", "", "***000000**", "", "00", "6"],
                    &[SERPRO_BASE, "2", "JOSE ROBERTO DE FARIAS", "***310271**", "05", "20200210", "105", "***000000**", "", "00", "8"],
                ],
            )
            .zip_str(
                "Simples.zip",
                &[&[SERPRO_BASE, "S", "20140101", "00000000", "N", "00000000", "00000000"]],
            )
            .tax_regime("Lucro Presumido.zip", &[&["2018", "33.683.111/0001-07", "", "LUCRO PRESUMIDO", "1"]])
            .tax_regime("Lucro Real.zip", &[&["2020", "19.131.243/0001-97", "", "LUCRO REAL", "1"]])
            .tax_regime("Imunes e Isentas.zip", &[&["2019", "19.131.243/0001-97", "0", "IMUNE DO IRPJ", "1"]])
            .tax_regime("Lucro Arbitrado.zip", &[])
            .updated_at("2026-10-12");
        fixture
    }
}

pub fn serpro_establishment(trade_name: &str) -> Vec<String> {
    [
        SERPRO_BASE, "0002", "80", "2", trade_name, "02", "20040522", "00", "", "", "19670630", "6204000",
        "6201501,6202300,6203100,6209100,6311900", "AVENIDA", "L2 SGAN", "601", "MODULO G", "ASA NORTE",
        "70836900", "DF", "9701", "61", "21522900", "61", "21522901", "", "", "test@ser.pro", "", "",
    ]
    .iter()
    .map(|f| f.to_string())
    .collect()
}

pub fn okbr_establishment() -> Vec<String> {
    [
        "19131243", "0001", "97", "1", "OPEN KNOWLEDGE BRASIL", "02", "20131017", "00", "", "", "20131017",
        "9430800", "", "AVENIDA", "PAULISTA", "37", "ANDAR 4", "BELA VISTA", "01311902", "SP", "7107", "11",
        "23851939", "", "", "", "", "", "", "",
    ]
    .iter()
    .map(|f| f.to_string())
    .collect()
}
