//! Phase 1 loading against fixture exports

mod common;

use common::{ExportFixture, SERPRO_BASE};
use receita_transform::loader::{load_auxiliary, LoadStats, DEFAULT_WRITE_BATCH};
use receita_transform::progress::Progress;
use receita_transform::registry::DatasetRegistry;
use receita_transform::store::JoinStore;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

async fn load(source: &Path, store_dir: &Path, write_batch: usize) -> (Arc<JoinStore>, LoadStats) {
    let store = Arc::new(JoinStore::create(store_dir).unwrap());
    let stats = load_auxiliary(
        source,
        Arc::new(DatasetRegistry::new()),
        store.clone(),
        &Progress::hidden(),
        &CancellationToken::new(),
        write_batch,
    )
    .await
    .unwrap();
    (store, stats)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_lookup_rows_round_trip() {
    let fixture = ExportFixture::serpro("X");
    let dir = TempDir::new().unwrap();
    let (store, stats) = load(fixture.path(), dir.path(), DEFAULT_WRITE_BATCH).await;

    // Every auxiliary file except the primary dataset
    assert_eq!(stats.files, 14);

    assert_eq!(
        store.get(&format!("{SERPRO_BASE}::emp")).unwrap().unwrap(),
        vec![
            "SERVICO FEDERAL DE PROCESSAMENTO DE DADOS (SERPRO)",
            "2011",
            "16",
            "1061004829,23",
            "05",
            "",
        ]
    );
    assert_eq!(store.get("2011::nat").unwrap().unwrap(), vec!["Empresa Pública"]);
    assert_eq!(
        store.get("9701::tab").unwrap().unwrap(),
        vec!["00394460000141", "BRASILIA", "DF", "5300108"]
    );
    assert_eq!(store.get("0000::nat").unwrap(), None);
}

#[tokio::test]
async fn test_cumulative_rows_share_a_prefix() {
    let fixture = ExportFixture::serpro("X");
    let dir = TempDir::new().unwrap();
    let (store, _) = load(fixture.path(), dir.path(), 2).await;

    let keys: Vec<String> = store
        .entries(&format!("{SERPRO_BASE}::soc::"))
        .unwrap()
        .into_iter()
        .map(|(key, _)| key)
        .collect();
    let expected: Vec<String> = (1..=6).map(|n| format!("{SERPRO_BASE}::soc::{n:010}")).collect();
    assert_eq!(keys, expected);

    // Scan order follows file order
    let partners = store.get_prefix(&format!("{SERPRO_BASE}::soc::")).unwrap();
    assert_eq!(partners[0][1], "RICARDO CEZAR DE MOURA JUCA");

    // Tax rows are keyed by the base of the formatted id in column 1
    let presumed = store.get_prefix(&format!("{SERPRO_BASE}::pre::")).unwrap();
    assert_eq!(presumed, vec![vec!["2018", "", "LUCRO PRESUMIDO", "1"]]);
    assert!(store.get_prefix(&format!("{SERPRO_BASE}::arb::")).unwrap().is_empty());
}

#[tokio::test]
async fn test_supplements_and_overrides() {
    let fixture = ExportFixture::serpro("X");
    let dir = TempDir::new().unwrap();
    let (store, stats) = load(fixture.path(), dir.path(), DEFAULT_WRITE_BATCH).await;

    assert!(stats.supplementary_rows > 0);
    assert_eq!(
        store.get("1182::tab").unwrap().unwrap(),
        vec!["", "BOA ESPERANCA DO NORTE", "MT", "5101837"]
    );
    // Countries missing from the export sit next to the file rows
    assert_eq!(store.get("737::pai").unwrap().unwrap(), vec!["Sérvia"]);
    assert_eq!(store.get("105::pai").unwrap().unwrap(), vec!["BRASIL"]);
}

#[tokio::test]
async fn test_upper_case_municipality_table() {
    let fixture = ExportFixture::serpro("X");
    std::fs::rename(fixture.path().join("tabmun.csv"), fixture.path().join("TABMUN.CSV")).unwrap();
    let dir = TempDir::new().unwrap();
    let (store, _) = load(fixture.path(), dir.path(), DEFAULT_WRITE_BATCH).await;

    assert_eq!(store.get("7107::tab").unwrap().unwrap()[1], "SAO PAULO");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_reloading_is_byte_identical() {
    let fixture = ExportFixture::serpro("X");
    let first = TempDir::new().unwrap();
    let second = TempDir::new().unwrap();

    let (a, _) = load(fixture.path(), first.path(), DEFAULT_WRITE_BATCH).await;
    let (b, _) = load(fixture.path(), second.path(), 3).await;

    let a = a.entries("").unwrap();
    assert!(!a.is_empty());
    assert_eq!(a, b.entries("").unwrap());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_reloading_multi_file_cumulative_dataset_is_byte_identical() {
    let fixture = ExportFixture::empty();
    for file in 0..4 {
        let rows: Vec<Vec<String>> = (0..3000)
            .map(|n| {
                let name = format!("SOCIO {file}-{n}");
                ["42", "2", name.as_str(), "***000000**", "10", "", "", "", "", "00", "5"]
                    .iter()
                    .map(|f| f.to_string())
                    .collect()
            })
            .collect();
        fixture.zip(&format!("Socios{file}.zip"), &rows, ';');
    }
    let first = TempDir::new().unwrap();
    let second = TempDir::new().unwrap();

    let (a, stats) = load(fixture.path(), first.path(), 256).await;
    let (b, _) = load(fixture.path(), second.path(), 1000).await;

    assert_eq!(stats.files, 4);
    assert_eq!(stats.rows, 12_000);
    let a = a.entries("42::soc::").unwrap();
    assert_eq!(a.len(), 12_000);
    assert_eq!(a, b.entries("42::soc::").unwrap());

    // Keys ascend through the files in name order
    let last = partner_name(&a[a.len() - 1].1);
    assert_eq!(last, "SOCIO 3-2999");
    assert_eq!(partner_name(&a[3000].1), "SOCIO 1-0");
}

fn partner_name(value: &[u8]) -> String {
    receita_transform::store::deserialize("42::soc", value).unwrap()[1].clone()
}
