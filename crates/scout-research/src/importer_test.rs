use std::collections::BTreeMap;
use std::sync::Mutex;

use super::*;

/// In-memory catalog with per-batch atomicity. A batch containing
/// `poison_id` is rejected as a whole.
#[derive(Default)]
struct FakeSink {
    rows: Mutex<BTreeMap<String, CatalogRecord>>,
    batches: Mutex<Vec<usize>>,
    clears: Mutex<u32>,
    poison_id: Option<String>,
}

impl FakeSink {
    fn seeded(ids: &[&str]) -> Self {
        let sink = Self::default();
        {
            let mut rows = sink.rows.lock().unwrap();
            for id in ids {
                rows.insert((*id).to_string(), record(id, "1.00"));
            }
        }
        sink
    }

    fn row(&self, id: &str) -> Option<CatalogRecord> {
        self.rows.lock().unwrap().get(id).cloned()
    }

    fn len(&self) -> usize {
        self.rows.lock().unwrap().len()
    }
}

#[async_trait]
impl CatalogSink for FakeSink {
    async fn clear(&self) -> Result<u64, DbError> {
        *self.clears.lock().unwrap() += 1;
        let mut rows = self.rows.lock().unwrap();
        let n = rows.len() as u64;
        rows.clear();
        Ok(n)
    }

    async fn upsert_batch(&self, records: &[CatalogRecord]) -> Result<usize, DbError> {
        if let Some(poison) = &self.poison_id {
            if records.iter().any(|r| &r.id == poison) {
                return Err(DbError::InvalidRow {
                    table: "catalog_products",
                    reason: format!("row {poison} rejected"),
                });
            }
        }
        let mut rows = self.rows.lock().unwrap();
        for r in records {
            rows.insert(r.id.clone(), r.clone());
        }
        self.batches.lock().unwrap().push(records.len());
        Ok(records.len())
    }
}

fn record(id: &str, price: &str) -> CatalogRecord {
    CatalogRecord {
        id: id.to_string(),
        title: format!("Product {id}"),
        url: format!("https://shop.example.com/{id}"),
        price: Some(Decimal::from_str(price).unwrap()),
        currency_code: "USD".to_string(),
        category: None,
        marketplace: Marketplace::Shopify,
    }
}

const HEADER: &str = "id,title,url,price,currency_code,category,marketplace\n";

#[tokio::test]
async fn duplicate_id_updates_in_place_and_short_row_is_skipped() {
    let sink = FakeSink::default();
    let source = "id,title,url,price,currency_code,category\n\
                  A1,\"Widget, Deluxe\",u1,19.99,USD,Tools\n\
                  A1,\"Widget, Deluxe\",u1,24.99,USD,Tools\n\
                  B2,Broken,u2,5.00\n";

    let summary = import_batch(&sink, source, &ImportOptions::default())
        .await
        .unwrap();

    assert_eq!(summary.success_count, 1);
    assert_eq!(summary.error_count, 1);
    let row = sink.row("A1").unwrap();
    assert_eq!(row.title, "Widget, Deluxe");
    assert_eq!(row.price, Some(Decimal::from_str("24.99").unwrap()));
    assert_eq!(row.category.as_deref(), Some("Tools"));
    assert_eq!(sink.len(), 1);
}

#[tokio::test]
async fn quoted_separators_and_escaped_quotes_parse_exactly() {
    let sink = FakeSink::default();
    let source = format!(
        "{HEADER}\
         Q1,\"Lamp, Brass\",https://x.example/q1,10,USD,Home,shopify\n\
         Q2,\"The \"\"Best\"\" Mug\",https://x.example/q2,,eur,,AMAZON\n"
    );

    let summary = import_batch(&sink, &source, &ImportOptions::default())
        .await
        .unwrap();

    assert_eq!(summary.success_count, 2);
    assert_eq!(sink.row("Q1").unwrap().title, "Lamp, Brass");
    let q2 = sink.row("Q2").unwrap();
    assert_eq!(q2.title, "The \"Best\" Mug");
    assert_eq!(q2.price, None);
    assert_eq!(q2.currency_code, "EUR");
    assert_eq!(q2.category, None);
    assert_eq!(q2.marketplace, Marketplace::Amazon);
}

#[tokio::test]
async fn missing_fields_default_sensibly() {
    let sink = FakeSink::default();
    let source = format!("{HEADER}M1,Mug,https://x.example/m1,4.5,,Kitchen,etsy\n");

    import_batch(&sink, &source, &ImportOptions::default())
        .await
        .unwrap();

    let m1 = sink.row("M1").unwrap();
    assert_eq!(m1.currency_code, "USD");
    assert_eq!(m1.marketplace, Marketplace::Other);
}

#[tokio::test]
async fn rows_missing_required_fields_or_with_bad_prices_are_skipped() {
    let sink = FakeSink::default();
    let source = format!(
        "{HEADER}\
         ,No id,https://x.example/a,1,USD,Misc\n\
         R1,,https://x.example/b,1,USD,Misc\n\
         R2,No url,,1,USD,Misc\n\
         R3,Bad price,https://x.example/c,abc,USD,Misc\n\
         R4,Good,https://x.example/d,2.50,USD,Misc\n"
    );

    let summary = import_batch(&sink, &source, &ImportOptions::default())
        .await
        .unwrap();

    assert_eq!(summary.success_count, 1);
    assert_eq!(summary.error_count, 4);
    assert!(sink.row("R4").is_some());
}

#[tokio::test]
async fn rows_are_flushed_in_fixed_size_batches() {
    let sink = FakeSink::default();
    let mut source = HEADER.to_string();
    for i in 0..250 {
        source.push_str(&format!("P{i},Item {i},https://x.example/{i},1.00,USD,Misc\n"));
    }

    let summary = import_batch(&sink, &source, &ImportOptions::default())
        .await
        .unwrap();

    assert_eq!(summary.success_count, 250);
    assert_eq!(summary.batches_committed, 3);
    assert_eq!(*sink.batches.lock().unwrap(), vec![100, 100, 50]);
}

#[tokio::test]
async fn failing_batch_is_not_committed_and_aborts() {
    let sink = FakeSink {
        poison_id: Some("P157".to_string()),
        ..FakeSink::default()
    };
    let mut source = HEADER.to_string();
    for i in 100..300 {
        source.push_str(&format!("P{i},Item {i},https://x.example/{i},1.00,USD,Misc\n"));
    }

    let err = import_batch(&sink, &source, &ImportOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(err, ImportError::Batch { batch: 1, .. }), "got: {err}");
    assert_eq!(sink.len(), 0);
}

#[tokio::test]
async fn too_many_malformed_rows_abort_the_import() {
    let sink = FakeSink::default();
    let mut source = HEADER.to_string();
    for i in 0..11 {
        source.push_str(&format!("X{i},short\n"));
    }

    let err = import_batch(&sink, &source, &ImportOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ImportError::TooManyErrors {
            skipped: 11,
            max_errors: 10
        }
    ));
}

#[tokio::test]
async fn full_refresh_replaces_while_merge_keeps_existing_rows() {
    let source = format!("{HEADER}N1,New,https://x.example/n1,3.00,USD,Misc\n");

    let refreshed = FakeSink::seeded(&["OLD1", "OLD2"]);
    let summary = import_batch(&refreshed, &source, &ImportOptions::default())
        .await
        .unwrap();
    assert_eq!(summary.rows_cleared, 2);
    assert_eq!(refreshed.len(), 1);

    let merged = FakeSink::seeded(&["OLD1", "OLD2"]);
    let options = ImportOptions {
        mode: ImportMode::Merge,
        ..ImportOptions::default()
    };
    let summary = import_batch(&merged, &source, &options).await.unwrap();
    assert_eq!(summary.rows_cleared, 0);
    assert_eq!(*merged.clears.lock().unwrap(), 0);
    assert_eq!(merged.len(), 3);
}

#[tokio::test]
async fn importing_the_same_source_twice_is_stable() {
    let sink = FakeSink::default();
    let source = format!(
        "{HEADER}\
         S1,One,https://x.example/1,1.00,USD,Misc\n\
         S2,Two,https://x.example/2,2.00,USD,Misc\n"
    );
    let options = ImportOptions {
        mode: ImportMode::Merge,
        ..ImportOptions::default()
    };

    import_batch(&sink, &source, &options).await.unwrap();
    let first = sink.rows.lock().unwrap().clone();
    import_batch(&sink, &source, &options).await.unwrap();

    assert_eq!(*sink.rows.lock().unwrap(), first);
}

#[test]
fn import_mode_deserializes_from_snake_case() {
    let mode: ImportMode = serde_json::from_str("\"merge\"").unwrap();
    assert_eq!(mode, ImportMode::Merge);
    let mode: ImportMode = serde_json::from_str("\"full_refresh\"").unwrap();
    assert_eq!(mode, ImportMode::FullRefresh);
}
