use application::{ApplicationError, DocumentStore, ManualClock, TransactionService};
use chrono::{Duration, NaiveDate, TimeZone, Utc};
use domain::{
    DocumentId, FilterOperator, NewTransaction, QueryOptions, SortDirection, TransactionKind,
    TransactionPatch, TransactionStatus,
};
use infrastructure::{CollectionRegistry, MemoryStorageService};
use std::sync::Arc;

struct Fixture {
    registry: CollectionRegistry,
    clock: Arc<ManualClock>,
    service: TransactionService,
}

fn setup() -> Fixture {
    let registry = CollectionRegistry::new();
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2026, 4, 1, 8, 30, 0).unwrap(),
    ));
    let store = MemoryStorageService::with_clock(&registry, "transactions", clock.clone());
    Fixture {
        registry,
        clock,
        service: TransactionService::new(Arc::new(store)),
    }
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn income(day: u32, amount: f64, category: &str) -> NewTransaction {
    NewTransaction::new(date(2026, 4, day), TransactionKind::Income, amount, category)
}

fn expense(day: u32, amount: f64, category: &str) -> NewTransaction {
    NewTransaction::new(date(2026, 4, day), TransactionKind::Expense, amount, category)
}

impl Fixture {
    async fn record_all(&self, entries: Vec<NewTransaction>) -> Vec<String> {
        let mut ids = Vec::new();
        for entry in entries {
            ids.push(self.service.record(entry).await.unwrap().id);
            self.clock.advance(Duration::seconds(1));
        }
        ids
    }
}

#[tokio::test]
async fn record_returns_typed_transaction() {
    let fx = setup();
    let txn = fx
        .service
        .record(
            income(3, 2500.0, "Salary")
                .with_description("April payroll")
                .with_reference("PAY-04"),
        )
        .await
        .unwrap();

    assert!(txn.id.starts_with("transactions_"));
    assert_eq!(txn.kind, TransactionKind::Income);
    assert_eq!(txn.amount, 2500.0);
    assert_eq!(txn.description, "April payroll");
    assert_eq!(txn.reference.as_deref(), Some("PAY-04"));
    assert_eq!(txn.status, TransactionStatus::Completed);
    assert_eq!(txn.currency, "USD");
    assert_eq!(txn.created_at, "2026-04-01T08:30:00.000Z");
    assert_eq!(txn.created_at, txn.updated_at);
    assert!(!txn.is_deleted);

    let fetched = fx.service.get(&DocumentId::new(txn.id.clone())).await.unwrap();
    assert_eq!(fetched, txn);
}

#[tokio::test]
async fn record_income_and_expense_force_the_kind() {
    let fx = setup();
    let a = fx.service.record_income(expense(1, 10.0, "Gift")).await.unwrap();
    let b = fx.service.record_expense(income(1, 10.0, "Coffee")).await.unwrap();
    assert_eq!(a.kind, TransactionKind::Income);
    assert_eq!(b.kind, TransactionKind::Expense);
}

#[tokio::test]
async fn invalid_entries_are_rejected_and_not_stored() {
    let fx = setup();
    let err = fx
        .service
        .record(expense(2, 0.0, "Nothing"))
        .await
        .unwrap_err();
    assert!(matches!(err, ApplicationError::DomainError(_)));
    assert_eq!(fx.registry.document_count("transactions").await, 0);
}

#[tokio::test]
async fn list_recent_orders_by_date_then_newest_entry() {
    let fx = setup();
    let ids = fx
        .record_all(vec![
            expense(5, 12.0, "Lunch"),
            income(9, 300.0, "Freelance"),
            expense(5, 40.0, "Groceries"),
            expense(1, 900.0, "Rent"),
        ])
        .await;

    let recent = fx.service.list_recent(3).await.unwrap();
    let recent_ids: Vec<&str> = recent.iter().map(|t| t.id.as_str()).collect();
    assert_eq!(recent_ids, vec![ids[1].as_str(), ids[2].as_str(), ids[0].as_str()]);
}

#[tokio::test]
async fn list_by_kind_keeps_insertion_order() {
    let fx = setup();
    fx.record_all(vec![
        income(1, 100.0, "Salary"),
        expense(2, 20.0, "Fuel"),
        income(3, 50.0, "Refund"),
    ])
    .await;

    let incomes = fx.service.list_by_kind(TransactionKind::Income).await.unwrap();
    let categories: Vec<&str> = incomes.iter().map(|t| t.category.as_str()).collect();
    assert_eq!(categories, vec!["Salary", "Refund"]);
}

#[tokio::test]
async fn list_accepts_caller_options() {
    let fx = setup();
    fx.record_all(vec![
        expense(1, 15.0, "Books"),
        expense(2, 150.0, "Phone"),
        expense(3, 75.0, "Shoes"),
    ])
    .await;

    let options = QueryOptions::new()
        .filter("amount", FilterOperator::Gte, 50)
        .order_by("amount", SortDirection::Asc);
    let big = fx.service.list(&options).await.unwrap();
    let categories: Vec<&str> = big.iter().map(|t| t.category.as_str()).collect();
    assert_eq!(categories, vec!["Shoes", "Phone"]);
}

#[tokio::test]
async fn edit_applies_patch_and_keeps_other_fields() {
    let fx = setup();
    let original = fx
        .service
        .record(expense(4, 60.0, "Dinner").with_description("Team dinner"))
        .await
        .unwrap();
    fx.clock.advance(Duration::minutes(5));

    let id = DocumentId::new(original.id.clone());
    let patch = TransactionPatch {
        amount: Some(64.5),
        status: Some(TransactionStatus::Pending),
        ..Default::default()
    };
    let edited = fx.service.edit(&id, patch).await.unwrap();

    assert_eq!(edited.amount, 64.5);
    assert_eq!(edited.status, TransactionStatus::Pending);
    assert_eq!(edited.description, "Team dinner");
    assert_eq!(edited.created_at, original.created_at);
    assert_eq!(edited.updated_at, "2026-04-01T08:35:00.000Z");
}

#[tokio::test]
async fn edit_can_set_and_clear_the_reference() {
    let fx = setup();
    let txn = fx
        .service
        .record(expense(4, 60.0, "Dinner").with_reference("RCPT-1"))
        .await
        .unwrap();
    let id = DocumentId::new(txn.id.clone());

    let untouched = fx
        .service
        .edit(&id, TransactionPatch { amount: Some(61.0), ..Default::default() })
        .await
        .unwrap();
    assert_eq!(untouched.reference.as_deref(), Some("RCPT-1"));

    let replaced = fx
        .service
        .edit(&id, TransactionPatch { reference: Some(Some("RCPT-2".to_string())), ..Default::default() })
        .await
        .unwrap();
    assert_eq!(replaced.reference.as_deref(), Some("RCPT-2"));

    let cleared = fx
        .service
        .edit(&id, TransactionPatch { reference: Some(None), ..Default::default() })
        .await
        .unwrap();
    assert_eq!(cleared.reference, None);
    assert_eq!(fx.service.get(&id).await.unwrap().reference, None);
}

#[tokio::test]
async fn edit_rejects_invalid_patch() {
    let fx = setup();
    let txn = fx.service.record(expense(4, 60.0, "Dinner")).await.unwrap();
    let patch = TransactionPatch {
        currency: Some("euro".to_string()),
        ..Default::default()
    };
    let err = fx
        .service
        .edit(&DocumentId::new(txn.id), patch)
        .await
        .unwrap_err();
    assert!(matches!(err, ApplicationError::DomainError(_)));
}

#[tokio::test]
async fn remove_soft_deletes_and_purge_hard_deletes() {
    let fx = setup();
    let ids = fx
        .record_all(vec![income(1, 100.0, "Salary"), expense(2, 30.0, "Fuel")])
        .await;
    let salary = DocumentId::new(ids[0].clone());
    let fuel = DocumentId::new(ids[1].clone());

    fx.service.remove(&salary).await.unwrap();
    let removed = fx.service.get(&salary).await.unwrap();
    assert!(removed.is_deleted);
    assert_eq!(fx.service.list(&QueryOptions::default()).await.unwrap().len(), 1);

    fx.service.purge(&fuel).await.unwrap();
    assert!(fx.service.get(&fuel).await.unwrap_err().is_not_found());
    assert_eq!(fx.registry.document_count("transactions").await, 1);
}

#[tokio::test]
async fn missing_ids_surface_not_found() {
    let fx = setup();
    let missing = DocumentId::new("transactions_0_42");
    let patch = TransactionPatch {
        amount: Some(1.0),
        ..Default::default()
    };
    assert!(fx.service.get(&missing).await.unwrap_err().is_not_found());
    assert!(fx.service.edit(&missing, patch).await.unwrap_err().is_not_found());
    assert!(fx.service.remove(&missing).await.unwrap_err().is_not_found());
    assert!(fx.service.purge(&missing).await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn summary_ignores_removed_and_cancelled_entries() {
    let fx = setup();
    let ids = fx
        .record_all(vec![
            income(1, 1000.0, "Salary"),
            expense(2, 250.0, "Rent"),
            expense(3, 80.0, "Concert").with_status(TransactionStatus::Cancelled),
            expense(4, 45.5, "Groceries"),
        ])
        .await;
    fx.service
        .remove(&DocumentId::new(ids[3].clone()))
        .await
        .unwrap();

    let summary = fx.service.summary().await.unwrap();
    assert_eq!(summary.total_income, 1000.0);
    assert_eq!(summary.total_expense, 250.0);
    assert_eq!(summary.balance, 750.0);
    assert_eq!(summary.transaction_count, 2);
}

#[tokio::test]
async fn service_and_raw_store_share_the_collection() {
    let fx = setup();
    let txn = fx.service.record(income(7, 5.0, "Tips")).await.unwrap();

    let raw = MemoryStorageService::new(&fx.registry, "transactions");
    let doc = raw.get_by_id(&DocumentId::new(txn.id.clone())).await.unwrap();
    assert_eq!(doc.get_field_value("category"), Some(&serde_json::json!("Tips")));

    // A document written without the transaction shape cannot be read back as one.
    let odd = raw.create(serde_json::Map::new()).await.unwrap();
    let err = fx.service.get(&odd.document_id()).await.unwrap_err();
    assert!(matches!(err, ApplicationError::DataFormat { .. }));
}
