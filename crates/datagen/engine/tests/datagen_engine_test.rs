//! integration tests for bank-datagen-engine

use std::{
    collections::{BTreeMap, BTreeSet},
    fs,
    sync::Arc,
};

use bank_datagen_domain::{
    AccountId, AuditOperation, CustomerId,
    account::LinkRole,
    customer::KycStatus,
    tabular::Tabular,
    transaction::TransactionRecord,
};
use bank_datagen_engine::{
    CsvSink, CustomerEntityGenerator, DatagenEngine, DatagenEngineErrorKind, FakerFactSource,
    GenerationPlan, RandomFactSource, sink,
};
use bank_datagen_store::{Dataset, MemoryStore};
use bank_datagen_test_utils::{FlakyStore, fixed_now};
use chrono::{DateTime, Utc};
use uuid::Uuid;

fn facts(seed: u64) -> Arc<FakerFactSource> {
    Arc::new(FakerFactSource::builder().seed(seed).fixed_now(fixed_now()).build())
}

fn engine<S>(seed: u64, store: S) -> DatagenEngine<S>
where
    S: bank_datagen_store::AuditStore + Clone,
{
    DatagenEngine::builder().facts(facts(seed)).store(store).build()
}

fn owners(dataset: &Dataset) -> BTreeMap<AccountId, CustomerId> {
    dataset
        .links()
        .iter()
        .filter(|link| link.role() == LinkRole::Owner)
        .map(|link| (link.account_id(), link.customer_id()))
        .collect()
}

#[tokio::test]
async fn five_customers_get_consistent_accounts() {
    // Arrange
    let store = MemoryStore::with_seed(11);
    let engine = engine(11, store.clone());

    // Act
    let report = engine.run(GenerationPlan::builder().customers(5).build()).await.unwrap();

    // Assert
    let dataset = store.snapshot().unwrap();

    assert_eq!(report.customers_created(), 5);
    assert!(report.failed_customers().is_empty());
    assert!((5..=20).contains(&dataset.accounts().len()));
    assert_eq!(report.accounts_created(), dataset.accounts().len());

    let customers: BTreeMap<_, _> = dataset
        .customers()
        .iter()
        .map(|customer| (customer.customer_id(), customer.created_at()))
        .collect();

    let owners = owners(&dataset);
    assert_eq!(owners.len(), dataset.accounts().len());

    let owning: BTreeSet<_> = owners.values().copied().collect();
    assert_eq!(owning, customers.keys().copied().collect::<BTreeSet<_>>());

    for account in dataset.accounts() {
        let owner = owners[&account.account_id()];
        assert!(account.created_at() >= customers[&owner]);
        assert!(account.created_at() < fixed_now());
    }

    for link in dataset.links().iter().filter(|link| link.role() == LinkRole::Member) {
        let owner = owners[&link.account_id()];
        assert_ne!(link.customer_id(), owner);
        assert!(customers.contains_key(&link.customer_id()));

        let account = dataset
            .accounts()
            .iter()
            .find(|account| account.account_id() == link.account_id())
            .unwrap();
        assert!(link.created_at() >= account.created_at());
        assert!(link.created_at() >= customers[&link.customer_id()]);
    }
}

#[tokio::test]
async fn audit_ids_are_never_reused() {
    let store = MemoryStore::with_seed(5);
    let engine = engine(5, store.clone());

    engine
        .run(GenerationPlan::builder().customers(20).customer_updates(10).transactions(30).build())
        .await
        .unwrap();

    let dataset = store.snapshot().unwrap();

    let ids: Vec<Uuid> = dataset
        .customers()
        .iter()
        .map(|record| Uuid::from(record.audit_id()))
        .chain(dataset.accounts().iter().map(|record| Uuid::from(record.audit_id())))
        .chain(dataset.customers().iter().map(|record| Uuid::from(record.customer_id())))
        .chain(dataset.accounts().iter().map(|record| Uuid::from(record.account_id())))
        .chain(dataset.transactions().iter().map(|record| Uuid::from(record.transaction_id())))
        .collect();

    let distinct: BTreeSet<_> = ids.iter().collect();

    // every customer id appears once per version, every other id exactly once
    let versions = dataset.customers().len() - 20;
    assert_eq!(distinct.len(), ids.len() - versions);
}

#[tokio::test]
async fn updates_keep_creation_time_and_move_forward() {
    let store = MemoryStore::with_seed(8);
    let engine = engine(8, store.clone());

    let report = engine
        .run(GenerationPlan::builder().customers(10).customer_updates(4).build())
        .await
        .unwrap();

    assert_eq!(report.customers_updated(), 4);

    let dataset = store.snapshot().unwrap();

    for update in dataset.customers().iter().filter(|r| r.operation() == AuditOperation::Update) {
        let insert = dataset
            .customers()
            .iter()
            .find(|r| {
                r.customer_id() == update.customer_id() && r.operation() == AuditOperation::Insert
            })
            .unwrap();

        assert_eq!(update.created_at(), insert.created_at());
        assert!(update.updated_at() >= insert.updated_at());
        assert!(!update.same_mutable_fields(insert));
    }
}

#[tokio::test]
async fn kyc_moves_to_verified_about_thirty_percent_of_the_time() {
    let generator = CustomerEntityGenerator::builder()
        .facts(facts(1234))
        .store(MemoryStore::with_seed(1234))
        .build();

    let seed = loop {
        let candidate = generator.create_new().unwrap();
        if candidate.kyc_status() == KycStatus::Pending {
            break candidate;
        }
    };

    let mut verified = 0;

    for _ in 0..1000 {
        let updated = generator.create_updated(&seed).unwrap();

        assert!(!updated.same_mutable_fields(&seed), "update left every field unchanged");

        match updated.kyc_status() {
            KycStatus::Verified => verified += 1,
            KycStatus::Pending => {},
            KycStatus::Failed => panic!("update moved kyc status to FAILED"),
        }
    }

    let rate = f64::from(verified) / 1000.0;
    assert!((0.24..=0.36).contains(&rate), "PENDING -> VERIFIED rate was {rate}");
}

#[tokio::test]
async fn customer_created_now_rejects_account_batch() {
    let store = MemoryStore::with_seed(2);
    let engine = engine(2, store.clone());

    let customers = engine.customers().load_initial_data(2).await.unwrap();
    let known: BTreeMap<_, _> =
        customers.iter().map(|c| (c.customer_id(), c.created_at())).collect();
    let owner = customers[0].customer_id();

    let err = engine
        .accounts()
        .create_accounts_for_customer(owner, fixed_now(), &known)
        .await
        .unwrap_err();

    assert!(matches!(err.kind(), DatagenEngineErrorKind::InvalidRange(_)));
    assert!(store.snapshot().unwrap().accounts().is_empty());
}

#[tokio::test]
async fn past_timestamp_never_returns_now() {
    let facts = facts(3);

    assert!(facts.past_timestamp(fixed_now()).is_err());

    let after: DateTime<Utc> = fixed_now() - chrono::TimeDelta::microseconds(1);
    assert_eq!(facts.past_timestamp(after).unwrap(), after);
}

#[tokio::test]
async fn failed_account_batch_is_reported_and_the_run_continues() {
    // Arrange
    let memory = MemoryStore::with_seed(21);
    let store = FlakyStore::new(memory.clone());
    let engine = engine(21, store.clone());

    let customers = engine.customers().load_initial_data(4).await.unwrap();
    let doomed = customers[1].customer_id();
    store.fail_accounts_for(doomed);

    // Act
    let report = engine.run(GenerationPlan::builder().transactions(5).build()).await.unwrap();

    // Assert
    assert_eq!(report.failed_customers(), [doomed]);

    let dataset = memory.snapshot().unwrap();
    let owners = owners(&dataset);

    assert!(owners.values().all(|owner| *owner != doomed));

    let served: BTreeSet<_> = owners.values().copied().collect();
    assert_eq!(served.len(), 3);
    assert_eq!(report.transactions_created(), 5);
}

#[tokio::test]
async fn transactions_are_booked_after_their_account() {
    let store = MemoryStore::with_seed(17);
    let engine = engine(17, store.clone());

    let report = engine
        .run(GenerationPlan::builder().customers(3).transactions(50).build())
        .await
        .unwrap();

    assert_eq!(report.transactions_created(), 50);

    let dataset = store.snapshot().unwrap();
    let created: BTreeMap<_, _> = dataset
        .accounts()
        .iter()
        .map(|account| (account.account_id(), account.created_at()))
        .collect();

    for transaction in dataset.transactions() {
        assert!(transaction.booked_at() >= created[&transaction.account_id()]);
        assert!(transaction.booked_at() < fixed_now());
        assert!((1_000..=500_000).contains(&transaction.amount().minor()));
    }
}

#[tokio::test]
async fn no_accounts_means_no_transactions() {
    let store = MemoryStore::with_seed(4);
    let engine = engine(4, store.clone());

    let report = engine.run(GenerationPlan::builder().transactions(10).build()).await.unwrap();

    assert_eq!(report, Default::default());
    assert!(store.snapshot().unwrap().transactions().is_empty());
}

#[tokio::test]
async fn seeded_runs_are_reproducible() {
    let plan = GenerationPlan::builder().customers(6).customer_updates(3).transactions(12).build();

    let first = MemoryStore::with_seed(99);
    engine(99, first.clone()).run(plan).await.unwrap();

    let second = MemoryStore::with_seed(99);
    engine(99, second.clone()).run(plan).await.unwrap();

    let (first, second) = (first.snapshot().unwrap(), second.snapshot().unwrap());
    assert_eq!(first.customers(), second.customers());
    assert_eq!(first.accounts(), second.accounts());
    assert_eq!(first.transactions(), second.transactions());
}

#[tokio::test]
async fn csv_export_writes_one_file_per_table() {
    // Arrange
    let store = MemoryStore::with_seed(6);
    let engine = engine(6, store.clone());
    let dir = tempfile::tempdir().unwrap();

    engine
        .run(GenerationPlan::builder().customers(4).customer_updates(2).transactions(10).build())
        .await
        .unwrap();

    // Act
    let mut sink = CsvSink::new(dir.path().join("out")).unwrap();
    let counts = sink::export_dataset(&mut sink, &store.snapshot().unwrap()).unwrap();

    // Assert
    assert_eq!(counts[TransactionRecord::TABLE], 10);

    for (table, count) in counts {
        let contents = fs::read_to_string(dir.path().join("out").join(format!("{table}.csv")))
            .unwrap();
        assert_eq!(contents.lines().count(), count + 1, "{table}");
    }

    let transactions =
        fs::read_to_string(dir.path().join("out").join("transactions.csv")).unwrap();
    assert_eq!(
        transactions.lines().next().unwrap(),
        "transaction_id,account_id,type,amount,booked_at"
    );

    let accounts = fs::read_to_string(dir.path().join("out").join("account_audit.csv")).unwrap();
    assert_eq!(
        accounts.lines().next().unwrap(),
        "audit_id,account_id,status,opened_at,closed_at,type,legal_entity,created_at,updated_at,\
         audit_operation"
    );
    assert!(accounts.lines().skip(1).all(|line| line.ends_with(",I")));
}
