//! Integration tests for the full sync cycle.
//!
//! These tests drive the reconciler and scheduler end-to-end over the
//! in-memory adapters, verifying the flow a live deployment performs:
//! 1. Fetch allocations from the panel
//! 2. Read the firewall alias (in either wire shape)
//! 3. Diff under the excluded-port set
//! 4. Full-replace write plus reconfigure, only when something changed
//!
//! Uses the mock adapters to test the pipeline without external services.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use port_mapper::adapters::opnsense::MockAliasStore;
use port_mapper::adapters::pterodactyl::MockAllocationSource;
use port_mapper::application::{Reconciler, Scheduler, SyncOutcome, DEFAULT_ALIAS_DESCRIPTION};
use port_mapper::domain::{AliasContent, AliasEntry, PortSet};

const ALIAS: &str = "pterodactyl_ports";

fn wire(
    source: MockAllocationSource,
    store: MockAliasStore,
    excluded: PortSet,
) -> (Reconciler, Arc<MockAllocationSource>, Arc<MockAliasStore>) {
    let source = Arc::new(source);
    let store = Arc::new(store);
    let reconciler = Reconciler::new(source.clone(), store.clone(), ALIAS, excluded);
    (reconciler, source, store)
}

#[tokio::test]
async fn fresh_alias_gets_the_allocated_port() {
    // One server with one allocation, empty alias, no exclusions.
    let (reconciler, _, store) = wire(
        MockAllocationSource::new()
            .with_port("S1", 25565)
            .with_servers_seen(1),
        MockAliasStore::new(ALIAS),
        PortSet::new(),
    );

    let report = reconciler.sync().await.unwrap();

    assert_eq!(report.outcome, SyncOutcome::Updated);
    assert_eq!(report.to_add, PortSet::from([25565]));
    assert!(report.to_remove.is_empty());

    // The write payload is the exact flat-string encoding.
    let record = store.record();
    assert_eq!(record.content, Some(AliasContent::Text("25565".to_string())));
    assert_eq!(record.description, DEFAULT_ALIAS_DESCRIPTION);
    assert_eq!(store.apply_count(), 1);
}

#[tokio::test]
async fn mapping_shaped_alias_content_is_reconciled() {
    // The firewall stored its state in the mapping shape; the sync must
    // read it and write back the flat shape.
    let content = AliasContent::Entries(
        [
            ("80".to_string(), AliasEntry::default()),
            ("row_1".to_string(), AliasEntry::selected("443")),
            ("row_2".to_string(), AliasEntry::selected("")),
        ]
        .into_iter()
        .collect(),
    );

    let (reconciler, _, store) = wire(
        MockAllocationSource::new().with_port("S1", 80).with_port("S2", 8080),
        MockAliasStore::new(ALIAS).with_content(content),
        PortSet::new(),
    );

    let report = reconciler.sync().await.unwrap();

    assert_eq!(report.actual, PortSet::from([80, 443]));
    assert_eq!(report.to_add, PortSet::from([8080]));
    assert_eq!(report.to_remove, PortSet::from([443]));
    assert_eq!(
        store.record().content,
        Some(AliasContent::Text("80\n8080".to_string()))
    );
}

#[tokio::test]
async fn odd_mapping_rows_do_not_fail_the_cycle() {
    // The firewall may attach rows in shapes we don't know; the read
    // skips them instead of aborting the sync.
    let content: AliasContent = serde_json::from_str(
        r#"{"row_1": {"selected": "80"}, "row_2": "garbage"}"#,
    )
    .unwrap();

    let (reconciler, _, store) = wire(
        MockAllocationSource::new().with_port("S1", 80),
        MockAliasStore::new(ALIAS).with_content(content),
        PortSet::new(),
    );

    let report = reconciler.sync().await.unwrap();

    assert_eq!(report.outcome, SyncOutcome::InSync);
    assert_eq!(report.actual, PortSet::from([80]));
    assert_eq!(store.write_count(), 0);
}

#[tokio::test]
async fn repeated_syncs_converge_and_stay_idle() {
    let (reconciler, _, store) = wire(
        MockAllocationSource::new().with_port("S1", 80).with_port("S2", 443),
        MockAliasStore::new(ALIAS).with_ports(PortSet::from([9000])),
        PortSet::new(),
    );

    let first = reconciler.sync().await.unwrap();
    let second = reconciler.sync().await.unwrap();
    let third = reconciler.sync().await.unwrap();

    assert_eq!(first.outcome, SyncOutcome::Updated);
    assert_eq!(second.outcome, SyncOutcome::InSync);
    assert_eq!(third.outcome, SyncOutcome::InSync);

    // Exactly one write and one reconfigure across the three cycles.
    assert_eq!(store.write_count(), 1);
    assert_eq!(store.apply_count(), 1);
    assert_eq!(store.writes(), vec![PortSet::from([80, 443])]);
}

#[tokio::test]
async fn excluded_ports_are_purged_and_never_forwarded() {
    // 443 is excluded but claimed by a workload and already on the
    // firewall; the write must carry only 80 and report the violation.
    let (reconciler, _, store) = wire(
        MockAllocationSource::new().with_port("S1", 80).with_port("S2", 443),
        MockAliasStore::new(ALIAS).with_ports(PortSet::from([443])),
        PortSet::from([443]),
    );

    let report = reconciler.sync().await.unwrap();

    assert_eq!(report.forbidden_present, PortSet::from([443]));
    assert_eq!(report.desired, PortSet::from([80]));
    assert_eq!(store.writes(), vec![PortSet::from([80])]);
    assert_eq!(
        store.record().content,
        Some(AliasContent::Text("80".to_string()))
    );
}

#[tokio::test]
async fn allocations_vanishing_empties_the_alias() {
    let (reconciler, source, store) = wire(
        MockAllocationSource::new().with_port("S1", 25565),
        MockAliasStore::new(ALIAS),
        PortSet::new(),
    );

    reconciler.sync().await.unwrap();
    source.set_records(Vec::new());
    let report = reconciler.sync().await.unwrap();

    assert_eq!(report.outcome, SyncOutcome::Updated);
    assert_eq!(report.to_remove, PortSet::from([25565]));
    assert_eq!(store.record().content, Some(AliasContent::Text(String::new())));
}

#[tokio::test]
async fn existing_description_survives_updates() {
    let (reconciler, _, store) = wire(
        MockAllocationSource::new().with_port("S1", 80),
        MockAliasStore::new(ALIAS).with_description("curated by hand"),
        PortSet::new(),
    );

    reconciler.sync().await.unwrap();

    assert_eq!(store.record().description, "curated by hand");
}

#[tokio::test]
async fn scheduler_recovers_after_write_rejections() {
    let (reconciler, _, store) = wire(
        MockAllocationSource::new().with_port("S1", 80),
        MockAliasStore::new(ALIAS).with_replace_error(
            port_mapper::ports::StoreError::WriteRejected("not saved".to_string()),
        ),
        PortSet::new(),
    );

    // First cycle fails at the write; remote state is untouched.
    let failed = reconciler.sync().await.unwrap();
    assert_eq!(failed.outcome, SyncOutcome::UpdateFailed);
    assert_eq!(store.write_count(), 0);

    // Next cycle retries the identical full replace and succeeds.
    store.clear_replace_error();
    let retried = reconciler.sync().await.unwrap();
    assert_eq!(retried.outcome, SyncOutcome::Updated);
    assert_eq!(store.writes(), vec![PortSet::from([80])]);
}

#[tokio::test]
async fn scheduler_loops_until_shutdown() {
    let source = Arc::new(MockAllocationSource::new().with_port("S1", 80));
    let store = Arc::new(MockAliasStore::new(ALIAS));
    let reconciler = Reconciler::new(source.clone(), store.clone(), ALIAS, PortSet::new());
    let scheduler = Scheduler::new(reconciler, Duration::from_millis(5));

    let (tx, rx) = watch::channel(false);
    let handle = tokio::spawn(async move { scheduler.run(rx).await });

    tokio::time::sleep(Duration::from_millis(40)).await;
    tx.send(true).unwrap();
    handle.await.unwrap();

    // First cycle wrote, the rest were in-sync no-ops.
    assert!(source.fetch_count() >= 2);
    assert_eq!(store.write_count(), 1);
}
