mod common;

use std::{
    thread,
    time::{Duration, Instant},
};

use finpulse::{
    dashboard::Dashboard,
    error::DashboardError,
    snapshot::Snapshot,
    source::{ConnectionState, DataSource, DirectorySource, SourceEvent},
};

use common::{SALES_CSV, TestWorkspace};

fn fast_source(workspace: &TestWorkspace) -> DirectorySource {
    DirectorySource::new(workspace.path()).with_poll_interval(Duration::from_millis(20))
}

#[test]
fn csv_table_builds_the_sales_snapshot() {
    let workspace = TestWorkspace::new();
    workspace.write("sales.csv", SALES_CSV);
    let mut dashboard = Dashboard::new(fast_source(&workspace), "sales");
    dashboard.refresh().expect("refresh");
    let snapshot = dashboard.snapshot().expect("snapshot");
    assert_eq!(snapshot.categories()[0].name, "Marketing");
    assert_eq!(snapshot.categories()[0].margin_percent, -20.0);
    assert_eq!(snapshot.categories()[1].revenue, 300.0);
    assert_eq!(snapshot.role_keys.expense, "cost");
}

#[test]
fn ndjson_and_tsv_tables_are_read() {
    let workspace = TestWorkspace::new();
    workspace.write(
        "orders.ndjson",
        "{\"order_id\":1,\"amount\":12.5,\"category\":\"Books\",\"date\":\"2024-05-02\"}\n\
         \n\
         {\"order_id\":2,\"amount\":7.5,\"category\":\"Games\",\"date\":\"2024-05-09\"}\n",
    );
    workspace.write(
        "costs.tsv",
        "dept\tspending\tdate\nOps\t20\t2024-05-01\nOps\t5\t2024-06-01\n",
    );
    let source = fast_source(&workspace);

    let orders = source.select_all("orders", 100).expect("orders");
    assert_eq!(orders.len(), 2);
    let mut dashboard = Dashboard::new(source.clone(), "orders");
    dashboard.refresh().expect("refresh orders");
    assert_eq!(dashboard.snapshot().expect("snapshot").totals().revenue, 20.0);

    dashboard.set_table("costs").expect("switch to costs");
    let snapshot = dashboard.snapshot().expect("snapshot");
    assert_eq!(snapshot.totals().expenses, 25.0);
    assert_eq!(snapshot.totals().profit, -25.0);
    assert_eq!(snapshot.monthly().len(), 2);
}

#[test]
fn numeric_looking_categories_and_ids_keep_their_text() {
    let workspace = TestWorkspace::new();
    workspace.write(
        "codes.csv",
        "id,revenue,cost,department,created_at
         00042,10,0,01,2024-01-10
         A-2,20,0,1,2024-01-11
         A-3,5,0,1.50,2024-01-12
",
    );
    let rows = fast_source(&workspace)
        .select_all("codes", 100)
        .expect("codes");
    let snapshot = Snapshot::build(&rows).expect("snapshot");
    let categories = snapshot
        .categories()
        .iter()
        .map(|c| (c.name.as_str(), c.revenue))
        .collect::<Vec<_>>();
    assert_eq!(categories, vec![("01", 10.0), ("1", 20.0), ("1.50", 5.0)]);
    let labels = snapshot
        .top_profit_rows()
        .iter()
        .map(|r| r.label.as_str())
        .collect::<Vec<_>>();
    assert_eq!(labels, vec!["A-2", "00042", "A-3"]);
}

#[test]
fn path_like_table_names_are_unavailable() {
    let workspace = TestWorkspace::new();
    workspace.write("sales.csv", SALES_CSV);
    let mut dashboard = Dashboard::new(fast_source(&workspace), "../sales");
    let err = dashboard.refresh().expect_err("rejected name");
    assert!(matches!(err, DashboardError::TableUnavailable { .. }));
}

#[test]
fn appended_rows_are_delivered_live() {
    let workspace = TestWorkspace::new();
    workspace.write("sales.csv", SALES_CSV);
    let mut dashboard = Dashboard::new(fast_source(&workspace), "sales");
    dashboard.refresh().expect("refresh");
    dashboard.connect().expect("connect");

    workspace.append("sales.csv", "A-4,40,10,Ops,2024-03-02\n");
    let deadline = Instant::now() + Duration::from_secs(5);
    let mut applied = 0;
    while applied == 0 {
        assert!(Instant::now() < deadline, "appended row never arrived");
        thread::sleep(Duration::from_millis(10));
        applied += dashboard.pump_live();
    }
    assert_eq!(applied, 1);
    assert_eq!(dashboard.connection_state(), Some(ConnectionState::Connected));
    let snapshot = dashboard.snapshot().expect("snapshot");
    assert_eq!(snapshot.totals().row_count, 4);
    assert!(snapshot.categories().iter().any(|c| c.name == "Ops"));
}

#[test]
fn removing_the_file_disconnects_the_subscription() {
    let workspace = TestWorkspace::new();
    let path = workspace.write("sales.csv", SALES_CSV);
    let source = fast_source(&workspace);
    let mut subscription = source.subscribe("sales").expect("subscribe");
    assert_eq!(
        subscription.next_timeout(Duration::from_secs(5)),
        Some(SourceEvent::State(ConnectionState::Connecting))
    );
    assert_eq!(
        subscription.next_timeout(Duration::from_secs(5)),
        Some(SourceEvent::State(ConnectionState::Connected))
    );
    std::fs::remove_file(path).expect("remove table file");
    assert_eq!(
        subscription.next_timeout(Duration::from_secs(5)),
        Some(SourceEvent::State(ConnectionState::Disconnected))
    );
    assert!(subscription.is_closed());
}

#[test]
fn subscribing_to_a_missing_table_disconnects_immediately() {
    let workspace = TestWorkspace::new();
    let source = fast_source(&workspace);
    let mut subscription = source.subscribe("ghost").expect("subscribe");
    assert_eq!(
        subscription.try_next(),
        Some(SourceEvent::State(ConnectionState::Connecting))
    );
    assert_eq!(
        subscription.try_next(),
        Some(SourceEvent::State(ConnectionState::Disconnected))
    );
}
