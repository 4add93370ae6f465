use axum::Router;
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tarl_sync::{
    app::AppState,
    config::DatabaseCfg,
    db::{Row, connections::ConnectionManager, memory::MemoryDatabase, postgres::PgDatabase},
    http,
};
use tokio::task::JoinHandle;

struct TestServer {
    base: String,
    primary: Arc<MemoryDatabase>,
    secondary: Arc<MemoryDatabase>,
    _handle: JoinHandle<()>,
}

async fn start_server() -> TestServer {
    let primary = Arc::new(MemoryDatabase::new());
    let secondary = Arc::new(MemoryDatabase::new());
    let connections = ConnectionManager::new(primary.clone(), secondary.clone());
    let state = AppState::new(connections, 100);
    let app: Router = http::build_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    TestServer {
        base: format!("http://{}", addr),
        primary,
        secondary,
        _handle: handle,
    }
}

fn row(v: Value) -> Row {
    v.as_object().cloned().unwrap()
}

fn school_rows(n: usize) -> Vec<Row> {
    (0..n)
        .map(|i| row(json!({ "row": { "id": i + 1, "name": format!("School {}", i + 1) } })))
        .collect()
}

#[tokio::test]
async fn health_reports_each_side() {
    let srv = start_server().await;
    let client = reqwest::Client::new();

    let res = client.get(format!("{}/health", srv.base)).send().await.unwrap();
    assert!(res.status().is_success());
    let v: Value = res.json().await.unwrap();
    assert_eq!(v, json!({ "local": true, "remote": true }));

    // Remote goes away
    srv.secondary.set_unavailable(true);
    let res = client.get(format!("{}/health", srv.base)).send().await.unwrap();
    assert_eq!(res.status(), reqwest::StatusCode::SERVICE_UNAVAILABLE);
    let v: Value = res.json().await.unwrap();
    assert_eq!(v, json!({ "local": true, "remote": false }));
}

#[tokio::test]
async fn sync_table_replaces_secondary_rows_in_batches() {
    let srv = start_server().await;
    srv.primary.respond("FROM \"tbl_tarl_schools\"", school_rows(250));
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{}/sync/tables/tbl_tarl_schools", srv.base))
        .send()
        .await
        .unwrap();
    assert!(res.status().is_success());
    let v: Value = res.json().await.unwrap();
    assert_eq!(v["success"], json!(true));
    assert_eq!(v["rows_synced"], json!(250));

    assert_eq!(srv.secondary.count_starting_with("TRUNCATE"), 1);
    assert_eq!(srv.secondary.count_starting_with("INSERT"), 250);
}

#[tokio::test]
async fn failed_table_copy_returns_bad_gateway_with_result() {
    let srv = start_server().await;
    srv.primary.respond("FROM \"tbl_tarl_schools\"", school_rows(2));
    srv.secondary.fail_on("INSERT INTO \"tbl_tarl_schools\"");
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{}/sync/tables/tbl_tarl_schools", srv.base))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), reqwest::StatusCode::BAD_GATEWAY);
    let v: Value = res.json().await.unwrap();
    assert_eq!(v["table"], json!("tbl_tarl_schools"));
    assert_eq!(v["success"], json!(false));
    assert_eq!(v["rows_synced"], json!(0));
    assert!(v["error"].is_string());
    assert_eq!(srv.secondary.count_starting_with("TRUNCATE"), 0);
}

#[tokio::test]
async fn sync_table_outside_allowlist_is_rejected() {
    let srv = start_server().await;
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{}/sync/tables/tbl_tarl_users", srv.base))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), reqwest::StatusCode::BAD_REQUEST);
    assert!(srv.secondary.statements().is_empty());
}

#[tokio::test]
async fn full_sync_shows_up_in_status() {
    let srv = start_server().await;
    srv.primary.respond("FROM \"tbl_tarl_schools\"", school_rows(3));
    let client = reqwest::Client::new();

    let res = client.post(format!("{}/sync/all", srv.base)).send().await.unwrap();
    assert!(res.status().is_success());
    let summary: Value = res.json().await.unwrap();
    assert_eq!(summary["log"]["tables_failed"], json!(0));
    assert_eq!(summary["log"]["total_rows"], json!(3));

    srv.primary.respond("COUNT(*)", vec![row(json!({ "count": 3 }))]);
    srv.secondary.respond("COUNT(*)", vec![row(json!({ "count": 3 }))]);

    let res = client.get(format!("{}/sync/status", srv.base)).send().await.unwrap();
    assert!(res.status().is_success());
    let status: Value = res.json().await.unwrap();
    assert_eq!(status["recent_syncs"].as_array().unwrap().len(), 1);
    assert!(
        status["tables"]
            .as_array()
            .unwrap()
            .iter()
            .all(|t| t["in_sync"] == json!(true))
    );
}

#[tokio::test]
async fn sync_operation_reports_secondary_failure_in_body() {
    let srv = start_server().await;
    let client = reqwest::Client::new();
    let payload = json!({
        "operation": "UPDATE",
        "table": "tbl_tarl_students",
        "data": { "id": 5, "name": "Dara" },
    });

    let res = client
        .post(format!("{}/sync/operation", srv.base))
        .json(&payload)
        .send()
        .await
        .unwrap();
    assert!(res.status().is_success());
    let v: Value = res.json().await.unwrap();
    assert_eq!(v, json!({ "success": true, "error": null }));
    assert_eq!(srv.secondary.count_starting_with("UPDATE \"tbl_tarl_students\""), 1);

    srv.secondary.set_unavailable(true);
    let res = client
        .post(format!("{}/sync/operation", srv.base))
        .json(&payload)
        .send()
        .await
        .unwrap();
    assert!(res.status().is_success());
    let v: Value = res.json().await.unwrap();
    assert_eq!(v["success"], json!(false));
    assert!(v["error"].is_string());
}

#[tokio::test]
async fn schema_report_covers_every_table() {
    let srv = start_server().await;
    let cols = vec![row(json!({ "column_name": "id", "data_type": "integer", "is_nullable": "NO" }))];
    srv.primary.respond("information_schema.columns", cols);
    let client = reqwest::Client::new();

    let res = client.get(format!("{}/sync/schemas", srv.base)).send().await.unwrap();
    assert!(res.status().is_success());
    let arr: Value = res.json().await.unwrap();
    let arr = arr.as_array().unwrap();
    assert_eq!(arr.len(), tarl_sync::sync::tables::SYNC_TABLES.len());
    assert!(arr.iter().all(|t| t["status"] == json!("missing_on_secondary")));
}

#[tokio::test]
async fn activities_can_be_logged_and_listed() {
    let srv = start_server().await;
    let client = reqwest::Client::new();

    let entry = json!({
        "user_id": 7,
        "username": "sokha",
        "user_role": "Coordinator",
        "action_type": "UPDATE",
        "table_name": "tbl_tarl_schools",
        "record_id": 3,
        "old_data": { "name": "Old" },
        "new_data": { "name": "New" },
        "changes_summary": "renamed school",
    });
    let res = client
        .post(format!("{}/audit/activities", srv.base))
        .json(&entry)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), reqwest::StatusCode::ACCEPTED);
    assert_eq!(
        srv.primary.count_starting_with("INSERT INTO tbl_tarl_user_activities"),
        1
    );

    srv.primary.respond(
        "FROM tbl_tarl_user_activities",
        vec![row(json!({
            "id": 41,
            "user_id": 7,
            "username": "sokha",
            "user_role": "Coordinator",
            "action_type": "UPDATE",
            "table_name": "tbl_tarl_schools",
            "record_id": 3,
            "old_data": { "name": "Old" },
            "new_data": { "name": "New" },
            "changes_summary": "renamed school",
            "ip_address": null,
            "user_agent": null,
            "session_id": null,
            "is_deleted": false,
            "created_at": "2026-05-01T08:30:00+00:00",
        }))],
    );
    let res = client
        .get(format!("{}/audit/activities?limit=5&user_id=7", srv.base))
        .send()
        .await
        .unwrap();
    assert!(res.status().is_success());
    let arr: Value = res.json().await.unwrap();
    let arr = arr.as_array().unwrap();
    assert_eq!(arr.len(), 1);
    assert_eq!(arr[0]["id"], json!(41));
    assert_eq!(arr[0]["action_type"], json!("UPDATE"));

    let last = srv.primary.statements().pop().unwrap();
    assert_eq!(last.params, vec![json!(7), json!(5)]);
}

#[tokio::test]
async fn record_history_lists_activities_for_one_record() {
    let srv = start_server().await;
    let activity = |id: i64, action: &str, created_at: &str| {
        row(json!({
            "id": id,
            "user_id": 1,
            "username": "admin",
            "user_role": "Admin",
            "action_type": action,
            "table_name": "tbl_tarl_students",
            "record_id": 12,
            "old_data": null,
            "new_data": null,
            "changes_summary": null,
            "ip_address": null,
            "user_agent": null,
            "session_id": null,
            "is_deleted": false,
            "created_at": created_at,
        }))
    };
    srv.primary.respond(
        "FROM tbl_tarl_user_activities",
        vec![
            activity(50, "CREATE", "2026-02-01T07:00:00+00:00"),
            activity(61, "DELETE", "2026-02-03T07:00:00+00:00"),
        ],
    );
    let client = reqwest::Client::new();

    let res = client
        .get(format!("{}/audit/history/tbl_tarl_students/12", srv.base))
        .send()
        .await
        .unwrap();
    assert!(res.status().is_success());
    let arr: Value = res.json().await.unwrap();
    let arr = arr.as_array().unwrap();
    assert_eq!(arr.len(), 2);
    assert_eq!(arr[0]["id"], json!(50));
    assert_eq!(arr[0]["action_type"], json!("CREATE"));
    assert_eq!(arr[1]["action_type"], json!("DELETE"));
    assert_eq!(arr[1]["record_id"], json!(12));

    let last = srv.primary.statements().pop().unwrap();
    assert_eq!(last.params, vec![json!("tbl_tarl_students"), json!(12)]);

    srv.primary.set_unavailable(true);
    let res = client
        .get(format!("{}/audit/history/tbl_tarl_students/12", srv.base))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), reqwest::StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn activity_logging_survives_a_dead_primary() {
    let srv = start_server().await;
    srv.primary.set_unavailable(true);
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{}/audit/activities", srv.base))
        .json(&json!({ "action_type": "LOGIN", "table_name": "tbl_tarl_users" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), reqwest::StatusCode::ACCEPTED);

    let res = client
        .get(format!("{}/audit/activities", srv.base))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), reqwest::StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn soft_delete_and_restore_round_trip_through_functions() {
    let srv = start_server().await;
    srv.primary.respond("soft_delete_record", vec![row(json!({ "success": true }))]);
    srv.primary.respond("restore_deleted_record", vec![row(json!({ "success": true }))]);
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{}/audit/soft-delete", srv.base))
        .json(&json!({ "table": "tbl_tarl_students", "record_id": 12, "user_id": 1, "reason": "duplicate" }))
        .send()
        .await
        .unwrap();
    let v: Value = res.json().await.unwrap();
    assert_eq!(v, json!({ "success": true }));

    let res = client
        .post(format!("{}/audit/restore", srv.base))
        .json(&json!({ "table": "tbl_tarl_students", "record_id": 12, "user_id": 1 }))
        .send()
        .await
        .unwrap();
    let v: Value = res.json().await.unwrap();
    assert_eq!(v, json!({ "success": true }));

    srv.primary.respond(
        "WHERE t.is_deleted",
        vec![row(json!({ "row": { "id": 12, "is_deleted": true } }))],
    );
    let res = client
        .get(format!("{}/audit/deleted/tbl_tarl_students", srv.base))
        .send()
        .await
        .unwrap();
    assert!(res.status().is_success());
    let arr: Value = res.json().await.unwrap();
    assert_eq!(arr, json!([{ "id": 12, "is_deleted": true }]));

    let res = client
        .get(format!("{}/audit/deleted/tbl_tarl_users", srv.base))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), reqwest::StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unreachable_postgres_hosts_report_false() {
    let cfg = |port: u16| DatabaseCfg {
        url: format!("postgres://tarl@127.0.0.1:{port}/tarl"),
        max_connections: 1,
        acquire_timeout: Duration::from_millis(500),
    };
    let down = PgDatabase::connect_lazy(&cfg(1)).unwrap();
    let also_down = PgDatabase::connect_lazy(&cfg(2)).unwrap();

    // Local side scripted as reachable, remote side a real unreachable pool.
    let mgr = ConnectionManager::new(Arc::new(MemoryDatabase::new()), Arc::new(down));
    let status = mgr.test_connections().await;
    assert!(status.local);
    assert!(!status.remote);

    let mgr = ConnectionManager::new(Arc::new(also_down), Arc::new(MemoryDatabase::new()));
    let status = mgr.test_connections().await;
    assert!(!status.local);
    assert!(status.remote);
}
