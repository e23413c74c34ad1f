use serde_json::json;
use tometo_core::{NewTask, PriorityLabel, TaskDraft, TaskPatch};
use tometo_store::{RestConfig, RestStore, RetryPolicy, StoreError, TaskStore};
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fast_retry(max_attempts: usize) -> RetryPolicy {
    RetryPolicy {
        max_attempts,
        min_delay_ms: 1,
        max_delay_ms: 5,
        jitter: false,
    }
}

fn store(server: &MockServer, retry: RetryPolicy) -> RestStore {
    let mut cfg = RestConfig::new(server.uri(), "anon-key");
    cfg.access_token = Some("user-token".to_string());
    cfg.retry = retry;
    RestStore::new(cfg).unwrap()
}

fn task_row(id: &str, column: &str, score: i64) -> serde_json::Value {
    json!({
        "id": id,
        "column_id": column,
        "title": format!("task {id}"),
        "description": null,
        "due_date": null,
        "importance": 3,
        "urgency": 3,
        "estimate_pomodori": 1,
        "labels": [],
        "priority_score": score,
        "priority_label": "Low"
    })
}

#[tokio::test]
async fn test_list_columns_sends_auth_and_filters() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/columns"))
        .and(query_param("board_id", "eq.b1"))
        .and(query_param("order", "position.asc"))
        .and(header("apikey", "anon-key"))
        .and(header("authorization", "Bearer user-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": 1, "board_id": "b1", "title": "To do", "position": 0 },
            { "id": 2, "board_id": "b1", "title": "Done", "position": 1 }
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let cols = store(&server, fast_retry(1)).list_columns("b1").await.unwrap();
    assert_eq!(cols.len(), 2);
    assert_eq!(cols[0].id, "1");
    assert_eq!(cols[1].title, "Done");
}

#[tokio::test]
async fn test_list_tasks_uses_in_filter() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/tasks"))
        .and(query_param("column_id", r#"in.("c1","c2")"#))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([task_row("t1", "c1", 40)])))
        .expect(1)
        .mount(&server)
        .await;

    let s = store(&server, fast_retry(1));
    let tasks = s
        .list_tasks(&["c1".to_string(), "c2".to_string()])
        .await
        .unwrap();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].priority_score, Some(40));

    // No columns, no request.
    assert!(s.list_tasks(&[]).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_insert_posts_scored_row() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/tasks"))
        .and(header("prefer", "return=representation"))
        .and(body_json(json!([{
            "title": "Plan sprint",
            "description": null,
            "column_id": "c1",
            "due_date": null,
            "importance": 4,
            "urgency": null,
            "estimate_pomodori": null,
            "labels": ["blocker"],
            "priority_score": 53,
            "priority_label": "Medium"
        }])))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([task_row("t9", "c1", 53)])))
        .expect(1)
        .mount(&server)
        .await;

    let new = NewTask {
        draft: TaskDraft::new("Plan sprint", "c1").with_importance(4).with_label("blocker"),
        priority_score: 53,
        priority_label: PriorityLabel::Medium,
    };
    let task = store(&server, fast_retry(1)).insert_task(&new).await.unwrap();
    assert_eq!(task.id, "t9");
}

/// Transient 503s are retried until the write lands.
#[tokio::test]
async fn test_update_retries_transient_failures() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/tasks"))
        .and(query_param("id", "eq.t1"))
        .respond_with(ResponseTemplate::new(503).set_body_string("busy"))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/tasks"))
        .and(query_param("id", "eq.t1"))
        .and(body_json(json!({ "column_id": "done" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([task_row("t1", "done", 12)])))
        .expect(1)
        .mount(&server)
        .await;

    let task = store(&server, fast_retry(3))
        .update_task("t1", &TaskPatch::column("done"))
        .await
        .unwrap();
    assert_eq!(task.column_id, "done");
}

/// Attempts are bounded; the last error surfaces.
#[tokio::test]
async fn test_update_gives_up_after_max_attempts() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/tasks"))
        .respond_with(ResponseTemplate::new(429))
        .expect(2)
        .mount(&server)
        .await;

    let err = store(&server, fast_retry(2))
        .update_task("t1", &TaskPatch::column("done"))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::RateLimited));
}

/// Client errors are not retried.
#[tokio::test]
async fn test_client_errors_are_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/tasks"))
        .respond_with(ResponseTemplate::new(400).set_body_string("bad column"))
        .expect(1)
        .mount(&server)
        .await;

    let err = store(&server, fast_retry(3))
        .update_task("t1", &TaskPatch::column("nope"))
        .await
        .unwrap_err();
    match err {
        StoreError::Status { status, body } => {
            assert_eq!(status, 400);
            assert_eq!(body, "bad column");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_missing_rows_map_to_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/tasks"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/rest/v1/tasks"))
        .and(query_param("id", "eq.gone"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let s = store(&server, fast_retry(3));
    assert!(matches!(
        s.update_task("gone", &TaskPatch::column("done")).await,
        Err(StoreError::TaskNotFound(_))
    ));
    assert!(matches!(s.delete_task("gone").await, Err(StoreError::TaskNotFound(_))));
}
