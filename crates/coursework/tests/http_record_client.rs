use std::collections::VecDeque;
use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use coursework::client::{
    DeleteParams, FetchParams, RecordClient, RecordClientError, RecordOperation, WriteParams,
};
use coursework::records::{AssignmentDraft, AssignmentPatch};
use coursework::{
    AssignmentAccess, CollectingNotifier, HttpRecordClient, RecordClientConfig,
    StudySessionAccess,
};
use serde_json::{Map, Value, json};
use tokio::net::TcpListener;
use tokio::sync::{Mutex, oneshot};

#[derive(Debug, Clone)]
struct MockReply {
    status: StatusCode,
    body: Value,
}

#[derive(Debug, Clone)]
struct SeenRequest {
    method: Method,
    path: String,
    project_id: Option<String>,
    public_key: Option<String>,
    request_id: Option<String>,
    body: Value,
}

#[derive(Debug, Clone)]
struct TestServerState {
    replies: Arc<Mutex<VecDeque<MockReply>>>,
    seen: Arc<Mutex<Vec<SeenRequest>>>,
}

impl TestServerState {
    fn with_replies(replies: Vec<MockReply>) -> Self {
        Self {
            replies: Arc::new(Mutex::new(VecDeque::from(replies))),
            seen: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

fn ok(body: Value) -> MockReply {
    MockReply {
        status: StatusCode::OK,
        body,
    }
}

fn client_for(url: String) -> HttpRecordClient {
    let config = RecordClientConfig::new("proj-7", "pk-test")
        .with_api_url(&url)
        .expect("test url should be accepted");
    HttpRecordClient::new(config).expect("client should build")
}

#[tokio::test]
async fn fetch_posts_field_selection_to_query_endpoint() {
    let state = TestServerState::with_replies(vec![ok(json!({
        "success": true,
        "data": [{ "Id": 1, "title_c": "Essay" }]
    }))]);
    let (url, shutdown_tx, server_task) = spawn_test_server(state.clone()).await;

    let client = client_for(url);
    let params = FetchParams {
        fields: vec![coursework::client::FieldSelector::plain("title_c")],
    };
    let response = client
        .fetch_records("assignment_c", params)
        .await
        .expect("fetch should succeed");

    shutdown_tx.send(()).expect("shutdown signal should send");
    server_task.await.expect("server task should join");

    assert!(response.success);
    assert_eq!(response.data.map(|rows| rows.len()), Some(1));

    let seen = state.seen.lock().await.clone();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].method, Method::POST);
    assert_eq!(seen[0].path, "/tables/assignment_c/records/query");
    assert_eq!(seen[0].project_id.as_deref(), Some("proj-7"));
    assert_eq!(seen[0].public_key.as_deref(), Some("pk-test"));
    assert!(
        seen[0]
            .request_id
            .as_deref()
            .is_some_and(|id| !id.is_empty())
    );
    assert_eq!(
        seen[0].body,
        json!({ "fields": [{ "field": { "Name": "title_c" } }] })
    );
}

#[tokio::test]
async fn write_operations_use_their_methods_and_paths() {
    let batch_ok = || ok(json!({ "success": true, "results": [{ "success": true }] }));
    let state = TestServerState::with_replies(vec![
        ok(json!({ "success": true, "data": { "Id": 5 } })),
        batch_ok(),
        batch_ok(),
        batch_ok(),
    ]);
    let (url, shutdown_tx, server_task) = spawn_test_server(state.clone()).await;

    let client = client_for(url);
    let mut record = Map::new();
    record.insert("Id".to_string(), json!(5));
    record.insert("completed_c".to_string(), json!(true));

    client
        .get_record_by_id("study_session_c", 5, FetchParams::default())
        .await
        .expect("get should succeed");
    client
        .create_records(
            "study_session_c",
            WriteParams {
                records: vec![Map::new()],
            },
        )
        .await
        .expect("create should succeed");
    client
        .update_records(
            "study_session_c",
            WriteParams {
                records: vec![record],
            },
        )
        .await
        .expect("update should succeed");
    client
        .delete_records(
            "study_session_c",
            DeleteParams {
                record_ids: vec![5],
            },
        )
        .await
        .expect("delete should succeed");

    shutdown_tx.send(()).expect("shutdown signal should send");
    server_task.await.expect("server task should join");

    let seen = state.seen.lock().await.clone();
    let routes = seen
        .iter()
        .map(|request| (request.method.clone(), request.path.as_str()))
        .collect::<Vec<_>>();
    assert_eq!(
        routes,
        vec![
            (Method::POST, "/tables/study_session_c/records/5/query"),
            (Method::POST, "/tables/study_session_c/records"),
            (Method::PATCH, "/tables/study_session_c/records"),
            (Method::DELETE, "/tables/study_session_c/records"),
        ]
    );
    assert_eq!(
        seen[2].body,
        json!({ "records": [{ "Id": 5, "completed_c": true }] })
    );
    assert_eq!(seen[3].body, json!({ "RecordIds": [5] }));

    let request_ids = seen
        .iter()
        .filter_map(|request| request.request_id.clone())
        .collect::<std::collections::HashSet<_>>();
    assert_eq!(request_ids.len(), 4);
}

#[tokio::test]
async fn non_success_status_maps_to_rejected_with_backend_message() {
    let state = TestServerState::with_replies(vec![
        MockReply {
            status: StatusCode::UNAUTHORIZED,
            body: json!({ "message": "Invalid public key" }),
        },
        MockReply {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: json!({ "error": { "code": "boom" } }),
        },
    ]);
    let (url, shutdown_tx, server_task) = spawn_test_server(state.clone()).await;

    let client = client_for(url);
    let unauthorized = client
        .fetch_records("assignment_c", FetchParams::default())
        .await
        .expect_err("401 should fail");
    let server_error = client
        .delete_records("assignment_c", DeleteParams::default())
        .await
        .expect_err("500 should fail");

    shutdown_tx.send(()).expect("shutdown signal should send");
    server_task.await.expect("server task should join");

    match unauthorized {
        RecordClientError::Rejected {
            operation,
            status,
            message,
        } => {
            assert_eq!(operation, RecordOperation::Fetch);
            assert_eq!(status, 401);
            assert_eq!(message.as_deref(), Some("Invalid public key"));
        }
        other => panic!("expected rejected error, got {other:?}"),
    }
    assert!(matches!(
        server_error,
        RecordClientError::Rejected {
            status: 500,
            message: None,
            ..
        }
    ));
    assert_eq!(server_error.user_message(), None);
}

#[tokio::test]
async fn malformed_success_body_is_an_invalid_payload() {
    let state = TestServerState::with_replies(vec![ok(json!(["not", "an", "object"]))]);
    let (url, shutdown_tx, server_task) = spawn_test_server(state.clone()).await;

    let client = client_for(url);
    let err = client
        .fetch_records("assignment_c", FetchParams::default())
        .await
        .expect_err("array body should not decode");

    shutdown_tx.send(()).expect("shutdown signal should send");
    server_task.await.expect("server task should join");

    assert!(matches!(
        err,
        RecordClientError::InvalidPayload {
            operation: RecordOperation::Fetch,
            ..
        }
    ));
}

#[tokio::test]
async fn unreachable_backend_is_a_transport_error() {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("listener should bind");
    let local_addr = listener
        .local_addr()
        .expect("listener address should resolve");
    drop(listener);

    let client = client_for(format!("http://{local_addr}"));
    let err = client
        .fetch_records("assignment_c", FetchParams::default())
        .await
        .expect_err("closed port should fail");

    assert!(matches!(
        err,
        RecordClientError::Transport {
            operation: RecordOperation::Fetch,
            ..
        }
    ));
}

#[tokio::test]
async fn access_layer_round_trips_through_http() {
    let state = TestServerState::with_replies(vec![
        ok(json!({
            "success": true,
            "results": [{
                "success": true,
                "data": { "Id": 11, "title_c": "Lab report", "status_c": "pending" }
            }]
        })),
        ok(json!({
            "success": true,
            "results": [{
                "success": false,
                "message": "Status is not allowed",
                "errors": [{ "fieldLabel": "Status", "message": "unknown value" }]
            }]
        })),
        MockReply {
            status: StatusCode::FORBIDDEN,
            body: json!({ "message": "Deletes are disabled" }),
        },
    ]);
    let (url, shutdown_tx, server_task) = spawn_test_server(state.clone()).await;

    let client = Arc::new(client_for(url));
    let notifier = Arc::new(CollectingNotifier::new());
    let assignments = AssignmentAccess::new(client.clone(), notifier.clone());
    let sessions = StudySessionAccess::new(client, notifier.clone());

    let draft = AssignmentDraft {
        title: Some("Lab report".to_string()),
        ..AssignmentDraft::default()
    };
    let created = assignments.create(&draft).await;
    let updated = assignments
        .update("11", &AssignmentPatch::status("archived"))
        .await;
    let deleted = sessions.delete(3).await;

    shutdown_tx.send(()).expect("shutdown signal should send");
    server_task.await.expect("server task should join");

    assert_eq!(created.map(|record| record.id), Some(11));
    assert!(updated.is_none());
    assert!(!deleted);
    assert_eq!(
        notifier.messages(),
        vec![
            "Status: unknown value",
            "Status is not allowed",
            "Deletes are disabled"
        ]
    );

    let seen = state.seen.lock().await.clone();
    assert_eq!(seen[0].body["records"][0]["status_c"], "pending");
    assert_eq!(
        seen[1].body,
        json!({ "records": [{ "Id": 11, "status_c": "archived" }] })
    );
    assert_eq!(seen[2].path, "/tables/study_session_c/records");
}

async fn spawn_test_server(
    state: TestServerState,
) -> (String, oneshot::Sender<()>, tokio::task::JoinHandle<()>) {
    let app = Router::new()
        .fallback(test_records_handler)
        .with_state(state);

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("listener should bind");
    let local_addr = listener
        .local_addr()
        .expect("listener address should resolve");
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    let server_task = tokio::spawn(async move {
        let server = axum::serve(listener, app).with_graceful_shutdown(async move {
            let _ = shutdown_rx.await;
        });

        server.await.expect("test server should run");
    });

    (format!("http://{local_addr}/"), shutdown_tx, server_task)
}

async fn test_records_handler(
    State(state): State<TestServerState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, Json<Value>) {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(ToString::to_string)
    };

    state.seen.lock().await.push(SeenRequest {
        method,
        path: uri.path().to_string(),
        project_id: header("x-apper-project-id"),
        public_key: header("x-apper-public-key"),
        request_id: header("x-request-id"),
        body: serde_json::from_slice(&body).unwrap_or(Value::Null),
    });

    let reply = state.replies.lock().await.pop_front().unwrap_or(MockReply {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        body: json!({
            "error": {
                "message": "exhausted test replies"
            }
        }),
    });

    (reply.status, Json(reply.body))
}
