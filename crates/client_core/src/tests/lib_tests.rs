use std::sync::Arc;

use super::*;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Json, Router,
};
use serde_json::json;
use shared::domain::{RegistrationId, StudentId};
use tokio::{
    net::TcpListener,
    sync::{oneshot, Mutex},
};

#[derive(Clone, Default)]
struct ServerState {
    update_tx: Arc<Mutex<Option<oneshot::Sender<(i64, EventDraft)>>>>,
    register_tx: Arc<Mutex<Option<oneshot::Sender<(i64, StudentIdentity)>>>>,
    deleted: Arc<Mutex<Vec<i64>>>,
}

async fn handle_list_events() -> Json<Value> {
    Json(json!([
        {
            "id": 1,
            "title": "Orientation",
            "description": "Welcome week kickoff",
            "date": "2025-08-25",
            "time": "09:00",
            "location": "Auditorium",
            "registration_link": "https://forms.example.edu/orientation"
        },
        { "id": 2, "title": "Robotics Expo", "date": "2025-09-02T00:00:00.000Z" },
        { "id": 3, "title": "Blood Drive", "location": null }
    ]))
}

async fn handle_create(Json(draft): Json<EventDraft>) -> (StatusCode, Json<Value>) {
    (
        StatusCode::CREATED,
        Json(json!({
            "id": 42,
            "title": draft.title,
            "description": draft.description,
            "date": draft.date,
            "time": draft.time,
            "location": draft.location,
            "registration_link": draft.registration_link
        })),
    )
}

async fn handle_update(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
    Json(draft): Json<EventDraft>,
) -> Json<Value> {
    if let Some(tx) = state.update_tx.lock().await.take() {
        let _ = tx.send((id, draft));
    }
    Json(json!({ "message": "Event updated" }))
}

async fn handle_delete(State(state): State<ServerState>, Path(id): Path<i64>) -> impl IntoResponse {
    if id == 404 {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "Event not found" })),
        );
    }
    state.deleted.lock().await.push(id);
    (StatusCode::OK, Json(json!({ "message": "Event deleted" })))
}

async fn handle_registrations(Path(id): Path<i64>) -> Json<Value> {
    if id == 7 {
        return Json(json!({}));
    }
    Json(json!({
        "registrations": [
            {
                "registration_id": 1,
                "student_id": 501,
                "name": "Ada",
                "username": "student_1_aaaaaaaaa",
                "email": "ada@univ.edu",
                "department": "CSE",
                "registered_at": "2025-08-20T12:00:00Z"
            },
            {
                "registration_id": 2,
                "student_id": 502,
                "username": "student_2_bbbbbbbbb",
                "registered_at": "2025-08-21T12:00:00Z"
            }
        ]
    }))
}

async fn handle_register(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
    Json(identity): Json<StudentIdentity>,
) -> Response {
    match id {
        9 => {
            return (
                StatusCode::CONFLICT,
                Json(json!({ "message": "Already registered for this event" })),
            )
                .into_response()
        }
        10 => return (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({}))).into_response(),
        11 => return (StatusCode::CREATED, "Registered").into_response(),
        _ => {}
    }
    if let Some(tx) = state.register_tx.lock().await.take() {
        let _ = tx.send((id, identity));
    }
    (
        StatusCode::CREATED,
        Json(json!({ "message": "Registered", "registration_id": 77 })),
    )
        .into_response()
}

async fn spawn_events_server(state: ServerState) -> std::io::Result<String> {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let app = Router::new()
        .route("/api/events/all", get(handle_list_events))
        .route("/api/events/create", post(handle_create))
        .route("/api/events/update/:id", put(handle_update))
        .route("/api/events/delete/:id", delete(handle_delete))
        .route("/api/events/:id/registrations", get(handle_registrations))
        .route("/api/events/:id/register", post(handle_register))
        .with_state(state);
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok(format!("http://{addr}"))
}

#[tokio::test]
async fn list_events_decodes_every_entry() {
    let server_url = spawn_events_server(ServerState::default())
        .await
        .expect("spawn server");
    let client = HttpEventsClient::new(server_url);

    let events = client.list_events().await.expect("list");
    assert_eq!(events.len(), 3);
    assert_eq!(events[0].location.as_deref(), Some("Auditorium"));
    assert_eq!(events[1].event_date().map(|d| d.to_string()).as_deref(), Some("2025-09-02"));
    assert_eq!(events[2].location, None);
}

#[tokio::test]
async fn base_url_trailing_slash_is_ignored() {
    let server_url = spawn_events_server(ServerState::default())
        .await
        .expect("spawn server");
    let client = HttpEventsClient::new(format!("{server_url}/"));
    assert_eq!(client.base_url(), server_url);
    client.list_events().await.expect("list");
}

#[tokio::test]
async fn create_event_returns_echoed_event() {
    let server_url = spawn_events_server(ServerState::default())
        .await
        .expect("spawn server");
    let client = HttpEventsClient::new(server_url);
    let draft = EventDraft {
        title: "Chess Night".into(),
        description: "Bring a board".into(),
        date: "2025-10-01".into(),
        time: "18:00".into(),
        location: "Library".into(),
        registration_link: "https://forms.example.edu/chess".into(),
    };

    let created = client.create_event(&draft).await.expect("create");
    let created = created.expect("server echoed the event");
    assert_eq!(created.id, EventId(42));
    assert_eq!(created.title, "Chess Night");
}

#[tokio::test]
async fn update_event_sends_draft_as_body() {
    let (tx, rx) = oneshot::channel();
    let state = ServerState {
        update_tx: Arc::new(Mutex::new(Some(tx))),
        ..ServerState::default()
    };
    let server_url = spawn_events_server(state).await.expect("spawn server");
    let client = HttpEventsClient::new(server_url);

    let draft = EventDraft {
        title: "Orientation (moved)".into(),
        description: "Welcome week kickoff".into(),
        date: "2025-08-26".into(),
        time: "10:00".into(),
        location: "Stadium".into(),
        registration_link: "https://forms.example.edu/orientation".into(),
    };
    client
        .update_event(EventId(1), &draft)
        .await
        .expect("update");

    let (id, received) = rx.await.expect("update body");
    assert_eq!(id, 1);
    assert_eq!(received, draft);
}

#[tokio::test]
async fn delete_event_hits_delete_route() {
    let state = ServerState::default();
    let deleted = Arc::clone(&state.deleted);
    let server_url = spawn_events_server(state).await.expect("spawn server");
    let client = HttpEventsClient::new(server_url);

    client.delete_event(EventId(3)).await.expect("delete");
    assert_eq!(*deleted.lock().await, vec![3]);
}

#[tokio::test]
async fn error_body_error_field_becomes_status_message() {
    let server_url = spawn_events_server(ServerState::default())
        .await
        .expect("spawn server");
    let client = HttpEventsClient::new(server_url);

    let err = client
        .delete_event(EventId(404))
        .await
        .expect_err("must fail");
    assert_eq!(err.status(), Some(404));
    assert_eq!(err.user_message("fallback"), "Event not found");
}

#[tokio::test]
async fn registrations_are_unwrapped_and_missing_list_is_empty() {
    let server_url = spawn_events_server(ServerState::default())
        .await
        .expect("spawn server");
    let client = HttpEventsClient::new(server_url);

    let registrations = client
        .list_registrations(EventId(1))
        .await
        .expect("registrations");
    assert_eq!(registrations.len(), 2);
    assert_eq!(registrations[0].registration_id, RegistrationId(1));
    assert_eq!(registrations[1].student_id, StudentId(502));
    assert_eq!(registrations[1].display_name(), "student_2_bbbbbbbbb");

    let empty = client
        .list_registrations(EventId(7))
        .await
        .expect("empty registrations");
    assert!(empty.is_empty());
}

#[tokio::test]
async fn register_posts_identity_json() {
    let (tx, rx) = oneshot::channel();
    let state = ServerState {
        register_tx: Arc::new(Mutex::new(Some(tx))),
        ..ServerState::default()
    };
    let server_url = spawn_events_server(state).await.expect("spawn server");
    let client = HttpEventsClient::new(server_url);
    let identity = StudentIdentity::from_username("student_1_abcdefghi", "univ.edu", "CSE");

    let body = client.register(EventId(5), &identity).await.expect("register");
    assert_eq!(body["registration_id"], 77);

    let (id, received) = rx.await.expect("register body");
    assert_eq!(id, 5);
    assert_eq!(received, identity);
}

#[tokio::test]
async fn register_accepts_plain_text_success_body() {
    let server_url = spawn_events_server(ServerState::default())
        .await
        .expect("spawn server");
    let client = HttpEventsClient::new(server_url);
    let identity = StudentIdentity::from_username("student_1_abcdefghi", "univ.edu", "CSE");

    let body = client
        .register(EventId(11), &identity)
        .await
        .expect("2xx text body is a success");
    assert_eq!(body, Value::String("Registered".to_string()));
}

#[tokio::test]
async fn register_conflict_surfaces_server_message() {
    let server_url = spawn_events_server(ServerState::default())
        .await
        .expect("spawn server");
    let client = HttpEventsClient::new(server_url);
    let identity = StudentIdentity::from_username("student_1_abcdefghi", "univ.edu", "CSE");

    let err = client
        .register(EventId(9), &identity)
        .await
        .expect_err("conflict");
    assert!(matches!(err, ClientError::Status { status: 409, .. }));
    assert_eq!(
        err.user_message("Failed to register for event"),
        "Already registered for this event"
    );

    let err = client
        .register(EventId(10), &identity)
        .await
        .expect_err("server error");
    assert_eq!(
        err.user_message("Failed to register for event"),
        "Request failed with status code 500"
    );
}

#[tokio::test]
async fn unreachable_server_is_a_transport_error() {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);

    let client =
        HttpEventsClient::with_timeout(format!("http://{addr}"), std::time::Duration::from_secs(2))
            .expect("client");
    let err = client.list_events().await.expect_err("nothing listening");
    assert!(matches!(err, ClientError::Transport(_)));
    assert!(!err.user_message("fallback").is_empty());
}
