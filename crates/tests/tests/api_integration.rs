use std::net::SocketAddr;
use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::extract::ConnectInfo;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use skybot_agents::AssistantConfig;
use skybot_api::{build_app, build_router, build_state, ApiSettings};
use skybot_completion::CompletionConfig;
use skybot_storage::{sample_flights, FlightRepository, Store};
use tower::ServiceExt;

const API_KEY: &str = "dev-skybot-key";

async fn offline_app() -> Router {
    build_app(AssistantConfig::offline_in_memory(), ApiSettings::default())
        .await
        .expect("app should build")
}

fn ask(text: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/v1/answer")
        .header("content-type", "application/json")
        .header("x-api-key", API_KEY)
        .body(Body::from(json!({ "text": text }).to_string()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_is_public() {
    let app = offline_app().await;

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["completion_provider"], "offline");
    assert_eq!(json["store_backend"], "memory");
}

#[tokio::test]
async fn answer_requires_api_key() {
    let app = offline_app().await;

    let request = Request::builder()
        .method("POST")
        .uri("/v1/answer")
        .header("content-type", "application/json")
        .body(Body::from(json!({ "text": "When does Flight AI123 depart?" }).to_string()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["error"], "unauthorized");
}

#[tokio::test]
async fn answer_returns_flight_payload() {
    let app = offline_app().await;

    let response = app
        .oneshot(ask("When does Flight AI123 depart?"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));

    let json = body_json(response).await;
    assert_eq!(
        json["answer"],
        "Flight AI123 departs at 08:00 AM to Delhi. Current status: Delayed."
    );
    assert_eq!(
        json["flight_data"],
        json!({
            "flight_number": "AI123",
            "departure_time": "08:00 AM",
            "destination": "Delhi",
            "status": "Delayed"
        })
    );
}

#[tokio::test]
async fn greeting_takes_precedence_over_flight_code() {
    let app = offline_app().await;

    let response = app
        .oneshot(ask("hello, what about flight AI123"))
        .await
        .unwrap();

    let json = body_json(response).await;
    assert!(json["answer"].as_str().unwrap().starts_with("Hello!"));
    assert!(json.get("flight_data").is_none());
}

#[tokio::test]
async fn unknown_flight_has_no_record() {
    let app = offline_app().await;

    let response = app.oneshot(ask("Where is EK999 going?")).await.unwrap();

    let json = body_json(response).await;
    assert!(json["answer"]
        .as_str()
        .unwrap()
        .starts_with("Flight EK999 not found in our database."));
    assert!(json.get("flight_data").is_none());
}

#[tokio::test]
async fn flight_route_looks_up_exact_number() {
    let app = offline_app().await;

    let request = Request::builder()
        .uri("/v1/flights/LH788")
        .header("x-api-key", API_KEY)
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["flight_data"]["destination"], "Coimbatore");

    let request = Request::builder()
        .uri("/v1/flights/ZZ999")
        .header("x-api-key", API_KEY)
        .body(Body::empty())
        .unwrap();
    let json = body_json(app.clone().oneshot(request).await.unwrap()).await;
    assert!(json["answer"].as_str().unwrap().contains("Flight ZZ999 not found"));

    let request = Request::builder()
        .uri("/v1/flights/not-a-flight")
        .header("x-api-key", API_KEY)
        .body(Body::empty())
        .unwrap();
    let json = body_json(app.oneshot(request).await.unwrap()).await;
    assert!(json["answer"]
        .as_str()
        .unwrap()
        .starts_with("No valid flight number found"));
}

#[tokio::test]
async fn completion_outage_is_bad_gateway() {
    // nothing listens on port 9 locally
    let mut completion = CompletionConfig::together("test-key");
    completion.endpoint = "http://127.0.0.1:9".to_string();
    completion.timeout_secs = Some(2);
    let config = AssistantConfig {
        completion,
        database_url: None,
    };
    let app = build_app(config, ApiSettings::default()).await.unwrap();

    let response = app
        .clone()
        .oneshot(ask("When does Flight AI123 depart?"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(body_json(response).await["error"], "completion_failed");

    // canned replies never reach the provider
    let response = app.oneshot(ask("help")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn session_turns_are_recorded() {
    let state = build_state(&AssistantConfig::offline_in_memory(), ApiSettings::default())
        .await
        .unwrap();
    let assistant = state.assistant.clone();
    let app = build_router(state);

    let request = Request::builder()
        .method("POST")
        .uri("/v1/answer")
        .header("content-type", "application/json")
        .header("x-api-key", API_KEY)
        .body(Body::from(
            json!({ "text": "Is EK500 on time?", "session_id": "session-42" }).to_string(),
        ))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    match assistant.store().as_ref() {
        Store::Memory(store) => assert_eq!(store.history_len(), 2),
        Store::Sqlite(_) => panic!("expected the in-memory store"),
    }
}

#[tokio::test]
async fn rate_limit_rejects_excess_requests() {
    let settings = ApiSettings {
        rate_limit_window: Duration::from_secs(60),
        rate_limit_max: 2,
        ..ApiSettings::default()
    };
    let app = build_app(AssistantConfig::offline_in_memory(), settings)
        .await
        .unwrap();

    for _ in 0..2 {
        let response = app.clone().oneshot(ask("hi")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = app.clone().oneshot(ask("hi")).await.unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(response.headers().contains_key("retry-after"));

    // health stays reachable
    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

fn ask_via(text: &str, forwarded_for: &str, peer: SocketAddr) -> Request<Body> {
    let mut request = ask(text);
    request
        .headers_mut()
        .insert("x-forwarded-for", forwarded_for.parse().unwrap());
    request.extensions_mut().insert(ConnectInfo(peer));
    request
}

fn limited_to_one(trust_forwarded_for: bool) -> ApiSettings {
    ApiSettings {
        rate_limit_max: 1,
        trust_forwarded_for,
        ..ApiSettings::default()
    }
}

#[tokio::test]
async fn rotating_forwarded_for_does_not_escape_the_limit() {
    let app = build_app(AssistantConfig::offline_in_memory(), limited_to_one(false))
        .await
        .unwrap();
    let peer: SocketAddr = "203.0.113.7:50000".parse().unwrap();

    let mut accepted = 0;
    for n in 0..20 {
        let response = app
            .clone()
            .oneshot(ask_via("hi", &format!("198.51.100.{n}"), peer))
            .await
            .unwrap();
        if response.status() == StatusCode::OK {
            accepted += 1;
        }
    }
    assert_eq!(accepted, 1);

    // a different peer has its own budget
    let other: SocketAddr = "203.0.113.8:50000".parse().unwrap();
    let response = app.oneshot(ask_via("hi", "198.51.100.1", other)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn trusted_proxy_keys_on_forwarded_for() {
    let app = build_app(AssistantConfig::offline_in_memory(), limited_to_one(true))
        .await
        .unwrap();
    let proxy: SocketAddr = "10.0.0.2:443".parse().unwrap();

    let response = app
        .clone()
        .oneshot(ask_via("hi", "198.51.100.1, 10.0.0.2", proxy))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(ask_via("hi", "198.51.100.2", proxy))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(ask_via("hi", "198.51.100.1", proxy))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn sqlite_backed_app_serves_seeded_flights() {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}", dir.path().join("flights.db").display());

    let store = Store::sqlite(&url).await.unwrap();
    store.insert_flights(&sample_flights()).await.unwrap();
    store.close().await;

    let config = AssistantConfig {
        completion: CompletionConfig::offline(),
        database_url: Some(url),
    };
    let app = build_app(config, ApiSettings::default()).await.unwrap();

    let response = app
        .oneshot(ask("What's the status of EK900?"))
        .await
        .unwrap();
    let json = body_json(response).await;
    assert_eq!(
        json["answer"],
        "Flight EK900 departs at 10:30 AM to Kathmandu. Current status: On Time."
    );
}
