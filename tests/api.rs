//! API endpoint integration tests

use axum::{
    body::Body,
    http::{Request, StatusCode, header},
};
use base64::Engine;
use tower::ServiceExt;
use voxchat::Orchestrator;
use voxchat::config::ConversationConfig;
use voxchat::voice::RecognitionError;

mod common;
use common::{
    STUB_AUDIO, StubChat, StubSynthesizer, silence_wav, test_app, tone_wav, voice_orchestrator,
};

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

fn post_json(uri: &str, json: &serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json.to_string()))
        .unwrap()
}

fn post_bytes(uri: &str, bytes: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/octet-stream")
        .body(Body::from(bytes))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

/// Create a session and return its id
async fn create_session(app: &axum::Router) -> String {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/sessions")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    json_body(response).await["session_id"]
        .as_str()
        .unwrap()
        .to_string()
}

#[tokio::test]
async fn test_health_endpoint() {
    let app = test_app(Orchestrator::new(
        StubChat::answering("hi"),
        ConversationConfig::default(),
    ));

    let response = app.oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = json_body(response).await;
    assert_eq!(json["status"], "ok");
    assert!(json["version"].is_string());
}

#[tokio::test]
async fn test_ready_endpoint() {
    let app = test_app(Orchestrator::new(
        StubChat::answering("hi"),
        ConversationConfig::default(),
    ));

    let response = app.oneshot(get("/ready")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = json_body(response).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["model"], "stub-model");
    assert_eq!(json["checks"]["chat"]["status"], "ok");
    assert_eq!(json["checks"]["transcription"]["status"], "unavailable");
}

#[tokio::test]
async fn test_ready_reports_unreachable_backend() {
    let app = test_app(Orchestrator::new(
        StubChat::failing(),
        ConversationConfig::default(),
    ));

    let response = app.oneshot(get("/ready")).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    let json = json_body(response).await;
    assert_eq!(json["status"], "degraded");
    assert_eq!(json["checks"]["chat"]["status"], "fail");
}

#[tokio::test]
async fn test_new_session_has_greeting() {
    let app = test_app(Orchestrator::new(
        StubChat::answering("hi"),
        ConversationConfig::default(),
    ));
    let id = create_session(&app).await;

    let response = app
        .oneshot(get(&format!("/api/sessions/{id}")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = json_body(response).await;
    let messages = json["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0]["role"], "assistant");
    assert_eq!(messages[0]["content"], "Hi! How may I assist you today?");
}

#[tokio::test]
async fn test_text_turn_end_to_end() {
    let chat = StubChat::answering("4");
    let synth = StubSynthesizer::new();
    let app = test_app(voice_orchestrator(
        chat.clone(),
        Ok("unused".to_string()),
        synth.clone(),
    ));
    let id = create_session(&app).await;

    let response = app
        .clone()
        .oneshot(post_json(
            &format!("/api/sessions/{id}/text"),
            &serde_json::json!({"text": "What is 2+2?"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = json_body(response).await;
    assert_eq!(json["messages"][0]["role"], "user");
    assert_eq!(json["messages"][0]["content"], "What is 2+2?");
    assert_eq!(json["messages"][1]["role"], "assistant");
    assert_eq!(json["messages"][1]["content"], "4");
    assert_eq!(json["audio"]["format"], "mp3");
    assert_eq!(json["audio"]["mime_type"], "audio/mpeg");
    assert!(json["recognition_error"].is_null());

    let audio = base64::engine::general_purpose::STANDARD
        .decode(json["audio"]["data"].as_str().unwrap())
        .unwrap();
    assert_eq!(audio, STUB_AUDIO);
    assert_eq!(*synth.calls.lock().unwrap(), vec!["4".to_string()]);

    // History now holds greeting, question and answer
    let response = app
        .oneshot(get(&format!("/api/sessions/{id}")))
        .await
        .unwrap();
    let json = json_body(response).await;
    let contents: Vec<_> = json["messages"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["content"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(
        contents,
        vec!["Hi! How may I assist you today?", "What is 2+2?", "4"]
    );
}

#[tokio::test]
async fn test_empty_text_is_rejected() {
    let chat = StubChat::answering("x");
    let app = test_app(Orchestrator::new(chat.clone(), ConversationConfig::default()));
    let id = create_session(&app).await;

    let response = app
        .oneshot(post_json(
            &format!("/api/sessions/{id}/text"),
            &serde_json::json!({"text": "   "}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error"]["code"], "bad_request");
    assert!(chat.calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_malformed_text_body_uses_error_shape() {
    let chat = StubChat::answering("x");
    let app = test_app(Orchestrator::new(chat.clone(), ConversationConfig::default()));
    let id = create_session(&app).await;

    let response = app
        .clone()
        .oneshot(post_json(
            &format!("/api/sessions/{id}/text"),
            &serde_json::json!({"message": "Hello"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["error"]["code"], "bad_request");
    assert!(body["error"]["message"].as_str().unwrap().contains("text"));

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/api/sessions/{id}/text"))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error"]["code"], "bad_request");
    assert!(chat.calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_invalid_session_id_uses_error_shape() {
    let app = test_app(Orchestrator::new(
        StubChat::answering("x"),
        ConversationConfig::default(),
    ));

    let response = app
        .clone()
        .oneshot(get("/api/sessions/not-a-uuid"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error"]["code"], "bad_request");

    let response = app
        .oneshot(post_json(
            "/api/sessions/not-a-uuid/text",
            &serde_json::json!({"text": "Hello"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error"]["code"], "bad_request");
}

#[tokio::test]
async fn test_chat_failure_is_bad_gateway_and_rolls_back() {
    let app = test_app(Orchestrator::new(
        StubChat::failing(),
        ConversationConfig::default(),
    ));
    let id = create_session(&app).await;

    let response = app
        .clone()
        .oneshot(post_json(
            &format!("/api/sessions/{id}/text"),
            &serde_json::json!({"text": "Hello"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(json_body(response).await["error"]["code"], "chat_failed");

    let response = app
        .oneshot(get(&format!("/api/sessions/{id}")))
        .await
        .unwrap();
    assert_eq!(json_body(response).await["messages"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_synthesis_failure_returns_reply_with_warning() {
    let app = test_app(voice_orchestrator(
        StubChat::answering("4"),
        Ok("unused".to_string()),
        StubSynthesizer::failing(),
    ));
    let id = create_session(&app).await;

    let response = app
        .oneshot(post_json(
            &format!("/api/sessions/{id}/text"),
            &serde_json::json!({"text": "What is 2+2?"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = json_body(response).await;
    assert_eq!(json["messages"][1]["content"], "4");
    assert!(json["audio"].is_null());
    assert_eq!(json["warnings"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_audio_turn_uses_transcript() {
    let chat = StubChat::answering("Good morning to you");
    let app = test_app(voice_orchestrator(
        chat.clone(),
        Ok("good morning".to_string()),
        StubSynthesizer::new(),
    ));
    let id = create_session(&app).await;

    let response = app
        .oneshot(post_bytes(&format!("/api/sessions/{id}/audio"), tone_wav()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = json_body(response).await;
    assert_eq!(json["messages"][0]["content"], "good morning");
    assert!(json["recognition_error"].is_null());
    assert_eq!(chat.calls.lock().unwrap()[0].0, "good morning");
}

#[tokio::test]
async fn test_silent_audio_falls_back() {
    let chat = StubChat::answering("Could you say that again?");
    let app = test_app(voice_orchestrator(
        chat.clone(),
        Ok("never reached".to_string()),
        StubSynthesizer::new(),
    ));
    let id = create_session(&app).await;

    let response = app
        .oneshot(post_bytes(&format!("/api/sessions/{id}/audio"), silence_wav()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = json_body(response).await;
    assert_eq!(json["messages"][0]["role"], "user");
    assert_eq!(
        json["messages"][0]["content"],
        "Sorry, I couldn't understand that."
    );
    assert_eq!(
        json["recognition_error"],
        RecognitionError::NoSpeech.to_string()
    );
    assert_eq!(chat.calls.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_audio_rejected_when_voice_disabled() {
    let app = test_app(Orchestrator::new(
        StubChat::answering("x"),
        ConversationConfig::default(),
    ));
    let id = create_session(&app).await;

    let response = app
        .oneshot(post_bytes(&format!("/api/sessions/{id}/audio"), tone_wav()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_unknown_session_is_not_found() {
    let app = test_app(Orchestrator::new(
        StubChat::answering("x"),
        ConversationConfig::default(),
    ));
    let id = uuid::Uuid::new_v4();

    let response = app
        .clone()
        .oneshot(post_json(
            &format!("/api/sessions/{id}/text"),
            &serde_json::json!({"text": "Hello"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(json_body(response).await["error"]["code"], "session_not_found");

    let response = app
        .oneshot(get(&format!("/api/sessions/{id}")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_session() {
    let app = test_app(Orchestrator::new(
        StubChat::answering("x"),
        ConversationConfig::default(),
    ));
    let id = create_session(&app).await;

    let delete = || {
        Request::builder()
            .method("DELETE")
            .uri(format!("/api/sessions/{id}"))
            .body(Body::empty())
            .unwrap()
    };

    let response = app.clone().oneshot(delete()).await.unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app.oneshot(delete()).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_sessions_are_isolated() {
    let app = test_app(Orchestrator::new(
        StubChat::answering("ok"),
        ConversationConfig::default(),
    ));
    let first = create_session(&app).await;
    let second = create_session(&app).await;

    let response = app
        .clone()
        .oneshot(post_json(
            &format!("/api/sessions/{first}/text"),
            &serde_json::json!({"text": "Hello"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(get(&format!("/api/sessions/{second}")))
        .await
        .unwrap();
    assert_eq!(json_body(response).await["messages"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_voice_capabilities() {
    let app = test_app(voice_orchestrator(
        StubChat::answering("x"),
        Ok("x".to_string()),
        StubSynthesizer::new(),
    ));

    let response = app
        .oneshot(get("/api/voice/capabilities"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = json_body(response).await;
    assert_eq!(json["stt_available"], true);
    assert_eq!(json["tts_available"], true);
    assert_eq!(json["stt_provider"], "stub");
    assert_eq!(json["tts_voice"], "stub-voice");
}

#[tokio::test]
async fn test_voice_transcribe_endpoint() {
    let app = test_app(voice_orchestrator(
        StubChat::answering("x"),
        Ok("turn on the lights".to_string()),
        StubSynthesizer::new(),
    ));

    let response = app
        .clone()
        .oneshot(post_bytes("/api/voice/transcribe", tone_wav()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["text"], "turn on the lights");

    let response = app
        .oneshot(post_bytes("/api/voice/transcribe", silence_wav()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json_body(response).await["error"]["code"], "no_speech");
}

#[tokio::test]
async fn test_voice_synthesize_endpoint() {
    let app = test_app(voice_orchestrator(
        StubChat::answering("x"),
        Ok("x".to_string()),
        StubSynthesizer::new(),
    ));

    let response = app
        .oneshot(post_json(
            "/api/voice/synthesize",
            &serde_json::json!({"text": "Hello there"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "audio/mpeg"
    );

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&body[..], STUB_AUDIO);
}
