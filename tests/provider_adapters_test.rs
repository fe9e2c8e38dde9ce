//! Wire format of each provider adapter and failure classification.

mod common;

use aigate::core::failover::Route;
use aigate::core::provider::ProviderId;
use aigate::core::router::{Router, RouterConfig};
use aigate::core::{ManualClock, RequestOptions};
use aigate::error::{FailureKind, GatewayError};
use aigate::providers::{ImageProvider, SpeechProvider, TextProvider, TranscriptionProvider};
use aigate::test_utils::{
    make_test_credentials, make_test_router, make_test_router_config, make_test_wav,
};
use common::mocks::{self, TEST_API_KEY};
use serde_json::{Value, json};
use std::sync::Arc;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn router_with(config: RouterConfig, providers: &[ProviderId]) -> (Router, Arc<ManualClock>) {
    make_test_router(config, make_test_credentials(providers))
}

async fn last_body(server: &MockServer) -> Value {
    let requests = server.received_requests().await.unwrap();
    serde_json::from_slice(&requests.last().unwrap().body).unwrap()
}

fn only_text(server: &MockServer, provider: TextProvider) -> RouterConfig {
    RouterConfig {
        text: vec![Route::new(provider)],
        ..make_test_router_config(&server.uri())
    }
}

fn first_kind(err: &GatewayError) -> Option<FailureKind> {
    err.diagnostics().first().and_then(|d| d.kind)
}

// =============================================================================
// Text
// =============================================================================

#[tokio::test]
async fn openai_chat_request_shape() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", format!("Bearer {TEST_API_KEY}").as_str()))
        .respond_with(mocks::openai_chat("Plants make sugar."))
        .expect(1)
        .mount(&server)
        .await;

    let (router, _clock) = router_with(only_text(&server, TextProvider::OpenAi), &[ProviderId::OpenAi]);
    let options = RequestOptions {
        temperature: Some(3.5),
        max_tokens: Some(100_000),
        ..RequestOptions::default().with_model("gpt-4o")
    };
    let text = router.generate_text("Explain photosynthesis", &options).await.unwrap();
    assert_eq!(text, "Plants make sugar.");

    let body = last_body(&server).await;
    assert_eq!(body["model"], "gpt-4o");
    assert_eq!(body["messages"][0]["role"], "user");
    assert_eq!(body["temperature"], 2.0);
    assert_eq!(body["max_tokens"], 4_096);
}

#[tokio::test]
async fn anthropic_caps_temperature_and_joins_text_blocks() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "content": [
                {"type": "text", "text": "Hello, "},
                {"type": "tool_use", "id": "t1"},
                {"type": "text", "text": "world."}
            ]
        })))
        .mount(&server)
        .await;

    let (router, _clock) = router_with(
        only_text(&server, TextProvider::Anthropic),
        &[ProviderId::Anthropic],
    );
    let options = RequestOptions {
        temperature: Some(1.8),
        ..RequestOptions::default()
    };
    assert_eq!(router.generate_text("hi", &options).await.unwrap(), "Hello, world.");

    let body = last_body(&server).await;
    assert_eq!(body["temperature"], 1.0);
    assert_eq!(body["model"], "claude-3-5-haiku-latest");
}

#[tokio::test]
async fn gemini_uses_model_path_and_camel_case_config() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-1.5-pro:generateContent"))
        .and(header("x-goog-api-key", TEST_API_KEY))
        .respond_with(mocks::gemini_content("Sunlight to sugar."))
        .expect(1)
        .mount(&server)
        .await;

    let config = RouterConfig {
        text: vec![Route::with_model(TextProvider::Gemini, "models/gemini-1.5-pro")],
        ..make_test_router_config(&server.uri())
    };
    let (router, _clock) = router_with(config, &[ProviderId::Gemini]);
    let text = router
        .generate_text("Explain photosynthesis", &RequestOptions::default().with_model("ignored"))
        .await
        .unwrap();
    assert_eq!(text, "Sunlight to sugar.");

    let body = last_body(&server).await;
    assert_eq!(body["contents"][0]["parts"][0]["text"], "Explain photosynthesis");
    assert!(body["generationConfig"]["maxOutputTokens"].is_number());
}

#[tokio::test]
async fn empty_completion_is_malformed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(mocks::openai_chat("   "))
        .mount(&server)
        .await;

    let (router, _clock) = router_with(only_text(&server, TextProvider::OpenAi), &[ProviderId::OpenAi]);
    let err = router.generate_text("hi", &RequestOptions::default()).await.unwrap_err();
    assert_eq!(first_kind(&err), Some(FailureKind::Malformed));
}

// =============================================================================
// Failure classification
// =============================================================================

#[tokio::test]
async fn failures_are_classified_from_status_and_body() {
    let cases = [
        (ResponseTemplate::new(429), FailureKind::Quota),
        (
            ResponseTemplate::new(400)
                .set_body_json(json!({"error": {"code": 429, "status": "RESOURCE_EXHAUSTED"}})),
            FailureKind::Quota,
        ),
        (ResponseTemplate::new(403), FailureKind::Auth),
        (ResponseTemplate::new(502), FailureKind::Server),
        (ResponseTemplate::new(404), FailureKind::Rejected),
        (
            ResponseTemplate::new(200).set_body_string("<html>edge-proxy-banner</html>"),
            FailureKind::Malformed,
        ),
    ];

    for (template, expected) in cases {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(template)
            .mount(&server)
            .await;
        let (router, _clock) =
            router_with(only_text(&server, TextProvider::OpenAi), &[ProviderId::OpenAi]);

        let err = router.generate_text("hi", &RequestOptions::default()).await.unwrap_err();
        assert_eq!(first_kind(&err), Some(expected), "{err}");
        assert!(!err.to_string().contains("edge-proxy-banner"), "raw body leaked: {err}");
    }
}

#[tokio::test]
async fn unreachable_provider_is_unavailable() {
    let config = RouterConfig {
        text: vec![Route::new(TextProvider::OpenAi)],
        ..make_test_router_config("http://127.0.0.1:9")
    };
    let (router, _clock) = router_with(config, &[ProviderId::OpenAi]);
    let err = router.generate_text("hi", &RequestOptions::default()).await.unwrap_err();
    assert_eq!(first_kind(&err), Some(FailureKind::Unavailable));
}

// =============================================================================
// Image
// =============================================================================

#[tokio::test]
async fn stability_clamps_options_and_skips_filtered_artifacts() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/generation/stable-diffusion-xl-1024-v1-0/text-to-image"))
        .and(header("authorization", format!("Bearer {TEST_API_KEY}").as_str()))
        .and(header("accept", "application/json"))
        .respond_with(mocks::stability_artifacts(json!([
            {"base64": "ZmlsdGVyZWQ=", "finishReason": "CONTENT_FILTERED"},
            {"base64": "aW1hZ2U=", "finishReason": "SUCCESS"}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let (router, _clock) = router_with(
        make_test_router_config(&server.uri()),
        &[ProviderId::Stability],
    );
    let options = RequestOptions {
        width: Some(100),
        height: Some(4_000),
        steps: Some(200),
        ..RequestOptions::default()
    };
    let uri = router.generate_image("a lighthouse at dusk", &options).await.unwrap();
    assert_eq!(uri, "data:image/png;base64,aW1hZ2U=");

    let body = last_body(&server).await;
    assert_eq!(body["width"], 256);
    assert_eq!(body["height"], 1_024);
    assert_eq!(body["steps"], 50);
    assert_eq!(body["text_prompts"][0]["text"], "a lighthouse at dusk");
}

#[tokio::test]
async fn openai_image_falls_back_to_inline_b64() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/images/generations"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"data": [{"b64_json": "cG5n"}]})),
        )
        .mount(&server)
        .await;

    let config = RouterConfig {
        image: vec![Route::new(ImageProvider::OpenAi)],
        ..make_test_router_config(&server.uri())
    };
    let (router, _clock) = router_with(config, &[ProviderId::OpenAi]);
    let options = RequestOptions {
        width: Some(512),
        height: Some(512),
        ..RequestOptions::default()
    };
    let uri = router.generate_image("a red fox", &options).await.unwrap();
    assert_eq!(uri, "data:image/png;base64,cG5n");
    assert_eq!(last_body(&server).await["size"], "512x512");
}

// =============================================================================
// Speech
// =============================================================================

#[tokio::test]
async fn elevenlabs_audio_is_tracked() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/text-to-speech/voice-42"))
        .and(header("xi-api-key", TEST_API_KEY))
        .respond_with(mocks::audio(b"ID3fake-mp3"))
        .expect(1)
        .mount(&server)
        .await;

    let (router, _clock) = router_with(
        make_test_router_config(&server.uri()),
        &[ProviderId::ElevenLabs],
    );
    let options = RequestOptions {
        voice_id: Some("voice-42".to_string()),
        ..RequestOptions::default()
    };
    let resource = router.text_to_speech("Welcome to the course", &options).await.unwrap();

    assert_eq!(resource.content_type, "audio/mpeg");
    assert_eq!(resource.len, 11);
    assert_eq!(router.audio(&resource).as_deref(), Some(&b"ID3fake-mp3"[..]));
    assert_eq!(last_body(&server).await["model_id"], "eleven_monolingual_v1");
}

#[tokio::test]
async fn openai_speech_uses_default_voice() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/audio/speech"))
        .respond_with(mocks::audio(b"ID3openai"))
        .mount(&server)
        .await;

    let config = RouterConfig {
        speech: vec![Route::new(SpeechProvider::OpenAi)],
        ..make_test_router_config(&server.uri())
    };
    let (router, _clock) = router_with(config, &[ProviderId::OpenAi]);
    let resource = router
        .text_to_speech("hello", &RequestOptions::default())
        .await
        .unwrap();
    assert_eq!(resource.len, 9);

    let body = last_body(&server).await;
    assert_eq!(body["voice"], "alloy");
    assert_eq!(body["model"], "tts-1");
    assert_eq!(body["input"], "hello");
}

// =============================================================================
// Transcription
// =============================================================================

#[tokio::test]
async fn openai_transcription_uploads_multipart() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/audio/transcriptions"))
        .respond_with(mocks::openai_transcript("Welcome to week one."))
        .expect(1)
        .mount(&server)
        .await;

    let (router, _clock) = router_with(
        make_test_router_config(&server.uri()),
        &[ProviderId::OpenAi],
    );
    let text = router
        .speech_to_text(&make_test_wav(64), &RequestOptions::default())
        .await
        .unwrap();
    assert_eq!(text, "Welcome to week one.");

    let requests = server.received_requests().await.unwrap();
    let content_type = requests[0]
        .headers
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(content_type.starts_with("multipart/form-data"), "{content_type}");
    let body = String::from_utf8_lossy(&requests[0].body);
    assert!(body.contains("filename=\"audio.wav\""));
    assert!(body.contains("whisper-1"));
}

#[tokio::test]
async fn deepgram_sends_raw_audio_with_token_auth() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/listen"))
        .and(query_param("model", "nova-2"))
        .and(query_param("smart_format", "true"))
        .and(header("authorization", format!("Token {TEST_API_KEY}").as_str()))
        .and(header("content-type", "audio/wav"))
        .respond_with(mocks::deepgram_transcript("Hello class."))
        .expect(1)
        .mount(&server)
        .await;

    let config = RouterConfig {
        transcription: vec![Route::new(TranscriptionProvider::Deepgram)],
        ..make_test_router_config(&server.uri())
    };
    let (router, _clock) = router_with(config, &[ProviderId::Deepgram]);
    let wav = make_test_wav(32);
    let text = router
        .speech_to_text(&wav, &RequestOptions::default())
        .await
        .unwrap();
    assert_eq!(text, "Hello class.");

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests[0].body, wav);
}

#[tokio::test]
async fn empty_audio_is_rejected_locally() {
    let server = MockServer::start().await;
    let (router, _clock) = router_with(
        make_test_router_config(&server.uri()),
        &[ProviderId::OpenAi],
    );
    let err = router
        .speech_to_text(&[], &RequestOptions::default())
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "AIGW-V001");
    assert!(server.received_requests().await.unwrap().is_empty());
}
