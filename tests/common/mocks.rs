//! Response templates shaped like each provider's API.

use serde_json::json;
use wiremock::ResponseTemplate;

/// Fake key configured by `make_test_credentials`.
pub use aigate::test_utils::TEST_API_KEY;

pub fn openai_chat(text: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "id": "chatcmpl-1",
        "choices": [{"index": 0, "message": {"role": "assistant", "content": text}}]
    }))
}

pub fn anthropic_message(text: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "id": "msg_1",
        "type": "message",
        "content": [{"type": "text", "text": text}]
    }))
}

pub fn gemini_content(text: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "candidates": [{"content": {"role": "model", "parts": [{"text": text}]}}]
    }))
}

pub fn openai_image_url(url: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({"created": 1, "data": [{"url": url}]}))
}

pub fn stability_artifacts(artifacts: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "artifacts": artifacts }))
}

pub fn audio(bytes: &[u8]) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(bytes.to_vec(), "audio/mpeg")
}

pub fn openai_transcript(text: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "text": text }))
}

pub fn deepgram_transcript(text: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "results": {"channels": [{"alternatives": [{"transcript": text, "confidence": 0.98}]}]}
    }))
}

/// OpenAI-style error envelope.
pub fn openai_error(status: u16, code: &str) -> ResponseTemplate {
    ResponseTemplate::new(status).set_body_json(json!({
        "error": {"message": "request failed", "type": code, "code": code}
    }))
}

/// A 401 whose body echoes the key, to check it never leaks.
pub fn unauthorized_echoing_key() -> ResponseTemplate {
    ResponseTemplate::new(401).set_body_json(json!({
        "error": {"message": format!("Incorrect API key provided: {TEST_API_KEY}"), "code": "invalid_api_key"}
    }))
}
