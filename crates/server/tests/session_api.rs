//! End-to-end tests for the session API, driven in-process against a mock engine.

mod common;

use axum::http::{header, StatusCode};
use serde_json::json;

use common::{TestConfig, TestFixture, BOUNDARY};
use ffmfy_core::EngineError;

#[tokio::test]
async fn test_health_reports_engine_status() {
    let fixture = TestFixture::new().await;

    let response = fixture.get("/api/v1/health").await;
    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["status"], "ok");
    assert_eq!(response.body["engine"]["status"], "ready");
}

#[tokio::test]
async fn test_formats_endpoint() {
    let fixture = TestFixture::new().await;

    let response = fixture.get("/api/v1/formats").await;
    assert_status!(response, StatusCode::OK);

    let audio_outputs = response.body["audio_outputs"].as_array().unwrap();
    assert!(audio_outputs.contains(&json!("MP3")));
    assert!(!audio_outputs.contains(&json!("MP4")));

    let video_outputs = response.body["video_outputs"].as_array().unwrap();
    assert!(video_outputs.contains(&json!("MP4")));
    assert!(video_outputs.contains(&json!("MP3")));
}

#[tokio::test]
async fn test_full_conversion_flow() {
    let fixture = TestFixture::new().await;
    fixture.engine.set_output_bytes(b"converted-mp3".to_vec()).await;

    // Upload
    let response = fixture.upload("song.wav", "audio/wav", &[7u8; 64]).await;
    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["state"], "loaded");
    assert_eq!(response.body["input"]["name"], "song.wav");
    assert_eq!(response.body["input"]["format"], "WAV");
    assert_eq!(response.body["input"]["media_type"], "audio");
    assert_eq!(response.body["input"]["size_bytes"], 64);

    // Pick output format (case-insensitive)
    let response = fixture
        .put("/api/v1/session/output-format", json!({ "format": "mp3" }))
        .await;
    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["state"], "format_selected");
    assert_eq!(response.body["output_format"], "MP3");

    // Convert
    let response = fixture.post("/api/v1/session/convert").await;
    assert_status!(response, StatusCode::ACCEPTED);
    let job_id = response.body["job_id"].as_str().unwrap().to_string();
    assert_eq!(response.body["session"]["state"], "converting");

    let snapshot = fixture.wait_for_state("completed").await;
    assert_eq!(snapshot["job_id"], job_id);
    assert_eq!(snapshot["progress"], 100.0);
    assert_eq!(snapshot["output"]["name"], "song.mp3");
    assert_eq!(snapshot["output"]["media_type"], "audio");

    // Download
    let raw = fixture.get_raw("/api/v1/session/output").await;
    assert_eq!(raw.status, StatusCode::OK);
    assert_eq!(raw.headers[header::CONTENT_TYPE], "audio/mp3");
    assert_eq!(
        raw.headers[header::CONTENT_DISPOSITION],
        "attachment; filename*=UTF-8''song.mp3"
    );
    assert_eq!(&raw.body[..], b"converted-mp3");

    let execs = fixture.engine.recorded_execs().await;
    assert_eq!(execs, vec![vec!["-i", "song.wav", "song.mp3"]]);
}

#[tokio::test]
async fn test_long_names_have_display_names() {
    let fixture = TestFixture::new().await;
    let name = "a very long recording name from the concert.wav";

    let response = fixture.upload(name, "audio/wav", &[3u8; 16]).await;
    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["input"]["name"], name);
    assert_eq!(
        response.body["input"]["display_name"],
        "a very long recording na...ncert.wav"
    );

    fixture
        .put("/api/v1/session/output-format", json!({ "format": "FLAC" }))
        .await;
    let response = fixture.post("/api/v1/session/convert").await;
    assert_status!(response, StatusCode::ACCEPTED);

    let snapshot = fixture.wait_for_state("completed").await;
    assert_eq!(
        snapshot["output"]["name"],
        "a very long recording name from the concert.flac"
    );
    assert_eq!(
        snapshot["output"]["display_name"],
        "a very long recording na...ncert.flac"
    );
}

#[tokio::test]
async fn test_video_to_audio_conversion() {
    let fixture = TestFixture::new().await;

    let response = fixture.upload("clip.mp4", "video/mp4", &[1u8; 32]).await;
    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["input"]["media_type"], "video");

    let response = fixture
        .put("/api/v1/session/output-format", json!({ "format": "MP3" }))
        .await;
    assert_status!(response, StatusCode::OK);

    let response = fixture.post("/api/v1/session/convert").await;
    assert_status!(response, StatusCode::ACCEPTED);

    let snapshot = fixture.wait_for_state("completed").await;
    assert_eq!(snapshot["output"]["name"], "clip.mp3");
    assert_eq!(snapshot["output"]["media_type"], "audio");
}

#[tokio::test]
async fn test_upload_name_is_reduced_to_file_name() {
    let fixture = TestFixture::new().await;

    let response = fixture
        .upload("../../music/song.flac", "audio/flac", &[1u8; 8])
        .await;
    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["input"]["name"], "song.flac");
}

#[tokio::test]
async fn test_upload_rejects_wrong_type() {
    let fixture = TestFixture::new().await;

    let response = fixture.upload("notes.txt", "text/plain", b"hello").await;
    assert_status!(response, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["reason"], "unsupported_file_type");
    assert_eq!(response.body["error"], "Invalid file type: txt");

    // Session untouched
    let response = fixture.get("/api/v1/session").await;
    assert_eq!(response.body["state"], "idle");
}

#[tokio::test]
async fn test_upload_without_file_field() {
    let fixture = TestFixture::new().await;

    let response = fixture.upload_without_file().await;
    assert_status!(response, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["reason"], "no_file_selected");
}

#[tokio::test]
async fn test_upload_too_large() {
    let fixture = TestFixture::with_config(TestConfig::with_max_size(16)).await;

    let response = fixture.upload("song.wav", "audio/wav", &[0u8; 17]).await;
    assert_status!(response, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(response.body["reason"], "file_too_large");

    let response = fixture.upload("song.wav", "audio/wav", &[0u8; 16]).await;
    assert_status!(response, StatusCode::OK);
}

#[tokio::test]
async fn test_upload_over_body_limit() {
    let fixture = TestFixture::with_config(TestConfig::with_body_limit(1024)).await;

    let response = fixture.upload("song.wav", "audio/wav", &[0u8; 4096]).await;
    assert_status!(response, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(response.body["reason"], "file_too_large");

    let response = fixture.get("/api/v1/session").await;
    assert_eq!(response.body["state"], "idle");

    let response = fixture.upload("song.wav", "audio/wav", &[0u8; 128]).await;
    assert_status!(response, StatusCode::OK);
}

#[tokio::test]
async fn test_upload_truncated_multipart_body() {
    let fixture = TestFixture::new().await;

    // Field data with no closing boundary
    let body = format!(
        "--{}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"song.wav\"\r\n\
         Content-Type: audio/wav\r\n\r\nabcdef",
        BOUNDARY
    );
    let response = fixture.send_multipart(body.into_bytes()).await;
    assert_status!(response, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["reason"], "upload_failed");

    let response = fixture.get("/api/v1/session").await;
    assert_eq!(response.body["state"], "idle");
}

#[tokio::test]
async fn test_upload_unsupported_media_extension() {
    let fixture = TestFixture::new().await;

    // Admitted by MIME type, but not a known container
    let response = fixture.upload("clip.xyz", "video/x-xyz", &[0u8; 8]).await;
    assert_status!(response, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["reason"], "unsupported_media");
}

#[tokio::test]
async fn test_select_format_not_offered() {
    let fixture = TestFixture::new().await;

    fixture.upload("song.wav", "audio/wav", &[0u8; 8]).await;

    let response = fixture
        .put("/api/v1/session/output-format", json!({ "format": "MP4" }))
        .await;
    assert_status!(response, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["reason"], "unsupported_output_format");

    let response = fixture.get("/api/v1/session").await;
    assert_eq!(response.body["state"], "loaded");
}

#[tokio::test]
async fn test_select_format_without_input() {
    let fixture = TestFixture::new().await;

    let response = fixture
        .put("/api/v1/session/output-format", json!({ "format": "MP3" }))
        .await;
    assert_status!(response, StatusCode::CONFLICT);
    assert_eq!(response.body["reason"], "invalid_state");
}

#[tokio::test]
async fn test_convert_without_selection() {
    let fixture = TestFixture::new().await;

    let response = fixture.post("/api/v1/session/convert").await;
    assert_status!(response, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["reason"], "missing_selection");

    fixture.upload("song.wav", "audio/wav", &[0u8; 8]).await;
    let response = fixture.post("/api/v1/session/convert").await;
    assert_status!(response, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["reason"], "missing_selection");
    assert_eq!(fixture.engine.exec_count().await, 0);
}

#[tokio::test]
async fn test_convert_waits_for_engine() {
    let fixture = TestFixture::with_config(TestConfig::without_engine()).await;

    let response = fixture.get("/api/v1/health").await;
    assert_eq!(response.body["engine"]["status"], "not_loaded");

    // Input and format work without the engine
    fixture.upload("song.wav", "audio/wav", &[0u8; 8]).await;
    let response = fixture
        .put("/api/v1/session/output-format", json!({ "format": "OGG" }))
        .await;
    assert_status!(response, StatusCode::OK);

    let response = fixture.post("/api/v1/session/convert").await;
    assert_status!(response, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(response.body["reason"], "engine_not_ready");

    let response = fixture.post("/api/v1/engine/load").await;
    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["status"], "ready");

    let response = fixture.post("/api/v1/session/convert").await;
    assert_status!(response, StatusCode::ACCEPTED);
    let snapshot = fixture.wait_for_state("completed").await;
    assert_eq!(snapshot["output"]["name"], "song.ogg");
}

#[tokio::test]
async fn test_engine_load_failure() {
    let fixture = TestFixture::with_config(TestConfig::without_engine()).await;
    fixture.engine.fail_next_load("wasm fetch failed").await;

    let response = fixture.post("/api/v1/engine/load").await;
    assert_status!(response, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(response.body["reason"], "engine_load_failed");

    let response = fixture.get("/api/v1/health").await;
    assert_eq!(response.body["engine"]["status"], "failed");

    // Retry succeeds
    let response = fixture.post("/api/v1/engine/load").await;
    assert_status!(response, StatusCode::OK);
    assert_eq!(fixture.engine.load_count(), 2);
}

#[tokio::test]
async fn test_conversion_failure_and_acknowledge() {
    let fixture = TestFixture::new().await;
    fixture
        .engine
        .set_next_exec_error(EngineError::exec_failed(
            "ffmpeg exited with status 1",
            Some("Invalid data found".to_string()),
        ))
        .await;

    fixture.upload("song.wav", "audio/wav", &[0u8; 8]).await;
    fixture
        .put("/api/v1/session/output-format", json!({ "format": "MP3" }))
        .await;
    let response = fixture.post("/api/v1/session/convert").await;
    assert_status!(response, StatusCode::ACCEPTED);

    let snapshot = fixture.wait_for_state("failed").await;
    assert_eq!(snapshot["error"]["reason"], "engine_exec_failed");
    assert!(snapshot.get("input").is_none());

    let response = fixture.get("/api/v1/session/output").await;
    assert_status!(response, StatusCode::NOT_FOUND);

    let response = fixture.post("/api/v1/session/acknowledge").await;
    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["state"], "idle");

    let response = fixture.post("/api/v1/session/acknowledge").await;
    assert_status!(response, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_new_upload_replaces_output() {
    let fixture = TestFixture::new().await;

    fixture.upload("song.wav", "audio/wav", &[0u8; 8]).await;
    fixture
        .put("/api/v1/session/output-format", json!({ "format": "MP3" }))
        .await;
    fixture.post("/api/v1/session/convert").await;
    fixture.wait_for_state("completed").await;

    let response = fixture.upload("other.flac", "audio/flac", &[0u8; 8]).await;
    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["state"], "loaded");
    assert!(response.body.get("output").is_none());
    assert!(response.body.get("output_format").is_none());

    let response = fixture.get("/api/v1/session/output").await;
    assert_status!(response, StatusCode::NOT_FOUND);
    assert_eq!(response.body["reason"], "no_output");
}

#[tokio::test]
async fn test_playback_position() {
    let fixture = TestFixture::new().await;
    fixture.engine.set_duration(125.0).await;

    let response = fixture.get("/api/v1/session/output/playback?elapsed=5").await;
    assert_status!(response, StatusCode::CONFLICT);

    fixture.upload("song.wav", "audio/wav", &[0u8; 8]).await;
    fixture
        .put("/api/v1/session/output-format", json!({ "format": "MP3" }))
        .await;
    fixture.post("/api/v1/session/convert").await;
    fixture.wait_for_state("completed").await;

    let response = fixture
        .get("/api/v1/session/output/playback?elapsed=65")
        .await;
    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["elapsed_label"], "01:05");
    assert_eq!(response.body["duration_label"], "02:05");
    assert_eq!(response.body["percent"], 52.0);
}

#[tokio::test]
async fn test_reset_session() {
    let fixture = TestFixture::new().await;

    fixture.upload("song.wav", "audio/wav", &[0u8; 8]).await;

    let response = fixture.delete("/api/v1/session").await;
    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["state"], "idle");
    assert!(response.body.get("input").is_none());
}

#[tokio::test]
async fn test_config_is_sanitized() {
    let fixture = TestFixture::new().await;

    let response = fixture.get("/api/v1/config").await;
    assert_status!(response, StatusCode::OK);
    assert!(response.body["engine"].get("ffmpeg_path").is_none());
    assert!(response.body["engine"].get("work_dir").is_none());
    assert_eq!(response.body["picker_check_delay_ms"], 60_000);
    assert_eq!(response.body["formats"]["audio"][0], "MP3");
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let fixture = TestFixture::new().await;

    fixture.upload("song.wav", "audio/wav", &[0u8; 8]).await;

    let raw = fixture.get_raw("/api/v1/metrics").await;
    assert_eq!(raw.status, StatusCode::OK);
    let text = String::from_utf8(raw.body.to_vec()).unwrap();
    assert!(text.contains("ffmfy_session_state"));
    assert!(text.contains("ffmfy_admissions_total"));
    assert!(text.contains("ffmfy_http_requests_total"));
}
