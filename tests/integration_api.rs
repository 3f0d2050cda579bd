//! API integration tests
//!
//! Drive the full router with `oneshot` requests against a scripted encoder.

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use common::{body_bytes, body_json, body_string, header, hevc_mkv_probe, TestHarness};
use cs_probe::{ExternalSubtitle, ProbeResult, SubtitleFormat, SubtitleTrack};

fn sample_bytes(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

#[tokio::test]
async fn test_health_endpoint() {
    let h = TestHarness::new();
    let response = h.get("/health").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response.into_body()).await, "ok");
}

#[tokio::test]
async fn test_system_reports_tools_and_sessions() {
    let h = TestHarness::new();
    let response = h.get("/api/system").await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response.into_body()).await;

    let tools = json["tools"].as_array().unwrap();
    let names: Vec<&str> = tools.iter().map(|t| t["name"].as_str().unwrap()).collect();
    assert_eq!(names, vec!["ffmpeg", "ffprobe"]);
    assert!(tools.iter().all(|t| t["available"] == false));
    assert!(json["sessions"].as_array().unwrap().is_empty());
    assert_eq!(json["segment_duration_secs"], 6);
    assert!(json["version"].is_string());
}

#[tokio::test]
async fn test_library_lists_direct_play_flags() {
    let h = TestHarness::new();
    let mp4 = ProbeResult {
        video_codec: Some("h264".into()),
        audio_codec: Some("aac".into()),
        container: Some("mov,mp4,m4a,3gp,3g2,mj2".into()),
        ..Default::default()
    };
    h.add_item(1, "a.mp4", b"x", Some(&mp4), vec![]);
    h.add_item(2, "b.mkv", b"x", Some(&hevc_mkv_probe()), vec![]);

    let response = h.get("/api/library").await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response.into_body()).await;
    let items = json.as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["id"], 1);
    assert_eq!(items[0]["direct_play"], true);
    assert_eq!(items[1]["direct_play"], false);
}

#[tokio::test]
async fn test_direct_play_full_and_ranged() {
    let h = TestHarness::new();
    let data = sample_bytes(1000);
    h.add_item(7, "movie.mp4", &data, None, vec![]);

    let response = h.get("/api/stream/7").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header(&response, "content-length"), Some("1000"));
    assert_eq!(header(&response, "accept-ranges"), Some("bytes"));
    assert_eq!(header(&response, "content-type"), Some("video/mp4"));
    assert_eq!(body_bytes(response.into_body()).await, data);

    let response = h
        .send(
            Request::get("/api/stream/7")
                .header("range", "bytes=100-199")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
    assert_eq!(header(&response, "content-range"), Some("bytes 100-199/1000"));
    assert_eq!(header(&response, "content-length"), Some("100"));
    assert_eq!(body_bytes(response.into_body()).await, &data[100..200]);
}

#[tokio::test]
async fn test_direct_play_open_ended_range_is_clamped() {
    let h = TestHarness::new();
    let data = sample_bytes(1000);
    h.add_item(7, "movie.mp4", &data, None, vec![]);

    let response = h
        .send(
            Request::get("/api/stream/7")
                .header("range", "bytes=900-5000")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
    assert_eq!(header(&response, "content-range"), Some("bytes 900-999/1000"));
    assert_eq!(body_bytes(response.into_body()).await.len(), 100);
}

#[tokio::test]
async fn test_direct_play_unsatisfiable_range() {
    let h = TestHarness::new();
    h.add_item(7, "movie.mp4", &sample_bytes(1000), None, vec![]);

    let response = h
        .send(
            Request::get("/api/stream/7")
                .header("range", "bytes=2000-")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::RANGE_NOT_SATISFIABLE);
    assert_eq!(header(&response, "content-range"), Some("bytes */1000"));
}

#[tokio::test]
async fn test_direct_play_unknown_item_and_bad_id() {
    let h = TestHarness::new();

    let response = h.get("/api/stream/999").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response.into_body()).await["code"], "not_found");

    let response = h.get("/api/stream/abc").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response.into_body()).await["code"], "validation_error");
}

#[tokio::test]
async fn test_stream_info_reports_probe() {
    let h = TestHarness::new();
    h.add_item(3, "b.mkv", b"x", Some(&hevc_mkv_probe()), vec![]);

    let response = h.get("/api/stream/3/info").await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response.into_body()).await;
    assert_eq!(json["direct_play"], false);
    assert_eq!(json["probe"]["video_codec"], "hevc");
}

#[cfg(unix)]
#[tokio::test]
async fn test_transcode_session_end_to_end() {
    let h = TestHarness::new();
    h.add_item(42, "show.mkv", b"x", Some(&hevc_mkv_probe()), vec![]);

    let response = h.get("/api/stream/42/hls/stream.m3u8?start=120").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        header(&response, "content-type"),
        Some("application/vnd.apple.mpegurl")
    );
    let manifest = body_string(response.into_body()).await;
    assert!(manifest.contains("/api/stream/42/hls/seg_00000.ts"));
    assert_eq!(h.encoder.launches(), 1);
    assert_eq!(h.encoder.last_job().unwrap().start_seconds, 120.0);

    let response = h.get("/api/stream/42/hls/seg_00000.ts").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header(&response, "content-type"), Some("video/mp2t"));
    assert_eq!(body_string(response.into_body()).await, "segment-0");

    let response = h.get("/api/stream/42/hls/status").await;
    assert_eq!(response.status(), StatusCode::OK);
    let status = body_json(response.into_body()).await;
    assert_eq!(status["state"], "ready");
    assert_eq!(status["media_item_id"], 42);
    assert_eq!(status["start_seconds"], 120.0);

    // Joining again does not relaunch, even with a different offset.
    let response = h.get("/api/stream/42/hls/stream.m3u8?start=600").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(h.encoder.launches(), 1);

    let response = h
        .send(
            Request::delete("/api/stream/42/hls")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response.into_body()).await["ok"], true);
    assert_eq!(h.cache_entries(), 0);

    let response = h.get("/api/stream/42/hls/seg_00000.ts").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response.into_body()).await["code"], "no_active_session");

    let response = h.get("/api/stream/42/hls/status").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[cfg(unix)]
#[tokio::test]
async fn test_concurrent_manifest_requests_share_one_encoder() {
    let h = TestHarness::new();
    h.add_item(5, "a.mkv", b"x", Some(&hevc_mkv_probe()), vec![]);

    let requests = (0..4).map(|_| h.get("/api/stream/5/hls/stream.m3u8"));
    for response in futures::future::join_all(requests).await {
        assert_eq!(response.status(), StatusCode::OK);
    }
    assert_eq!(h.encoder.launches(), 1);
    assert_eq!(h.cache_entries(), 1);
}

#[cfg(unix)]
#[tokio::test]
async fn test_segment_errors_are_distinct() {
    let h = TestHarness::new();
    h.add_item(8, "a.mkv", b"x", Some(&hevc_mkv_probe()), vec![]);

    // No session yet.
    let response = h.get("/api/stream/8/hls/seg_00000.ts").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response.into_body()).await["code"], "no_active_session");

    let response = h.get("/api/stream/8/hls/stream.m3u8").await;
    assert_eq!(response.status(), StatusCode::OK);

    // Live session, segment not listed.
    let response = h.get("/api/stream/8/hls/seg_00099.ts").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response.into_body()).await["code"], "not_found");

    // Names outside the segment pattern are rejected before any lookup.
    let response = h.get("/api/stream/8/hls/evil.sh").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response.into_body()).await["code"],
        "invalid_segment_request"
    );

    h.ctx.service.shutdown().await;
    assert!(h.ctx.service.transcoder().is_empty());
}

#[tokio::test]
async fn test_stop_without_session_is_ok() {
    let h = TestHarness::new();
    let response = h
        .send(
            Request::delete("/api/stream/77/hls")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response.into_body()).await["ok"], true);
}

#[tokio::test]
async fn test_manifest_for_unknown_item_is_not_found() {
    let h = TestHarness::new();
    let response = h.get("/api/stream/404/hls/stream.m3u8").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response.into_body()).await["code"], "not_found");
    assert_eq!(h.encoder.launches(), 0);
}

#[tokio::test]
async fn test_subtitle_listing_and_sidecar_webvtt() {
    let h = TestHarness::new();
    let vtt_path = h.media.path().join("show.en.vtt");
    std::fs::write(&vtt_path, "WEBVTT\n\n00:00.000 --> 00:01.000\nHello\n").unwrap();

    let probe = ProbeResult {
        subtitle_tracks: vec![SubtitleTrack {
            stream_index: 2,
            codec: "hdmv_pgs_subtitle".into(),
            language: Some("eng".into()),
            title: None,
            forced: false,
        }],
        ..hevc_mkv_probe()
    };
    h.add_item(
        9,
        "show.mkv",
        b"x",
        Some(&probe),
        vec![ExternalSubtitle {
            file_path: vtt_path,
            language: Some("en".into()),
            forced: false,
            format: SubtitleFormat::Vtt,
        }],
    );

    let response = h.get("/api/stream/9/subtitles").await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response.into_body()).await;
    assert_eq!(json["embedded"][0]["stream_index"], 2);
    assert_eq!(json["external"][0]["format"], "vtt");

    let response = h.get("/api/stream/9/subtitles/external/0").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(header(&response, "content-type").unwrap().starts_with("text/vtt"));
    assert!(body_string(response.into_body()).await.starts_with("WEBVTT"));

    let response = h.get("/api/stream/9/subtitles/embedded/2").await;
    assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    assert_eq!(
        body_json(response.into_body()).await["code"],
        "unsupported_subtitle_format"
    );

    let response = h.get("/api/stream/9/subtitles/external/5").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
