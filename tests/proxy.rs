//! Egress proxy integration tests: allow-list, ranges, playlist rewriting.

mod common;

use common::TestHarness;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, ResponseTemplate};

// ---------------------------------------------------------------------------
// Allow-list
// ---------------------------------------------------------------------------

#[tokio::test]
async fn lookalike_targets_never_reach_upstream() {
    let harness = TestHarness::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&harness.upstream)
        .await;

    let port = harness.upstream.address().port();
    let targets = [
        format!("http://evil.com/127.0.0.1:{port}/seg.ts"),
        format!("http://127.0.0.1.evil.com:{port}/seg.ts"),
        format!("http://127.0.0.1@evil.com:{port}/seg.ts"),
        format!("http://user:pw@127.0.0.1:{port}/seg.ts"),
        "file:///etc/passwd".to_string(),
    ];
    for target in targets {
        let url = harness.url(&format!(
            "/api/proxy?url={}",
            urlencoding::encode(&target)
        ));
        let resp = reqwest::get(&url).await.unwrap();
        assert_eq!(resp.status(), 400, "{target}");
        let json: serde_json::Value = resp.json().await.unwrap();
        assert_eq!(json["code"], "invalid_proxy_target", "{target}");
    }
}

#[tokio::test]
async fn missing_url_is_rejected() {
    let harness = TestHarness::start().await;
    let resp = reqwest::get(harness.url("/api/proxy")).await.unwrap();
    assert_eq!(resp.status(), 400);
}

// ---------------------------------------------------------------------------
// Passthrough and ranges
// ---------------------------------------------------------------------------

#[tokio::test]
async fn range_is_forwarded_and_206_relayed() {
    let harness = TestHarness::start().await;
    Mock::given(path("/media/ep1.mp4"))
        .and(header("range", "bytes=0-3"))
        .respond_with(
            ResponseTemplate::new(206)
                .insert_header("content-type", "video/mp4")
                .insert_header("content-range", "bytes 0-3/100")
                .insert_header("accept-ranges", "bytes")
                .set_body_bytes(vec![0u8, 1, 2, 3]),
        )
        .expect(1)
        .mount(&harness.upstream)
        .await;

    let client = reqwest::Client::new();
    let resp = client
        .get(harness.proxy_url("/media/ep1.mp4", "mp4"))
        .header("range", "bytes=0-3")
        .header("origin", "https://player.example")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 206);
    let headers = resp.headers().clone();
    assert_eq!(headers["content-range"], "bytes 0-3/100");
    assert_eq!(headers["accept-ranges"], "bytes");
    assert_eq!(headers["access-control-allow-origin"], "*");
    assert_eq!(resp.bytes().await.unwrap().as_ref(), &[0u8, 1, 2, 3]);
}

#[tokio::test]
async fn head_returns_headers_only() {
    let harness = TestHarness::start().await;
    Mock::given(method("HEAD"))
        .and(path("/media/ep1.mp4"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "video/mp4")
                .insert_header("accept-ranges", "bytes"),
        )
        .expect(1)
        .mount(&harness.upstream)
        .await;

    let client = reqwest::Client::new();
    let resp = client
        .head(harness.proxy_url("/media/ep1.mp4", "mp4"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.headers()["content-type"], "video/mp4");
}

#[tokio::test]
async fn upstream_failure_is_502() {
    let harness = TestHarness::start().await;
    Mock::given(path("/media/gone.mp4"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&harness.upstream)
        .await;

    let resp = reqwest::get(harness.proxy_url("/media/gone.mp4", "mp4"))
        .await
        .unwrap();
    assert_eq!(resp.status(), 502);
}

#[tokio::test]
async fn upstream_404_stays_404() {
    let harness = TestHarness::start().await;
    Mock::given(path("/media/missing.mp4"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&harness.upstream)
        .await;

    let resp = reqwest::get(harness.proxy_url("/media/missing.mp4", "mp4"))
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
    let json: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(json["code"], "not_found");
}

#[tokio::test]
async fn preflight_is_answered() {
    let harness = TestHarness::start().await;
    let client = reqwest::Client::new();
    let resp = client
        .request(reqwest::Method::OPTIONS, harness.url("/api/proxy"))
        .header("origin", "https://player.example")
        .header("access-control-request-method", "GET")
        .header("access-control-request-headers", "range")
        .send()
        .await
        .unwrap();
    assert!(resp.status().is_success());
    assert_eq!(resp.headers()["access-control-allow-origin"], "*");
}

// ---------------------------------------------------------------------------
// Playlists
// ---------------------------------------------------------------------------

const MEDIA_PLAYLIST: &str = "#EXTM3U\n\
#EXT-X-VERSION:3\n\
#EXT-X-KEY:METHOD=AES-128,URI=\"key.bin\"\n\
#EXTINF:4.0,\n\
seg-0.ts\n\
#EXTINF:4.0,\n\
https://127.0.0.1/abs/seg-1.ts\n\
#EXT-X-ENDLIST\n";

#[tokio::test]
async fn manifest_is_rewritten_against_final_url() {
    let harness = TestHarness::start().await;
    Mock::given(path("/hls/index.m3u8"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(MEDIA_PLAYLIST, "application/vnd.apple.mpegurl"),
        )
        .mount(&harness.upstream)
        .await;

    let resp = reqwest::get(harness.proxy_url("/hls/index.m3u8", "m3u8"))
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.headers()["content-type"], "application/vnd.apple.mpegurl");
    let body = resp.text().await.unwrap();

    assert_eq!(body.lines().count(), MEDIA_PLAYLIST.lines().count());
    let base = format!("{}/hls/", harness.upstream.uri());
    let seg = format!(
        "/api/proxy?url={}&type=segment",
        urlencoding::encode(&format!("{base}seg-0.ts"))
    );
    let key = format!(
        "URI=\"/api/proxy?url={}&type=key\"",
        urlencoding::encode(&format!("{base}key.bin"))
    );
    assert!(body.contains(&seg), "{body}");
    assert!(body.contains(&key), "{body}");
    for line in body.lines().filter(|l| !l.starts_with('#') && !l.is_empty()) {
        assert!(line.starts_with("/api/proxy?url="), "{line}");
    }
}

#[tokio::test]
async fn playlist_is_sniffed_without_type_hint() {
    let harness = TestHarness::start().await;
    Mock::given(path("/hls/variant"))
        .respond_with(ResponseTemplate::new(200).set_body_string(MEDIA_PLAYLIST))
        .mount(&harness.upstream)
        .await;

    let resp = reqwest::get(harness.proxy_url("/hls/variant", "segment"))
        .await
        .unwrap();
    let body = resp.text().await.unwrap();
    assert!(body.starts_with("#EXTM3U"));
    assert!(body.contains("/api/proxy?url="));
    assert!(!body.lines().any(|l| l == "seg-0.ts"));
}

#[tokio::test]
async fn segments_pass_through_untouched() {
    let harness = TestHarness::start().await;
    Mock::given(path("/hls/seg-0.ts"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "video/mp2t")
                .set_body_bytes(b"G@\x00\x10segment".to_vec()),
        )
        .mount(&harness.upstream)
        .await;

    let resp = reqwest::get(harness.proxy_url("/hls/seg-0.ts", "segment"))
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.headers()["content-type"], "video/mp2t");
    assert_eq!(resp.bytes().await.unwrap().as_ref(), b"G@\x00\x10segment");
}

#[tokio::test]
async fn redirect_off_the_allow_list_is_refused() {
    let harness = TestHarness::start().await;
    Mock::given(path("/hop"))
        .respond_with(
            ResponseTemplate::new(302).insert_header("location", "http://evil.example/seg.ts"),
        )
        .mount(&harness.upstream)
        .await;

    let resp = reqwest::get(harness.proxy_url("/hop", "segment")).await.unwrap();
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn redirect_within_the_allow_list_is_followed() {
    let harness = TestHarness::start().await;
    Mock::given(path("/hop"))
        .respond_with(ResponseTemplate::new(302).insert_header("location", "/hls/index.m3u8"))
        .mount(&harness.upstream)
        .await;
    Mock::given(path("/hls/index.m3u8"))
        .respond_with(ResponseTemplate::new(200).set_body_string(MEDIA_PLAYLIST))
        .mount(&harness.upstream)
        .await;

    let resp = reqwest::get(harness.proxy_url("/hop", "m3u8")).await.unwrap();
    assert_eq!(resp.status(), 200);
    let body = resp.text().await.unwrap();
    let expected = urlencoding::encode(&format!("{}/hls/seg-0.ts", harness.upstream.uri())).into_owned();
    assert!(body.contains(&expected), "{body}");
}

#[tokio::test]
async fn head_on_manifest_drops_upstream_length() {
    let harness = TestHarness::start().await;
    Mock::given(method("HEAD"))
        .and(path("/hls/index.m3u8"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(MEDIA_PLAYLIST, "application/vnd.apple.mpegurl"),
        )
        .expect(1)
        .mount(&harness.upstream)
        .await;

    let client = reqwest::Client::new();
    let resp = client
        .head(harness.proxy_url("/hls/index.m3u8", "m3u8"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let upstream_length = MEDIA_PLAYLIST.len().to_string();
    assert!(resp
        .headers()
        .get("content-length")
        .map_or(true, |v| v.to_str().unwrap() != upstream_length));
}
