mod common;

use common::{gateway, test_config, Scripted, ScriptedClient, API_KEY};
use http_types::Method;
use lidarr_api::{ApiRequest, LidarrError, TransportFailure};
use serde_json::json;
use std::time::Duration;
use tokio::time::Instant;

#[test_log::test(tokio::test(start_paused = true))]
async fn test_consecutive_requests_respect_rate_limit() {
    let client = ScriptedClient::new(vec![
        Scripted::ok("{}"),
        Scripted::ok("{}"),
        Scripted::ok("{}"),
    ]);
    let gateway = gateway(&client, test_config().with_requests_per_second(2.0).unwrap());

    let start = Instant::now();
    for _ in 0..3 {
        gateway
            .execute(ApiRequest::get("system/status"))
            .await
            .unwrap();
    }

    let requests = client.requests();
    assert_eq!(requests.len(), 3);
    assert_eq!(requests[0].at, start);
    for pair in requests.windows(2) {
        assert!(pair[1].at - pair[0].at >= Duration::from_millis(500));
    }
    assert!(start.elapsed() >= Duration::from_secs(1));
}

#[test_log::test(tokio::test(start_paused = true))]
async fn test_transient_status_is_retried() {
    let client = ScriptedClient::new(vec![
        Scripted::status(503, "busy"),
        Scripted::ok(r#"{"version": "2.0.7"}"#),
    ]);
    let gateway = gateway(&client, test_config());

    let body = gateway
        .execute(ApiRequest::get("system/status"))
        .await
        .unwrap();

    assert_eq!(body, Some(json!({"version": "2.0.7"})));
    assert_eq!(client.request_count(), 2);
}

#[test_log::test(tokio::test(start_paused = true))]
async fn test_exhausted_retries_surface_last_status() {
    let client = ScriptedClient::new(vec![Scripted::status(500, "boom"); 4]);
    let gateway = gateway(&client, test_config());

    let start = Instant::now();
    let err = gateway
        .execute(ApiRequest::get("artist"))
        .await
        .unwrap_err();

    // Initial attempt plus the three default retries.
    assert_eq!(client.request_count(), 4);
    match err {
        LidarrError::Transport {
            url,
            failure:
                TransportFailure::Status {
                    status,
                    attempts,
                    body,
                },
        } => {
            assert_eq!(url, "http://lidarr.test:8686/api/v1/artist");
            assert_eq!(status, 500);
            assert_eq!(attempts, 4);
            assert_eq!(body, "boom");
        }
        other => panic!("Expected status failure, got: {other:?}"),
    }
    // 0 + 0.6 + 1.2 seconds of backoff
    assert!(start.elapsed() >= Duration::from_millis(1800));
}

#[test_log::test(tokio::test(start_paused = true))]
async fn test_client_errors_are_not_retried() {
    let client = ScriptedClient::new(vec![Scripted::status(404, "NotFound")]);
    let gateway = gateway(&client, test_config());

    let err = gateway
        .execute(ApiRequest::get("artist/999"))
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(404));
    assert_eq!(client.request_count(), 1);
}

#[test_log::test(tokio::test(start_paused = true))]
async fn test_retry_after_header_sets_the_delay() {
    let client = ScriptedClient::new(vec![
        Scripted::status(429, "slow down").with_header("Retry-After", "7"),
        Scripted::ok("[]"),
    ]);
    let gateway = gateway(&client, test_config());

    gateway.execute(ApiRequest::get("tag")).await.unwrap();

    let requests = client.requests();
    assert_eq!(requests.len(), 2);
    assert!(requests[1].at - requests[0].at >= Duration::from_secs(7));
}

#[test_log::test(tokio::test(start_paused = true))]
async fn test_retries_can_be_disabled() {
    let client = ScriptedClient::new(vec![Scripted::status(502, ""), Scripted::ok("{}")]);
    let gateway = gateway(&client, test_config().with_retries(0, 0.3).unwrap());

    let err = gateway
        .execute(ApiRequest::get("queue"))
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(502));
    assert_eq!(client.request_count(), 1);
}

#[test_log::test(tokio::test(start_paused = true))]
async fn test_empty_body_decodes_to_none() {
    let client = ScriptedClient::new(vec![Scripted::ok(""), Scripted::ok("  \n")]);
    let gateway = gateway(&client, test_config());

    assert_eq!(
        gateway
            .execute(ApiRequest::delete("tag/3"))
            .await
            .unwrap(),
        None
    );
    assert_eq!(
        gateway
            .execute(ApiRequest::delete("tag/4"))
            .await
            .unwrap(),
        None
    );
}

#[test_log::test(tokio::test(start_paused = true))]
async fn test_malformed_json_is_a_decode_error() {
    let client = ScriptedClient::new(vec![Scripted::ok("<html>login</html>")]);
    let gateway = gateway(&client, test_config());

    let err = gateway
        .execute(ApiRequest::get("artist"))
        .await
        .unwrap_err();

    assert!(matches!(err, LidarrError::Decode(_)));
    assert!(!err.is_retryable());
}

#[test_log::test(tokio::test(start_paused = true))]
async fn test_request_carries_key_headers_and_query() {
    let client = ScriptedClient::new(vec![Scripted::ok("[]")]);
    let gateway = gateway(&client, test_config());

    gateway
        .execute(ApiRequest::get("artist/lookup").query("term", "Daft Punk"))
        .await
        .unwrap();

    let request = client.last_request();
    assert_eq!(request.method, Method::Get);
    assert_eq!(request.path(), "/api/v1/artist/lookup");
    assert_eq!(
        request.query_pairs(),
        vec![("term".to_string(), "Daft Punk".to_string())]
    );
    assert_eq!(request.api_key.as_deref(), Some(API_KEY));
    assert_eq!(request.content_type.as_deref(), Some("application/json"));
}

#[test_log::test(tokio::test(start_paused = true))]
async fn test_post_sends_json_body() {
    let client = ScriptedClient::new(vec![Scripted::status(201, r#"{"id": 12, "label": "jazz"}"#)]);
    let gateway = gateway(&client, test_config());

    let created = gateway
        .execute(ApiRequest::post("tag").json(json!({"label": "jazz"})))
        .await
        .unwrap();

    assert_eq!(created, Some(json!({"id": 12, "label": "jazz"})));
    let request = client.last_request();
    assert_eq!(request.method, Method::Post);
    assert_eq!(request.json(), json!({"label": "jazz"}));
}

#[test_log::test(tokio::test(start_paused = true))]
async fn test_post_is_resent_after_transient_status() {
    let client = ScriptedClient::new(vec![
        Scripted::status(503, "busy"),
        Scripted::status(201, r#"{"id": 77, "artistName": "Portishead"}"#),
    ]);
    let gateway = gateway(&client, test_config());
    let artist = json!({"artistName": "Portishead", "foreignArtistId": "8f6bd1e4"});

    let created = gateway
        .execute(ApiRequest::post("artist").json(artist.clone()))
        .await
        .unwrap();

    assert_eq!(created, Some(json!({"id": 77, "artistName": "Portishead"})));
    let requests = client.requests();
    assert_eq!(requests.len(), 2);
    for request in &requests {
        assert_eq!(request.method, Method::Post);
        assert_eq!(request.path(), "/api/v1/artist");
        assert_eq!(request.json(), artist);
    }
}

#[test_log::test(tokio::test(start_paused = true))]
async fn test_timeout_override_applies_to_one_call() {
    let client = ScriptedClient::new(vec![Scripted::Hang]);
    let gateway = gateway(&client, test_config());

    let start = Instant::now();
    let err = gateway
        .execute(ApiRequest::get("wanted/missing").timeout(Duration::from_secs(5)))
        .await
        .unwrap_err();

    match err {
        LidarrError::Transport {
            failure: TransportFailure::Timeout(timeout),
            ..
        } => assert_eq!(timeout, Duration::from_secs(5)),
        other => panic!("Expected timeout, got: {other:?}"),
    }
    assert!(start.elapsed() < Duration::from_secs(60));
    assert_eq!(client.request_count(), 1);
}

#[test_log::test(tokio::test(start_paused = true))]
async fn test_connection_errors_are_not_retried_by_the_gateway() {
    let client = ScriptedClient::new(vec![
        Scripted::ConnectionError("connection refused".to_string()),
        Scripted::ok("{}"),
    ]);
    let gateway = gateway(&client, test_config());

    let err = gateway
        .execute(ApiRequest::get("system/status"))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        LidarrError::Transport {
            failure: TransportFailure::Connection(_),
            ..
        }
    ));
    assert!(err.is_retryable());
    assert_eq!(client.request_count(), 1);
}

#[test_log::test(tokio::test(start_paused = true))]
async fn test_failed_request_does_not_start_rate_window() {
    let client = ScriptedClient::new(vec![
        Scripted::ok("{}"),
        Scripted::status(404, ""),
        Scripted::ok("{}"),
    ]);
    let gateway = gateway(&client, test_config());

    gateway
        .execute(ApiRequest::get("system/status"))
        .await
        .unwrap();
    gateway
        .execute(ApiRequest::get("artist/1"))
        .await
        .unwrap_err();
    gateway
        .execute(ApiRequest::get("system/status"))
        .await
        .unwrap();

    let requests = client.requests();
    // Both later calls are spaced from the one success, not from each other.
    assert!(requests[1].at - requests[0].at >= Duration::from_millis(500));
    assert_eq!(requests[2].at, requests[1].at);
}

#[test_log::test(tokio::test(start_paused = true))]
async fn test_separate_gateways_do_not_share_state() {
    let client = ScriptedClient::new(vec![Scripted::ok("{}"), Scripted::ok("{}")]);
    let first = gateway(&client, test_config());
    let second = gateway(&client, test_config());

    let start = Instant::now();
    first.execute(ApiRequest::get("system/status")).await.unwrap();
    second.execute(ApiRequest::get("system/status")).await.unwrap();

    assert_eq!(start.elapsed(), Duration::ZERO);
}

#[test]
fn test_endpoint_url_joins_prefix() {
    let client = ScriptedClient::default();
    let gateway = gateway(&client, test_config());

    let url = gateway
        .endpoint_url(&ApiRequest::get("/album").query("artistId", 7))
        .unwrap();
    assert_eq!(url.as_str(), "http://lidarr.test:8686/api/v1/album?artistId=7");
}
