//! Integration tests for the pinned streaming proxy.

use std::sync::Arc;

use axum::body::to_bytes;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use terabox_proxy::{HostAllowList, PendingResponse, ProxyClient, StreamError};
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

mod support;
use support::socket_guard::{should_skip_socket_bound_test, start_mock_server_or_skip};

/// `gzip("abc")`, fixed mtime.
const GZIP_ABC: [u8; 23] = [
    0x1f, 0x8b, 0x08, 0x00, 0x00, 0x00, 0x00, 0x00, 0x02, 0xff, 0x4b, 0x4c, 0x4a, 0x06, 0x00, 0xc2,
    0x41, 0x24, 0x35, 0x03, 0x00, 0x00, 0x00,
];

fn client() -> ProxyClient {
    let allow_list = HostAllowList::provider_default().with_extra_hosts(["127.0.0.1"]);
    ProxyClient::new(Arc::new(allow_list)).unwrap()
}

fn url(server: &MockServer, p: &str) -> Url {
    Url::parse(&format!("{}{p}", server.uri())).unwrap()
}

#[tokio::test]
async fn test_preflight_accepts_ok() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("HEAD"))
        .and(path("/file.bin"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    client().preflight(&url(&server, "/file.bin")).await.unwrap();
}

#[tokio::test]
async fn test_preflight_404_is_not_found() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("HEAD"))
        .and(path("/missing.bin"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = client()
        .preflight(&url(&server, "/missing.bin"))
        .await
        .unwrap_err();
    assert!(matches!(err, StreamError::NotFound { .. }), "got {err:?}");
}

#[tokio::test]
async fn test_preflight_server_error_is_http_status() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("HEAD"))
        .and(path("/broken.bin"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let err = client()
        .preflight(&url(&server, "/broken.bin"))
        .await
        .unwrap_err();
    assert!(
        matches!(err, StreamError::HttpStatus { status: 500, .. }),
        "got {err:?}"
    );
}

#[tokio::test]
async fn test_redirect_to_untrusted_host_is_rejected() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("HEAD"))
        .and(path("/bounce"))
        .respond_with(
            ResponseTemplate::new(302).insert_header("Location", "http://evil.example/steal"),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/bounce"))
        .respond_with(
            ResponseTemplate::new(302).insert_header("Location", "http://evil.example/steal"),
        )
        .mount(&server)
        .await;

    let client = client();
    let target = url(&server, "/bounce");

    let err = client.preflight(&target).await.unwrap_err();
    assert!(err.is_security_rejection(), "got {err:?}");

    let err = client.fetch(&target).await.unwrap_err();
    assert!(err.is_security_rejection(), "got {err:?}");
}

#[tokio::test]
async fn test_redirect_within_trusted_hosts_is_followed() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    let final_url = format!("{}/real.bin", server.uri());
    Mock::given(method("HEAD"))
        .and(path("/hop"))
        .respond_with(ResponseTemplate::new(302).insert_header("Location", final_url.as_str()))
        .mount(&server)
        .await;
    Mock::given(method("HEAD"))
        .and(path("/real.bin"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    client().preflight(&url(&server, "/hop")).await.unwrap();
}

#[tokio::test]
async fn test_redirect_loop_is_bounded() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    for hop in 0..8 {
        let next = format!("{}/chain/{}", server.uri(), hop + 1);
        Mock::given(method("HEAD"))
            .and(path(format!("/chain/{hop}")))
            .respond_with(ResponseTemplate::new(302).insert_header("Location", next.as_str()))
            .mount(&server)
            .await;
    }

    let err = client().preflight(&url(&server, "/chain/0")).await.unwrap_err();
    assert!(
        matches!(err, StreamError::TooManyRedirects { .. }),
        "got {err:?}"
    );
}

#[tokio::test]
async fn test_stream_copies_body_and_shapes_headers() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    let body = b"%PDF-1.7 fake document bytes".to_vec();
    Mock::given(method("GET"))
        .and(path("/docs/report.pdf"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Content-Type", "application/pdf")
                .set_body_bytes(body.clone()),
        )
        .mount(&server)
        .await;

    let target = url(&server, "/docs/report.pdf");
    let upstream = client().fetch(&target).await.unwrap();
    let pending = PendingResponse::new(upstream, &target).unwrap();

    assert_eq!(pending.filename(), "report.pdf");
    assert_eq!(
        pending.headers()["content-disposition"],
        "attachment; filename=\"report.pdf\""
    );
    assert_eq!(pending.headers()["content-type"], "application/pdf");

    let response = pending.commit();
    assert_eq!(response.status(), 200);
    let streamed = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(streamed.as_ref(), body.as_slice());
}

#[tokio::test]
async fn test_stream_uses_upstream_disposition_and_default_type() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .and(path("/file/abc123"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Content-Disposition", "attachment; filename=\"holiday.mp4\"")
                .set_body_bytes(vec![0_u8; 16]),
        )
        .mount(&server)
        .await;

    let target = url(&server, "/file/abc123");
    let pending = PendingResponse::new(client().fetch(&target).await.unwrap(), &target).unwrap();

    assert_eq!(pending.filename(), "holiday.mp4");
    assert_eq!(pending.headers()["content-type"], "application/octet-stream");
    assert_eq!(pending.headers()["content-length"], "16");
}

#[tokio::test]
async fn test_fetch_non_success_is_http_status() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(410))
        .mount(&server)
        .await;

    let err = client().fetch(&url(&server, "/gone")).await.unwrap_err();
    assert!(
        matches!(err, StreamError::HttpStatus { status: 410, .. }),
        "got {err:?}"
    );
}

#[tokio::test]
async fn test_stream_relays_compressed_body_unchanged() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .and(path("/a.txt.gz"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Content-Type", "application/gzip")
                .insert_header("Content-Encoding", "gzip")
                .set_body_bytes(GZIP_ABC.to_vec()),
        )
        .mount(&server)
        .await;

    let target = url(&server, "/a.txt.gz");
    let pending = PendingResponse::new(client().fetch(&target).await.unwrap(), &target).unwrap();

    assert_eq!(pending.filename(), "a.txt.gz");
    assert_eq!(pending.headers()["content-length"], "23");
    assert_eq!(pending.headers()["content-encoding"], "gzip");

    let streamed = to_bytes(pending.commit().into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(streamed.as_ref(), GZIP_ABC.as_slice());
}

#[tokio::test]
async fn test_truncated_upstream_body_ends_committed_stream() {
    if should_skip_socket_bound_test() {
        return;
    }
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut request = Vec::new();
        let mut buf = [0_u8; 1024];
        while !request.windows(4).any(|w| w == b"\r\n\r\n") {
            let n = socket.read(&mut buf).await.unwrap();
            if n == 0 {
                return;
            }
            request.extend_from_slice(&buf[..n]);
        }
        socket
            .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 100\r\nContent-Type: application/octet-stream\r\n\r\n0123456789")
            .await
            .unwrap();
        socket.shutdown().await.unwrap();
    });

    let target = Url::parse(&format!("http://{addr}/short.bin")).unwrap();
    let pending = PendingResponse::new(client().fetch(&target).await.unwrap(), &target).unwrap();
    assert_eq!(pending.headers()["content-length"], "100");

    let response = pending.commit();
    assert_eq!(response.status(), 200);
    assert!(
        to_bytes(response.into_body(), usize::MAX).await.is_err(),
        "short upstream body must surface as a body error, not a complete file"
    );
}
