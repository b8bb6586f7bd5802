use std::collections::HashMap;
use std::fs;
use std::net::SocketAddr;
use std::time::Duration;

use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use markgate::gateway::backend::resolve_converter;
use markgate::gateway::config::{FetchConfig, GatewayConfig};
use markgate::gateway::entities::decode_entities;
use markgate::gateway::errors::{ConfigurationError, GatewayError, HttpError, ValidationError};
use markgate::gateway::html_converter::{HtmlConverter, normalize_whitespace};
use markgate::gateway::http_client::{FetchOptions, FetchedContent, fetch_url_content, is_reachable};
use markgate::gateway::service::{
    ConversionOptions, ConversionRequest, ConversionService, ReplyBody, SourceType,
};
use markgate::gateway::title::extract_title;

/// Canned reply of the throw-away HTTP server.
struct Canned {
    status: u16,
    content_type: &'static str,
    body: String,
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        404 => "Not Found",
        500 => "Internal Server Error",
        _ => "Unknown",
    }
}

/// Serve every connection on a local port with `respond(request_head)`.
/// HEAD requests get the headers only.
async fn serve(respond: fn(&str) -> Canned) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                break;
            };
            tokio::spawn(async move {
                let mut buf = Vec::new();
                let mut chunk = [0u8; 1024];
                while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
                    match socket.read(&mut chunk).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => buf.extend_from_slice(&chunk[..n]),
                    }
                }

                let head = String::from_utf8_lossy(&buf).into_owned();
                let canned = respond(&head);
                let mut reply = format!(
                    "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                    canned.status,
                    reason(canned.status),
                    canned.content_type,
                    canned.body.len()
                );
                if !head.starts_with("HEAD") {
                    reply.push_str(&canned.body);
                }
                let _ = socket.write_all(reply.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    addr
}

/// Accept connections and never answer.
async fn serve_silently() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });

    addr
}

const REMOTE_PAGE: &str =
    "<html><head><title>Remote</title></head><body><p>Fetched &amp; converted</p></body></html>";

fn html_page(_: &str) -> Canned {
    Canned {
        status: 200,
        content_type: "text/html; charset=utf-8",
        body: REMOTE_PAGE.to_string(),
    }
}

fn pdf_file(_: &str) -> Canned {
    Canned {
        status: 200,
        content_type: "application/pdf",
        body: "%PDF-1.4 not really".to_string(),
    }
}

fn not_found(_: &str) -> Canned {
    Canned {
        status: 404,
        content_type: "text/html",
        body: "<h1>Not Found</h1>".to_string(),
    }
}

fn server_error(_: &str) -> Canned {
    Canned {
        status: 500,
        content_type: "text/html",
        body: "boom".to_string(),
    }
}

/// 200 only when the request carries `x-token: secret`.
fn token_guarded(head: &str) -> Canned {
    if head.to_ascii_lowercase().contains("x-token: secret") {
        html_page(head)
    } else {
        Canned {
            status: 500,
            content_type: "text/plain",
            body: "missing token".to_string(),
        }
    }
}

/// 404 unless the request comes from `reader-bot`.
fn agent_guarded(head: &str) -> Canned {
    if head.to_ascii_lowercase().contains("user-agent: reader-bot") {
        html_page(head)
    } else {
        not_found(head)
    }
}

fn service() -> ConversionService {
    ConversionService::new(
        resolve_converter(&GatewayConfig::default().converter),
        FetchConfig::default(),
    )
}

/// Complete document through the builtin converter
#[test]
fn test_full_document_conversion() {
    let _ = env_logger::try_init();
    let converter = HtmlConverter::new();

    let html = "<html><head><title>Test Document</title></head><body>\
        <h1>Main</h1>\
        <p>Hello <strong>bold</strong> &amp; <em>it</em>.</p>\
        <ul><li>One</li><li>Two</li></ul>\
        </body></html>";

    let markdown = converter.convert_to_markdown(html);
    assert_eq!(
        markdown,
        "# Test Document\n\n# Main\nHello **bold** & *it*.\n\n- One\n- Two"
    );
}

/// Indented markup with comments and unknown tags
#[test]
fn test_html_markdown_conversion_quality() {
    let converter = HtmlConverter::new();

    let html = r#"
    <!DOCTYPE html>
    <html lang="en">
    <head>
        <title>  Quality Check  </title>
        <meta charset="UTF-8">
    </head>
    <body class="page">
        <H2 id="sub">Subtitle with <b>bold</b> text</H2>
        <p>A <a href="https://example.com">link to example</a> and <i>slanted</i> words.</p>
        <ol>
            <li value="7">First ordered item</li>
            <li>Second ordered item</li>
        </ol>
        <p>Image: <img src="/images/test.jpg" alt="Test Image"></p>
        <p>Line one<br>Line two<br/>Line three</p>
        <!-- This comment should be ignored -->
        <section><div>Content in div</div></section>
        <hr>
        <span>tail</span>
    </body>
    </html>
    "#;

    let markdown = converter.convert_to_markdown(html);
    println!("Converted markdown:\n{}", markdown);

    assert!(markdown.starts_with("# Quality Check\n\n"));
    assert!(markdown.contains("## Subtitle with **bold** text\n"));
    assert!(markdown.contains("A [link to example](https://example.com) and *slanted* words."));
    assert!(markdown.contains("1. First ordered item\n2. Second ordered item\n"));
    assert!(markdown.contains("Image: ![Test Image](/images/test.jpg)"));
    assert!(markdown.contains("Line one\nLine two\nLine three"));
    assert!(markdown.contains("Content in div\n"));
    assert!(markdown.contains("---"));
    assert!(markdown.ends_with("tail"));

    assert!(!markdown.contains('<'));
    assert!(!markdown.contains("comment should be ignored"));
    assert!(!markdown.contains("\n\n\n"));
}

#[test]
fn test_documented_conversion_properties() {
    let converter = HtmlConverter::new();

    assert_eq!(decode_entities("plain text"), "plain text");
    assert_eq!(decode_entities("&amp;lt;"), "&lt;");

    assert_eq!(converter.render_document("<h3>Title</h3>"), "### Title\n");
    assert_eq!(converter.render_document("<p>A</p><p>B</p>"), "A\n\nB\n\n");
    assert_eq!(
        converter.render_document(r#"<a href="http://x.com">click</a>"#),
        "[click](http://x.com)"
    );
    assert_eq!(
        converter.render_document(r#"<img src="a.png" alt="pic">"#),
        "![pic](a.png)"
    );
    assert_eq!(converter.render_document(r#"<img src="a.png">"#), "![](a.png)");

    let list = converter.convert_to_markdown("<ul><li>a</li><li>b</li><li>c</li></ul>");
    assert_eq!(list.lines().collect::<Vec<_>>(), vec!["- a", "- b", "- c"]);

    let ordered =
        converter.convert_to_markdown(r#"<ol><li value="5">x</li><li value="9">y</li></ol>"#);
    assert_eq!(ordered, "1. x\n2. y");

    assert_eq!(normalize_whitespace("a\n\n\n\nb"), "a\n\nb");

    let document =
        "<html><head><title>Doc</title></head><body><h1>Hi</h1><p>Text</p></body></html>";
    assert_eq!(converter.render_document(document), "# Doc\n\n# Hi\nText\n\n");
    assert_eq!(converter.convert_to_markdown(document), "# Doc\n\n# Hi\nText");
}

/// Conversion has no error path, whatever the input
#[test]
fn test_malformed_input_degrades_gracefully() {
    let converter = HtmlConverter::new();

    assert_eq!(converter.convert_to_markdown(""), "");
    assert_eq!(converter.convert_to_markdown("just text"), "just text");
    assert_eq!(converter.convert_to_markdown("<p>never closed"), "never closed");
    assert_eq!(converter.convert_to_markdown("a < b"), "a < b");
    assert_eq!(converter.convert_to_markdown("</div></p>stray"), "stray");
    assert_eq!(converter.convert_to_markdown("<custom>kept</custom>"), "kept");
    assert_eq!(extract_title("<p>no title</p>"), None);
    assert_eq!(
        extract_title("<TITLE lang=\"en\">\n First \n</TITLE><title>Second</title>").as_deref(),
        Some("First")
    );
}

#[test]
fn test_configured_tag_aliases() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("markgate.yaml");
    fs::write(
        &config_path,
        r#"
converter:
  backend: builtin
  tag_aliases:
    article: paragraph
    mark: bold
"#,
    )
    .unwrap();

    let config = GatewayConfig::load_from_yaml(config_path.to_str().unwrap()).unwrap();
    assert!(config.validate().is_ok());

    let converter = resolve_converter(&config.converter);
    assert_eq!(converter.name(), "builtin");
    assert_eq!(
        converter.convert("<article>A <mark>hot</mark></article><article>B</article>"),
        "A **hot**\n\nB"
    );
}

#[test]
fn test_invalid_configuration_is_reported() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("broken.yaml");
    fs::write(&config_path, "fetch:\n  timeout_seconds: [not, a, number]\n").unwrap();

    match GatewayConfig::load_from_yaml(config_path.to_str().unwrap()) {
        Err(GatewayError::Configuration(ConfigurationError::ParseError(_))) => {}
        other => panic!("Expected parse error, got {:?}", other.map(|_| ())),
    }

    let config = GatewayConfig::load_or_default(config_path.to_str().unwrap());
    assert_eq!(config.fetch.timeout_seconds, 30);

    let mut config = GatewayConfig::default();
    config.fetch.preflight_timeout_seconds = 0;
    assert!(matches!(
        config.validate(),
        Err(ConfigurationError::ValidationFailed(_))
    ));
}

#[tokio::test]
async fn test_fetch_html_page() {
    let addr = serve(html_page).await;
    let url = format!("http://{}/page", addr);

    let response = fetch_url_content(&url, &FetchOptions::default()).await.unwrap();
    assert_eq!(response.content, FetchedContent::Text(REMOTE_PAGE.to_string()));
    assert_eq!(response.size_bytes, REMOTE_PAGE.len() as u64);
    assert!(response.content_type().starts_with("text/html"));
}

#[tokio::test]
async fn test_fetch_binary_content() {
    let addr = serve(pdf_file).await;
    let url = format!("http://{}/doc.pdf", addr);

    let response = fetch_url_content(&url, &FetchOptions::default()).await.unwrap();
    match response.content {
        FetchedContent::Binary(bytes) => assert!(bytes.starts_with(b"%PDF")),
        other => panic!("Expected binary content, got {:?}", other),
    }
}

#[tokio::test]
async fn test_fetch_sends_custom_headers() {
    let addr = serve(token_guarded).await;
    let url = format!("http://{}/private", addr);

    let err = fetch_url_content(&url, &FetchOptions::default()).await.unwrap_err();
    assert!(matches!(err, HttpError::Status { status: 500, .. }));

    let mut headers = HashMap::new();
    headers.insert("X-Token".to_string(), "secret".to_string());
    let options = FetchOptions {
        headers: Some(headers),
        ..FetchOptions::default()
    };
    let response = fetch_url_content(&url, &options).await.unwrap();
    assert!(matches!(response.content, FetchedContent::Text(_)));
}

#[tokio::test]
async fn test_fetch_error_status() {
    let addr = serve(server_error).await;
    let url = format!("http://{}/broken", addr);

    match fetch_url_content(&url, &FetchOptions::default()).await {
        Err(HttpError::Status { status, .. }) => assert_eq!(status, 500),
        other => panic!("Expected status error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_fetch_times_out_instead_of_hanging() {
    let addr = serve_silently().await;
    let url = format!("http://{}/slow", addr);
    let options = FetchOptions {
        timeout: Duration::from_secs(1),
        ..FetchOptions::default()
    };

    let result = tokio::time::timeout(Duration::from_secs(5), fetch_url_content(&url, &options))
        .await
        .expect("fetch must give up within its own timeout");
    assert!(matches!(result, Err(HttpError::Timeout(_))));
}

#[tokio::test]
async fn test_preflight_check() {
    let options = FetchOptions::default();

    let ok = serve(html_page).await;
    assert!(is_reachable(&format!("http://{}/", ok), Duration::from_secs(5), &options).await);

    let missing = serve(not_found).await;
    assert!(!is_reachable(&format!("http://{}/", missing), Duration::from_secs(5), &options).await);

    let silent = serve_silently().await;
    assert!(!is_reachable(&format!("http://{}/", silent), Duration::from_secs(1), &options).await);
}

#[tokio::test]
async fn test_preflight_and_fetch_share_user_agent() {
    let addr = serve(agent_guarded).await;
    let url = format!("http://{}/page", addr);

    assert!(!is_reachable(&url, Duration::from_secs(5), &FetchOptions::default()).await);

    let options = FetchOptions {
        user_agent: "reader-bot/1.0".to_string(),
        ..FetchOptions::default()
    };
    assert!(is_reachable(&url, Duration::from_secs(5), &options).await);

    let service = ConversionService::new(
        resolve_converter(&GatewayConfig::default().converter),
        FetchConfig {
            user_agent: "reader-bot/1.0".to_string(),
            ..FetchConfig::default()
        },
    );
    let (markdown, _) = service.convert_url(&url, None, None).await.unwrap();
    assert_eq!(markdown, "# Remote\n\nFetched & converted");
}

#[tokio::test]
async fn test_service_converts_url() {
    let addr = serve(html_page).await;
    let url = format!("http://{}/page", addr);

    let (markdown, metadata) = service().convert_url(&url, None, None).await.unwrap();
    assert_eq!(markdown, "# Remote\n\nFetched & converted");
    assert_eq!(metadata.title.as_deref(), Some("Remote"));
    assert_eq!(metadata.source_kind, SourceType::HtmlUrl);
    assert_eq!(metadata.size_bytes, Some(REMOTE_PAGE.len() as u64));
}

#[tokio::test]
async fn test_service_rejects_unreachable_url() {
    let addr = serve(not_found).await;
    let url = format!("http://{}/missing", addr);

    let err = service().convert_url(&url, None, None).await.unwrap_err();
    assert!(matches!(err, GatewayError::Validation(ValidationError::Unreachable(_))));
    assert!(err.to_string().contains("Invalid or inaccessible URL"));

    let request = ConversionRequest {
        source_type: SourceType::HtmlUrl,
        source: url,
        options: None,
    };
    let reply = service().handle(&request).await;
    assert_eq!(reply.status, 400);
    match reply.body {
        ReplyBody::Failed(body) => assert_eq!(body.error, "Validation error"),
        other => panic!("Expected error body, got {:?}", other),
    }
}

#[tokio::test]
async fn test_service_reply_status_mapping() {
    let pdf = serve(pdf_file).await;
    let request = ConversionRequest {
        source_type: SourceType::HtmlUrl,
        source: format!("http://{}/doc.pdf", pdf),
        options: None,
    };
    assert_eq!(service().handle(&request).await.status, 501);

    let request = ConversionRequest {
        source_type: SourceType::Pdf,
        source: "anything".to_string(),
        options: None,
    };
    assert_eq!(service().handle(&request).await.status, 501);

    let request = ConversionRequest {
        source_type: SourceType::HtmlSource,
        source: "<p>inline</p>".to_string(),
        options: Some(ConversionOptions::default()),
    };
    let reply = service().handle(&request).await;
    assert_eq!(reply.status, 200);

    let json: serde_json::Value = serde_json::from_str(&reply.to_json()).unwrap();
    assert_eq!(json["success"], true);
    assert_eq!(json["markdown"], "inline");
    assert_eq!(json["metadata"]["source_type"], "html_source");
    assert_eq!(json["metadata"]["file_size_bytes"], 13);
    assert!(json["metadata"]["title"].is_null());
}
