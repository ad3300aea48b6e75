#[cfg(test)]
mod delivery {
    use std::time::{Duration, Instant, SystemTime};

    use http::{HeaderMap, HeaderValue, StatusCode};
    use hookline_lib::{ClientBuilder, DEFAULT_USER_AGENT, ErrorKind, RequestBody, Result};
    use pretty_assertions::assert_eq;
    use test_utils::{mock_server, mount_times, received_contents, webhook_url};
    use wiremock::matchers::{header, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_messages_arrive_in_submission_order() -> Result<()> {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header("content-type", "application/json; charset=utf-8"))
            .and(header("user-agent", DEFAULT_USER_AGENT))
            .respond_with(ResponseTemplate::new(204))
            .expect(5)
            .mount(&mock_server)
            .await;

        let client = ClientBuilder::builder()
            .url(webhook_url!(mock_server))
            .build()
            .client()?;

        let handles = (1..=5)
            .map(|i| client.send(&format!("message {i}")))
            .collect::<Result<Vec<_>>>()?;
        futures::future::try_join_all(handles).await?;
        client.close();

        assert_eq!(
            received_contents!(mock_server),
            (1..=5).map(|i| format!("message {i}")).collect::<Vec<_>>()
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_retry_after_header_is_obeyed() -> Result<()> {
        let mock_server = MockServer::start().await;
        mount_times!(
            mock_server,
            1,
            StatusCode::TOO_MANY_REQUESTS,
            insert_header("Retry-After", "1")
        );
        mount_times!(mock_server, 1, StatusCode::NO_CONTENT);

        let client = ClientBuilder::builder()
            .url(webhook_url!(mock_server))
            .build()
            .client()?;

        let start = Instant::now();
        client.send("hello")?.await?;
        client.close();

        assert!(start.elapsed() >= Duration::from_secs(1));
        assert_eq!(received_contents!(mock_server), vec!["hello", "hello"]);
        Ok(())
    }

    #[tokio::test]
    async fn test_retry_after_body_is_obeyed() -> Result<()> {
        let mock_server = MockServer::start().await;
        mount_times!(
            mock_server,
            1,
            StatusCode::TOO_MANY_REQUESTS,
            set_body_string(r#"{"message": "You are being rate limited.", "retry_after": 300, "global": false}"#)
        );
        mount_times!(mock_server, 1, StatusCode::NO_CONTENT);

        let client = ClientBuilder::builder()
            .url(webhook_url!(mock_server))
            .build()
            .client()?;

        let start = Instant::now();
        client.send("hello")?.await?;
        client.close();

        assert!(start.elapsed() >= Duration::from_millis(300));
        Ok(())
    }

    #[tokio::test]
    async fn test_exhausted_window_delays_next_message() -> Result<()> {
        let now = SystemTime::now();
        let now_secs = now.duration_since(SystemTime::UNIX_EPOCH).unwrap().as_secs();
        let mock_server = MockServer::start().await;
        mount_times!(
            mock_server,
            1,
            StatusCode::NO_CONTENT,
            insert_header("X-RateLimit-Remaining", "0"),
            insert_header("X-RateLimit-Limit", "1"),
            insert_header("Date", httpdate::fmt_http_date(now).as_str()),
            insert_header("X-RateLimit-Reset", (now_secs + 1).to_string().as_str())
        );
        mount_times!(mock_server, 1, StatusCode::NO_CONTENT);

        let client = ClientBuilder::builder()
            .url(webhook_url!(mock_server))
            .build()
            .client()?;

        let start = Instant::now();
        let first = client.send("first")?;
        let second = client.send("second")?;
        first.await?;
        assert_eq!(client.bucket().limit(), 1);
        second.await?;
        client.close();

        assert!(start.elapsed() >= Duration::from_millis(900));
        assert_eq!(received_contents!(mock_server), vec!["first", "second"]);
        Ok(())
    }

    #[tokio::test]
    async fn test_rejected_message_reports_status_and_body() -> Result<()> {
        let mock_server = mock_server!(
            StatusCode::BAD_REQUEST,
            set_body_string(r#"{"message": "Cannot send an empty message", "code": 50006}"#)
        );

        let client = ClientBuilder::builder()
            .url(webhook_url!(mock_server))
            .build()
            .client()?;

        let error = client.send("hello")?.await.unwrap_err();
        client.close();

        assert_eq!(error.status(), Some(StatusCode::BAD_REQUEST));
        assert_eq!(
            error.to_string(),
            r#"Request returned failure 400: {"message": "Cannot send an empty message", "code": 50006}"#
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_custom_headers_and_body() -> Result<()> {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header("x-proxy-auth", "secret"))
            .and(header("content-type", "text/plain"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&mock_server)
            .await;

        let mut custom_headers = HeaderMap::new();
        custom_headers.insert("x-proxy-auth", HeaderValue::from_static("secret"));
        let client = ClientBuilder::builder()
            .url(webhook_url!(mock_server))
            .custom_headers(custom_headers)
            .build()
            .client()?;

        let body = RequestBody::new(HeaderValue::from_static("text/plain"), "raw");
        client.submit(body)?.await?;
        client.close();
        Ok(())
    }

    #[tokio::test]
    async fn test_unreachable_webhook_fails_every_message() -> Result<()> {
        let client = ClientBuilder::builder()
            .url(url::Url::parse("http://127.0.0.1:9/api/webhooks/1234/token").unwrap())
            .timeout(Duration::from_secs(5))
            .build()
            .client()?;

        let first = client.send("first")?;
        let second = client.send("second")?;
        assert!(matches!(first.await, Err(ErrorKind::NetworkRequest(_))));
        assert!(matches!(second.await, Err(ErrorKind::NetworkRequest(_))));
        client.close();
        Ok(())
    }
}
