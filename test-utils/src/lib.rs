//! `test-utils` is used for testing in both `hookline-lib` and `hookline-bin`.
//! This crate does not depend on `hookline-lib` or `hookline-bin`, else we would get dependency cycles.
//! Macros are used instead, so that the importer is responsible for providing the dependencies.

/// Create a mock webhook, which responds with a predefined status when
/// handling a `POST` request
#[macro_export]
macro_rules! mock_server {
    ($status:expr $(, $func:tt ($($arg:expr),*))*) => {{
        let mock_server = wiremock::MockServer::start().await;
        let response_template = wiremock::ResponseTemplate::new(http::StatusCode::from($status));
        let template = response_template$(.$func($($arg),*))*;
        wiremock::Mock::given(wiremock::matchers::method("POST")).respond_with(template).mount(&mock_server).await;
        mock_server
    }};
}

/// Mount a response on `$server` which is served `$times` times before the
/// next matching mock takes over.
///
/// Mocks mounted earlier take precedence, so mount the transient responses
/// (e.g. a `429`) first and the steady-state response last.
#[macro_export]
macro_rules! mount_times {
    ($server:expr, $times:expr, $status:expr $(, $func:tt ($($arg:expr),*))*) => {{
        let response_template = wiremock::ResponseTemplate::new(http::StatusCode::from($status));
        let template = response_template$(.$func($($arg),*))*;
        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .respond_with(template)
            .up_to_n_times($times)
            .expect($times)
            .mount(&$server)
            .await;
    }};
}

/// Build a webhook URL on the given mock server
///
/// # Panic
///
/// This panics on error, so it should only be used for testing
#[macro_export]
macro_rules! webhook_url {
    ($server:expr) => {{
        url::Url::parse(&format!("{}/api/webhooks/1234/token", $server.uri()))
            .expect("Expected valid webhook URL")
    }};
}

/// Collect the JSON `content` field of every request the server received,
/// in arrival order.
#[macro_export]
macro_rules! received_contents {
    ($server:expr) => {{
        $server
            .received_requests()
            .await
            .expect("Request recording is enabled")
            .iter()
            .map(|request| {
                let value: serde_json::Value =
                    serde_json::from_slice(&request.body).expect("Expected JSON body");
                value["content"].as_str().unwrap_or_default().to_string()
            })
            .collect::<Vec<String>>()
    }};
}

/// Gets the "main" binary name (e.g. `hookline`)
#[macro_export]
macro_rules! main_command {
    () => {
        Command::cargo_bin(env!("CARGO_PKG_NAME")).expect("Couldn't get cargo package name")
    };
}
