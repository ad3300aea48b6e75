#[cfg(test)]
mod cli {
    use std::{error::Error, fs, io::Write};

    use assert_cmd::Command;
    use http::StatusCode;
    use predicates::str::contains;
    use pretty_assertions::assert_eq;
    use serde_json::Value;
    use tempfile::{NamedTempFile, tempdir};
    use test_utils::{main_command, mock_server, received_contents, webhook_url};

    type Result<T> = std::result::Result<T, Box<dyn Error>>;

    /// A command which doesn't pick up a webhook from the environment
    fn command() -> Command {
        let mut cmd = main_command!();
        cmd.env_remove("HOOKLINE_WEBHOOK_URL")
            .env_remove("HOOKLINE_TOKEN")
            .env_remove("RUST_LOG");
        cmd
    }

    #[tokio::test]
    async fn test_send_messages_in_order() -> Result<()> {
        let mock_server = mock_server!(StatusCode::NO_CONTENT);

        command()
            .arg("--webhook-url")
            .arg(webhook_url!(mock_server).as_str())
            .arg("first")
            .arg("second")
            .arg("third")
            .assert()
            .success()
            .stdout(contains("Total..............3"))
            .stdout(contains("Delivered..........3"));

        assert_eq!(
            received_contents!(mock_server),
            vec!["first", "second", "third"]
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_webhook_url_from_env() -> Result<()> {
        let mock_server = mock_server!(StatusCode::NO_CONTENT);

        command()
            .env("HOOKLINE_WEBHOOK_URL", webhook_url!(mock_server).as_str())
            .arg("hello")
            .assert()
            .success();

        assert_eq!(received_contents!(mock_server), vec!["hello"]);
        Ok(())
    }

    #[tokio::test]
    async fn test_messages_from_stdin() -> Result<()> {
        let mock_server = mock_server!(StatusCode::NO_CONTENT);

        command()
            .arg("-w")
            .arg(webhook_url!(mock_server).as_str())
            .arg("-")
            .write_stdin("one\n\ntwo\n")
            .assert()
            .success();

        assert_eq!(received_contents!(mock_server), vec!["one", "two"]);
        Ok(())
    }

    #[tokio::test]
    async fn test_messages_from_file() -> Result<()> {
        let mock_server = mock_server!(StatusCode::NO_CONTENT);
        let mut file = NamedTempFile::new()?;
        writeln!(file, "from file")?;
        writeln!(file, "second line")?;

        command()
            .arg("-w")
            .arg(webhook_url!(mock_server).as_str())
            .arg("--file")
            .arg(file.path())
            .arg("from args")
            .assert()
            .success();

        assert_eq!(
            received_contents!(mock_server),
            vec!["from args", "from file", "second line"]
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_rejected_message_fails() -> Result<()> {
        let mock_server = mock_server!(StatusCode::BAD_REQUEST, set_body_string("nope"));

        command()
            .arg("-w")
            .arg(webhook_url!(mock_server).as_str())
            .arg("hello")
            .assert()
            .failure()
            .code(2)
            .stdout(contains("Failed.............1"))
            .stdout(contains("[1] hello | Request returned failure 400: nope"));
        Ok(())
    }

    #[tokio::test]
    async fn test_json_output() -> Result<()> {
        let mock_server = mock_server!(StatusCode::NO_CONTENT);

        let output = command()
            .arg("-w")
            .arg(webhook_url!(mock_server).as_str())
            .arg("--format")
            .arg("json")
            .arg("hello")
            .output()?;
        assert!(output.status.success());

        let report: Value = serde_json::from_slice(&output.stdout)?;
        assert_eq!(report["total"], 1);
        assert_eq!(report["delivered"], 1);
        assert_eq!(report["failed"], 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_config_file() -> Result<()> {
        let mock_server = mock_server!(StatusCode::NO_CONTENT);
        let dir = tempdir()?;
        let config = dir.path().join("hookline.toml");
        fs::write(
            &config,
            format!(
                "webhook_url = \"{}\"\nformat = \"json\"\n",
                webhook_url!(mock_server)
            ),
        )?;

        let output = command()
            .arg("--config")
            .arg(&config)
            .arg("from config")
            .output()?;
        assert!(output.status.success());

        let report: Value = serde_json::from_slice(&output.stdout)?;
        assert_eq!(report["delivered"], 1);
        assert_eq!(received_contents!(mock_server), vec!["from config"]);
        Ok(())
    }

    #[tokio::test]
    async fn test_config_file_sets_verbosity() -> Result<()> {
        let mock_server = mock_server!(StatusCode::NO_CONTENT);
        let dir = tempdir()?;
        let config = dir.path().join("hookline.toml");
        fs::write(
            &config,
            format!(
                "webhook_url = \"{}\"\nverbose = \"info\"\n",
                webhook_url!(mock_server)
            ),
        )?;

        command()
            .arg("--config")
            .arg(&config)
            .arg("hello")
            .assert()
            .success()
            .stderr(contains("[INFO] Sending 1 message(s)"));
        Ok(())
    }

    #[tokio::test]
    async fn test_failure_is_logged_once() -> Result<()> {
        let mock_server = mock_server!(StatusCode::BAD_REQUEST, set_body_string("nope"));

        let output = command()
            .arg("-w")
            .arg(webhook_url!(mock_server).as_str())
            .arg("-vv")
            .arg("hello")
            .output()?;
        assert_eq!(output.status.code(), Some(2));

        let stderr = String::from_utf8(output.stderr)?;
        let errors: Vec<&str> = stderr
            .lines()
            .filter(|line| line.starts_with("[ERROR]"))
            .collect();
        assert_eq!(
            errors,
            vec!["[ERROR] Failed to deliver message 1: Request returned failure 400: nope"]
        );
        Ok(())
    }

    #[test]
    fn test_invalid_config_file() -> Result<()> {
        let dir = tempdir()?;
        let config = dir.path().join("hookline.toml");
        fs::write(&config, "no_such_key = true\n")?;

        command()
            .arg("--config")
            .arg(&config)
            .arg("hello")
            .assert()
            .failure()
            .code(3)
            .stderr(contains("Cannot load configuration file"));
        Ok(())
    }

    #[test]
    fn test_missing_webhook() {
        command()
            .arg("hello")
            .assert()
            .failure()
            .code(3)
            .stderr(contains("No webhook given"));
    }

    #[test]
    fn test_id_without_token() {
        command()
            .arg("--id")
            .arg("1234")
            .arg("hello")
            .assert()
            .failure()
            .code(3)
            .stderr(contains("`--id` requires `--token`"));
    }

    #[tokio::test]
    async fn test_no_messages() -> Result<()> {
        let mock_server = mock_server!(StatusCode::NO_CONTENT);

        command()
            .arg("-w")
            .arg(webhook_url!(mock_server).as_str())
            .assert()
            .failure()
            .code(1)
            .stderr(contains("No messages given"));

        assert!(received_contents!(mock_server).is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_custom_header_is_sent() -> Result<()> {
        let mock_server = mock_server!(StatusCode::NO_CONTENT);

        command()
            .arg("-w")
            .arg(webhook_url!(mock_server).as_str())
            .arg("-H")
            .arg("X-Proxy-Auth: secret")
            .arg("hello")
            .assert()
            .success();

        let requests = mock_server
            .received_requests()
            .await
            .expect("Request recording is enabled");
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].headers["x-proxy-auth"], "secret");
        Ok(())
    }
}
