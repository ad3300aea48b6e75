use crate::input::collect_messages;
use crate::verbosity::Verbosity;
use anyhow::{Context, Error, Result, anyhow, bail};
use clap::builder::PossibleValuesParser;
use clap::{Parser, builder::TypedValueParser};
use const_format::{concatcp, formatcp};
use hookline_lib::{DEFAULT_MAX_REDIRECTS, DEFAULT_USER_AGENT, WebhookTarget};
use http::{
    HeaderMap,
    header::{HeaderName, HeaderValue},
};
use secrecy::SecretString;
use serde::{Deserialize, Deserializer};
use std::collections::HashMap;
use std::path::Path;
use std::{fs, path::PathBuf, str::FromStr, time::Duration};
use strum::{Display, EnumIter, VariantNames};
use url::Url;

pub(crate) const HOOKLINE_CONFIG_FILE: &str = "hookline.toml";

// clap requires `&str` type values for defaults
// whereas serde expects owned `String` types
const MAX_REDIRECTS_STR: &str = concatcp!(DEFAULT_MAX_REDIRECTS);
// Shows the default config file while still telling apart whether the user
// passed one. A missing default file is not an error.
const HELP_MSG_CONFIG_FILE: &str = formatcp!(
    "Configuration file to use\n\n[default: {}]",
    HOOKLINE_CONFIG_FILE,
);

/// The format to use for the final delivery report
#[derive(Debug, Deserialize, Default, Clone, Display, EnumIter, VariantNames, PartialEq)]
#[non_exhaustive]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub(crate) enum StatsFormat {
    #[default]
    Compact,
    Json,
}

impl FromStr for StatsFormat {
    type Err = Error;

    fn from_str(format: &str) -> Result<Self, Self::Err> {
        match format.to_lowercase().as_str() {
            "compact" | "string" => Ok(StatsFormat::Compact),
            "json" => Ok(StatsFormat::Json),
            _ => Err(anyhow!("Unknown format {format}")),
        }
    }
}

// Macro for generating default functions to be used by serde
macro_rules! default_function {
    ( $( $name:ident : $T:ty = $e:expr; )* ) => {
        $(
            #[allow(clippy::missing_const_for_fn)]
            fn $name() -> $T {
                $e
            }
        )*
    };
}

default_function! {
    max_redirects: usize = DEFAULT_MAX_REDIRECTS;
    user_agent: String = DEFAULT_USER_AGENT.to_string();
    verbosity: Verbosity = Verbosity::default();
}

// Copy a value from the TOML config into the CLI config, unless the CLI
// already set it to something other than the default.
// The first block makes sure every field of the struct is listed.
macro_rules! fold_in {
    ($cli:ident , $toml:ident ; $ty:ident { $(..$ignore:ident,)* $( $key:ident : $default:expr, )* } ) => {
        if (false) {
            #[allow(dead_code, unused, clippy::diverging_sub_expression)]
            let _check_fold_in_exhaustivity = $ty {
                $($key: unreachable!(), )*
                $($ignore: unreachable!(), )*
            };
        };
        $(
            if $cli.$key == $default && $toml.$key != $default {
                $cli.$key = $toml.$key;
            }
        )*
    };
}

/// Parse a single header of the form `Name: Value`.
///
/// Name and value are trimmed. Everything after the first colon is the
/// value. The header itself never shows up in the error, it may carry a
/// secret.
fn parse_single_header(header: &str) -> Result<(HeaderName, HeaderValue)> {
    let parts: Vec<&str> = header.splitn(2, ':').collect();
    match parts.as_slice() {
        [name, value] => {
            let name = HeaderName::from_str(name.trim())
                .map_err(|e| anyhow!("Unable to convert header name: {e}"))?;
            let value = HeaderValue::from_str(value.trim())
                .map_err(|e| anyhow!("Unable to read value of header with name '{name}': {e}"))?;
            Ok((name, value))
        }
        _ => Err(anyhow!(
            "Invalid header format. Expected colon-separated string in the format 'HeaderName: HeaderValue'"
        )),
    }
}

/// Parses a single HTTP header into a tuple of (String, String)
#[derive(Clone, Debug)]
struct HeaderParser;

impl TypedValueParser for HeaderParser {
    type Value = (String, String);

    fn parse_ref(
        &self,
        _cmd: &clap::Command,
        _arg: Option<&clap::Arg>,
        value: &std::ffi::OsStr,
    ) -> Result<Self::Value, clap::Error> {
        let invalid = |message: String| {
            clap::Error::raw(clap::error::ErrorKind::InvalidValue, message)
        };
        let header_str = value
            .to_str()
            .ok_or_else(|| invalid("Header value contains invalid UTF-8".to_string()))?;

        let (name, value) = parse_single_header(header_str).map_err(|e| invalid(e.to_string()))?;
        let value = value
            .to_str()
            .map_err(|_| invalid("Header value contains invalid UTF-8".to_string()))?;
        Ok((name.to_string(), value.to_string()))
    }
}

/// Extension trait for converting a Vec of header pairs to a `HeaderMap`
pub(crate) trait HeaderMapExt {
    /// Convert a collection of header key-value pairs to a `HeaderMap`
    fn from_header_pairs(headers: &[(String, String)]) -> Result<HeaderMap, Error>;
}

impl HeaderMapExt for HeaderMap {
    fn from_header_pairs(headers: &[(String, String)]) -> Result<HeaderMap, Error> {
        let mut header_map = HeaderMap::new();
        for (name, value) in headers {
            let header_name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| anyhow!("Invalid header name '{name}': {e}"))?;
            let header_value = HeaderValue::from_str(value)
                .map_err(|e| anyhow!("Invalid header value for '{name}': {e}"))?;
            header_map.insert(header_name, header_value);
        }
        Ok(header_map)
    }
}

/// hookline sends messages to a webhook, one at a time and in order.
///
/// Rate limits announced by the webhook are obeyed: when they are exhausted
/// or the webhook answers `429 Too Many Requests`, sending pauses until the
/// webhook is ready again.
#[derive(Parser, Debug)]
#[command(version, about, next_display_order = None)]
pub(crate) struct HookOptions {
    /// Messages to send.
    #[arg(
        name = "messages",
        long_help = "Messages to send, in the given order.

Use `-` to read messages from standard input, one per line.
Messages from `--file` are sent after the ones given here."
    )]
    raw_messages: Vec<String>,

    /// Configuration file to use
    #[arg(short, long = "config")]
    #[arg(help = HELP_MSG_CONFIG_FILE)]
    pub(crate) config_file: Option<PathBuf>,

    #[clap(flatten)]
    pub(crate) config: Config,
}

impl HookOptions {
    /// All messages to send, in order
    pub(crate) fn messages(&self) -> Result<Vec<String>> {
        let messages = collect_messages(&self.raw_messages, &self.config.files, std::io::stdin())
            .context("Cannot read messages")?;
        if messages.is_empty() {
            bail!("No messages given. Pass them as arguments, via `--file` or on stdin (`-`)");
        }
        Ok(messages)
    }
}

// Custom deserializer function for the header field
fn deserialize_headers<'de, D>(deserializer: D) -> Result<Vec<(String, String)>, D::Error>
where
    D: Deserializer<'de>,
{
    let map = HashMap::<String, String>::deserialize(deserializer)?;
    Ok(map.into_iter().collect())
}

/// The main configuration for hookline
#[derive(Parser, Debug, Deserialize, Clone, Default)]
#[serde(deny_unknown_fields)]
pub(crate) struct Config {
    /// Verbose program output
    #[clap(flatten)]
    #[serde(default = "verbosity")]
    pub(crate) verbose: Verbosity,

    /// URL of the webhook
    #[arg(short, long, env = "HOOKLINE_WEBHOOK_URL", value_name = "URL")]
    #[serde(default)]
    pub(crate) webhook_url: Option<Url>,

    /// Id of the webhook, used together with `--token` instead of `--webhook-url`
    #[arg(long, value_name = "ID")]
    #[serde(default)]
    pub(crate) id: Option<u64>,

    /// Token of the webhook, used together with `--id`
    #[arg(long, env = "HOOKLINE_TOKEN", hide_env_values = true)]
    #[serde(default)]
    pub(crate) token: Option<SecretString>,

    /// Read messages from the given file, one per line (`-` for stdin)
    #[arg(short = 'F', long = "file", value_name = "PATH")]
    #[serde(default)]
    pub(crate) files: Vec<PathBuf>,

    /// Set custom header for requests
    #[arg(
        short = 'H',
        long,
        action = clap::ArgAction::Append,
        value_parser = HeaderParser,
        value_name = "HEADER:VALUE",
        long_help = "Set custom header for requests

Headers are given in the format 'Name: Value', e.g. 'X-Proxy-Auth: secret'.
Multiple headers can be specified by using the flag multiple times."
    )]
    #[serde(default)]
    #[serde(deserialize_with = "deserialize_headers")]
    pub(crate) header: Vec<(String, String)>,

    /// User agent
    #[arg(short, long, default_value = DEFAULT_USER_AGENT)]
    #[serde(default = "user_agent")]
    pub(crate) user_agent: String,

    /// Timeout per request, e.g. `10s` or `1m 30s`
    #[arg(short, long, value_parser = humantime::parse_duration)]
    #[serde(default, with = "humantime_serde")]
    pub(crate) timeout: Option<Duration>,

    /// Maximum number of allowed redirects
    #[arg(short, long, default_value = &MAX_REDIRECTS_STR)]
    #[serde(default = "max_redirects")]
    pub(crate) max_redirects: usize,

    /// Proceed for server connections considered insecure (invalid TLS)
    #[arg(short = 'k', long)]
    #[serde(default)]
    pub(crate) insecure: bool,

    /// Output format of final delivery report
    #[arg(short, long, default_value = "compact", value_parser = PossibleValuesParser::new(StatsFormat::VARIANTS).map(|s| s.parse::<StatsFormat>().unwrap()))]
    #[serde(default)]
    pub(crate) format: StatsFormat,
}

impl Config {
    /// Overwrites existing headers in `self` with the values from `other`.
    fn merge_headers(&mut self, other: &[(String, String)]) {
        let self_map = self.header.iter().cloned().collect::<HashMap<_, _>>();
        let other_map = other.iter().cloned().collect::<HashMap<_, _>>();
        let merged_map: HashMap<_, _> = self_map.into_iter().chain(other_map).collect();
        self.header = merged_map.into_iter().collect();
    }

    /// Load configuration from a file
    pub(crate) fn load_from_file(path: &Path) -> Result<Config> {
        let contents = fs::read_to_string(path)?;
        toml::from_str(&contents).with_context(|| "Failed to parse configuration file")
    }

    /// Merge the configuration from TOML into the CLI configuration
    pub(crate) fn merge(&mut self, toml: Config) {
        self.merge_headers(&toml.header);

        // SecretString doesn't implement Eq, so it can't go through fold_in!
        if self.token.is_none() && toml.token.is_some() {
            self.token = toml.token;
        }

        // NOTE: if you see an error within this macro call, check to make sure that
        // that the fields provided to fold_in! match all the fields of the Config struct.
        fold_in! {
            // Destination and source configs
            self, toml;

            Config {
                // Keys which are handled outside of fold_in
                ..header,
                ..token,

                // Keys with defaults to assign
                files: Vec::<PathBuf>::new(),
                format: StatsFormat::default(),
                id: None,
                insecure: false,
                max_redirects: DEFAULT_MAX_REDIRECTS,
                timeout: None,
                user_agent: DEFAULT_USER_AGENT,
                verbose: Verbosity::default(),
                webhook_url: None,
            }
        }
    }

    /// The webhook to send to, either given as URL or as id and token
    pub(crate) fn webhook_url(&self) -> Result<Url> {
        match (&self.webhook_url, self.id, &self.token) {
            (Some(url), _, _) => Ok(url.clone()),
            (None, Some(id), Some(token)) => WebhookTarget::new(id, token.clone())
                .url()
                .context("Cannot build webhook URL from id and token"),
            (None, Some(_), None) => bail!("`--id` requires `--token`"),
            (None, None, _) => bail!("No webhook given. Use `--webhook-url` or `--id` with `--token`"),
        }
    }
}
