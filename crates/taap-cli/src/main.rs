//! `TaaP` CLI - send one request through the API client.
//!
//! This is the entry point for the `taap` binary. The response envelope is
//! printed to stdout as JSON; logs go to stderr.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Context};
use clap::Parser;
use taap_client::{BlockingApiClient, HeaderName, HeaderValue, Method, RequestOptions};
use taap_core::Config;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::EnvFilter;

/// `TaaP` CLI - send a request to the configured API.
#[derive(Parser, Debug)]
#[command(name = "taap")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file (YAML, TOML, or JSON).
    #[arg(long, env = "TAAP_CONFIG")]
    config: Option<PathBuf>,

    /// Override `api.base_url`.
    #[arg(long)]
    base_url: Option<String>,

    /// Override `api.retries`.
    #[arg(long)]
    retries: Option<u32>,

    /// Override `api.timeout`, in seconds.
    #[arg(long)]
    timeout: Option<u64>,

    /// JSON request body.
    #[arg(short, long)]
    data: Option<String>,

    /// Extra header as `Name: value`. May be repeated.
    #[arg(short = 'H', long = "header")]
    headers: Vec<String>,

    /// Query parameter as `key=value`. May be repeated.
    #[arg(short, long)]
    query: Vec<String>,

    /// Open a fresh connection for every attempt.
    #[arg(long, default_value = "false")]
    oneshot: bool,

    /// Enable debug logging.
    #[arg(long, default_value = "false")]
    debug: bool,

    /// HTTP method.
    method: String,

    /// Request path, relative to the base URL.
    path: String,
}

fn main() -> anyhow::Result<ExitCode> {
    let args = Args::parse();

    let config = load_config(&args, std::io::stderr)?;

    let default_filter = if args.debug {
        DEBUG_FILTER.to_string()
    } else {
        config.monitoring.log_filter()
    };
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(default_filter))
        .with_writer(std::io::stderr)
        .init();

    config.validate().context("invalid configuration")?;

    let method = parse_method(&args.method)?;
    let options = build_options(args.data.as_deref(), &args.headers, &args.query)?;

    let client = if args.oneshot {
        BlockingApiClient::from_client(taap_client::ApiClient::oneshot(config.api)?)?
    } else {
        BlockingApiClient::new(config.api)?
    };

    tracing::debug!(%method, path = %args.path, "Sending request");
    let resp = client.execute(method, &args.path, options);

    println!("{}", serde_json::to_string_pretty(&resp)?);

    Ok(if resp.success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

const DEBUG_FILTER: &str = "taap_client=debug,taap_cli=debug,warn";

fn env_filter(default: String) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into())
}

/// Load the configuration and apply command-line overrides.
///
/// The log level lives in the configuration itself, so loading runs under a
/// temporary subscriber that reports warnings (a missing file, for one) to
/// `make_writer`.
fn load_config<W>(args: &Args, make_writer: W) -> anyhow::Result<Config>
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let bootstrap = tracing_subscriber::fmt()
        .with_env_filter(env_filter(if args.debug {
            DEBUG_FILTER.to_string()
        } else {
            "warn".to_string()
        }))
        .with_writer(make_writer)
        .finish();

    let mut config = tracing::subscriber::with_default(bootstrap, || {
        Config::load(args.config.as_deref())
    })
    .context("failed to load configuration")?;

    if let Some(base_url) = &args.base_url {
        config.api.base_url.clone_from(base_url);
    }
    if let Some(retries) = args.retries {
        config.api.retries = retries;
    }
    if let Some(timeout) = args.timeout {
        config.api.timeout = timeout;
    }

    Ok(config)
}

fn parse_method(raw: &str) -> anyhow::Result<Method> {
    Method::from_bytes(raw.to_ascii_uppercase().as_bytes())
        .with_context(|| format!("invalid HTTP method: {raw}"))
}

fn parse_header(raw: &str) -> anyhow::Result<(HeaderName, HeaderValue)> {
    let Some((name, value)) = raw.split_once(':') else {
        bail!("header must be `Name: value`, got `{raw}`");
    };
    let name = HeaderName::from_bytes(name.trim().as_bytes())
        .with_context(|| format!("invalid header name in `{raw}`"))?;
    let value = HeaderValue::from_str(value.trim())
        .with_context(|| format!("invalid header value in `{raw}`"))?;
    Ok((name, value))
}

fn parse_query(raw: &str) -> anyhow::Result<(String, String)> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => bail!("query parameter must be `key=value`, got `{raw}`"),
    }
}

fn build_options(
    data: Option<&str>,
    headers: &[String],
    query: &[String],
) -> anyhow::Result<RequestOptions> {
    let mut options = RequestOptions::new();

    if let Some(data) = data {
        let body = serde_json::from_str(data).context("--data is not valid JSON")?;
        options = options.json(body);
    }
    for raw in headers {
        let (name, value) = parse_header(raw)?;
        options = options.header(name, value);
    }
    for raw in query {
        let (key, value) = parse_query(raw)?;
        options = options.query(key, value);
    }

    Ok(options)
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::sync::{Arc, Mutex};

    use super::*;

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl Captured {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'w> MakeWriter<'w> for Captured {
        type Writer = Self;

        fn make_writer(&'w self) -> Self::Writer {
            self.clone()
        }
    }

    #[test]
    fn missing_config_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.yaml");
        let args = Args::try_parse_from([
            "taap",
            "--config",
            missing.to_str().unwrap(),
            "get",
            "/health",
        ])
        .unwrap();

        let logs = Captured::default();
        assert!(load_config(&args, logs.clone()).is_ok());
        assert!(logs.contents().contains("Configuration file not found"));
    }

    #[test]
    fn flag_overrides_apply_after_loading() {
        let args = Args::try_parse_from([
            "taap",
            "--base-url",
            "http://override:9000",
            "--retries",
            "0",
            "--timeout",
            "5",
            "get",
            "/",
        ])
        .unwrap();

        let config = load_config(&args, io::sink).unwrap();

        assert_eq!(config.api.base_url, "http://override:9000");
        assert_eq!(config.api.retries, 0);
        assert_eq!(config.api.timeout, 5);
    }

    #[test]
    fn methods_are_case_insensitive() {
        assert_eq!(parse_method("get").unwrap(), Method::GET);
        assert_eq!(parse_method("Patch").unwrap(), Method::PATCH);
        assert!(parse_method("NOT A METHOD").is_err());
    }

    #[test]
    fn header_parsing() {
        let (name, value) = parse_header("X-Trace-Id:  abc ").unwrap();
        assert_eq!(name.as_str(), "x-trace-id");
        assert_eq!(value, "abc");

        assert!(parse_header("no-colon").is_err());
        assert!(parse_header("bad name: v").is_err());
    }

    #[test]
    fn query_parsing() {
        assert_eq!(
            parse_query("page=2").unwrap(),
            ("page".to_string(), "2".to_string())
        );
        assert_eq!(
            parse_query("filter=a=b").unwrap(),
            ("filter".to_string(), "a=b".to_string())
        );
        assert!(parse_query("=x").is_err());
        assert!(parse_query("flag").is_err());
    }

    #[test]
    fn options_from_arguments() {
        let options = build_options(
            Some(r#"{"name": "ada"}"#),
            &["Authorization: Bearer other".to_string()],
            &["dry_run=true".to_string()],
        )
        .unwrap();

        assert_eq!(options.body, Some(serde_json::json!({"name": "ada"})));
        assert_eq!(options.headers["authorization"], "Bearer other");
        assert_eq!(options.query, vec![("dry_run".to_string(), "true".to_string())]);

        assert!(build_options(Some("{not json"), &[], &[]).is_err());
    }

    #[test]
    fn args_parse() {
        let args = Args::try_parse_from([
            "taap", "-H", "A: b", "-q", "k=v", "--oneshot", "post", "/users",
        ])
        .unwrap();
        assert_eq!(args.method, "post");
        assert_eq!(args.path, "/users");
        assert!(args.oneshot);
        assert_eq!(args.headers, vec!["A: b"]);
    }
}
