//! CLI argument parsing module
//!
//! This module handles command-line argument parsing and application entry point.

use std::collections::HashMap;
use std::io::{self, Write};

use clap::{Arg, ArgAction, ArgMatches, Command};
use reqwest::header::HeaderMap;
use reqwest::{StatusCode, Version};

use crate::error::{LazyreqError, Result};
use crate::exit_code::exit_code_for_error;
use crate::http::auth::Auth;
use crate::http::Request;
use crate::logging;
use crate::session::Session;
use crate::utils::{FileUtils, StringUtils, UrlUtils};

/// Main entry point for the CLI application
pub fn run() -> i32 {
    let matches = create_app().get_matches();
    logging::init(if matches.get_flag("verbose") { "info" } else { "warn" });

    match run_with_args(&matches) {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("lazyreq: error: {}", e);
            exit_code_for_error(&e)
        }
    }
}

/// Run lazyreq with parsed command line arguments
fn run_with_args(matches: &ArgMatches) -> Result<()> {
    let request = build_request_from_args(matches)?;
    let include = matches.get_flag("include");

    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| LazyreqError::Config(format!("Failed to create async runtime: {}", e)))?;

    rt.block_on(async {
        let mut out = Vec::new();
        if include {
            let head = request.response_head().await?;
            out.extend_from_slice(
                format_response_headers(head.version, head.status, &head.headers).as_bytes(),
            );
        }
        out.extend_from_slice(&request.bytes().await?);

        let mut stdout = io::stdout().lock();
        stdout.write_all(&out)?;
        stdout.flush()?;
        Ok(())
    })
}

/// Create the CLI application structure
pub fn create_app() -> Command {
    Command::new("lazyreq")
        .version(crate::VERSION)
        .about("Send one HTTP request and print the response")
        .arg(Arg::new("url")
            .help("The URL to request")
            .required(true)
            .index(1))
        .arg(Arg::new("request")
            .short('X')
            .long("request")
            .value_name("METHOD")
            .help("HTTP request method")
            .default_value("GET"))
        .arg(Arg::new("header")
            .short('H')
            .long("header")
            .value_name("HEADER")
            .help("Add custom HTTP header")
            .action(ArgAction::Append))
        .arg(Arg::new("query")
            .short('q')
            .long("query")
            .value_name("KEY=VALUE")
            .help("Append a query parameter")
            .action(ArgAction::Append))
        .arg(Arg::new("data")
            .short('d')
            .long("data")
            .value_name("DATA")
            .help("Raw request body")
            .conflicts_with_all(["json", "form"]))
        .arg(Arg::new("json")
            .long("json")
            .value_name("JSON")
            .help("JSON request body")
            .conflicts_with("form"))
        .arg(Arg::new("form")
            .long("form")
            .value_name("KEY=VALUE")
            .help("URL-encoded form field")
            .action(ArgAction::Append))
        .arg(Arg::new("user")
            .short('u')
            .long("user")
            .value_name("USER[:PASSWORD]")
            .help("HTTP basic authentication"))
        .arg(Arg::new("insecure")
            .short('k')
            .long("insecure")
            .help("Allow insecure SSL connections")
            .action(ArgAction::SetTrue))
        .arg(Arg::new("no-redirect")
            .long("no-redirect")
            .help("Do not follow redirects")
            .action(ArgAction::SetTrue))
        .arg(Arg::new("max-time")
            .short('m')
            .long("max-time")
            .value_name("DURATION")
            .help("Maximum time for the request (e.g. 500ms, 10s, 2m)"))
        .arg(Arg::new("session")
            .long("session")
            .value_name("FILE")
            .env("LAZYREQ_SESSION")
            .help("Persist cookies in FILE across invocations"))
        .arg(Arg::new("include")
            .short('i')
            .long("include")
            .help("Include the status line and response headers")
            .action(ArgAction::SetTrue))
        .arg(Arg::new("verbose")
            .short('v')
            .long("verbose")
            .help("Log the request and response")
            .action(ArgAction::SetTrue))
}

/// Build a request from command line arguments
pub fn build_request_from_args(matches: &ArgMatches) -> Result<Request> {
    let url = matches
        .get_one::<String>("url")
        .map(|url| UrlUtils::validate_url(url))
        .transpose()?
        .ok_or_else(|| LazyreqError::Config("URL is required".to_string()))?;
    let method = matches
        .get_one::<String>("request")
        .map(|m| m.to_uppercase())
        .unwrap_or_else(|| "GET".to_string());

    let mut request = match matches.get_one::<String>("session") {
        Some(file) => {
            let path = FileUtils::expand_path(file)?;
            Session::get_or_create(path, Vec::new()).new_request(method, url.as_str(), &[])
        }
        None => Request::new(method, url.as_str()),
    };

    if let Some(headers) = matches.get_many::<String>("header") {
        for header in headers {
            let (key, value) = StringUtils::parse_header(header)?;
            request = request.with_header(&key, &value);
        }
    }

    if let Some(pairs) = matches.get_many::<String>("query") {
        for pair in pairs {
            let (key, value) = StringUtils::parse_pair(pair)?;
            request = request.with_query(&key, &value);
        }
    }

    if let Some(data) = matches.get_one::<String>("data") {
        request = request.with_body(data.clone());
    }

    if let Some(json) = matches.get_one::<String>("json") {
        let value: serde_json::Value = serde_json::from_str(json)?;
        request = request.with_json(&value);
    }

    if let Some(fields) = matches.get_many::<String>("form") {
        let fields = fields
            .map(|field| StringUtils::parse_pair(field))
            .collect::<Result<HashMap<_, _>>>()?;
        request = request.with_form_urlencoded(&fields);
    }

    if let Some(user) = matches.get_one::<String>("user") {
        let (username, password) = Auth::parse_user_pass(user)?;
        request = request.with_basic_auth(&username, &password);
    }

    if let Some(max_time) = matches.get_one::<String>("max-time") {
        request = request.with_timeout(StringUtils::parse_timeout(max_time)?);
    }

    request = request
        .with_ignore_ssl(matches.get_flag("insecure"))
        .with_redirect(!matches.get_flag("no-redirect"));

    match request.error() {
        Some(err) => Err(err),
        None => Ok(request),
    }
}

pub(crate) fn http_version_label(version: Version) -> &'static str {
    const LABELS: [(Version, &str); 5] = [
        (Version::HTTP_09, "HTTP/0.9"),
        (Version::HTTP_10, "HTTP/1.0"),
        (Version::HTTP_11, "HTTP/1.1"),
        (Version::HTTP_2, "HTTP/2"),
        (Version::HTTP_3, "HTTP/3"),
    ];
    LABELS
        .iter()
        .find(|(known, _)| *known == version)
        .map(|(_, label)| *label)
        .unwrap_or("HTTP/?")
}

pub(crate) fn format_response_headers(
    version: Version,
    status: StatusCode,
    headers: &HeaderMap,
) -> String {
    let mut out = format!("{} {}\n", http_version_label(version), status);
    for (name, value) in headers {
        out.push_str(&format!(
            "{}: {}\n",
            name,
            value.to_str().unwrap_or("<non-utf8>")
        ));
    }
    out.push('\n');
    out
}
