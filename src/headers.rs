use anyhow::{Context, Result};
use http::{header, HeaderMap, StatusCode};
use reqwest::Url;
use tracing::{error, info, warn};

/// Paths probed after the target itself, resolved against it.
pub const STATIC_PATHS: [&str; 5] = ["/", "/index.html", "/favicon.svg", "/vite.svg", "/src/main.jsx"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Finding {
    Warning(String),
    Notice(String),
}

#[derive(Debug)]
pub struct Probe {
    pub url: Url,
    pub status: StatusCode,
    pub headers: HeaderMap,
}

fn is_textual(content_type: &str) -> bool {
    let lower = content_type.to_ascii_lowercase();
    ["text", "json", "javascript", "html"].iter().any(|t| lower.contains(t))
}

pub fn audit(headers: &HeaderMap) -> Vec<Finding> {
    let mut findings = Vec::new();

    match headers.get(header::CONTENT_TYPE).and_then(|v| v.to_str().ok()) {
        None => findings.push(Finding::Warning("missing Content-Type header".into())),
        Some(ct) if is_textual(ct) && !ct.to_ascii_lowercase().contains("charset=utf-8") => {
            findings.push(Finding::Warning("text content-type missing charset=utf-8".into()))
        }
        Some(_) => {}
    }
    if !headers.contains_key(header::CACHE_CONTROL) {
        findings.push(Finding::Warning("Cache-Control header missing".into()));
    }
    if !headers.contains_key(header::X_CONTENT_TYPE_OPTIONS) {
        findings.push(Finding::Warning("X-Content-Type-Options header missing".into()));
    }
    if headers.contains_key(header::EXPIRES) {
        findings.push(Finding::Notice(
            "Expires header present (prefer Cache-Control instead)".into(),
        ));
    }
    let cookies: Vec<&str> = headers
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .collect();
    if !cookies.is_empty() {
        findings.push(Finding::Notice(format!(
            "Set-Cookie header(s) present: {}",
            cookies.join(", ")
        )));
    }
    findings
}

async fn probe(client: &reqwest::Client, url: Url) -> Result<Probe> {
    let response = client
        .head(url.clone())
        .send()
        .await
        .with_context(|| format!("HEAD {} failed", url))?;
    Ok(Probe {
        url,
        status: response.status(),
        headers: response.headers().clone(),
    })
}

fn report(probe: &Probe) {
    println!("\nURL: {}", probe.url);
    println!(" status: {}", probe.status.as_u16());
    println!(" headers:");
    for (name, value) in &probe.headers {
        println!("   {}: {}", name, value.to_str().unwrap_or("<binary>"));
    }
    for finding in audit(&probe.headers) {
        match finding {
            Finding::Warning(msg) => warn!("{} -> WARNING: {}", probe.url, msg),
            Finding::Notice(msg) => info!("{} -> NOTICE: {}", probe.url, msg),
        }
    }
}

/// Probes `target` and the common static paths. Failures are reported, not returned.
pub async fn check(target: &str) -> Result<()> {
    info!("Checking headers for {}", target);
    let base = Url::parse(target).with_context(|| format!("Invalid URL: {}", target))?;
    let client = reqwest::Client::new();

    let first = match probe(&client, base.clone()).await {
        Ok(p) => p,
        Err(e) => {
            error!("Check failed: {:#}", e);
            return Ok(());
        }
    };
    let mut probes = vec![first];
    for path in STATIC_PATHS {
        let Ok(url) = base.join(path) else { continue };
        if let Ok(p) = probe(&client, url).await {
            probes.push(p);
        }
    }

    probes.iter().for_each(report);
    Ok(())
}
