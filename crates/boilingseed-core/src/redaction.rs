use serde::{Deserialize, Serialize};

const SENSITIVE_PARAMS: &[&str] = &["password", "pass", "token", "api_key", "apikey"];

/// Connection metadata with secrets redacted, safe to write into run artifacts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RedactedConnection {
    pub engine: Option<String>,
    pub user: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub database: Option<String>,
    pub redacted: String,
}

/// Redact the password and sensitive query parameters of a connection URL.
pub fn redact_connection_string(conn: &str) -> RedactedConnection {
    let Some((scheme, rest)) = conn.split_once("://") else {
        return RedactedConnection {
            engine: None,
            user: None,
            host: None,
            port: None,
            database: None,
            redacted: redact_query(conn),
        };
    };

    let (location, query) = match rest.split_once('?') {
        Some((location, query)) => (location, Some(query)),
        None => (rest, None),
    };
    let (authority, path) = location.split_once('/').unwrap_or((location, ""));
    let (credentials, host_port) = match authority.rsplit_once('@') {
        Some((credentials, host_port)) => (Some(credentials), host_port),
        None => (None, authority),
    };

    let user = credentials.map(|value| value.split(':').next().unwrap_or(value).to_string());
    let masked_credentials = credentials.map(|value| match value.split_once(':') {
        Some((user, _)) => format!("{user}:***"),
        None => value.to_string(),
    });

    let (host, port) = match host_port.rsplit_once(':') {
        Some((host, port)) => (host.to_string(), port.parse::<u16>().ok()),
        None => (host_port.to_string(), None),
    };

    let mut redacted = format!("{scheme}://");
    if let Some(credentials) = masked_credentials {
        redacted.push_str(&credentials);
        redacted.push('@');
    }
    redacted.push_str(host_port);
    if location.contains('/') {
        redacted.push('/');
        redacted.push_str(path);
    }
    if let Some(query) = query {
        redacted.push('?');
        redacted.push_str(&redact_pairs(query));
    }

    RedactedConnection {
        engine: Some(scheme.to_string()),
        user,
        host: (!host.is_empty()).then_some(host),
        port,
        database: (!path.is_empty()).then(|| path.to_string()),
        redacted,
    }
}

fn redact_query(conn: &str) -> String {
    match conn.split_once('?') {
        Some((base, query)) => format!("{base}?{}", redact_pairs(query)),
        None => conn.to_string(),
    }
}

fn redact_pairs(query: &str) -> String {
    query
        .split('&')
        .map(|pair| match pair.split_once('=') {
            Some((key, _)) if SENSITIVE_PARAMS.contains(&key.to_lowercase().as_str()) => {
                format!("{key}=***")
            }
            _ => pair.to_string(),
        })
        .collect::<Vec<_>>()
        .join("&")
}
