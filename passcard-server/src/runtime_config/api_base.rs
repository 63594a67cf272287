//! Backend API base resolution
//!
//! Order: environment (`E_SCAN_API_BASE`, `API_BASE`, `API_BASE_MSSQL`), then
//! the config file's `API_BASE`, then the local fallback. Hosted SaaS
//! endpoints are never called directly; a candidate pointing at one is
//! replaced by the local fallback.

use reqwest::Url;

pub const LOCAL_FALLBACK: &str = "http://127.0.0.1:4000";

pub const ENV_VARS: [&str; 3] = ["E_SCAN_API_BASE", "API_BASE", "API_BASE_MSSQL"];

/// Host patterns; `*` matches exactly one label
const DENY_LIST: &[&str] = &[
    "ondemand.com",
    "hana.ondemand.com",
    "cfapps.*.hana.ondemand.com",
    "s4hana.cloud.sap",
    "cloud.sap",
];

/// Resolve using the process environment
pub fn resolve(file_value: Option<&str>) -> String {
    resolve_with(|name| std::env::var(name).ok(), file_value)
}

/// Resolve with an injectable environment lookup
pub fn resolve_with<F>(env: F, file_value: Option<&str>) -> String
where
    F: Fn(&str) -> Option<String>,
{
    let candidate = ENV_VARS
        .iter()
        .filter_map(|name| env(name))
        .chain(file_value.map(str::to_string))
        .map(|v| v.trim().to_string())
        .find(|v| !v.is_empty());

    let Some(candidate) = candidate else {
        return LOCAL_FALLBACK.to_string();
    };

    let with_scheme = if candidate.contains("://") {
        candidate
    } else {
        format!("http://{}", candidate)
    };

    match Url::parse(&with_scheme) {
        Ok(url) => {
            let host = url.host_str().unwrap_or_default().to_ascii_lowercase();
            if is_denied(&host) {
                tracing::warn!(host = %host, "API base points at a hosted endpoint, using local fallback");
                return LOCAL_FALLBACK.to_string();
            }
            with_scheme.trim_end_matches('/').to_string()
        }
        Err(e) => {
            tracing::warn!(value = %with_scheme, error = %e, "Unparsable API base, using local fallback");
            LOCAL_FALLBACK.to_string()
        }
    }
}

fn is_denied(host: &str) -> bool {
    DENY_LIST.iter().any(|pattern| host_matches(host, pattern))
}

/// Suffix match on whole labels
fn host_matches(host: &str, pattern: &str) -> bool {
    let host_labels: Vec<&str> = host.split('.').collect();
    let pattern_labels: Vec<&str> = pattern.split('.').collect();
    if host_labels.len() < pattern_labels.len() {
        return false;
    }
    host_labels
        .iter()
        .rev()
        .zip(pattern_labels.iter().rev())
        .all(|(h, p)| *p == "*" || h == p)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_fallback_when_nothing_set() {
        assert_eq!(resolve_with(env(&[]), None), LOCAL_FALLBACK);
        assert_eq!(resolve_with(env(&[("API_BASE", "  ")]), Some("")), LOCAL_FALLBACK);
    }

    #[test]
    fn test_env_order_then_file() {
        let e = env(&[("API_BASE_MSSQL", "http://mssql:1"), ("API_BASE", "http://api:2")]);
        assert_eq!(resolve_with(e, Some("http://file:3")), "http://api:2");

        let e = env(&[("E_SCAN_API_BASE", "http://scan:9/")]);
        assert_eq!(resolve_with(e, None), "http://scan:9");

        assert_eq!(resolve_with(env(&[]), Some("http://file:3")), "http://file:3");
    }

    #[test]
    fn test_missing_scheme_gets_http() {
        assert_eq!(
            resolve_with(env(&[]), Some("10.0.0.5:4000")),
            "http://10.0.0.5:4000"
        );
    }

    #[test]
    fn test_saas_hosts_rewritten() {
        for host in [
            "https://my.ondemand.com/api",
            "https://x.cfapps.eu10.hana.ondemand.com",
            "https://tenant.s4hana.cloud.sap",
            "https://CLOUD.SAP",
        ] {
            assert_eq!(resolve_with(env(&[]), Some(host)), LOCAL_FALLBACK, "{}", host);
        }
    }

    #[test]
    fn test_lookalike_hosts_allowed() {
        assert_eq!(
            resolve_with(env(&[]), Some("http://notondemand.com")),
            "http://notondemand.com"
        );
        assert_eq!(
            resolve_with(env(&[]), Some("http://cloud.sap.example.org")),
            "http://cloud.sap.example.org"
        );
    }

    #[test]
    fn test_host_matches_wildcard() {
        assert!(host_matches("cfapps.us10.hana.ondemand.com", "cfapps.*.hana.ondemand.com"));
        assert!(!host_matches("cfapps.hana.ondemand.com", "cfapps.*.hana.ondemand.com"));
    }
}
