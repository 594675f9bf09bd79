//! AbuseIPDB Client
//!
//! GET /api/v2/check with `Key` header; body `data.abuseConfidenceScore` (0-100).
//! Every response is validated before it leaves this file.

use std::net::IpAddr;

use async_trait::async_trait;

use super::types::{category_name, CheckResponse, ReputationError, ReputationReport};
use super::ReputationLookup;
use crate::logic::config::ReputationConfig;

pub struct AbuseIpDbClient {
    http: reqwest::Client,
    api_url: String,
    api_key: Option<String>,
    max_age_days: u32,
}

impl AbuseIpDbClient {
    pub fn new(config: &ReputationConfig) -> Result<Self, ReputationError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ReputationError::Network(e.to_string()))?;

        Ok(Self {
            http,
            api_url: config.api_url.clone(),
            api_key: config.api_key.clone(),
            max_age_days: config.max_age_days,
        })
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }
}

#[async_trait]
impl ReputationLookup for AbuseIpDbClient {
    async fn check(&self, ip: &str) -> Result<ReputationReport, ReputationError> {
        let api_key = self.api_key.as_deref().ok_or(ReputationError::NotConfigured)?;
        if ip.parse::<IpAddr>().is_err() {
            return Err(ReputationError::InvalidIdentity(ip.to_string()));
        }

        let max_age = self.max_age_days.to_string();
        let response = self
            .http
            .get(&self.api_url)
            .header("Key", api_key)
            .header("Accept", "application/json")
            .query(&[("ipAddress", ip), ("maxAgeInDays", max_age.as_str()), ("verbose", "")])
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ReputationError::Timeout
                } else {
                    ReputationError::Network(e.to_string())
                }
            })?;

        match response.status().as_u16() {
            200 => {}
            401 | 403 => return Err(ReputationError::InvalidApiKey),
            429 => {
                let retry_after = response
                    .headers()
                    .get("Retry-After")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(60);
                return Err(ReputationError::RateLimited { retry_after });
            }
            status => return Err(ReputationError::Network(format!("HTTP {}", status))),
        }

        let body = response
            .text()
            .await
            .map_err(|e| ReputationError::Network(e.to_string()))?;

        let report = parse_check_response(ip, &body)?;
        log::debug!("AbuseIPDB {} -> score {}", ip, report.score);
        Ok(report)
    }
}

/// Validate a /check body into a ReputationReport
pub fn parse_check_response(ip: &str, body: &str) -> Result<ReputationReport, ReputationError> {
    let parsed: CheckResponse =
        serde_json::from_str(body).map_err(|e| ReputationError::Malformed(e.to_string()))?;
    let data = parsed.data;

    let raw_score = data
        .abuse_confidence_score
        .ok_or_else(|| ReputationError::Malformed("missing abuseConfidenceScore".to_string()))?;
    let score = u8::try_from(raw_score)
        .ok()
        .filter(|s| *s <= 100)
        .ok_or_else(|| ReputationError::Malformed(format!("score out of range: {}", raw_score)))?;

    let mut categories: Vec<String> = Vec::new();
    for id in data.reports.iter().flat_map(|r| r.categories.iter()) {
        let name = category_name(*id);
        if !categories.contains(&name) {
            categories.push(name);
        }
    }

    Ok(ReputationReport {
        ip: data.ip_address.unwrap_or_else(|| ip.to_string()),
        score,
        total_reports: data.total_reports.unwrap_or(0),
        is_whitelisted: data.is_whitelisted.unwrap_or(false),
        country_code: data.country_code,
        isp: data.isp,
        last_reported_at: data.last_reported_at,
        categories,
    })
}
