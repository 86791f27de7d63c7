use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

/// Normalized result of one successful lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct GeoData {
    pub country: Option<String>,
    pub country_code: Option<String>,
    pub region_name: Option<String>,
    pub city: Option<String>,
    pub isp: Option<String>,
    pub org: Option<String>,
    pub as_name: Option<String>,
    pub query: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// Full provider payload, archived verbatim.
    pub raw: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Transport trouble: timeouts, refused connections, broken bodies.
    Transient,
    /// The provider answered but refused the query, or answered with garbage.
    Logical,
}

#[derive(Debug, thiserror::Error)]
pub enum LookupFailure {
    #[error("lookup timed out")]
    Timeout,
    #[error("network error: {0}")]
    Network(String),
    #[error("provider returned HTTP {0}")]
    HttpStatus(u16),
    #[error("provider rejected query: {message}")]
    Rejected { message: String },
    #[error("malformed provider response: {0}")]
    Malformed(String),
}

impl LookupFailure {
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Timeout | Self::Network(_) => FailureKind::Transient,
            Self::HttpStatus(_) | Self::Rejected { .. } | Self::Malformed(_) => FailureKind::Logical,
        }
    }
}

impl From<reqwest::Error> for LookupFailure {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_decode() {
            Self::Malformed(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}

/// Resolves one IP address to a location. Implementations issue at most one external
/// call per invocation and never cache.
#[async_trait]
pub trait GeoLookup: Send + Sync {
    async fn lookup(&self, ip: &str) -> Result<GeoData, LookupFailure>;
}

/// ip-api.com style provider.
#[derive(Debug, Clone)]
pub struct IpApiClient {
    http: reqwest::Client,
    url_template: String,
}

impl IpApiClient {
    pub fn new(url_template: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("geowatch/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;
        Ok(Self {
            http,
            url_template: url_template.into(),
        })
    }

    pub fn url_for(&self, ip: &str) -> String {
        self.url_template.replace("{ip}", ip.trim())
    }
}

#[async_trait]
impl GeoLookup for IpApiClient {
    async fn lookup(&self, ip: &str) -> Result<GeoData, LookupFailure> {
        let resp = self.http.get(self.url_for(ip)).send().await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(LookupFailure::HttpStatus(status.as_u16()));
        }

        let body = resp.json::<Value>().await?;
        interpret_response(body)
    }
}

#[derive(Debug, Deserialize)]
struct IpApiResponse {
    status: Option<String>,
    message: Option<String>,
    country: Option<String>,
    #[serde(rename = "countryCode")]
    country_code: Option<String>,
    #[serde(rename = "regionName")]
    region_name: Option<String>,
    city: Option<String>,
    lat: Option<f64>,
    lon: Option<f64>,
    isp: Option<String>,
    org: Option<String>,
    #[serde(rename = "as")]
    as_name: Option<String>,
    query: Option<String>,
}

/// Applies the provider's `status` gate to a decoded payload.
pub fn interpret_response(raw: Value) -> Result<GeoData, LookupFailure> {
    if !raw.is_object() {
        return Err(LookupFailure::Malformed(format!(
            "expected a JSON object, got {raw}"
        )));
    }

    let parsed: IpApiResponse = serde_json::from_value(raw.clone())
        .map_err(|e| LookupFailure::Malformed(e.to_string()))?;

    match parsed.status.as_deref() {
        Some("success") => {}
        Some(_) => {
            return Err(LookupFailure::Rejected {
                message: parsed.message.unwrap_or_else(|| "unknown".to_string()),
            });
        }
        None => return Err(LookupFailure::Malformed("missing status field".to_string())),
    }

    Ok(GeoData {
        country: parsed.country,
        country_code: parsed.country_code,
        region_name: parsed.region_name,
        city: parsed.city,
        isp: parsed.isp,
        org: parsed.org,
        as_name: parsed.as_name,
        query: parsed.query,
        latitude: parsed.lat,
        longitude: parsed.lon,
        raw,
    })
}
