use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use lookup_core::{FailureReason, LookupConfig, VehicleRecord};
use lookup_logging::{lookup_debug, lookup_warn};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE, COOKIE, ORIGIN, REFERER};
use reqwest::StatusCode;

use crate::decode::decode_page;
use crate::parse::parse_vehicle_page;

pub const DEFAULT_ENDPOINT: &str =
    "https://eservices.motortraffic.gov.lk/VehicleInfo/retrieveLimitedVehicleInformation.action";
const DEFAULT_ORIGIN: &str = "https://eservices.motortraffic.gov.lk";
const DEFAULT_REFERER: &str = "https://eservices.motortraffic.gov.lk/VehicleInfo/indexOauth.action";
const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Linux; Android 6.0; Nexus 5 Build/MRA58N) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/139.0.0.0 Mobile Safari/537.36";
const ACCEPT_HTML: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";

/// Path fragments of pages the service redirects to when the session is gone.
const LOGIN_PATH_MARKERS: &[&str] = &["indexoauth", "login"];

/// Identifier used by [`validate_session`]; it only has to be well formed.
pub const SESSION_PROBE_IDENTIFIER: &str = "AAA-0000";

#[derive(Debug, Clone)]
pub struct FetchSettings {
    pub endpoint: String,
    pub origin: String,
    pub referer: String,
    pub user_agent: String,
    pub connect_timeout: Duration,
    /// Upper bound for a single lookup, connect to last byte.
    pub request_timeout: Duration,
    pub redirect_limit: usize,
    /// The remote service has a history of broken certificate chains.
    pub accept_invalid_certs: bool,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            origin: DEFAULT_ORIGIN.to_string(),
            referer: DEFAULT_REFERER.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            redirect_limit: 5,
            accept_invalid_certs: true,
        }
    }
}

impl FetchSettings {
    pub fn with_endpoint(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Self::default()
        }
    }
}

/// Client construction failure. Per-lookup problems are [`FailureReason`]s.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("invalid endpoint {endpoint}: {message}")]
    InvalidEndpoint { endpoint: String, message: String },
    #[error("invalid header value for {name}")]
    InvalidHeader { name: &'static str },
    #[error("failed to build http client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Performs exactly one lookup attempt for one identifier. No retries.
#[async_trait::async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(
        &self,
        identifier: &str,
        config: &LookupConfig,
    ) -> Result<VehicleRecord, FailureReason>;
}

/// Produces a fresh fetcher for each job, so connection pools never outlive
/// the runtime that created them.
pub type FetcherFactory = Arc<dyn Fn() -> Result<Arc<dyn Fetcher>, FetchError> + Send + Sync>;

pub fn reqwest_factory(settings: FetchSettings) -> FetcherFactory {
    Arc::new(move || {
        let fetcher: Arc<dyn Fetcher> = Arc::new(ReqwestFetcher::new(settings.clone())?);
        Ok(fetcher)
    })
}

#[derive(Debug, Clone)]
pub struct ReqwestFetcher {
    settings: FetchSettings,
    endpoint: reqwest::Url,
    client: reqwest::Client,
}

impl ReqwestFetcher {
    pub fn new(settings: FetchSettings) -> Result<Self, FetchError> {
        let endpoint =
            reqwest::Url::parse(&settings.endpoint).map_err(|err| FetchError::InvalidEndpoint {
                endpoint: settings.endpoint.clone(),
                message: err.to_string(),
            })?;

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_HTML));
        headers.insert(ORIGIN, header_value("Origin", &settings.origin)?);
        headers.insert(REFERER, header_value("Referer", &settings.referer)?);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .user_agent(settings.user_agent.as_str())
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .redirect(reqwest::redirect::Policy::limited(settings.redirect_limit))
            .danger_accept_invalid_certs(settings.accept_invalid_certs)
            .build()?;

        Ok(Self {
            settings,
            endpoint,
            client,
        })
    }

    pub fn settings(&self) -> &FetchSettings {
        &self.settings
    }
}

#[async_trait::async_trait]
impl Fetcher for ReqwestFetcher {
    async fn fetch(
        &self,
        identifier: &str,
        config: &LookupConfig,
    ) -> Result<VehicleRecord, FailureReason> {
        let body = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("nicNumber", &config.fixed_identification_number)
            .append_pair("contactNumber", &config.fixed_contact_number)
            .append_pair("vehicleRegistrationNumber", identifier)
            .finish();
        let cookie = HeaderValue::from_str(&format!("JSESSIONID={}", config.session_credential))
            .map_err(|_| FailureReason::SessionInvalid)?;

        let response = self
            .client
            .post(self.endpoint.clone())
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .header(COOKIE, cookie)
            .body(body)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
            lookup_warn!("Session rejected for {}: HTTP {}", identifier, status.as_u16());
            return Err(FailureReason::SessionInvalid);
        }
        if is_login_redirect(response.url()) {
            lookup_warn!("Session rejected for {}: redirected to {}", identifier, response.url());
            return Err(FailureReason::SessionInvalid);
        }
        if !status.is_success() {
            return Err(FailureReason::network(format!("http status {}", status.as_u16())));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let bytes = response.bytes().await.map_err(map_reqwest_error)?;
        lookup_debug!("Received {} bytes for {}", bytes.len(), identifier);

        let page = decode_page(&bytes, content_type.as_deref())
            .map_err(|err| FailureReason::parse(err.to_string()))?;
        parse_vehicle_page(&page.html, identifier, Utc::now())
    }
}

/// Outcome of probing the remote service with a credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCheck {
    /// The service answered without rejecting the session.
    Accepted,
    Rejected,
    Unreachable(String),
}

/// Issues one lookup for [`SESSION_PROBE_IDENTIFIER`]. A not-found answer
/// still proves the credential works.
pub async fn validate_session(fetcher: &dyn Fetcher, config: &LookupConfig) -> SessionCheck {
    match fetcher.fetch(SESSION_PROBE_IDENTIFIER, config).await {
        Ok(_) | Err(FailureReason::NotFound) | Err(FailureReason::ParseError { .. }) => {
            SessionCheck::Accepted
        }
        Err(FailureReason::SessionInvalid) => SessionCheck::Rejected,
        Err(other) => SessionCheck::Unreachable(other.to_string()),
    }
}

fn header_value(name: &'static str, value: &str) -> Result<HeaderValue, FetchError> {
    HeaderValue::from_str(value).map_err(|_| FetchError::InvalidHeader { name })
}

fn is_login_redirect(url: &reqwest::Url) -> bool {
    let path = url.path().to_ascii_lowercase();
    LOGIN_PATH_MARKERS.iter().any(|marker| path.contains(marker))
}

fn map_reqwest_error(err: reqwest::Error) -> FailureReason {
    if err.is_timeout() {
        return FailureReason::network(format!("request timed out: {err}"));
    }
    if err.is_redirect() {
        return FailureReason::network(format!("redirect limit exceeded: {err}"));
    }
    FailureReason::network(err.to_string())
}
