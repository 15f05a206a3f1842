//! # Client — Marketplace Backend REST Client
//!
//! All durable logic (search, AI generation, persistence, auth, rate
//! limiting) lives behind this boundary; the client treats each endpoint as
//! an opaque request/response contract and preserves the exact wire shapes.
//!
//! | Method | Path | Purpose |
//! |--------|------|---------|
//! | POST | `/search` | Keyword search with type and price filters |
//! | POST | `/search_with_id` | Batch ID-range scan (up to 20 projects) |
//! | POST | `/search_single_project` | Exact single-ID lookup |
//! | POST | `/generate`, `/generate_graphics` | AI proposal text |
//! | POST | `/place_bid` | Submit one bid (409 = duplicate, 429 = rate limit) |
//! | GET | `/api/bids/tracker` | Tracker snapshot for a (year, month, viewer) |
//! | POST | `/api/bids/update-status` | Persist one bid's status |
//! | POST | `/api/users/login` | Credential exchange for a bearer token |
//!
//! The agent is configured with `http_status_as_error(false)` so non-2xx
//! replies come back as responses, not errors — batch-scan error bodies
//! carry `last_checked_id`, which the scan controller needs to keep the
//! cursor moving past gaps of missing IDs.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::error::{ApiError, ScanFailure};
use crate::scan::Direction;
use crate::tracker::{BidStatus, TrackerSnapshot};

/// One marketplace project as returned by the search endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub preview_description: Option<String>,
    #[serde(default)]
    pub seo_url: Option<String>,
    #[serde(default)]
    pub bid_stats: Option<BidStats>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BidStats {
    #[serde(default)]
    pub bid_count: Option<u32>,
    #[serde(default)]
    pub bid_avg: Option<f64>,
}

impl Project {
    /// Public marketplace URL, preferring the SEO path when present.
    pub fn url(&self) -> String {
        match &self.seo_url {
            Some(seo) => {
                let clean = seo.strip_prefix('/').unwrap_or(seo);
                format!("https://www.freelancer.com/projects/{clean}/details")
            }
            None => format!("https://www.freelancer.com/projects/{}", self.id),
        }
    }

    /// Suggested bid amount: the average bid rounded to the nearest 10.
    pub fn suggested_amount(&self) -> Option<f64> {
        let avg = self.bid_stats.as_ref()?.bid_avg?;
        Some((avg / 10.0).round() * 10.0)
    }
}

/// Keyword search request. The price field names are part of the wire
/// contract and intentionally stay camelCase.
#[derive(Debug, Clone, Serialize)]
pub struct SearchQuery {
    pub query: String,
    pub project_type: String,
    #[serde(rename = "minPrice")]
    pub min_price: Option<i64>,
    #[serde(rename = "maxPrice")]
    pub max_price: Option<i64>,
    #[serde(rename = "minHourly")]
    pub min_hourly: Option<i64>,
    #[serde(rename = "maxHourly")]
    pub max_hourly: Option<i64>,
    pub limit: u32,
}

/// Successful reply from `POST /search_with_id`.
#[derive(Debug, Clone, Deserialize)]
pub struct IdScanOutcome {
    #[serde(default)]
    pub projects: Vec<Project>,
    pub start_id: u64,
    pub end_id: u64,
    pub last_checked_id: u64,
    pub total_found: u32,
    #[serde(default)]
    pub checked_ids: Vec<u64>,
    #[serde(default)]
    pub direction: Direction,
}

/// Error body shared by the search endpoints.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    checked_ids: Vec<u64>,
    #[serde(default)]
    last_checked_id: Option<u64>,
}

#[derive(Serialize)]
struct IdScanRequest {
    start_id: u64,
    direction: Direction,
}

#[derive(Serialize)]
struct SingleProjectRequest {
    project_id: u64,
}

#[derive(Deserialize)]
struct SingleProjectResponse {
    project: Project,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    project: &'a Project,
    #[serde(rename = "userDetails")]
    user_details: &'a serde_json::Value,
}

#[derive(Deserialize)]
struct GenerateResponse {
    bid: String,
}

/// Bid submission to `POST /place_bid`.
#[derive(Debug, Clone, Serialize)]
pub struct PlaceBidRequest {
    pub project_id: u64,
    pub bid: String,
    pub amount: f64,
    pub period: u32,
    pub project_title: String,
    pub project_url: String,
    pub user_id: String,
    pub user_email: String,
    pub role: String,
    pub profile_id: String,
    pub profile_name: String,
}

#[derive(Debug, Deserialize)]
pub struct PlaceBidResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Serialize)]
struct UpdateStatusRequest<'a> {
    bid_id: &'a str,
    bid_status: BidStatus,
}

#[derive(Deserialize)]
struct UpdateStatusResponse {
    #[serde(default)]
    success: bool,
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct LoginResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub error: Option<String>,
}

/// REST client for the marketplace backend. A bearer token is attached to
/// every request once set.
pub struct MarketClient {
    agent: ureq::Agent,
    base_url: String,
    token: Option<String>,
}

impl MarketClient {
    pub fn new(base_url: &str) -> Self {
        let agent = ureq::Agent::new_with_config(
            ureq::config::Config::builder()
                .timeout_connect(Some(Duration::from_secs(5)))
                .timeout_send_request(Some(Duration::from_secs(10)))
                .http_status_as_error(false)
                .build(),
        );
        MarketClient {
            agent,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        let token = token.into();
        if !token.is_empty() {
            self.token = Some(token);
        }
        self
    }

    fn auth_header(&self) -> String {
        match &self.token {
            Some(token) => format!("Bearer {token}"),
            None => String::new(),
        }
    }

    fn post_json<B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<ureq::http::Response<ureq::Body>, ApiError> {
        let url = format!("{}{}", self.base_url, path);
        debug!(%url, "POST");
        self.agent
            .post(&url)
            .header("Authorization", &self.auth_header())
            .send_json(body)
            .map_err(|e| ApiError::Transport(e.to_string()))
    }

    fn get(&self, path_and_query: &str) -> Result<ureq::http::Response<ureq::Body>, ApiError> {
        let url = format!("{}{}", self.base_url, path_and_query);
        debug!(%url, "GET");
        self.agent
            .get(&url)
            .header("Authorization", &self.auth_header())
            .call()
            .map_err(|e| ApiError::Transport(e.to_string()))
    }

    // ── Project discovery ───────────────────────────────────────

    /// Keyword search with project-type and price filters.
    pub fn keyword_search(&self, query: &SearchQuery) -> Result<Vec<Project>, ApiError> {
        let mut resp = self.post_json("/search", query)?;
        if !resp.status().is_success() {
            return Err(read_api_error(&mut resp));
        }
        resp.body_mut()
            .read_json()
            .map_err(|e| ApiError::Transport(e.to_string()))
    }

    /// Batch ID-range scan. Failures carry the backend's cursor diagnostics
    /// so the scan controller can advance past the gap.
    pub fn scan_with_id(
        &self,
        start_id: u64,
        direction: Direction,
    ) -> Result<IdScanOutcome, ScanFailure> {
        let request = IdScanRequest {
            start_id,
            direction,
        };
        let mut resp = self.post_json("/search_with_id", &request)?;
        let status = resp.status().as_u16();
        if resp.status().is_success() {
            return resp
                .body_mut()
                .read_json()
                .map_err(|e| ScanFailure::new(ApiError::Transport(e.to_string())));
        }

        let retry_after = retry_after_secs(&resp);
        let body: ErrorBody = resp
            .body_mut()
            .read_json()
            .unwrap_or_default();
        let message = body
            .error
            .unwrap_or_else(|| "No projects found in this ID range".to_string());
        Err(ScanFailure {
            kind: classify_status(status, message, retry_after),
            last_checked_id: body.last_checked_id,
            checked_ids: body.checked_ids,
        })
    }

    /// Exact single-ID lookup.
    pub fn single_project(&self, project_id: u64) -> Result<Project, ApiError> {
        let mut resp = self.post_json("/search_single_project", &SingleProjectRequest { project_id })?;
        if !resp.status().is_success() {
            return Err(read_api_error(&mut resp));
        }
        let body: SingleProjectResponse = resp
            .body_mut()
            .read_json()
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        Ok(body.project)
    }

    // ── Proposals ───────────────────────────────────────────────

    /// Generate proposal text for a project via the AI backend. The
    /// graphics variant uses a prompt tuned for design work.
    pub fn generate_bid(
        &self,
        project: &Project,
        user_details: &serde_json::Value,
        graphics: bool,
    ) -> Result<String, ApiError> {
        let path = if graphics {
            "/generate_graphics"
        } else {
            "/generate"
        };
        let request = GenerateRequest {
            project,
            user_details,
        };
        let mut resp = self.post_json(path, &request)?;
        if !resp.status().is_success() {
            return Err(read_api_error(&mut resp));
        }
        let body: GenerateResponse = resp
            .body_mut()
            .read_json()
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        Ok(body.bid)
    }

    /// Submit one bid. 409 means the viewer already bid on this project;
    /// 429 carries a retry-after hint from the bid-placement backend.
    pub fn place_bid(&self, request: &PlaceBidRequest) -> Result<PlaceBidResponse, ApiError> {
        let mut resp = self.post_json("/place_bid", request)?;
        let status = resp.status().as_u16();
        if resp.status().is_success() {
            return resp
                .body_mut()
                .read_json()
                .map_err(|e| ApiError::Transport(e.to_string()));
        }
        if status == 409 {
            return Err(ApiError::Backend {
                status,
                message: "You have already bid on this project".to_string(),
            });
        }
        Err(read_api_error_from(status, &mut resp))
    }

    // ── Bid tracking ────────────────────────────────────────────

    /// Fetch the tracker snapshot for a period and viewer. The role claim
    /// decides which of the two shapes comes back.
    pub fn fetch_tracker(
        &self,
        year: i32,
        month: u32,
        user_id: &str,
        role: &str,
    ) -> Result<TrackerSnapshot, ApiError> {
        let mut query = url::form_urlencoded::Serializer::new(String::new());
        query
            .append_pair("year", &year.to_string())
            .append_pair("month", &month.to_string())
            .append_pair("user_id", user_id)
            .append_pair("role", role);
        let mut resp = self.get(&format!("/api/bids/tracker?{}", query.finish()))?;
        if !resp.status().is_success() {
            return Err(read_api_error(&mut resp));
        }
        resp.body_mut()
            .read_json()
            .map_err(|e| ApiError::Transport(e.to_string()))
    }

    /// Persist one bid's status. Returns the backend's `success` flag; the
    /// caller only reconciles local state when it is true.
    pub fn update_bid_status(&self, bid_id: &str, status: BidStatus) -> Result<bool, ApiError> {
        let request = UpdateStatusRequest {
            bid_id,
            bid_status: status,
        };
        let mut resp = self.post_json("/api/bids/update-status", &request)?;
        if !resp.status().is_success() {
            return Err(read_api_error(&mut resp));
        }
        let body: UpdateStatusResponse = resp
            .body_mut()
            .read_json()
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        Ok(body.success)
    }

    // ── Auth ────────────────────────────────────────────────────

    /// Exchange credentials for a bearer token.
    pub fn login(&self, email: &str, password: &str) -> Result<LoginResponse, ApiError> {
        let mut resp = self.post_json("/api/users/login", &LoginRequest { email, password })?;
        let status = resp.status().as_u16();
        if resp.status().is_success() {
            return resp
                .body_mut()
                .read_json()
                .map_err(|e| ApiError::Transport(e.to_string()));
        }
        if status == 401 || status == 400 {
            let body: LoginResponse = resp.body_mut().read_json().unwrap_or(LoginResponse {
                success: false,
                token: String::new(),
                error: None,
            });
            return Err(ApiError::Backend {
                status,
                message: body.error.unwrap_or_else(|| "Invalid credentials".to_string()),
            });
        }
        Err(read_api_error_from(status, &mut resp))
    }
}

/// Map an HTTP status plus error message to the failure taxonomy.
fn classify_status(status: u16, message: String, retry_after: Option<u64>) -> ApiError {
    match status {
        404 => ApiError::NotFound(message),
        429 => ApiError::RateLimited {
            retry_after_secs: retry_after,
        },
        _ => ApiError::Backend { status, message },
    }
}

fn retry_after_secs(resp: &ureq::http::Response<ureq::Body>) -> Option<u64> {
    resp.headers()
        .get("retry-after")?
        .to_str()
        .ok()?
        .parse()
        .ok()
}

fn read_api_error(resp: &mut ureq::http::Response<ureq::Body>) -> ApiError {
    let status = resp.status().as_u16();
    read_api_error_from(status, resp)
}

fn read_api_error_from(status: u16, resp: &mut ureq::http::Response<ureq::Body>) -> ApiError {
    let retry_after = retry_after_secs(resp);
    let body: ErrorBody = resp.body_mut().read_json().unwrap_or_default();
    let message = body
        .error
        .unwrap_or_else(|| format!("request failed with status {status}"));
    classify_status(status, message, retry_after)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn project_url_prefers_seo_path() {
        let project = Project {
            id: 123,
            title: "Logo".into(),
            preview_description: None,
            seo_url: Some("/logo-design/cool-logo-123".into()),
            bid_stats: None,
        };
        assert_eq!(
            project.url(),
            "https://www.freelancer.com/projects/logo-design/cool-logo-123/details"
        );
    }

    #[test]
    fn project_url_falls_back_to_id() {
        let project = Project {
            id: 123,
            title: "Logo".into(),
            preview_description: None,
            seo_url: None,
            bid_stats: None,
        };
        assert_eq!(project.url(), "https://www.freelancer.com/projects/123");
    }

    #[test]
    fn suggested_amount_rounds_to_nearest_ten() {
        let project = Project {
            id: 1,
            title: "x".into(),
            preview_description: None,
            seo_url: None,
            bid_stats: Some(BidStats {
                bid_count: Some(12),
                bid_avg: Some(87.3),
            }),
        };
        assert_eq!(project.suggested_amount(), Some(90.0));
    }

    #[test]
    fn classify_maps_taxonomy() {
        assert!(matches!(
            classify_status(404, "missing".into(), None),
            ApiError::NotFound(_)
        ));
        assert!(matches!(
            classify_status(429, "slow down".into(), Some(30)),
            ApiError::RateLimited {
                retry_after_secs: Some(30)
            }
        ));
        assert!(matches!(
            classify_status(500, "boom".into(), None),
            ApiError::Backend { status: 500, .. }
        ));
    }

    #[test]
    fn search_query_serializes_wire_names() {
        let query = SearchQuery {
            query: "logo design".into(),
            project_type: "fixed".into(),
            min_price: Some(50),
            max_price: None,
            min_hourly: None,
            max_hourly: None,
            limit: 10,
        };
        let value = serde_json::to_value(&query).unwrap();
        assert_eq!(value["minPrice"], 50);
        assert_eq!(value["project_type"], "fixed");
        assert!(value["maxPrice"].is_null());
    }
}
