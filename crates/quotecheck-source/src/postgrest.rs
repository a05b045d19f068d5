use crate::range::CreatedRange;
use crate::{decode_rows, DealSource, SourceError};
use quotecheck_core::{Deal, RawPhaseRecord};
use reqwest::blocking::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info};

pub const DEFAULT_PAGE_SIZE: usize = 1000;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

const CONFIG_PATH: &str = "/dashboard_config";
const PHASES_PATH: &str = "/teamleader_deal_phases";
const DEALS_PATH: &str = "/teamleader_deals";
const QUOTE_PHASE_COLUMN: &str = "sales_quotes_from_phase_id";
const GLOBAL_CONFIG_ROW_ID: &str = "1";
const DEAL_COLUMNS: &str =
    "id,created_at,title,status,phase_id,quote_phase_first_started_at,quote_phase_last_checked_at";

#[derive(Debug, Clone)]
pub struct PostgrestConfig {
    pub base_url: String,
    pub api_key: String,
    pub page_size: usize,
    pub timeout: Duration,
}

impl PostgrestConfig {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            page_size: DEFAULT_PAGE_SIZE,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Reads the mirrored CRM tables through a PostgREST endpoint.
pub struct PostgrestSource {
    client: Client,
    rest_base: String,
    api_key: String,
    page_size: usize,
}

impl PostgrestSource {
    pub fn new(config: PostgrestConfig) -> Result<Self, SourceError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|source| SourceError::Http {
                path: config.base_url.clone(),
                source,
            })?;
        Ok(Self {
            client,
            rest_base: rest_base(&config.base_url),
            api_key: config.api_key,
            page_size: config.page_size.max(1),
        })
    }

    fn fetch_page(
        &self,
        path: &str,
        params: &[(String, String)],
    ) -> Result<Vec<Value>, SourceError> {
        let url = format!("{}{}", self.rest_base, path);
        let response = self
            .client
            .get(&url)
            .query(params)
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .send()
            .map_err(|source| SourceError::Http {
                path: path.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(SourceError::Status {
                path: path.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        let body: Value = response.json().map_err(|source| SourceError::Http {
            path: path.to_string(),
            source,
        })?;
        page_rows(path, body)
    }

    fn paginate(
        &self,
        path: &str,
        params: Vec<(String, String)>,
    ) -> Result<Vec<Value>, SourceError> {
        paginate_with(path, &params, self.page_size, |page_params| {
            self.fetch_page(path, page_params)
        })
    }

    fn first_config_value(&self, filter: (&str, String)) -> Result<Option<String>, SourceError> {
        let params = vec![
            ("select".to_string(), QUOTE_PHASE_COLUMN.to_string()),
            (filter.0.to_string(), filter.1),
        ];
        let rows = self.paginate(CONFIG_PATH, params)?;
        Ok(rows.first().map(config_value))
    }
}

impl DealSource for PostgrestSource {
    fn tenant_quote_phase_id(&self, location_id: &str) -> Result<Option<String>, SourceError> {
        self.first_config_value(("location_id", format!("eq.{location_id}")))
    }

    fn global_quote_phase_id(&self) -> Result<Option<String>, SourceError> {
        self.first_config_value(("id", format!("eq.{GLOBAL_CONFIG_ROW_ID}")))
    }

    fn phases(&self, location_id: &str) -> Result<Vec<RawPhaseRecord>, SourceError> {
        let params = vec![
            ("select".to_string(), "id,name,sort_order,probability".to_string()),
            ("location_id".to_string(), format!("eq.{location_id}")),
        ];
        let rows = self.paginate(PHASES_PATH, params)?;
        info!(event = "phases_loaded", rows = rows.len());
        decode_rows("phase", rows)
    }

    fn deals(&self, location_id: &str, range: &CreatedRange) -> Result<Vec<Deal>, SourceError> {
        let rows = self.paginate(DEALS_PATH, deal_query(location_id, range))?;
        info!(event = "deals_loaded", rows = rows.len(), range = %range);
        decode_rows("deal", rows)
    }
}

pub fn rest_base(base_url: &str) -> String {
    format!("{}/rest/v1", base_url.trim().trim_end_matches('/'))
}

/// Query pairs for the deal table. `created_at` appears twice, once per bound.
pub fn deal_query(location_id: &str, range: &CreatedRange) -> Vec<(String, String)> {
    vec![
        ("select".to_string(), DEAL_COLUMNS.to_string()),
        ("location_id".to_string(), format!("eq.{location_id}")),
        ("order".to_string(), "created_at.asc,id.asc".to_string()),
        ("created_at".to_string(), format!("gte.{}", range.start_param())),
        ("created_at".to_string(), format!("lt.{}", range.end_param())),
    ]
}

/// Follows `limit`/`offset` pages until a short or empty page.
fn paginate_with<F>(
    path: &str,
    params: &[(String, String)],
    page_size: usize,
    fetch: F,
) -> Result<Vec<Value>, SourceError>
where
    F: Fn(&[(String, String)]) -> Result<Vec<Value>, SourceError>,
{
    let page_size = page_size.max(1);
    let mut rows = Vec::new();
    let mut offset = 0usize;
    loop {
        let mut page_params = params.to_vec();
        page_params.push(("limit".to_string(), page_size.to_string()));
        page_params.push(("offset".to_string(), offset.to_string()));

        let batch = fetch(&page_params)?;
        let batch_len = batch.len();
        debug!(event = "page_fetched", path, offset, rows = batch_len);
        rows.extend(batch);
        if batch_len < page_size {
            break;
        }
        offset += page_size;
    }
    Ok(rows)
}

fn page_rows(path: &str, body: Value) -> Result<Vec<Value>, SourceError> {
    match body {
        Value::Array(rows) => Ok(rows),
        Value::Null => Ok(Vec::new()),
        other => Err(SourceError::UnexpectedShape {
            path: path.to_string(),
            found: json_kind(&other),
        }),
    }
}

/// Phase ids may be stored as text or as numbers.
pub(crate) fn config_value(row: &Value) -> String {
    match row.get(QUOTE_PHASE_COLUMN) {
        Some(Value::String(value)) => value.trim().to_string(),
        Some(Value::Number(value)) => value.to_string(),
        _ => String::new(),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use chrono_tz::Tz;
    use serde_json::json;
    use std::cell::RefCell;

    fn range() -> CreatedRange {
        let day = NaiveDate::from_ymd_opt(2026, 2, 1).expect("valid date");
        CreatedRange::from_local_dates(day, day, Tz::UTC).expect("range")
    }

    #[test]
    fn rest_base_strips_trailing_slashes() {
        assert_eq!(
            rest_base("https://project.supabase.co/"),
            "https://project.supabase.co/rest/v1"
        );
        assert_eq!(
            rest_base(" https://project.supabase.co "),
            "https://project.supabase.co/rest/v1"
        );
    }

    #[test]
    fn deal_query_sends_both_range_bounds() {
        let query = deal_query("loc-1", &range());
        let created: Vec<&str> = query
            .iter()
            .filter(|(key, _)| key == "created_at")
            .map(|(_, value)| value.as_str())
            .collect();
        assert_eq!(
            created,
            vec!["gte.2026-02-01T00:00:00Z", "lt.2026-02-02T00:00:00Z"]
        );
        assert!(query.contains(&("location_id".to_string(), "eq.loc-1".to_string())));
        assert!(query.contains(&("order".to_string(), "created_at.asc,id.asc".to_string())));
    }

    #[test]
    fn non_list_body_is_a_shape_error() {
        let err = page_rows(DEALS_PATH, json!({"message": "oops"})).expect_err("object body");
        assert!(matches!(
            err,
            SourceError::UnexpectedShape { found: "object", .. }
        ));
        assert!(page_rows(DEALS_PATH, Value::Null).expect("null").is_empty());
        assert_eq!(page_rows(DEALS_PATH, json!([{"id": 1}])).expect("rows").len(), 1);
    }

    #[test]
    fn config_value_trims_and_tolerates_null() {
        assert_eq!(config_value(&json!({QUOTE_PHASE_COLUMN: " p3 "})), "p3");
        assert_eq!(config_value(&json!({QUOTE_PHASE_COLUMN: null})), "");
        assert_eq!(config_value(&json!({})), "");
    }

    #[test]
    fn config_value_accepts_numeric_ids() {
        assert_eq!(config_value(&json!({QUOTE_PHASE_COLUMN: 7})), "7");
        assert_eq!(config_value(&json!({QUOTE_PHASE_COLUMN: true})), "");
    }

    fn offset_of(params: &[(String, String)]) -> usize {
        params
            .iter()
            .find(|(key, _)| key == "offset")
            .and_then(|(_, value)| value.parse().ok())
            .expect("offset param")
    }

    fn run_pages(
        pages: Vec<Result<usize, SourceError>>,
    ) -> (Result<Vec<Value>, SourceError>, Vec<usize>) {
        let offsets = RefCell::new(Vec::new());
        let pages = RefCell::new(pages.into_iter());
        let params = vec![("select".to_string(), "id".to_string())];
        let result = paginate_with(DEALS_PATH, &params, 2, |page_params| {
            assert!(page_params.contains(&("limit".to_string(), "2".to_string())));
            assert!(page_params.contains(&("select".to_string(), "id".to_string())));
            let offset = offset_of(page_params);
            offsets.borrow_mut().push(offset);
            let size = pages.borrow_mut().next().expect("unexpected extra page")?;
            Ok((0..size).map(|index| json!({"id": offset + index})).collect())
        });
        (result, offsets.into_inner())
    }

    #[test]
    fn full_page_requests_one_more_page() {
        let (rows, offsets) = run_pages(vec![Ok(2), Ok(2), Ok(0)]);
        let rows = rows.expect("rows");
        assert_eq!(rows.len(), 4);
        assert_eq!(offsets, vec![0, 2, 4]);
        assert_eq!(rows[3], json!({"id": 3}));
    }

    #[test]
    fn short_page_stops_pagination() {
        let (rows, offsets) = run_pages(vec![Ok(2), Ok(1)]);
        assert_eq!(rows.expect("rows").len(), 3);
        assert_eq!(offsets, vec![0, 2]);
    }

    #[test]
    fn failed_page_discards_earlier_rows() {
        let (rows, offsets) = run_pages(vec![
            Ok(2),
            Err(SourceError::Status {
                path: DEALS_PATH.to_string(),
                status: 503,
                body: "unavailable".to_string(),
            }),
        ]);
        let err = rows.expect_err("second page fails");
        assert!(matches!(err, SourceError::Status { status: 503, .. }));
        assert_eq!(offsets, vec![0, 2]);
    }
}
