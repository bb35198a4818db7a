//! Blocking client for the school backend's fee endpoints.

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{BursarError, Result};
use crate::models::{FeePayment, NewPayment};

const TIMEOUT: Duration = Duration::from_secs(30);
/// Upper bound on `next` links followed for one resource.
const MAX_PAGES: usize = 10_000;

/// The read endpoints the ledger is built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    FeeStructures,
    FeePayments,
    Students,
    Classes,
}

impl Resource {
    pub const ALL: [Resource; 4] = [
        Self::FeeStructures,
        Self::FeePayments,
        Self::Students,
        Self::Classes,
    ];

    pub fn path(&self) -> &'static str {
        match self {
            Self::FeeStructures => "fee_structures/",
            Self::FeePayments => "fee_payments/",
            Self::Students => "students/",
            Self::Classes => "classes/",
        }
    }

    /// Cache table the resource is stored in.
    pub fn table(&self) -> &'static str {
        match self {
            Self::FeeStructures => "fee_structures",
            Self::FeePayments => "fee_payments",
            Self::Students => "students",
            Self::Classes => "classes",
        }
    }
}

pub struct Backend {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl Backend {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn url(&self, resource: Resource) -> String {
        format!("{}/{}", self.base_url, resource.path())
    }

    /// GET every page of a resource, following `next` links, and return the
    /// raw bodies in order.
    pub fn fetch_pages(&self, resource: Resource) -> Result<Vec<String>> {
        let mut url = self.url(resource);
        let mut bodies = Vec::new();
        loop {
            let body = self.get(&url)?;
            let next = parse_page(&body)?.next;
            bodies.push(body);
            let Some(next) = next else {
                return Ok(bodies);
            };
            let next = resolve_next(&url, &next)?;
            if next == url || bodies.len() >= MAX_PAGES {
                return Err(BursarError::Other(format!(
                    "pagination of {} did not terminate",
                    self.url(resource)
                )));
            }
            url = next;
        }
    }

    fn get(&self, url: &str) -> Result<String> {
        tracing::info!(%url, "fetching");
        let resp = self.client.get(url).send()?;
        let status = resp.status();
        if !status.is_success() {
            return Err(BursarError::Api {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        let body = resp.text()?;
        tracing::debug!(%url, bytes = body.len(), "fetched");
        Ok(body)
    }

    /// POST a validated payment. Returns the row the backend stored.
    pub fn create_payment(&self, payment: &NewPayment) -> Result<FeePayment> {
        let url = self.url(Resource::FeePayments);
        tracing::info!(%url, payer = %payment.student, "posting payment");
        let resp = self.client.post(&url).json(payment).send()?;
        let status = resp.status();
        if !status.is_success() {
            return Err(BursarError::Api {
                status: status.as_u16(),
                url,
            });
        }
        let body = resp.text()?;
        // Some deployments answer 201 with an empty body.
        if body.trim().is_empty() {
            return Ok(FeePayment::from(payment));
        }
        Ok(serde_json::from_str(&body)?)
    }
}

/// One list body: a bare JSON array, or a paginated
/// `{"results": [...], "next": ...}` envelope.
struct Page {
    items: Vec<Value>,
    next: Option<String>,
}

fn parse_page(body: &str) -> Result<Page> {
    match serde_json::from_str::<Value>(body)? {
        Value::Array(items) => Ok(Page { items, next: None }),
        Value::Object(mut map) => {
            let Some(Value::Array(items)) = map.remove("results") else {
                return Err(BursarError::Other(
                    "expected a JSON array or an object with a 'results' array".into(),
                ));
            };
            let next = match map.remove("next") {
                Some(Value::String(n)) if !n.trim().is_empty() => Some(n),
                _ => None,
            };
            Ok(Page { items, next })
        }
        _ => Err(BursarError::Other("expected a JSON array".into())),
    }
}

/// `next` may be absolute or relative to the page it came from.
fn resolve_next(current: &str, next: &str) -> Result<String> {
    reqwest::Url::parse(current)
        .and_then(|base| base.join(next.trim()))
        .map(|url| url.to_string())
        .map_err(|e| BursarError::Other(format!("bad next link '{next}': {e}")))
}

/// Decode and concatenate the rows of every page.
pub fn decode_pages<T: DeserializeOwned>(bodies: &[String]) -> Result<Vec<T>> {
    let mut items = Vec::new();
    for body in bodies {
        items.extend(parse_page(body)?.items);
    }
    Ok(serde_json::from_value(Value::Array(items))?)
}
