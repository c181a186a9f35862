//! Bitquery Client
//!
//! GraphQL client for the Stellar indexing provider. Pulls smart-contract
//! calls for a vault and turns their numeric arguments into raw records.

use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::source::{ContractId, DataSource, RawRecord};
use crate::constants;
use crate::logic::error::{RiskError, RiskResult};

/// Timestamp format requested from the provider
const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const CALLS_QUERY: &str = r#"
query ($contract: String!, $since: ISO8601DateTime, $till: ISO8601DateTime) {
  stellar(network: stellar) {
    smartContractCalls(
      smartContractAddress: {is: $contract}
      time: {since: $since, till: $till}
    ) {
      timestamp {
        time(format: "%Y-%m-%d %H:%M:%S")
      }
      arguments {
        name
        value
      }
    }
  }
}
"#;

/// Provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub endpoint: String,
    /// Never written back to disk; supplied by the environment
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            endpoint: constants::DEFAULT_BITQUERY_URL.to_string(),
            api_key: None,
            timeout_secs: constants::DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

impl SourceConfig {
    pub fn from_env() -> Self {
        Self {
            endpoint: constants::get_bitquery_url(),
            api_key: constants::get_bitquery_api_key(),
            ..Default::default()
        }
    }
}

// Response types

#[derive(Debug, Deserialize)]
struct GraphQlResponse {
    data: Option<StellarData>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct StellarData {
    stellar: Option<StellarCalls>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StellarCalls {
    smart_contract_calls: Option<Vec<ContractCall>>,
}

#[derive(Debug, Deserialize)]
struct ContractCall {
    timestamp: CallTimestamp,
    #[serde(default)]
    arguments: Vec<CallArgument>,
}

#[derive(Debug, Deserialize)]
struct CallTimestamp {
    time: String,
}

#[derive(Debug, Deserialize)]
struct CallArgument {
    name: String,
    value: serde_json::Value,
}

/// Bitquery GraphQL client
pub struct BitqueryClient {
    config: SourceConfig,
    http_client: reqwest::Client,
}

impl BitqueryClient {
    pub fn new(config: SourceConfig) -> RiskResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(format!("vault-rescue-core/{}", constants::APP_VERSION))
            .build()
            .map_err(|e| RiskError::DataSource(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { config, http_client })
    }

    pub fn config(&self) -> &SourceConfig {
        &self.config
    }

    /// GraphQL request body for a contract and range
    pub fn build_request(
        contract: &ContractId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> serde_json::Value {
        json!({
            "query": CALLS_QUERY,
            "variables": {
                "contract": contract.as_str(),
                "since": start.to_rfc3339(),
                "till": end.to_rfc3339(),
            }
        })
    }

    async fn fetch_calls(
        &self,
        contract: &ContractId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> RiskResult<Vec<RawRecord>> {
        let body = Self::build_request(contract, start, end);

        let mut request = self.http_client.post(&self.config.endpoint).json(&body);
        if let Some(key) = &self.config.api_key {
            request = request.header("X-API-KEY", key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| RiskError::DataSource(format!("Request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RiskError::DataSource(format!(
                "Provider returned HTTP {}",
                status.as_u16()
            )));
        }

        let payload: serde_json::Value = response
            .json()
            .await
            .map_err(|e| RiskError::Schema(format!("Invalid JSON body: {}", e)))?;

        let records = parse_response(payload)?;
        log::debug!(
            "Bitquery returned {} calls for {} [{} .. {})",
            records.len(),
            contract,
            start,
            end
        );
        Ok(records)
    }
}

impl DataSource for BitqueryClient {
    fn name(&self) -> &str {
        "bitquery"
    }

    fn fetch(
        &self,
        contract: &ContractId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> impl Future<Output = RiskResult<Vec<RawRecord>>> + Send {
        self.fetch_calls(contract, start, end)
    }
}

/// Parse a GraphQL response body into raw records
pub fn parse_response(payload: serde_json::Value) -> RiskResult<Vec<RawRecord>> {
    let response: GraphQlResponse = serde_json::from_value(payload)
        .map_err(|e| RiskError::Schema(format!("Unexpected response shape: {}", e)))?;

    if !response.errors.is_empty() {
        let messages: Vec<_> = response.errors.into_iter().map(|e| e.message).collect();
        return Err(RiskError::DataSource(messages.join("; ")));
    }

    let calls = response
        .data
        .and_then(|d| d.stellar)
        .and_then(|s| s.smart_contract_calls)
        .ok_or_else(|| RiskError::Schema("missing data.stellar.smartContractCalls".to_string()))?;

    let mut records = Vec::with_capacity(calls.len());
    for call in calls {
        let naive = NaiveDateTime::parse_from_str(&call.timestamp.time, TIME_FORMAT)
            .map_err(|e| {
                RiskError::Schema(format!("Bad timestamp '{}': {}", call.timestamp.time, e))
            })?;

        let mut record = RawRecord::new(naive.and_utc());
        for arg in call.arguments {
            if let Some(value) = numeric_value(&arg.value) {
                record.fields.insert(arg.name, value);
            }
        }
        records.push(record);
    }

    records.sort_by_key(|r| r.timestamp);
    Ok(records)
}

/// Provider encodes numbers either as JSON numbers or decimal strings
fn numeric_value(value: &serde_json::Value) -> Option<f64> {
    match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|v| v.is_finite())
}
