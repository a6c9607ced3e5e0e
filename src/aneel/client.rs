use std::collections::{BTreeSet, HashMap};
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde_json::Value;
use tracing::{debug, info, warn};

use super::records::{self, DatastoreResponse, Record};
use super::{sql, TariffSource, RESOURCE_ID_BANDEIRAS};
use crate::domain::FlagLabel;
use crate::error::{Result, TariffError};

/// Client for the two CKAN datastore endpoints of the ANEEL portal:
/// key-filtered `datastore_search` and SQL-style `datastore_search_sql`.
#[derive(Clone)]
pub struct AneelClient {
    base_url: String,
    client: reqwest::Client,
}

impl AneelClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static("tarifa-tracker/0.1"));
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    async fn datastore_search(
        &self,
        resource_id: &str,
        filters: &Value,
        limit: u32,
    ) -> Result<Vec<Record>> {
        let url = format!("{}/api/3/action/datastore_search", self.base_url);
        let params = [
            ("resource_id", resource_id.to_string()),
            ("filters", filters.to_string()),
            ("limit", limit.to_string()),
        ];
        self.execute(&url, &params).await
    }

    async fn datastore_search_sql(&self, query: &str) -> Result<Vec<Record>> {
        let url = format!("{}/api/3/action/datastore_search_sql", self.base_url);
        debug!(%query, "executing datastore SQL query");
        let params = [("sql", query.to_string())];
        self.execute(&url, &params).await
    }

    async fn execute(&self, url: &str, params: &[(&str, String)]) -> Result<Vec<Record>> {
        let resp = self.client.get(url).query(params).send().await?;
        let resp = resp
            .error_for_status()
            .map_err(|e| TariffError::UpstreamUnavailable(e.to_string()))?;
        let envelope: DatastoreResponse = resp
            .json()
            .await
            .map_err(|e| TariffError::UpstreamFormat(e.to_string()))?;
        envelope.into_records()
    }
}

#[async_trait]
impl TariffSource for AneelClient {
    async fn flag_surcharges(
        &self,
        month: NaiveDate,
    ) -> Result<Option<HashMap<crate::domain::TariffFlag, f64>>> {
        let first_of_month = month.format("%Y-%m-01").to_string();
        info!(competency = %first_of_month, "fetching price-flag surcharges");

        let filters = serde_json::json!({ "DatCompetencia": first_of_month });
        let records = self
            .datastore_search(RESOURCE_ID_BANDEIRAS, &filters, 1)
            .await?;

        let Some(record) = records.first() else {
            warn!(competency = %first_of_month, "no surcharge schedule published for month");
            return Ok(None);
        };
        let surcharges = records::surcharges_from_record(record);
        debug!(?surcharges, "surcharges resolved");
        Ok(Some(surcharges))
    }

    async fn active_flag(&self, month: NaiveDate) -> Result<Option<FlagLabel>> {
        let records = self
            .datastore_search_sql(&sql::active_flag_query(month))
            .await?;

        let Some(record) = records.first() else {
            warn!(month = %month.format("%Y-%m"), "no activated flag for month");
            return Ok(None);
        };
        let raw = record
            .get("NomBandeiraAcionada")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                TariffError::UpstreamFormat("record missing NomBandeiraAcionada".to_string())
            })?;

        let label = FlagLabel::resolve(raw);
        if let FlagLabel::Unmapped(name) = &label {
            warn!(flag = %name, "activated flag has no known mapping, passing through verbatim");
        }
        Ok(Some(label))
    }

    async fn provider_codes(&self) -> Result<BTreeSet<String>> {
        info!("fetching distinct provider codes");
        let records = self
            .datastore_search_sql(&sql::provider_codes_query())
            .await?;

        let codes: BTreeSet<String> = records
            .iter()
            .filter_map(|r| r.get("SigAgente").and_then(Value::as_str))
            .map(str::to_string)
            .collect();

        if codes.is_empty() {
            return Err(TariffError::NoData(
                "provider list query returned no usable records".to_string(),
            ));
        }
        info!(count = codes.len(), "provider codes fetched");
        Ok(codes)
    }

    async fn base_tariff(&self, provider: &str, as_of: NaiveDate) -> Result<Option<f64>> {
        info!(%provider, %as_of, "fetching base tariff");
        let records = self
            .datastore_search_sql(&sql::base_tariff_query(provider, as_of))
            .await?;

        let Some(record) = records.first() else {
            warn!(%provider, "no tariff schedule currently in effect");
            return Ok(None);
        };
        let tusd = records::require_decimal(record, "VlrTUSD")?;
        let te = records::require_decimal(record, "VlrTE")?;
        let base = tusd + te;
        info!(%provider, base, "base tariff resolved");
        Ok(Some(base))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TariffFlag;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param, query_param_contains};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> AneelClient {
        AneelClient::new(server.uri(), Duration::from_secs(5)).unwrap()
    }

    fn envelope(records: Value) -> Value {
        json!({ "success": true, "result": { "records": records } })
    }

    #[tokio::test]
    async fn fetches_surcharges_for_first_of_month() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/3/action/datastore_search"))
            .and(query_param_contains("filters", "2026-08-01"))
            .respond_with(ResponseTemplate::new(200).set_body_json(envelope(json!([{
                "DatCompetencia": "2026-08-01",
                "VlrBandeiraAmarela": "0,01874",
                "VlrBandeiraVermelhaPatamar1": "0,03971",
                "VlrBandeiraVermelhaPatamar2": "0,09492",
            }]))))
            .mount(&server)
            .await;

        let month = NaiveDate::from_ymd_opt(2026, 8, 30).unwrap();
        let surcharges = client_for(&server)
            .flag_surcharges(month)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(surcharges[&TariffFlag::Green], 0.0);
        assert_eq!(surcharges[&TariffFlag::Yellow], 0.01874);
        assert_eq!(surcharges[&TariffFlag::RedLevel2], 0.09492);
    }

    #[tokio::test]
    async fn empty_surcharge_result_is_no_data_not_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/3/action/datastore_search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(envelope(json!([]))))
            .mount(&server)
            .await;

        let month = NaiveDate::from_ymd_opt(2026, 8, 1).unwrap();
        let result = client_for(&server).flag_surcharges(month).await.unwrap();
        assert_eq!(result, None);
    }

    #[tokio::test]
    async fn transport_failure_is_upstream_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/3/action/datastore_search"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let month = NaiveDate::from_ymd_opt(2026, 8, 1).unwrap();
        let err = client_for(&server).flag_surcharges(month).await.unwrap_err();
        assert!(matches!(err, TariffError::UpstreamUnavailable(_)));
    }

    #[tokio::test]
    async fn malformed_body_is_a_format_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/3/action/datastore_search_sql"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let err = client_for(&server).provider_codes().await.unwrap_err();
        assert!(matches!(err, TariffError::UpstreamFormat(_)));
    }

    #[tokio::test]
    async fn active_flag_maps_known_labels_and_passes_unknown_through() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/3/action/datastore_search_sql"))
            .and(query_param_contains("sql", "NomBandeiraAcionada"))
            .respond_with(ResponseTemplate::new(200).set_body_json(envelope(json!([{
                "NomBandeiraAcionada": "Vermelha P1",
            }]))))
            .mount(&server)
            .await;

        let month = NaiveDate::from_ymd_opt(2026, 8, 1).unwrap();
        let label = client_for(&server).active_flag(month).await.unwrap();
        assert_eq!(label, Some(FlagLabel::Known(TariffFlag::RedLevel1)));
    }

    #[tokio::test]
    async fn provider_codes_come_back_distinct_and_sorted() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/3/action/datastore_search_sql"))
            .and(query_param_contains("sql", "SigAgente"))
            .respond_with(ResponseTemplate::new(200).set_body_json(envelope(json!([
                { "SigAgente": "CEMIG" },
                { "SigAgente": "AmE" },
                { "SigAgente": "CEMIG" },
            ]))))
            .mount(&server)
            .await;

        let codes = client_for(&server).provider_codes().await.unwrap();
        assert_eq!(
            codes.into_iter().collect::<Vec<_>>(),
            vec!["AmE".to_string(), "CEMIG".to_string()]
        );
    }

    #[tokio::test]
    async fn empty_provider_universe_is_reported_as_no_data() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/3/action/datastore_search_sql"))
            .respond_with(ResponseTemplate::new(200).set_body_json(envelope(json!([]))))
            .mount(&server)
            .await;

        let err = client_for(&server).provider_codes().await.unwrap_err();
        assert!(matches!(err, TariffError::NoData(_)));
    }

    #[tokio::test]
    async fn base_tariff_sums_decimal_comma_components() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/3/action/datastore_search_sql"))
            .and(query_param_contains("sql", "VlrTUSD"))
            .respond_with(ResponseTemplate::new(200).set_body_json(envelope(json!([{
                "VlrTUSD": "0,25",
                "VlrTE": "0,20",
            }]))))
            .mount(&server)
            .await;

        let as_of = NaiveDate::from_ymd_opt(2026, 8, 30).unwrap();
        let base = client_for(&server)
            .base_tariff("CEMIG", as_of)
            .await
            .unwrap();
        assert_eq!(base, Some(0.45));
    }

    #[tokio::test]
    async fn upstream_reported_failure_surfaces_with_opaque_detail() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/3/action/datastore_search_sql"))
            .and(query_param("sql", sql::provider_codes_query()))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": false,
                "error": { "info": "resource temporarily locked" },
            })))
            .mount(&server)
            .await;

        let err = client_for(&server).provider_codes().await.unwrap_err();
        assert!(matches!(err, TariffError::UpstreamUnavailable(_)));
    }
}
