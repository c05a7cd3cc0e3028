use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AddressCandidate {
    pub zip_code: String,
    pub road_address: String,
    pub jibun_address: String,
    pub building_name: Option<String>,
}

#[async_trait]
pub trait AddressLookup: Send + Sync {
    async fn search(&self, keyword: &str) -> anyhow::Result<Vec<AddressCandidate>>;
}

/// Road-name address search against the juso.go.kr open API.
pub struct JusoAddressLookup {
    api_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl JusoAddressLookup {
    pub fn new(api_url: String, api_key: String) -> Self {
        Self {
            api_url,
            api_key,
            client: reqwest::Client::new(),
        }
    }
}

#[derive(Deserialize)]
struct JusoResponse {
    results: JusoResults,
}

#[derive(Deserialize)]
struct JusoResults {
    common: JusoCommon,
    #[serde(default)]
    juso: Option<Vec<JusoEntry>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct JusoCommon {
    error_code: String,
    error_message: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct JusoEntry {
    zip_no: String,
    road_addr: String,
    jibun_addr: String,
    #[serde(default)]
    bd_nm: Option<String>,
}

fn parse_juso_response(body: &str) -> anyhow::Result<Vec<AddressCandidate>> {
    let response: JusoResponse =
        serde_json::from_str(body).context("failed to parse address API response")?;

    if response.results.common.error_code != "0" {
        anyhow::bail!(
            "address API error {}: {}",
            response.results.common.error_code,
            response.results.common.error_message
        );
    }

    Ok(response
        .results
        .juso
        .unwrap_or_default()
        .into_iter()
        .map(|entry| AddressCandidate {
            zip_code: entry.zip_no,
            road_address: entry.road_addr,
            jibun_address: entry.jibun_addr,
            building_name: entry.bd_nm.filter(|n| !n.is_empty()),
        })
        .collect())
}

#[async_trait]
impl AddressLookup for JusoAddressLookup {
    async fn search(&self, keyword: &str) -> anyhow::Result<Vec<AddressCandidate>> {
        let body = self
            .client
            .get(&self.api_url)
            .query(&[
                ("confmKey", self.api_key.as_str()),
                ("currentPage", "1"),
                ("countPerPage", "20"),
                ("keyword", keyword),
                ("resultType", "json"),
            ])
            .send()
            .await
            .context("failed to call address API")?
            .error_for_status()
            .context("address API returned error")?
            .text()
            .await
            .context("failed to read address API response")?;

        parse_juso_response(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_successful_response() {
        let body = r#"{"results":{"common":{"errorCode":"0","errorMessage":"정상","totalCount":"1"},
            "juso":[{"zipNo":"06236","roadAddr":"서울특별시 강남구 테헤란로 152","jibunAddr":"서울특별시 강남구 역삼동 737","bdNm":"강남파이낸스센터"}]}}"#;
        let results = parse_juso_response(body).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].zip_code, "06236");
        assert_eq!(results[0].building_name.as_deref(), Some("강남파이낸스센터"));
    }

    #[test]
    fn empty_building_name_is_none() {
        let body = r#"{"results":{"common":{"errorCode":"0","errorMessage":"정상"},
            "juso":[{"zipNo":"12345","roadAddr":"a","jibunAddr":"b","bdNm":""}]}}"#;
        let results = parse_juso_response(body).unwrap();
        assert_eq!(results[0].building_name, None);
    }

    #[test]
    fn api_error_is_reported() {
        let body = r#"{"results":{"common":{"errorCode":"E0001","errorMessage":"승인되지 않은 KEY 입니다."},"juso":null}}"#;
        let err = parse_juso_response(body).unwrap_err();
        assert!(err.to_string().contains("E0001"));
    }
}
