//! DNS-over-HTTPS client for the JSON API (`application/dns-json`)

use crate::error::{AppError, Result};
use crate::models::results::DnsRecord;
use crate::types::RecordType;
use reqwest::Client;
use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::time::Duration;

const RCODE_NOERROR: u32 = 0;
const RCODE_SERVFAIL: u32 = 2;
const RCODE_NXDOMAIN: u32 = 3;

/// JSON answer body as returned by Google/Cloudflare style endpoints
#[derive(Debug, Clone, Deserialize)]
pub struct DohResponse {
    #[serde(rename = "Status")]
    pub status: u32,
    #[serde(rename = "Answer", default)]
    pub answer: Vec<DohAnswer>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DohAnswer {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub record_type: u16,
    pub data: String,
}

/// DNS-over-HTTPS client implementation
#[derive(Clone)]
pub struct DoHClient {
    url: String,
    client: Client,
}

impl DoHClient {
    /// Create a new DoH client
    pub fn new(url: String, client: Client) -> Self {
        Self { url, client }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Forward lookup of one record type
    pub async fn query(&self, name: &str, record_type: RecordType, timeout: Duration) -> Result<Vec<DnsRecord>> {
        let response = self.fetch(name, record_type, timeout).await?;
        match response.status {
            RCODE_NOERROR => {}
            RCODE_NXDOMAIN => return Err(AppError::name_not_found(format!("{} does not exist (NXDOMAIN)", name))),
            RCODE_SERVFAIL => return Err(AppError::resolver_unavailable(format!("{} answered SERVFAIL for {}", self.url, name))),
            other => return Err(AppError::resolver_unavailable(format!("{} answered rcode {} for {}", self.url, other, name))),
        }

        let records = parse_records(&response, record_type);
        if records.is_empty() {
            return Err(AppError::name_not_found(format!("no {} records for {}", record_type, name)));
        }
        Ok(records)
    }

    /// PTR lookup through the same endpoint
    pub async fn reverse(&self, address: IpAddr, timeout: Duration) -> Result<Vec<String>> {
        let name = super::reverse_name(address);
        let response = self.fetch(&name, RecordType::Ptr, timeout).await?;
        match response.status {
            RCODE_NOERROR | RCODE_NXDOMAIN => {}
            other => return Err(AppError::resolver_unavailable(format!("{} answered rcode {} for {}", self.url, other, name))),
        }

        let hostnames: Vec<String> = parse_records(&response, RecordType::Ptr)
            .into_iter()
            .filter_map(|record| match record {
                DnsRecord::Ptr(host) => Some(host),
                _ => None,
            })
            .collect();
        if hostnames.is_empty() {
            return Err(AppError::no_ptr_record(format!("no PTR record for {}", address)));
        }
        Ok(hostnames)
    }

    async fn fetch(&self, name: &str, record_type: RecordType, timeout: Duration) -> Result<DohResponse> {
        let query_params = [
            ("name", name),
            ("type", record_type.as_str()),
        ];

        let response = self
            .client
            .get(&self.url)
            .query(&query_params)
            .header("Accept", "application/dns-json")
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AppError::timeout(format!("DoH query for {} timed out after {:?}", name, timeout))
                } else {
                    AppError::resolver_unavailable(format!("DoH request to {} failed: {}", self.url, e))
                }
            })?;

        if !response.status().is_success() {
            return Err(AppError::resolver_unavailable(format!(
                "DoH query failed with status: {}",
                response.status()
            )));
        }

        response.json::<DohResponse>().await.map_err(|e| {
            if e.is_timeout() {
                AppError::timeout(format!("DoH answer for {} timed out", name))
            } else {
                AppError::resolver_unavailable(format!("Failed to parse DoH response: {}", e))
            }
        })
    }
}

/// Keep answers of the requested type; CNAME chain entries are dropped
pub fn parse_records(response: &DohResponse, record_type: RecordType) -> Vec<DnsRecord> {
    response
        .answer
        .iter()
        .filter(|answer| answer.record_type == record_type.code())
        .filter_map(|answer| parse_data(record_type, answer.data.trim()))
        .collect()
}

fn parse_data(record_type: RecordType, data: &str) -> Option<DnsRecord> {
    match record_type {
        RecordType::A => data.parse::<Ipv4Addr>().ok().map(DnsRecord::A),
        RecordType::Aaaa => data.parse::<Ipv6Addr>().ok().map(DnsRecord::Aaaa),
        RecordType::Mx => {
            let (preference, exchange) = data.split_once(char::is_whitespace)?;
            Some(DnsRecord::Mx {
                preference: preference.parse().ok()?,
                exchange: super::normalize_name(exchange.trim()),
            })
        }
        RecordType::Ns => Some(DnsRecord::Ns(super::normalize_name(data))),
        RecordType::Cname => Some(DnsRecord::Cname(super::normalize_name(data))),
        RecordType::Ptr => Some(DnsRecord::Ptr(super::normalize_name(data))),
        RecordType::Txt => Some(DnsRecord::Txt(unquote_txt(data))),
    }
}

/// `"a" "b"` -> `ab`; unquoted data passes through
fn unquote_txt(data: &str) -> String {
    if !data.starts_with('"') {
        return data.to_string();
    }
    data.split('"')
        .enumerate()
        .filter(|(i, _)| i % 2 == 1)
        .map(|(_, part)| part)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(status: u32, answers: &[(u16, &str)]) -> DohResponse {
        DohResponse {
            status,
            answer: answers
                .iter()
                .map(|(t, d)| DohAnswer {
                    name: "example.com.".to_string(),
                    record_type: *t,
                    data: d.to_string(),
                })
                .collect(),
        }
    }

    #[test]
    fn test_parse_a_records_skips_cname_chain() {
        let resp = response(0, &[(5, "edge.example.net."), (1, "93.184.216.34"), (1, "93.184.216.35")]);
        let records = parse_records(&resp, RecordType::A);
        assert_eq!(
            records,
            vec![
                DnsRecord::A("93.184.216.34".parse().unwrap()),
                DnsRecord::A("93.184.216.35".parse().unwrap()),
            ]
        );
    }

    #[test]
    fn test_parse_mx_and_names() {
        let resp = response(0, &[(15, "10 smtp.example.com.")]);
        assert_eq!(
            parse_records(&resp, RecordType::Mx),
            vec![DnsRecord::Mx {
                preference: 10,
                exchange: "smtp.example.com".to_string()
            }]
        );

        let resp = response(0, &[(2, "ns1.example.com.")]);
        assert_eq!(parse_records(&resp, RecordType::Ns), vec![DnsRecord::Ns("ns1.example.com".to_string())]);
    }

    #[test]
    fn test_parse_txt_strips_quotes() {
        let resp = response(0, &[(16, "\"v=spf1 \" \"-all\""), (16, "plain text")]);
        assert_eq!(
            parse_records(&resp, RecordType::Txt),
            vec![
                DnsRecord::Txt("v=spf1 -all".to_string()),
                DnsRecord::Txt("plain text".to_string()),
            ]
        );
    }

    #[test]
    fn test_malformed_data_is_ignored() {
        let resp = response(0, &[(1, "not-an-ip"), (15, "mail.example.com")]);
        assert!(parse_records(&resp, RecordType::A).is_empty());
        assert!(parse_records(&resp, RecordType::Mx).is_empty());
    }

    #[test]
    fn test_response_deserialization() {
        let json = r#"{"Status":3,"TC":false,"Question":[{"name":"nope.test.","type":1}]}"#;
        let resp: DohResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.status, 3);
        assert!(resp.answer.is_empty());
    }
}
