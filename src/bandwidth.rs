//! Download throughput measurement against public test files

use crate::error::{AppError, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::{Duration, Instant};

/// Size of the file fetched by a bandwidth test
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TestSize {
    #[default]
    #[serde(rename = "1MB")]
    OneMb,
    #[serde(rename = "5MB")]
    FiveMb,
    #[serde(rename = "10MB")]
    TenMb,
}

impl TestSize {
    fn megabytes(&self) -> u32 {
        match self {
            Self::OneMb => 1,
            Self::FiveMb => 5,
            Self::TenMb => 10,
        }
    }

    /// Public mirrors serving a file of this size, in preference order
    pub fn mirrors(&self) -> Vec<String> {
        let mb = self.megabytes();
        vec![
            format!("http://speedtest.ftp.otenet.gr/files/test{}Mb.db", mb),
            format!("http://mirror.internode.on.net/pub/test/{}meg.test", mb),
            format!("https://speed.hetzner.de/{}MB.bin", mb),
        ]
    }
}

impl fmt::Display for TestSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}MB", self.megabytes())
    }
}

impl FromStr for TestSize {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "1MB" | "1" => Ok(Self::OneMb),
            "5MB" | "5" => Ok(Self::FiveMb),
            "10MB" | "10" => Ok(Self::TenMb),
            other => Err(AppError::validation(format!(
                "test size must be 1MB, 5MB or 10MB, got '{}'",
                other
            ))),
        }
    }
}

/// Bytes and wall clock of one completed download
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Download {
    pub bytes: u64,
    pub elapsed: Duration,
}

impl Download {
    /// Megabits per second, counting a megabit as 2^20 bits
    pub fn mbps(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs <= 0.0 {
            return 0.0;
        }
        (self.bytes as f64 * 8.0) / (1024.0 * 1024.0) / secs
    }
}

/// Fetch `url` to the end, counting bytes as they stream in. `timeout`
/// bounds the whole transfer, not just the connect.
pub async fn download(client: &Client, url: &str, timeout: Duration) -> Result<Download> {
    let start = Instant::now();
    let transfer = async {
        let mut response = client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(AppError::http_request(format!("HTTP {}", status)));
        }

        let mut bytes = 0u64;
        while let Some(chunk) = response.chunk().await? {
            bytes += chunk.len() as u64;
        }
        Ok::<u64, AppError>(bytes)
    };

    let bytes = tokio::time::timeout(timeout, transfer)
        .await
        .map_err(|_| AppError::timeout(format!("download did not finish within {:?}", timeout)))??;
    if bytes == 0 {
        return Err(AppError::network("server returned an empty body"));
    }

    Ok(Download {
        bytes,
        elapsed: start.elapsed(),
    })
}
