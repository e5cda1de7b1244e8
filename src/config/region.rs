//! # OTC Regions
//!
//! Regions the webhook can talk to and the endpoints derived from them.

use std::fmt;
use std::str::FromStr;

/// Open Telekom Cloud region hosting the WAF
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OtcRegion {
    #[default]
    EuDe,
    EuNl,
}

impl OtcRegion {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            OtcRegion::EuDe => "eu-de",
            OtcRegion::EuNl => "eu-nl",
        }
    }

    /// Identity (Keystone v3) endpoint for this region
    #[must_use]
    pub fn iam_endpoint(&self) -> String {
        format!("https://iam.{}.otc.t-systems.com:443/v3", self.as_str())
    }

    /// WAF v1 API endpoint for this region
    #[must_use]
    pub fn waf_endpoint(&self) -> String {
        format!("https://waf.{}.otc.t-systems.com", self.as_str())
    }
}

impl fmt::Display for OtcRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OtcRegion {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "eu-de" => Ok(OtcRegion::EuDe),
            "eu-nl" => Ok(OtcRegion::EuNl),
            other => Err(anyhow::anyhow!(
                "invalid argument {other} does not represent a valid region"
            )),
        }
    }
}
