// Segmentation Method Domain Model

use crate::domain::error::DomainError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Background removal method (closed set)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Method {
    #[serde(rename = "bria")]
    Bria,
    #[serde(rename = "inspyrenet")]
    Inspyrenet,
    #[serde(rename = "u2net")]
    U2net,
    #[serde(rename = "u2net_human_seg")]
    U2netHumanSeg,
    #[serde(rename = "isnet-general-use")]
    IsnetGeneralUse,
    #[serde(rename = "isnet-anime")]
    IsnetAnime,
}

impl Method {
    pub const ALL: [Method; 6] = [
        Method::Bria,
        Method::Inspyrenet,
        Method::U2net,
        Method::U2netHumanSeg,
        Method::IsnetGeneralUse,
        Method::IsnetAnime,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Bria => "bria",
            Method::Inspyrenet => "inspyrenet",
            Method::U2net => "u2net",
            Method::U2netHumanSeg => "u2net_human_seg",
            Method::IsnetGeneralUse => "isnet-general-use",
            Method::IsnetAnime => "isnet-anime",
        }
    }

    /// Methods whose model must run on the shared accelerator
    pub fn requires_accelerator(&self) -> bool {
        matches!(self, Method::Inspyrenet)
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Method::ALL
            .iter()
            .copied()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| DomainError::UnknownMethod(s.to_string()))
    }
}
