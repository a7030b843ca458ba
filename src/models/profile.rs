use serde::{Deserialize, Serialize};

/// Company metadata shown in the header panel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyProfile {
    pub ticker: String,
    pub name: String,
    pub logo_url: Option<String>,
    pub summary: Option<String>,
    pub website: Option<String>,
}
