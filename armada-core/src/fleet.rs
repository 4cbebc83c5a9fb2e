use serde::{Deserialize, Serialize};

/// A registered data-plane worker. Informational: workers pull the
/// full pool map rather than querying their own entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerNode {
    pub name: String,
    #[serde(default)]
    pub subdomains: Vec<String>,
}

/// Catalog grouping of countries and pools. Referencing entities carry
/// names only; the full records are resolved on read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Region {
    pub name: String,
    #[serde(default)]
    pub countries: Vec<String>,
    #[serde(default)]
    pub pools: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Country {
    /// ISO-like code, unique.
    pub code: String,
    #[serde(default)]
    pub name: String,
}
