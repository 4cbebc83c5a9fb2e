use serde::{Deserialize, Serialize};

/// A named group of upstream endpoints a user may route through.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pool {
    pub name: String,

    /// Region tag, e.g. "asia" | "eu" | "america". Informational.
    #[serde(default)]
    pub region: String,

    /// Unique across pools.
    pub subdomain: String,

    #[serde(default)]
    pub port_start: u16,

    #[serde(default)]
    pub port_end: u16,

    #[serde(default)]
    pub outs: Vec<Out>,
}

impl Pool {
    /// Look up an Out by its upstream domain.
    pub fn find_out(&self, domain: &str) -> Option<&Out> {
        self.outs.iter().find(|o| o.domain == domain)
    }
}

/// A concrete third-party upstream endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Out {
    /// Credential template. The part before the first `-` is the
    /// vendor account, the rest is the per-request filter slot
    /// (`%s` marks the vendor's session placeholder).
    pub format: String,

    pub upstream_port: u16,

    pub domain: String,

    #[serde(default = "default_weight")]
    pub weight: u32,
}

fn default_weight() -> u32 {
    1
}

impl Out {
    /// Render the credentials presented to this upstream: the template's
    /// account prefix followed by the caller's filter string verbatim
    /// (the filter already begins with `-`).
    pub fn credentials(&self, filter: &str) -> String {
        match self.format.find('-') {
            Some(i) => format!("{}{}", &self.format[..i], filter),
            None => format!("{}{}", self.format, filter),
        }
    }

    /// `domain:port` dial target.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.domain, self.upstream_port)
    }
}

// ── Wire DTOs ─────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePoolRequest {
    pub name: String,
    #[serde(default)]
    pub region: String,
    pub subdomain: String,
    #[serde(default)]
    pub port_start: u16,
    #[serde(default)]
    pub port_end: u16,
    #[serde(default)]
    pub outs: Vec<Out>,
}

/// Sparse PUT body — only the present fields are applied.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdatePoolRequest {
    pub region: Option<String>,
    pub subdomain: Option<String>,
    pub port_start: Option<u16>,
    pub port_end: Option<u16>,
    pub outs: Option<Vec<Out>>,
}
