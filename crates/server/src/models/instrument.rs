use serde::{Deserialize, Serialize};

/// Tradable security, keyed by its ticker symbol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instrument {
    pub id: i64,
    /// Short code as stored, e.g. `AAPL`, `BRK.B`
    pub symbol: String,
    /// Company or security name, e.g. `Apple Inc.`
    pub description: String,
    pub market_id: Option<i64>,
    pub instrument_type: String,
}

/// Insert payload used by importers and tests
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateInstrument {
    pub symbol: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub market_id: Option<i64>,
    #[serde(default = "default_instrument_type")]
    pub instrument_type: String,
}

fn default_instrument_type() -> String {
    "stock".to_string()
}

impl CreateInstrument {
    pub fn new(symbol: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            description: description.into(),
            market_id: None,
            instrument_type: default_instrument_type(),
        }
    }
}
