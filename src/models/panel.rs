use serde::{Deserialize, Serialize};

use crate::errors::AppError;

/// Content of one dashboard panel after an event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PanelState<T> {
    /// Trigger never clicked or ticker absent; the panel stays empty.
    NeverTriggered,
    Triggered { content: T },
    Error { message: String },
}

impl<T> PanelState<T> {
    pub fn from_result(result: Result<T, AppError>) -> Self {
        match result {
            Ok(content) => PanelState::Triggered { content },
            Err(e) => PanelState::Error {
                message: e.to_string(),
            },
        }
    }
}

/// Panels whose trigger counters the page tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PanelId {
    Company,
    Stock,
    Indicators,
    Forecast,
}
