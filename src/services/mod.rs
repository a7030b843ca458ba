pub mod price_service;
pub mod indicators;
pub mod forecasting_service;
pub mod chart_service;
