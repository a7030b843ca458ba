mod price_point;
mod profile;
mod indicator;
mod forecast;
pub mod chart;
pub mod panel;

pub use price_point::{PriceRecord, PriceSeries};
pub use profile::CompanyProfile;
pub use indicator::{IndicatorPoint, IndicatorSeries};
pub use forecast::{ForecastModel, ForecastPoint, ForecastSeries, SvrParams};
pub use chart::{ChartFigure, Trace, TraceMode};
pub use panel::{PanelId, PanelState};
