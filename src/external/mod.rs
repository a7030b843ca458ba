pub mod market_data;
pub mod yahoofinance;

#[cfg(test)]
pub mod mock;
