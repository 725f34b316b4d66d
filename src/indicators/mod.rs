// Technical indicators module

pub mod moving_average;

pub use moving_average::{calculate_sma, calculate_sma_series};
