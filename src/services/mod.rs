pub mod aggregator;
pub mod analysis_service;
pub mod anomaly_engine;
pub mod forecast_engine;
pub mod isolation_forest;
pub mod loss_simulator;
pub mod narrative;
pub mod record_joiner;
pub mod seasonal_model;
pub mod yield_model;
