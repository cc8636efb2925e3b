pub mod app_config;
pub mod config;
pub mod jobs;
pub mod pricing;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use jobs::{DiscountJob, JobStatus, NewDiscountJob};
pub use pricing::{format_price, parse_price, plan_discount, DiscountPlan, PricingError};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid job status: {0}")]
    InvalidJobStatus(String),
}
