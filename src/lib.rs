pub mod ai;
pub mod chart;
pub mod config;
pub mod error;

pub use chart::{
    analyze, analyze_with_config, analyze_with_provider, encode_image, recover_feedback,
    ChartFile, FeedbackRecord, ParseTier,
};
pub use config::AppConfig;
pub use error::AppError;
