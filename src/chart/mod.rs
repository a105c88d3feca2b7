pub mod analyze;
pub mod feedback;
pub mod image;
pub mod lenient;
pub mod prompts;
pub mod recover;

pub use analyze::{analyze, analyze_with_config, analyze_with_provider};
pub use feedback::FeedbackRecord;
pub use image::{encode_image, ChartFile, ImagePart, SupportedMediaType};
pub use recover::{recover_feedback, ParseTier, Recovered};
