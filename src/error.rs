use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid line: start {start:?} and end {end:?} must be distinct points")]
    InvalidLine { start: (i32, i32), end: (i32, i32) },

    #[error("Invalid threshold `{name}`: {value} is outside of [0, 1]")]
    InvalidThreshold { name: &'static str, value: f32 },

    #[error("Invalid parameter `{name}`: {reason}")]
    InvalidParameter {
        name: &'static str,
        reason: String,
    },

    #[error("Detector Error: {0}")]
    Detector(Box<dyn std::error::Error + Send + Sync>),
}
