use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClockError {
    #[error("Maximum number of clock widgets already created: {max}")]
    MaxInstancesExceeded { max: usize },
    #[error("Selector value is not a whole-hour offset: {0:?}")]
    InvalidSelection(String),
    #[error("Config file parsing error: {0}")]
    ConfigFileParsingError(#[from] toml::de::Error),
}
