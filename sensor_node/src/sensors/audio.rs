use super::{ADC_MAX, RawReader, Sampler};
use crate::errors::SampleError;
use std::sync::Arc;

/// Microphone envelope: the raw reading is the level.
pub struct LevelMeter {
    channel_id: String,
    reader: Arc<dyn RawReader>,
}

impl LevelMeter {
    pub fn new(channel_id: &str, reader: Arc<dyn RawReader>) -> Self {
        Self { channel_id: channel_id.to_string(), reader }
    }
}

impl Sampler for LevelMeter {
    fn sample(&self) -> Result<f64, SampleError> {
        match self.reader.read_raw(&self.channel_id)? {
            raw if raw > ADC_MAX => Err(SampleError::OutOfRange { raw }),
            raw => Ok(f64::from(raw)),
        }
    }
}
