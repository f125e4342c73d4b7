pub mod adc;
pub mod audio;
pub mod thermal;

use crate::errors::SampleError;
use serde::Deserialize;
use std::sync::Arc;

/// 12-bit ADC full scale.
pub const ADC_MAX: u16 = 4095;

/// Hardware seam: one raw conversion for a channel.
#[cfg_attr(test, mockall::automock)]
pub trait RawReader: Send + Sync {
    fn read_raw(&self, channel: &str) -> Result<u16, SampleError>;
}

/// The sampling function a channel's task calls once per cycle.
pub trait Sampler: Send + Sync {
    fn sample(&self) -> Result<f64, SampleError>;
}

impl<F> Sampler for F
where
    F: Fn() -> Result<f64, SampleError> + Send + Sync,
{
    fn sample(&self) -> Result<f64, SampleError> {
        self()
    }
}

/// Which conversion sits between the ADC and the printed value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorKind {
    Thermistor,
    Level,
}

impl SensorKind {
    pub fn default_precision(self) -> usize {
        match self {
            SensorKind::Thermistor => 2,
            SensorKind::Level => 0,
        }
    }
}

pub fn build_sampler(kind: SensorKind, channel_id: &str, reader: Arc<dyn RawReader>) -> Arc<dyn Sampler> {
    match kind {
        SensorKind::Thermistor => Arc::new(thermal::Thermistor::new(channel_id, reader)),
        SensorKind::Level => Arc::new(audio::LevelMeter::new(channel_id, reader)),
    }
}
