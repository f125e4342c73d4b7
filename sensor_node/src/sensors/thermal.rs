use super::{ADC_MAX, RawReader, Sampler};
use crate::errors::SampleError;
use std::sync::Arc;

// NTC thermistor on a 100k divider
pub const THERMISTOR_NOMINAL_OHMS: f64 = 100_000.0;
pub const SERIES_RESISTOR_OHMS: f64 = 100_000.0;
pub const TEMPERATURE_NOMINAL_C: f64 = 25.0;
pub const B_COEFFICIENT: f64 = 3950.0;

const KELVIN_OFFSET: f64 = 273.15;

/// Beta-equation conversion from a raw 12-bit reading to °C.
///
/// raw == 0 and raw == full scale put a zero in the divider maths; both are
/// reported as out of range rather than printed as inf/NaN.
pub fn celsius_from_raw(raw: u16) -> Result<f64, SampleError> {
    if raw == 0 || raw >= ADC_MAX {
        return Err(SampleError::OutOfRange { raw });
    }

    let ratio = f64::from(ADC_MAX) / f64::from(raw) - 1.0;
    let resistance = SERIES_RESISTOR_OHMS / ratio;

    let mut steinhart = (resistance / THERMISTOR_NOMINAL_OHMS).ln();
    steinhart /= B_COEFFICIENT;
    steinhart += 1.0 / (TEMPERATURE_NOMINAL_C + KELVIN_OFFSET);
    if steinhart == 0.0 {
        return Err(SampleError::Undefined("zero steinhart term"));
    }
    let celsius = 1.0 / steinhart - KELVIN_OFFSET;

    if celsius.is_finite() {
        Ok(celsius)
    } else {
        Err(SampleError::Undefined("non-finite temperature"))
    }
}

pub struct Thermistor {
    channel_id: String,
    reader: Arc<dyn RawReader>,
}

impl Thermistor {
    pub fn new(channel_id: &str, reader: Arc<dyn RawReader>) -> Self {
        Self { channel_id: channel_id.to_string(), reader }
    }
}

impl Sampler for Thermistor {
    fn sample(&self) -> Result<f64, SampleError> {
        let raw = self.reader.read_raw(&self.channel_id)?;
        celsius_from_raw(raw)
    }
}
