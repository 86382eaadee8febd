/// Signal processing for color readings: scaling, averaging and classification
use crate::models::{AveragedColor, ColorClass, RawSample};

/// Number of raw samples averaged per classification cycle
pub const SAMPLE_WINDOW: usize = 3;

// Classification thresholds on 8-bit channel values
const DOMINANCE_MARGIN: i16 = 50;
const YELLOW_MAX_SPREAD: i16 = 60;
const YELLOW_MIN_LEVEL: i16 = 100;

/// Scale a 16-bit channel value to 8 bits, rounding down
pub fn scale8(value: u16) -> u8 {
    // 65535 * 255 / 65535 = 255, so the result always fits
    (u32::from(value) * 255 / u32::from(u16::MAX)) as u8
}

/// Average a full window of samples
///
/// Every sample is scaled to 8 bits first, then each channel is averaged
/// independently with floor division.
pub fn average(samples: &[RawSample; SAMPLE_WINDOW]) -> AveragedColor {
    let mean = |channel: fn(&RawSample) -> u16| -> u8 {
        let sum: u32 = samples.iter().map(|s| u32::from(scale8(channel(s)))).sum();
        (sum / SAMPLE_WINDOW as u32) as u8
    };

    AveragedColor {
        red: mean(|s| s.red),
        green: mean(|s| s.green),
        blue: mean(|s| s.blue),
    }
}

/// Classify an averaged 8-bit color
///
/// Rules are checked in order, so a reading matching both the red and the
/// yellow rule is red.
pub fn classify(r: u8, g: u8, b: u8) -> ColorClass {
    let (r, g, b) = (i16::from(r), i16::from(g), i16::from(b));

    if r - (g + b) > DOMINANCE_MARGIN {
        ColorClass::Red
    } else if g - (r + b) > DOMINANCE_MARGIN {
        ColorClass::Green
    } else if (r - g).abs() < YELLOW_MAX_SPREAD && r > YELLOW_MIN_LEVEL && g > YELLOW_MIN_LEVEL {
        ColorClass::Yellow
    } else {
        ColorClass::Unknown
    }
}

/// Run one classification cycle over a sample window
pub fn process(samples: &[RawSample; SAMPLE_WINDOW]) -> (AveragedColor, ColorClass) {
    let averaged = average(samples);
    let class = classify(averaged.red, averaged.green, averaged.blue);
    (averaged, class)
}
