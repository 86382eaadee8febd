use serde::Serialize;
use std::fmt;

use crate::signing::RequestDate;

/// One 16-bit reading of each sensor channel
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RawSample {
    pub red: u16,
    pub green: u16,
    pub blue: u16,
}

/// Mean of a sample window, scaled to 8 bits per channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AveragedColor {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}

impl AveragedColor {
    /// Render as `#RRGGBB` for logging
    pub fn hex(&self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.red, self.green, self.blue)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ColorClass {
    Red,
    Green,
    Yellow,
    Unknown,
}

impl ColorClass {
    pub fn label(&self) -> &'static str {
        match self {
            ColorClass::Red => "Red",
            ColorClass::Green => "Green",
            ColorClass::Yellow => "Yellow",
            ColorClass::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for ColorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Outbound telemetry record, serialized as the request body
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TelemetryEvent {
    pub id: String,
    pub date_of_req: String,
    #[serde(rename = "deviceId")]
    pub device_id: String,
    pub color: ColorClass,
}

impl TelemetryEvent {
    /// Build the event for a classified reading
    ///
    /// Returns None for `ColorClass::Unknown`, which is never published.
    pub fn for_reading(device_id: &str, date: &RequestDate, color: ColorClass) -> Option<Self> {
        if color == ColorClass::Unknown {
            return None;
        }

        let joined = date.joined();
        Some(TelemetryEvent {
            id: format!("{}-{}", device_id, joined),
            date_of_req: joined,
            device_id: device_id.to_string(),
            color,
        })
    }
}

/// Status and body of a completed submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishResult {
    pub status_code: u16,
    pub body: String,
}
