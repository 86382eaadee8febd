/// RGB light sensor driver and register decoding
use log::{debug, info};

use crate::error::NodeError;
use crate::models::RawSample;
use crate::processing::SAMPLE_WINDOW;
use crate::sensor::bus::BusTransport;

// Register map constants
const CONFIG_REGISTER: u8 = 0x01; // Configuration register 1
const CONFIG_RGB_16BIT: u8 = 0x05; // Mode: green+red+blue, 16-bit ADC
const DATA_REGISTER: u8 = 0x09; // Green channel low byte, start of data block
const DATA_LEN: usize = 6; // Three 16-bit channels

/// Decode a raw data block into channel values
///
/// The data block is laid out as the sensor stores it:
/// - Bytes 0-1: Green (little-endian u16)
/// - Bytes 2-3: Red (little-endian u16)
/// - Bytes 4-5: Blue (little-endian u16)
pub fn decode_raw_sample(data: &[u8]) -> Result<RawSample, NodeError> {
    if data.len() != DATA_LEN {
        return Err(NodeError::Bus(format!(
            "Invalid sensor data block: expected {} bytes, got {}",
            DATA_LEN,
            data.len()
        )));
    }

    Ok(RawSample {
        green: u16::from_le_bytes([data[0], data[1]]),
        red: u16::from_le_bytes([data[2], data[3]]),
        blue: u16::from_le_bytes([data[4], data[5]]),
    })
}

/// A configured color sensor that owns the bus handle
pub struct ColorSensor<B> {
    bus: B,
    address: u8,
}

impl<B: BusTransport> ColorSensor<B> {
    /// Find the sensor on the bus and switch it to RGB sampling mode
    ///
    /// The first responding address is used. Fails with
    /// `NodeError::DeviceNotFound` when the bus is empty; the caller is
    /// expected to drop the bus and try again later.
    pub fn discover(mut bus: B) -> Result<Self, NodeError> {
        let devices = bus.discover();
        let address = match devices.first() {
            Some(addr) => *addr,
            None => return Err(NodeError::DeviceNotFound),
        };

        info!(
            "I2C addresses found: {:?}",
            devices
                .iter()
                .map(|d| format!("0x{:02X}", d))
                .collect::<Vec<_>>()
        );

        bus.write_register(address, CONFIG_REGISTER, &[CONFIG_RGB_16BIT])?;

        Ok(ColorSensor { bus, address })
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    /// Read one sample of all three channels
    pub fn read_raw(&mut self) -> Result<RawSample, NodeError> {
        let mut data = [0u8; DATA_LEN];
        self.bus
            .read_register(self.address, DATA_REGISTER, &mut data)?;
        let sample = decode_raw_sample(&data)?;
        debug!(
            "16-bit RGB: {} {} {}",
            sample.red, sample.green, sample.blue
        );
        Ok(sample)
    }

    /// Read a full averaging window of consecutive samples
    pub fn read_window(&mut self) -> Result<[RawSample; SAMPLE_WINDOW], NodeError> {
        let mut window = [RawSample::default(); SAMPLE_WINDOW];
        for slot in window.iter_mut() {
            *slot = self.read_raw()?;
        }
        Ok(window)
    }
}
