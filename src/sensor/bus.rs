/// Two-wire bus access used by the sensor driver
use embedded_hal::i2c::{Error as _, I2c};
use linux_embedded_hal::I2cdev;

use crate::error::NodeError;

// Probe range: 7-bit addresses outside the reserved blocks
const FIRST_PROBE_ADDRESS: u8 = 0x08;
const LAST_PROBE_ADDRESS: u8 = 0x77;

/// Register-level bus operations needed by the driver
pub trait BusTransport {
    /// Addresses of all devices that acknowledge on the bus
    fn discover(&mut self) -> Vec<u8>;

    fn write_register(&mut self, addr: u8, reg: u8, bytes: &[u8]) -> Result<(), NodeError>;

    /// Fill `buf` with contiguous bytes starting at `reg`
    fn read_register(&mut self, addr: u8, reg: u8, buf: &mut [u8]) -> Result<(), NodeError>;
}

/// Adapter from any embedded-hal I2C controller to [`BusTransport`]
pub struct I2cBus<I> {
    i2c: I,
}

impl<I: I2c> I2cBus<I> {
    pub fn new(i2c: I) -> Self {
        Self { i2c }
    }
}

impl<I: I2c> BusTransport for I2cBus<I> {
    fn discover(&mut self) -> Vec<u8> {
        (FIRST_PROBE_ADDRESS..=LAST_PROBE_ADDRESS)
            .filter(|&addr| {
                let mut probe = [0u8; 1];
                self.i2c.read(addr, &mut probe).is_ok()
            })
            .collect()
    }

    fn write_register(&mut self, addr: u8, reg: u8, bytes: &[u8]) -> Result<(), NodeError> {
        let mut frame = Vec::with_capacity(bytes.len() + 1);
        frame.push(reg);
        frame.extend_from_slice(bytes);

        self.i2c.write(addr, &frame).map_err(|e| {
            NodeError::Bus(format!(
                "write to 0x{:02X} register 0x{:02X} failed: {:?}",
                addr,
                reg,
                e.kind()
            ))
        })
    }

    fn read_register(&mut self, addr: u8, reg: u8, buf: &mut [u8]) -> Result<(), NodeError> {
        self.i2c.write_read(addr, &[reg], buf).map_err(|e| {
            NodeError::Bus(format!(
                "read from 0x{:02X} register 0x{:02X} failed: {:?}",
                addr,
                reg,
                e.kind()
            ))
        })
    }
}

/// Open a Linux I2C character device such as `/dev/i2c-1`
pub fn open_linux_bus(path: &str) -> Result<I2cBus<I2cdev>, NodeError> {
    I2cdev::new(path)
        .map(I2cBus::new)
        .map_err(|e| NodeError::Bus(format!("Failed to open {}: {}", path, e)))
}
