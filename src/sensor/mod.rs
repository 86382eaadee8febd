pub mod bus;
pub mod driver;

pub use bus::{open_linux_bus, BusTransport};
pub use driver::ColorSensor;
