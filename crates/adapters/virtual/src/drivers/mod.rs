//! Simulated driver implementations, one module per sensor kind.

mod dht11;
mod din;
mod dout;
mod lcd1602;
mod pir;
mod vcgen;

pub use dht11::Dht11Driver;
pub use din::{DigitalInputDriver, Pull};
pub use dout::DigitalOutputDriver;
pub use lcd1602::CharacterLcdDriver;
pub use pir::MotionSensorDriver;
pub use vcgen::SocTemperatureDriver;
