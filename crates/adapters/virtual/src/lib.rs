//! # sensorhub-adapter-virtual
//!
//! Simulated drivers for development boards without real hardware attached,
//! and for tests.
//!
//! ## Provided drivers
//!
//! | Type tag | Inputs | Read data | Actions |
//! |----------|--------|-----------|---------|
//! | `dout` | `pin_no`, `initial_value`? | `value` | `toggle`, `set_output`, `turn_on`, `turn_off` |
//! | `din` | `pin_no`, `mode`? | `value` | `set_level` |
//! | `pir` | `pin_no` | `motion` | `trigger` |
//! | `dht11` | `pin_no`, `fail_every`? | `temperature`, `humidity` | – |
//! | `vcgen` | `thermal_zone`? | `cpu_temperature` | – |
//! | `lcd1602` | `address`, `backlight`? | `lines`, `backlight` | `display_text`, `append_text`, `clear` |
//!
//! ## Dependency rule
//!
//! Depends on `sensorhub-app` (port traits) and `sensorhub-domain` only.

mod drivers;
mod inputs;

use sensorhub_app::registry::DriverCatalog;

pub use drivers::{
    CharacterLcdDriver, DigitalInputDriver, DigitalOutputDriver, Dht11Driver, MotionSensorDriver,
    Pull, SocTemperatureDriver,
};

/// Register every simulated driver under its type tag.
pub fn register_all(catalog: &mut DriverCatalog) {
    catalog
        .register(DigitalOutputDriver)
        .register(DigitalInputDriver)
        .register(MotionSensorDriver)
        .register(Dht11Driver)
        .register(SocTemperatureDriver::default())
        .register(CharacterLcdDriver);
}

/// A catalog holding every simulated driver.
#[must_use]
pub fn catalog() -> DriverCatalog {
    let mut catalog = DriverCatalog::new();
    register_all(&mut catalog);
    catalog
}
