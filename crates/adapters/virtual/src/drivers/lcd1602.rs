//! 16x2 character LCD on an I2C backpack — responds to `display_text`,
//! `append_text`, `clear`.

use std::sync::{Mutex, MutexGuard, PoisonError};

use sensorhub_app::ports::{Sensor, SensorDriver};
use sensorhub_domain::definition::Inputs;
use sensorhub_domain::error::DriverError;
use serde_json::{Value, json};

use crate::inputs;

const COLUMNS: usize = 16;
const ROWS: usize = 2;

/// Driver for `lcd1602`. Inputs: `address`, optional `backlight`.
pub struct CharacterLcdDriver;

impl SensorDriver for CharacterLcdDriver {
    fn sensor_type(&self) -> &'static str {
        "lcd1602"
    }

    fn instantiate(&self, inputs: &Inputs) -> Result<Box<dyn Sensor>, DriverError> {
        let address = inputs::i2c_address(inputs)?;
        tracing::debug!(address = %format!("{address:#04x}"), "opened character display");
        Ok(Box::new(CharacterLcd {
            address,
            screen: Mutex::new(Screen::default()),
        }))
    }
}

#[derive(Default)]
struct Screen {
    text: String,
    backlight: bool,
}

impl Screen {
    /// Visible rows: explicit newlines first, then wrap at the column limit.
    fn rows(&self) -> Vec<String> {
        let mut rows: Vec<String> = Vec::with_capacity(ROWS);
        for line in self.text.split('\n') {
            let chars: Vec<char> = line.chars().collect();
            if chars.is_empty() {
                rows.push(String::new());
            }
            for chunk in chars.chunks(COLUMNS) {
                rows.push(chunk.iter().collect());
            }
        }
        rows.resize(ROWS, String::new());
        rows
    }

    /// Drop whatever would land below the last row.
    fn clamp(&mut self) {
        let mut row = 0;
        let mut column = 0;
        let mut cut = None;
        for (index, ch) in self.text.char_indices() {
            if ch == '\n' || column == COLUMNS {
                row += 1;
                column = 0;
                if row == ROWS {
                    cut = Some(index);
                    break;
                }
            }
            if ch != '\n' {
                column += 1;
            }
        }
        if let Some(cut) = cut {
            self.text.truncate(cut);
        }
    }
}

pub struct CharacterLcd {
    address: u8,
    screen: Mutex<Screen>,
}

impl CharacterLcd {
    fn screen(&self) -> MutexGuard<'_, Screen> {
        self.screen.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Sensor for CharacterLcd {
    fn read(&self) -> Result<Value, DriverError> {
        let screen = self.screen();
        Ok(json!({ "lines": screen.rows(), "backlight": screen.backlight }))
    }

    fn status(&self) -> Value {
        json!({
            "address": format!("{:#04x}", self.address),
            "columns": COLUMNS,
            "rows": ROWS,
        })
    }

    fn execute(&self, action: &str, params: &Value) -> Result<Value, DriverError> {
        let mut screen = self.screen();
        match action {
            "display_text" => {
                let text = inputs::text_param(params, "text")?.unwrap_or_default();
                if inputs::bool_param(params, "clear")?.unwrap_or(true) {
                    screen.text.clear();
                }
                screen.text.push_str(text);
            }
            "append_text" => {
                let text = inputs::text_param(params, "text")?.unwrap_or_default();
                screen.text.push_str(text);
            }
            "clear" => screen.text.clear(),
            other => return Err(DriverError::UnsupportedAction(other.to_string())),
        }
        screen.clamp();
        Ok(json!({ "lines": screen.rows() }))
    }

    fn configure(&self, inputs: &Inputs) -> Result<(), DriverError> {
        self.screen().backlight = inputs::flag(inputs, "backlight", true)?;
        Ok(())
    }
}
