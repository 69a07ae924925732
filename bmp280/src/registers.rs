pub const CALIB00: u8 = 0x88;
pub const ID: u8 = 0xD0;
pub const RESET: u8 = 0xE0;
pub const STATUS: u8 = 0xF3;
pub const CTRL_MEAS: u8 = 0xF4;
pub const CONFIG: u8 = 0xF5;
pub const PRESS_MSB: u8 = 0xF7;
pub const PRESS_LSB: u8 = 0xF8;
pub const PRESS_XLSB: u8 = 0xF9;
pub const TEMP_MSB: u8 = 0xFA;
pub const TEMP_LSB: u8 = 0xFB;
pub const TEMP_XLSB: u8 = 0xFC;
