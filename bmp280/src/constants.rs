pub const CHIP_ID: u8 = 0x58;

pub const READ_FLAG: u8 = 0x80;
pub const WRITE_MASK: u8 = 0x7F;

pub const SOFT_RESET: u8 = 0xB6;

pub const CALIBRATION_LEN: usize = 24;
pub const DATA_LEN: usize = 6;

// ctrl_meas
pub const OSRS_T_SHIFT: u8 = 5;
pub const OSRS_P_SHIFT: u8 = 2;
pub const MODE_SLEEP: u8 = 0b00;
pub const MODE_FORCED: u8 = 0b01;
pub const MODE_NORMAL: u8 = 0b11;

// config
pub const T_SB_SHIFT: u8 = 5;
pub const FILTER_SHIFT: u8 = 2;
pub const SPI3W_EN: u8 = 0x01;

// Bus defaults when the device properties leave them out
pub const DEFAULT_MAX_SPEED_HZ: u32 = 1_000_000;
pub const DEFAULT_BITS_PER_WORD: u8 = 8;

pub const MAX_SPEED_HZ_PROPERTY: &str = "spi-max-frequency";
pub const BITS_PER_WORD_PROPERTY: &str = "spi-bits-per-word";
