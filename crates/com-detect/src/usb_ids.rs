//! USB Vendor ID database for known serial adapters
//!
//! Used to give ports a readable description when the OS does not report
//! USB product or manufacturer strings.

/// FTDI (Future Technology Devices International)
pub const FTDI_VID: u16 = 0x0403;
/// Silicon Labs CP210x
pub const CP210X_VID: u16 = 0x10C4;
/// WCH CH340/CH341
pub const CH340_VID: u16 = 0x1A86;
/// Prolific PL2303
pub const PROLIFIC_VID: u16 = 0x067B;

/// Boards that expose a CDC-ACM port directly
pub mod cdc {
    pub const ARDUINO_VID: u16 = 0x2341;
    pub const STMICRO_VID: u16 = 0x0483;
    pub const RASPBERRY_PI_VID: u16 = 0x2E8A;
    pub const ESPRESSIF_VID: u16 = 0x303A;
}

/// Get adapter family name from VID
pub fn adapter_name(vid: u16) -> Option<&'static str> {
    match vid {
        FTDI_VID => Some("FTDI"),
        CP210X_VID => Some("CP210x"),
        CH340_VID => Some("CH340"),
        PROLIFIC_VID => Some("PL2303"),
        cdc::ARDUINO_VID => Some("Arduino"),
        cdc::STMICRO_VID => Some("STMicroelectronics CDC"),
        cdc::RASPBERRY_PI_VID => Some("Raspberry Pi"),
        cdc::ESPRESSIF_VID => Some("Espressif USB JTAG/serial"),
        _ => None,
    }
}
