//! Typed views over the BME280 configuration register fields.

/// Device power mode, the 2 low bits of the `ctrl_meas` register.
///
/// The hardware decodes both `0b01` and `0b10` as a one-shot trigger; the two
/// named codes are kept distinct so either can be commanded and read back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum Mode {
    /// No measurements, lowest power draw.
    #[default]
    Sleep = 0b00,
    /// Single measurement cycle, then automatic return to sleep.
    Forced = 0b01,
    /// Alternate encoding of the one-shot trigger.
    ForcedAlt = 0b10,
    /// Continuous cycling with the configured standby time between cycles.
    Normal = 0b11,
}

impl Mode {
    /// Decodes the 2-bit mode field of a raw `ctrl_meas` value.
    pub fn from_bits(value: u8) -> Self {
        match value & 0b11 {
            0b00 => Mode::Sleep,
            0b01 => Mode::Forced,
            0b10 => Mode::ForcedAlt,
            _ => Mode::Normal,
        }
    }

    pub fn bits(self) -> u8 {
        self as u8
    }

    /// `true` for either one-shot encoding.
    pub fn is_forced(self) -> bool {
        matches!(self, Mode::Forced | Mode::ForcedAlt)
    }
}

/// The three physical quantities the BME280 measures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sensor {
    Temperature,
    Humidity,
    Pressure,
}

/// Oversampling settings for temperature, pressure, and humidity.
///
/// Higher rates reduce noise through hardware averaging but lengthen the
/// measurement cycle. `Skipped` disables the channel entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
#[repr(u8)]
pub enum Oversampling {
    /// No measurement performed, output register held at its reset value.
    Skipped = 0,
    #[default]
    X1 = 1,
    X2 = 2,
    X4 = 3,
    X8 = 4,
    /// 16x oversampling, maximum precision and longest cycle.
    X16 = 5,
}

impl Oversampling {
    /// Decodes a 3-bit oversampling field read back from the device.
    ///
    /// The reserved patterns `0b110` and `0b111` act as 16x in hardware and
    /// decode accordingly.
    pub fn from_bits(value: u8) -> Self {
        match value & 0b111 {
            0 => Oversampling::Skipped,
            1 => Oversampling::X1,
            2 => Oversampling::X2,
            3 => Oversampling::X4,
            4 => Oversampling::X8,
            _ => Oversampling::X16,
        }
    }

    pub fn bits(self) -> u8 {
        self as u8
    }

    /// The actual sample-count multiplier: 0, 1, 2, 4, 8 or 16.
    pub fn multiplier(self) -> u32 {
        match self {
            Oversampling::Skipped => 0,
            Oversampling::X1 => 1,
            Oversampling::X2 => 2,
            Oversampling::X4 => 4,
            Oversampling::X8 => 8,
            Oversampling::X16 => 16,
        }
    }
}

impl TryFrom<u8> for Oversampling {
    type Error = ();

    /// Strict conversion for externally supplied raw values; rejects
    /// anything outside the enumerated table.
    fn try_from(value: u8) -> Result<Self, ()> {
        if value > 5 {
            return Err(());
        }
        Ok(Oversampling::from_bits(value))
    }
}

/// IIR filter coefficient, bits 4:2 of the `config` register.
///
/// The filter smooths short-term disturbances in pressure and temperature
/// readings. It does not affect humidity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum Filter {
    /// Filter disabled.
    #[default]
    Off = 0,
    X2 = 1,
    X4 = 2,
    X8 = 3,
    X16 = 4,
}

impl Filter {
    /// Decodes the 3-bit filter field; reserved patterns act as coefficient 16.
    pub fn from_bits(value: u8) -> Self {
        match value & 0b111 {
            0 => Filter::Off,
            1 => Filter::X2,
            2 => Filter::X4,
            3 => Filter::X8,
            _ => Filter::X16,
        }
    }

    pub fn bits(self) -> u8 {
        self as u8
    }
}

/// Standby (inactive) duration between cycles in normal mode, bits 7:5 of
/// the `config` register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum StandbyTime {
    /// 0.5 ms
    #[default]
    Millis0_5 = 0b000,
    /// 62.5 ms
    Millis62_5 = 0b001,
    Millis125 = 0b010,
    Millis250 = 0b011,
    Millis500 = 0b100,
    Millis1000 = 0b101,
    Millis10 = 0b110,
    Millis20 = 0b111,
}

impl StandbyTime {
    pub fn from_bits(value: u8) -> Self {
        match value & 0b111 {
            0b000 => StandbyTime::Millis0_5,
            0b001 => StandbyTime::Millis62_5,
            0b010 => StandbyTime::Millis125,
            0b011 => StandbyTime::Millis250,
            0b100 => StandbyTime::Millis500,
            0b101 => StandbyTime::Millis1000,
            0b110 => StandbyTime::Millis10,
            _ => StandbyTime::Millis20,
        }
    }

    pub fn bits(self) -> u8 {
        self as u8
    }

    /// The standby duration in microseconds.
    pub fn micros(self) -> u32 {
        match self {
            StandbyTime::Millis0_5 => 500,
            StandbyTime::Millis62_5 => 62_500,
            StandbyTime::Millis125 => 125_000,
            StandbyTime::Millis250 => 250_000,
            StandbyTime::Millis500 => 500_000,
            StandbyTime::Millis1000 => 1_000_000,
            StandbyTime::Millis10 => 10_000,
            StandbyTime::Millis20 => 20_000,
        }
    }
}

/// Which conversion-time constants to use when estimating a cycle duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeasureTiming {
    /// Typical conversion times from the datasheet.
    Typical,
    /// Worst-case conversion times.
    Maximum,
}
