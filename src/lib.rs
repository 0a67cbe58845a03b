//! Driver for the Bosch BME280 combined temperature, humidity and pressure
//! sensor.
//!
//! # Features
//!
//! - `no_std`, built on the `embedded-hal` 1.0 traits
//! - I2C, hardware SPI and bit-banged SPI transports behind one [`Bus`] trait
//! - Oversampling, power mode, IIR filter and standby time configuration
//! - Calibrated readings via the Bosch fixed-point compensation formulas
//! - Measurement-cycle duration estimates for scheduling
//!
//! # Units
//!
//! | Quantity    | Type          | Unit                              |
//! |-------------|---------------|-----------------------------------|
//! | Temperature | [`Temperature`] | centi-degrees Celsius (2508 = 25.08 C) |
//! | Pressure    | [`Pressure`]  | pascals                           |
//! | Humidity    | [`Humidity`]  | percent relative humidity x 100   |
//!
//! # Example
//!
//! ```no_run
//! use bme280_driver::{Bme280, I2cInterface, Mode, Oversampling, Sensor};
//! use embedded_hal_mock::eh1::{delay::NoopDelay, i2c::Mock as I2cMock};
//!
//! let i2c = I2cMock::new(&[]);
//! let mut delay = NoopDelay;
//!
//! let mut sensor = Bme280::new(I2cInterface::new(i2c, 0x76)).init(&mut delay)?;
//! sensor.set_oversampling(Sensor::Temperature, Oversampling::X2)?;
//! sensor.set_mode(Mode::Normal)?;
//!
//! let measurement = sensor.read(&mut delay)?;
//! let (celsius, centi) = measurement.temperature.split();
//! # Ok::<(), bme280_driver::error::Bme280Error<embedded_hal::i2c::ErrorKind>>(())
//! ```

#![cfg_attr(not(test), no_std)]

use core::marker::PhantomData;

use embedded_hal::delay::DelayNs;

pub mod bus;
mod calc;
pub mod settings;

pub use bus::{Bus, I2cInterface, SoftSpiInterface, SpiInterface};
pub use error::{Bme280Error, Result};
pub use settings::{Filter, MeasureTiming, Mode, Oversampling, Sensor, StandbyTime};

/// Value the chip-id register must report.
const CHIP_ID: u8 = 0x60;
/// Magic byte that triggers a soft reset when written to the reset register.
const RESET_CMD: u8 = 0xB6;

/// Status register: conversion in progress.
const STATUS_MEASURING: u8 = 1 << 3;
/// Status register: calibration copy from NVM in progress.
const STATUS_IM_UPDATE: u8 = 1 << 0;

/// ctrl_meas bits 1:0.
const MODE_MASK: u8 = 0b0000_0011;
/// ctrl_meas bits 7:5.
const OSRS_T_MASK: u8 = 0b1110_0000;
/// ctrl_meas bits 4:2.
const OSRS_P_MASK: u8 = 0b0001_1100;
/// ctrl_hum bits 2:0.
const OSRS_H_MASK: u8 = 0b0000_0111;
/// config bits 4:2.
const FILTER_MASK: u8 = 0b0001_1100;
/// config bits 7:5.
const STANDBY_MASK: u8 = 0b1110_0000;

/// Status polls before `read` gives up, unless reconfigured. At 500 us per
/// poll this is roughly one second.
const DEFAULT_STATUS_POLL_LIMIT: u32 = 2_000;

/// Register addresses.
mod regs {
    pub const CALIB_TP: u8 = 0x88;
    pub const CHIP_ID: u8 = 0xD0;
    pub const RESET: u8 = 0xE0;
    pub const CALIB_HUM: u8 = 0xE1;
    pub const CTRL_HUM: u8 = 0xF2;
    pub const STATUS: u8 = 0xF3;
    pub const CTRL_MEAS: u8 = 0xF4;
    pub const CONFIG: u8 = 0xF5;
    pub const DATA_START: u8 = 0xF7;
}

pub mod error {
    /// Driver errors, generic over the transport error `E`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum Bme280Error<E> {
        /// Transport-level failure.
        Bus(E),
        /// The chip-id register did not report 0x60; wrong device or wiring.
        InvalidChipId(u8),
        /// The status register stayed busy past the configured poll limit.
        Timeout,
    }

    pub type Result<T, E> = core::result::Result<T, Bme280Error<E>>;
}

/// Factory calibration coefficients, read once during [`Bme280::init`].
///
/// H4 and H5 are 12-bit values packed across three registers: H4 is E4
/// joined with the low nibble of E5, H5 is E6 joined with the high nibble of
/// E5, both sign-extended from the high byte. The coefficients are stored as
/// read; implausible values flow through compensation unchecked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CalibData {
    pub dig_t1: u16,
    pub dig_t2: i16,
    pub dig_t3: i16,
    pub dig_p1: u16,
    pub dig_p2: i16,
    pub dig_p3: i16,
    pub dig_p4: i16,
    pub dig_p5: i16,
    pub dig_p6: i16,
    pub dig_p7: i16,
    pub dig_p8: i16,
    pub dig_p9: i16,
    pub dig_h1: u8,
    pub dig_h2: i16,
    pub dig_h3: u8,
    pub dig_h4: i16,
    pub dig_h5: i16,
    pub dig_h6: i8,
}

impl CalibData {
    /// Decodes the two calibration blocks: 26 bytes from 0x88 (temperature
    /// and pressure coefficients, H1 in the last byte) and 7 bytes from 0xE1
    /// (the remaining humidity coefficients). Multi-byte values are little
    /// endian except the packed H4/H5 pair.
    fn from_registers(tp: &[u8; 26], hum: &[u8; 7]) -> Self {
        CalibData {
            dig_t1: u16::from_le_bytes([tp[0], tp[1]]),
            dig_t2: i16::from_le_bytes([tp[2], tp[3]]),
            dig_t3: i16::from_le_bytes([tp[4], tp[5]]),
            dig_p1: u16::from_le_bytes([tp[6], tp[7]]),
            dig_p2: i16::from_le_bytes([tp[8], tp[9]]),
            dig_p3: i16::from_le_bytes([tp[10], tp[11]]),
            dig_p4: i16::from_le_bytes([tp[12], tp[13]]),
            dig_p5: i16::from_le_bytes([tp[14], tp[15]]),
            dig_p6: i16::from_le_bytes([tp[16], tp[17]]),
            dig_p7: i16::from_le_bytes([tp[18], tp[19]]),
            dig_p8: i16::from_le_bytes([tp[20], tp[21]]),
            dig_p9: i16::from_le_bytes([tp[22], tp[23]]),
            // tp[24] is the unused register 0xA0
            dig_h1: tp[25],
            dig_h2: i16::from_le_bytes([hum[0], hum[1]]),
            dig_h3: hum[2],
            dig_h4: ((hum[3] as i8 as i16) << 4) | ((hum[4] & 0x0F) as i16),
            dig_h5: ((hum[5] as i8 as i16) << 4) | ((hum[4] >> 4) as i16),
            dig_h6: hum[6] as i8,
        }
    }
}

/// Temperature in centi-degrees Celsius.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Temperature(pub i32);

impl Temperature {
    pub fn centi_celsius(self) -> i32 {
        self.0
    }

    /// Whole degrees and the centi-degree remainder, e.g. `(25, 8)` for
    /// 25.08 C. Both parts carry the sign of the reading.
    pub fn split(self) -> (i32, i32) {
        (self.0 / 100, self.0 % 100)
    }
}

/// Pressure in pascals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Pressure(pub u32);

impl Pressure {
    pub fn pascals(self) -> u32 {
        self.0
    }

    pub fn as_hpa(self) -> u32 {
        self.0 / 100
    }
}

/// Relative humidity in percent x 100.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Humidity(pub u32);

impl Humidity {
    pub fn centi_percent(self) -> u32 {
        self.0
    }

    /// Whole percent and the centi-percent remainder, e.g. `(54, 28)` for
    /// 54.28 %rH.
    pub fn split(self) -> (u32, u32) {
        (self.0 / 100, self.0 % 100)
    }
}

/// One compensated reading of all three channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Measurement {
    pub temperature: Temperature,
    pub pressure: Pressure,
    pub humidity: Humidity,
}

/// Typestate of a driver that has not yet talked to the device.
#[derive(Debug)]
pub struct Uninitialized;

/// Typestate of a verified, calibrated driver.
#[derive(Debug)]
pub struct Ready;

/// BME280 driver over any [`Bus`] transport.
///
/// Constructed with [`Bme280::new`] in the [`Uninitialized`] state;
/// [`Bme280::init`] verifies the chip id, loads the calibration and returns
/// the [`Ready`] driver that exposes configuration and measurement.
#[derive(Debug)]
pub struct Bme280<B, STATE> {
    bus: B,
    calib: CalibData,
    /// Last commanded power mode, used to re-trigger one-shot conversions.
    mode: Mode,
    /// `None` polls the status register without bound.
    status_poll_limit: Option<u32>,
    _state: PhantomData<STATE>,
}

impl<B, STATE> Bme280<B, STATE>
where
    B: Bus,
{
    fn read_into(&mut self, reg: u8, buf: &mut [u8]) -> Result<(), B::Error> {
        self.bus.read_regs(reg, buf).map_err(Bme280Error::Bus)
    }

    fn read_reg_byte(&mut self, reg: u8) -> Result<u8, B::Error> {
        let mut buf = [0u8; 1];
        self.read_into(reg, &mut buf)?;
        Ok(buf[0])
    }

    fn write_reg(&mut self, reg: u8, value: u8) -> Result<(), B::Error> {
        self.bus.write_reg(reg, value).map_err(Bme280Error::Bus)
    }

    fn load_calibration(&mut self) -> Result<CalibData, B::Error> {
        let mut tp = [0u8; 26];
        self.read_into(regs::CALIB_TP, &mut tp)?;
        let mut hum = [0u8; 7];
        self.read_into(regs::CALIB_HUM, &mut hum)?;
        Ok(CalibData::from_registers(&tp, &hum))
    }

    /// Reads the chip-id register. 0x60 identifies a BME280.
    pub fn chip_id(&mut self) -> Result<u8, B::Error> {
        self.read_reg_byte(regs::CHIP_ID)
    }

    /// Caps how many times [`Bme280::read`] polls the busy status before
    /// returning [`Bme280Error::Timeout`]. Polls are 500 us apart. `None`
    /// waits forever.
    pub fn set_status_poll_limit(&mut self, limit: Option<u32>) {
        self.status_poll_limit = limit;
    }

    /// Destroys the driver and returns the bus.
    pub fn free(self) -> B {
        self.bus
    }
}

impl<B> Bme280<B, Uninitialized>
where
    B: Bus,
{
    pub fn new(bus: B) -> Self {
        Bme280 {
            bus,
            calib: CalibData::default(),
            mode: Mode::Sleep,
            status_poll_limit: Some(DEFAULT_STATUS_POLL_LIMIT),
            _state: PhantomData,
        }
    }

    /// Verifies the chip id and loads the factory calibration.
    ///
    /// Waits 2 ms first so the device is usable straight after power-on.
    pub fn init<D>(mut self, delay: &mut D) -> Result<Bme280<B, Ready>, B::Error>
    where
        D: DelayNs,
    {
        delay.delay_ms(2);
        let id = self.chip_id()?;
        if id != CHIP_ID {
            return Err(Bme280Error::InvalidChipId(id));
        }
        let calib = self.load_calibration()?;
        Ok(Bme280 {
            bus: self.bus,
            calib,
            mode: Mode::Sleep,
            status_poll_limit: self.status_poll_limit,
            _state: PhantomData,
        })
    }
}

impl<B> Bme280<B, Ready>
where
    B: Bus,
{
    /// Commands a power mode and remembers it, so a later [`Bme280::read`]
    /// can re-trigger a one-shot conversion after the device drops back to
    /// sleep. Returns the commanded mode.
    pub fn set_mode(&mut self, mode: Mode) -> Result<Mode, B::Error> {
        let ctrl = self.read_reg_byte(regs::CTRL_MEAS)?;
        self.write_reg(regs::CTRL_MEAS, (ctrl & !MODE_MASK) | mode.bits())?;
        self.mode = mode;
        Ok(mode)
    }

    /// Reads the mode back from the device. A completed one-shot conversion
    /// reports [`Mode::Sleep`] even though the commanded mode was forced.
    pub fn mode(&mut self) -> Result<Mode, B::Error> {
        Ok(Mode::from_bits(self.read_reg_byte(regs::CTRL_MEAS)?))
    }

    /// Sets the oversampling rate of one channel, leaving the other register
    /// fields untouched.
    pub fn set_oversampling(&mut self, sensor: Sensor, rate: Oversampling) -> Result<(), B::Error> {
        match sensor {
            Sensor::Humidity => {
                let ctrl_hum = self.read_reg_byte(regs::CTRL_HUM)?;
                self.write_reg(regs::CTRL_HUM, (ctrl_hum & !OSRS_H_MASK) | rate.bits())?;
                // ctrl_hum changes only take effect after a ctrl_meas write
                let ctrl_meas = self.read_reg_byte(regs::CTRL_MEAS)?;
                self.write_reg(regs::CTRL_MEAS, ctrl_meas)
            }
            Sensor::Temperature => {
                let ctrl = self.read_reg_byte(regs::CTRL_MEAS)?;
                self.write_reg(regs::CTRL_MEAS, (ctrl & !OSRS_T_MASK) | (rate.bits() << 5))
            }
            Sensor::Pressure => {
                let ctrl = self.read_reg_byte(regs::CTRL_MEAS)?;
                self.write_reg(regs::CTRL_MEAS, (ctrl & !OSRS_P_MASK) | (rate.bits() << 2))
            }
        }
    }

    pub fn oversampling(&mut self, sensor: Sensor) -> Result<Oversampling, B::Error> {
        let bits = match sensor {
            Sensor::Humidity => self.read_reg_byte(regs::CTRL_HUM)?,
            Sensor::Temperature => self.read_reg_byte(regs::CTRL_MEAS)? >> 5,
            Sensor::Pressure => self.read_reg_byte(regs::CTRL_MEAS)? >> 2,
        };
        Ok(Oversampling::from_bits(bits))
    }

    /// Sets the IIR filter coefficient for temperature and pressure.
    pub fn set_filter(&mut self, filter: Filter) -> Result<(), B::Error> {
        let config = self.read_reg_byte(regs::CONFIG)?;
        self.write_reg(regs::CONFIG, (config & !FILTER_MASK) | (filter.bits() << 2))
    }

    pub fn filter(&mut self) -> Result<Filter, B::Error> {
        Ok(Filter::from_bits(self.read_reg_byte(regs::CONFIG)? >> 2))
    }

    /// Sets the inactive time between cycles in normal mode.
    pub fn set_standby_time(&mut self, standby: StandbyTime) -> Result<(), B::Error> {
        let config = self.read_reg_byte(regs::CONFIG)?;
        self.write_reg(
            regs::CONFIG,
            (config & !STANDBY_MASK) | (standby.bits() << 5),
        )
    }

    pub fn standby_time(&mut self) -> Result<StandbyTime, B::Error> {
        Ok(StandbyTime::from_bits(
            self.read_reg_byte(regs::CONFIG)? >> 5,
        ))
    }

    /// Estimates the duration of one measurement cycle in microseconds from
    /// the standby and oversampling settings currently on the device.
    pub fn measurement_time(&mut self, timing: MeasureTiming) -> Result<u32, B::Error> {
        let ctrl_meas = self.read_reg_byte(regs::CTRL_MEAS)?;
        let ctrl_hum = self.read_reg_byte(regs::CTRL_HUM)?;
        let config = self.read_reg_byte(regs::CONFIG)?;
        Ok(calc::measurement_time_us(
            timing,
            StandbyTime::from_bits(config >> 5),
            Oversampling::from_bits(ctrl_meas >> 5),
            Oversampling::from_bits(ctrl_meas >> 2),
            Oversampling::from_bits(ctrl_hum),
        ))
    }

    /// Soft-resets the device: all registers return to their power-on
    /// defaults. The calibration is reloaded afterwards and the remembered
    /// mode drops to [`Mode::Sleep`].
    pub fn reset<D>(&mut self, delay: &mut D) -> Result<(), B::Error>
    where
        D: DelayNs,
    {
        self.write_reg(regs::RESET, RESET_CMD)?;
        delay.delay_ms(2);
        let id = self.chip_id()?;
        if id != CHIP_ID {
            return Err(Bme280Error::InvalidChipId(id));
        }
        self.calib = self.load_calibration()?;
        self.mode = Mode::Sleep;
        Ok(())
    }

    /// Takes one compensated reading of all three channels.
    ///
    /// If the last commanded mode was a one-shot trigger and the device has
    /// already dropped back to sleep, the conversion is re-triggered first.
    /// Then the status register is polled until neither a conversion nor a
    /// calibration copy is in progress, bounded by the configured poll
    /// limit.
    pub fn read<D>(&mut self, delay: &mut D) -> Result<Measurement, B::Error>
    where
        D: DelayNs,
    {
        if self.mode.is_forced() {
            let ctrl = self.read_reg_byte(regs::CTRL_MEAS)?;
            if Mode::from_bits(ctrl) == Mode::Sleep {
                self.write_reg(regs::CTRL_MEAS, (ctrl & !MODE_MASK) | self.mode.bits())?;
            }
        }
        self.wait_ready(delay)?;

        let mut data = [0u8; 8];
        self.read_into(regs::DATA_START, &mut data)?;
        let adc_p = ((data[0] as i32) << 12) | ((data[1] as i32) << 4) | ((data[2] as i32) >> 4);
        let adc_t = ((data[3] as i32) << 12) | ((data[4] as i32) << 4) | ((data[5] as i32) >> 4);
        let adc_h = ((data[6] as i32) << 8) | (data[7] as i32);

        let temp = calc::compensate_temperature(adc_t, &self.calib);
        Ok(Measurement {
            temperature: Temperature(temp.temp_comp),
            pressure: Pressure(calc::compensate_pressure(temp.t_fine, adc_p, &self.calib)),
            humidity: Humidity(calc::compensate_humidity(temp.t_fine, adc_h, &self.calib)),
        })
    }

    fn wait_ready<D>(&mut self, delay: &mut D) -> Result<(), B::Error>
    where
        D: DelayNs,
    {
        let mut polls = 0u32;
        loop {
            let status = self.read_reg_byte(regs::STATUS)?;
            if status & (STATUS_MEASURING | STATUS_IM_UPDATE) == 0 {
                return Ok(());
            }
            if let Some(limit) = self.status_poll_limit {
                if polls >= limit {
                    return Err(Bme280Error::Timeout);
                }
            }
            polls += 1;
            delay.delay_us(500);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_hal_mock::eh1::delay::NoopDelay;
    use embedded_hal_mock::eh1::i2c::{Mock as I2cMock, Transaction as I2cTransaction};

    const ADDR: u8 = 0x76;

    /// Calibration block where t1 = t3 = 0 and t2 = 2048, reducing the
    /// temperature polynomial to `adc >> 3`.
    fn t2_only_blocks() -> ([u8; 26], [u8; 7]) {
        let mut tp = [0u8; 26];
        tp[2..4].copy_from_slice(&2048i16.to_le_bytes());
        (tp, [0u8; 7])
    }

    fn init_expectations(tp: &[u8; 26], hum: &[u8; 7]) -> Vec<I2cTransaction> {
        vec![
            I2cTransaction::write_read(ADDR, vec![regs::CHIP_ID], vec![0x60]),
            I2cTransaction::write_read(ADDR, vec![regs::CALIB_TP], tp.to_vec()),
            I2cTransaction::write_read(ADDR, vec![regs::CALIB_HUM], hum.to_vec()),
        ]
    }

    fn ready_sensor(
        extra: Vec<I2cTransaction>,
    ) -> (Bme280<I2cInterface<I2cMock>, Ready>, I2cMock) {
        let (tp, hum) = t2_only_blocks();
        let mut expectations = init_expectations(&tp, &hum);
        expectations.extend(extra);
        let i2c = I2cMock::new(&expectations);
        let sensor = Bme280::new(I2cInterface::new(i2c.clone(), ADDR))
            .init(&mut NoopDelay)
            .unwrap();
        (sensor, i2c)
    }

    #[test]
    fn init_verifies_chip_id_and_loads_calibration() {
        let (sensor, mut i2c) = ready_sensor(vec![]);
        assert_eq!(sensor.calib.dig_t2, 2048);
        assert_eq!(sensor.mode, Mode::Sleep);
        i2c.done();
    }

    #[test]
    fn init_rejects_unknown_chip() {
        let mut i2c = I2cMock::new(&[I2cTransaction::write_read(
            ADDR,
            vec![regs::CHIP_ID],
            vec![0x55],
        )]);
        let result = Bme280::new(I2cInterface::new(i2c.clone(), ADDR)).init(&mut NoopDelay);
        assert_eq!(result.err(), Some(Bme280Error::InvalidChipId(0x55)));
        i2c.done();
    }

    #[test]
    fn calibration_packs_h4_h5_nibbles() {
        let tp = [0u8; 26];
        let hum = [0x00, 0x00, 0x00, 0xAB, 0xCD, 0xEF, 0xFF];
        let cal = CalibData::from_registers(&tp, &hum);
        // h4 = 0xAB:0xD, h5 = 0xEF:0xC, both sign-extended from 12 bits
        assert_eq!(cal.dig_h4, -1347);
        assert_eq!(cal.dig_h5, -260);
        assert_eq!(cal.dig_h6, -1);
    }

    #[test]
    fn calibration_word_order_and_h1_position() {
        let mut tp = [0u8; 26];
        tp[0] = 0x70;
        tp[1] = 0x6B; // t1 = 27504 little endian
        tp[6] = 0x7D;
        tp[7] = 0x8E; // p1 = 36477
        tp[25] = 75; // h1 lives at 0xA1, after the 0xA0 gap
        let cal = CalibData::from_registers(&tp, &[0u8; 7]);
        assert_eq!(cal.dig_t1, 27504);
        assert_eq!(cal.dig_p1, 36477);
        assert_eq!(cal.dig_h1, 75);
    }

    #[test]
    fn pressure_oversampling_preserves_neighbor_bits() {
        let (mut sensor, mut i2c) = ready_sensor(vec![
            I2cTransaction::write_read(ADDR, vec![regs::CTRL_MEAS], vec![0xA3]),
            I2cTransaction::write(ADDR, vec![regs::CTRL_MEAS, 0xAF]),
        ]);
        sensor.set_oversampling(Sensor::Pressure, Oversampling::X4).unwrap();
        i2c.done();
    }

    #[test]
    fn humidity_oversampling_latches_via_ctrl_meas() {
        let (mut sensor, mut i2c) = ready_sensor(vec![
            I2cTransaction::write_read(ADDR, vec![regs::CTRL_HUM], vec![0x80]),
            I2cTransaction::write(ADDR, vec![regs::CTRL_HUM, 0x82]),
            I2cTransaction::write_read(ADDR, vec![regs::CTRL_MEAS], vec![0x27]),
            I2cTransaction::write(ADDR, vec![regs::CTRL_MEAS, 0x27]),
        ]);
        sensor.set_oversampling(Sensor::Humidity, Oversampling::X2).unwrap();
        i2c.done();
    }

    #[test]
    fn oversampling_read_back() {
        let (mut sensor, mut i2c) = ready_sensor(vec![
            I2cTransaction::write_read(ADDR, vec![regs::CTRL_MEAS], vec![0b101_011_00]),
            I2cTransaction::write_read(ADDR, vec![regs::CTRL_MEAS], vec![0b101_011_00]),
            I2cTransaction::write_read(ADDR, vec![regs::CTRL_HUM], vec![0x02]),
        ]);
        assert_eq!(
            sensor.oversampling(Sensor::Temperature).unwrap(),
            Oversampling::X16
        );
        assert_eq!(
            sensor.oversampling(Sensor::Pressure).unwrap(),
            Oversampling::X4
        );
        assert_eq!(
            sensor.oversampling(Sensor::Humidity).unwrap(),
            Oversampling::X2
        );
        i2c.done();
    }

    #[test]
    fn mode_round_trip() {
        let (mut sensor, mut i2c) = ready_sensor(vec![
            I2cTransaction::write_read(ADDR, vec![regs::CTRL_MEAS], vec![0x24]),
            I2cTransaction::write(ADDR, vec![regs::CTRL_MEAS, 0x27]),
            I2cTransaction::write_read(ADDR, vec![regs::CTRL_MEAS], vec![0x27]),
        ]);
        assert_eq!(sensor.set_mode(Mode::Normal).unwrap(), Mode::Normal);
        assert_eq!(sensor.mode().unwrap(), Mode::Normal);
        i2c.done();
    }

    #[test]
    fn filter_and_standby_share_config_register() {
        let (mut sensor, mut i2c) = ready_sensor(vec![
            I2cTransaction::write_read(ADDR, vec![regs::CONFIG], vec![0xA1]),
            I2cTransaction::write(ADDR, vec![regs::CONFIG, 0xA9]),
            I2cTransaction::write_read(ADDR, vec![regs::CONFIG], vec![0x08]),
            I2cTransaction::write(ADDR, vec![regs::CONFIG, 0xA8]),
            I2cTransaction::write_read(ADDR, vec![regs::CONFIG], vec![0xA8]),
            I2cTransaction::write_read(ADDR, vec![regs::CONFIG], vec![0xA8]),
        ]);
        sensor.set_filter(Filter::X4).unwrap();
        sensor.set_standby_time(StandbyTime::Millis1000).unwrap();
        assert_eq!(sensor.filter().unwrap(), Filter::X4);
        assert_eq!(sensor.standby_time().unwrap(), StandbyTime::Millis1000);
        i2c.done();
    }

    #[test]
    fn forced_read_retriggers_and_compensates() {
        // raw temperature 860000 = 0xD1F60, 21.00 C with the t2-only
        // calibration; pressure and humidity collapse to zero
        let burst = vec![0x00, 0x00, 0x00, 0xD1, 0xF6, 0x00, 0x00, 0x00];
        let (mut sensor, mut i2c) = ready_sensor(vec![
            I2cTransaction::write_read(ADDR, vec![regs::CTRL_MEAS], vec![0x24]),
            I2cTransaction::write(ADDR, vec![regs::CTRL_MEAS, 0x25]),
            // device finished the one-shot and reads back as sleeping
            I2cTransaction::write_read(ADDR, vec![regs::CTRL_MEAS], vec![0x24]),
            I2cTransaction::write(ADDR, vec![regs::CTRL_MEAS, 0x25]),
            I2cTransaction::write_read(ADDR, vec![regs::STATUS], vec![0x00]),
            I2cTransaction::write_read(ADDR, vec![regs::DATA_START], burst),
        ]);
        sensor.set_mode(Mode::Forced).unwrap();
        let m = sensor.read(&mut NoopDelay).unwrap();
        assert_eq!(m.temperature, Temperature(2100));
        assert_eq!(m.temperature.split(), (21, 0));
        assert_eq!(m.pressure, Pressure(0));
        assert_eq!(m.humidity, Humidity(0));
        i2c.done();
    }

    #[test]
    fn alternate_forced_code_skips_retrigger_while_measuring() {
        let burst = vec![0x00; 8];
        let (mut sensor, mut i2c) = ready_sensor(vec![
            I2cTransaction::write_read(ADDR, vec![regs::CTRL_MEAS], vec![0x24]),
            I2cTransaction::write(ADDR, vec![regs::CTRL_MEAS, 0x26]),
            // still converting, mode bits read back 0b10: no second trigger
            I2cTransaction::write_read(ADDR, vec![regs::CTRL_MEAS], vec![0x26]),
            I2cTransaction::write_read(ADDR, vec![regs::STATUS], vec![0x00]),
            I2cTransaction::write_read(ADDR, vec![regs::DATA_START], burst),
        ]);
        sensor.set_mode(Mode::ForcedAlt).unwrap();
        sensor.read(&mut NoopDelay).unwrap();
        i2c.done();
    }

    #[test]
    fn status_poll_limit_times_out() {
        let busy = vec![STATUS_MEASURING];
        let (mut sensor, mut i2c) = ready_sensor(vec![
            I2cTransaction::write_read(ADDR, vec![regs::STATUS], busy.clone()),
            I2cTransaction::write_read(ADDR, vec![regs::STATUS], busy.clone()),
            I2cTransaction::write_read(ADDR, vec![regs::STATUS], busy),
        ]);
        sensor.set_status_poll_limit(Some(2));
        assert_eq!(sensor.read(&mut NoopDelay).err(), Some(Bme280Error::Timeout));
        i2c.done();
    }

    #[test]
    fn unbounded_polling_waits_out_the_busy_phase() {
        let (mut sensor, mut i2c) = ready_sensor(vec![
            I2cTransaction::write_read(
                ADDR,
                vec![regs::STATUS],
                vec![STATUS_MEASURING | STATUS_IM_UPDATE],
            ),
            I2cTransaction::write_read(ADDR, vec![regs::STATUS], vec![STATUS_IM_UPDATE]),
            I2cTransaction::write_read(ADDR, vec![regs::STATUS], vec![0x00]),
            I2cTransaction::write_read(ADDR, vec![regs::DATA_START], vec![0x00; 8]),
        ]);
        sensor.set_status_poll_limit(None);
        sensor.read(&mut NoopDelay).unwrap();
        i2c.done();
    }

    #[test]
    fn measurement_time_reads_device_settings() {
        let (mut sensor, mut i2c) = ready_sensor(vec![
            I2cTransaction::write_read(ADDR, vec![regs::CTRL_MEAS], vec![0x27]),
            I2cTransaction::write_read(ADDR, vec![regs::CTRL_HUM], vec![0x01]),
            I2cTransaction::write_read(ADDR, vec![regs::CONFIG], vec![0x00]),
        ]);
        // 1x oversampling on all channels, 0.5 ms standby, typical constants
        assert_eq!(sensor.measurement_time(MeasureTiming::Typical).unwrap(), 8_500);
        i2c.done();
    }

    #[test]
    fn reset_reloads_calibration_and_sleeps() {
        let (tp, hum) = t2_only_blocks();
        let mut extra = vec![
            I2cTransaction::write(ADDR, vec![regs::RESET, RESET_CMD]),
            I2cTransaction::write_read(ADDR, vec![regs::CHIP_ID], vec![0x60]),
        ];
        extra.push(I2cTransaction::write_read(
            ADDR,
            vec![regs::CALIB_TP],
            tp.to_vec(),
        ));
        extra.push(I2cTransaction::write_read(
            ADDR,
            vec![regs::CALIB_HUM],
            hum.to_vec(),
        ));
        let (mut sensor, mut i2c) = ready_sensor(extra);
        sensor.mode = Mode::Normal;
        sensor.reset(&mut NoopDelay).unwrap();
        assert_eq!(sensor.mode, Mode::Sleep);
        assert_eq!(sensor.calib.dig_t2, 2048);
        i2c.done();
    }

    #[test]
    fn free_returns_the_bus() {
        let (sensor, mut i2c) = ready_sensor(vec![]);
        let _bus = sensor.free();
        i2c.done();
    }
}
