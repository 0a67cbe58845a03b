//! Register-level transports: I2C, hardware SPI, and bit-banged SPI.
//!
//! The compensation pipeline only ever talks to the [`Bus`] trait, so the
//! same driver code runs unchanged over any of the three transports. The
//! transport is chosen explicitly at construction; there is no sentinel-value
//! inference.

use embedded_hal::digital::{InputPin, OutputPin};
use embedded_hal::i2c::I2c;
use embedded_hal::spi::{Operation, SpiDevice};

/// In SPI mode bit 7 of the address byte selects the transfer direction:
/// high for read, low for write.
const SPI_READ: u8 = 0x80;

/// Byte-oriented register access, the contract every transport implements.
pub trait Bus {
    type Error;

    /// Burst-reads `buf.len()` bytes starting at register `reg`.
    fn read_regs(&mut self, reg: u8, buf: &mut [u8]) -> Result<(), Self::Error>;

    /// Writes a single byte to register `reg`.
    fn write_reg(&mut self, reg: u8, value: u8) -> Result<(), Self::Error>;
}

/// I2C transport. The BME280 responds at 0x76 (SDO low) or 0x77 (SDO high).
#[derive(Debug)]
pub struct I2cInterface<I2C> {
    i2c: I2C,
    address: u8,
}

impl<I2C> I2cInterface<I2C> {
    pub fn new(i2c: I2C, address: u8) -> Self {
        Self { i2c, address }
    }

    /// Releases the underlying I2C peripheral.
    pub fn release(self) -> I2C {
        self.i2c
    }
}

impl<I2C, E> Bus for I2cInterface<I2C>
where
    I2C: I2c<Error = E>,
{
    type Error = E;

    fn read_regs(&mut self, reg: u8, buf: &mut [u8]) -> Result<(), E> {
        self.i2c.write_read(self.address, &[reg], buf)
    }

    fn write_reg(&mut self, reg: u8, value: u8) -> Result<(), E> {
        self.i2c.write(self.address, &[reg, value])
    }
}

/// Hardware SPI transport.
///
/// Chip-select framing comes from the [`SpiDevice`] transaction: assert,
/// address byte, data transfers, deassert. The device requires mode 0,
/// MSB first; 500 kHz is a safe clock. Those settings belong to the
/// `SpiDevice` the caller constructs.
#[derive(Debug)]
pub struct SpiInterface<SPI> {
    spi: SPI,
}

impl<SPI> SpiInterface<SPI> {
    pub fn new(spi: SPI) -> Self {
        Self { spi }
    }

    /// Releases the underlying SPI device.
    pub fn release(self) -> SPI {
        self.spi
    }
}

impl<SPI, E> Bus for SpiInterface<SPI>
where
    SPI: SpiDevice<Error = E>,
{
    type Error = E;

    fn read_regs(&mut self, reg: u8, buf: &mut [u8]) -> Result<(), E> {
        self.spi
            .transaction(&mut [Operation::Write(&[reg | SPI_READ]), Operation::Read(buf)])
    }

    fn write_reg(&mut self, reg: u8, value: u8) -> Result<(), E> {
        self.spi.write(&[reg & !SPI_READ, value])
    }
}

/// Bit-banged SPI over three GPIO lines plus chip select.
///
/// Mode-0 clocking: the clock idles low, data is presented while the clock
/// is low and sampled on the rising edge, MSB first. Strictly slower than a
/// hardware peripheral but needs none.
///
/// All four pins must share one error type, which is usually the case for
/// pins from the same GPIO driver.
#[derive(Debug)]
pub struct SoftSpiInterface<SCK, MOSI, MISO, CS> {
    sck: SCK,
    mosi: MOSI,
    miso: MISO,
    cs: CS,
}

impl<SCK, MOSI, MISO, CS, E> SoftSpiInterface<SCK, MOSI, MISO, CS>
where
    SCK: OutputPin<Error = E>,
    MOSI: OutputPin<Error = E>,
    MISO: InputPin<Error = E>,
    CS: OutputPin<Error = E>,
{
    pub fn new(sck: SCK, mosi: MOSI, miso: MISO, cs: CS) -> Self {
        Self {
            sck,
            mosi,
            miso,
            cs,
        }
    }

    /// Releases the GPIO pins.
    pub fn release(self) -> (SCK, MOSI, MISO, CS) {
        (self.sck, self.mosi, self.miso, self.cs)
    }

    /// Clocks one byte out on MOSI, MSB first.
    fn shift_out(&mut self, byte: u8) -> Result<(), E> {
        for bit in (0..8).rev() {
            self.sck.set_low()?;
            if byte & (1 << bit) != 0 {
                self.mosi.set_high()?;
            } else {
                self.mosi.set_low()?;
            }
            self.sck.set_high()?;
        }
        Ok(())
    }

    /// Clocks one byte in from MISO, MSB first.
    fn shift_in(&mut self) -> Result<u8, E> {
        let mut byte = 0u8;
        for _ in 0..8 {
            byte <<= 1;
            self.sck.set_low()?;
            self.sck.set_high()?;
            if self.miso.is_high()? {
                byte |= 1;
            }
        }
        Ok(byte)
    }
}

impl<SCK, MOSI, MISO, CS, E> Bus for SoftSpiInterface<SCK, MOSI, MISO, CS>
where
    SCK: OutputPin<Error = E>,
    MOSI: OutputPin<Error = E>,
    MISO: InputPin<Error = E>,
    CS: OutputPin<Error = E>,
{
    type Error = E;

    fn read_regs(&mut self, reg: u8, buf: &mut [u8]) -> Result<(), E> {
        self.cs.set_low()?;
        self.shift_out(reg | SPI_READ)?;
        for byte in buf.iter_mut() {
            *byte = self.shift_in()?;
        }
        self.cs.set_high()
    }

    fn write_reg(&mut self, reg: u8, value: u8) -> Result<(), E> {
        self.cs.set_low()?;
        self.shift_out(reg & !SPI_READ)?;
        self.shift_out(value)?;
        self.cs.set_high()
    }
}
