//! Fixed-point compensation formulas and measurement-cycle timing.
//!
//! The three polynomials below follow the Bosch datasheet bit-for-bit: the
//! same shift amounts, coefficient widths and signedness. Wrapping arithmetic
//! is used wherever the reference relies on two's-complement overflow, so
//! nonsense calibration data produces nonsense readings rather than a panic.

use crate::settings::{MeasureTiming, Oversampling, StandbyTime};
use crate::CalibData;

/// Temperature compensation output.
///
/// `t_fine` is the intermediate the pressure and humidity formulas both
/// require; it is threaded explicitly through one reading cycle and never
/// cached across cycles.
#[derive(Debug, Copy, Clone, Default)]
pub(crate) struct CalcTempData {
    pub(crate) t_fine: i32,
    /// Temperature in centi-degrees Celsius (2100 = 21.00 C).
    pub(crate) temp_comp: i32,
}

/// Converts the raw 20-bit temperature ADC value to centi-degrees Celsius.
pub(crate) fn compensate_temperature(adc_t: i32, cal: &CalibData) -> CalcTempData {
    let var1 = ((adc_t >> 3) - ((cal.dig_t1 as i32) << 1)).wrapping_mul(cal.dig_t2 as i32) >> 11;
    let delta = (adc_t >> 4) - (cal.dig_t1 as i32);
    let var2 = (delta.wrapping_mul(delta) >> 12).wrapping_mul(cal.dig_t3 as i32) >> 14;
    let t_fine = var1.wrapping_add(var2);

    CalcTempData {
        t_fine,
        temp_comp: t_fine.wrapping_mul(5).wrapping_add(128) >> 8,
    }
}

/// Converts the raw 20-bit pressure ADC value to pascals.
///
/// Returns 0 when the denominator term of the polynomial evaluates to zero
/// instead of dividing by it.
pub(crate) fn compensate_pressure(t_fine: i32, adc_p: i32, cal: &CalibData) -> u32 {
    let var1 = (t_fine as i64) - 128_000;
    let mut var2 = var1.wrapping_mul(var1).wrapping_mul(cal.dig_p6 as i64);
    var2 = var2.wrapping_add(var1.wrapping_mul(cal.dig_p5 as i64) << 17);
    var2 = var2.wrapping_add((cal.dig_p4 as i64) << 35);
    let var1 = (var1.wrapping_mul(var1).wrapping_mul(cal.dig_p3 as i64) >> 8)
        .wrapping_add(var1.wrapping_mul(cal.dig_p2 as i64) << 12);
    let var1 = (1i64 << 47).wrapping_add(var1).wrapping_mul(cal.dig_p1 as i64) >> 33;

    if var1 == 0 {
        return 0;
    }

    let p = 1_048_576 - (adc_p as i64);
    let p = (p << 31).wrapping_sub(var2).wrapping_mul(3_125).wrapping_div(var1);
    let var2 = (cal.dig_p9 as i64).wrapping_mul(p >> 13).wrapping_mul(p >> 13) >> 25;
    let var3 = (cal.dig_p8 as i64).wrapping_mul(p) >> 19;
    let p = (p.wrapping_add(var2).wrapping_add(var3) >> 8).wrapping_add((cal.dig_p7 as i64) << 4);

    (p >> 8) as u32
}

/// Converts the raw 16-bit humidity ADC value to relative humidity in
/// percent x 100 (5428 = 54.28 %rH).
///
/// The intermediate is clamped to `[0, 419430400]` before the final scaling,
/// bounding the output to 0..=100.00 %.
pub(crate) fn compensate_humidity(t_fine: i32, adc_h: i32, cal: &CalibData) -> u32 {
    let v = t_fine.wrapping_sub(76_800);
    let a = (adc_h << 14)
        .wrapping_sub((cal.dig_h4 as i32) << 20)
        .wrapping_sub((cal.dig_h5 as i32).wrapping_mul(v))
        .wrapping_add(16_384)
        >> 15;
    let b = ((v.wrapping_mul(cal.dig_h6 as i32) >> 10)
        .wrapping_mul((v.wrapping_mul(cal.dig_h3 as i32) >> 11).wrapping_add(32_768))
        >> 10)
        .wrapping_add(2_097_152);
    let c = b.wrapping_mul(cal.dig_h2 as i32).wrapping_add(8_192) >> 14;

    let x = a.wrapping_mul(c);
    let x = x.wrapping_sub(
        ((x >> 15).wrapping_mul(x >> 15) >> 7).wrapping_mul(cal.dig_h1 as i32) >> 4,
    );
    let x = x.clamp(0, 419_430_400);

    ((x >> 12) as u32) * 100 / 1024
}

/// Expected duration of one full measurement cycle in microseconds.
///
/// Standby delay plus, for each enabled channel, a conversion time scaled by
/// the oversampling multiplier, plus a fixed startup overhead for pressure
/// and humidity. Skipped channels contribute nothing.
pub(crate) fn measurement_time_us(
    timing: MeasureTiming,
    standby: StandbyTime,
    osrs_t: Oversampling,
    osrs_p: Oversampling,
    osrs_h: Oversampling,
) -> u32 {
    let (base, conversion, startup) = match timing {
        MeasureTiming::Typical => (1_000, 2_000, 500),
        MeasureTiming::Maximum => (1_250, 2_300, 575),
    };

    let mut total = standby.micros() + base;
    if osrs_t != Oversampling::Skipped {
        total += conversion * osrs_t.multiplier();
    }
    if osrs_p != Oversampling::Skipped {
        total += conversion * osrs_p.multiplier() + startup;
    }
    if osrs_h != Oversampling::Skipped {
        total += conversion * osrs_h.multiplier() + startup;
    }
    total
}
