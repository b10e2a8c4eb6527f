//! Encoding of power levels as PWM bit patterns.
//!
//! The board drives an output by cycling through a bit pattern.
//! Eight bit patterns are preferred when they can represent the power closely enough.

/// Eight bit patterns for 0/8 up to 8/8 power.
pub const PWM8_PATTERNS: [u8; 9] = [0x00, 0x01, 0x88, 0x92, 0xAA, 0xBA, 0xEE, 0xFE, 0xFF];

/// Largest fractional remainder of `power * 8` that is still encoded with an eight bit pattern.
pub const PWM8_TOLERANCE: f64 = 0.025;

/// Check if a power level is encoded with an eight bit pattern.
pub fn uses_pwm8(power: f64) -> bool {
	let steps = clamp(power) * 8.0;
	steps - steps.trunc() < PWM8_TOLERANCE
}

/// Encode a power level between 0.0 and 1.0 as an upper case hex pattern.
///
/// Returns two hex digits for eight bit patterns and eight for thirty-two bit patterns.
pub fn pwm_pattern(power: f64) -> String {
	let power = clamp(power);
	if uses_pwm8(power) {
		pwm8(steps(power, 8))
	} else {
		pwm32(steps(power, 32))
	}
}

/// Encode `on` out of 8 steps.
pub fn pwm8(on: u32) -> String {
	let index = on.min(8) as usize;
	format!("{:02X}", PWM8_PATTERNS[index])
}

/// Encode `on` out of 32 steps, with the enabled bits spread as evenly as possible.
pub fn pwm32(on: u32) -> String {
	let on = on.min(32);
	let pattern = (0..32).fold(0u32, |pattern, bit| {
		if (bit + 1) * on / 32 > bit * on / 32 {
			pattern | 1 << bit
		} else {
			pattern
		}
	});
	format!("{:08X}", pattern)
}

fn clamp(power: f64) -> f64 {
	if power.is_nan() {
		0.0
	} else {
		power.clamp(0.0, 1.0)
	}
}

fn steps(power: f64, resolution: u32) -> u32 {
	(power * f64::from(resolution)) as u32
}
