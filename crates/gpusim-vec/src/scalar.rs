/// Reciprocal square root using the classic `0x5f3759df` initial guess and one Newton step.
///
/// This is an approximation (relative error below ~0.2%) and is kept bit-for-bit so `RSQ`
/// results match recorded traces. Use `1.0 / x.sqrt()` where exactness matters.
pub fn fast_rsqrt(number: f32) -> f32 {
    const THREE_HALFS: f32 = 1.5;

    let x2 = number * 0.5;
    let i = number.to_bits() as i32;
    let i = 0x5f37_59df_i32.wrapping_sub(i >> 1);
    let y = f32::from_bits(i as u32);
    y * (THREE_HALFS - (x2 * y * y))
}

/// Splits `value` into a mantissa in `[0.5, 1)` and a power-of-two exponent, like C `frexpf`.
///
/// Zero, infinities and NaN come back unchanged with exponent 0.
pub fn frexp(value: f32) -> (f32, i32) {
    if value == 0.0 || !value.is_finite() {
        return (value, 0);
    }

    let bits = value.to_bits();
    let biased = ((bits >> 23) & 0xff) as i32;
    if biased == 0 {
        // Subnormal: normalize first so the exponent field is meaningful.
        let (m, e) = frexp(value * f32::from_bits(0x5f80_0000)); // 2^64
        return (m, e - 64);
    }

    let exponent = biased - 126;
    let mantissa = f32::from_bits((bits & 0x807f_ffff) | (126 << 23));
    (mantissa, exponent)
}
