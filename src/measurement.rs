use crate::error::MalformedKind;

/// Parses a temperature with exactly one fractional digit, e.g. `-3.8` or `21.4`.
///
/// The decimal point is assumed to sit right before the last byte, so every other
/// byte after the optional sign is folded into one integer of tenths. Input that
/// does not follow that shape yields a meaningless value; use
/// [`try_parse_measurement`] when the input is not trusted.
#[inline]
pub fn parse_measurement(text: &[u8]) -> f64 {
    let (negative, digits) = match text.split_first() {
        Some((b'-', rest)) => (true, rest),
        _ => (false, text),
    };
    let point = digits.len().wrapping_sub(2);
    let mut tenths: i64 = 0;
    for (i, &c) in digits.iter().enumerate() {
        if i == point {
            continue;
        }
        tenths = tenths
            .wrapping_mul(10)
            .wrapping_add(c.wrapping_sub(b'0') as i64);
    }
    // dividing (rather than multiplying by 0.1) keeps the result correctly rounded
    let value = tenths as f64 / 10.0;
    if negative { -value } else { value }
}

/// Checked counterpart of [`parse_measurement`] used by strict scanning.
pub fn try_parse_measurement(text: &[u8]) -> Result<f64, MalformedKind> {
    let digits = text.strip_prefix(b"-").unwrap_or(text);
    match digits {
        [int @ .., b'.', frac]
            if !int.is_empty() && frac.is_ascii_digit() && int.iter().all(u8::is_ascii_digit) =>
        {
            Ok(parse_measurement(text))
        }
        _ => Err(MalformedKind::BadTemperature),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero() {
        assert_eq!(parse_measurement(b"0.0"), 0.0);
    }

    #[test]
    fn test_integral_value() {
        assert_eq!(parse_measurement(b"1.0"), 1.0);
        assert_eq!(parse_measurement(b"1873.0"), 1873.0);
    }

    #[test]
    fn test_fractional_value() {
        assert_eq!(parse_measurement(b"15.5"), 15.5);
        assert_eq!(parse_measurement(b"21.4"), 21.4);
    }

    #[test]
    fn test_negative_value() {
        assert_eq!(parse_measurement(b"-15.5"), -15.5);
        assert_eq!(parse_measurement(b"-3.8"), -3.8);
        assert!(parse_measurement(b"-0.0").is_sign_negative());
    }

    #[test]
    fn test_all_digits() {
        assert_eq!(parse_measurement(b"1234567890.0"), 1234567890.0);
    }

    #[test]
    fn test_matches_std_parse_over_benchmark_range() {
        for tenths in -999i32..=999 {
            let text = format!(
                "{}{}.{}",
                if tenths < 0 { "-" } else { "" },
                tenths.abs() / 10,
                tenths.abs() % 10
            );
            let expected: f64 = text.parse().unwrap();
            assert_eq!(parse_measurement(text.as_bytes()), expected, "{text}");
        }
    }

    #[test]
    fn test_garbage_does_not_panic() {
        let _ = parse_measurement(b"");
        let _ = parse_measurement(b"-");
        let _ = parse_measurement(b"abcdefghijklmnopqrstuvwxyz0123456789");
    }

    #[test]
    fn test_checked_accepts_valid() {
        assert_eq!(try_parse_measurement(b"-12.3"), Ok(-12.3));
        assert_eq!(try_parse_measurement(b"0.1"), Ok(0.1));
    }

    #[test]
    fn test_checked_rejects_invalid() {
        for bad in [
            &b""[..],
            b"-",
            b"12",
            b".5",
            b"-.5",
            b"1.23",
            b"1.",
            b"1a.2",
            b"--1.2",
            b"1.2 ",
        ] {
            assert_eq!(
                try_parse_measurement(bad),
                Err(MalformedKind::BadTemperature),
                "{:?}",
                String::from_utf8_lossy(bad)
            );
        }
    }
}
