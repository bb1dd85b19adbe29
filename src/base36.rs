//! Base-36 integers with the wire convention that 0 encodes as the empty
//! string, so zero-valued fields vanish under trailing-comma trimming.

const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Encode an integer in lowercase base-36. Zero becomes the empty string.
pub fn encode(n: i64) -> String {
    if n == 0 {
        return String::new();
    }

    let negative = n < 0;
    let mut n = n.unsigned_abs();
    let mut buf = Vec::new();
    while n > 0 {
        buf.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    if negative {
        buf.push(b'-');
    }
    buf.reverse();
    String::from_utf8(buf).unwrap_or_default()
}

/// Decode a base-36 prefix of `s`, stopping at the first non-digit.
///
/// The empty string (and a string with no leading digits) decodes to 0, the
/// inverse of [`encode`]'s empty-for-zero convention. Overflow saturates.
pub fn decode(s: &str) -> i64 {
    let mut chars = s.chars().peekable();
    let negative = chars.peek() == Some(&'-');
    if negative {
        chars.next();
    }

    let mut value: i64 = 0;
    let mut seen_digit = false;
    for c in chars {
        let digit = match c {
            '0'..='9' => c as i64 - '0' as i64,
            'a'..='z' => c as i64 - 'a' as i64 + 10,
            'A'..='Z' => c as i64 - 'A' as i64 + 10,
            _ => break,
        };
        seen_digit = true;
        value = value.saturating_mul(36).saturating_add(digit);
    }

    if !seen_digit {
        return 0;
    }
    if negative {
        -value
    } else {
        value
    }
}
