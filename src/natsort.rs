//! Natural ("human") ordering for image paths.
//!
//! Case-insensitive, with digit runs compared by numeric value, so
//! `img2.svs` sorts before `img10.svs`.

use std::cmp::Ordering;
use std::iter::Peekable;
use std::str::Chars;

/// Compare two strings in natural order.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut a_chars = a.chars().peekable();
    let mut b_chars = b.chars().peekable();

    loop {
        match (a_chars.peek().copied(), b_chars.peek().copied()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(ca), Some(cb)) => {
                if ca.is_ascii_digit() && cb.is_ascii_digit() {
                    let na = take_number(&mut a_chars);
                    let nb = take_number(&mut b_chars);
                    match na.cmp(&nb) {
                        Ordering::Equal => {}
                        ordering => return ordering,
                    }
                } else {
                    match ca.to_lowercase().cmp(cb.to_lowercase()) {
                        Ordering::Equal => {
                            a_chars.next();
                            b_chars.next();
                        }
                        ordering => return ordering,
                    }
                }
            }
        }
    }
}

fn take_number(chars: &mut Peekable<Chars<'_>>) -> u128 {
    let mut value: u128 = 0;
    while let Some(digit) = chars.peek().and_then(|c| c.to_digit(10)) {
        value = value.saturating_mul(10).saturating_add(u128::from(digit));
        chars.next();
    }
    value
}
