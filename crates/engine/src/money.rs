use std::{
    fmt,
    ops::{Add, AddAssign, Sub},
};

/// Signed money amount represented as **integer cents**.
///
/// Use this type for **all** monetary values in the engine (amounts, fees,
/// totals) to avoid floating-point drift.
///
/// The value is signed:
/// - positive = ingress / increase
/// - negative = egress / decrease
///
/// # Examples
///
/// ```rust
/// use engine::MoneyCents;
///
/// let amount = MoneyCents::new(12_34);
/// assert_eq!(amount.cents(), 1234);
/// assert_eq!(amount.to_string(), "NT$12.34");
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct MoneyCents(i64);

impl MoneyCents {
    pub const ZERO: MoneyCents = MoneyCents(0);

    /// Creates a new amount from integer cents.
    #[must_use]
    pub const fn new(cents: i64) -> Self {
        Self(cents)
    }

    /// Returns the raw value in cents.
    #[must_use]
    pub const fn cents(self) -> i64 {
        self.0
    }
}

impl fmt::Display for MoneyCents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let units = abs / 100;
        let cents = abs % 100;
        write!(f, "{sign}NT${units}.{cents:02}")
    }
}

impl Add for MoneyCents {
    type Output = MoneyCents;

    fn add(self, rhs: MoneyCents) -> Self::Output {
        MoneyCents(self.0 + rhs.0)
    }
}

impl AddAssign for MoneyCents {
    fn add_assign(&mut self, rhs: MoneyCents) {
        self.0 += rhs.0;
    }
}

impl Sub for MoneyCents {
    type Output = MoneyCents;

    fn sub(self, rhs: MoneyCents) -> Self::Output {
        MoneyCents(self.0 - rhs.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_formats_twd() {
        assert_eq!(MoneyCents::new(0).to_string(), "NT$0.00");
        assert_eq!(MoneyCents::new(1).to_string(), "NT$0.01");
        assert_eq!(MoneyCents::new(10).to_string(), "NT$0.10");
        assert_eq!(MoneyCents::new(1050).to_string(), "NT$10.50");
        assert_eq!(MoneyCents::new(-1050).to_string(), "-NT$10.50");
    }

    #[test]
    fn arithmetic_stays_in_cents() {
        let mut total = MoneyCents::ZERO;
        total += MoneyCents::new(300);
        total += MoneyCents::new(15);
        assert_eq!(total, MoneyCents::new(315));
        assert_eq!(MoneyCents::new(1000) - total, MoneyCents::new(685));
        assert_eq!((total + MoneyCents::new(5)).cents(), 320);
    }
}
