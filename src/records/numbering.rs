//! Human-facing order numbers.
//!
//! Orders carry two identifiers: a sequential `JO-0001` label built from
//! the persisted counter, and a job serial `IRONWOLF-<6 digits>-<artist>`
//! with a random middle part.

use rand::Rng;

use crate::types::Order;

/// Prefix of the sequential order label.
const ORDER_PREFIX: &str = "JO";

/// Prefix of the job serial.
const SERIAL_PREFIX: &str = "IRONWOLF";

/// Identifiers for the next order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrderNumbers {
    /// Sequential label, e.g. `JO-0007`.
    pub order_number: String,
    /// Job serial, e.g. `IRONWOLF-482913-Jo`.
    pub job_serial: String,
}

impl OrderNumbers {
    /// Numbers for an explicit counter value.
    pub fn for_number<R: Rng + ?Sized>(number: u32, layout_artist: &str, rng: &mut R) -> Self {
        Self {
            order_number: format_order_number(number),
            job_serial: generate_job_serial(layout_artist, rng),
        }
    }
}

/// Counter value for the next order.
///
/// The highest `JO-` label among `orders` is consulted next to the
/// persisted counter, so a counter reset never hands out a label twice.
pub fn next_order_number(last_issued: u32, orders: &[Order]) -> u32 {
    orders
        .iter()
        .filter_map(|o| parse_order_number(&o.serial_job_number))
        .fold(last_issued, u32::max)
        .saturating_add(1)
}

/// `JO-` followed by the zero-padded number.
pub fn format_order_number(number: u32) -> String {
    format!("{}-{:04}", ORDER_PREFIX, number)
}

/// Numeric part of a `JO-` label.
pub fn parse_order_number(label: &str) -> Option<u32> {
    label.split('-').nth(1)?.trim().parse().ok()
}

/// `IRONWOLF-<6 random digits>-<artist>`.
pub fn generate_job_serial<R: Rng + ?Sized>(layout_artist: &str, rng: &mut R) -> String {
    let digits: u32 = rng.random_range(100_000..=999_999);
    format!("{}-{}-{}", SERIAL_PREFIX, digits, layout_artist)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::demo::generate_sample_orders;
    use chrono::NaiveDate;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 17).unwrap()
    }

    #[test]
    fn test_format_and_parse() {
        assert_eq!(format_order_number(7), "JO-0007");
        assert_eq!(format_order_number(12345), "JO-12345");
        assert_eq!(parse_order_number("JO-0007"), Some(7));
        assert_eq!(parse_order_number("JO"), None);
        assert_eq!(parse_order_number("JO-x"), None);
    }

    #[test]
    fn test_job_serial_shape() {
        let mut rng = StdRng::seed_from_u64(7);
        let serial = generate_job_serial("Jo", &mut rng);

        let parts: Vec<&str> = serial.split('-').collect();
        assert_eq!(parts[0], "IRONWOLF");
        assert_eq!(parts[1].len(), 6);
        assert!(parts[1].chars().all(|c| c.is_ascii_digit()));
        assert_eq!(parts[2], "Jo");
    }

    #[test]
    fn test_next_order_number() {
        assert_eq!(next_order_number(0, &[]), 1);
        assert_eq!(next_order_number(41, &[]), 42);
        assert_eq!(next_order_number(u32::MAX, &[]), u32::MAX);

        let orders: Vec<Order> = generate_sample_orders(&mut StdRng::seed_from_u64(3), today())
            .into_iter()
            .take(2)
            .collect();
        // Counter reset below the stored labels
        assert_eq!(next_order_number(0, &orders), 3);
        assert_eq!(next_order_number(9, &orders), 10);
    }

    #[test]
    fn test_for_number() {
        let mut rng = StdRng::seed_from_u64(1);
        let numbers = OrderNumbers::for_number(3, "Mia", &mut rng);
        assert_eq!(numbers.order_number, "JO-0003");
        assert!(numbers.job_serial.ends_with("-Mia"));
    }
}
