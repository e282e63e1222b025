// SPDX-FileCopyrightText: 2026 Convoy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ticket number generation.

use chrono::{DateTime, Datelike, Utc};
use rand::Rng;

/// Generate a human-facing ticket number: `TK-YYYYMM` plus a four digit
/// random suffix, e.g. `TK-2026080342`.
///
/// The suffix is random rather than sequential, so the number is a soft
/// identifier: collisions within a month are possible and accepted, and the
/// conversation's primary id remains the authoritative key.
pub fn generate(now: DateTime<Utc>) -> String {
    let suffix: u16 = rand::thread_rng().gen_range(0..10_000);
    format!("TK-{}{:02}{:04}", now.year(), now.month(), suffix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn ticket_embeds_year_and_month() {
        let march = Utc.with_ymd_and_hms(2026, 3, 15, 12, 0, 0).unwrap();
        let ticket = generate(march);
        assert!(ticket.starts_with("TK-202603"));
        assert_eq!(ticket.len(), "TK-".len() + 6 + 4);
        assert!(ticket["TK-".len()..].chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn single_digit_months_are_zero_padded() {
        let august = Utc.with_ymd_and_hms(2026, 8, 1, 0, 0, 0).unwrap();
        assert!(generate(august).starts_with("TK-202608"));
    }
}
