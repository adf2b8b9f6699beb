//! Filename convention for stored quote images.
//!
//! Every asset is named `<prefix>_<stamp>_<seq>.<ext>`:
//! - `prefix` comes from `generation.asset_prefix` (default `quote`)
//! - `stamp` is the last six digits of the Unix time in milliseconds
//! - `seq` is the record's index within the run
//!
//! The stamp alone repeats every ~16 minutes; the sequence number keeps names
//! unique within one run.
//!
//! The compositor writes a draft under `temp_<name>` first; see [`temp_filename`].

/// Last six digits of a millisecond timestamp, zero-padded.
pub fn millis_stamp(unix_millis: u128) -> String {
    format!("{:06}", unix_millis % 1_000_000)
}

/// Build the permanent filename for one asset.
///
/// - `("quote", 1700000123456, 2, "jpg")` → `"quote_123456_2.jpg"`
/// - `("zhipu", 1000000000007, 0, "png")` → `"zhipu_000007_0.png"`
pub fn asset_filename(prefix: &str, unix_millis: u128, seq: usize, ext: &str) -> String {
    format!("{prefix}_{}_{seq}.{ext}", millis_stamp(unix_millis))
}

/// Name of the draft file the compositor writes for `filename`.
pub fn temp_filename(filename: &str) -> String {
    format!("temp_{filename}")
}

/// Current Unix time in milliseconds. Zero if the clock is before the epoch.
pub fn now_millis() -> u128 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn asset_filename_uses_last_six_digits() {
        assert_eq!(
            asset_filename("quote", 1_700_000_123_456, 2, "jpg"),
            "quote_123456_2.jpg"
        );
    }

    #[test]
    fn stamp_is_zero_padded() {
        assert_eq!(asset_filename("zhipu", 1_000_000_000_007, 0, "png"), "zhipu_000007_0.png");
        assert_eq!(millis_stamp(42), "000042");
    }

    #[test]
    fn sequence_disambiguates_same_millisecond() {
        let a = asset_filename("quote", 5, 0, "jpg");
        let b = asset_filename("quote", 5, 1, "jpg");
        assert_ne!(a, b);
    }

    #[test]
    fn temp_filename_prefixes() {
        assert_eq!(temp_filename("quote_1_0.jpg"), "temp_quote_1_0.jpg");
    }

    #[test]
    fn now_is_after_2020() {
        assert!(now_millis() > 1_577_836_800_000);
    }
}
