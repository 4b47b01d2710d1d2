//! Unit conversions between raw on-chain integers and display values.

/// Lamports per SOL.
pub const LAMPORTS_PER_SOL: u64 = 1_000_000_000;

/// Convert lamports to SOL for display.
pub fn lamports_to_sol(lamports: u64) -> f64 {
    lamports as f64 / LAMPORTS_PER_SOL as f64
}

/// Convert a raw token amount to its UI amount for the given mint decimals.
pub fn raw_to_ui(amount: u64, decimals: u8) -> f64 {
    amount as f64 / 10f64.powi(decimals as i32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lamports_to_sol() {
        assert_eq!(lamports_to_sol(1_500_000_000), 1.5);
        assert_eq!(lamports_to_sol(0), 0.0);
    }

    #[test]
    fn test_raw_to_ui() {
        assert_eq!(raw_to_ui(1_000_000, 6), 1.0);
        assert_eq!(raw_to_ui(42, 0), 42.0);
    }
}
