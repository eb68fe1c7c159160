//! Two-part fee model: flat management fee plus a performance fee on profit.

use serde::{Deserialize, Serialize};

pub const DEFAULT_MANAGEMENT_FEE_RATE: f64 = 0.02;
pub const DEFAULT_PERFORMANCE_FEE_RATE: f64 = 0.20;

/// Fee rates as fractions (0.02 = 2%).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeeSchedule {
    /// Charged on initial capital regardless of outcome.
    pub management_rate: f64,
    /// Charged on positive gross profit only.
    pub performance_rate: f64,
}

impl Default for FeeSchedule {
    fn default() -> Self {
        Self {
            management_rate: DEFAULT_MANAGEMENT_FEE_RATE,
            performance_rate: DEFAULT_PERFORMANCE_FEE_RATE,
        }
    }
}

/// Client-vs-operator split of a finished run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Settlement {
    pub final_value: f64,
    pub gross_profit: f64,
    pub management_fee: f64,
    pub performance_fee: f64,
    pub total_fees: f64,
    /// May be negative when fees exceed the final value; that is a valid outcome.
    pub net_client_value: f64,
}

impl Settlement {
    pub fn settle(final_value: f64, initial_capital: f64, fees: &FeeSchedule) -> Self {
        let gross_profit = final_value - initial_capital;
        let management_fee = initial_capital * fees.management_rate;
        let performance_fee = gross_profit.max(0.0) * fees.performance_rate;
        let total_fees = management_fee + performance_fee;
        Self {
            final_value,
            gross_profit,
            management_fee,
            performance_fee,
            total_fees,
            net_client_value: final_value - total_fees,
        }
    }

    /// Gross return on initial capital, in percent.
    pub fn roi_pct(&self, initial_capital: f64) -> f64 {
        self.gross_profit / initial_capital * 100.0
    }

    /// Client profit after fees.
    pub fn net_profit(&self, initial_capital: f64) -> f64 {
        self.net_client_value - initial_capital
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_run_pays_management_fee_only() {
        let s = Settlement::settle(100_000.0, 100_000.0, &FeeSchedule::default());
        assert_eq!(s.gross_profit, 0.0);
        assert_eq!(s.management_fee, 2_000.0);
        assert_eq!(s.performance_fee, 0.0);
        assert_eq!(s.net_client_value, 98_000.0);
    }

    #[test]
    fn profit_pays_both_fees() {
        let s = Settlement::settle(120_000.0, 100_000.0, &FeeSchedule::default());
        assert_eq!(s.gross_profit, 20_000.0);
        assert_eq!(s.performance_fee, 4_000.0);
        assert_eq!(s.total_fees, 6_000.0);
        assert_eq!(s.net_client_value, 114_000.0);
        assert_eq!(s.net_profit(100_000.0), 14_000.0);
        assert_eq!(s.roi_pct(100_000.0), 20.0);
    }

    #[test]
    fn loss_never_refunds_performance_fee() {
        let s = Settlement::settle(70_000.0, 100_000.0, &FeeSchedule::default());
        assert_eq!(s.gross_profit, -30_000.0);
        assert_eq!(s.performance_fee, 0.0);
        assert_eq!(s.net_client_value, 68_000.0);
    }

    #[test]
    fn fees_can_exceed_value() {
        let fees = FeeSchedule {
            management_rate: 1.5,
            performance_rate: 0.2,
        };
        let s = Settlement::settle(10.0, 100.0, &fees);
        assert!(s.net_client_value < 0.0);
    }
}
