//! Persistence port for daily decisions and trades.

use crate::domain::error::SolidQuantError;
use crate::domain::order::{TradeExecution, TradeSignal};
use crate::domain::portfolio::Portfolio;
use crate::domain::regime::Regime;
use crate::domain::snapshot::MarketSnapshot;

pub trait JournalPort {
    /// Appends one record for the day.
    fn save_daily_summary(
        &self,
        snapshot: &MarketSnapshot,
        regime: Regime,
        signal: &TradeSignal,
        portfolio: &Portfolio,
    ) -> Result<(), SolidQuantError>;

    /// Appends the day's orders and fills. Callers skip it when there were no orders.
    fn save_trade_history(
        &self,
        signal: &TradeSignal,
        executions: &[TradeExecution],
        portfolio: &Portfolio,
    ) -> Result<(), SolidQuantError>;

    /// Overwrites the current-status document.
    fn update_status(
        &self,
        snapshot: &MarketSnapshot,
        regime: Regime,
        signal: &TradeSignal,
        portfolio: &Portfolio,
    ) -> Result<(), SolidQuantError>;
}
