//! Order-independent trade accumulators.
//!
//! A [`TradeTally`] only holds sums, counts and extremes, so tallies built
//! over disjoint shards of a trade list can be combined with
//! [`TradeTally::merge`].

use serde::Serialize;

use super::ratio::Ratio;
use super::trade::MatchedTrade;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TradeTally {
    pub trades: usize,
    pub winners: usize,
    pub losers: usize,
    pub breakeven: usize,
    pub total_pnl: f64,
    pub gross_profit: f64,
    pub gross_loss: f64,
    pub capital: f64,
    pub largest_win: f64,
    pub largest_loss: f64,
    pub pnl_pct_sum: f64,
    pub pnl_pct_count: usize,
    pub hold_days_sum: i64,
    pub dte_sum: i64,
    pub dte_count: usize,
}

impl TradeTally {
    pub fn from_trades<'a, I>(trades: I) -> Self
    where
        I: IntoIterator<Item = &'a MatchedTrade>,
    {
        let mut tally = TradeTally::default();
        for trade in trades {
            tally.add(trade);
        }
        tally
    }

    pub fn add(&mut self, trade: &MatchedTrade) {
        let pnl = trade.pnl;
        self.trades += 1;
        self.total_pnl += pnl;
        self.capital += trade.capital;
        if pnl > 0.0 {
            self.winners += 1;
            self.gross_profit += pnl;
            if pnl > self.largest_win {
                self.largest_win = pnl;
            }
        } else if pnl < 0.0 {
            self.losers += 1;
            self.gross_loss += pnl.abs();
            if pnl < self.largest_loss {
                self.largest_loss = pnl;
            }
        } else {
            self.breakeven += 1;
        }
        if let Some(pct) = trade.pnl_pct {
            self.pnl_pct_sum += pct;
            self.pnl_pct_count += 1;
        }
        self.hold_days_sum += trade.hold_days;
        if let Some(dte) = trade.dte {
            self.dte_sum += dte;
            self.dte_count += 1;
        }
    }

    pub fn merge(mut self, other: TradeTally) -> TradeTally {
        self.trades += other.trades;
        self.winners += other.winners;
        self.losers += other.losers;
        self.breakeven += other.breakeven;
        self.total_pnl += other.total_pnl;
        self.gross_profit += other.gross_profit;
        self.gross_loss += other.gross_loss;
        self.capital += other.capital;
        self.largest_win = self.largest_win.max(other.largest_win);
        self.largest_loss = self.largest_loss.min(other.largest_loss);
        self.pnl_pct_sum += other.pnl_pct_sum;
        self.pnl_pct_count += other.pnl_pct_count;
        self.hold_days_sum += other.hold_days_sum;
        self.dte_sum += other.dte_sum;
        self.dte_count += other.dte_count;
        self
    }

    /// Winners over all trades; breakeven trades count in the denominator.
    pub fn win_rate(&self) -> f64 {
        if self.trades > 0 {
            self.winners as f64 / self.trades as f64
        } else {
            0.0
        }
    }

    pub fn avg_pnl(&self) -> f64 {
        if self.trades > 0 {
            self.total_pnl / self.trades as f64
        } else {
            0.0
        }
    }

    pub fn avg_winner(&self) -> f64 {
        if self.winners > 0 {
            self.gross_profit / self.winners as f64
        } else {
            0.0
        }
    }

    /// Mean losing P&L, signed (zero or negative).
    pub fn avg_loser(&self) -> f64 {
        if self.losers > 0 {
            -self.gross_loss / self.losers as f64
        } else {
            0.0
        }
    }

    pub fn profit_factor(&self) -> Ratio {
        Ratio::divide(self.gross_profit, self.gross_loss)
    }

    /// Average winner over the magnitude of the average loser.
    pub fn win_loss_ratio(&self) -> Ratio {
        if self.losers == 0 {
            return Ratio::Undefined;
        }
        Ratio::divide(self.avg_winner(), self.avg_loser().abs())
    }

    /// Mean `pnl_pct` over trades where it is defined.
    pub fn avg_return_pct(&self) -> Option<f64> {
        if self.pnl_pct_count > 0 {
            Some(self.pnl_pct_sum / self.pnl_pct_count as f64)
        } else {
            None
        }
    }

    /// Total P&L as a percentage of total capital.
    pub fn return_on_capital_pct(&self) -> Option<f64> {
        if self.capital > 0.0 {
            Some(self.total_pnl / self.capital * 100.0)
        } else {
            None
        }
    }

    pub fn avg_hold_days(&self) -> f64 {
        if self.trades > 0 {
            self.hold_days_sum as f64 / self.trades as f64
        } else {
            0.0
        }
    }

    pub fn avg_dte(&self) -> Option<f64> {
        if self.dte_count > 0 {
            Some(self.dte_sum as f64 / self.dte_count as f64)
        } else {
            None
        }
    }

    pub fn stats(&self) -> BucketStats {
        BucketStats {
            trades: self.trades,
            total_pnl: self.total_pnl,
            avg_pnl: self.avg_pnl(),
            win_rate: self.win_rate(),
        }
    }
}

/// The columns shared by every time or category bucket.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BucketStats {
    pub trades: usize,
    pub total_pnl: f64,
    pub avg_pnl: f64,
    pub win_rate: f64,
}
