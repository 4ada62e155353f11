//! Performance and risk metrics over matched trades.

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;

use super::equity::MaxDrawdown;
use super::ratio::Ratio;
use super::tally::TradeTally;
use super::trade::MatchedTrade;

pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TradeRef {
    pub instrument_code: String,
    pub underlying: String,
    pub exit_date: NaiveDate,
    pub pnl: f64,
}

impl TradeRef {
    fn of(trade: &MatchedTrade) -> Self {
        TradeRef {
            instrument_code: trade.instrument_code.clone(),
            underlying: trade.underlying.clone(),
            exit_date: trade.exit_date,
            pnl: trade.pnl,
        }
    }
}

/// Scalar summary cards. `win_rate` is a fraction in `[0, 1]`; `avg_loser`
/// and `largest_loss` are signed (zero or negative).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Summary {
    pub total_pnl: f64,
    pub total_trades: usize,
    pub winners: usize,
    pub losers: usize,
    pub breakeven: usize,
    pub win_rate: f64,
    pub avg_winner: f64,
    pub avg_loser: f64,
    pub gross_profit: f64,
    pub gross_loss: f64,
    pub largest_win: f64,
    pub largest_loss: f64,
    pub avg_pnl: f64,
    pub avg_pnl_pct: Option<f64>,
    pub avg_hold_days: f64,
    pub avg_dte: Option<f64>,
    pub capital_deployed: f64,
    pub best_trade: Option<TradeRef>,
    pub worst_trade: Option<TradeRef>,
}

impl Summary {
    pub fn compute(ordered: &[&MatchedTrade]) -> Self {
        let tally = TradeTally::from_trades(ordered.iter().copied());

        let mut best: Option<&MatchedTrade> = None;
        let mut worst: Option<&MatchedTrade> = None;
        for &trade in ordered {
            if best.is_none_or(|b| trade.pnl > b.pnl) {
                best = Some(trade);
            }
            if worst.is_none_or(|w| trade.pnl < w.pnl) {
                worst = Some(trade);
            }
        }

        Summary {
            total_pnl: tally.total_pnl,
            total_trades: tally.trades,
            winners: tally.winners,
            losers: tally.losers,
            breakeven: tally.breakeven,
            win_rate: tally.win_rate(),
            avg_winner: tally.avg_winner(),
            avg_loser: tally.avg_loser(),
            gross_profit: tally.gross_profit,
            gross_loss: tally.gross_loss,
            largest_win: tally.largest_win,
            largest_loss: tally.largest_loss,
            avg_pnl: tally.avg_pnl(),
            avg_pnl_pct: tally.avg_return_pct(),
            avg_hold_days: tally.avg_hold_days(),
            avg_dte: tally.avg_dte(),
            capital_deployed: tally.capital,
            best_trade: best.map(TradeRef::of),
            worst_trade: worst.map(TradeRef::of),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskParams {
    pub annualization_factor: f64,
    pub risk_free_rate: f64,
}

impl Default for RiskParams {
    fn default() -> Self {
        RiskParams {
            annualization_factor: TRADING_DAYS_PER_YEAR,
            risk_free_rate: 0.0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RiskMetrics {
    pub profit_factor: Ratio,
    pub win_loss_ratio: Ratio,
    pub payoff_ratio: Ratio,
    pub expectancy: f64,
    pub sharpe_ratio: f64,
    pub sortino_ratio: f64,
    pub max_drawdown: f64,
    pub max_drawdown_pct: f64,
    pub recovery_factor: Ratio,
    pub max_consecutive_wins: usize,
    pub max_consecutive_losses: usize,
    pub kelly_fraction: f64,
    pub half_kelly: f64,
}

impl RiskMetrics {
    pub fn compute(
        ordered: &[&MatchedTrade],
        summary: &Summary,
        max_drawdown: &MaxDrawdown,
        params: RiskParams,
    ) -> Self {
        let tally = TradeTally::from_trades(ordered.iter().copied());
        let streaks = longest_streaks(ordered);
        let daily = daily_pnl(ordered);
        let (sharpe_ratio, sortino_ratio) = compute_risk_adjusted(&daily, params);

        let expectancy = if summary.total_trades > 0 {
            summary.win_rate * summary.avg_winner + (1.0 - summary.win_rate) * summary.avg_loser
        } else {
            0.0
        };

        let win_loss_ratio = tally.win_loss_ratio();
        let kelly = kelly_fraction(summary.win_rate, summary.avg_winner, -summary.avg_loser);

        RiskMetrics {
            profit_factor: tally.profit_factor(),
            win_loss_ratio,
            payoff_ratio: win_loss_ratio,
            expectancy,
            sharpe_ratio,
            sortino_ratio,
            max_drawdown: max_drawdown.amount,
            max_drawdown_pct: max_drawdown.pct,
            recovery_factor: recovery_factor(summary.total_pnl, max_drawdown.amount),
            max_consecutive_wins: streaks.wins,
            max_consecutive_losses: streaks.losses,
            kelly_fraction: kelly,
            half_kelly: kelly / 2.0,
        }
    }
}

/// Kelly position-size fraction from the win rate and the average win and
/// loss magnitudes, clamped to `[0, 1]`. Zero when either average is zero.
pub fn kelly_fraction(win_rate: f64, avg_winner: f64, avg_loss: f64) -> f64 {
    if avg_loss <= 0.0 || avg_winner <= 0.0 {
        return 0.0;
    }
    let reward_risk = avg_winner / avg_loss;
    finite_or_zero(win_rate - (1.0 - win_rate) / reward_risk).clamp(0.0, 1.0)
}

/// One closed trade on the capital-versus-P&L plane.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScatterPoint {
    pub instrument_code: String,
    pub underlying: String,
    pub capital: f64,
    pub pnl: f64,
}

pub fn risk_reward_scatter(ordered: &[&MatchedTrade]) -> Vec<ScatterPoint> {
    ordered
        .iter()
        .map(|trade| ScatterPoint {
            instrument_code: trade.instrument_code.clone(),
            underlying: trade.underlying.clone(),
            capital: trade.capital,
            pnl: trade.pnl,
        })
        .collect()
}

/// Net P&L over the largest drawdown amount. Undefined without a drawdown;
/// pinned to 0 when the account did not make money.
pub fn recovery_factor(net_pnl: f64, max_drawdown_amount: f64) -> Ratio {
    if max_drawdown_amount <= 0.0 {
        Ratio::Undefined
    } else if net_pnl <= 0.0 {
        Ratio::Value(0.0)
    } else {
        Ratio::divide(net_pnl, max_drawdown_amount)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Streaks {
    pub wins: usize,
    pub losses: usize,
}

/// Longest winning and losing runs in the given order. A breakeven trade
/// ends the current run of either kind without starting a new one.
pub fn longest_streaks(ordered: &[&MatchedTrade]) -> Streaks {
    let mut longest = Streaks::default();
    let mut wins = 0usize;
    let mut losses = 0usize;

    for trade in ordered {
        if trade.is_winner() {
            wins += 1;
            losses = 0;
            longest.wins = longest.wins.max(wins);
        } else if trade.is_loser() {
            losses += 1;
            wins = 0;
            longest.losses = longest.losses.max(losses);
        } else {
            wins = 0;
            losses = 0;
        }
    }

    longest
}

/// Realized P&L summed per exit date, in date order.
pub fn daily_pnl(trades: &[&MatchedTrade]) -> Vec<f64> {
    let mut by_day: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for trade in trades {
        *by_day.entry(trade.exit_date).or_insert(0.0) += trade.pnl;
    }
    by_day.into_values().collect()
}

/// Annualized Sharpe and Sortino ratios of per-bucket P&L.
///
/// Uses the sample standard deviation; both ratios are 0 with fewer than two
/// buckets or a zero deviation.
pub fn compute_risk_adjusted(returns: &[f64], params: RiskParams) -> (f64, f64) {
    if returns.len() < 2 || params.annualization_factor <= 0.0 {
        return (0.0, 0.0);
    }

    let n = returns.len() as f64;
    let mean: f64 = returns.iter().sum::<f64>() / n;
    let hurdle = params.risk_free_rate / params.annualization_factor;
    let excess_return = mean - hurdle;
    let scale = params.annualization_factor.sqrt();

    let variance: f64 = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (n - 1.0);
    let stddev = variance.sqrt();

    let sharpe = if stddev > 0.0 {
        excess_return / stddev * scale
    } else {
        0.0
    };

    let downside: f64 = returns
        .iter()
        .filter(|&&r| r < hurdle)
        .map(|&r| (r - hurdle).powi(2))
        .sum();
    let downside_stddev = (downside / n).sqrt();

    let sortino = if downside_stddev > 0.0 {
        excess_return / downside_stddev * scale
    } else {
        0.0
    };

    (finite_or_zero(sharpe), finite_or_zero(sortino))
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() { value } else { 0.0 }
}
