use std::cmp::Ordering;

use bm_store::RatioRow;
use bm_store::UserConfig;

/// Default `scout_margin` (percent) when margin mode is on without an explicit value
pub const DEFAULT_SCOUT_MARGIN: f64 = 0.8;

/// How the distance between a pair's current and target ratio is measured.
///
/// The larger the difference, the closer the trading bot is to jumping to that coin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RatioPolicy {
    /// Percent gain over the target after fees, minus the required margin
    Margin { fee: f64, scout_margin: f64 },
    /// Current ratio reduced by the multiplied fee, minus the target
    ScoutMultiplier { fee: f64, multiplier: f64 },
    Plain,
}

impl RatioPolicy {
    /// Pick the policy `user.cfg` asks for: margin mode first, then a scout multiplier, else plain
    pub fn select(config: &UserConfig, fee: f64) -> Self {
        if config.margin_enabled() {
            RatioPolicy::Margin { fee, scout_margin: config.scout_margin.unwrap_or(DEFAULT_SCOUT_MARGIN) }
        } else if let Some(multiplier) = config.scout_multiplier {
            RatioPolicy::ScoutMultiplier { fee, multiplier }
        } else {
            RatioPolicy::Plain
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            RatioPolicy::Margin { .. } => "margin",
            RatioPolicy::ScoutMultiplier { .. } => "scout_multiplier",
            RatioPolicy::Plain => "plain",
        }
    }

    /// Difference between `current` and `target`; `None` when it cannot be computed
    pub fn delta(&self, current: f64, target: f64) -> Option<f64> {
        let delta = match *self {
            RatioPolicy::Margin { fee, scout_margin } => {
                if target == 0.0 {
                    return None;
                }
                ((1.0 - fee) * current / target - 1.0) * 100.0 - scout_margin
            }
            RatioPolicy::ScoutMultiplier { fee, multiplier } => current * (1.0 - fee * multiplier) - target,
            RatioPolicy::Plain => current - target,
        };
        delta.is_finite().then_some(delta)
    }

    /// Lines for every pair, largest difference first; pairs without a difference go last
    pub fn evaluate(&self, rows: &[RatioRow]) -> Vec<RatioLine> {
        let mut lines: Vec<RatioLine> = rows
            .iter()
            .map(|row| {
                let current = row.current_ratio();
                let delta = match (current, row.target_ratio) {
                    (Some(current), Some(target)) => self.delta(current, target),
                    _ => None,
                };
                RatioLine { coin: row.coin.clone(), current, target: row.target_ratio, delta }
            })
            .collect();
        lines.sort_by(|a, b| match (a.delta, b.delta) {
            (Some(a), Some(b)) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        });
        lines
    }
}

/// One pair from the current coin, ready for display
#[derive(Debug, Clone, PartialEq)]
pub struct RatioLine {
    pub coin: String,
    pub current: Option<f64>,
    pub target: Option<f64>,
    pub delta: Option<f64>,
}
