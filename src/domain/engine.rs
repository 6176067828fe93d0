//! Position and P&L state machine.
//!
//! The engine consumes aligned per-tick inputs: the raw signal `F_j`, the
//! return `ret_j` earned by the position held at tick `j`, and (for the price
//! policy) the market price at tick `j`. For each tick it consults the risk
//! policy, then books
//!
//! `pnl_j = base_j * F_j * ret_j - cost * |F_j - F_{j-1}|`
//!
//! where `F` is the effective (post-policy) signal and `base_j` is the equity
//! level before the tick when chaining, `1` when summing returns. Equity,
//! previous signal and policy state carry over from one segment to the next.

use tracing::trace;

use super::equity::AccumulationMode;
use super::error::ArlError;
use super::risk::{RiskControl, RiskState};
use super::signal::Signal;

#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Transaction cost per unit of position change.
    pub cost: f64,
    pub risk_control: RiskControl,
    pub accumulation: AccumulationMode,
    pub initial_equity: f64,
}

impl EngineConfig {
    /// Config with the accumulation mode and initial equity the policy implies.
    pub fn for_policy(cost: f64, risk_control: RiskControl) -> Self {
        let accumulation = risk_control.default_accumulation();
        Self {
            cost,
            risk_control,
            accumulation,
            initial_equity: accumulation.default_initial_equity(),
        }
    }

    pub fn validate(&self) -> Result<(), ArlError> {
        if !self.cost.is_finite() || self.cost < 0.0 {
            return Err(invalid_engine_key("cost", "cost must be finite and non-negative"));
        }
        self.risk_control
            .validate()
            .map_err(|reason| invalid_engine_key("threshold", &reason))?;
        if !self.initial_equity.is_finite() {
            return Err(invalid_engine_key("initial_equity", "initial_equity must be finite"));
        }
        Ok(())
    }
}

fn invalid_engine_key(key: &str, reason: &str) -> ArlError {
    ArlError::ConfigInvalid {
        section: "engine".to_string(),
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

/// State handed from one segment to the next.
#[derive(Debug, Clone, PartialEq)]
pub struct CarriedState {
    /// Equity level after the last scored tick.
    pub equity: f64,
    /// Effective signal of the last scored tick.
    pub previous: Signal,
    pub risk: RiskState,
    /// Ticks scored so far.
    pub ticks: usize,
}

impl CarriedState {
    pub fn initial(config: &EngineConfig) -> Self {
        Self {
            equity: config.initial_equity,
            previous: Signal::Flat,
            risk: RiskState::new(config.initial_equity),
            ticks: 0,
        }
    }
}

/// Output of one segment.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentPnl {
    /// Net P&L per tick.
    pub pnl: Vec<f64>,
    /// Equity level after each tick.
    pub equity: Vec<f64>,
    /// Effective signal per tick, overrides applied.
    pub effective: Vec<Signal>,
    /// Ticks where the policy changed the raw signal.
    pub overrides: usize,
}

#[derive(Debug, Clone)]
pub struct PositionEngine {
    config: EngineConfig,
    state: CarriedState,
}

impl PositionEngine {
    pub fn new(config: EngineConfig) -> Self {
        let state = CarriedState::initial(&config);
        Self { config, state }
    }

    /// Resumes from state carried out of an earlier run.
    pub fn with_state(config: EngineConfig, state: CarriedState) -> Self {
        Self { config, state }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn state(&self) -> &CarriedState {
        &self.state
    }

    pub fn into_state(self) -> CarriedState {
        self.state
    }

    /// Scores one segment. `raw`, `returns` and `prices` are aligned tick by
    /// tick. The segment is atomic: on error the carried state is unchanged.
    pub fn run_segment(
        &mut self,
        raw: &[Signal],
        returns: &[f64],
        prices: Option<&[f64]>,
    ) -> Result<SegmentPnl, ArlError> {
        check_lengths(raw.len(), returns, prices)?;
        if self.config.risk_control.requires_prices() && prices.is_none() {
            return Err(ArlError::MissingPrices);
        }

        let mut state = self.state.clone();
        let mut effective = raw.to_vec();
        let mut pnl = Vec::with_capacity(raw.len());
        let mut equity = Vec::with_capacity(raw.len());
        let mut overrides = 0;

        for j in 0..effective.len() {
            let price = prices.map(|p| p[j]);
            let (signal, net) = self.step(&mut state, effective[j], returns[j], price)?;
            if signal != effective[j] {
                trace!(tick = state.ticks - 1, raw = %effective[j], "risk control forced flat");
                effective[j] = signal;
                overrides += 1;
            }
            pnl.push(net);
            equity.push(state.equity);
        }

        self.state = state;
        Ok(SegmentPnl {
            pnl,
            equity,
            effective,
            overrides,
        })
    }

    /// Scores a sequence whose first element is the position already held:
    /// element 0 seeds the previous signal and the policy, P&L is produced for
    /// elements `1..`, so the output is one shorter than the input.
    pub fn replay(
        &mut self,
        signals: &[Signal],
        returns: &[f64],
        prices: Option<&[f64]>,
    ) -> Result<SegmentPnl, ArlError> {
        check_lengths(signals.len(), returns, prices)?;
        let Some(&seed) = signals.first() else {
            return Ok(SegmentPnl {
                pnl: Vec::new(),
                equity: Vec::new(),
                effective: Vec::new(),
                overrides: 0,
            });
        };

        let watermark = if self.config.risk_control.requires_prices() {
            let first = prices.and_then(|p| p.first().copied());
            first.ok_or(ArlError::MissingPrices)?
        } else {
            self.state.equity
        };

        let saved = self.state.clone();
        self.state.previous = seed;
        self.state.risk = RiskState {
            last_position: seed,
            watermark,
            stopped: false,
        };
        let result = self.run_segment(&signals[1..], &returns[1..], prices.map(|p| &p[1..]));
        if result.is_err() {
            self.state = saved;
        }
        result
    }

    fn step(
        &self,
        state: &mut CarriedState,
        raw: Signal,
        ret: f64,
        price: Option<f64>,
    ) -> Result<(Signal, f64), ArlError> {
        let tick = state.ticks;
        if !ret.is_finite() {
            return Err(ArlError::numeric(tick, format!("return {ret} is not finite")));
        }
        if let Some(p) = price {
            if !p.is_finite() {
                return Err(ArlError::numeric(tick, format!("price {p} is not finite")));
            }
        }

        let signal = self
            .config
            .risk_control
            .apply(&mut state.risk, raw, state.equity, price)?;

        let base = match self.config.accumulation {
            AccumulationMode::Additive => 1.0,
            AccumulationMode::Chained => state.equity,
        };
        let cost = self.config.cost * signal.turnover(state.previous);
        let net = base * signal.as_f64() * ret - cost;
        let equity = state.equity + net;
        if !equity.is_finite() {
            return Err(ArlError::numeric(tick, format!("equity {equity} is not finite")));
        }

        state.equity = equity;
        state.previous = signal;
        state.ticks += 1;
        Ok((signal, net))
    }
}

fn check_lengths(len: usize, returns: &[f64], prices: Option<&[f64]>) -> Result<(), ArlError> {
    if returns.len() != len {
        return Err(ArlError::LengthMismatch {
            what: "returns".to_string(),
            expected: len,
            actual: returns.len(),
        });
    }
    if let Some(p) = prices {
        if p.len() != len {
            return Err(ArlError::LengthMismatch {
                what: "prices".to_string(),
                expected: len,
                actual: p.len(),
            });
        }
    }
    Ok(())
}
