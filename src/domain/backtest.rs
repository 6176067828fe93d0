//! Walk-forward backtest driver.
//!
//! For every segment the predictor is retrained on the training rows, scores
//! the test rows, and the engine turns the resulting signals into P&L. Engine
//! state flows from one segment into the next, so segments run strictly in
//! timeline order.

use std::ops::Range;

use tracing::{debug, info};

use super::engine::{CarriedState, EngineConfig, PositionEngine, SegmentPnl};
use super::equity::{AccumulationMode, EquityAccumulator};
use super::error::ArlError;
use super::featurizer::{FeatureMatrix, WindowFeaturizer};
use super::schedule::{WalkForwardScheduler, WalkForwardSegment};
use super::series::{PriceSeries, ReturnSeries};
use super::signal::{signals_from_predictions, Signal};
use crate::ports::predictor_port::SignalPredictor;

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    /// Feature window length (W).
    pub window: usize,
    /// Training rows per segment (m).
    pub train_len: usize,
    /// Test rows per segment (o).
    pub step: usize,
    pub engine: EngineConfig,
}

/// Per-segment summary kept alongside the curve.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentSummary {
    pub index: usize,
    pub train: Range<usize>,
    pub test: Range<usize>,
    pub pnl: f64,
    pub end_equity: f64,
    pub overrides: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestResult {
    pub mode: AccumulationMode,
    /// Cumulative curve: the starting equity followed by one point per scored tick.
    pub curve: Vec<f64>,
    /// Net P&L per scored tick.
    pub pnl: Vec<f64>,
    /// Predictor signals per scored tick.
    pub raw_signals: Vec<Signal>,
    /// Signals after risk control.
    pub signals: Vec<Signal>,
    pub segments: Vec<SegmentSummary>,
    /// State to resume a later run from.
    pub final_state: CarriedState,
}

impl BacktestResult {
    pub fn final_equity(&self) -> f64 {
        self.curve.last().copied().unwrap_or(self.final_state.equity)
    }

    pub fn overrides(&self) -> usize {
        self.segments.iter().map(|s| s.overrides).sum()
    }
}

/// A run stopped by an error. Segments completed before the failing one are
/// kept in `partial`; the caller decides whether to use them.
#[derive(Debug, Clone, thiserror::Error)]
#[error("run aborted in segment {segment}: {source}")]
pub struct RunAborted {
    pub segment: usize,
    #[source]
    pub source: ArlError,
    pub partial: BacktestResult,
}

/// Validated walk-forward setup over one price series.
#[derive(Debug, Clone)]
pub struct WalkForward<'a> {
    engine: EngineConfig,
    prices: &'a [f64],
    matrix: FeatureMatrix<'a>,
    scheduler: WalkForwardScheduler,
}

impl<'a> WalkForward<'a> {
    /// Checks the whole configuration up front; nothing runs on bad config.
    pub fn new(
        config: &BacktestConfig,
        prices: &'a PriceSeries,
        returns: &'a ReturnSeries,
    ) -> Result<Self, ArlError> {
        if prices.len() != returns.len() {
            return Err(ArlError::LengthMismatch {
                what: "returns".to_string(),
                expected: prices.len(),
                actual: returns.len(),
            });
        }
        config.engine.validate()?;
        let matrix = WindowFeaturizer::new(config.window).featurize(returns.values())?;
        let scheduler =
            WalkForwardScheduler::new(matrix.labelled_rows(), config.train_len, config.step)?;
        Ok(Self {
            engine: config.engine.clone(),
            prices: prices.values(),
            matrix,
            scheduler,
        })
    }

    pub fn scheduler(&self) -> &WalkForwardScheduler {
        &self.scheduler
    }

    pub fn matrix(&self) -> &FeatureMatrix<'a> {
        &self.matrix
    }

    /// Runs every segment from a fresh engine.
    pub fn run<P>(&self, predictor: &mut P) -> Result<BacktestResult, RunAborted>
    where
        P: SignalPredictor + ?Sized,
    {
        let engine = PositionEngine::new(self.engine.clone());
        self.run_with(predictor, engine, self.scheduler.segments())
    }

    /// Runs the given segments in order, continuing from the engine's state.
    pub fn run_with<P, I>(
        &self,
        predictor: &mut P,
        mut engine: PositionEngine,
        segments: I,
    ) -> Result<BacktestResult, RunAborted>
    where
        P: SignalPredictor + ?Sized,
        I: IntoIterator<Item = WalkForwardSegment>,
    {
        let mode = engine.config().accumulation;
        let mut accumulator = EquityAccumulator::new(mode, engine.state().equity);
        let mut raw_signals = Vec::new();
        let mut signals = Vec::new();
        let mut summaries = Vec::new();

        info!(
            rows = self.scheduler.total(),
            segments = self.scheduler.segment_count(),
            policy = %engine.config().risk_control,
            %mode,
            "starting walk-forward run"
        );

        for segment in segments {
            match self.score_segment(predictor, &mut engine, &segment) {
                Ok((raw, out)) => {
                    accumulator.append(&out);
                    let summary = SegmentSummary {
                        index: segment.index,
                        train: segment.train.clone(),
                        test: segment.test.clone(),
                        pnl: out.pnl.iter().sum(),
                        end_equity: engine.state().equity,
                        overrides: out.overrides,
                    };
                    debug!(
                        segment = summary.index,
                        pnl = summary.pnl,
                        equity = summary.end_equity,
                        overrides = summary.overrides,
                        "segment scored"
                    );
                    raw_signals.extend(raw);
                    signals.extend(out.effective);
                    summaries.push(summary);
                }
                Err(source) => {
                    let partial = BacktestResult {
                        mode,
                        curve: accumulator.curve(),
                        pnl: accumulator.pnl().to_vec(),
                        raw_signals,
                        signals,
                        segments: summaries,
                        final_state: engine.into_state(),
                    };
                    return Err(RunAborted {
                        segment: segment.index,
                        source,
                        partial,
                    });
                }
            }
        }

        let result = BacktestResult {
            mode,
            curve: accumulator.curve(),
            pnl: accumulator.pnl().to_vec(),
            raw_signals,
            signals,
            segments: summaries,
            final_state: engine.into_state(),
        };
        info!(
            ticks = result.pnl.len(),
            final_equity = result.final_equity(),
            overrides = result.overrides(),
            "walk-forward run complete"
        );
        Ok(result)
    }

    fn score_segment<P>(
        &self,
        predictor: &mut P,
        engine: &mut PositionEngine,
        segment: &WalkForwardSegment,
    ) -> Result<(Vec<Signal>, SegmentPnl), ArlError>
    where
        P: SignalPredictor + ?Sized,
    {
        let train = self.matrix.batch(segment.train.clone());
        predictor.train(&train, self.matrix.targets(segment.train.clone()))?;

        let test = self.matrix.batch(segment.test.clone());
        let predictions = predictor.predict(&test)?;
        if predictions.len() != test.len() {
            return Err(ArlError::predictor(format!(
                "returned {} predictions for {} rows",
                predictions.len(),
                test.len()
            )));
        }
        let raw = signals_from_predictions(&predictions)?;

        let returns = self.matrix.targets(segment.test.clone());
        let prices = self.decision_prices(&segment.test);
        let out = engine.run_segment(&raw, returns, Some(prices))?;
        Ok((raw, out))
    }

    /// Prices at the decision tick of each row.
    fn decision_prices(&self, rows: &Range<usize>) -> &'a [f64] {
        let offset = self.matrix.window() - 1;
        &self.prices[rows.start + offset..rows.end + offset]
    }
}

/// Validates, then runs the full walk-forward protocol over `prices`.
pub fn run_walk_forward<P>(
    config: &BacktestConfig,
    prices: &PriceSeries,
    predictor: &mut P,
) -> Result<BacktestResult, RunAborted>
where
    P: SignalPredictor + ?Sized,
{
    let returns = ReturnSeries::from_prices(prices).map_err(|e| setup_failure(config, e))?;
    let walk = WalkForward::new(config, prices, &returns).map_err(|e| setup_failure(config, e))?;
    walk.run(predictor)
}

fn setup_failure(config: &BacktestConfig, source: ArlError) -> RunAborted {
    let state = CarriedState::initial(&config.engine);
    RunAborted {
        segment: 0,
        source,
        partial: BacktestResult {
            mode: config.engine.accumulation,
            curve: vec![state.equity],
            pnl: Vec::new(),
            raw_signals: Vec::new(),
            signals: Vec::new(),
            segments: Vec::new(),
            final_state: state,
        },
    }
}
