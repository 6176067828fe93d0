#![allow(dead_code)]

use arltrader::domain::backtest::BacktestConfig;
use arltrader::domain::engine::EngineConfig;
use arltrader::domain::error::ArlError;
use arltrader::domain::featurizer::FeatureBatch;
use arltrader::domain::risk::RiskControl;
pub use arltrader::domain::series::{PriceSeries, Quote};
use arltrader::ports::data_port::QuotePort;
use arltrader::ports::predictor_port::SignalPredictor;

pub struct MockQuotePort {
    pub quotes: Vec<Quote>,
    pub error: Option<String>,
}

impl MockQuotePort {
    pub fn new(quotes: Vec<Quote>) -> Self {
        Self {
            quotes,
            error: None,
        }
    }

    pub fn failing(reason: &str) -> Self {
        Self {
            quotes: Vec::new(),
            error: Some(reason.to_string()),
        }
    }
}

impl QuotePort for MockQuotePort {
    fn load_quotes(&self, limit: Option<usize>) -> Result<Vec<Quote>, ArlError> {
        if let Some(reason) = &self.error {
            return Err(ArlError::data(reason.clone()));
        }
        let n = limit.unwrap_or(self.quotes.len()).min(self.quotes.len());
        Ok(self.quotes[..n].to_vec())
    }
}

/// Follows the last return of each row, like a one-tick momentum rule.
#[derive(Default)]
pub struct LastReturnPredictor {
    pub train_calls: usize,
    pub predict_calls: usize,
}

impl SignalPredictor for LastReturnPredictor {
    fn train(&mut self, features: &FeatureBatch<'_>, targets: &[f64]) -> Result<(), ArlError> {
        assert_eq!(features.len(), targets.len());
        self.train_calls += 1;
        Ok(())
    }

    fn predict(&mut self, features: &FeatureBatch<'_>) -> Result<Vec<f64>, ArlError> {
        self.predict_calls += 1;
        Ok(features.iter().map(|row| row[row.len() - 1]).collect())
    }
}

/// Always outputs the same value.
pub struct ConstantPredictor(pub f64);

impl SignalPredictor for ConstantPredictor {
    fn train(&mut self, _features: &FeatureBatch<'_>, _targets: &[f64]) -> Result<(), ArlError> {
        Ok(())
    }

    fn predict(&mut self, features: &FeatureBatch<'_>) -> Result<Vec<f64>, ArlError> {
        Ok(vec![self.0; features.len()])
    }
}

/// Wraps another predictor and fails on a chosen `predict` call.
pub struct FailingPredictor<P> {
    pub inner: P,
    pub fail_on_call: usize,
    pub calls: usize,
    pub output: FailureKind,
}

pub enum FailureKind {
    Error,
    NaN,
    WrongLength,
}

impl<P: SignalPredictor> FailingPredictor<P> {
    pub fn new(inner: P, fail_on_call: usize, output: FailureKind) -> Self {
        Self {
            inner,
            fail_on_call,
            calls: 0,
            output,
        }
    }
}

impl<P: SignalPredictor> SignalPredictor for FailingPredictor<P> {
    fn train(&mut self, features: &FeatureBatch<'_>, targets: &[f64]) -> Result<(), ArlError> {
        self.inner.train(features, targets)
    }

    fn predict(&mut self, features: &FeatureBatch<'_>) -> Result<Vec<f64>, ArlError> {
        let call = self.calls;
        self.calls += 1;
        let mut out = self.inner.predict(features)?;
        if call != self.fail_on_call {
            return Ok(out);
        }
        match self.output {
            FailureKind::Error => Err(ArlError::predictor("model unavailable")),
            FailureKind::NaN => {
                out[0] = f64::NAN;
                Ok(out)
            }
            FailureKind::WrongLength => {
                out.pop();
                Ok(out)
            }
        }
    }
}

/// Deterministic oscillating price path.
pub fn wave_prices(n: usize) -> Vec<f64> {
    (0..n)
        .map(|i| {
            let t = i as f64;
            1.2 + 0.01 * (t * 0.37).sin() + 0.004 * (t * 1.3).cos()
        })
        .collect()
}

pub fn price_series(values: Vec<f64>) -> PriceSeries {
    PriceSeries::new(values).unwrap()
}

pub fn make_quotes(asks: &[f64], spread: f64) -> Vec<Quote> {
    asks.iter()
        .map(|&ask| Quote {
            timestamp: None,
            ask,
            bid: ask - spread,
        })
        .collect()
}

pub fn make_config(window: usize, train_len: usize, step: usize, engine: EngineConfig) -> BacktestConfig {
    BacktestConfig {
        window,
        train_len,
        step,
        engine,
    }
}

pub fn no_control(cost: f64) -> EngineConfig {
    EngineConfig::for_policy(cost, RiskControl::NoControl)
}
