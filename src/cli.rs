//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::csv_quote_adapter::{ColumnRef, CsvQuoteAdapter};
use crate::adapters::csv_report_adapter::CsvReportAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::linear_predictor::{self, LinearPredictor};
use crate::adapters::momentum_predictor::MomentumPredictor;
use crate::adapters::tick_file_adapter::TickFileAdapter;
use crate::domain::backtest::{run_walk_forward, BacktestConfig, BacktestResult, WalkForward};
use crate::domain::config_validation::{
    delimiter_byte, optional_f64, optional_positive, required_positive, validate_config,
};
use crate::domain::engine::EngineConfig;
use crate::domain::equity::AccumulationMode;
use crate::domain::error::ArlError;
use crate::domain::metrics::{period_stats, CurveStats, ExposureStats};
use crate::domain::risk::RiskControl;
use crate::domain::series::{PriceField, PriceSeries, Quote, ReturnSeries};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::QuotePort;
use crate::ports::predictor_port::SignalPredictor;
use crate::ports::report_port::ReportPort;

pub const DEFAULT_OUTPUT: &str = "curve.csv";

#[derive(Parser, Debug)]
#[command(name = "arltrader", about = "Walk-forward backtester for directional trading signals")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a walk-forward backtest
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Use at most this many quotes
        #[arg(long)]
        limit: Option<usize>,
        #[arg(long)]
        dry_run: bool,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Show the loaded data and the resulting schedule
    Info {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Print per-period statistics of a curve file
    Stats {
        curve: PathBuf,
        #[arg(short, long, default_value_t = 1)]
        periods: usize,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Backtest {
            config,
            output,
            limit,
            dry_run,
        } => {
            if dry_run {
                run_dry_run(&config, limit)
            } else {
                run_backtest(&config, output.as_deref(), limit)
            }
        }
        Command::Validate { config } => run_validate(&config),
        Command::Info { config, limit } => run_info(&config, limit),
        Command::Stats { curve, periods } => run_stats(&curve, periods),
    }
}

fn fail(err: &ArlError) -> ExitCode {
    eprintln!("error: {err}");
    err.into()
}

/// Loads and validates a config file, applying a `--limit` override.
pub fn load_config(path: &Path, limit: Option<usize>) -> Result<FileConfigAdapter, ExitCode> {
    let mut adapter = FileConfigAdapter::from_file(path).map_err(|e| fail(&e))?;
    if let Some(limit) = limit {
        adapter.set("data", "limit", limit.to_string());
    }
    validate_config(&adapter).map_err(|e| fail(&e))?;
    Ok(adapter)
}

pub fn build_engine_config(config: &dyn ConfigPort) -> Result<EngineConfig, ArlError> {
    let cost = optional_f64(config, "engine", "cost")?.unwrap_or(0.0);
    let threshold = optional_f64(config, "engine", "threshold")?.unwrap_or(0.0);
    let kind = config
        .get_string("engine", "risk_control")
        .unwrap_or_else(|| "none".to_string());
    let risk_control =
        RiskControl::parse(&kind, threshold).ok_or_else(|| ArlError::ConfigInvalid {
            section: "engine".into(),
            key: "risk_control".into(),
            reason: format!("unknown risk control '{kind}'"),
        })?;

    let mut engine = EngineConfig::for_policy(cost, risk_control);
    if let Some(mode) = config.get_string("engine", "accumulation") {
        engine.accumulation =
            AccumulationMode::parse(&mode).ok_or_else(|| ArlError::ConfigInvalid {
                section: "engine".into(),
                key: "accumulation".into(),
                reason: format!("unknown accumulation mode '{mode}'"),
            })?;
        engine.initial_equity = engine.accumulation.default_initial_equity();
    }
    if let Some(initial) = optional_f64(config, "engine", "initial_equity")? {
        engine.initial_equity = initial;
    }
    engine.validate()?;
    Ok(engine)
}

pub fn build_backtest_config(config: &dyn ConfigPort) -> Result<BacktestConfig, ArlError> {
    Ok(BacktestConfig {
        window: required_positive(config, "model", "window")?,
        train_len: required_positive(config, "walkforward", "train")?,
        step: required_positive(config, "walkforward", "step")?,
        engine: build_engine_config(config)?,
    })
}

pub fn build_predictor(config: &dyn ConfigPort) -> Result<Box<dyn SignalPredictor>, ArlError> {
    let kind = config
        .get_string("model", "kind")
        .unwrap_or_else(|| "linear".to_string());
    match kind.to_lowercase().as_str() {
        "linear" => {
            let learning_rate = optional_f64(config, "model", "learning_rate")?
                .unwrap_or(linear_predictor::DEFAULT_LEARNING_RATE);
            let epochs = optional_positive(config, "model", "epochs")?
                .unwrap_or(linear_predictor::DEFAULT_EPOCHS);
            Ok(Box::new(LinearPredictor::new(learning_rate, epochs)))
        }
        "momentum" => Ok(Box::new(MomentumPredictor::default())),
        other => Err(ArlError::ConfigInvalid {
            section: "model".into(),
            key: "kind".into(),
            reason: format!("unknown model kind '{other}'"),
        }),
    }
}

pub fn build_quote_port(config: &dyn ConfigPort) -> Result<Box<dyn QuotePort>, ArlError> {
    let path = config
        .get_string("data", "path")
        .ok_or_else(|| ArlError::ConfigMissing {
            section: "data".into(),
            key: "path".into(),
        })?;
    let format = config.get_string("data", "format").unwrap_or_else(|| {
        if path.to_lowercase().ends_with(".csv") {
            "csv".to_string()
        } else {
            "dat".to_string()
        }
    });

    if format.to_lowercase() != "csv" {
        return Ok(Box::new(TickFileAdapter::new(path)));
    }

    let delimiter = config
        .get_string("data", "delimiter")
        .and_then(|d| delimiter_byte(&d))
        .unwrap_or(b',');
    let has_headers = config.get_bool("data", "has_headers", true);
    let ask = config
        .get_string("data", "ask_column")
        .map(|c| ColumnRef::parse(&c))
        .unwrap_or(if has_headers {
            ColumnRef::Name("ask".into())
        } else {
            ColumnRef::Index(0)
        });
    let bid = match config.get_string("data", "bid_column") {
        Some(c) => Some(ColumnRef::parse(&c)),
        None if has_headers => Some(ColumnRef::Name("bid".into())),
        None => None,
    };
    Ok(Box::new(
        CsvQuoteAdapter::new(path)
            .with_delimiter(delimiter)
            .with_headers(has_headers)
            .with_columns(ask, bid),
    ))
}

pub fn price_field(config: &dyn ConfigPort) -> PriceField {
    config
        .get_string("data", "field")
        .and_then(|f| PriceField::parse(&f))
        .unwrap_or_default()
}

/// Loads quotes and builds the price series, checking there is enough data
/// for at least one segment.
pub fn load_prices(
    quote_port: &dyn QuotePort,
    field: PriceField,
    limit: Option<usize>,
    bt_config: &BacktestConfig,
) -> Result<(Vec<Quote>, PriceSeries), ArlError> {
    let quotes = quote_port.load_quotes(limit)?;
    let minimum = bt_config.window + bt_config.train_len + 1;
    if quotes.len() < minimum {
        return Err(ArlError::InsufficientData {
            have: quotes.len(),
            minimum,
        });
    }
    let prices = PriceSeries::from_quotes(&quotes, field)?;
    Ok((quotes, prices))
}

fn run_backtest(config_path: &Path, output_path: Option<&Path>, limit: Option<usize>) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path, limit) {
        Ok(a) => a,
        Err(code) => return code,
    };

    let bt_config = match build_backtest_config(&adapter) {
        Ok(c) => c,
        Err(e) => return fail(&e),
    };
    let quote_port = match build_quote_port(&adapter) {
        Ok(p) => p,
        Err(e) => return fail(&e),
    };
    let mut predictor = match build_predictor(&adapter) {
        Ok(p) => p,
        Err(e) => return fail(&e),
    };

    let output = output_path
        .map(Path::to_path_buf)
        .or_else(|| adapter.get_string("report", "output").map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT));
    let periods = adapter.get_int("report", "periods", 1).max(1) as usize;
    let limit = adapter.get_int("data", "limit", 0);
    let limit = (limit > 0).then_some(limit as usize);

    run_backtest_pipeline(
        quote_port.as_ref(),
        predictor.as_mut(),
        &bt_config,
        price_field(&adapter),
        limit,
        &CsvReportAdapter::new(),
        &output,
        periods,
    )
}

/// Loads data, runs the walk-forward backtest, prints a summary and writes
/// the curve. A run aborted part way still writes the curve of the segments
/// that completed.
#[allow(clippy::too_many_arguments)]
pub fn run_backtest_pipeline(
    quote_port: &dyn QuotePort,
    predictor: &mut dyn SignalPredictor,
    bt_config: &BacktestConfig,
    field: PriceField,
    limit: Option<usize>,
    report: &dyn ReportPort,
    output: &Path,
    periods: usize,
) -> ExitCode {
    let (_, prices) = match load_prices(quote_port, field, limit, bt_config) {
        Ok(p) => p,
        Err(e) => return fail(&e),
    };

    eprintln!(
        "Running walk-forward backtest: {} prices, window {}, train {}, step {}",
        prices.len(),
        bt_config.window,
        bt_config.train_len,
        bt_config.step
    );
    eprintln!(
        "  Engine: cost {}, risk control {}, {} accumulation",
        bt_config.engine.cost, bt_config.engine.risk_control, bt_config.engine.accumulation
    );

    let (result, error) = match run_walk_forward(bt_config, &prices, predictor) {
        Ok(result) => (result, None),
        Err(aborted) => {
            eprintln!("error: {aborted}");
            if aborted.source.is_config_error() {
                return (&aborted.source).into();
            }
            eprintln!(
                "warning: keeping {} segments completed before the failure",
                aborted.partial.segments.len()
            );
            (aborted.partial, Some(aborted.source))
        }
    };

    print_summary(&result, periods);

    let output_str = output.display().to_string();
    match report.write(&result, &output_str) {
        Ok(()) => eprintln!("\nCurve written to: {output_str}"),
        Err(e) => return fail(&e),
    }

    match error {
        Some(e) => (&e).into(),
        None => ExitCode::SUCCESS,
    }
}

fn print_summary(result: &BacktestResult, periods: usize) {
    let exposure = ExposureStats::from_result(result);
    eprintln!("\n=== Results ===");
    eprintln!("Segments:         {}", result.segments.len());
    eprintln!("Scored Ticks:     {}", result.pnl.len());
    eprintln!("Final Equity:     {:.6}", result.final_equity());
    if let Some(stats) = CurveStats::compute(&result.curve) {
        eprintln!("Total Change:     {:.6}", stats.total_change);
        eprintln!(
            "Max Drawdown:     {:.6} (step {} to {})",
            stats.max_drawdown.depth(),
            stats.max_drawdown.peak_index,
            stats.max_drawdown.trough_index
        );
    }
    eprintln!("Position Changes: {}", exposure.position_changes);
    eprintln!("Risk Overrides:   {}", exposure.overrides);
    eprintln!(
        "Time in Market:   {:.1}%",
        exposure.time_in_market() * 100.0
    );
    if periods > 1 {
        print_period_table(&result.curve, periods);
    }
}

fn print_period_table(curve: &[f64], periods: usize) {
    println!("period,start,end,peak,trough,drawdown,change,mean,variance");
    for p in period_stats(curve, periods) {
        let s = &p.stats;
        println!(
            "{},{},{},{:.5},{:.5},{:.5},{:.5},{:.5},{:.5}",
            p.period + 1,
            p.range.start,
            p.range.end,
            s.max_drawdown.peak,
            s.max_drawdown.trough,
            s.max_drawdown.depth(),
            s.total_change,
            s.mean,
            s.variance
        );
    }
}

pub fn run_dry_run(config_path: &Path, limit: Option<usize>) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path, limit) {
        Ok(a) => a,
        Err(code) => return code,
    };
    eprintln!("Config validated successfully");

    let bt_config = match build_backtest_config(&adapter) {
        Ok(c) => c,
        Err(e) => return fail(&e),
    };
    let quote_port = match build_quote_port(&adapter) {
        Ok(p) => p,
        Err(e) => return fail(&e),
    };
    let limit = optional_positive(&adapter, "data", "limit").ok().flatten();
    let (_, prices) = match load_prices(quote_port.as_ref(), price_field(&adapter), limit, &bt_config)
    {
        Ok(p) => p,
        Err(e) => return fail(&e),
    };
    let returns = match ReturnSeries::from_prices(&prices) {
        Ok(r) => r,
        Err(e) => return fail(&e),
    };
    let walk = match WalkForward::new(&bt_config, &prices, &returns) {
        Ok(w) => w,
        Err(e) => return fail(&e),
    };

    let scheduler = walk.scheduler();
    eprintln!("\nSchedule:");
    eprintln!("  prices:        {}", prices.len());
    eprintln!("  labelled rows: {}", scheduler.total());
    eprintln!("  segments:      {}", scheduler.segment_count());
    eprintln!("  scored ticks:  {}", scheduler.scored_rows());
    eprintln!("\nEngine:");
    eprintln!("  cost:          {}", bt_config.engine.cost);
    eprintln!("  risk control:  {}", bt_config.engine.risk_control);
    eprintln!("  accumulation:  {}", bt_config.engine.accumulation);
    eprintln!("  initial:       {}", bt_config.engine.initial_equity);

    eprintln!("\nDry run complete: configuration is valid");
    ExitCode::SUCCESS
}

fn run_validate(config_path: &Path) -> ExitCode {
    eprintln!("Validating config: {}", config_path.display());
    let adapter = match load_config(config_path, None) {
        Ok(a) => a,
        Err(code) => return code,
    };
    let bt_config = match build_backtest_config(&adapter) {
        Ok(c) => c,
        Err(e) => return fail(&e),
    };
    if let Err(e) = build_predictor(&adapter) {
        return fail(&e);
    }

    eprintln!("  window:        {}", bt_config.window);
    eprintln!("  train / step:  {} / {}", bt_config.train_len, bt_config.step);
    eprintln!("  risk control:  {}", bt_config.engine.risk_control);
    eprintln!(
        "  minimum data:  {} quotes",
        bt_config.window + bt_config.train_len + 1
    );
    eprintln!("\nConfiguration is valid.");
    ExitCode::SUCCESS
}

fn run_info(config_path: &Path, limit: Option<usize>) -> ExitCode {
    let adapter = match load_config(config_path, limit) {
        Ok(a) => a,
        Err(code) => return code,
    };
    let quote_port = match build_quote_port(&adapter) {
        Ok(p) => p,
        Err(e) => return fail(&e),
    };
    let limit = optional_positive(&adapter, "data", "limit").ok().flatten();
    let quotes = match quote_port.load_quotes(limit) {
        Ok(q) => q,
        Err(e) => return fail(&e),
    };
    if quotes.is_empty() {
        eprintln!("No quotes found");
        return ExitCode::from(3);
    }

    let field = price_field(&adapter);
    let (low, high) = quotes
        .iter()
        .map(|q| field.select(q))
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| {
            (lo.min(p), hi.max(p))
        });
    let first = quotes.iter().find_map(|q| q.timestamp);
    let last = quotes.iter().rev().find_map(|q| q.timestamp);

    println!("quotes: {}", quotes.len());
    match (first, last) {
        (Some(a), Some(b)) => println!("range: {a} to {b}"),
        _ => println!("range: no timestamps"),
    }
    println!("price: {low} to {high}");
    let mean_spread = quotes.iter().map(Quote::spread).sum::<f64>() / quotes.len() as f64;
    println!("mean spread: {mean_spread}");

    if let Ok(bt_config) = build_backtest_config(&adapter) {
        let labelled = quotes.len().saturating_sub(bt_config.window);
        if labelled > bt_config.train_len {
            let segments = (labelled - bt_config.train_len).div_ceil(bt_config.step);
            println!("segments: {segments}");
        } else {
            println!("segments: 0 (need at least {} quotes)", bt_config.window + bt_config.train_len + 1);
        }
    }
    ExitCode::SUCCESS
}

fn run_stats(curve_path: &Path, periods: usize) -> ExitCode {
    let curve = match CsvReportAdapter::read_curve(curve_path) {
        Ok(c) => c,
        Err(e) => return fail(&e),
    };
    if curve.is_empty() {
        eprintln!("error: {} holds no curve points", curve_path.display());
        return ExitCode::from(3);
    }
    print_period_table(&curve, periods.max(1));
    ExitCode::SUCCESS
}
