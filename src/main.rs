mod config;
mod export;
mod observations;
mod pipeline;
mod predict;
mod report;
mod web;

use chrono::Utc;
use clap::{ArgGroup, Parser, Subcommand};
use std::process::ExitCode;

use crate::config::{validate_days, Config};
use crate::observations::{ObservationRecord, Weather};
use crate::pipeline::{analyze, predict_passes};
use crate::predict::{best_passes, HttpTleSource, ObserverLocation, PassSearch, PredictedPass};

#[derive(Parser)]
#[command(name = "iss-pass-log")]
#[command(about = "Predict ISS passes, log sightings and report prediction accuracy")]
struct Cli {
    /// YAML configuration file; built-in defaults are used when omitted
    #[arg(short, long, global = true)]
    config: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Predict passes and write the predictions CSV
    Predict {
        #[arg(long, allow_hyphen_values = true)]
        lat: Option<f64>,
        #[arg(long, allow_hyphen_values = true)]
        lon: Option<f64>,
        #[arg(long, allow_hyphen_values = true)]
        elevation: Option<f64>,
        #[arg(long)]
        days: Option<u32>,
        #[arg(long)]
        min_altitude: Option<f64>,
    },
    /// List predicted passes peaking at or above a threshold
    Best {
        #[arg(long)]
        threshold: Option<f64>,
    },
    /// Record whether a predicted pass was seen
    #[command(group(ArgGroup::new("outcome").required(true).args(["seen", "failed"])))]
    Log {
        pass_id: String,
        #[arg(long)]
        seen: bool,
        #[arg(long)]
        failed: bool,
        /// clear, partly_cloudy, cloudy, overcast or rainy
        #[arg(long, value_enum, ignore_case = true, default_value = "clear")]
        weather: Weather,
        #[arg(long, default_value = "")]
        notes: String,
        /// Estimated peak altitude in degrees
        #[arg(long)]
        altitude: Option<f64>,
    },
    /// Merge predictions with observations and print accuracy
    Report,
    /// Run the HTTP API
    Serve {
        #[arg(long)]
        bind: Option<String>,
    },
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => match Config::from_file(path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Error loading config {}: {}", path, e);
                return ExitCode::FAILURE;
            }
        },
        None => Config::default(),
    };

    match cli.command {
        Commands::Predict {
            lat,
            lon,
            elevation,
            days,
            min_altitude,
        } => predict(config, lat, lon, elevation, days, min_altitude),
        Commands::Best { threshold } => best(&config, threshold),
        Commands::Log {
            pass_id,
            seen,
            failed: _,
            weather,
            notes,
            altitude,
        } => log_observation(&config, pass_id, seen, weather, notes, altitude),
        Commands::Report => report(&config),
        Commands::Serve { bind } => serve(config, bind),
    }
}

fn predict(
    config: Config,
    lat: Option<f64>,
    lon: Option<f64>,
    elevation: Option<f64>,
    days: Option<u32>,
    min_altitude: Option<f64>,
) -> ExitCode {
    let location = ObserverLocation::new(
        lat.unwrap_or(config.observer.latitude_deg),
        lon.unwrap_or(config.observer.longitude_deg),
        elevation.unwrap_or(config.observer.elevation_m),
    );
    let days = days.unwrap_or(config.prediction.days);
    if let Err(e) = validate_days(days) {
        eprintln!("Error: {}", e);
        return ExitCode::FAILURE;
    }

    let search = PassSearch::days_ahead(
        Utc::now(),
        days,
        config.prediction.step,
        min_altitude.unwrap_or(config.prediction.min_altitude_deg),
    );

    let mut cache = config
        .tle
        .cache(HttpTleSource::new(config.tle.catalog_url.clone()));

    let passes = match predict_passes(&mut cache, config.tle.max_age, location, search) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Prediction failed: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = export::write_predictions(&config.output.predictions, &passes) {
        eprintln!("Error: {}", e);
        return ExitCode::FAILURE;
    }

    println!(
        "{} passes over {:.4}, {:.4} in the next {} days (written to {})",
        passes.len(),
        location.latitude_deg,
        location.longitude_deg,
        days,
        config.output.predictions.display()
    );
    print_passes(&passes);
    println!();
    print!("{}", report::passes_per_day_chart(&passes));
    ExitCode::SUCCESS
}

fn best(config: &Config, threshold: Option<f64>) -> ExitCode {
    let threshold = threshold.unwrap_or(config.prediction.best_threshold_deg);
    let passes = match export::read_predictions(&config.output.predictions) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Error reading predictions (run `predict` first): {}", e);
            return ExitCode::FAILURE;
        }
    };

    let best = best_passes(&passes, threshold);
    println!(
        "{} of {} passes peak at or above {:.0} deg",
        best.len(),
        passes.len(),
        threshold
    );
    print_passes(&best);
    ExitCode::SUCCESS
}

fn log_observation(
    config: &Config,
    pass_id: String,
    success: bool,
    weather: Weather,
    notes: String,
    altitude: Option<f64>,
) -> ExitCode {
    let mut observation = ObservationRecord::new(pass_id, success, weather).with_notes(notes);
    observation.actual_altitude = altitude;
    observation.observed_at = Some(Utc::now());

    if let Err(e) = observation.validate() {
        eprintln!("Invalid observation: {}", e);
        return ExitCode::FAILURE;
    }

    match export::read_predictions(&config.output.predictions) {
        Ok(passes) if !passes.iter().any(|p| p.pass_id == observation.pass_id) => {
            log::warn!(
                "Pass {} is not in {}; it will show up as unmatched",
                observation.pass_id,
                config.output.predictions.display()
            );
        }
        Ok(_) => {}
        Err(e) => log::warn!("Could not check pass id against predictions: {}", e),
    }

    match export::append_observation(&config.output.observations, observation) {
        Ok(log) => {
            println!(
                "Observation saved to {} ({} logged)",
                config.output.observations.display(),
                log.len()
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn report(config: &Config) -> ExitCode {
    let output = &config.output;
    let predictions = match export::read_predictions(&output.predictions) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Error reading predictions: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let observations = match export::read_observations(&output.observations) {
        Ok(o) => o,
        Err(e) => {
            eprintln!("Error reading observations: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let analytics = analyze(&predictions, &observations);
    if let Err(e) = export::write_merged(&output.merged, &analytics.merged) {
        eprintln!("Error: {}", e);
        return ExitCode::FAILURE;
    }

    println!(
        "{} predictions, {} observations, {} merged rows (written to {})",
        predictions.len(),
        observations.len(),
        analytics.merged.len(),
        output.merged.display()
    );

    let overall = &analytics.accuracy.overall;
    match overall.ratio {
        Some(ratio) => println!(
            "Accuracy: {}/{} matched observations successful ({:.1}%)",
            overall.successful,
            overall.matched,
            ratio * 100.0
        ),
        None => println!("Accuracy: undefined (no observations matched a prediction)"),
    }
    for (weather, accuracy) in &analytics.accuracy.by_weather {
        match accuracy.ratio {
            Some(ratio) => println!(
                "  {:<14} {}/{} ({:.1}%)",
                weather.to_string(),
                accuracy.successful,
                accuracy.matched,
                ratio * 100.0
            ),
            None => println!("  {:<14} undefined", weather.to_string()),
        }
    }

    for warning in &analytics.warnings {
        println!("Warning: {}", warning);
    }

    println!();
    print!("{}", report::passes_per_day_chart(&predictions));
    println!();
    print!("{}", report::outcome_chart(overall));
    ExitCode::SUCCESS
}

fn serve(mut config: Config, bind: Option<String>) -> ExitCode {
    if let Some(bind) = bind {
        config.web.bind = bind;
    }

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to start runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(web::run_server(config)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Server error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn print_passes(passes: &[PredictedPass]) {
    if passes.is_empty() {
        return;
    }
    println!(
        "  {:<17} {:<20} {:>6} {:>7} {:>5} {:>6}  {}",
        "pass_id", "peak (UTC)", "alt", "az", "mag", "min", "visibility"
    );
    for pass in passes {
        println!(
            "  {:<17} {:<20} {:>6.1} {:>7.1} {:>5.1} {:>6.1}  {}",
            pass.pass_id,
            pass.peak_time.format("%Y-%m-%d %H:%M:%S"),
            pass.peak_altitude,
            pass.azimuth,
            pass.magnitude,
            pass.duration_minutes,
            pass.visibility
        );
    }
}
