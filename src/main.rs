// Entry point and high-level console flow.
//
// The binary drives the two dashboard tabs from a simple stdin menu:
// - Option [1] runs one prediction: trip inputs -> encoded identifiers ->
//   primary model -> five impact models -> environmental history.
// - Option [2] recomputes the three fleet-wide aggregates, previews them
//   and exports CSV/JSON files for downstream charting.
// - After the fleet reports, the user can choose to go back to the menu
//   or exit.
mod encoder;
mod error;
mod history;
mod loader;
mod model;
mod output;
mod pipeline;
mod reports;
mod types;
mod util;

use std::io::{self, Write};
use std::path::Path;

use tracing_subscriber::EnvFilter;

use loader::FleetContext;
use pipeline::PredictionRequest;
use types::{
    FrequencyRow, HistoryRow, MetricRow, TopVehicleRow, TripFeatures, ZoneAverageRow,
    DEFAULT_UNIT_PRICE,
};

/// Read a single line of input after printing the common "Enter choice:" prompt.
///
/// The prompt is reused for both the main menu and simple numeric inputs.
fn read_choice() -> String {
    print!("Enter choice: ");
    let _ = io::stdout().flush();
    let mut buf = String::new();
    io::stdin().read_line(&mut buf).ok();
    buf.trim().to_string()
}

fn prompt_line(label: &str) -> String {
    print!("{}: ", label);
    let _ = io::stdout().flush();
    let mut buf = String::new();
    io::stdin().read_line(&mut buf).ok();
    buf.trim().to_string()
}

/// Prompt for a non-negative number, re-prompting until the input parses.
/// An empty line yields `default` when one is given.
fn prompt_f64(label: &str, default: Option<f64>) -> f64 {
    loop {
        let raw = match default {
            Some(d) => prompt_line(&format!("{} [{}]", label, d)),
            None => prompt_line(label),
        };
        if raw.is_empty() {
            if let Some(d) = default {
                return d;
            }
        }
        match raw.parse::<f64>() {
            Ok(v) if v.is_finite() && v >= 0.0 => return v,
            _ => println!("Invalid value. Please enter a non-negative number."),
        }
    }
}

/// Prompt for an integer within an inclusive range, re-prompting until valid.
fn prompt_u32(label: &str, min: u32, max: u32) -> u32 {
    loop {
        let raw = prompt_line(&format!("{} ({}-{})", label, min, max));
        match raw.parse::<u32>() {
            Ok(v) if (min..=max).contains(&v) => return v,
            _ => println!("Invalid value. Please enter a number in {}..={}.", min, max),
        }
    }
}

/// Handle option [1]: one prediction request end to end.
///
/// The whole panel either fully succeeds or prints a single error line;
/// no partial output is committed on an encoder or primary-model failure.
fn handle_prediction(ctx: &FleetContext) {
    println!("\nVehicle Performance Prediction\n");
    let distance = prompt_f64("Estimated distance (km)", None);
    let unit_price = prompt_f64("Fuel unit price", Some(DEFAULT_UNIT_PRICE));
    let month = prompt_u32("Month", 1, 12);
    let weekday = prompt_u32("Weekday (0=Monday)", 0, 6);
    let vin = prompt_line("VIN NUMBER");
    let cc = prompt_line("CC (e.g. MX10001)");

    let trip = match TripFeatures::new(distance, unit_price, month, weekday) {
        Ok(t) => t,
        Err(e) => {
            println!("Prediction failed: {}\n", e);
            return;
        }
    };
    let request = PredictionRequest { trip, vin, cc };

    let report = match pipeline::run(ctx, &request) {
        Ok(r) => r,
        Err(e) => {
            println!("Prediction failed: {}\n", e);
            return;
        }
    };

    println!(
        "\nEstimated delivered quantity: {} units",
        util::format_number(report.quantity, 2)
    );

    println!("\nEnvironmental Impact and Estimated Costs\n");
    let metric_rows: Vec<MetricRow> = report
        .impact
        .values
        .iter()
        .map(|(kind, value)| MetricRow {
            metric: kind.label(),
            value: util::format_number(*value, 2),
        })
        .collect();
    output::preview_table_rows(&metric_rows, metric_rows.len());
    for (kind, err) in &report.impact.failures {
        println!("Metric unavailable ({}): {}", kind.label(), err);
    }
    if !report.impact.failures.is_empty() {
        println!("");
    }

    println!("Environmental History for this Vehicle and Zone\n");
    if report.history.is_empty() {
        println!("No historical data for this vehicle and zone.\n");
        return;
    }
    let history_rows: Vec<HistoryRow> = report.history.iter().map(HistoryRow::from_record).collect();
    output::preview_table_rows(&history_rows, 12);
    if history_rows.len() > 12 {
        println!("({} months total, first 12 shown)\n", history_rows.len());
    }
}

/// Handle option [2]: recompute the fleet aggregates, preview them and
/// export CSV/JSON files.
///
/// This function is intentionally side-effectful:
/// - writes three CSV files,
/// - writes a JSON summary,
/// - and prints Markdown previews of each report to the console.
fn handle_fleet_analysis(ctx: &FleetContext) {
    println!("Generating fleet reports...");
    println!("Outputs saved to individual files...\n");

    let zones = reports::zone_averages(&ctx.history);
    let zone_rows: Vec<ZoneAverageRow> = zones.iter().map(ZoneAverageRow::from_stat).collect();
    let file1 = "zone_averages.csv";
    if let Err(e) = output::write_csv(file1, &zone_rows) {
        eprintln!("Write error: {}", e);
    }
    println!("Report 1: Mean Delivered Quantity per Zone\n");
    output::preview_table_rows(&zone_rows, 10);
    println!("(Full table exported to {})\n", file1);

    let top = reports::top_vehicles(&ctx.history, reports::TOP_VEHICLES);
    let top_rows: Vec<TopVehicleRow> = top
        .iter()
        .enumerate()
        .map(|(idx, stat)| TopVehicleRow::from_stat(idx + 1, stat))
        .collect();
    let file2 = "top_vehicles.csv";
    if let Err(e) = output::write_csv(file2, &top_rows) {
        eprintln!("Write error: {}", e);
    }
    println!("Report 2: Top {} Vehicles by Mean Delivered Quantity (VIN + Plate)\n", reports::TOP_VEHICLES);
    output::preview_table_rows(&top_rows, reports::TOP_VEHICLES);
    println!("(Full table exported to {})\n", file2);

    let markers = reports::frequency_map(&ctx.history);
    let freq_rows: Vec<FrequencyRow> = markers.iter().map(FrequencyRow::from_marker).collect();
    let file3 = "frequency_map.csv";
    if let Err(e) = output::write_csv(file3, &freq_rows) {
        eprintln!("Write error: {}", e);
    }
    println!("Report 3: Delivery Frequency by State and Vehicle\n");
    output::preview_table_rows(&freq_rows, 10);
    println!("(Full table exported to {})\n", file3);

    let summary = reports::fleet_summary(&ctx.history);
    if let Err(e) = output::write_json("fleet_summary.json", &summary) {
        eprintln!("Write error: {}", e);
    }
    println!(
        "Summary (fleet_summary.json): {} records, {} vehicles, {} zones, mean quantity {}\n",
        util::format_int(summary.total_records as i64),
        util::format_int(summary.total_vehicles as i64),
        util::format_int(summary.total_zones as i64),
        util::format_number(summary.mean_quantity, 2)
    );
}

/// Ask the user whether to go back to the menu after the fleet reports.
///
/// Returns `true` if the user chose `Y`, `false` if they chose `N`.
fn prompt_back_to_menu() -> bool {
    loop {
        print!("Back to Menu (Y/N): ");
        let _ = io::stdout().flush();
        let mut buf = String::new();
        io::stdin().read_line(&mut buf).ok();
        let resp = buf.trim().to_uppercase();
        match resp.as_str() {
            "Y" => return true,
            "N" => return false,
            _ => println!("Invalid choice. Please enter Y or N."),
        }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args: Vec<String> = std::env::args().collect();
    let artifact_dir = args.get(1).map(|s| s.as_str()).unwrap_or("artifacts");
    let csv_path = args.get(2).map(|s| s.as_str()).unwrap_or("data_processed.csv");

    let ctx = match loader::load_context(Path::new(artifact_dir), Path::new(csv_path)) {
        Ok((ctx, report)) => {
            println!(
                "Loaded historical dataset ({} rows, {} usable)",
                util::format_int(report.total_rows as i64),
                util::format_int(report.loaded_rows as i64)
            );
            if report.parse_errors > 0 {
                println!(
                    "Note: {} rows skipped due to parse/validation errors.",
                    util::format_int(report.parse_errors as i64)
                );
            }
            println!(
                "Loaded {} vehicle and {} zone identifiers.\n",
                util::format_int(ctx.vin_encoder.len() as i64),
                util::format_int(ctx.cc_encoder.len() as i64)
            );
            ctx
        }
        Err(e) => {
            eprintln!("Failed to start: {}", e);
            std::process::exit(1);
        }
    };

    loop {
        println!("Fleet Dashboard");
        println!("[1] Prediction");
        println!("[2] Fleet Analysis");
        println!("[3] Exit\n");
        match read_choice().as_str() {
            "1" => {
                handle_prediction(&ctx);
            }
            "2" => {
                println!("");
                handle_fleet_analysis(&ctx);
                if !prompt_back_to_menu() {
                    println!("Exiting the program.");
                    break;
                }
            }
            "3" => {
                println!("Exiting the program.");
                break;
            }
            _ => {
                println!("Invalid choice. Please enter 1, 2 or 3.\n");
            }
        }
    }
}
