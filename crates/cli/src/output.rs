//! Output formatting utilities

use clap::ValueEnum;
use colored::Colorize;
use logpilot_core::dashboard::{ChartSeries, Phase, PodChart};
use logpilot_core::{DashboardView, HighlightFlags, Topic};
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Row of a label/count panel
#[derive(Tabled)]
struct CountRow {
    #[tabled(rename = "Label")]
    label: String,
    #[tabled(rename = "Count")]
    count: u64,
}

/// Row of the pod performance panel
#[derive(Tabled)]
struct PodRow {
    #[tabled(rename = "Pod")]
    pod: String,
    #[tabled(rename = "Avg Latency")]
    latency: String,
    #[tabled(rename = "Timeouts")]
    timeouts: u64,
}

/// Print a value as pretty JSON
pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print the whole dashboard
pub fn print_dashboard(view: &DashboardView, format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => print_json(&view.panels()),
        OutputFormat::Table => {
            if view.phase() == Phase::Loading {
                print_info("Loading statistics...");
                return Ok(());
            }

            print_count_panel(view, Topic::Severity, &view.severity_chart());
            print_count_panel(view, Topic::Timeline, &view.timeline_chart());
            print_pod_panel(view, &view.pod_chart());
            print_count_panel(view, Topic::Components, &view.component_chart());

            let security = view.security_panel();
            print_panel_title(view, Topic::Security);
            println!("Auth failures:     {}", color_count(security.auth_failures));
            println!("Network timeouts:  {}", color_count(security.network_timeouts));
            println!();
            Ok(())
        }
    }
}

fn print_count_panel(view: &DashboardView, topic: Topic, series: &ChartSeries) {
    print_panel_title(view, topic);
    if series.is_empty() {
        println!("{}", "No data".dimmed());
        println!();
        return;
    }

    let rows: Vec<CountRow> = series
        .labels
        .iter()
        .zip(&series.values)
        .map(|(label, count)| CountRow {
            label: label.clone(),
            count: *count,
        })
        .collect();

    println!("{}", Table::new(rows).with(Style::rounded()));
    println!();
}

fn print_pod_panel(view: &DashboardView, chart: &PodChart) {
    print_panel_title(view, Topic::Pods);
    if chart.is_empty() {
        println!("{}", "No data".dimmed());
        println!();
        return;
    }

    let rows: Vec<PodRow> = chart
        .names
        .iter()
        .zip(&chart.latency_ms)
        .zip(&chart.timeouts)
        .map(|((pod, latency), timeouts)| PodRow {
            pod: pod.clone(),
            latency: format_latency(*latency),
            timeouts: *timeouts,
        })
        .collect();

    println!("{}", Table::new(rows).with(Style::rounded()));
    println!();
}

fn print_panel_title(view: &DashboardView, topic: Topic) {
    println!("{}", panel_title(topic, view.is_highlighted(topic)));
}

/// Panel heading, marked when the latest question concerns it
pub fn panel_title(topic: Topic, highlighted: bool) -> String {
    if highlighted {
        format!("★ {}", topic.title()).yellow().bold().to_string()
    } else {
        topic.title().bold().to_string()
    }
}

/// Comma-separated titles of the highlighted panels
pub fn describe_highlights(flags: &HighlightFlags) -> String {
    let titles: Vec<&str> = flags.active().iter().map(Topic::title).collect();
    if titles.is_empty() {
        "none".to_string()
    } else {
        titles.join(", ")
    }
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Print an error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Format an average latency in milliseconds
pub fn format_latency(ms: f64) -> String {
    if ms >= 1000.0 {
        format!("{:.2} s", ms / 1000.0)
    } else {
        format!("{:.1} ms", ms)
    }
}

/// Color a failure count: zero is good news
fn color_count(count: u64) -> String {
    if count == 0 {
        count.to_string().green().to_string()
    } else {
        count.to_string().red().to_string()
    }
}

/// Color a backend status string
pub fn color_status(status: &str) -> String {
    match status.to_lowercase().as_str() {
        "ok" | "healthy" | "running" => status.green().to_string(),
        "degraded" | "warning" => status.yellow().to_string(),
        "unhealthy" | "error" | "failed" => status.red().to_string(),
        _ => status.to_string(),
    }
}
