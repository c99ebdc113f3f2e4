//! Process command - extract, validate and store a single invoice.

use std::fs;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

use invex_core::pipeline::{FailureKind, Pipeline, PipelineRun, PipelineState};
use invex_core::report::Report;

use super::config;

/// Arguments for the process command.
#[derive(Args)]
pub struct ProcessArgs {
    /// Input PDF file
    #[arg(required = true)]
    input: PathBuf,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "both")]
    format: OutputFormat,

    /// Give up on the extraction model after this many seconds
    #[arg(long)]
    deadline: Option<u64>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// Plain text summary
    Text,
    /// CSV, one row per line item
    Csv,
    /// JSON followed by the text summary
    Both,
}

pub async fn run(args: ProcessArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();

    let mut config = config::load(config_path)?;
    if let Some(secs) = args.deadline {
        config.llm.extraction_deadline_secs = Some(secs);
    }

    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }

    info!("Processing file: {}", args.input.display());
    let data = fs::read(&args.input)?;

    let stage = ProgressBar::new_spinner();
    stage.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")?,
    );

    let pb = stage.clone();
    let pipeline = Pipeline::from_config(&config)?.with_observer(move |state| match state {
        PipelineState::TextExtracted => pb.set_message("Extracting invoice data..."),
        PipelineState::Validated => pb.set_message("Saving invoice..."),
        _ => {}
    });

    stage.enable_steady_tick(Duration::from_millis(100));
    stage.set_message("Extracting text...");

    let run = pipeline.run(&data).await;
    pipeline.close().await;
    stage.finish_and_clear();

    if let Some(report) = run.report() {
        print_warnings(&report);

        let output = format_report(&report, args.format)?;
        if let Some(output_path) = &args.output {
            fs::write(output_path, &output)?;
            eprintln!(
                "{} Output written to {}",
                style("✓").green(),
                output_path.display()
            );
        } else {
            println!("{}", output);
        }
    }

    debug!("Total processing time: {:?}", start.elapsed());

    finish(&run)
}

fn print_warnings(report: &Report) {
    if report.warnings.is_empty() {
        return;
    }
    eprintln!("{}", style("Reconciliation warnings:").yellow());
    for warning in &report.warnings {
        eprintln!("  {} {}", style("!").yellow(), warning);
    }
}

/// Report the final state; any failure becomes a non-zero exit.
fn finish(run: &PipelineRun) -> anyhow::Result<()> {
    if let Some(id) = run.id {
        eprintln!("{} Saved invoice as id {}", style("✓").green(), id);
        return Ok(());
    }

    let Some(failure) = &run.failure else {
        anyhow::bail!("Pipeline stopped in state {:?}", run.state);
    };

    for violation in &failure.violations {
        eprintln!("  {} {}", style("✗").red(), violation);
    }
    if matches!(
        failure.kind,
        FailureKind::SchemaViolation | FailureKind::ExtractionFailed
    ) {
        if let Some(raw) = &failure.raw_response {
            eprintln!("{}\n{}", style("Raw model response:").dim(), raw);
        }
    }
    if failure.outcome_unknown {
        eprintln!(
            "{} The invoice may have been saved; check the database before retrying.",
            style("!").yellow()
        );
    }

    anyhow::bail!("{}: {}", failure.kind, failure.detail)
}

fn format_report(report: &Report, format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => Ok(report.to_json_pretty()?),
        OutputFormat::Text => Ok(report.render_text()),
        OutputFormat::Csv => format_csv(report),
        OutputFormat::Both => Ok(format!(
            "{}\n\n{}",
            report.to_json_pretty()?,
            report.render_text()
        )),
    }
}

const INVOICE_COLUMNS: [&str; 17] = [
    "invoice_number",
    "order_number",
    "invoice_date",
    "due_date",
    "vendor",
    "vendor_address",
    "vendor_email",
    "vendor_phone",
    "customer",
    "customer_address",
    "customer_email",
    "customer_phone",
    "billing_address",
    "billing_email",
    "billing_phone",
    "total_due",
    "currency",
];

const ITEM_COLUMNS: [&str; 7] = [
    "item_description",
    "item_quantity",
    "item_unit_price",
    "item_discount",
    "item_sub_total",
    "item_tax_rate",
    "item_total_price",
];

fn format_csv(report: &Report) -> anyhow::Result<String> {
    let invoice = &report.invoice;
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record(INVOICE_COLUMNS.iter().chain(ITEM_COLUMNS.iter()))?;

    let opt = |value: &Option<String>| value.clone().unwrap_or_default();
    let invoice_fields = [
        invoice.invoice_number.clone(),
        opt(&invoice.order_number),
        invoice.invoice_date.to_string(),
        invoice.due_date.map(|d| d.to_string()).unwrap_or_default(),
        invoice.vendor.clone(),
        invoice.vendor_address.clone(),
        opt(&invoice.vendor_email),
        opt(&invoice.vendor_phone),
        invoice.customer.clone(),
        invoice.customer_address.clone(),
        opt(&invoice.customer_email),
        opt(&invoice.customer_phone),
        invoice.billing_address.clone(),
        opt(&invoice.billing_email),
        opt(&invoice.billing_phone),
        invoice.total_due.to_string(),
        invoice.currency.clone(),
    ];

    if invoice.items.is_empty() {
        let empty = vec![String::new(); ITEM_COLUMNS.len()];
        wtr.write_record(invoice_fields.iter().chain(empty.iter()))?;
    }

    for item in &invoice.items {
        let item_fields = [
            item.description.clone(),
            item.quantity.to_string(),
            item.unit_price.to_string(),
            item.discount.map(|d| d.to_string()).unwrap_or_default(),
            item.sub_total.map(|d| d.to_string()).unwrap_or_default(),
            item.tax_rate.to_string(),
            item.total_price.to_string(),
        ];
        wtr.write_record(invoice_fields.iter().chain(item_fields.iter()))?;
    }

    let data = String::from_utf8(wtr.into_inner()?)?;
    Ok(data)
}
