use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tokio_stream::StreamExt;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use landval::{
    config::{AppConfig, ConfigLoader, LogFormat, LoggingConfig},
    currency::format_rupee,
    engine::{PipelineDriver, PipelineEvent, PipelineEventKind, RunLifecycle},
    market::{context_lines, render_trend},
    parcel::{LandParcel, ParcelKind},
    rng::RngManager,
    sequencer::{Sequencer, SequencerEvent, Stage, StartOutcome},
    valuation::Valuation,
};

#[derive(Debug, Parser)]
#[command(author, version, about = "Land valuation pipeline simulator")]
struct Cli {
    /// Path to a YAML config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the valuation breakdown without animating the pipeline
    Appraise {
        #[command(flatten)]
        parcel: ParcelArgs,
        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Animate the Raw Data -> ML Model -> GenAI Context pipeline
    Run(RunArgs),
    /// Show the market value projection
    Trend,
}

#[derive(Debug, Args)]
struct RunArgs {
    #[command(flatten)]
    parcel: ParcelArgs,

    /// Emit one JSON event per line instead of text
    #[arg(long)]
    json: bool,

    /// Override the random seed for the soil scan
    #[arg(long)]
    seed: Option<u64>,

    /// Override the stage interval in milliseconds
    #[arg(long)]
    tick_ms: Option<u64>,

    /// Reset the run after this many milliseconds
    #[arg(long)]
    reset_after_ms: Option<u64>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum KindArg {
    Urban,
    Rural,
}

impl From<KindArg> for ParcelKind {
    fn from(value: KindArg) -> Self {
        match value {
            KindArg::Urban => ParcelKind::Urban,
            KindArg::Rural => ParcelKind::Rural,
        }
    }
}

#[derive(Debug, Args)]
struct ParcelArgs {
    /// Location label shown with the result
    #[arg(long)]
    location: Option<String>,
    #[arg(long, value_enum)]
    kind: Option<KindArg>,
    /// Square feet (urban) or acres (rural)
    #[arg(long)]
    area: Option<f64>,
    /// Distance from the city center in km
    #[arg(long)]
    distance: Option<f64>,
    /// Infrastructure rating, 1-10
    #[arg(long)]
    infra: Option<f64>,
    /// Soil quality index, 1-10
    #[arg(long)]
    soil: Option<f64>,
    #[arg(long)]
    nitrogen: Option<f64>,
    #[arg(long)]
    phosphorus: Option<f64>,
    #[arg(long)]
    potassium: Option<f64>,
}

impl ParcelArgs {
    /// Apply overrides the way the form does: a kind toggle re-clamps the
    /// area, every other value is clamped into range with a warning.
    fn apply(&self, mut parcel: LandParcel) -> LandParcel {
        if let Some(location) = &self.location {
            parcel.location_name = location.clone();
        }
        if let Some(kind) = self.kind {
            parcel.set_kind(kind.into());
        }
        let overrides = [
            (self.area, &mut parcel.area),
            (self.distance, &mut parcel.distance_from_center_km),
            (self.infra, &mut parcel.infrastructure_rating),
            (self.soil, &mut parcel.soil_quality_index),
            (self.nitrogen, &mut parcel.nitrogen),
            (self.phosphorus, &mut parcel.phosphorus),
            (self.potassium, &mut parcel.potassium),
        ];
        for (value, slot) in overrides {
            if let Some(value) = value {
                *slot = value;
            }
        }

        let clamped = parcel.clone().clamped();
        for field in parcel.changed_fields(&clamped) {
            warn!(%field, "value outside slider range, clamped");
        }
        clamped
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let loader = ConfigLoader::new(".");
    let mut config = loader.load_or_default(cli.config.as_deref())?;
    init_tracing(&config.logging);

    match cli.command {
        Command::Appraise { parcel, json } => {
            let parcel = parcel.apply(config.parcel.clone());
            appraise(&parcel, json)
        }
        Command::Run(args) => {
            if let Some(seed) = args.seed {
                config.seed = Some(seed);
            }
            if let Some(ms) = args.tick_ms {
                config.tick_interval_ms = ms;
                config.validate()?;
            }
            let parcel = args.parcel.apply(config.parcel.clone());
            run_pipeline(&config, parcel, &args).await
        }
        Command::Trend => {
            println!("Market Value Projection");
            print!("{}", render_trend(&config.market_trend, 40));
            Ok(())
        }
    }
}

fn init_tracing(logging: &LoggingConfig) {
    let format = match std::env::var("LANDVAL_LOG_FORMAT").as_deref() {
        Ok("json") => LogFormat::Json,
        Ok("text") => LogFormat::Text,
        _ => logging.format,
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("landval={}", logging.level)));

    // stdout is reserved for results; logs go to stderr.
    match format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init(),
        LogFormat::Text => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init(),
    }
}

fn appraise(parcel: &LandParcel, json: bool) -> Result<()> {
    let valuation = Valuation::appraise(parcel)?;
    if json {
        let body = serde_json::json!({ "parcel": parcel, "valuation": valuation });
        println!("{}", serde_json::to_string_pretty(&body)?);
        return Ok(());
    }

    println!("{} ({} land)", parcel.location_name, parcel.kind);
    println!(
        "  raw price         {:>18}  ({} {} x {})",
        format_rupee(valuation.raw_price),
        parcel.area,
        parcel.kind.area_unit(),
        format_rupee(valuation.base_rate_per_unit)
    );
    println!("  distance factor   {:>18.4}", valuation.distance_factor);
    println!("  infra factor      {:>18.4}", valuation.infra_factor);
    println!("  nutrition factor  {:>18.4}", valuation.nutrition_factor);
    println!(
        "  ML model price    {:>18}",
        format_rupee(valuation.model_price)
    );
    println!(
        "  GenAI premium     {:>18}",
        format_rupee(valuation.premium())
    );
    println!(
        "  final (GenAI)     {:>18}",
        format_rupee(valuation.final_price)
    );
    println!("Current Context");
    for line in context_lines(parcel.kind) {
        println!("  - {line}");
    }
    Ok(())
}

async fn run_pipeline(config: &AppConfig, parcel: LandParcel, args: &RunArgs) -> Result<()> {
    let mut rngs = config
        .seed
        .map(RngManager::new)
        .unwrap_or_else(RngManager::from_entropy);
    info!(seed = rngs.seed(), scenario = %config.name, "random source ready");

    let sequencer = Sequencer::new(rngs.run_stream(1));
    let mut driver = PipelineDriver::with_interval(sequencer, config.tick_interval());
    let mut events = Box::pin(driver.subscribe());
    info!(
        interval_ms = driver.tick_interval().as_millis() as u64,
        "pipeline driver ready"
    );

    if !args.json {
        println!("Valuing {} ({} land)", parcel.location_name, parcel.kind);
    }
    match driver
        .start(&parcel)
        .context("Parcel rejected by the pipeline")?
    {
        StartOutcome::Started(_) => {}
        StartOutcome::AlreadyRunning => warn!("pipeline already running"),
    }

    let reset_after = async {
        match args.reset_after_ms {
            Some(ms) => tokio::time::sleep(Duration::from_millis(ms)).await,
            None => std::future::pending::<()>().await,
        }
    };
    tokio::pin!(reset_after);
    let mut reset_armed = true;

    loop {
        tokio::select! {
            maybe_event = events.next() => {
                let Some(event) = maybe_event else { break };
                let done = is_final(&event);
                if args.json {
                    println!("{}", serde_json::to_string(&event)?);
                } else {
                    render_event(&driver, &event);
                }
                if done {
                    break;
                }
            }
            _ = &mut reset_after, if reset_armed => {
                reset_armed = false;
                driver.reset();
            }
            _ = tokio::signal::ctrl_c() => {
                warn!("interrupted, resetting pipeline");
                driver.reset();
            }
        }
    }
    Ok(())
}

fn is_final(event: &PipelineEvent) -> bool {
    matches!(
        event.kind,
        PipelineEventKind::Sequencer(SequencerEvent::ValuesReady { .. })
            | PipelineEventKind::Lifecycle(RunLifecycle::Reset)
    )
}

fn render_event<R>(driver: &PipelineDriver<R>, event: &PipelineEvent)
where
    R: rand::Rng + Send + 'static,
{
    match &event.kind {
        PipelineEventKind::Sequencer(SequencerEvent::StageChanged { stage }) => {
            println!("{}", progress_line(*stage));
            if *stage == Stage::Model {
                if let Some(valuation) = driver.snapshot().valuation {
                    println!(
                        "  ML Model Base Prediction: {}",
                        format_rupee(valuation.model_price)
                    );
                }
            }
        }
        PipelineEventKind::Sequencer(SequencerEvent::SoilReadingReady { reading, narrative }) => {
            println!(
                "  Soil Nutrition Scan: N {}%  P {}%  K {}%",
                reading.nitrogen, reading.phosphorus, reading.potassium
            );
            println!("  {narrative}");
        }
        PipelineEventKind::Sequencer(SequencerEvent::ValuesReady {
            model_price,
            final_price,
        }) => {
            println!("  ML Model Base Prediction: {}", format_rupee(*model_price));
            println!("  GENAI ENHANCED");
            println!("  Final Predicted Value:    {}", format_rupee(*final_price));
        }
        PipelineEventKind::Lifecycle(RunLifecycle::Reset) => {
            println!("Pipeline reset before completion.");
        }
    }
}

fn progress_line(current: Stage) -> String {
    Stage::ALL
        .iter()
        .map(|stage| {
            let marker = if *stage <= current { "■" } else { "□" };
            format!("[{marker} {}]", stage.name())
        })
        .collect::<Vec<_>>()
        .join(" ── ")
}
