//! Plant disease diagnosis CLI
//!
//! Offline front door to the same pipeline the HTTP server runs: diagnose a
//! single leaf photo, check that the model artifacts agree, or measure latency.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing::info;

use plant_diagnosis::backend::backend_name;
use plant_diagnosis::inference::{
    run_benchmark, BenchmarkConfig, ContextConfig, DiagnosisContext, DiagnosisPipeline,
    ModelFormat, TOP_K,
};
use plant_diagnosis::utils::logging::{init_logging, LogConfig};

/// Plant leaf disease diagnosis
///
/// Classifies a leaf photo into one of the trained plant/disease classes and
/// reports the likely cause and cure.
#[derive(Parser, Debug)]
#[command(name = "plant_diagnosis")]
#[command(version)]
#[command(about = "Plant leaf disease diagnosis", long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, default_value = "false", global = true)]
    verbose: bool,

    /// Model artifact (.onnx or Burn .mpk)
    #[arg(long, env = "PLANT_DIAGNOSIS_MODEL", default_value = "model/plant_disease_model.onnx", global = true)]
    model: PathBuf,

    /// Model format; inferred from the extension when omitted
    #[arg(long, env = "PLANT_DIAGNOSIS_MODEL_FORMAT", value_enum, global = true)]
    model_format: Option<ModelFormat>,

    /// Class-index JSON ({"ClassName": index, ...})
    #[arg(long, env = "PLANT_DIAGNOSIS_LABELS", default_value = "model/class_indices.json", global = true)]
    labels: PathBuf,

    /// Disease-info JSON ([{"name", "cause", "cure"}, ...])
    #[arg(long, env = "PLANT_DIAGNOSIS_DISEASES", default_value = "model/plant_disease.json", global = true)]
    diseases: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Diagnose a single leaf image
    Diagnose {
        /// Path to the image file
        #[arg(short, long)]
        image: PathBuf,

        /// Print the prediction as JSON, exactly as the server would return it
        #[arg(long, default_value = "false")]
        json: bool,
    },

    /// Load every artifact and report how they line up
    Validate,

    /// Benchmark end-to-end diagnosis latency
    Benchmark {
        /// Image used for every iteration
        #[arg(short, long)]
        image: PathBuf,

        /// Number of measured iterations
        #[arg(short = 'n', long, default_value = "100")]
        iterations: usize,

        /// Number of warmup iterations
        #[arg(long, default_value = "10")]
        warmup: usize,

        /// Output JSON file for benchmark results
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

impl Cli {
    fn context_config(&self) -> ContextConfig {
        ContextConfig {
            model_path: self.model.clone(),
            model_format: self.model_format,
            labels_path: self.labels.clone(),
            diseases_path: self.diseases.clone(),
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let json_output = matches!(cli.command, Commands::Diagnose { json: true, .. });
    let log_config = if cli.verbose {
        LogConfig::verbose()
    } else if json_output {
        LogConfig::quiet()
    } else {
        LogConfig::default()
    };
    let _ = init_logging(&log_config);

    let config = cli.context_config();
    match &cli.command {
        Commands::Diagnose { image, json } => cmd_diagnose(&config, image, *json),
        Commands::Validate => cmd_validate(&config),
        Commands::Benchmark {
            image,
            iterations,
            warmup,
            output,
        } => cmd_benchmark(&config, image, *iterations, *warmup, output.as_deref()),
    }
}

fn load_pipeline(config: &ContextConfig) -> Result<DiagnosisPipeline> {
    let context = DiagnosisContext::load(config).context("Failed to load diagnosis context")?;
    Ok(DiagnosisPipeline::new(Arc::new(context)))
}

fn read_image(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("Failed to read image {:?}", path))
}

fn cmd_diagnose(config: &ContextConfig, image: &Path, json: bool) -> Result<()> {
    let bytes = read_image(image)?;
    let pipeline = load_pipeline(config)?;

    if json {
        let result = pipeline.diagnose(&bytes)?;
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    info!("Diagnosing {:?}", image);
    let diagnosis = pipeline.diagnose_detailed(&bytes)?;
    let ranked = pipeline
        .context()
        .assembler()
        .ranked(&diagnosis.probabilities, TOP_K)?;
    let result = &diagnosis.result;

    println!();
    println!("{}", "Diagnosis".cyan().bold());
    println!("  Image:      {}", image.display());
    println!("  Class:      {}", result.predicted_class.green().bold());
    println!("  Confidence: {:.2}%", result.confidence);
    println!("  Cause:      {}", result.cause);
    println!("  Cure:       {}", result.cure);
    println!();

    println!("{}", format!("Top {}", ranked.len()).cyan().bold());
    for (rank, entry) in ranked.iter().enumerate() {
        let line = format!(
            "  {}. {:<45} {:>6.2}%",
            rank + 1,
            entry.name,
            entry.probability * 100.0
        );
        if rank == 0 {
            println!("{}", line.green());
        } else {
            println!("{}", line);
        }
    }
    println!();
    println!(
        "  {} in {:.1} ms ({} runtime)",
        "Done".green(),
        diagnosis.timings.total().as_secs_f64() * 1000.0,
        pipeline.context().classifier().runtime()
    );

    Ok(())
}

fn cmd_validate(config: &ContextConfig) -> Result<()> {
    println!("{}", "Validating model artifacts".cyan().bold());
    println!("  Model:    {}", config.model_path.display());
    println!("  Labels:   {}", config.labels_path.display());
    println!("  Diseases: {}", config.diseases_path.display());
    println!("  Backend:  {}", backend_name());
    println!();

    let context = match DiagnosisContext::load(config) {
        Ok(context) => context,
        Err(e) => {
            println!("{} {}", "Error:".red().bold(), e);
            return Err(e.into());
        }
    };

    let catalog = context.catalog();
    let diseases = context.diseases();
    println!("  {} {} classes", "✓".green(), catalog.len());
    println!("  {} {} disease records", "✓".green(), diseases.len());
    match context.classifier().num_classes() {
        Some(n) => println!(
            "  {} {} model outputs {} classes",
            "✓".green(),
            context.classifier().runtime(),
            n
        ),
        None => println!(
            "  {} {} model does not declare its output width",
            "!".yellow(),
            context.classifier().runtime()
        ),
    }

    let missing = diseases.missing(catalog);
    if !missing.is_empty() {
        println!();
        println!(
            "{} {} classes without a disease record (served as \"Unknown\"):",
            "Warning:".yellow(),
            missing.len()
        );
        for name in missing {
            println!("    {}", name);
        }
    }

    let unmatched = diseases.unmatched(catalog);
    if !unmatched.is_empty() {
        println!();
        println!(
            "{} {} disease records match no class:",
            "Warning:".yellow(),
            unmatched.len()
        );
        for name in unmatched {
            println!("    {}", name);
        }
    }

    println!();
    println!("{}", "Artifacts are consistent".green().bold());
    Ok(())
}

fn cmd_benchmark(
    config: &ContextConfig,
    image: &Path,
    iterations: usize,
    warmup: usize,
    output: Option<&Path>,
) -> Result<()> {
    let bytes = read_image(image)?;
    let pipeline = load_pipeline(config)?;

    println!("{}", "Benchmark Configuration:".cyan().bold());
    println!("  Image:      {}", image.display());
    println!("  Iterations: {}", iterations);
    println!("  Warmup:     {}", warmup);
    println!("  Backend:    {}", backend_name());
    println!();

    let bench_config = BenchmarkConfig {
        warmup_iterations: warmup,
        iterations,
    };
    let result = run_benchmark(&pipeline, &bytes, bench_config)?;

    println!("{}", result);

    if let Some(path) = output {
        result.save(path)?;
        println!("{} Results saved to {}", "✓".green(), path.display());
    }

    Ok(())
}
