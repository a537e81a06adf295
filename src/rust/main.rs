use std::path::PathBuf;
use std::time::Instant;
use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use env_logger::Env;
use log::info;

use churnboard::{
    load_csv, parse_optimization_level, run_server, ArtifactManager, ChurnPredictor, ChurnSummary,
    DashboardConfig, DatasetFilter, GroupRate, ImportanceKind, RawCustomerInput, RuntimeConfig,
};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Directory holding churn_dashboard_data.csv and the model artifact
    #[arg(long, global = true)]
    home: Option<PathBuf>,

    /// Dataset CSV (overrides the one in the artifacts directory)
    #[arg(long, global = true)]
    data: Option<PathBuf>,

    /// Model artifact, .json (XGBoost) or .onnx
    #[arg(long, global = true)]
    model: Option<PathBuf>,

    /// ONNX Runtime intra-op threads
    #[arg(long, global = true)]
    intra_threads: Option<usize>,

    /// ONNX Runtime graph optimization level (0-3 or disable)
    #[arg(long, global = true)]
    optimization: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the dashboard server
    Serve {
        #[arg(long)]
        host: Option<String>,
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Predict churn for a single customer
    Predict {
        #[arg(long, default_value_t = 650)]
        credit_score: i64,
        #[arg(long, default_value_t = 40)]
        age: i64,
        #[arg(long, default_value_t = 3)]
        tenure: i64,
        #[arg(long, default_value_t = 0.0)]
        balance: f64,
        #[arg(long, default_value_t = 1)]
        num_products: i64,
        #[arg(long, default_value = "Yes")]
        has_cr_card: String,
        #[arg(long, default_value = "Yes")]
        is_active_member: String,
        #[arg(long, default_value_t = 0.0)]
        estimated_salary: f64,
        #[arg(long, default_value = "France")]
        geography: String,
        #[arg(long, default_value = "Male")]
        gender: String,
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print churn statistics for a filtered view of the dataset
    Stats {
        #[arg(long, default_value = "All")]
        gender: String,
        #[arg(long, default_value = "All")]
        geography: String,
        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the model's feature importance
    Importance {
        /// gain, total_gain or weight
        #[arg(long, default_value = "gain")]
        kind: String,
        #[arg(long, default_value_t = 10)]
        top: usize,
    },
    /// Print artifact digests and check them against the configured ones
    Verify,
}

fn resolve_config(args: &Args) -> anyhow::Result<DashboardConfig> {
    let mut config = DashboardConfig::from_env()?;
    if let Some(home) = &args.home {
        let manager = ArtifactManager::new(home);
        config = config
            .with_data_path(manager.get_dataset_path())
            .with_model_path(manager.get_model_path());
    }
    if let Some(data) = &args.data {
        config = config.with_data_path(data);
    }
    if let Some(model) = &args.model {
        config = config.with_model_path(model);
    }

    let mut runtime = RuntimeConfig::default();
    if let Some(threads) = args.intra_threads {
        runtime.intra_threads = threads;
    }
    if let Some(level) = &args.optimization {
        runtime.optimization_level = parse_optimization_level(level)?;
    }
    Ok(config.with_runtime(runtime))
}

fn load_predictor(config: &DashboardConfig) -> anyhow::Result<ChurnPredictor> {
    ArtifactManager::ensure_verified(&config.model_path, config.model_sha256.as_deref(), "model")?;
    let predictor = ChurnPredictor::builder()
        .with_runtime_config(config.runtime.clone())
        .with_model_file(&config.model_path)?
        .build()
        .with_context(|| format!("loading model {}", config.model_path.display()))?;
    Ok(predictor)
}

fn print_rates(title: &str, rates: Option<&[GroupRate]>) {
    let Some(rates) = rates else {
        return;
    };
    println!("\n{}:", title);
    for group in rates {
        println!(
            "  {:<12} {:>6.2}%  ({} of {})",
            group.label,
            group.rate * 100.0,
            group.churned,
            group.count
        );
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    let config = resolve_config(&args)?;

    match args.command {
        Command::Serve { host, port } => {
            let host = host.unwrap_or_else(|| config.host.clone());
            let port = port.unwrap_or(config.port);
            info!("=== Starting Customer Churn Dashboard ===");
            run_server(config.with_address(host, port)).await?;
        }
        Command::Predict {
            credit_score,
            age,
            tenure,
            balance,
            num_products,
            has_cr_card,
            is_active_member,
            estimated_salary,
            geography,
            gender,
            json,
        } => {
            let predictor = load_predictor(&config)?;
            let raw = RawCustomerInput {
                credit_score,
                age,
                tenure,
                balance,
                num_products,
                has_cr_card,
                is_active_member,
                estimated_salary,
                geography,
                gender,
            };

            let start = Instant::now();
            let result = predictor.predict(&raw)?;
            info!("Prediction took {:.2?}", start.elapsed());

            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                println!("Churn Prediction: {}", result.label);
                println!("Probability of Churn: {}", result.probability_percent());
            }
        }
        Command::Stats {
            gender,
            geography,
            json,
        } => {
            let dataset = load_csv(&config.data_path)?;
            let filter = DatasetFilter::parse(&gender, &geography, &dataset)?;
            let summary = ChurnSummary::from_dataset(&dataset.filter(&filter));

            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                println!(
                    "Gender: {}, Geography: {}",
                    filter.gender_label(),
                    filter.geography_label()
                );
                println!(
                    "{} customers, {} churned ({:.2}%)",
                    summary.total,
                    summary.churned,
                    summary.churn_rate * 100.0
                );
                print_rates("Churn rate by geography", Some(&summary.by_geography));
                print_rates("Churn rate by age group", summary.by_age_group.as_deref());
                print_rates("Churn rate by number of products", summary.by_products.as_deref());
                print_rates("Churn rate by engagement", summary.by_engagement.as_deref());
            }
        }
        Command::Importance { kind, top } => {
            let kind: ImportanceKind = kind.parse()?;
            let predictor = load_predictor(&config)?;
            let Some(scores) = predictor.feature_importance(kind, top) else {
                bail!(
                    "{} models do not record feature importance",
                    predictor.info().model_kind
                );
            };
            println!("Feature importance ({}):", kind.as_str());
            for (rank, score) in scores.iter().enumerate() {
                println!("  {:>2}. {:<20} {:.4}", rank + 1, score.feature, score.score);
            }
        }
        Command::Verify => {
            let mut ok = true;
            for (path, expected, file_type) in [
                (&config.data_path, config.data_sha256.as_deref(), "dataset"),
                (&config.model_path, config.model_sha256.as_deref(), "model"),
            ] {
                let digest = ArtifactManager::sha256_file(path)?;
                println!("{:<8} {}  {}", file_type, digest, path.display());
                if let Err(e) = ArtifactManager::ensure_verified(path, expected, file_type) {
                    eprintln!("  {}", e);
                    ok = false;
                }
            }
            if !ok {
                bail!("artifact verification failed");
            }
        }
    }

    Ok(())
}
