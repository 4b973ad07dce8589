use chrono::Utc;
use clap::Parser;
use review_engine::utils::{logger, validation::Validate};
use review_engine::{
    AggregationResult, AggregationStatus, CliConfig, EngineConfig, FirestoreExpenseClient,
    LocalStorage, PlacesClient, ResultSource, ReviewEngine,
};

const EXIT_CONFIG_ERROR: i32 = 1;
const EXIT_DEGRADED: i32 = 2;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    // 初始化日誌
    logger::init_cli_logger(cli.verbose, cli.json);

    tracing::info!("Starting review-engine CLI");
    tracing::debug!("CLI config: {:?}", cli);

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("❌ Configuration validation failed: {}", e);
            eprintln!("❌ {}", e.user_friendly_message());
            std::process::exit(EXIT_CONFIG_ERROR);
        }
    };

    let places = PlacesClient::from_config(&config)?;
    let expenses = FirestoreExpenseClient::from_config(&config)?;
    if expenses.is_none() {
        tracing::info!("Firestore project not configured, using cached spend values only");
    }

    let engine = ReviewEngine::new(
        LocalStorage::new(config.cache_dir()),
        places,
        expenses,
        config.estimator(),
    );

    let request = cli.request(&config);
    let result = engine.aggregate(&request).await;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_result(&result);
    }

    if result.is_degraded() {
        std::process::exit(EXIT_DEGRADED);
    }
    Ok(())
}

fn load_config(cli: &CliConfig) -> review_engine::Result<EngineConfig> {
    cli.validate()?;
    let config = cli.load_engine_config()?;
    config.validate()?;
    Ok(config)
}

fn print_result(result: &AggregationResult) {
    if let AggregationStatus::Degraded { reason, .. } = &result.status {
        println!("❌ {}", reason);
        return;
    }

    if let Some(place) = &result.place {
        let name = place.name.as_deref().unwrap_or("(未命名)");
        match (place.rating, place.total_ratings) {
            (Some(rating), Some(total)) => println!("📍 {} ⭐ {:.1} ({} 則評分)", name, rating, total),
            (Some(rating), None) => println!("📍 {} ⭐ {:.1}", name, rating),
            _ => println!("📍 {}", name),
        }
    }

    let source = match result.source {
        ResultSource::Local => "本地快取",
        ResultSource::Remote => "Google 評論",
        ResultSource::RemoteViaNameSearch => "Google 評論（名稱搜尋）",
        ResultSource::None => "無",
    };
    println!("資料來源: {}", source);

    if let Some(estimate) = &result.spending_estimate {
        println!("💰 平均每人消費: {}", estimate);
    }

    match &result.status {
        AggregationStatus::Empty => {
            println!("目前沒有評論");
            return;
        }
        AggregationStatus::Widened { window_days } => {
            println!("最近 {} 天內沒有評論，顯示最新的 {} 則", window_days, result.reviews.len());
        }
        _ => {}
    }

    let now = Utc::now();
    for review in &result.reviews {
        println!();
        println!(
            "👤 {}  ⭐ {:.1}  🕒 {}",
            review.reviewer,
            review.rating,
            review.display_time(now)
        );
        if !review.text.is_empty() {
            println!("   {}", review.text);
        }
    }

    if result.hidden_count > 0 {
        println!();
        println!("還有 {} 條評論未顯示", result.hidden_count);
    }
}
