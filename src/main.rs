use std::error::Error;
use std::sync::Arc;

use hedex::{
    similarity_explanation, ArticleRecord, ArticleStatus, DedupService, HedexConfig,
    MemoryArticleStore,
};

/// Demo run against an in-memory store and the deterministic stub embedder:
/// seed two published articles, rebuild the index, then classify one
/// near-copy and one unrelated candidate.
#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let store = Arc::new(MemoryArticleStore::new());
    store.put(
        ArticleRecord::new(
            "art-hypertension",
            "Understanding High Blood Pressure",
            "High blood pressure means your heart works harder than it should. \
             Eating less salt, staying active, and taking your medicine help keep it down.",
        )
        .with_status(ArticleStatus::Approved),
    );
    store.put(
        ArticleRecord::new(
            "art-nutrition",
            "Eating Well Every Day",
            "Fruits and vegetables give your body what it needs. \
             Try to fill half your plate with them at every meal.",
        )
        .with_status(ArticleStatus::Uploaded),
    );

    let service = DedupService::from_config(&HedexConfig::default(), store)?;
    let report = service.coordinator.on_startup().await?;
    println!(
        "index rebuilt: {} articles indexed, {} skipped, {} re-embedded",
        report.indexed, report.skipped, report.recomputed
    );

    let near_copy = "High blood pressure means your heart works harder than it should. \
                     Eating less salt, staying active, and taking your medicine help keep it down.";
    let novel = "Checking your feet every day matters when you live with diabetes.";

    for candidate in [near_copy, novel] {
        let result = service.classifier.classify(candidate).await?;
        println!(
            "{:?} (score {:.3}, matched {:?}): {}",
            result.classification,
            result.score,
            result.matched_article_id,
            similarity_explanation(result.score)
        );
    }

    Ok(())
}
