use std::io;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use chimera_core::domain::{
    AgentId, CollaboratorError, GeneratedContent, Persona, RawTrend, TrendSource,
};
use chimera_core::impls::{
    InMemoryAgentStateStore, InMemoryDispatchQueue, InMemoryLedger, InMemoryMemoryStore,
    KeywordSafetyScorer, RecordingPublisher, ScriptedDecomposer, ScriptedGenerator,
    StaticTrendDiscovery,
};
use chimera_core::judge::{JudgeSettings, OutputJudge};
use chimera_core::planner::{PlannerDeps, PlannerSettings, TaskDagPlanner};
use chimera_core::ports::{Clock, IdGenerator, SystemClock, UlidGenerator};
use chimera_core::trends::TrendCache;
use chimera_core::worker::{TaskWorker, WorkerDeps, WorkerSettings};
use chimera_core::{ChimeraConfig, ConfigLoader, Swarm};

const DEFAULT_GOAL: &str = "Promote the linen summer collection today";
const SETTLE_TIMEOUT: Duration = Duration::from_secs(120);

fn init_logging(config: &ChimeraConfig) -> Result<()> {
    // RUST_LOG wins over the configured level
    let filter = EnvFilter::builder()
        .with_default_directive(
            config
                .logging
                .level
                .parse()
                .with_context(|| format!("invalid log level `{}`", config.logging.level))?,
        )
        .from_env_lossy();

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(true);
    match config.logging.format.as_str() {
        "json" => builder.json().with_current_span(true).init(),
        _ => builder.pretty().init(),
    }
    Ok(())
}

fn persona() -> Persona {
    Persona {
        backstory: "Designer from Addis Ababa working in natural fibres".into(),
        voice_traits: vec!["elegant".into(), "warm".into()],
        core_beliefs: vec!["slow fashion".into(), "local craft".into()],
        visual_style: Some("earth tones, morning light".into()),
    }
}

fn demo_trends() -> Vec<RawTrend> {
    vec![
        RawTrend {
            topic: "linen summer".into(),
            relevance_score: 0.93,
            volume: 12_400,
            source: TrendSource::Tiktok,
            snippet: Some("Linen sets are everywhere this week".into()),
        },
        RawTrend {
            topic: "local craft markets".into(),
            relevance_score: 0.81,
            volume: 2_100,
            source: TrendSource::GoogleTrends,
            snippet: None,
        },
        RawTrend {
            topic: "celebrity gossip".into(),
            relevance_score: 0.12,
            volume: 98_000,
            source: TrendSource::Twitter,
            snippet: None,
        },
    ]
}

fn demo_content() -> GeneratedContent {
    GeneratedContent {
        caption: "Linen for the summer collection, promoted today: slow fashion and local craft."
            .into(),
        media_ref: Some("https://cdn.chimera.local/linen-summer.png".into()),
        hashtags: vec!["#linen".into(), "#slowfashion".into(), "#localcraft".into()],
        confidence: 0.92,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = ConfigLoader::load().context("failed to load configuration")?;
    init_logging(&config)?;

    let goal = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_GOAL.to_string());
    let agent = AgentId::generate();
    info!(%agent, goal = %goal, "starting demo run");

    let queue = Arc::new(InMemoryDispatchQueue::new());
    let state = Arc::new(InMemoryAgentStateStore::new());
    let publisher = Arc::new(RecordingPublisher::new());
    let memory = Arc::new(InMemoryMemoryStore::new());
    memory
        .remember(agent, "Linen posts with morning light did best last summer")
        .await;
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let ids: Arc<dyn IdGenerator> = Arc::new(UlidGenerator::new(SystemClock));
    let trends = Arc::new(TrendCache::new(
        Arc::new(StaticTrendDiscovery::new(demo_trends())),
        clock.clone(),
        ids.clone(),
        Duration::from_secs(config.trends.cache_ttl_secs),
        config.worker.collaborator_timeout(),
    ));

    let planner = Arc::new(TaskDagPlanner::new(
        agent,
        PlannerSettings::from_config(&config),
        PlannerDeps {
            queue: queue.clone(),
            decomposer: Arc::new(ScriptedDecomposer::new([
                "Research linen trends for the summer collection",
                "Write a caption for the summer collection",
                "Publish the caption",
            ])),
            trends: trends.clone(),
            agent_state: state.clone(),
            ids,
            clock,
        },
    ));

    let judge = Arc::new(OutputJudge::new(
        JudgeSettings::from_config(&config.judge),
        Arc::new(KeywordSafetyScorer::default()),
    ));
    // one flaky generation so the retry path shows up in the run
    let generator = ScriptedGenerator::new(demo_content()).with_script([Err(
        CollaboratorError::Unavailable("model overloaded".into()),
    )]);
    let worker = Arc::new(TaskWorker::new(
        persona(),
        WorkerSettings::from_config(&config),
        WorkerDeps {
            memory,
            generator: Arc::new(generator),
            validator: judge.clone(),
            agent_state: state,
            trends,
            ledger: Arc::new(InMemoryLedger::new(50.0)),
            publisher: publisher.clone(),
        },
    ));

    let mut swarm = Swarm::new(planner.clone(), worker, queue, config.retry.policy());
    swarm.start(config.worker.count)?;

    let tasks = planner
        .decompose_goal(&goal)
        .await
        .context("goal decomposition failed")?;
    planner.enqueue_all(tasks).await?;
    let polled = planner.poll_resources().await?;
    info!(tasks = polled.len(), "trend tasks created");

    if tokio::time::timeout(SETTLE_TIMEOUT, swarm.wait_settled())
        .await
        .is_err()
    {
        warn!(timeout = ?SETTLE_TIMEOUT, "swarm did not settle; shutting down anyway");
    }
    swarm.shutdown().await;

    let counts = swarm.counts().await;
    let summary = serde_json::json!({
        "agent": agent,
        "goal": goal,
        "counts": counts,
        "held": planner.pending_count().await,
        "posts": publisher.posts().await.len(),
        "approval_rate": judge.approval_rate(),
        "average_confidence": judge.average_confidence(),
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
