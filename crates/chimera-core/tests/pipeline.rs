//! Goal to completion through planner, worker pool, judge and completion loop,
//! with every collaborator in memory.

use std::sync::Arc;
use std::time::Duration;

use chimera_core::domain::{
    AgentId, CollaboratorError, GeneratedContent, Persona, RawTrend, TaskStatus, TaskType,
    TrendSource,
};
use chimera_core::impls::{
    InMemoryAgentStateStore, InMemoryDispatchQueue, InMemoryLedger, InMemoryMemoryStore,
    KeywordSafetyScorer, RecordingPublisher, ScriptedDecomposer, ScriptedGenerator,
    StaticTrendDiscovery,
};
use chimera_core::judge::{JudgeSettings, OutputJudge};
use chimera_core::planner::{PlannerDeps, PlannerSettings, TaskDagPlanner};
use chimera_core::ports::{Clock, IdGenerator, SystemClock, TrendQuery, UlidGenerator};
use chimera_core::retry::RetryPolicy;
use chimera_core::trends::TrendCache;
use chimera_core::worker::{TaskWorker, WorkerDeps, WorkerSettings};
use chimera_core::Swarm;

const GOAL: &str = "Promote linen season";

fn on_brand() -> GeneratedContent {
    GeneratedContent {
        caption: "Linen season is here. Slow fashion we promote with care.".into(),
        media_ref: Some("https://cdn.example/linen-season.png".into()),
        hashtags: vec!["#linen".into(), "#slowfashion".into()],
        confidence: 0.9,
    }
}

fn persona() -> Persona {
    Persona {
        backstory: "Addis Ababa designer working in natural fibres".into(),
        voice_traits: vec!["elegant".into(), "warm".into()],
        core_beliefs: vec!["slow fashion".into()],
        visual_style: Some("earth tones".into()),
    }
}

struct Harness {
    swarm: Swarm,
    planner: Arc<TaskDagPlanner>,
    publisher: Arc<RecordingPublisher>,
}

fn harness(
    steps: Vec<&str>,
    generator: ScriptedGenerator,
    trends: Vec<RawTrend>,
    max_attempts: u32,
) -> Harness {
    let queue = Arc::new(InMemoryDispatchQueue::new());
    let state = Arc::new(InMemoryAgentStateStore::new());
    let publisher = Arc::new(RecordingPublisher::new());
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let ids: Arc<dyn IdGenerator> = Arc::new(UlidGenerator::new(SystemClock));
    let trends = Arc::new(TrendCache::new(
        Arc::new(StaticTrendDiscovery::new(trends)),
        clock.clone(),
        ids.clone(),
        Duration::from_secs(300),
        Duration::from_secs(1),
    ));

    let planner = Arc::new(TaskDagPlanner::new(
        AgentId::generate(),
        PlannerSettings {
            niche: "fashion".into(),
            region: "ET".into(),
            trend_window_hours: 24,
            min_relevance: 0.75,
            call_timeout: Duration::from_secs(1),
        },
        PlannerDeps {
            queue: queue.clone(),
            decomposer: Arc::new(ScriptedDecomposer::new(steps)),
            trends: trends.clone(),
            agent_state: state.clone(),
            ids,
            clock,
        },
    ));

    let judge = OutputJudge::new(JudgeSettings::default(), Arc::new(KeywordSafetyScorer::default()));
    let worker = Arc::new(TaskWorker::new(
        persona(),
        WorkerSettings {
            memory_limit: 3,
            call_timeout: Duration::from_secs(1),
            default_trend_query: TrendQuery::new("fashion", "ET", 24),
            min_relevance: 0.75,
        },
        WorkerDeps {
            memory: Arc::new(InMemoryMemoryStore::new()),
            generator: Arc::new(generator),
            validator: Arc::new(judge),
            agent_state: state,
            trends,
            ledger: Arc::new(InMemoryLedger::new(50.0)),
            publisher: publisher.clone(),
        },
    ));

    let swarm = Swarm::new(
        planner.clone(),
        worker,
        queue,
        RetryPolicy {
            base_delay: Duration::from_millis(5),
            multiplier: 2.0,
            max_attempts,
        },
    );
    Harness {
        swarm,
        planner,
        publisher,
    }
}

async fn settle(swarm: &Swarm) {
    tokio::time::timeout(Duration::from_secs(10), swarm.wait_settled())
        .await
        .expect("swarm did not settle");
}

#[tokio::test]
async fn goal_runs_research_generate_publish_in_order() {
    let mut h = harness(
        vec![
            "Research linen trends",
            "Write a caption about linen season",
            "Publish the caption",
        ],
        ScriptedGenerator::new(on_brand()),
        vec![RawTrend {
            topic: "linen".into(),
            relevance_score: 0.88,
            volume: 1200,
            source: TrendSource::Tiktok,
            snippet: None,
        }],
        5,
    );

    let tasks = h.planner.decompose_goal(GOAL).await.unwrap();
    let types: Vec<TaskType> = tasks.iter().map(|t| t.task_type.clone()).collect();
    assert_eq!(
        types,
        vec![
            TaskType::ResearchTrends,
            TaskType::GenerateContent,
            TaskType::PublishContent
        ]
    );
    let ids: Vec<_> = tasks.iter().map(|t| t.task_id).collect();

    h.swarm.start(3).unwrap();
    h.planner.enqueue_all(tasks).await.unwrap();
    settle(&h.swarm).await;
    h.swarm.shutdown().await;

    let counts = h.swarm.counts().await;
    assert_eq!(counts.completed, 3);
    assert_eq!(counts.failed + counts.rejected + counts.awaiting_review, 0);
    for id in &ids {
        assert!(h.planner.is_completed(*id).await);
    }
    assert_eq!(h.planner.pending_count().await, 0);

    let research = h.swarm.result(ids[0]).await.unwrap();
    assert_eq!(research.output["trends"][0]["topic"], "linen");

    let generated = h.swarm.result(ids[1]).await.unwrap();
    assert_eq!(generated.output["judgment"]["route"], "auto");
    assert!(generated.output["judgment"]["confidence"].as_f64().unwrap() >= 0.90);

    // the post carries the judged caption, not the goal text
    let posts = h.publisher.posts().await;
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].1["caption"], on_brand().caption.as_str());
    assert_eq!(posts[0].1["caption"], generated.output["content"]["caption"]);
    assert_eq!(posts[0].1["image_url"], "https://cdn.example/linen-season.png");
    assert_ne!(posts[0].1["caption"], GOAL);
}

#[tokio::test]
async fn exhausted_retries_leave_dependents_held() {
    let mut h = harness(
        vec![],
        ScriptedGenerator::new(on_brand()).with_script([
            Err(CollaboratorError::Unavailable("rate limited".into())),
            Err(CollaboratorError::Unavailable("rate limited".into())),
            Err(CollaboratorError::Unavailable("rate limited".into())),
        ]),
        vec![],
        3,
    );

    let tasks = h.planner.decompose_goal(GOAL).await.unwrap();
    assert_eq!(tasks.len(), 3);
    let generate = tasks[1].task_id;
    let publish = tasks[2].task_id;

    h.swarm.start(2).unwrap();
    h.planner.enqueue_all(tasks).await.unwrap();
    settle(&h.swarm).await;
    h.swarm.shutdown().await;

    let counts = h.swarm.counts().await;
    assert_eq!(counts.completed, 1);
    assert_eq!(counts.retried, 2);
    assert_eq!(counts.failed, 1);

    assert_eq!(h.swarm.result(generate).await.unwrap().status, TaskStatus::Failed);
    assert!(h.swarm.result(publish).await.is_none());
    assert!(!h.planner.is_completed(publish).await);
    assert_eq!(h.planner.pending_count().await, 1);
    assert!(h.publisher.posts().await.is_empty());
}

#[tokio::test]
async fn polled_trends_become_judged_content() {
    let mut h = harness(
        vec![],
        ScriptedGenerator::new(on_brand()),
        vec![
            RawTrend {
                topic: "linen season".into(),
                relevance_score: 0.95,
                volume: 4000,
                source: TrendSource::Twitter,
                snippet: Some("linen everywhere".into()),
            },
            RawTrend {
                topic: "slow fashion".into(),
                relevance_score: 0.80,
                volume: 900,
                source: TrendSource::Reddit,
                snippet: None,
            },
            RawTrend {
                topic: "crypto memes".into(),
                relevance_score: 0.10,
                volume: 90_000,
                source: TrendSource::News,
                snippet: None,
            },
        ],
        5,
    );

    h.swarm.start(2).unwrap();
    let created = h.planner.poll_resources().await.unwrap();
    assert_eq!(created.len(), 2);
    settle(&h.swarm).await;
    h.swarm.shutdown().await;

    let counts = h.swarm.counts().await;
    assert_eq!(counts.dispatched, 2);
    assert_eq!(counts.terminal(), 2);
    for task in &created {
        let result = h.swarm.result(task.task_id).await.unwrap();
        assert!(result.output.get("judgment").is_some());
        assert!(result.execution_time_ms.is_some());
    }
}
