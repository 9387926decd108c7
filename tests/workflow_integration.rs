//! Integration tests for step/link composition through the public API.
//!
//! Surfaces and triggers are recording doubles; "the user" is simulated by
//! firing a step's trigger once that step has been loaded.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use modalflow::{
    chain, link, link_branches, link_exit, ChainNode, ConfigError, ErrorProcessor, FlowError,
    Loadable, ManualTrigger, ModalSurface, RemoteSubmit, RemoteSubmitter, Step, SubmitFailure,
    SubmitMethod,
};
use serde_json::{json, Map, Value};

// ─── Test Doubles ────────────────────────────────────────────────────────────

#[derive(Clone, Default)]
struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    fn push(&self, entry: impl Into<String>) {
        self.0.lock().unwrap().push(entry.into());
    }

    fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    fn count(&self, entry: &str) -> usize {
        self.entries().iter().filter(|e| *e == entry).count()
    }
}

struct JournalSurface {
    name: String,
    journal: Journal,
}

impl ModalSurface for JournalSurface {
    fn open(&self) {
        self.journal.push(format!("open:{}", self.name));
    }

    fn hide(&self) {
        self.journal.push(format!("hide:{}", self.name));
    }
}

struct JournalProcessor {
    journal: Journal,
}

impl ErrorProcessor for JournalProcessor {
    fn clear_validation_errors(&self) {
        self.journal.push("clear");
    }

    fn handle_errors(&self, failure: &SubmitFailure) {
        for error in &failure.validation {
            self.journal.push(format!("invalid:{}", error.field));
        }
    }
}

struct FixedResponse(Value);

#[async_trait]
impl RemoteSubmitter for FixedResponse {
    async fn submit(
        &self,
        _method: SubmitMethod,
        _target: &str,
        _data: Value,
    ) -> Result<Value, SubmitFailure> {
        Ok(self.0.clone())
    }
}

struct Rejecting;

#[async_trait]
impl RemoteSubmitter for Rejecting {
    async fn submit(
        &self,
        _method: SubmitMethod,
        _target: &str,
        _data: Value,
    ) -> Result<Value, SubmitFailure> {
        Err(SubmitFailure::from_response(
            422,
            json!([{"field": "email", "message": "is taken"}]),
        ))
    }
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

/// A clickthrough step that journals its initialization and resolves with
/// `produce(input)`.
fn journaled_step<F>(name: &str, journal: &Journal, produce: F) -> (Step, Arc<ManualTrigger>)
where
    F: Fn(&Value) -> Value + Send + Sync + 'static,
{
    let trigger = ManualTrigger::new();
    let init_journal = journal.clone();
    let init_name = name.to_string();
    let step = Step::builder(
        name,
        Arc::new(JournalSurface {
            name: name.to_string(),
            journal: journal.clone(),
        }),
    )
    .clickthrough_link(trigger.clone())
    .initialize(move |input| init_journal.push(format!("init:{}:{}", init_name, input)))
    .resolve_with(produce)
    .build()
    .unwrap();
    (step, trigger)
}

async fn fire_when_bound(trigger: &ManualTrigger) {
    for _ in 0..1000 {
        if trigger.is_bound() {
            trigger.fire();
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("trigger was never bound");
}

async fn settle() {
    for _ in 0..50 {
        tokio::task::yield_now().await;
    }
}

fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(fields) => fields,
        _ => panic!("expected object"),
    }
}

// ─── Step Laws ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_local_step_resolves_with_its_input() {
    let journal = Journal::default();
    let trigger = ManualTrigger::new();
    let step = Step::builder(
        "identity",
        Arc::new(JournalSurface {
            name: "identity".into(),
            journal: journal.clone(),
        }),
    )
    .clickthrough_link(trigger.clone())
    .build()
    .unwrap();

    for input in [json!(null), json!(42), json!({"nested": {"a": [1, 2]}})] {
        let completion = step.load_with(input.clone());
        trigger.fire();
        assert_eq!(completion.await.unwrap(), input);
    }
}

#[tokio::test]
async fn test_remote_response_mixin_is_last_writer_wins() {
    let journal = Journal::default();
    let trigger = ManualTrigger::new();
    let remote = RemoteSubmit::new(
        Arc::new(FixedResponse(json!({"id": 1, "cost": 50, "status": "new"}))),
        SubmitMethod::Post,
        "/ajax/create-account",
        |input| input.clone(),
    )
    .response_mixin(|_| object(json!({"cost": 100, "jobTitle": "Engineer"})));

    let step = Step::builder(
        "create-account",
        Arc::new(JournalSurface {
            name: "create-account".into(),
            journal: journal.clone(),
        }),
    )
    .form(trigger.clone())
    .error_processor(Arc::new(JournalProcessor {
        journal: journal.clone(),
    }))
    .remote(remote)
    .build()
    .unwrap();

    let completion = step.load();
    trigger.fire();

    assert_eq!(
        completion.await.unwrap(),
        json!({"id": 1, "cost": 100, "status": "new", "jobTitle": "Engineer"})
    );
}

#[tokio::test]
async fn test_remote_failure_reaches_error_processor_and_retry_clears_it() {
    let journal = Journal::default();
    let trigger = ManualTrigger::new();
    let step = Step::builder(
        "signup",
        Arc::new(JournalSurface {
            name: "signup".into(),
            journal: journal.clone(),
        }),
    )
    .form(trigger.clone())
    .error_processor(Arc::new(JournalProcessor {
        journal: journal.clone(),
    }))
    .remote(RemoteSubmit::new(
        Arc::new(Rejecting),
        SubmitMethod::Post,
        "/accounts",
        |input| input.clone(),
    ))
    .build()
    .unwrap();

    let _completion = step.load();
    trigger.fire();
    settle().await;
    assert_eq!(journal.entries(), vec!["open:signup", "clear", "invalid:email"]);
    assert!(step.is_pending());

    // User re-triggers; stale errors are cleared before the next attempt
    trigger.fire();
    settle().await;
    assert_eq!(journal.count("clear"), 2);
    assert_eq!(journal.count("hide:signup"), 0);
}

#[test]
fn test_step_without_trigger_fails_at_construction() {
    let err = Step::builder(
        "nowhere",
        Arc::new(JournalSurface {
            name: "nowhere".into(),
            journal: Journal::default(),
        }),
    )
    .build()
    .unwrap_err();
    assert_eq!(err, ConfigError::MissingTrigger("nowhere".into()));
}

// ─── Chains ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_chain_runs_steps_in_order_and_exits_once() {
    let journal = Journal::default();
    let (a, trigger_a) = journaled_step("A", &journal, |_| json!({"r": 1}));
    let (b, trigger_b) = journaled_step("B", &journal, |_| json!({"r": 2}));

    let exits = Journal::default();
    let exit_journal = exits.clone();
    let head = chain([
        a.into(),
        b.into(),
        ChainNode::exit(move |data| exit_journal.push(data.to_string())),
    ])
    .unwrap();

    let completion = head.load_with(json!({"d": 0}));
    fire_when_bound(&trigger_a).await;
    fire_when_bound(&trigger_b).await;

    assert_eq!(completion.await.unwrap(), json!({"r": 2}));
    assert_eq!(exits.entries(), vec![json!({"r": 2}).to_string()]);

    let inits: Vec<String> = journal
        .entries()
        .into_iter()
        .filter(|e| e.starts_with("init:"))
        .collect();
    assert_eq!(
        inits,
        vec![
            format!("init:A:{}", json!({"d": 0})),
            format!("init:B:{}", json!({"r": 1})),
        ]
    );
}

#[tokio::test]
async fn test_chain_without_exit_resolves_with_last_step_result() {
    let journal = Journal::default();
    let (a, trigger_a) = journaled_step("A", &journal, |_| json!("from-a"));
    let (b, trigger_b) = journaled_step("B", &journal, |input| json!([input, "from-b"]));
    let (c, trigger_c) = journaled_step("C", &journal, |input| input.clone());

    let head = chain([a.into(), b.into(), c.into()]).unwrap();
    let completion = head.load();

    fire_when_bound(&trigger_a).await;
    fire_when_bound(&trigger_b).await;
    fire_when_bound(&trigger_c).await;

    assert_eq!(completion.await.unwrap(), json!(["from-a", "from-b"]));
}

#[test]
fn test_chain_with_fewer_than_two_nodes_builds_nothing() {
    let journal = Journal::default();
    let (a, trigger) = journaled_step("A", &journal, |v| v.clone());

    assert_eq!(
        chain([ChainNode::from(a.clone())]).unwrap_err(),
        ConfigError::ChainTooShort(1)
    );
    assert!(matches!(
        chain(Vec::new()),
        Err(ConfigError::ChainTooShort(0))
    ));

    assert_eq!(a.load_count(), 0);
    assert!(!trigger.is_bound());
    assert!(journal.entries().is_empty());
}

#[tokio::test]
async fn test_chains_nest_as_units() {
    let journal = Journal::default();
    let (a, trigger_a) = journaled_step("A", &journal, |_| json!({"from": "a"}));
    let (b, trigger_b) = journaled_step("B", &journal, |input| {
        let mut data = input.clone();
        data["b"] = json!(true);
        data
    });

    let inner = link_exit(b, |_| {});
    let head = link(a, inner);
    let completion = head.load();

    fire_when_bound(&trigger_a).await;
    fire_when_bound(&trigger_b).await;
    assert_eq!(completion.await.unwrap(), json!({"from": "a", "b": true}));
}

// ─── Branching ───────────────────────────────────────────────────────────────

struct SalaryWorkflow {
    journal: Journal,
    exits: Journal,
    head: modalflow::Link,
    entry: Arc<ManualTrigger>,
    amount: Arc<ManualTrigger>,
    high: Arc<ManualTrigger>,
    low: Arc<ManualTrigger>,
}

fn salary_workflow(salary: u64) -> SalaryWorkflow {
    let journal = Journal::default();
    let exits = Journal::default();

    let (entry_step, entry) = journaled_step("entry", &journal, |v| v.clone());
    let (amount_step, amount) =
        journaled_step("amount", &journal, move |_| json!({"salary": salary}));
    let (high_step, high) = journaled_step("high", &journal, |v| v.clone());
    let (low_step, low) = journaled_step("low", &journal, |v| v.clone());

    // Tail-first: branch targets must exist before the branch refers to them
    let high_exits = exits.clone();
    let low_exits = exits.clone();
    let exit_for_high = link_exit(high_step, move |_| high_exits.push("high"));
    let exit_for_low = link_exit(low_step, move |_| low_exits.push("low"));
    let branch = link_branches(amount_step, move |data| {
        if data["salary"].as_u64().unwrap_or(0) > 99_999 {
            exit_for_high.load_with(data)
        } else {
            exit_for_low.load_with(data)
        }
    });
    let head = link(entry_step, branch);

    SalaryWorkflow {
        journal,
        exits,
        head,
        entry,
        amount,
        high,
        low,
    }
}

#[tokio::test]
async fn test_branch_opens_only_the_high_income_step() {
    let wf = salary_workflow(150_000);
    let completion = wf.head.load();

    fire_when_bound(&wf.entry).await;
    fire_when_bound(&wf.amount).await;
    fire_when_bound(&wf.high).await;

    assert_eq!(completion.await.unwrap(), json!({"salary": 150_000}));
    assert_eq!(wf.exits.entries(), vec!["high"]);
    assert!(!wf.low.is_bound());
    assert_eq!(wf.journal.count("open:low"), 0);
    assert!(!wf.journal.entries().iter().any(|e| e.starts_with("init:low")));
}

#[tokio::test]
async fn test_branch_opens_only_the_low_income_step() {
    let wf = salary_workflow(40_000);
    let completion = wf.head.load();

    fire_when_bound(&wf.entry).await;
    fire_when_bound(&wf.amount).await;
    fire_when_bound(&wf.low).await;

    assert_eq!(completion.await.unwrap(), json!({"salary": 40_000}));
    assert_eq!(wf.exits.entries(), vec!["low"]);
    assert!(!wf.high.is_bound());
    assert_eq!(wf.journal.count("open:high"), 0);
}

// ─── Single-flight Hazard ────────────────────────────────────────────────────

#[tokio::test]
async fn test_reloading_a_step_silences_the_earlier_chain() {
    let journal = Journal::default();
    let (shared, trigger) = journaled_step("shared", &journal, |input| input.clone());

    let exits = Journal::default();
    let first_exits = exits.clone();
    let second_exits = exits.clone();
    let first = link_exit(shared.clone(), move |_| first_exits.push("first"));
    let second = link_exit(shared.clone(), move |_| second_exits.push("second"));

    let first_done = first.load_with(json!("one"));
    let second_done = second.load_with(json!("two"));
    fire_when_bound(&trigger).await;

    assert_eq!(second_done.await.unwrap(), json!("two"));
    assert!(matches!(first_done.await, Err(FlowError::Superseded)));
    settle().await;
    assert_eq!(exits.entries(), vec!["second"]);
}

// ─── Data Accumulation ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_accumulated_data_reaches_exit() {
    let journal = Journal::default();
    let (s1, t1) = journaled_step("S1", &journal, |input| {
        let mut data = input.clone();
        data["step1"] = json!("a");
        data
    });
    let (s2, t2) = journaled_step("S2", &journal, |input| {
        let mut data = input.clone();
        data["step2"] = json!("b");
        data
    });

    let received = Arc::new(Mutex::new(Vec::new()));
    let sink = received.clone();
    let head = chain([
        s1.into(),
        s2.into(),
        ChainNode::exit(move |data| sink.lock().unwrap().push(data)),
    ])
    .unwrap();

    let _completion = head.load_with(json!({}));
    fire_when_bound(&t1).await;
    fire_when_bound(&t2).await;
    settle().await;

    assert!(journal
        .entries()
        .contains(&format!("init:S2:{}", json!({"step1": "a"}))));
    assert_eq!(
        *received.lock().unwrap(),
        vec![json!({"step1": "a", "step2": "b"})]
    );
}

#[tokio::test]
async fn test_fire_and_forget_chain_reaches_exit() {
    let journal = Journal::default();
    let (a, trigger_a) = journaled_step("A", &journal, |input| {
        let mut data = input.clone();
        data["a"] = json!(1);
        data
    });
    let (b, trigger_b) = journaled_step("B", &journal, |input| {
        let mut data = input.clone();
        data["b"] = json!(2);
        data
    });

    let exits = Journal::default();
    let exit_journal = exits.clone();
    // Neither the head link nor its completion is kept
    let _ = chain([
        a.into(),
        b.into(),
        ChainNode::exit(move |data| exit_journal.push(data.to_string())),
    ])
    .unwrap()
    .load_with(json!({}));

    fire_when_bound(&trigger_a).await;
    fire_when_bound(&trigger_b).await;
    settle().await;

    assert_eq!(exits.entries(), vec![json!({"a": 1, "b": 2}).to_string()]);
    assert_eq!(journal.count("hide:B"), 1);
}
