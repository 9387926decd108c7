//! Demo workflows wired to terminal dialogs

use std::sync::Arc;

use anyhow::Result;
use serde_json::{json, Map, Value};
use tokio::sync::mpsc::UnboundedSender;

use modalflow::remote::HttpSubmitter;
use modalflow::ui::ModalDialog;
use modalflow::{
    chain, link, link_branches, link_exit, ChainNode, Config, Link, Loadable, RemoteSubmit, Step,
    SubmitMethod,
};

/// Salary above which the high-income branch is taken
const HIGH_INCOME_THRESHOLD: f64 = 99_999.0;

/// Status lines posted by exit functions to the app
pub type StatusSender = UnboundedSender<String>;

/// A runnable workflow and the dialogs it draws on
pub struct Demo {
    pub title: &'static str,
    pub dialogs: Vec<Arc<ModalDialog>>,
    pub head: Link,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum DemoWorkflow {
    /// Two steps that accumulate typed words, then exit
    DataPassing,
    /// Branches on a salary threshold into one of two exits
    Salary,
    /// Posts an email to the configured remote, then confirms
    Signup,
}

impl DemoWorkflow {
    pub fn build(self, config: &Config, status: StatusSender) -> Result<Demo> {
        match self {
            Self::DataPassing => data_passing(status),
            Self::Salary => salary(status),
            Self::Signup => signup(config, status),
        }
    }
}

/// Copy of `data` with `key` set, turning non-objects into an empty object first.
fn with_field(data: &Value, key: &str, value: Value) -> Value {
    let mut fields = match data {
        Value::Object(fields) => fields.clone(),
        _ => Map::new(),
    };
    fields.insert(key.to_string(), value);
    Value::Object(fields)
}

fn post(status: &StatusSender, message: String) {
    tracing::info!(%message, "Workflow exit");
    let _ = status.send(message);
}

pub fn data_passing(status: StatusSender) -> Result<Demo> {
    let first = ModalDialog::with_input("Step 1", "Type a word.", "Word");
    let second = ModalDialog::with_input("Step 2", "Type another word.", "Word");

    let reader = first.clone();
    let step1 = Step::builder("data-passing-1", first.clone())
        .clickthrough_link(first.trigger())
        .initialize(|_| tracing::debug!("Initializing step 1"))
        .before_submit(|| tracing::debug!("About to submit step 1"))
        .resolve_with(move |data| with_field(data, "step1", json!(reader.input_value())))
        .build()?;

    let prompt = second.clone();
    let reader = second.clone();
    let step2 = Step::builder("data-passing-2", second.clone())
        .clickthrough_link(second.trigger())
        .initialize(move |data| {
            let last = data["step1"].as_str().unwrap_or_default();
            prompt.set_message(format!("Last value: {}", last));
        })
        .before_submit(|| tracing::debug!("About to submit step 2"))
        .resolve_with(move |data| with_field(data, "step2", json!(reader.input_value())))
        .build()?;

    let head = chain([
        step1.into(),
        step2.into(),
        ChainNode::exit(move |data: Value| {
            post(
                &status,
                format!(
                    "Step 1: {}  Step 2: {}",
                    data["step1"].as_str().unwrap_or_default(),
                    data["step2"].as_str().unwrap_or_default()
                ),
            );
        }),
    ])?;

    Ok(Demo {
        title: "Data passing",
        dialogs: vec![first, second],
        head,
    })
}

pub fn salary(status: StatusSender) -> Result<Demo> {
    let entry = ModalDialog::new("Welcome", "Let's talk about your income.");
    let second = ModalDialog::with_input("Salary", "What is your yearly salary?", "Salary");
    let high = ModalDialog::new("High income", "");
    let low = ModalDialog::new("Low income", "");

    let entry_step = Step::builder("salary-entry", entry.clone())
        .clickthrough_link(entry.trigger())
        .build()?;

    let reader = second.clone();
    let salary_step = Step::builder("salary-amount", second.clone())
        .clickthrough_link(second.trigger())
        .resolve_with(move |data| {
            let salary = reader.input_value().trim().parse::<f64>().unwrap_or(0.0);
            with_field(data, "salary", json!(salary))
        })
        .build()?;

    let high_prompt = high.clone();
    let high_step = Step::builder("salary-high", high.clone())
        .clickthrough_link(high.trigger())
        .initialize(move |data| {
            high_prompt.set_message(format!("{} is a lot. Congratulations!", data["salary"]));
        })
        .build()?;

    let low_prompt = low.clone();
    let low_step = Step::builder("salary-low", low.clone())
        .clickthrough_link(low.trigger())
        .initialize(move |data| {
            low_prompt.set_message(format!("{} - keep at it.", data["salary"]));
        })
        .build()?;

    // Declared tail-first: the branch refers to the exits
    let high_status = status.clone();
    let exit_for_high_income = link_exit(high_step, move |data| {
        post(&high_status, format!("High income exit: {}", data["salary"]));
    });
    let exit_for_low_income = link_exit(low_step, move |data| {
        post(&status, format!("Low income exit: {}", data["salary"]));
    });
    let branch_from_salary = link_branches(salary_step, move |data| {
        if data["salary"].as_f64().unwrap_or(0.0) > HIGH_INCOME_THRESHOLD {
            exit_for_high_income.load_with(data)
        } else {
            exit_for_low_income.load_with(data)
        }
    });
    let head = link(entry_step, branch_from_salary);

    Ok(Demo {
        title: "Salary branches",
        dialogs: vec![entry, second, high, low],
        head,
    })
}

pub fn signup(config: &Config, status: StatusSender) -> Result<Demo> {
    let form = ModalDialog::with_input(
        "Sign up",
        format!("Submits to {}/accounts", config.remote.base_url),
        "Email",
    );
    let done = ModalDialog::new("Welcome", "");

    let submitter = Arc::new(HttpSubmitter::from_config(&config.remote));
    let reader = form.clone();
    let success_status = status.clone();
    let remote = RemoteSubmit::new(submitter, SubmitMethod::Post, "/accounts", move |_| {
        json!({"email": reader.input_value()})
    })
    .response_mixin(|_| {
        let mut fields = Map::new();
        fields.insert("cta".to_string(), json!("terminal-demo"));
        fields
    })
    .on_success(move || {
        let _ = success_status.send("Account request accepted".to_string());
    });

    let signup_step = Step::builder("signup", form.clone())
        .form(form.trigger())
        .error_processor(form.clone())
        .before_submit(|| tracing::debug!("Submitting signup"))
        .remote(remote)
        .build()?;

    let prompt = done.clone();
    let welcome_step = Step::builder("signup-welcome", done.clone())
        .clickthrough_link(done.trigger())
        .initialize(move |response| {
            prompt.set_message(format!("Server replied: {}", response));
        })
        .build()?;

    let head = chain([
        signup_step.into(),
        welcome_step.into(),
        ChainNode::exit(move |response: Value| {
            post(&status, format!("Signed up ({})", response["cta"]));
        }),
    ])?;

    Ok(Demo {
        title: "Remote signup",
        dialogs: vec![form, done],
        head,
    })
}
