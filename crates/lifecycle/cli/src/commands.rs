//! Subcommand implementations

use crate::scenario::{merge_context, Scenario, Step};
use anyhow::{anyhow, bail, Context, Result};
use clap::ValueEnum;
use lifecycle_engine::WorkflowDefinition;
use lifecycle_runtime::{
    DispatchReport, Dispatcher, InMemoryAuditLog, InMemorySnapshotStore, RuntimeConfig,
};
use lifecycle_types::{EntityKind, EventName, StateId, WorkflowContext};
use lifecycle_workflows::{DeliverableContext, ProjectContext, Workflows};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;

/// Output format
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    Yaml,
}

fn print_structured<T: Serialize>(value: &T, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Yaml => print!("{}", serde_yaml::to_string(value)?),
        _ => println!("{}", serde_json::to_string_pretty(value)?),
    }
    Ok(())
}

// ── describe ─────────────────────────────────────────────────────────

/// Print the declarative table of one entity kind
pub fn describe(kind: EntityKind, format: OutputFormat) -> Result<()> {
    let table = lifecycle_workflows::table_for(kind)?;

    if format != OutputFormat::Text {
        return print_structured(&table, format);
    }

    println!("{} lifecycle (v{}), initial state: {}", table.name, table.version, table.initial);
    for state in &table.states {
        let marker = if state.terminal { " (terminal)" } else { "" };
        println!();
        println!("  {}{}  {}", state.id, marker, state.description);
        for binding in &state.bindings {
            for candidate in &binding.candidates {
                let target = candidate
                    .target
                    .as_ref()
                    .map(|t| t.to_string())
                    .unwrap_or_else(|| "(stay)".to_string());
                let guards: Vec<&str> = candidate.guards.iter().map(|g| g.as_str()).collect();
                let guards = if guards.is_empty() {
                    String::new()
                } else {
                    format!(" [{}]", guards.join(" && "))
                };
                println!("    {} -> {}{}", binding.event, target, guards);
            }
        }
    }
    if !table.context_events.is_empty() {
        println!();
        println!("  any state:");
        for global in &table.context_events {
            println!("    {}  {}", global.event, global.description);
        }
    }
    Ok(())
}

// ── allowed ──────────────────────────────────────────────────────────

#[derive(Serialize)]
struct Availability {
    state: StateId,
    allowed: Vec<EventName>,
    context_events: Vec<EventName>,
    blocked: Vec<BlockedAction>,
}

#[derive(Serialize)]
struct BlockedAction {
    action: EventName,
    reason: String,
}

/// Print which actions are open from `state` for a given context
pub fn allowed(
    kind: EntityKind,
    state: &str,
    context: Option<&str>,
    config: &RuntimeConfig,
    format: OutputFormat,
) -> Result<()> {
    let overrides = context
        .map(|text| serde_json::from_str::<serde_json::Value>(text))
        .transpose()
        .context("--context must be a JSON object")?;
    let state = StateId::new(state);

    let availability = match kind {
        EntityKind::Deliverable => {
            let base = serde_json::to_value(config.new_deliverable_context())?;
            let ctx: DeliverableContext =
                serde_json::from_value(merge_context(base, overrides.as_ref()))?;
            availability(&lifecycle_workflows::deliverable::definition()?, state, &ctx)?
        }
        EntityKind::Project => {
            let base = serde_json::to_value(ProjectContext::new())?;
            let ctx: ProjectContext =
                serde_json::from_value(merge_context(base, overrides.as_ref()))?;
            availability(&lifecycle_workflows::project::definition()?, state, &ctx)?
        }
    };

    if format != OutputFormat::Text {
        return print_structured(&availability, format);
    }

    println!("From {}:", availability.state);
    for action in &availability.allowed {
        println!("  + {}", action);
    }
    for action in &availability.context_events {
        println!("  + {} (any state)", action);
    }
    for blocked in &availability.blocked {
        println!("  - {}: {}", blocked.action, blocked.reason);
    }
    Ok(())
}

fn availability<C: WorkflowContext>(
    definition: &WorkflowDefinition<C>,
    state: StateId,
    context: &C,
) -> Result<Availability> {
    let intro = definition.introspect();
    let allowed = intro.allowed_actions(&state, context)?;
    let context_events = intro.allowed_context_events(context)?;

    let spec = definition.ensure_state(&state)?;
    let mut blocked = Vec::new();
    let candidates = spec
        .events()
        .chain(definition.table().context_events.iter().map(|e| &e.event));
    for action in candidates {
        if let Some(reason) = intro.blocked_reason_in(&state, action, context)? {
            blocked.push(BlockedAction {
                action: action.clone(),
                reason,
            });
        }
    }

    Ok(Availability {
        state,
        allowed,
        context_events,
        blocked,
    })
}

// ── run ──────────────────────────────────────────────────────────────

type MemoryDispatcher<C> = Dispatcher<C, InMemorySnapshotStore<C>>;

/// Replay a scenario against in-memory storage and print what happened
pub async fn run(path: &Path, config: &RuntimeConfig, format: OutputFormat) -> Result<()> {
    let scenario = Scenario::load(path)?;
    let workflows = Workflows::load()?;
    let audit = Arc::new(InMemoryAuditLog::new());

    let deliverables: MemoryDispatcher<DeliverableContext> = Dispatcher::new(
        Arc::new(workflows.deliverable),
        Arc::new(InMemorySnapshotStore::new()),
        audit.clone(),
    )
    .with_config(config.dispatch.clone());
    let projects: MemoryDispatcher<ProjectContext> = Dispatcher::new(
        Arc::new(workflows.project),
        Arc::new(InMemorySnapshotStore::new()),
        audit.clone(),
    )
    .with_config(config.dispatch.clone());

    tracing::info!(
        scenario = %scenario.name,
        entities = scenario.entities.len(),
        steps = scenario.steps.len(),
        "Running scenario"
    );

    for seed in &scenario.entities {
        match seed.kind {
            EntityKind::Deliverable => {
                let base = serde_json::to_value(config.new_deliverable_context())?;
                let ctx = serde_json::from_value(merge_context(base, seed.context.as_ref()))
                    .with_context(|| format!("Invalid context for {}", seed.id))?;
                deliverables.create(seed.id.clone(), ctx).await?;
            }
            EntityKind::Project => {
                let base = serde_json::to_value(ProjectContext::new())?;
                let ctx = serde_json::from_value(merge_context(base, seed.context.as_ref()))
                    .with_context(|| format!("Invalid context for {}", seed.id))?;
                projects.create(seed.id.clone(), ctx).await?;
            }
        }
    }

    let mut failures = Vec::new();
    for (index, step) in scenario.steps.iter().enumerate() {
        let kind = scenario
            .kind_of(&step.entity)
            .ok_or_else(|| anyhow!("Undeclared entity {}", step.entity))?;
        let state = match kind {
            EntityKind::Deliverable => run_step(&deliverables, step, format).await?,
            EntityKind::Project => run_step(&projects, step, format).await?,
        };

        if let Some(expected) = &step.expect {
            if state != expected.as_str() {
                failures.push(format!(
                    "step {} ({} {}): expected {}, got {}",
                    index + 1,
                    step.entity,
                    step.event,
                    expected,
                    state
                ));
            }
        }
    }

    let records = audit.all().await;
    if format == OutputFormat::Text {
        println!();
        println!("Audit log ({} records):", records.len());
        for record in &records {
            println!("  {}  {}", record.timestamp.format("%H:%M:%S%.3f"), record);
        }
    } else {
        print_structured(&records, format)?;
    }

    if !failures.is_empty() {
        bail!("{} expectation(s) failed:\n  {}", failures.len(), failures.join("\n  "));
    }
    Ok(())
}

async fn run_step<C: WorkflowContext>(
    dispatcher: &MemoryDispatcher<C>,
    step: &Step,
    format: OutputFormat,
) -> Result<StateId> {
    let report: DispatchReport<C> = dispatcher
        .dispatch(&step.entity, step.to_event())
        .await
        .with_context(|| format!("Dispatching {} to {}", step.event, step.entity))?;

    if format == OutputFormat::Text {
        println!("{} {}: {}", step.entity, step.event, report.outcome);
    }
    if let Some(err) = &report.audit_error {
        tracing::warn!(entity = %step.entity, event = %step.event, error = %err, "Step committed without audit");
    }
    Ok(report.instance.state)
}
