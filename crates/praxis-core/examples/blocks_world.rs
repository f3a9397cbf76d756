//! Minimal blocks-world walkthrough: register actions, plan, execute.
//!
//! Run with `cargo run --example blocks_world` (set `RUST_LOG=debug` to see
//! the search trace).

use anyhow::Result;
use tracing_subscriber::{fmt, EnvFilter};

use praxis_core::{PlanService, StepOutcome};
use praxis_plan::{ActionDef, Constraints, Goal, SelectionPolicy, State};

fn main() -> Result<()> {
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let service = PlanService::new();

    service.register_action(
        "pickup_block",
        ActionDef::new("pickup_block")
            .with_param("object", "block_a")
            .requires("hand_empty")
            .requires("block_on_table")
            .adds("holding_block")
            .removes("hand_empty"),
    )?;
    service.register_action(
        "stack_block",
        ActionDef::new("stack_block")
            .with_param("target", "block_b")
            .requires("holding_block")
            .adds("block_stacked")
            .adds("hand_empty")
            .removes("holding_block"),
    )?;

    let goal = Goal::new("stack block A on block B", State::from_iter(["block_stacked"]));
    let initial = State::from_iter(["hand_empty", "block_on_table"]);
    let constraints = Constraints::default().with_policy(SelectionPolicy::LowestCost);

    let id = service.create_plan(goal, initial, &constraints)?;
    let plan = service.get_plan(&id).expect("plan was just created");
    tracing::info!(plan = %id, cost = plan.total_cost, "planned");
    for (i, step) in plan.steps.iter().enumerate() {
        tracing::info!(step = i, action = %step.name, "plan step");
    }

    service.execute_plan(&id)?;
    for _ in 0..plan.steps.len() {
        service.report_step(&id, StepOutcome::Succeeded)?;
    }
    tracing::info!(status = ?service.get_plan_status(&id), "finished");

    Ok(())
}
