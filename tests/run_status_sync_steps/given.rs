//! Given steps for run status synchronisation scenarios.

use super::world::{RunSyncWorld, parse_poll, split_list};
use eyre::WrapErr;
use rstest_bdd_macros::given;

#[given(r#"the revision declares runs "{names}""#)]
fn revision_declares_runs(world: &mut RunSyncWorld, names: String) -> Result<(), eyre::Report> {
    world
        .bridge
        .declare(&split_list(&names))
        .wrap_err("declare runs at the head revision")
}

#[given(r#"run "{name}" reports "{statuses}""#)]
fn run_reports(
    world: &mut RunSyncWorld,
    name: String,
    statuses: String,
) -> Result<(), eyre::Report> {
    let polls = split_list(&statuses).into_iter().map(parse_poll).collect();
    world
        .bridge
        .script(&name, polls)
        .wrap_err("script backend answers")
}
