//! End-to-end engine scenarios against the library API.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::time::{Duration, SystemTime};

use tempfile::TempDir;

use drake::fsys::FsFacade;
use drake::materialize::materialize;
use drake::merge::merge_branch;
use drake::options::Options;
use drake::parser::parse_workflow;
use drake::predict::predict;
use drake::protocol::ProtocolRegistry;
use drake::runner::Runner;
use drake::select::select_targets;
use drake::staleness::Cause;
use drake::ui::Ui;
use drake::workflow::ParseTree;

fn tree(text: &str) -> ParseTree {
    let registry = ProtocolRegistry::new();
    parse_workflow(text, HashMap::new(), registry.names()).unwrap()
}

fn write_with_mtime(dir: &Path, name: &str, age_secs: u64) {
    let path = dir.join(name);
    fs::write(&path, "data").unwrap();
    let mtime = SystemTime::now() - Duration::from_secs(age_secs);
    let f = fs::File::options().write(true).open(&path).unwrap();
    f.set_modified(mtime).unwrap();
}

fn options_for(temp: &TempDir) -> Options {
    Options {
        workflow: temp.path().join("workflow.d"),
        auto: true,
        quiet: true,
        ..Default::default()
    }
}

fn run_targets(temp: &TempDir, tree: &ParseTree, options: &Options, targets: &[&str]) -> usize {
    let fs_facade = FsFacade::new(temp.path());
    let protocols = ProtocolRegistry::new();
    let runner = Runner::new(
        tree,
        options,
        &fs_facade,
        &protocols,
        HashMap::new(),
        Ui::new(true),
    );
    let exprs: Vec<String> = targets.iter().map(|s| s.to_string()).collect();
    runner.run(&exprs).unwrap()
}

// S1: input newer than output, the step rebuilds with cause "timestamped".
#[test]
fn timestamp_rebuild() {
    let temp = TempDir::new().unwrap();
    write_with_mtime(temp.path(), "a", 60);
    write_with_mtime(temp.path(), "b", 3600);

    let tree = tree("b <- a\n    cp ${INPUT} ${OUTPUT}\n");
    let options = options_for(&temp);

    let fs_facade = FsFacade::new(temp.path());
    let selected = select_targets(&tree, &["=...".to_string()]).unwrap();
    let predicted = predict(&tree, &selected, &options, &fs_facade).unwrap();

    assert_eq!(predicted.len(), 1);
    assert_eq!(predicted[0].index, 0);
    assert_eq!(predicted[0].cause, Cause::Timestamped);
    assert_eq!(predicted[0].cause.to_string(), "timestamped");

    assert_eq!(run_targets(&temp, &tree, &options, &["=..."]), 1);
}

// S2: output newer than input, nothing runs.
#[test]
fn up_to_date_skip() {
    let temp = TempDir::new().unwrap();
    write_with_mtime(temp.path(), "a", 3600);
    write_with_mtime(temp.path(), "b", 60);

    let tree = tree("b <- a\n    cp ${INPUT} ${OUTPUT}\n");
    let options = options_for(&temp);

    let fs_facade = FsFacade::new(temp.path());
    let selected = select_targets(&tree, &["=...".to_string()]).unwrap();
    let predicted = predict(&tree, &selected, &options, &fs_facade).unwrap();
    assert!(predicted.is_empty());

    assert_eq!(run_targets(&temp, &tree, &options, &["=..."]), 0);
}

// S3: forced tag match builds regardless of timestamps.
#[test]
fn forced_with_tag_match() {
    let temp = TempDir::new().unwrap();
    write_with_mtime(temp.path(), "a", 3600);
    write_with_mtime(temp.path(), "b", 60);

    let tree = tree("b, %t <- a\n    cp ${INPUT} ${OUTPUT}\n");
    let options = options_for(&temp);

    let fs_facade = FsFacade::new(temp.path());
    let selected = select_targets(&tree, &["!%t".to_string()]).unwrap();
    let predicted = predict(&tree, &selected, &options, &fs_facade).unwrap();

    assert_eq!(predicted.len(), 1);
    assert_eq!(predicted[0].cause.to_string(), "forced (via tag)");
}

// S4: with a branch active, inputs read through to the base namespace when
// no branch copy exists, while outputs land in the branch.
#[test]
fn branch_read_through() {
    let temp = TempDir::new().unwrap();
    write_with_mtime(temp.path(), "a", 60);

    let tree = tree("b <- a\n    cp ${INPUT} ${OUTPUT}\n");
    let options = Options {
        branch: "x".to_string(),
        ..options_for(&temp)
    };

    let fs_facade = FsFacade::new(temp.path());
    let protocols = ProtocolRegistry::new();
    let step = materialize(&tree, 0, &HashMap::new(), &options, &fs_facade, &protocols).unwrap();

    assert_eq!(
        step.inputs,
        vec![temp.path().join("a").display().to_string()]
    );
    assert_eq!(
        step.outputs,
        vec![temp.path().join("b#x").display().to_string()]
    );

    run_targets(&temp, &tree, &options, &["=..."]);
    assert!(temp.path().join("b#x").exists());
}

// S5: a triggered step's missing input is tolerated at predict time and
// satisfied by the time the step actually runs.
#[test]
fn missing_triggered_input_is_non_fatal_at_predict() {
    let temp = TempDir::new().unwrap();

    let tree = tree("a <-\n    touch ${OUTPUT}\nb <- a\n    cp ${INPUT} ${OUTPUT}\n");
    let options = options_for(&temp);

    let fs_facade = FsFacade::new(temp.path());
    let selected = select_targets(&tree, &["=...".to_string()]).unwrap();
    let predicted = predict(&tree, &selected, &options, &fs_facade).unwrap();

    assert_eq!(predicted.len(), 2);
    assert_eq!(predicted[1].cause, Cause::ProjectedTimestamped);

    // The runner re-checks s2 with the authoritative rules once a exists.
    assert_eq!(run_targets(&temp, &tree, &options, &["=..."]), 2);
    assert!(temp.path().join("b").exists());
}

// S6: merge moves only outputs whose branch copy exists.
#[test]
fn merge_branch_moves_existing_copies_only() {
    let temp = TempDir::new().unwrap();
    write_with_mtime(temp.path(), "a", 60);
    fs::write(temp.path().join("b#x"), "branched").unwrap();
    // c#x does not exist.

    let tree = tree("b <- a\n    cmd\nc <- b\n    cmd\n");
    let options = Options {
        merge_branch: "x".to_string(),
        ..options_for(&temp)
    };

    let fs_facade = FsFacade::new(temp.path());
    let ui = Ui::new(true);
    merge_branch(&tree, &["=...".to_string()], &options, &fs_facade, &ui).unwrap();

    assert_eq!(
        fs::read_to_string(temp.path().join("b")).unwrap(),
        "branched"
    );
    assert!(!temp.path().join("b#x").exists());
    assert!(!temp.path().join("c").exists());
}

// Invariant 1: prediction output is a topological order of the DAG.
#[test]
fn prediction_is_topologically_valid() {
    let temp = TempDir::new().unwrap();

    let tree = tree(
        "a <-\n    touch ${OUTPUT}\n\
         b <- a\n    cp ${INPUT} ${OUTPUT}\n\
         c <- a\n    cp ${INPUT} ${OUTPUT}\n\
         d <- b, c\n    touch ${OUTPUT}\n",
    );
    let options = options_for(&temp);

    let fs_facade = FsFacade::new(temp.path());
    let selected = select_targets(&tree, &["=...".to_string()]).unwrap();
    let predicted = predict(&tree, &selected, &options, &fs_facade).unwrap();

    let position: HashMap<usize, usize> = predicted
        .iter()
        .enumerate()
        .map(|(pos, p)| (p.index, pos))
        .collect();
    for p in &predicted {
        for &dep in tree.graph().dependencies_of(p.index) {
            if let Some(&dep_pos) = position.get(&dep) {
                assert!(dep_pos < position[&p.index]);
            }
        }
    }
}

// Invariant 7: --vars beats the environment, step vars beat --vars.
#[test]
fn variable_precedence_is_respected() {
    let temp = TempDir::new().unwrap();

    let registry = ProtocolRegistry::new();
    let workflow = "MODE=step\nout <- \n    printf '%s' ${MODE} > ${OUTPUT}\n";

    // Base env models OS environment merged under --vars.
    let mut base_env = HashMap::new();
    base_env.insert("MODE".to_string(), "vars".to_string());

    // Step vars win over the base env.
    let tree = parse_workflow(workflow, base_env.clone(), registry.names()).unwrap();
    let options = options_for(&temp);
    let fs_facade = FsFacade::new(temp.path());
    let step = materialize(&tree, 0, &base_env, &options, &fs_facade, &registry).unwrap();
    assert!(step.cmds[0].contains("step"));

    // Without a step binding, the --vars value is used.
    let tree = parse_workflow(
        "out <- \n    printf '%s' ${MODE} > ${OUTPUT}\n",
        base_env.clone(),
        registry.names(),
    )
    .unwrap();
    let step = materialize(&tree, 0, &base_env, &options, &fs_facade, &registry).unwrap();
    assert!(step.cmds[0].contains("vars"));
}

// Forced monotonicity: a forced selection always reports a forced cause.
#[test]
fn forced_cause_is_independent_of_filesystem_state() {
    for age in [(60u64, 3600u64), (3600, 60)] {
        let temp = TempDir::new().unwrap();
        write_with_mtime(temp.path(), "a", age.0);
        write_with_mtime(temp.path(), "b", age.1);

        let tree = tree("b <- a\n    cp ${INPUT} ${OUTPUT}\n");
        let options = options_for(&temp);
        let fs_facade = FsFacade::new(temp.path());

        let selected = select_targets(&tree, &["!b".to_string()]).unwrap();
        let predicted = predict(&tree, &selected, &options, &fs_facade).unwrap();
        assert!(predicted[0].cause.to_string().starts_with("forced"));
    }
}
