use super::*;
use crate::metadata::{FunctionMetadata, ModelMetadata};
use crate::record::{CanonicalFunction, CanonicalModel, OperationType, SqlCode};
use std::path::PathBuf;
use std::sync::Arc;

fn model_node(name: &str) -> DagNode {
    DagNode::Model(ModelName::try_new(name).unwrap())
}

fn add_model(ctx: &mut ProjectContext, name: &str, tables: &[&str], functions: &[&str]) {
    let mut sql = SqlCode::new("SELECT 1", OperationType::Select);
    sql.source_tables = tables.iter().map(|t| t.to_string()).collect();
    sql.source_functions = functions.iter().map(|f| f.to_string()).collect();
    let model = CanonicalModel::build(
        ModelMetadata::new(ModelName::try_new(name).unwrap()),
        Some(sql.into()),
        Some(PathBuf::from(format!("models/{}.sql", name))),
    );
    ctx.register_model(Arc::new(model)).unwrap();
}

fn add_function(ctx: &mut ProjectContext, name: &str, tables: &[&str]) {
    let mut sql = SqlCode::new("CREATE FUNCTION f() ...", OperationType::CreateFunction);
    sql.source_tables = tables.iter().map(|t| t.to_string()).collect();
    let function = CanonicalFunction::build(
        FunctionMetadata::new(FunctionName::try_new(name).unwrap()),
        Some(sql.into()),
        Some(PathBuf::from(format!("functions/{}.sql", name))),
    );
    ctx.register_function(Arc::new(function)).unwrap();
}

#[test]
fn test_chain_orders_dependencies_first() {
    // C reads B, B reads A
    let mut ctx = ProjectContext::new();
    add_model(&mut ctx, "c", &["b"], &[]);
    add_model(&mut ctx, "a", &[], &[]);
    add_model(&mut ctx, "b", &["a"], &[]);

    let dag = ProjectDag::build(&ctx).unwrap();
    let order = dag.execution_order().unwrap();
    assert_eq!(order, vec![model_node("a"), model_node("b"), model_node("c")]);
}

#[test]
fn test_order_is_deterministic_for_independent_nodes() {
    let mut ctx = ProjectContext::new();
    add_model(&mut ctx, "zeta", &[], &[]);
    add_model(&mut ctx, "alpha", &[], &[]);
    add_model(&mut ctx, "mid", &["zeta"], &[]);

    let order = ProjectDag::build(&ctx).unwrap().execution_order().unwrap();
    let names: Vec<&str> = order.iter().map(DagNode::name).collect();
    assert_eq!(names, vec!["alpha", "zeta", "mid"]);
}

#[test]
fn test_external_tables_are_ignored() {
    let mut ctx = ProjectContext::new();
    add_model(&mut ctx, "stg_orders", &["raw.orders"], &[]);

    let dag = ProjectDag::build(&ctx).unwrap();
    assert_eq!(dag.len(), 1);
    assert!(dag.dependencies(&model_node("stg_orders")).is_empty());
}

#[test]
fn test_unqualified_reference_matches_qualified_model() {
    let mut ctx = ProjectContext::new();
    add_model(&mut ctx, "staging.orders", &[], &[]);
    add_model(&mut ctx, "marts.fct_orders", &["orders"], &[]);

    let dag = ProjectDag::build(&ctx).unwrap();
    assert_eq!(
        dag.dependencies(&model_node("marts.fct_orders")),
        vec![model_node("staging.orders")]
    );
}

#[test]
fn test_function_edges() {
    let mut ctx = ProjectContext::new();
    add_model(&mut ctx, "rates", &[], &[]);
    add_function(&mut ctx, "utils.convert", &["rates"]);
    add_model(&mut ctx, "report", &[], &["convert"]);

    let dag = ProjectDag::build(&ctx).unwrap();
    let order = dag.execution_order().unwrap();
    let pos = |n: &DagNode| order.iter().position(|o| o == n).unwrap();
    let func = DagNode::Function(FunctionName::try_new("utils.convert").unwrap());

    assert!(pos(&model_node("rates")) < pos(&func));
    assert!(pos(&func) < pos(&model_node("report")));
    assert_eq!(func.to_string(), "utils.convert()");
}

#[test]
fn test_circular_dependency() {
    let mut ctx = ProjectContext::new();
    add_model(&mut ctx, "a", &["b"], &[]);
    add_model(&mut ctx, "b", &["c"], &[]);
    add_model(&mut ctx, "c", &["a"], &[]);

    let err = ProjectDag::build(&ctx).unwrap_err();
    match err {
        CoreError::CircularDependency { cycle } => {
            assert!(cycle.contains(" -> "), "got: {}", cycle);
            for name in ["a", "b", "c"] {
                assert!(cycle.contains(name), "got: {}", cycle);
            }
        }
        other => panic!("unexpected error: {}", other),
    }
}

#[test]
fn test_self_reference_is_not_a_cycle() {
    let mut ctx = ProjectContext::new();
    add_model(&mut ctx, "events", &["events"], &[]);
    assert!(ProjectDag::build(&ctx).is_ok());
}

#[test]
fn test_ancestors_and_descendants() {
    let mut ctx = ProjectContext::new();
    add_model(&mut ctx, "raw", &[], &[]);
    add_model(&mut ctx, "stg", &["raw"], &[]);
    add_model(&mut ctx, "int", &["stg"], &[]);
    add_model(&mut ctx, "fct", &["int", "raw"], &[]);

    let dag = ProjectDag::build(&ctx).unwrap();
    assert_eq!(
        dag.ancestors(&model_node("fct")),
        vec![model_node("int"), model_node("raw"), model_node("stg")]
    );
    assert_eq!(
        dag.descendants(&model_node("raw")),
        vec![model_node("fct"), model_node("int"), model_node("stg")]
    );
    assert_eq!(
        dag.dependents(&model_node("raw")),
        vec![model_node("fct"), model_node("stg")]
    );
    assert!(dag.ancestors(&model_node("missing")).is_empty());
}

#[test]
fn test_manual_edges() {
    let mut dag = ProjectDag::new();
    dag.add_dependency(&model_node("b"), &model_node("a"));
    dag.add_dependency(&model_node("b"), &model_node("a"));
    assert_eq!(dag.dependencies(&model_node("b")), vec![model_node("a")]);
    assert!(dag.contains(&model_node("a")));
    assert_eq!(dag.nodes(), vec![model_node("a"), model_node("b")]);
}
