use super::{deferred_ws, populated_set};
use crate::algebra::{binary, reduce, sym, BinaryOp, ReductionOp};
use crate::scheduler::EquationDef;
use crate::symbols::AxisRef;
use crate::{
    Declaration, EquationRelation, ProblemClass, SableError, Sense, SymbolId, VariableType,
    Workspace,
};

/// A linear scalar objective: z =e= sum(i, c(i) * x(i))
fn linear_model(ws: &mut Workspace) -> (SymbolId, SymbolId, SymbolId) {
    let i = populated_set(ws, "i", &["a", "b"]);
    let c = ws
        .declare(Declaration::parameter("c").domain(vec![AxisRef::Symbol(i)]))
        .unwrap();
    ws.set_records(
        c,
        vec![(vec!["a".to_string()], 2.0), (vec!["b".to_string()], 3.0)],
    )
    .unwrap();
    let x = ws
        .declare(
            Declaration::variable("x")
                .domain(vec![AxisRef::Symbol(i)])
                .var_type(VariableType::Positive),
        )
        .unwrap();
    let z = ws.declare(Declaration::variable("z")).unwrap();
    let obj = ws.declare(Declaration::equation("obj")).unwrap();

    let cost = binary(BinaryOp::Mul, sym(ws, c).unwrap(), sym(ws, x).unwrap());
    let total = reduce(ReductionOp::Sum, vec![AxisRef::Symbol(i)], cost).unwrap();
    ws.define_equation(EquationDef {
        equation: obj,
        indices: Vec::new(),
        guard: None,
        relation: EquationRelation::Eq,
        lhs: sym(ws, z).unwrap(),
        rhs: total,
    })
    .unwrap();

    (obj, z, x)
}

#[test]
fn test_assemble_linear_model() {
    let mut ws = deferred_ws();
    let (obj, z, _) = linear_model(&mut ws);
    let model = ws
        .assemble("m", vec![obj], Some(z), Sense::Min, ProblemClass::LP)
        .unwrap();
    assert_eq!(model.equations, vec![obj]);
    assert_eq!(model.card(), 2);
}

#[test]
fn test_assemble_dedupes_equations() {
    let mut ws = deferred_ws();
    let (obj, z, _) = linear_model(&mut ws);
    let model = ws
        .assemble("m", vec![obj, obj, obj], Some(z), Sense::Min, ProblemClass::LP)
        .unwrap();
    assert_eq!(model.equations.len(), 1);
}

#[test]
fn test_assemble_rejects_undefined_equation() {
    let mut ws = deferred_ws();
    let (_, z, _) = linear_model(&mut ws);
    let empty = ws.declare(Declaration::equation("empty")).unwrap();
    match ws.assemble("m", vec![empty], Some(z), Sense::Min, ProblemClass::LP) {
        Err(SableError::Validation(details)) => {
            assert!(details.message.contains("no definition"));
        }
        Err(e) => panic!("Expected Validation, got: {:?}", e),
        Ok(_) => panic!("Expected undefined-equation error"),
    }
}

#[test]
fn test_assemble_rejects_non_equation_member() {
    let mut ws = deferred_ws();
    let (_, z, _) = linear_model(&mut ws);
    let stray = ws.declare(Declaration::parameter("stray")).unwrap();
    assert!(ws
        .assemble("m", vec![stray], Some(z), Sense::Min, ProblemClass::LP)
        .is_err());
}

#[test]
fn test_optimizing_model_needs_an_objective() {
    let mut ws = deferred_ws();
    let (obj, _, _) = linear_model(&mut ws);
    assert!(ws
        .assemble("m", vec![obj], None, Sense::Min, ProblemClass::LP)
        .is_err());
}

#[test]
fn test_feasibility_model_takes_no_objective() {
    let mut ws = deferred_ws();
    let (obj, z, _) = linear_model(&mut ws);
    assert!(ws
        .assemble("m", vec![obj], Some(z), Sense::Feasibility, ProblemClass::LP)
        .is_err());
    assert!(ws
        .assemble("m", vec![obj], None, Sense::Feasibility, ProblemClass::LP)
        .is_ok());
}

#[test]
fn test_feasibility_model_card_counts_only_equations() {
    // The implicit objective row exists only when an objective is attached.
    let mut ws = deferred_ws();
    let (obj, _, _) = linear_model(&mut ws);
    let model = ws
        .assemble("m", vec![obj], None, Sense::Feasibility, ProblemClass::LP)
        .unwrap();
    assert_eq!(model.card(), 1);
}

#[test]
fn test_objective_must_be_a_scalar_variable() {
    let mut ws = deferred_ws();
    let (obj, _, x) = linear_model(&mut ws);
    // x is indexed over i.
    match ws.assemble("m", vec![obj], Some(x), Sense::Min, ProblemClass::LP) {
        Err(SableError::Validation(details)) => {
            assert!(details.message.contains("indexed"));
        }
        Err(e) => panic!("Expected Validation, got: {:?}", e),
        Ok(_) => panic!("Expected scalar-objective error"),
    }
}

#[test]
fn test_nonlinear_equation_rejected_for_lp() {
    let mut ws = deferred_ws();
    let (obj, z, x) = linear_model(&mut ws);
    let quad = ws.declare(Declaration::equation("quad")).unwrap();
    let i = ws.get("i").unwrap();

    // x * x is nonlinear in the variables.
    let square = binary(BinaryOp::Mul, sym(&ws, x).unwrap(), sym(&ws, x).unwrap());
    let total = reduce(ReductionOp::Sum, vec![AxisRef::Symbol(i)], square).unwrap();
    ws.define_equation(EquationDef {
        equation: quad,
        indices: Vec::new(),
        guard: None,
        relation: EquationRelation::Leq,
        lhs: total,
        rhs: sym(&ws, z).unwrap(),
    })
    .unwrap();

    match ws.assemble("m", vec![obj, quad], Some(z), Sense::Min, ProblemClass::LP) {
        Err(SableError::Validation(details)) => {
            assert!(details.message.contains("nonlinear"));
            assert!(details.message.contains("quad"));
        }
        Err(e) => panic!("Expected Validation, got: {:?}", e),
        Ok(_) => panic!("Expected class violation"),
    }

    // The same content is admissible as NLP.
    assert!(ws
        .assemble("m", vec![obj, quad], Some(z), Sense::Min, ProblemClass::NLP)
        .is_ok());
}

#[test]
fn test_discrete_variable_rejected_for_lp() {
    let mut ws = deferred_ws();
    let i = populated_set(&mut ws, "i", &["a"]);
    let y = ws
        .declare(
            Declaration::variable("y")
                .domain(vec![AxisRef::Symbol(i)])
                .var_type(VariableType::Binary),
        )
        .unwrap();
    let z = ws.declare(Declaration::variable("z")).unwrap();
    let obj = ws.declare(Declaration::equation("obj")).unwrap();

    let total = reduce(
        ReductionOp::Sum,
        vec![AxisRef::Symbol(i)],
        sym(&ws, y).unwrap(),
    )
    .unwrap();
    ws.define_equation(EquationDef {
        equation: obj,
        indices: Vec::new(),
        guard: None,
        relation: EquationRelation::Eq,
        lhs: sym(&ws, z).unwrap(),
        rhs: total,
    })
    .unwrap();

    match ws.assemble("m", vec![obj], Some(z), Sense::Min, ProblemClass::LP) {
        Err(SableError::Validation(details)) => {
            assert!(details.message.contains("discrete"));
            assert_eq!(details.suggestion.as_deref(), Some("declare the model mip or minlp"));
        }
        Err(e) => panic!("Expected Validation, got: {:?}", e),
        Ok(_) => panic!("Expected class violation"),
    }

    assert!(ws
        .assemble("m", vec![obj], Some(z), Sense::Min, ProblemClass::MIP)
        .is_ok());
}

#[test]
fn test_define_equation_records_profile() {
    let mut ws = deferred_ws();
    let (obj, z, x) = linear_model(&mut ws);
    let data = ws.symbol(obj).equation_data().unwrap();
    assert!(data.defined);
    assert!(!data.nonlinear);
    assert!(data.variables.contains(&z));
    assert!(data.variables.contains(&x));
    assert_eq!(data.relation, Some(EquationRelation::Eq));
}
