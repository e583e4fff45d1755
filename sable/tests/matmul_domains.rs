use sable::{
    matmul, sym, Assignment, AxisRef, Declaration, PlaybackEngine, SymbolId, Workspace,
    WorkspaceOptions,
};

fn deferred_ws() -> Workspace {
    Workspace::with_options(
        "matmul",
        Box::new(PlaybackEngine::new()),
        WorkspaceOptions::deferred(),
    )
}

fn named_set(ws: &mut Workspace, name: &str) -> SymbolId {
    ws.declare(Declaration::set(name)).unwrap()
}

fn parameter_over(ws: &mut Workspace, name: &str, axes: &[SymbolId]) -> SymbolId {
    ws.declare(
        Declaration::parameter(name).domain(axes.iter().map(|&s| AxisRef::Symbol(s)).collect()),
    )
    .unwrap()
}

#[test]
fn test_chained_products_contract_stepwise() {
    // (i,k) @ (k,j) @ (j) -> (i)
    let mut ws = deferred_ws();
    let i = named_set(&mut ws, "i");
    let k = named_set(&mut ws, "k");
    let j = named_set(&mut ws, "j");
    let a = parameter_over(&mut ws, "a", &[i, k]);
    let b = parameter_over(&mut ws, "b", &[k, j]);
    let v = parameter_over(&mut ws, "v", &[j]);

    let ab = {
        let lhs = sym(&ws, a).unwrap();
        let rhs = sym(&ws, b).unwrap();
        matmul(&mut ws, lhs, rhs).unwrap()
    };
    assert_eq!(ab.domain, vec![AxisRef::Symbol(i), AxisRef::Symbol(j)]);

    let rhs = sym(&ws, v).unwrap();
    let abv = matmul(&mut ws, ab, rhs).unwrap();
    assert_eq!(abv.domain, vec![AxisRef::Symbol(i)]);
}

#[test]
fn test_vector_against_deep_tensor() {
    // (n) @ (m,n,p) -> (m,p), regardless of set cardinalities
    let mut ws = deferred_ws();
    let n = named_set(&mut ws, "n");
    let m = named_set(&mut ws, "m");
    let p = named_set(&mut ws, "p");
    let weights = parameter_over(&mut ws, "weights", &[n]);
    let stack = parameter_over(&mut ws, "stack", &[m, n, p]);

    let lhs = sym(&ws, weights).unwrap();
    let rhs = sym(&ws, stack).unwrap();
    let out = matmul(&mut ws, lhs, rhs).unwrap();
    assert_eq!(out.domain, vec![AxisRef::Symbol(m), AxisRef::Symbol(p)]);
}

#[test]
fn test_batched_product_requires_matching_batch_axes() {
    let mut ws = deferred_ws();
    let b1 = named_set(&mut ws, "b1");
    let b2 = named_set(&mut ws, "b2");
    let i = named_set(&mut ws, "i");
    let k = named_set(&mut ws, "k");
    let j = named_set(&mut ws, "j");
    let x = parameter_over(&mut ws, "x", &[b1, i, k]);
    let y = parameter_over(&mut ws, "y", &[b2, k, j]);

    let lhs = sym(&ws, x).unwrap();
    let rhs = sym(&ws, y).unwrap();
    let err = matmul(&mut ws, lhs, rhs).unwrap_err();
    assert!(err.to_string().contains("batch axis"));
}

#[test]
fn test_product_lowers_to_a_sum_in_the_program() {
    let mut ws = deferred_ws();
    let i = named_set(&mut ws, "i");
    let k = named_set(&mut ws, "k");
    let j = named_set(&mut ws, "j");
    let a = parameter_over(&mut ws, "a", &[i, k]);
    let b = parameter_over(&mut ws, "b", &[k, j]);
    let c = parameter_over(&mut ws, "c", &[i, j]);

    let product = {
        let lhs = sym(&ws, a).unwrap();
        let rhs = sym(&ws, b).unwrap();
        matmul(&mut ws, lhs, rhs).unwrap()
    };
    ws.assign(Assignment {
        target: c,
        indices: Vec::new(),
        guard: None,
        value: product,
    })
    .unwrap();

    let program = ws.pending_program().unwrap();
    assert!(
        program.text.contains("c = sum(k, a(i,k) * b(k,j));"),
        "program:\n{}",
        program
    );
}

#[test]
fn test_collision_product_renders_with_synthesized_alias() {
    // a(i,k) @ b(k,i): the output's second axis is the alias i__2, and the
    // right operand is re-indexed to use it.
    let mut ws = deferred_ws();
    let i = named_set(&mut ws, "i");
    let k = named_set(&mut ws, "k");
    let a = parameter_over(&mut ws, "a", &[i, k]);
    let b = parameter_over(&mut ws, "b", &[k, i]);
    let c = parameter_over(&mut ws, "c", &[i, i]);

    let product = {
        let lhs = sym(&ws, a).unwrap();
        let rhs = sym(&ws, b).unwrap();
        matmul(&mut ws, lhs, rhs).unwrap()
    };
    ws.assign(Assignment {
        target: c,
        indices: product
            .domain
            .iter()
            .map(|&axis| sable::IndexSel::Axis(axis))
            .collect(),
        guard: None,
        value: product,
    })
    .unwrap();

    let program = ws.pending_program().unwrap();
    assert!(
        program.text.contains("sum(k, a(i,k) * b(k,i__2))"),
        "program:\n{}",
        program
    );
    assert!(
        program.text.contains("Alias (i, i__2);"),
        "program:\n{}",
        program
    );
}
