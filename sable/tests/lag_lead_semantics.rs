use sable::symbols::sets::{shift_defined, shifted_element, shifted_position};
use sable::{
    binary, lag, lead, sym, sym_ix, Assignment, AxisRef, BinaryOp, Declaration, OffsetMode,
    PlaybackEngine, SymbolId, Workspace, WorkspaceOptions,
};

fn deferred_ws() -> Workspace {
    Workspace::with_options(
        "time",
        Box::new(PlaybackEngine::new()),
        WorkspaceOptions::deferred(),
    )
}

fn year_set(ws: &mut Workspace) -> SymbolId {
    let t = ws.declare(Declaration::set("t")).unwrap();
    ws.set_records(
        t,
        ["y1990", "y1991", "y1992", "y1993"]
            .iter()
            .map(|e| (vec![e.to_string()], 1.0))
            .collect(),
    )
    .unwrap();
    t
}

#[test]
fn test_lag_marks_the_set_ordered() {
    let mut ws = deferred_ws();
    let t = year_set(&mut ws);
    assert!(!ws.symbol(t).set_data().unwrap().ordered);
    lag(&mut ws, t, 1, OffsetMode::Linear).unwrap();
    assert!(ws.symbol(t).set_data().unwrap().ordered);
}

#[test]
fn test_linear_reference_vanishes_outside_range() {
    // Reference semantics: k(t-1) at the first element resolves to no
    // element, so the term contributes zero.
    let mut ws = deferred_ws();
    let t = year_set(&mut ws);
    let data = ws.symbol(t).set_data().unwrap();
    assert_eq!(shifted_element(data, "y1990", -1, OffsetMode::Linear), None);
    assert_eq!(
        shifted_element(data, "y1991", -1, OffsetMode::Linear),
        Some("y1990")
    );
    assert_eq!(shifted_element(data, "y1993", 1, OffsetMode::Linear), None);
}

#[test]
fn test_linear_domain_control_skips_tuples() {
    // Domain-control semantics: an assignment over t-1 generates nothing
    // for the element whose predecessor does not exist.
    let mut ws = deferred_ws();
    let t = year_set(&mut ws);
    let data = ws.symbol(t).set_data().unwrap();
    let generated: Vec<&str> = data
        .elements
        .iter()
        .map(|e| e.as_str())
        .filter(|e| shift_defined(data, e, -1, OffsetMode::Linear))
        .collect();
    assert_eq!(generated, vec!["y1991", "y1992", "y1993"]);
}

#[test]
fn test_circular_shift_is_total() {
    let mut ws = deferred_ws();
    let t = year_set(&mut ws);
    let data = ws.symbol(t).set_data().unwrap();
    for element in &data.elements {
        for shift in [-7i64, -1, 1, 7] {
            assert!(shift_defined(data, element, shift, OffsetMode::Circular));
        }
    }
    assert_eq!(
        shifted_element(data, "y1990", -1, OffsetMode::Circular),
        Some("y1993")
    );
    assert_eq!(
        shifted_element(data, "y1993", 2, OffsetMode::Circular),
        Some("y1991")
    );
}

#[test]
fn test_shift_by_cardinality_is_identity() {
    let mut ws = deferred_ws();
    let t = year_set(&mut ws);
    let data = ws.symbol(t).set_data().unwrap();
    let card = data.len();
    for (position, element) in data.elements.iter().enumerate() {
        assert_eq!(
            shifted_position(position + 1, card as i64, card, OffsetMode::Circular),
            Some(position + 1),
            "element {}",
            element
        );
    }
}

#[test]
fn test_shifted_reference_renders_with_offset_operators() {
    let mut ws = deferred_ws();
    let t = year_set(&mut ws);
    let k = ws
        .declare(Declaration::parameter("k").domain(vec![AxisRef::Symbol(t)]))
        .unwrap();
    let g = ws
        .declare(Declaration::parameter("g").domain(vec![AxisRef::Symbol(t)]))
        .unwrap();

    // k(t) = k(t-1) + g(t--2)
    let previous = lag(&mut ws, t, 1, OffsetMode::Linear).unwrap();
    let wrapped = lag(&mut ws, t, 2, OffsetMode::Circular).unwrap();
    let value = binary(
        BinaryOp::Add,
        sym_ix(&ws, k, vec![previous]).unwrap(),
        sym_ix(&ws, g, vec![wrapped]).unwrap(),
    );
    ws.assign(Assignment {
        target: k,
        indices: Vec::new(),
        guard: None,
        value,
    })
    .unwrap();

    let program = ws.pending_program().unwrap();
    assert!(program.text.contains("k(t-1)"), "program:\n{}", program);
    assert!(program.text.contains("g(t--2)"), "program:\n{}", program);
}

#[test]
fn test_lead_renders_with_plus_operators() {
    let mut ws = deferred_ws();
    let t = year_set(&mut ws);
    let k = ws
        .declare(Declaration::parameter("k").domain(vec![AxisRef::Symbol(t)]))
        .unwrap();

    let next = lead(&mut ws, t, 1, OffsetMode::Linear).unwrap();
    let wrapped = lead(&mut ws, t, 3, OffsetMode::Circular).unwrap();
    let value = binary(
        BinaryOp::Add,
        sym_ix(&ws, k, vec![next]).unwrap(),
        sym_ix(&ws, k, vec![wrapped]).unwrap(),
    );
    ws.assign(Assignment {
        target: k,
        indices: Vec::new(),
        guard: None,
        value,
    })
    .unwrap();

    let program = ws.pending_program().unwrap();
    assert!(program.text.contains("k(t+1)"), "program:\n{}", program);
    assert!(program.text.contains("k(t++3)"), "program:\n{}", program);
}

#[test]
fn test_shifted_domain_control_on_the_left_hand_side() {
    let mut ws = deferred_ws();
    let t = year_set(&mut ws);
    let k = ws
        .declare(Declaration::parameter("k").domain(vec![AxisRef::Symbol(t)]))
        .unwrap();

    let control = lag(&mut ws, t, 1, OffsetMode::Linear).unwrap();
    ws.assign(Assignment {
        target: k,
        indices: vec![control],
        guard: None,
        value: sym(&ws, k).unwrap(),
    })
    .unwrap();

    let program = ws.pending_program().unwrap();
    assert!(program.text.contains("k(t-1) ="), "program:\n{}", program);
}
