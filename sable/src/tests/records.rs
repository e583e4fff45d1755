use super::{deferred_ws, populated_set};
use crate::records::Table;
use crate::symbols::AxisRef;
use crate::{Declaration, SableError, SingletonPolicy, WorkspaceOptions};
use crate::{PlaybackEngine, Workspace};

#[test]
fn test_table_lookup_and_labels() {
    let table = Table::from_rows(
        vec!["i".to_string(), "j".to_string()],
        vec![
            (vec!["a".to_string(), "x".to_string()], 1.5),
            (vec!["a".to_string(), "y".to_string()], 2.5),
            (vec!["b".to_string(), "x".to_string()], 3.5),
        ],
    );
    assert_eq!(table.dimension(), 2);
    assert_eq!(table.value(&["a", "y"]), Some(2.5));
    assert_eq!(table.value(&["b", "y"]), None);
    assert_eq!(table.distinct_labels(0), vec!["a", "b"]);
    assert_eq!(table.distinct_labels(1), vec!["x", "y"]);
}

#[test]
fn test_membership_table_from_elements() {
    let table = Table::from_elements("i", ["a", "b"]);
    assert_eq!(table.columns, vec!["i"]);
    assert_eq!(table.value(&["a"]), Some(1.0));
}

#[test]
fn test_table_json_exchange_form() {
    let mut table = Table::from_rows(
        vec!["i".to_string()],
        vec![(vec!["a".to_string()], 2.0)],
    );
    table.rows[0].marginal = Some(0.5);
    let json = table.to_json();
    assert_eq!(json["columns"][0], "i");
    assert_eq!(json["rows"][0]["value"], 2.0);
    assert_eq!(json["rows"][0]["marginal"], 0.5);
    // Absent marginals are omitted, not serialized as null.
    let plain = Table::from_elements("i", ["a"]).to_json();
    assert!(plain["rows"][0].get("marginal").is_none());
}

#[test]
fn test_table_rendering_for_diagnostics() {
    let table = Table::from_rows(
        vec!["i".to_string(), "j".to_string()],
        vec![(vec!["a".to_string(), "x".to_string()], 1.5)],
    );
    let text = crate::codegen::render_table("d", &table);
    assert_eq!(text, "d(i,j):\n  [a,x] = 1.5\n");
}

#[test]
fn test_record_arity_checked() {
    let mut ws = deferred_ws();
    let i = populated_set(&mut ws, "i", &["a"]);
    let d = ws
        .declare(Declaration::parameter("d").domain(vec![AxisRef::Symbol(i)]))
        .unwrap();
    let result = ws.set_records(d, vec![(vec!["a".to_string(), "b".to_string()], 1.0)]);
    match result {
        Err(SableError::DomainViolation(details)) => {
            assert!(details.message.contains("2 labels"));
            assert!(details.message.contains("1 axes"));
        }
        Err(e) => panic!("Expected DomainViolation, got: {:?}", e),
        Ok(_) => panic!("Expected arity error"),
    }
}

#[test]
fn test_labels_checked_against_parent_set() {
    let mut ws = deferred_ws();
    let i = populated_set(&mut ws, "i", &["seattle", "san_diego"]);
    let d = ws
        .declare(Declaration::parameter("d").domain(vec![AxisRef::Symbol(i)]))
        .unwrap();
    let result = ws.set_records(d, vec![(vec!["topeka".to_string()], 1.0)]);
    match result {
        Err(SableError::DomainViolation(details)) => {
            assert!(details.message.contains("topeka"));
            assert!(details.message.contains("'i'"));
        }
        Err(e) => panic!("Expected DomainViolation, got: {:?}", e),
        Ok(_) => panic!("Expected membership error"),
    }
    // Nothing was staged for the rejected write.
    assert!(!ws.records(d).unwrap().is_dirty());
}

#[test]
fn test_universe_axis_accepts_any_label() {
    let mut ws = deferred_ws();
    let p = ws
        .declare(Declaration::parameter("p").domain(vec![AxisRef::Universe]))
        .unwrap();
    ws.set_records(p, vec![(vec!["whatever".to_string()], 1.0)])
        .unwrap();
}

#[test]
fn test_scalar_takes_a_single_record() {
    let mut ws = deferred_ws();
    let total = ws.declare(Declaration::parameter("total")).unwrap();
    ws.set_records(total, vec![(Vec::new(), 42.0)]).unwrap();
    let result = ws.set_records(total, vec![(Vec::new(), 1.0), (Vec::new(), 2.0)]);
    assert!(result.is_err());
}

#[test]
fn test_alias_rejects_direct_records() {
    let mut ws = deferred_ws();
    let i = populated_set(&mut ws, "i", &["a"]);
    let ii = ws.declare(Declaration::alias("ii", i)).unwrap();
    assert!(ws
        .set_records(ii, vec![(vec!["a".to_string()], 1.0)])
        .is_err());
}

#[test]
fn test_alias_reads_its_roots_records() {
    let mut ws = deferred_ws();
    let i = populated_set(&mut ws, "i", &["a", "b"]);
    let ii = ws.declare(Declaration::alias("ii", i)).unwrap();
    let records = ws.records_synced(ii).unwrap().unwrap();
    assert_eq!(records.len(), 2);
}

#[test]
fn test_static_set_membership_is_fixed() {
    let mut ws = deferred_ws();
    let i = populated_set(&mut ws, "i", &["a", "b"]);
    let result = ws.set_records(i, vec![(vec!["c".to_string()], 1.0)]);
    match result {
        Err(SableError::Validation(details)) => {
            assert!(details.message.contains("fixed"));
        }
        Err(e) => panic!("Expected Validation, got: {:?}", e),
        Ok(_) => panic!("Expected fixed-membership error"),
    }
}

#[test]
fn test_singleton_policy_error() {
    let mut ws = deferred_ws();
    let s = ws.declare(Declaration::singleton_set("s")).unwrap();
    let result = ws.set_records(
        s,
        vec![
            (vec!["first".to_string()], 1.0),
            (vec!["second".to_string()], 1.0),
        ],
    );
    match result {
        Err(SableError::Validation(details)) => {
            assert!(details.message.contains("singleton"));
            assert!(details.message.contains("2 elements"));
        }
        Err(e) => panic!("Expected Validation, got: {:?}", e),
        Ok(_) => panic!("Expected singleton error"),
    }
}

#[test]
fn test_singleton_policy_take_first() {
    let options = WorkspaceOptions {
        singleton_policy: SingletonPolicy::TakeFirst,
        ..WorkspaceOptions::deferred()
    };
    let mut ws = Workspace::with_options("t", Box::new(PlaybackEngine::new()), options);
    let s = ws.declare(Declaration::singleton_set("s")).unwrap();
    ws.set_records(
        s,
        vec![
            (vec!["first".to_string()], 1.0),
            (vec!["second".to_string()], 1.0),
        ],
    )
    .unwrap();
    let data = ws.symbol(s).set_data().unwrap();
    assert_eq!(data.elements, vec!["first"]);
}

#[test]
fn test_subset_write_freezes_superset() {
    let mut ws = deferred_ws();
    let i = populated_set(&mut ws, "i", &["a", "b", "c"]);
    let j = ws
        .declare(Declaration::set("j").domain(vec![AxisRef::Symbol(i)]))
        .unwrap();
    ws.set_records(j, vec![(vec!["b".to_string()], 1.0)]).unwrap();
    assert!(ws.symbol(i).set_data().unwrap().frozen);
}

#[test]
fn test_subset_element_outside_superset_rejected() {
    let mut ws = deferred_ws();
    let i = populated_set(&mut ws, "i", &["a", "b"]);
    let j = ws
        .declare(Declaration::set("j").domain(vec![AxisRef::Symbol(i)]))
        .unwrap();
    assert!(ws.set_records(j, vec![(vec!["z".to_string()], 1.0)]).is_err());
}

#[test]
fn test_domain_forwarding_populates_parent_sets() {
    let mut ws = deferred_ws();
    let i = ws.declare(Declaration::set("i")).unwrap();
    let j = ws.declare(Declaration::set("j")).unwrap();
    let d = ws
        .declare(
            Declaration::parameter("d")
                .domain(vec![AxisRef::Symbol(i), AxisRef::Symbol(j)])
                .forwarding(),
        )
        .unwrap();

    ws.set_records(
        d,
        vec![
            (vec!["seattle".to_string(), "new_york".to_string()], 2.5),
            (vec!["seattle".to_string(), "chicago".to_string()], 1.7),
            (vec!["san_diego".to_string(), "new_york".to_string()], 2.5),
        ],
    )
    .unwrap();

    let i_data = ws.symbol(i).set_data().unwrap();
    assert_eq!(i_data.elements, vec!["seattle", "san_diego"]);
    let j_data = ws.symbol(j).set_data().unwrap();
    assert_eq!(j_data.elements, vec!["new_york", "chicago"]);
}

#[test]
fn test_forwarding_inserts_without_duplicates() {
    let mut ws = deferred_ws();
    let i = populated_set(&mut ws, "i", &["seattle"]);
    let d = ws
        .declare(
            Declaration::parameter("d")
                .domain(vec![AxisRef::Symbol(i)])
                .forwarding(),
        )
        .unwrap();
    ws.set_records(
        d,
        vec![
            (vec!["seattle".to_string()], 1.0),
            (vec!["topeka".to_string()], 2.0),
        ],
    )
    .unwrap();
    assert_eq!(
        ws.symbol(i).set_data().unwrap().elements,
        vec!["seattle", "topeka"]
    );
}
