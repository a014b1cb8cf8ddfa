//! Snapshot tests for rendered sample components
//!
//! Uses insta inline snapshots of the canonical serialization.

use insta::assert_snapshot;
use serde_json::json;

use settle::{Event, Reply};

use crate::common::{class_button, counter, harness, tree, users};

#[test]
fn test_button_before_click() {
    let h = harness();
    h.mount(class_button()).unwrap();

    assert_snapshot!(tree(&h).to_canonical(), @r#"
    <button
      className="btn btn-primary"
      onClick={[Function]}
    >
      "SUBSCRIBE TO BASIC"
    </button>
    "#);
}

#[test]
fn test_users_after_fetch() {
    let h = harness();
    let _fetch = h
        .intercept("fetch", |_| {
            Reply::ok(json!([
                { "id": 1, "name": "Leanne Graham" },
                { "id": 2, "name": "Ervin Howell" },
            ]))
        })
        .unwrap();
    h.act(|| h.mount(users())).unwrap().unwrap();

    assert_snapshot!(tree(&h).to_canonical(), @r#"
    <ul
      className="users"
    >
      <li
        key="Leanne Graham"
      >
        "Leanne Graham"
      </li>
      <li
        key="Ervin Howell"
      >
        "Ervin Howell"
      </li>
    </ul>
    "#);
}

#[test]
fn test_users_while_loading() {
    let h = harness();
    let (reply, _resolver) = Reply::deferred();
    let reply = std::cell::RefCell::new(Some(reply));
    let _fetch = h
        .intercept("fetch", move |_| {
            reply.borrow_mut().take().unwrap_or_else(|| Reply::ok(json!([])))
        })
        .unwrap();
    h.act(|| h.mount(users())).unwrap().unwrap();

    assert_snapshot!(tree(&h).to_canonical(), @r#"
    <ul
      className="users"
    />
    "#);
}

#[test]
fn test_counter_after_two_clicks() {
    let h = harness();
    h.mount(counter()).unwrap();
    for _ in 0..2 {
        let plus = tree(&h).find_by_type("button").unwrap();
        h.fire(&plus, Event::click()).unwrap();
    }

    assert_snapshot!(tree(&h).to_canonical(), @r#"
    <div>
      <span>
        "2"
      </span>
      <button
        onClick={[Function]}
      >
        "+"
      </button>
    </div>
    "#);
}
