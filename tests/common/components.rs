//! Sample components covering the shapes suites usually test:
//! class-style and hook-style state, data loading on mount, nested
//! markup with class names, and handlers bound on ancestors.

use serde_json::json;

use settle::{Component, Context, Descriptor, FnComponent, Node, Props, State, Value};

pub const SUBSCRIBE: &str = "SUBSCRIBE TO BASIC";
pub const CHECKOUT: &str = "PROCEED TO CHECKOUT";
pub const USERS_URL: &str = "https://jsonplaceholder.typicode.com/users";

fn label_button(state: &State, cx: &Context) -> Node {
    Node::element("button")
        .prop("className", "btn btn-primary")
        .prop(
            "onClick",
            cx.callback(|cx, _| cx.set_state(State::new().with("label", CHECKOUT))),
        )
        .with_text(state.get_str("label").unwrap_or_default())
}

/// Class-style button whose label changes once clicked
pub struct SubscribeButton;

impl Component for SubscribeButton {
    fn name(&self) -> &str {
        "SubscribeButton"
    }

    fn initial_state(&self, _props: &Props) -> State {
        State::new().with("label", SUBSCRIBE)
    }

    fn render(&self, _props: &Props, state: &State, cx: &Context) -> Node {
        label_button(state, cx)
    }
}

pub fn class_button() -> Descriptor {
    Descriptor::new(SubscribeButton)
}

/// Hook-style equivalent of [`SubscribeButton`]
pub fn hook_button() -> Descriptor {
    Descriptor::new(
        FnComponent::new("HookButton", |_props, state, cx| label_button(state, cx))
            .with_state(State::new().with("label", SUBSCRIBE)),
    )
}

/// Loads users through `fetch` when mounted
pub struct UserList;

impl Component for UserList {
    fn name(&self) -> &str {
        "UserList"
    }

    fn initial_state(&self, _props: &Props) -> State {
        State::new().with("users", Value::List(Vec::new()))
    }

    fn mounted(&self, props: &Props, cx: &Context) {
        let url = props.get_str("url").unwrap_or(USERS_URL).to_string();
        cx.call("fetch", vec![json!(url)], |cx, result| match result {
            Ok(body) => cx.set_state(State::new().with("users", body)),
            Err(e) => cx.set_state(State::new().with("error", e.to_string())),
        });
    }

    fn render(&self, _props: &Props, state: &State, _cx: &Context) -> Node {
        if let Some(error) = state.get_str("error") {
            return Node::element("div")
                .prop("className", "error")
                .with_text(error);
        }
        let users = state
            .get("users")
            .and_then(Value::as_list)
            .unwrap_or_default();
        let items = users
            .iter()
            .filter_map(|user| user.as_map()?.get("name")?.as_str())
            .map(|name| Node::element("li").prop("key", name).with_text(name));
        Node::element("ul")
            .prop("className", "users")
            .with_children(items)
    }
}

pub fn users() -> Descriptor {
    Descriptor::new(UserList)
}

/// Static group of two buttons
pub fn btn_group() -> Descriptor {
    Descriptor::from_fn("BtnGroup", |_props, _state, _cx| {
        Node::element("div")
            .prop("className", "btn-group")
            .child(Node::element("button").prop("className", "btn").with_text("Left"))
            .child(Node::element("button").prop("className", "btn").with_text("Right"))
    })
}

/// Counter incremented through a functional update
pub fn counter() -> Descriptor {
    Descriptor::new(
        FnComponent::new("Counter", |_props, state, cx| {
            let count = state.get_int("count").unwrap_or(0);
            Node::element("div")
                .child(Node::element("span").with_text(count.to_string()))
                .child(
                    Node::element("button")
                        .prop(
                            "onClick",
                            cx.callback(|cx, _| {
                                cx.update(|prev| {
                                    State::new()
                                        .with("count", prev.get_int("count").unwrap_or(0) + 1)
                                })
                            }),
                        )
                        .with_text("+"),
                )
        })
        .with_state(State::new().with("count", 0)),
    )
}

/// Toolbar counting clicks that bubble up from its buttons
pub fn toolbar() -> Descriptor {
    Descriptor::from_fn("Toolbar", |_props, state, cx| {
        let clicks = state.get_int("clicks").unwrap_or(0);
        Node::element("div")
            .prop("className", "toolbar")
            .prop(
                "onClick",
                cx.callback(|cx, _| {
                    cx.update(|prev| {
                        State::new().with("clicks", prev.get_int("clicks").unwrap_or(0) + 1)
                    })
                }),
            )
            .child(Node::element("span").child(Node::element("button").with_text("Save")))
            .child(Node::element("p").with_text(clicks.to_string()))
    })
}

/// Text field echoing its value
pub fn search_box() -> Descriptor {
    Descriptor::from_fn("SearchBox", |_props, state, cx| {
        let query = state.get_str("query").unwrap_or_default().to_string();
        Node::element("form")
            .child(
                Node::element("input")
                    .prop("value", query.clone())
                    .prop(
                        "onInput",
                        cx.callback(|cx, event| {
                            let value = event.value().unwrap_or_default().to_string();
                            cx.set_state(State::new().with("query", value));
                        }),
                    ),
            )
            .child(Node::element("p").with_text(query))
    })
}
