use super::*;
use std::cell::RefCell;
use std::rc::Rc;

fn setup() -> Root<MemoryHost> {
    let host = Rc::new(RefCell::new(MemoryHost::new()));
    let container = host.borrow_mut().create_container("root");
    create_root(host, container).expect("create root")
}

fn markup(root: &Root<MemoryHost>) -> String {
    root.host().inner_markup(root.container())
}

fn first_child(root: &Root<MemoryHost>) -> NodeId {
    root.host().children(root.container())[0]
}

fn list(keys: &[&str]) -> Spec {
    make_spec(
        "ul",
        Props::new(),
        keys.iter()
            .map(|key| make_spec("li", Props::new().with_key(*key), [Spec::text(*key)])),
    )
}

fn style(pairs: &[(&str, &str)]) -> StyleMap {
    pairs
        .iter()
        .map(|(property, value)| (property.to_string(), Value::from(*value)))
        .collect()
}

#[test]
fn text_updates_keep_host_nodes() {
    let mut root = setup();
    let page = |label: &str| {
        make_spec(
            "div",
            props! { "id" => "page" },
            [make_spec("p", Props::new(), [Spec::text(label)])],
        )
    };
    root.render(page("hello")).expect("render");
    let div = first_child(&root);
    let paragraph = root.host().children(div)[0];
    let text = root.host().children(paragraph)[0];

    for label in ["world", "again"] {
        root.host_mut().reset_stats();
        root.render(page(label)).expect("render");
        assert_eq!(root.host().text_content(root.container()), label);
        assert_eq!(first_child(&root), div);
        assert_eq!(root.host().children(paragraph), [text]);
        let stats = root.host().stats();
        assert_eq!(stats.text_writes, 1);
        assert_eq!(stats.total(), 1);
    }
}

#[test]
fn keyed_reorder_moves_existing_nodes() {
    let mut root = setup();
    root.render(list(&["a", "b", "c"])).expect("render");
    let ul = first_child(&root);
    let before = root.host().children(ul).to_vec();

    root.host_mut().reset_stats();
    root.render(list(&["c", "a", "b"])).expect("reorder");
    assert_eq!(root.host().children(ul), [before[2], before[0], before[1]]);
    assert_eq!(root.host().text_content(ul), "cab");
    let stats = root.host().stats();
    assert_eq!(stats.created, 0);
    assert_eq!(stats.removed, 0);
}

#[test]
fn keyed_list_inserts_and_removes_around_survivors() {
    let mut root = setup();
    root.render(list(&["a", "b", "c", "d"])).expect("render");
    let ul = first_child(&root);
    let before = root.host().children(ul).to_vec();

    root.host_mut().reset_stats();
    root.render(list(&["d", "x", "b"])).expect("update");
    let after = root.host().children(ul).to_vec();
    assert_eq!(root.host().text_content(ul), "dxb");
    assert_eq!(after[0], before[3]);
    assert_eq!(after[2], before[1]);
    let stats = root.host().stats();
    assert_eq!(stats.created, 2);
    assert_eq!(stats.removed, 2);
}

#[test]
fn null_children_do_not_shift_siblings() {
    let mut root = setup();
    let row = |first: bool| {
        let head = make_spec("b", Props::new(), [Spec::text("head")]);
        let tail = make_spec("i", Props::new(), [Spec::text("tail")]);
        let children = if first {
            vec![head, Spec::Null, tail]
        } else {
            vec![Spec::Null, head, tail]
        };
        make_spec("div", Props::new(), children)
    };
    root.render(row(true)).expect("render");
    let div = first_child(&root);
    let before = root.host().children(div).to_vec();

    root.host_mut().reset_stats();
    root.render(row(false)).expect("render");
    assert_eq!(root.host().children(div), before.as_slice());
    assert_eq!(root.host().stats().total(), 0);
}

#[test]
fn changing_spec_kind_replaces_the_subtree() {
    let mut root = setup();
    root.render(make_spec("div", Props::new(), [Spec::text("x")]))
        .expect("render");
    root.render(Spec::text("plain")).expect("replace");
    assert_eq!(markup(&root), "plain");
    root.render(Spec::Null).expect("clear");
    assert_eq!(markup(&root), "");
    assert_eq!(root.host().len(), 1);
}

#[test]
fn nested_handles_leave_with_their_host_ancestor() {
    let mut root = setup();
    root.render(make_spec(
        "div",
        Props::new(),
        [
            make_spec("span", Props::new(), [Spec::text("a")]),
            make_spec("p", Props::new(), [Spec::text("b")]),
        ],
    ))
    .expect("render");
    root.host_mut().reset_stats();
    root.unmount().expect("unmount");
    assert_eq!(root.host().stats().removed, 1);
    assert_eq!(root.host().len(), 1);
    assert!(!root.is_mounted());
}

#[test]
fn attributes_listeners_and_style_follow_props() {
    let mut root = setup();
    let first = Callback::new(|_| {});
    let second = Callback::new(|_| {});
    root.render(make_spec(
        "div",
        props! {
            "id" => "a",
            "title" => "t",
            "onClick" => first.clone(),
            "style" => style(&[("color", "red"), ("width", "1px")]),
        },
        [],
    ))
    .expect("render");
    let div = first_child(&root);
    assert_eq!(
        markup(&root),
        "<div id=\"a\" title=\"t\" style=\"color: red; width: 1px\"></div>"
    );

    root.host_mut().reset_stats();
    root.render(make_spec(
        "div",
        props! {
            "id" => "b",
            "onClick" => second.clone(),
            "style" => style(&[("color", "blue")]),
        },
        [],
    ))
    .expect("update");
    let host = root.host();
    assert_eq!(host.attribute(div, "id"), Some(&Value::from("b")));
    assert_eq!(host.attribute(div, "title"), None);
    assert!(host.listener(div, "click").is_some_and(|cb| cb.ptr_eq(&second)));
    assert_eq!(host.style(div, "color"), Some("blue"));
    assert_eq!(host.style(div, "width"), None);
    let stats = host.stats();
    assert_eq!(stats.attributes_set, 1);
    assert_eq!(stats.attributes_removed, 1);
    assert_eq!(stats.listeners_removed, 1);
    assert_eq!(stats.listeners_added, 1);
    assert_eq!(stats.style_writes, 2);
}

#[test]
fn identical_renders_touch_nothing() {
    let mut root = setup();
    let on_click = Callback::new(|_| {});
    let badge = Component::new("Badge", |props: &Props| {
        make_spec(
            "em",
            Props::new(),
            [Spec::text(props.get_str("label").unwrap_or_default())],
        )
    });
    let tree = || {
        make_spec(
            "section",
            props! { "class" => "card", "onClick" => on_click.clone(), "style" => style(&[("margin", "0")]) },
            [
                make_spec(&badge, props! { "label" => "new" }, []),
                Spec::array([Spec::text("x"), Spec::text("y")]),
                list(&["a", "b"]),
            ],
        )
    };
    root.render(tree()).expect("render");
    root.host_mut().reset_stats();
    root.render(tree()).expect("render again");
    assert_eq!(root.host().stats(), HostStats::default());
}

#[test]
fn node_ref_tracks_the_host_node() {
    let mut root = setup();
    let node_ref: NodeRef = Ref::new(None);
    root.render(make_spec("input", props! { "ref" => node_ref.clone() }, []))
        .expect("render");
    assert_eq!(node_ref.current(), Some(first_child(&root)));
    assert!(root.host().attribute(first_child(&root), "ref").is_none());

    root.render(make_spec("input", Props::new(), []))
        .expect("drop ref");
    assert_eq!(node_ref.current(), None);

    root.render(make_spec("input", props! { "ref" => node_ref.clone() }, []))
        .expect("restore ref");
    assert!(node_ref.current().is_some());
    root.unmount().expect("unmount");
    assert_eq!(node_ref.current(), None);
}

#[test]
fn component_output_lands_between_host_siblings() {
    let mut root = setup();
    let captured: Rc<RefCell<Option<Setter<Vec<&'static str>>>>> = Rc::default();
    let items = {
        let captured = Rc::clone(&captured);
        Component::new("Items", move |_: &Props| {
            let (items, set) = use_state(|| vec!["b"]);
            *captured.borrow_mut() = Some(set);
            Spec::array(
                items
                    .iter()
                    .map(|item| make_spec("i", Props::new().with_key(*item), [Spec::text(*item)])),
            )
        })
    };
    root.render(make_spec(
        "div",
        Props::new(),
        [
            Spec::text("a"),
            make_spec(&items, Props::new(), []),
            Spec::text("z"),
        ],
    ))
    .expect("render");
    let text = |root: &Root<MemoryHost>| root.host().text_content(root.container());
    assert_eq!(text(&root), "abz");

    let set = captured.borrow().clone().expect("setter captured");
    for (next, expected) in [
        (vec!["b", "c", "d"], "abcdz"),
        (vec!["d", "b"], "adbz"),
        (vec![], "az"),
        (vec!["q"], "aqz"),
    ] {
        set.set(next).expect("set");
        assert_eq!(text(&root), expected);
    }
}

#[test]
fn fragments_inside_arrays_keep_their_position() {
    let mut root = setup();
    let tree = |middle: &[&str]| {
        make_spec(
            "ol",
            Props::new(),
            [
                Spec::text("<"),
                Spec::array([fragment(middle.iter().map(|label| Spec::text(*label)))]),
                Spec::text(">"),
            ],
        )
    };
    root.render(tree(&["1"])).expect("render");
    root.render(tree(&["1", "2", "3"])).expect("grow");
    assert_eq!(markup(&root), "<ol><123></ol>");
    root.render(tree(&[])).expect("shrink");
    assert_eq!(markup(&root), "<ol><></ol>");
    assert_eq!(root.output_count(), 1);
}
