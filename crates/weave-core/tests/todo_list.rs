use std::cell::{Cell, RefCell};
use std::rc::Rc;

use weave_core::{
    create_context, deps, make_spec, memo, props, use_callback, use_context, use_effect, use_state,
    Callback, Cleanup, Component, Context, Deps, Props, Setter, Spec,
};
use weave_testing::{run_test_root, TestRoot};

#[derive(Clone, Debug, PartialEq)]
struct Todo {
    id: i64,
    title: &'static str,
    done: bool,
}

fn todo(id: i64, title: &'static str) -> Todo {
    Todo {
        id,
        title,
        done: false,
    }
}

fn item_component(renders: Rc<Cell<usize>>) -> Component {
    memo(&Component::new("TodoItem", move |props: &Props| {
        renders.set(renders.get() + 1);
        let title = props.get_str("title").unwrap_or_default();
        let mark = if props.get("done").and_then(|done| done.as_bool()) == Some(true) {
            "x"
        } else {
            " "
        };
        make_spec("li", Props::new(), [Spec::text(format!("[{mark}] {title}"))])
    }))
}

struct App {
    component: Component,
    setter: Rc<RefCell<Option<Setter<Vec<Todo>>>>>,
    item_renders: Rc<Cell<usize>>,
}

fn app(initial: Vec<Todo>) -> App {
    let setter: Rc<RefCell<Option<Setter<Vec<Todo>>>>> = Rc::default();
    let item_renders = Rc::new(Cell::new(0));
    let item = item_component(Rc::clone(&item_renders));
    let component = {
        let setter = Rc::clone(&setter);
        Component::new("TodoApp", move |_: &Props| {
            let initial = initial.clone();
            let (todos, set) = use_state(move || initial);
            *setter.borrow_mut() = Some(set);
            let items = todos.iter().map(|todo| {
                make_spec(
                    &item,
                    props! { "key" => todo.id, "title" => todo.title, "done" => todo.done },
                    [],
                )
            });
            make_spec("ul", Props::new(), items)
        })
    };
    App {
        component,
        setter,
        item_renders,
    }
}

impl App {
    fn setter(&self) -> Setter<Vec<Todo>> {
        self.setter.borrow().clone().expect("app rendered")
    }
}

#[test]
fn keyed_todos_survive_reordering() {
    run_test_root(|rule| {
        let app = app(vec![todo(1, "a"), todo(2, "b"), todo(3, "c")]);
        rule.set_content(make_spec(&app.component, Props::new(), []))
            .expect("initial render");
        let items = rule.find_all("li");
        assert_eq!(items.len(), 3);
        assert_eq!(app.item_renders.get(), 3);

        rule.reset_stats();
        app.setter()
            .update(|todos| {
                let mut next = todos.clone();
                next.rotate_right(1);
                next
            })
            .expect("reorder");

        assert_eq!(rule.find_all("li"), [items[2], items[0], items[1]]);
        assert_eq!(rule.text(), "[ ] c[ ] a[ ] b");
        let stats = rule.stats();
        assert_eq!(stats.created, 0);
        assert_eq!(stats.removed, 0);
        assert_eq!(app.item_renders.get(), 3);
    });
}

#[test]
fn toggling_one_todo_rerenders_only_that_item() {
    run_test_root(|rule| {
        let app = app(vec![todo(1, "a"), todo(2, "b")]);
        rule.set_content(make_spec(&app.component, Props::new(), []))
            .expect("initial render");

        app.setter()
            .update(|todos| {
                todos
                    .iter()
                    .map(|todo| Todo {
                        done: todo.id == 2,
                        ..todo.clone()
                    })
                    .collect()
            })
            .expect("toggle");
        assert_eq!(rule.text(), "[ ] a[x] b");
        assert_eq!(app.item_renders.get(), 3);
    });
}

#[test]
fn removing_todos_unmounts_their_nodes() {
    let mut rule = TestRoot::new();
    let app = app(vec![todo(1, "a"), todo(2, "b"), todo(3, "c")]);
    rule.set_content(make_spec(&app.component, Props::new(), []))
        .expect("initial render");
    let survivor = rule.find_all("li")[1];

    app.setter()
        .update(|todos| todos.iter().filter(|todo| todo.id == 2).cloned().collect())
        .expect("filter");
    assert_eq!(rule.find_all("li"), [survivor]);
    assert_eq!(rule.markup(), "<ul><li>[ ] b</li></ul>");

    rule.unmount().expect("unmount");
    assert_eq!(rule.markup(), "");
}

#[test]
fn subscription_effect_tracks_context_and_tears_down() {
    let channel: Context<&'static str> = create_context("general");
    let subscriptions: Rc<RefCell<Vec<String>>> = Rc::default();
    let feed = {
        let channel = channel.clone();
        let subscriptions = Rc::clone(&subscriptions);
        Component::new("Feed", move |_: &Props| {
            let name = use_context(&channel);
            let log = Rc::clone(&subscriptions);
            use_effect(
                move || {
                    log.borrow_mut().push(format!("subscribe {name}"));
                    Cleanup::new(move || log.borrow_mut().push(format!("unsubscribe {name}")))
                },
                deps![name],
            );
            Spec::text(name)
        })
    };

    let mut rule = TestRoot::new();
    rule.set_content(make_spec(&feed, Props::new(), []))
        .expect("default channel");
    rule.set_content(channel.provide("random", [make_spec(&feed, Props::new(), [])]))
        .expect("provided channel");
    assert_eq!(rule.text(), "random");
    rule.set_content(channel.provide("dev", [make_spec(&feed, Props::new(), [])]))
        .expect("changed channel");
    rule.unmount().expect("unmount");

    assert_eq!(
        *subscriptions.borrow(),
        [
            "subscribe general",
            "unsubscribe general",
            "subscribe random",
            "unsubscribe random",
            "subscribe dev",
            "unsubscribe dev",
        ]
    );
}

#[test]
fn stable_callbacks_keep_listeners_in_place() {
    let mut rule = TestRoot::new();
    let clicks = Rc::new(Cell::new(0));
    let button = {
        let clicks = Rc::clone(&clicks);
        Component::new("Button", move |props: &Props| {
            let clicks = Rc::clone(&clicks);
            let on_click = use_callback(
                Callback::new(move |_| clicks.set(clicks.get() + 1)),
                Deps::none(),
            );
            make_spec(
                "button",
                props! { "onClick" => on_click },
                [Spec::text(props.get_str("label").unwrap_or_default())],
            )
        })
    };
    rule.set_content(make_spec(&button, props! { "label" => "go" }, []))
        .expect("render");
    rule.reset_stats();
    rule.set_content(make_spec(&button, props! { "label" => "run" }, []))
        .expect("relabel");
    let stats = rule.stats();
    assert_eq!(stats.listeners_added, 0);
    assert_eq!(stats.listeners_removed, 0);
    assert_eq!(stats.text_writes, 1);

    let node = rule.find("button").expect("button");
    assert!(rule.fire(node, "click"));
    assert!(rule.fire(node, "click"));
    assert_eq!(clicks.get(), 2);
}
