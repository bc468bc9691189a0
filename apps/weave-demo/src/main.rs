use std::cell::RefCell;
use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use weave_core::{
    create_context, deps, make_spec, memo, props, use_callback, use_context, use_effect,
    use_layout_effect, use_state, Callback, Cleanup, Component, Context, Error, Event, MemoryHost,
    NodeId, Props, Root, Setter, Spec,
};
use weave_runtime_std::StdRuntime;

type Shared<T> = Rc<RefCell<Option<T>>>;

struct Demo {
    theme: Context<&'static str>,
    counter: Component,
    todos: Component,
    set_todos: Shared<Setter<Vec<(i64, &'static str)>>>,
}

fn build_demo() -> Demo {
    let theme = create_context("light");

    let counter = {
        let theme = theme.clone();
        Component::new("Counter", move |props: &Props| {
            let step = props.get_int("step").unwrap_or(1);
            let (count, set_count) = use_state(|| 0i64);
            let theme = use_context(&theme);

            use_layout_effect(
                move || log::debug!("counter laid out with {count}"),
                deps![count],
            );

            let on_click = use_callback(
                Callback::new(move |_| {
                    if let Err(err) = set_count.update(|count| count + step) {
                        log::error!("failed to increment: {err}");
                    }
                }),
                deps![step],
            );
            make_spec(
                "button",
                props! { "class" => theme, "onClick" => on_click },
                [Spec::text(format!("Count: {count}"))],
            )
        })
    };

    let row = memo(&Component::new("TodoRow", |props: &Props| {
        let title = props.get_str("title").unwrap_or_default();
        make_spec("li", Props::new(), [Spec::text(title)])
    }));

    let set_todos: Shared<Setter<Vec<(i64, &'static str)>>> = Rc::default();
    let todos = {
        let set_todos = Rc::clone(&set_todos);
        Component::new("Todos", move |_: &Props| {
            let (todos, set) = use_state(|| vec![(1, "write reconciler"), (2, "ship demo")]);
            *set_todos.borrow_mut() = Some(set);

            let total = todos.len();
            use_effect(
                move || {
                    log::info!("todo list now holds {total} items");
                    Cleanup::new(move || log::debug!("dropping snapshot of {total} items"))
                },
                deps![total],
            );

            let rows = todos.iter().map(|(id, title)| {
                make_spec(&row, props! { "key" => *id, "title" => *title }, [])
            });
            make_spec("ul", Props::new(), rows)
        })
    };

    Demo {
        theme,
        counter,
        todos,
        set_todos,
    }
}

fn app(demo: &Demo, theme: &'static str) -> Spec {
    demo.theme.provide(
        theme,
        [make_spec(
            "main",
            Props::new(),
            [
                make_spec(&demo.counter, props! { "step" => 2 }, []),
                make_spec(&demo.todos, Props::new(), []),
            ],
        )],
    )
}

fn click(root: &Root<MemoryHost>, node: NodeId) {
    let handler = root.host().listener(node, "click");
    match handler {
        Some(handler) => handler.call(&Event::new("click", node)),
        None => log::error!("node {node} has no click listener"),
    }
}

fn find(root: &Root<MemoryHost>, tag: &str) -> Option<NodeId> {
    let host = root.host();
    let mut stack = vec![root.container()];
    while let Some(id) = stack.pop() {
        if host.tag(id) == Some(tag) {
            return Some(id);
        }
        stack.extend(host.children(id).iter().rev().copied());
    }
    None
}

fn run() -> Result<(), Error> {
    let runtime = StdRuntime::new();
    let wakes = Arc::new(AtomicUsize::new(0));
    {
        let wakes = Arc::clone(&wakes);
        runtime.set_waker(move || {
            wakes.fetch_add(1, Ordering::Relaxed);
        });
    }

    let host = Rc::new(RefCell::new(MemoryHost::new()));
    let container = host.borrow_mut().create_container("body");
    let mut root = Root::with_runtime(host, container, runtime.runtime_handle())?;
    let demo = build_demo();

    root.render(app(&demo, "light"))?;
    log::info!("initial render ran {} effects", runtime.pump());
    println!("{}", root.host().dump_tree(container));

    if let Some(button) = find(&root, "button") {
        click(&root, button);
        click(&root, button);
    }
    runtime.pump();

    let set_todos = demo.set_todos.borrow().clone();
    if let Some(set_todos) = set_todos {
        set_todos.update(|todos| {
            let mut next = todos.clone();
            next.insert(0, (3, "write docs"));
            next.swap(1, 2);
            next
        })?;
    }
    root.render(app(&demo, "dark"))?;
    runtime.pump();

    println!("{}", root.host().to_markup(container));
    println!(
        "host stats: {:?}, scheduler woke {} times",
        root.host().stats(),
        wakes.load(Ordering::Relaxed)
    );

    root.unmount()?;
    runtime.pump();
    Ok(())
}

fn main() {
    env_logger::init();

    println!("=== Weave demo ===");
    println!("Renders a counter and a keyed todo list into an in-memory host.");

    if let Err(err) = run() {
        log::error!("demo failed: {err}");
        std::process::exit(1);
    }
}
