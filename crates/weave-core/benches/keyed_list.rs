use std::cell::RefCell;
use std::rc::Rc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use weave_core::{create_root, make_spec, props, Component, MemoryHost, Props, Root, Spec};

const ROW_COUNT_SAMPLES: &[usize] = &[16, 64, 256];

fn row(props: &Props) -> Spec {
    let label = props.get_str("label").unwrap_or_default();
    make_spec(
        "li",
        props! { "class" => "row" },
        [make_spec("span", Props::new(), [Spec::text(label)])],
    )
}

struct ListFixture {
    root: Root<MemoryHost>,
    row: Component,
    order: Vec<usize>,
}

impl ListFixture {
    fn new(rows: usize) -> Self {
        let host = Rc::new(RefCell::new(MemoryHost::new()));
        let container = host.borrow_mut().create_container("root");
        Self {
            root: create_root(host, container).expect("root"),
            row: Component::new("Row", row),
            order: (0..rows).collect(),
        }
    }

    fn spec(&self) -> Spec {
        let rows = self.order.iter().map(|&id| {
            make_spec(
                &self.row,
                props! { "key" => id, "label" => format!("Row {id}") },
                [],
            )
        });
        make_spec("ul", Props::new(), rows)
    }

    fn render(&mut self) {
        let spec = self.spec();
        self.root.render(spec).expect("render");
    }
}

fn bench_rerender(c: &mut Criterion) {
    let mut fixture = ListFixture::new(64);
    fixture.render();

    c.bench_function("keyed_list_rerender", |b| {
        b.iter(|| {
            fixture.render();
        });
    });
}

fn bench_reorder(c: &mut Criterion) {
    let mut group = c.benchmark_group("keyed_list_reorder");
    for &rows in ROW_COUNT_SAMPLES {
        group.bench_with_input(BenchmarkId::new("rows", rows), &rows, |b, &rows| {
            let mut fixture = ListFixture::new(rows);
            fixture.render();

            b.iter(|| {
                fixture.order.rotate_left(1);
                fixture.render();
                black_box(fixture.root.output_count());
            });
        });
    }
    group.finish();
}

fn bench_mount(c: &mut Criterion) {
    c.bench_function("keyed_list_mount", |b| {
        b.iter(|| {
            let mut fixture = ListFixture::new(64);
            fixture.render();
            black_box(fixture.root.host().len());
        });
    });
}

criterion_group!(keyed_list, bench_rerender, bench_reorder, bench_mount);
criterion_main!(keyed_list);
