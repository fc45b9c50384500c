//! Todo list example: a bound list whose rows keep their bindings across
//! refreshes.

use signal_bindings::prelude::*;
use signal_bindings::WrapperKey;
use std::cell::RefCell;
use std::rc::Rc;
use tracing_subscriber::EnvFilter;

#[derive(Clone)]
struct Todo {
    id: u32,
    title: String,
    done: Observable<bool>,
}

// Rows are matched by id, so editing a todo in place keeps its row.
impl PartialEq for Todo {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Todo {}

impl std::hash::Hash for Todo {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// A console row: the text it currently shows.
type RowView = Rc<RefCell<String>>;

#[derive(Default)]
struct ConsoleList {
    rows: Vec<WrapperKey>,
}

impl ListHost for ConsoleList {
    fn key_at(&self, index: usize) -> Option<WrapperKey> {
        self.rows.get(index).copied()
    }

    fn insert(&mut self, index: usize, key: WrapperKey) {
        println!("  insert row at {index}");
        self.rows.insert(index, key);
    }

    fn remove(&mut self, key: WrapperKey) {
        if let Some(index) = self.rows.iter().position(|row| *row == key) {
            println!("  remove row at {index}");
            self.rows.remove(index);
        }
    }
}

fn render(list: &Rc<RefCell<ItemList<Todo, RowView>>>) {
    let mut list = list.borrow_mut();
    for index in 0..list.len() {
        if let Some(view) = list.realize(index, RowView::default) {
            println!("    {}", view.borrow());
        }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();
    Scheduler::initialize(|update| update.run()).expect("initialized once");

    let todos = Observable::new(Vec::<Todo>::new());
    let hide_done = Observable::new(false);
    let next_id = RefCell::new(0);
    let add = |title: &str| {
        let id = {
            let mut next = next_id.borrow_mut();
            *next += 1;
            *next
        };
        let todo = Todo {
            id,
            title: title.to_string(),
            done: Observable::new(false),
        };
        todos.update(|todos| todos.push(todo));
    };

    let host = Rc::new(RefCell::new(ConsoleList::default()));
    let mut bindings = BindingManager::new();
    let list = bindings.bind_items(
        &host,
        {
            let (todos, hide_done) = (todos.clone(), hide_done.clone());
            move || {
                let hide = hide_done.get();
                todos
                    .get()
                    .into_iter()
                    .filter(|todo| !(hide && todo.done.get()))
                    .collect()
            }
        },
        |view: &RowView, todo: &Todo, row: &mut BindingManager| {
            let view = Rc::clone(view);
            let todo = todo.clone();
            row.bind(
                move || {
                    let mark = if todo.done.get() { "x" } else { " " };
                    format!("[{mark}] {}", todo.title)
                },
                move |text| *view.borrow_mut() = text,
            );
        },
    );

    println!("adding three todos:");
    add("Write docs");
    add("Ship release");
    add("Celebrate");
    render(&list);

    println!("completing the first todo (row updates in place):");
    let first = todos.get_untracked()[0].clone();
    first.done.set(true);
    render(&list);

    println!("hiding completed todos:");
    hide_done.set(true);
    render(&list);

    println!("moving the last todo to the front:");
    todos.update(|todos| todos.rotate_right(1));
    render(&list);

    bindings.unbind();
}
