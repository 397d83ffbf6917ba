//! Duplicate-group resolution across decoration calls and hierarchy levels.

use std::sync::{Arc, Mutex};

use veneer::{
    BoxFuture, ClassDef, ClassId, Decorator, DuplicateOptions, Error, Invocation, Request,
    Response, ViewInstance, ViewRegistry,
};

#[derive(Clone, Default)]
struct Recorder(Arc<Mutex<Vec<String>>>);

impl Recorder {
    fn push(&self, line: impl Into<String>) {
        self.0.lock().unwrap().push(line.into());
    }

    fn take(&self) -> Vec<String> {
        std::mem::take(&mut self.0.lock().unwrap())
    }
}

struct Tag {
    id: String,
    recorder: Recorder,
}

impl Decorator for Tag {
    fn name(&self) -> &str {
        &self.id
    }

    fn around(&self, call: Invocation, req: Request) -> BoxFuture {
        let id = self.id.clone();
        let recorder = self.recorder.clone();
        Box::pin(async move {
            recorder.push(format!("decorator {id}"));
            call.proceed(req).await
        })
    }
}

fn tag(recorder: &Recorder, id: &str) -> Arc<dyn Decorator> {
    Arc::new(Tag { id: id.to_owned(), recorder: recorder.clone() })
}

fn register(registry: &mut ViewRegistry, recorder: &Recorder, name: &'static str) -> ClassId {
    let recorder = recorder.clone();
    registry
        .register(ClassDef::new(name).method("dispatch", move |_this: ViewInstance, _req: Request| {
            let recorder = recorder.clone();
            async move {
                recorder.push(format!("dispatch {name}"));
                Response::text("response")
            }
        }))
        .unwrap()
}

async fn invoke(registry: &ViewRegistry, class: ClassId) {
    let entry = registry.entry_point(class, "dispatch").unwrap();
    entry.invoke(Arc::new(()), Request::get("/")).await;
}

#[tokio::test]
async fn higher_priority_survives_and_order_is_otherwise_unchanged() {
    // A(id="x", priority=1), B(id="x", priority=0), C(no id) -> [A, C].
    let recorder = Recorder::default();
    let mut registry = ViewRegistry::new();
    let class = register(&mut registry, &recorder, "View");

    registry.decorate(class, vec![tag(&recorder, "c")]).unwrap();
    registry
        .decorate_with(class, vec![tag(&recorder, "b")], DuplicateOptions::group("x").priority(0))
        .unwrap();
    registry
        .decorate_with(class, vec![tag(&recorder, "a")], DuplicateOptions::group("x").priority(1))
        .unwrap();

    assert_eq!(registry.resolved_chain(class).unwrap().names(), ["a", "c"]);

    invoke(&registry, class).await;
    assert_eq!(recorder.take(), ["decorator a", "decorator c", "dispatch View"]);
}

#[tokio::test]
async fn keep_newest_drops_the_base_level_member() {
    let recorder = Recorder::default();
    let mut registry = ViewRegistry::new();

    let base = register(&mut registry, &recorder, "Base");
    registry
        .decorate_with(
            base,
            vec![tag(&recorder, "base-auth")],
            DuplicateOptions::group("auth").keep_newest(true),
        )
        .unwrap();

    let derived = registry.register(ClassDef::new("Derived").extends(base)).unwrap();
    registry
        .decorate_with(
            derived,
            vec![tag(&recorder, "derived-auth")],
            DuplicateOptions::group("auth").keep_newest(true),
        )
        .unwrap();

    // The derived member is the more recently declared, outer one.
    assert_eq!(registry.resolved_chain(derived).unwrap().names(), ["derived-auth"]);
    // The base's own chain is a separate snapshot and keeps its member.
    assert_eq!(registry.resolved_chain(base).unwrap().names(), ["base-auth"]);

    invoke(&registry, derived).await;
    assert_eq!(recorder.take(), ["decorator derived-auth", "dispatch Base"]);
}

#[tokio::test]
async fn default_policy_keeps_the_base_level_member() {
    let recorder = Recorder::default();
    let mut registry = ViewRegistry::new();

    let base = register(&mut registry, &recorder, "Base");
    registry
        .decorate_with(base, vec![tag(&recorder, "base-auth")], DuplicateOptions::group("auth"))
        .unwrap();

    let derived = registry.register(ClassDef::new("Derived").extends(base)).unwrap();
    registry
        .decorate_with(derived, vec![tag(&recorder, "derived-auth")], DuplicateOptions::group("auth"))
        .unwrap();

    assert_eq!(registry.resolved_chain(derived).unwrap().names(), ["base-auth"]);
}

#[tokio::test]
async fn resolution_without_groups_is_a_no_op() {
    let recorder = Recorder::default();
    let mut registry = ViewRegistry::new();
    let class = register(&mut registry, &recorder, "View");

    registry
        .decorate(class, vec![tag(&recorder, "one"), tag(&recorder, "two")])
        .unwrap();
    registry.decorate(class, vec![tag(&recorder, "zero")]).unwrap();

    assert_eq!(registry.resolved_chain(class).unwrap().names(), ["zero", "one", "two"]);
}

#[tokio::test]
async fn custom_handler_chooses_the_survivors() {
    let recorder = Recorder::default();
    let mut registry = ViewRegistry::new();
    let class = register(&mut registry, &recorder, "View");

    registry
        .decorate_with(class, vec![tag(&recorder, "oldest")], DuplicateOptions::group("x"))
        .unwrap();
    registry
        .decorate_with(class, vec![tag(&recorder, "middle")], DuplicateOptions::group("x"))
        .unwrap();
    registry
        .decorate_with(
            class,
            vec![tag(&recorder, "newest")],
            // Members arrive oldest first; keep everything but the oldest.
            DuplicateOptions::group("x").handler(|_group, members| {
                members.into_iter().skip(1).collect()
            }),
        )
        .unwrap();

    assert_eq!(registry.resolved_chain(class).unwrap().names(), ["newest", "middle"]);

    invoke(&registry, class).await;
    assert_eq!(
        recorder.take(),
        ["decorator newest", "decorator middle", "dispatch View"]
    );
}

#[test]
fn conflicting_handlers_are_rejected_at_decoration_time() {
    let recorder = Recorder::default();
    let mut registry = ViewRegistry::new();
    let class = register(&mut registry, &recorder, "View");

    registry
        .decorate_with(
            class,
            vec![tag(&recorder, "first")],
            DuplicateOptions::group("x").handler(|_, members| members),
        )
        .unwrap();
    let err = registry
        .decorate_with(
            class,
            vec![tag(&recorder, "second")],
            DuplicateOptions::group("x").handler(|_, members| members),
        )
        .unwrap_err();

    assert!(matches!(err, Error::ConflictingDuplicateHandlers { group } if group == "x"));
}

#[test]
fn duplicate_options_without_a_group_fail_eagerly() {
    let recorder = Recorder::default();
    let mut registry = ViewRegistry::new();
    let class = register(&mut registry, &recorder, "View");

    let err = registry
        .decorate_with(class, vec![tag(&recorder, "a")], DuplicateOptions::none().priority(1))
        .unwrap_err();
    assert!(matches!(err, Error::MissingDuplicateGroup));

    // Nothing was applied or accumulated.
    assert!(registry.resolved_chain(class).is_none());
}
