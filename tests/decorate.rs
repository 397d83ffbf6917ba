//! Decorating free view functions and unbound methods.

use std::sync::{Arc, Mutex};

use veneer::{
    decorate_with_args, Arg, Arity, BoxFuture, Callable, CallArgs, Decorator, DecoratorFactory,
    Error, Invocation, ParamValue, Request, Response, ViewInstance, ViewRegistry,
};

// ── Test decorators ───────────────────────────────────────────────────────────

/// Shared call log, the observable every ordering assertion reads.
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

fn view(recorder: &Recorder) -> Callable {
    let recorder = recorder.clone();
    Callable::function("view", move |_req: Request| {
        let recorder = recorder.clone();
        async move {
            recorder.push("view body");
            Response::text("response")
        }
    })
}

// ── Chain ordering ────────────────────────────────────────────────────────────

#[tokio::test]
async fn decorators_run_in_declaration_order_then_the_body() {
    let recorder = Recorder::default();
    let mut registry = ViewRegistry::new();

    let wrapped = registry
        .decorate(
            view(&recorder),
            vec![tag(&recorder, "d1"), tag(&recorder, "d2"), tag(&recorder, "d3")],
        )
        .unwrap()
        .into_callable()
        .unwrap();

    let resp = wrapped.call(Request::get("/")).await;
    assert_eq!(resp.body(), b"response");
    assert_eq!(
        recorder.take(),
        ["decorator d1", "decorator d2", "decorator d3", "view body"]
    );
}

#[tokio::test]
async fn stacked_decoration_calls_nest_outside_in() {
    let recorder = Recorder::default();
    let mut registry = ViewRegistry::new();

    // Mirrors stacking decorator lines above a function: the later call
    // wraps the earlier call's result.
    let inner = registry
        .decorate(view(&recorder), vec![tag(&recorder, "inner")])
        .unwrap()
        .into_callable()
        .unwrap();
    let outer = registry
        .decorate(inner, vec![tag(&recorder, "outer")])
        .unwrap()
        .into_callable()
        .unwrap();

    outer.call(Request::get("/")).await;
    assert_eq!(recorder.take(), ["decorator outer", "decorator inner", "view body"]);
}

#[tokio::test]
async fn zero_decorators_return_the_original_object() {
    let recorder = Recorder::default();
    let mut registry = ViewRegistry::new();

    let target = view(&recorder);
    let same = registry
        .decorate(target.clone(), vec![])
        .unwrap()
        .into_callable()
        .unwrap();

    // Identity, not equivalence.
    assert!(same.ptr_eq(&target));
}

#[tokio::test]
async fn a_decorator_can_short_circuit_the_chain() {
    struct Deny;

    impl Decorator for Deny {
        fn name(&self) -> &str {
            "deny"
        }

        fn around(&self, _call: Invocation, _req: Request) -> BoxFuture {
            Box::pin(async { Response::status(http::StatusCode::FORBIDDEN) })
        }
    }

    let recorder = Recorder::default();
    let mut registry = ViewRegistry::new();
    let wrapped = registry
        .decorate(view(&recorder), vec![Arc::new(Deny), tag(&recorder, "never")])
        .unwrap()
        .into_callable()
        .unwrap();

    let resp = wrapped.call(Request::get("/")).await;
    assert_eq!(resp.status_code(), http::StatusCode::FORBIDDEN);
    // Neither the inner decorator nor the body ever ran.
    assert!(recorder.take().is_empty());
}

#[tokio::test]
async fn a_decorator_can_rewrite_the_response_on_the_way_out() {
    struct Stamp;

    impl Decorator for Stamp {
        fn name(&self) -> &str {
            "stamp"
        }

        fn around(&self, call: Invocation, req: Request) -> BoxFuture {
            Box::pin(async move {
                let resp = call.proceed(req).await;
                resp.with_header("x-stamped", "yes")
            })
        }
    }

    let recorder = Recorder::default();
    let mut registry = ViewRegistry::new();
    let wrapped = registry
        .decorate(view(&recorder), vec![Arc::new(Stamp)])
        .unwrap()
        .into_callable()
        .unwrap();

    let resp = wrapped.call(Request::get("/")).await;
    assert_eq!(resp.header("x-stamped"), Some("yes"));
    assert_eq!(resp.body(), b"response");
}

#[tokio::test]
async fn unbound_methods_wrap_with_the_same_mechanism() {
    struct State(&'static str);

    let recorder = Recorder::default();
    let rec = recorder.clone();
    let method = Callable::method("dispatch", move |this: ViewInstance, _req: Request| {
        let rec = rec.clone();
        async move {
            let who = this.downcast::<State>().map(|s| s.0).unwrap_or("nobody");
            rec.push(format!("dispatch for {who}"));
            Response::text("ok")
        }
    });

    let mut registry = ViewRegistry::new();
    let wrapped = registry
        .decorate(method, vec![tag(&recorder, "outer")])
        .unwrap()
        .into_callable()
        .unwrap();

    let instance: ViewInstance = Arc::new(State("alice"));
    wrapped.bind(instance).call(Request::get("/")).await;
    assert_eq!(recorder.take(), ["decorator outer", "dispatch for alice"]);
}

// ── Parameterized usage ───────────────────────────────────────────────────────

/// Factory with one optional `id` parameter — the classic ambiguous arity.
struct TagFactory {
    recorder: Recorder,
}

impl DecoratorFactory for TagFactory {
    fn name(&self) -> &str {
        "tag"
    }

    fn arity(&self) -> Arity {
        Arity::optional(1)
    }

    fn build(&self, args: &CallArgs) -> Result<Arc<dyn Decorator>, Error> {
        let id = match args.positionals().first().or_else(|| args.get("id")) {
            Some(Arg::Value(ParamValue::Str(s))) => s.clone(),
            _ => "default".to_owned(),
        };
        Ok(Arc::new(Tag { id, recorder: self.recorder.clone() }))
    }
}

#[tokio::test]
async fn bare_and_parenthesized_usage_behave_identically() {
    let recorder = Recorder::default();
    let mut registry = ViewRegistry::new();
    let front = decorate_with_args(Arc::new(TagFactory { recorder: recorder.clone() }));

    // `@tag` — the lone argument is the target.
    let bare = front
        .call(&mut registry, CallArgs::empty().positional(view(&recorder)))
        .unwrap()
        .into_complete()
        .unwrap()
        .into_callable()
        .unwrap();
    bare.call(Request::get("/")).await;
    let bare_log = recorder.take();

    // `@tag()` — empty argument list, then the target.
    let pending = front
        .call(&mut registry, CallArgs::empty())
        .unwrap()
        .into_pending()
        .unwrap();
    let parenthesized = pending
        .apply(&mut registry, view(&recorder))
        .unwrap()
        .into_callable()
        .unwrap();
    parenthesized.call(Request::get("/")).await;

    assert_eq!(bare_log, recorder.take());
    assert_eq!(bare_log, ["decorator default", "view body"]);
}

#[tokio::test]
async fn parameterized_usage_captures_the_argument() {
    let recorder = Recorder::default();
    let mut registry = ViewRegistry::new();
    let front = decorate_with_args(Arc::new(TagFactory { recorder: recorder.clone() }));

    let pending = front
        .call(&mut registry, CallArgs::empty().keyword("id", "custom"))
        .unwrap()
        .into_pending()
        .unwrap();
    let wrapped = pending
        .apply(&mut registry, view(&recorder))
        .unwrap()
        .into_callable()
        .unwrap();

    wrapped.call(Request::get("/")).await;
    assert_eq!(recorder.take(), ["decorator custom", "view body"]);
}

#[tokio::test]
async fn one_pending_decoration_is_reusable_across_targets() {
    let recorder = Recorder::default();
    let mut registry = ViewRegistry::new();
    let front = decorate_with_args(Arc::new(TagFactory { recorder: recorder.clone() }));

    let pending = front
        .call(&mut registry, CallArgs::empty().positional("shared"))
        .unwrap()
        .into_pending()
        .unwrap();

    let first = pending.apply(&mut registry, view(&recorder)).unwrap().into_callable().unwrap();
    let second = pending.apply(&mut registry, view(&recorder)).unwrap().into_callable().unwrap();

    // Same shared decorator behind both wrappers.
    assert!(Arc::ptr_eq(
        first.as_wrapper().unwrap().decorator(),
        second.as_wrapper().unwrap().decorator(),
    ));
}

#[test]
fn decorating_a_plain_value_is_a_configuration_error() {
    struct NoArgs;

    impl DecoratorFactory for NoArgs {
        fn name(&self) -> &str {
            "noargs"
        }

        fn arity(&self) -> Arity {
            Arity::none()
        }

        fn build(&self, _args: &CallArgs) -> Result<Arc<dyn Decorator>, Error> {
            Ok(Arc::new(Tag { id: "noargs".into(), recorder: Recorder::default() }))
        }
    }

    let mut registry = ViewRegistry::new();
    let front = decorate_with_args(Arc::new(NoArgs));
    let err = front
        .call(&mut registry, CallArgs::empty().positional(42i64))
        .unwrap_err();
    assert!(matches!(err, Error::NotDecoratable { .. }));
    assert!(err.is_configuration());
}

#[test]
fn mandatory_arguments_are_enforced_eagerly() {
    struct Requires2 {
        recorder: Recorder,
    }

    impl DecoratorFactory for Requires2 {
        fn name(&self) -> &str {
            "requires2"
        }

        fn arity(&self) -> Arity {
            Arity::required(2, 0)
        }

        fn build(&self, _args: &CallArgs) -> Result<Arc<dyn Decorator>, Error> {
            Ok(Arc::new(Tag { id: "requires2".into(), recorder: self.recorder.clone() }))
        }
    }

    let mut registry = ViewRegistry::new();
    let front = decorate_with_args(Arc::new(Requires2 { recorder: Recorder::default() }));
    let err = front
        .call(&mut registry, CallArgs::empty().positional("only-one"))
        .unwrap_err();
    assert!(matches!(err, Error::ArityMismatch { required: 2, supplied: 1, .. }));
}
