//! A base view class, a derived view class, and decorators at both levels.
//!
//! Run with `cargo run --example basic`. Set `RUST_LOG=debug` to see the
//! before/after audit events emitted around each class-decoration pass.

use std::sync::Arc;
use std::time::Instant;

use http::StatusCode;
use veneer::{
    BoxFuture, ClassDef, Decorator, DuplicateOptions, Invocation, Request, Response, ViewInstance,
    ViewRegistry,
};

/// Rejects requests missing the `authorization` header.
struct RequireAuth;

impl Decorator for RequireAuth {
    fn name(&self) -> &str {
        "require_auth"
    }

    fn around(&self, call: Invocation, req: Request) -> BoxFuture {
        Box::pin(async move {
            if req.header("authorization").is_none() {
                tracing::warn!(path = %req.path(), "rejected unauthenticated request");
                return Response::status(StatusCode::UNAUTHORIZED);
            }
            call.proceed(req).await
        })
    }
}

/// Logs how long the rest of the chain took.
struct Timed;

impl Decorator for Timed {
    fn name(&self) -> &str {
        "timed"
    }

    fn around(&self, call: Invocation, req: Request) -> BoxFuture {
        Box::pin(async move {
            let start = Instant::now();
            let resp = call.proceed(req).await;
            tracing::info!(elapsed = ?start.elapsed(), status = %resp.status_code(), "handled");
            resp
        })
    }
}

/// Per-instance state a view class might carry.
struct Greeting(&'static str);

#[tokio::main]
async fn main() -> Result<(), veneer::Error> {
    tracing_subscriber::fmt::init();

    let mut registry = ViewRegistry::new();

    // The base class defines dispatch and requires auth for everyone.
    let base = registry.register(ClassDef::new("BaseView").method(
        "dispatch",
        |this: ViewInstance, _req: Request| async move {
            let greeting = this.downcast::<Greeting>().map(|g| g.0).unwrap_or("hello");
            Response::text(greeting)
        },
    ))?;
    registry.decorate_with(base, vec![Arc::new(RequireAuth)], DuplicateOptions::group("auth"))?;

    // The derived class inherits dispatch and the auth decorator, and adds
    // timing on the outside. Re-declaring the auth group here would replace
    // the inherited member instead of stacking a second check.
    let derived = registry.register(ClassDef::new("TimedView").extends(base))?;
    registry.decorate(derived, vec![Arc::new(Timed)])?;

    let entry = registry.entry_point(derived, "dispatch")?;
    tracing::info!(
        class = entry.class(),
        chain = ?registry.resolved_chain(derived).map(|c| c.names()),
        "resolved entry point"
    );

    // The framework would construct the instance and bind it per request.
    let instance: ViewInstance = Arc::new(Greeting("hello from TimedView"));

    let denied = entry
        .invoke(instance.clone(), Request::get("/greet"))
        .await;
    println!("without auth header: {}", denied.status_code());

    let allowed = entry
        .invoke(instance, Request::get("/greet").with_header("authorization", "Bearer t"))
        .await;
    println!(
        "with auth header:    {} {}",
        allowed.status_code(),
        String::from_utf8_lossy(allowed.body()),
    );

    Ok(())
}
