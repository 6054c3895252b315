use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::thread;

use braid::{
    Chain, Constructor, Context, Handler, HandlerFn, Next, Request, Response, SharedHandler,
    middleware,
};
use bytes::Bytes;
use tokio::task::JoinSet;

type Log = Arc<Mutex<Vec<String>>>;

fn get(path: &str) -> Request {
    Request::from(http::Request::get(path).body(Bytes::new()).unwrap())
}

/// Middleware that appends its name to `log` and then calls the next handler.
fn named(name: &'static str, log: &Log) -> Constructor {
    let log = Arc::clone(log);
    middleware::from_fn(move |ctx: Context, req: Request, next: Next| {
        log.lock().unwrap().push(name.to_owned());
        async move { next.serve(ctx, req).await }
    })
}

/// Terminal that appends `name` to `log` and stops.
fn endpoint(name: &'static str, log: &Log) -> impl Handler + use<> {
    let log = Arc::clone(log);
    move |_ctx: Context, _req: Request| {
        log.lock().unwrap().push(name.to_owned());
        async move { name }
    }
}

fn entries(log: &Log) -> Vec<String> {
    log.lock().unwrap().clone()
}

#[tokio::test]
async fn logger_then_auth_then_index() {
    let log = Log::default();
    let app = Chain::new([named("Logger", &log), named("Auth", &log)])
        .then(endpoint("index", &log));

    let res = app.invoke(get("/")).await;

    assert_eq!(entries(&log), ["Logger", "Auth", "index"]);
    assert_eq!(res.body(), b"index");
}

#[tokio::test]
async fn fold_matches_manual_nesting() {
    let folded = Log::default();
    let nested = Log::default();

    let chain = Chain::new([named("c1", &folded), named("c2", &folded), named("c3", &folded)]);
    chain.then(endpoint("h", &folded)).invoke(get("/")).await;

    let ctx = Context::background();
    let (c1, c2, c3) = (named("c1", &nested), named("c2", &nested), named("c3", &nested));
    let h: SharedHandler = Arc::new(endpoint("h", &nested));
    let manual = c1.wrap(&ctx, c2.wrap(&ctx, c3.wrap(&ctx, h)));
    manual.serve(ctx.clone(), get("/")).await;

    assert_eq!(entries(&folded), entries(&nested));
    assert_eq!(entries(&folded), ["c1", "c2", "c3", "h"]);
}

#[tokio::test]
async fn empty_chain_is_the_terminal() {
    let log = Log::default();
    let app = Chain::new([]).then(endpoint("h", &log));

    let res = app.invoke(get("/")).await;

    assert_eq!(entries(&log), ["h"]);
    assert_eq!(res.body(), b"h");
}

#[tokio::test]
async fn reused_base_routes_to_its_own_terminal() {
    let log = Log::default();
    let base = Chain::new([named("ratelimit", &log), named("csrf", &log)]);

    let p1 = base.then(endpoint("h1", &log));
    let p2 = base.then(endpoint("h2", &log));

    p1.invoke(get("/one")).await;
    assert_eq!(entries(&log), ["ratelimit", "csrf", "h1"]);

    log.lock().unwrap().clear();
    p2.invoke(get("/two")).await;
    assert_eq!(entries(&log), ["ratelimit", "csrf", "h2"]);
}

#[tokio::test]
async fn append_leaves_the_base_alone() {
    let log = Log::default();
    let base = Chain::new([named("A", &log)]);

    base.then(endpoint("term", &log)).invoke(get("/")).await;
    let before = entries(&log);
    log.lock().unwrap().clear();

    let ext = base.append([named("B", &log)]);

    base.then(endpoint("term", &log)).invoke(get("/")).await;
    assert_eq!(entries(&log), before);
    assert_eq!(entries(&log), ["A", "term"]);

    log.lock().unwrap().clear();
    ext.then(endpoint("term", &log)).invoke(get("/")).await;
    assert_eq!(entries(&log), ["A", "B", "term"]);
}

#[tokio::test]
async fn append_chains_keep_declaration_order() {
    let log = Log::default();
    let std_chain = Chain::new([named("m1", &log), named("m2", &log)]);
    let ext_chain = std_chain.append([named("m3", &log), named("m4", &log)]);

    ext_chain.then(endpoint("h", &log)).invoke(get("/")).await;

    assert_eq!(entries(&log), ["m1", "m2", "m3", "m4", "h"]);
    assert_eq!(std_chain.len(), 2);
    assert_eq!(ext_chain.len(), 4);
}

#[tokio::test]
async fn then_func_and_then_context_agree() {
    let log = Log::default();
    let chain = Chain::new([named("outer", &log)]);

    let via_func = chain.then_func_context(|_ctx: Context, _req: Request| async { "func" });
    let via_handler =
        chain.then_context(HandlerFn::new(|_ctx: Context, _req: Request| async { "handler" }));

    let a = via_func.serve(Context::background(), get("/")).await;
    let b = via_handler.serve(Context::background(), get("/")).await;
    let c = chain
        .then_func(|_ctx: Context, _req: Request| async { "adapter" })
        .invoke(get("/"))
        .await;

    assert_eq!(a.body(), b"func");
    assert_eq!(b.body(), b"handler");
    assert_eq!(c.body(), b"adapter");
    assert_eq!(entries(&log), ["outer", "outer", "outer"]);
}

#[tokio::test]
async fn composed_output_can_be_composed_again() {
    let log = Log::default();
    let inner = Chain::new([named("inner", &log)]).then_context(endpoint("h", &log));
    let outer = Chain::new([named("outer", &log)]).then(inner);

    outer.invoke(get("/")).await;

    assert_eq!(entries(&log), ["outer", "inner", "h"]);
}

#[test]
fn chains_are_shared_across_threads() {
    let log = Log::default();
    let base = Chain::new([named("base", &log)]);

    let workers: Vec<_> = (0..4)
        .map(|i| {
            let base = base.clone();
            let log = Arc::clone(&log);
            let name = if i % 2 == 0 { "even" } else { "odd" };
            thread::spawn(move || base.append([named(name, &log)]).len())
        })
        .collect();

    for worker in workers {
        assert_eq!(worker.join().unwrap(), 2);
    }
    assert_eq!(base.len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_folds_and_requests_stay_separate() {
    const ROUTES: usize = 4;
    const REQUESTS: usize = 16;

    let base = Chain::new([middleware::from_fn(|ctx: Context, req: Request, next: Next| async move {
        next.serve(ctx, req).await
    })]);

    let mut routes = JoinSet::new();
    for route in 0..ROUTES {
        let base = base.clone();
        routes.spawn(async move {
            let app = base.then(move |ctx: Context, _req: Request| async move {
                let id = ctx.request_id().map(|id| id.get()).unwrap_or_default();
                format!("{route}:{id}")
            });

            let mut requests = JoinSet::new();
            for _ in 0..REQUESTS {
                let app = app.clone();
                requests.spawn(async move { app.invoke(get("/")).await });
            }

            let mut bodies = Vec::new();
            while let Some(res) = requests.join_next().await {
                bodies.push(String::from_utf8(res.unwrap().body().to_vec()).unwrap());
            }
            (route, bodies)
        });
    }

    let mut ids = HashSet::new();
    while let Some(joined) = routes.join_next().await {
        let (route, bodies) = joined.unwrap();
        assert_eq!(bodies.len(), REQUESTS);
        for body in bodies {
            let (served_by, id) = body.split_once(':').unwrap();
            assert_eq!(served_by, route.to_string());
            assert_ne!(id, "0");
            assert!(ids.insert(id.to_owned()), "request id {id} handed out twice");
        }
    }
    assert_eq!(ids.len(), ROUTES * REQUESTS);
    assert_eq!(base.len(), 1);
}

fn absent() -> Option<HandlerFn<fn(Context, Request) -> std::future::Ready<Response>>> {
    None
}

#[test]
#[should_panic(expected = "terminal handler must not be None")]
fn none_terminal_panics_with_layers() {
    let log = Log::default();
    Chain::new([named("a", &log), named("b", &log)]).then(absent());
}

#[test]
#[should_panic(expected = "terminal handler must not be None")]
fn none_terminal_panics_without_layers() {
    Chain::new([]).then(absent());
}

#[test]
#[should_panic(expected = "terminal handler must not be None")]
fn none_terminal_panics_for_then_context() {
    Chain::default().then_context(absent());
}

#[test]
#[should_panic(expected = "terminal handler must not be None")]
fn none_closure_panics_too() {
    let missing: Option<fn(Context, Request) -> std::future::Ready<&'static str>> = None;
    Chain::default().then(missing);
}
