use std::net::{IpAddr, Ipv4Addr};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::oneshot;
use tollgate::{Exchange, FilterRegistry, RemoteAddr, Response, Server, filter};

async fn get(addr: &str, path: &str) -> String {
    let mut stream = None;
    for _ in 0..50 {
        match TcpStream::connect(addr).await {
            Ok(s) => { stream = Some(s); break; }
            Err(_) => tokio::time::sleep(Duration::from_millis(20)).await,
        }
    }
    let mut stream = stream.expect("server never came up");

    let req = format!("GET {path} HTTP/1.1\r\nhost: test\r\nconnection: close\r\n\r\n");
    stream.write_all(req.as_bytes()).await.unwrap();

    let mut buf = String::new();
    stream.read_to_string(&mut buf).await.unwrap();
    buf
}

#[tokio::test]
async fn serves_through_the_chain() {
    const ADDR: &str = "127.0.0.1:38217";

    let events: Arc<Mutex<Vec<String>>> = Arc::default();
    let (pre, post) = (Arc::clone(&events), Arc::clone(&events));
    let peers: Arc<Mutex<Vec<IpAddr>>> = Arc::default();
    let peer = Arc::clone(&peers);
    let filters = FilterRegistry::new()
        .with(filter::stage("log")
            .pre(move |ex| { pre.lock().unwrap().push(format!("pre {}", ex.path())); Ok(()) })
            .post(move |ex, outcome| {
                post.lock().unwrap().push(format!("post {} {outcome:?}", ex.path()));
                Ok(())
            }), 1)
        .with(filter::stage("peer").pre(move |ex| {
            let RemoteAddr(addr) = *ex.attributes().get::<RemoteAddr>().ok_or("no remote addr")?;
            peer.lock().unwrap().push(addr.ip());
            Ok(())
        }), 0)
        .with(filter::stage("gate").pre(|ex| match ex.path() {
            "/denied" => Err("denied".into()),
            _ => Ok(()),
        }), 2);

    let handler = |ex: &mut Exchange| {
        let path = ex.path().to_owned();
        async move {
            if path == "/broken" {
                return Err("upstream down");
            }
            Ok::<_, &'static str>(Response::text(format!("forwarded {path}")))
        }
    };

    let (stop, stopped) = oneshot::channel::<()>();
    let server = tokio::spawn(
        Server::bind(ADDR)
            .filters(filters)
            .serve_with_shutdown(handler, async { stopped.await.ok(); }),
    );

    let ok = get(ADDR, "/orders/7").await;
    assert!(ok.starts_with("HTTP/1.1 200"), "{ok}");
    assert!(ok.ends_with("forwarded /orders/7"), "{ok}");

    let broken = get(ADDR, "/broken").await;
    assert!(broken.starts_with("HTTP/1.1 502"), "{broken}");

    let denied = get(ADDR, "/denied").await;
    assert!(denied.starts_with("HTTP/1.1 500"), "{denied}");

    stop.send(()).unwrap();
    server.await.unwrap().unwrap();

    assert_eq!(*events.lock().unwrap(), [
        "pre /orders/7",
        "post /orders/7 Success",
        "pre /broken",
        "post /broken Failure",
        "pre /denied",
        "post /denied Failure",
    ]);
    assert_eq!(*peers.lock().unwrap(), [IpAddr::V4(Ipv4Addr::LOCALHOST); 3]);
}
