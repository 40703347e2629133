//! Session Demo
//!
//! Feeds a slow, chunked SSE body through an `XStreamSession`, cancels it
//! part-way and prints the records collected up to that point.
//!
//! Run with: `RUST_LOG=debug cargo run -p hpx-xstream --example session_demo`

use std::{io, sync::Arc, time::Duration};

use futures_util::{StreamExt, stream};
use hpx_xstream::{XStreamConfig, XStreamOptions, XStreamSession};
use tracing_subscriber::EnvFilter;

const BODY: &[&str] = &[
    "event: token\nda",
    "ta: Hel\n\nevent: token\ndata: lo\n",
    "\n: keep-alive\n\nevent: token\ndata: , wor",
    "ld\n\nevent: done\ndata: [DONE]\n\n",
];

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let session = XStreamSession::new(Arc::new(XStreamConfig::default()));

    let body = stream::iter(BODY.iter().copied()).then(|chunk| async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        Ok::<_, io::Error>(chunk)
    });

    let canceller = session.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(120)).await;
        println!("-- cancelling --");
        canceller.cancel();
    });

    if let Err(err) = session
        .start(XStreamOptions::new().readable_stream(body))
        .await
    {
        eprintln!("could not start: {err}");
        return;
    }

    println!("Session finished");
    println!("================");
    for record in session.records() {
        println!(
            "event={:<8} data={:?}",
            record.event().unwrap_or("").trim(),
            record.data().unwrap_or("")
        );
    }
    if let Some(err) = session.error() {
        println!("error: {err}");
    }
}
