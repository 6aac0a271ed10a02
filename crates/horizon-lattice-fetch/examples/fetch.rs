//! Fetch a URL and print the classified response.
//!
//! Run with: cargo run -p horizon-lattice-fetch --example fetch -- <url> [json-body]

use std::sync::mpsc;

use horizon_lattice_fetch::Client;

fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let mut args = std::env::args().skip(1);
    let Some(url) = args.next() else {
        eprintln!("usage: fetch <url> [json-body]");
        std::process::exit(2);
    };

    let client = Client::new();
    let request = match args.next() {
        Some(body) => match serde_json::from_str::<serde_json::Value>(&body) {
            Ok(value) => client.post(url).send_json(&value),
            Err(e) => {
                eprintln!("invalid JSON body: {e}");
                std::process::exit(2);
            }
        },
        None => client.get(url),
    };

    let (tx, rx) = mpsc::channel();
    let err_tx = tx.clone();
    request.end_with(
        move |response| {
            let _ = tx.send(Ok(response));
        },
        move |err| {
            let _ = err_tx.send(Err(err));
        },
    );

    match rx.recv() {
        Ok(Ok(response)) => {
            println!("{response}");
            println!("status: {} ({})", response.status(), response.family());
            for (name, value) in response.headers() {
                println!("{name}: {value}");
            }
            println!();
            println!("{}", response.text());
        }
        Ok(Err(err)) => {
            eprintln!("request failed: {err}");
            std::process::exit(1);
        }
        Err(_) => {
            eprintln!("request dropped without a result");
            std::process::exit(1);
        }
    }
}
