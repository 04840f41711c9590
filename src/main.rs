use crate::config::AppConfig;
use crate::db::{init_db, Database};
use crate::router::handle;
use astra::Server;
use std::net::SocketAddr;

mod config;
mod db;
mod domain;
mod errors;
mod geos;
mod regions;
mod responses;
mod router;
mod scraper;
mod spreadsheets;
mod stats;
mod templates;

#[cfg(test)]
mod tests;

fn main() {
    let cfg = AppConfig::default();

    // 1️⃣ Create the database handle
    let db = Database::new(cfg.db_path.clone());

    // 2️⃣ Initialize database from schema.sql
    if let Err(e) = init_db(&db, "sql/schema.sql") {
        eprintln!("❌ Database initialization failed: {e}");
        std::process::exit(1);
    }

    // 3️⃣ Dispatch on the subcommand; none means serve
    match std::env::args().nth(1).as_deref() {
        Some("scrape") => scraper::ListingScraper::run_full_scrape(&db, &cfg),
        Some("consolidate") => {
            if let Err(e) = regions::run_consolidation(&db, &cfg) {
                eprintln!("❌ Consolidation failed: {e}");
                std::process::exit(1);
            }
        }
        Some("stats") => {
            if let Err(e) = stats::run_statistics(&db, &cfg) {
                eprintln!("❌ Statistics run failed: {e}");
                std::process::exit(1);
            }
        }
        None | Some("serve") => serve(db, cfg),
        Some(other) => {
            eprintln!("Unknown command {other:?}; expected scrape, consolidate, stats or serve");
            std::process::exit(2);
        }
    }
}

fn serve(db: Database, cfg: AppConfig) {
    let addr: SocketAddr = match cfg.bind_addr.parse() {
        Ok(addr) => addr,
        Err(e) => {
            eprintln!("❌ Invalid bind address {:?}: {e}", cfg.bind_addr);
            std::process::exit(1);
        }
    };

    // 4️⃣ Start the server
    println!("Starting server at http://{addr}");

    let server = Server::bind(&addr).max_workers(8);

    // 5️⃣ Serve requests, passing the db handle and config into the closure
    let result = server.serve(move |req, _info| match handle(req, &db, &cfg) {
        Ok(resp) => resp,
        Err(err) => templates::html_error_response(err),
    });

    if let Err(e) = result {
        eprintln!("Server ended with error: {e}");
    }

    println!("Server shut down cleanly.");
}
