use actix_web::{middleware, web, App, HttpServer};
use ocrserve::classifier::CtcClassifier;
use ocrserve::config::RUST_LOG;
use ocrserve::resolver::{Resolver, ResolverConfig};
use ocrserve::server::{routes, AppState};
use std::sync::Arc;
use std::{env, io, process};
use tracing::info;

const USAGE: &str = "usage: ./ocrserve <port> <model file> <charset file>";

fn get_args() -> (u16, String, String) {
    let args: Vec<String> = env::args().collect();
    if args.len() - 1 != 3 {
        println!("{USAGE}");
        process::exit(1);
    }

    let port: u16 = args[1].parse().expect("invalid port");

    (port, args[2].clone(), args[3].clone())
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", RUST_LOG);
    }
    tracing_subscriber::fmt::init();

    let (port, model, charset) = get_args();

    let classifier =
        CtcClassifier::new(&model, &charset).expect("failed to load the recognition model");
    let resolver =
        Resolver::new(ResolverConfig::default()).expect("failed to build the http client");
    let state = web::Data::new(AppState::new(Arc::new(classifier), resolver));

    info!("starting ocr server on port {port}");

    // Start the HTTP server
    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(middleware::Logger::default())
            .service(routes::ocr)
    })
    .bind(format!("0.0.0.0:{port}"))?
    .run()
    .await
}
