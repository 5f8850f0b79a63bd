use crate::SharedResult;
use futures::future;
use hyper::{Body, Request, Response};
use std::net::SocketAddr;
use tracing::{error, info, instrument};

/// Serves the most recent analysis as JSON on `/api/analysis`.
#[instrument(skip(results, drain))]
pub(crate) async fn serve(
    addr: SocketAddr,
    results: SharedResult,
    drain: drain::Watch,
) -> Result<(), hyper::Error> {
    let server =
        hyper::server::Server::bind(&addr).serve(hyper::service::make_service_fn(move |_conn| {
            let results = results.clone();
            future::ok::<_, hyper::Error>(hyper::service::service_fn(
                move |req: hyper::Request<hyper::Body>| match req.uri().path() {
                    "/api/analysis" => future::ok::<_, hyper::Error>(handle_analysis(
                        &results, req,
                    )),
                    _ => future::ok::<_, hyper::Error>(
                        hyper::Response::builder()
                            .status(hyper::StatusCode::NOT_FOUND)
                            .body(hyper::Body::default())
                            .unwrap(),
                    ),
                },
            ))
        }));
    let addr = server.local_addr();
    info!(%addr, "HTTP API server listening");
    server
        .with_graceful_shutdown(async move {
            let release = drain.signaled().await;
            drop(release);
        })
        .await
}

fn handle_analysis(results: &SharedResult, req: Request<Body>) -> Response<Body> {
    match *req.method() {
        hyper::Method::GET | hyper::Method::HEAD => {
            let body = {
                let analysis = results.read();
                serde_json::to_vec(&*analysis)
            };
            match body {
                Ok(json) => Response::builder()
                    .status(hyper::StatusCode::OK)
                    .header(hyper::header::CONTENT_TYPE, "application/json")
                    .body(json.into())
                    .unwrap(),
                Err(error) => {
                    error!(%error, "Failed to serialize analysis");
                    Response::builder()
                        .status(hyper::StatusCode::INTERNAL_SERVER_ERROR)
                        .body(Body::default())
                        .unwrap()
                }
            }
        }
        _ => Response::builder()
            .status(hyper::StatusCode::METHOD_NOT_ALLOWED)
            .body(Body::default())
            .unwrap(),
    }
}
