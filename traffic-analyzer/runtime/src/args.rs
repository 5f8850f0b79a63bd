use crate::{api, index, k8s, metrics::AnalysisMetrics, SharedResult};
use anyhow::{bail, Result};
use clap::Parser;
use kube::runtime::watcher;
use prometheus_client::registry::Registry;
use std::net::SocketAddr;
use tracing::{info_span, Instrument};

#[derive(Debug, Parser)]
#[clap(name = "traffic-analyzer", about = "A network traffic analyzer for Kubernetes")]
pub struct Args {
    #[clap(
        long,
        default_value = "traffic_analyzer=info,warn",
        env = "TRAFFIC_ANALYZER_LOG"
    )]
    log_level: kubert::LogFilter,

    #[clap(long, default_value = "plain")]
    log_format: kubert::LogFormat,

    #[clap(flatten)]
    client: kubert::ClientArgs,

    #[clap(flatten)]
    admin: kubert::AdminArgs,

    /// Address of the analysis API server.
    #[clap(long, default_value = "0.0.0.0:8080")]
    api_addr: SocketAddr,
}

impl Args {
    #[inline]
    pub async fn parse_and_run() -> Result<()> {
        Self::parse().run().await
    }

    pub async fn run(self) -> Result<()> {
        let Self {
            admin,
            client,
            log_level,
            log_format,
            api_addr,
        } = self;

        let mut prom = <Registry>::default();
        let analysis_metrics =
            AnalysisMetrics::register(prom.sub_registry_with_prefix("traffic_analysis"));

        let mut runtime = kubert::Runtime::builder()
            .with_log(log_level, log_format)
            .with_admin(admin.into_builder().with_prometheus(prom))
            .with_client(client)
            .build()
            .await?;

        let (index, snapshots) = index::Index::shared();

        // Spawn resource watches.

        let pods = runtime.watch_all::<k8s::Pod>(watcher::Config::default());
        tokio::spawn(kubert::index::namespaced(index.clone(), pods).instrument(info_span!("pods")));

        let policies = runtime.watch_all::<k8s::NetworkPolicy>(watcher::Config::default());
        tokio::spawn(
            kubert::index::namespaced(index.clone(), policies)
                .instrument(info_span!("networkpolicies")),
        );

        let namespaces = runtime.watch_all::<k8s::Namespace>(watcher::Config::default());
        tokio::spawn(
            kubert::index::cluster(index.clone(), namespaces).instrument(info_span!("namespaces")),
        );

        // Run the analysis loop and the API server that publishes its results.
        let results = SharedResult::default();
        tokio::spawn(
            crate::analyze(snapshots, results.clone(), analysis_metrics)
                .instrument(info_span!("analysis")),
        );
        tokio::spawn(api::serve(api_addr, results, runtime.shutdown_handle()));

        // Block the main thread on the shutdown signal. Once it fires, wait
        // for the background tasks to complete before exiting.
        if runtime.run().await.is_err() {
            bail!("Aborted");
        }

        Ok(())
    }
}
