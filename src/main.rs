use anyhow::Context;
use clap::{App, Arg};
use log::{error, info};

use user_events_producer::config::{self, Launch, RawSettings, Settings};
use user_events_producer::generator::EventGenerator;
use user_events_producer::publisher::PublisherLoop;
use user_events_producer::shutdown::{self, StopSignal};
use user_events_producer::sink::{EventSink, KafkaSink, SinkError};

fn setup_logger(verbose: bool, log_conf: Option<&str>) {
    let log_level = if verbose { "debug" } else { "info" };
    let log_conf = log_conf.unwrap_or("rdkafka=info");
    env_logger::Builder::new()
        .parse_filters(&format!("{},{}", log_level, log_conf))
        .init();
}

fn cli<'a, 'b>() -> App<'a, 'b> {
    App::new("user-events-producer")
        .version(option_env!("CARGO_PKG_VERSION").unwrap_or(""))
        .about("Publishes synthetic user activity events to Kafka at a fixed rate")
        .arg(
            Arg::with_name("enabled")
                .long("enabled")
                .help("Set to 'true' to run the producer")
                .takes_value(true)
                .env(config::ENABLED_ENV),
        )
        .arg(
            Arg::with_name("brokers")
                .short("b")
                .long("brokers")
                .help("Broker list in kafka format")
                .takes_value(true)
                .env(config::BROKERS_ENV),
        )
        .arg(
            Arg::with_name("rate")
                .short("r")
                .long("rate")
                .help("Events per minute")
                .takes_value(true)
                .env(config::RATE_ENV),
        )
        .arg(
            Arg::with_name("log-conf")
                .long("log-conf")
                .help("Configure the logging format (example: 'rdkafka=trace')")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("verbose")
                .short("v")
                .long("verbose")
                .help("Log at debug level"),
        )
}

/// Validates the configuration, then opens the sink and runs the loop.
/// No connection is opened when the configuration is invalid or disabled.
async fn launch<S, F>(raw: RawSettings, open: F, stop: StopSignal) -> anyhow::Result<()>
where
    S: EventSink,
    F: FnOnce(&Settings) -> Result<S, SinkError>,
{
    let settings = match Settings::resolve(raw).context("invalid configuration")? {
        Launch::Disabled => {
            info!("Producer is disabled");
            return Ok(());
        }
        Launch::Run(settings) => settings,
    };

    info!("Connecting to Kafka at {}...", settings.brokers);
    let sink = open(&settings).context("failed to create Kafka producer")?;

    info!(
        "Starting producer at {} RPM on topic {}",
        settings.cadence.rate(),
        settings.topic
    );
    let summary = PublisherLoop::new(EventGenerator::from_os_rng(), sink, settings.cadence, stop)
        .run()
        .await?;

    info!(
        "Producer {:?} after publishing {} events",
        summary.state, summary.published
    );
    Ok(())
}

#[tokio::main]
async fn main() {
    let matches = cli().get_matches();

    setup_logger(matches.is_present("verbose"), matches.value_of("log-conf"));

    let (trigger, stop) = shutdown::stop_channel();
    tokio::spawn(shutdown::listen_for_os_signals(trigger));

    let open = |settings: &Settings| KafkaSink::connect(&settings.brokers, &settings.topic);
    if let Err(err) = launch(RawSettings::from_matches(&matches), open, stop).await {
        error!("{:#}", err);
        std::process::exit(1);
    }
}
