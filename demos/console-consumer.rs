//! Minimal console consumer: subscribes to one or more topics and prints every record polled.

use std::env;
use std::path::Path;
use std::process;
use std::time::Duration;

use getopts::Options;

use kafka_native::client::ClientBuilder;
use kafka_native::consumer::{Consumer, ConsumerBuilder};

const DEFAULT_BROKER: &str = "127.0.0.1:9092";
const DEFAULT_CLIENT_ID: &str = "console-consumer";
const DEFAULT_TOPIC: &str = "my-topic";

struct Config {
    brokers: Vec<String>,
    client_id: String,
    topics: Vec<String>,
    group_id: String,
    no_commit: bool,
}

impl Config {
    fn parse_cmdline() -> Self {
        let args: Vec<String> = env::args().collect();
        let program = Path::new(&args[0]).file_name().unwrap().to_str().unwrap().to_owned();
        let mut opts = Options::new();

        opts.optflag("h", "help", "print this help menu");
        opts.optopt("b", "bootstrap-server", "Bootstrap broker(s) (host:port, comma separated)", "HOSTS");
        opts.optopt("", "client-id", "Specify the client id.", "ID");
        opts.optopt("g", "group-id", "Specify the consumer group.", "NAME");
        opts.optopt("t", "topics", "Specify topics (comma separated).", "NAMES");
        opts.optflag("", "no-commit", "Do not commit group offsets.");

        let m = opts.parse(&args[1..]).unwrap_or_else(|e| {
            eprintln!("{}", e);
            process::exit(1);
        });

        if m.opt_present("h") {
            print!("{}", opts.usage(&format!("Usage: {} [options]", program)));
            process::exit(0);
        }

        let brokers = m
            .opt_str("b")
            .map_or_else(|| vec![DEFAULT_BROKER.to_owned()], |s| s.split(',').map(|s| s.trim().to_owned()).collect());
        let topics = m
            .opt_str("t")
            .map_or_else(|| vec![DEFAULT_TOPIC.to_owned()], |s| s.split(',').map(|s| s.trim().to_owned()).collect());

        Config {
            brokers,
            client_id: m.opt_str("client-id").unwrap_or_else(|| DEFAULT_CLIENT_ID.to_owned()),
            topics,
            group_id: m.opt_str("g").unwrap_or_else(|| "console-consumer-group".to_owned()),
            no_commit: m.opt_present("no-commit"),
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let config = Config::parse_cmdline();
    tracing::info!(brokers = ?config.brokers, topics = ?config.topics, group = %config.group_id, "starting console consumer");

    let client = ClientBuilder::new(config.brokers.clone()).client_id(config.client_id.clone()).build();
    let consumer = ConsumerBuilder::new(config.brokers, config.group_id)
        .client_id(config.client_id)
        .subscribe(config.topics)
        .auto_commit(!config.no_commit)
        .build(client);
    consumer.start().await;

    loop {
        match consumer.poll().await {
            Ok(records) => {
                for record in records {
                    println!(
                        "topic={} partition={} offset={} key={:?} value={:?}",
                        record.topic,
                        record.partition,
                        record.offset,
                        record.key.as_deref().map(String::from_utf8_lossy),
                        record.value.as_deref().map(String::from_utf8_lossy),
                    );
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "poll failed");
                tokio::time::sleep(Duration::from_secs(1)).await;
            }
        }
    }
}
