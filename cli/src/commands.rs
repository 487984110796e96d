use std::{collections::BTreeMap, io::Write, ops::ControlFlow, path::PathBuf, time::Duration};

use alerta_client::{ApiClient, BulkAction, Query, Transport, Watcher, HTTP_LIBRARY};
use alerta_model::{Alert, AlertRecord, Heartbeat};
use clap::{Args as ClapArgs, Parser, Subcommand};
use serde_json::Value;
use tracing::{debug, info};

use crate::{
    config::{Config, Overrides},
    error::Error,
    output::{config_table, json_list, raw_lines, OutputFormat, Render},
    progress::TerminalProgress,
};

const FILTER_HELP: &str = "\
Filters:
    Query parameters can be used to filter alerts by any valid alert attribute

    resource=web01     Show alerts with resource equal to \"web01\"
    resource!=web01    Show all alerts except those with resource of \"web01\"
    event=~down        Show alerts that include \"down\" in event name
    event!=~down       Show all alerts that don't have \"down\" in event name

    Special query parameters include \"limit\", \"sort-by\", \"from-date\" and \"q\" (a
    json-compliant mongo query).";

#[derive(Parser, Debug)]
#[command(
    name = "alerta",
    version,
    about = "Alerta client unified command-line tool",
    after_help = FILTER_HELP
)]
pub struct Args {
    #[command(subcommand)]
    pub cmd: Commands,

    /// Config file to read settings from
    #[arg(long, global = true, value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    /// Select profile to apply from the config file
    #[arg(long, global = true)]
    pub profile: Option<String>,

    /// API endpoint URL
    #[arg(long = "endpoint-url", global = true, value_name = "URL")]
    pub endpoint: Option<String>,

    /// Output format
    #[arg(long, global = true, value_enum)]
    pub output: Option<OutputFormat>,

    /// Output in JSON format. Shortcut for "--output json"
    #[arg(long, short = 'j', global = true)]
    pub json: bool,

    /// Color-coded output based on severity
    #[arg(long, visible_alias = "colour", global = true, overrides_with = "no_color")]
    pub color: bool,

    #[arg(long, alias = "no-colour", global = true, hide = true, overrides_with = "color")]
    pub no_color: bool,

    /// Timezone used for displaying times, eg. "Europe/London"
    #[arg(long, global = true)]
    pub timezone: Option<String>,

    /// Print debug output
    #[arg(long, global = true)]
    pub debug: bool,
}

impl Args {
    pub fn overrides(&self) -> Overrides {
        let color = match (self.color, self.no_color) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        };
        Overrides {
            config_file: self.config_file.clone(),
            profile: self.profile.clone(),
            endpoint: self.endpoint.clone(),
            timezone: self.timezone.clone(),
            output: if self.json { Some(OutputFormat::Json) } else { self.output },
            color,
            debug: self.debug.then_some(true),
        }
    }
}

#[derive(ClapArgs, Debug, Clone, Default)]
pub struct Filters {
    /// KEY=VALUE eg. id=5108bc20
    #[arg(value_name = "FILTERS")]
    pub filter: Vec<String>,
}

impl Filters {
    pub fn query(&self) -> Query {
        Query::from_tokens(&self.filter)
    }
}

#[derive(ClapArgs, Debug, Clone)]
pub struct SendArgs {
    /// Resource under alarm
    #[arg(short, long)]
    pub resource: String,
    #[arg(short, long)]
    pub event: String,
    /// Environment eg. "Production", "Development", "Testing"
    #[arg(short = 'E', long)]
    pub environment: Option<String>,
    #[arg(short, long)]
    pub severity: Option<String>,
    #[arg(short = 'C', long)]
    pub correlate: Vec<String>,
    /// Status should not normally be defined as it is server-assigned eg. "open", "closed"
    #[arg(long)]
    pub status: Option<String>,
    /// Service affected eg. the application name, "Web", "Network", "Storage", "Database"
    #[arg(short = 'S', long)]
    pub service: Vec<String>,
    #[arg(short, long)]
    pub group: Option<String>,
    #[arg(short, long)]
    pub value: Option<String>,
    /// Freeform alert text eg. "Host not responding to ping."
    #[arg(short, long)]
    pub text: Option<String>,
    /// Tags eg. "London", "os:linux", "AWS/EC2"
    #[arg(short = 'T', long = "tag", value_name = "TAG")]
    pub tags: Vec<String>,
    /// Key=Value attribute pairs eg. "priority=high", "moreInfo=..."
    #[arg(short = 'A', long = "attribute", value_name = "KEY=VALUE")]
    pub attributes: Vec<String>,
    /// Origin of alert. Usually in form of "app/host"
    #[arg(short = 'O', long)]
    pub origin: Option<String>,
    /// Event type eg. "exceptionAlert", "serviceAlert"
    #[arg(long = "type")]
    pub event_type: Option<String>,
    /// Seconds before an open alert will be automatically expired
    #[arg(long)]
    pub timeout: Option<u64>,
    #[arg(long)]
    pub raw_data: Option<String>,
}

impl SendArgs {
    pub fn to_alert(&self) -> Result<Alert, Error> {
        let attributes = self
            .attributes
            .iter()
            .map(|pair| match pair.split_once('=') {
                Some((key, value)) => Ok((key.to_owned(), Value::from(value))),
                None => Err(Error::InvalidAttribute(pair.clone())),
            })
            .collect::<Result<BTreeMap<_, _>, _>>()?;

        let mut builder = Alert::builder(&self.resource, &self.event)
            .correlate(&self.correlate)
            .service(&self.service)
            .tags(&self.tags)
            .attributes(attributes);
        if let Some(environment) = &self.environment {
            builder = builder.environment(environment);
        }
        if let Some(severity) = &self.severity {
            builder = builder.severity(severity);
        }
        if let Some(status) = &self.status {
            builder = builder.status(status);
        }
        if let Some(group) = &self.group {
            builder = builder.group(group);
        }
        if let Some(value) = &self.value {
            builder = builder.value(value);
        }
        if let Some(text) = &self.text {
            builder = builder.text(text);
        }
        if let Some(origin) = &self.origin {
            builder = builder.origin(origin);
        }
        if let Some(event_type) = &self.event_type {
            builder = builder.event_type(event_type);
        }
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(raw_data) = &self.raw_data {
            builder = builder.raw_data(raw_data);
        }
        Ok(builder.build()?)
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(name = "send", about = "Send alert to server")]
    Send(SendArgs),
    #[command(name = "heartbeat", about = "Send heartbeat to server")]
    Heartbeat {
        /// Tags eg. "London", "os:linux", "AWS/EC2"
        #[arg(short = 'T', long = "tag", value_name = "TAG")]
        tags: Vec<String>,
        /// Origin of heartbeat. Usually in form of "app/host"
        #[arg(short = 'O', long)]
        origin: Option<String>,
        /// Seconds before a heartbeat will be considered stale
        #[arg(long)]
        timeout: Option<u64>,
    },
    #[command(name = "heartbeats", about = "List heartbeats")]
    Heartbeats,
    #[command(name = "query", about = "List alerts based on query filter")]
    Query {
        /// Show alert details
        #[arg(long)]
        details: bool,
        #[command(flatten)]
        filters: Filters,
    },
    #[command(name = "watch", about = "Watch alerts based on query filter")]
    Watch {
        /// Show alert details
        #[arg(long)]
        details: bool,
        #[command(flatten)]
        filters: Filters,
    },
    #[command(name = "raw", about = "Show alert raw data")]
    Raw {
        #[command(flatten)]
        filters: Filters,
    },
    #[command(name = "history", about = "Show alert history")]
    History {
        #[command(flatten)]
        filters: Filters,
    },
    #[command(name = "tag", about = "Tag alerts")]
    Tag {
        #[arg(short = 'T', long = "tag", value_name = "TAG", required = true)]
        tags: Vec<String>,
        #[command(flatten)]
        filters: Filters,
    },
    #[command(name = "untag", about = "Remove tags from alerts")]
    Untag {
        #[arg(short = 'T', long = "tag", value_name = "TAG", required = true)]
        tags: Vec<String>,
        #[command(flatten)]
        filters: Filters,
    },
    #[command(name = "ack", about = "Acknowledge alerts")]
    Ack {
        #[command(flatten)]
        filters: Filters,
    },
    #[command(name = "unack", about = "Unacknowledge alerts")]
    Unack {
        #[command(flatten)]
        filters: Filters,
    },
    #[command(name = "close", about = "Close alerts")]
    Close {
        #[command(flatten)]
        filters: Filters,
    },
    #[command(name = "delete", about = "Delete alerts")]
    Delete {
        #[command(flatten)]
        filters: Filters,
    },
    #[command(name = "config", about = "Show config")]
    Config,
    #[command(name = "version", about = "Show alerta version info")]
    Version,
}

impl Commands {
    /// The bulk action behind this command, if it is one.
    pub fn bulk_action(&self) -> Option<(BulkAction, &Filters)> {
        match self {
            Self::Tag { tags, filters } => Some((BulkAction::Tag(tags.clone()), filters)),
            Self::Untag { tags, filters } => Some((BulkAction::Untag(tags.clone()), filters)),
            Self::Ack { filters } => Some((BulkAction::Ack, filters)),
            Self::Unack { filters } => Some((BulkAction::Unack, filters)),
            Self::Close { filters } => Some((BulkAction::Close, filters)),
            Self::Delete { filters } => Some((BulkAction::Delete, filters)),
            _ => None,
        }
    }
}

fn print_lines(lines: impl IntoIterator<Item = String>) -> Result<(), Error> {
    let mut stdout = std::io::stdout().lock();
    for line in lines {
        writeln!(stdout, "{line}")?;
    }
    stdout.flush()?;
    Ok(())
}

fn render(config: &Config, details: bool) -> Render {
    Render { color: config.color.value, timezone: config.timezone.value, details }
}

fn is_json(config: &Config) -> bool {
    config.output.value == OutputFormat::Json
}

fn record_lines(
    config: &Config,
    records: &[AlertRecord],
    details: bool,
) -> Result<Vec<String>, Error> {
    if is_json(config) {
        Ok(vec![json_list(records.iter().map(AlertRecord::to_wire_body))?])
    } else {
        Ok(render(config, details).alerts(records))
    }
}

fn print_records(config: &Config, records: &[AlertRecord], details: bool) -> Result<(), Error> {
    print_lines(record_lines(config, records, details)?)
}

/// Lines for one watch poll. A poll that found nothing new prints nothing.
fn watch_lines(
    config: &Config,
    records: &[AlertRecord],
    details: bool,
) -> Result<Vec<String>, Error> {
    if records.is_empty() {
        return Ok(Vec::new());
    }
    record_lines(config, records, details)
}

fn print_version() -> Result<(), Error> {
    print_lines([format!("alerta client {}", env!("CARGO_PKG_VERSION")), HTTP_LIBRARY.to_owned()])
}

/// `config` and `version` are answered without building a client.
pub async fn run(cmd: Commands, config: &Config) -> Result<(), Error> {
    match cmd {
        Commands::Config => print_lines(config_table(&config.rows())),
        Commands::Version => print_version(),
        cmd => {
            let timeout = Duration::from_secs(config.timeout.value);
            let client = ApiClient::connect(&config.endpoint.value, timeout)?;
            debug!("using endpoint {}", config.endpoint.value);
            execute(cmd, &client, config).await
        }
    }
}

pub async fn execute<T: Transport>(
    cmd: Commands,
    client: &ApiClient<T>,
    config: &Config,
) -> Result<(), Error> {
    match cmd {
        Commands::Send(args) => {
            let alert = args.to_alert()?;
            let accepted = client.send_alert(&alert).await?;
            print_lines([accepted.id])?;
        }
        Commands::Heartbeat { tags, origin, timeout } => {
            let mut builder = Heartbeat::builder().tags(tags);
            if let Some(origin) = origin {
                builder = builder.origin(origin);
            }
            if let Some(timeout) = timeout {
                builder = builder.timeout(timeout);
            }
            let id = client.send_heartbeat(&builder.build()).await?;
            print_lines([id])?;
        }
        Commands::Heartbeats => {
            let heartbeats = client.get_heartbeats().await?;
            if is_json(config) {
                print_lines([json_list(heartbeats.iter().map(|hb| hb.to_wire_body()))?])?;
            } else {
                print_lines(render(config, false).heartbeats(&heartbeats))?;
            }
        }
        Commands::Query { details, filters } => {
            let list = client.get_alerts(&filters.query()).await?;
            print_records(config, &list.alerts, details)?;
        }
        Commands::Watch { details, filters } => {
            watch(client, config, filters.query(), details).await?;
        }
        Commands::Raw { filters } => {
            let list = client.get_alerts(&filters.query()).await?;
            if is_json(config) {
                print_records(config, &list.alerts, false)?;
            } else {
                print_lines(raw_lines(&list.alerts))?;
            }
        }
        Commands::History { filters } => {
            let history = client.get_history(&filters.query()).await?;
            if is_json(config) {
                print_lines([serde_json::to_string_pretty(&history)?])?;
            } else {
                print_lines(render(config, false).history(&history))?;
            }
        }
        // Answered by `run` before a client exists.
        Commands::Config | Commands::Version => {}
        bulk @ (Commands::Tag { .. }
        | Commands::Untag { .. }
        | Commands::Ack { .. }
        | Commands::Unack { .. }
        | Commands::Close { .. }
        | Commands::Delete { .. }) => {
            if let Some((action, filters)) = bulk.bulk_action() {
                let mut progress = TerminalProgress::new(&action);
                let report = client.bulk(&action, &filters.query(), &mut progress).await?;
                info!("processed {} of {} alerts", report.processed, report.total);
            }
        }
    }
    Ok(())
}

/// Poll until interrupted. Ctrl-C ends the watch successfully.
async fn watch<T: Transport>(
    client: &ApiClient<T>,
    config: &Config,
    query: Query,
    details: bool,
) -> Result<(), Error> {
    let mut watcher = Watcher::new(client, query);
    let mut failed = None;
    let rendering = watcher.run(|records| {
        match watch_lines(config, records, details).and_then(print_lines) {
            Ok(()) => ControlFlow::Continue(()),
            Err(err) => {
                failed = Some(err);
                ControlFlow::Break(())
            }
        }
    });
    tokio::select! {
        result = rendering => result?,
        _ = tokio::signal::ctrl_c() => debug!("watch interrupted"),
    }
    match failed {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn json_config() -> Config {
        let dir = tempfile::tempdir().unwrap();
        let flags = Overrides {
            config_file: Some(dir.path().join("missing.toml")),
            output: Some(OutputFormat::Json),
            ..Default::default()
        };
        Config::resolve(&flags, &crate::config::Environment::default()).unwrap()
    }

    fn parse(args: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("alerta").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_global_flags_become_overrides() {
        let args =
            parse(&["--endpoint-url", "http://x/api", "-j", "--no-colour", "query", "group=Web"]);
        let overrides = args.overrides();
        assert_eq!(overrides.endpoint.as_deref(), Some("http://x/api"));
        assert_eq!(overrides.output, Some(OutputFormat::Json));
        assert_eq!(overrides.color, Some(false));
        assert_eq!(overrides.debug, None);

        let args = parse(&["query", "--colour", "--debug"]);
        assert_eq!(args.overrides().color, Some(true));
        assert_eq!(args.overrides().debug, Some(true));
        assert_eq!(args.overrides().output, None);
    }

    #[test]
    fn test_query_filters_are_positional() {
        let args = parse(&["query", "--details", "severity!=normal", "resource=~web"]);
        let Commands::Query { details, filters } = args.cmd else {
            panic!("expected query command");
        };
        assert!(details);
        assert_eq!(filters.query().filters().len(), 2);
    }

    #[test]
    fn test_bulk_commands() {
        let args = parse(&["tag", "-T", "london", "-T", "os:linux", "environment=Production"]);
        let (action, filters) = args.cmd.bulk_action().unwrap();
        assert_eq!(action, BulkAction::Tag(vec!["london".into(), "os:linux".into()]));
        assert_eq!(filters.filter, ["environment=Production"]);

        assert!(Args::try_parse_from(["alerta", "untag", "group=Web"]).is_err());
        assert_eq!(parse(&["close"]).cmd.bulk_action().map(|(a, _)| a), Some(BulkAction::Close));
        assert!(parse(&["query"]).cmd.bulk_action().is_none());
    }

    #[test]
    fn test_send_builds_alert() {
        let args = parse(&[
            "send", "-r", "web01", "-e", "HttpError", "-s", "major", "-C", "HttpOK", "-S", "Web",
            "-A", "region=eu-west-1", "-A", "note=a=b", "--timeout", "600",
        ]);
        let Commands::Send(send) = args.cmd else {
            panic!("expected send command");
        };
        let alert = send.to_alert().unwrap();
        assert_eq!(alert.severity(), "major");
        assert_eq!(alert.correlate(), ["HttpOK", "HttpError"]);
        assert_eq!(alert.attributes()["note"], "a=b");
        assert_eq!(alert.timeout(), 600);
        assert_eq!(alert.group(), "Misc");
    }

    #[test]
    fn test_send_rejects_bad_attributes() {
        let args = parse(&["send", "-r", "web01", "-e", "HttpError", "-A", "novalue"]);
        let Commands::Send(send) = args.cmd else {
            panic!("expected send command");
        };
        assert!(matches!(send.to_alert(), Err(Error::InvalidAttribute(pair)) if pair == "novalue"));

        let args = parse(&["send", "-r", "web01", "-e", "HttpError", "-A", "a.b=c"]);
        let Commands::Send(send) = args.cmd else {
            panic!("expected send command");
        };
        assert!(matches!(send.to_alert(), Err(Error::ValidationError(_))));
    }

    #[test]
    fn test_empty_watch_poll_prints_nothing() {
        let config = json_config();
        assert!(watch_lines(&config, &[], false).unwrap().is_empty());
        assert_eq!(record_lines(&config, &[], false).unwrap(), ["[]"]);

        let record = AlertRecord::from_value(serde_json::json!({
            "id": "5108bc20-aaaa",
            "resource": "web01",
            "event": "HttpError",
            "createTime": "2024-05-20T08:00:00.000Z"
        }))
        .unwrap();
        let lines = watch_lines(&config, &[record], false).unwrap();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("5108bc20-aaaa"));
    }
}
