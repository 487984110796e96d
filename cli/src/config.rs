use std::{
    collections::BTreeMap,
    fmt,
    path::{Path, PathBuf},
    str::FromStr,
};

use alerta_model::Tz;
use once_cell::sync::Lazy;
use serde::Deserialize;

use crate::output::OutputFormat;

pub static DEFAULT_CONFIG_PATH: Lazy<PathBuf> =
    Lazy::new(|| dirs::home_dir().unwrap_or_default().join(".alerta.toml"));

pub const DEFAULT_ENDPOINT: &str = "http://localhost:8080/api";
pub const DEFAULT_TIMEZONE: Tz = Tz::Europe__London;
pub const DEFAULT_REQUEST_TIMEOUT: u64 = 30;

pub const ENV_CONF_FILE: &str = "ALERTA_CONF_FILE";
pub const ENV_PROFILE: &str = "ALERTA_DEFAULT_PROFILE";
pub const ENV_ENDPOINT: &str = "ALERTA_DEFAULT_ENDPOINT";
pub const ENV_CLICOLOR: &str = "CLICOLOR";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not read config file {path}: {source}")]
    ConfigIo { path: PathBuf, source: std::io::Error },

    #[error("Malformed config file {path}: {source}")]
    Malformed { path: PathBuf, source: toml::de::Error },

    #[error("Unknown timezone {0:?}")]
    UnknownTimezone(String),
}

/// The layer a setting was taken from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    System,
    File,
    Profile(String),
    Env(&'static str),
    Flag(&'static str),
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::System => f.write_str("[system]"),
            Self::File => f.write_str("[file]"),
            Self::Profile(name) => write!(f, "[profile {name}]"),
            Self::Env(var) => f.write_str(var),
            Self::Flag(flag) => f.write_str(flag),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Setting<T> {
    pub value: T,
    pub source: Source,
}

impl<T> Setting<T> {
    fn new(value: T, source: Source) -> Self {
        Self { value, source }
    }

    /// First layer that has a value, in priority order, falling back to `default`.
    fn pick(layers: impl IntoIterator<Item = (Option<T>, Source)>, default: T) -> Self {
        layers
            .into_iter()
            .find_map(|(value, source)| value.map(|value| Self::new(value, source)))
            .unwrap_or_else(|| Self::new(default, Source::System))
    }
}

/// Keys accepted both at the top level of the config file and inside a profile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct FileSettings {
    pub endpoint: Option<String>,
    pub timezone: Option<String>,
    pub output: Option<OutputFormat>,
    pub color: Option<bool>,
    pub debug: Option<bool>,
    pub timeout: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ConfigFile {
    #[serde(flatten)]
    pub base: FileSettings,
    #[serde(default)]
    pub profile: BTreeMap<String, FileSettings>,
}

impl ConfigFile {
    /// Read a config file. A file that does not exist reads as empty.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => return Err(ConfigError::ConfigIo { path: path.to_owned(), source }),
        };
        toml::from_str(&raw)
            .map_err(|source| ConfigError::Malformed { path: path.to_owned(), source })
    }
}

/// Values given on the command line. `None` means the flag was not used.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub config_file: Option<PathBuf>,
    pub profile: Option<String>,
    pub endpoint: Option<String>,
    pub timezone: Option<String>,
    pub output: Option<OutputFormat>,
    pub color: Option<bool>,
    pub debug: Option<bool>,
}

/// Settings read from the process environment.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    pub config_file: Option<PathBuf>,
    pub profile: Option<String>,
    pub endpoint: Option<String>,
    pub clicolor: bool,
}

impl Environment {
    pub fn from_process() -> Self {
        let var = |name| std::env::var(name).ok().filter(|value: &String| !value.is_empty());
        Self {
            config_file: var(ENV_CONF_FILE).map(|path| expand_home(&path)),
            profile: var(ENV_PROFILE),
            endpoint: var(ENV_ENDPOINT),
            clicolor: var(ENV_CLICOLOR).is_some(),
        }
    }
}

fn expand_home(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}

/// Fully resolved settings for one invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub config_file: Setting<PathBuf>,
    pub profile: Setting<Option<String>>,
    pub endpoint: Setting<String>,
    pub timezone: Setting<Tz>,
    pub output: Setting<OutputFormat>,
    pub color: Setting<bool>,
    pub debug: Setting<bool>,
    /// Per-request timeout in seconds.
    pub timeout: Setting<u64>,
    /// The selected profile, when the config file has no section for it.
    pub missing_profile: Option<String>,
}

impl Config {
    /// Resolve every setting from flags, then environment, then the selected profile, then
    /// the top level of the config file, then built-in defaults.
    pub fn resolve(flags: &Overrides, env: &Environment) -> Result<Self, ConfigError> {
        let config_file = Setting::pick(
            [
                (flags.config_file.clone(), Source::Flag("--config-file")),
                (env.config_file.clone(), Source::Env(ENV_CONF_FILE)),
            ],
            DEFAULT_CONFIG_PATH.clone(),
        );
        let file = ConfigFile::load(&config_file.value)?;
        let profile = Setting::pick(
            [
                (flags.profile.clone().map(Some), Source::Flag("--profile")),
                (env.profile.clone().map(Some), Source::Env(ENV_PROFILE)),
            ],
            None,
        );

        let empty = FileSettings::default();
        let mut missing_profile = None;
        let (section, section_source) = match profile.value.as_deref() {
            Some(name) => match file.profile.get(name) {
                Some(section) => (section, Source::Profile(name.to_owned())),
                None => {
                    missing_profile = Some(name.to_owned());
                    (&empty, Source::Profile(name.to_owned()))
                }
            },
            None => (&empty, Source::System),
        };
        let base = &file.base;

        // Layers for keys that can only come from the file or a profile.
        let layered = |get: fn(&FileSettings) -> Option<String>| {
            [(get(section), section_source.clone()), (get(base), Source::File)]
        };

        let endpoint = Setting::pick(
            [
                (flags.endpoint.clone(), Source::Flag("--endpoint-url")),
                (env.endpoint.clone(), Source::Env(ENV_ENDPOINT)),
            ]
            .into_iter()
            .chain(layered(|s| s.endpoint.clone())),
            DEFAULT_ENDPOINT.to_owned(),
        );

        let timezone_name = Setting::pick(
            [(flags.timezone.clone(), Source::Flag("--timezone"))]
                .into_iter()
                .chain(layered(|s| s.timezone.clone())),
            DEFAULT_TIMEZONE.name().to_owned(),
        );
        let timezone = Setting::new(
            Tz::from_str(&timezone_name.value)
                .map_err(|_| ConfigError::UnknownTimezone(timezone_name.value.clone()))?,
            timezone_name.source,
        );

        let output = Setting::pick(
            [
                (flags.output, Source::Flag("--output")),
                (section.output, section_source.clone()),
                (base.output, Source::File),
            ],
            OutputFormat::Text,
        );
        let color = Setting::pick(
            [
                (flags.color, Source::Flag("--color")),
                (env.clicolor.then_some(true), Source::Env(ENV_CLICOLOR)),
                (section.color, section_source.clone()),
                (base.color, Source::File),
            ],
            true,
        );
        let debug = Setting::pick(
            [
                (flags.debug, Source::Flag("--debug")),
                (section.debug, section_source.clone()),
                (base.debug, Source::File),
            ],
            false,
        );
        let timeout = Setting::pick(
            [(section.timeout, section_source.clone()), (base.timeout, Source::File)],
            DEFAULT_REQUEST_TIMEOUT,
        );

        Ok(Self {
            config_file,
            profile,
            endpoint,
            timezone,
            output,
            color,
            debug,
            timeout,
            missing_profile,
        })
    }

    /// Name, value and origin of every setting, in display order.
    pub fn rows(&self) -> Vec<(&'static str, String, String)> {
        fn row<T>(
            name: &'static str,
            setting: &Setting<T>,
            show: impl Fn(&T) -> String,
        ) -> (&'static str, String, String) {
            (name, show(&setting.value), setting.source.to_string())
        }
        vec![
            row("config_file", &self.config_file, |p| p.display().to_string()),
            row("profile", &self.profile, |p| p.clone().unwrap_or_else(|| "None".to_owned())),
            row("endpoint", &self.endpoint, Clone::clone),
            row("timezone", &self.timezone, |tz| tz.name().to_owned()),
            row("output", &self.output, ToString::to_string),
            row("color", &self.color, ToString::to_string),
            row("debug", &self.debug, ToString::to_string),
            row("timeout", &self.timeout, |t| format!("{t}s")),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    fn flags_for(file: &tempfile::NamedTempFile) -> Overrides {
        Overrides { config_file: Some(file.path().to_owned()), ..Default::default() }
    }

    const SAMPLE: &str = r#"
endpoint = "http://alerta.internal/api"
color = false
timeout = 10

[profile.production]
endpoint = "https://alerta.example.com/api"
timezone = "America/New_York"
output = "json"
"#;

    #[test]
    fn test_defaults_when_file_missing() {
        let dir = tempfile::tempdir().unwrap();
        let flags = Overrides {
            config_file: Some(dir.path().join("missing.toml")),
            ..Default::default()
        };
        let config = Config::resolve(&flags, &Environment::default()).unwrap();
        assert_eq!(config.endpoint, Setting::new(DEFAULT_ENDPOINT.to_owned(), Source::System));
        assert_eq!(config.timezone.value, Tz::Europe__London);
        assert_eq!(config.output.value, OutputFormat::Text);
        assert!(config.color.value);
        assert!(!config.debug.value);
        assert_eq!(config.timeout.value, 30);
        assert_eq!(config.profile.value, None);
        assert_eq!(config.config_file.source, Source::Flag("--config-file"));
    }

    #[test]
    fn test_top_level_file_values() {
        let file = write_config(SAMPLE);
        let config = Config::resolve(&flags_for(&file), &Environment::default()).unwrap();
        assert_eq!(config.endpoint.value, "http://alerta.internal/api");
        assert_eq!(config.endpoint.source, Source::File);
        assert_eq!(config.color, Setting::new(false, Source::File));
        assert_eq!(config.timeout.value, 10);
        assert_eq!(config.timezone.source, Source::System);
    }

    #[test]
    fn test_profile_overrides_file() {
        let file = write_config(SAMPLE);
        let env = Environment { profile: Some("production".into()), ..Default::default() };
        let config = Config::resolve(&flags_for(&file), &env).unwrap();
        let profile = Source::Profile("production".into());
        assert_eq!(config.profile.source, Source::Env(ENV_PROFILE));
        assert_eq!(
            config.endpoint,
            Setting::new("https://alerta.example.com/api".into(), profile.clone())
        );
        assert_eq!(config.timezone, Setting::new(Tz::America__New_York, profile.clone()));
        assert_eq!(config.output, Setting::new(OutputFormat::Json, profile));
        // Not set in the profile, so the top level still applies.
        assert_eq!(config.color, Setting::new(false, Source::File));
        assert_eq!(config.missing_profile, None);
    }

    #[test]
    fn test_env_and_flags_take_priority() {
        let file = write_config(SAMPLE);
        let env = Environment {
            profile: Some("production".into()),
            endpoint: Some("http://from-env/api".into()),
            clicolor: true,
            ..Default::default()
        };
        let config = Config::resolve(&flags_for(&file), &env).unwrap();
        assert_eq!(config.endpoint.source, Source::Env(ENV_ENDPOINT));
        assert_eq!(config.color, Setting::new(true, Source::Env(ENV_CLICOLOR)));

        let flags = Overrides {
            endpoint: Some("http://from-flag/api".into()),
            profile: Some("staging".into()),
            output: Some(OutputFormat::Text),
            color: Some(false),
            debug: Some(true),
            ..flags_for(&file)
        };
        let config = Config::resolve(&flags, &env).unwrap();
        assert_eq!(
            config.endpoint,
            Setting::new("http://from-flag/api".into(), Source::Flag("--endpoint-url"))
        );
        assert_eq!(config.profile, Setting::new(Some("staging".into()), Source::Flag("--profile")));
        assert_eq!(config.output.source, Source::Flag("--output"));
        assert_eq!(config.color, Setting::new(false, Source::Flag("--color")));
        assert_eq!(config.debug, Setting::new(true, Source::Flag("--debug")));
        // Unknown profile: nothing from it, top level still applies.
        assert_eq!(config.timeout, Setting::new(10, Source::File));
        assert_eq!(config.missing_profile.as_deref(), Some("staging"));
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let file = write_config("endpoint = [");
        assert!(matches!(
            Config::resolve(&flags_for(&file), &Environment::default()),
            Err(ConfigError::Malformed { .. })
        ));
    }

    #[test]
    fn test_unknown_timezone() {
        let file = write_config("timezone = \"Mars/Olympus_Mons\"");
        assert!(matches!(
            Config::resolve(&flags_for(&file), &Environment::default()),
            Err(ConfigError::UnknownTimezone(name)) if name == "Mars/Olympus_Mons"
        ));
    }

    #[test]
    fn test_rows_name_every_setting() {
        let file = write_config(SAMPLE);
        let config = Config::resolve(&flags_for(&file), &Environment::default()).unwrap();
        let rows = config.rows();
        let names: Vec<_> = rows.iter().map(|(name, _, _)| *name).collect();
        assert_eq!(
            names,
            [
                "config_file",
                "profile",
                "endpoint",
                "timezone",
                "output",
                "color",
                "debug",
                "timeout",
            ]
        );
        assert_eq!(
            rows[2],
            ("endpoint", "http://alerta.internal/api".to_owned(), "[file]".to_owned())
        );
        assert_eq!(rows[1].1, "None");
    }

    #[test]
    #[serial]
    fn test_environment_from_process() {
        std::env::set_var(ENV_PROFILE, "production");
        std::env::set_var(ENV_ENDPOINT, "");
        std::env::set_var(ENV_CLICOLOR, "1");
        let env = Environment::from_process();
        std::env::remove_var(ENV_PROFILE);
        std::env::remove_var(ENV_ENDPOINT);
        std::env::remove_var(ENV_CLICOLOR);

        assert_eq!(env.profile.as_deref(), Some("production"));
        assert_eq!(env.endpoint, None);
        assert!(env.clicolor);
    }
}
