pub mod etcd;

use std::{fmt, fs, net::SocketAddr, path::PathBuf, str::FromStr};

use log::{debug, info, trace, warn};
use pingora::server::configuration::{Opt, ServerConf};
use pingora_error::{ErrorType::*, OrErr, Result};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

/// SendGrid key shipped in the sample `.env`; treated as "not configured".
const PLACEHOLDER_SENDGRID_KEY: &str = "your_sendgrid_api_key_here";

#[derive(Default, Debug, Serialize, Deserialize, Validate)]
pub struct Config {
    #[serde(default)]
    pub pingora: ServerConf,

    #[serde(default)]
    #[validate(nested)]
    pub site: Site,
}

// Config file load and validation
impl Config {
    pub fn load_from_yaml<P>(path: P) -> Result<Self>
    where
        P: AsRef<std::path::Path> + std::fmt::Display,
    {
        let conf_str = fs::read_to_string(&path).or_err_with(ReadError, || {
            format!("Unable to read conf file from {path}")
        })?;
        debug!("Conf file read from {path}");
        Self::parse_yaml(&conf_str)
    }

    /// Config file load entry point.
    ///
    /// Reads `.env`, the optional YAML file given with `-c`, then overlays the
    /// process environment and validates the result. Without a file the
    /// configuration comes from the environment alone.
    pub fn load_with_opt_and_env(opt: &Opt) -> Result<Self> {
        let conf = Self::resolve_with_opt_and_env(opt)?;
        conf.validate()
            .or_err_with(FileReadError, || "Conf file valid failed")?;
        Ok(conf)
    }

    /// Same sources as [`Config::load_with_opt_and_env`] without validation,
    /// for tools that only need part of the configuration.
    pub fn resolve_with_opt_and_env(opt: &Opt) -> Result<Self> {
        if let Ok(path) = dotenvy::dotenv() {
            debug!("Loaded environment from {}", path.display());
        }

        let mut conf = match &opt.conf {
            Some(path) => Self::load_from_yaml(path)?,
            None => {
                info!("No conf file given, building configuration from environment");
                Self::default()
            }
        };
        conf.merge_with_opt(opt);
        conf.site.apply_env(&|key| std::env::var(key).ok());
        Ok(conf)
    }

    pub fn parse_yaml(conf_str: &str) -> Result<Self> {
        trace!("Read conf file: {conf_str}");
        let conf: Config = serde_yaml::from_str(conf_str).or_err_with(ReadError, || {
            format!("Unable to parse yaml conf {conf_str}")
        })?;
        trace!("Loaded conf: {conf:?}");
        Ok(conf)
    }

    pub fn from_yaml(conf_str: &str) -> Result<Self> {
        let conf = Self::parse_yaml(conf_str)?;

        // use validator to validate conf file
        conf.validate()
            .or_err_with(FileReadError, || "Conf file valid failed")?;

        Ok(conf)
    }

    pub fn merge_with_opt(&mut self, opt: &Opt) {
        if opt.daemon {
            self.pingora.daemon = true;
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Deployment {
    /// Long-running server backed by MongoDB.
    #[default]
    Server,
    /// Edge variant backed by an etcd key-value store.
    Edge,
}

impl FromStr for Deployment {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "server" => Ok(Deployment::Server),
            "edge" => Ok(Deployment::Edge),
            other => Err(format!("unknown deployment '{other}'")),
        }
    }
}

impl fmt::Display for Deployment {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Deployment::Server => write!(f, "server"),
            Deployment::Edge => write!(f, "edge"),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, Validate)]
#[validate(schema(function = "Site::validate_store"))]
pub struct Site {
    #[serde(default)]
    pub deployment: Deployment,
    #[serde(default = "Site::default_environment")]
    pub environment: String,

    #[serde(default = "Site::default_listeners")]
    #[validate(length(min = 1))]
    #[validate(nested)]
    pub listeners: Vec<Listener>,

    #[validate(nested)]
    pub mongodb: Option<MongoDb>,
    #[validate(nested)]
    pub etcd: Option<Etcd>,
    #[validate(nested)]
    pub sendgrid: Option<SendGrid>,
    #[validate(nested)]
    pub admin: Option<Admin>,
    #[validate(nested)]
    pub cors: Option<Cors>,
    pub assets: Option<Assets>,
    pub log: Option<Log>,
}

impl Default for Site {
    fn default() -> Self {
        Self {
            deployment: Deployment::default(),
            environment: Self::default_environment(),
            listeners: Self::default_listeners(),
            mongodb: None,
            etcd: None,
            sendgrid: None,
            admin: None,
            cors: None,
            assets: None,
            log: None,
        }
    }
}

impl Site {
    fn default_environment() -> String {
        "development".to_string()
    }

    fn default_listeners() -> Vec<Listener> {
        vec![Listener {
            address: SocketAddr::from(([0, 0, 0, 0], 3000)),
            tls: None,
        }]
    }

    pub fn is_development(&self) -> bool {
        self.environment.eq_ignore_ascii_case("development")
    }

    fn validate_store(&self) -> std::result::Result<(), ValidationError> {
        if self.deployment == Deployment::Server && self.mongodb.is_none() {
            return Err(ValidationError::new("mongodb_uri_required"));
        }
        Ok(())
    }

    /// Overlays environment variables onto the file configuration.
    ///
    /// `lookup` is `std::env::var` in production and a map in tests.
    pub fn apply_env(&mut self, lookup: &dyn Fn(&str) -> Option<String>) {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(env) = var("APP_ENV") {
            self.environment = env;
        }

        if let Some(deployment) = var("SITE_DEPLOYMENT") {
            match deployment.parse() {
                Ok(d) => self.deployment = d,
                Err(e) => warn!("Ignoring SITE_DEPLOYMENT: {e}"),
            }
        }

        if let Some(port) = var("PORT") {
            match port.parse::<u16>() {
                Ok(port) => {
                    self.listeners = vec![Listener {
                        address: SocketAddr::from(([0, 0, 0, 0], port)),
                        tls: None,
                    }]
                }
                Err(_) => warn!("Ignoring PORT '{port}': not a valid port number"),
            }
        }

        if let Some(uri) = var("MONGODB_URI") {
            let database = self
                .mongodb
                .take()
                .map(|m| m.database)
                .unwrap_or_else(MongoDb::default_database);
            self.mongodb = Some(MongoDb { uri, database });
        }
        if let (Some(database), Some(mongodb)) = (var("MONGODB_DATABASE"), self.mongodb.as_mut()) {
            mongodb.database = database;
        }

        if let Some(hosts) = var("ETCD_HOSTS") {
            let host: Vec<String> = hosts
                .split(',')
                .map(str::trim)
                .filter(|h| !h.is_empty())
                .map(String::from)
                .collect();
            match self.etcd.as_mut() {
                Some(etcd) => etcd.host = host,
                None => {
                    self.etcd = Some(Etcd {
                        host,
                        ..Etcd::default()
                    })
                }
            }
        }

        if let Some(api_key) = var("ADMIN_API_KEY") {
            self.admin = Some(Admin { api_key });
        }

        if let Some(root) = var("PUBLIC_DIR") {
            self.assets = Some(Assets { root: root.into() });
        }

        self.sendgrid = self.resolve_sendgrid(&var);
    }

    fn resolve_sendgrid(&mut self, var: &dyn Fn(&str) -> Option<String>) -> Option<SendGrid> {
        let current = self.sendgrid.take();

        let api_key = var("SENDGRID_API_KEY").or_else(|| current.as_ref().map(|s| s.api_key.clone()));
        let from = var("EMAIL_FROM")
            .or_else(|| var("FROM_EMAIL"))
            .or_else(|| current.as_ref().map(|s| s.from.clone()));
        let from_name = var("EMAIL_FROM_NAME")
            .or_else(|| current.as_ref().map(|s| s.from_name.clone()))
            .unwrap_or_else(SendGrid::default_from_name);
        let admin_email =
            var("ADMIN_EMAIL").or_else(|| current.as_ref().map(|s| s.admin_email.clone()));
        let endpoint = current
            .as_ref()
            .map(|s| s.endpoint.clone())
            .unwrap_or_else(SendGrid::default_endpoint);

        let api_key = match api_key {
            Some(key) if key != PLACEHOLDER_SENDGRID_KEY => key,
            _ => {
                info!("SendGrid API key not set, email notifications are disabled");
                return None;
            }
        };

        match (from, admin_email) {
            (Some(from), Some(admin_email)) => Some(SendGrid {
                api_key,
                from,
                from_name,
                admin_email,
                endpoint,
            }),
            (from, admin_email) => {
                let mut missing = Vec::new();
                if from.is_none() {
                    missing.push("EMAIL_FROM");
                }
                if admin_email.is_none() {
                    missing.push("ADMIN_EMAIL");
                }
                warn!(
                    "SendGrid API key set but {} missing, email notifications are disabled",
                    missing.join(", ")
                );
                None
            }
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, Validate)]
pub struct Listener {
    pub address: SocketAddr,
    pub tls: Option<Tls>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Tls {
    pub cert_path: String,
    pub key_path: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, Validate)]
pub struct MongoDb {
    #[validate(length(min = 1))]
    pub uri: String,
    #[serde(default = "MongoDb::default_database")]
    #[validate(length(min = 1))]
    pub database: String,
}

impl MongoDb {
    fn default_database() -> String {
        "Avalance".to_string()
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, Validate)]
pub struct Etcd {
    #[validate(length(min = 1))]
    pub host: Vec<String>,
    #[serde(default = "Etcd::default_prefix")]
    pub prefix: String,
    pub timeout: Option<u32>,
    pub connect_timeout: Option<u32>,
    pub user: Option<String>,
    pub password: Option<String>,
}

impl Default for Etcd {
    fn default() -> Self {
        Self {
            host: Vec::new(),
            prefix: Self::default_prefix(),
            timeout: None,
            connect_timeout: None,
            user: None,
            password: None,
        }
    }
}

impl Etcd {
    fn default_prefix() -> String {
        "/avalance".to_string()
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, Validate)]
pub struct SendGrid {
    #[validate(custom(function = "SendGrid::validate_api_key"))]
    pub api_key: String,
    #[validate(email)]
    pub from: String,
    #[serde(default = "SendGrid::default_from_name")]
    pub from_name: String,
    #[validate(email)]
    pub admin_email: String,
    #[serde(default = "SendGrid::default_endpoint")]
    #[validate(url)]
    pub endpoint: String,
}

impl SendGrid {
    fn default_from_name() -> String {
        "Avalance Tech Solutions".to_string()
    }

    fn default_endpoint() -> String {
        "https://api.sendgrid.com/v3/mail/send".to_string()
    }

    fn validate_api_key(key: &str) -> std::result::Result<(), ValidationError> {
        if key.starts_with("SG.") {
            Ok(())
        } else {
            Err(ValidationError::new("sendgrid_api_key_must_start_with_sg"))
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, Validate)]
pub struct Admin {
    #[validate(length(min = 1))]
    pub api_key: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, Validate)]
#[validate(schema(function = "Cors::validate"))]
pub struct Cors {
    /// Comma separated origins, or `*` for any origin.
    #[serde(default = "Cors::default_origins")]
    #[validate(custom(function = "Cors::validate_origins"))]
    pub allow_origins: String,
    #[serde(default = "Cors::default_methods")]
    #[validate(custom(function = "Cors::validate_methods"))]
    pub allow_methods: String,
    #[serde(default = "Cors::default_headers")]
    #[validate(custom(function = "Cors::validate_headers"))]
    pub allow_headers: String,
    /// Seconds a preflight result may be cached, -1 disables caching.
    #[serde(default = "Cors::default_max_age")]
    pub max_age: i32,
    #[serde(default)]
    pub allow_credential: bool,
}

impl Cors {
    fn default_origins() -> String {
        "*".to_string()
    }

    fn default_methods() -> String {
        "GET,POST,PUT,PATCH,DELETE,OPTIONS".to_string()
    }

    fn default_headers() -> String {
        "Content-Type,Authorization,x-api-key".to_string()
    }

    fn default_max_age() -> i32 {
        5
    }

    /// Local development origins allowed by the server deployment.
    pub fn server_default() -> Self {
        let origins = [3000, 3001, 8080]
            .iter()
            .flat_map(|port| {
                [
                    format!("http://localhost:{port}"),
                    format!("http://127.0.0.1:{port}"),
                ]
            })
            .collect::<Vec<_>>()
            .join(",");

        Self {
            allow_origins: origins,
            allow_methods: Self::default_methods(),
            allow_headers: Self::default_headers(),
            max_age: Self::default_max_age(),
            allow_credential: true,
        }
    }

    /// Permissive policy of the edge deployment.
    pub fn edge_default() -> Self {
        Self {
            allow_origins: Self::default_origins(),
            allow_methods: Self::default_methods(),
            allow_headers: Self::default_headers(),
            max_age: Self::default_max_age(),
            allow_credential: false,
        }
    }

    fn validate(&self) -> std::result::Result<(), ValidationError> {
        if self.allow_credential && self.allow_origins == "*" {
            return Err(ValidationError::new(
                "allow_credential cannot be used with allow_origins='*'",
            ));
        }
        Ok(())
    }

    fn validate_origins(origins: &str) -> std::result::Result<(), ValidationError> {
        if origins.is_empty() {
            return Err(ValidationError::new("allow_origins cannot be empty"));
        }
        if origins != "*" && origins.split(',').map(str::trim).any(str::is_empty) {
            return Err(ValidationError::new("allow_origins contains empty origin"));
        }
        Ok(())
    }

    fn validate_methods(methods: &str) -> std::result::Result<(), ValidationError> {
        for method in methods.split(',').map(str::trim) {
            if !["GET", "POST", "PUT", "DELETE", "PATCH", "OPTIONS", "HEAD"]
                .contains(&method.to_uppercase().as_str())
            {
                return Err(ValidationError::new("invalid HTTP method"));
            }
        }
        Ok(())
    }

    fn validate_headers(headers: &str) -> std::result::Result<(), ValidationError> {
        for header in headers.split(',').map(str::trim) {
            if header.is_empty() || !header.chars().all(|c| c.is_alphanumeric() || c == '-') {
                return Err(ValidationError::new("invalid header name"));
            }
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Assets {
    pub root: PathBuf,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Log {
    pub path: String,
    #[serde(default = "Log::default_level")]
    pub level: String,
}

impl Log {
    fn default_level() -> String {
        "info".to_string()
    }
}
