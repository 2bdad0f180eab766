use clap::builder::TypedValueParser as _;
use clap::Parser;
use dotenvy::dotenv;
use log::LevelFilter;
use std::fmt;
use std::str::FromStr;

/// Default messaging provider REST API base URL used when `MESSAGING_BASE_URL` is not set.
pub const DEFAULT_MESSAGING_BASE_URL: &str = "https://a1.easemob.com";

/// Default object storage host used when `STORAGE_HOST` is not set.
pub const DEFAULT_STORAGE_HOST: &str = "aliyuncs.com";

/// Default image rendered in place of attachments that cannot be rewritten.
pub const DEFAULT_ATTACHMENT_PLACEHOLDER_URL: &str = "/images/attachment-unavailable.png";

#[derive(Clone, Debug, PartialEq)]
pub enum RustEnv {
    Development,
    Production,
    Staging,
}

#[derive(Debug, PartialEq, Eq)]
pub struct RustEnvParseError;

impl FromStr for RustEnv {
    type Err = RustEnvParseError;
    fn from_str(level: &str) -> Result<RustEnv, Self::Err> {
        match level.to_lowercase().as_str() {
            "development" => Ok(RustEnv::Development),
            "production" => Ok(RustEnv::Production),
            "staging" => Ok(RustEnv::Staging),
            _ => Err(RustEnvParseError),
        }
    }
}

impl fmt::Display for RustEnv {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RustEnv::Development => write!(f, "development"),
            RustEnv::Production => write!(f, "production"),
            RustEnv::Staging => write!(f, "staging"),
        }
    }
}

#[derive(Clone, Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// The base URL of the messaging provider's REST API.
    /// Override in tests to point at a mock server.
    #[arg(long, env, default_value = DEFAULT_MESSAGING_BASE_URL)]
    messaging_base_url: String,

    /// The organization the messaging application is registered under.
    #[arg(long, env)]
    messaging_org_id: Option<String>,

    /// The messaging application name.
    #[arg(long, env)]
    messaging_app_name: Option<String>,

    /// The client ID used for the client-credentials token grant.
    #[arg(long, env)]
    messaging_client_id: Option<String>,

    /// The client secret used for the client-credentials token grant.
    #[arg(long, env, hide_env_values = true)]
    messaging_client_secret: Option<String>,

    /// The object storage region endpoint label (e.g. oss-cn-hangzhou).
    #[arg(long, env)]
    storage_region: Option<String>,

    /// The object storage service host.
    #[arg(long, env, default_value = DEFAULT_STORAGE_HOST)]
    storage_host: String,

    /// The bucket direct uploads are signed for.
    #[arg(long, env)]
    storage_bucket: Option<String>,

    /// The access key ID used to sign storage requests.
    #[arg(long, env)]
    storage_access_key_id: Option<String>,

    /// The access key secret used to sign storage requests.
    #[arg(long, env, hide_env_values = true)]
    storage_access_key_secret: Option<String>,

    /// The public base URL chat attachments are rewritten onto.
    #[arg(long, env)]
    attachment_public_base_url: Option<String>,

    /// The URL rendered in place of attachments that cannot be rewritten.
    #[arg(long, env, default_value = DEFAULT_ATTACHMENT_PLACEHOLDER_URL)]
    attachment_placeholder_url: String,

    /// Maximum number of rewritten attachment URLs kept in memory
    #[arg(long, env, default_value_t = 10_000)]
    pub attachment_cache_capacity: usize,

    /// Timeout in seconds for any single call to the messaging provider
    #[arg(long, env, default_value_t = 10)]
    pub http_timeout_secs: u64,

    /// Set the log level verbosity threshold (level) to control what gets displayed on console output
    #[arg(
        short,
        long,
        env,
        default_value_t = LevelFilter::Info,
        value_parser = clap::builder::PossibleValuesParser::new(["OFF", "ERROR", "WARN", "INFO", "DEBUG", "TRACE"])
            .map(|s| s.parse::<LevelFilter>().unwrap()),
        )]
    pub log_level_filter: LevelFilter,

    /// Set the Rust runtime environment to use.
    #[arg(
    short,
    long,
    env,
    default_value_t = RustEnv::Development,
    value_parser = clap::builder::PossibleValuesParser::new([
        "DEVELOPMENT", "PRODUCTION", "STAGING",
        "development", "production", "staging"
    ])
        .map(|s| s.parse::<RustEnv>().unwrap()),
    )]
    pub runtime_env: RustEnv,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn new() -> Self {
        // Load .env file first
        dotenv().ok();
        // Then parse the command line parameters and flags
        Config::parse()
    }

    /// Checks that every setting the integrations need at runtime is present.
    ///
    /// Returns the names of the missing settings, as their environment variable names.
    pub fn validate(&self) -> Result<(), Vec<&'static str>> {
        let required = [
            ("MESSAGING_ORG_ID", &self.messaging_org_id),
            ("MESSAGING_APP_NAME", &self.messaging_app_name),
            ("MESSAGING_CLIENT_ID", &self.messaging_client_id),
            ("MESSAGING_CLIENT_SECRET", &self.messaging_client_secret),
            ("STORAGE_REGION", &self.storage_region),
            ("STORAGE_BUCKET", &self.storage_bucket),
            ("STORAGE_ACCESS_KEY_ID", &self.storage_access_key_id),
            ("STORAGE_ACCESS_KEY_SECRET", &self.storage_access_key_secret),
            ("ATTACHMENT_PUBLIC_BASE_URL", &self.attachment_public_base_url),
        ];

        let missing: Vec<&'static str> = required
            .iter()
            .filter(|(_, value)| value.as_deref().map_or(true, str::is_empty))
            .map(|(name, _)| *name)
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(missing)
        }
    }

    /// Returns the messaging provider REST API base URL.
    pub fn messaging_base_url(&self) -> &str {
        &self.messaging_base_url
    }

    pub fn messaging_org_id(&self) -> Option<String> {
        self.messaging_org_id.clone()
    }

    pub fn messaging_app_name(&self) -> Option<String> {
        self.messaging_app_name.clone()
    }

    pub fn messaging_client_id(&self) -> Option<String> {
        self.messaging_client_id.clone()
    }

    pub fn messaging_client_secret(&self) -> Option<String> {
        self.messaging_client_secret.clone()
    }

    pub fn storage_region(&self) -> Option<String> {
        self.storage_region.clone()
    }

    pub fn storage_host(&self) -> &str {
        &self.storage_host
    }

    pub fn storage_bucket(&self) -> Option<String> {
        self.storage_bucket.clone()
    }

    pub fn storage_access_key_id(&self) -> Option<String> {
        self.storage_access_key_id.clone()
    }

    pub fn storage_access_key_secret(&self) -> Option<String> {
        self.storage_access_key_secret.clone()
    }

    pub fn attachment_public_base_url(&self) -> Option<String> {
        self.attachment_public_base_url.clone()
    }

    pub fn attachment_placeholder_url(&self) -> &str {
        &self.attachment_placeholder_url
    }

    pub fn runtime_env(&self) -> RustEnv {
        self.runtime_env.clone()
    }
}
