use anyhow::{Context, Result, anyhow};
use extract::LanguageConfig;
use index::{GremlinConfig, PipelineConfig};

/// Endpoint value that selects the in-process graph instead of a Gremlin account
pub const IN_MEMORY_ENDPOINT: &str = "memory://";

#[derive(Debug, Clone)]
pub enum GraphBackend {
    Gremlin(GremlinConfig),
    InMemory,
}

/// Everything the process needs, read once at startup
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub language: LanguageConfig,
    pub graph: GraphBackend,
    pub pipeline: PipelineConfig,
    pub server_addr: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let required = |key: &str| lookup(key).ok_or_else(|| anyhow!("Missing {key} in the environment"));

        let mut language = LanguageConfig {
            endpoint: required("CognitiveServiceEndPoint")?,
            api_key: required("CognitiveServiceAPIKey")?,
            ..LanguageConfig::default()
        };
        if let Some(secs) = lookup("LANGUAGE_POLL_INTERVAL_SECS") {
            let secs: u64 = secs
                .parse()
                .context("LANGUAGE_POLL_INTERVAL_SECS must be a whole number of seconds")?;
            language.poll_interval_ms = secs * 1000;
        }

        let endpoint = required("CosmosEndPoint")?;
        let graph = if endpoint == IN_MEMORY_ENDPOINT {
            GraphBackend::InMemory
        } else {
            GraphBackend::Gremlin(GremlinConfig {
                endpoint,
                database: required("CosmosGraphDB")?,
                collection: required("CosmosGraphCollection")?,
                access_key: required("CosmosPrimaryKey")?,
            })
        };

        let mut pipeline = PipelineConfig::default();
        if let Some(scheme) = lookup("GRAPH_ID_SCHEME") {
            pipeline.id_scheme = scheme.parse()?;
        }
        if let Some(policy) = lookup("GRAPH_ON_UNRESOLVED") {
            pipeline.on_unresolved = policy.parse()?;
        }
        if let Some(policy) = lookup("GRAPH_ON_EMPTY_WRITE") {
            pipeline.on_empty_write = policy.parse()?;
        }

        let server_addr = lookup("SERVER_ADDR").unwrap_or_else(|| "0.0.0.0:3000".to_string());

        Ok(Self {
            language,
            graph,
            pipeline,
            server_addr,
        })
    }
}
